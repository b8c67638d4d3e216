use crate::Timer;

// - If it doesn't make sense to plumb Timer to a library call, return Warn<T>.
// - If a Timer is available and there's a Warn<T>, use get() or with_context().
// - If a Timer is available and something goes wrong, directly call warn().
pub struct Warn<T> {
    value: T,
    warnings: Vec<String>,
}

impl<T> Warn<T> {
    pub fn ok(value: T) -> Warn<T> {
        Warn {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn warn(value: T, warning: String) -> Warn<T> {
        Warn {
            value,
            warnings: vec![warning],
        }
    }

    pub fn warnings(value: T, warnings: Vec<String>) -> Warn<T> {
        Warn { value, warnings }
    }

    pub fn list_warnings(&self) -> &Vec<String> {
        &self.warnings
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Logs every warning and returns the value.
    pub fn unwrap(self) -> T {
        if !self.warnings.is_empty() {
            log::warn!("{} warnings:", self.warnings.len());
            for line in self.warnings {
                log::warn!("{}", line);
            }
        }
        self.value
    }

    pub fn get(self, timer: &mut Timer) -> T {
        for line in self.warnings {
            timer.warn(line);
        }
        self.value
    }

    pub fn with_context(self, timer: &mut Timer, context: String) -> T {
        for line in self.warnings {
            timer.warn(format!("{}: {}", context, line));
        }
        self.value
    }

    /// Splits into the value and the warnings, without logging anything.
    pub fn into_parts(self) -> (T, Vec<String>) {
        (self.value, self.warnings)
    }
}
