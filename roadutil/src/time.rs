use std::time::Instant;

pub fn elapsed_seconds(since: Instant) -> f64 {
    let dt = since.elapsed();
    (dt.as_secs() as f64) + (f64::from(dt.subsec_nanos()) * 1e-9)
}

struct TimerSpan {
    name: String,
    started_at: Instant,
    nested_results: Vec<String>,
}

/// Hierarchial phase timing. Every span logs when it starts and stops; warnings are collected
/// and summarized when the timer is dropped, so problems from a long batch don't scroll away.
pub struct Timer {
    results: Vec<String>,
    stack: Vec<TimerSpan>,

    outermost_name: String,

    warnings: Vec<String>,
}

impl Timer {
    pub fn new<S: Into<String>>(name: S) -> Timer {
        let name = name.into();
        let mut t = Timer {
            results: Vec::new(),
            stack: Vec::new(),
            outermost_name: name.clone(),
            warnings: Vec::new(),
        };
        t.start(name);
        t
    }

    pub fn throwaway() -> Timer {
        Timer::new("throwaway")
    }

    pub fn warn(&mut self, line: String) {
        self.warnings.push(line);
    }

    pub fn warnings(&self) -> &Vec<String> {
        &self.warnings
    }

    /// Used to end the scope of a timer early.
    pub fn done(self) {}

    pub fn start<S: Into<String>>(&mut self, name: S) {
        let name = name.into();
        log::info!("{}...", name);
        self.stack.push(TimerSpan {
            name,
            started_at: Instant::now(),
            nested_results: Vec::new(),
        });
    }

    pub fn stop<S: Into<String>>(&mut self, name: S) {
        let name = name.into();
        let span = match self.stack.pop() {
            Some(span) => span,
            None => {
                log::error!("Timer stopped {} without a matching start", name);
                return;
            }
        };
        if span.name != name {
            log::error!("Timer stopped {}, but the open span is {}", name, span.name);
        }
        let line = format!(
            "{} took {}",
            span.name,
            prettyprint_time(elapsed_seconds(span.started_at))
        );

        let padding = "  ".repeat(self.stack.len());
        match self.stack.last_mut() {
            Some(parent) => {
                parent.nested_results.push(format!("{}- {}", padding, line));
                parent.nested_results.extend(span.nested_results);
            }
            None => {
                self.results.push(format!("{}- {}", padding, line));
                self.results.extend(span.nested_results);
            }
        }

        log::info!("{}", line);
    }
}

impl std::ops::Drop for Timer {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        // Close anything the caller left open, then the outermost span
        while self.stack.len() > 1 {
            if let Some(name) = self.stack.last().map(|s| s.name.clone()) {
                self.stop(name);
            }
        }
        let stop_name = self.outermost_name.clone();
        self.stop(stop_name);

        for line in &self.results {
            log::debug!("{}", line);
        }

        if !self.warnings.is_empty() {
            log::warn!("{} warnings:", self.warnings.len());
            for line in &self.warnings {
                log::warn!("{}", line);
            }
        }
    }
}

pub fn prettyprint_usize(x: usize) -> String {
    let num = format!("{}", x);
    let mut result = String::new();
    let mut i = num.len();
    for c in num.chars() {
        result.push(c);
        i -= 1;
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
    }
    result
}

pub fn prettyprint_time(seconds: f64) -> String {
    format!("{:.4}s", seconds)
}
