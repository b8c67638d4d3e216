/// Intercept messages using the `log` crate and print them to STDOUT. The default level is
/// `info`; override with `RUST_LOG`.
pub fn setup() {
    use env_logger::{Builder, Env};
    // Tests and tools may call this more than once
    let _ = Builder::from_env(Env::default().default_filter_or("info")).try_init();
}
