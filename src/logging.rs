use tracing_subscriber::EnvFilter;

/// Terminal logging filtered by `RUST_LOG`, `info` by default. Logs go to
/// stderr so `--tables` output on stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
