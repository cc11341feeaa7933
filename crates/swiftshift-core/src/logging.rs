use crate::{errors::Error, Result};

/// Initialize tracing for the host process.
///
/// Output goes to stderr: stdout is the native-messaging channel and any stray
/// byte there corrupts the framing.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    // Default: info for our crates, warn for everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,swiftshift=info,swiftshift_core=info,swiftshift_host=info,swiftshift_telegram=info,{service_name}=info"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to initialize logging: {e}")))
}
