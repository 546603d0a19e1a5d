//! Tracing initialisation for hosts that do not install their own subscriber.

/// Initialize a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns an error when a global subscriber is already set.
pub fn init_tracing() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

/// Same as [`init_tracing`] but emits JSON lines.
pub fn init_json_tracing() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_subscriber_installs_once() {
        let _ = init_tracing();

        assert!(init_tracing().is_err());
        assert!(init_json_tracing().is_err());
    }
}
