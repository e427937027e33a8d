//! Tracing setup for the command line front end

use tracing_subscriber::{fmt, EnvFilter};

/// Console logging configuration.
///
/// Verbosity maps repeated `-v` flags onto level filters; `RUST_LOG` wins when
/// set so operators can scope filtering per module.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    verbosity: u8,
}

impl TracingConfig {
    #[must_use]
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    fn default_directive(self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Install the global subscriber. Call once, early in main.
    ///
    /// # Errors
    ///
    /// Fails when a global subscriber is already installed.
    pub fn init(self) -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive()));

        fmt()
            .with_env_filter(filter)
            .with_target(self.verbosity >= 2)
            .with_writer(std::io::stderr)
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_maps_to_directives() {
        assert_eq!(TracingConfig::new(0).default_directive(), "warn");
        assert_eq!(TracingConfig::new(1).default_directive(), "info");
        assert_eq!(TracingConfig::new(2).default_directive(), "debug");
        assert_eq!(TracingConfig::new(9).default_directive(), "trace");
    }
}
