use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Crates whose events `--log-level` controls. Everything else stays quiet
/// unless `RUST_LOG` asks for it.
const WORKSPACE_TARGETS: &[&str] = &[
    "avrlink",
    "avrlink_session",
    "avrlink_frame",
    "avrlink_transport",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Filter directive applying this level to the workspace crates only.
    pub fn directive(self) -> String {
        let level = self.as_str();
        let mut directive = String::from("off");
        for target in WORKSPACE_TARGETS {
            directive.push_str(&format!(",{target}={level}"));
        }
        directive
    }
}

/// Install the stderr subscriber. A valid `RUST_LOG` replaces `level` entirely.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_scopes_level_to_workspace() {
        assert_eq!(
            LogLevel::Debug.directive(),
            "off,avrlink=debug,avrlink_session=debug,avrlink_frame=debug,avrlink_transport=debug"
        );
    }

    #[test]
    fn directive_is_a_valid_filter() {
        for level in [LogLevel::Error, LogLevel::Trace] {
            assert!(EnvFilter::try_new(level.directive()).is_ok());
        }
    }
}
