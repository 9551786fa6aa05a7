use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

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
}

/// The selected level applies to the engine crates; third-party crates are
/// capped at `warn` (or the selected level when it is stricter).
fn default_directives(level: LogLevel) -> String {
    let lv = level.as_str();
    let external = match level {
        LogLevel::Error => "error",
        _ => "warn",
    };
    format!(
        "{external},xapilink={lv},xapilink_host={lv},xapilink_frame={lv},\
         xapilink_codec={lv},xapilink_schema={lv},xapilink_transport={lv}"
    )
}

/// Install the global subscriber. `RUST_LOG`, when set, overrides the
/// level flag entirely.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
