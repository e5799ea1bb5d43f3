//! Process bootstrap: tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::helpers::optional_env;

/// Log output format, selected with `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value. Unknown values fall back to pretty output.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }

    /// Read `LOG_FORMAT`. Unset, blank and non-UTF-8 values select pretty output.
    pub fn from_env() -> Self {
        match optional_env("LOG_FORMAT") {
            Ok(Some(raw)) => Self::parse(&raw),
            Ok(None) | Err(_) => Self::default(),
        }
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// Filtering follows `RUST_LOG` and defaults to `info`.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.with_target(false).init(),
        LogFormat::Json => builder.json().with_current_span(false).init(),
    }
}
