//! Subscriber construction for host logs.
//!
//! The kernel emits one span per install, uninstall, update, dispatch and
//! callback, with `module_id`, `operation` and `slot` fields on the events
//! inside. [`LogConfig`] decides how those are filtered and rendered.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{TelemetryError, TelemetryResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// How rendered lines are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, for reading by eye.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
    /// One line per event with every span field.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::UnknownFormat(other.to_owned())),
        }
    }
}

/// Rolling period for file output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rolling {
    /// New file every day.
    #[default]
    Daily,
    /// New file every hour.
    Hourly,
    /// A single file.
    Never,
}

impl From<Rolling> for Rotation {
    fn from(rolling: Rolling) -> Self {
        match rolling {
            Rolling::Daily => Self::DAILY,
            Rolling::Hourly => Self::HOURLY,
            Rolling::Never => Self::NEVER,
        }
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// Files named `{prefix}.{period}` under `directory`.
    File {
        /// Created if missing.
        directory: PathBuf,
        /// File name prefix.
        prefix: String,
        /// Rolling period.
        #[serde(default)]
        rolling: Rolling,
    },
}

/// Which span lifecycle points are logged.
///
/// `Close` is the useful one for hosts: every install and dispatch span
/// reports its busy and idle time when it ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanEvents {
    /// Spans only add context to events.
    #[default]
    Off,
    /// Log when a span closes, with timings.
    Close,
    /// Log span creation and close.
    Full,
}

impl From<SpanEvents> for FmtSpan {
    fn from(events: SpanEvents) -> Self {
        match events {
            SpanEvents::Off => FmtSpan::NONE,
            SpanEvents::Close => FmtSpan::CLOSE,
            SpanEvents::Full => FmtSpan::NEW | FmtSpan::CLOSE,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base level (`info`, `debug`, ...).
    pub level: String,
    /// Line layout.
    pub format: LogFormat,
    /// Output.
    pub target: LogTarget,
    /// Span lifecycle logging.
    pub spans: SpanEvents,
    /// Per-target overrides such as `modhost_kernel=debug`.
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            spans: SpanEvents::default(),
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Default configuration at `level`.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Render with `format`.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Write to `target`.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Write to daily files under `directory`.
    #[must_use]
    pub fn with_log_dir(self, directory: impl Into<PathBuf>) -> Self {
        self.with_target(LogTarget::File {
            directory: directory.into(),
            prefix: "modhost".to_owned(),
            rolling: Rolling::Daily,
        })
    }

    /// Log span lifecycle points.
    #[must_use]
    pub fn with_spans(mut self, spans: SpanEvents) -> Self {
        self.spans = spans;
        self
    }

    /// Add a per-target override.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// The filter for this configuration.
    ///
    /// # Errors
    ///
    /// [`TelemetryError::InvalidFilter`] naming the first level or directive
    /// that does not parse.
    pub fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let base = EnvFilter::try_new(&self.level).map_err(|e| TelemetryError::InvalidFilter {
            filter: self.level.clone(),
            reason: e.to_string(),
        })?;

        self.directives.iter().try_fold(base, |filter, raw| {
            let directive =
                Directive::from_str(raw).map_err(|e| TelemetryError::InvalidFilter {
                    filter: raw.clone(),
                    reason: e.to_string(),
                })?;
            Ok(filter.add_directive(directive))
        })
    }

    fn layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_span_events(self.spans.into());

        match self.format {
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Json => layer.json().with_current_span(true).boxed(),
            LogFormat::Full => layer.boxed(),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// The filter is validated before anything is installed.
///
/// # Errors
///
/// - [`TelemetryError::InvalidFilter`] for a bad level or directive
/// - [`TelemetryError::LogDirectory`] if the file target cannot be created
/// - [`TelemetryError::AlreadyInitialized`] if a subscriber is already set
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let terminal = config.format != LogFormat::Json;

    let layer = match &config.target {
        LogTarget::Stdout => config.layer(std::io::stdout, terminal),
        LogTarget::Stderr => config.layer(std::io::stderr, terminal),
        LogTarget::File {
            directory,
            prefix,
            rolling,
        } => {
            std::fs::create_dir_all(directory).map_err(|source| TelemetryError::LogDirectory {
                path: directory.clone(),
                source,
            })?;
            let appender = RollingFileAppender::new((*rolling).into(), directory, prefix);
            config.layer(appender, false)
        },
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}

#[cfg(feature = "config")]
impl From<&modhost_config::LoggingSection> for LogConfig {
    fn from(section: &modhost_config::LoggingSection) -> Self {
        // Loaded sections are validated; hand-built ones fall back to compact.
        Self {
            level: section.level.clone(),
            format: section.format.parse().unwrap_or_default(),
            directives: section.directives.clone(),
            ..Self::default()
        }
    }
}
