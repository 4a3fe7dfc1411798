use crate::infrastructure::error::{CliError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub default_level: tracing::Level,
    pub json_format: bool,
    pub file_output: Option<String>,
    pub show_thread_ids: bool,
    pub show_targets: bool,
    /// Whether to log to stderr at all
    pub show_logs: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: tracing::Level::INFO,
            json_format: false,
            file_output: None,
            show_thread_ids: false,
            show_targets: true,
            show_logs: true,
        }
    }
}

impl LogConfig {
    /// Development configuration (verbose, human-readable)
    pub fn dev() -> Self {
        Self {
            default_level: tracing::Level::DEBUG,
            show_thread_ids: true,
            ..Default::default()
        }
    }

    /// Level from the number of `-v` flags
    pub fn from_verbosity(verbose: u8) -> Self {
        let default_level = match verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };
        Self {
            default_level,
            ..Default::default()
        }
    }

    /// One JSON object per event
    pub fn with_json(mut self) -> Self {
        self.json_format = true;
        self
    }

    pub fn without_logs(mut self) -> Self {
        self.show_logs = false;
        self
    }

    /// Also append events to a file
    pub fn with_file_output(mut self, path: String) -> Self {
        self.file_output = Some(path);
        self
    }

    /// Default directives, used when `RUST_LOG` is unset
    pub fn directives(&self) -> String {
        let level = self.default_level;
        format!(
            "neon_session_cli={level},neon_session_core={level},\
             neon_session_p2p={level},matchbox_socket=info"
        )
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(self.directives())
                .map_err(|e| CliError::Logging(format!("bad filter directives: {}", e))),
        }
    }

    pub fn init(self) -> Result<()> {
        let env_filter = self.env_filter()?;
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if self.show_logs {
            layers.push(if self.json_format {
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(self.show_thread_ids)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(self.show_targets)
                    .with_thread_ids(self.show_thread_ids)
                    .boxed()
            });
        }

        if let Some(path) = &self.file_output {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            layers.push(if self.json_format {
                fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .boxed()
            } else {
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .boxed()
            });
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| CliError::Logging(format!("Failed to initialize tracing: {}", e)))
    }
}
