//! Process-wide logging state and the `tracing` layer that routes records.
//!
//! A [`LoggingState`] owns the compiled handler/logger pipeline. Writers
//! (`apply`, `apply_levels`) build a complete new pipeline and swap it in;
//! the layer loads whichever pipeline is current for each record, so a
//! record never sees a half-applied configuration.

use arc_swap::ArcSwap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, Event, Subscriber};
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use super::config::{
    normalize_logger_name, ConsoleStream, FileMode, FormatterConfig, HandlerConfig,
    HandlerTarget, LevelOverrides, LogLevel, LoggerConfig, LoggingConfig,
};
use super::error::{ConfigError, ConfigureError};
use super::format::{Formatter, Record};
use super::template::Template;

// ---------------------------------------------------------------------------
// Sinks and handlers
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Sink {
    Stdout,
    Stderr,
    File {
        path: PathBuf,
        mode: FileMode,
        file: Mutex<File>,
    },
}

impl Sink {
    /// Open the sink. `w`-mode files are not truncated here; see [`Sink::truncate`].
    fn open(target: &HandlerTarget) -> Result<Self, ConfigError> {
        match target {
            HandlerTarget::Console {
                stream: ConsoleStream::Stdout,
            } => Ok(Self::Stdout),
            HandlerTarget::Console {
                stream: ConsoleStream::Stderr,
            } => Ok(Self::Stderr),
            HandlerTarget::File { filename, mode } => {
                let file = OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(filename)
                    .map_err(|source| ConfigError::OpenFile {
                        path: filename.clone(),
                        source,
                    })?;
                Ok(Self::File {
                    path: filename.clone(),
                    mode: *mode,
                    file: Mutex::new(file),
                })
            }
        }
    }

    /// Empty a freshly opened `w`-mode file. Other sinks are left alone.
    fn truncate(&self) -> Result<(), ConfigError> {
        match self {
            Self::File {
                path,
                mode: FileMode::Write,
                file,
            } => file
                .lock()
                .set_len(0)
                .map_err(|source| ConfigError::OpenFile {
                    path: path.clone(),
                    source,
                }),
            Self::File { .. } | Self::Stdout | Self::Stderr => Ok(()),
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Stdout | Self::Stderr => None,
        }
    }

    /// Best effort: a failed write drops the line.
    fn write_line(&self, line: &str) {
        let bytes = line.as_bytes();
        match self {
            Self::Stdout => std::io::stdout().lock().write_all(bytes).ok(),
            Self::Stderr => std::io::stderr().lock().write_all(bytes).ok(),
            Self::File { file, .. } => file.lock().write_all(bytes).ok(),
        };
    }
}

#[derive(Debug)]
struct Handler {
    level: LogLevel,
    formatter: Formatter,
    sink: Arc<Sink>,
}

impl Handler {
    fn emit(&self, record: &Record) {
        if record.level >= self.level {
            self.sink.write_line(&self.formatter.format(record));
        }
    }
}

#[derive(Debug)]
struct Route {
    level: Option<LogLevel>,
    handlers: Vec<Arc<Handler>>,
    propagate: bool,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A compiled [`LoggingConfig`]: open sinks plus routes keyed by logger name.
#[derive(Debug)]
struct Pipeline {
    config: LoggingConfig,
    loggers: HashMap<String, Route>,
    root: Option<Route>,
    sinks: BTreeMap<String, Arc<Sink>>,
    /// Sinks opened by `compile` rather than carried over from a previous pipeline.
    fresh: Vec<Arc<Sink>>,
}

impl Pipeline {
    fn empty() -> Self {
        Self {
            config: LoggingConfig::empty(),
            loggers: HashMap::new(),
            root: None,
            sinks: BTreeMap::new(),
            fresh: Vec::new(),
        }
    }

    /// Compile `config`. Handlers whose target is unchanged from `reuse`
    /// keep their open sink; every other sink is opened fresh.
    fn compile(config: LoggingConfig, reuse: Option<&Self>) -> Result<Self, ConfigError> {
        let mut sinks = BTreeMap::new();
        let mut fresh = Vec::new();
        let mut handlers = BTreeMap::new();
        for (name, handler) in config.handlers() {
            let sink = match reuse.and_then(|previous| previous.reusable_sink(name, handler)) {
                Some(sink) => sink,
                None => {
                    let sink = Arc::new(Sink::open(&handler.target)?);
                    fresh.push(Arc::clone(&sink));
                    sink
                }
            };
            let compiled = Handler {
                level: handler.level,
                formatter: compile_formatter(&config, handler),
                sink: Arc::clone(&sink),
            };
            sinks.insert(name.clone(), sink);
            handlers.insert(name.as_str(), Arc::new(compiled));
        }

        let route = |logger: &LoggerConfig| Route {
            level: logger.level,
            handlers: logger
                .handlers
                .iter()
                .filter_map(|name| handlers.get(name.as_str()).cloned())
                .collect(),
            propagate: logger.propagate,
        };
        let loggers = config
            .loggers()
            .iter()
            .map(|(name, logger)| (name.clone(), route(logger)))
            .collect();
        let root = config.root().map(route);

        Ok(Self {
            config,
            loggers,
            root,
            sinks,
            fresh,
        })
    }

    /// Truncate the `w`-mode files this pipeline opened. Only called once
    /// every sink has opened, right before the pipeline is swapped in.
    fn truncate_fresh(&self) -> Result<(), ConfigError> {
        self.fresh.iter().try_for_each(|sink| sink.truncate())
    }

    fn reusable_sink(&self, name: &str, handler: &HandlerConfig) -> Option<Arc<Sink>> {
        let previous = self.config.handlers().get(name)?;
        if previous.target == handler.target {
            self.sinks.get(name).cloned()
        } else {
            None
        }
    }

    /// Configured routes for `name`, nearest first, ending with root.
    fn chain(&self, name: &str) -> Vec<&Route> {
        std::iter::successors(Some(name), |n| n.rsplit_once("::").map(|(parent, _)| parent))
            .filter_map(|n| self.loggers.get(n))
            .chain(self.root.iter())
            .collect()
    }

    fn dispatch(&self, record: &Record) {
        let name = if record.name.contains('.') {
            Cow::Owned(normalize_logger_name(&record.name))
        } else {
            Cow::Borrowed(record.name.as_str())
        };
        let chain = self.chain(&name);
        let Some(effective) = chain.iter().find_map(|route| route.level) else {
            return;
        };
        if record.level < effective {
            return;
        }
        for route in chain {
            for handler in &route.handlers {
                handler.emit(record);
            }
            if !route.propagate {
                break;
            }
        }
    }
}

fn compile_formatter(config: &LoggingConfig, handler: &HandlerConfig) -> Formatter {
    // References were checked when the config was built.
    match handler
        .formatter
        .as_ref()
        .and_then(|name| config.formatters().get(name))
    {
        Some(FormatterConfig::Text { format }) => Formatter::Text(format.clone()),
        Some(FormatterConfig::Json) => Formatter::Json,
        None => Formatter::Text(Template::message_only()),
    }
}

// ---------------------------------------------------------------------------
// LoggingState
// ---------------------------------------------------------------------------

/// The process-wide logging registry.
///
/// Reads (one per record) are lock-free. Writes are serialized by an
/// internal lock. [`configure`](super::LoggingBootstrap::configure) holds an
/// additional in-progress flag so a second bootstrap cannot start while one
/// is running.
#[derive(Debug)]
pub struct LoggingState {
    pipeline: ArcSwap<Pipeline>,
    writer: Mutex<()>,
    configuring: AtomicBool,
}

impl Default for LoggingState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingState {
    /// A state with no loggers: every record is dropped until a config is applied.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline: ArcSwap::from_pointee(Pipeline::empty()),
            writer: Mutex::new(()),
            configuring: AtomicBool::new(false),
        }
    }

    /// Install a fresh state as the global `tracing` subscriber.
    ///
    /// Only the first call installs; later calls return the same state. Fails
    /// if some other global subscriber was set first.
    pub fn install_global() -> Result<Arc<Self>, ConfigureError> {
        static GLOBAL: OnceCell<Arc<LoggingState>> = OnceCell::new();

        GLOBAL
            .get_or_try_init(|| {
                let state = Arc::new(Self::new());
                tracing_subscriber::registry()
                    .with(state.layer())
                    .with(ErrorLayer::default())
                    .try_init()?;
                Ok::<_, ConfigureError>(state)
            })
            .map(Arc::clone)
    }

    /// The layer routing records through this state.
    #[must_use]
    pub fn layer(self: &Arc<Self>) -> LoggingLayer {
        LoggingLayer {
            state: Arc::clone(self),
        }
    }

    /// Replace the installed configuration.
    ///
    /// All sinks are opened before anything is swapped in; on error the
    /// previous configuration stays active. `w`-mode files are truncated even
    /// when the same path was already open.
    pub fn apply(&self, config: &LoggingConfig) -> Result<(), ConfigError> {
        let guard = self.writer.lock();
        let pipeline = Pipeline::compile(config.clone(), None)?;
        pipeline.truncate_fresh()?;
        self.pipeline.store(Arc::new(pipeline));
        drop(guard);

        debug!(
            handlers = config.handlers().len(),
            loggers = config.loggers().len(),
            "Applied logging configuration"
        );
        Ok(())
    }

    /// Adjust handler and logger levels without reopening any sink.
    pub fn apply_levels(&self, overrides: &LevelOverrides) -> Result<(), ConfigError> {
        let _guard = self.writer.lock();
        let current = self.pipeline.load_full();
        let config = current.config.with_levels(overrides)?;
        let pipeline = Pipeline::compile(config, Some(current.as_ref()))?;
        pipeline.truncate_fresh()?;
        self.pipeline.store(Arc::new(pipeline));
        Ok(())
    }

    /// The configuration currently in effect.
    #[must_use]
    pub fn config(&self) -> LoggingConfig {
        self.pipeline.load().config.clone()
    }

    /// Paths of the files currently open for writing.
    #[must_use]
    pub fn open_files(&self) -> Vec<PathBuf> {
        self.pipeline
            .load()
            .sinks
            .values()
            .filter_map(|sink| sink.path().map(Path::to_path_buf))
            .collect()
    }

    pub(crate) fn begin_configure(&self) -> Result<ConfigureGuard<'_>, ConfigureError> {
        self.configuring
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ConfigureError::AlreadyConfiguring)?;
        Ok(ConfigureGuard { state: self })
    }

    fn dispatch(&self, record: &Record) {
        self.pipeline.load().dispatch(record);
    }
}

/// Clears the in-progress flag when a `configure` call ends, however it ends.
pub(crate) struct ConfigureGuard<'a> {
    state: &'a LoggingState,
}

impl Drop for ConfigureGuard<'_> {
    fn drop(&mut self) {
        self.state.configuring.store(false, Ordering::Release);
    }
}

/// `tracing` layer that hands every event to a [`LoggingState`].
#[derive(Debug, Clone)]
pub struct LoggingLayer {
    state: Arc<LoggingState>,
}

impl<S: Subscriber> Layer<S> for LoggingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.state.dispatch(&Record::from_event(event));
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
