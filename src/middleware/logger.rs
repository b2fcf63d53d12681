//! Per-request access logging.
//!
//! ```rust,no_run
//! use reqlog::middleware::{LogOption, request_logger};
//! use reqlog::record::Format;
//! use reqlog::{Level, Router};
//!
//! let app = Router::new()
//!     .with_middleware(request_logger([
//!         LogOption::skip_paths(["/healthz", "/readyz"]),
//!         LogOption::ClientErrorLevel(Level::Info),
//!         LogOption::Format(Format::Json),
//!         LogOption::Utc(true),
//!     ]));
//! # let _ = app;
//! ```
//!
//! Every request that is not skipped produces exactly one record, emitted
//! after the downstream handler returns, whether it failed or not.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use regex::Regex;
use tracing_subscriber::fmt::MakeWriter;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, HandlerResult};
use crate::middleware::Middleware;
use crate::middleware::observer::ResponseObserver;
use crate::record::{self, EmitFn, Format, Level, Output, Record, Sink};
use crate::request::Request;
use crate::writer::ResponseWriter;

const MESSAGE: &str = "Request";

/// One configuration directive. Later directives for the same field win.
pub enum LogOption {
    /// Replace the record factory.
    Emit(EmitFn),
    /// Exact request paths that are never logged.
    SkipPaths(HashSet<String>),
    /// Request paths matching this pattern are never logged.
    SkipPathRegex(Regex),
    /// Timestamp records in UTC rather than local time.
    Utc(bool),
    /// Replace the output sink.
    Sink(Sink),
    /// Line layout for stdout and writer sinks.
    Format(Format),
    /// Force ANSI styling on or off. Unset, only stdout on a terminal is
    /// styled.
    Ansi(bool),
    /// Level for statuses below 400.
    DefaultLevel(Level),
    /// Level for statuses in `400..500`.
    ClientErrorLevel(Level),
    /// Level for statuses of 500 and above.
    ServerErrorLevel(Level),
}

impl LogOption {
    pub fn emit<F>(f: F) -> Self
    where
        F: Fn(&Output, Duration, StatusCode, &Method, &str) -> Record + Send + Sync + 'static,
    {
        Self::Emit(Arc::new(f))
    }

    pub fn skip_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::SkipPaths(paths.into_iter().map(Into::into).collect())
    }

    /// Shorthand for `LogOption::Sink(Sink::writer(make_writer))`.
    pub fn writer<M>(make_writer: M) -> Self
    where
        M: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self::Sink(Sink::writer(make_writer))
    }
}

/// The logging middleware's settings. Read-only once built.
pub struct Config {
    emit: EmitFn,
    output: Output,
    utc: bool,
    skip_paths: HashSet<String>,
    skip_path_regex: Option<Regex>,
    default_level: Level,
    client_error_level: Level,
    server_error_level: Level,
}

/// Output directives, collected until the subscriber is built.
#[derive(Default)]
struct OutputOptions {
    sink: Sink,
    format: Format,
    ansi: Option<bool>,
    utc: bool,
}

impl Config {
    pub fn from_options(options: impl IntoIterator<Item = LogOption>) -> Self {
        let mut out = OutputOptions::default();
        let mut emit: EmitFn = Arc::new(record::default_record);
        let mut skip_paths = HashSet::new();
        let mut skip_path_regex = None;
        let mut default_level = Level::Info;
        let mut client_error_level = Level::Warn;
        let mut server_error_level = Level::Error;

        for option in options {
            match option {
                LogOption::Emit(f)               => emit = f,
                LogOption::SkipPaths(paths)      => skip_paths = paths,
                LogOption::SkipPathRegex(re)     => skip_path_regex = Some(re),
                LogOption::Utc(utc)              => out.utc = utc,
                LogOption::Sink(sink)            => out.sink = sink,
                LogOption::Format(format)        => out.format = format,
                LogOption::Ansi(ansi)            => out.ansi = Some(ansi),
                LogOption::DefaultLevel(l)       => default_level = l,
                LogOption::ClientErrorLevel(l)   => client_error_level = l,
                LogOption::ServerErrorLevel(l)   => server_error_level = l,
            }
        }

        let ansi = out.ansi.unwrap_or_else(|| out.sink.ansi_by_default());
        Self {
            emit,
            output: Output::new(out.sink, out.format, ansi, out.utc),
            utc: out.utc,
            skip_paths,
            skip_path_regex,
            default_level,
            client_error_level,
            server_error_level,
        }
    }

    /// Whether requests for `path` bypass logging. Exact paths are checked
    /// before the pattern.
    pub fn skips(&self, path: &str) -> bool {
        self.skip_paths.contains(path)
            || self.skip_path_regex.as_ref().is_some_and(|re| re.is_match(path))
    }

    /// The level a response with `status` is logged at.
    pub fn level_for(&self, status: StatusCode) -> Level {
        if status.is_server_error() || status.as_u16() >= 600 {
            self.server_error_level
        } else if status.is_client_error() {
            self.client_error_level
        } else {
            self.default_level
        }
    }

    pub fn utc(&self) -> bool {
        self.utc
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_options([])
    }
}

/// Builds the request-logging middleware from zero or more directives.
///
/// With no directives: info/warn/error by status, console records on
/// stdout, local timestamps.
pub fn request_logger(options: impl IntoIterator<Item = LogOption>) -> Middleware {
    let config = Arc::new(Config::from_options(options));
    Arc::new(move |next| wrap(Arc::clone(&config), next))
}

/// Wraps a single handler with an already-built configuration.
pub fn wrap(config: Arc<Config>, next: BoxedHandler) -> BoxedHandler {
    Arc::new(Logged { config, next })
}

struct Logged {
    config: Arc<Config>,
    next: BoxedHandler,
}

impl ErasedHandler for Logged {
    fn call<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let start = Instant::now();

            if self.config.skips(req.path()) {
                return self.next.call(w, req).await;
            }

            let method = req.method().clone();
            let target = req.target().to_owned();

            let mut observer = ResponseObserver::new(w);
            let result = self.next.call(&mut observer, req).await;

            let latency = start.elapsed();
            let status = observer.status();
            let level = self.config.level_for(status);

            (self.config.emit)(&self.config.output, latency, status, &method, &target)
                .emit(level, MESSAGE);

            result
        })
    }
}
