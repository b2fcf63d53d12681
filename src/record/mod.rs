//! Request records as `tracing` events.
//!
//! The logging middleware asks a factory ([`EmitFn`]) for a [`Record`]
//! describing the finished request, then emits it once at the level the
//! status maps to. Emission is a `tracing` event with target
//! [`TARGET`] and the fields `status`, `latency` (fractional milliseconds),
//! `method` and `path`.
//!
//! Each middleware instance owns an [`Output`]: a `tracing_subscriber::fmt`
//! subscriber built from its sink, layout, ANSI and UTC directives. Events
//! are dispatched to it with [`tracing::dispatcher::with_default`], so they
//! never leak into the application's own subscriber. [`Sink::Global`] skips
//! the private subscriber and lets the installed one filter and format
//! request records like any other event.
//!
//! | Layout | Output |
//! |---|---|
//! | [`Format::Console`] | `2026-10-19T14:03:11.204+02:00  INFO Request status=200 latency=1.2 method=GET path=/` |
//! | [`Format::Json`] | `{"timestamp":"...","level":"INFO","message":"Request","status":200,...}` |

mod level;
mod sink;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc, FormatTime};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub use level::Level;
pub use sink::Sink;

#[cfg(test)]
pub(crate) use sink::testing;

/// Target of every request event.
pub const TARGET: &str = "reqlog::request";

/// RFC 3339 with milliseconds.
const UTC_TIME: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
const LOCAL_TIME: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Builds the record for one finished request from
/// `(output, latency, status, method, path)`.
pub type EmitFn =
    Arc<dyn Fn(&Output, Duration, StatusCode, &Method, &str) -> Record + Send + Sync>;

/// Line layout of a writer sink.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    /// `tracing_subscriber`'s full human-readable layout.
    #[default]
    Console,
    /// One flattened JSON object per line.
    Json,
}

/// The subscriber request events are dispatched to.
#[derive(Clone, Debug)]
pub struct Output {
    dispatch: Option<Dispatch>,
}

impl Output {
    /// Builds a private subscriber writing to `sink`. [`Sink::Global`]
    /// ignores the other arguments.
    pub fn new(sink: Sink, format: Format, ansi: bool, utc: bool) -> Self {
        let writer = match sink {
            Sink::Stdout => BoxMakeWriter::new(io::stdout),
            Sink::Writer(writer) => writer,
            Sink::Global => return Self::global(),
        };
        let dispatch = if utc {
            subscriber(writer, ChronoUtc::new(UTC_TIME.to_owned()), format, ansi)
        } else {
            subscriber(writer, ChronoLocal::new(LOCAL_TIME.to_owned()), format, ansi)
        };
        Self { dispatch: Some(dispatch) }
    }

    /// Events go to the subscriber in effect where they are emitted.
    pub fn global() -> Self {
        Self { dispatch: None }
    }

    fn scope(&self, f: impl FnOnce()) {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

fn subscriber<T>(writer: BoxMakeWriter, timer: T, format: Format, ansi: bool) -> Dispatch
where
    T: FormatTime + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_timer(timer)
        .with_max_level(LevelFilter::TRACE)
        .with_target(false);

    match format {
        Format::Console => Dispatch::new(builder.with_ansi(ansi).finish()),
        Format::Json => Dispatch::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .finish(),
        ),
    }
}

/// One finished request, waiting to be emitted.
///
/// Fields are public so a custom factory can rewrite them (strip a query,
/// redact a segment) or point the record at another [`Output`].
#[derive(Clone, Debug)]
pub struct Record {
    pub output: Output,
    pub status: StatusCode,
    pub latency: Duration,
    pub method: Method,
    pub path: String,
}

impl Record {
    /// Emits the record once as a `tracing` event at `level`.
    pub fn emit(&self, level: Level, message: &str) {
        let status = self.status.as_u16();
        let latency = self.latency.as_nanos() as f64 / 1e6;
        let method = self.method.as_str();
        let path = self.path.as_str();

        self.output.scope(|| match level {
            Level::Trace => tracing::trace!(target: TARGET, status, latency, method = %method, path = %path, "{}", message),
            Level::Debug => tracing::debug!(target: TARGET, status, latency, method = %method, path = %path, "{}", message),
            Level::Info  => tracing::info!(target: TARGET, status, latency, method = %method, path = %path, "{}", message),
            Level::Warn  => tracing::warn!(target: TARGET, status, latency, method = %method, path = %path, "{}", message),
            Level::Error => tracing::error!(target: TARGET, status, latency, method = %method, path = %path, "{}", message),
            Level::Fatal => tracing::error!(target: TARGET, status, latency, method = %method, path = %path, fatal = true, "{}", message),
        });
    }
}

/// The default factory: every field as observed.
pub fn default_record(
    output: &Output,
    latency: Duration,
    status: StatusCode,
    method: &Method,
    path: &str,
) -> Record {
    Record {
        output: output.clone(),
        status,
        latency,
        method: method.clone(),
        path: path.to_owned(),
    }
}
