//! Where request records go.

use std::fmt;
use std::io::{self, IsTerminal as _};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Destination of request records.
#[derive(Default)]
pub enum Sink {
    /// Process standard output.
    #[default]
    Stdout,
    /// Any [`MakeWriter`]: a file, an in-memory buffer, a non-blocking
    /// appender.
    Writer(BoxMakeWriter),
    /// Whatever subscriber is installed for the calling thread or process.
    /// Its filter, layout and timer apply; the format, ANSI and UTC
    /// directives do not.
    Global,
}

impl Sink {
    pub fn writer<M>(make_writer: M) -> Self
    where
        M: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self::Writer(BoxMakeWriter::new(make_writer))
    }

    /// ANSI styling when no directive chose: only for stdout on a terminal.
    pub(crate) fn ansi_by_default(&self) -> bool {
        matches!(self, Self::Stdout) && io::stdout().is_terminal()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout    => f.write_str("Stdout"),
            Self::Writer(_) => f.write_str("Writer(..)"),
            Self::Global    => f.write_str("Global"),
        }
    }
}
