//! Transparent writer interposer that remembers what the handler sent.

use std::io;

use http::{HeaderMap, StatusCode};
use hyper::upgrade::OnUpgrade;

use crate::error::Error;
use crate::writer::ResponseWriter;

/// Wraps the caller's [`ResponseWriter`] for one request and records the
/// status and body size the handler produced.
///
/// Every call is forwarded unchanged, including [`hijack`], so a handler
/// cannot tell it is being observed.
///
/// [`hijack`]: ResponseWriter::hijack
pub struct ResponseObserver<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
    size: u64,
}

impl<'a> ResponseObserver<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self { inner, status: None, size: 0 }
    }

    /// The first status the handler wrote, or `200 OK`.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Body bytes forwarded so far.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl ResponseWriter for ResponseObserver<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.status.get_or_insert(StatusCode::OK);
        let n = self.inner.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    fn hijack(&mut self) -> Result<OnUpgrade, Error> {
        self.inner.hijack()
    }
}
