//! The response sink handlers write into.
//!
//! Handlers never build a response value. They get a `&mut dyn ResponseWriter`
//! and drive it: headers first, then the status line, then body bytes. This
//! mirrors how the bytes leave the server, and lets middleware interpose on
//! the writer to watch what the handler did.
//!
//! ```text
//! handler ── write_header(404) ──▶ ResponseObserver ──▶ Recorder ──▶ hyper
//!         ── write(b"gone")    ──▶ (status, size)
//! ```

use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use hyper::upgrade::OnUpgrade;

use crate::error::Error;

/// A handler's view of the outgoing response.
///
/// Only `headers_mut`, `write_header` and `write` are required. `hijack` has
/// a default that reports the capability as missing, so writers which cannot
/// hand over their connection get the right behaviour for free.
pub trait ResponseWriter: Send {
    /// Response headers. Changes after the header is written are ignored.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the status line. Only the first call has an effect.
    fn write_header(&mut self, status: StatusCode);

    /// Appends body bytes, writing a `200 OK` header first if none was sent.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Takes over the underlying connection once the response head is sent.
    ///
    /// The returned future resolves to the raw connection after the server
    /// has written a `101 Switching Protocols` response.
    fn hijack(&mut self) -> Result<OnUpgrade, Error> {
        Err(Error::HijackNotSupported)
    }
}

// ── Recorder ─────────────────────────────────────────────────────────────────

enum Upgrade {
    Unsupported,
    Pending(OnUpgrade),
    Taken,
}

/// An in-memory [`ResponseWriter`].
///
/// The server dispatches every request into a `Recorder` and turns it into
/// the hyper response once the handler returns. Tests use it the same way.
pub struct Recorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    upgrade: Upgrade,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            status: None,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            upgrade: Upgrade::Unsupported,
        }
    }

    /// A recorder whose `hijack` hands out the connection's pending upgrade.
    pub(crate) fn with_upgrade(mut self, on_upgrade: OnUpgrade) -> Self {
        self.upgrade = Upgrade::Pending(on_upgrade);
        self
    }

    /// The written status, or `200 OK` if the handler never wrote one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn header_written(&self) -> bool {
        self.status.is_some()
    }

    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let status = self.status();
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = status;
        *res.headers_mut() = self.headers;
        res
    }
}

impl Default for Recorder {
    fn default() -> Self { Self::new() }
}

impl ResponseWriter for Recorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(first) => {
                tracing::debug!(first = %first, ignored = %status, "superfluous write_header call");
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn hijack(&mut self) -> Result<OnUpgrade, Error> {
        match std::mem::replace(&mut self.upgrade, Upgrade::Taken) {
            Upgrade::Pending(on_upgrade) => Ok(on_upgrade),
            Upgrade::Taken => Err(Error::AlreadyHijacked),
            Upgrade::Unsupported => {
                self.upgrade = Upgrade::Unsupported;
                Err(Error::HijackNotSupported)
            }
        }
    }
}
