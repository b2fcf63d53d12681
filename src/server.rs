//! Hyper adapter: serves a [`Router`] over TCP.
//!
//! Each request body is buffered, routed into a [`Recorder`] and sent back
//! as one response. Connections keep upgrades enabled so a handler can take
//! over the socket through [`ResponseWriter::hijack`].

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::router::Router;
use crate::writer::{Recorder, ResponseWriter};

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use reqlog::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then waits for open
    /// connections to finish.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `shutdown` resolves.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);
        let mut connections = JoinSet::new();
        info!(addr = %self.addr, "reqlog listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(Arc::clone(&router), stream, peer));
                    }
                    Err(e) => error!("accept error: {e}"),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(open = connections.len(), "reqlog draining connections");
        while connections.join_next().await.is_some() {}
        info!("reqlog stopped");
        Ok(())
    }
}

async fn serve_connection(router: Arc<Router>, stream: TcpStream, peer: SocketAddr) {
    let service = service_fn(move |req| dispatch(Arc::clone(&router), req));
    let served = ConnBuilder::new(TokioExecutor::new())
        .serve_connection_with_upgrades(TokioIo::new(stream), service)
        .await;
    if let Err(e) = served {
        debug!(%peer, "connection closed with error: {e}");
    }
}

/// Buffers one request, routes it into a [`Recorder`], and converts the
/// recorder into the hyper response.
///
/// Handler errors never reach hyper: they are logged here and turned into a
/// `500` when the handler had not written a status yet.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (mut parts, body) = req.into_parts();
    let on_upgrade = parts.extensions.remove::<OnUpgrade>();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            let mut rec = Recorder::new();
            rec.write_header(http::StatusCode::BAD_REQUEST);
            return Ok(rec.into_response());
        }
    };

    let mut rec = match on_upgrade {
        Some(on_upgrade) => Recorder::new().with_upgrade(on_upgrade),
        None => Recorder::new(),
    };

    if let Err(e) = router.serve_http(&mut rec, Request::from_parts(parts, body)).await {
        error!(error = %e, "handler error");
        if !rec.header_written() {
            rec.write_header(http::StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    Ok(rec.into_response())
}

/// SIGTERM or Ctrl-C, whichever comes first.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    let _ = tokio::signal::ctrl_c().await;
}
