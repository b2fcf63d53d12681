//! # reqlog
//!
//! Structured request logging for a minimal hyper router. One record per
//! request, with the level picked from the response status.
//!
//! ## The contract
//!
//! Handlers write into a [`ResponseWriter`] and return `Ok(())` or an error.
//! Middleware maps a handler to a handler. [`middleware::request_logger`]
//! wraps each handler so that, after it returns, a record like
//!
//! ```text
//! 2026-10-19T14:03:11.204+02:00  WARN Request status=404 latency=0.183 method=GET path=/user/42
//! ```
//!
//! is emitted as a `tracing` event to the configured sink:
//!
//! | Status | Level (default) |
//! |---|---|
//! | `< 400` | `info` |
//! | `400..500` | `warn` |
//! | `>= 500` | `error` |
//!
//! The handler's error comes back untouched; the record is written either way.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use reqlog::middleware::{LogOption, request_logger};
//! use reqlog::{Level, Router, Server, handler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .with_middleware(request_logger([
//!             LogOption::skip_paths(["/healthz"]),
//!             LogOption::ServerErrorLevel(Level::Fatal),
//!         ]))
//!         .get("/user/{name}", handler(|w, req| Box::pin(async move {
//!             let name = req.param("name").unwrap_or("stranger");
//!             w.write(format!("hello {name}").as_bytes())?;
//!             Ok(())
//!         })))
//!         .get("/healthz", handler(|w, _req| Box::pin(async move {
//!             w.write_header(StatusCode::OK);
//!             Ok(())
//!         })));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```

mod error;
mod handler;
mod request;
mod router;
mod server;
mod writer;

pub mod middleware;
pub mod record;

pub use error::{BoxError, Error};
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, HandlerResult, handler};
pub use record::{Level, Record, Sink};
pub use request::Request;
pub use router::Router;
pub use server::Server;
pub use writer::{Recorder, ResponseWriter};
