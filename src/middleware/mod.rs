//! Middleware layer.
//!
//! A middleware maps a handler to a handler. The router applies each one at
//! registration time, so the per-request cost is one extra virtual call per
//! layer.
//!
//! Built-in middleware:
//! - [`request_logger`]: one structured record per request with method,
//!   path, status, and latency

mod logger;
mod observer;

use std::sync::Arc;

use crate::handler::BoxedHandler;

pub use logger::{Config, LogOption, request_logger, wrap};
pub use observer::ResponseObserver;

/// A function that wraps a handler.
pub type Middleware = Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync>;
