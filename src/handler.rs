//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of *different* types in a single
//! `HashMap<Method, Tree>`, and middleware needs to wrap any of them. Both
//! work on trait objects (`dyn ErasedHandler`) so every handler, wrapped or
//! not, has one concrete type: [`BoxedHandler`].
//!
//! ```text
//! handler(|w, req| Box::pin(async move { … }))   ← user writes this
//!        ↓ router.get("/", h)
//! h.into_boxed_handler()                          ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(h))                          ← heap-allocated wrapper
//!        ↓  middleware(boxed) → BoxedHandler      ← each layer wraps the last
//! handler.call(&mut writer, req)  at request time ← one vtable dispatch per layer
//! ```
//!
//! Handlers borrow the response writer for the duration of their future,
//! which is why the future type carries the writer's lifetime `'a`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BoxError;
use crate::request::Request;
use crate::writer::ResponseWriter;

/// A heap-allocated, type-erased future borrowing from its caller for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What every handler resolves to. `Err` travels back through middleware
/// untouched.
pub type HandlerResult = Result<(), BoxError>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because middleware outside this crate has to call it
/// on the [`BoxedHandler`] it wraps.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a, HandlerResult>;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any closure of the
/// shape
///
/// ```text
/// for<'a> Fn(&'a mut dyn ResponseWriter, Request) -> BoxFuture<'a, HandlerResult>
/// ```
///
/// Pass closures through [`handler`] so the compiler infers that
/// higher-ranked signature.
///
/// The trait is **sealed** (via the private `Sealed` supertrait).
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F> private::Sealed for F
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, Request) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, Request) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Identity function that fixes a closure's signature to the handler shape.
///
/// ```rust
/// use reqlog::{handler, ResponseWriter};
/// use http::StatusCode;
///
/// let h = handler(|w, _req| Box::pin(async move {
///     w.write_header(StatusCode::NO_CONTENT);
///     Ok(())
/// }));
/// # let _ = h;
/// ```
pub fn handler<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, Request) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    f
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F> ErasedHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, Request) -> BoxFuture<'a, HandlerResult>,
{
    fn call<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a, HandlerResult> {
        (self.0)(w, req)
    }
}
