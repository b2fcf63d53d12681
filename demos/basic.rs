//! Minimal reqlog example: a couple of routes behind the request logger.
//!
//! Request records go through the subscriber installed in `main`, next to
//! the server's own startup and shutdown events.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42
//!   curl http://localhost:3000/healthz        # not logged

use http::StatusCode;
use regex::Regex;
use reqlog::middleware::{LogOption, request_logger};
use reqlog::{Level, Router, Server, Sink, handler};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let app = Router::new()
        .with_middleware(request_logger([
            LogOption::Sink(Sink::Global),
            LogOption::skip_paths(["/healthz", "/readyz"]),
            LogOption::SkipPathRegex(Regex::new(r"^/static/").expect("valid pattern")),
            LogOption::ServerErrorLevel(Level::Fatal),
        ]))
        .get("/users/{id}", handler(|w, req| Box::pin(async move {
            let id = req.param("id").unwrap_or("unknown");
            w.headers_mut().insert("content-type", "application/json".parse()?);
            w.write(format!(r#"{{"id":"{id}","name":"alice"}}"#).as_bytes())?;
            Ok(())
        })))
        .post("/users", handler(|w, req| Box::pin(async move {
            if req.body().is_empty() {
                w.write_header(StatusCode::BAD_REQUEST);
                return Ok(());
            }
            w.headers_mut().insert("location", "/users/99".parse()?);
            w.write_header(StatusCode::CREATED);
            w.write(br#"{"id":"99","name":"new_user"}"#)?;
            Ok(())
        })))
        .delete("/users/{id}", handler(|w, _req| Box::pin(async move {
            w.write_header(StatusCode::NO_CONTENT);
            Ok(())
        })))
        .get("/healthz", handler(|w, _req| Box::pin(async move {
            w.write(b"ok")?;
            Ok(())
        })));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}
