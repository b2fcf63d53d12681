//! End-to-end tests for the request logger, driven through the router.
//!
//! Records are captured in an in-memory writer sink. Most tests use the JSON
//! layout so fields can be asserted directly; the default-layout test parses
//! the console line, which a writer sink never styles.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::{Method, StatusCode, Uri};
use regex::Regex;
use reqlog::middleware::{LogOption, request_logger};
use reqlog::record::{Format, Sink};
use reqlog::{BoxError, Level, Recorder, Request, Router, handler};
use tracing_subscriber::fmt::MakeWriter;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Shared in-memory record sink.
#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Buffer {
    type Writer = Buffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn buffer() -> Buffer {
    Buffer::default()
}

fn output(buf: &Buffer) -> String {
    String::from_utf8(buf.0.lock().unwrap().clone()).unwrap()
}

fn json_records(buf: &Buffer) -> Vec<serde_json::Value> {
    output(buf)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Router with one route per status under `/status/{code}` and a plain
/// `/user/{param}` route that never writes a status.
fn app(options: Vec<LogOption>) -> Router {
    Router::new()
        .with_middleware(request_logger(options))
        .get("/user/{param}", handler(|_w, req| Box::pin(async move {
            assert_eq!(req.param("param"), Some("hello"));
            Ok(())
        })))
        .get("/status/{code}", handler(|w, req| Box::pin(async move {
            let code: u16 = req.param("code").unwrap_or("200").parse()?;
            w.write_header(StatusCode::from_u16(code)?);
            Ok(())
        })))
        .get("/health", handler(|_w, _req| Box::pin(async { Ok(()) })))
        .get("/other", handler(|_w, _req| Box::pin(async { Ok(()) })))
}

async fn get(app: &Router, target: &'static str) -> Recorder {
    let mut rec = Recorder::new();
    app.serve_http(&mut rec, Request::new(Method::GET, Uri::from_static(target)))
        .await
        .unwrap();
    rec
}

fn json_options(buf: &Buffer) -> Vec<LogOption> {
    vec![LogOption::writer(buf.clone()), LogOption::Format(Format::Json)]
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn default_factory_logs_success_at_info() {
    let buf = buffer();
    let app = app(vec![LogOption::writer(buf.clone())]);

    get(&app, "/user/hello").await;

    let out = output(&buf);
    assert!(!out.contains('\x1b'), "{out:?}");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 1, "{out}");

    let line = Regex::new(
        r"^(\S+) +INFO Request status=200 latency=(\S+) method=GET path=/user/hello$",
    )
    .unwrap();
    let caps = line.captures(lines[0]).unwrap_or_else(|| panic!("unexpected layout: {}", lines[0]));
    assert!(chrono::DateTime::parse_from_rfc3339(&caps[1]).is_ok());
    assert!(caps[2].parse::<f64>().unwrap() >= 0.0);
}

#[tokio::test]
async fn client_error_logs_at_warn() {
    let buf = buffer();
    let app = app(json_options(&buf));

    get(&app, "/status/404").await;

    let recs = json_records(&buf);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["status"], 404);
    assert_eq!(recs[0]["level"], "WARN");
    assert_eq!(recs[0]["message"], "Request");
}

#[tokio::test]
async fn server_error_logs_at_error() {
    let buf = buffer();
    let app = app(json_options(&buf));

    get(&app, "/status/503").await;

    let recs = json_records(&buf);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["status"], 503);
    assert_eq!(recs[0]["level"], "ERROR");
}

#[tokio::test]
async fn custom_levels_apply() {
    let buf = buffer();
    let mut options = json_options(&buf);
    options.extend([
        LogOption::DefaultLevel(Level::Debug),
        LogOption::ClientErrorLevel(Level::Error),
        LogOption::ServerErrorLevel(Level::Fatal),
    ]);
    let app = app(options);

    get(&app, "/status/200").await;
    get(&app, "/status/500").await;
    get(&app, "/status/418").await;

    let recs = json_records(&buf);
    let levels: Vec<_> = recs
        .iter()
        .map(|r| r["level"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(levels, ["DEBUG", "ERROR", "ERROR"]);
    assert_eq!(recs[1]["fatal"], true);
    assert!(recs[2].get("fatal").is_none());
}

#[tokio::test]
async fn exact_skip_path_suppresses_record() {
    let buf = buffer();
    let mut options = json_options(&buf);
    options.push(LogOption::skip_paths(["/health"]));
    let app = app(options);

    get(&app, "/health").await;
    assert!(json_records(&buf).is_empty());

    get(&app, "/other").await;
    let recs = json_records(&buf);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["path"], "/other");
}

#[tokio::test]
async fn pattern_skip_still_runs_handler() {
    let buf = buffer();
    let mut options = json_options(&buf);
    options.push(LogOption::SkipPathRegex(Regex::new(r"^/status/5\d\d$").unwrap()));
    let app = app(options);

    let rec = get(&app, "/status/502").await;
    assert_eq!(rec.status(), StatusCode::BAD_GATEWAY);
    assert!(json_records(&buf).is_empty());

    get(&app, "/status/201").await;
    assert_eq!(json_records(&buf).len(), 1);
}

#[derive(Debug)]
struct Exploded(&'static str);

impl fmt::Display for Exploded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exploded: {}", self.0)
    }
}

impl std::error::Error for Exploded {}

#[tokio::test]
async fn handler_error_is_returned_and_logged() {
    let buf = buffer();
    let app = Router::new()
        .with_middleware(request_logger(json_options(&buf)))
        .post("/jobs", handler(|w, _req| Box::pin(async move {
            w.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            Err(Box::new(Exploded("queue full")) as BoxError)
        })));

    let mut rec = Recorder::new();
    let err = app
        .serve_http(&mut rec, Request::new(Method::POST, Uri::from_static("/jobs")))
        .await
        .unwrap_err();

    let exploded = err.downcast_ref::<Exploded>().expect("same error value");
    assert_eq!(exploded.0, "queue full");

    let recs = json_records(&buf);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["status"], 500);
    assert_eq!(recs[0]["level"], "ERROR");
    assert_eq!(recs[0]["method"], "POST");
}

#[tokio::test]
async fn latency_covers_handler_time() {
    let buf = buffer();
    let app = Router::new()
        .with_middleware(request_logger(json_options(&buf)))
        .get("/slow", handler(|w, _req| Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            w.write(b"done")?;
            Ok(())
        })));

    let rec = get(&app, "/slow").await;
    assert_eq!(rec.body(), b"done");

    let recs = json_records(&buf);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["status"], 200);
    assert!(recs[0]["latency"].as_f64().unwrap() >= 20.0);
}

#[tokio::test]
async fn query_is_logged_but_not_matched() {
    let buf = buffer();
    let mut options = json_options(&buf);
    options.push(LogOption::skip_paths(["/health"]));
    let app = app(options);

    get(&app, "/health?probe=liveness").await;
    get(&app, "/other?page=2").await;

    let recs = json_records(&buf);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["path"], "/other?page=2");
}

#[tokio::test]
async fn unmatched_routes_are_not_logged() {
    // Middleware wraps registered handlers; the router's 404 fallback is
    // outside every chain.
    let buf = buffer();
    let app = app(json_options(&buf));

    let rec = get(&app, "/missing").await;
    assert_eq!(rec.status(), StatusCode::NOT_FOUND);
    assert!(json_records(&buf).is_empty());
}

#[tokio::test]
async fn utc_timestamps_end_in_z() {
    let buf = buffer();
    let mut options = json_options(&buf);
    options.push(LogOption::Utc(true));
    let app = app(options);

    get(&app, "/other").await;

    let recs = json_records(&buf);
    let time = recs[0]["timestamp"].as_str().unwrap();
    assert!(time.ends_with('Z'), "{time}");
}

fn failing_app(options: Vec<LogOption>) -> Router {
    Router::new()
        .with_middleware(request_logger(options))
        .get("/h", handler(|_w, _req| Box::pin(async move {
            Err(Box::new(Exploded("boom")) as BoxError)
        })))
        .get("/internal/{job}", handler(|_w, _req| Box::pin(async move {
            Err(Box::new(Exploded("boom")) as BoxError)
        })))
}

#[tokio::test]
async fn skipped_paths_return_handler_errors_without_records() {
    let buf = buffer();
    let mut options = json_options(&buf);
    options.extend([
        LogOption::skip_paths(["/h"]),
        LogOption::SkipPathRegex(Regex::new(r"^/internal/").unwrap()),
    ]);
    let app = failing_app(options);

    for target in ["/h", "/internal/reindex"] {
        let mut rec = Recorder::new();
        let err = app
            .serve_http(&mut rec, Request::new(Method::GET, Uri::from_static(target)))
            .await
            .unwrap_err();
        let exploded = err.downcast_ref::<Exploded>().expect("same error value");
        assert_eq!(exploded.0, "boom", "{target}");
    }
    assert!(output(&buf).is_empty());
}

#[tokio::test]
async fn global_sink_goes_through_the_installed_subscriber() {
    let buf = buffer();
    let installed = tracing_subscriber::fmt()
        .with_writer(buf.clone())
        .with_max_level(tracing::Level::WARN)
        .json()
        .flatten_event(true)
        .finish();
    let _guard = tracing::subscriber::set_default(installed);

    let app = app(vec![LogOption::Sink(Sink::Global)]);
    get(&app, "/status/200").await;
    get(&app, "/status/404").await;

    let recs = json_records(&buf);
    assert_eq!(recs.len(), 1, "info is below the installed filter");
    assert_eq!(recs[0]["status"], 404);
    assert_eq!(recs[0]["target"], "reqlog::request");
}
