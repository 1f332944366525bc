//! Minimal tsu-timing example — every route reports Server-Timing.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/users/42
//!   curl -i -X POST http://localhost:3000/users -d '{"name":"alice"}'   # no header: GET only

use std::time::Duration;

use http::{Method, StatusCode};
use tsu_timing::timing::{self, Enabled};
use tsu_timing::{Request, Response, Router, Server, TimingConfig};
use tsu_timing::{end_time, set_metric, start_time};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = TimingConfig::default()
        .enabled(Enabled::when(|x| x.method() == Method::GET))
        .cross_origin(true);

    let app = Router::new()
        .get("/", hello)
        .get("/users/{id}", get_user)
        .post("/users", create_user)
        .wrap(timing::timing(config));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

async fn hello(_req: Request) -> &'static str {
    "Hello tsu!"
}

// GET /users/{id}
//
// server-timing: db;dur=25.1;desc="User lookup",cache;desc="miss",
//                render;dur=0.3,total;dur=25.6;desc="Total Response Time"
async fn get_user(req: Request) -> Response {
    start_time(&req, "db", Some("User lookup"));
    tokio::time::sleep(Duration::from_millis(25)).await;
    end_time(&req, "db", None);

    set_metric(&req, "cache", "miss", None);

    let id = req.param("id").unwrap_or("unknown").to_owned();
    timing::time(&req, "render", None, async move {
        Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
    })
    .await
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    // Left running on purpose: the middleware closes it before the header
    // is built.
    start_time(&req, "validate", None);

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}
