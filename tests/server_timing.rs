use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use tsu_timing::timing::{self, CrossOrigin, Enabled, Metric, MetricValue, parse_header};
use tsu_timing::{Error, Request, Response, Router, TimingConfig};
use tsu_timing::{end_time, set_metric, start_time};
use tsu_timing::middleware::Next;

fn request(method: Method, uri: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
        .into()
}

fn server_timing(res: &Response) -> Vec<String> {
    res.headers()
        .get_all("server-timing")
        .iter()
        .map(|v| v.to_str().unwrap().to_owned())
        .collect()
}

fn single_header(res: &Response) -> Vec<Metric> {
    let values = server_timing(res);
    assert_eq!(values.len(), 1, "expected exactly one Server-Timing header: {values:?}");
    parse_header(&values[0])
}

fn names(metrics: &[Metric]) -> Vec<&str> {
    metrics.iter().map(Metric::name).collect()
}

async fn get(app: &Router, uri: &str) -> Response {
    app.handle(request(Method::GET, uri)).await
}

// ── handlers ──────────────────────────────────────────────────────────────────

async fn plain(_req: Request) -> &'static str {
    "ok"
}

async fn custom(req: Request) -> &'static str {
    set_metric(&req, "custom", (23.8, "My custom Metric"), None);
    "ok"
}

async fn db(req: Request) -> &'static str {
    start_time(&req, "db", None);
    tokio::time::sleep(Duration::from_millis(187)).await;
    end_time(&req, "db", None);
    "ok"
}

async fn restarted(req: Request) -> &'static str {
    start_time(&req, "db", None);
    tokio::time::sleep(Duration::from_millis(150)).await;
    start_time(&req, "db", None);
    tokio::time::sleep(Duration::from_millis(10)).await;
    end_time(&req, "db", None);
    "ok"
}

async fn forgetful(req: Request) -> &'static str {
    start_time(&req, "first", Some("never ended"));
    start_time(&req, "ended", None);
    end_time(&req, "ended", None);
    start_time(&req, "second", None);
    end_time(&req, "missing", None);
    "ok"
}

async fn mixed(req: Request) -> &'static str {
    set_metric(&req, "a", 1.5, None);
    set_metric(&req, "b", "region eu", None);
    set_metric(&req, "c", MetricValue::Empty, None);
    set_metric(&req, "d", (2.25, "two"), Some(2));
    "ok"
}

async fn failing(req: Request) -> Result<&'static str, std::io::Error> {
    set_metric(&req, "before", 1.0, None);
    Err(std::io::Error::other("boom"))
}

async fn preset(req: Request, next: Next) -> Result<Response, Error> {
    let mut res = next.run(req).await?;
    res.headers_mut().append("server-timing", "edge;dur=0.5".parse().unwrap());
    Ok(res)
}

async fn blank_descriptions(req: Request) -> &'static str {
    set_metric(&req, "a", (1.0, ""), None);
    set_metric(&req, "b", "", None);
    start_time(&req, "c", Some(""));
    "ok"
}

async fn oversized_precision(req: Request) -> &'static str {
    set_metric(&req, "x", 1.0, Some(70_000));
    "ok"
}

// ── properties ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn default_config_emits_total() {
    let app = Router::new().get("/", plain).wrap(timing::timing(TimingConfig::default()));
    let res = get(&app, "/").await;

    let metrics = single_header(&res);
    assert_eq!(names(&metrics), ["total"]);
    assert_eq!(metrics[0].description(), Some("Total Response Time"));
    assert!(metrics[0].duration().is_some());
}

#[tokio::test]
async fn custom_metric_directive() {
    let config = TimingConfig::default().total(false);
    let app = Router::new().get("/", custom).wrap(timing::timing(config));
    let res = get(&app, "/").await;

    assert_eq!(server_timing(&res), [r#"custom;dur=23.8;desc="My custom Metric""#]);
}

#[tokio::test]
async fn timed_section_measures_elapsed_milliseconds() {
    let config = TimingConfig::default().total(false);
    let app = Router::new().get("/", db).wrap(timing::timing(config));
    let res = get(&app, "/").await;

    let metrics = single_header(&res);
    assert_eq!(names(&metrics), ["db"]);
    let ms = metrics[0].duration().unwrap();
    assert!((180.0..400.0).contains(&ms), "db took {ms}ms");
    assert_eq!(metrics[0].precision(), 1);
}

#[tokio::test]
async fn restarting_a_timer_measures_from_the_last_start() {
    let config = TimingConfig::default().total(false);
    let app = Router::new().get("/", restarted).wrap(timing::timing(config));
    let res = get(&app, "/").await;

    let ms = single_header(&res)[0].duration().unwrap();
    assert!(ms < 140.0, "first start was not discarded: {ms}ms");
}

#[tokio::test]
async fn total_is_appended_after_downstream_entries() {
    let app = Router::new().get("/", custom).wrap(timing::timing(TimingConfig::default()));
    let res = get(&app, "/").await;

    assert_eq!(names(&single_header(&res)), ["custom", "total"]);
}

#[tokio::test]
async fn leftover_timers_are_auto_ended_after_total() {
    let app = Router::new().get("/", forgetful).wrap(timing::timing(TimingConfig::default()));
    let res = get(&app, "/").await;

    let metrics = single_header(&res);
    assert_eq!(names(&metrics), ["ended", "total", "first", "second"]);
    assert_eq!(metrics[2].description(), Some("never ended"));
}

#[tokio::test]
async fn auto_end_disabled_drops_leftovers() {
    let config = TimingConfig::default().auto_end(false);
    let app = Router::new().get("/", forgetful).wrap(timing::timing(config));
    let res = get(&app, "/").await;

    assert_eq!(names(&single_header(&res)), ["ended", "total"]);
}

#[tokio::test]
async fn entry_count_matches_calls() {
    for (total, auto_end, expected) in [(true, true, 4), (true, false, 2), (false, true, 3), (false, false, 1)] {
        let config = TimingConfig::default().total(total).auto_end(auto_end);
        let app = Router::new().get("/", forgetful).wrap(timing::timing(config));
        let res = get(&app, "/").await;
        assert_eq!(single_header(&res).len(), expected, "total={total} auto_end={auto_end}");
    }
}

#[tokio::test]
async fn predicate_limits_header_to_get() {
    let config = TimingConfig::default()
        .enabled(Enabled::when(|x| x.method() == Method::GET));
    let app = Router::new()
        .get("/", custom)
        .post("/", custom)
        .wrap(timing::timing(config));

    let res = app.handle(request(Method::POST, "/")).await;
    assert!(server_timing(&res).is_empty());

    let res = get(&app, "/").await;
    assert_eq!(server_timing(&res).len(), 1);
}

#[tokio::test]
async fn predicate_sees_response_status() {
    async fn created(_req: Request) -> StatusCode {
        StatusCode::CREATED
    }

    let config = TimingConfig::default()
        .enabled(Enabled::when(|x| x.status().is_success() && x.status() != StatusCode::CREATED));
    let app = Router::new().get("/", created).wrap(timing::timing(config));
    assert!(server_timing(&get(&app, "/").await).is_empty());
}

#[tokio::test]
async fn no_entries_means_no_header() {
    let config = TimingConfig::default().total(false);
    let app = Router::new().get("/", plain).wrap(timing::timing(config));
    assert!(server_timing(&get(&app, "/").await).is_empty());
}

#[tokio::test]
async fn disabled_emits_nothing() {
    let config = TimingConfig::default().enabled(false);
    let app = Router::new().get("/", custom).wrap(timing::timing(config));
    assert!(server_timing(&get(&app, "/").await).is_empty());
}

#[tokio::test]
async fn existing_server_timing_values_are_kept() {
    let app = Router::new()
        .get("/", custom)
        .wrap(timing::timing(TimingConfig::default().total(false)))
        .wrap(preset);
    let res = get(&app, "/").await;

    // `preset` is innermost, so its value lands first.
    assert_eq!(
        server_timing(&res),
        ["edge;dur=0.5", r#"custom;dur=23.8;desc="My custom Metric""#],
    );
}

#[tokio::test]
async fn handler_error_skips_header() {
    let app = Router::new().get("/", failing).wrap(timing::timing(TimingConfig::default()));
    let res = get(&app, "/").await;

    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(server_timing(&res).is_empty());
}

#[tokio::test]
async fn routes_without_middleware_still_work() {
    let app = Router::new().get("/", forgetful);
    let res = get(&app, "/").await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(server_timing(&res).is_empty());
}

#[tokio::test]
async fn header_round_trips_recorded_triples() {
    let config = TimingConfig::default().total(false);
    let app = Router::new().get("/", mixed).wrap(timing::timing(config));
    let res = get(&app, "/").await;

    let triples: Vec<_> = single_header(&res)
        .iter()
        .map(|m| (m.name().to_owned(), m.duration(), m.description().map(str::to_owned)))
        .collect();
    assert_eq!(
        triples,
        [
            ("a".to_owned(), Some(1.5), None),
            ("b".to_owned(), None, Some("region eu".to_owned())),
            ("c".to_owned(), None, None),
            ("d".to_owned(), Some(2.25), Some("two".to_owned())),
        ],
    );
}

#[tokio::test]
async fn cross_origin_sets_timing_allow_origin() {
    let app = Router::new()
        .get("/", plain)
        .wrap(timing::timing(TimingConfig::default().cross_origin(true)));
    let res = get(&app, "/").await;
    assert_eq!(res.headers()["timing-allow-origin"], "*");

    let app = Router::new()
        .get("/", plain)
        .wrap(timing::timing(TimingConfig::default().cross_origin("https://app.example")));
    let res = get(&app, "/").await;
    assert_eq!(res.headers()["timing-allow-origin"], "https://app.example");

    let config = TimingConfig::default()
        .cross_origin(CrossOrigin::when(|x| x.request_headers().get("origin").map(|o| o.to_str().unwrap_or("").to_owned())));
    let app = Router::new().get("/", plain).wrap(timing::timing(config));
    let res = get(&app, "/").await;
    assert!(res.headers().get("timing-allow-origin").is_none());
}

#[tokio::test]
async fn cross_origin_follows_enabled() {
    let config = TimingConfig::default().cross_origin(true).enabled(false);
    let app = Router::new().get("/", plain).wrap(timing::timing(config));
    let res = get(&app, "/").await;
    assert!(res.headers().get("timing-allow-origin").is_none());
}

#[tokio::test]
async fn each_request_gets_a_fresh_registry() {
    let config = TimingConfig::default().total(false);
    let app = Router::new().get("/", custom).wrap(timing::timing(config));

    let (a, b) = tokio::join!(get(&app, "/"), get(&app, "/"));
    assert_eq!(single_header(&a).len(), 1);
    assert_eq!(single_header(&b).len(), 1);
}

#[tokio::test]
async fn nested_timing_replaces_outer_registry() {
    let app = Router::new()
        .get("/", custom)
        .wrap(timing::timing(TimingConfig::default().total_description("outer")))
        .wrap(timing::timing(TimingConfig::default().total_description("inner")));
    let res = get(&app, "/").await;

    let values = server_timing(&res);
    assert_eq!(values.len(), 2);
    let inner = parse_header(&values[0]);
    let outer = parse_header(&values[1]);
    assert_eq!(names(&inner), ["custom", "total"]);
    assert_eq!(inner[1].description(), Some("inner"));
    assert_eq!(names(&outer), ["total"]);
    assert_eq!(outer[0].description(), Some("outer"));
}

#[tokio::test]
async fn empty_descriptions_are_omitted() {
    let config = TimingConfig::default().total_description("");
    let app = Router::new().get("/", blank_descriptions).wrap(timing::timing(config));
    let res = get(&app, "/").await;

    let values = server_timing(&res);
    assert_eq!(values.len(), 1);
    assert!(!values[0].contains("desc="), "{}", values[0]);
    assert!(values[0].starts_with("a;dur=1.0,b,total;dur="), "{}", values[0]);

    let metrics = parse_header(&values[0]);
    assert_eq!(names(&metrics), ["a", "b", "total", "c"]);
    assert!(metrics.iter().all(|m| m.description().is_none()));
    assert!(metrics[2].duration().is_some());
    assert!(metrics[3].duration().is_some());
}

#[tokio::test]
async fn oversized_precision_is_capped() {
    let config = TimingConfig::default().total(false);
    let app = Router::new().get("/", oversized_precision).wrap(timing::timing(config));
    let res = get(&app, "/").await;

    assert_eq!(res.status_code(), StatusCode::OK);
    let metrics = single_header(&res);
    assert_eq!(names(&metrics), ["x"]);
    assert_eq!(metrics[0].precision(), timing::MAX_PRECISION);
    assert_eq!(metrics[0].duration(), Some(1.0));
}
