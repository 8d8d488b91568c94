//! End-to-end tests for the scraping pipeline against mock tracker and
//! FlareSolverr servers.

use reqwest::Client;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tracker_exporter::config::TrackerConfig;
use tracker_exporter::http_client::{build_outbound_client, DEFAULT_TIMEOUT, USER_AGENT};
use tracker_exporter::scrapers::{FlareSolverrClient, ScrapeError, ScrapingClient};

const PROFILE: &str = r#"
<table>
  <tr><td>Uploaded</td><td>3.03 TB</td></tr>
  <tr><td>Downloaded</td><td>575.67 GiB</td></tr>
  <tr><td>Ratio</td><td>5.39 <span>&gt;= 1.0</span></td></tr>
</table>
"#;

fn http() -> Client {
    build_outbound_client(USER_AGENT, DEFAULT_TIMEOUT, None).unwrap()
}

fn tracker_config(server: &MockServer) -> TrackerConfig {
    TrackerConfig::scraping(
        "TL",
        &format!("{}/profile", server.uri()),
        "uid=1; pass=old_pass",
    )
}

fn solver_for(server: &MockServer) -> FlareSolverrClient {
    FlareSolverrClient::new(&format!("{}/v1", server.uri()), 5_000, None).unwrap()
}

#[tokio::test]
async fn test_success_extracts_stats_and_sends_cookie() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("cookie", "uid=1; pass=old_pass"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PROFILE))
        .expect(1)
        .mount(&tracker)
        .await;

    let client = ScrapingClient::new(tracker_config(&tracker), http(), None).unwrap();
    let stats = client.scrape().await.unwrap();

    assert_eq!(stats.uploaded, Some(3331520232161));
    assert_eq!(stats.downloaded, Some(618120955822));
    assert_eq!(stats.ratio, Some(5.39));
    assert_eq!(stats.buffer, None);
}

#[tokio::test]
async fn test_blocked_without_solver() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&tracker)
        .await;

    let client = ScrapingClient::new(tracker_config(&tracker), http(), None).unwrap();
    let err = client.scrape().await.unwrap_err();

    assert!(matches!(err, ScrapeError::Blocked { status: 403, .. }));
    assert_eq!(err.to_string(), "Failed to fetch page from TL: 403 Forbidden");
}

#[tokio::test]
async fn test_blocked_with_failing_solver() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&tracker)
        .await;

    let solver = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "Challenge not solved"
        })))
        .expect(1)
        .mount(&solver)
        .await;

    let client =
        ScrapingClient::new(tracker_config(&tracker), http(), Some(solver_for(&solver))).unwrap();
    let err = client.scrape().await.unwrap_err();

    assert!(matches!(err, ScrapeError::ChallengeFailed { .. }));
    let message = err.to_string();
    assert!(message.contains("TL"));
    assert!(message.contains("403"));
    assert!(message.contains("FlareSolverr failed: Challenge not solved"));
}

#[tokio::test]
async fn test_solver_still_blocked() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&tracker)
        .await;

    let solver = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message": "",
            "solution": { "status": 403, "response": "", "cookies": [] }
        })))
        .mount(&solver)
        .await;

    let client =
        ScrapingClient::new(tracker_config(&tracker), http(), Some(solver_for(&solver))).unwrap();
    let message = client.scrape().await.unwrap_err().to_string();

    assert!(message.contains("503"));
    assert!(message.contains("Target site returned 403 after FlareSolverr attempt."));
}

#[tokio::test]
async fn test_set_cookie_rotation_is_persisted() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "pass=new_pass; Path=/; HttpOnly")
                .set_body_string(PROFILE),
        )
        .mount(&tracker)
        .await;

    let dir = tempdir().unwrap();
    let cookie_file = dir.path().join("tl.cookie");
    let config = tracker_config(&tracker).with_cookie_file(&cookie_file);
    let client = ScrapingClient::new(config, http(), None).unwrap();

    client.scrape().await.unwrap();

    assert_eq!(client.cookie().await, "uid=1; pass=new_pass");
    assert_eq!(
        std::fs::read_to_string(&cookie_file).unwrap().trim(),
        "uid=1; pass=new_pass"
    );
}

#[tokio::test]
async fn test_rotation_on_blocked_response_is_kept() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).insert_header("set-cookie", "uid=2"))
        .mount(&tracker)
        .await;

    let client = ScrapingClient::new(tracker_config(&tracker), http(), None).unwrap();
    assert!(client.scrape().await.is_err());
    assert_eq!(client.cookie().await, "uid=2; pass=old_pass");
}

#[tokio::test]
async fn test_unchanged_cookie_is_not_written() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "pass=old_pass")
                .set_body_string(PROFILE),
        )
        .mount(&tracker)
        .await;

    let dir = tempdir().unwrap();
    let cookie_file = dir.path().join("never-written.cookie");
    let config = tracker_config(&tracker).with_cookie_file(&cookie_file);
    let client = ScrapingClient::new(config, http(), None).unwrap();

    client.scrape().await.unwrap();
    assert!(!cookie_file.exists());
}

#[tokio::test]
async fn test_solver_success_merges_cookies_and_extracts() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&tracker)
        .await;

    let solver = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1"))
        .and(body_partial_json(json!({
            "cmd": "request.get",
            "url": format!("{}/profile", tracker.uri()),
            "maxTimeout": 5000,
            "cookies": [
                { "name": "uid", "value": "1" },
                { "name": "pass", "value": "old_pass" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message": "Challenge solved!",
            "solution": {
                "status": 200,
                "response": PROFILE,
                "cookies": [
                    { "name": "cf_clearance", "value": "token", "domain": ".tl.example", "httpOnly": true },
                    { "name": "pass", "value": "solver_pass" }
                ]
            }
        })))
        .expect(1)
        .mount(&solver)
        .await;

    let dir = tempdir().unwrap();
    let cookie_file = dir.path().join("tl.cookie");
    let config = tracker_config(&tracker).with_cookie_file(&cookie_file);
    let client = ScrapingClient::new(config, http(), Some(solver_for(&solver))).unwrap();

    let stats = client.scrape().await.unwrap();
    assert_eq!(stats.uploaded, Some(3331520232161));

    let expected = "uid=1; pass=solver_pass; cf_clearance=token";
    assert_eq!(client.cookie().await, expected);
    assert_eq!(std::fs::read_to_string(&cookie_file).unwrap().trim(), expected);
}

#[tokio::test]
async fn test_persisted_cookie_used_by_next_client() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("cookie", "uid=1; pass=old_pass"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "pass=new_pass")
                .set_body_string(PROFILE),
        )
        .mount(&tracker)
        .await;
    Mock::given(method("GET"))
        .and(header("cookie", "uid=1; pass=new_pass"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PROFILE))
        .expect(1)
        .mount(&tracker)
        .await;

    let dir = tempdir().unwrap();
    let cookie_file = dir.path().join("tl.cookie");

    let first = ScrapingClient::new(
        tracker_config(&tracker).with_cookie_file(&cookie_file),
        http(),
        None,
    )
    .unwrap();
    first.scrape().await.unwrap();

    let second = ScrapingClient::new(
        tracker_config(&tracker).with_cookie_file(&cookie_file),
        http(),
        None,
    )
    .unwrap();
    second.scrape().await.unwrap();
}

#[tokio::test]
async fn test_blocked_with_unreachable_solver() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&tracker)
        .await;

    let solver = FlareSolverrClient::new("http://127.0.0.1:1/v1", 1_000, None).unwrap();
    let client = ScrapingClient::new(tracker_config(&tracker), http(), Some(solver)).unwrap();
    let message = client.scrape().await.unwrap_err().to_string();

    assert!(message.starts_with("Failed to fetch page from TL: 403 Forbidden"));
    assert!(message.contains("FlareSolverr service error"));
}

#[tokio::test]
async fn test_reformatted_but_equal_cookie_is_not_rewritten() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "pass=old_pass; Path=/")
                .set_body_string(PROFILE),
        )
        .mount(&tracker)
        .await;

    let dir = tempdir().unwrap();
    let cookie_file = dir.path().join("tl.cookie");
    std::fs::write(&cookie_file, "uid=1;pass=old_pass").unwrap();
    let config = tracker_config(&tracker).with_cookie_file(&cookie_file);
    let client = ScrapingClient::new(config, http(), None).unwrap();

    client.scrape().await.unwrap();

    assert_eq!(client.cookie().await, "uid=1;pass=old_pass");
    assert_eq!(
        std::fs::read_to_string(&cookie_file).unwrap(),
        "uid=1;pass=old_pass"
    );
}

#[tokio::test]
async fn test_blocked_with_timed_out_solver() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&tracker)
        .await;

    let solver = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "ok", "message": "" }))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&solver)
        .await;

    let solver =
        solver_for(&solver).with_transport_timeout(std::time::Duration::from_millis(200));
    let client = ScrapingClient::new(tracker_config(&tracker), http(), Some(solver)).unwrap();
    let err = client.scrape().await.unwrap_err();

    assert!(matches!(err, ScrapeError::ChallengeFailed { .. }));
    let message = err.to_string();
    assert!(message.contains("TL"));
    assert!(message.contains("403"));
    assert!(message.contains("FlareSolverr service error"));
}
