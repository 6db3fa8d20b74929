use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use subprobe::{HttpProber, Reachability, RetryPolicy};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        attempts: 2,
        attempt_timeout: Duration::from_millis(300),
        backoff_base: Duration::from_millis(10),
        jitter: Duration::ZERO,
    }
}

fn host_of(server: &MockServer) -> String {
    server.address().to_string()
}

#[tokio::test]
async fn plain_http_success_is_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let prober = HttpProber::new(fast_policy()).unwrap();
    let outcome = prober.probe(&host_of(&server)).await;

    assert!(outcome.reachable);
    assert_eq!(outcome.status, Some(200));
}

#[tokio::test]
async fn redirect_status_counts_as_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let prober = HttpProber::new(fast_policy()).unwrap();
    let outcome = prober.probe(&host_of(&server)).await;

    assert!(outcome.reachable);
    assert_eq!(outcome.status, Some(304));
}

#[tokio::test]
async fn long_redirect_chain_is_live_on_first_hop() {
    let server = MockServer::start().await;
    for (from, to) in [("/", "/a"), ("/a", "/b"), ("/b", "/c")] {
        Mock::given(method("HEAD"))
            .and(path(from))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", to))
            .mount(&server)
            .await;
    }
    Mock::given(method("HEAD"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let prober = HttpProber::new(fast_policy()).unwrap();
    let outcome = prober.probe(&host_of(&server)).await;

    assert!(outcome.reachable);
    assert_eq!(outcome.status, Some(301));
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/");
}

#[tokio::test]
async fn timeout_then_success_uses_second_status() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let prober = HttpProber::new(fast_policy()).unwrap();
    let outcome = prober.probe(&host_of(&server)).await;

    assert!(outcome.reachable);
    assert_eq!(outcome.status, Some(204));
}

#[tokio::test]
async fn non_ok_after_all_attempts_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let prober = HttpProber::new(fast_policy()).unwrap();
    let outcome = prober.probe(&host_of(&server)).await;

    assert!(!outcome.reachable);
    assert_eq!(outcome.status, Some(503));
    let heads = server.received_requests().await.unwrap_or_default();
    assert!(heads.len() >= 2);
}

#[tokio::test]
async fn refused_connection_degrades_to_no_status() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let prober = HttpProber::new(fast_policy()).unwrap();
    let outcome = prober.probe(&format!("127.0.0.1:{port}")).await;

    assert!(!outcome.reachable);
    assert_eq!(outcome.status, None);
}
