// File: probe_integration_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

mod common;

use common::{free_ports, setup_echo_server, EchoResponder};
use ingress_precheck::error::ValidationError;
use ingress_precheck::probe::{ProbeTarget, Prober};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn prober() -> Prober {
    Prober::new(Duration::from_secs(2), Duration::from_secs(2)).unwrap()
}

fn target_for(server: &MockServer) -> ProbeTarget {
    let addr = server.address();
    ProbeTarget::new(addr.ip().to_string(), addr.port())
}

#[tokio::test]
async fn test_probe_passes_against_echo_server() {
    let server = setup_echo_server(EchoResponder::new("port-test-abc")).await;
    let target = target_for(&server).with_expected_hostname("port-test-abc");

    let record = prober().probe(&target).await.unwrap();
    assert_eq!(record.http_verb(), Some("GET"));
    assert_eq!(record.http_path().map(str::len), Some(33));
}

#[tokio::test]
async fn test_each_probe_uses_a_fresh_nonce() {
    let server = setup_echo_server(EchoResponder::new("h")).await;
    let target = target_for(&server);
    let prober = prober();

    let first = prober.probe(&target).await.unwrap();
    let second = prober.probe(&target).await.unwrap();
    assert_ne!(first.http_path(), second.http_path());
}

#[tokio::test]
async fn test_hostname_mismatch_fails() {
    let server = setup_echo_server(EchoResponder::new("port-test-abd")).await;
    let target = target_for(&server).with_expected_hostname("port-test-abc");

    match prober().probe(&target).await {
        Err(ValidationError::HostnameMismatch { expected, observed }) => {
            assert_eq!(expected, "port-test-abc");
            assert_eq!(observed, "port-test-abd");
        }
        other => panic!("expected HostnameMismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stale_response_fails_path_check() {
    let mut responder = EchoResponder::new("h");
    responder.fixed_path = Some("/00000000000000000000000000000000".to_string());
    let server = setup_echo_server(responder).await;

    assert!(matches!(
        prober().probe(&target_for(&server)).await,
        Err(ValidationError::PathMismatch { .. })
    ));
}

#[tokio::test]
async fn test_missing_hostname_fails() {
    let mut responder = EchoResponder::new("h");
    responder.hostname = None;
    let server = setup_echo_server(responder).await;

    assert!(matches!(
        prober().probe(&target_for(&server)).await,
        Err(ValidationError::MissingHostname)
    ));
}

#[tokio::test]
async fn test_stripped_prefix_is_applied_to_observed_path() {
    let server = setup_echo_server(EchoResponder::new("h")).await;

    // The listener saw the full path, so re-adding a prefix breaks the match.
    let target = target_for(&server).with_stripped_path_prefix("api");
    match prober().probe(&target).await {
        Err(ValidationError::PathMismatch { expected, observed }) => {
            assert_eq!(observed, format!("/api{}", expected));
        }
        other => panic!("expected PathMismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_echo_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>\n<body>It works</body>\n</html>"))
        .mount(&server)
        .await;

    assert!(matches!(
        prober().probe(&target_for(&server)).await,
        Err(ValidationError::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn test_error_status_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = prober().probe(&target_for(&server)).await.unwrap_err();
    assert!(matches!(err, ValidationError::Protocol(_)));
    assert!(!err.is_connectivity());
}

#[tokio::test]
async fn test_refused_connection_is_connectivity_error() {
    let port = free_ports(1)[0];
    let target = ProbeTarget::new("127.0.0.1", port);

    let err = prober().probe(&target).await.unwrap_err();
    assert!(err.is_connectivity());
    assert!(err.to_string().contains(&format!("127.0.0.1:{}", port)));
}

#[tokio::test]
async fn test_slow_response_times_out_as_connectivity_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let prober = Prober::new(Duration::from_millis(200), Duration::from_millis(200)).unwrap();
    let err = prober.probe(&target_for(&server)).await.unwrap_err();
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_stall_after_connect_is_bounded_by_read_timeout() {
    let mut responder = EchoResponder::new("h");
    responder.delay = Some(Duration::from_millis(2500));
    let server = setup_echo_server(responder).await;
    let prober = Prober::new(Duration::from_secs(2), Duration::from_secs(1)).unwrap();

    let err = prober.probe(&target_for(&server)).await.unwrap_err();
    assert!(err.is_connectivity(), "got {:?}", err);
}

#[tokio::test]
async fn test_echo_within_read_timeout_passes() {
    let mut responder = EchoResponder::new("h");
    responder.delay = Some(Duration::from_millis(300));
    let server = setup_echo_server(responder).await;
    let prober = Prober::new(Duration::from_secs(2), Duration::from_secs(1)).unwrap();

    assert!(prober.probe(&target_for(&server)).await.is_ok());
}
