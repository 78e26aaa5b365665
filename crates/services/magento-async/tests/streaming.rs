//! Stream receiver tests against mock servers
//!
//! Completed bodies come from wiremock; connections that must stay open are
//! served by a raw TCP listener writing a chunked response by hand.

use std::time::Duration;

use futures::StreamExt;
use magento_async::{
    Base, Client, CloseReason, MagentoConfig, MagentoError, MessageKind, Params, StreamEvent,
    StreamOptions, StreamState,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

fn config(root: &str) -> MagentoConfig {
    MagentoConfig::new()
        .without_bearer()
        .with_consumer("ck", "cs")
        .with_access_token("at", "ats")
        .with_all_bases(format!("{root}/1.1"))
}

async fn next(rx: &mut magento_async::StreamReceiver) -> Option<StreamEvent> {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("stream event in time")
}

/// Serves one chunked 200 response that writes `chunks` and then stays open
async fn serve_open_stream(chunks: Vec<&'static [u8]>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();

        let mut req = Vec::new();
        let mut buf = [0u8; 1024];
        while !req.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = sock.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            req.extend_from_slice(&buf[..n]);
        }

        sock.write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n",
        )
        .await
        .unwrap();

        for chunk in chunks {
            let mut frame = format!("{:x}\r\n", chunk.len()).into_bytes();
            frame.extend_from_slice(chunk);
            frame.extend_from_slice(b"\r\n");
            if sock.write_all(&frame).await.is_err() {
                return;
            }
            sock.flush().await.ok();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        // Hold the connection until the client goes away
        let _ = sock.read(&mut buf).await;
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn decodes_messages_pings_and_malformed_then_ends() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/filter.json"))
        .and(query_param("track", "rust"))
        .and(header_regex("authorization", "^OAuth "))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{\"a\":1}\r\n\r\nnot json\r\n{\"delete\":{}}\r\n{\"partial"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::with_config(config(&server.uri())).unwrap();
    let mut rx = client
        .stream("statuses/filter", Params::new().with("track", "rust"))
        .unwrap();

    match next(&mut rx).await {
        Some(StreamEvent::Message(v)) => assert_eq!(v, json!({"a": 1})),
        other => panic!("Expected message, got {other:?}"),
    }
    assert!(matches!(next(&mut rx).await, Some(StreamEvent::Ping)));
    match next(&mut rx).await {
        Some(StreamEvent::Malformed { raw, .. }) => assert_eq!(raw, "not json"),
        other => panic!("Expected malformed, got {other:?}"),
    }
    let ev = next(&mut rx).await.unwrap();
    assert_eq!(ev.kind(), Some(MessageKind::Delete));
    assert!(matches!(next(&mut rx).await, Some(StreamEvent::End)));
    assert!(next(&mut rx).await.is_none());
    assert_eq!(rx.state(), StreamState::Closed(CloseReason::Normal));
}

#[tokio::test]
async fn user_and_site_methods_use_their_bases() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/1.1/user.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"friends\":[1]}\r\n"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/site/1.1/site.json"))
        .and(query_param("follow", "1,2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"event\":\"follow\"}\r\n"))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(&server.uri())
        .with_base(Base::UserStream, format!("{}/user/1.1", server.uri()))
        .with_base(Base::SiteStream, format!("{}/site/1.1", server.uri()));
    let client = Client::with_config(cfg).unwrap();

    let mut user = client.stream("user", Params::new()).unwrap();
    let mut site = client
        .stream("site", Params::new().with("follow", "1,2"))
        .unwrap();

    assert_eq!(
        next(&mut user).await.and_then(|e| e.kind()),
        Some(MessageKind::Friends)
    );
    assert_eq!(
        next(&mut site).await.and_then(|e| e.kind()),
        Some(MessageKind::Event("follow".into()))
    );
}

#[tokio::test]
async fn non_success_open_is_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/filter.json"))
        .respond_with(
            ResponseTemplate::new(420).set_body_string(r#"{"errors":[{"message":"Enhance Your Calm"}]}"#),
        )
        .mount(&server)
        .await;

    let client = Client::with_config(config(&server.uri())).unwrap();
    let mut rx = client.stream("statuses/filter", Params::new()).unwrap();

    match next(&mut rx).await {
        Some(StreamEvent::Error(err @ MagentoError::Status { .. })) => {
            assert_eq!(err.status().map(|s| s.as_u16()), Some(420));
            assert_eq!(err.body().unwrap()["errors"][0]["message"], "Enhance Your Calm");
        }
        other => panic!("Expected status error, got {other:?}"),
    }
    assert!(next(&mut rx).await.is_none());
    assert_eq!(rx.state(), StreamState::Closed(CloseReason::Error));
}

#[tokio::test]
async fn connect_failure_is_transport_error() {
    let client = Client::with_config(config("http://127.0.0.1:1")).unwrap();
    let mut rx = client.stream("statuses/sample", Params::new()).unwrap();

    match next(&mut rx).await {
        Some(StreamEvent::Error(err)) => assert!(err.is_transport()),
        other => panic!("Expected transport error, got {other:?}"),
    }
    assert_eq!(rx.state(), StreamState::Closed(CloseReason::Error));
}

#[tokio::test]
async fn message_split_across_network_chunks() {
    let root = serve_open_stream(vec![&b"{\"text\":\"hel"[..], &b"lo\"}\r"[..], &b"\n"[..]]).await;
    let client = Client::with_config(config(&root)).unwrap();
    let mut rx = client.stream("statuses/sample", Params::new()).unwrap();

    match next(&mut rx).await {
        Some(StreamEvent::Message(v)) => assert_eq!(v, json!({"text": "hello"})),
        other => panic!("Expected one decoded message, got {other:?}"),
    }
    assert_eq!(rx.state(), StreamState::Open);
}

#[tokio::test]
async fn destroy_drops_queued_events() {
    let root = serve_open_stream(vec![
        &b"{\"a\":1}\r\n{\"b\":2}\r\n"[..],
        &b"{\"c\":3}\r\n"[..],
    ]).await;
    let client = Client::with_config(config(&root)).unwrap();
    let mut rx = client.stream("statuses/sample", Params::new()).unwrap();

    let mut states = rx.state_changes();
    tokio::time::timeout(WAIT, states.wait_for(|s| *s == StreamState::Open))
        .await
        .expect("stream opens")
        .unwrap();
    // Let the messages pile up unread
    tokio::time::sleep(Duration::from_millis(200)).await;

    rx.destroy();
    assert_eq!(rx.state(), StreamState::Cancelled);
    assert!(rx.recv().await.is_none());

    rx.destroy();
    assert_eq!(rx.state(), StreamState::Cancelled);
}

#[tokio::test]
async fn receiver_is_a_futures_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/sample.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"a\":1}\r\n{\"b\":2}\r\n"))
        .mount(&server)
        .await;

    let client = Client::with_config(config(&server.uri())).unwrap();
    let rx = client.stream("statuses/sample", Params::new()).unwrap();

    let events: Vec<StreamEvent> = tokio::time::timeout(WAIT, rx.collect())
        .await
        .unwrap();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[2], StreamEvent::End));
}

#[tokio::test]
async fn length_prefixed_framing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/filter.json"))
        .and(query_param("delimited", "length"))
        .respond_with(
            // 14 = the message, whose JSON contains a line break, plus its \r\n
            ResponseTemplate::new(200).set_body_string("14\r\n{\"t\":\r\n\"ab\"}\r\n\r\n"),
        )
        .mount(&server)
        .await;

    let client = Client::with_config(config(&server.uri())).unwrap();
    let mut rx = client
        .stream_with(
            "statuses/filter",
            Params::new().with("delimited", "length"),
            StreamOptions::new().length_prefixed(),
        )
        .unwrap();

    match next(&mut rx).await {
        Some(StreamEvent::Message(v)) => assert_eq!(v, json!({"t": "ab"})),
        other => panic!("Expected message, got {other:?}"),
    }
    assert!(matches!(next(&mut rx).await, Some(StreamEvent::Ping)));
    assert!(matches!(next(&mut rx).await, Some(StreamEvent::End)));
}

#[tokio::test]
async fn oversized_length_line_does_not_kill_the_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/filter.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("18446744073709551615\r\n9\r\n{\"a\":1}\r\n"),
        )
        .mount(&server)
        .await;

    let client = Client::with_config(config(&server.uri())).unwrap();
    let mut rx = client
        .stream_with(
            "statuses/filter",
            Params::new().with("delimited", "length"),
            StreamOptions::new().length_prefixed(),
        )
        .unwrap();

    let mut events = Vec::new();
    while let Some(ev) = next(&mut rx).await {
        events.push(ev);
    }
    assert!(
        events
            .iter()
            .any(|e| matches!(e, StreamEvent::Message(v) if *v == json!({"a": 1})))
    );
    assert!(matches!(events.last(), Some(StreamEvent::End)));
    assert_eq!(rx.state(), StreamState::Closed(CloseReason::Normal));
}
