//! End-to-end lifecycle tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `HttpHelper` with the
//! real `UreqTransport`. Events are published into a channel so each test can
//! assert the exact topic sequence once the request's handle has been
//! joined.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use mediator_http::{
    Bus, HttpEvent, HttpHelper, HttpMethod, Outcome, Published, RequestOptions, ResponseEnvelope,
    TransportConfig, UreqTransport,
};
use mock_server::Echo;

type Helper = HttpHelper<Sender<Published<HttpEvent>>, UreqTransport>;

/// Start the mock server on a background runtime and return its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn helper_with(config: TransportConfig) -> (Helper, Receiver<Published<HttpEvent>>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (HttpHelper::new(tx, UreqTransport::new(config)), rx)
}

fn helper() -> (Helper, Receiver<Published<HttpEvent>>) {
    helper_with(TransportConfig::default())
}

/// Drain published events, asserting the last one is the only terminal.
fn drain(rx: &Receiver<Published<HttpEvent>>) -> Vec<Published<HttpEvent>> {
    let published: Vec<_> = rx.try_iter().collect();
    let terminals = published
        .iter()
        .filter(|p| !matches!(p.payload, HttpEvent::Update(_)))
        .count();
    assert_eq!(terminals, 1, "expected exactly one terminal event: {published:?}");
    assert!(!matches!(
        published.last().map(|p| &p.payload),
        Some(HttpEvent::Update(_))
    ));
    published
}

fn success(published: &[Published<HttpEvent>]) -> &ResponseEnvelope {
    match published.last().map(|p| &p.payload) {
        Some(HttpEvent::Success(envelope)) => envelope,
        other => panic!("expected httpSuccess, got {other:?}"),
    }
}

fn echo_of(envelope: &ResponseEnvelope) -> Echo {
    serde_json::from_value(envelope.data.clone().expect("echo body is JSON")).unwrap()
}

#[test]
fn get_appends_encoded_query() {
    let addr = start_server();
    let (helper, rx) = helper();

    let options = RequestOptions::new().query("a", "1").query("b", "x y");
    let outcome = helper
        .get(&format!("http://{addr}/echo"), options)
        .unwrap()
        .wait()
        .unwrap();
    assert!(outcome.is_success());

    let published = drain(&rx);
    assert_eq!(published.last().unwrap().topic, "httpSuccess");
    let envelope = success(&published);
    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.status_text, "OK");

    let echo = echo_of(envelope);
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.query.as_deref(), Some("a=1&b=x%20y"));
    assert_eq!(
        echo.query_params,
        vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "x y".to_string())
        ]
    );
}

#[test]
fn every_verb_reaches_the_server() {
    let addr = start_server();
    let (helper, rx) = helper();
    let url = format!("http://{addr}/echo");

    let handles = [
        (HttpMethod::Delete, helper.delete(&url, RequestOptions::new())),
        (HttpMethod::Get, helper.get(&url, RequestOptions::new())),
        (HttpMethod::Put, helper.put(&url, RequestOptions::new())),
        (HttpMethod::Patch, helper.patch(&url, RequestOptions::new())),
        (HttpMethod::Post, helper.post(&url, RequestOptions::new())),
    ];
    for (method, handle) in handles {
        let outcome = handle.unwrap().wait().unwrap();
        let echo = echo_of(outcome.envelope().unwrap());
        assert_eq!(echo.method, method.as_str());
    }
    assert_eq!(rx.try_iter().filter(|p| p.topic == "httpSuccess").count(), 5);
}

#[test]
fn data_is_sent_as_form_body() {
    let addr = start_server();
    let (helper, rx) = helper();

    let options = RequestOptions::new()
        .data("title", "Buy milk")
        .data("done", "false");
    helper
        .patch(&format!("http://{addr}/echo"), options)
        .unwrap()
        .wait()
        .unwrap();

    let published = drain(&rx);
    let echo = echo_of(success(&published));
    assert_eq!(echo.method, "PATCH");
    assert_eq!(echo.body, "done=false&title=Buy%20milk");
    assert_eq!(
        echo.headers.get("content-type").map(String::as_str),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(
        echo.form,
        vec![
            ("done".to_string(), "false".to_string()),
            ("title".to_string(), "Buy milk".to_string())
        ]
    );
}

#[test]
fn get_with_data_still_sends_body() {
    let addr = start_server();
    let (helper, rx) = helper();

    helper
        .get(&format!("http://{addr}/echo"), RequestOptions::new().data("k", "v"))
        .unwrap()
        .wait()
        .unwrap();

    let echo = echo_of(success(&drain(&rx)));
    assert_eq!(echo.body, "k=v");
}

#[test]
fn headers_and_default_user_agent_are_sent() {
    let addr = start_server();
    let (helper, rx) = helper();

    let options = RequestOptions::new().header("x-trace", "abc123");
    helper
        .get(&format!("http://{addr}/echo"), options)
        .unwrap()
        .wait()
        .unwrap();

    let echo = echo_of(success(&drain(&rx)));
    assert_eq!(echo.headers.get("x-trace").map(String::as_str), Some("abc123"));
    assert!(echo.headers["user-agent"].starts_with("mediator-http/"));
}

#[test]
fn request_header_overrides_default() {
    let addr = start_server();
    let (helper, rx) = helper();

    let options = RequestOptions::new().header("User-Agent", "custom/2.0");
    helper
        .get(&format!("http://{addr}/echo"), options)
        .unwrap()
        .wait()
        .unwrap();

    let echo = echo_of(success(&drain(&rx)));
    assert_eq!(echo.headers.get("user-agent").map(String::as_str), Some("custom/2.0"));
}

#[test]
fn basic_auth_requires_both_credentials() {
    let addr = start_server();
    let (helper, rx) = helper();
    let url = format!("http://{addr}/echo");

    helper
        .get(&url, RequestOptions::new().basic_auth("user", "pass"))
        .unwrap()
        .wait()
        .unwrap();
    let echo = echo_of(success(&drain(&rx)));
    assert_eq!(
        echo.headers.get("authorization").map(String::as_str),
        Some("Basic dXNlcjpwYXNz")
    );

    let username_only = RequestOptions {
        username: Some("user".to_string()),
        ..Default::default()
    };
    helper.get(&url, username_only).unwrap().wait().unwrap();
    let echo = echo_of(success(&drain(&rx)));
    assert!(echo.headers.get("authorization").is_none());
}

#[test]
fn server_error_is_still_success() {
    let addr = start_server();
    let (helper, rx) = helper();

    helper
        .get(&format!("http://{addr}/status/500"), RequestOptions::new())
        .unwrap()
        .wait()
        .unwrap();

    let published = drain(&rx);
    let envelope = success(&published);
    assert_eq!(envelope.status, 500);
    assert_eq!(envelope.status_text, "Internal Server Error");
    assert_eq!(envelope.data, Some(serde_json::json!({"status": 500})));
}

#[test]
fn non_json_body_omits_data() {
    let addr = start_server();
    let (helper, rx) = helper();

    helper
        .get(&format!("http://{addr}/text"), RequestOptions::new())
        .unwrap()
        .wait()
        .unwrap();

    let published = drain(&rx);
    let envelope = success(&published);
    assert_eq!(envelope.status, 200);
    assert!(envelope.data.is_none());
    assert_eq!(envelope.raw.body, "plain text, not json");
}

#[test]
fn empty_body_omits_data() {
    let addr = start_server();
    let (helper, rx) = helper();

    helper
        .delete(&format!("http://{addr}/empty"), RequestOptions::new())
        .unwrap()
        .wait()
        .unwrap();

    let envelope = success(&drain(&rx)).clone();
    assert_eq!(envelope.status, 204);
    assert!(envelope.data.is_none());
}

#[test]
fn refused_connection_publishes_error() {
    // Bind and release a port so nothing is listening on it.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let (helper, rx) = helper();

    let outcome = helper
        .get(&format!("http://{addr}/echo"), RequestOptions::new())
        .unwrap()
        .wait()
        .unwrap();
    assert!(matches!(outcome, Outcome::Error(_)));

    let published = drain(&rx);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "httpError");
}

#[test]
fn progress_is_reported_before_success() {
    let addr = start_server();
    let (helper, rx) = helper_with(TransportConfig::new().chunk_size(1024));

    helper
        .get(&format!("http://{addr}/payload/20000"), RequestOptions::new())
        .unwrap()
        .wait()
        .unwrap();

    let published = drain(&rx);
    let updates: Vec<u8> = published
        .iter()
        .filter_map(|p| match p.payload {
            HttpEvent::Update(percent) => Some(percent),
            _ => None,
        })
        .collect();
    assert!(!updates.is_empty(), "expected progress events");
    assert!(updates.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(updates.last(), Some(&100));
    assert!(published
        .iter()
        .filter(|p| matches!(p.payload, HttpEvent::Update(_)))
        .all(|p| p.topic == "httpUpdate"));

    let envelope = success(&published);
    assert_eq!(envelope.raw.body.len(), 20000);
}

#[test]
fn correlation_key_namespaces_bus_topics() {
    let addr = start_server();
    let bus: Arc<Bus<HttpEvent>> = Arc::new(Bus::new());
    let keyed = Arc::new(AtomicUsize::new(0));
    let bare = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&keyed);
    bus.subscribe("job1-httpSuccess", move |_, event| {
        assert!(matches!(event, HttpEvent::Success(_)));
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = Arc::clone(&bare);
    bus.subscribe("httpSuccess", move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let helper = HttpHelper::with_mediator(Arc::clone(&bus));
    helper
        .with_key("job1")
        .get(&format!("http://{addr}/echo"), RequestOptions::new())
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(keyed.load(Ordering::SeqCst), 1);
    assert_eq!(bare.load(Ordering::SeqCst), 0);
}
