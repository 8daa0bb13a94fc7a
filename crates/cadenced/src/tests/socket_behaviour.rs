//! Framing behaviour of the command channel over a live socket.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::json;

use crate::tests::support::{CommandProbe, Reply, ServerHarness};

const REPLY_TIMEOUT: Duration = Duration::from_secs(3);

#[fixture]
fn server() -> ServerHarness {
    ServerHarness::probe(&Arc::new(CommandProbe::default()), Duration::from_secs(2))
}

#[rstest]
fn request_split_across_writes_is_reassembled(server: ServerHarness) {
    let mut client = server.client();
    let request = r#"{"type": "echo", "params": {"word": "café", "n": 3}}"#.as_bytes();
    for piece in request.chunks(7) {
        client.send_raw(piece);
        thread::sleep(Duration::from_millis(5));
    }

    let reply = client.receive(REPLY_TIMEOUT);

    assert_eq!(
        reply,
        Reply::Document(json!({
            "status": "success",
            "result": { "word": "café", "n": 3 }
        }))
    );
}

#[rstest]
fn back_to_back_requests_in_one_write_are_both_answered(server: ServerHarness) {
    let mut client = server.client();
    client.send_raw(br#"{"type":"echo","params":{"n":1}}{"type":"echo","params":{"n":2}}"#);

    let first = client.receive(REPLY_TIMEOUT);
    let second = client.receive(REPLY_TIMEOUT);

    assert_eq!(
        first,
        Reply::Document(json!({ "status": "success", "result": { "n": 1 } }))
    );
    assert_eq!(
        second,
        Reply::Document(json!({ "status": "success", "result": { "n": 2 } }))
    );
}

#[rstest]
fn missing_params_default_to_an_empty_object(server: ServerHarness) {
    let mut client = server.client();
    client.send_raw(br#"{"type":"echo"}"#);

    assert_eq!(
        client.receive(REPLY_TIMEOUT),
        Reply::Document(json!({ "status": "success", "result": {} }))
    );
}

#[rstest]
fn malformed_input_is_answered_then_the_connection_closes(server: ServerHarness) {
    let mut client = server.client();
    client.send_raw(b"{\"type\": ]");

    let Reply::Document(reply) = client.receive(REPLY_TIMEOUT) else {
        panic!("expected an error document before close");
    };
    assert_eq!(reply["status"], "error");
    assert_eq!(client.receive(REPLY_TIMEOUT), Reply::Closed);
}

#[rstest]
fn request_without_a_command_keeps_the_connection(server: ServerHarness) {
    let mut client = server.client();
    client.send_raw(br#"{"params": {}}"#);

    let Reply::Document(reply) = client.receive(REPLY_TIMEOUT) else {
        panic!("expected an error document");
    };
    assert_eq!(reply["status"], "error");
    let message = reply["message"].as_str().expect("error message");
    assert!(message.starts_with("invalid request"), "{message}");

    let echoed = client.call("echo", json!({ "still": "open" }));
    assert_eq!(echoed["result"], json!({ "still": "open" }));
}

#[rstest]
fn oversized_request_is_rejected_and_closed(server: ServerHarness) {
    let mut client = server.client();
    let padding = "x".repeat(server.max_message_bytes() + 1);
    let _ = client.send_lossy(format!(r#"{{"type":"echo","params":{{"pad":"{padding}"#).as_bytes());

    let reply = client.receive(REPLY_TIMEOUT);

    match reply {
        Reply::Document(document) => {
            assert_eq!(document["status"], "error");
            assert_eq!(client.receive(REPLY_TIMEOUT), Reply::Closed);
        }
        Reply::Closed => {}
        Reply::TimedOut => panic!("oversized request was neither answered nor closed"),
    }
}

#[rstest]
fn stalled_partial_request_is_answered_then_closed(server: ServerHarness) {
    let mut client = server.client();
    client.send_raw(br#"{"type": "echo", "par"#);

    let Reply::Document(reply) = client.receive(REPLY_TIMEOUT) else {
        panic!("expected an error document for the stalled request");
    };
    assert_eq!(reply["status"], "error");
    let message = reply["message"].as_str().expect("error message");
    assert!(message.starts_with("incomplete request"), "{message}");
    assert_eq!(client.receive(REPLY_TIMEOUT), Reply::Closed);
}

#[rstest]
fn trickled_request_within_the_deadline_is_served(server: ServerHarness) {
    let mut client = server.client();
    let request = br#"{"type": "echo", "params": {"slow": true}}"#;
    for piece in request.chunks(10) {
        client.send_raw(piece);
        thread::sleep(Duration::from_millis(150));
    }

    assert_eq!(
        client.receive(REPLY_TIMEOUT),
        Reply::Document(json!({ "status": "success", "result": { "slow": true } }))
    );
}

#[rstest]
fn abandoned_connection_does_not_disturb_other_clients(server: ServerHarness) {
    let mut abandoned = server.client();
    abandoned.send_raw(br#"{"type": "echo", "par"#);
    drop(abandoned);

    let mut client = server.client();
    let reply = client.call("echo", json!({ "ok": true }));

    assert_eq!(reply, json!({ "status": "success", "result": { "ok": true } }));
}
