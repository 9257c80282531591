//! Turn-execution tests for the stream consumer
//!
//! A wiremock server stands in for the relay so both delivery modes and
//! the failure paths can be driven end to end.

use chatrelay_core::protocol::Role;
use chatrelay_core::session::{send_turn, Session};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

#[tokio::test]
async fn batch_turn_appends_one_assistant_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"reply":"Hello there"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let mut session = Session::new();
    let outcome = send_turn(&client, &server.uri(), &mut session, "hi", false, |_| {}).await;

    assert!(!outcome.streamed);
    assert!(outcome.error.is_none());
    assert_eq!(session.last_reply(), Some("Hello there"));
    // system + user + assistant
    assert_eq!(session.messages().len(), 3);
}

#[tokio::test]
async fn streamed_turn_assembles_fragments_in_order() {
    let server = MockServer::start().await;
    let body = "data: \"Hel\"\n\ndata: \"lo\"\n\nevent: done\ndata: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let mut session = Session::new();
    let mut first_fragment = None;
    let outcome = send_turn(&client, &server.uri(), &mut session, "hi", true, |fragment| {
        first_fragment.get_or_insert_with(|| fragment.to_string());
    })
    .await;

    assert!(outcome.streamed);
    assert!(outcome.error.is_none());
    assert_eq!(first_fragment.as_deref(), Some("Hel"));
    assert_eq!(session.last_reply(), Some("Hello"));
}

async fn write_chunk(stream: &mut TcpStream, data: &[u8]) -> std::io::Result<()> {
    stream
        .write_all(format!("{:x}\r\n", data.len()).as_bytes())
        .await?;
    stream.write_all(data).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await
}

/// wiremock delivers each mocked body in one read, so a hand-rolled
/// chunked response is used to force a transport boundary inside a
/// multi-byte character.
#[tokio::test]
async fn read_split_inside_multibyte_char_assembles_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let body: &[u8] = "data: \"caf\u{e9}\"\n\nevent: done\ndata: [DONE]\n\n".as_bytes();
    // Cut right after the lead byte of 'é' (0xC3 0xA9).
    let cut = body.iter().position(|&b| b == 0xC3).unwrap() + 1;
    let (head, tail) = body.split_at(cut);

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut read_buffer = [0u8; 1024];
        loop {
            let n = stream.read(&mut read_buffer).await.unwrap();
            request.extend_from_slice(&read_buffer[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") || n == 0 {
                break;
            }
        }

        stream
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  content-type: text/event-stream\r\n\
                  transfer-encoding: chunked\r\n\r\n",
            )
            .await
            .unwrap();
        write_chunk(&mut stream, head).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        write_chunk(&mut stream, tail).await.unwrap();
        stream.write_all(b"0\r\n\r\n").await.unwrap();
    });

    let client = reqwest::Client::new();
    let mut session = Session::new();
    let outcome = send_turn(
        &client,
        &format!("http://{}", addr),
        &mut session,
        "hi",
        true,
        |_| {},
    )
    .await;

    assert!(outcome.streamed);
    assert!(outcome.error.is_none());
    assert_eq!(session.last_reply(), Some("caf\u{e9}"));
    server.await.unwrap();
}

#[tokio::test]
async fn mid_stream_error_keeps_delivered_fragments() {
    let server = MockServer::start().await;
    let body = "data: \"Hi\"\n\nevent: error\ndata: \"upstream exploded\"\n\n";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let mut session = Session::new();
    let outcome = send_turn(&client, &server.uri(), &mut session, "hi", true, |_| {}).await;

    assert!(outcome.streamed);
    assert_eq!(outcome.error.as_deref(), Some("upstream exploded"));
    let reply = session.last_reply().unwrap();
    assert!(reply.starts_with("Hi"));
    assert!(reply.contains("upstream exploded"));
}

#[tokio::test]
async fn error_status_becomes_inline_assistant_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_raw(
            r#"{"error":"missing configuration"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let mut session = Session::new();
    let outcome = send_turn(&client, &server.uri(), &mut session, "hi", false, |_| {}).await;

    assert!(outcome.error.is_some());
    let reply = session.last_reply().unwrap();
    assert!(reply.contains("missing configuration"));
    // The user's message stays in place for the next turn.
    assert_eq!(session.messages()[1].role, Role::User);
}

#[tokio::test]
async fn unreachable_relay_reports_transport_error() {
    let client = reqwest::Client::new();
    let mut session = Session::new();
    // Port 9 is discard; connection should be refused quickly.
    let outcome = send_turn(
        &client,
        "http://127.0.0.1:9",
        &mut session,
        "hi",
        true,
        |_| {},
    )
    .await;

    assert!(outcome.error.is_some());
    assert!(session.last_reply().unwrap().starts_with("Error:"));
}

#[tokio::test]
async fn consecutive_turns_never_reuse_a_placeholder() {
    let server = MockServer::start().await;
    let body = "data: \"one\"\n\nevent: done\ndata: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let mut session = Session::new();
    send_turn(&client, &server.uri(), &mut session, "a", true, |_| {}).await;
    send_turn(&client, &server.uri(), &mut session, "b", true, |_| {}).await;

    let assistants: Vec<_> = session
        .messages()
        .iter()
        .filter(|message| message.role == Role::Assistant)
        .collect();
    assert_eq!(assistants.len(), 2);
    assert!(assistants.iter().all(|message| message.content == "one"));
}
