use std::time::Duration;
use tokio::io::AsyncWriteExt;
use wicket::http::reader::{ReadError, ReadState, assess, read_request};

#[test]
fn test_assess_without_terminator() {
    assert_eq!(assess(b""), ReadState::AwaitingHeaderTerminator);
    assert_eq!(
        assess(b"GET / HTTP/1.1\r\nHost: example\r\n"),
        ReadState::AwaitingHeaderTerminator
    );
}

#[test]
fn test_assess_complete_without_content_length() {
    assert_eq!(assess(b"GET / HTTP/1.1\r\nHost: example\r\n\r\n"), ReadState::Complete);
}

#[test]
fn test_assess_awaiting_body() {
    let buf = b"POST /f HTTP/1.1\r\nContent-Length: 17\r\n\r\nkey=value";

    assert_eq!(
        assess(buf),
        ReadState::AwaitingBodyCompletion {
            expected: 17,
            buffered: 9
        }
    );
}

#[test]
fn test_assess_body_satisfied() {
    let buf = b"POST /f HTTP/1.1\r\nContent-Length: 17\r\n\r\nkey=value&other=1";

    assert_eq!(assess(buf), ReadState::Complete);
}

#[test]
fn test_assess_unparsable_content_length_is_complete() {
    let buf = b"POST /f HTTP/1.1\r\nContent-Length: lots\r\n\r\n";

    assert_eq!(assess(buf), ReadState::Complete);
}

#[tokio::test]
async fn test_read_returns_request_unmodified() {
    let request: &[u8] = b"POST /sign_up HTTP/1.1\r\nHost: localhost\r\n\
        Content-Length: 17\r\n\r\nkey=value&other=1";
    let mut input = request;

    let buf = read_request(&mut input).await.unwrap();

    assert_eq!(&buf[..], request);
}

#[tokio::test]
async fn test_read_spans_many_chunks() {
    let body = "x=".to_string() + &"y".repeat(5000);
    let request = format!(
        "POST /big HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let mut input = request.as_bytes();

    let buf = read_request(&mut input).await.unwrap();

    assert_eq!(buf.len(), request.len());
}

#[tokio::test]
async fn test_read_waits_for_declared_body() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    let reader = tokio::spawn(async move { read_request(&mut server).await });

    client
        .write_all(b"POST /f HTTP/1.1\r\nContent-Length: 17\r\n\r\nkey=value")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!reader.is_finished());

    client.write_all(b"&other=1").await.unwrap();
    let buf = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(buf.ends_with(b"key=value&other=1"));
}

#[tokio::test]
async fn test_read_closed_before_headers() {
    let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: exam";

    let result = read_request(&mut input).await;

    assert!(matches!(result, Err(ReadError::Closed { buffered: 26 })));
}

#[tokio::test]
async fn test_read_closed_mid_body_returns_partial() {
    let request: &[u8] = b"POST /f HTTP/1.1\r\nContent-Length: 17\r\n\r\nkey=";
    let mut input = request;

    let buf = read_request(&mut input).await.unwrap();

    assert_eq!(&buf[..], request);
}
