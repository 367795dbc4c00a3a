use wicket::http::parser::{
    ParseError, parse_form, parse_headers, parse_request, parse_request_line,
};
use wicket::http::request::Method;

#[test]
fn test_parse_simple_get_request() {
    let req = b"GET / HTTP/1.1\r\nHost: example\r\n\r\n";
    let parsed = parse_request(req).unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.path, "/");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert!(parsed.headers.contains_key("Host"));
    assert!(parsed.body.is_empty());
}

#[test]
fn test_parse_post_request_with_form_body() {
    let req = b"POST /sign_up HTTP/1.1\r\nHost: localhost\r\n\
        Content-Length: 17\r\n\r\nkey=value&other=1";
    let parsed = parse_request(req).unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.path, "/sign_up");
    assert_eq!(&parsed.body[..], b"key=value&other=1");

    let form = parsed.form.unwrap();
    assert_eq!(form.len(), 2);
    assert_eq!(form.get("key").unwrap(), "value");
    assert_eq!(form.get("other").unwrap(), "1");
}

#[test]
fn test_parse_multiple_headers() {
    let req = b"GET /path HTTP/1.1\r\nHost: example.com\r\n\
        User-Agent: test-client\r\nAccept: */*\r\n\r\n";
    let parsed = parse_request(req).unwrap();

    assert_eq!(parsed.headers.get("Host").unwrap(), "example.com");
    assert_eq!(parsed.headers.get("User-Agent").unwrap(), "test-client");
    assert_eq!(parsed.headers.get("Accept").unwrap(), "*/*");
}

#[test]
fn test_parse_duplicate_header_last_wins() {
    let req = b"GET / HTTP/1.1\r\nX-Token: first\r\nX-Token: second\r\n\r\n";
    let parsed = parse_request(req).unwrap();

    assert_eq!(parsed.headers.len(), 1);
    assert_eq!(parsed.header("X-Token"), Some("second"));
}

#[test]
fn test_parse_header_splits_on_first_colon_only() {
    let req = b"GET / HTTP/1.1\r\nHost: localhost:8000\r\n\r\n";
    let parsed = parse_request(req).unwrap();

    assert_eq!(parsed.header("Host"), Some("localhost:8000"));
}

#[test]
fn test_parse_request_keeps_query_in_path() {
    let req = b"GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let parsed = parse_request(req).unwrap();

    assert_eq!(parsed.path, "/search?q=rust");
}

#[test]
fn test_parse_incomplete_request_missing_blank_line() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n";
    let result = parse_request(req);

    assert!(matches!(result, Err(ParseError::Incomplete)));
}

#[test]
fn test_parse_request_line_token_count() {
    assert!(matches!(
        parse_request_line("GET /"),
        Err(ParseError::InvalidRequestLine { tokens: 2 })
    ));
    assert!(matches!(
        parse_request_line("GET / HTTP/1.1 extra"),
        Err(ParseError::InvalidRequestLine { tokens: 4 })
    ));
    assert!(matches!(
        parse_request_line("GET  / HTTP/1.1"),
        Err(ParseError::InvalidRequestLine { tokens: 4 })
    ));

    assert!(matches!(
        parse_request_line("GET  HTTP/1.1"),
        Err(ParseError::InvalidRequestLine { tokens: 2 })
    ));

    let (method, path, version) = parse_request_line("DELETE /item/7 HTTP/1.0").unwrap();
    assert_eq!(method, Method::DELETE);
    assert_eq!(path, "/item/7");
    assert_eq!(version, "HTTP/1.0");
}

#[test]
fn test_parse_extension_method_is_accepted() {
    let parsed = parse_request(b"PROPFIND / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
    assert_eq!(parsed.method, Method::Extension("PROPFIND".to_string()));
    assert_eq!(parsed.method.as_str(), "PROPFIND");
    assert!(parsed.form.is_none());

    let parsed = parse_request(b"get / HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parsed.method.to_string(), "get");
}

#[test]
fn test_parse_malformed_header() {
    let result = parse_headers(["Host: example", "BrokenHeader"].into_iter());

    assert!(matches!(result, Err(ParseError::InvalidHeader(line)) if line == "BrokenHeader"));
}

#[test]
fn test_parse_various_http_methods() {
    let methods = vec![
        ("GET", Method::GET),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
    ];

    for (method_str, expected_method) in methods {
        let req = format!("{} / HTTP/1.1\r\n\r\n", method_str);
        let parsed = parse_request(req.as_bytes()).unwrap();
        assert_eq!(parsed.method, expected_method);
        assert!(parsed.form.is_none());
    }
}

#[test]
fn test_parse_form_without_equals_fails() {
    let result = parse_form(b"keyvalue");

    assert!(matches!(result, Err(ParseError::MalformedForm(s)) if s == "keyvalue"));
}

#[test]
fn test_parse_form_with_two_equals_fails() {
    assert!(matches!(parse_form(b"a=b=c"), Err(ParseError::MalformedForm(_))));
    assert!(matches!(parse_form(b"a=1&&b=2"), Err(ParseError::MalformedForm(_))));
}

#[test]
fn test_parse_form_decodes_percent_and_plus() {
    let form = parse_form(b"name=Jane+Doe&city=S%C3%A3o%20Paulo&empty=").unwrap();

    assert_eq!(form.get("name").unwrap(), "Jane Doe");
    assert_eq!(form.get("city").unwrap(), "São Paulo");
    assert_eq!(form.get("empty").unwrap(), "");
}

#[test]
fn test_parse_empty_post_body_is_empty_form() {
    let req = b"POST /api HTTP/1.1\r\nContent-Length: 0\r\n\r\n";
    let parsed = parse_request(req).unwrap();

    assert!(parsed.form.unwrap().is_empty());
}

#[test]
fn test_parse_malformed_post_body() {
    let req = b"POST /sign_up HTTP/1.1\r\nContent-Length: 8\r\n\r\nkeyvalue";
    let err = parse_request(req).unwrap_err();

    assert!(matches!(err, ParseError::MalformedForm(_)));
    assert!(!err.is_fatal());
}

#[test]
fn test_parse_content_length_mismatch_is_fatal() {
    let req = b"POST /api HTTP/1.1\r\nContent-Length: 3\r\n\r\nkey=value";
    let err = parse_request(req).unwrap_err();

    assert!(matches!(
        err,
        ParseError::BodyLengthMismatch { declared: 3, actual: 9 }
    ));
    assert!(err.is_fatal());
}

#[test]
fn test_parse_content_length_checked_for_every_method() {
    let req = b"PUT /upload HTTP/1.1\r\nContent-Length: 10\r\n\r\nshort";

    assert!(parse_request(req).unwrap_err().is_fatal());
}

#[test]
fn test_parse_invalid_content_length() {
    let req = b"POST /api HTTP/1.1\r\nContent-Length: ten\r\n\r\n";
    let err = parse_request(req).unwrap_err();

    assert!(matches!(err, ParseError::InvalidContentLength(v) if v == "ten"));
}

#[test]
fn test_parse_request_with_binary_body() {
    let req = b"PUT /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n\x00\x01\x02\x03";
    let parsed = parse_request(req).unwrap();

    assert_eq!(parsed.body.to_vec(), vec![0, 1, 2, 3]);
    assert!(parsed.form.is_none());
}

#[test]
fn test_parse_body_with_crlf_is_kept_whole() {
    let req = b"PUT /note HTTP/1.1\r\nContent-Length: 7\r\n\r\na\r\n\r\nb\r";
    let parsed = parse_request(req).unwrap();

    assert_eq!(&parsed.body[..], b"a\r\n\r\nb\r");
}
