use bytes::Bytes;
use std::collections::HashMap;

use crate::http::request::{Method, Request};

pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug)]
pub enum ParseError {
    /// No blank line terminating the header block yet.
    Incomplete,
    /// Header block is not valid UTF-8.
    InvalidEncoding,
    /// Request line did not split into exactly three non-empty tokens.
    InvalidRequestLine { tokens: usize },
    InvalidHeader(String),
    InvalidContentLength(String),
    /// Content-Length disagrees with the bytes actually received.
    BodyLengthMismatch { declared: usize, actual: usize },
    /// A POST body segment without exactly one `=`.
    MalformedForm(String),
}

impl ParseError {
    /// A length mismatch ends the worker without any response.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::BodyLengthMismatch { .. })
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Incomplete => write!(f, "header block is incomplete"),
            ParseError::InvalidEncoding => write!(f, "header block is not valid UTF-8"),
            ParseError::InvalidRequestLine { tokens } => {
                write!(f, "request line has {} tokens, expected 3", tokens)
            }
            ParseError::InvalidHeader(line) => write!(f, "header line without colon: {:?}", line),
            ParseError::InvalidContentLength(v) => write!(f, "invalid Content-Length {:?}", v),
            ParseError::BodyLengthMismatch { declared, actual } => write!(
                f,
                "Content-Length is {} but body has {} bytes",
                declared, actual
            ),
            ParseError::MalformedForm(segment) => {
                write!(f, "form segment {:?} is not key=value", segment)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses a complete request buffer as returned by the reader.
pub fn parse_request(buf: &[u8]) -> Result<Request, ParseError> {
    // Look for header/body separator
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let head =
        std::str::from_utf8(&buf[..headers_end]).map_err(|_| ParseError::InvalidEncoding)?;
    let body = Bytes::copy_from_slice(&buf[headers_end + HEADER_TERMINATOR.len()..]);

    let mut lines = head.split("\r\n");
    let (method, path, version) = parse_request_line(lines.next().unwrap_or_default())?;
    let headers = parse_headers(lines)?;

    if let Some(value) = headers.get("Content-Length") {
        let declared = value
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength(value.clone()))?;
        if declared != body.len() {
            return Err(ParseError::BodyLengthMismatch {
                declared,
                actual: body.len(),
            });
        }
    }

    let form = match method {
        Method::POST => Some(parse_form(&body)?),
        _ => None,
    };

    Ok(Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body,
        form,
    })
}

/// Splits `METHOD SP PATH SP VERSION` into its three tokens.
pub fn parse_request_line(line: &str) -> Result<(Method, &str, &str), ParseError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    let &[method, path, version] = tokens.as_slice() else {
        return Err(ParseError::InvalidRequestLine { tokens: tokens.len() });
    };
    if method.is_empty() || path.is_empty() || version.is_empty() {
        let tokens = tokens.iter().filter(|t| !t.is_empty()).count();
        return Err(ParseError::InvalidRequestLine { tokens });
    }

    Ok((Method::from(method), path, version))
}

/// Splits each line on its first colon. Later duplicates overwrite earlier ones.
pub fn parse_headers<'a>(
    lines: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, String>, ParseError> {
    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;

        headers.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(headers)
}

/// Decodes an `application/x-www-form-urlencoded` body.
///
/// An empty body is an empty form.
pub fn parse_form(body: &[u8]) -> Result<HashMap<String, String>, ParseError> {
    let mut form = HashMap::new();
    if body.is_empty() {
        return Ok(form);
    }

    let text = std::str::from_utf8(body)
        .map_err(|_| ParseError::MalformedForm(String::from_utf8_lossy(body).into_owned()))?;

    for segment in text.split('&') {
        if segment.matches('=').count() != 1 {
            return Err(ParseError::MalformedForm(segment.to_string()));
        }
        if let Some((key, value)) = url::form_urlencoded::parse(segment.as_bytes()).next() {
            form.insert(key.into_owned(), value.into_owned());
        }
    }

    Ok(form)
}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}
