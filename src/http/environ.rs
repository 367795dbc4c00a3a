//! The per-request environment handed to the application.
//!
//! This is the only view of a request an application gets: CGI-style
//! fields, the request headers as `HTTP_*` variables, and a byte stream over
//! the body. The raw connection and read buffer never leave the worker.

use bytes::Bytes;
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;

use crate::http::request::{Method, Request};

/// Version of the environment layout.
pub const VERSION: (u8, u8) = (1, 0);

/// Server name and port as reported to applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub server_name: String,
    pub server_port: u16,
}

#[derive(Debug, PartialEq, Eq)]
pub enum EnvironmentError {
    /// A required field was not supplied or is empty.
    Missing(&'static str),
}

impl std::fmt::Display for EnvironmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvironmentError::Missing(field) => write!(f, "environment field {} is missing", field),
        }
    }
}

impl std::error::Error for EnvironmentError {}

#[derive(Debug)]
pub struct Environment {
    pub version: (u8, u8),
    pub url_scheme: &'static str,
    /// Other requests may be served concurrently in this process.
    pub multithread: bool,
    pub multiprocess: bool,
    /// The application is invoked once for this worker.
    pub run_once: bool,

    pub request_method: Method,
    pub script_name: String,
    pub path_info: String,
    pub query_string: String,
    pub content_type: Option<String>,
    pub content_length: Option<usize>,
    pub server_protocol: String,
    pub server_name: String,
    pub server_port: u16,
    pub remote_addr: Option<SocketAddr>,
    /// Request headers keyed by CGI name, e.g. `HTTP_USER_AGENT`.
    pub http_headers: HashMap<String, String>,

    /// Decoded fields of a form-encoded POST body.
    pub form: Option<HashMap<String, String>>,
    pub input: Cursor<Bytes>,
}

impl Environment {
    /// Looks up a CGI variable by name.
    ///
    /// ```
    /// # use wicket::http::environ::{EnvironmentBuilder, ServerIdentity};
    /// # use wicket::http::request::{Method, RequestBuilder};
    /// let request = RequestBuilder::new()
    ///     .method(Method::GET)
    ///     .path("/search?q=rust")
    ///     .header("Host", "example.com")
    ///     .build()
    ///     .unwrap();
    /// let env = EnvironmentBuilder::new()
    ///     .request(request)
    ///     .server(ServerIdentity { server_name: "localhost".into(), server_port: 8000 })
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(env.var("QUERY_STRING").as_deref(), Some("q=rust"));
    /// assert_eq!(env.var("HTTP_HOST").as_deref(), Some("example.com"));
    /// ```
    pub fn var(&self, name: &str) -> Option<String> {
        match name {
            "REQUEST_METHOD" => Some(self.request_method.to_string()),
            "SCRIPT_NAME" => Some(self.script_name.clone()),
            "PATH_INFO" => Some(self.path_info.clone()),
            "QUERY_STRING" => Some(self.query_string.clone()),
            "CONTENT_TYPE" => self.content_type.clone(),
            "CONTENT_LENGTH" => self.content_length.map(|n| n.to_string()),
            "SERVER_PROTOCOL" => Some(self.server_protocol.clone()),
            "SERVER_NAME" => Some(self.server_name.clone()),
            "SERVER_PORT" => Some(self.server_port.to_string()),
            "REMOTE_ADDR" => self.remote_addr.map(|addr| addr.ip().to_string()),
            other => self.http_headers.get(other).cloned(),
        }
    }
}

/// Assembles an [`Environment`], checking the required fields on `build`.
#[derive(Default)]
pub struct EnvironmentBuilder {
    method: Option<Method>,
    target: Option<String>,
    protocol: Option<String>,
    server: Option<ServerIdentity>,
    remote_addr: Option<SocketAddr>,
    headers: HashMap<String, String>,
    body: Bytes,
    form: Option<HashMap<String, String>>,
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(mut self, request: Request) -> Self {
        self.method = Some(request.method);
        self.target = Some(request.path);
        self.protocol = Some(request.version);
        self.headers = request.headers;
        self.body = request.body;
        self.form = request.form;
        self
    }

    pub fn server(mut self, identity: ServerIdentity) -> Self {
        self.server = Some(identity);
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn build(self) -> Result<Environment, EnvironmentError> {
        let request_method = self.method.ok_or(EnvironmentError::Missing("REQUEST_METHOD"))?;
        let target = self
            .target
            .filter(|t| !t.is_empty())
            .ok_or(EnvironmentError::Missing("PATH_INFO"))?;
        let server_protocol = self
            .protocol
            .filter(|p| !p.is_empty())
            .ok_or(EnvironmentError::Missing("SERVER_PROTOCOL"))?;
        let server = self.server.ok_or(EnvironmentError::Missing("SERVER_NAME"))?;
        if server.server_name.is_empty() {
            return Err(EnvironmentError::Missing("SERVER_NAME"));
        }
        if server.server_port == 0 {
            return Err(EnvironmentError::Missing("SERVER_PORT"));
        }

        let (path_info, query_string) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (target, String::new()),
        };

        let mut content_type = None;
        let mut content_length = None;
        let mut http_headers = HashMap::new();
        for (name, value) in self.headers {
            match cgi_name(&name).as_str() {
                "CONTENT_TYPE" => content_type = Some(value),
                "CONTENT_LENGTH" => content_length = value.parse().ok(),
                cgi => {
                    http_headers.insert(format!("HTTP_{}", cgi), value);
                }
            }
        }

        Ok(Environment {
            version: VERSION,
            url_scheme: "http",
            multithread: true,
            multiprocess: false,
            run_once: true,
            request_method,
            script_name: String::new(),
            path_info,
            query_string,
            content_type,
            content_length,
            server_protocol,
            server_name: server.server_name,
            server_port: server.server_port,
            remote_addr: self.remote_addr,
            http_headers,
            form: self.form,
            input: Cursor::new(self.body),
        })
    }
}

/// `User-Agent` -> `USER_AGENT`
fn cgi_name(header: &str) -> String {
    header.trim().to_ascii_uppercase().replace('-', "_")
}
