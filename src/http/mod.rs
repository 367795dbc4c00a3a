//! HTTP/1.1 transport: one request per connection.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection worker and its state machine
//! - **`reader`**: buffers bytes until a whole request has arrived
//! - **`parser`**: splits the buffer into request line, headers and body
//! - **`request`**: the parsed request
//! - **`environ`**: the environment handed to the application
//! - **`response`**: start_response / write discipline
//! - **`writer`**: header serialization and socket writes
//! - **`body`**: file-backed response bodies
//!
//! # Worker State Machine
//!
//! ```text
//!   Spawned ──► Reading ──► Parsed ──► Dispatched ──► Responded ──► Terminated
//!                  │           (malformed: 400) ──────────▲
//!                  └─ any error ──► Failed
//! ```

pub mod body;
pub mod connection;
pub mod environ;
pub mod parser;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;
