//! Wicket - a small HTTP/1.1 transport for synchronous applications
//!
//! Accepts connections, turns each request into an [`http::environ::Environment`]
//! and streams back whatever the [`app::Application`] produces.

pub mod app;
pub mod config;
pub mod http;
pub mod server;
