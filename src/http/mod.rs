//! HTTP hosting for the echo handlers
//!
//! A deliberately small HTTP/1.1 server and client: enough to mount a
//! [`crate::Handler`] on a TCP port and talk to it from a test.

pub mod client;
pub mod config;
pub mod protocol;
pub mod server;


pub use client::{ClientConfig, ClientConfigBuilder, HttpClient};
pub use config::HttpConfig;
pub use protocol::{BodyFraming, HttpProtocolError};
pub use server::HttpServer;
