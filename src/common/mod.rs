//! Common traits and helpers used across the echosrv library

pub mod test_utils;
pub mod traits;

pub use test_utils::{create_test_server, create_test_server_with_config};
pub use traits::EchoServerTrait;
