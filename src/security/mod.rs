//! Resource limits applied to incoming requests

pub mod limits;

pub use limits::{SizeError, SizeValidator};
