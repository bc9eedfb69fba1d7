//! Common test utilities for poddown integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod transport;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use transport::*;
