//! The `utils` module provides the pieces shared by every other module of
//! `msgbroker`: the crate-wide error type and the logging bootstrap.

pub mod error;
pub mod logging;

pub use error::{BrokerError, Result};
