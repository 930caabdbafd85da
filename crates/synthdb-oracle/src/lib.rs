//! synthdb-oracle: HTTP code oracle for the augmentation loop
//!
//! Implements [`synthdb_core::augment::CodeOracle`] over a bearer-token
//! completion endpoint with bounded retries.

pub mod error;
pub mod http;

pub use error::{OracleError, OracleResult};
pub use http::HttpOracle;
