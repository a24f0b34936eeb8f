//! Command-line value errors

use thiserror::Error;

/// Rejected argument values. clap wraps these into its own usage errors;
/// request failures are `admin_client::Error` and never pass through here.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("unknown HTTP method: {0}")]
    InvalidMethod(String),

    #[error("invalid query {0:?}, expected key=value")]
    InvalidQuery(String),
}
