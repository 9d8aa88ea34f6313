// API clients module
pub mod cftc;
pub mod myfxbook;
pub mod report;

pub use cftc::{CftcClient, LatestNet};
pub use myfxbook::MyfxbookClient;
pub use report::ReportClient;

use thiserror::Error;

/// Typed failures callers may want to match on
#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("Myfxbook login error: {0}")]
    LoginRejected(String),
    #[error("Myfxbook login returned no session")]
    MissingSession,
}
