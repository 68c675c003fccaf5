//! Error types for cohort query composition

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown row filter key: {0}")]
    UnknownFilterKey(String),

    #[error("Unsupported concept datatype: {0}")]
    UnsupportedDatatype(String),
}

pub type Result<T> = std::result::Result<T, Error>;
