//! Error types for the search-mode adapters

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Number is not valid")]
    InvalidNumber,

    #[error("A search submission is already in flight")]
    SubmitInFlight,

    #[error("No location selected")]
    NoLocationSelected,

    #[error("Option source error: {0}")]
    OptionSource(String),

    #[error(transparent)]
    Query(#[from] cohort_query::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
