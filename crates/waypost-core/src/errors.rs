use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid location: {0}")]
    InvalidLocation(String),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("place not found")]
    PlaceNotFound,
    #[error("visit not found")]
    VisitNotFound,
    #[error("store failure: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
