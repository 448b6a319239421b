use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackerError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unknown exercise: {0}")]
    UnknownExercise(String),
    #[error("exercise registry error: {0}")]
    Registry(String),
    #[error("pose source error: {0}")]
    Source(String),
    #[error("session sink error: {0}")]
    Sink(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("missing exercise")]
    MissingExercise,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
