//! Switchyard error abstractions.

use thiserror::Error;

/// Controller error variants.
#[derive(Debug, Error)]
pub enum Error {
    /// A stage was invoked without the attributes it requires. This aborts the whole pass.
    #[error("missing attributes in cluster event, requires {0}")]
    MissingAttributes(&'static str),
    /// A resource references a state model which is not defined.
    #[error("state model '{state_model}' referenced by resource '{resource}' is not defined")]
    UnknownStateModel { resource: String, state_model: String },
    /// A deleted resource has no state model recorded in current state.
    #[error("no state model is known for deleted resource '{resource}'")]
    MissingStateModelRef { resource: String },
    /// The given input was invalid.
    #[error("validation error: {0}")]
    InvalidInput(String),
    /// The message store failed to persist a message.
    #[error("message store error: {0}")]
    Store(anyhow::Error),
}

/// Errors resolving a state's capacity specifier into a concrete bound.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CapacityError {
    /// The specifier is neither an integer nor one of the `R`/`N` sentinels.
    #[error("invalid capacity specifier '{value}'")]
    Invalid { value: String },
    /// The state has no capacity specifier at all.
    #[error("no capacity specifier declared")]
    Missing,
}

/// A result type where the error is a Switchyard `Error`.
pub type Result<T> = ::std::result::Result<T, Error>;
