//! The client error module.

use std::io;

use thiserror::Error;

use crate::state::State;

/// Errors returned by the public `Client` operations.
///
/// Failures found while handling timers or replies are logged and never
/// leave the handler that found them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("The operation is not allowed in the {0} state")]
    InvalidState(State),
    #[error("Endpoint error: {0}")]
    Endpoint(#[from] io::Error),
}

pub type Result<T> = ::std::result::Result<T, Error>;
