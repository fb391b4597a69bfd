// API-level errors reported back to game code
//
// Backend and engine plumbing use anyhow; these are the problems a game can
// cause by passing bad arguments and is expected to handle.

use crate::scene::ObjectId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HopError {
    #[error("{what} must be at least {min} (got {got})")]
    TooSmall {
        what: &'static str,
        min: f32,
        got: f32,
    },

    #[error("{what} falls outside of the group boundary")]
    OutOfBounds { what: &'static str },

    #[error("unknown key name '{0}'")]
    UnknownKey(String),

    #[error("no object with id {0:?}")]
    UnknownObject(ObjectId),

    #[error("audio is not available")]
    AudioUnavailable,

    #[error("sound {path:?} could not be loaded: {reason}")]
    Sound { path: PathBuf, reason: String },

    #[error("the game window has not been started")]
    NotStarted,
}

pub type HopResult<T> = std::result::Result<T, HopError>;

/// Ensure `got >= min`, naming the offending value in the error.
pub(crate) fn at_least(what: &'static str, got: f32, min: f32) -> HopResult<()> {
    if got < min {
        Err(HopError::TooSmall { what, min, got })
    } else {
        Ok(())
    }
}
