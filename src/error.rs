//! Typed error taxonomy for the engine.
//!
//! Mirrors the four error kinds the engine distinguishes: a bad configuration
//! aborts before any worker spawns, a resource failure takes down just the
//! worker that hit it, a protocol failure is local to one candidate, and a
//! logic error means this crate has a bug.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("resource error ({context}): {source}")]
    Resource {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("internal invariant violated: {0}")]
    Logic(String),
}

impl EngineError {
    pub fn resource(context: impl Into<String>, source: std::io::Error) -> Self {
        EngineError::Resource {
            context: context.into(),
            source,
        }
    }

    pub fn config(msg: impl fmt::Display) -> Self {
        EngineError::Config(msg.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
