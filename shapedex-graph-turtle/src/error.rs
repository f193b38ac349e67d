//! Error types for shapedex-graph-turtle

use thiserror::Error;

/// Result type alias using TurtleError
pub type Result<T> = std::result::Result<T, TurtleError>;

/// Turtle parsing errors
#[derive(Error, Debug)]
pub enum TurtleError {
    /// Lexical error with position context
    #[error("turtle lexer error: {message}")]
    Lexer { position: usize, message: String },

    /// Syntax error at a token position
    #[error("turtle parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    /// Prefixed name used an undeclared prefix
    #[error("undefined prefix: '{0}'")]
    UndefinedPrefix(String),

    /// Relative IRI without a usable base
    #[error("cannot resolve IRI: {0}")]
    IriResolution(String),
}

impl TurtleError {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        TurtleError::Parse {
            position,
            message: message.into(),
        }
    }
}
