//! CLI error types.

use std::error::Error as _;

use randomx_prebuilt::StageError;
use thiserror::Error;

/// Errors surfaced by the command-line tool.
#[derive(Debug, Error)]
pub enum CliError {
    /// Staging failed.
    #[error("staging failed")]
    Stage(#[from] StageError),

    /// Logging could not be initialized.
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

impl CliError {
    /// Render the error followed by each underlying cause on its own line.
    pub fn report(&self) -> String {
        let mut out = format!("error: {}", self);
        let mut source = self.source();
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        out
    }
}
