//! Subcommand handlers.
//!
//! Commands are organized by domain:
//! - `jobs`: submitting, running and inspecting jobs
//! - `settings`: reading and writing settings

pub mod jobs;
pub mod settings;

use serde::Serialize;

/// Envelope used for `--json` output.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Prints `data` as a JSON envelope.
pub fn print_json<T: Serialize>(data: T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&ApiResponse::ok(data))?);
    Ok(())
}
