use thiserror::Error;

use crate::models::itinerary::GeneratedItinerary;

/// The AI response could not be decoded as an itinerary.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The response contained nothing but whitespace.
    #[error("empty AI response")]
    Empty,

    /// The response is not well-formed JSON.
    #[error("malformed AI response: {0}")]
    Malformed(#[from] sonic_rs::Error),
}

/// Decodes the raw AI response into an itinerary.
///
/// Only syntactic well-formedness is checked; the structure inside is kept as-is.
///
/// # Arguments
///
/// * `raw` - The text returned by the AI service.
///
/// # Returns
///
/// A `Result` containing the decoded `GeneratedItinerary`.
pub fn parse_itinerary(raw: &str) -> Result<GeneratedItinerary, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let value: sonic_rs::Value = sonic_rs::from_str(trimmed)?;
    tracing::debug!("🧭 AI response decoded ({} bytes)", trimmed.len());

    Ok(GeneratedItinerary::from_value(value))
}
