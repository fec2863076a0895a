// handlers/mod.rs - Request handlers grouped by security tier
//
// Public (no token required) → Protected (bearer access token required)
pub mod protected;
pub mod public;

use serde::Serialize;

use crate::error::ApiError;

/// Plain acknowledgement body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Collect required string inputs, reporting every field that is missing or empty.
pub(crate) fn require_fields<'a, const N: usize>(
    message: &str,
    fields: [(&'static str, &'a Option<String>); N],
) -> Result<[&'a str; N], ApiError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
        .map(|(name, _)| *name)
        .collect();

    if !missing.is_empty() {
        return Err(ApiError::missing_fields(message, &missing));
    }

    Ok(fields.map(|(_, value)| value.as_deref().unwrap_or_default()))
}
