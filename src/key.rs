//! Store key encoding.
//!
//! Keys follow the shared-store convention `rateLimit:{identifier}:{resource}`.
//! The mapping must be injective: two distinct identifier/resource pairs may
//! never produce the same key. Segments are embedded verbatim, so a segment
//! containing the delimiter (or an empty segment) is rejected rather than
//! escaped or hashed.

use crate::error::LimitError;

const KEY_PREFIX: &str = "rateLimit";
const DELIMITER: char = ':';

/// Encode the store key for an identifier/resource pair.
pub fn encode(identifier: &str, resource: &str) -> Result<String, LimitError> {
    check_segment(identifier, "identifier")?;
    check_segment(resource, "resource")?;
    Ok(format!("{KEY_PREFIX}{DELIMITER}{identifier}{DELIMITER}{resource}"))
}

fn check_segment(segment: &str, field: &'static str) -> Result<(), LimitError> {
    if segment.is_empty() {
        return Err(LimitError::KeyEncoding { reason: format!("{field} is empty") });
    }
    if segment.contains(DELIMITER) {
        return Err(LimitError::KeyEncoding {
            reason: format!("{field} contains the '{DELIMITER}' delimiter"),
        });
    }
    Ok(())
}
