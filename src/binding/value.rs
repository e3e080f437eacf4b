//! Boolean literal recognition for message payloads
//!
//! Payloads arrive as free text from whatever publishes to the broker. Only a
//! fixed set of literals is accepted; everything else is rejected so a stray
//! publish never toggles a pin.

use thiserror::Error;

/// Literals that map to a high pin level (compared case-insensitively)
pub const TRUTHY_LITERALS: [&str; 7] = ["1", "yes", "y", "true", "t", "on", "high"];

/// Literals that map to a low pin level (compared case-insensitively)
pub const FALSY_LITERALS: [&str; 7] = ["0", "no", "n", "false", "f", "off", "low"];

/// Payload text that is not one of the recognized boolean literals
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Not a boolean value: '{literal}'")]
pub struct InvalidBooleanLiteral {
    pub literal: String,
}

/// Parse a boolean literal, ignoring surrounding whitespace and case
pub fn parse_boolean(raw: &str) -> Result<bool, InvalidBooleanLiteral> {
    let candidate = raw.trim();

    if TRUTHY_LITERALS
        .iter()
        .any(|literal| candidate.eq_ignore_ascii_case(literal))
    {
        return Ok(true);
    }

    if FALSY_LITERALS
        .iter()
        .any(|literal| candidate.eq_ignore_ascii_case(literal))
    {
        return Ok(false);
    }

    Err(InvalidBooleanLiteral {
        literal: candidate.to_string(),
    })
}

/// Check whether the text is a recognized boolean literal
pub fn is_boolean_literal(raw: &str) -> bool {
    parse_boolean(raw).is_ok()
}

/// Map a raw payload to the level that should be written to the pin
pub fn to_pin_value(raw: &str, invert: bool) -> Result<bool, InvalidBooleanLiteral> {
    parse_boolean(raw).map(|value| value != invert)
}

/// Render a pin level the way sysfs and the logs expect it
pub fn level_str(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}
