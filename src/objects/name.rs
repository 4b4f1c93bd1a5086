//! Property name validation
//!
//! Property names follow identifier rules:
//! - First character: ASCII letter, `_` or `$`
//! - Remaining characters: ASCII letters, digits, `_` or `$`
//! - `__type__` and `__id__` are reserved by the envelope format

use regex::Regex;
use std::sync::LazyLock;

use crate::serialize::{ID_KEY, TYPE_KEY};

use super::ClassError;

static IDENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Validate a property name.
///
/// # Examples
/// ```
/// use classkit::objects::validate_property_name;
///
/// assert!(validate_property_name("trimThreshold").is_ok());
/// assert!(validate_property_name("_isValid").is_ok());
/// assert!(validate_property_name("$x1").is_ok());
///
/// assert!(validate_property_name("").is_err());
/// assert!(validate_property_name("1st").is_err());
/// assert!(validate_property_name("with space").is_err());
/// assert!(validate_property_name("__type__").is_err());
/// ```
pub fn validate_property_name(name: &str) -> Result<(), ClassError> {
    if !IDENT_REGEX.is_match(name) {
        return Err(ClassError::InvalidPropertyName(name.to_string()));
    }
    if name == TYPE_KEY || name == ID_KEY {
        return Err(ClassError::ReservedPropertyName(name.to_string()));
    }
    Ok(())
}
