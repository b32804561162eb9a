//! Field normalisation and format checks shared by the mutation layer.

use once_cell::sync::Lazy;
use regex::Regex;

/// `+` followed by 7-15 digits, or `NNN-NNN-NNNN`.
static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+\d{7,15}|\d{3}-\d{3}-\d{4})$").expect("phone regex is valid"));

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_string()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed phone, or `None` when absent or blank.
pub fn normalize_phone(phone: Option<&str>) -> Option<String> {
    phone.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string)
}
