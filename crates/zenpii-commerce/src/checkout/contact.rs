//! Buyer contact details and their validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{M}\s]+$").expect("name pattern compiles"));
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{10,11}$").expect("phone pattern compiles"));

/// Receiver details for the order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// Delivery address, free text.
    pub address: String,
}

impl ContactInfo {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: phone.into(),
            address: address.into(),
        }
    }

    /// Validate every field independently.
    pub fn validate(&self) -> ContactValidity {
        ContactValidity {
            first_name: is_valid_name(&self.first_name),
            last_name: is_valid_name(&self.last_name),
            phone: is_valid_phone(&self.phone),
            address: is_valid_address(&self.address),
        }
    }
}

/// Per-field validity flags, so the offending input can be highlighted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactValidity {
    pub first_name: bool,
    pub last_name: bool,
    pub phone: bool,
    pub address: bool,
}

impl ContactValidity {
    pub fn all_valid(&self) -> bool {
        self.first_name && self.last_name && self.phone && self.address
    }
}

/// Letters (Vietnamese diacritics included) and spaces.
pub fn is_valid_name(value: &str) -> bool {
    !value.trim().is_empty() && NAME_PATTERN.is_match(value)
}

/// Ten or eleven digits.
pub fn is_valid_phone(value: &str) -> bool {
    PHONE_PATTERN.is_match(value)
}

pub fn is_valid_address(value: &str) -> bool {
    !value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert!(is_valid_name("Nguyen Van"));
        assert!(is_valid_name("Nguy\u{1ec5}n \u{0110}\u{1ee9}c"));
        assert!(!is_valid_name("R2D2"));
        assert!(!is_valid_name("   "));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn test_phones() {
        assert!(is_valid_phone("0981234567"));
        assert!(is_valid_phone("09812345678"));
        assert!(!is_valid_phone("098123456"));
        assert!(!is_valid_phone("098-123-4567"));
    }

    #[test]
    fn test_validity_flags_are_per_field() {
        let contact = ContactInfo::new("An", "Tran", "12", "1 Le Loi, Q1");
        let validity = contact.validate();
        assert!(validity.first_name);
        assert!(validity.last_name);
        assert!(!validity.phone);
        assert!(validity.address);
        assert!(!validity.all_valid());
    }
}
