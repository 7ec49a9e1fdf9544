//! Typed identifiers.
//!
//! Order ids arrive as JSON integers on the push channel and as attribute
//! strings on the page. The newtype keeps the two from being compared as
//! strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    /// Create an ID from its numeric value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the numeric value.
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Parse an id from a page attribute.
    ///
    /// Leading whitespace and an optional sign are accepted, then as many
    /// decimal digits as are present. Anything after the digits is ignored,
    /// so `"42abc"` reads as 42. Returns `None` when no digit follows.
    pub fn parse_attribute(raw: &str) -> Option<Self> {
        let s = raw.trim_start();
        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len == 0 {
            return None;
        }

        let magnitude: i64 = rest[..digits_len].parse().ok()?;
        Some(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_display() {
        assert_eq!(OrderId::new(42).to_string(), "42");
    }

    #[test]
    fn test_order_id_deserializes_from_integer() {
        let id: OrderId = serde_json::from_str("17").unwrap();
        assert_eq!(id, OrderId::new(17));
    }

    // === Attribute Parsing ===

    #[test]
    fn test_parse_attribute_plain() {
        assert_eq!(OrderId::parse_attribute("42"), Some(OrderId::new(42)));
    }

    #[test]
    fn test_parse_attribute_whitespace_and_sign() {
        assert_eq!(OrderId::parse_attribute("  7"), Some(OrderId::new(7)));
        assert_eq!(OrderId::parse_attribute("+7"), Some(OrderId::new(7)));
        assert_eq!(OrderId::parse_attribute("-3"), Some(OrderId::new(-3)));
    }

    #[test]
    fn test_parse_attribute_trailing_garbage() {
        assert_eq!(OrderId::parse_attribute("42abc"), Some(OrderId::new(42)));
        assert_eq!(OrderId::parse_attribute("12.9"), Some(OrderId::new(12)));
    }

    #[test]
    fn test_parse_attribute_rejects_non_numeric() {
        assert_eq!(OrderId::parse_attribute(""), None);
        assert_eq!(OrderId::parse_attribute("abc"), None);
        assert_eq!(OrderId::parse_attribute("-"), None);
        assert_eq!(OrderId::parse_attribute("99999999999999999999"), None);
    }
}
