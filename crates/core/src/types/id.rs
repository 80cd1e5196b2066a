//! Newtype ID for type-safe product references.
//!
//! The product API hands out opaque numeric strings (e.g. `"85067212996"`).
//! They are never parsed as numbers: leading zeros and very long ids must
//! survive a round trip through the cart's local storage unchanged.

use serde::{Deserialize, Serialize};

/// Identifier of a product in the catalog.
///
/// # Example
///
/// ```rust
/// # use pocket_mall_core::ProductId;
/// let id = ProductId::new("85067212996");
/// assert_eq!(id.as_str(), "85067212996");
/// assert_eq!(id.to_string(), "85067212996");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ::core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_is_transparent() {
        let id = ProductId::new("0042");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0042\"");

        let parsed: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
