//! Partition identifier normalization and validation
//!
//! A [`PartitionId`] is the only value this crate ever interpolates into a
//! data-definition statement, so the grammar check is enforced by the type:
//! there is no way to construct one that does not match
//! `^[a-z][a-z0-9_]*$` with length <= 63.

use serde::{Deserialize, Serialize};
use std::fmt;
use tradeforge_common::errors::{AppError, Result};

/// Maximum identifier length. Postgres truncates identifiers at 63 bytes;
/// staying within that keeps the stored value and the catalog value equal.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// A validated partition identifier.
///
/// Immutable once assigned to a tenant; used as the schema name, the
/// connection-cache key, and the selector parameter in scoped connection
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartitionId(String);

impl PartitionId {
    /// Normalize a human display name into a partition identifier.
    ///
    /// Lowercase, trim, collapse every run of characters outside
    /// `[a-z0-9]` into a single underscore, strip edge underscores,
    /// truncate to [`MAX_IDENTIFIER_LEN`]. Deterministic and idempotent.
    pub fn normalize(display_name: &str) -> Result<Self> {
        let lowered = display_name.trim().to_lowercase();

        let mut out = String::with_capacity(lowered.len());
        let mut pending_separator = false;

        for ch in lowered.chars() {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
                if pending_separator && !out.is_empty() {
                    out.push('_');
                }
                pending_separator = false;
                out.push(ch);
            } else {
                pending_separator = true;
            }
        }

        out.truncate(MAX_IDENTIFIER_LEN);
        while out.ends_with('_') {
            out.pop();
        }

        Self::validated(out, display_name)
    }

    /// Strict parse of an already-normalized identifier.
    ///
    /// Used on operator input paths, where the caller supplies the
    /// identifier directly rather than a display name.
    pub fn parse(s: &str) -> Result<Self> {
        let candidate = s.to_string();
        if candidate != Self::normalize(s).map(|p| p.0).unwrap_or_default() {
            return Err(AppError::InvalidIdentifier {
                input: s.to_string(),
                reason: "not in normalized form".into(),
            });
        }
        Self::validated(candidate, s)
    }

    fn validated(candidate: String, original: &str) -> Result<Self> {
        if candidate.is_empty() {
            return Err(AppError::InvalidIdentifier {
                input: original.to_string(),
                reason: "normalization produced an empty identifier".into(),
            });
        }

        let first = candidate.chars().next().unwrap_or('_');
        if !first.is_ascii_lowercase() {
            return Err(AppError::InvalidIdentifier {
                input: original.to_string(),
                reason: "identifier must start with a letter".into(),
            });
        }

        debug_assert!(candidate.len() <= MAX_IDENTIFIER_LEN);
        debug_assert!(candidate
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));

        Ok(Self(candidate))
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<PartitionId> for String {
    fn from(id: PartitionId) -> Self {
        id.0
    }
}

impl TryFrom<String> for PartitionId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_grammar(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= MAX_IDENTIFIER_LEN
            && s.chars().next().unwrap().is_ascii_lowercase()
            && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }

    #[test]
    fn test_normalize_basic() {
        assert_eq!(PartitionId::normalize("Sirhame Shop ").unwrap().as_str(), "sirhame_shop");
        assert_eq!(PartitionId::normalize("Acme Inc").unwrap().as_str(), "acme_inc");
        assert_eq!(PartitionId::normalize("ACME").unwrap().as_str(), "acme");
    }

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(PartitionId::normalize("a - b -- c").unwrap().as_str(), "a_b_c");
        assert_eq!(PartitionId::normalize("  a  &&  b  ").unwrap().as_str(), "a_b");
    }

    #[test]
    fn test_normalize_strips_edge_underscores() {
        assert_eq!(PartitionId::normalize("--shop--").unwrap().as_str(), "shop");
        assert_eq!(PartitionId::normalize("shop!!!").unwrap().as_str(), "shop");
    }

    #[test]
    fn test_normalize_rejects_unusable_input() {
        assert!(PartitionId::normalize("").is_err());
        assert!(PartitionId::normalize("   ").is_err());
        assert!(PartitionId::normalize("!!! ???").is_err());
        // Digit-initial names have no valid identifier form
        assert!(PartitionId::normalize("123 Shop").is_err());
        assert!(PartitionId::normalize("7-Eleven").is_err());
    }

    #[test]
    fn test_normalize_truncates() {
        let long = "a".repeat(200);
        let id = PartitionId::normalize(&long).unwrap();
        assert_eq!(id.as_str().len(), MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn test_normalize_truncation_strips_trailing_underscore() {
        // Truncation can cut in the middle of a separator run
        let name = format!("{} {}", "a".repeat(MAX_IDENTIFIER_LEN), "b");
        let id = PartitionId::normalize(&name).unwrap();
        assert!(!id.as_str().ends_with('_'));
        assert!(matches_grammar(id.as_str()));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "Sirhame Shop ",
            "Acme & Sons, Ltd.",
            "café du monde",
            "A1 Trading",
            "x",
            "Ünïcode Störe",
        ];
        for input in inputs {
            let once = PartitionId::normalize(input).unwrap();
            let twice = PartitionId::normalize(once.as_str()).unwrap();
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_normalize_output_always_matches_grammar() {
        let inputs = [
            "Sirhame Shop",
            "  spaced   out  ",
            "MixedCASE-and-digits-42",
            "trailing   ",
            "a!b@c#d$e%f",
            "ünïcode çafé",
            &"z".repeat(500),
        ];
        for input in inputs {
            let id = PartitionId::normalize(input).unwrap();
            assert!(matches_grammar(id.as_str()), "bad output for {input:?}: {id}");
        }
    }

    #[test]
    fn test_parse_accepts_normalized_only() {
        assert!(PartitionId::parse("sirhame_shop").is_ok());
        assert!(PartitionId::parse("Sirhame Shop").is_err());
        assert!(PartitionId::parse("_shop").is_err());
        assert!(PartitionId::parse("shop_").is_err());
        assert!(PartitionId::parse("9shop").is_err());
        assert!(PartitionId::parse("shop; DROP SCHEMA public").is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let id = PartitionId::normalize("Sirhame Shop").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sirhame_shop\"");
        let back: PartitionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        // Deserialization runs the same validation
        assert!(serde_json::from_str::<PartitionId>("\"Not Valid\"").is_err());
    }
}
