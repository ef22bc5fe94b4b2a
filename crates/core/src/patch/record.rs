//! Patch records and the manifest document that lists them.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("valid year pattern"));

/// One entry of the manifest's `balance` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRecord {
    /// Identifier/version label, unique within the manifest.
    pub patch: String,
    /// Relative path to the patch detail page.
    pub link: String,
    /// Human-readable date, `Month D, YYYY`.
    pub date: String,
    /// Fields the schema does not know about. Kept only to warn about them.
    #[serde(flatten, skip_serializing)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PatchRecord {
    pub fn new(patch: &str, link: &str, date: &str) -> Self {
        Self { patch: patch.to_string(), link: link.to_string(), date: date.to_string(), extra: BTreeMap::new() }
    }

    /// The first four-digit run in the date, if any.
    pub fn year(&self) -> Option<&str> {
        YEAR.find(&self.date).map(|m| m.as_str())
    }
}

/// The manifest document: `{"balance": [PatchRecord, ...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub balance: Vec<PatchRecord>,
}

impl Manifest {
    /// Parse a manifest body with the strict record schema.
    ///
    /// # Errors
    ///
    /// Returns `Error::DataFormat` if the body is not JSON, a record is
    /// missing a field or has a field of the wrong type, or the `balance`
    /// array is absent or empty.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let manifest: Manifest =
            serde_json::from_slice(body).map_err(|e| Error::DataFormat(format!("invalid manifest: {e}")))?;

        if manifest.balance.is_empty() {
            return Err(Error::DataFormat("Invalid data format: Missing Balance data.".into()));
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO: &str = r#"{"balance":[
        {"patch":"4758","link":"pages/balance/4758.html","date":"August 21, 2025"},
        {"patch":"4757","link":"pages/balance/4757.html","date":"August 1, 2025"}
    ]}"#;

    #[test]
    fn test_parse_preserves_order() {
        let manifest = Manifest::parse(TWO.as_bytes()).unwrap();
        assert_eq!(manifest.balance.len(), 2);
        assert_eq!(manifest.balance[0].patch, "4758");
        assert_eq!(manifest.balance[1].patch, "4757");
    }

    #[test]
    fn test_missing_balance_is_format_error() {
        let result = Manifest::parse(br#"{"other":[]}"#);
        assert!(matches!(result, Err(Error::DataFormat(_))));
    }

    #[test]
    fn test_empty_balance_is_format_error() {
        let result = Manifest::parse(br#"{"balance":[]}"#);
        assert!(matches!(result, Err(Error::DataFormat(msg)) if msg.contains("Missing Balance data")));
    }

    #[test]
    fn test_missing_field_is_format_error() {
        let result = Manifest::parse(br#"{"balance":[{"patch":"1","date":"May 1, 2020"}]}"#);
        assert!(matches!(result, Err(Error::DataFormat(msg)) if msg.contains("link")));
    }

    #[test]
    fn test_wrong_type_is_format_error() {
        let result = Manifest::parse(br#"{"balance":[{"patch":4758,"link":"pages/a.html","date":"May 1, 2020"}]}"#);
        assert!(matches!(result, Err(Error::DataFormat(_))));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(Manifest::parse(b"<html>"), Err(Error::DataFormat(_))));
    }

    #[test]
    fn test_extra_fields_captured() {
        let body = br#"{"balance":[{"patch":"1","link":"pages/a.html","date":"May 1, 2020","notes":"x"}]}"#;
        let manifest = Manifest::parse(body).unwrap();
        assert!(manifest.balance[0].extra.contains_key("notes"));
    }

    #[test]
    fn test_year_extraction() {
        assert_eq!(PatchRecord::new("1", "l", "August 21, 2025").year(), Some("2025"));
        assert_eq!(PatchRecord::new("1", "l", "Unknown").year(), None);
    }
}
