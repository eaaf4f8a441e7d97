//! Ingredient-name canonicalization.
//!
//! Folding (case/whitespace) is fixed logic; the synonym mapping itself is
//! external static data. A default table ships embedded in the crate
//! (`data/synonyms.toml`) and callers may load their own.

use std::collections::HashMap;

use serde::Deserialize;

/// The embedded default synonym table.
static DEFAULT_SYNONYMS_TOML: &str = include_str!("../../data/synonyms.toml");

/// Maps ingredient-name aliases to a canonical form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SynonymTable {
    #[serde(default)]
    synonyms: HashMap<String, String>,
}

impl SynonymTable {
    /// Parse a table from TOML (`[synonyms]` map of alias -> canonical).
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the embedded default table.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. This is a compile-time
    /// invariant -- if the crate built, the TOML is valid.
    pub fn builtin() -> Self {
        Self::from_toml_str(DEFAULT_SYNONYMS_TOML).expect("embedded synonyms.toml is invalid")
    }

    /// Canonical form of an ingredient name: folded, then synonym-mapped.
    pub fn canonical(&self, raw: &str) -> String {
        let folded = fold(raw);
        match self.synonyms.get(&folded) {
            Some(canonical) => canonical.clone(),
            None => folded,
        }
    }
}

/// Case-fold and collapse whitespace.
pub fn fold(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_normalizes_case_and_whitespace() {
        assert_eq!(fold("  Green   Onion "), "green onion");
        assert_eq!(fold("CHICKEN\tthigh"), "chicken thigh");
    }

    #[test]
    fn builtin_table_parses() {
        let table = SynonymTable::builtin();
        assert_eq!(table.canonical("Scallion"), "green onion");
        assert_eq!(table.canonical("scallions"), "green onion");
    }

    #[test]
    fn unknown_names_pass_through_folded() {
        let table = SynonymTable::builtin();
        assert_eq!(table.canonical("  Chicken  Thigh "), "chicken thigh");
    }

    #[test]
    fn custom_table_overrides() {
        let table = SynonymTable::from_toml_str(
            r#"
[synonyms]
"napa" = "napa cabbage"
"#,
        )
        .unwrap();
        assert_eq!(table.canonical("Napa"), "napa cabbage");
        // No builtin entries in a custom table.
        assert_eq!(table.canonical("scallion"), "scallion");
    }
}
