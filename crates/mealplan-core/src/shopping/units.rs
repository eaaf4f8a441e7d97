//! Unit recognition and conversion for ingredient consolidation.
//!
//! Known units are grouped into dimensions (mass, volume, count) and
//! convert through a base unit (grams, milliliters, pieces). Anything
//! unrecognized is free-form: free-form quantities only merge when the
//! unit strings match exactly.

use serde::{Deserialize, Serialize};

/// Measurement dimension. Units only convert within a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Base unit: gram.
    Mass,
    /// Base unit: milliliter.
    Volume,
    /// Base unit: piece.
    Count,
}

/// A recognized unit: display name, dimension, and base-unit factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub name: &'static str,
    pub dimension: Dimension,
    /// Multiplier to the dimension's base unit.
    pub to_base: f64,
}

const UNITS: &[(&[&str], UnitDef)] = &[
    // Mass
    (
        &["mg", "milligram", "milligrams"],
        UnitDef { name: "mg", dimension: Dimension::Mass, to_base: 0.001 },
    ),
    (
        &["g", "gram", "grams"],
        UnitDef { name: "g", dimension: Dimension::Mass, to_base: 1.0 },
    ),
    (
        &["kg", "kilogram", "kilograms"],
        UnitDef { name: "kg", dimension: Dimension::Mass, to_base: 1000.0 },
    ),
    // Volume
    (
        &["ml", "milliliter", "milliliters", "millilitre", "millilitres"],
        UnitDef { name: "ml", dimension: Dimension::Volume, to_base: 1.0 },
    ),
    (
        &["cl"],
        UnitDef { name: "cl", dimension: Dimension::Volume, to_base: 10.0 },
    ),
    (
        &["dl"],
        UnitDef { name: "dl", dimension: Dimension::Volume, to_base: 100.0 },
    ),
    (
        &["l", "liter", "liters", "litre", "litres"],
        UnitDef { name: "l", dimension: Dimension::Volume, to_base: 1000.0 },
    ),
    (
        &["tsp", "teaspoon", "teaspoons"],
        UnitDef { name: "tsp", dimension: Dimension::Volume, to_base: 5.0 },
    ),
    (
        &["tbsp", "tablespoon", "tablespoons"],
        UnitDef { name: "tbsp", dimension: Dimension::Volume, to_base: 15.0 },
    ),
    (
        &["cup", "cups"],
        UnitDef { name: "cup", dimension: Dimension::Volume, to_base: 240.0 },
    ),
    // Count
    (
        &["piece", "pieces", "pc", "pcs", "each", "ea"],
        UnitDef { name: "piece", dimension: Dimension::Count, to_base: 1.0 },
    ),
];

/// Look up a unit by its written form (case-insensitive, trailing dot
/// tolerated). Returns `None` for free-form units like "bunch".
pub fn lookup(raw: &str) -> Option<UnitDef> {
    let normalized = raw.trim().trim_end_matches('.').to_lowercase();
    UNITS
        .iter()
        .find(|(aliases, _)| aliases.contains(&normalized.as_str()))
        .map(|(_, def)| *def)
}

/// Choose the display unit for a merged group.
///
/// Among the units that actually contributed to the group, prefer the
/// largest one in which the total is at least 1 (so 500 g stays "500 g"
/// rather than "0.5 kg", while 1300 g becomes kg); if the total is below
/// 1 in every contributing unit, fall back to the smallest.
pub fn display_unit(base_total: f64, contributors: &[UnitDef]) -> UnitDef {
    debug_assert!(!contributors.is_empty());
    let mut candidates: Vec<UnitDef> = contributors.to_vec();
    candidates.sort_by(|a, b| a.to_base.total_cmp(&b.to_base));
    candidates.dedup_by(|a, b| a.name == b.name);

    candidates
        .iter()
        .rev()
        .find(|u| base_total / u.to_base >= 1.0)
        .copied()
        .unwrap_or(candidates[0])
}

/// Round a display value to human granularity: whole numbers for counts,
/// halves for measured quantities. The precise total is kept elsewhere;
/// this affects display only.
pub fn round_for_display(value: f64, dimension: Dimension) -> f64 {
    let step = match dimension {
        Dimension::Count => 1.0,
        Dimension::Mass | Dimension::Volume => 0.5,
    };
    (value / step).round() * step
}
