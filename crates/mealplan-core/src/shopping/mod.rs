//! Shopping consolidation: merge ingredient lines across a plan's recipes
//! into a deduplicated, unit-normalized, store-ready list.
//!
//! The pipeline is scale -> canonicalize -> group -> sum -> round -> order.
//! Quantities are never discarded: lines that cannot merge (incompatible or
//! missing units) stay separate and are flagged for manual review. Precise
//! totals are stored unrounded so repeated consolidation is idempotent;
//! rounding applies to the displayed value only.

pub mod synonyms;
pub mod units;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::recipe::{Recipe, RecipeId};
use synonyms::{SynonymTable, fold};
use units::{Dimension, UnitDef};

/// Coarse store category. Declaration order is the display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Produce,
    Protein,
    Dairy,
    Pantry,
    Other,
}

impl Category {
    /// Map a recipe's free-form category hint onto a coarse category.
    pub fn from_hint(hint: Option<&str>) -> Self {
        let Some(hint) = hint else {
            return Self::Other;
        };
        let hint = hint.to_lowercase();
        if hint.contains("produce") || hint.contains("vegetable") || hint.contains("fruit") {
            Self::Produce
        } else if hint.contains("protein")
            || hint.contains("meat")
            || hint.contains("fish")
            || hint.contains("seafood")
        {
            Self::Protein
        } else if hint.contains("dairy") {
            Self::Dairy
        } else if hint.contains("pantry")
            || hint.contains("spice")
            || hint.contains("condiment")
            || hint.contains("grain")
        {
            Self::Pantry
        } else {
            Self::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Produce => "produce",
            Self::Protein => "protein",
            Self::Dairy => "dairy",
            Self::Pantry => "pantry",
            Self::Other => "other",
        }
    }
}

/// One consolidated shopping-list line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    /// Canonical ingredient name.
    pub name: String,
    /// Exact total in the base unit (grams/milliliters/pieces), unrounded.
    /// `None` when the source lines carried no quantity.
    pub precise_quantity: Option<f64>,
    /// Human-granularity amount in `unit`, for display only.
    pub display_quantity: Option<f64>,
    /// Display unit ("g", "tbsp", "bunch", ...). `None` for bare counts.
    pub unit: Option<String>,
    pub category: Category,
    /// Recipes that contributed to this line (traceability).
    pub sources: Vec<RecipeId>,
    /// Set when this line could not merge with same-name lines (mixed or
    /// missing units) and deserves a human look.
    pub needs_review: bool,
}

/// An ordered, consolidated shopping list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub lines: Vec<IngredientLine>,
}

impl ShoppingList {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in a given category, in list order.
    pub fn lines_in(&self, category: Category) -> impl Iterator<Item = &IngredientLine> {
        self.lines.iter().filter(move |l| l.category == category)
    }

    /// Content fingerprint: sorted (name, unit, precise-total bits).
    ///
    /// Two lists with equal fingerprints carry the same quantities in some
    /// order; used to validate reordered lists from the external optimizer.
    pub fn fingerprint(&self) -> Vec<(String, Option<String>, Option<u64>)> {
        let mut fp: Vec<_> = self
            .lines
            .iter()
            .map(|l| {
                (
                    l.name.clone(),
                    l.unit.clone(),
                    l.precise_quantity.map(f64::to_bits),
                )
            })
            .collect();
        fp.sort();
        fp
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Merge key. Measured lines merge per dimension; free-form units merge
/// only on an exact unit match; missing quantities never merge with
/// quantified lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Measured { name: String, dimension: Dimension },
    Freeform { name: String, unit: String },
    Unitless { name: String },
    NoQuantity { name: String, unit: Option<String> },
}

impl GroupKey {
    fn name(&self) -> &str {
        match self {
            Self::Measured { name, .. }
            | Self::Freeform { name, .. }
            | Self::Unitless { name }
            | Self::NoQuantity { name, .. } => name,
        }
    }
}

#[derive(Debug, Default)]
struct Group {
    /// Scaled base-unit contributions; summed in sorted order so the total
    /// is independent of input order.
    contributions: Vec<f64>,
    /// Units that contributed (measured groups only).
    unit_defs: Vec<UnitDef>,
    sources: Vec<RecipeId>,
    category: Option<Category>,
}

impl Group {
    fn add_source(&mut self, id: RecipeId) {
        if !self.sources.contains(&id) {
            self.sources.push(id);
        }
    }

    fn note_category(&mut self, hint: Option<&str>) {
        let category = Category::from_hint(hint);
        if self.category.is_none() || (self.category == Some(Category::Other) && hint.is_some()) {
            self.category = Some(category);
        }
    }

    fn precise_total(&self) -> f64 {
        let mut parts = self.contributions.clone();
        parts.sort_by(f64::total_cmp);
        parts.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// Consolidation
// ---------------------------------------------------------------------------

/// Consolidate the ingredient lists of `recipes`, scaled to
/// `requested_servings`, into one shopping list.
///
/// Output ordering is category groups (produce, protein, dairy, pantry,
/// other) with alphabetical lines within each; any external reordering
/// happens later and falls back to this list.
pub fn consolidate(
    recipes: &[Recipe],
    requested_servings: u32,
    synonyms: &SynonymTable,
) -> Result<ShoppingList, PlanError> {
    if requested_servings == 0 {
        return Err(PlanError::InvalidParameter {
            name: "servings",
            message: "must be at least 1, got 0".to_string(),
        });
    }
    if recipes.is_empty() {
        return Err(PlanError::EmptyCorpus);
    }

    let mut groups: HashMap<GroupKey, Group> = HashMap::new();

    for recipe in recipes {
        let ratio = f64::from(requested_servings) / f64::from(recipe.servings.max(1));

        for ingredient in &recipe.ingredients {
            let name = synonyms.canonical(&ingredient.name);
            let unit_raw = ingredient.unit.as_deref().map(fold).filter(|u| !u.is_empty());

            let key = match (ingredient.quantity, unit_raw.as_deref()) {
                (Some(_), Some(raw)) => match units::lookup(raw) {
                    Some(def) => GroupKey::Measured {
                        name: name.clone(),
                        dimension: def.dimension,
                    },
                    None => GroupKey::Freeform {
                        name: name.clone(),
                        unit: raw.to_string(),
                    },
                },
                (Some(_), None) => GroupKey::Unitless { name: name.clone() },
                (None, _) => GroupKey::NoQuantity {
                    name: name.clone(),
                    unit: unit_raw.clone(),
                },
            };

            let group = groups.entry(key).or_default();
            group.add_source(recipe.id);
            group.note_category(ingredient.category.as_deref());

            if let Some(quantity) = ingredient.quantity {
                let scaled = quantity * ratio;
                match unit_raw.as_deref().and_then(units::lookup) {
                    Some(def) => {
                        group.contributions.push(scaled * def.to_base);
                        group.unit_defs.push(def);
                    }
                    None => group.contributions.push(scaled),
                }
            }
        }
    }

    // A name spread over several groups means its units could not merge.
    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for key in groups.keys() {
        *name_counts.entry(key.name()).or_insert(0) += 1;
    }

    let mut lines: Vec<IngredientLine> = groups
        .iter()
        .map(|(key, group)| build_line(key, group, name_counts[key.name()] > 1))
        .collect();

    lines.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.unit.cmp(&b.unit))
    });

    Ok(ShoppingList { lines })
}

fn build_line(key: &GroupKey, group: &Group, split_name: bool) -> IngredientLine {
    let category = group.category.unwrap_or(Category::Other);
    let sources = group.sources.clone();

    match key {
        GroupKey::Measured { name, dimension } => {
            let precise = group.precise_total();
            let unit = units::display_unit(precise, &group.unit_defs);
            let display = units::round_for_display(precise / unit.to_base, *dimension);
            IngredientLine {
                name: name.clone(),
                precise_quantity: Some(precise),
                display_quantity: Some(display),
                unit: Some(unit.name.to_string()),
                category,
                sources,
                needs_review: split_name,
            }
        }
        GroupKey::Freeform { name, unit } => {
            let precise = group.precise_total();
            IngredientLine {
                name: name.clone(),
                precise_quantity: Some(precise),
                display_quantity: Some(units::round_for_display(precise, Dimension::Count)),
                unit: Some(unit.clone()),
                category,
                sources,
                needs_review: split_name,
            }
        }
        GroupKey::Unitless { name } => {
            let precise = group.precise_total();
            IngredientLine {
                name: name.clone(),
                precise_quantity: Some(precise),
                display_quantity: Some(units::round_for_display(precise, Dimension::Count)),
                unit: None,
                category,
                sources,
                needs_review: split_name,
            }
        }
        // Missing quantity: keep the line, flag it, merge nothing.
        GroupKey::NoQuantity { name, unit } => IngredientLine {
            name: name.clone(),
            precise_quantity: None,
            display_quantity: None,
            unit: unit.clone(),
            category,
            sources,
            needs_review: true,
        },
    }
}
