//! Recipe state types.
//!
//! Everything in this module is part of the persisted fragment, so all types
//! derive Serialize/Deserialize with the wire names the fragment uses.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a liquid or solid, drawn from `RecipeState::next_id`.
///
/// Serialized as a bare integer; as a JSON object key it becomes the
/// decimal string form (`"0"`, `"1"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(pub u64);

impl fmt::Display for IngredientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for IngredientId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(IngredientId)
            .map_err(|_| format!("invalid ingredient id '{}'", s))
    }
}

// ============================================================================
// Ingredients
// ============================================================================

/// A liquid ingredient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Liquid {
    #[serde(default)]
    pub name: String,

    /// Percentage of total volume (0–100). `None` fills the remainder.
    #[serde(default)]
    pub amount: Option<f64>,
}

/// A solid ingredient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    #[serde(default)]
    pub name: String,

    /// Volume displaced per unit mass per unit total volume.
    #[serde(default)]
    pub displacement: Option<f64>,

    /// Concentration (mass per unit volume).
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Which map an ingredient lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngredientKind {
    Liquid,
    Solid,
}

impl fmt::Display for IngredientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngredientKind::Liquid => write!(f, "liquid"),
            IngredientKind::Solid => write!(f, "solid"),
        }
    }
}

/// A single-field edit applied by `RecipeState::update_field`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Name(String),
    Amount(Option<f64>),
    Displacement(Option<f64>),
}

impl FieldUpdate {
    /// Wire name of the field this update touches.
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldUpdate::Name(_) => "name",
            FieldUpdate::Amount(_) => "amount",
            FieldUpdate::Displacement(_) => "displacement",
        }
    }
}

/// A mutation that could not be applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("unknown ingredient {0}")]
    UnknownIngredient(IngredientId),
    #[error("{kind} {id} has no field '{field}'")]
    NoSuchField {
        id: IngredientId,
        kind: IngredientKind,
        field: &'static str,
    },
    #[error("ingredient ids exhausted")]
    IdsExhausted,
}

/// Parse a user-entered number. Empty, `-`, unparsable and non-finite input
/// all mean "unset".
pub fn parse_amount(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ============================================================================
// Recipe state
// ============================================================================

pub const DEFAULT_VOLUME_UNITS: &str = "mL";
pub const DEFAULT_MASS_UNITS: &str = "g";

/// The whole persisted recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeState {
    /// Catalog key carried by short-link fragments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tinyurl: Option<String>,

    /// Next id to hand out. Never decreases.
    #[serde(rename = "uid", default)]
    pub next_id: u64,

    /// Target output volume in `volume_units`.
    #[serde(rename = "volume", default)]
    pub total_volume: Option<f64>,

    #[serde(default = "default_volume_units")]
    pub volume_units: String,

    #[serde(default = "default_mass_units")]
    pub mass_units: String,

    /// Liquids in insertion order.
    #[serde(default)]
    pub liquids: IndexMap<IngredientId, Liquid>,

    /// Solids in insertion order.
    #[serde(default)]
    pub solids: IndexMap<IngredientId, Solid>,
}

fn default_volume_units() -> String {
    DEFAULT_VOLUME_UNITS.to_string()
}

fn default_mass_units() -> String {
    DEFAULT_MASS_UNITS.to_string()
}

impl Default for RecipeState {
    fn default() -> Self {
        RecipeState {
            tinyurl: None,
            next_id: 0,
            total_volume: None,
            volume_units: default_volume_units(),
            mass_units: default_mass_units(),
            liquids: IndexMap::new(),
            solids: IndexMap::new(),
        }
    }
}

impl RecipeState {
    /// Hand out `next_id`. The last u64 is never handed out, so the counter
    /// always stays above every id in use.
    fn allocate_id(&mut self) -> Result<IngredientId, StateError> {
        let next = self
            .next_id
            .checked_add(1)
            .ok_or(StateError::IdsExhausted)?;
        let id = IngredientId(self.next_id);
        self.next_id = next;
        Ok(id)
    }

    /// Append an empty liquid and return its id.
    pub fn add_liquid(&mut self) -> Result<IngredientId, StateError> {
        let id = self.allocate_id()?;
        self.liquids.insert(id, Liquid::default());
        Ok(id)
    }

    /// Append an empty solid and return its id.
    pub fn add_solid(&mut self) -> Result<IngredientId, StateError> {
        let id = self.allocate_id()?;
        self.solids.insert(id, Solid::default());
        Ok(id)
    }

    /// Which map holds `id`, if any.
    pub fn kind_of(&self, id: IngredientId) -> Option<IngredientKind> {
        if self.liquids.contains_key(&id) {
            Some(IngredientKind::Liquid)
        } else if self.solids.contains_key(&id) {
            Some(IngredientKind::Solid)
        } else {
            None
        }
    }

    /// Remove an ingredient. Remaining entries keep their order; the id is
    /// never handed out again.
    pub fn remove(&mut self, id: IngredientId) -> Option<IngredientKind> {
        if self.liquids.shift_remove(&id).is_some() {
            Some(IngredientKind::Liquid)
        } else if self.solids.shift_remove(&id).is_some() {
            Some(IngredientKind::Solid)
        } else {
            None
        }
    }

    /// Replace one field of one ingredient in place.
    pub fn update_field(&mut self, id: IngredientId, update: FieldUpdate) -> Result<(), StateError> {
        if let Some(liquid) = self.liquids.get_mut(&id) {
            return match update {
                FieldUpdate::Name(name) => {
                    liquid.name = name;
                    Ok(())
                }
                FieldUpdate::Amount(amount) => {
                    liquid.amount = amount;
                    Ok(())
                }
                FieldUpdate::Displacement(_) => Err(StateError::NoSuchField {
                    id,
                    kind: IngredientKind::Liquid,
                    field: "displacement",
                }),
            };
        }
        if let Some(solid) = self.solids.get_mut(&id) {
            match update {
                FieldUpdate::Name(name) => solid.name = name,
                FieldUpdate::Amount(amount) => solid.amount = amount,
                FieldUpdate::Displacement(d) => solid.displacement = d,
            }
            return Ok(());
        }
        Err(StateError::UnknownIngredient(id))
    }

    /// Raise `next_id` past every id in use. Returns whether it changed;
    /// fails when the largest id leaves no room above it.
    pub fn repair_next_id(&mut self) -> Result<bool, StateError> {
        let max = self
            .liquids
            .keys()
            .chain(self.solids.keys())
            .map(|id| id.0)
            .max();
        match max {
            Some(max) if self.next_id <= max => {
                self.next_id = max.checked_add(1).ok_or(StateError::IdsExhausted)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
