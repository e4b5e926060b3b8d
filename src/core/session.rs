//! Session controller: the single owner of a `RecipeState`.
//!
//! Every mutating call re-encodes the state and hands the fragment to the
//! `FragmentStore`, so the store always holds the latest recipe.

use super::codec;
use super::engine::{compute_recipe, RecipeLine};
use super::types::{FieldUpdate, IngredientId, IngredientKind, RecipeState, StateError};
use crate::catalog::{CatalogError, KnownSolids};

/// Where the encoded fragment lives between loads.
pub trait FragmentStore {
    /// Current fragment text (may be empty).
    fn load(&self) -> String;

    /// Replace the fragment text.
    fn persist(&mut self, fragment: &str);
}

/// In-memory fragment, e.g. the `#...` part of a URL held by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFragment {
    fragment: String,
    writes: usize,
}

impl MemoryFragment {
    pub fn new(fragment: impl Into<String>) -> Self {
        MemoryFragment {
            fragment: fragment.into(),
            writes: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.fragment
    }

    /// Number of `persist` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl FragmentStore for MemoryFragment {
    fn load(&self) -> String {
        self.fragment.clone()
    }

    fn persist(&mut self, fragment: &str) {
        self.fragment = fragment.to_string();
        self.writes += 1;
    }
}

/// Errors from session operations. None of them leave the state changed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("ingredient {0} is not a solid")]
    NotASolid(IngredientId),
    #[error("'{0}' is not a known solid")]
    UnknownKnownSolid(String),
}

pub struct Session<S: FragmentStore> {
    state: RecipeState,
    store: S,
    known_solids: KnownSolids,
}

impl<S: FragmentStore> Session<S> {
    /// Decode whatever the store holds (falling back to the default recipe).
    pub fn open(store: S) -> Self {
        let state = codec::decode(&store.load());
        tracing::debug!(
            liquids = state.liquids.len(),
            solids = state.solids.len(),
            "session opened"
        );
        Session {
            state,
            store,
            known_solids: KnownSolids::new(),
        }
    }

    pub fn state(&self) -> &RecipeState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Current fragment text for the state.
    pub fn fragment(&self) -> String {
        codec::encode(&self.state)
    }

    /// Recompute the recipe from scratch.
    pub fn recipe(&self) -> Vec<RecipeLine> {
        compute_recipe(&self.state)
    }

    fn persist(&mut self) {
        let fragment = codec::encode(&self.state);
        self.store.persist(&fragment);
    }

    pub fn add_liquid(&mut self) -> Result<IngredientId, SessionError> {
        let id = self.state.add_liquid()?;
        self.persist();
        Ok(id)
    }

    pub fn add_solid(&mut self) -> Result<IngredientId, SessionError> {
        let id = self.state.add_solid()?;
        self.persist();
        Ok(id)
    }

    pub fn remove(&mut self, id: IngredientId) -> Result<IngredientKind, SessionError> {
        let kind = self
            .state
            .remove(id)
            .ok_or(StateError::UnknownIngredient(id))?;
        self.persist();
        Ok(kind)
    }

    pub fn update_field(&mut self, id: IngredientId, update: FieldUpdate) -> Result<(), SessionError> {
        self.state.update_field(id, update)?;
        self.persist();
        Ok(())
    }

    pub fn set_total_volume(&mut self, volume: Option<f64>) {
        self.state.total_volume = volume;
        self.persist();
    }

    pub fn set_volume_units(&mut self, units: &str) {
        self.state.volume_units = units.to_string();
        self.persist();
    }

    pub fn set_mass_units(&mut self, units: &str) {
        self.state.mass_units = units.to_string();
        self.persist();
    }

    /// Catalog key carried in the fragment, if any.
    pub fn catalog_key(&self) -> Option<&str> {
        self.state.tinyurl.as_deref().filter(|k| !k.is_empty())
    }

    pub fn known_solids(&self) -> &KnownSolids {
        &self.known_solids
    }

    /// Take the outcome of a catalog fetch. Failures are logged and leave the
    /// current table as it is.
    pub fn apply_catalog(&mut self, result: Result<KnownSolids, CatalogError>) {
        match result {
            Ok(solids) => {
                tracing::info!(entries = solids.len(), "known solids updated");
                self.known_solids = solids;
            }
            Err(e) => tracing::warn!(error = %e, "catalog unavailable"),
        }
    }

    /// Pre-fill a solid's name and displacement from the catalog.
    pub fn select_known_solid(&mut self, id: IngredientId, name: &str) -> Result<(), SessionError> {
        if !self.state.solids.contains_key(&id) {
            return Err(match self.state.kind_of(id) {
                Some(_) => SessionError::NotASolid(id),
                None => SessionError::State(StateError::UnknownIngredient(id)),
            });
        }
        let displacement = *self
            .known_solids
            .get(name)
            .ok_or_else(|| SessionError::UnknownKnownSolid(name.to_string()))?;
        self.state
            .update_field(id, FieldUpdate::Name(name.to_string()))?;
        self.state
            .update_field(id, FieldUpdate::Displacement(Some(displacement)))?;
        self.persist();
        Ok(())
    }
}
