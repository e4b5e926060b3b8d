//! Fragment codec: `RecipeState` <-> percent-encoded JSON.
//!
//! Encoding uses the `encodeURIComponent` unreserved set so fragments written
//! here and by a browser are interchangeable. Decoding never fails: anything
//! unreadable falls back to the default state and is logged.

use super::types::{RecipeState, StateError};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::error::Category;

/// Characters `encodeURIComponent` leaves alone: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Why a fragment could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("fragment is empty")]
    Empty,
    #[error("fragment is not valid percent-encoded UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("fragment is not a recipe: {0}")]
    Json(#[from] serde_json::Error),
    #[error("fragment ids leave no room for new ingredients: {0}")]
    Ids(#[from] StateError),
}

impl CodecError {
    /// True when the text was not JSON at all, as opposed to JSON of the
    /// wrong shape. Only such text names a catalog.
    fn is_not_json(&self) -> bool {
        match self {
            CodecError::Json(e) => matches!(e.classify(), Category::Syntax | Category::Eof),
            _ => false,
        }
    }
}

/// Strip everything up to and including the first `#`, if present.
pub fn fragment_of(input: &str) -> &str {
    match input.split_once('#') {
        Some((_, fragment)) => fragment,
        None => input,
    }
}

/// Encode a state as fragment text (without the leading `#`).
pub fn encode(state: &RecipeState) -> String {
    // RecipeState has no non-string map keys or fallible serializers
    let json = serde_json::to_string(state).unwrap_or_else(|e| {
        tracing::error!(error = %e, "recipe state failed to serialize");
        String::from("{}")
    });
    utf8_percent_encode(&json, FRAGMENT).to_string()
}

/// Decode fragment text, reporting why it failed.
pub fn try_decode(text: &str) -> Result<RecipeState, CodecError> {
    let text = fragment_of(text);
    if text.is_empty() {
        return Err(CodecError::Empty);
    }
    let json = percent_decode_str(text).decode_utf8()?;
    let mut state: RecipeState = serde_json::from_str(&json)?;
    if state.repair_next_id()? {
        tracing::warn!(next_id = state.next_id, "fragment id counter lagged behind ingredients; raised");
    }
    Ok(state)
}

/// Decode fragment text, degrading to the default state on any failure.
///
/// Non-empty text that is not JSON is kept as the catalog key.
pub fn decode(text: &str) -> RecipeState {
    match try_decode(text) {
        Ok(state) => state,
        Err(CodecError::Empty) => RecipeState::default(),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable fragment, starting from an empty recipe");
            let tinyurl = e.is_not_json().then(|| fragment_of(text).to_string());
            RecipeState {
                tinyurl,
                ..RecipeState::default()
            }
        }
    }
}
