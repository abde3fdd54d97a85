//! Content domain model for the portfolio site.
//!
//! # Responsibility
//! - Define the typed shape of every content entity read from the store.
//! - Hold the compiled-in fallback values shown when no content exists.
//!
//! # Invariants
//! - Collection items carry the store-assigned id; it is never serialized
//!   back into the document body.
//! - Wire field names are camelCase to match stored documents.

pub mod content;
pub mod defaults;
