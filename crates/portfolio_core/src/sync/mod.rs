//! Live content synchronization.
//!
//! # Responsibility
//! - Keep one render-ready value per content type up to date with the store.
//! - Apply one fallback policy for every content type.
//!
//! # See also
//! - `store` for the subscription contract this module builds on.

pub mod content;
pub mod live;
pub mod site;
