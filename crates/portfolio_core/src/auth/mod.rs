//! Admin authorization, identity, and session guarding.
//!
//! # Responsibility
//! - Decide who may act as administrator (`gate`).
//! - Abstract the external identity provider (`identity`).
//! - Drive the admin page guard state machine (`guard`).
//! - Persist browser-local device flags (`device`).
//!
//! # Invariants
//! - The allow-list is fixed once constructed.
//! - An unauthorized principal never reaches the admin surface.

pub mod device;
pub mod gate;
pub mod guard;
pub mod identity;
