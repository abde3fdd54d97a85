//! Use-case services over the document store.
//!
//! # Responsibility
//! - Count visits against the shared visitor document.
//! - Provide typed admin editing operations and resume uploads.
//! - Keep presentation code free of store paths and field names.

pub mod content_service;
pub mod upload_service;
pub mod visitor_service;
