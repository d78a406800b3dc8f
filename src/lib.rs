//! Pressroom - pooled HTML-to-PDF rendering
//!
//! Renders document content into paginated PDF artifacts on a bounded pool
//! of engine workers, degrading to a dependency-free text renderer when the
//! primary path fails. This library exposes modules for integration testing.

pub mod error;
pub mod models;
pub mod rendering;
pub mod services;
