//! SQL text construction.
//!
//! # Responsibility
//! - Keep statement shapes in one pure, unit-testable place.
//! - Repositories bind values; this layer only renders placeholders.

pub mod builder;

pub use builder::{Direction, Ordering};
