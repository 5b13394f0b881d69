//! Tests for the ACE engine.
//!
//! Organized by functionality:
//! - Membership-closure expansion (including nesting cycles)
//! - Direct vs closure-derived edge merging and deduplication
//! - Filter pipeline behavior at the engine surface
//! - Entity listing normalization
//! - Backend error propagation
