//! Synthetic environment generation.

pub mod sem;

pub use sem::*;
