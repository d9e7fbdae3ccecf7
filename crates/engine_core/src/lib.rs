//! Core types shared by the terrain viewer crates.
//!
//! This crate provides the foundational types used across all viewer systems:
//! - Triangle geometry and smooth-normal accumulation
//! - Solid transforms and their model matrices
//! - Frame timing and per-frame animation hooks

pub mod animation;
pub mod geometry;
pub mod time;
pub mod transform;

pub use animation::*;
pub use geometry::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Vec2, Vec3, Vec4};
