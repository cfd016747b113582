//! # LayerView Core
//!
//! Core types, traits, and utilities for LayerView.
//! Provides the value types shared by the settings and visualizer crates:
//! colors, render-type flags, the GPU memory eviction policy, the error
//! taxonomy and the shared-state type aliases.

pub mod color;
pub mod error;
pub mod memory;
pub mod render_type;
pub mod types;

pub use color::Rgba;
pub use error::{Error, GcodeError, RenderError, Result};
pub use memory::{EvictionPolicy, LEGACY_FEATURE_CEILING};
pub use render_type::RenderType;

// Re-export type aliases for convenience
pub use types::{
    thread_safe_rw, thread_safe_vec, ExtruderColorFn, ExtruderOffsetFn, ThreadSafeRw, ThreadSafeVec,
};
