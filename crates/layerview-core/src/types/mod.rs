//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for `Arc<Mutex<Vec<T>>>`, `Arc<RwLock<T>>` and the
//!   per-extruder lookup callbacks handed to the renderer.

pub mod aliases;

pub use aliases::*;
