//! G-Code instruction model
//!
//! This module provides:
//! - The per-line machine state (`PrinterInstruction`)
//! - The read-only `InstructionSource` seam consumed by the renderer
//! - An in-memory source parsed from G-code text

pub mod instruction;
pub mod memory_file;
pub mod source;

pub use instruction::{MovementMode, PrinterInstruction};
pub use memory_file::GCodeMemoryFile;
pub use source::InstructionSource;
