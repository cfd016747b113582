//! Read-only, layer-indexed view of a parsed instruction stream.

use super::instruction::PrinterInstruction;
use std::ops::Range;

/// A sequential, random-access log of machine instructions grouped by layer.
///
/// The renderer only reads from a source; implementations must not change
/// their contents once handed to a renderer.
pub trait InstructionSource: Send + Sync {
    /// Total number of instructions
    fn instruction_count(&self) -> usize;

    /// Number of layers
    fn layer_count(&self) -> usize;

    /// Index of the first instruction of `layer`
    fn first_instruction_of_layer(&self, layer: usize) -> usize;

    /// Instruction at `index`, if any
    fn instruction(&self, index: usize) -> Option<&PrinterInstruction>;

    /// Whether the move ending at `index` deposits material
    fn is_extruding(&self, index: usize) -> bool;

    /// Nominal layer thickness in mm
    fn nominal_layer_height(&self) -> f64;

    /// Thickness of the first layer in mm
    fn first_layer_height(&self) -> f64;

    /// Filament diameter declared by the file, if any
    fn filament_diameter(&self) -> Option<f64>;

    /// Thickness of `layer` in mm
    fn layer_height(&self, layer: usize) -> f64 {
        if layer == 0 {
            self.first_layer_height()
        } else {
            self.nominal_layer_height()
        }
    }

    /// Instruction indices belonging to `layer`. The last layer runs to the
    /// end of the stream.
    fn instruction_range(&self, layer: usize) -> Range<usize> {
        let count = self.instruction_count();
        let start = self.first_instruction_of_layer(layer).min(count);
        let end = if layer + 1 < self.layer_count() {
            self.first_instruction_of_layer(layer + 1).min(count)
        } else {
            count
        };
        start..end.max(start)
    }

    fn is_empty(&self) -> bool {
        self.instruction_count() == 0
    }
}
