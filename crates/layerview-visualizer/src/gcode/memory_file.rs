//! In-memory instruction source built from G-code text

use super::instruction::{MovementMode, PrinterInstruction};
use super::source::InstructionSource;
use glam::DVec3;
use layerview_core::GcodeError;
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Lines scanned at each end of the file for a filament diameter comment
const DIAMETER_SEARCH_LINES: usize = 100;

/// Layer height assumed when nothing better can be derived
const FALLBACK_LAYER_HEIGHT: f64 = 0.2;

/// Z deltas below this are not plausible layer heights
const MIN_LAYER_HEIGHT: f64 = 0.01;

/// A fully parsed G-code file held in memory.
///
/// Layers are found from `;LAYER:` markers when the file has them, otherwise
/// from Z changes of G0/G1 moves.
#[derive(Debug, Clone, Default)]
pub struct GCodeMemoryFile {
    instructions: Vec<PrinterInstruction>,
    layer_starts: Vec<usize>,
    layer_heights: Vec<f64>,
    filament_diameter: Option<f64>,
}

impl GCodeMemoryFile {
    /// Parse G-code text
    pub fn parse(text: &str) -> Self {
        let explicit_layers = text.contains(";LAYER:") || text.contains("; LAYER:");

        let mut file = GCodeMemoryFile {
            layer_starts: vec![0],
            ..Default::default()
        };

        let mut state = PrinterInstruction::new(String::new());
        let mut found_first_marker = false;
        let mut last_z = 0.0;

        for raw in text.lines() {
            let line = raw.trim();
            state = PrinterInstruction::continue_from(&state, line);

            match line.chars().next() {
                Some('G') | Some('g') => {
                    let moved = apply_g_command(&mut state);
                    if moved && !explicit_layers {
                        if state.position.z != last_z {
                            file.push_layer_start();
                        }
                        last_z = state.position.z;
                    }
                }
                Some('T') | Some('t') => {
                    if let Some(tool) = line[1..]
                        .split_whitespace()
                        .next()
                        .and_then(|v| v.parse::<usize>().ok())
                    {
                        state.tool_index = tool;
                    }
                }
                Some(';') => {
                    if explicit_layers && is_layer_change(line) {
                        // The start of the file already opened layer 0
                        if found_first_marker {
                            file.push_layer_start();
                        } else {
                            found_first_marker = true;
                        }
                    } else if let Some(height) = line
                        .strip_prefix("; LAYER_HEIGHT:")
                        .and_then(|v| v.trim().parse::<f64>().ok())
                    {
                        file.layer_heights.push(height);
                    }
                }
                _ => {}
            }

            file.instructions.push(state.clone());
        }

        file.filament_diameter = file.find_filament_diameter();

        debug!(
            "Parsed {} instructions into {} layers (explicit markers: {})",
            file.instructions.len(),
            file.layer_count(),
            explicit_layers
        );

        file
    }

    /// Read and parse a G-code file
    pub fn load_from_file(path: &Path) -> Result<Self, GcodeError> {
        let text = std::fs::read_to_string(path).map_err(|e| GcodeError::FileError {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(Self::parse(&text))
    }

    /// Build a file from an already parsed instruction list.
    ///
    /// `layer_starts` lists the first instruction of every layer; an empty
    /// list means a single layer.
    pub fn from_instructions(
        instructions: Vec<PrinterInstruction>,
        mut layer_starts: Vec<usize>,
    ) -> Self {
        if layer_starts.first() != Some(&0) {
            layer_starts.insert(0, 0);
        }
        Self {
            instructions,
            layer_starts,
            layer_heights: Vec::new(),
            filament_diameter: None,
        }
    }

    /// Use explicit per-layer heights instead of deriving them from Z
    pub fn with_layer_heights(mut self, heights: Vec<f64>) -> Self {
        self.layer_heights = heights;
        self
    }

    pub fn with_filament_diameter(mut self, diameter: f64) -> Self {
        self.filament_diameter = Some(diameter);
        self
    }

    pub fn instructions(&self) -> &[PrinterInstruction] {
        &self.instructions
    }

    /// Extent of all extruding moves, `None` when nothing is extruded
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let mut extruded = (0..self.instructions.len())
            .filter(|&i| self.is_extruding(i))
            .map(|i| self.instructions[i].position);

        let first = extruded.next()?;
        Some(extruded.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Net filament length pushed through the extruder, in mm
    pub fn total_filament_mm(&self) -> f64 {
        let mut last_e = 0.0;
        let mut total = 0.0;
        for instruction in &self.instructions {
            if !instruction.e_reset {
                total += instruction.e_position - last_e;
            }
            last_e = instruction.e_position;
        }
        total
    }

    fn push_layer_start(&mut self) {
        let index = self.instructions.len();
        if self.layer_starts.last() != Some(&index) {
            self.layer_starts.push(index);
        }
    }

    fn layer_start_z(&self, layer: usize) -> f64 {
        self.layer_starts
            .get(layer)
            .and_then(|&idx| self.instructions.get(idx))
            .map_or(0.0, |ins| ins.position.z)
    }

    fn z_delta(&self, layer: usize) -> f64 {
        self.layer_start_z(layer + 1) - self.layer_start_z(layer)
    }

    /// Layer height from Z deltas between layer starts, walking back to
    /// earlier layers when the delta is implausibly small.
    fn derived_layer_height(&self, layer: usize) -> f64 {
        let starts = self.layer_starts.len();
        let mut height = if layer + 1 < starts {
            self.z_delta(layer)
        } else if starts > 2 {
            self.z_delta(1)
        } else {
            FALLBACK_LAYER_HEIGHT
        };

        let mut walk = layer;
        while height < MIN_LAYER_HEIGHT && walk > 0 {
            walk -= 1;
            if walk + 1 < starts {
                height = self.z_delta(walk);
            }
        }

        if height < MIN_LAYER_HEIGHT {
            FALLBACK_LAYER_HEIGHT
        } else {
            height
        }
    }

    fn find_filament_diameter(&self) -> Option<f64> {
        let count = self.instructions.len();
        let head = 0..count.min(DIAMETER_SEARCH_LINES);
        let tail = (count.saturating_sub(DIAMETER_SEARCH_LINES)..count).rev();

        head.chain(tail)
            .find_map(|i| parse_filament_diameter(&self.instructions[i].line))
    }
}

impl InstructionSource for GCodeMemoryFile {
    fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    fn layer_count(&self) -> usize {
        if self.instructions.is_empty() {
            0
        } else {
            self.layer_starts.len()
        }
    }

    fn first_instruction_of_layer(&self, layer: usize) -> usize {
        self.layer_starts
            .get(layer)
            .copied()
            .unwrap_or_else(|| self.instructions.len().saturating_sub(1))
    }

    fn instruction(&self, index: usize) -> Option<&PrinterInstruction> {
        self.instructions.get(index)
    }

    fn is_extruding(&self, index: usize) -> bool {
        if index == 0 || index >= self.instructions.len() {
            return false;
        }
        let current = &self.instructions[index];
        !current.e_reset && current.e_position - self.instructions[index - 1].e_position > 0.0
    }

    fn nominal_layer_height(&self) -> f64 {
        if self.layer_count() > 1 {
            self.layer_height(1)
        } else {
            self.layer_height(0)
        }
    }

    fn first_layer_height(&self) -> f64 {
        self.layer_height(0)
    }

    fn filament_diameter(&self) -> Option<f64> {
        self.filament_diameter
    }

    fn layer_height(&self, layer: usize) -> f64 {
        if !self.layer_heights.is_empty() {
            return self.layer_heights.get(layer).copied().unwrap_or(0.0);
        }
        self.derived_layer_height(layer)
    }
}

fn is_layer_change(line: &str) -> bool {
    line.starts_with(";LAYER:") || line.starts_with("; LAYER:")
}

/// Value of the `X` style word `letter` in a code fragment, e.g. `X12.5`
fn word_value(code: &str, letter: char) -> Option<f64> {
    code.split_whitespace().find_map(|word| {
        let mut chars = word.chars();
        let first = chars.next()?;
        if first.eq_ignore_ascii_case(&letter) {
            chars.as_str().parse::<f64>().ok()
        } else {
            None
        }
    })
}

/// Apply a G command to `state`. Returns true for G0/G1 moves.
fn apply_g_command(state: &mut PrinterInstruction) -> bool {
    let code = state.code().to_string();
    let Some(number) = code
        .split_whitespace()
        .next()
        .and_then(|word| word[1..].parse::<u32>().ok())
    else {
        return false;
    };

    match number {
        0 | 1 => {
            let relative = state.movement_mode == MovementMode::Relative;
            let (mut target, mut e) = if relative {
                (DVec3::ZERO, 0.0)
            } else {
                (state.position, state.e_position)
            };

            if let Some(x) = word_value(&code, 'X') {
                target.x = x;
            }
            if let Some(y) = word_value(&code, 'Y') {
                target.y = y;
            }
            if let Some(z) = word_value(&code, 'Z') {
                target.z = z;
            }
            if let Some(value) = word_value(&code, 'E') {
                e = value;
            }
            if let Some(feed) = word_value(&code, 'F') {
                state.feed_rate = feed;
            }

            if relative {
                state.position += target;
                state.e_position += e;
            } else {
                state.position = target;
                state.e_position = e;
            }
            true
        }
        90 => {
            state.movement_mode = MovementMode::Absolute;
            false
        }
        91 => {
            state.movement_mode = MovementMode::Relative;
            false
        }
        92 => {
            if let Some(x) = word_value(&code, 'X') {
                state.position.x = x;
            }
            if let Some(y) = word_value(&code, 'Y') {
                state.position.y = y;
            }
            if let Some(z) = word_value(&code, 'Z') {
                state.position.z = z;
            }
            if let Some(e) = word_value(&code, 'E') {
                state.e_position = e;
                state.e_reset = true;
            }
            false
        }
        _ => false,
    }
}

fn parse_filament_diameter(line: &str) -> Option<f64> {
    static DIAMETER_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let regex = DIAMETER_REGEX.get_or_init(|| {
        Regex::new(r"(?i)filament_?diameter\s*=\s*([0-9]*\.?[0-9]+)").expect("invalid regex pattern")
    });
    regex
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|d| *d > 0.0)
}
