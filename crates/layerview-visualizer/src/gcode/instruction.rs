//! Machine state after one G-code line

use glam::DVec3;

/// Distance mode selected by G90/G91
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementMode {
    #[default]
    Absolute,
    Relative,
}

/// One parsed line of G-code together with the machine state it leaves behind.
///
/// Every line of the input becomes one instruction, including comments and
/// commands that do not move the head, so instruction indices map one to one
/// onto line numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct PrinterInstruction {
    /// Raw line text, trimmed
    pub line: String,
    /// Head position in mm
    pub position: DVec3,
    /// Extruder axis position in mm of filament
    pub e_position: f64,
    /// Feed rate in mm/min
    pub feed_rate: f64,
    /// Active extruder
    pub tool_index: usize,
    pub movement_mode: MovementMode,
    /// The line re-declared the extruder position (G92 E...), so the E change
    /// to the previous instruction is not material movement.
    pub e_reset: bool,
}

impl PrinterInstruction {
    /// Instruction with the power-on machine state
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            position: DVec3::ZERO,
            e_position: 0.0,
            feed_rate: 0.0,
            tool_index: 0,
            movement_mode: MovementMode::Absolute,
            e_reset: false,
        }
    }

    /// Instruction for `line` starting from the state left by `previous`
    pub fn continue_from(previous: &PrinterInstruction, line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            e_reset: false,
            ..previous.clone()
        }
    }

    /// Convenience constructor used by hosts that build instruction lists directly
    pub fn at(position: DVec3, e_position: f64, feed_rate: f64) -> Self {
        Self {
            position,
            e_position,
            feed_rate,
            ..Self::new(String::new())
        }
    }

    /// The line without any trailing `;` comment
    pub fn code(&self) -> &str {
        match self.line.find(';') {
            Some(idx) => self.line[..idx].trim_end(),
            None => &self.line,
        }
    }

    /// Signed extrusion delta implied by a firmware retract (`G10`, -1) or
    /// unretract (`G11`, +1) command.
    pub fn firmware_retract(&self) -> Option<f64> {
        let command = self.code().split_whitespace().next()?;
        if command.eq_ignore_ascii_case("G10") {
            Some(-1.0)
        } else if command.eq_ignore_ascii_case("G11") {
            Some(1.0)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue_from_keeps_state_and_clears_reset() {
        let mut first = PrinterInstruction::at(DVec3::new(1.0, 2.0, 0.3), 4.0, 1800.0);
        first.e_reset = true;
        first.tool_index = 1;

        let next = PrinterInstruction::continue_from(&first, "M106");
        assert_eq!(next.position, first.position);
        assert_eq!(next.e_position, 4.0);
        assert_eq!(next.tool_index, 1);
        assert!(!next.e_reset);
        assert_eq!(next.line, "M106");
    }

    #[test]
    fn test_firmware_retract_matches_whole_command() {
        assert_eq!(PrinterInstruction::new("G10").firmware_retract(), Some(-1.0));
        assert_eq!(
            PrinterInstruction::new("G11 ; unretract").firmware_retract(),
            Some(1.0)
        );
        assert_eq!(PrinterInstruction::new("G100").firmware_retract(), None);
        assert_eq!(PrinterInstruction::new("; G10").firmware_retract(), None);
    }
}
