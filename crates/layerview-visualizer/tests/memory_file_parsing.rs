//! Tests for parsing G-code text into an in-memory instruction source

use glam::DVec3;
use layerview_core::GcodeError;
use layerview_visualizer::{GCodeMemoryFile, InstructionSource, MovementMode};
use std::io::Write;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_layer_markers_define_layers() {
    let gcode = "; generated\n\
                 ;LAYER:0\n\
                 G1 X1 E1 F1200\n\
                 ;LAYER:1\n\
                 G1 Z0.4\n\
                 G1 X2 E2\n";
    let file = GCodeMemoryFile::parse(gcode);

    assert_eq!(file.layer_count(), 2);
    assert_eq!(file.first_instruction_of_layer(0), 0);
    assert_eq!(file.first_instruction_of_layer(1), 3);
    assert_eq!(file.instruction_range(1), 3..6);
}

#[test]
fn test_marker_with_space_is_recognized() {
    let file = GCodeMemoryFile::parse("; LAYER:0\nG1 X1 E1\n; LAYER:1\nG1 X2 E2\n");
    assert_eq!(file.layer_count(), 2);
}

#[test]
fn test_z_changes_define_layers_without_markers() {
    let gcode = "G1 Z0.2 F3000\n\
                 G1 X10 E1\n\
                 G1 Z0.4\n\
                 G1 X0 E2\n\
                 G1 Z0.6\n\
                 G1 X10 E3\n";
    let file = GCodeMemoryFile::parse(gcode);

    assert_eq!(file.layer_count(), 3);
    assert_eq!(file.first_instruction_of_layer(1), 2);
    assert_eq!(file.first_instruction_of_layer(2), 4);
    assert!(approx(file.first_layer_height(), 0.2));
    assert!(approx(file.nominal_layer_height(), 0.2));
}

#[test]
fn test_declared_layer_heights() {
    let gcode = ";LAYER:0\n\
                 ; LAYER_HEIGHT:0.3\n\
                 G1 Z0.3 X1 E1\n\
                 ;LAYER:1\n\
                 ; LAYER_HEIGHT:0.25\n\
                 G1 Z0.55 X2 E2\n";
    let file = GCodeMemoryFile::parse(gcode);

    assert!(approx(file.first_layer_height(), 0.3));
    assert!(approx(file.nominal_layer_height(), 0.25));
    assert!(approx(file.layer_height(1), 0.25));
}

#[test]
fn test_filament_diameter_from_trailer_comment() {
    let file = GCodeMemoryFile::parse("G1 X1 E1\n; filament_diameter = 2.85\n");
    assert_eq!(file.filament_diameter(), Some(2.85));

    let plain = GCodeMemoryFile::parse("G1 X1 E1\n");
    assert_eq!(plain.filament_diameter(), None);
}

#[test]
fn test_comments_and_tool_changes() {
    let file = GCodeMemoryFile::parse("T1\nG1 X5 E1 ; X9 in a comment\nG91\n");

    let ins = file.instruction(1).unwrap();
    assert_eq!(ins.position, DVec3::new(5.0, 0.0, 0.0));
    assert_eq!(ins.tool_index, 1);
    assert_eq!(file.instruction(2).unwrap().movement_mode, MovementMode::Relative);
}

#[test]
fn test_bounds_cover_extrusions_only() {
    let gcode = "G1 X-50 Y-50\n\
                 G1 X10 Y10 E1\n\
                 G1 X20 Y5 E2\n\
                 G1 X100 Y100\n";
    let file = GCodeMemoryFile::parse(gcode);

    let (min, max) = file.bounds().unwrap();
    assert_eq!(min, DVec3::new(10.0, 5.0, 0.0));
    assert_eq!(max, DVec3::new(20.0, 10.0, 0.0));
    assert!(GCodeMemoryFile::parse("G1 X1\n").bounds().is_none());
}

#[test]
fn test_total_filament_skips_resets() {
    let file = GCodeMemoryFile::parse("G1 X1 E4\nG92 E0\nG1 X2 E3\n");
    assert!(approx(file.total_filament_mm(), 7.0));
}

#[test]
fn test_load_from_file() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    writeln!(tmp, "; filament_diameter = 1.75").unwrap();
    writeln!(tmp, "G1 Z0.2 X1 E1 F1500").unwrap();
    writeln!(tmp, "G1 X2 E2").unwrap();

    let file = GCodeMemoryFile::load_from_file(tmp.path()).unwrap();
    assert_eq!(file.instruction_count(), 3);
    assert_eq!(file.filament_diameter(), Some(1.75));
    assert!(file.is_extruding(2));
}

#[test]
fn test_load_missing_file_is_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = GCodeMemoryFile::load_from_file(&dir.path().join("missing.gcode"));
    assert!(matches!(result, Err(GcodeError::FileError { .. })));
}

#[test]
fn test_empty_text_has_no_layers() {
    let file = GCodeMemoryFile::parse("");
    assert!(file.is_empty());
    assert_eq!(file.layer_count(), 0);
}
