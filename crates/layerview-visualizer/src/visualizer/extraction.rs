//! Turning instruction pairs into render features

use super::color_map::SpeedColorMap;
use super::features::{extrusion_volume, RenderFeature, Segment};
use crate::gcode::InstructionSource;

/// Feed rates of every move that extrudes while moving in XY.
///
/// Only positions and extrusion state are consulted, so sources built
/// without line text are primed the same way as parsed files.
pub fn collect_extrusion_speeds(source: &dyn InstructionSource) -> Vec<f64> {
    let mut speeds = Vec::new();
    let mut previous = match source.instruction(0) {
        Some(first) => first,
        None => return speeds,
    };

    for index in 1..source.instruction_count() {
        let Some(current) = source.instruction(index) else {
            break;
        };
        let moved_xy = current.position.truncate() != previous.position.truncate();
        if moved_xy && source.is_extruding(index) {
            speeds.push(current.feed_rate);
        }
        previous = current;
    }
    speeds
}

/// Features of one layer in instruction order.
///
/// Each instruction is paired with its predecessor (the first instruction of
/// a layer pairs with the last one of the layer below):
/// - no movement and a changed E position gives a retraction signed like the change
/// - no movement on a `G10`/`G11` line gives a firmware retraction of ∓1
/// - an extruding move gives an extrusion
/// - any other move gives a travel
pub fn extract_layer(
    source: &dyn InstructionSource,
    layer: usize,
    speed_colors: &SpeedColorMap,
    filament_diameter: f64,
) -> Vec<RenderFeature> {
    let layer_thickness = source.layer_height(layer);
    let mut features = Vec::new();

    for index in source.instruction_range(layer) {
        let Some(current) = source.instruction(index) else {
            break;
        };
        let previous = index
            .checked_sub(1)
            .and_then(|i| source.instruction(i))
            .unwrap_or(current);

        if current.position == previous.position {
            let delta = if current.e_reset {
                0.0
            } else {
                current.e_position - previous.e_position
            };

            let retraction = if delta != 0.0 {
                Some(delta)
            } else {
                current.firmware_retract()
            };

            if let Some(delta) = retraction {
                features.push(RenderFeature::retraction(
                    index,
                    current.position,
                    delta,
                    current.tool_index,
                    current.feed_rate,
                ));
            }
            continue;
        }

        let segment = Segment {
            start: previous.position,
            end: current.position,
            tool_index: current.tool_index,
            feed_rate: current.feed_rate,
        };

        if source.is_extruding(index) {
            let delta = current.e_position - previous.e_position;
            features.push(RenderFeature::extrusion(
                index,
                segment,
                extrusion_volume(filament_diameter, delta),
                layer_thickness,
                speed_colors.color_for_speed(current.feed_rate),
            ));
        } else {
            features.push(RenderFeature::travel(index, segment));
        }
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::{GCodeMemoryFile, PrinterInstruction};
    use crate::visualizer::features::FeatureKind;
    use glam::DVec3;

    fn file(lines: &str) -> GCodeMemoryFile {
        GCodeMemoryFile::parse(lines)
    }

    #[test]
    fn test_speeds_only_from_xy_extrusions() {
        let source = file("; start\nG1 X1 E1 F1200\nG1 E2 F300\nG1 X2 F9000\nG1 Y3 E3 F2400\n");
        assert_eq!(collect_extrusion_speeds(&source), vec![1200.0, 2400.0]);
    }

    #[test]
    fn test_speeds_from_instructions_without_text() {
        let instructions = vec![
            PrinterInstruction::at(DVec3::ZERO, 0.0, 600.0),
            PrinterInstruction::at(DVec3::new(10.0, 0.0, 0.0), 1.0, 600.0),
            PrinterInstruction::at(DVec3::new(20.0, 0.0, 0.0), 2.0, 3000.0),
            PrinterInstruction::at(DVec3::new(20.0, 0.0, 0.4), 3.0, 4800.0),
        ];
        let source = GCodeMemoryFile::from_instructions(instructions, vec![0]);
        assert_eq!(collect_extrusion_speeds(&source), vec![600.0, 3000.0]);
    }

    #[test]
    fn test_retraction_sign_follows_delta() {
        let source = file("G1 X1 E5 F1200\nG1 E3 F1800\nG1 E5\n");
        let features = extract_layer(&source, 0, &SpeedColorMap::new(), 1.75);

        let deltas: Vec<f64> = features
            .iter()
            .filter_map(|f| match f.kind {
                FeatureKind::Retraction {
                    extrusion_delta, ..
                } => Some(extrusion_delta),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec![-2.0, 2.0]);
    }

    #[test]
    fn test_firmware_retraction() {
        let source = file("; start\nG1 X1 F1200\nG10\nG11\n");
        let features = extract_layer(&source, 0, &SpeedColorMap::new(), 1.75);
        let kinds: Vec<_> = features.iter().map(|f| (f.instruction_index, f.kind.clone())).collect();

        assert_eq!(kinds.len(), 3);
        assert!(features[0].is_travel());
        assert!(matches!(kinds[1].1, FeatureKind::Retraction { extrusion_delta, .. } if extrusion_delta == -1.0));
        assert!(matches!(kinds[2].1, FeatureKind::Retraction { extrusion_delta, .. } if extrusion_delta == 1.0));
    }

    #[test]
    fn test_g92_reset_is_not_a_retraction() {
        let source = file("; start\nG1 X1 E5 F1200\nG92 E0\nG1 X2 E1\n");
        let features = extract_layer(&source, 0, &SpeedColorMap::new(), 1.75);
        assert_eq!(features.len(), 2);
        assert!(features.iter().all(RenderFeature::is_extrusion));
    }

    #[test]
    fn test_extrusion_carries_volume_and_speed_color() {
        let instructions = vec![
            PrinterInstruction::at(DVec3::ZERO, 0.0, 0.0),
            PrinterInstruction::at(DVec3::new(10.0, 0.0, 0.0), 5.0, 1200.0),
        ];
        let source = GCodeMemoryFile::from_instructions(instructions, vec![0]);
        let colors = SpeedColorMap::primed([600.0, 1200.0]);
        let features = extract_layer(&source, 0, &colors, 1.75);

        assert_eq!(features.len(), 1);
        match &features[0].kind {
            FeatureKind::Extrusion {
                volume,
                layer_thickness,
                speed_color,
                ..
            } => {
                assert!((volume - extrusion_volume(1.75, 5.0)).abs() < 1e-12);
                assert!((layer_thickness - 0.2).abs() < 1e-12);
                assert_eq!(*speed_color, colors.color_for_speed(1200.0));
            }
            other => panic!("expected extrusion, got {other:?}"),
        }
    }

    #[test]
    fn test_layer_boundary_pairs_with_previous_layer() {
        let instructions = vec![
            PrinterInstruction::at(DVec3::new(0.0, 0.0, 0.2), 0.0, 1200.0),
            PrinterInstruction::at(DVec3::new(5.0, 0.0, 0.2), 1.0, 1200.0),
            PrinterInstruction::at(DVec3::new(5.0, 0.0, 0.4), 1.0, 1200.0),
            PrinterInstruction::at(DVec3::new(0.0, 0.0, 0.4), 2.0, 1200.0),
        ];
        let source = GCodeMemoryFile::from_instructions(instructions, vec![0, 2]);
        let features = extract_layer(&source, 1, &SpeedColorMap::new(), 1.75);

        assert_eq!(features.len(), 2);
        assert!(features[0].is_travel());
        assert_eq!(features[0].segment().unwrap().start, DVec3::new(5.0, 0.0, 0.2));
        assert!(features[1].is_extrusion());
    }
}
