//! Render features: one classified segment of a layer
//!
//! Each feature knows how to draw itself into a 2D canvas and how to append
//! its triangulated 3D geometry to a layer mesh.

use super::canvas::Canvas2D;
use super::mesh::LayerMesh;
use super::render_info::RenderInfo;
use glam::DVec3;
use layerview_core::{RenderType, Rgba};
use layerview_settings::{RendererSettings, Theme};

/// Line width of travel moves in the 2D preview, in mm
const TRAVEL_LINE_WIDTH: f64 = 0.35;
/// Radius of travel tubes in 3D, in mm
const TRAVEL_RADIUS: f64 = 0.1;
/// Radius of a retraction marker for one mm of filament
const RETRACTION_BASE_RADIUS: f64 = 0.35;
/// Floor on segment length when deriving a simulated extrusion width
const MIN_SEGMENT_LENGTH: f64 = 0.1;
/// Alpha of extrusions under `TRANSPARENT_EXTRUSION`
const TRANSPARENT_ALPHA: u8 = 200;
/// Height of retraction pointers above the nozzle position
const POINTER_FAR: f64 = 1.2;
const POINTER_NEAR: f64 = 0.2;

/// Start and end of a move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: DVec3,
    pub end: DVec3,
    pub tool_index: usize,
    /// Feed rate in mm/min
    pub feed_rate: f64,
}

impl Segment {
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// What a feature represents
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    /// Non-extruding move
    Travel(Segment),
    /// Extruding move
    Extrusion {
        segment: Segment,
        /// Filament volume pushed during the move, in mm³
        volume: f64,
        layer_thickness: f64,
        /// Color assigned by the speed color map when the layer was extracted
        speed_color: Rgba,
    },
    /// Retract (negative delta) or unretract (positive delta) in place
    Retraction {
        position: DVec3,
        extrusion_delta: f64,
        tool_index: usize,
        feed_rate: f64,
    },
}

/// One feature of a layer, tagged with the instruction it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFeature {
    pub instruction_index: usize,
    pub kind: FeatureKind,
}

/// Styling shared by all features of a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStyle {
    pub extruder_width: f64,
    pub travel_color: Rgba,
    pub highlight_color: Rgba,
    /// Extrusion color under `GRAY_COLORS`
    pub gray: Rgba,
    pub cylinder_steps: usize,
    pub pointer_steps: usize,
}

impl FeatureStyle {
    pub fn new(settings: &RendererSettings, theme: Theme) -> Self {
        Self {
            extruder_width: settings.extruder_width,
            travel_color: settings.travel_color,
            highlight_color: settings.highlight_color,
            gray: theme.extrusion_gray(),
            cylinder_steps: settings.cylinder_steps,
            pointer_steps: settings.pointer_steps,
        }
    }
}

impl Default for FeatureStyle {
    fn default() -> Self {
        Self::new(&RendererSettings::default(), Theme::default())
    }
}

/// Marker radius for a retraction of `extrusion_delta` mm of filament.
///
/// The marker's area, not its radius, grows linearly with the delta.
pub fn retraction_radius(extrusion_delta: f64, scale: f64) -> f64 {
    extrusion_delta.abs().sqrt() * RETRACTION_BASE_RADIUS * scale
}

/// Filament volume for `extrusion_delta` mm of filament of `filament_diameter`
pub fn extrusion_volume(filament_diameter: f64, extrusion_delta: f64) -> f64 {
    let radius = filament_diameter / 2.0;
    std::f64::consts::PI * radius * radius * extrusion_delta
}

impl RenderFeature {
    pub fn travel(instruction_index: usize, segment: Segment) -> Self {
        Self {
            instruction_index,
            kind: FeatureKind::Travel(segment),
        }
    }

    pub fn extrusion(
        instruction_index: usize,
        segment: Segment,
        volume: f64,
        layer_thickness: f64,
        speed_color: Rgba,
    ) -> Self {
        Self {
            instruction_index,
            kind: FeatureKind::Extrusion {
                segment,
                volume,
                layer_thickness,
                speed_color,
            },
        }
    }

    pub fn retraction(
        instruction_index: usize,
        position: DVec3,
        extrusion_delta: f64,
        tool_index: usize,
        feed_rate: f64,
    ) -> Self {
        Self {
            instruction_index,
            kind: FeatureKind::Retraction {
                position,
                extrusion_delta,
                tool_index,
                feed_rate,
            },
        }
    }

    pub fn is_travel(&self) -> bool {
        matches!(self.kind, FeatureKind::Travel(_))
    }

    pub fn is_extrusion(&self) -> bool {
        matches!(self.kind, FeatureKind::Extrusion { .. })
    }

    pub fn is_retraction(&self) -> bool {
        matches!(self.kind, FeatureKind::Retraction { .. })
    }

    /// The move of a travel or extrusion feature
    pub fn segment(&self) -> Option<&Segment> {
        match &self.kind {
            FeatureKind::Travel(segment) | FeatureKind::Extrusion { segment, .. } => Some(segment),
            FeatureKind::Retraction { .. } => None,
        }
    }

    pub fn tool_index(&self) -> usize {
        match &self.kind {
            FeatureKind::Travel(segment) | FeatureKind::Extrusion { segment, .. } => {
                segment.tool_index
            }
            FeatureKind::Retraction { tool_index, .. } => *tool_index,
        }
    }

    pub fn feed_rate(&self) -> f64 {
        match &self.kind {
            FeatureKind::Travel(segment) | FeatureKind::Extrusion { segment, .. } => {
                segment.feed_rate
            }
            FeatureKind::Retraction { feed_rate, .. } => *feed_rate,
        }
    }

    /// Draw into the 2D preview
    pub fn render_2d(
        &self,
        canvas: &mut dyn Canvas2D,
        info: &RenderInfo,
        style: &FeatureStyle,
        highlight: bool,
    ) {
        let flags = info.render_type;
        match &self.kind {
            FeatureKind::Travel(segment) => {
                if !flags.contains(RenderType::MOVES) {
                    return;
                }
                let color = if highlight {
                    style.highlight_color
                } else {
                    style.travel_color
                };
                canvas.line(
                    info.screen_point(segment.start, segment.tool_index),
                    info.screen_point(segment.end, segment.tool_index),
                    TRAVEL_LINE_WIDTH * info.layer_scale,
                    color,
                );
            }
            FeatureKind::Extrusion { segment, .. } => {
                if !flags.contains(RenderType::EXTRUSIONS) {
                    return;
                }
                let color = if highlight {
                    style.highlight_color
                } else {
                    self.extrusion_color(info, style)
                };
                let width = self.extrusion_width(flags, style) * 2.0 * info.layer_scale;
                canvas.line(
                    info.screen_point(segment.start, segment.tool_index),
                    info.screen_point(segment.end, segment.tool_index),
                    width,
                    color,
                );
            }
            FeatureKind::Retraction {
                position,
                extrusion_delta,
                tool_index,
                ..
            } => {
                if !flags.contains(RenderType::RETRACTIONS) {
                    return;
                }
                let color = if highlight {
                    style.highlight_color
                } else {
                    retraction_color(*extrusion_delta, *tool_index, info)
                };
                canvas.circle(
                    info.screen_point(*position, *tool_index),
                    retraction_radius(*extrusion_delta, info.layer_scale),
                    color,
                );
            }
        }
    }

    /// Append this feature's triangles to `mesh`
    pub fn create_3d_data(&self, mesh: &mut LayerMesh, info: &RenderInfo, style: &FeatureStyle) {
        let flags = info.render_type;
        match &self.kind {
            FeatureKind::Travel(segment) => {
                if !flags.contains(RenderType::MOVES) {
                    return;
                }
                mesh.add_cylinder(
                    info.offset_position(segment.start, segment.tool_index),
                    info.offset_position(segment.end, segment.tool_index),
                    TRAVEL_RADIUS,
                    TRAVEL_RADIUS * 2.0,
                    style.cylinder_steps,
                    style.travel_color,
                );
            }
            FeatureKind::Extrusion {
                segment,
                layer_thickness,
                ..
            } => {
                if !flags.contains(RenderType::EXTRUSIONS) {
                    return;
                }
                // Bead top sits at the nozzle height
                let drop = DVec3::new(0.0, 0.0, layer_thickness / 2.0);
                mesh.add_cylinder(
                    info.offset_position(segment.start, segment.tool_index) - drop,
                    info.offset_position(segment.end, segment.tool_index) - drop,
                    self.extrusion_width(flags, style) / 2.0,
                    *layer_thickness,
                    style.cylinder_steps,
                    self.extrusion_color(info, style),
                );
            }
            FeatureKind::Retraction {
                position,
                extrusion_delta,
                tool_index,
                ..
            } => {
                if !flags.contains(RenderType::RETRACTIONS) {
                    return;
                }
                let at = info.offset_position(*position, *tool_index);
                let near = at + DVec3::new(0.0, 0.0, POINTER_NEAR);
                let far = at + DVec3::new(0.0, 0.0, POINTER_FAR);
                // Retractions point down, unretractions point up
                let (base, tip) = if *extrusion_delta < 0.0 {
                    (far, near)
                } else {
                    (near, far)
                };
                mesh.add_pointer(
                    base,
                    tip,
                    retraction_radius(*extrusion_delta, 1.0),
                    style.pointer_steps,
                    retraction_color(*extrusion_delta, *tool_index, info),
                );
            }
        }
    }

    /// Bead width in mm. Non-extrusions report the nominal width.
    pub fn extrusion_width(&self, flags: RenderType, style: &FeatureStyle) -> f64 {
        match &self.kind {
            FeatureKind::Extrusion {
                segment,
                volume,
                layer_thickness,
                ..
            } if flags.contains(RenderType::SIMULATE_EXTRUSION) && *layer_thickness > 0.0 => {
                let length = segment.length().max(MIN_SEGMENT_LENGTH);
                volume / length / layer_thickness
            }
            _ => style.extruder_width,
        }
    }

    /// Resolved extrusion color: speed, then gray, then material color
    pub fn extrusion_color(&self, info: &RenderInfo, style: &FeatureStyle) -> Rgba {
        let flags = info.render_type;
        let color = match &self.kind {
            FeatureKind::Extrusion { speed_color, .. } if flags.contains(RenderType::SPEED_COLORS) => {
                *speed_color
            }
            _ if flags.contains(RenderType::GRAY_COLORS) => style.gray,
            _ => info.extruder_color(self.tool_index()),
        };

        if flags.contains(RenderType::TRANSPARENT_EXTRUSION) {
            color.with_alpha(TRANSPARENT_ALPHA)
        } else {
            color
        }
    }
}

fn retraction_color(extrusion_delta: f64, tool_index: usize, info: &RenderInfo) -> Rgba {
    if tool_index == 0 {
        if extrusion_delta > 0.0 {
            Rgba::BLUE
        } else {
            Rgba::RED
        }
    } else {
        info.extruder_color(tool_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::canvas::SvgCanvas;
    use std::sync::Arc;

    fn segment(start: DVec3, end: DVec3) -> Segment {
        Segment {
            start,
            end,
            tool_index: 0,
            feed_rate: 1200.0,
        }
    }

    fn extrusion(volume: f64) -> RenderFeature {
        RenderFeature::extrusion(
            3,
            segment(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0)),
            volume,
            0.2,
            Rgba::CYAN,
        )
    }

    #[test]
    fn test_retraction_radius_area_scales_with_delta() {
        let small = retraction_radius(0.5, 1.0);
        let large = retraction_radius(2.0, 1.0);
        assert!((large / small - 2.0).abs() < 1e-12);
        assert_eq!(retraction_radius(-2.0, 1.0), large);
    }

    #[test]
    fn test_extrusion_volume() {
        let volume = extrusion_volume(1.75, 5.0);
        let expected = std::f64::consts::PI * 0.875 * 0.875 * 5.0;
        assert!((volume - expected).abs() < 1e-12);
    }

    #[test]
    fn test_simulated_width() {
        let style = FeatureStyle::default();
        let feature = extrusion(0.8);

        assert_eq!(feature.extrusion_width(RenderType::EXTRUSIONS, &style), 0.4);
        let simulated = feature.extrusion_width(RenderType::SIMULATE_EXTRUSION, &style);
        assert!((simulated - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_simulated_width_floors_segment_length() {
        let style = FeatureStyle::default();
        let feature = RenderFeature::extrusion(0, segment(DVec3::ZERO, DVec3::ZERO), 0.01, 0.2, Rgba::CYAN);
        let width = feature.extrusion_width(RenderType::SIMULATE_EXTRUSION, &style);
        assert!((width - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_color_resolution_order() {
        let style = FeatureStyle::default();
        let feature = extrusion(0.8);
        let info = RenderInfo::new(0, 1).with_extruder_colors(Arc::new(|_| Rgba::ORANGE));

        let speed = info
            .clone()
            .with_render_type(RenderType::SPEED_COLORS | RenderType::GRAY_COLORS);
        assert_eq!(feature.extrusion_color(&speed, &style), Rgba::CYAN);

        let gray = info.clone().with_render_type(RenderType::GRAY_COLORS);
        assert_eq!(feature.extrusion_color(&gray, &style), style.gray);

        let material = info.clone().with_render_type(RenderType::EXTRUSIONS);
        assert_eq!(feature.extrusion_color(&material, &style), Rgba::ORANGE);

        let transparent = info.with_render_type(RenderType::TRANSPARENT_EXTRUSION);
        assert_eq!(feature.extrusion_color(&transparent, &style).a, 200);
    }

    #[test]
    fn test_retraction_colors() {
        let info = RenderInfo::new(0, 1).with_extruder_colors(Arc::new(|_| Rgba::CYAN));
        assert_eq!(retraction_color(1.0, 0, &info), Rgba::BLUE);
        assert_eq!(retraction_color(-1.0, 0, &info), Rgba::RED);
        assert_eq!(retraction_color(-1.0, 1, &info), Rgba::CYAN);
    }

    #[test]
    fn test_render_2d_respects_flags() {
        let style = FeatureStyle::default();
        let travel = RenderFeature::travel(1, segment(DVec3::ZERO, DVec3::X));
        let mut canvas = SvgCanvas::new(10.0, 10.0);

        let hidden = RenderInfo::new(0, 1).with_render_type(RenderType::EXTRUSIONS);
        travel.render_2d(&mut canvas, &hidden, &style, false);
        assert_eq!(canvas.element_count(), 0);

        let shown = RenderInfo::new(0, 1).with_render_type(RenderType::MOVES);
        travel.render_2d(&mut canvas, &shown, &style, true);
        assert_eq!(canvas.element_count(), 1);
        assert!(canvas.finish().contains(&style.highlight_color.to_hex()));
    }

    #[test]
    fn test_3d_data_per_kind() {
        let style = FeatureStyle::default();
        let info = RenderInfo::new(0, 1);
        let mut mesh = LayerMesh::new();

        RenderFeature::retraction(0, DVec3::ZERO, -1.0, 0, 1800.0).create_3d_data(&mut mesh, &info, &style);
        assert_eq!(mesh.vertex_count(), style.pointer_steps + 2);

        mesh.clear();
        extrusion(0.8).create_3d_data(&mut mesh, &info, &style);
        assert_eq!(mesh.index_count(), 24 * style.cylinder_steps);

        mesh.clear();
        let moves_off = info.with_render_type(RenderType::EXTRUSIONS);
        RenderFeature::travel(0, segment(DVec3::ZERO, DVec3::X)).create_3d_data(&mut mesh, &moves_off, &style);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_retract_pointer_points_down() {
        let style = FeatureStyle::default();
        let info = RenderInfo::new(0, 1);
        let mut mesh = LayerMesh::new();
        RenderFeature::retraction(0, DVec3::ZERO, -1.0, 0, 1800.0).create_3d_data(&mut mesh, &info, &style);

        let apex = mesh.vertices()[style.pointer_steps].position;
        assert!((apex[2] - POINTER_NEAR as f32).abs() < 1e-6);
    }
}
