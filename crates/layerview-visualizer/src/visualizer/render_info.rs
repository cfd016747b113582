//! Per-draw parameters handed to the renderer each frame

use glam::{DAffine2, DVec2, DVec3};
use layerview_core::{ExtruderColorFn, ExtruderOffsetFn, RenderType, Rgba};
use layerview_settings::ViewSettings;
use std::fmt;
use std::sync::Arc;

/// Visible layer range, scrub ratios, active render types and per-extruder
/// lookups for one draw call.
///
/// Layers are drawn from `start_layer` up to but excluding `end_layer`; the
/// ratios select the part of the topmost drawn layer that is shown.
#[derive(Clone)]
pub struct RenderInfo {
    pub start_layer: usize,
    pub end_layer: usize,
    /// Fraction of the top layer's features where drawing starts
    pub feature_start_ratio: f64,
    /// Fraction of the top layer's features where drawing stops
    pub feature_end_ratio: f64,
    pub render_type: RenderType,
    /// Bed (mm) to screen transform used by the 2D path
    pub transform: DAffine2,
    /// Screen units per mm, scales 2D line widths and retraction circles
    pub layer_scale: f64,
    extruder_color: ExtruderColorFn,
    extruder_offset: ExtruderOffsetFn,
}

impl RenderInfo {
    /// Draw layers `[start_layer, end_layer)` in full with default styling
    pub fn new(start_layer: usize, end_layer: usize) -> Self {
        Self {
            start_layer,
            end_layer,
            feature_start_ratio: 0.0,
            feature_end_ratio: 1.0,
            render_type: RenderType::default(),
            transform: DAffine2::IDENTITY,
            layer_scale: 1.0,
            extruder_color: Arc::new(|_| Rgba::ORANGE),
            extruder_offset: Arc::new(|_| [0.0, 0.0]),
        }
    }

    /// Render types and material colors taken from the view preferences
    pub fn from_view_settings(view: &ViewSettings, start_layer: usize, end_layer: usize) -> Self {
        let materials = view.clone();
        Self::new(start_layer, end_layer)
            .with_render_type(view.render_types)
            .with_extruder_colors(Arc::new(move |tool| materials.material_color(tool)))
    }

    pub fn with_feature_ratios(mut self, start: f64, end: f64) -> Self {
        self.feature_start_ratio = start;
        self.feature_end_ratio = end;
        self
    }

    pub fn with_render_type(mut self, render_type: RenderType) -> Self {
        self.render_type = render_type;
        self
    }

    pub fn with_transform(mut self, transform: DAffine2, layer_scale: f64) -> Self {
        self.transform = transform;
        self.layer_scale = layer_scale;
        self
    }

    pub fn with_extruder_colors(mut self, colors: ExtruderColorFn) -> Self {
        self.extruder_color = colors;
        self
    }

    pub fn with_extruder_offsets(mut self, offsets: ExtruderOffsetFn) -> Self {
        self.extruder_offset = offsets;
        self
    }

    pub fn extruder_color(&self, tool: usize) -> Rgba {
        (self.extruder_color)(tool)
    }

    /// Bed position of `position` once the extruder's XY offset is applied
    pub fn offset_position(&self, position: DVec3, tool: usize) -> DVec3 {
        let [dx, dy] = (self.extruder_offset)(tool);
        position + DVec3::new(dx, dy, 0.0)
    }

    /// Screen position of `position` for the 2D path
    pub fn screen_point(&self, position: DVec3, tool: usize) -> DVec2 {
        self.transform
            .transform_point2(self.offset_position(position, tool).truncate())
    }
}

impl Default for RenderInfo {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl fmt::Debug for RenderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderInfo")
            .field("start_layer", &self.start_layer)
            .field("end_layer", &self.end_layer)
            .field("feature_start_ratio", &self.feature_start_ratio)
            .field("feature_end_ratio", &self.feature_end_ratio)
            .field("render_type", &self.render_type)
            .field("transform", &self.transform)
            .field("layer_scale", &self.layer_scale)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_point_applies_offset_then_transform() {
        let info = RenderInfo::new(0, 1)
            .with_transform(DAffine2::from_scale(DVec2::splat(2.0)), 2.0)
            .with_extruder_offsets(Arc::new(|tool| [tool as f64 * 10.0, 0.0]));

        let p = info.screen_point(DVec3::new(1.0, 1.0, 0.2), 1);
        assert_eq!(p, DVec2::new(22.0, 2.0));
    }

    #[test]
    fn test_view_settings_colors() {
        let view = ViewSettings::default();
        let info = RenderInfo::from_view_settings(&view, 0, 3);
        assert_eq!(info.extruder_color(1), view.material_color(1));
        assert_eq!(info.render_type, view.render_types);
    }
}
