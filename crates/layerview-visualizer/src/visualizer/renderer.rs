//! Layer feature cache and the 2D/3D render paths
//!
//! `GCodeRenderer` extracts features per layer on demand, keeps them for the
//! lifetime of the renderer, and builds one GPU geometry buffer per visible
//! layer for the 3D path. Geometry is dropped when the render type changes and,
//! under a memory ceiling, for layers that fall out of the drawn window.

use super::backend::{GpuBackend, ReleaseQueue};
use super::canvas::Canvas2D;
use super::color_map::{SpeedColor, SpeedColorMap};
use super::extraction::{collect_extrusion_speeds, extract_layer};
use super::features::{FeatureStyle, RenderFeature};
use super::geometry_buffer::GeometryBuffer;
use super::mesh::LayerMesh;
use super::render_info::RenderInfo;
use crate::gcode::InstructionSource;
use layerview_core::{EvictionPolicy, RenderError, RenderType, Rgba};
use layerview_settings::Config;
use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, trace};

/// What a 3D render did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    /// First drawn layer after the memory ceiling was applied
    pub start_layer: usize,
    /// One past the last drawn layer
    pub end_layer: usize,
    pub layers_built: usize,
    pub layers_evicted: usize,
    pub draw_calls: usize,
    pub indices_drawn: usize,
}

#[derive(Debug, Default)]
struct LayerSlot {
    extracted: bool,
    features: Vec<RenderFeature>,
    /// Index buffer offset where each feature's triangles start
    feature_start_index: Vec<usize>,
    /// Index buffer offset one past each feature's triangles
    feature_end_index: Vec<usize>,
    geometry: Option<GeometryBuffer>,
}

/// Feature sub-range `[start, end)` of a layer with `count` features for the
/// given scrub ratios.
///
/// Each ratio is scaled by `count`, rounded and clamped to `[0, count]`. When
/// the range comes out empty it is widened to one feature, so a layer with
/// features always shows at least one.
pub fn feature_range(count: usize, start_ratio: f64, end_ratio: f64) -> Range<usize> {
    let mut start = ratio_to_feature(count, start_ratio);
    let mut end = ratio_to_feature(count, end_ratio);

    if end <= start {
        end = (start + 1).min(count);
    }
    if start >= end {
        // only reachable when both ratios point at the last feature
        start = end.saturating_sub(1);
    }
    start..end
}

fn ratio_to_feature(count: usize, ratio: f64) -> usize {
    let scaled = (count as f64 * ratio + 0.5).trunc();
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else {
        (scaled as usize).min(count)
    }
}

/// Renders the layers of an instruction source
pub struct GCodeRenderer {
    source: Option<Arc<dyn InstructionSource>>,
    layers: Vec<LayerSlot>,
    speed_colors: SpeedColorMap,
    speeds_primed: bool,
    style: FeatureStyle,
    eviction: EvictionPolicy,
    default_filament_diameter: f64,
    gcode_inspector: bool,
    last_render_type: Option<RenderType>,
    release_queue: ReleaseQueue,
}

impl GCodeRenderer {
    /// Renderer for `source`. `None` gives a renderer with no layers.
    pub fn new(source: Option<Arc<dyn InstructionSource>>, config: &Config) -> Self {
        let layer_count = source.as_ref().map_or(0, |s| s.layer_count());
        let mut layers = Vec::with_capacity(layer_count);
        layers.resize_with(layer_count, LayerSlot::default);

        Self {
            source,
            layers,
            speed_colors: SpeedColorMap::new(),
            speeds_primed: false,
            style: FeatureStyle::new(&config.renderer, config.view.theme),
            eviction: config.renderer.eviction,
            default_filament_diameter: config.renderer.default_filament_diameter,
            gcode_inspector: config.view.gcode_inspector,
            last_render_type: None,
            release_queue: ReleaseQueue::new(),
        }
    }

    pub fn source(&self) -> Option<&Arc<dyn InstructionSource>> {
        self.source.as_ref()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Filament diameter of the source, or the configured default
    pub fn filament_diameter(&self) -> f64 {
        self.source
            .as_ref()
            .and_then(|s| s.filament_diameter())
            .unwrap_or(self.default_filament_diameter)
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction
    }

    pub fn set_eviction_policy(&mut self, policy: EvictionPolicy) {
        self.eviction = policy;
    }

    /// Extrusion gray used by `GRAY_COLORS`. Cached geometry is rebuilt on the
    /// next 3D render.
    pub fn set_gray(&mut self, gray: Rgba) {
        if self.style.gray != gray {
            self.style.gray = gray;
            self.last_render_type = None;
        }
    }

    pub fn gray(&self) -> Rgba {
        self.style.gray
    }

    /// Highlight the last drawn feature in the 2D preview
    pub fn set_gcode_inspector(&mut self, enabled: bool) {
        self.gcode_inspector = enabled;
    }

    pub fn gcode_inspector(&self) -> bool {
        self.gcode_inspector
    }

    /// Queue receiving handles of geometry dropped outside the rendering thread
    pub fn release_queue(&self) -> ReleaseQueue {
        self.release_queue.clone()
    }

    /// Primed speeds and their colors, slowest first
    pub fn speed_legend(&mut self) -> Vec<SpeedColor> {
        self.prime_speed_colors();
        self.speed_colors.legend()
    }

    pub fn speed_colors(&self) -> &SpeedColorMap {
        &self.speed_colors
    }

    fn prime_speed_colors(&mut self) {
        if self.speeds_primed {
            return;
        }
        if let Some(source) = &self.source {
            self.speed_colors.prime(collect_extrusion_speeds(source.as_ref()));
        }
        self.speeds_primed = true;
    }

    /// Extract the features of `layer` unless that already happened
    pub fn create_features_for_layer_if_required(&mut self, layer: usize) {
        if self.layers.get(layer).map_or(true, |slot| slot.extracted) {
            return;
        }
        let Some(source) = self.source.clone() else {
            return;
        };

        self.prime_speed_colors();
        let features = extract_layer(
            source.as_ref(),
            layer,
            &self.speed_colors,
            self.filament_diameter(),
        );
        debug!("Extracted {} features for layer {}", features.len(), layer);

        let slot = &mut self.layers[layer];
        slot.features = features;
        slot.extracted = true;
    }

    /// Number of features on `layer`, extracting it first if needed
    pub fn num_features(&mut self, layer: usize) -> usize {
        self.create_features_for_layer_if_required(layer);
        self.layers.get(layer).map_or(0, |slot| slot.features.len())
    }

    /// Feature `index` of `layer`, if that layer has been extracted and has it
    pub fn feature(&self, layer: usize, index: usize) -> Option<&RenderFeature> {
        self.layers.get(layer)?.features.get(index)
    }

    /// All extracted features of `layer`
    pub fn features(&self, layer: usize) -> &[RenderFeature] {
        self.layers
            .get(layer)
            .map(|slot| slot.features.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `layer` currently holds GPU geometry
    pub fn has_geometry(&self, layer: usize) -> bool {
        self.layers
            .get(layer)
            .is_some_and(|slot| slot.geometry.is_some())
    }

    /// Number of layers currently holding GPU geometry
    pub fn cached_layers(&self) -> usize {
        self.layers.iter().filter(|s| s.geometry.is_some()).count()
    }

    /// Draw the scrubbed feature range of the active layer (`info.end_layer`)
    /// into `canvas`. Returns the number of features visited.
    pub fn render_2d(&mut self, canvas: &mut dyn Canvas2D, info: &RenderInfo) -> usize {
        if self.layers.is_empty() {
            return 0;
        }
        let layer = info.end_layer.min(self.layers.len() - 1);
        self.create_features_for_layer_if_required(layer);

        let features = &self.layers[layer].features;
        let range = feature_range(features.len(), info.feature_start_ratio, info.feature_end_ratio);
        let last = range.end.saturating_sub(1);

        for index in range.clone() {
            let highlight = self.gcode_inspector && index == last;
            features[index].render_2d(canvas, info, &self.style, highlight);
        }
        range.len()
    }

    /// Draw layers `[info.start_layer, info.end_layer)` through `backend`.
    ///
    /// Layers below the top one are drawn whole; the top layer is drawn for the
    /// feature range selected by the scrub ratios.
    pub fn render_3d(
        &mut self,
        backend: &mut dyn GpuBackend,
        info: &RenderInfo,
    ) -> Result<FrameReport, RenderError> {
        self.release_queue.drain(backend);

        let end_layer = info.end_layer.min(self.layers.len());
        if end_layer == 0 {
            return Ok(FrameReport::default());
        }
        let top = end_layer - 1;
        let mut start_layer = info.start_layer.min(top);

        for layer in start_layer..end_layer {
            self.create_features_for_layer_if_required(layer);
        }

        if self.last_render_type != Some(info.render_type) {
            debug!("Render type changed to {:?}, dropping cached geometry", info.render_type);
            self.clear_3d_geometry(backend);
            self.last_render_type = Some(info.render_type);
        }

        let mut report = FrameReport {
            end_layer,
            ..FrameReport::default()
        };

        if let Some(ceiling) = self.eviction.active_ceiling(backend.supports_buffer_objects()) {
            start_layer = self.window_start_under_ceiling(start_layer, top, ceiling);
            report.layers_evicted = self.evict_outside(backend, start_layer..end_layer);
        }
        report.start_layer = start_layer;

        for layer in (start_layer..end_layer).rev() {
            if self.layers[layer].geometry.is_none() {
                self.build_layer_geometry(backend, layer, info)?;
                report.layers_built += 1;
            }
        }

        for layer in start_layer..top {
            let slot = &self.layers[layer];
            let Some(geometry) = &slot.geometry else {
                continue;
            };
            let count = slot.feature_end_index.last().copied().unwrap_or(0);
            if count > 0 {
                geometry.render_range(backend, 0, count)?;
                report.draw_calls += 1;
                report.indices_drawn += count;
            }
        }

        let slot = &self.layers[top];
        let range = feature_range(
            slot.features.len(),
            info.feature_start_ratio,
            info.feature_end_ratio,
        );
        if let (false, Some(geometry)) = (range.is_empty(), &slot.geometry) {
            let offset = slot.feature_start_index[range.start];
            let count = slot.feature_end_index[range.end - 1] - offset;
            if count > 0 {
                trace!("Partial layer {} features {:?}", top, range);
                geometry.render_range(backend, offset, count)?;
                report.draw_calls += 1;
                report.indices_drawn += count;
            }
        }

        Ok(report)
    }

    /// Lowest layer such that the features of `[layer, top]` stay within
    /// `ceiling`. The top layer is always kept.
    fn window_start_under_ceiling(&self, start_layer: usize, top: usize, ceiling: usize) -> usize {
        let mut total = 0;
        let mut first_kept = top;
        for layer in (start_layer..=top).rev() {
            let count = self.layers[layer].features.len();
            if layer != top && total + count > ceiling {
                debug!(
                    "Feature ceiling {} reached, drawing from layer {} instead of {}",
                    ceiling, first_kept, start_layer
                );
                break;
            }
            total += count;
            first_kept = layer;
        }
        first_kept
    }

    fn evict_outside(&mut self, backend: &mut dyn GpuBackend, window: Range<usize>) -> usize {
        let mut evicted = 0;
        for (layer, slot) in self.layers.iter_mut().enumerate() {
            if window.contains(&layer) {
                continue;
            }
            if let Some(mut geometry) = slot.geometry.take() {
                geometry.release(backend);
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!("Evicted geometry of {} layers outside {:?}", evicted, window);
        }
        evicted
    }

    fn build_layer_geometry(
        &mut self,
        backend: &mut dyn GpuBackend,
        layer: usize,
        info: &RenderInfo,
    ) -> Result<(), RenderError> {
        let slot = &mut self.layers[layer];
        let mut mesh = LayerMesh::new();
        slot.feature_start_index.clear();
        slot.feature_end_index.clear();

        for feature in &slot.features {
            slot.feature_start_index.push(mesh.index_count());
            feature.create_3d_data(&mut mesh, info, &self.style);
            slot.feature_end_index.push(mesh.index_count());
        }

        slot.geometry = Some(GeometryBuffer::from_mesh(
            backend,
            self.release_queue.clone(),
            &mesh,
        )?);
        debug!(
            "Built layer {} geometry: {} vertices, {} indices",
            layer,
            mesh.vertex_count(),
            mesh.index_count()
        );
        Ok(())
    }

    /// Release every cached geometry buffer; features are kept
    pub fn clear_3d_geometry(&mut self, backend: &mut dyn GpuBackend) {
        for slot in &mut self.layers {
            if let Some(mut geometry) = slot.geometry.take() {
                geometry.release(backend);
            }
            slot.feature_start_index.clear();
            slot.feature_end_index.clear();
        }
    }

    /// Release all GPU resources held by the renderer
    pub fn dispose(&mut self, backend: &mut dyn GpuBackend) {
        self.clear_3d_geometry(backend);
        self.release_queue.drain(backend);
        self.last_render_type = None;
    }
}
