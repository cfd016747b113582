//! # LayerView Visualizer
//!
//! G-code layer feature extraction and rendering for LayerView.
//! Includes the instruction model, an in-memory G-code source, render
//! features, mesh building, GPU buffer management and the layer renderer.
//!
//! `GCodeRenderer::render_3d` draws through any `GpuBackend`. Windowed hosts
//! pass a `GlowBackend` built on their current OpenGL context; the CLI,
//! tests and benchmarks use `HeadlessBackend`.

pub mod gcode;
pub mod visualizer;

pub use gcode::{GCodeMemoryFile, InstructionSource, MovementMode, PrinterInstruction};

pub use visualizer::{
    feature_range, retraction_radius, BufferHandle, BufferKind, Canvas2D, ColorVertex, DrawCall,
    FeatureKind, FeatureStyle, FrameReport, GCodeRenderer, GeometryBuffer, GlowBackend,
    GpuBackend, HeadlessBackend, LayerMesh, ReleaseQueue, RenderFeature, RenderInfo, Segment,
    SpeedColor, SpeedColorMap, SvgCanvas,
};
