//! Layer visualization module
//!
//! This module provides:
//! - Speed to color mapping (color_map)
//! - Feature extraction and the render feature model (extraction, features)
//! - Mesh building and GPU buffer management (mesh, geometry_buffer, backend)
//! - OpenGL and 2D canvas surfaces (glow_backend, canvas)
//! - The renderer orchestrating caching and the 2D/3D paths (renderer)

pub mod backend;
pub mod canvas;
pub mod color_map;
pub mod extraction;
pub mod features;
pub mod geometry_buffer;
pub mod glow_backend;
pub mod mesh;
pub mod render_info;
pub mod renderer;

pub use backend::{BufferHandle, BufferKind, DrawCall, GpuBackend, HeadlessBackend, ReleaseQueue};
pub use canvas::{Canvas2D, SvgCanvas};
pub use color_map::{SpeedColor, SpeedColorMap};
pub use extraction::{collect_extrusion_speeds, extract_layer};
pub use features::{
    extrusion_volume, retraction_radius, FeatureKind, FeatureStyle, RenderFeature, Segment,
};
pub use geometry_buffer::GeometryBuffer;
pub use glow_backend::GlowBackend;
pub use mesh::{ColorVertex, LayerMesh};
pub use render_info::RenderInfo;
pub use renderer::{feature_range, FrameReport, GCodeRenderer};
