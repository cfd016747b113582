//! # LayerView
//!
//! Layer-by-layer preview of 3D printer G-code.
//!
//! ## Architecture
//!
//! LayerView is organized as a workspace with multiple crates:
//!
//! 1. **layerview-core** - Colors, render-type flags, eviction policy, errors
//! 2. **layerview-settings** - Viewer configuration and persistence
//! 3. **layerview-visualizer** - Instruction sources, feature extraction, 2D/3D rendering
//! 4. **layerview** - Command line front end that integrates all crates
//!
//! ## Features
//!
//! - **Feature Extraction**: Travels, extrusions and retractions per layer
//! - **Speed Coloring**: Stable feed-rate palette across the whole print
//! - **Layer Scrubbing**: Partial rendering of the top layer by feature ratio
//! - **GPU Caching**: One geometry buffer per layer with bounded residency

pub use layerview_core::{EvictionPolicy, Error, GcodeError, RenderError, RenderType, Result, Rgba};
pub use layerview_settings::{Config, Theme};
pub use layerview_visualizer::{
    FrameReport, GCodeMemoryFile, GCodeRenderer, HeadlessBackend, InstructionSource, RenderInfo,
    SvgCanvas,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
///
/// Logs go to stderr so command output on stdout stays machine readable.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
