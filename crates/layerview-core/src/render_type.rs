//! Render-type flags selecting which feature kinds and visual styles are drawn.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bitset toggling feature kinds and styles for one draw call.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RenderType: u32 {
        /// Draw extruding moves.
        const EXTRUSIONS = 1;
        /// Draw non-extruding travel moves.
        const MOVES = 2;
        /// Draw retraction / unretraction markers.
        const RETRACTIONS = 4;
        /// Color extrusions by feed rate.
        const SPEED_COLORS = 8;
        /// Size extrusions from the extruded volume instead of the nominal width.
        const SIMULATE_EXTRUSION = 16;
        /// Reduce extrusion alpha.
        const TRANSPARENT_EXTRUSION = 64;
        /// Draw extrusions in the theme gray.
        const GRAY_COLORS = 128;
    }
}

impl Default for RenderType {
    fn default() -> Self {
        RenderType::EXTRUSIONS | RenderType::MOVES | RenderType::RETRACTIONS
    }
}

impl RenderType {
    /// Parse a comma separated list of flag names such as `"extrusions,moves"`.
    ///
    /// Names are case-insensitive and accept `-` or `_` as separators.
    /// Unknown names yield `None`.
    pub fn parse_list(list: &str) -> Option<Self> {
        let mut flags = RenderType::empty();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let normalized = name.to_ascii_uppercase().replace('-', "_");
            flags |= RenderType::from_name(&normalized)?;
        }
        Some(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shows_all_feature_kinds() {
        let flags = RenderType::default();
        assert!(flags.contains(RenderType::EXTRUSIONS));
        assert!(flags.contains(RenderType::MOVES));
        assert!(flags.contains(RenderType::RETRACTIONS));
        assert!(!flags.contains(RenderType::SPEED_COLORS));
    }

    #[test]
    fn test_parse_list() {
        let flags = RenderType::parse_list("extrusions, speed-colors").unwrap();
        assert_eq!(flags, RenderType::EXTRUSIONS | RenderType::SPEED_COLORS);
        assert!(RenderType::parse_list("bogus").is_none());
        assert_eq!(RenderType::parse_list(""), Some(RenderType::empty()));
    }

    #[test]
    fn test_flag_values_are_stable() {
        assert_eq!(RenderType::TRANSPARENT_EXTRUSION.bits(), 64);
        assert_eq!(RenderType::GRAY_COLORS.bits(), 128);
    }
}
