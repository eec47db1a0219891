//! campusmap-export: Pure format serializers (sans-IO)
//!
//! Converts rendered building outlines into SVG overlays that line up
//! with the map image at its current render size.

pub mod svg;

pub use svg::{OverlayStyle, SvgMetadata, path_data, to_overlay_svg, to_trace_svg};
