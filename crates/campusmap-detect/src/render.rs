//! Viewport renderer: stored unit-space areas to drawable pixel shapes.

use serde::Serialize;

use crate::normalize::{denormalize, denormalize_polygon};
use crate::types::{Area, AreaId, PixelPoint, PixelPolygon, RenderSize};

/// An area ready to draw at one particular render size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedArea {
    /// Identifier of the source area.
    pub id: AreaId,
    /// Label text.
    pub name: String,
    /// Outline in render-space pixels.
    pub polygon: PixelPolygon,
    /// Label anchor in render-space pixels.
    pub label: PixelPoint,
}

/// Denormalize one area against `size`.
#[must_use]
pub fn render_area(area: &Area, size: RenderSize) -> RenderedArea {
    RenderedArea {
        id: area.id,
        name: area.name.clone(),
        polygon: denormalize_polygon(&area.points, size),
        label: denormalize(area.label_position(), size),
    }
}

/// Denormalize every area against `size`, in input order.
///
/// Called on every render or resize; the stored areas are never touched.
#[must_use]
pub fn denormalize_all(areas: &[Area], size: RenderSize) -> Vec<RenderedArea> {
    areas.iter().map(|area| render_area(area, size)).collect()
}
