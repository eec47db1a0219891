//! PNG preview: the map at its render size with outlines painted on top.

use campusmap_detect::RenderedArea;
use image::{Rgba, RgbaImage};
use tiny_skia::{FillRule, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

const FILL: [u8; 4] = [14, 165, 233, 31];
const STROKE: [u8; 4] = [14, 165, 233, 204];
const ACTIVE_FILL: [u8; 4] = [249, 115, 22, 64];
const ACTIVE_STROKE: [u8; 4] = [249, 115, 22, 255];

#[allow(clippy::cast_possible_truncation)]
fn outline_path(area: &RenderedArea) -> Option<Path> {
    let points = area.polygon.points();
    if points.len() < 3 {
        return None;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(points[0].x as f32, points[0].y as f32);
    for p in &points[1..] {
        pb.line_to(p.x as f32, p.y as f32);
    }
    pb.close();
    pb.finish()
}

/// Paint `areas` over `map`, which must already be at render size.
///
/// The area named `selected` gets the active colours and a heavier
/// stroke. Returns `None` for an empty map.
#[allow(clippy::cast_possible_truncation)]
pub fn render_preview(
    map: &RgbaImage,
    areas: &[RenderedArea],
    selected: Option<&str>,
) -> Option<RgbaImage> {
    let (width, height) = map.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;

    // tiny-skia stores premultiplied RGBA.
    for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(map.pixels()) {
        let [r, g, b, a] = src.0;
        let premul = |c: u8| (u16::from(c) * u16::from(a) / 255) as u8;
        dst.copy_from_slice(&[premul(r), premul(g), premul(b), a]);
    }

    for area in areas {
        let Some(path) = outline_path(area) else {
            continue;
        };
        let active = selected == Some(area.name.as_str());
        let (fill, stroke, stroke_width) = if active {
            (ACTIVE_FILL, ACTIVE_STROKE, 3.0)
        } else {
            (FILL, STROKE, 2.0)
        };

        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color_rgba8(fill[0], fill[1], fill[2], fill[3]);
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

        paint.set_color_rgba8(stroke[0], stroke[1], stroke[2], stroke[3]);
        let stroke = Stroke {
            width: stroke_width,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    let data = pixmap.data();
    let mut img = RgbaImage::new(width, height);
    for (i, pixel) in img.pixels_mut().enumerate() {
        let off = i * 4;
        let a = data[off + 3];
        if a == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
        } else {
            let unpremul = |c: u8| (u16::from(c) * 255 / u16::from(a)) as u8;
            *pixel = Rgba([
                unpremul(data[off]),
                unpremul(data[off + 1]),
                unpremul(data[off + 2]),
                a,
            ]);
        }
    }
    Some(img)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use campusmap_detect::{AreaId, PixelPoint, PixelPolygon};

    use super::*;

    fn white(size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]))
    }

    fn square(name: &str) -> RenderedArea {
        RenderedArea {
            id: AreaId(1),
            name: name.to_string(),
            polygon: PixelPolygon::new(vec![
                PixelPoint::new(10.0, 10.0),
                PixelPoint::new(30.0, 10.0),
                PixelPoint::new(30.0, 30.0),
                PixelPoint::new(10.0, 30.0),
            ]),
            label: PixelPoint::new(20.0, 20.0),
        }
    }

    #[test]
    fn interior_is_tinted_and_outside_untouched() {
        let img = render_preview(&white(40), &[square("Hall")], None).unwrap();
        let inside = img.get_pixel(20, 20).0;
        assert!(inside[0] < 255, "fill should darken red: {inside:?}");
        assert!(inside[2] > inside[0]);
        assert_eq!(img.get_pixel(2, 2).0, [255, 255, 255, 255]);
    }

    #[test]
    fn outline_is_stroked() {
        let img = render_preview(&white(40), &[square("Hall")], None).unwrap();
        let edge = img.get_pixel(10, 20).0;
        let inside = img.get_pixel(20, 20).0;
        assert!(edge[0] < inside[0], "{edge:?} vs {inside:?}");
    }

    #[test]
    fn selected_area_is_orange() {
        let img = render_preview(&white(40), &[square("Hall")], Some("Hall")).unwrap();
        let inside = img.get_pixel(20, 20).0;
        assert!(inside[0] > inside[2], "{inside:?}");
    }

    #[test]
    fn degenerate_area_leaves_map_unchanged() {
        let mut area = square("Hall");
        area.polygon = PixelPolygon::new(vec![PixelPoint::new(1.0, 1.0)]);
        let map = white(16);
        assert_eq!(render_preview(&map, &[area], None).unwrap(), map);
    }

    #[test]
    fn empty_map_has_no_preview() {
        assert!(render_preview(&RgbaImage::new(0, 0), &[], None).is_none());
    }
}
