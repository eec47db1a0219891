//! SVG overlay serializer.
//!
//! Converts rendered building areas into an SVG document sized to the
//! map's current render size, using the [`svg`] crate for document
//! construction, XML escaping, and path data formatting. Laid over the
//! map image at the same size, every outline lines up with its building.
//!
//! Each area becomes a `<g>` holding a closed `<path>` (`M`, `L`..., `z`)
//! and a `<text>` label centred on the area's label anchor.
//!
//! Optional [`SvgMetadata`] embeds `<title>`, `<desc>` and a
//! `<metadata>` block carrying the detection configuration as JSON.
//!
//! These are pure functions with no I/O -- they return a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Element, Group, Path, Title};
use svg::node::{Node, Text, Value};

use campusmap_detect::{PixelPoint, PixelPolygon, RenderSize, RenderedArea};

/// Namespace for the `<campusmap:config>` metadata element.
const METADATA_NAMESPACE: &str = "https://campusmap.dev/ns/1";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the map image filename.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized [`DetectConfig`](campusmap_detect::DetectConfig) JSON,
    /// emitted inside `<metadata>` wrapped in a namespaced
    /// `<campusmap:config>` element.
    pub config_json: Option<&'a str>,
}

/// Paint used for overlay outlines.
///
/// Colours are any CSS colour string. The `active_*` fields apply to the
/// selected area only.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Fill of an unselected area.
    pub fill: String,
    /// Outline colour of an unselected area.
    pub stroke: String,
    /// Outline width of an unselected area, in render-space pixels.
    pub stroke_width: f64,
    /// Fill of the selected area.
    pub active_fill: String,
    /// Outline colour of the selected area.
    pub active_stroke: String,
    /// Outline width of the selected area, in render-space pixels.
    pub active_stroke_width: f64,
    /// Label text colour.
    pub label_color: String,
    /// Label font size in render-space pixels.
    pub font_size: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill: "rgba(14,165,233,0.12)".to_string(),
            stroke: "rgba(14,165,233,0.8)".to_string(),
            stroke_width: 2.0,
            active_fill: "rgba(249,115,22,0.25)".to_string(),
            active_stroke: "rgba(249,115,22,1)".to_string(),
            active_stroke_width: 3.0,
            label_color: "#0f172a".to_string(),
            font_size: 12.0,
        }
    }
}

/// Build an SVG path `d` attribute string for a closed outline.
///
/// Uses `M` for the first vertex, `L` for the rest and closes with `z`.
/// Returns an empty string for outlines with fewer than 3 vertices.
///
/// # Examples
///
/// ```
/// use campusmap_detect::{PixelPoint, PixelPolygon};
/// use campusmap_export::path_data;
///
/// let outline = PixelPolygon::new(vec![
///     PixelPoint::new(10.0, 20.0),
///     PixelPoint::new(30.0, 20.0),
///     PixelPoint::new(30.0, 40.0),
/// ]);
/// assert_eq!(path_data(&outline), "M10,20 L30,20 L30,40 z");
/// ```
#[must_use]
pub fn path_data(polygon: &PixelPolygon) -> String {
    let points = polygon.points();
    if points.len() < 3 {
        return String::new();
    }

    let first = &points[0];
    let mut data = Data::new().move_to((first.x, first.y));
    for p in &points[1..] {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data.close()))
}

/// An empty document sized to `size`, with the optional metadata
/// elements already added.
fn document(size: RenderSize, metadata: &SvgMetadata<'_>) -> Document {
    let (w, h) = (size.width(), size.height());
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("campusmap:config");
        config_el.assign("xmlns:campusmap", METADATA_NAMESPACE);
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    doc
}

fn finish(doc: &Document) -> String {
    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

/// Serialize rendered areas into an SVG overlay.
///
/// The document is `size.width()` by `size.height()` with a matching
/// `viewBox`, so coordinates are the same render-space pixels the areas
/// were denormalized against. Areas with fewer than 3 vertices are
/// skipped. The area whose name equals `selected` is drawn with the
/// active paint.
#[must_use]
pub fn to_overlay_svg(
    areas: &[RenderedArea],
    size: RenderSize,
    selected: Option<&str>,
    style: &OverlayStyle,
    metadata: &SvgMetadata<'_>,
) -> String {
    let mut doc = document(size, metadata);

    for area in areas {
        let d = path_data(&area.polygon);
        if d.is_empty() {
            continue;
        }
        let active = selected == Some(area.name.as_str());
        let (fill, stroke, width) = if active {
            (&style.active_fill, &style.active_stroke, style.active_stroke_width)
        } else {
            (&style.fill, &style.stroke, style.stroke_width)
        };

        let path = Path::new()
            .set("d", d)
            .set("fill", fill.as_str())
            .set("stroke", stroke.as_str())
            .set("stroke-width", width);
        let group = Group::new()
            .set("id", format!("area-{}", area.id))
            .set("class", if active { "area active" } else { "area" })
            .add(path)
            .add(label(&area.name, area.label, style));
        doc = doc.add(group);
    }

    finish(&doc)
}

/// Serialize an in-progress hand trace: the open polyline through the
/// snapped points, plus a dot on each one.
///
/// Fewer than 2 points draw dots only.
#[must_use]
pub fn to_trace_svg(points: &[PixelPoint], size: RenderSize, metadata: &SvgMetadata<'_>) -> String {
    const TRACE_FILL: &str = "rgba(14,165,233,0.15)";
    const TRACE_STROKE: &str = "rgba(14,165,233,1)";

    let mut doc = document(size, metadata);

    if let [first, rest @ ..] = points
        && !rest.is_empty()
    {
        let mut data = Data::new().move_to((first.x, first.y));
        for p in rest {
            data = data.line_to((p.x, p.y));
        }
        doc = doc.add(
            Path::new()
                .set("d", data)
                .set("fill", TRACE_FILL)
                .set("stroke", TRACE_STROKE)
                .set("stroke-width", 2),
        );
    }

    for p in points {
        doc = doc.add(
            Circle::new()
                .set("cx", p.x)
                .set("cy", p.y)
                .set("r", 4)
                .set("fill", TRACE_STROKE),
        );
    }

    finish(&doc)
}

/// A bold `<text>` centred on `anchor`.
fn label(name: &str, anchor: PixelPoint, style: &OverlayStyle) -> Element {
    let mut el = Element::new("text");
    el.assign("x", anchor.x);
    el.assign("y", anchor.y);
    el.assign("text-anchor", "middle");
    el.assign("dominant-baseline", "middle");
    el.assign("font-size", style.font_size);
    el.assign("font-weight", 700);
    el.assign("fill", style.label_color.as_str());
    el.append(Text::new(name));
    el
}
