mod text;
mod types;

pub use types::{LabelGeometry, LabelLayout, OverlayLayout, TextBlock, Viewport};

use crate::config::LayoutConfig;
use crate::overlay::{LabelSpec, Overlay, Point};
use crate::store::LabelMap;
use crate::theme::Theme;

/// Clamps a label point into `[margin, 100 - margin]` on both axes.
///
/// A non-finite coordinate collapses to the margin.
pub fn clamp_point(point: Point, margin: f32) -> Point {
    let clamp = |value: f32| (100.0 - margin).min(margin.max(value));
    Point::new(clamp(point.x), clamp(point.y))
}

/// Lays out one label given the container width and the text box width,
/// both in pixels.
///
/// A zero-width container (image not sized yet) yields a zero box width, so
/// the line starts at the label point until the next recompute. The angle is
/// taken in percentage space and only matches the screen for a square
/// container.
pub fn compute_layout(
    spec: &LabelSpec,
    container_width_px: f32,
    label_box_width_px: f32,
    margin: f32,
) -> LabelGeometry {
    let position = clamp_point(spec.label, margin);

    let width_pct = if container_width_px > 0.0 && container_width_px.is_finite() {
        label_box_width_px / container_width_px * 100.0
    } else {
        0.0
    };

    let line_origin = Point::new(position.x + width_pct / 2.0, position.y);
    let dx = spec.target.x - line_origin.x;
    let dy = spec.target.y - line_origin.y;

    LabelGeometry {
        position,
        width_pct,
        line_origin,
        line_length: dx.hypot(dy),
        line_angle_deg: dy.atan2(dx).to_degrees(),
        arrow_offset: Point::new(spec.target.x - position.x, spec.target.y - position.y),
    }
}

/// Where the connector line ends: its origin moved `line_length` along the
/// x-axis rotated by `line_angle_deg`.
pub fn line_endpoint(geometry: &LabelGeometry) -> Point {
    let (sin, cos) = geometry.line_angle_deg.to_radians().sin_cos();
    Point::new(
        geometry.line_origin.x + geometry.line_length * cos,
        geometry.line_origin.y + geometry.line_length * sin,
    )
}

/// Where the arrow sits: the unrotated offset applied to the label point.
pub fn arrow_point(geometry: &LabelGeometry) -> Point {
    Point::new(
        geometry.position.x + geometry.arrow_offset.x,
        geometry.position.y + geometry.arrow_offset.y,
    )
}

/// Measures every label box from `texts` and lays out the whole overlay.
/// Labels missing from `texts` are measured as empty.
pub fn layout_overlay(
    overlay: &Overlay,
    texts: &LabelMap,
    theme: &Theme,
    config: &LayoutConfig,
    viewport: Viewport,
) -> OverlayLayout {
    let labels = overlay
        .labels
        .iter()
        .map(|spec| {
            let content = texts.get(&spec.id).map(String::as_str).unwrap_or("");
            let (block, box_width, box_height) = text::measure_label_box(content, theme, config);
            let geometry = compute_layout(spec, viewport.width, box_width, config.margin);
            LabelLayout {
                id: spec.id.clone(),
                target: spec.target,
                text: block,
                box_width,
                box_height,
                geometry,
            }
        })
        .collect();

    OverlayLayout {
        viewport,
        image: overlay.image.clone(),
        labels,
    }
}
