use crate::overlay::Point;
use serde::Serialize;
use std::path::PathBuf;

/// Pixel size of the container the overlay is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn to_px(&self, point: Point) -> (f32, f32) {
        (point.x / 100.0 * self.width, point.y / 100.0 * self.height)
    }
}

/// Connector geometry for one label, in container-percentage space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelGeometry {
    /// Label point after clamping into the margins. The text box is centred
    /// on it.
    pub position: Point,
    pub width_pct: f32,
    /// Midpoint of the box's trailing edge, where the connector line starts.
    pub line_origin: Point,
    pub line_length: f32,
    pub line_angle_deg: f32,
    /// Arrow tip relative to `position`, unrotated.
    pub arrow_offset: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub text: String,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelLayout {
    pub id: String,
    pub target: Point,
    pub text: TextBlock,
    pub box_width: f32,
    pub box_height: f32,
    pub geometry: LabelGeometry,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverlayLayout {
    pub viewport: Viewport,
    pub image: Option<PathBuf>,
    pub labels: Vec<LabelLayout>,
}

impl OverlayLayout {
    pub fn get(&self, id: &str) -> Option<&LabelLayout> {
        self.labels.iter().find(|label| label.id == id)
    }
}
