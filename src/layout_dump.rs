use crate::layout::{OverlayLayout, arrow_point, line_endpoint};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub image: Option<String>,
    pub labels: Vec<LabelDump>,
}

#[derive(Debug, Serialize)]
pub struct LabelDump {
    pub id: String,
    pub text: String,
    pub target: [f32; 2],
    pub position: [f32; 2],
    pub box_width: f32,
    pub box_height: f32,
    pub width_pct: f32,
    pub line_origin: [f32; 2],
    pub line_length: f32,
    pub line_angle_deg: f32,
    pub line_end: [f32; 2],
    pub arrow_offset: [f32; 2],
    pub arrow: [f32; 2],
}

impl LayoutDump {
    pub fn from_layout(layout: &OverlayLayout) -> Self {
        let labels = layout
            .labels
            .iter()
            .map(|label| {
                let geometry = &label.geometry;
                let end = line_endpoint(geometry);
                let arrow = arrow_point(geometry);
                LabelDump {
                    id: label.id.clone(),
                    text: label.text.text.clone(),
                    target: [label.target.x, label.target.y],
                    position: [geometry.position.x, geometry.position.y],
                    box_width: label.box_width,
                    box_height: label.box_height,
                    width_pct: geometry.width_pct,
                    line_origin: [geometry.line_origin.x, geometry.line_origin.y],
                    line_length: geometry.line_length,
                    line_angle_deg: geometry.line_angle_deg,
                    line_end: [end.x, end.y],
                    arrow_offset: [geometry.arrow_offset.x, geometry.arrow_offset.y],
                    arrow: [arrow.x, arrow.y],
                }
            })
            .collect();

        LayoutDump {
            width: layout.viewport.width,
            height: layout.viewport.height,
            image: layout.image.as_ref().map(|path| path.display().to_string()),
            labels,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &OverlayLayout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
