#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::layout::{LabelLayout, OverlayLayout, Viewport, arrow_point, line_endpoint};
use crate::theme::Theme;
use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// File name used when exporting without an explicit output path.
pub const DEFAULT_EXPORT_NAME: &str = "controller-labels.png";

/// The base image, inlined into the SVG as a data URI.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub mime: &'static str,
    pub data: Vec<u8>,
}

impl EmbeddedImage {
    pub fn load(path: &Path) -> Result<Self> {
        let mime = mime_for(path)
            .ok_or_else(|| anyhow::anyhow!("Unsupported image type: {}", path.display()))?;
        let data = std::fs::read(path)?;
        Ok(Self { mime, data })
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

pub fn render_svg(layout: &OverlayLayout, theme: &Theme, image: Option<&EmbeddedImage>) -> String {
    let mut svg = String::new();
    let Viewport { width, height } = layout.viewport;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));

    if !is_transparent(&theme.background) {
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            theme.background
        ));
    }

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.arrow_color
    ));
    svg.push_str("</defs>");

    if let Some(image) = image {
        svg.push_str(&format!(
            "<image x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" preserveAspectRatio=\"xMidYMid meet\" href=\"{}\"/>",
            image.data_uri()
        ));
    }

    // Lines first so every text box sits above every connector.
    for label in &layout.labels {
        svg.push_str(&connector_svg(label, layout.viewport, theme));
    }
    for label in &layout.labels {
        svg.push_str(&label_box_svg(label, layout.viewport, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn connector_svg(label: &LabelLayout, viewport: Viewport, theme: &Theme) -> String {
    let geometry = &label.geometry;
    let (x1, y1) = viewport.to_px(geometry.line_origin);
    let (x2, y2) = viewport.to_px(line_endpoint(geometry));
    let (ax, ay) = viewport.to_px(arrow_point(geometry));
    let mut out = format!(
        "<g class=\"connector\" data-id=\"{}\"><line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{}\" stroke-width=\"2\"/>",
        escape_xml(&label.id),
        theme.line_color,
    );
    // The marker needs a direction; a label sitting on its target gets only the dot.
    let (dx, dy) = (ax - x1, ay - y1);
    let len = dx.hypot(dy);
    if len > f32::EPSILON {
        let (bx, by) = (ax - dx / len, ay - dy / len);
        out.push_str(&format!(
            "<path class=\"arrow\" d=\"M {bx:.2} {by:.2} L {ax:.2} {ay:.2}\" stroke=\"none\" marker-end=\"url(#arrow)\"/>"
        ));
    }
    out.push_str(&format!(
        "<circle cx=\"{ax:.2}\" cy=\"{ay:.2}\" r=\"3\" fill=\"{}\"/></g>",
        theme.arrow_color
    ));
    out
}

fn label_box_svg(label: &LabelLayout, viewport: Viewport, theme: &Theme) -> String {
    let (cx, cy) = viewport.to_px(label.geometry.position);
    let x = cx - label.box_width / 2.0;
    let y = cy - label.box_height / 2.0;
    let baseline = cy + theme.font_size * 0.35;
    format!(
        "<g class=\"label\" data-id=\"{}\"><rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.2\"/><text x=\"{cx:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text></g>",
        escape_xml(&label.id),
        label.box_width,
        label.box_height,
        theme.label_fill,
        theme.label_border,
        escape_xml(&theme.font_family),
        theme.font_size,
        theme.label_text_color,
        escape_xml(&label.text.text)
    )
}

fn is_transparent(color: &str) -> bool {
    matches!(color.trim(), "" | "none" | "transparent")
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

/// Rasterizes an SVG document to PNG bytes at `render_cfg.scale`.
#[cfg(feature = "png")]
pub fn rasterize_png(svg: &str, render_cfg: &RenderConfig, theme: &Theme) -> Result<Vec<u8>> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    if let Some(primary) = theme.font_family.split(',').next() {
        opt.font_family = primary.trim().trim_matches('"').to_string();
    }
    opt.default_size =
        usvg::Size::from_wh(render_cfg.width, render_cfg.height).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid render size {}x{}",
                render_cfg.width,
                render_cfg.height
            )
        })?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let scale = if render_cfg.scale > 0.0 { render_cfg.scale } else { 1.0 };
    let size = tree.size().to_int_size();
    let width = (size.width() as f32 * scale).ceil() as u32;
    let height = (size.height() as f32 * scale).ceil() as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap_mut,
    );
    Ok(pixmap.encode_png()?)
}

#[cfg(feature = "png")]
pub fn write_output_png(
    svg: &str,
    output: &Path,
    render_cfg: &RenderConfig,
    theme: &Theme,
) -> Result<()> {
    let png = rasterize_png(svg, render_cfg, theme)?;
    std::fs::write(output, png)?;
    Ok(())
}

/// Turns a rendered overlay into image bytes.
pub trait Exporter {
    fn export(&mut self, svg: &str) -> Result<Vec<u8>>;
}

#[cfg(feature = "png")]
#[derive(Debug, Clone)]
pub struct PngExporter {
    pub render: RenderConfig,
    pub theme: Theme,
}

#[cfg(feature = "png")]
impl Exporter for PngExporter {
    fn export(&mut self, svg: &str) -> Result<Vec<u8>> {
        rasterize_png(svg, &self.render, &self.theme)
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::layout_overlay;
    use crate::overlay::{LabelSpec, Overlay, Point};
    use crate::store::LabelMap;

    fn single_label_layout(text: &str) -> OverlayLayout {
        let overlay = Overlay {
            image: None,
            labels: vec![LabelSpec::new("aButton", Point::new(50.0, 50.0), Point::new(10.0, 10.0))],
        };
        let mut texts = LabelMap::new();
        texts.insert("aButton".to_string(), text.to_string());
        let config = LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        };
        layout_overlay(&overlay, &texts, &Theme::dark(), &config, Viewport::new(1000.0, 500.0))
    }

    #[test]
    fn render_svg_basic() {
        let svg = render_svg(&single_label_layout("Jump"), &Theme::dark(), None);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">Jump</text>"));
        assert!(svg.contains("marker-end=\"url(#arrow)\""));
        // Transparent background draws no backdrop rect.
        assert!(!svg.contains("height=\"100%\""));
    }

    #[test]
    fn connector_ends_on_the_target_in_pixels() {
        let svg = render_svg(&single_label_layout("Jump"), &Theme::dark(), None);
        assert!(svg.contains("x2=\"500.00\" y2=\"250.00\""), "{svg}");
        assert!(svg.contains("L 500.00 250.00\""), "{svg}");
        assert!(svg.contains("cx=\"500.00\" cy=\"250.00\""), "{svg}");
    }

    #[test]
    fn arrow_is_drawn_from_the_arrow_offset() {
        let mut layout = single_label_layout("Jump");
        // Offset from the label point (10, 10) to (30, 70) percent.
        layout.labels[0].geometry.arrow_offset = Point::new(20.0, 60.0);
        let svg = render_svg(&layout, &Theme::dark(), None);
        assert!(svg.contains("x2=\"500.00\" y2=\"250.00\""), "{svg}");
        assert!(svg.contains("L 300.00 350.00\""), "{svg}");
        assert!(svg.contains("cx=\"300.00\" cy=\"350.00\""), "{svg}");
        assert!(!svg.contains("cx=\"500.00\""), "{svg}");
    }

    #[test]
    fn escapes_user_text() {
        let svg = render_svg(&single_label_layout("<b>&\"x\""), &Theme::light(), None);
        assert!(svg.contains("&lt;b&gt;&amp;&quot;x&quot;"));
        assert!(svg.contains("height=\"100%\""));
    }

    #[test]
    fn embeds_image_as_data_uri() {
        let image = EmbeddedImage {
            mime: "image/png",
            data: vec![0x89, b'P', b'N', b'G'],
        };
        let svg = render_svg(&single_label_layout("Jump"), &Theme::dark(), Some(&image));
        assert!(svg.contains("href=\"data:image/png;base64,iVBORw==\""));
    }

    #[test]
    fn unknown_image_extension_is_rejected() {
        assert!(EmbeddedImage::load(Path::new("controller.bmpx")).is_err());
    }
}
