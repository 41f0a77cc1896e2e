use controller_labeler::{
    LabelMap, LabelSpec, Overlay, Point, RenderOptions, compute_layout, render_with_options,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverlayRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    margin: Option<f32>,
}

fn build_render_options(options: OverlayRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("light") {
        RenderOptions::light()
    } else {
        RenderOptions::dark()
    };

    // No system fonts inside wasm; measure with the calibrated fallback.
    render_options.layout.fast_text_metrics = true;

    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        render_options.theme.font_size = font_size;
    }
    if let Some(width) = options.width {
        render_options.render.width = width;
    }
    if let Some(height) = options.height {
        render_options.render.height = height;
    }
    if let Some(margin) = options.margin {
        render_options.layout.margin = margin;
    }

    render_options
}

fn parse_json<T: for<'de> Deserialize<'de> + Default>(raw: Option<String>) -> Result<T, JsValue> {
    match raw {
        Some(raw) => {
            serde_json::from_str::<T>(&raw).map_err(|error| JsValue::from_str(&error.to_string()))
        }
        None => Ok(T::default()),
    }
}

/// Renders an overlay description (JSON5, or the built-in controller when
/// omitted) with the given label text to SVG.
#[wasm_bindgen]
pub fn render_overlay_svg(
    overlay_json: Option<String>,
    labels_json: Option<String>,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let overlay = match overlay_json {
        Some(raw) => {
            Overlay::from_json5(&raw).map_err(|error| JsValue::from_str(&error.to_string()))?
        }
        None => Overlay::controller(),
    };
    let labels: LabelMap = parse_json(labels_json)?;
    let options: OverlayRenderOptions = parse_json(options_json)?;
    Ok(render_with_options(&overlay, &labels, &build_render_options(options)))
}

/// Connector geometry for one label, as a JSON object.
#[wasm_bindgen]
pub fn label_geometry(
    target_x: f32,
    target_y: f32,
    label_x: f32,
    label_y: f32,
    container_width_px: f32,
    label_box_width_px: f32,
    margin: f32,
) -> Result<String, JsValue> {
    let spec = LabelSpec::new(
        "label",
        Point::new(target_x, target_y),
        Point::new(label_x, label_y),
    );
    let geometry = compute_layout(&spec, container_width_px, label_box_width_px, margin);
    serde_json::to_string(&geometry).map_err(|error| JsValue::from_str(&error.to_string()))
}
