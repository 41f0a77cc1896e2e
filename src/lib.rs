pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod layout;
pub mod layout_dump;
pub mod overlay;
pub mod render;
pub mod schedule;
pub mod store;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig};
pub use layout::{
    LabelGeometry, OverlayLayout, Viewport, arrow_point, clamp_point, compute_layout,
    layout_overlay, line_endpoint,
};
pub use overlay::{LabelSpec, Overlay, Point, default_labels};
pub use render::{EmbeddedImage, render_svg};
pub use store::{LabelMap, LabelStore, STORAGE_KEY, Storage};
pub use theme::Theme;

/// Theme and layout settings for one-shot rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl RenderOptions {
    pub fn dark() -> Self {
        Self::default()
    }

    pub fn light() -> Self {
        Self {
            theme: Theme::light(),
            ..Self::default()
        }
    }
}

/// Lays out `overlay` with `texts` (missing labels use their defaults) and
/// renders it to SVG without a base image.
pub fn render_with_options(overlay: &Overlay, texts: &LabelMap, options: &RenderOptions) -> String {
    let mut merged = overlay.default_texts();
    merged.extend(texts.iter().map(|(id, text)| (id.clone(), text.clone())));
    let viewport = Viewport::new(options.render.width, options.render.height);
    let layout = layout_overlay(overlay, &merged, &options.theme, &options.layout, viewport);
    render_svg(&layout, &options.theme, None)
}
