use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Minimum distance, in percent, a label point keeps from the container
    /// edges.
    pub margin: f32,
    pub label_padding_x: f32,
    pub label_padding_y: f32,
    pub min_label_width: f32,
    pub label_line_height: f32,
    pub fast_text_metrics: bool,
    pub resize_debounce_ms: u64,
    pub notification_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: 5.0,
            label_padding_x: 12.0,
            label_padding_y: 6.0,
            min_label_width: 96.0,
            label_line_height: 1.4,
            fast_text_metrics: false,
            resize_debounce_ms: 250,
            notification_ms: 3000,
        }
    }
}

impl LayoutConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    /// Pixel density multiplier for raster export.
    pub scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            scale: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::dark(),
            layout: LayoutConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    label_fill: Option<String>,
    label_border: Option<String>,
    label_text_color: Option<String>,
    line_color: Option<String>,
    arrow_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    margin: Option<f32>,
    label_padding_x: Option<f32>,
    label_padding_y: Option<f32>,
    min_label_width: Option<f32>,
    label_line_height: Option<f32>,
    fast_text_metrics: Option<bool>,
    resize_debounce_ms: Option<u64>,
    notification_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    scale: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown theme `{theme_name}`"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.label_fill {
            config.theme.label_fill = v;
        }
        if let Some(v) = vars.label_border {
            config.theme.label_border = v;
        }
        if let Some(v) = vars.label_text_color {
            config.theme.label_text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.arrow_color {
            config.theme.arrow_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.margin {
            if !(0.0..50.0).contains(&v) {
                return Err(anyhow::anyhow!("layout.margin must be in [0, 50), got {v}"));
            }
            config.layout.margin = v;
        }
        if let Some(v) = layout.label_padding_x {
            config.layout.label_padding_x = v;
        }
        if let Some(v) = layout.label_padding_y {
            config.layout.label_padding_y = v;
        }
        if let Some(v) = layout.min_label_width {
            config.layout.min_label_width = v;
        }
        if let Some(v) = layout.label_line_height {
            config.layout.label_line_height = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            config.layout.fast_text_metrics = v;
        }
        if let Some(v) = layout.resize_debounce_ms {
            config.layout.resize_debounce_ms = v;
        }
        if let Some(v) = layout.notification_ms {
            config.layout.notification_ms = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.scale {
            config.render.scale = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_keeps_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.layout.margin, 5.0);
        assert_eq!(config.layout.resize_debounce(), Duration::from_millis(250));
        assert_eq!(config.layout.notification_duration(), Duration::from_secs(3));
        assert_eq!(config.render.scale, 2.0);
    }

    #[test]
    fn overrides_only_present_fields() {
        let config = parse_config(
            r##"{
                "theme": "light",
                "themeVariables": { "lineColor": "#FF0000" },
                "layout": { "margin": 8, "fastTextMetrics": true },
                "render": { "width": 640 }
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.line_color, "#FF0000");
        assert_eq!(config.theme.label_fill, Theme::light().label_fill);
        assert_eq!(config.theme.background, Theme::light().background);
        assert_eq!(config.layout.margin, 8.0);
        assert!(config.layout.fast_text_metrics);
        assert_eq!(config.render.width, 640.0);
        assert_eq!(config.render.height, 800.0);
    }

    #[test]
    fn background_variable_reaches_the_rendered_svg() {
        let config = parse_config(r##"{ "themeVariables": { "background": "#102030" } }"##).unwrap();
        let layout = crate::layout::OverlayLayout {
            viewport: crate::layout::Viewport::new(100.0, 100.0),
            image: None,
            labels: Vec::new(),
        };
        let svg = crate::render::render_svg(&layout, &config.theme, None);
        assert!(svg.contains("fill=\"#102030\""), "{svg}");
    }

    #[test]
    fn rejects_unknown_theme_and_bad_margin() {
        assert!(parse_config(r#"{ "theme": "neon" }"#).is_err());
        assert!(parse_config(r#"{ "layout": { "margin": 60 } }"#).is_err());
    }
}
