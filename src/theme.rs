use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub label_fill: String,
    pub label_border: String,
    pub label_text_color: String,
    pub line_color: String,
    pub arrow_color: String,
    pub background: String,
}

impl Theme {
    /// Dark glass boxes with a blue accent, matching the labeler page.
    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 14.0,
            label_fill: "rgba(15, 23, 42, 0.85)".to_string(),
            label_border: "#2563EB".to_string(),
            label_text_color: "#F8FAFC".to_string(),
            line_color: "#3B82F6".to_string(),
            arrow_color: "#60A5FA".to_string(),
            background: "transparent".to_string(),
        }
    }

    pub fn light() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            label_fill: "#FFFFFF".to_string(),
            label_border: "#94A3B8".to_string(),
            label_text_color: "#1C2430".to_string(),
            line_color: "#475569".to_string(),
            arrow_color: "#1E293B".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "dark" | "default" => Some(Self::dark()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
