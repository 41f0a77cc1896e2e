use crate::config::LayoutConfig;
use crate::text_metrics;
use crate::theme::Theme;

use super::TextBlock;

/// Size of a single-line label box: measured text plus padding, never
/// narrower than the configured minimum.
pub(super) fn measure_label_box(
    text: &str,
    theme: &Theme,
    config: &LayoutConfig,
) -> (TextBlock, f32, f32) {
    let line = text.replace(['\n', '\r'], " ");
    let width = text_width(&line, theme.font_size, &theme.font_family, config.fast_text_metrics);
    let height = theme.font_size * config.label_line_height;
    let box_width = (width + config.label_padding_x * 2.0).max(config.min_label_width);
    let box_height = height + config.label_padding_y * 2.0;
    (
        TextBlock {
            text: line,
            width,
            height,
        },
        box_width,
        box_height,
    )
}

pub(super) fn text_width(text: &str, font_size: f32, font_family: &str, fast: bool) -> f32 {
    if !fast
        && let Some(width) = text_metrics::measure_text_width(text, font_size, font_family)
    {
        return width;
    }
    fallback_text_width(text, font_size)
}

pub(super) fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

// Rough em widths for a humanist sans at regular weight.
fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.28,
        'i' | 'j' | 'l' | '!' | '|' | '.' | ',' | ':' | ';' | '\'' => 0.26,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.36,
        'm' | 'w' => 0.84,
        'M' | 'W' => 0.9,
        'A'..='Z' => 0.66,
        '0'..='9' => 0.56,
        'a'..='z' => 0.54,
        ch if ch.is_ascii() => 0.56,
        // CJK and other wide scripts
        _ => 1.0,
    }
}
