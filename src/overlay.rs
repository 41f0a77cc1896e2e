use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A position in container-percentage space (0..=100 on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// One labelled part of the underlying image.
///
/// The target is where the connector line ends and never moves; the label
/// point is where the text box sits and can be changed by dragging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub id: String,
    pub target: Point,
    pub label: Point,
    /// Default text for this label. Falls back to the built-in controller
    /// defaults when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl LabelSpec {
    pub fn new(id: &str, target: Point, label: Point) -> Self {
        Self {
            id: id.to_string(),
            target,
            label,
            text: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("failed to read overlay description: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid overlay description: {0}")]
    Parse(#[from] json5::Error),
    #[error("duplicate label id `{0}`")]
    DuplicateId(String),
    #[error("label `{0}` has a non-finite coordinate")]
    NonFinite(String),
    #[error("unknown label id `{0}`")]
    UnknownLabel(String),
    #[error("overlay has no labels")]
    Empty,
}

/// The typed overlay description: the base image plus the fixed label set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    pub labels: Vec<LabelSpec>,
}

/// Built-in text for the controller parts, in display order.
pub const DEFAULT_LABELS: [(&str, &str); 14] = [
    ("leftStick", "Left Analog Stick"),
    ("rightStick", "Right Analog Stick"),
    ("dpad", "D-Pad"),
    ("aButton", "A Button"),
    ("bButton", "B Button"),
    ("xButton", "X Button"),
    ("yButton", "Y Button"),
    ("leftBumper", "Left Bumper"),
    ("rightBumper", "Right Bumper"),
    ("leftTrigger", "Left Trigger"),
    ("rightTrigger", "Right Trigger"),
    ("menuButton", "Menu Button"),
    ("viewButton", "View Button"),
    ("xboxButton", "Xbox Button"),
];

// (id, target x, target y, label x, label y)
const CONTROLLER_POINTS: [(&str, f32, f32, f32, f32); 14] = [
    ("leftStick", 28.0, 38.0, 8.0, 30.0),
    ("rightStick", 62.0, 58.0, 72.0, 88.0),
    ("dpad", 37.0, 58.0, 14.0, 80.0),
    ("aButton", 72.0, 45.0, 92.0, 58.0),
    ("bButton", 78.0, 37.0, 92.0, 42.0),
    ("xButton", 66.0, 37.0, 86.0, 26.0),
    ("yButton", 72.0, 29.0, 82.0, 14.0),
    ("leftBumper", 25.0, 16.0, 10.0, 12.0),
    ("rightBumper", 75.0, 16.0, 92.0, 4.0),
    ("leftTrigger", 27.0, 6.0, 24.0, 2.0),
    ("rightTrigger", 73.0, 6.0, 60.0, 2.0),
    ("menuButton", 56.0, 37.0, 60.0, 76.0),
    ("viewButton", 44.0, 37.0, 38.0, 92.0),
    ("xboxButton", 50.0, 25.0, 48.0, 10.0),
];

pub fn default_labels() -> BTreeMap<String, String> {
    DEFAULT_LABELS
        .iter()
        .map(|(id, text)| (id.to_string(), text.to_string()))
        .collect()
}

fn builtin_default(id: &str) -> Option<&'static str> {
    DEFAULT_LABELS
        .iter()
        .find(|(key, _)| *key == id)
        .map(|(_, text)| *text)
}

impl Overlay {
    /// The built-in controller description.
    pub fn controller() -> Self {
        let labels = CONTROLLER_POINTS
            .iter()
            .map(|(id, tx, ty, lx, ly)| {
                LabelSpec::new(id, Point::new(*tx, *ty), Point::new(*lx, *ly))
            })
            .collect();
        Self {
            image: None,
            labels,
        }
    }

    pub fn from_json5(input: &str) -> Result<Self, OverlayError> {
        let overlay: Overlay = json5::from_str(input)?;
        overlay.validate()?;
        Ok(overlay)
    }

    pub fn validate(&self) -> Result<(), OverlayError> {
        if self.labels.is_empty() {
            return Err(OverlayError::Empty);
        }
        let mut seen = BTreeSet::new();
        for spec in &self.labels {
            if !seen.insert(spec.id.as_str()) {
                return Err(OverlayError::DuplicateId(spec.id.clone()));
            }
            if !spec.target.is_finite() || !spec.label.is_finite() {
                return Err(OverlayError::NonFinite(spec.id.clone()));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&LabelSpec> {
        self.labels.iter().find(|spec| spec.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Moves a label's text box. The target point is left untouched.
    pub fn set_label_point(&mut self, id: &str, point: Point) -> Result<(), OverlayError> {
        if !point.is_finite() {
            return Err(OverlayError::NonFinite(id.to_string()));
        }
        let spec = self
            .labels
            .iter_mut()
            .find(|spec| spec.id == id)
            .ok_or_else(|| OverlayError::UnknownLabel(id.to_string()))?;
        spec.label = point;
        Ok(())
    }

    /// Default text per label: the description's own text, else the built-in
    /// controller text. Labels with neither are omitted.
    pub fn default_texts(&self) -> BTreeMap<String, String> {
        self.labels
            .iter()
            .filter_map(|spec| {
                let text = spec
                    .text
                    .clone()
                    .or_else(|| builtin_default(&spec.id).map(str::to_string))?;
                Some((spec.id.clone(), text))
            })
            .collect()
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self::controller()
    }
}

pub fn load_overlay(path: Option<&Path>) -> Result<Overlay, OverlayError> {
    let Some(path) = path else {
        return Ok(Overlay::controller());
    };
    let contents = std::fs::read_to_string(path)?;
    let mut overlay = Overlay::from_json5(&contents)?;
    // Relative image paths are resolved against the description's directory.
    if let Some(image) = overlay.image.as_ref()
        && image.is_relative()
        && let Some(parent) = path.parent()
    {
        overlay.image = Some(parent.join(image));
    }
    Ok(overlay)
}
