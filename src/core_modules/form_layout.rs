// THEORY:
// The `form_layout` module is the static description of a paper form. A
// `FormTemplate` names every printed checkbox on the page, says what kind of
// mark it is, and says where it sits. Nothing in here looks at pixels.
//
// Key architectural principles:
// 1.  **Paired Marks**: Every menu item owns two bubbles, a quantity bubble and
//     a selection bubble. An item may never declare two bubbles of the same kind.
// 2.  **Two Coordinate Schemes**: A bubble is placed either as fractions of the
//     scanned page (resolution independent) or as literal pixels (valid for one
//     assumed scan size). The region extractor turns both into pixel rectangles.
// 3.  **Immutable Configuration**: A template is a plain value handed to each
//     processing call. The preprocessing and classification tunables travel with
//     it, because different printings and scan qualities need different settings.
// 4.  **Declaration Order**: Marks are always visited in the order they were
//     declared, which keeps reports deterministic.

use crate::core_modules::mark_classifier::ClassifierConfig;
use crate::core_modules::preprocess::PreprocessConfig;
use crate::error::{OmrError, OmrResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Identifier of the template used when none is requested.
pub const DEFAULT_TEMPLATE_ID: &str = "restaurant_menu";

const RESTAURANT_MENU_ITEMS: [(&str, f64, f64); 8] = [
    ("isda", 0.07, 0.09),
    ("egg", 0.38, 0.09),
    ("water", 0.07, 0.13),
    ("sinigang", 0.38, 0.13),
    ("Chicken", 0.07, 0.17),
    ("pusit", 0.38, 0.17),
    ("gatas", 0.07, 0.21),
    ("beef", 0.38, 0.21),
];
/// Horizontal distance between an item's quantity bubble and its selection bubble.
const SELECTION_COLUMN_OFFSET: f64 = 0.17;
const RESTAURANT_MENU_BUBBLE: f64 = 0.03;

/// The two bubbles printed next to each menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    /// Secondary count signal. Not resolved into a number.
    Quantity,
    /// "Order this item."
    Selection,
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkKind::Quantity => write!(f, "quantity"),
            MarkKind::Selection => write!(f, "selection"),
        }
    }
}

/// Where a bubble sits on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum BoxPosition {
    /// Fractions in [0, 1] of the scanned image width and height.
    Relative {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// Literal pixel values for a fixed scan resolution.
    Absolute {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
}

/// A single printed bubble on the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSpec {
    #[serde(rename = "type")]
    pub kind: MarkKind,
    pub item: String,
    pub position: BoxPosition,
}

impl MarkSpec {
    pub fn relative(kind: MarkKind, item: &str, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            kind,
            item: item.to_string(),
            position: BoxPosition::Relative { x, y, width, height },
        }
    }

    pub fn absolute(kind: MarkKind, item: &str, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            kind,
            item: item.to_string(),
            position: BoxPosition::Absolute { x, y, width, height },
        }
    }
}

/// The complete description of one printed form plus the settings used to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormTemplate {
    pub name: String,
    pub marks: Vec<MarkSpec>,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl Default for FormTemplate {
    fn default() -> Self {
        Self::restaurant_menu()
    }
}

impl FormTemplate {
    /// Creates a template with default preprocessing and classification settings.
    pub fn new(name: &str, marks: Vec<MarkSpec>) -> Self {
        Self {
            name: name.to_string(),
            marks,
            preprocess: PreprocessConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }

    /// The bubbles of the form, in declaration order.
    pub fn marks(&self) -> &[MarkSpec] {
        &self.marks
    }

    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Looks up one of the templates compiled into the crate.
    pub fn builtin(id: &str) -> OmrResult<Self> {
        match id {
            DEFAULT_TEMPLATE_ID => Ok(Self::restaurant_menu()),
            other => Err(OmrError::config(
                other,
                format!(
                    "unknown built-in template; available: {}",
                    Self::builtin_ids().join(", ")
                ),
            )),
        }
    }

    pub fn builtin_ids() -> &'static [&'static str] {
        &[DEFAULT_TEMPLATE_ID]
    }

    /// Parses and validates a JSON template.
    pub fn from_json_str(json: &str) -> OmrResult<Self> {
        Self::parse_validated(json, "<json>")
    }

    pub fn from_json_file(path: &Path) -> OmrResult<Self> {
        let label = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|e| OmrError::config(&label, e.to_string()))?;
        Self::parse_validated(&json, &label)
    }

    /// `label` names the source in errors until the template's own name is known.
    fn parse_validated(json: &str, label: &str) -> OmrResult<Self> {
        let template: FormTemplate = serde_json::from_str(json).map_err(|e| OmrError::config(label, e.to_string()))?;
        template.validate()?;
        Ok(template)
    }

    /// The restaurant order form: eight items in two columns, four rows.
    fn restaurant_menu() -> Self {
        let mut marks = Vec::with_capacity(RESTAURANT_MENU_ITEMS.len() * 2);
        for (item, x, y) in RESTAURANT_MENU_ITEMS {
            marks.push(MarkSpec::relative(
                MarkKind::Quantity,
                item,
                x,
                y,
                RESTAURANT_MENU_BUBBLE,
                RESTAURANT_MENU_BUBBLE,
            ));
            marks.push(MarkSpec::relative(
                MarkKind::Selection,
                item,
                x + SELECTION_COLUMN_OFFSET,
                y,
                RESTAURANT_MENU_BUBBLE,
                RESTAURANT_MENU_BUBBLE,
            ));
        }
        Self::new(DEFAULT_TEMPLATE_ID, marks)
    }

    /// Checks the structural rules every template must obey.
    pub fn validate(&self) -> OmrResult<()> {
        if self.marks.is_empty() {
            return Err(OmrError::config(&self.name, "template declares no marks"));
        }

        let mut seen: HashSet<(&str, MarkKind)> = HashSet::with_capacity(self.marks.len());
        for spec in &self.marks {
            if spec.item.trim().is_empty() {
                return Err(OmrError::config(&self.name, "mark with an empty item name"));
            }
            if !seen.insert((spec.item.as_str(), spec.kind)) {
                return Err(OmrError::config(
                    &self.name,
                    format!("item '{}' declares more than one {} mark", spec.item, spec.kind),
                ));
            }
            Self::validate_position(spec).map_err(|reason| OmrError::config(&self.name, reason))?;
        }

        for spec in &self.marks {
            let partner = match spec.kind {
                MarkKind::Quantity => MarkKind::Selection,
                MarkKind::Selection => MarkKind::Quantity,
            };
            if !seen.contains(&(spec.item.as_str(), partner)) {
                tracing::warn!(
                    template = %self.name,
                    item = %spec.item,
                    "item has a {} mark but no {} mark",
                    spec.kind,
                    partner
                );
            }
        }

        self.preprocess
            .validate()
            .map_err(|reason| OmrError::config(&self.name, reason))?;
        self.classifier
            .validate()
            .map_err(|reason| OmrError::config(&self.name, reason))?;
        Ok(())
    }

    fn validate_position(spec: &MarkSpec) -> Result<(), String> {
        match spec.position {
            BoxPosition::Relative { x, y, width, height } => {
                let values = [x, y, width, height];
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(format!("{} mark of '{}' has a non-finite coordinate", spec.kind, spec.item));
                }
                if values.iter().any(|v| !(0.0..=1.0).contains(v)) {
                    return Err(format!(
                        "{} mark of '{}' has a relative coordinate outside [0, 1]",
                        spec.kind, spec.item
                    ));
                }
                if width <= 0.0 || height <= 0.0 {
                    return Err(format!("{} mark of '{}' has no area", spec.kind, spec.item));
                }
            }
            BoxPosition::Absolute { width, height, .. } => {
                if width <= 0 || height <= 0 {
                    return Err(format!("{} mark of '{}' has no area", spec.kind, spec.item));
                }
            }
        }
        Ok(())
    }
}
