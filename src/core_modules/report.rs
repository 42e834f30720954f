// THEORY:
// The `report` module is the final layer of the engine. It turns the list of
// per-bubble verdicts into the one document a caller receives for a form: every
// mark with its statistics, the items the customer selected, and a single
// overall confidence.
//
// Reports are plain values: built once, serialized once, never mutated. A form
// that could not be read still yields a report, in its failure shape, so a
// caller always gets exactly one machine-readable answer per image.

use crate::core_modules::form_layout::{MarkKind, MarkSpec};
use crate::core_modules::mark_classifier::{ClassifierConfig, MarkDecision, ValidationChecks};
use crate::core_modules::region::ResolvedRegion;
use crate::error::{ErrorKind, OmrError};
use serde::Serialize;
use std::collections::HashMap;

const DETECTION_METHOD: &str = "filled_area_analysis";

/// The verdict and statistics for one bubble.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkResult {
    #[serde(rename = "type")]
    pub kind: MarkKind,
    pub item: String,
    #[serde(rename = "position")]
    pub region: ResolvedRegion,
    pub is_marked: bool,
    pub confidence: f64,
    pub white_pixels: u64,
    pub total_pixels: u64,
    pub dark_pixels: u64,
    #[serde(rename = "contourCoverage")]
    pub shape_coverage: f64,
    pub min_dark_ratio: f64,
    pub min_dark_pixels: u64,
    pub detection_method: &'static str,
    #[serde(rename = "validationPassed")]
    pub checks: ValidationChecks,
}

impl MarkResult {
    pub fn new(spec: &MarkSpec, region: ResolvedRegion, decision: MarkDecision, config: &ClassifierConfig) -> Self {
        Self {
            kind: spec.kind,
            item: spec.item.clone(),
            region,
            is_marked: decision.is_marked,
            confidence: decision.confidence,
            white_pixels: decision.white_pixels,
            total_pixels: decision.total_pixels,
            dark_pixels: decision.dark_pixels,
            shape_coverage: decision.shape_coverage,
            min_dark_ratio: config.min_dark_ratio,
            min_dark_pixels: decision.required_dark_pixels,
            detection_method: DETECTION_METHOD,
            checks: decision.checks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// One ordered item. Quantities are not counted; every ordered item is one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub item: String,
    pub quantity: u32,
    /// Whether the item's quantity bubble was also filled.
    pub quantity_marked: bool,
}

/// A successfully read form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSummary {
    success: bool,
    pub marks: Vec<MarkResult>,
    #[serde(rename = "confidence")]
    pub overall_confidence: f64,
    pub image_dimensions: ImageDimensions,
    pub total_marks_detected: usize,
    pub marked_items: Vec<String>,
    pub order_lines: Vec<OrderLine>,
}

/// A form that could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormFailure {
    success: bool,
    #[serde(rename = "error")]
    pub message: String,
    #[serde(rename = "error_kind")]
    pub kind: ErrorKind,
}

/// The single answer produced for each form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormReport {
    Processed(FormSummary),
    Failed(FormFailure),
}

impl FormReport {
    pub fn from_error(error: &OmrError) -> Self {
        FormReport::Failed(FormFailure {
            success: false,
            message: error.to_string(),
            kind: error.kind(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FormReport::Processed(_))
    }

    pub fn summary(&self) -> Option<&FormSummary> {
        match self {
            FormReport::Processed(summary) => Some(summary),
            FormReport::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FormFailure> {
        match self {
            FormReport::Processed(_) => None,
            FormReport::Failed(failure) => Some(failure),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<FormSummary> for FormReport {
    fn from(summary: FormSummary) -> Self {
        FormReport::Processed(summary)
    }
}

/// Collects per-bubble results into the form summary.
pub fn aggregate(marks: Vec<MarkResult>, image_width: u32, image_height: u32) -> FormSummary {
    let overall_confidence = if marks.is_empty() {
        0.0
    } else {
        marks.iter().map(|m| m.confidence).sum::<f64>() / marks.len() as f64
    };

    let mut marked_items: Vec<String> = Vec::new();
    for mark in &marks {
        if mark.kind == MarkKind::Selection && mark.is_marked && !marked_items.contains(&mark.item) {
            marked_items.push(mark.item.clone());
        }
    }

    let order_lines = resolve_order_lines(&marks, &marked_items);

    FormSummary {
        success: true,
        total_marks_detected: marks.len(),
        marks,
        overall_confidence,
        image_dimensions: ImageDimensions {
            width: image_width,
            height: image_height,
        },
        marked_items,
        order_lines,
    }
}

fn resolve_order_lines(marks: &[MarkResult], marked_items: &[String]) -> Vec<OrderLine> {
    let mut quantity_marked: HashMap<&str, bool> = HashMap::new();
    for mark in marks.iter().filter(|m| m.kind == MarkKind::Quantity) {
        *quantity_marked.entry(mark.item.as_str()).or_insert(false) |= mark.is_marked;
    }

    marked_items
        .iter()
        .map(|item| OrderLine {
            item: item.clone(),
            quantity: 1,
            quantity_marked: quantity_marked.get(item.as_str()).copied().unwrap_or(false),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(kind: MarkKind, item: &str, is_marked: bool, confidence: f64) -> MarkResult {
        MarkResult {
            kind,
            item: item.to_string(),
            region: ResolvedRegion { x: 1, y: 2, width: 10, height: 10 },
            is_marked,
            confidence,
            white_pixels: 100 - (confidence * 100.0) as u64,
            total_pixels: 100,
            dark_pixels: (confidence * 100.0) as u64,
            shape_coverage: 1.0,
            min_dark_ratio: 0.35,
            min_dark_pixels: 80,
            detection_method: DETECTION_METHOD,
            checks: ValidationChecks {
                dark_ratio: is_marked,
                dark_pixels: is_marked,
                shape_coverage: is_marked,
            },
        }
    }

    #[test]
    fn empty_form_has_zero_confidence() {
        let summary = aggregate(Vec::new(), 10, 10);
        assert_eq!(summary.overall_confidence, 0.0);
        assert!(summary.marked_items.is_empty());
        assert_eq!(summary.total_marks_detected, 0);
    }

    #[test]
    fn confidence_is_the_mean_of_marks() {
        let summary = aggregate(
            vec![
                result(MarkKind::Quantity, "egg", false, 0.1),
                result(MarkKind::Selection, "egg", true, 0.9),
                result(MarkKind::Selection, "beef", false, 0.2),
            ],
            100,
            100,
        );
        assert!((summary.overall_confidence - 0.4).abs() < 1e-12);
        assert_eq!(summary.total_marks_detected, 3);
    }

    #[test]
    fn only_marked_selections_are_ordered() {
        let summary = aggregate(
            vec![
                result(MarkKind::Quantity, "isda", true, 0.8),
                result(MarkKind::Selection, "isda", false, 0.0),
                result(MarkKind::Quantity, "egg", true, 0.7),
                result(MarkKind::Selection, "egg", true, 0.9),
                result(MarkKind::Selection, "beef", true, 0.6),
                result(MarkKind::Selection, "egg", true, 0.9),
            ],
            100,
            100,
        );
        assert_eq!(summary.marked_items, vec!["egg".to_string(), "beef".to_string()]);
        assert_eq!(
            summary.order_lines,
            vec![
                OrderLine { item: "egg".into(), quantity: 1, quantity_marked: true },
                OrderLine { item: "beef".into(), quantity: 1, quantity_marked: false },
            ]
        );
    }

    #[test]
    fn success_json_uses_fixed_field_names() {
        let summary = aggregate(vec![result(MarkKind::Selection, "egg", true, 0.9)], 640, 480);
        let json: serde_json::Value = serde_json::from_str(&FormReport::from(summary).to_json().unwrap()).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["confidence"], 0.9);
        assert_eq!(json["image_dimensions"]["width"], 640);
        assert_eq!(json["total_marks_detected"], 1);
        assert_eq!(json["marked_items"][0], "egg");

        let mark = &json["marks"][0];
        assert_eq!(mark["type"], "selection");
        assert_eq!(mark["position"]["x"], 1);
        assert_eq!(mark["isMarked"], true);
        assert_eq!(mark["whitePixels"], 10);
        assert_eq!(mark["totalPixels"], 100);
        assert_eq!(mark["darkPixels"], 90);
        assert_eq!(mark["contourCoverage"], 1.0);
        assert_eq!(mark["detectionMethod"], "filled_area_analysis");
        assert_eq!(mark["validationPassed"]["darkRatioCheck"], true);
    }

    #[test]
    fn failure_json_carries_the_error() {
        let report = FormReport::from_error(&OmrError::ImageLoad {
            path: "missing.png".into(),
            reason: "No such file or directory".into(),
        });
        assert!(!report.is_success());
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "image_load");
        assert!(json["error"].as_str().unwrap().contains("missing.png"));
        assert!(json.get("marks").is_none());
    }
}
