mod common;

use common::{INK, blank_page, fill_bubble, save_page};
use image::{DynamicImage, RgbImage};
use mark_sense::core_modules::form_layout::{MarkKind, MarkSpec};
use mark_sense::core_modules::region::resolve;
use mark_sense::{FormPipeline, FormReport, FormTemplate};
use std::path::Path;

fn paired_template() -> FormTemplate {
    FormTemplate::new(
        "one_item",
        vec![
            MarkSpec::relative(MarkKind::Quantity, "egg", 0.1, 0.1, 0.1, 0.1),
            MarkSpec::relative(MarkKind::Selection, "egg", 0.5, 0.1, 0.1, 0.1),
        ],
    )
}

#[test]
fn selected_item_is_reported_and_quantity_is_not() {
    let template = paired_template();
    let mut page = blank_page(200, 200);
    fill_bubble(&mut page, &template, "egg", MarkKind::Selection, 2);

    let pipeline = FormPipeline::new(template).unwrap();
    let summary = pipeline.process_image(&DynamicImage::ImageRgb8(page));

    assert_eq!(summary.marked_items, vec!["egg".to_string()]);
    let quantity = summary.marks.iter().find(|m| m.kind == MarkKind::Quantity).unwrap();
    let selection = summary.marks.iter().find(|m| m.kind == MarkKind::Selection).unwrap();
    assert!(selection.is_marked);
    assert_eq!(selection.confidence, 1.0);
    assert!(!quantity.is_marked);
    assert_eq!(quantity.confidence, 0.0);
    assert_eq!(summary.order_lines.len(), 1);
    assert!(!summary.order_lines[0].quantity_marked);
}

#[test]
fn builtin_menu_reads_several_orders() {
    let template = FormTemplate::default();
    let mut page = blank_page(400, 400);
    fill_bubble(&mut page, &template, "beef", MarkKind::Selection, 2);
    fill_bubble(&mut page, &template, "egg", MarkKind::Selection, 2);
    fill_bubble(&mut page, &template, "egg", MarkKind::Quantity, 2);

    let pipeline = FormPipeline::new(template).unwrap();
    let summary = pipeline.process_image(&DynamicImage::ImageRgb8(page));

    assert_eq!(summary.total_marks_detected, 16);
    // Declaration order, not fill order.
    assert_eq!(summary.marked_items, vec!["egg".to_string(), "beef".to_string()]);
    let egg = &summary.order_lines[0];
    assert_eq!((egg.item.as_str(), egg.quantity, egg.quantity_marked), ("egg", 1, true));
    let beef = &summary.order_lines[1];
    assert_eq!((beef.item.as_str(), beef.quantity_marked), ("beef", false));

    for mark in &summary.marks {
        let expected = matches!(
            (mark.item.as_str(), mark.kind),
            ("egg", _) | ("beef", MarkKind::Selection)
        );
        assert_eq!(mark.is_marked, expected, "{} {}", mark.item, mark.kind);
    }
}

#[test]
fn marked_items_match_marked_selections() {
    let template = FormTemplate::default();
    let mut page = blank_page(500, 500);
    for item in ["isda", "pusit", "gatas"] {
        fill_bubble(&mut page, &template, item, MarkKind::Selection, 2);
    }
    fill_bubble(&mut page, &template, "water", MarkKind::Quantity, 2);

    let summary = FormPipeline::new(template)
        .unwrap()
        .process_image(&DynamicImage::ImageRgb8(page));

    let mut expected: Vec<String> = summary
        .marks
        .iter()
        .filter(|m| m.kind == MarkKind::Selection && m.is_marked)
        .map(|m| m.item.clone())
        .collect();
    expected.dedup();
    assert_eq!(summary.marked_items, expected);
    assert_eq!(summary.marked_items, vec!["isda", "pusit", "gatas"]);
    assert!(!summary.marked_items.contains(&"water".to_string()));
}

#[test]
fn overall_confidence_is_the_mean() {
    let template = FormTemplate::default();
    let mut page = blank_page(400, 400);
    fill_bubble(&mut page, &template, "sinigang", MarkKind::Selection, 2);
    fill_bubble(&mut page, &template, "Chicken", MarkKind::Quantity, 0);

    let summary = FormPipeline::new(template)
        .unwrap()
        .process_image(&DynamicImage::ImageRgb8(page));

    let mean = summary.marks.iter().map(|m| m.confidence).sum::<f64>() / summary.marks.len() as f64;
    assert!((summary.overall_confidence - mean).abs() < 1e-12);
    assert!(summary.overall_confidence > 0.0);
}

#[test]
fn tiny_scan_drops_every_region() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_page(dir.path(), "tiny.png", &blank_page(10, 10));

    let report = FormPipeline::new(FormTemplate::default()).unwrap().generate_report(&path);
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["marks"].as_array().unwrap().len(), 0);
    assert_eq!(json["confidence"], 0.0);
    assert_eq!(json["marked_items"].as_array().unwrap().len(), 0);
    assert_eq!(json["total_marks_detected"], 0);
}

#[test]
fn missing_image_yields_failure_shape() {
    let report = FormPipeline::new(FormTemplate::default())
        .unwrap()
        .generate_report(Path::new("/nowhere/order.png"));
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["success"], false);
    assert!(!json["error"].as_str().unwrap().is_empty());
    assert!(json.get("marks").is_none());
}

#[test]
fn corrupt_image_yields_failure_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.png");
    std::fs::write(&path, b"this is not a png").unwrap();

    let report = FormPipeline::new(FormTemplate::default()).unwrap().generate_report(&path);
    assert!(matches!(report, FormReport::Failed(_)));
}

#[test]
fn same_scan_same_bytes() {
    let template = FormTemplate::default();
    let mut page = blank_page(420, 380);
    fill_bubble(&mut page, &template, "gatas", MarkKind::Selection, 1);
    // Some stray specks for the classifier to chew on.
    for i in 0..40u32 {
        page.put_pixel((i * 37) % 420, (i * 53) % 380, INK);
    }
    let dir = tempfile::tempdir().unwrap();
    let path = save_page(dir.path(), "form.png", &page);

    let pipeline = FormPipeline::new(template).unwrap();
    let first = pipeline.generate_report(&path).to_json_pretty().unwrap();
    let second = pipeline.generate_report(&path).to_json_pretty().unwrap();
    assert_eq!(first, second);
}

#[test]
fn relative_regions_stay_inside_the_image() {
    let template = FormTemplate::default();
    for width in (34..1200).step_by(97) {
        for height in (34..1600).step_by(131) {
            for spec in &template.marks {
                let region = resolve(spec, width, height).unwrap();
                assert!(region.x + region.width <= width);
                assert!(region.y + region.height <= height);
                assert!(region.width > 0 && region.height > 0);
            }
        }
    }
}

#[test]
fn absolute_template_reads_a_fixed_size_scan() {
    let template = FormTemplate::new(
        "fixed",
        vec![
            MarkSpec::absolute(MarkKind::Quantity, "tea", 20, 20, 16, 16),
            MarkSpec::absolute(MarkKind::Selection, "tea", 60, 20, 16, 16),
            MarkSpec::absolute(MarkKind::Quantity, "rice", 20, 60, 16, 16),
            MarkSpec::absolute(MarkKind::Selection, "rice", 60, 60, 16, 16),
        ],
    );
    let mut page: RgbImage = blank_page(120, 100);
    fill_bubble(&mut page, &template, "rice", MarkKind::Selection, 2);

    let summary = FormPipeline::new(template)
        .unwrap()
        .process_image(&DynamicImage::ImageRgb8(page));
    assert_eq!(summary.marked_items, vec!["rice".to_string()]);
}

#[test]
fn low_resolution_scan_still_reads_filled_bubbles() {
    // 6x6 bubbles: far fewer ink pixels than a full-resolution bubble holds.
    let template = FormTemplate::default();
    let mut page = blank_page(200, 200);
    fill_bubble(&mut page, &template, "isda", MarkKind::Selection, 0);

    let summary = FormPipeline::new(template)
        .unwrap()
        .process_image(&DynamicImage::ImageRgb8(page));

    let isda = summary
        .marks
        .iter()
        .find(|m| m.item == "isda" && m.kind == MarkKind::Selection)
        .unwrap();
    assert_eq!(isda.total_pixels, 36);
    assert_eq!(isda.confidence, 1.0);
    assert!(isda.is_marked);
    assert_eq!(summary.marked_items, vec!["isda".to_string()]);
}
