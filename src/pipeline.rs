// THEORY:
// The `pipeline` module is the top-level API of the mark reader. It encapsulates
// the whole stack behind one call: hand it a scanned form, get back a report.
//
//     image path -> decoded raster -> preprocessed raster -> per-region crop
//                -> ink statistics -> verdict -> aggregated report
//
// Data flows one way with no state kept between forms, so one `FormPipeline`
// can serve any number of threads at once. Failures are isolated per region: a
// region that cannot be analyzed is left out of the report and the remaining
// regions are still read. Only an undecodable image ends the report early.

use crate::core_modules::form_layout::FormTemplate;
use crate::core_modules::mark_classifier::classify;
use crate::core_modules::preprocess::{load_image, preprocess};
use crate::core_modules::region::resolve;
use crate::core_modules::report::{MarkResult, aggregate};
use crate::error::{OmrError, OmrResult};
use image::{DynamicImage, GrayImage};
use std::path::Path;

// Re-export key data structures for the public API.
pub use crate::core_modules::form_layout::{BoxPosition, MarkKind, MarkSpec};
pub use crate::core_modules::mark_classifier::{ClassifierConfig, DarkPixelFloor};
pub use crate::core_modules::preprocess::PreprocessConfig;
pub use crate::core_modules::region::ResolvedRegion;
pub use crate::core_modules::report::{FormFailure, FormReport, FormSummary, OrderLine};

/// The main, top-level struct for reading forms.
#[derive(Debug, Clone)]
pub struct FormPipeline {
    template: FormTemplate,
}

impl FormPipeline {
    /// Validates the template up front; a malformed template never reaches a scan.
    pub fn new(template: FormTemplate) -> OmrResult<Self> {
        template.validate()?;
        Ok(Self { template })
    }

    pub fn template(&self) -> &FormTemplate {
        &self.template
    }

    /// Reads one form from disk. Never fails: errors become a failure report.
    pub fn generate_report(&self, path: &Path) -> FormReport {
        match self.process_path(path) {
            Ok(summary) => FormReport::Processed(summary),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "form could not be read");
                FormReport::from_error(&error)
            }
        }
    }

    pub fn process_path(&self, path: &Path) -> OmrResult<FormSummary> {
        let image = load_image(path)?;
        Ok(self.process_image(&image))
    }

    /// Reads one already-decoded form.
    pub fn process_image(&self, image: &DynamicImage) -> FormSummary {
        let processed = preprocess(image, &self.template.preprocess);
        let (width, height) = processed.dimensions();

        let mut marks = Vec::with_capacity(self.template.marks().len());
        for spec in self.template.marks() {
            match self.read_mark(spec, &processed) {
                Ok(Some(result)) => marks.push(result),
                Ok(None) => tracing::warn!(
                    item = %spec.item,
                    kind = %spec.kind,
                    width,
                    height,
                    "mark region is empty at this image size, dropped"
                ),
                Err(error) => tracing::warn!(%error, "skipping mark region"),
            }
        }

        let summary = aggregate(marks, width, height);
        tracing::info!(
            template = %self.template.name,
            width,
            height,
            marks = summary.total_marks_detected,
            marked = ?summary.marked_items,
            confidence = summary.overall_confidence,
            "form processed"
        );
        summary
    }

    fn read_mark(&self, spec: &MarkSpec, processed: &GrayImage) -> OmrResult<Option<MarkResult>> {
        let Some(region) = resolve(spec, processed.width(), processed.height()) else {
            return Ok(None);
        };
        let crop = region.crop(processed).ok_or_else(|| OmrError::Region {
            item: spec.item.clone(),
            reason: format!(
                "{} region {}x{}+{}+{} lies outside the image",
                spec.kind, region.width, region.height, region.x, region.y
            ),
        })?;

        let config = &self.template.classifier;
        let decision = classify(&crop, config);
        tracing::debug!(
            item = %spec.item,
            kind = %spec.kind,
            confidence = decision.confidence,
            dark = decision.dark_pixels,
            coverage = decision.shape_coverage,
            marked = decision.is_marked,
            "mark classified"
        );
        Ok(Some(MarkResult::new(spec, region, decision, config)))
    }
}
