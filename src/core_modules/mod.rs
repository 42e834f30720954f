pub mod form_layout;
pub mod ink_blob;
pub mod mark_classifier;
pub mod pixel;
pub mod preprocess;
pub mod region;
pub mod report;
pub mod threshold;
pub mod utils;
