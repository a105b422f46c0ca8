// Metadata module
// Tag reading and tag value parsing

pub mod extractor;
pub mod parser;

pub use extractor::{TagExtractor, TrackTags};
