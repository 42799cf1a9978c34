//! Turning free-form assistant text into structured file actions.

pub mod extractor;

pub use extractor::{ActionExtractor, SUGGESTION_KEYWORDS};
