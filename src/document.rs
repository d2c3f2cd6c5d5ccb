pub mod marker;
pub(crate) mod model;

// Re-export main types
pub use marker::RangeMarker;
pub use model::TextDocument;
