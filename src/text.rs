//! Text manipulation utilities.
//!
//! - Byte range helpers shared by host and injected coordinate spaces
//! - Edit descriptions, edit reconstruction and minimal replacements

pub mod edits;
pub mod range;

pub use edits::{TextChange, TextEdit, minimal_change, reconstruct_merged_edit};
pub use range::{intersection, intersects, is_proper};
