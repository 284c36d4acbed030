/// Folder scanning module
///
/// This module handles:
/// - Walking a folder tree (or just its top level) for candidate files
/// - Classifying files by extension into media kinds and filter groups

pub mod classify;
pub mod scanner;

pub use classify::{classify, FileExtensionGroup, MediaKind};
pub use scanner::{PathScanner, ScanIter};
