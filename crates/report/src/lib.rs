//! # Pathlab Report
//!
//! Printable patient reports.
//!
//! - [`compose`] turns a [`pathlab_core::ReportData`] into a page-independent [`Document`]
//! - [`layout`] flows the document onto A4 pages
//! - [`pdf`] draws the pages with the builtin Courier fonts
//! - [`artifact`] names, downloads and shares the finished PDF

pub mod artifact;
pub mod compose;
pub mod document;
mod error;
mod image;
pub mod layout;
pub mod pdf;

pub use artifact::{report_filename, ReportArtifacts};
pub use compose::{compose, should_isolate, ReportOptions};
pub use document::{Block, Document};
pub use error::{ReportError, ReportResult};
pub use layout::{paginate, Page};
