//! Longan - consistency checks for extracted Office Open XML packages
//!
//! An OOXML document is a ZIP container of XML parts tied together by
//! relationship parts (`.rels`) and a content type stream
//! (`[Content_Types].xml`). This crate checks those references on a package
//! that has already been extracted to a directory tree.
//!
//! # Features
//!
//! - **Relationships**: required attributes, unique ids, and targets resolved
//!   with OPC addressing rules and checked on disk
//! - **Content types**: `Default`/`Override` completeness, uniqueness and part existence
//! - **Themes**: discovery of `theme/theme/theme1.xml` parts and their variant
//!   manager, with `themeFamily` id and `vid` cross-checks
//! - **Diagnostics, not panics**: every finding is a [`Diagnostic`]; one broken
//!   part never stops the others from being checked
//!
//! # Example
//!
//! ```no_run
//! use longan::{AuditOptions, PackageAudit};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = AuditOptions {
//!     rels_parts: vec!["pkg/_rels/.rels".into()],
//!     content_types_part: Some("pkg/[Content_Types].xml".into()),
//!     ..AuditOptions::default()
//! };
//! let report = PackageAudit::new("pkg", options)?.run();
//! for part in &report.parts {
//!     println!("== {}", part.subject);
//!     for diagnostic in &part.diagnostics {
//!         println!("{}", diagnostic);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Resolving a relationship target
//!
//! ```
//! use longan::opc::resolve_target;
//! use std::path::Path;
//!
//! let resolved = resolve_target(
//!     Path::new("/pkg/theme/theme/_rels/theme1.xml.rels"),
//!     "../media/image1.png",
//!     Path::new("/pkg"),
//! );
//! assert_eq!(resolved, Path::new("/pkg/theme/media/image1.png"));
//! ```

pub mod audit;
pub mod diagnostic;
pub mod error;
pub mod opc;
pub mod report;
pub mod theme;
pub mod xml;

pub use audit::{AuditOptions, AuditReport, PackageAudit};
pub use diagnostic::{Category, Diagnostic, PartReport, Severity};
pub use error::{Error, Result};
