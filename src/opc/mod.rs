/// Open Packaging Conventions (OPC) support for extracted packages.
///
/// This module covers the package-level parts of an OOXML document that has
/// already been unzipped to a directory tree:
///
/// - Package URIs and relationship target resolution
/// - `.rels` relationship parts
/// - `[Content_Types].xml`
pub mod constants;
pub mod content_types;
pub mod packuri;
pub mod rel;

pub use content_types::{
    ContentTypeDefault, ContentTypeOverride, ContentTypes, ContentTypesValidator,
};
pub use packuri::{
    PackURI, find_package_root, infer_package_root, resolve_part_name, resolve_target,
};
pub use rel::{Relationship, RelationshipValidator, Relationships};

use crate::diagnostic::{Category, Diagnostic};
use std::io;
use std::path::Path;

/// Check that a resolved reference exists on disk.
///
/// Returns `None` when it does. A missing file is an `UnresolvedReference` error
/// naming the resolved path; any other I/O failure is reported as `Io` so that
/// environment problems are not mistaken for package corruption.
pub(crate) fn check_exists(resolved: &Path) -> Option<Diagnostic> {
    existence_diagnostic(resolved, resolved.try_exists())
}

fn existence_diagnostic(resolved: &Path, exists: io::Result<bool>) -> Option<Diagnostic> {
    match exists {
        Ok(true) => {
            tracing::debug!(path = %resolved.display(), "referenced file exists");
            None
        },
        Ok(false) => missing(resolved),
        // a path through a regular file is just as missing
        Err(err) if err.kind() == io::ErrorKind::NotADirectory => missing(resolved),
        Err(err) => Some(Diagnostic::error(
            Category::Io,
            format!("cannot check {}: {}", resolved.display(), err),
        )),
    }
}

fn missing(resolved: &Path) -> Option<Diagnostic> {
    Some(Diagnostic::error(
        Category::UnresolvedReference,
        format!("referenced file does not exist: {}", resolved.display()),
    ))
}

/// Treat an empty attribute the same as an absent one.
#[inline]
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
