//! `[Content_Types].xml` parsing and validation.
//!
//! The content type stream declares the type of every part, either by file
//! extension (`<Default>`) or per part name (`<Override>`).
use crate::diagnostic::{self, Category, Diagnostic};
use crate::error::Result;
use crate::opc::constants::{element, file_name, namespace};
use crate::opc::packuri::{PackURI, resolve_part_name};
use crate::opc::{check_exists, non_empty};
use crate::xml::{Document, Element};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// `<Default Extension="xml" ContentType="application/xml"/>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeDefault {
    pub extension: Option<String>,
    pub content_type: Option<String>,
}

/// `<Override PartName="/ppt/presentation.xml" ContentType="..."/>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeOverride {
    pub part_name: Option<String>,
    pub content_type: Option<String>,
}

/// Declarations of one `[Content_Types].xml` part, in document order.
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    defaults: Vec<ContentTypeDefault>,
    overrides: Vec<ContentTypeOverride>,
}

impl ContentTypes {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = Document::parse(path)?;
        Ok(Self::from_document(&doc))
    }

    pub fn from_document(doc: &Document) -> Self {
        if doc.root().name().namespace() != Some(namespace::OPC_CONTENT_TYPES) {
            debug!(
                part = %doc.path().display(),
                "unexpected root namespace for a content types part"
            );
        }
        let attr = |el: &Element, name: &str| non_empty(el.attr(name)).map(str::to_string);

        let defaults = doc
            .find_all(element::DEFAULT)
            .into_iter()
            .map(|el| ContentTypeDefault {
                extension: attr(el, "Extension"),
                content_type: attr(el, "ContentType"),
            })
            .collect();
        let overrides = doc
            .find_all(element::OVERRIDE)
            .into_iter()
            .map(|el| ContentTypeOverride {
                part_name: attr(el, "PartName"),
                content_type: attr(el, "ContentType"),
            })
            .collect();

        Self {
            defaults,
            overrides,
        }
    }

    #[inline]
    pub fn defaults(&self) -> &[ContentTypeDefault] {
        &self.defaults
    }

    #[inline]
    pub fn overrides(&self) -> &[ContentTypeOverride] {
        &self.overrides
    }

    /// Part name of the theme variant manager override, if one is declared.
    pub fn variant_manager_override(&self) -> Option<&str> {
        self.overrides
            .iter()
            .filter_map(|o| o.part_name.as_deref())
            .find(|name| {
                file_name::VARIANT_MANAGER.iter().any(|manager| {
                    name.to_ascii_lowercase()
                        .ends_with(&manager.to_ascii_lowercase())
                })
            })
    }
}

/// Validates the `[Content_Types].xml` part of one package.
#[derive(Debug, Clone)]
pub struct ContentTypesValidator<'a> {
    package_root: &'a Path,
    case_insensitive_extensions: bool,
}

impl<'a> ContentTypesValidator<'a> {
    pub fn new(package_root: &'a Path) -> Self {
        Self {
            package_root,
            case_insensitive_extensions: false,
        }
    }

    /// Treat `Default` extensions differing only in ASCII case as duplicates.
    ///
    /// Off by default: extensions are compared exactly as written.
    pub fn case_insensitive_extensions(mut self, enabled: bool) -> Self {
        self.case_insensitive_extensions = enabled;
        self
    }

    pub fn validate(&self, content_types_path: &Path) -> Vec<Diagnostic> {
        info!(part = %content_types_path.display(), "validating content types");
        match ContentTypes::load(content_types_path) {
            Ok(types) => self.validate_content_types(&types),
            Err(err) => vec![Diagnostic::from(&err)],
        }
    }

    /// Run every check over the parsed declarations; nothing short-circuits.
    pub fn validate_content_types(&self, types: &ContentTypes) -> Vec<Diagnostic> {
        debug!(
            defaults = types.defaults().len(),
            overrides = types.overrides().len(),
            "content type declarations found"
        );
        let mut diagnostics = Vec::new();
        self.check_defaults(types.defaults(), &mut diagnostics);
        self.check_overrides(types.overrides(), &mut diagnostics);

        if let Some(manager) = types.variant_manager_override() {
            info!(
                part_name = manager,
                resolved = %resolve_part_name(self.package_root, manager).display(),
                "theme variant manager declared"
            );
        }

        diagnostic::finish(diagnostics, "no problems found")
    }

    fn check_defaults(&self, defaults: &[ContentTypeDefault], diagnostics: &mut Vec<Diagnostic>) {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();

        for (idx, default) in defaults.iter().enumerate() {
            match &default.extension {
                None => diagnostics.push(Diagnostic::error(
                    Category::MissingAttribute,
                    format!("<Default> #{} has no Extension attribute", idx + 1),
                )),
                Some(extension) => {
                    let key = if self.case_insensitive_extensions {
                        extension.to_ascii_lowercase()
                    } else {
                        extension.clone()
                    };
                    if !seen.insert(key.clone()) && reported.insert(key) {
                        diagnostics.push(Diagnostic::error(
                            Category::DuplicateKey,
                            format!("duplicate Extension: {}", extension),
                        ));
                    }
                },
            }

            if default.content_type.is_none() {
                diagnostics.push(Diagnostic::error(
                    Category::MissingAttribute,
                    format!("<Default> #{} has no ContentType attribute", idx + 1),
                ));
            }
        }
    }

    fn check_overrides(
        &self,
        overrides: &[ContentTypeOverride],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();

        for (idx, item) in overrides.iter().enumerate() {
            match item.part_name.as_deref() {
                None => diagnostics.push(Diagnostic::error(
                    Category::MissingAttribute,
                    format!("<Override> #{} has no PartName attribute", idx + 1),
                )),
                Some(part_name) if !seen.insert(part_name) => {
                    // existence was already checked for the first occurrence
                    if reported.insert(part_name) {
                        diagnostics.push(Diagnostic::error(
                            Category::DuplicateKey,
                            format!("duplicate PartName: {}", part_name),
                        ));
                    }
                },
                Some(part_name) => {
                    // still resolved below, relative to the package root
                    if let Err(err) = PackURI::new(part_name) {
                        diagnostics.push(Diagnostic::warning(Category::Check, err.to_string()));
                    }
                    let resolved = resolve_part_name(self.package_root, part_name);
                    debug!(part_name, resolved = %resolved.display(), "checking override");
                    diagnostics.extend(check_exists(&resolved));
                },
            }

            if item.content_type.is_none() {
                diagnostics.push(Diagnostic::error(
                    Category::MissingAttribute,
                    format!("<Override> #{} has no ContentType attribute", idx + 1),
                ));
            }
        }
    }
}
