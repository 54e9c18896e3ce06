/// Relationship parts (`.rels`) and their validation.
///
/// A `.rels` part lists the typed references from one source part to its
/// targets. Validation checks each `<Relationship>` for the required attributes,
/// unique ids, and a target that resolves to an existing file.
use crate::diagnostic::{self, Category, Diagnostic};
use crate::error::Result;
use crate::opc::constants::{element, namespace, target_mode};
use crate::opc::packuri::resolve_target;
use crate::opc::{check_exists, non_empty};
use crate::xml::{Document, Element};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A single relationship as declared in a `.rels` part.
///
/// Attributes are kept exactly as written; an empty attribute counts as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    id: Option<String>,
    reltype: Option<String>,
    target: Option<String>,
    target_mode: Option<String>,
}

impl Relationship {
    pub fn from_element(el: &Element) -> Self {
        let get = |name: &str| non_empty(el.attr(name)).map(str::to_string);
        Self {
            id: get("Id"),
            reltype: get("Type"),
            target: get("Target"),
            target_mode: get("TargetMode"),
        }
    }

    /// Relationship ID (e.g., "rId1")
    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Relationship type URI
    #[inline]
    pub fn reltype(&self) -> Option<&str> {
        self.reltype.as_deref()
    }

    /// Raw, unresolved target reference
    #[inline]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Whether the target is an external resource such as a URL.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode.as_deref() == Some(target_mode::EXTERNAL)
    }
}

/// The relationships declared by one `.rels` part, in document order.
#[derive(Debug, Clone)]
pub struct Relationships {
    source: PathBuf,
    rels: SmallVec<[Relationship; 8]>,
}

impl Relationships {
    /// Parse the `.rels` part at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = Document::parse(path)?;
        Ok(Self::from_document(&doc))
    }

    pub fn from_document(doc: &Document) -> Self {
        if doc.root().name().namespace() != Some(namespace::OPC_RELATIONSHIPS) {
            debug!(
                part = %doc.path().display(),
                "unexpected root namespace for a relationships part"
            );
        }
        let rels = doc
            .find_all(element::RELATIONSHIP)
            .into_iter()
            .map(Relationship::from_element)
            .collect();
        Self {
            source: doc.path().to_path_buf(),
            rels,
        }
    }

    /// Path of the `.rels` part these relationships were read from.
    #[inline]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// First relationship with the given id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.id() == Some(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }
}

/// Validates `.rels` parts of one package.
#[derive(Debug, Clone)]
pub struct RelationshipValidator<'a> {
    package_root: &'a Path,
    check_external_targets: bool,
}

impl<'a> RelationshipValidator<'a> {
    pub fn new(package_root: &'a Path) -> Self {
        Self {
            package_root,
            check_external_targets: false,
        }
    }

    /// Also resolve `TargetMode="External"` targets against the filesystem.
    pub fn check_external_targets(mut self, enabled: bool) -> Self {
        self.check_external_targets = enabled;
        self
    }

    /// Validate the `.rels` part at `rels_path`.
    ///
    /// A part that fails to parse yields a single `Parse` error. A clean part
    /// yields a single OK diagnostic.
    pub fn validate(&self, rels_path: &Path) -> Vec<Diagnostic> {
        info!(part = %rels_path.display(), "validating relationships");
        match Relationships::load(rels_path) {
            Ok(rels) => self.validate_relationships(&rels),
            Err(err) => vec![Diagnostic::from(&err)],
        }
    }

    pub fn validate_relationships(&self, rels: &Relationships) -> Vec<Diagnostic> {
        debug!(count = rels.len(), "relationships found");
        if rels.is_empty() {
            return vec![Diagnostic::ok("no <Relationship> elements declared")];
        }

        let mut diagnostics = Vec::new();
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();

        for (idx, rel) in rels.iter().enumerate() {
            let label = match rel.id() {
                Some(id) => id.to_string(),
                None => format!("#{}", idx + 1),
            };

            match rel.id() {
                None => diagnostics.push(Diagnostic::error(
                    Category::MissingAttribute,
                    format!("relationship {} has no Id", label),
                )),
                Some(id) => {
                    if !seen.insert(id) && reported.insert(id) {
                        diagnostics.push(Diagnostic::error(
                            Category::DuplicateKey,
                            format!("duplicate relationship Id: {}", id),
                        ));
                    }
                },
            }

            if rel.reltype().is_none() {
                diagnostics.push(Diagnostic::error(
                    Category::MissingAttribute,
                    format!("relationship {} has no Type", label),
                ));
            }

            match rel.target() {
                None => diagnostics.push(Diagnostic::error(
                    Category::MissingAttribute,
                    format!("relationship {} has no Target", label),
                )),
                Some(target) if rel.is_external() && !self.check_external_targets => {
                    debug!(id = %label, raw_target = target, "skipping external target");
                },
                Some(target) => {
                    let resolved = resolve_target(rels.source(), target, self.package_root);
                    debug!(
                        id = %label,
                        raw_target = target,
                        resolved = %resolved.display(),
                        "checking target"
                    );
                    diagnostics.extend(check_exists(&resolved));
                },
            }
        }

        diagnostic::finish(diagnostics, "no problems found")
    }
}
