//! Cross-document checks between theme families and theme variants.
//!
//! A package describes one logical theme, so every `themeFamily/@id` must agree,
//! and every variant listed by the variant manager must correspond to exactly
//! one theme part through its `vid`. Package theme counts are small, so the
//! checks simply group records by key.
use crate::diagnostic::{self, Category, Diagnostic};
use crate::opc::check_exists;
use crate::opc::packuri::{rels_path_for, resolve_target};
use crate::opc::rel::Relationships;
use crate::theme::family::{ThemeFamily, ThemeVariant};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Checks the families of every theme part against each other and against the variants.
#[derive(Debug, Clone, Copy)]
pub struct ThemeCrossReferenceValidator<'a> {
    families: &'a [ThemeFamily],
    variants: &'a [ThemeVariant],
}

impl<'a> ThemeCrossReferenceValidator<'a> {
    pub fn new(families: &'a [ThemeFamily], variants: &'a [ThemeVariant]) -> Self {
        Self { families, variants }
    }

    /// All families must share one `id`.
    ///
    /// When they do not, a single error lists every id value with the parts
    /// declaring it.
    pub fn check_id_agreement(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut groups: BTreeMap<&str, Vec<&ThemeFamily>> = BTreeMap::new();

        for family in self.families {
            match family.id.as_deref() {
                Some(id) => groups.entry(id).or_default().push(family),
                None => diagnostics.push(Diagnostic::warning(
                    Category::MissingAttribute,
                    format!(
                        "themeFamily '{}' in {} has no id",
                        family.display_name(),
                        family.source_part.display()
                    ),
                )),
            }
        }

        match groups.len() {
            0 => {},
            1 => {
                if let Some((id, members)) = groups.iter().next() {
                    diagnostics.push(Diagnostic::ok(format!(
                        "all {} themeFamily ids agree: {}",
                        members.len(),
                        id
                    )));
                }
            },
            _ => {
                let listing = groups
                    .iter()
                    .map(|(id, members)| format!("{} in [{}]", id, part_list(members)))
                    .collect::<Vec<_>>()
                    .join("; ");
                diagnostics.push(Diagnostic::error(
                    Category::CrossDocumentMismatch,
                    format!(
                        "themeFamily ids disagree across the package ({} distinct): {}",
                        groups.len(),
                        listing
                    ),
                ));
            },
        }

        diagnostics
    }

    /// Every variant `vid` must match exactly one family `vid`.
    pub fn check_vid_correspondence(&self) -> Vec<Diagnostic> {
        let mut by_vid: BTreeMap<&str, Vec<&ThemeFamily>> = BTreeMap::new();
        for family in self.families {
            if let Some(vid) = family.vid.as_deref() {
                by_vid.entry(vid).or_default().push(family);
            }
        }

        let mut diagnostics = Vec::new();
        for (idx, variant) in self.variants.iter().enumerate() {
            let Some(vid) = variant.vid.as_deref() else {
                diagnostics.push(Diagnostic::error(
                    Category::MissingAttribute,
                    format!(
                        "themeVariant #{} ({}) has no vid",
                        idx + 1,
                        variant.name.as_deref().unwrap_or("unnamed")
                    ),
                ));
                continue;
            };

            match by_vid.get(vid).map(Vec::as_slice) {
                None | Some([]) => diagnostics.push(Diagnostic::error(
                    Category::CrossDocumentMismatch,
                    format!("vid {} not found in any theme", vid),
                )),
                Some([family]) => diagnostics.push(Diagnostic::ok(format!(
                    "vid {} matches theme '{}' ({})",
                    vid,
                    family.display_name(),
                    family.source_part.display()
                ))),
                Some(many) => diagnostics.push(Diagnostic::error(
                    Category::CrossDocumentMismatch,
                    format!(
                        "vid {} ambiguous across multiple themes: {}",
                        vid,
                        part_list(many)
                    ),
                )),
            }
        }
        diagnostics
    }

    /// Both checks, id agreement first.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.check_id_agreement();
        diagnostics.extend(self.check_vid_correspondence());
        diagnostic::finish(diagnostics, "no theme records to compare")
    }
}

fn part_list(families: &[&ThemeFamily]) -> String {
    families
        .iter()
        .map(|f| f.source_part.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve each variant's `r:id` through the variant manager's own `.rels` part.
///
/// An id the `.rels` part does not declare, or a declared target that does not
/// exist, is an unresolved reference.
pub fn check_variant_relationships(
    manager_part: &Path,
    variants: &[ThemeVariant],
    package_root: &Path,
) -> Vec<Diagnostic> {
    let with_ids: Vec<(&ThemeVariant, &str)> = variants
        .iter()
        .filter_map(|v| v.relationship_id.as_deref().map(|id| (v, id)))
        .collect();
    if with_ids.is_empty() {
        return Vec::new();
    }

    let Some(rels_path) = rels_path_for(manager_part) else {
        return Vec::new();
    };
    if !rels_path.is_file() {
        return vec![Diagnostic::warning(
            Category::UnresolvedReference,
            format!(
                "no relationships part at {}; variant r:id values not checked",
                rels_path.display()
            ),
        )];
    }
    let rels = match Relationships::load(&rels_path) {
        Ok(rels) => rels,
        Err(err) => return vec![Diagnostic::from(&err)],
    };

    let mut diagnostics = Vec::new();
    for (variant, id) in with_ids {
        let label = variant.vid.as_deref().unwrap_or("(no vid)");
        let Some(rel) = rels.get(id) else {
            diagnostics.push(Diagnostic::error(
                Category::UnresolvedReference,
                format!(
                    "themeVariant {} refers to {} which {} does not declare",
                    label,
                    id,
                    rels_path.display()
                ),
            ));
            continue;
        };
        match rel.target() {
            None => diagnostics.push(Diagnostic::error(
                Category::MissingAttribute,
                format!(
                    "relationship {} in {} (themeVariant {}) has no Target",
                    id,
                    rels_path.display(),
                    label
                ),
            )),
            Some(target) => {
                // relative to the manager part, not its _rels folder
                let resolved = resolve_target(&rels_path, target, package_root);
                debug!(
                    vid = label,
                    id,
                    resolved = %resolved.display(),
                    "checking variant target"
                );
                diagnostics.extend(check_exists(&resolved));
            },
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use std::fs;
    use std::path::PathBuf;

    fn family(part: &str, id: Option<&str>, vid: Option<&str>) -> ThemeFamily {
        ThemeFamily {
            name: Some(format!("Theme {}", part)),
            id: id.map(str::to_string),
            vid: vid.map(str::to_string),
            source_part: PathBuf::from(part),
        }
    }

    fn variant(vid: &str) -> ThemeVariant {
        ThemeVariant {
            name: Some("Variant".into()),
            vid: Some(vid.into()),
            relationship_id: None,
        }
    }

    fn errors(diags: &[Diagnostic]) -> Vec<&Diagnostic> {
        diags.iter().filter(|d| d.is_error()).collect()
    }

    #[test]
    fn test_ids_disagree_single_grouped_error() {
        let families = vec![
            family("/p/1/theme1.xml", Some("{A}"), Some("1")),
            family("/p/2/theme1.xml", Some("{A}"), Some("2")),
            family("/p/3/theme1.xml", Some("{B}"), Some("3")),
        ];
        let diags = ThemeCrossReferenceValidator::new(&families, &[]).check_id_agreement();
        let errs = errors(&diags);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].category, Category::CrossDocumentMismatch);
        let msg = &errs[0].message;
        assert!(msg.contains("{A} in [/p/1/theme1.xml, /p/2/theme1.xml]"), "{}", msg);
        assert!(msg.contains("{B} in [/p/3/theme1.xml]"), "{}", msg);
    }

    #[test]
    fn test_ids_agree() {
        let families = vec![
            family("/p/1/theme1.xml", Some("{A}"), Some("1")),
            family("/p/2/theme1.xml", Some("{A}"), Some("2")),
        ];
        let diags = ThemeCrossReferenceValidator::new(&families, &[]).check_id_agreement();
        assert_eq!(diags, vec![Diagnostic::ok("all 2 themeFamily ids agree: {A}")]);
    }

    #[test]
    fn test_missing_id_is_warning() {
        let families = vec![family("/p/1/theme1.xml", None, Some("1"))];
        let diags = ThemeCrossReferenceValidator::new(&families, &[]).check_id_agreement();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn test_orphan_variant() {
        let families = vec![family("/p/1/theme1.xml", Some("{A}"), Some("1"))];
        let variants = vec![variant("9")];
        let diags =
            ThemeCrossReferenceValidator::new(&families, &variants).check_vid_correspondence();
        assert_eq!(
            diags,
            vec![Diagnostic::error(
                Category::CrossDocumentMismatch,
                "vid 9 not found in any theme"
            )]
        );
    }

    #[test]
    fn test_ambiguous_and_matched_variants() {
        let families = vec![
            family("/p/1/theme1.xml", Some("{A}"), Some("1")),
            family("/p/2/theme1.xml", Some("{A}"), Some("2")),
            family("/p/3/theme1.xml", Some("{A}"), Some("2")),
        ];
        let variants = vec![variant("1"), variant("2")];
        let diags =
            ThemeCrossReferenceValidator::new(&families, &variants).check_vid_correspondence();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].severity, Severity::Ok);
        assert!(diags[0].message.contains("Theme /p/1/theme1.xml"));
        assert!(diags[1].is_error());
        assert!(diags[1].message.contains("/p/2/theme1.xml, /p/3/theme1.xml"));
    }

    #[test]
    fn test_nothing_to_compare() {
        let diags = ThemeCrossReferenceValidator::new(&[], &[]).validate();
        assert_eq!(diags, vec![Diagnostic::ok("no theme records to compare")]);
    }

    #[test]
    fn test_variant_relationships() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let manager = root.join("themeVariants/themeVariantManager.xml");
        fs::create_dir_all(root.join("themeVariants/_rels")).unwrap();
        fs::create_dir_all(root.join("themeVariants/variant1")).unwrap();
        fs::write(&manager, "<themeVariantManager/>").unwrap();
        fs::write(root.join("themeVariants/variant1/theme.xml"), "<x/>").unwrap();
        fs::write(
            root.join("themeVariants/_rels/themeVariantManager.xml.rels"),
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
                <Relationship Id="rId1" Type="t" Target="variant1/theme.xml"/>
                <Relationship Id="rId2" Type="t" Target="variant2/theme.xml"/>
            </Relationships>"#,
        )
        .unwrap();

        let mut v1 = variant("1");
        v1.relationship_id = Some("rId1".into());
        let mut v2 = variant("2");
        v2.relationship_id = Some("rId2".into());
        let mut v3 = variant("3");
        v3.relationship_id = Some("rId3".into());

        let diags = check_variant_relationships(&manager, &[v1, v2, v3], root);
        assert_eq!(diags.len(), 2);
        assert!(diags[0].message.contains("variant2"));
        assert!(diags[1].message.contains("rId3"));
        assert!(diags.iter().all(|d| d.category == Category::UnresolvedReference));
    }

    #[test]
    fn test_variant_relationship_without_target() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let manager = root.join("themeVariants/themeVariantManager.xml");
        fs::create_dir_all(root.join("themeVariants/_rels")).unwrap();
        fs::write(&manager, "<themeVariantManager/>").unwrap();
        fs::write(
            root.join("themeVariants/_rels/themeVariantManager.xml.rels"),
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
                <Relationship Id="rId4" Type="t"/>
            </Relationships>"#,
        )
        .unwrap();

        let mut v4 = variant("4");
        v4.relationship_id = Some("rId4".into());

        let diags = check_variant_relationships(&manager, &[v4], root);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].category, Category::MissingAttribute);
        assert!(diags[0].message.contains("rId4"));
        assert!(diags[0].message.contains("no Target"));
        assert!(!diags[0].message.contains("does not declare"));
    }

    #[test]
    fn test_variant_relationships_without_rels_part() {
        let dir = tempfile::tempdir().unwrap();
        let manager = dir.path().join("themeVariantManager.xml");
        let mut v1 = variant("1");
        v1.relationship_id = Some("rId1".into());
        let diags = check_variant_relationships(&manager, &[v1], dir.path());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);

        assert!(check_variant_relationships(&manager, &[variant("1")], dir.path()).is_empty());
    }
}
