//! Batch validation of one extracted package.
//!
//! [`PackageAudit`] ties the validators together: the caller-supplied `.rels`
//! parts and `[Content_Types].xml`, then theme discovery, per-theme checks and
//! the cross-reference phase. Parts are independent of each other, so they are
//! validated on the rayon pool unless [`AuditOptions::parallel`] is off. Report
//! order does not depend on scheduling.
use crate::diagnostic::{Category, Diagnostic, PartReport, Severity};
use crate::error::{Error, Result};
use crate::opc::{ContentTypesValidator, PackURI, RelationshipValidator};
use crate::theme::crossref::{ThemeCrossReferenceValidator, check_variant_relationships};
use crate::theme::discovery::ThemeInventory;
use crate::theme::family::{self, ThemeFamily, ThemeVariant, scan_theme_part};
use crate::xml::Document;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Subject of the discovery phase report.
pub const DISCOVERY_PHASE: &str = "theme discovery";
/// Subject of the cross-reference phase report.
pub const CROSS_REFERENCE_PHASE: &str = "theme cross-reference";

/// What an audit run covers.
#[derive(Debug, Clone)]
pub struct AuditOptions {
    /// Walk the package for `theme/theme` folders and cross-check them.
    pub discover_themes: bool,
    /// `.rels` parts to validate, in the order given.
    pub rels_parts: Vec<PathBuf>,
    pub content_types_part: Option<PathBuf>,
    /// Validate independent parts concurrently.
    pub parallel: bool,
    pub case_insensitive_extensions: bool,
    pub check_external_targets: bool,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            discover_themes: true,
            rels_parts: Vec::new(),
            content_types_part: None,
            parallel: true,
            case_insensitive_extensions: false,
            check_external_targets: false,
        }
    }
}

/// Result of an audit run: one report per part or phase, in a fixed order.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub root: PathBuf,
    pub parts: Vec<PartReport>,
}

impl AuditReport {
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.parts.iter().map(PartReport::error_count).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.parts
            .iter()
            .flat_map(|p| &p.diagnostics)
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

/// A part serialized for inspection, or the diagnostic explaining why it could not be.
#[derive(Debug, Clone)]
pub struct InspectedPart {
    pub path: PathBuf,
    pub fragments: Vec<String>,
    pub failure: Option<Diagnostic>,
}

/// `extLst` content of every theme part plus the selected variant manager.
#[derive(Debug, Clone, Default)]
pub struct ThemeInspection {
    pub themes: Vec<InspectedPart>,
    pub variant_manager: Option<InspectedPart>,
}

#[derive(Debug, Clone)]
pub struct PackageAudit {
    root: PathBuf,
    options: AuditOptions,
}

impl PackageAudit {
    /// Prepare an audit of the package extracted at `root`.
    ///
    /// Fails when `root` is not an existing directory; nothing is read yet.
    pub fn new<P: Into<PathBuf>>(root: P, options: AuditOptions) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::NotADirectory(root));
        }
        Ok(Self { root, options })
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    pub fn run(&self) -> AuditReport {
        info!(root = %self.root.display(), "auditing package");
        let mut parts = self.validate_rels_parts();
        if let Some(content_types) = &self.options.content_types_part {
            parts.push(self.validate_content_types(content_types));
        }
        if self.options.discover_themes {
            parts.extend(self.audit_themes());
        }

        let report = AuditReport {
            root: self.root.clone(),
            parts,
        };
        info!(
            parts = report.parts.len(),
            errors = report.error_count(),
            warnings = report.warning_count(),
            "audit finished"
        );
        report
    }

    /// One report per configured `.rels` part.
    pub fn validate_rels_parts(&self) -> Vec<PartReport> {
        let validator = RelationshipValidator::new(&self.root)
            .check_external_targets(self.options.check_external_targets);
        self.map_parts(&self.options.rels_parts, |path| {
            PartReport::new(self.subject(path), validator.validate(path))
        })
    }

    pub fn validate_content_types(&self, path: &Path) -> PartReport {
        let diagnostics = ContentTypesValidator::new(&self.root)
            .case_insensitive_extensions(self.options.case_insensitive_extensions)
            .validate(path);
        PartReport::new(self.subject(path), diagnostics)
    }

    /// Discovery, per-theme and cross-reference reports.
    ///
    /// Order: the discovery phase, each theme part, the selected variant
    /// manager (if any), then the cross-reference phase.
    pub fn audit_themes(&self) -> Vec<PartReport> {
        let inventory = ThemeInventory::collect(&self.root);
        let mut reports = vec![self.discovery_report(&inventory)];

        let scans = self.map_parts(&inventory.themes, |location| {
            scan_theme_part(&location.theme_part)
        });
        let mut families: Vec<ThemeFamily> = Vec::new();
        for (location, scan) in inventory.themes.iter().zip(scans) {
            families.extend(scan.families);
            reports.push(PartReport::new(
                self.subject(&location.theme_part),
                scan.diagnostics,
            ));
        }

        let mut variants: Vec<ThemeVariant> = Vec::new();
        if let Some(manager) = inventory.variant_managers.selected() {
            let (report, found) = self.variant_manager_report(manager);
            variants = found;
            reports.push(report);
        }

        reports.push(PartReport::new(
            CROSS_REFERENCE_PHASE,
            ThemeCrossReferenceValidator::new(&families, &variants).validate(),
        ));
        reports
    }

    /// Serialized `extLst` elements of every theme and the selected variant manager.
    pub fn inspect_themes(&self) -> ThemeInspection {
        let inventory = ThemeInventory::collect(&self.root);
        for err in &inventory.errors {
            warn!("{}", err);
        }

        let themes = inventory
            .themes
            .iter()
            .map(|location| inspect_part(&location.theme_part, family::ext_lists))
            .collect();
        let variant_manager = inventory
            .variant_managers
            .selected()
            .map(|manager| inspect_part(manager, |doc| vec![doc.to_xml_string()]));

        ThemeInspection {
            themes,
            variant_manager,
        }
    }

    fn discovery_report(&self, inventory: &ThemeInventory) -> PartReport {
        let mut diagnostics: Vec<Diagnostic> =
            inventory.errors.iter().map(Diagnostic::from).collect();

        for ignored in inventory.variant_managers.ignored() {
            warn!(path = %ignored.display(), "additional variant manager ignored");
            diagnostics.push(Diagnostic::warning(
                Category::DuplicateKey,
                format!(
                    "additional variant manager not validated: {}",
                    self.subject(ignored)
                ),
            ));
        }

        let manager = match inventory.variant_managers.selected() {
            Some(path) => self.subject(path),
            None => "none".to_string(),
        };
        diagnostics.push(Diagnostic::ok(format!(
            "{} theme part(s) found; variant manager: {}",
            inventory.themes.len(),
            manager
        )));
        PartReport::new(DISCOVERY_PHASE, diagnostics)
    }

    fn variant_manager_report(&self, manager: &Path) -> (PartReport, Vec<ThemeVariant>) {
        info!(part = %manager.display(), "reading variant manager");
        let subject = self.subject(manager);
        let doc = match Document::parse(manager) {
            Ok(doc) => doc,
            Err(err) => return (PartReport::new(subject, vec![Diagnostic::from(&err)]), Vec::new()),
        };

        let variants = family::extract_variants(&doc);
        let mut diagnostics = vec![Diagnostic::ok(format!(
            "{} themeVariant element(s) found",
            variants.len()
        ))];
        diagnostics.extend(check_variant_relationships(manager, &variants, &self.root));
        (PartReport::new(subject, diagnostics), variants)
    }

    /// Apply `f` to every item, on the rayon pool when enabled.
    ///
    /// Output order always matches input order.
    fn map_parts<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.options.parallel {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    /// Part name of `path` inside the package, or the plain path when it lies elsewhere.
    fn subject(&self, path: &Path) -> String {
        match PackURI::from_path(&self.root, path) {
            Ok(uri) => uri.to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}

fn inspect_part(path: &Path, extract: impl Fn(&Document) -> Vec<String>) -> InspectedPart {
    match Document::parse(path) {
        Ok(doc) => InspectedPart {
            path: path.to_path_buf(),
            fragments: extract(&doc),
            failure: None,
        },
        Err(err) => InspectedPart {
            path: path.to_path_buf(),
            fragments: Vec::new(),
            failure: Some(Diagnostic::from(&err)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::file_name;
    use std::fs;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn theme_xml(id: &str, vid: &str) -> String {
        format!(
            r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Facet">
  <a:extLst>
    <a:ext uri="{{05A4C25C-085E-4340-85A3-A5531E510DB2}}">
      <thm15:themeFamily xmlns:thm15="http://schemas.microsoft.com/office/thememl/2012/main" name="Facet" id="{id}" vid="{vid}"/>
    </a:ext>
  </a:extLst>
</a:theme>"#
        )
    }

    fn manager_xml(vids: &[&str]) -> String {
        let body: String = vids
            .iter()
            .map(|vid| format!(r#"<t:themeVariant name="Facet" vid="{}"/>"#, vid))
            .collect();
        format!(
            r#"<t:themeVariantManager xmlns:t="http://schemas.microsoft.com/office/thememl/2012/main"><t:themeVariantLst>{}</t:themeVariantLst></t:themeVariantManager>"#,
            body
        )
    }

    /// Package with a main theme and one variant, consistent throughout.
    fn clean_package() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join(file_name::CONTENT_TYPES),
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
                <Default Extension="xml" ContentType="application/xml"/>
                <Override PartName="/theme/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
            </Types>"#,
        );
        write(&root.join("theme/theme/theme1.xml"), &theme_xml("{A}", "{V0}"));
        write(
            &root.join("themeVariants/variant1/theme/theme/theme1.xml"),
            &theme_xml("{A}", "{V1}"),
        );
        write(
            &root.join("themeVariants/themeVariantManager.xml"),
            &manager_xml(&["{V0}", "{V1}"]),
        );
        write(
            &root.join("_rels/.rels"),
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
                <Relationship Id="rId1" Type="t" Target="theme/theme/theme1.xml"/>
            </Relationships>"#,
        );
        dir
    }

    fn options_for(root: &Path) -> AuditOptions {
        AuditOptions {
            rels_parts: vec![root.join("_rels/.rels")],
            content_types_part: Some(root.join(file_name::CONTENT_TYPES)),
            ..AuditOptions::default()
        }
    }

    #[test]
    fn test_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = PackageAudit::new(dir.path().join("nope"), AuditOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NotADirectory(_)));
    }

    #[test]
    fn test_clean_package() {
        let dir = clean_package();
        let report = PackageAudit::new(dir.path(), options_for(dir.path()))
            .unwrap()
            .run();

        assert!(!report.has_errors(), "{:#?}", report);
        assert_eq!(report.warning_count(), 0);
        let subjects: Vec<_> = report.parts.iter().map(|p| p.subject.as_str()).collect();
        assert_eq!(
            subjects,
            vec![
                "/_rels/.rels",
                "/[Content_Types].xml",
                DISCOVERY_PHASE,
                "/theme/theme/theme1.xml",
                "/themeVariants/variant1/theme/theme/theme1.xml",
                "/themeVariants/themeVariantManager.xml",
                CROSS_REFERENCE_PHASE,
            ]
        );
    }

    #[test]
    fn test_orphan_variant_and_id_mismatch() {
        let dir = clean_package();
        let root = dir.path();
        write(
            &root.join("themeVariants/variant1/theme/theme/theme1.xml"),
            &theme_xml("{B}", "{V1}"),
        );
        write(
            &root.join("themeVariants/themeVariantManager.xml"),
            &manager_xml(&["{V0}", "9"]),
        );

        let report = PackageAudit::new(root, AuditOptions::default()).unwrap().run();
        let crossref = report.parts.last().unwrap();
        assert_eq!(crossref.subject, CROSS_REFERENCE_PHASE);
        assert_eq!(crossref.error_count(), 2);
        assert!(
            crossref
                .diagnostics
                .iter()
                .any(|d| d.message == "vid 9 not found in any theme")
        );
        assert_eq!(report.error_count(), 2);
    }

    #[test]
    fn test_parse_error_stays_local() {
        let dir = clean_package();
        let root = dir.path();
        write(&root.join("theme/theme/theme1.xml"), "<a:theme>");

        let report = PackageAudit::new(root, options_for(root)).unwrap().run();
        let broken = report
            .parts
            .iter()
            .find(|p| p.subject == "/theme/theme/theme1.xml")
            .unwrap();
        assert_eq!(broken.diagnostics.len(), 1);
        assert_eq!(broken.diagnostics[0].category, Category::Parse);

        // the variant theme is still read, so only vid {V0} is orphaned
        let crossref = report.parts.last().unwrap();
        assert_eq!(crossref.error_count(), 1);
        assert!(crossref.diagnostics.iter().any(|d| d.message.contains("{V0}")));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let dir = clean_package();
        let root = dir.path();
        write(&root.join("b/theme/theme/theme1.xml"), &theme_xml("{C}", "{V9}"));

        let parallel = PackageAudit::new(root, options_for(root)).unwrap().run();
        let sequential = PackageAudit::new(
            root,
            AuditOptions {
                parallel: false,
                ..options_for(root)
            },
        )
        .unwrap()
        .run();
        assert_eq!(parallel.parts, sequential.parts);
        assert!(parallel.has_errors());
    }

    #[test]
    fn test_duplicate_variant_managers_warn() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["a", "b"] {
            write(
                &root.join(format!("{}/theme/theme/theme1.xml", name)),
                &theme_xml("{A}", "{V1}"),
            );
            write(
                &root.join(format!("{}/theme/theme/themeVariantManager.xml", name)),
                &manager_xml(&[]),
            );
        }

        let report = PackageAudit::new(root, AuditOptions::default()).unwrap().run();
        let discovery = &report.parts[0];
        assert_eq!(discovery.subject, DISCOVERY_PHASE);
        let warnings: Vec<_> = discovery
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("/b/theme/theme/themeVariantManager.xml"));
    }

    #[test]
    fn test_themes_disabled() {
        let dir = clean_package();
        let options = AuditOptions {
            discover_themes: false,
            ..options_for(dir.path())
        };
        let report = PackageAudit::new(dir.path(), options).unwrap().run();
        assert_eq!(report.parts.len(), 2);
    }

    #[test]
    fn test_inspect_themes() {
        let dir = clean_package();
        let inspection = PackageAudit::new(dir.path(), AuditOptions::default())
            .unwrap()
            .inspect_themes();
        assert_eq!(inspection.themes.len(), 2);
        assert!(inspection.themes.iter().all(|t| t.failure.is_none()));
        assert!(inspection.themes[0].fragments[0].contains("themeFamily"));
        let manager = inspection.variant_manager.unwrap();
        assert!(manager.fragments[0].contains("themeVariantLst"));
    }
}
