/// Theme family and theme variant records.
///
/// `theme1.xml` declares its family inside an extension list:
///
/// ```xml
/// <a:extLst>
///   <a:ext uri="{05A4C25C-085E-4340-85A3-A5531E510DB2}">
///     <thm15:themeFamily name="Office Theme" id="{62F9...}" vid="{4A3C...}"/>
///   </a:ext>
/// </a:extLst>
/// ```
///
/// and `themeVariantManager.xml` lists the variants, each pointing at its
/// variant package through an `r:id` relationship.
use crate::diagnostic::{Category, Diagnostic};
use crate::opc::constants::{element, namespace};
use crate::opc::non_empty;
use crate::xml::{Document, Element};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeFamily {
    pub name: Option<String>,
    pub id: Option<String>,
    pub vid: Option<String>,
    /// The `theme1.xml` part the record was read from.
    pub source_part: PathBuf,
}

impl ThemeFamily {
    pub fn from_element(el: &Element, source_part: &Path) -> Self {
        Self {
            name: owned(el.attr("name")),
            id: owned(el.attr("id")),
            vid: owned(el.attr("vid")),
            source_part: source_part.to_path_buf(),
        }
    }

    /// Name for messages: the family name, or a placeholder.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeVariant {
    pub name: Option<String>,
    pub vid: Option<String>,
    pub relationship_id: Option<String>,
}

impl ThemeVariant {
    pub fn from_element(el: &Element) -> Self {
        Self {
            name: owned(el.attr("name")),
            vid: owned(el.attr("vid")),
            relationship_id: owned(
                el.attr_ns(namespace::OFC_RELATIONSHIPS, "id")
                    .or_else(|| el.attr("r:id")),
            ),
        }
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    non_empty(value).map(str::to_string)
}

/// All `themeFamily` records declared by a theme part.
pub fn extract_families(doc: &Document) -> Vec<ThemeFamily> {
    doc.find_all(element::THEME_FAMILY)
        .into_iter()
        .map(|el| ThemeFamily::from_element(el, doc.path()))
        .collect()
}

/// All `themeVariant` records declared by a variant manager part.
pub fn extract_variants(doc: &Document) -> Vec<ThemeVariant> {
    doc.find_all(element::THEME_VARIANT)
        .into_iter()
        .map(ThemeVariant::from_element)
        .collect()
}

/// Serialized `<extLst>` elements of a theme part, for inspection.
pub fn ext_lists(doc: &Document) -> Vec<String> {
    doc.find_all(element::EXT_LST)
        .into_iter()
        .map(Element::to_xml_string)
        .collect()
}

/// Outcome of reading one theme part.
#[derive(Debug, Clone)]
pub struct ThemePartScan {
    pub families: Vec<ThemeFamily>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a `theme1.xml` part and extract its families.
///
/// A parse failure affects this part only; it yields no families.
pub fn scan_theme_part(path: &Path) -> ThemePartScan {
    info!(part = %path.display(), "reading theme part");
    let doc = match Document::parse(path) {
        Ok(doc) => doc,
        Err(err) => {
            return ThemePartScan {
                families: Vec::new(),
                diagnostics: vec![Diagnostic::from(&err)],
            };
        },
    };

    let families = extract_families(&doc);
    let summary = match families.as_slice() {
        [] => Diagnostic::warning(Category::MissingAttribute, "no themeFamily element found"),
        [family] => Diagnostic::ok(format!(
            "themeFamily '{}' id {} vid {}",
            family.display_name(),
            family.id.as_deref().unwrap_or("(none)"),
            family.vid.as_deref().unwrap_or("(none)"),
        )),
        many => Diagnostic::ok(format!("{} themeFamily elements found", many.len())),
    };

    ThemePartScan {
        families,
        diagnostics: vec![summary],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;

    fn theme_xml(name: &str, id: &str, vid: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="{name}">
  <a:themeElements/>
  <a:extLst>
    <a:ext uri="{{05A4C25C-085E-4340-85A3-A5531E510DB2}}">
      <thm15:themeFamily xmlns:thm15="http://schemas.microsoft.com/office/thememl/2012/main" name="{name}" id="{id}" vid="{vid}"/>
    </a:ext>
  </a:extLst>
</a:theme>"#
        )
    }

    #[test]
    fn test_extract_family() {
        let doc = Document::from_bytes(
            "/pkg/theme/theme/theme1.xml",
            theme_xml("Facet", "{A}", "{V1}").as_bytes(),
        )
        .unwrap();
        let families = extract_families(&doc);
        assert_eq!(
            families,
            vec![ThemeFamily {
                name: Some("Facet".into()),
                id: Some("{A}".into()),
                vid: Some("{V1}".into()),
                source_part: PathBuf::from("/pkg/theme/theme/theme1.xml"),
            }]
        );
        assert_eq!(ext_lists(&doc).len(), 1);
        assert!(ext_lists(&doc)[0].contains("themeFamily"));
    }

    #[test]
    fn test_extract_variants() {
        let xml = r#"<t:themeVariantManager xmlns:t="http://schemas.microsoft.com/office/thememl/2012/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
            <t:themeVariantLst>
                <t:themeVariant name="Facet" vid="{V1}" cx="12192000" cy="6858000" r:id="rId1"/>
                <t:themeVariant name="Facet" vid="{V2}"/>
            </t:themeVariantLst>
        </t:themeVariantManager>"#;
        let doc = Document::from_bytes("m.xml", xml.as_bytes()).unwrap();
        let variants = extract_variants(&doc);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].relationship_id.as_deref(), Some("rId1"));
        assert_eq!(variants[0].vid.as_deref(), Some("{V1}"));
        assert_eq!(variants[1].relationship_id, None);
    }

    #[test]
    fn test_scan_theme_part() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.xml");
        std::fs::write(&good, theme_xml("Facet", "{A}", "{V1}")).unwrap();
        let scan = scan_theme_part(&good);
        assert_eq!(scan.families.len(), 1);
        assert_eq!(scan.diagnostics.len(), 1);
        assert_eq!(scan.diagnostics[0].severity, Severity::Ok);

        let bare = dir.path().join("bare.xml");
        std::fs::write(&bare, "<a:theme xmlns:a=\"urn:a\"/>").unwrap();
        let scan = scan_theme_part(&bare);
        assert!(scan.families.is_empty());
        assert_eq!(scan.diagnostics[0].severity, Severity::Warning);

        let broken = dir.path().join("broken.xml");
        std::fs::write(&broken, "<a:theme>").unwrap();
        let scan = scan_theme_part(&broken);
        assert!(scan.families.is_empty());
        assert_eq!(scan.diagnostics[0].category, Category::Parse);
    }
}
