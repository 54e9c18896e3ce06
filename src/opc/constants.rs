/// Constant values related to the Open Packaging Convention and OOXML themes.

/// XML namespace URIs
pub mod namespace {
    /// Office relationships namespace (the `r:` prefix on `r:id` attributes)
    pub const OFC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    /// OPC relationships namespace, used by `.rels` parts
    pub const OPC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";

    /// OPC content types namespace
    pub const OPC_CONTENT_TYPES: &str =
        "http://schemas.openxmlformats.org/package/2006/content-types";
}

/// Open XML relationship target modes
pub mod target_mode {
    /// External relationship target mode (e.g., hyperlinks to external URLs)
    pub const EXTERNAL: &str = "External";
}

/// Element names, matched on the local name only
pub mod element {
    pub const RELATIONSHIP: &str = "Relationship";
    pub const DEFAULT: &str = "Default";
    pub const OVERRIDE: &str = "Override";
    pub const THEME_FAMILY: &str = "themeFamily";
    pub const THEME_VARIANT: &str = "themeVariant";
    pub const EXT_LST: &str = "extLst";
}

/// File and folder names that the package layout conventions rely on
pub mod file_name {
    pub const CONTENT_TYPES: &str = "[Content_Types].xml";
    pub const RELS_DIR: &str = "_rels";
    pub const RELS_EXT: &str = ".rels";

    pub const THEME_DIR: &str = "theme";
    pub const THEME_PART: &str = "theme1.xml";
    pub const THEME_VARIANTS_DIR: &str = "themeVariants";

    /// Accepted variant manager names, in priority order.
    ///
    /// The second spelling appears in packages produced by some authoring tools.
    pub const VARIANT_MANAGER: [&str; 2] = ["themeVariantManager.xml", "themeVarianManager.xml"];
}
