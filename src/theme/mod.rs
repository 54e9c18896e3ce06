/// Theme parts of an extracted theme package.
///
/// - [`discovery`]: locate `theme/theme/theme1.xml` folders and variant managers
/// - [`family`]: read `themeFamily` and `themeVariant` records
/// - [`crossref`]: check those records against each other
pub mod crossref;
pub mod discovery;
pub mod family;

pub use crossref::{ThemeCrossReferenceValidator, check_variant_relationships};
pub use discovery::{
    ThemeDiscovery, ThemeInventory, ThemeLocation, VariantManagerSelection, discover,
};
pub use family::{ThemeFamily, ThemePartScan, ThemeVariant, scan_theme_part};
