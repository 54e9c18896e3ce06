/// Package URIs and resolution of relationship targets onto an extracted package.
///
/// OPC addresses parts with `/`-rooted names inside a ZIP container. Once the
/// container is extracted, every part name maps onto a file below the package
/// root, and relationship targets have to be resolved the same way a consumer
/// would resolve them inside the ZIP.
use crate::error::{Error, Result};
use crate::opc::constants::file_name;
use std::path::{Component, Path, PathBuf};

/// Represents a package URI, which is a partname within an OPC package.
///
/// PackURIs always begin with a forward slash and use forward slashes as path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/ppt/theme/theme1.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string, which must begin with a forward slash.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(Error::InvalidPackUri(format!(
                "PackURI must begin with slash, got '{}'",
                uri
            )));
        }
        Ok(PackURI { uri })
    }

    /// The partname of a file inside an extracted package.
    ///
    /// For example `<root>/ppt/theme/theme1.xml` becomes `/ppt/theme/theme1.xml`.
    pub fn from_path(package_root: &Path, path: &Path) -> Result<Self> {
        let relative = path.strip_prefix(package_root).map_err(|_| {
            Error::InvalidPackUri(format!(
                "{} is outside the package root {}",
                path.display(),
                package_root.display()
            ))
        })?;

        let mut uri = String::with_capacity(relative.as_os_str().len() + 1);
        for component in relative.components() {
            if let Component::Normal(segment) = component {
                uri.push('/');
                uri.push_str(&segment.to_string_lossy());
            }
        }
        if uri.is_empty() {
            uri.push('/');
        }
        Ok(PackURI { uri })
    }

    /// Get the full URI string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// The directory relative targets of `owning_part` are resolved against.
///
/// This is the directory holding the part, except when that directory is
/// `_rels`: a `.rels` part describes the part one level up, and OPC targets are
/// always relative to that source part, not to the metadata folder.
pub fn source_base_dir(owning_part: &Path) -> PathBuf {
    let dir = owning_part.parent().unwrap_or_else(|| Path::new(""));
    if dir.file_name().is_some_and(|name| name == file_name::RELS_DIR) {
        dir.parent().unwrap_or_else(|| Path::new("")).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

/// Resolve a relationship `Target` to a filesystem path.
///
/// Targets starting with `/` are package-absolute and resolve against
/// `package_root`, independent of where the owning part lives. Anything else
/// resolves against [`source_base_dir`]. `..` segments are folded lexically.
///
/// Performs no I/O and never fails; a target that points nowhere simply yields a
/// path that does not exist.
pub fn resolve_target(owning_part: &Path, raw_target: &str, package_root: &Path) -> PathBuf {
    if is_package_absolute(raw_target) {
        resolve_part_name(package_root, raw_target)
    } else {
        normalize_path(&join_segments(source_base_dir(owning_part), raw_target))
    }
}

/// Resolve a `/`-rooted part name (as used by `Override/@PartName`) below `package_root`.
///
/// A missing leading slash is tolerated.
pub fn resolve_part_name(package_root: &Path, part_name: &str) -> PathBuf {
    let stripped = part_name.trim_start_matches(['/', '\\']);
    normalize_path(&join_segments(package_root.to_path_buf(), stripped))
}

#[inline]
fn is_package_absolute(target: &str) -> bool {
    target.starts_with('/') || target.starts_with('\\')
}

/// Append the `/`- or `\`-separated segments of a URI reference to `base`.
fn join_segments(mut base: PathBuf, reference: &str) -> PathBuf {
    for segment in reference.split(['/', '\\']) {
        if !segment.is_empty() {
            base.push(segment);
        }
    }
    base
}

/// Normalize a path lexically, resolving `.` and `..` without touching the filesystem.
///
/// `..` never climbs above a root; leading `..` of a relative path are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                },
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {},
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// The `.rels` part describing `part`, e.g. `dir/_rels/part.xml.rels`.
pub fn rels_path_for(part: &Path) -> Option<PathBuf> {
    let name = part.file_name()?;
    let mut rels_name = name.to_os_string();
    rels_name.push(file_name::RELS_EXT);
    Some(
        part.parent()
            .unwrap_or_else(|| Path::new(""))
            .join(file_name::RELS_DIR)
            .join(rels_name),
    )
}

/// Find the root of the extracted package containing `part`.
///
/// The root is the nearest ancestor directory holding `[Content_Types].xml`.
/// For a relative `part` the current directory is a candidate too, returned as `.`.
pub fn find_package_root(part: &Path) -> Option<PathBuf> {
    part.ancestors()
        .skip(1)
        .find(|dir| dir.join(file_name::CONTENT_TYPES).is_file())
        .map(directory_or_current)
}

/// Best guess at the package root for a `.rels` part given on its own.
///
/// Falls back to the parent of the part's [`source_base_dir`] when no ancestor
/// holds `[Content_Types].xml`. Never returns an empty path.
pub fn infer_package_root(rels_part: &Path) -> PathBuf {
    find_package_root(rels_part).unwrap_or_else(|| {
        let base = source_base_dir(rels_part);
        match base.parent() {
            Some(parent) => directory_or_current(parent),
            None => directory_or_current(&base),
        }
    })
}

/// `dir`, or `.` when `dir` is the empty parent of a relative path.
fn directory_or_current(dir: &Path) -> PathBuf {
    if dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        dir.to_path_buf()
    }
}
