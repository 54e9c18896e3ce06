/// Locating theme parts inside an extracted package.
///
/// Theme packages of this family keep their main theme part at
/// `.../theme/theme/theme1.xml`, with an optional variant manager part next to
/// it or in a package-level `themeVariants` folder.
use crate::error::{Error, Result};
use crate::opc::constants::file_name;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A discovered theme folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeLocation {
    /// Path of the `theme1.xml` part.
    pub theme_part: PathBuf,
    /// First variant manager candidate that exists on disk.
    pub variant_manager: Option<PathBuf>,
}

/// Walk `package_root` looking for `theme/theme` folders.
///
/// The walk is lazy and single-pass. Entries of each directory are visited in
/// name order so that repeated runs report in the same order.
pub fn discover<P: AsRef<Path>>(package_root: P) -> ThemeDiscovery {
    let root = package_root.as_ref().to_path_buf();
    ThemeDiscovery {
        pending: vec![root.clone()],
        root,
    }
}

/// Iterator returned by [`discover`].
///
/// Directories that cannot be read are reported as `Err` items; the walk
/// continues with the remaining directories.
#[derive(Debug)]
pub struct ThemeDiscovery {
    root: PathBuf,
    pending: Vec<PathBuf>,
}

impl Iterator for ThemeDiscovery {
    type Item = Result<ThemeLocation>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(dir) = self.pending.pop() {
            match subdirectories(&dir) {
                // pushed in reverse so the smallest name is visited next
                Ok(children) => self.pending.extend(children.into_iter().rev()),
                Err(err) => {
                    warn!(dir = %dir.display(), "cannot read directory");
                    return Some(Err(err));
                },
            }

            if is_theme_folder(&dir) {
                let theme_part = dir.join(file_name::THEME_PART);
                let variant_manager = variant_manager_candidates(&dir, &self.root)
                    .into_iter()
                    .find(|candidate| candidate.is_file());
                debug!(
                    theme = %theme_part.display(),
                    variant_manager = ?variant_manager,
                    "theme folder found"
                );
                return Some(Ok(ThemeLocation {
                    theme_part,
                    variant_manager,
                }));
            }
        }
        None
    }
}

/// Whether `dir` is a `theme` folder inside another `theme` folder and holds `theme1.xml`.
pub fn is_theme_folder(dir: &Path) -> bool {
    let named_theme = |p: &Path| p.file_name().is_some_and(|n| n == file_name::THEME_DIR);
    named_theme(dir)
        && dir.parent().is_some_and(named_theme)
        && dir.join(file_name::THEME_PART).is_file()
}

/// Variant manager locations for a theme folder, in priority order.
///
/// Both accepted spellings are tried at each location before moving on.
pub fn variant_manager_candidates(theme_dir: &Path, package_root: &Path) -> Vec<PathBuf> {
    let bases = [
        theme_dir.join(file_name::THEME_VARIANTS_DIR),
        theme_dir.to_path_buf(),
        package_root.join(file_name::THEME_VARIANTS_DIR),
    ];
    bases
        .iter()
        .flat_map(|base| file_name::VARIANT_MANAGER.iter().map(move |name| base.join(name)))
        .collect()
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        // symlinks are not followed
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if file_type.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Keeps the first variant manager offered and sets the rest aside.
///
/// A package is expected to carry a single variant manager. When discovery
/// turns up several distinct ones, only the first is validated; the others are
/// kept so they can be reported.
#[derive(Debug, Clone, Default)]
pub struct VariantManagerSelection {
    selected: Option<PathBuf>,
    ignored: Vec<PathBuf>,
}

impl VariantManagerSelection {
    pub fn offer(&mut self, candidate: &Path) {
        match &self.selected {
            None => self.selected = Some(candidate.to_path_buf()),
            Some(selected) if selected == candidate => {},
            Some(_) => {
                if !self.ignored.iter().any(|p| p == candidate) {
                    self.ignored.push(candidate.to_path_buf());
                }
            },
        }
    }

    #[inline]
    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    #[inline]
    pub fn ignored(&self) -> &[PathBuf] {
        &self.ignored
    }
}

/// Everything discovery found in one package.
#[derive(Debug, Default)]
pub struct ThemeInventory {
    pub themes: Vec<ThemeLocation>,
    pub variant_managers: VariantManagerSelection,
    /// Directories that could not be read during the walk.
    pub errors: Vec<Error>,
}

impl ThemeInventory {
    /// Run discovery over `package_root` to completion.
    pub fn collect<P: AsRef<Path>>(package_root: P) -> Self {
        let mut inventory = Self::default();
        for item in discover(package_root) {
            match item {
                Ok(location) => inventory.record(location),
                Err(err) => inventory.errors.push(err),
            }
        }
        inventory
    }

    pub fn record(&mut self, location: ThemeLocation) {
        if let Some(manager) = &location.variant_manager {
            self.variant_managers.offer(manager);
        }
        self.themes.push(location);
    }
}
