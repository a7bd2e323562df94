//! Bundled resource sources
//!
//! A bundle is whatever the distributable carries the assets in, addressed
//! by dotted resource identifiers. Release builds ship them as a flat
//! `resources` directory next to the executable.

#[cfg(test)]
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

/// Source of bundled assets
pub trait ResourceBundle {
    /// Enumerate every identifier the bundle can discover by itself.
    ///
    /// May be empty under packaging modes that hide the listing even
    /// though individual resources can still be opened.
    fn resource_names(&self) -> Vec<String>;

    /// Open a resource by identifier; `Ok(None)` when it does not exist
    fn open(&self, name: &str) -> io::Result<Option<Box<dyn Read + '_>>>;
}

/// Resources shipped as files in one flat directory.
///
/// Each file name is the resource identifier.
#[derive(Debug, Clone)]
pub struct DirectoryBundle {
    root: PathBuf,
}

impl DirectoryBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceBundle for DirectoryBundle {
    fn resource_names(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Cannot list resources in {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    fn open(&self, name: &str) -> io::Result<Option<Box<dyn Read + '_>>> {
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Ok(None);
        }
        match fs::File::open(self.root.join(name)) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Resources held in memory
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct EmbeddedBundle {
    resources: BTreeMap<String, &'static [u8]>,
}

#[cfg(test)]
impl EmbeddedBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a static table of `(identifier, bytes)` pairs
    pub fn from_table(table: &[(&str, &'static [u8])]) -> Self {
        let mut bundle = Self::new();
        for (name, bytes) in table {
            bundle.insert(*name, *bytes);
        }
        bundle
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: &'static [u8]) {
        self.resources.insert(name.into(), bytes);
    }
}

#[cfg(test)]
impl ResourceBundle for EmbeddedBundle {
    fn resource_names(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    fn open(&self, name: &str) -> io::Result<Option<Box<dyn Read + '_>>> {
        Ok(self
            .resources
            .get(name)
            .map(|bytes| Box::new(*bytes) as Box<dyn Read>))
    }
}
