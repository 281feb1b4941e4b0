use std::path::{Path, PathBuf};

/// Where tours live, relative to every workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryLocations {
    /// Single-file candidates; each is optional.
    pub main_files: Vec<String>,
    /// Directories scanned recursively; every regular file is a candidate.
    pub directories: Vec<String>,
}

impl Default for DiscoveryLocations {
    fn default() -> Self {
        Self {
            main_files: vec![".tour".to_string(), ".vscode/main.tour".to_string()],
            directories: vec![".vscode/tours".to_string(), ".tours".to_string()],
        }
    }
}

impl DiscoveryLocations {
    /// No locations at all; add them with the `with_*` builders.
    pub fn empty() -> Self {
        Self {
            main_files: Vec::new(),
            directories: Vec::new(),
        }
    }

    pub fn with_main_file<S: Into<String>>(mut self, file: S) -> Self {
        self.main_files.push(file.into());
        self
    }

    pub fn with_directory<S: Into<String>>(mut self, dir: S) -> Self {
        self.directories.push(dir.into());
        self
    }

    /// Enumerate tour candidates under `root`.
    ///
    /// Directory candidates come first (in configured order, entries sorted
    /// by name), then the main files that exist. Missing locations yield
    /// nothing. Read-only.
    pub fn candidates(&self, root: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for dir in &self.directories {
            collect_files(&root.join(dir), &mut found);
        }
        for file in &self.main_files {
            let path = root.join(file);
            if path.is_file() {
                found.push(path);
            }
        }
        found
    }

    /// Whether `path` is somewhere a tour could be discovered from under `root`.
    pub fn covers(&self, root: &Path, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        if self
            .main_files
            .iter()
            .any(|f| relative == Path::new(f.as_str()))
        {
            return true;
        }
        self.directories
            .iter()
            .any(|d| relative.starts_with(d.as_str()) && relative != Path::new(d.as_str()))
    }
}

fn collect_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };

    let mut entries: Vec<_> = read_dir.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        // Symlinks are skipped so a looped link can't recurse forever.
        if file_type.is_file() {
            found.push(entry.path());
        } else if file_type.is_dir() {
            collect_files(&entry.path(), found);
        }
    }
}
