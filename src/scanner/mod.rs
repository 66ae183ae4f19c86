//! Workspace scanner for the code exploration tools.
//!
//! This module walks the analyzed workspace while respecting the
//! configured extensions, excludes, and file size limits, and keeps every
//! lookup confined to the workspace root.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["rs", "py", "js"])
    pub extensions: Vec<String>,
    /// Names to exclude (e.g., ["node_modules", "target", ".git"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: usize,
    /// Maximum number of files to scan
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScannerConfig::default())
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: Some(config.max_files),
        }
    }
}

/// Scanned file information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Relative path from the workspace root
    pub path: String,
    /// File size in bytes
    pub size: u64,
}

/// A line matching a code search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub path: String,
    pub line_number: usize,
    pub line: String,
}

/// File scanner rooted at a workspace directory.
#[derive(Debug, Clone)]
pub struct FileScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl FileScanner {
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all matching files, in file-name order.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded_entry(e));

        for entry in walker {
            if let Some(max) = self.config.max_files {
                if files.len() >= max {
                    break;
                }
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(ScannedFile {
                path: self.relative(entry.path()),
                size,
            });
        }

        Ok(files)
    }

    /// List the entries of a workspace directory. Directories get a trailing `/`.
    pub fn list_directory(&self, relative_dir: &str) -> Result<Vec<String>> {
        let dir_path = self.resolve(relative_dir)?;

        if !dir_path.is_dir() {
            return Err(anyhow!("Not a directory: {}", relative_dir));
        }

        let mut entries = Vec::new();
        let dir_entries = fs::read_dir(&dir_path)
            .with_context(|| format!("Cannot read directory: {}", relative_dir))?;

        for entry in dir_entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();

            if self.is_excluded(&name) {
                continue;
            }

            let suffix = if entry.path().is_dir() { "/" } else { "" };
            entries.push(format!("{}{}", name, suffix));
        }

        entries.sort();
        Ok(entries)
    }

    /// Read a workspace file that passes the scan criteria.
    pub fn read_file(&self, relative_path: &str) -> Result<String> {
        let path = self.resolve(relative_path)?;

        if !path.is_file() {
            return Err(anyhow!("Not a file: {}", relative_path));
        }
        if !self.matches(&path) {
            return Err(anyhow!(
                "File too large or doesn't match scan criteria: {}",
                relative_path
            ));
        }

        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {}", relative_path))
    }

    /// Find lines containing `pattern`, stopping after `max` hits.
    pub fn search(&self, pattern: &str, max: usize) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();

        for file in self.scan()? {
            let Ok(content) = fs::read_to_string(self.root.join(&file.path)) else {
                continue;
            };

            for (i, line) in content.lines().enumerate() {
                if line.contains(pattern) {
                    hits.push(SearchHit {
                        path: file.path.clone(),
                        line_number: i + 1,
                        line: line.trim().to_string(),
                    });
                    if hits.len() >= max {
                        return Ok(hits);
                    }
                }
            }
        }

        Ok(hits)
    }

    /// Check if a file matches scan criteria.
    pub fn matches(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.is_excluded(name) {
                return false;
            }
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !self.config.extensions.iter().any(|e| e == ext) {
            return false;
        }

        match fs::metadata(path) {
            Ok(metadata) => metadata.len() <= self.config.max_file_size as u64,
            Err(_) => false,
        }
    }

    /// Join a relative path onto the root, refusing anything that escapes it.
    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);

        if !path.exists() {
            return Err(anyhow!("Path not found: {}", relative));
        }

        let canonical_root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        let canonical_path = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());

        if !canonical_path.starts_with(&canonical_root) {
            return Err(anyhow!("Access denied: path outside workspace"));
        }

        Ok(path)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    fn is_excluded_entry(&self, entry: &DirEntry) -> bool {
        self.is_excluded(&entry.file_name().to_string_lossy())
    }

    /// Hidden files and explicit excludes.
    fn is_excluded(&self, name: &str) -> bool {
        name.starts_with('.') || self.config.excludes.iter().any(|pattern| name == pattern)
    }
}
