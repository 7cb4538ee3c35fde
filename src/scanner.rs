use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

/// Finds the Rust sources that declare the types routes refer to.
///
/// Directories are walked recursively in file-name order, so the same tree
/// always yields the same file order. `target` and hidden directories are
/// skipped. A single `.rs` file may be given instead of a directory.
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a scan
pub struct ScanResult {
    /// `.rs` files in walk order
    pub rust_files: Vec<PathBuf>,
    /// Entries that could not be read
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// # Errors
    ///
    /// Returns an error if the root path does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        let metadata = std::fs::metadata(&self.root_path)
            .with_context(|| format!("Failed to access path: {}", self.root_path.display()))?;
        if metadata.is_file() {
            debug!("Scanning single file {}", self.root_path.display());
            let rust_files = if is_rust_file(&self.root_path) {
                vec![self.root_path.clone()]
            } else {
                Vec::new()
            };
            return Ok(ScanResult {
                rust_files,
                warnings: Vec::new(),
            });
        }

        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            });

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_rust_file(entry.path()) => {
                    rust_files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        debug!("Found {} Rust files under {}", rust_files.len(), self.root_path.display());
        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }
}

fn is_rust_file(path: &std::path::Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("rs")
}
