use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Parses Rust sources with `syn` so their type declarations can be read.
///
/// # Example
///
/// ```no_run
/// use swagger_gen::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/models.rs")).unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A parsed source file
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Parses one file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid Rust.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let syntax_tree = syn::parse_file(&content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses every file, one result per path in input order.
    ///
    /// A file that fails to parse is logged and reported in its slot; the
    /// rest are still parsed so the declarations they hold stay usable.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        let results: Vec<Result<ParsedFile>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(path).inspect_err(|e| {
                    warn!("Failed to parse {}: {:#}", path.display(), e);
                })
            })
            .collect();

        let failures = results.iter().filter(|r| r.is_err()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            results.len() - failures,
            failures
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_parse_type_declarations() {
        let temp_dir = TempDir::new().unwrap();
        let code = r#"
            use serde::{Deserialize, Serialize};

            #[derive(Serialize, Deserialize)]
            #[serde(rename_all = "camelCase")]
            pub struct Order {
                pub order_id: u64,
                #[validate(length(min = 1))]
                pub lines: Vec<OrderLine>,
            }

            pub enum Status { Open, Closed }

            pub type OrderId = u64;
        "#;

        let file_path = create_temp_file(&temp_dir, "orders.rs", code);
        let parsed = AstParser::parse_file(&file_path).unwrap();

        assert_eq!(parsed.path, file_path);
        assert_eq!(parsed.syntax_tree.items.len(), 4);
    }

    #[test]
    fn test_parse_invalid_rust_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "invalid.rs", "pub struct User { pub id: u32 pub name: String }");

        let err = AstParser::parse_file(&file_path).unwrap_err();

        assert!(err.to_string().contains("Failed to parse Rust syntax"));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let err = AstParser::parse_file(Path::new("/nonexistent/file.rs")).unwrap_err();

        assert!(err.to_string().contains("Failed to read file"));
    }

    #[test]
    fn test_parse_files_keeps_going_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let good = create_temp_file(&temp_dir, "good.rs", "pub struct World;");
        let bad = create_temp_file(&temp_dir, "bad.rs", "pub fn broken( {");
        let also_good = create_temp_file(&temp_dir, "also_good.rs", "pub type Id = u32;");

        let results = AstParser::parse_files(&[good.clone(), bad, also_good.clone()]);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().path, good);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().path, also_good);
    }

    #[test]
    fn test_parse_files_empty_list() {
        assert!(AstParser::parse_files(&[]).is_empty());
    }
}
