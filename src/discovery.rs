use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{HoldError, Result};

/// Supplies the candidate source files of a build.
pub trait SourceProvider {
    /// Returns every candidate source path. Order carries no meaning.
    fn sources(&self) -> Result<Vec<PathBuf>>;
}

/// Recursively walks a directory for files with a given extension.
#[derive(Debug, Clone)]
pub struct DirectorySources {
    root: PathBuf,
    extension: String,
    base_dir: Option<PathBuf>,
}

impl DirectorySources {
    /// Creates a provider walking `root` for `*.{extension}` files.
    ///
    /// A leading dot on `extension` is ignored.
    pub fn new(root: impl Into<PathBuf>, extension: impl AsRef<str>) -> Self {
        Self {
            root: root.into(),
            extension: extension.as_ref().trim_start_matches('.').to_string(),
            base_dir: None,
        }
    }

    /// Resolves a relative root against `base_dir` and reports sources
    /// relative to it, so cache keys do not depend on where the project is
    /// checked out.
    pub fn relative_to(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl SourceProvider for DirectorySources {
    /// Discovers all matching files under the root.
    ///
    /// Symbolic links are followed. A root that does not exist yields no
    /// sources rather than an error, mirroring a project without contracts.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory under the root cannot be read.
    fn sources(&self) -> Result<Vec<PathBuf>> {
        let walk_root = match &self.base_dir {
            Some(base_dir) => base_dir.join(&self.root),
            None => self.root.clone(),
        };

        if !walk_root.exists() {
            return Ok(Vec::new());
        }

        let mut sources = Vec::new();
        for entry in WalkDir::new(&walk_root).follow_links(true) {
            let entry = entry.map_err(|source| HoldError::DiscoveryError {
                path: walk_root.clone(),
                source,
            })?;

            if entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == self.extension.as_str())
            {
                let path = entry.into_path();
                let path = match &self.base_dir {
                    Some(base_dir) => path
                        .strip_prefix(base_dir)
                        .map(Path::to_path_buf)
                        .unwrap_or(path),
                    None => path,
                };
                sources.push(path);
            }
        }

        sources.sort();
        Ok(sources)
    }
}

impl SourceProvider for Vec<PathBuf> {
    fn sources(&self) -> Result<Vec<PathBuf>> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn setup_sources() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let contracts = temp_dir.path().join("contracts");
        fs::create_dir_all(contracts.join("token/utils")).unwrap();

        fs::write(contracts.join("main.cairo"), "%lang starknet").unwrap();
        fs::write(contracts.join("token/erc20.cairo"), "%lang starknet").unwrap();
        fs::write(contracts.join("token/utils/math.cairo"), "func f() {}").unwrap();
        fs::write(contracts.join("README.md"), "docs").unwrap();
        fs::write(contracts.join("token/notes.cairo.bak"), "old").unwrap();

        temp_dir
    }

    #[test]
    fn test_discover_sources_recursively() {
        let temp_dir = setup_sources();
        let root = temp_dir.path().join("contracts");

        let sources = DirectorySources::new(&root, "cairo").sources().unwrap();

        assert_eq!(
            sources,
            vec![
                root.join("main.cairo"),
                root.join("token/erc20.cairo"),
                root.join("token/utils/math.cairo"),
            ]
        );
    }

    #[test]
    fn test_sources_relative_to_base_dir() {
        let temp_dir = setup_sources();

        let sources = DirectorySources::new("contracts", "cairo")
            .relative_to(temp_dir.path())
            .sources()
            .unwrap();

        assert_eq!(
            sources,
            vec![
                PathBuf::from("contracts/main.cairo"),
                PathBuf::from("contracts/token/erc20.cairo"),
                PathBuf::from("contracts/token/utils/math.cairo"),
            ]
        );
    }

    #[test]
    fn test_absolute_root_ignores_base_dir() {
        let temp_dir = setup_sources();
        let root = temp_dir.path().join("contracts");
        let other = TempDir::new().unwrap();

        let sources = DirectorySources::new(&root, "cairo")
            .relative_to(other.path())
            .sources()
            .unwrap();

        assert_eq!(sources.len(), 3);
        assert!(sources.iter().all(|source| source.starts_with(&root)));
    }

    #[test]
    fn test_extension_leading_dot_ignored() {
        let provider = DirectorySources::new("contracts", ".cairo");
        assert_eq!(provider.extension(), "cairo");
        assert_eq!(provider.root(), Path::new("contracts"));
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let provider = DirectorySources::new(temp_dir.path().join("nope"), "cairo");
        assert!(provider.sources().unwrap().is_empty());
    }

    #[test]
    fn test_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let provider = DirectorySources::new(temp_dir.path(), "cairo");
        assert!(provider.sources().unwrap().is_empty());
    }

    #[test]
    fn test_vec_provider() {
        let provider = vec![PathBuf::from("a.cairo")];
        assert_eq!(provider.sources().unwrap(), vec![PathBuf::from("a.cairo")]);
    }
}
