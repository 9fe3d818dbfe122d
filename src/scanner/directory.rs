use anyhow::{Context, Result};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the base directory is walked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Follow symbolic links to directories and files
    pub follow_symlinks: bool,
    /// Include dotfiles and dot-directories
    pub include_hidden: bool,
    /// Honour .gitignore / .ignore files found under the base directory
    pub respect_gitignore: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
            respect_gitignore: false,
        }
    }
}

/// Every regular file below `root`, sorted so batches are deterministic.
///
/// A missing or non-directory `root` is an error. Entries that cannot be
/// read during the walk are logged and skipped.
pub fn descendants(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(root)
        .with_context(|| format!("Cannot read base directory: {}", root.display()))?;
    anyhow::ensure!(metadata.is_dir(), "Not a directory: {}", root.display());

    let walker = WalkBuilder::new(root)
        .hidden(!options.include_hidden)
        .follow_links(options.follow_symlinks)
        .ignore(options.respect_gitignore)
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .git_global(false)
        .parents(false)
        .require_git(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_some_and(|file_type| file_type.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => tracing::warn!("Skipping unreadable entry: {}", err),
        }
    }

    files.sort();
    tracing::debug!(files = files.len(), "Collected files under {}", root.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("top.txt"), "alpha").unwrap();
        fs::write(dir.path().join("src/lib.rs"), "beta").unwrap();
        fs::write(dir.path().join("src/nested/deep.md"), "gamma").unwrap();
        fs::write(dir.path().join(".hidden/secret.txt"), "delta").unwrap();
        fs::write(dir.path().join(".gitignore"), "*.md\n").unwrap();
        dir
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_descendants_lists_all_regular_files() {
        let dir = tree();
        let files = descendants(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(
            names(dir.path(), &files),
            vec![
                ".gitignore",
                ".hidden/secret.txt",
                "src/lib.rs",
                "src/nested/deep.md",
                "top.txt",
            ]
        );
    }

    #[test]
    fn test_descendants_can_skip_hidden_and_ignored() {
        let dir = tree();
        let options = ScanOptions {
            include_hidden: false,
            respect_gitignore: true,
            ..ScanOptions::default()
        };
        let files = descendants(dir.path(), &options).unwrap();
        assert_eq!(names(dir.path(), &files), vec!["src/lib.rs", "top.txt"]);
    }

    #[test]
    fn test_descendants_rejects_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(descendants(&missing, &ScanOptions::default()).is_err());
    }

    #[test]
    fn test_descendants_rejects_file_root() {
        let dir = tree();
        let err = descendants(&dir.path().join("top.txt"), &ScanOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Not a directory"));
    }
}
