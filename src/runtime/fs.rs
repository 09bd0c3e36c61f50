//! File system operations (read, write, rename, directory).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self, contents))]
    pub(crate) fn write_impl(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).context("Failed to write to file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_impl(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).context("Failed to read file")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context("Failed to read file to string")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn rename_impl(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).context("Failed to rename file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context("Failed to create directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_file_impl(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).context("Failed to remove file")?;
        Ok(())
    }

    pub(crate) fn exists_impl(&self, path: &Path) -> bool {
        path.exists()
    }

    pub(crate) fn is_file_impl(&self, path: &Path) -> bool {
        path.is_file()
    }

    pub(crate) fn is_dir_impl(&self, path: &Path) -> bool {
        path.is_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_dir_impl(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::read_dir(path)?.map(|entry| Ok(entry?.path())).collect()
    }

    pub(crate) fn absolute_impl(&self, path: &Path) -> Result<PathBuf> {
        std::path::absolute(path).with_context(|| format!("Failed to make {:?} absolute", path))
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_file_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");

        runtime.write(&file_path, b"hello").unwrap();
        assert!(runtime.exists(&file_path));
        assert!(runtime.is_file(&file_path));

        assert_eq!(runtime.read_to_string(&file_path).unwrap(), "hello");
        assert_eq!(runtime.read(&file_path).unwrap(), b"hello");

        let copy_path = dir.path().join("copy.txt");
        runtime.write(&copy_path, b"original").unwrap();
        assert!(runtime.exists(&copy_path));

        // Rename over an existing file replaces it
        runtime.write(&file_path, b"replacement").unwrap();
        runtime.rename(&file_path, &copy_path).unwrap();
        assert!(!runtime.exists(&file_path));
        assert_eq!(runtime.read_to_string(&copy_path).unwrap(), "replacement");

        runtime.remove_file(&copy_path).unwrap();
        assert!(!runtime.exists(&copy_path));
    }

    #[test]
    fn test_real_runtime_dir_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("sub/nested");

        runtime.create_dir_all(&sub_dir).unwrap();
        assert!(runtime.is_dir(&sub_dir));
        assert!(!runtime.is_file(&sub_dir));

        let entries = runtime.read_dir(&dir.path().join("sub")).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("nested"));
    }

    #[test]
    fn test_real_runtime_absolute() {
        let runtime = RealRuntime;
        let abs = runtime.absolute(std::path::Path::new("relative/file.jar")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("relative/file.jar"));
    }

    #[test]
    fn test_real_runtime_errors() {
        let runtime = RealRuntime;

        let result = runtime.read_to_string(std::path::Path::new("/nonexistent/path/file.txt"));
        assert!(result.is_err());

        let result = runtime.remove_file(std::path::Path::new("/nonexistent/path/file.txt"));
        assert!(result.is_err());
    }
}
