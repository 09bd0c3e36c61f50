//! Runtime abstraction for system operations.
//!
//! This module provides a trait-based abstraction over system operations,
//! enabling dependency injection and testability.
//!
//! # Structure
//!
//! - `env` - Environment variables and well-known directories
//! - `fs` - File system operations (read, write, rename, directory)

mod env;
mod fs;

use anyhow::Result;
use std::env as std_env;
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Turn a path into an absolute one without touching symlinks.
    /// Relative paths are resolved against the current directory.
    fn absolute(&self, path: &Path) -> Result<PathBuf>;

    // Directories
    fn home_dir(&self) -> Option<PathBuf>;
    fn config_dir(&self) -> Option<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.read_impl(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.rename_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.is_file_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        self.absolute_impl(path)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir_impl()
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.config_dir_impl()
    }
}
