//! The user's component library: a directory of jars and FXML files, plus
//! marker files listing members that live elsewhere.

use anyhow::Result;
use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

pub const FOLDERS_MARKER: &str = "library.folders";
pub const FXMLS_MARKER: &str = "library.fxmls";
pub const JARS_MARKER: &str = "library.jars";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Jar,
    Fxml,
    Folder,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::Jar => "jar",
            EntryKind::Fxml => "fxml",
            EntryKind::Folder => "folder",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LibraryEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Listed in a marker file rather than stored in the library directory.
    pub linked: bool,
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

pub struct Library<'a, R: Runtime> {
    runtime: &'a R,
    dir: PathBuf,
}

impl<'a, R: Runtime> Library<'a, R> {
    pub fn new(runtime: &'a R, dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every member of the library, sorted by path.
    #[tracing::instrument(skip(self), fields(dir = ?self.dir))]
    pub fn list(&self) -> Result<Vec<LibraryEntry>> {
        if !self.runtime.is_dir(&self.dir) {
            debug!("Library {:?} does not exist", self.dir);
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for path in self.runtime.read_dir(&self.dir)? {
            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            match file_name {
                JARS_MARKER => entries.extend(self.marker_entries(&path, EntryKind::Jar)),
                FXMLS_MARKER => entries.extend(self.marker_entries(&path, EntryKind::Fxml)),
                FOLDERS_MARKER => entries.extend(self.marker_entries(&path, EntryKind::Folder)),
                _ if has_extension(&path, "jar") => entries.push(LibraryEntry {
                    path,
                    kind: EntryKind::Jar,
                    linked: false,
                }),
                _ if has_extension(&path, "fxml") => entries.push(LibraryEntry {
                    path,
                    kind: EntryKind::Fxml,
                    linked: false,
                }),
                _ => {}
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// Jars only; the ones a resolver would look at again.
    pub fn jars(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|e| e.kind == EntryKind::Jar)
            .map(|e| e.path)
            .collect())
    }

    /// Every path listed in the jars marker, whether or not it still exists.
    pub fn recorded_jars(&self) -> Result<Vec<PathBuf>> {
        let marker = self.dir.join(JARS_MARKER);
        if !self.runtime.is_file(&marker) {
            return Ok(Vec::new());
        }
        Ok(self
            .runtime
            .read_to_string(&marker)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    /// Lines of a marker file that still point at something of the right kind.
    fn marker_entries(&self, marker: &Path, kind: EntryKind) -> Vec<LibraryEntry> {
        let content = match self.runtime.read_to_string(marker) {
            Ok(content) => content,
            Err(e) => {
                warn!("Cannot read {:?}: {:#}", marker, e);
                return Vec::new();
            }
        };
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .filter(|path| match kind {
                EntryKind::Folder => self.runtime.is_dir(path),
                EntryKind::Jar | EntryKind::Fxml => self.runtime.is_file(path),
            })
            .map(|path| LibraryEntry {
                path,
                kind,
                linked: true,
            })
            .collect()
    }

    /// Drops `path` from the library.
    ///
    /// Marker files lose the matching line. A file stored in the library
    /// directory itself is deleted. Returns whether anything changed.
    #[tracing::instrument(skip(self))]
    pub fn remove_entry(&self, path: &Path) -> Result<bool> {
        let markers: &[&str] = if self.runtime.is_dir(path) {
            &[FOLDERS_MARKER]
        } else {
            &[FXMLS_MARKER, JARS_MARKER]
        };

        let mut changed = false;
        for marker in markers {
            changed |= self.remove_line(&self.dir.join(marker), path)?;
        }

        if path.parent() == Some(self.dir.as_path()) && self.runtime.is_file(path) {
            debug!("Deleting {:?} from the library", path);
            self.runtime.remove_file(path)?;
            changed = true;
        }
        Ok(changed)
    }

    fn remove_line(&self, marker: &Path, path: &Path) -> Result<bool> {
        if !self.runtime.is_file(marker) {
            return Ok(false);
        }
        let content = self.runtime.read_to_string(marker)?;
        let target = path.to_string_lossy();
        let kept: Vec<&str> = content
            .lines()
            .filter(|line| line.trim() != target)
            .collect();
        if kept.len() == content.lines().count() {
            return Ok(false);
        }

        let mut rewritten = kept.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        self.runtime.write(marker, rewritten.as_bytes())?;
        Ok(true)
    }

    /// Records a jar that lives outside the library directory.
    #[tracing::instrument(skip(self))]
    pub fn add_jar(&self, path: &Path) -> Result<()> {
        let marker = self.dir.join(JARS_MARKER);
        let mut content = if self.runtime.is_file(&marker) {
            self.runtime.read_to_string(&marker)?
        } else {
            self.runtime.create_dir_all(&self.dir)?;
            String::new()
        };

        let line = path.to_string_lossy();
        if content.lines().any(|l| l.trim() == line) {
            debug!("{:?} is already in the library", path);
            return Ok(());
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&line);
        content.push('\n');
        self.runtime.write(&marker, content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use std::fs;

    struct Setup {
        library: tempfile::TempDir,
        outside: tempfile::TempDir,
    }

    impl Setup {
        fn new() -> Self {
            Self {
                library: tempfile::tempdir().unwrap(),
                outside: tempfile::tempdir().unwrap(),
            }
        }

        fn touch(&self, path: &Path) -> PathBuf {
            fs::write(path, b"x").unwrap();
            path.to_path_buf()
        }
    }

    #[test]
    fn test_list_direct_and_marker_entries() {
        let setup = Setup::new();
        let dir = setup.library.path();
        let direct_jar = setup.touch(&dir.join("controls.jar"));
        let direct_fxml = setup.touch(&dir.join("Panel.FXML"));
        setup.touch(&dir.join("notes.txt"));

        let linked_jar = setup.touch(&setup.outside.path().join("linked.jar"));
        let linked_folder = setup.outside.path().join("classes");
        fs::create_dir(&linked_folder).unwrap();
        fs::write(
            dir.join(JARS_MARKER),
            format!("{}\n/does/not/exist.jar\n\n", linked_jar.display()),
        )
        .unwrap();
        fs::write(
            dir.join(FOLDERS_MARKER),
            // A file listed as a folder is ignored
            format!("{}\n{}\n", linked_folder.display(), linked_jar.display()),
        )
        .unwrap();

        let runtime = RealRuntime;
        let entries = Library::new(&runtime, dir).list().unwrap();

        let mut expected = vec![
            LibraryEntry { path: direct_jar, kind: EntryKind::Jar, linked: false },
            LibraryEntry { path: direct_fxml, kind: EntryKind::Fxml, linked: false },
            LibraryEntry { path: linked_jar, kind: EntryKind::Jar, linked: true },
            LibraryEntry { path: linked_folder, kind: EntryKind::Folder, linked: true },
        ];
        expected.sort();
        assert_eq!(entries, expected);
    }

    #[test]
    fn test_missing_library_is_empty() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_dir().returning(|_| false);
        let library = Library::new(&runtime, "/nowhere");
        assert!(library.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove_linked_jar_rewrites_marker_only() {
        let setup = Setup::new();
        let dir = setup.library.path();
        let keep = setup.touch(&setup.outside.path().join("keep.jar"));
        let drop = setup.touch(&setup.outside.path().join("drop.jar"));
        fs::write(
            dir.join(JARS_MARKER),
            format!("{}\n{}\n", keep.display(), drop.display()),
        )
        .unwrap();

        let runtime = RealRuntime;
        let library = Library::new(&runtime, dir);
        assert!(library.remove_entry(&drop).unwrap());

        assert!(drop.exists());
        assert_eq!(library.jars().unwrap(), vec![keep.clone()]);
        assert_eq!(
            fs::read_to_string(dir.join(JARS_MARKER)).unwrap(),
            format!("{}\n", keep.display())
        );
        assert!(!library.remove_entry(&drop).unwrap());
    }

    #[test]
    fn test_remove_direct_member_deletes_file() {
        let setup = Setup::new();
        let dir = setup.library.path();
        let jar = setup.touch(&dir.join("controls.jar"));

        let runtime = RealRuntime;
        let library = Library::new(&runtime, dir);
        assert!(library.remove_entry(&jar).unwrap());
        assert!(!jar.exists());
        assert!(library.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove_folder_touches_folders_marker() {
        let setup = Setup::new();
        let dir = setup.library.path();
        let folder = setup.outside.path().join("classes");
        fs::create_dir(&folder).unwrap();
        fs::write(dir.join(FOLDERS_MARKER), format!("{}\n", folder.display())).unwrap();

        let runtime = RealRuntime;
        let library = Library::new(&runtime, dir);
        assert!(library.remove_entry(&folder).unwrap());
        assert!(folder.exists());
        assert_eq!(fs::read_to_string(dir.join(FOLDERS_MARKER)).unwrap(), "");
    }

    #[test]
    fn test_add_jar_appends_once() {
        let setup = Setup::new();
        let dir = setup.library.path().join("lib");
        let jar = setup.touch(&setup.outside.path().join("a.jar"));

        let runtime = RealRuntime;
        let library = Library::new(&runtime, &dir);
        library.add_jar(&jar).unwrap();
        library.add_jar(&jar).unwrap();

        assert_eq!(
            fs::read_to_string(dir.join(JARS_MARKER)).unwrap(),
            format!("{}\n", jar.display())
        );
        assert_eq!(library.jars().unwrap(), vec![jar]);
    }

    #[test]
    fn test_recorded_jars_include_missing_files() {
        let setup = Setup::new();
        let dir = setup.library.path();
        let present = setup.touch(&setup.outside.path().join("present.jar"));
        let gone = setup.outside.path().join("gone.jar");

        let runtime = RealRuntime;
        let library = Library::new(&runtime, dir);
        assert!(library.recorded_jars().unwrap().is_empty());

        library.add_jar(&present).unwrap();
        library.add_jar(&gone).unwrap();
        assert_eq!(library.recorded_jars().unwrap(), vec![present.clone(), gone]);
        assert_eq!(library.jars().unwrap(), vec![present]);
    }
}
