// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use fast_import::command::FileMode;
use thiserror::Error;
use tracing::warn;

use crate::{
    authors::AuthorResolver,
    config::Config,
    sccs::{self, Delta, DeltaError, NotSccsError, Sid},
};

/// One SCCS file selected for import: its source path, the name and mode it
/// takes in the repository, and its deltas in header order.
#[derive(Debug)]
pub struct SccsFile {
    path: PathBuf,
    git_name: String,
    git_mode: FileMode,
    deltas: Vec<Delta>,
}

#[derive(Debug, Error)]
pub enum FileError {
    /// Not a valid SCCS file; the file is skipped, never fatal.
    #[error(transparent)]
    NotSccs(#[from] NotSccsError),
    #[error("cannot stat file: {0}")]
    Stat(#[source] io::Error),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("SID {sid}: {source}")]
    Delta {
        sid: Sid,
        #[source]
        source: DeltaError,
    },
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("{0:?} is an absolute path name")]
    Absolute(PathBuf),
    #[error("{0:?} refers outside the tree being imported")]
    Parent(PathBuf),
    #[error("{0:?} is not representable in the target repository")]
    Unrepresentable(PathBuf),
}

impl SccsFile {
    /// Reads the header of the SCCS file at `path` and collects the deltas of
    /// every valid SID. Invalid SIDs are skipped with a diagnostic.
    pub fn read(
        path: PathBuf,
        users: &mut AuthorResolver,
        config: &Config,
    ) -> Result<SccsFile, FileError> {
        let headerlines = sccs::header_lines(&path)?;
        let mut deltas = Vec::new();
        for text in sccs::revision_list(&headerlines) {
            let sid = match Sid::parse(&text) {
                Ok(sid) => sid,
                Err(_) => {
                    warn!("{}: not importing SID {}: Invalid SID", path.display(), text);
                    continue;
                }
            };
            let delta = Delta::parse(&headerlines, &sid, users, config)
                .map_err(|source| FileError::Delta { sid, source })?;
            deltas.push(delta);
        }
        let git_name = git_friendly_name(&gotten_name(&path))?;
        let git_mode = file_mode(&path).map_err(FileError::Stat)?;
        Ok(SccsFile {
            path,
            git_name,
            git_mode,
            deltas,
        })
    }

    /// The path of the source SCCS file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The name of the file in the repository.
    #[inline]
    pub fn git_name(&self) -> &str {
        &self.git_name
    }

    #[inline]
    pub fn git_mode(&self) -> FileMode {
        self.git_mode
    }

    #[inline]
    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }
}

/// Map an SCCS filename to the name of the working file as would be assumed
/// by make: the `s.` prefix is stripped, and if the s.file is in a directory
/// called `SCCS`, that directory is stripped out of the path also.
fn gotten_name(path: &Path) -> PathBuf {
    let mut tail = path.file_name().unwrap_or_default().to_os_string();
    if let Some(stripped) = tail.to_str().and_then(|t| t.strip_prefix("s.")) {
        tail = stripped.to_string().into();
    }
    let head = match path.parent() {
        Some(head) if head.file_name() == Some("SCCS".as_ref()) => {
            head.parent().unwrap_or(Path::new(""))
        }
        Some(head) => head,
        None => Path::new(""),
    };
    head.join(tail)
}

/// Clean up filenames.
///
/// git fast-import does not like leading or trailing slashes, or `.` or `..`
/// in file names. Current-directory components and redundant separators are
/// collapsed; absolute and parent-relative names cannot be represented and
/// are errors.
fn git_friendly_name(path: &Path) -> Result<String, PathError> {
    if path.is_absolute() {
        return Err(PathError::Absolute(path.to_path_buf()));
    }
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| PathError::Unrepresentable(path.to_path_buf()))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => return Err(PathError::Parent(path.to_path_buf())),
            // A drive prefix is split off; a bare root is unreachable after
            // the absolute check.
            Component::Prefix(_) | Component::RootDir => {}
        }
    }
    if parts.is_empty() {
        return Err(PathError::Unrepresentable(path.to_path_buf()));
    }
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn file_mode(path: &Path) -> io::Result<FileMode> {
    use std::os::unix::fs::PermissionsExt;

    let mode = path.metadata()?.permissions().mode();
    if mode & 0o111 != 0 {
        Ok(FileMode::Executable)
    } else {
        Ok(FileMode::Normal)
    }
}

#[cfg(not(unix))]
fn file_mode(path: &Path) -> io::Result<FileMode> {
    path.metadata()?;
    Ok(FileMode::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(path: &str) -> Result<String, PathError> {
        git_friendly_name(&gotten_name(Path::new(path)))
    }

    #[test]
    fn gotten_names() {
        assert_eq!(name("s.foo.c").unwrap(), "foo.c");
        assert_eq!(name("SCCS/s.foo.c").unwrap(), "foo.c");
        assert_eq!(name("lib/SCCS/s.foo.c").unwrap(), "lib/foo.c");
        assert_eq!(name("lib/s.foo.c").unwrap(), "lib/foo.c");
        // Only an immediate SCCS parent is dropped.
        assert_eq!(name("SCCS/lib/s.foo.c").unwrap(), "SCCS/lib/foo.c");
        // Files not named s.* keep their name.
        assert_eq!(name("lib/foo.c").unwrap(), "lib/foo.c");
    }

    #[test]
    fn normalization() {
        assert_eq!(name("./lib//SCCS/s.foo.c").unwrap(), "lib/foo.c");
        assert_eq!(name("lib/./s.foo.c").unwrap(), "lib/foo.c");
        assert!(matches!(name("/abs/s.foo.c"), Err(PathError::Absolute(_))));
        assert!(matches!(name("../s.foo.c"), Err(PathError::Parent(_))));
    }

    #[test]
    fn sanitization_is_idempotent() {
        for path in ["./lib//SCCS/s.foo.c", "SCCS/s.Makefile", "a/b/s.c.d"] {
            let once = name(path).unwrap();
            let again = git_friendly_name(Path::new(&once)).unwrap();
            assert_eq!(once, again);
        }
    }
}
