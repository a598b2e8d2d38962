// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

use std::{
    fmt::{self, Debug, Formatter},
    num::NonZeroU64,
};

use bstr::ByteSlice;

use crate::refs::Refname;

/// A reference to a commit by an integer, which allows the front-end to recall
/// it later without knowing its hash. The value `:0` is reserved and cannot be
/// used as a mark.
///
// Corresponds to `parse_mark` in fast-import.c.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Mark {
    mark: NonZeroU64, // uintmax_t in fast-import (at least u64)
}

impl Mark {
    /// The first mark issued in a stream.
    pub const FIRST: Mark = Mark {
        mark: NonZeroU64::MIN,
    };

    #[inline]
    pub fn new(mark: u64) -> Option<Mark> {
        NonZeroU64::new(mark).map(|mark| Mark { mark })
    }

    /// The mark following this one. Marks are issued consecutively, so the
    /// stream never approaches `u64::MAX` in practice.
    #[inline]
    pub fn next(&self) -> Mark {
        Mark {
            mark: self.mark.saturating_add(1),
        }
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.mark.get()
    }
}

/// The identifier a commit had in the source system. fast-import ignores this
/// directive, but stream filters between the front-end and fast-import may
/// make use of it.
///
// Corresponds to `parse_original_identifier` in fast-import.c.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OriginalOid<'a> {
    pub oid: &'a [u8],
}

/// The `Name <email>` identity written into commit and tag records. The name
/// may be empty, in which case only `<email>` appears.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PersonIdent<'a> {
    pub ident: &'a [u8],
    pub when: When<'a>,
}

/// A commit or tag time: seconds since the Unix epoch in UTC, plus the
/// `±HHMM` offset fast-import records for display purposes only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct When<'a> {
    pub unix_seconds: i64,
    pub tz_offset: &'a str,
}

/// The contents of a counted data section. fast-import also accepts a
/// delimited form, but only counted data can carry arbitrary bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Data<'a> {
    pub data: &'a [u8],
}

/// The mode of a file in a `filemodify` record.
///
// Corresponds to the modes accepted by `file_change_m` in fast-import.c,
// restricted to regular files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileMode {
    /// `644`, a non-executable file.
    Normal,
    /// `755`, a file with any execute bit set.
    Executable,
}

impl FileMode {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Normal => "644",
            FileMode::Executable => "755",
        }
    }
}

/// The header of a `commit` command. File change records follow separately,
/// terminated by a blank line.
///
// Corresponds to `parse_new_commit` in fast-import.c.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Commit<'a> {
    pub branch: &'a Refname,
    pub mark: Mark,
    pub original_oid: Option<OriginalOid<'a>>,
    pub committer: PersonIdent<'a>,
    pub message: &'a [u8],
    pub from: Option<Mark>,
}

/// A `filemodify` record with inline data.
///
// Corresponds to `file_change_m` in fast-import.c.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FileModify<'a> {
    pub mode: FileMode,
    pub path: &'a [u8],
    pub data: Data<'a>,
}

/// A `filedelete` record.
///
// Corresponds to `file_change_d` in fast-import.c.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FileDelete<'a> {
    pub path: &'a [u8],
}

/// An annotated tag pointing at a previously issued mark.
///
// Corresponds to `parse_new_tag` in fast-import.c.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a [u8],
    pub from: Mark,
    pub tagger: PersonIdent<'a>,
    pub message: &'a [u8],
}

impl Debug for OriginalOid<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OriginalOid")
            .field("oid", &self.oid.as_bstr())
            .finish()
    }
}

impl Debug for PersonIdent<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonIdent")
            .field("ident", &self.ident.as_bstr())
            .field("when", &self.when)
            .finish()
    }
}

impl Debug for Data<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("data", &self.data.as_bstr())
            .finish()
    }
}

impl Debug for Commit<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("branch", &self.branch)
            .field("mark", &self.mark)
            .field("original_oid", &self.original_oid)
            .field("committer", &self.committer)
            .field("message", &self.message.as_bstr())
            .field("from", &self.from)
            .finish()
    }
}

impl Debug for FileModify<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileModify")
            .field("mode", &self.mode)
            .field("path", &self.path.as_bstr())
            .field("data", &self.data)
            .finish()
    }
}

impl Debug for FileDelete<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDelete")
            .field("path", &self.path.as_bstr())
            .finish()
    }
}

impl Debug for Tag<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("name", &self.name.as_bstr())
            .field("from", &self.from)
            .field("tagger", &self.tagger)
            .field("message", &self.message.as_bstr())
            .finish()
    }
}
