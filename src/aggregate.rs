// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

//! Global ordering of deltas and fuzzy fusion into commit groups.

use crate::sccs::{Delta, SccsFile};

/// A delta identified by its position in the scanned file list. Files own
/// their deltas; groups refer back into them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeltaRef {
    pub file: usize,
    pub delta: usize,
}

impl DeltaRef {
    #[inline]
    pub fn get<'a>(&self, files: &'a [SccsFile]) -> &'a Delta {
        &files[self.file].deltas()[self.delta]
    }
}

/// An ordered, non-empty run of deltas emitted as a single commit. All
/// members share the first member's committer, comment, and MR list, and lie
/// within the fuzzy window of it.
#[derive(Clone, Debug)]
pub struct CommitGroup {
    pub members: Vec<DeltaRef>,
}

impl CommitGroup {
    #[inline]
    pub fn first(&self) -> DeltaRef {
        self.members[0]
    }
}

/// Flattens every file's delta list, orders it by timestamp, and fuses
/// adjacent deltas that fuzzily belong to the same commit. Ties in the sort
/// keep file-list order, then delta order within a file.
pub fn group_deltas(files: &[SccsFile], fuzzy_window: f64) -> Vec<CommitGroup> {
    let mut refs = Vec::new();
    for (f, file) in files.iter().enumerate() {
        for d in 0..file.deltas().len() {
            refs.push(DeltaRef { file: f, delta: d });
        }
    }
    refs.sort_by_key(|r| r.get(files).timestamp);

    let mut groups: Vec<CommitGroup> = Vec::new();
    for r in refs {
        if let Some(group) = groups.last_mut() {
            let first = group.first().get(files);
            if same_fuzzy_commit(first, r.get(files), fuzzy_window) {
                group.members.push(r);
                continue;
            }
        }
        groups.push(CommitGroup { members: vec![r] });
    }
    groups
}

/// Whether two deltas belong to the same logical commit: identical committer,
/// identical non-empty comment, identical MR list, and checkin times within
/// the fuzzy window. A delta with an empty comment never shares a commit.
fn same_fuzzy_commit(first: &Delta, other: &Delta, fuzzy_window: f64) -> bool {
    !first.comment.is_empty()
        && first.comment == other.comment
        && first.committer == other.committer
        && first.mrs == other.mrs
        && (other.timestamp - first.timestamp).abs() as f64 <= fuzzy_window
}
