// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

//! A fast git importer for SCCS files.
//!
//! Deltas are read collectively from groups of SCCS files, ordered by
//! timestamp, fused into commits when adjacent deltas share an author,
//! comment, and MR list, and written to a fresh branch through the
//! `git fast-import` stream protocol.

pub mod aggregate;
pub mod authors;
pub mod config;
pub mod import;
pub mod sccs;
pub mod timestamp;

pub use config::Config;
