// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

//! Library for writing `git fast-import`–format streams, to import foreign
//! history as a repository.

pub mod command;
mod dump;
mod refs;

pub use dump::Dump;
pub use refs::{Refname, RefnameError};
