// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

//! Direct parsing of SCCS file headers, as per sccsfile(5).

mod delta;
mod file;
mod header;
mod sid;

pub use delta::*;
pub use file::*;
pub use header::*;
pub use sid::*;

/// The control byte beginning every SCCS control line: `<CTRL-A>`.
pub const SCCS_ESCAPE: u8 = 0x01;
