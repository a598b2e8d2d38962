// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use thiserror::Error;

use crate::sccs::SCCS_ESCAPE;

/// The reasons a file is rejected as not being an SCCS file. Such files are
/// skipped with a diagnostic; they never abort an import.
#[derive(Debug, Error)]
pub enum NotSccsError {
    #[error("cannot read file: {0}")]
    Io(#[from] io::Error),
    #[error("file is empty")]
    Empty,
    #[error("file does not begin with the SCCS checksum line")]
    BadMagic,
}

/// Extract all the header lines from an SCCS file, as per sccsfile(5).
///
/// Each returned line retains its trailing LF. The header ends at and
/// includes the first line beginning `<CTRL-A>T`, which closes the
/// descriptive-text section; everything after it is the weave body.
pub fn header_lines(path: &Path) -> Result<Vec<Vec<u8>>, NotSccsError> {
    let mut r = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    loop {
        let mut line = Vec::new();
        if r.read_until(b'\n', &mut line)? == 0 {
            if lines.is_empty() {
                return Err(NotSccsError::Empty);
            }
            break;
        }
        if lines.is_empty() && !line.starts_with(&[SCCS_ESCAPE, b'h']) {
            return Err(NotSccsError::BadMagic);
        }
        let end = line.starts_with(&[SCCS_ESCAPE, b'T']);
        lines.push(line);
        if end {
            break;
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f
    }

    #[test]
    fn stops_at_body_marker() {
        let f = write_file(b"\x01h12345\n\x01s 1/0/0\n\x01t\n\x01T\nbody line\n");
        let lines = header_lines(f.path()).unwrap();
        assert_eq!(
            lines,
            [
                b"\x01h12345\n".to_vec(),
                b"\x01s 1/0/0\n".to_vec(),
                b"\x01t\n".to_vec(),
                b"\x01T\n".to_vec(),
            ],
        );
    }

    #[test]
    fn rejects_non_sccs() {
        let f = write_file(b"");
        assert!(matches!(
            header_lines(f.path()),
            Err(NotSccsError::Empty)
        ));

        let f = write_file(b"int main(void) { return 0; }\n");
        assert!(matches!(
            header_lines(f.path()),
            Err(NotSccsError::BadMagic)
        ));

        assert!(matches!(
            header_lines(Path::new("/nonexistent/s.foo")),
            Err(NotSccsError::Io(_))
        ));
    }
}
