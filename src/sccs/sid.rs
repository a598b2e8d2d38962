// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

/// A delta's dotted numeric identifier: release and level, optionally
/// followed by branch and sequence components. Every component is strictly
/// positive and at least two are present.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sid {
    components: Vec<u32>,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SidError {
    #[error("SID has fewer than two components")]
    TooFewComponents,
    #[error("SID component is zero or not a number")]
    BadComponent,
}

impl Sid {
    pub fn parse(s: &str) -> Result<Sid, SidError> {
        let mut components = Vec::new();
        for part in s.split('.') {
            let n = part.parse::<u32>().map_err(|_| SidError::BadComponent)?;
            if n == 0 {
                return Err(SidError::BadComponent);
            }
            components.push(n);
        }
        if components.len() < 2 {
            return Err(SidError::TooFewComponents);
        }
        Ok(Sid { components })
    }

    /// The release component, which drives tag inference.
    #[inline]
    pub fn level(&self) -> u32 {
        self.components[0]
    }

    /// The second component; `1` marks the first delta of a release.
    #[inline]
    pub fn rev(&self) -> u32 {
        self.components[1]
    }
}

impl Display for Sid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(Sid::parse("1.3").unwrap().to_string(), "1.3");
        assert_eq!(Sid::parse("2.1.1.4").unwrap().to_string(), "2.1.1.4");
        assert_eq!(Sid::parse("1"), Err(SidError::TooFewComponents));
        assert_eq!(Sid::parse("1.0"), Err(SidError::BadComponent));
        assert_eq!(Sid::parse("0.1"), Err(SidError::BadComponent));
        assert_eq!(Sid::parse("1.x"), Err(SidError::BadComponent));
        assert_eq!(Sid::parse(""), Err(SidError::BadComponent));
        assert_eq!(Sid::parse("1..2"), Err(SidError::BadComponent));
    }

    #[test]
    fn level_and_rev() {
        let sid = Sid::parse("3.2.1.4").unwrap();
        assert_eq!(sid.level(), 3);
        assert_eq!(sid.rev(), 2);
    }
}
