// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

//! Validation for Git refnames.

use std::fmt::{self, Debug, Formatter};

use bstr::ByteSlice;
use thiserror::Error;

/// A Git reference name.
#[repr(transparent)]
#[derive(PartialEq, Eq)]
pub struct Refname {
    refname: [u8],
}

/// A violation of how references are named in Git. See the documentation of
/// [`git check-ref-format`](https://git-scm.com/docs/git-check-ref-format) for
/// more information.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RefnameError {
    #[error("refname is empty")]
    Empty,
    #[error("refname starts with slash `/`")]
    StartsWithSlash,
    #[error("refname ends with slash `/`")]
    EndsWithSlash,
    #[error("refname contains consecutive slashes `//`")]
    SlashSlash,
    #[error("refname has only one level (must contain slash `/`)")]
    OnlyOneLevel,

    #[error("refname component is dot `.`")]
    ComponentIsDot,
    #[error("refname component starts with dot `.`")]
    ComponentStartsWithDot,
    #[error("refname ends with dot `.`")]
    EndsWithDot,
    #[error("refname contains consecutive dots `..`")]
    DotDot,

    #[error("refname contains ASCII control character")]
    ControlChar,
    #[error("refname contains space ` `")]
    Space,
    #[error("refname contains colon `:`")]
    Colon,
    #[error("refname contains question mark `?`")]
    Question,
    #[error("refname contains asterisk `*`")]
    Asterisk,
    #[error("refname contains open bracket `[`")]
    OpenBracket,
    #[error("refname contains backslash `\\`")]
    Backslash,
    #[error("refname contains caret `^`")]
    Caret,
    #[error("refname contains tilde `~`")]
    Tilde,

    #[error("refname is the single character `@`")]
    IsAt,
    #[error("refname contains the sequence `@{{`")]
    AtBrace,

    #[error("refname component ends with the sequence `.lock`")]
    ComponentEndsWithDotLock,
}

impl Refname {
    /// Create a new `Refname` and check that it has a valid format. Tag labels
    /// pass `allow_onelevel`; full refs like `refs/heads/master` do not.
    pub fn new<B: AsRef<[u8]> + ?Sized>(
        refname: &B,
        allow_onelevel: bool,
    ) -> Result<&Self, RefnameError> {
        let refname = refname.as_ref();
        Refname::check_format(refname, allow_onelevel)?;
        // SAFETY: Refname is repr(transparent).
        Ok(unsafe { &*(refname as *const [u8] as *const Refname) })
    }

    /// Check that the refname has a valid format according to the rules of
    /// [`git check-ref-format`](https://git-scm.com/docs/git-check-ref-format).
    /// If `allow_onelevel`, then accept one-level reference names.
    ///
    // Corresponds to `git.git/refs.c:check_refname_format`.
    pub fn check_format(refname: &[u8], allow_onelevel: bool) -> Result<(), RefnameError> {
        let mut component_count = 0;
        if refname == b"@" {
            return Err(RefnameError::IsAt);
        }

        let mut rest = refname;
        loop {
            let component_len = check_refname_component(rest)?;
            if component_len == 0 {
                if refname.is_empty() {
                    return Err(RefnameError::Empty);
                } else if component_count == 0 {
                    return Err(RefnameError::StartsWithSlash);
                } else if rest.is_empty() {
                    return Err(RefnameError::EndsWithSlash);
                } else {
                    return Err(RefnameError::SlashSlash);
                }
            }
            component_count += 1;
            if component_len == rest.len() {
                break;
            }
            rest = &rest[component_len + 1..];
        }

        if refname.ends_with(b".") {
            return Err(RefnameError::EndsWithDot);
        }
        if !allow_onelevel && component_count < 2 {
            return Err(RefnameError::OnlyOneLevel);
        }
        Ok(())
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.refname
    }
}

/// Try to read one path component from the front of `refname`. Return the
/// length of the component, or an error if the component is not legal.
///
// Corresponds to `git.git/refs.c:check_refname_component`.
#[inline]
fn check_refname_component(refname: &[u8]) -> Result<usize, RefnameError> {
    let mut component_len = refname.len();
    let mut last = 0;
    for (i, &ch) in refname.iter().enumerate() {
        match ch {
            // Forbidden characters.
            b'\0'..=b'\x1f' | b'\x7f' => return Err(RefnameError::ControlChar),
            b' ' => return Err(RefnameError::Space),
            b':' => return Err(RefnameError::Colon),
            b'?' => return Err(RefnameError::Question),
            b'*' => return Err(RefnameError::Asterisk),
            b'[' => return Err(RefnameError::OpenBracket),
            b'\\' => return Err(RefnameError::Backslash),
            b'^' => return Err(RefnameError::Caret),
            b'~' => return Err(RefnameError::Tilde),

            // Forbidden sequences: `..` and `@{`.
            b'.' if last == b'.' => return Err(RefnameError::DotDot),
            b'{' if last == b'@' => return Err(RefnameError::AtBrace),

            // End of the component.
            b'/' => {
                component_len = i;
                break;
            }

            // Valid characters.
            _ => {}
        }
        last = ch;
    }

    if component_len != 0 {
        let component = &refname[..component_len];
        if component[0] == b'.' {
            if component_len == 1 {
                return Err(RefnameError::ComponentIsDot);
            } else {
                return Err(RefnameError::ComponentStartsWithDot);
            }
        }
        if component.ends_with(b".lock") {
            return Err(RefnameError::ComponentEndsWithDotLock);
        }
    }
    // Handle empty component errors with more context in caller.
    Ok(component_len)
}

impl Debug for Refname {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Refname")
            .field(&self.refname.as_bstr())
            .finish()
    }
}
