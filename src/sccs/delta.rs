// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

use bstr::ByteSlice;
use thiserror::Error;

use crate::{
    authors::AuthorResolver,
    config::Config,
    sccs::{Sid, SCCS_ESCAPE},
    timestamp::{self, TimeError},
};

/// The properties of an SCCS delta that are imported into git.
///
/// Only normal (`D`) deltas are represented; removed (`R`) deltas are
/// skipped when the revision list is scanned.
#[derive(Clone, Debug)]
pub struct Delta {
    pub sid: Sid,
    pub seqno: u32,
    pub parent_seqno: u32,
    /// The checkin date as recorded, `YY/MM/DD`.
    pub date: String,
    /// The checkin time as recorded, `HH:MM:SS`.
    pub time: String,
    /// The recorded committer login.
    pub committer: String,
    /// The resolved `Name <email>` identity for the committer.
    pub identity: String,
    /// The checkin comment. A comment of a sole newline is treated as empty.
    pub comment: String,
    /// MR numbers, as whitespace-separated tokens.
    pub mrs: Vec<String>,
    /// The checkin instant in UTC seconds.
    pub timestamp: i64,
    /// The `±HHMM` offset recorded alongside the timestamp for display.
    pub tz_offset: String,
}

#[derive(Debug, Error)]
pub enum DeltaError {
    #[error("delta entry for SID {0} not found in header")]
    MissingEntry(Sid),
    #[error("delta entry for SID {0} has too few fields")]
    MissingFields(Sid),
    #[error("delta entry for SID {0} has a malformed sequence number")]
    BadSeqno(Sid),
    #[error("delta block for SID {0} is not terminated")]
    Unterminated(Sid),
    #[error(transparent)]
    Time(#[from] TimeError),
}

const DELTA_KEY: &[u8] = &[SCCS_ESCAPE, b'd', b' ', b'D', b' '];
const COMMENT_KEY: &[u8] = &[SCCS_ESCAPE, b'c', b' '];
const MR_KEY: &[u8] = &[SCCS_ESCAPE, b'm', b' '];
const DELTA_END_KEY: &[u8] = &[SCCS_ESCAPE, b'e'];

/// Scans the header for the SIDs of all normal deltas, in encounter order.
/// Removed (`R`) deltas are not listed.
pub fn revision_list(headerlines: &[Vec<u8>]) -> Vec<String> {
    let mut result = Vec::new();
    for line in headerlines {
        if line.starts_with(DELTA_KEY) {
            if let Some(sid) = line.fields().nth(2) {
                result.push(sid.to_str_lossy().into_owned());
            }
        }
    }
    result
}

impl Delta {
    /// Reads the properties of the delta with the given SID out of the header
    /// lines: the fields of its `<CTRL-A>d D` line, then the comment and MR
    /// lines that follow, up to the closing `<CTRL-A>e`.
    pub fn parse(
        headerlines: &[Vec<u8>],
        sid: &Sid,
        users: &mut AuthorResolver,
        config: &Config,
    ) -> Result<Delta, DeltaError> {
        let mut lines = headerlines.iter();
        let fields = loop {
            let line = lines
                .next()
                .ok_or_else(|| DeltaError::MissingEntry(sid.clone()))?;
            if !line.starts_with(DELTA_KEY) {
                continue;
            }
            let fields: Vec<_> = line.fields().collect();
            let found = fields
                .get(2)
                .is_some_and(|text| Sid::parse(&text.to_str_lossy()).as_ref() == Ok(sid));
            if found {
                break fields;
            }
        };
        // Fields of the delta line: tag, type, SID, date, time, committer,
        // seqno, parent seqno, and ignored statistics.
        if fields.len() < 8 {
            return Err(DeltaError::MissingFields(sid.clone()));
        }
        let date = fields[3].to_str_lossy().into_owned();
        let time = fields[4].to_str_lossy().into_owned();
        let committer = fields[5].to_str_lossy().into_owned();
        let parse_seqno = |field: &[u8]| {
            field
                .to_str()
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or_else(|| DeltaError::BadSeqno(sid.clone()))
        };
        let seqno = parse_seqno(fields[6])?;
        let parent_seqno = parse_seqno(fields[7])?;

        let mut comment = String::new();
        let mut mrs = Vec::new();
        let mut terminated = false;
        for line in lines {
            if line.starts_with(COMMENT_KEY) {
                comment.push_str(&line[COMMENT_KEY.len()..].to_str_lossy());
            } else if line.starts_with(MR_KEY) {
                let tail = &line[MR_KEY.len()..];
                mrs.extend(tail.fields().map(|mr| mr.to_str_lossy().into_owned()));
            } else if line.starts_with(DELTA_END_KEY) {
                terminated = true;
                break;
            }
        }
        if !terminated {
            return Err(DeltaError::Unterminated(sid.clone()));
        }
        if comment == "\n" {
            comment.clear();
        }

        let info = users.lookup(&committer);
        let identity = info.identity.clone();
        let author_zone = info.zone;
        let resolved = timestamp::resolve(
            &date,
            &time,
            author_zone,
            config.default_zone,
            config.zone_move.as_ref(),
        )?;

        Ok(Delta {
            sid: sid.clone(),
            seqno,
            parent_seqno,
            date,
            time,
            committer,
            identity,
            comment,
            mrs,
            timestamp: resolved.timestamp,
            tz_offset: resolved.tz_offset,
        })
    }

    /// Formats the commit message: the checkin comment, noting any MRs as
    /// `Issue` numbers.
    pub fn commit_message(&self) -> String {
        let mut message = self.comment.clone();
        if !self.mrs.is_empty() {
            message.push('\n');
            message.push_str(if self.mrs.len() > 1 { "Issues" } else { "Issue" });
            message.push_str(": ");
            for (i, mr) in self.mrs.iter().enumerate() {
                if i != 0 {
                    message.push_str(", ");
                }
                message.push('#');
                message.push_str(mr);
            }
        }
        message
    }
}
