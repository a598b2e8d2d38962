// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::timestamp::{self, Zone, ZoneError, ZoneMove};

/// Two checkins separated by more than the fuzzy window are never considered
/// part of the same commit, even with the same non-empty comment, committer,
/// and MRs. It can be a relatively large number, e.g. a day or even a week.
pub const DEFAULT_FUZZY_WINDOW: f64 = 24.0 * 60.0 * 60.0 * 7.0;

/// The immutable configuration threaded through an import run.
#[derive(Clone, Debug)]
pub struct Config {
    /// The full ref the commits populate, `refs/heads/<branch>`.
    pub import_ref: String,
    /// Default zone for checkin times whose author has no mapped zone.
    pub default_zone: Option<Zone>,
    /// Maximum seconds between deltas fused into one commit.
    pub fuzzy_window: f64,
    /// A one-time site move between timezones.
    pub zone_move: Option<ZoneMove>,
    /// Tag SID level transitions.
    pub do_tags: bool,
    /// Expand SCCS keywords in fetched bodies.
    pub expand_keywords: bool,
    /// Run SCCS tools through the `sccs` front-end.
    pub use_sccs: bool,
    /// Delegate file validation to val(1) instead of header sniffing.
    pub use_val: bool,
    /// Emit `original-oid` records (the consuming git understands them).
    pub original_oids: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            import_ref: "refs/heads/master".to_string(),
            default_zone: None,
            fuzzy_window: DEFAULT_FUZZY_WINDOW,
            zone_move: None,
            do_tags: true,
            expand_keywords: false,
            use_sccs: false,
            use_val: false,
            original_oids: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("bad move date {0:?} (expected YYYY/MM/DDTHH:MM:SS)")]
    BadDate(String),
    #[error("bad move zone: {0}")]
    BadZone(#[from] ZoneError),
}

impl ZoneMove {
    /// Parses the `--move-date`/`--move-zone` pair. The move date is given in
    /// the pre-move zone: the default zone if one is set, else the host zone.
    pub fn parse(
        date: &str,
        zone: &str,
        default_zone: Option<Zone>,
    ) -> Result<ZoneMove, MoveError> {
        let naive = NaiveDateTime::parse_from_str(date, "%Y/%m/%dT%H:%M:%S")
            .map_err(|_| MoveError::BadDate(date.to_string()))?;
        let date = match default_zone {
            Some(zone) => zone.resolve(naive),
            None => timestamp::resolve_local(naive),
        };
        Ok(ZoneMove {
            date,
            zone: Zone::parse(zone)?,
        })
    }
}
