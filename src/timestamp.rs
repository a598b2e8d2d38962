// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

//! Conversion of SCCS checkin dates to git timestamps.
//!
//! SCCS records a two-digit year and a civil time with no zone. The zone is
//! supplied from the outside: an author-map zone, the `--tz` default, or the
//! host zone, with one optional site-wide "move" between zones at a fixed
//! instant.

use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, Offset,
    TimeZone,
};
use chrono_tz::Tz;
use thiserror::Error;

/// A timezone taken from the command line or the author map: either a fixed
/// UTC offset in ISO8601 basic format (`-0800`) or a named zone
/// (`US/Pacific`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ZoneError {
    #[error("bad UTC offset {0:?} (expected [+-]HHMM)")]
    BadOffset(String),
    #[error("unknown timezone {0:?}")]
    Unknown(String),
}

/// A site move between timezones: checkins at or after `date` whose author
/// has no mapped zone are re-interpreted in `zone`.
#[derive(Clone, Copy, Debug)]
pub struct ZoneMove {
    pub date: DateTime<FixedOffset>,
    pub zone: Zone,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("unexpected date format: {0:?}")]
    BadDate(String),
    #[error("unexpected time format: {0:?}")]
    BadTime(String),
}

/// A resolved checkin instant: UTC seconds plus the offset string recorded
/// for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub timestamp: i64,
    pub tz_offset: String,
}

impl Zone {
    pub fn parse(s: &str) -> Result<Zone, ZoneError> {
        if s.starts_with('+') || s.starts_with('-') {
            let bad = || ZoneError::BadOffset(s.to_string());
            if s.len() != 5 || !s[1..].bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad());
            }
            let hours = s[..3].parse::<i32>().map_err(|_| bad())?;
            let minutes = s[3..5].parse::<i32>().map_err(|_| bad())?;
            let minutes = if hours < 0 { -minutes } else { minutes };
            let offset = FixedOffset::east_opt(hours * 3600 + minutes * 60).ok_or_else(bad)?;
            Ok(Zone::Fixed(offset))
        } else {
            s.parse::<Tz>()
                .map(Zone::Named)
                .map_err(|_| ZoneError::Unknown(s.to_string()))
        }
    }

    /// Interpret a civil time in this zone.
    pub fn resolve(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        match self {
            Zone::Fixed(offset) => resolve_in(offset, naive).fixed_offset(),
            Zone::Named(tz) => resolve_in(tz, naive).fixed_offset(),
        }
    }
}

/// Interpret a civil time in the host zone.
pub fn resolve_local(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    resolve_in(&Local, naive).fixed_offset()
}

/// Resolve a civil time in a zone, picking the earlier reading of an
/// ambiguous time. A time skipped over by a transition is interpreted with
/// the offset in effect at the same nominal UTC instant.
fn resolve_in<T: TimeZone>(tz: &T, naive: NaiveDateTime) -> DateTime<T> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&naive).fix();
            tz.from_utc_datetime(&(naive - Duration::seconds(offset.local_minus_utc() as i64)))
        }
    }
}

/// Resolve an SCCS `YY/MM/DD` + `HH:MM:SS` checkin into a UTC instant and a
/// display offset.
///
/// Two-digit years apply the y2k rule from the "Year 2000 Issues" section of
/// the CSSC documentation: years below 69 fall in the 2000s. The zone is
/// chosen in priority order author-map zone, default zone, host zone; the
/// move, if configured, only applies to authors without a mapped zone.
pub fn resolve(
    date: &str,
    time: &str,
    author_zone: Option<Zone>,
    default_zone: Option<Zone>,
    zone_move: Option<&ZoneMove>,
) -> Result<Resolved, TimeError> {
    let bad_date = || TimeError::BadDate(date.to_string());
    let bad_time = || TimeError::BadTime(time.to_string());

    let mut fields = date.split('/');
    let mut next_date = || fields.next().ok_or_else(bad_date);
    let year = next_date()?.parse::<i32>().map_err(|_| bad_date())?;
    let month = next_date()?.parse::<u32>().map_err(|_| bad_date())?;
    let day = next_date()?.parse::<u32>().map_err(|_| bad_date())?;
    if fields.next().is_some() {
        return Err(bad_date());
    }

    let mut fields = time.split(':');
    let mut next_time = || fields.next().ok_or_else(bad_time);
    let h = next_time()?.parse::<u32>().map_err(|_| bad_time())?;
    let m = next_time()?.parse::<u32>().map_err(|_| bad_time())?;
    let s = next_time()?.parse::<u32>().map_err(|_| bad_time())?;
    if fields.next().is_some() {
        return Err(bad_time());
    }

    let year = if year < 100 {
        if year < 69 {
            year + 2000
        } else {
            year + 1900
        }
    } else {
        year
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(bad_date)?
        .and_hms_opt(h, m, s)
        .ok_or_else(bad_time)?;

    let mut cdate = match author_zone.or(default_zone) {
        Some(zone) => zone.resolve(naive),
        None => resolve_local(naive),
    };

    if author_zone.is_none() {
        if let Some(mv) = zone_move {
            if cdate >= mv.date {
                cdate = mv.zone.resolve(naive);
            }
        }
    }

    Ok(Resolved {
        timestamp: cdate.timestamp(),
        tz_offset: cdate.format("%z").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(s: &str) -> Zone {
        Zone::parse(s).unwrap()
    }

    #[test]
    fn zone_parse() {
        assert_eq!(
            fixed("-0800"),
            Zone::Fixed(FixedOffset::west_opt(8 * 3600).unwrap()),
        );
        assert_eq!(
            fixed("+0530"),
            Zone::Fixed(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()),
        );
        assert_eq!(Zone::parse("US/Pacific"), Ok(Zone::Named(Tz::US__Pacific)));
        assert!(matches!(Zone::parse("-800"), Err(ZoneError::BadOffset(_))));
        assert!(matches!(Zone::parse("+08:00"), Err(ZoneError::BadOffset(_))));
        assert!(matches!(Zone::parse("Atlantis"), Err(ZoneError::Unknown(_))));
    }

    #[test]
    fn y2k_pivot() {
        let utc = Some(fixed("+0000"));
        let r = resolve("68/01/01", "00:00:00", None, utc, None).unwrap();
        assert_eq!(r.timestamp, 3092601600); // 2068
        let r = resolve("69/01/01", "00:00:00", None, utc, None).unwrap();
        assert_eq!(r.timestamp, -31536000); // 1969
        let r = resolve("99/12/31", "23:59:59", None, utc, None).unwrap();
        assert_eq!(r.timestamp, 946684799); // 1999
    }

    #[test]
    fn offset_display() {
        let r = resolve("08/01/20", "12:30:45", None, Some(fixed("-0800")), None).unwrap();
        assert_eq!(r.tz_offset, "-0800");
        // 2008-01-20T12:30:45-08:00 = 2008-01-20T20:30:45Z
        assert_eq!(r.timestamp, 1200861045);
    }

    #[test]
    fn author_zone_beats_default() {
        let r = resolve(
            "08/01/20",
            "12:30:45",
            Some(fixed("+0100")),
            Some(fixed("-0800")),
            None,
        )
        .unwrap();
        assert_eq!(r.tz_offset, "+0100");
        assert_eq!(r.timestamp, 1200828645);
    }

    #[test]
    fn zone_move() {
        let mv = ZoneMove {
            date: fixed("-0500")
                .resolve(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()),
            zone: fixed("-0800"),
        };
        // Before the move: eastern offset applies.
        let r = resolve("89/06/01", "12:00:00", None, Some(fixed("-0500")), Some(&mv)).unwrap();
        assert_eq!(r.tz_offset, "-0500");
        // After the move: the civil time is re-read in the new zone.
        let r = resolve("91/06/01", "12:00:00", None, Some(fixed("-0500")), Some(&mv)).unwrap();
        assert_eq!(r.tz_offset, "-0800");
        // A mapped author zone suppresses the move.
        let r = resolve(
            "91/06/01",
            "12:00:00",
            Some(fixed("+0000")),
            Some(fixed("-0500")),
            Some(&mv),
        )
        .unwrap();
        assert_eq!(r.tz_offset, "+0000");
    }

    #[test]
    fn bad_fields() {
        let utc = Some(fixed("+0000"));
        assert!(matches!(
            resolve("08-01-20", "12:30:45", None, utc, None),
            Err(TimeError::BadDate(_))
        ));
        assert!(matches!(
            resolve("08/13/45", "12:30:45", None, utc, None),
            Err(TimeError::BadDate(_))
        ));
        assert!(matches!(
            resolve("08/01/20", "25:30:45", None, utc, None),
            Err(TimeError::BadTime(_))
        ));
        assert!(matches!(
            resolve("08/01/20", "12.30.45", None, utc, None),
            Err(TimeError::BadTime(_))
        ));
    }
}
