// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

//! Mapping of SCCS committer logins to git identities.
//!
//! The author map matches the format of git-cvsimport:
//!
//! ```text
//! <username>=[Full Name] <email@addre.ss> [<zone offset or name>]
//! ```
//!
//! The email address must be surrounded by literal angle brackets, e.g.:
//!
//! ```text
//! exon=Andreas Ericsson <ae@op5.se>
//! spawn=Simon Pawn <spawn@frog-pond.org> -0400
//! bob=<bob@example.net> US/Pacific
//! ```
//!
//! Comment lines, beginning with a `#`, are ignored. Logins not in the map
//! fall back to the host user database's GECOS field, then to the bare
//! login.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use regex::Regex;
use thiserror::Error;

use crate::timestamp::{Zone, ZoneError};

/// A git identity for one SCCS login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub login: String,
    /// The formatted `Name <email>` identity; the name part may be empty.
    pub identity: String,
    /// A zone from the author map. Unmapped logins carry none.
    pub zone: Option<Zone>,
}

#[derive(Debug, Error)]
pub enum AuthorMapError {
    #[error("cannot read author map: {0}")]
    Io(#[from] io::Error),
    #[error("invalid syntax in author map at line {line}: {text:?}")]
    Syntax { line: usize, text: String },
    #[error("invalid timezone in author map at line {line}: {source}")]
    Zone { line: usize, source: ZoneError },
}

/// Resolves committer logins to identities, consulting the author map, then
/// the host user database, then a bare-login fallback. Lookups are cached
/// for the life of the import.
pub struct AuthorResolver {
    map: HashMap<String, UserInfo>,
    mail_domain: Option<String>,
    cache: HashMap<String, UserInfo>,
}

impl AuthorResolver {
    pub fn new(map: HashMap<String, UserInfo>, mail_domain: Option<String>) -> Self {
        AuthorResolver {
            map,
            mail_domain,
            cache: HashMap::new(),
        }
    }

    /// Reads an author map file into a login-keyed table.
    pub fn load_map(path: &Path) -> Result<HashMap<String, UserInfo>, AuthorMapError> {
        // `name` must end in non-whitespace and is separated from the email
        // by whitespace; the email allows no whitespace or angle brackets
        // inside the literal brackets.
        let entry = Regex::new(
            r"^\s*(?P<key>[^=\s]+)\s*=\s*(?:(?P<name>.*\S)\s+)?(?P<email><[^<>\s]*>)(?:\s+(?P<zone>\S+))?\s*$",
        )
        .expect("author map grammar");

        let mut map = HashMap::new();
        for (line_no, line) in BufReader::new(File::open(path)?).lines().enumerate() {
            let line = line?;
            let line_no = line_no + 1;
            if line.starts_with('#') {
                continue;
            }
            let m = entry.captures(&line).ok_or_else(|| AuthorMapError::Syntax {
                line: line_no,
                text: line.clone(),
            })?;
            let email = &m["email"];
            let identity = match m.name("name") {
                Some(name) => format!("{} {}", name.as_str(), email),
                None => email.to_string(),
            };
            let zone = match m.name("zone") {
                Some(zone) => Some(
                    Zone::parse(zone.as_str())
                        .map_err(|source| AuthorMapError::Zone { line: line_no, source })?,
                ),
                None => None,
            };
            let key = m["key"].to_string();
            map.insert(
                key.clone(),
                UserInfo {
                    login: key,
                    identity,
                    zone,
                },
            );
        }
        Ok(map)
    }

    /// Get a user's info corresponding to the given login name.
    pub fn lookup(&mut self, login: &str) -> &UserInfo {
        if self.map.contains_key(login) {
            return &self.map[login];
        }
        if !self.cache.contains_key(login) {
            let info = match gecos_name(login) {
                Some(name) => UserInfo {
                    login: login.to_string(),
                    identity: git_identity(&name, login, self.mail_domain.as_deref()),
                    zone: None,
                },
                None => {
                    tracing::debug!("{login}: unknown login");
                    UserInfo {
                        login: login.to_string(),
                        identity: git_identity(login, login, self.mail_domain.as_deref()),
                        zone: None,
                    }
                }
            };
            self.cache.insert(login.to_string(), info);
        }
        &self.cache[login]
    }
}

fn git_identity(name: &str, login: &str, mail_domain: Option<&str>) -> String {
    match mail_domain {
        Some(domain) => format!("{name} <{login}@{domain}>"),
        None => format!("{name} <{login}>"),
    }
}

/// The display-name field of the login's GECOS entry, if the host user
/// database knows the login.
#[cfg(unix)]
fn gecos_name(login: &str) -> Option<String> {
    let user = nix::unistd::User::from_name(login).ok().flatten()?;
    let gecos = user.gecos.to_str().ok()?;
    let name = gecos.split(',').next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(not(unix))]
fn gecos_name(_login: &str) -> Option<String> {
    None
}
