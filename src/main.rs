// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use fast_import::Refname;
use git_sccsimport::{
    authors::AuthorResolver,
    config::{Config, DEFAULT_FUZZY_WINDOW},
    import::{self, ImportError},
    timestamp::{Zone, ZoneMove},
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// A fast git importer for SCCS files.
///
/// Run with the working directory at the root of the tree of SCCS files: the
/// relative path from the working directory to each SCCS file is also used
/// as the name of the file in the resulting repository.
#[derive(Debug, Parser)]
#[command(name = "git-sccsimport", version)]
struct Args {
    /// Branch to populate
    #[arg(long, default_value = "master")]
    branch: String,

    /// Mail domain for usernames taken from SCCS files
    #[arg(long)]
    maildomain: Option<String>,

    /// Default timezone name or UTC offset for timestamps (default local
    /// time)
    #[arg(long)]
    tz: Option<String>,

    /// File mapping author user-IDs to Git style user.{name,email}
    #[arg(long)]
    authormap: Option<PathBuf>,

    /// Command-line arguments are a list of directories to automatically
    /// search rather than a list of SCCS files
    #[arg(long)]
    dirs: bool,

    /// Expand keywords
    #[arg(long = "expand-kw")]
    expand_kw: bool,

    /// Deltas more than this many seconds apart are always considered to be
    /// in different commits
    #[arg(long, default_value_t = DEFAULT_FUZZY_WINDOW)]
    fuzzy_commit_window: f64,

    /// Set the date SCCS files moved between timezones (in ISO8601 form:
    /// YYYY/MM/DDTHH:MM:SS)
    #[arg(long)]
    move_date: Option<String>,

    /// Set the new timezone after --move-date
    #[arg(long)]
    move_zone: Option<String>,

    /// Don't try to create tags on SID level bumps
    #[arg(long)]
    no_tags: bool,

    /// Send git-fast-import data to stdout rather than to git-fast-import
    #[arg(long)]
    stdout: bool,

    /// Use the 'sccs' front-end for SCCS commands
    #[arg(long)]
    use_sccs: bool,

    /// Ask val(1) whether each file is a valid SCCS file, rather than
    /// sniffing the header
    #[arg(long)]
    use_val: bool,

    /// Print more verbose status messages
    #[arg(short, long)]
    verbose: bool,

    /// SCCS files to import, or directories to search with --dirs
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let (config, mut users, worklist) = match setup(&args) {
        Ok(setup) => setup,
        Err(err) => {
            eprintln!("{err:#}");
            eprintln!("usage: git-sccsimport [OPTIONS] <file|dir>...");
            return ExitCode::from(2);
        }
    };

    match import::run(&config, &worklist, &mut users, args.stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::from(1)
        }
    }
}

/// Turns options into the import configuration, author resolver, and
/// worklist. Everything that fails here is a usage error.
fn setup(args: &Args) -> anyhow::Result<(Config, AuthorResolver, Vec<PathBuf>)> {
    let default_zone = args
        .tz
        .as_deref()
        .map(Zone::parse)
        .transpose()
        .context("bad --tz")?;

    let zone_move = match (&args.move_date, &args.move_zone) {
        (Some(date), Some(zone)) => Some(ZoneMove::parse(date, zone, default_zone)?),
        (Some(_), None) => bail!("--move-date requires --move-zone"),
        (None, Some(_)) => bail!("--move-zone requires --move-date"),
        (None, None) => None,
    };

    let import_ref = format!("refs/heads/{}", args.branch);
    Refname::check_format(import_ref.as_bytes(), false)
        .map_err(|err| anyhow!("bad --branch {:?}: {err}", args.branch))?;

    let config = Config {
        import_ref,
        default_zone,
        fuzzy_window: args.fuzzy_commit_window,
        zone_move,
        do_tags: !args.no_tags,
        expand_keywords: args.expand_kw,
        use_sccs: args.use_sccs,
        use_val: args.use_val,
        original_oids: import::git_supports_original_oid(),
    };

    let map = match &args.authormap {
        Some(path) => AuthorResolver::load_map(path)
            .with_context(|| format!("cannot load author map {}", path.display()))?,
        None => Default::default(),
    };
    let users = AuthorResolver::new(map, args.maildomain.clone());

    let worklist = if args.dirs {
        let worklist = make_dir_worklist(&args.files);
        if worklist.is_empty() {
            bail!(
                "no SCCS files were found in {}",
                args.files
                    .iter()
                    .map(|dir| dir.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            );
        }
        worklist
    } else {
        args.files.clone()
    };

    Ok((config, users, worklist))
}

/// Collects every readable `s.*` file under the given directories, in a
/// deterministic walk order.
fn make_dir_worklist(dirs: &[PathBuf]) -> Vec<PathBuf> {
    fn walk(dir: &Path, result: &mut Vec<PathBuf>) {
        let Ok(entries) = fs::read_dir(dir) else {
            warn!("{}: cannot search directory", dir.display());
            return;
        };
        let mut entries: Vec<_> = entries.flatten().collect();
        entries.sort_by_key(|entry| entry.file_name());
        for entry in entries {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                walk(&path, result);
            } else if entry.file_name().to_string_lossy().starts_with("s.")
                && File::open(&path).is_ok()
            {
                result.push(path);
            }
        }
    }

    let mut result = Vec::new();
    for dir in dirs {
        walk(dir, &mut result);
    }
    result
}

fn report_failure(err: &ImportError) {
    eprint!("Import failed: {err}");
    let mut source = std::error::Error::source(err);
    while let Some(err) = source {
        eprint!(": {err}");
        source = err.source();
    }
    eprintln!();
}
