// Copyright (C) The git-sccsimport developers. All rights reserved.
//
// This file is part of git-sccsimport, distributed under the GPL 2.0 with a
// linking exception. For the full terms, see the included COPYING file.

//! Emission of the fast-import stream and communication with the consuming
//! `git fast-import` process.

use std::{
    collections::HashMap,
    ffi::{OsStr, OsString},
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
};

use fast_import::{
    command::{Commit, Data, FileDelete, FileModify, Mark, OriginalOid, PersonIdent, Tag, When},
    Dump, Refname, RefnameError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    aggregate::{self, CommitGroup, DeltaRef},
    authors::AuthorResolver,
    config::Config,
    sccs::{Delta, FileError, SccsFile},
};

/// An error that aborts the import. Per-file invalidity is recovered by
/// skipping the file and never appears here.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no deltas to import")]
    NoDeltas,
    #[error("{0:?} is not readable or not a file")]
    Unreadable(PathBuf),
    #[error("an import failure occurred while processing {path:?}")]
    File {
        path: PathBuf,
        #[source]
        source: FileError,
    },
    #[error("invalid import ref: {0}")]
    BadRef(#[from] RefnameError),
    #[error(transparent)]
    Stream(#[from] io::Error),
    #[error("{file:?}: cannot fetch delta body: {source}")]
    Body {
        file: PathBuf,
        #[source]
        source: CommandError,
    },
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("{command}: {status}")]
    Importer { command: String, status: ExitStatus },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run '{command}': {source}")]
    Spawn { command: String, source: io::Error },
    #[error("{command}: killed by signal")]
    Signal { command: String },
    #[error("{command}: returned exit status {status}\n{stderr}")]
    Status {
        command: String,
        status: i32,
        stderr: String,
    },
}

/// Runs a command to completion, capturing stdout. Some stderr output is
/// normal (warnings, etc.) and only reported at debug level.
fn run_tool(argv0: &[String], args: &[&OsStr]) -> Result<Vec<u8>, CommandError> {
    let command = argv0.join(" ");
    debug!("running command: {command}");
    let output = Command::new(&argv0[0])
        .args(&argv0[1..])
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| CommandError::Spawn {
            command: command.clone(),
            source,
        })?;
    if output.status.success() {
        if !output.stderr.is_empty() {
            debug!(
                "{command} stderr: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(output.stdout)
    } else {
        match output.status.code() {
            Some(status) => Err(CommandError::Status {
                command,
                status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            None => Err(CommandError::Signal { command }),
        }
    }
}

fn tool(name: &str, use_sccs: bool) -> Vec<String> {
    if use_sccs {
        vec!["sccs".to_string(), name.to_string()]
    } else {
        vec![name.to_string()]
    }
}

/// Returns the raw bytes of one revision of one SCCS file. A zero-length
/// body is valid and yields a deletion record.
pub trait BodyFetcher {
    fn fetch(&self, file: &Path, seqno: u32) -> Result<Vec<u8>, CommandError>;
}

/// Extracts revision bodies by running get(1).
pub struct SccsGet {
    argv0: Vec<String>,
    expand_keywords: bool,
}

impl SccsGet {
    pub fn new(config: &Config) -> SccsGet {
        SccsGet {
            argv0: tool("get", config.use_sccs),
            expand_keywords: config.expand_keywords,
        }
    }
}

impl BodyFetcher for SccsGet {
    fn fetch(&self, file: &Path, seqno: u32) -> Result<Vec<u8>, CommandError> {
        let seqno = OsString::from(format!("-a{seqno}"));
        let mut args: Vec<&OsStr> = vec![OsStr::new("-p"), OsStr::new("-s"), &seqno];
        if !self.expand_keywords {
            args.push(OsStr::new("-k"));
        }
        args.push(file.as_os_str());
        run_tool(&self.argv0, &args)
    }
}

/// Asks val(1) whether a file is a valid SCCS file. A missing tool is an
/// error; a rejected file is `false`.
fn val_ok(path: &Path, use_sccs: bool) -> Result<bool, CommandError> {
    match run_tool(&tool("val", use_sccs), &[path.as_os_str()]) {
        Ok(_) => Ok(true),
        Err(err @ CommandError::Spawn { .. }) => Err(err),
        Err(_) => Ok(false),
    }
}

/// Whether the destination git understands `original-oid`, which
/// git-fast-import learned in 2.21.0.
pub fn git_supports_original_oid() -> bool {
    let Ok(output) = run_tool(&["git".to_string()], &[OsStr::new("--version")]) else {
        return false;
    };
    let text = String::from_utf8_lossy(&output);
    let Some(version) = text.split_whitespace().last() else {
        return false;
    };
    let mut nums = version.split('.').map(|part| {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u32>().unwrap_or(0)
    });
    let major = nums.next().unwrap_or(0);
    let minor = nums.next().unwrap_or(0);
    major > 2 || (major == 2 && minor >= 21)
}

/// Where the stream goes: standard output, or the stdin of a spawned
/// `git fast-import`. The emitter owns the sink exclusively; a child is
/// always closed and awaited, on success and on error.
pub enum ImportSink {
    Stdout(io::Stdout),
    Child {
        command: String,
        stdin: Option<ChildStdin>,
        child: Child,
    },
}

impl ImportSink {
    pub fn stdout() -> ImportSink {
        ImportSink::Stdout(io::stdout())
    }

    pub fn git_fast_import() -> Result<ImportSink, ImportError> {
        let command = "git fast-import".to_string();
        let mut child = Command::new("git")
            .arg("fast-import")
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                command: command.clone(),
                source,
            })?;
        let stdin = child.stdin.take();
        Ok(ImportSink::Child {
            command,
            stdin,
            child,
        })
    }

    /// Closes the stream and, for a child process, awaits its exit. A
    /// nonzero exit is an import failure.
    pub fn finish(self) -> Result<(), ImportError> {
        match self {
            ImportSink::Stdout(mut out) => Ok(out.flush()?),
            ImportSink::Child {
                command,
                stdin,
                mut child,
            } => {
                drop(stdin);
                let status = child.wait()?;
                if status.success() {
                    info!("{command} completed successfully");
                    Ok(())
                } else {
                    Err(ImportError::Importer { command, status })
                }
            }
        }
    }
}

impl Write for ImportSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ImportSink::Stdout(out) => out.write(buf),
            ImportSink::Child {
                stdin: Some(stdin), ..
            } => stdin.write(buf),
            ImportSink::Child { stdin: None, .. } => Err(io::ErrorKind::BrokenPipe.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ImportSink::Stdout(out) => out.flush(),
            ImportSink::Child {
                stdin: Some(stdin), ..
            } => stdin.flush(),
            ImportSink::Child { stdin: None, .. } => Ok(()),
        }
    }
}

/// Writes the fast-import command stream. Marks are issued consecutively
/// from `:1`; only commits consume marks.
pub struct StreamEmitter<'a, W> {
    w: W,
    branch: &'a Refname,
    config: &'a Config,
    next_mark: Mark,
    parent: Option<Mark>,
    used_tags: HashMap<String, u32>,
}

impl<'a, W: Write> StreamEmitter<'a, W> {
    pub fn new(w: W, branch: &'a Refname, config: &'a Config) -> Self {
        StreamEmitter {
            w,
            branch,
            config,
            next_mark: Mark::FIRST,
            parent: None,
            used_tags: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    /// Start a new commit, parented on the previous one.
    fn begin_commit(&mut self, file: &SccsFile, delta: &Delta) -> io::Result<Mark> {
        let mark = self.next_mark;
        self.next_mark = mark.next();
        let oid;
        // fast-import ignores this directive, but filter processes which
        // operate on the stream before feeding it to fast-import may have
        // uses for this information.
        let original_oid = if self.config.original_oids {
            oid = format!("{}-{}-{}", file.path().display(), delta.sid, delta.seqno);
            Some(OriginalOid {
                oid: oid.as_bytes(),
            })
        } else {
            None
        };
        let message = delta.commit_message();
        Commit {
            branch: self.branch,
            mark,
            original_oid,
            committer: person(delta),
            message: message.as_bytes(),
            from: self.parent,
        }
        .dump(&mut self.w)?;
        self.parent = Some(mark);
        Ok(mark)
    }

    /// Write the filemodify or filedelete record for one delta's body.
    fn file_record(&mut self, file: &SccsFile, body: &[u8]) -> io::Result<()> {
        if body.is_empty() {
            FileDelete {
                path: file.git_name().as_bytes(),
            }
            .dump(&mut self.w)
        } else {
            FileModify {
                mode: file.git_mode(),
                path: file.git_name().as_bytes(),
                data: Data { data: body },
            }
            .dump(&mut self.w)
        }
    }

    fn complete_commit(&mut self) -> io::Result<()> {
        self.w.write_all(b"\n")
    }

    /// Write a tag for a finished SID level, pointing at the last commit of
    /// that level.
    fn write_tag(&mut self, pdelta: &Delta, from: Mark) -> io::Result<()> {
        let label = self.tag_label(pdelta.sid.level());
        debug!("new tag: {label} (for {})", pdelta.sid);
        let message = pdelta.commit_message();
        Tag {
            name: label.as_bytes(),
            from,
            tagger: person(pdelta),
            message: message.as_bytes(),
        }
        .dump(&mut self.w)
    }

    /// Allocate a label for a level. Levels are not always incremented
    /// consistently at release time, so a reused label grows a tag revision
    /// number rather than updating the same ref twice.
    fn tag_label(&mut self, level: u32) -> String {
        let base = format!("v{level}");
        match self.used_tags.get_mut(&base) {
            Some(trev) => {
                *trev += 1;
                format!("{base}.{trev}")
            }
            None => {
                self.used_tags.insert(base.clone(), 0);
                base
            }
        }
    }
}

fn person(delta: &Delta) -> PersonIdent<'_> {
    PersonIdent {
        ident: delta.identity.as_bytes(),
        when: When {
            unix_seconds: delta.timestamp,
            tz_offset: &delta.tz_offset,
        },
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ImportStats {
    pub deltas: usize,
    pub commits: usize,
}

/// Emits every commit group in order, fetching each member's body as it is
/// reached. Tags, when enabled, are written between the commit that closes a
/// SID level and the first commit of the next.
pub fn import_deltas<W: Write, F: BodyFetcher + ?Sized>(
    emitter: &mut StreamEmitter<'_, W>,
    files: &[SccsFile],
    groups: &[CommitGroup],
    fetcher: &F,
) -> Result<ImportStats, ImportError> {
    if groups.is_empty() {
        return Err(ImportError::NoDeltas);
    }
    let mut stats = ImportStats {
        deltas: 0,
        commits: 0,
    };
    let mut prev: Option<(Mark, DeltaRef)> = None;
    for group in groups {
        let first_ref = group.first();
        let first = first_ref.get(files);
        if let Some((pmark, pref)) = prev {
            let pdelta = pref.get(files);
            if emitter.config.do_tags
                && first.sid.level() > pdelta.sid.level()
                && first.sid.rev() == 1
            {
                emitter.write_tag(pdelta, pmark)?;
            }
        }
        let mark = emitter.begin_commit(&files[first_ref.file], first)?;
        stats.commits += 1;
        for r in &group.members {
            let file = &files[r.file];
            let delta = r.get(files);
            let body = fetcher
                .fetch(file.path(), delta.seqno)
                .map_err(|source| ImportError::Body {
                    file: file.path().to_path_buf(),
                    source,
                })?;
            emitter.file_record(file, &body)?;
            stats.deltas += 1;
        }
        emitter.complete_commit()?;
        prev = Some((mark, first_ref));
    }
    Ok(stats)
}

/// Import the indicated SCCS files into git.
pub fn run(
    config: &Config,
    paths: &[PathBuf],
    users: &mut AuthorResolver,
    to_stdout: bool,
) -> Result<(), ImportError> {
    // An unreadable argument aborts the run up front; only files the header
    // scan itself rejects are skipped.
    for path in paths {
        if !path.is_file() || File::open(path).is_err() {
            return Err(ImportError::Unreadable(path.clone()));
        }
    }

    info!("reading metadata from {} SCCS files", paths.len());
    let mut files = Vec::new();
    for path in paths {
        if config.use_val && !val_ok(path, config.use_sccs)? {
            warn!(
                "{}: not importing this file: not a valid SCCS file",
                path.display()
            );
            continue;
        }
        match SccsFile::read(path.clone(), users, config) {
            Ok(file) => files.push(file),
            Err(FileError::NotSccs(err)) => {
                warn!("{}: not importing this file: {err}", path.display());
            }
            Err(source) => {
                return Err(ImportError::File {
                    path: path.clone(),
                    source,
                })
            }
        }
    }

    let groups = aggregate::group_deltas(&files, config.fuzzy_window);
    let branch = Refname::new(config.import_ref.as_bytes(), false)?;
    let fetcher = SccsGet::new(config);
    let sink = if to_stdout {
        ImportSink::stdout()
    } else {
        ImportSink::git_fast_import()?
    };

    info!("creating commits");
    let mut emitter = StreamEmitter::new(sink, branch, config);
    let result = import_deltas(&mut emitter, &files, &groups, &fetcher);
    let sink = emitter.into_inner();
    match result {
        Ok(stats) => {
            sink.finish()?;
            info!("{} SCCS deltas in {} git commits", stats.deltas, stats.commits);
            Ok(())
        }
        Err(err) => {
            // Still close the pipe and reap the child on the error path.
            let _ = sink.finish();
            Err(err)
        }
    }
}
