//! End-to-end scenarios: synthetic SCCS files are parsed, grouped, and
//! emitted with an in-memory body fetcher, and the resulting stream bytes
//! are checked.

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use bstr::ByteSlice;
use fast_import::Refname;
use git_sccsimport::{
    aggregate,
    authors::{AuthorResolver, UserInfo},
    config::Config,
    import::{import_deltas, BodyFetcher, CommandError, StreamEmitter},
    sccs::SccsFile,
    timestamp::Zone,
};

/// The importer resolves repository names from paths relative to the working
/// directory, so each scenario runs inside its own temporary tree.
static CWD_LOCK: Mutex<()> = Mutex::new(());

fn in_tree<T>(f: impl FnOnce() -> T) -> T {
    let _guard = CWD_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let old = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    let result = f();
    env::set_current_dir(old).unwrap();
    result
}

struct TestDelta<'a> {
    sid: &'a str,
    date: &'a str,
    time: &'a str,
    committer: &'a str,
    seqno: u32,
    parent: u32,
    comment: &'a str,
    mrs: &'a [&'a str],
}

impl Default for TestDelta<'_> {
    fn default() -> Self {
        TestDelta {
            sid: "1.1",
            date: "08/01/20",
            time: "12:30:45",
            committer: "alice",
            seqno: 1,
            parent: 0,
            comment: "initial",
            mrs: &[],
        }
    }
}

fn write_sccs(rel: &str, deltas: &[TestDelta<'_>]) {
    if let Some(parent) = Path::new(rel).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).unwrap();
        }
    }
    let mut contents = b"\x01h00000\n\x01s 00001/00000/00000\n".to_vec();
    for d in deltas {
        contents.extend_from_slice(
            format!(
                "\x01d D {} {} {} {} {} {}\n",
                d.sid, d.date, d.time, d.committer, d.seqno, d.parent
            )
            .as_bytes(),
        );
        for mr in d.mrs {
            contents.extend_from_slice(format!("\x01m {mr}\n").as_bytes());
        }
        contents.extend_from_slice(format!("\x01c {}\n", d.comment).as_bytes());
        contents.extend_from_slice(b"\x01e\n");
    }
    contents.extend_from_slice(b"\x01u\n\x01U\n\x01t\n\x01T\n");
    fs::write(rel, contents).unwrap();
}

fn users() -> AuthorResolver {
    let mut map = HashMap::new();
    for (login, identity) in [
        ("alice", "Alice Example <alice@example.com>"),
        ("bob", "Bob Example <bob@example.com>"),
        ("carol", "Carol Example <carol@example.com>"),
    ] {
        map.insert(
            login.to_string(),
            UserInfo {
                login: login.to_string(),
                identity: identity.to_string(),
                zone: None,
            },
        );
    }
    AuthorResolver::new(map, None)
}

fn config() -> Config {
    Config {
        default_zone: Some(Zone::parse("-0800").unwrap()),
        ..Config::default()
    }
}

fn read_files(paths: &[&str], config: &Config) -> Vec<SccsFile> {
    let mut users = users();
    paths
        .iter()
        .map(|p| SccsFile::read(PathBuf::from(p), &mut users, config).unwrap())
        .collect()
}

#[derive(Default)]
struct MapFetcher {
    bodies: HashMap<(PathBuf, u32), Vec<u8>>,
}

impl MapFetcher {
    fn body(mut self, file: &str, seqno: u32, body: &[u8]) -> Self {
        self.bodies.insert((PathBuf::from(file), seqno), body.to_vec());
        self
    }
}

impl BodyFetcher for MapFetcher {
    fn fetch(&self, file: &Path, seqno: u32) -> Result<Vec<u8>, CommandError> {
        Ok(self
            .bodies
            .get(&(file.to_path_buf(), seqno))
            .cloned()
            .unwrap_or_default())
    }
}

fn emit(files: &[SccsFile], config: &Config, fetcher: &MapFetcher) -> Vec<u8> {
    let groups = aggregate::group_deltas(files, config.fuzzy_window);
    let branch = Refname::new(config.import_ref.as_bytes(), false).unwrap();
    let mut emitter = StreamEmitter::new(Vec::new(), branch, config);
    import_deltas(&mut emitter, files, &groups, fetcher).unwrap();
    emitter.into_inner()
}

fn count(stream: &[u8], needle: &str) -> usize {
    stream.find_iter(needle.as_bytes()).count()
}

// S1: one file, one delta, exact stream bytes.
#[test]
fn basic_delta() {
    let stream = in_tree(|| {
        write_sccs("SCCS/s.foo.c", &[TestDelta::default()]);
        let config = config();
        let files = read_files(&["SCCS/s.foo.c"], &config);
        let fetcher = MapFetcher::default().body("SCCS/s.foo.c", 1, b"hello");
        emit(&files, &config, &fetcher)
    });
    // 2008-01-20T12:30:45-08:00
    let expected = "commit refs/heads/master\n\
                    mark :1\n\
                    committer Alice Example <alice@example.com> 1200861045 -0800\n\
                    data 8\ninitial\n\n\
                    M 644 inline foo.c\n\
                    data 5\nhello\n\
                    \n";
    assert_eq!(stream.as_bstr(), expected.as_bytes().as_bstr());
}

// S2: two files with matching metadata inside the window fuse into one
// commit, in timestamp order.
#[test]
fn fuzzy_coalescing() {
    let stream = in_tree(|| {
        let delta = |time| TestDelta {
            time,
            committer: "bob",
            comment: "refactor",
            ..TestDelta::default()
        };
        write_sccs("s.b", &[delta("12:01:00")]);
        write_sccs("s.a", &[delta("12:00:00")]);
        let config = Config {
            fuzzy_window: 300.0,
            ..config()
        };
        let files = read_files(&["s.b", "s.a"], &config);
        let fetcher = MapFetcher::default()
            .body("s.a", 1, b"aa")
            .body("s.b", 1, b"bb");
        emit(&files, &config, &fetcher)
    });
    assert_eq!(count(&stream, "commit "), 1);
    assert_eq!(count(&stream, "M 644 inline "), 2);
    let a = stream.find(b"M 644 inline a\n").unwrap();
    let b = stream.find(b"M 644 inline b\n").unwrap();
    assert!(a < b, "earlier delta must come first");
}

// S3: empty comments never fuse, even with identical metadata.
#[test]
fn empty_comment_isolation() {
    let stream = in_tree(|| {
        let delta = |time| TestDelta {
            time,
            committer: "bob",
            comment: "",
            ..TestDelta::default()
        };
        write_sccs("s.a", &[delta("12:00:00")]);
        write_sccs("s.b", &[delta("12:00:10")]);
        let config = Config {
            fuzzy_window: 300.0,
            ..config()
        };
        let files = read_files(&["s.a", "s.b"], &config);
        let fetcher = MapFetcher::default()
            .body("s.a", 1, b"aa")
            .body("s.b", 1, b"bb");
        emit(&files, &config, &fetcher)
    });
    assert_eq!(count(&stream, "commit "), 2);
    // The empty comments produce empty commit messages.
    assert_eq!(count(&stream, "data 0\n"), 2);
    assert!(stream.contains_str("from :1\n"));
}

// S4: a SID level transition tags the last commit of the closed level,
// between the two commits.
#[test]
fn sid_level_tags() {
    let stream = in_tree(|| {
        let delta = |sid, date, seqno, parent, comment| TestDelta {
            sid,
            date,
            seqno,
            parent,
            comment,
            ..TestDelta::default()
        };
        write_sccs(
            "s.rel",
            &[
                delta("1.1", "08/01/20", 1, 0, "one"),
                delta("1.2", "08/01/21", 2, 1, "two"),
                delta("2.1", "08/01/22", 3, 2, "three"),
                delta("2.5", "08/01/23", 4, 3, "four"),
                delta("3.1", "08/01/24", 5, 4, "five"),
            ],
        );
        let config = config();
        let files = read_files(&["s.rel"], &config);
        emit(&files, &config, &MapFetcher::default().body("s.rel", 1, b"x"))
    });
    let marks: Vec<usize> = (1..=5)
        .map(|n| stream.find(format!("mark :{n}\n").as_bytes()).unwrap())
        .collect();
    assert!(marks.windows(2).all(|w| w[0] < w[1]));

    // v1 tags the 1.2 commit (mark 2), after it and before the 2.1 commit.
    let v1 = stream.find(b"tag v1\nfrom :2\n").unwrap();
    assert!(marks[1] < v1 && v1 < marks[2]);
    assert!(stream[v1..].starts_with_str("tag v1\nfrom :2\ntagger Alice Example"));
    // The tag message is the tagged delta's commit message.
    assert!(stream[v1..marks[2]].contains_str("data 4\ntwo\n"));

    // v2 tags the 2.5 commit (mark 4) before the 3.1 commit.
    let v2 = stream.find(b"tag v2\nfrom :4\n").unwrap();
    assert!(marks[3] < v2 && v2 < marks[4]);

    // No other tags appear.
    assert_eq!(count(&stream, "tag v"), 2);
}

// S4 with tags disabled.
#[test]
fn no_tags() {
    let stream = in_tree(|| {
        let delta = |sid, date, seqno, parent, comment| TestDelta {
            sid,
            date,
            seqno,
            parent,
            comment,
            ..TestDelta::default()
        };
        write_sccs(
            "s.rel",
            &[
                delta("1.1", "08/01/20", 1, 0, "one"),
                delta("2.1", "08/01/22", 2, 1, "two"),
            ],
        );
        let config = Config {
            do_tags: false,
            ..config()
        };
        let files = read_files(&["s.rel"], &config);
        emit(&files, &config, &MapFetcher::default())
    });
    assert_eq!(count(&stream, "tag v"), 0);
}

// S5: a zero-length body becomes a deletion record with no data section.
#[test]
fn deleted_content() {
    let stream = in_tree(|| {
        write_sccs("s.gone", &[TestDelta::default()]);
        let config = config();
        let files = read_files(&["s.gone"], &config);
        emit(&files, &config, &MapFetcher::default())
    });
    assert!(stream.contains_str("D gone\n"));
    assert_eq!(count(&stream, "M 644"), 0);
    // Only the commit message carries a data section.
    assert_eq!(count(&stream, "data "), 1);
}

// S6: a single-component SID is rejected with a diagnostic; the rest of the
// file imports.
#[test]
fn invalid_sid_rejection() {
    let (deltas, stream) = in_tree(|| {
        write_sccs(
            "s.mixed",
            &[
                TestDelta {
                    sid: "1",
                    ..TestDelta::default()
                },
                TestDelta {
                    sid: "1.1",
                    seqno: 2,
                    parent: 1,
                    ..TestDelta::default()
                },
            ],
        );
        let config = config();
        let files = read_files(&["s.mixed"], &config);
        let stream = emit(&files, &config, &MapFetcher::default().body("s.mixed", 2, b"y"));
        (files[0].deltas().len(), stream)
    });
    assert_eq!(deltas, 1);
    assert_eq!(count(&stream, "commit "), 1);
    assert!(stream.contains_str("M 644 inline mixed\n"));
}

// Issue trailers are appended to the commit message for MRs.
#[test]
fn mr_issue_trailer() {
    let stream = in_tree(|| {
        write_sccs(
            "s.mr",
            &[TestDelta {
                comment: "fix overflow",
                mrs: &["42", "17"],
                ..TestDelta::default()
            }],
        );
        let config = config();
        let files = read_files(&["s.mr"], &config);
        emit(&files, &config, &MapFetcher::default().body("s.mr", 1, b"z"))
    });
    let message = "fix overflow\n\nIssues: #42, #17";
    assert!(stream.contains_str(&format!("data {}\n{message}\n", message.len())));
}

// Commits are parented in a single chain: every `from` refers to the
// previous mark.
#[test]
fn linear_parentage() {
    let stream = in_tree(|| {
        let delta = |sid, date, seqno, parent, comment| TestDelta {
            sid,
            date,
            seqno,
            parent,
            comment,
            ..TestDelta::default()
        };
        write_sccs(
            "s.chain",
            &[
                delta("1.1", "08/01/20", 1, 0, "one"),
                delta("1.2", "08/01/21", 2, 1, "two"),
                delta("1.3", "08/01/22", 3, 2, "three"),
            ],
        );
        let config = config();
        let files = read_files(&["s.chain"], &config);
        emit(&files, &config, &MapFetcher::default().body("s.chain", 2, b"q"))
    });
    assert_eq!(count(&stream, "commit "), 3);
    assert!(stream.contains_str("from :1\n"));
    assert!(stream.contains_str("from :2\n"));
    assert!(!stream.contains_str("from :3\n"));
}
