use std::io::{self, Write};

use crate::command::{
    Commit, Data, FileDelete, FileModify, Mark, OriginalOid, PersonIdent, Tag,
};

/// Serialization of a record into the byte-exact form fast-import consumes.
pub trait Dump {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()>;
}

impl Dump for Mark {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "mark :{}\n", self.get())
    }
}

impl Dump for OriginalOid<'_> {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"original-oid ")?;
        w.write_all(self.oid)?;
        w.write_all(b"\n")
    }
}

impl Dump for PersonIdent<'_> {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(self.ident)?;
        write!(w, " {} {}\n", self.when.unix_seconds, self.when.tz_offset)
    }
}

impl Dump for Data<'_> {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "data {}\n", self.data.len())?;
        w.write_all(self.data)?;
        w.write_all(b"\n") // Optional LF
    }
}

impl Dump for Commit<'_> {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"commit ")?;
        w.write_all(self.branch.as_bytes())?;
        w.write_all(b"\n")?;
        self.mark.dump(w)?;
        self.original_oid.dump(w)?;
        w.write_all(b"committer ")?;
        self.committer.dump(w)?;
        Data { data: self.message }.dump(w)?;
        if let Some(from) = self.from {
            write!(w, "from :{}\n", from.get())?;
        }
        Ok(())
    }
}

impl Dump for FileModify<'_> {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "M {} inline ", self.mode.as_str())?;
        w.write_all(self.path)?;
        w.write_all(b"\n")?;
        self.data.dump(w)
    }
}

impl Dump for FileDelete<'_> {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"D ")?;
        w.write_all(self.path)?;
        w.write_all(b"\n")
    }
}

impl Dump for Tag<'_> {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"tag ")?;
        w.write_all(self.name)?;
        w.write_all(b"\n")?;
        write!(w, "from :{}\n", self.from.get())?;
        w.write_all(b"tagger ")?;
        self.tagger.dump(w)?;
        Data { data: self.message }.dump(w)
    }
}

impl<T: Dump> Dump for Option<T> {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if let Some(value) = self {
            value.dump(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::command::{FileMode, When};
    use crate::refs::Refname;

    use super::*;

    fn dump<T: Dump>(value: T) -> Vec<u8> {
        let mut buf = Vec::new();
        value.dump(&mut buf).unwrap();
        buf
    }

    fn ident<'a>(ident: &'a [u8], seconds: i64, offset: &'a str) -> PersonIdent<'a> {
        PersonIdent {
            ident,
            when: When {
                unix_seconds: seconds,
                tz_offset: offset,
            },
        }
    }

    #[test]
    fn data() {
        assert_eq!(
            dump(Data {
                data: b"Hello, world!",
            }),
            b"data 13\nHello, world!\n",
        );
        assert_eq!(dump(Data { data: b"" }), b"data 0\n\n");
    }

    #[test]
    fn person_ident() {
        assert_eq!(
            dump(ident(b"Jay Youngman <jay@gnu.org>", 1200826930, "+0100")),
            b"Jay Youngman <jay@gnu.org> 1200826930 +0100\n",
        );
    }

    #[test]
    fn commit() {
        let branch = Refname::new(b"refs/heads/master", false).unwrap();
        assert_eq!(
            dump(Commit {
                branch,
                mark: Mark::FIRST,
                original_oid: None,
                committer: ident(b"alice <alice>", 1200000000, "-0800"),
                message: b"initial\n",
                from: None,
            }),
            b"commit refs/heads/master\n\
              mark :1\n\
              committer alice <alice> 1200000000 -0800\n\
              data 8\ninitial\n\n"
                .as_slice(),
        );
    }

    #[test]
    fn commit_with_parent_and_oid() {
        let branch = Refname::new(b"refs/heads/import", false).unwrap();
        assert_eq!(
            dump(Commit {
                branch,
                mark: Mark::new(2).unwrap(),
                original_oid: Some(OriginalOid {
                    oid: b"SCCS/s.foo.c-1.2-2",
                }),
                committer: ident(b"bob <bob@example.net>", 1, "+0000"),
                message: b"",
                from: Some(Mark::FIRST),
            }),
            b"commit refs/heads/import\n\
              mark :2\n\
              original-oid SCCS/s.foo.c-1.2-2\n\
              committer bob <bob@example.net> 1 +0000\n\
              data 0\n\n\
              from :1\n"
                .as_slice(),
        );
    }

    #[test]
    fn file_change() {
        assert_eq!(
            dump(FileModify {
                mode: FileMode::Normal,
                path: b"lib/foo.c",
                data: Data { data: b"hello" },
            }),
            b"M 644 inline lib/foo.c\ndata 5\nhello\n".as_slice(),
        );
        assert_eq!(
            dump(FileModify {
                mode: FileMode::Executable,
                path: b"configure",
                data: Data { data: b"#!/bin/sh\n" },
            }),
            b"M 755 inline configure\ndata 10\n#!/bin/sh\n\n".as_slice(),
        );
        assert_eq!(
            dump(FileDelete { path: b"lib/foo.c" }),
            b"D lib/foo.c\n".as_slice(),
        );
    }

    #[test]
    fn tag() {
        assert_eq!(
            dump(Tag {
                name: b"v4",
                from: Mark::new(17).unwrap(),
                tagger: ident(b"carol <carol@example.net>", 100000000, "-0500"),
                message: b"release four\n",
            }),
            b"tag v4\n\
              from :17\n\
              tagger carol <carol@example.net> 100000000 -0500\n\
              data 13\nrelease four\n\n"
                .as_slice(),
        );
    }
}
