//! Open file handles, including the three standard streams.

use bitflags::bitflags;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

bitflags! {
    /// Mirrors the original runtime's `PS_FILE_*` open-mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileFlags: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const APPEND = 0x04;
        const BINARY = 0x08;
        const STD = 0x10;
    }
}

/// The underlying stream a [`PsFile`] wraps.
enum Stream {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
    Stdin(io::Stdin),
    Stdout(io::Stdout),
    Stderr(io::Stderr),
}

/// An open file or standard stream.
pub struct PsFile {
    stream: Stream,
    pub flags: FileFlags,
    pub closed: bool,
    pub at_start: bool,
}

impl std::fmt::Debug for PsFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PsFile")
            .field("flags", &self.flags)
            .field("closed", &self.closed)
            .field("at_start", &self.at_start)
            .finish()
    }
}

impl PsFile {
    pub fn open_read(path: &str, binary: bool) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut flags = FileFlags::READ;
        if binary {
            flags |= FileFlags::BINARY;
        }
        Ok(PsFile {
            stream: Stream::Reader(BufReader::new(file)),
            flags,
            closed: false,
            at_start: true,
        })
    }

    pub fn open_write(path: &str, append: bool, binary: bool) -> io::Result<Self> {
        let file = if append {
            File::options().create(true).append(true).open(path)?
        } else {
            File::create(path)?
        };
        let mut flags = FileFlags::WRITE;
        if append {
            flags |= FileFlags::APPEND;
        }
        if binary {
            flags |= FileFlags::BINARY;
        }
        Ok(PsFile {
            stream: Stream::Writer(BufWriter::new(file)),
            flags,
            closed: false,
            at_start: true,
        })
    }

    pub fn stdin() -> Self {
        PsFile {
            stream: Stream::Stdin(io::stdin()),
            flags: FileFlags::READ | FileFlags::STD,
            closed: false,
            at_start: true,
        }
    }

    pub fn stdout() -> Self {
        PsFile {
            stream: Stream::Stdout(io::stdout()),
            flags: FileFlags::WRITE | FileFlags::STD,
            closed: false,
            at_start: true,
        }
    }

    pub fn stderr() -> Self {
        PsFile {
            stream: Stream::Stderr(io::stderr()),
            flags: FileFlags::WRITE | FileFlags::STD,
            closed: false,
            at_start: true,
        }
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if !bytes.is_empty() {
            self.at_start = false;
        }
        match &mut self.stream {
            Stream::Writer(w) => w.write_all(bytes),
            Stream::Stdout(w) => w.write_all(bytes),
            Stream::Stderr(w) => w.write_all(bytes),
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "file is not open for writing",
            )),
        }
    }

    pub fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let n = match &mut self.stream {
            Stream::Reader(r) => r.read_to_end(&mut buf),
            Stream::Stdin(r) => r.read_to_end(&mut buf),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "file is not open for reading",
                ))
            }
        }?;
        if n > 0 {
            self.at_start = false;
        }
        Ok(buf)
    }

    /// Marks the handle closed. Standard streams are process-wide and
    /// forbid `close` (spec §5: "Values wrapping them carry a `STD` flag
    /// that forbids `close`").
    pub fn close(&mut self) -> Result<(), crate::error::RuntimeError> {
        if self.flags.contains(FileFlags::STD) {
            return Err(crate::error::RuntimeError::TypeError(
                "cannot close a standard stream".into(),
            ));
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_flags_are_write_and_std() {
        let f = PsFile::stdout();
        assert!(f.flags.contains(FileFlags::WRITE));
        assert!(f.flags.contains(FileFlags::STD));
    }

    #[test]
    fn write_to_stdin_handle_is_unsupported() {
        let mut f = PsFile::stdin();
        assert!(f.write_all(b"x").is_err());
    }

    #[test]
    fn closing_a_standard_stream_is_forbidden() {
        let mut f = PsFile::stdout();
        assert!(f.close().is_err());
        assert!(!f.closed);
    }
}
