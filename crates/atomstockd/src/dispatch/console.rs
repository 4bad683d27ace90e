//! Line framing for the interactive console.

use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd};

const CHUNK_BYTES: usize = 1024;

/// Lines produced by one console read.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ConsoleRead {
    pub(crate) lines: Vec<String>,
    pub(crate) closed: bool,
}

/// Console reader that buffers partial lines between reads.
///
/// The reader is read directly, one chunk per readiness event, so no line
/// can sit in a userspace buffer the poll set cannot see.
#[derive(Debug)]
pub(crate) struct ConsoleInput<C> {
    reader: C,
    pending: Vec<u8>,
    open: bool,
}

impl<C: Read + AsFd> ConsoleInput<C> {
    pub(crate) const fn new(reader: C) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            open: true,
        }
    }

    pub(crate) const fn is_open(&self) -> bool {
        self.open
    }

    /// Reads one chunk and returns the complete lines it finishes.
    ///
    /// End of input flushes an unterminated final line and closes the
    /// console. `WouldBlock` and `Interrupted` yield nothing.
    pub(crate) fn read_lines(&mut self) -> io::Result<ConsoleRead> {
        let mut chunk = [0_u8; CHUNK_BYTES];
        let read = match self.reader.read(&mut chunk) {
            Ok(read) => read,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(ConsoleRead::default());
            }
            Err(error) => {
                self.open = false;
                return Err(error);
            }
        };

        if read == 0 {
            self.open = false;
            let mut lines = Vec::new();
            if !self.pending.is_empty() {
                lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                self.pending.clear();
            }
            return Ok(ConsoleRead {
                lines,
                closed: true,
            });
        }

        self.pending
            .extend_from_slice(chunk.get(..read).unwrap_or_default());
        let mut lines = Vec::new();
        while let Some(position) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=position).collect();
            let text = String::from_utf8_lossy(&line);
            lines.push(text.trim_end_matches(['\n', '\r']).to_owned());
        }
        Ok(ConsoleRead {
            lines,
            closed: false,
        })
    }
}

impl<C: AsFd> AsFd for ConsoleInput<C> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.reader.as_fd()
    }
}
