use std::cell::RefCell;
use std::io::{Cursor, Read, Result as IoResult, Write};
use std::rc::Rc;

/// Memory-backed reader, e.g. for scripted console input.
pub struct MemReader {
    cursor: Cursor<Vec<u8>>,
}

impl MemReader {
    /// Create a MemReader that will read from the provided buffer.
    pub fn new(buf: impl Into<Vec<u8>>) -> Self {
        Self {
            cursor: Cursor::new(buf.into()),
        }
    }
}

impl Read for MemReader {
    fn read(&mut self, out: &mut [u8]) -> IoResult<usize> {
        self.cursor.read(out)
    }
}

/// Memory-backed writer that only publishes bytes on `flush`.
///
/// Written bytes sit in a private buffer until [`Write::flush`] moves them to
/// the shared handle, the same way a buffered terminal only shows what was
/// flushed. Readers of the handle therefore see exactly the visible output.
pub struct MemWriter {
    pending: Vec<u8>,
    flushed: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            flushed: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Return the shared handle holding every flushed byte.
    pub fn handle(&self) -> Rc<RefCell<Vec<u8>>> {
        self.flushed.clone()
    }

    /// Convenience: create writer and return (writer, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.handle();
        (mw, rc)
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.pending.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        self.flushed.borrow_mut().append(&mut self.pending);
        Ok(())
    }
}

impl Drop for MemWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
