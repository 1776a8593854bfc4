use std::io::{self, BufRead, Write};

/// The input and output endpoints shared by the command loop and the interpreter.
///
/// The loop only writes prompts and messages; the interpreter reads lines and
/// writes command output. Keeping both behind one trait lets an interactive
/// line editor and a plain pipe be swapped without touching either side.
pub trait Console {
    /// Show `prompt` and make sure it is visible before the next [`read_line`](Console::read_line).
    fn write_prompt(&mut self, prompt: &str) -> io::Result<()>;

    /// Read one line without its terminator. `Ok(None)` means end of input.
    ///
    /// A line that is not valid UTF-8 is consumed and reported as
    /// [`io::ErrorKind::InvalidData`]; the next call reads the following line.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Stream for regular output.
    fn output(&mut self) -> &mut dyn Write;

    /// Stream for diagnostics.
    fn error(&mut self) -> &mut dyn Write;
}

/// Console over plain streams: pipes, redirected files and in-memory buffers.
pub struct StreamConsole<R, W, E> {
    input: R,
    output: W,
    error: E,
}

impl<R: BufRead, W: Write, E: Write> StreamConsole<R, W, E> {
    pub fn new(input: R, output: W, error: E) -> Self {
        Self {
            input,
            output,
            error,
        }
    }
}

impl StreamConsole<io::StdinLock<'static>, io::Stdout, io::Stderr> {
    /// Console bound to the process standard streams.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout(), io::stderr())
    }
}

impl<R: BufRead, W: Write, E: Write> Console for StreamConsole<R, W, E> {
    fn write_prompt(&mut self, prompt: &str) -> io::Result<()> {
        self.output.write_all(prompt.as_bytes())?;
        self.output.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        if raw.ends_with(b"\n") {
            raw.pop();
            if raw.ends_with(b"\r") {
                raw.pop();
            }
        }
        String::from_utf8(raw)
            .map(Some)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }

    fn error(&mut self) -> &mut dyn Write {
        &mut self.error
    }
}
