//! Splits one input line into words for the command interpreter.

/// A part of a word: literal text or a variable reference to expand later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    /// Literal text that requires no further processing.
    Literal(String),
    /// Variable reference written as `$NAME`, `${NAME}` or `$?`. Holds the name.
    Param(String),
}

/// One whitespace-separated word, possibly built from several quoted pieces.
pub type Word = Vec<WordPart>;

/// Errors that can occur while splitting a line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated quote")]
    UnfinishedQuote,
    /// A closing brace for `${...}` was not found.
    #[error("unterminated variable reference")]
    UnfinishedParam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    current_word: Word,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            current_word: Vec::new(),
            buffer: String::new(),
        }
    }

    /// Runs the state machine over the whole line.
    fn make_words(&mut self) -> Result<Vec<Word>, LexError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch)?,
                LexingState::ReadingWord => self.handle_word(ch, &mut out)?,
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch)?,
            }
        }

        if matches!(
            self.state,
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote
        ) {
            return Err(LexError::UnfinishedQuote);
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_start(&mut self, ch: char) -> Result<(), LexError> {
        match ch {
            c if c.is_whitespace() => return Ok(()),
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '$' => {
                self.handle_dollar()?;
                self.state = LexingState::ReadingWord;
            }
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
        Ok(())
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Word>) -> Result<(), LexError> {
        match ch {
            c if c.is_whitespace() => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '$' => self.handle_dollar()?,
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => {
                // keep '' as an explicit empty part so it still forms a word
                self.current_word
                    .push(WordPart::Literal(std::mem::take(&mut self.buffer)));
                self.state = LexingState::ReadingWord;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) -> Result<(), LexError> {
        match ch {
            '"' => {
                self.current_word
                    .push(WordPart::Literal(std::mem::take(&mut self.buffer)));
                self.state = LexingState::ReadingWord;
            }
            '$' => self.handle_dollar()?,
            c => self.buffer.push(c),
        }
        Ok(())
    }

    /// Called after a `$` was read. Emits a [`WordPart::Param`] or keeps the `$`
    /// as literal text when no valid name follows.
    fn handle_dollar(&mut self) -> Result<(), LexError> {
        match self.peek_char() {
            Some('{') => {
                self.read_char();
                self.finalize_literal();
                let name = self.collect_braced()?;
                self.current_word.push(WordPart::Param(name));
            }
            Some('?') => {
                self.read_char();
                self.finalize_literal();
                self.current_word.push(WordPart::Param("?".to_string()));
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                self.finalize_literal();
                let mut name = String::new();
                while let Some(c) = self.peek_char() {
                    if !(c.is_alphanumeric() || c == '_') {
                        break;
                    }
                    name.push(c);
                    self.read_char();
                }
                self.current_word.push(WordPart::Param(name));
            }
            _ => self.buffer.push('$'),
        }
        Ok(())
    }

    fn collect_braced(&mut self) -> Result<String, LexError> {
        let mut s = String::new();
        while let Some(ch) = self.read_char() {
            if ch == '}' {
                return Ok(s);
            }
            s.push(ch);
        }
        Err(LexError::UnfinishedParam)
    }

    fn finalize_literal(&mut self) {
        if !self.buffer.is_empty() {
            self.current_word
                .push(WordPart::Literal(std::mem::take(&mut self.buffer)));
        }
    }

    fn finish_word(&mut self, out: &mut Vec<Word>) {
        self.finalize_literal();
        if !self.current_word.is_empty() {
            out.push(std::mem::take(&mut self.current_word));
        }
    }
}

/// Split `line` into words. A blank line yields no words.
pub fn split_into_words(line: &str) -> Result<Vec<Word>, LexError> {
    LexingFSM::new(line).make_words()
}
