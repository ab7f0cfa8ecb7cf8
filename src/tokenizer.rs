use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{CompileError, ErrorKind, Phase};
use crate::span::{Position, SourceRange};
use crate::table::LexicalTable;
use crate::token::{TerminalKind, Token};

/// Hand-written tokenizer over a character stream and a lexical table,
/// generic over the grammar's terminal kind.
pub struct Tokenizer<'t, 'a, K> {
    table: &'t LexicalTable<K>,
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'t, 'a, K: TerminalKind> Tokenizer<'t, 'a, K> {
    pub fn new(table: &'t LexicalTable<K>, input: &'a str) -> Self {
        Self {
            table,
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    pub fn next_token(&mut self) -> Result<Token<K>, CompileError> {
        self.skip_whitespace();

        let start = self.position();
        let (start_idx, ch) = match self.chars.peek() {
            Some(&(idx, c)) => (idx, c),
            None => {
                return Ok(Token::new(K::eof(), SourceRange::new(start, start), ""));
            }
        };

        if is_identifier_start(ch) {
            return Ok(self.read_identifier(start, start_idx));
        }
        if ch == '"' {
            return self.read_string(start);
        }
        if ch.is_ascii_digit() || ((ch == '-' || ch == '+') && self.next_is_digit(start_idx, ch)) {
            return self.read_number(start);
        }
        if ch == '/' {
            match self.peek_second(start_idx) {
                Some('/') => return Ok(self.read_line_comment(start)),
                Some('*') => return self.read_block_comment(start),
                _ => {}
            }
        }
        if let Some(kind) = self.table.lookup_separator(ch) {
            self.advance_char();
            return Ok(Token::new(kind, self.range_from(start), ch.to_string()));
        }
        if self.table.is_operator_start(ch) {
            return self.read_operator(start);
        }

        self.advance_char();
        Err(self.error(start, format!("Unexpected character: {ch}")))
    }

    fn read_identifier(&mut self, start: Position, start_idx: usize) -> Token<K> {
        self.advance_char();
        while let Some(&(_, c)) = self.chars.peek() {
            if is_identifier_part(c) {
                self.advance_char();
            } else {
                break;
            }
        }
        let word = &self.input[start_idx..self.current_index()];
        let kind = self.table.lookup_keyword(word).unwrap_or_else(K::identifier);
        Token::new(kind, self.range_from(start), word)
    }

    fn read_string(&mut self, start: Position) -> Result<Token<K>, CompileError> {
        self.advance_char(); // opening quote
        let mut content = String::new();
        loop {
            let ch = match self.chars.peek() {
                Some(&(_, c)) => c,
                None => {
                    return Err(self.error(
                        start,
                        "String literal is not properly closed by a double-quote",
                    ));
                }
            };
            match ch {
                '\n' => {
                    return Err(self.error(
                        start,
                        "String literal is not properly closed by a double-quote",
                    ));
                }
                '"' => {
                    self.advance_char();
                    return Ok(Token::new(K::string(), self.range_from(start), content));
                }
                '\\' => {
                    self.advance_char();
                    let escaped = self.advance_char().map(|(_, c)| c);
                    match escaped {
                        Some('n') => content.push('\n'),
                        Some('t') => content.push('\t'),
                        Some('"') => content.push('"'),
                        Some('\\') => content.push('\\'),
                        Some('<') => content.push('<'),
                        Some('>') => content.push('>'),
                        _ => {
                            return Err(self.error(
                                start,
                                "Invalid escape sequence (valid ones are \\n \\t \\\" \\\\ \\< \\>)",
                            ));
                        }
                    }
                }
                _ => {
                    self.advance_char();
                    content.push(ch);
                }
            }
        }
    }

    fn read_number(&mut self, start: Position) -> Result<Token<K>, CompileError> {
        let start_idx = self.current_index();
        self.advance_char(); // first digit or sign
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }
        let digits = self.input[start_idx..self.current_index()].to_owned();
        // A trailing L marks a 64-bit literal; the suffix is not part of
        // the lexeme.
        let long = matches!(self.chars.peek(), Some(&(_, 'L')) | Some(&(_, 'l')));
        if long {
            self.advance_char();
            if digits.parse::<i64>().is_err() {
                return Err(self.error(
                    start,
                    format!("The literal {digits} of type long is out of range"),
                ));
            }
            return Ok(Token::new(K::long(), self.range_from(start), digits));
        }
        if digits.parse::<i32>().is_err() {
            return Err(self.error(
                start,
                format!("The literal {digits} of type int is out of range"),
            ));
        }
        Ok(Token::new(K::integer(), self.range_from(start), digits))
    }

    fn read_line_comment(&mut self, start: Position) -> Token<K> {
        self.advance_char(); // '/'
        self.advance_char(); // '/'
        let mut content = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.advance_char();
            content.push(c);
        }
        Token::new(K::comment(), self.range_from(start), content.trim())
    }

    fn read_block_comment(&mut self, start: Position) -> Result<Token<K>, CompileError> {
        self.advance_char(); // '/'
        self.advance_char(); // '*'
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        loop {
            let ch = match self.advance_char() {
                Some((_, c)) => c,
                None => return Err(self.error(start, "Unexpected end of comment")),
            };
            match ch {
                '\n' => {
                    let line = trim_comment_line(&current);
                    // The header line after /* is dropped when empty.
                    if !lines.is_empty() || !line.is_empty() {
                        lines.push(line);
                    }
                    current.clear();
                }
                '*' if matches!(self.chars.peek(), Some(&(_, '/'))) => {
                    self.advance_char();
                    let line = trim_comment_line(&current);
                    if !line.is_empty() {
                        lines.push(line);
                    }
                    return Ok(Token::new(
                        K::comment(),
                        self.range_from(start),
                        lines.join("\n"),
                    ));
                }
                _ => current.push(ch),
            }
        }
    }

    fn read_operator(&mut self, start: Position) -> Result<Token<K>, CompileError> {
        // Longest-match scan bounded by the table's longest operator.
        let start_idx = self.current_index();
        let mut candidate = String::new();
        for (_, c) in self.chars.clone().take(self.table.operator_size()) {
            candidate.push(c);
        }
        while !candidate.is_empty() {
            if let Some(kind) = self.table.lookup_operator(&candidate) {
                for _ in 0..candidate.chars().count() {
                    self.advance_char();
                }
                return Ok(Token::new(kind, self.range_from(start), candidate));
            }
            candidate.pop();
        }
        let ch = self.input[start_idx..].chars().next().unwrap_or('\0');
        self.advance_char();
        Err(self.error(start, format!("Unexpected character: {ch}")))
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn next_is_digit(&mut self, start_idx: usize, ch: char) -> bool {
        self.input[start_idx + ch.len_utf8()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn peek_second(&self, start_idx: usize) -> Option<char> {
        self.input[start_idx..].chars().nth(1)
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn range_from(&self, start: Position) -> SourceRange {
        SourceRange::new(start, self.position())
    }

    fn error(&self, start: Position, message: impl Into<String>) -> CompileError {
        CompileError::new(
            Phase::Lex,
            ErrorKind::Lexical,
            self.range_from(start),
            message,
        )
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn trim_comment_line(line: &str) -> String {
    let trimmed = line.trim();
    // Block comment bodies conventionally lead each line with a star.
    trimmed.strip_prefix('*').map(str::trim).unwrap_or(trimmed).to_owned()
}
