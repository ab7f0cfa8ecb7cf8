use crate::error::CompileError;
use crate::table::LexicalTable;
use crate::token::{TerminalKind, Token};
use crate::tokenizer::Tokenizer;

/// Lookahead buffer over the tokenizer. Comment tokens are diverted into a
/// side list so the parser never sees them.
#[derive(Debug)]
pub struct Lexer<K> {
    tokens: Vec<Token<K>>,
    comments: Vec<Token<K>>,
    index: usize,
}

impl<K: TerminalKind> Lexer<K> {
    pub fn new(table: &LexicalTable<K>, input: &str) -> Result<Self, CompileError> {
        let mut tokenizer = Tokenizer::new(table, input);
        let mut tokens = Vec::new();
        let mut comments = Vec::new();
        loop {
            let token = tokenizer.next_token()?;
            if token.kind == K::eof() {
                break;
            }
            if token.kind == K::comment() {
                comments.push(token);
            } else {
                tokens.push(token);
            }
        }
        Ok(Self {
            tokens,
            comments,
            index: 0,
        })
    }

    pub fn take(&mut self) -> Option<&Token<K>> {
        let token = self.tokens.get(self.index);
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    pub fn peek(&self) -> Option<&Token<K>> {
        self.tokens.get(self.index)
    }

    pub fn lookahead(&self, n: usize) -> Option<&Token<K>> {
        self.tokens.get(self.index + n)
    }

    pub fn previous(&self) -> Option<&Token<K>> {
        self.index.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.index
    }

    pub fn comments(&self) -> &[Token<K>] {
        &self.comments
    }
}
