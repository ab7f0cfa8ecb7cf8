use crate::span::SourceRange;

/// The tokenizer's hooks into a grammar's terminal-kind enum; each grammar
/// sharing the tokenizer supplies its own.
pub trait TerminalKind: Copy + Eq + std::fmt::Debug {
    fn identifier() -> Self;
    fn string() -> Self;
    fn integer() -> Self;
    fn long() -> Self;
    fn comment() -> Self;
    fn eof() -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<K> {
    pub kind: K,
    pub range: SourceRange,
    pub lexeme: String,
}

impl<K> Token<K> {
    pub fn new(kind: K, range: SourceRange, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            range,
            lexeme: lexeme.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    // Literals and names.
    Identifier,
    String,
    Integer,
    Long,
    Bool,

    // Keywords.
    If,
    Else,
    While,
    Do,
    Break,
    Continue,
    Return,
    Case,
    Default,
    Define, // def_<type>
    Switch, // switch_<type>

    // Separators.
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dollar,
    Tilde,

    // Operators. `%` doubles as the global-variable sigil; the parser
    // disambiguates by position.
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    And,
    Or,

    // Misc.
    Comment,
    Eof,
}

impl TerminalKind for Kind {
    fn identifier() -> Self {
        Kind::Identifier
    }

    fn string() -> Self {
        Kind::String
    }

    fn integer() -> Self {
        Kind::Integer
    }

    fn long() -> Self {
        Kind::Long
    }

    fn comment() -> Self {
        Kind::Comment
    }

    fn eof() -> Self {
        Kind::Eof
    }
}
