use rustc_hash::FxHashMap;

use crate::token::Kind;
use crate::types::PrimitiveType;

/// Fixed spellings of one grammar: keywords, separators, operators.
#[derive(Debug, Default)]
pub struct LexicalTable<K> {
    keywords: FxHashMap<String, K>,
    separators: FxHashMap<char, K>,
    operators: FxHashMap<String, K>,
    operator_starts: Vec<char>,
    operator_size: usize,
}

impl<K: Copy> LexicalTable<K> {
    pub fn new() -> Self {
        Self {
            keywords: FxHashMap::default(),
            separators: FxHashMap::default(),
            operators: FxHashMap::default(),
            operator_starts: Vec::new(),
            operator_size: 0,
        }
    }

    pub fn register_keyword(&mut self, word: &str, kind: K) {
        let word = word.to_ascii_lowercase();
        assert!(
            self.keywords.insert(word.clone(), kind).is_none(),
            "keyword '{word}' registered twice"
        );
    }

    pub fn register_separator(&mut self, character: char, kind: K) {
        assert!(
            self.separators.insert(character, kind).is_none(),
            "separator '{character}' registered twice"
        );
    }

    pub fn register_operator(&mut self, sequence: &str, kind: K) {
        assert!(!sequence.is_empty(), "operator sequence must be non-empty");
        assert!(
            self.operators.insert(sequence.to_owned(), kind).is_none(),
            "operator '{sequence}' registered twice"
        );
        let start = sequence.chars().next().unwrap();
        if !self.operator_starts.contains(&start) {
            self.operator_starts.push(start);
        }
        self.operator_size = self.operator_size.max(sequence.len());
    }

    pub fn lookup_keyword(&self, word: &str) -> Option<K> {
        self.keywords.get(&word.to_ascii_lowercase()).copied()
    }

    pub fn lookup_separator(&self, character: char) -> Option<K> {
        self.separators.get(&character).copied()
    }

    pub fn lookup_operator(&self, sequence: &str) -> Option<K> {
        self.operators.get(sequence).copied()
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains_key(&word.to_ascii_lowercase())
    }

    pub fn is_operator_start(&self, character: char) -> bool {
        self.operator_starts.contains(&character)
    }

    // Bound for the tokenizer's longest-match scan.
    pub fn operator_size(&self) -> usize {
        self.operator_size
    }
}

pub fn script_table() -> LexicalTable<Kind> {
    let mut table = LexicalTable::new();
    table.register_keyword("true", Kind::Bool);
    table.register_keyword("false", Kind::Bool);
    table.register_keyword("if", Kind::If);
    table.register_keyword("else", Kind::Else);
    table.register_keyword("while", Kind::While);
    table.register_keyword("do", Kind::Do);
    table.register_keyword("break", Kind::Break);
    table.register_keyword("continue", Kind::Continue);
    table.register_keyword("return", Kind::Return);
    table.register_keyword("case", Kind::Case);
    table.register_keyword("default", Kind::Default);
    for primitive in PrimitiveType::ALL {
        if primitive.is_declarable() {
            table.register_keyword(&format!("def_{}", primitive.representation()), Kind::Define);
        }
        if primitive.stack_type() == Some(crate::types::StackType::Int) {
            table.register_keyword(
                &format!("switch_{}", primitive.representation()),
                Kind::Switch,
            );
        }
    }

    table.register_separator('(', Kind::LParen);
    table.register_separator(')', Kind::RParen);
    table.register_separator('[', Kind::LBracket);
    table.register_separator(']', Kind::RBracket);
    table.register_separator('{', Kind::LBrace);
    table.register_separator('}', Kind::RBrace);
    table.register_separator(',', Kind::Comma);
    table.register_separator(':', Kind::Colon);
    table.register_separator(';', Kind::Semicolon);
    table.register_separator('$', Kind::Dollar);
    table.register_separator('~', Kind::Tilde);

    table.register_operator("=", Kind::Equals);
    table.register_operator("!", Kind::NotEquals);
    table.register_operator("<", Kind::LessThan);
    table.register_operator(">", Kind::GreaterThan);
    table.register_operator("<=", Kind::LessThanOrEqual);
    table.register_operator(">=", Kind::GreaterThanOrEqual);
    table.register_operator("+", Kind::Plus);
    table.register_operator("-", Kind::Minus);
    table.register_operator("*", Kind::Star);
    table.register_operator("/", Kind::Slash);
    table.register_operator("%", Kind::Percent);
    table.register_operator("&", Kind::And);
    table.register_operator("|", Kind::Or);
    table
}
