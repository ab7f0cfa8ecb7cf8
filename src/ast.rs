use crate::span::SourceRange;
use crate::symbol::{VariableDomain, VariableInfo};
use crate::token::Kind;
use crate::types::{PrimitiveType, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub range: SourceRange,
    pub text: String,
}

impl Identifier {
    pub fn new(range: SourceRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub range: SourceRange,
    pub ty: PrimitiveType,
    pub name: Identifier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub range: SourceRange,
    pub trigger: Identifier,
    pub name: Identifier,
    pub parameters: Vec<Parameter>,
    pub returns: Type,
    pub body: Vec<Stmt>,
}

impl Script {
    // The canonical "[trigger,name]" spelling.
    pub fn full_name(&self) -> String {
        format!("[{},{}]", self.trigger.text, self.name.text)
    }
}

// All precedence levels associate to the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl Operator {
    // Higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Equal | Operator::NotEqual => 3,
            Operator::LessThan
            | Operator::GreaterThan
            | Operator::LessThanOrEqual
            | Operator::GreaterThanOrEqual => 4,
            Operator::Add | Operator::Subtract => 5,
            Operator::Multiply | Operator::Divide | Operator::Modulo => 6,
        }
    }

    pub fn representation(&self) -> &'static str {
        match self {
            Operator::Or => "|",
            Operator::And => "&",
            Operator::Equal => "=",
            Operator::NotEqual => "!",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThanOrEqual => ">=",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::LessThan
                | Operator::GreaterThan
                | Operator::LessThanOrEqual
                | Operator::GreaterThanOrEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add
                | Operator::Subtract
                | Operator::Multiply
                | Operator::Divide
                | Operator::Modulo
        )
    }

    pub fn from_kind(kind: Kind) -> Option<Operator> {
        Some(match kind {
            Kind::Or => Operator::Or,
            Kind::And => Operator::And,
            Kind::Equals => Operator::Equal,
            Kind::NotEquals => Operator::NotEqual,
            Kind::LessThan => Operator::LessThan,
            Kind::GreaterThan => Operator::GreaterThan,
            Kind::LessThanOrEqual => Operator::LessThanOrEqual,
            Kind::GreaterThanOrEqual => Operator::GreaterThanOrEqual,
            Kind::Plus => Operator::Add,
            Kind::Minus => Operator::Subtract,
            Kind::Star => Operator::Multiply,
            Kind::Slash => Operator::Divide,
            Kind::Percent => Operator::Modulo,
            _ => return None,
        })
    }
}

/// The `ty` slot starts empty and is filled in by the analyzer; generation
/// reads it back without recomputing.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub range: SourceRange,
    pub kind: ExprKind,
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(range: SourceRange, kind: ExprKind) -> Self {
        Self {
            range,
            kind,
            ty: None,
        }
    }

    // Placeholder keeping the tree shape intact during error recovery.
    pub fn error(range: SourceRange) -> Self {
        Self::new(range, ExprKind::Error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    LiteralInt(i32),
    LiteralLong(i64),
    LiteralString(String),
    LiteralBool(bool),
    // `resolved` is stamped by the analyzer.
    Variable {
        domain: VariableDomain,
        name: Identifier,
        resolved: Option<VariableInfo>,
    },
    Binary {
        operator: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: Identifier,
        arguments: Vec<Expr>,
    },
    // A comma list producing multiple values, as in a multi-value return.
    Tuple(Vec<Expr>),
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub range: SourceRange,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(range: SourceRange, kind: StmtKind) -> Self {
        Self { range, kind }
    }

    pub fn error(range: SourceRange) -> Self {
        Self::new(range, StmtKind::Error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, StmtKind::Error)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    // A braced block opens a fresh variable scope.
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        true_branch: Box<Stmt>,
        false_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    // Runs the body once before the first test.
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    Break,
    Continue,
    Declaration {
        ty: PrimitiveType,
        name: Identifier,
        initializer: Option<Expr>,
        resolved: Option<VariableInfo>,
    },
    Assignment {
        domain: VariableDomain,
        name: Identifier,
        value: Expr,
        resolved: Option<VariableInfo>,
    },
    // A multi-value return carries a Tuple expression.
    Return(Option<Expr>),
    Switch {
        ty: PrimitiveType,
        condition: Expr,
        cases: Vec<SwitchCase>,
        default_case: Option<SwitchCase>,
    },
    // Evaluated for effect; produced values are discarded.
    Expression(Expr),
    Error,
}

/// `resolved_keys` is stamped by the analyzer once every key expression has
/// been folded to a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub range: SourceRange,
    pub keys: Vec<Expr>,
    pub resolved_keys: Vec<i32>,
    pub body: Vec<Stmt>,
}

impl SwitchCase {
    pub fn is_default(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_orders_logical_below_arithmetic() {
        assert!(Operator::Or.precedence() < Operator::And.precedence());
        assert!(Operator::And.precedence() < Operator::Equal.precedence());
        assert!(Operator::Equal.precedence() < Operator::LessThan.precedence());
        assert!(Operator::LessThan.precedence() < Operator::Add.precedence());
        assert!(Operator::Add.precedence() < Operator::Multiply.precedence());
    }

    #[test]
    fn operator_from_kind_covers_every_operator_token() {
        let kinds = [
            Kind::Or,
            Kind::And,
            Kind::Equals,
            Kind::NotEquals,
            Kind::LessThan,
            Kind::GreaterThan,
            Kind::LessThanOrEqual,
            Kind::GreaterThanOrEqual,
            Kind::Plus,
            Kind::Minus,
            Kind::Star,
            Kind::Slash,
            Kind::Percent,
        ];
        for kind in kinds {
            assert!(Operator::from_kind(kind).is_some(), "{kind:?}");
        }
        assert!(Operator::from_kind(Kind::Comma).is_none());
    }

    #[test]
    fn full_name_is_bracketed_trigger_and_name() {
        let script = Script {
            range: SourceRange::default(),
            trigger: Identifier::new(SourceRange::default(), "proc"),
            name: Identifier::new(SourceRange::default(), "combat"),
            parameters: Vec::new(),
            returns: Type::unit(),
            body: Vec::new(),
        };
        assert_eq!(script.full_name(), "[proc,combat]");
    }
}
