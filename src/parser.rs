use crate::ast::{
    Expr, ExprKind, Identifier, Operator, Parameter, Script, Stmt, StmtKind, SwitchCase,
};
use crate::error::{CompileError, ErrorKind, Phase, Reporter};
use crate::lexer::Lexer;
use crate::span::SourceRange;
use crate::symbol::VariableDomain;
use crate::token::{Kind, TerminalKind, Token};
use crate::types::{PrimitiveType, Type};

/// Grammar-independent parsing machinery: bounded lookahead plus the range
/// stack that unions consumed-token ranges into node ranges.
pub struct ParserBase<K> {
    lexer: Lexer<K>,
    ranges: Vec<SourceRange>,
}

impl<K: TerminalKind> ParserBase<K> {
    pub fn new(lexer: Lexer<K>) -> Self {
        Self {
            lexer,
            ranges: Vec::new(),
        }
    }

    pub fn has_more(&self) -> bool {
        self.lexer.remaining() > 0
    }

    pub fn peek_kind(&self) -> K {
        self.lexer.peek().map(|token| token.kind).unwrap_or_else(K::eof)
    }

    pub fn lookahead_kind(&self, n: usize) -> K {
        self.lexer
            .lookahead(n)
            .map(|token| token.kind)
            .unwrap_or_else(K::eof)
    }

    pub fn take(&mut self) -> Token<K> {
        match self.lexer.take().cloned() {
            Some(token) => {
                self.record(token.range);
                token
            }
            None => Token::new(K::eof(), self.current_range(), ""),
        }
    }

    pub fn expect(&mut self, kind: K) -> Result<Token<K>, CompileError> {
        let found = self.peek_kind();
        if found == kind {
            Ok(self.take())
        } else {
            Err(CompileError::new(
                Phase::Parse,
                ErrorKind::Syntax,
                self.current_range(),
                format!("Expected {kind:?} but found {found:?}"),
            ))
        }
    }

    pub fn consume_if(&mut self, kind: K) -> bool {
        if self.peek_kind() == kind {
            self.take();
            true
        } else {
            false
        }
    }

    pub fn push_range(&mut self) {
        self.ranges.push(SourceRange::empty());
    }

    // Folds the closed frame into the one beneath so nesting composes.
    pub fn pop_range(&mut self) -> SourceRange {
        let range = self.ranges.pop().unwrap_or_else(SourceRange::empty);
        let range = if range.is_empty() {
            self.current_range()
        } else {
            range
        };
        self.record(range);
        range
    }

    pub fn range_depth(&self) -> usize {
        self.ranges.len()
    }

    pub fn truncate_ranges(&mut self, depth: usize) {
        self.ranges.truncate(depth);
    }

    fn record(&mut self, range: SourceRange) {
        if let Some(top) = self.ranges.last_mut() {
            top.add(range);
        }
    }

    pub fn current_range(&self) -> SourceRange {
        if let Some(token) = self.lexer.peek() {
            return token.range;
        }
        match self.lexer.previous() {
            Some(token) => SourceRange::new(token.range.end, token.range.end),
            None => SourceRange::default(),
        }
    }

    pub fn comments(&self) -> &[Token<K>] {
        self.lexer.comments()
    }
}

/// Recursive-descent parser of the script grammar. Syntax errors accumulate
/// while parsing continues with placeholder nodes.
pub struct ScriptParser {
    base: ParserBase<Kind>,
    reporter: Reporter,
}

impl ScriptParser {
    pub fn new(lexer: Lexer<Kind>) -> Self {
        Self {
            base: ParserBase::new(lexer),
            reporter: Reporter::new(),
        }
    }

    pub fn fail_fast(lexer: Lexer<Kind>) -> Self {
        Self {
            base: ParserBase::new(lexer),
            reporter: Reporter::fail_fast(),
        }
    }

    // Err is only produced by the fail-fast reporter.
    pub fn parse(&mut self) -> Result<Vec<Script>, CompileError> {
        let mut scripts = Vec::new();
        while self.base.has_more() {
            let depth = self.base.range_depth();
            match self.script() {
                Ok(script) => scripts.push(script),
                Err(error) => {
                    self.base.truncate_ranges(depth);
                    self.reporter.report(error)?;
                    self.recover_to_script();
                }
            }
        }
        Ok(scripts)
    }

    pub fn errors(&self) -> &[CompileError] {
        self.reporter.errors()
    }

    pub fn take_errors(&mut self) -> Vec<CompileError> {
        self.reporter.take_errors()
    }

    pub fn comments(&self) -> &[Token<Kind>] {
        self.base.comments()
    }

    // [trigger,name](params)(returns) statements...
    fn script(&mut self) -> Result<Script, CompileError> {
        self.base.push_range();
        self.base.expect(Kind::LBracket)?;
        let trigger = self.identifier()?;
        self.base.expect(Kind::Comma)?;
        let name = self.identifier()?;
        self.base.expect(Kind::RBracket)?;

        let mut parameters = Vec::new();
        let mut returns = Type::unit();
        if self.base.peek_kind() == Kind::LParen {
            // A group is a parameter group when empty or when its first
            // entry is `type $name`; otherwise it is the return group.
            if self.base.lookahead_kind(1) == Kind::RParen
                || self.base.lookahead_kind(2) == Kind::Dollar
            {
                parameters = self.parameter_group()?;
                if self.base.peek_kind() == Kind::LParen {
                    returns = self.return_group()?;
                }
            } else {
                returns = self.return_group()?;
            }
        }

        let mut body = Vec::new();
        while self.base.has_more() && self.base.peek_kind() != Kind::LBracket {
            body.push(self.statement()?);
        }
        let range = self.base.pop_range();
        Ok(Script {
            range,
            trigger,
            name,
            parameters,
            returns,
            body,
        })
    }

    fn parameter_group(&mut self) -> Result<Vec<Parameter>, CompileError> {
        self.base.expect(Kind::LParen)?;
        let mut parameters = Vec::new();
        if self.base.peek_kind() != Kind::RParen {
            loop {
                self.base.push_range();
                let ty = self.type_name()?;
                self.base.expect(Kind::Dollar)?;
                let name = self.identifier()?;
                let range = self.base.pop_range();
                parameters.push(Parameter { range, ty, name });
                if !self.base.consume_if(Kind::Comma) {
                    break;
                }
            }
        }
        self.base.expect(Kind::RParen)?;
        Ok(parameters)
    }

    fn return_group(&mut self) -> Result<Type, CompileError> {
        self.base.expect(Kind::LParen)?;
        let mut types = Vec::new();
        if self.base.peek_kind() != Kind::RParen {
            loop {
                types.push(Type::from(self.type_name()?));
                if !self.base.consume_if(Kind::Comma) {
                    break;
                }
            }
        }
        self.base.expect(Kind::RParen)?;
        Ok(Type::from_list(types))
    }

    fn type_name(&mut self) -> Result<PrimitiveType, CompileError> {
        let token = self.base.expect(Kind::Identifier)?;
        PrimitiveType::for_representation(&token.lexeme).ok_or_else(|| {
            CompileError::new(
                Phase::Parse,
                ErrorKind::Syntax,
                token.range,
                format!("Unknown type: {}", token.lexeme),
            )
        })
    }

    fn identifier(&mut self) -> Result<Identifier, CompileError> {
        let token = self.base.expect(Kind::Identifier)?;
        Ok(Identifier::new(token.range, token.lexeme))
    }

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        let depth = self.base.range_depth();
        match self.statement_inner() {
            Ok(stmt) => Ok(stmt),
            Err(error) => {
                self.base.truncate_ranges(depth);
                self.reporter.report(error)?;
                Ok(self.recover_statement())
            }
        }
    }

    fn statement_inner(&mut self) -> Result<Stmt, CompileError> {
        match self.base.peek_kind() {
            Kind::LBrace => self.block_statement(),
            Kind::If => self.if_statement(),
            Kind::While => self.while_statement(),
            Kind::Do => self.do_while_statement(),
            Kind::Break => self.break_statement(),
            Kind::Continue => self.continue_statement(),
            Kind::Define => self.declaration_statement(),
            Kind::Switch => self.switch_statement(),
            Kind::Return => self.return_statement(),
            Kind::Dollar | Kind::Percent
                if self.base.lookahead_kind(1) == Kind::Identifier
                    && self.base.lookahead_kind(2) == Kind::Equals =>
            {
                self.assignment_statement()
            }
            _ => self.expression_statement(),
        }
    }

    fn block_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        self.base.expect(Kind::LBrace)?;
        let mut statements = Vec::new();
        while self.base.has_more() && self.base.peek_kind() != Kind::RBrace {
            statements.push(self.statement()?);
        }
        self.base.expect(Kind::RBrace)?;
        let range = self.base.pop_range();
        Ok(Stmt::new(range, StmtKind::Block(statements)))
    }

    fn if_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        self.base.expect(Kind::If)?;
        self.base.expect(Kind::LParen)?;
        let condition = self.expression()?;
        self.base.expect(Kind::RParen)?;
        let true_branch = Box::new(self.statement()?);
        let false_branch = if self.base.consume_if(Kind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        let range = self.base.pop_range();
        Ok(Stmt::new(
            range,
            StmtKind::If {
                condition,
                true_branch,
                false_branch,
            },
        ))
    }

    fn while_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        self.base.expect(Kind::While)?;
        self.base.expect(Kind::LParen)?;
        let condition = self.expression()?;
        self.base.expect(Kind::RParen)?;
        let body = Box::new(self.statement()?);
        let range = self.base.pop_range();
        Ok(Stmt::new(range, StmtKind::While { condition, body }))
    }

    fn do_while_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        self.base.expect(Kind::Do)?;
        let body = Box::new(self.statement()?);
        self.base.expect(Kind::While)?;
        self.base.expect(Kind::LParen)?;
        let condition = self.expression()?;
        self.base.expect(Kind::RParen)?;
        self.base.expect(Kind::Semicolon)?;
        let range = self.base.pop_range();
        Ok(Stmt::new(range, StmtKind::DoWhile { body, condition }))
    }

    fn break_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        self.base.expect(Kind::Break)?;
        self.base.expect(Kind::Semicolon)?;
        let range = self.base.pop_range();
        Ok(Stmt::new(range, StmtKind::Break))
    }

    fn continue_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        self.base.expect(Kind::Continue)?;
        self.base.expect(Kind::Semicolon)?;
        let range = self.base.pop_range();
        Ok(Stmt::new(range, StmtKind::Continue))
    }

    fn declaration_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        let keyword = self.base.expect(Kind::Define)?;
        let ty = self.typed_keyword(&keyword, "def_")?;
        self.base.expect(Kind::Dollar)?;
        let name = self.identifier()?;
        let initializer = if self.base.consume_if(Kind::Equals) {
            Some(self.expression()?)
        } else {
            None
        };
        self.base.expect(Kind::Semicolon)?;
        let range = self.base.pop_range();
        Ok(Stmt::new(
            range,
            StmtKind::Declaration {
                ty,
                name,
                initializer,
                resolved: None,
            },
        ))
    }

    fn assignment_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        let sigil = self.base.take();
        let domain = match sigil.kind {
            Kind::Dollar => VariableDomain::Local,
            _ => VariableDomain::Global,
        };
        let name = self.identifier()?;
        self.base.expect(Kind::Equals)?;
        let value = self.expression()?;
        self.base.expect(Kind::Semicolon)?;
        let range = self.base.pop_range();
        Ok(Stmt::new(
            range,
            StmtKind::Assignment {
                domain,
                name,
                value,
                resolved: None,
            },
        ))
    }

    fn return_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        self.base.expect(Kind::Return)?;
        let value = if self.base.peek_kind() == Kind::Semicolon {
            None
        } else {
            let mut values = vec![self.expression()?];
            while self.base.consume_if(Kind::Comma) {
                values.push(self.expression()?);
            }
            if values.len() == 1 {
                values.pop()
            } else {
                let range = values
                    .iter()
                    .fold(SourceRange::empty(), |acc, value| acc.union(value.range));
                Some(Expr::new(range, ExprKind::Tuple(values)))
            }
        };
        self.base.expect(Kind::Semicolon)?;
        let range = self.base.pop_range();
        Ok(Stmt::new(range, StmtKind::Return(value)))
    }

    fn switch_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        let keyword = self.base.expect(Kind::Switch)?;
        let ty = self.typed_keyword(&keyword, "switch_")?;
        self.base.expect(Kind::LParen)?;
        let condition = self.expression()?;
        self.base.expect(Kind::RParen)?;
        self.base.expect(Kind::LBrace)?;
        let mut cases = Vec::new();
        let mut default_case = None;
        while self.base.peek_kind() == Kind::Case {
            let case = self.switch_case()?;
            if case.is_default() {
                if default_case.is_some() {
                    let error = CompileError::new(
                        Phase::Parse,
                        ErrorKind::Syntax,
                        case.range,
                        "Switch statement already has a default case",
                    );
                    self.reporter.report(error)?;
                } else {
                    default_case = Some(case);
                }
            } else {
                cases.push(case);
            }
        }
        self.base.expect(Kind::RBrace)?;
        let range = self.base.pop_range();
        Ok(Stmt::new(
            range,
            StmtKind::Switch {
                ty,
                condition,
                cases,
                default_case,
            },
        ))
    }

    fn switch_case(&mut self) -> Result<SwitchCase, CompileError> {
        self.base.push_range();
        self.base.expect(Kind::Case)?;
        let mut keys = Vec::new();
        if !self.base.consume_if(Kind::Default) {
            keys.push(self.expression()?);
            while self.base.consume_if(Kind::Comma) {
                keys.push(self.expression()?);
            }
        }
        self.base.expect(Kind::Colon)?;
        let mut body = Vec::new();
        while self.base.has_more()
            && self.base.peek_kind() != Kind::Case
            && self.base.peek_kind() != Kind::RBrace
        {
            body.push(self.statement()?);
        }
        let range = self.base.pop_range();
        Ok(SwitchCase {
            range,
            keys,
            resolved_keys: Vec::new(),
            body,
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt, CompileError> {
        self.base.push_range();
        let expr = self.expression()?;
        self.base.expect(Kind::Semicolon)?;
        let range = self.base.pop_range();
        Ok(Stmt::new(range, StmtKind::Expression(expr)))
    }

    pub fn expression(&mut self) -> Result<Expr, CompileError> {
        self.binary_expression(0)
    }

    // Precedence climbing; every level associates to the left.
    fn binary_expression(&mut self, min_precedence: u8) -> Result<Expr, CompileError> {
        let mut left = self.simple_expression()?;
        while let Some(operator) = Operator::from_kind(self.base.peek_kind()) {
            if operator.precedence() < min_precedence {
                break;
            }
            self.base.take();
            let right = self.binary_expression(operator.precedence() + 1)?;
            let range = left.range.union(right.range);
            left = Expr::new(
                range,
                ExprKind::Binary {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn simple_expression(&mut self) -> Result<Expr, CompileError> {
        match self.base.peek_kind() {
            Kind::Integer => {
                let token = self.base.take();
                let value = parse_literal::<i32>(&token, "int")?;
                Ok(Expr::new(token.range, ExprKind::LiteralInt(value)))
            }
            Kind::Long => {
                let token = self.base.take();
                let value = parse_literal::<i64>(&token, "long")?;
                Ok(Expr::new(token.range, ExprKind::LiteralLong(value)))
            }
            Kind::String => {
                let token = self.base.take();
                Ok(Expr::new(
                    token.range,
                    ExprKind::LiteralString(token.lexeme),
                ))
            }
            Kind::Bool => {
                let token = self.base.take();
                Ok(Expr::new(
                    token.range,
                    ExprKind::LiteralBool(token.lexeme == "true"),
                ))
            }
            Kind::Dollar => self.variable_expression(VariableDomain::Local),
            Kind::Percent => self.variable_expression(VariableDomain::Global),
            Kind::Tilde => self.call_expression(),
            Kind::LParen => {
                let open = self.base.take();
                let mut expr = self.expression()?;
                let close = self.base.expect(Kind::RParen)?;
                expr.range = open.range.union(close.range);
                Ok(expr)
            }
            found => Err(CompileError::new(
                Phase::Parse,
                ErrorKind::Syntax,
                self.base.current_range(),
                format!("Expected an expression but found {found:?}"),
            )),
        }
    }

    fn variable_expression(&mut self, domain: VariableDomain) -> Result<Expr, CompileError> {
        let sigil = self.base.take();
        let name = self.identifier()?;
        let range = sigil.range.union(name.range);
        Ok(Expr::new(
            range,
            ExprKind::Variable {
                domain,
                name,
                resolved: None,
            },
        ))
    }

    fn call_expression(&mut self) -> Result<Expr, CompileError> {
        let tilde = self.base.take();
        let name = self.identifier()?;
        let mut range = tilde.range.union(name.range);
        let mut arguments = Vec::new();
        if self.base.peek_kind() == Kind::LParen {
            self.base.take();
            if self.base.peek_kind() != Kind::RParen {
                arguments.push(self.expression()?);
                while self.base.consume_if(Kind::Comma) {
                    arguments.push(self.expression()?);
                }
            }
            let close = self.base.expect(Kind::RParen)?;
            range = range.union(close.range);
        }
        Ok(Expr::new(range, ExprKind::Call { name, arguments }))
    }

    // Extracts the primitive from `def_int`, `switch_int` and friends.
    fn typed_keyword(
        &self,
        token: &Token<Kind>,
        prefix: &str,
    ) -> Result<PrimitiveType, CompileError> {
        token
            .lexeme
            .strip_prefix(prefix)
            .and_then(PrimitiveType::for_representation)
            .ok_or_else(|| {
                CompileError::new(
                    Phase::Parse,
                    ErrorKind::Syntax,
                    token.range,
                    format!("Unknown type in keyword: {}", token.lexeme),
                )
            })
    }

    // Skips past the next semicolon or up to a brace/header. Always consumes
    // at least one token so recovery makes progress.
    fn recover_statement(&mut self) -> Stmt {
        self.base.push_range();
        while self.base.has_more() {
            let token = self.base.take();
            if token.kind == Kind::Semicolon {
                break;
            }
            match self.base.peek_kind() {
                Kind::LBracket | Kind::LBrace | Kind::RBrace => break,
                _ => {}
            }
        }
        let range = self.base.pop_range();
        Stmt::error(range)
    }

    fn recover_to_script(&mut self) {
        while self.base.has_more() && self.base.peek_kind() != Kind::LBracket {
            self.base.take();
        }
    }
}

fn parse_literal<T: std::str::FromStr>(
    token: &Token<Kind>,
    type_name: &str,
) -> Result<T, CompileError> {
    token.lexeme.parse::<T>().map_err(|_| {
        CompileError::new(
            Phase::Parse,
            ErrorKind::Syntax,
            token.range,
            format!("The literal {} of type {type_name} is out of range", token.lexeme),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::script_table;
    use indoc::indoc;

    fn parse(input: &str) -> (Vec<Script>, Vec<CompileError>) {
        let lexer = Lexer::new(&script_table(), input).expect("lexing should succeed");
        let mut parser = ScriptParser::new(lexer);
        let scripts = parser.parse().expect("accumulating parser never errors");
        let errors = parser.take_errors();
        (scripts, errors)
    }

    fn parse_ok(input: &str) -> Vec<Script> {
        let (scripts, errors) = parse(input);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        scripts
    }

    fn parse_expression(input: &str) -> Expr {
        let lexer = Lexer::new(&script_table(), input).expect("lexing should succeed");
        let mut parser = ScriptParser::fail_fast(lexer);
        parser.expression().expect("expression should parse")
    }

    #[test]
    fn parses_header_with_parameters_and_returns() {
        let scripts = parse_ok(indoc! {"
            [proc,max](int $a, int $b)(int)
            if ($a > $b) {
                return $a;
            }
            return $b;
        "});
        assert_eq!(scripts.len(), 1);
        let script = &scripts[0];
        assert_eq!(script.trigger.text, "proc");
        assert_eq!(script.name.text, "max");
        assert_eq!(script.parameters.len(), 2);
        assert_eq!(script.parameters[0].ty, PrimitiveType::Int);
        assert_eq!(script.returns, Type::INT);
        assert_eq!(script.body.len(), 2);
    }

    #[test]
    fn lone_type_group_is_the_return_group() {
        let scripts = parse_ok("[proc,zero](int)\nreturn 0;\n");
        assert!(scripts[0].parameters.is_empty());
        assert_eq!(scripts[0].returns, Type::INT);
    }

    #[test]
    fn header_without_groups_takes_no_arguments() {
        let scripts = parse_ok("[clientscript,tick]\n");
        assert!(scripts[0].parameters.is_empty());
        assert!(scripts[0].returns.is_unit());
        assert!(scripts[0].body.is_empty());
    }

    #[test]
    fn multiple_scripts_split_on_headers() {
        let scripts = parse_ok(indoc! {"
            [proc,a]
            return;
            [proc,b]
            return;
        "});
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].name.text, "a");
        assert_eq!(scripts[1].name.text, "b");
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_expression("1 + 2 * 3");
        match expr.kind {
            ExprKind::Binary {
                operator, right, ..
            } => {
                assert_eq!(operator, Operator::Add);
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary {
                        operator: Operator::Multiply,
                        ..
                    }
                ));
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn comparison_binds_tighter_than_logical_and() {
        let expr = parse_expression("$a > 1 & $b > 2");
        assert!(matches!(
            expr.kind,
            ExprKind::Binary {
                operator: Operator::And,
                ..
            }
        ));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = parse_expression("10 - 4 - 3");
        match expr.kind {
            ExprKind::Binary { operator, left, .. } => {
                assert_eq!(operator, Operator::Subtract);
                assert!(matches!(
                    left.kind,
                    ExprKind::Binary {
                        operator: Operator::Subtract,
                        ..
                    }
                ));
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn percent_is_modulo_after_an_operand_and_a_sigil_before_one() {
        let expr = parse_expression("$a % %counter");
        match expr.kind {
            ExprKind::Binary {
                operator,
                left,
                right,
            } => {
                assert_eq!(operator, Operator::Modulo);
                assert!(matches!(
                    left.kind,
                    ExprKind::Variable {
                        domain: VariableDomain::Local,
                        ..
                    }
                ));
                assert!(matches!(
                    right.kind,
                    ExprKind::Variable {
                        domain: VariableDomain::Global,
                        ..
                    }
                ));
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn call_with_arguments() {
        let expr = parse_expression("~damage($target, 10)");
        match expr.kind {
            ExprKind::Call { name, arguments } => {
                assert_eq!(name.text, "damage");
                assert_eq!(arguments.len(), 2);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn if_range_spans_condition_through_else_branch() {
        let scripts = parse_ok(indoc! {"
            [proc,t]
            if ($a > 1) {
                return;
            } else {
                return;
            }
        "});
        let stmt = &scripts[0].body[0];
        match &stmt.kind {
            StmtKind::If { false_branch, .. } => {
                let else_end = false_branch.as_ref().expect("else branch").range.end;
                assert_eq!(stmt.range.start.line, 2);
                assert_eq!(stmt.range.end, else_end);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn missing_else_is_none() {
        let scripts = parse_ok("[proc,t]\nif (1 = 1) return;\n");
        match &scripts[0].body[0].kind {
            StmtKind::If { false_branch, .. } => assert!(false_branch.is_none()),
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn do_while_parses_body_before_condition() {
        let scripts = parse_ok(indoc! {"
            [proc,t](int $a)
            do {
                $a = $a - 1;
            } while ($a > 0);
        "});
        match &scripts[0].body[0].kind {
            StmtKind::DoWhile { body, condition } => {
                assert!(matches!(body.kind, StmtKind::Block(_)));
                assert!(matches!(condition.kind, ExprKind::Binary { .. }));
            }
            other => panic!("expected do-while, got {other:?}"),
        }
    }

    #[test]
    fn break_and_continue_are_bare_statements() {
        let scripts = parse_ok(indoc! {"
            [proc,t](int $a)
            while ($a > 0) {
                continue;
                break;
            }
        "});
        match &scripts[0].body[0].kind {
            StmtKind::While { body, .. } => match &body.kind {
                StmtKind::Block(statements) => {
                    assert!(matches!(statements[0].kind, StmtKind::Continue));
                    assert!(matches!(statements[1].kind, StmtKind::Break));
                }
                other => panic!("expected block, got {other:?}"),
            },
            other => panic!("expected while, got {other:?}"),
        }
    }

    #[test]
    fn declaration_with_and_without_initializer() {
        let scripts = parse_ok(indoc! {"
            [proc,t]
            def_int $x = 5;
            def_string $s;
        "});
        match &scripts[0].body[0].kind {
            StmtKind::Declaration {
                ty, initializer, ..
            } => {
                assert_eq!(*ty, PrimitiveType::Int);
                assert!(initializer.is_some());
            }
            other => panic!("expected declaration, got {other:?}"),
        }
        match &scripts[0].body[1].kind {
            StmtKind::Declaration {
                ty, initializer, ..
            } => {
                assert_eq!(*ty, PrimitiveType::String);
                assert!(initializer.is_none());
            }
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn multi_value_return_builds_a_tuple() {
        let scripts = parse_ok("[proc,pair]\nreturn 1, \"a\";\n");
        match &scripts[0].body[0].kind {
            StmtKind::Return(Some(expr)) => {
                assert!(matches!(&expr.kind, ExprKind::Tuple(values) if values.len() == 2));
            }
            other => panic!("expected return, got {other:?}"),
        }
    }

    #[test]
    fn switch_collects_cases_and_default() {
        let scripts = parse_ok(indoc! {"
            [proc,t](int $x)
            switch_int ($x) {
                case 1, 2:
                    return;
                case default:
                    return;
            }
        "});
        match &scripts[0].body[0].kind {
            StmtKind::Switch {
                ty,
                cases,
                default_case,
                ..
            } => {
                assert_eq!(*ty, PrimitiveType::Int);
                assert_eq!(cases.len(), 1);
                assert_eq!(cases[0].keys.len(), 2);
                assert!(default_case.is_some());
            }
            other => panic!("expected switch, got {other:?}"),
        }
    }

    #[test]
    fn syntax_error_yields_placeholder_and_continues() {
        let (scripts, errors) = parse(indoc! {"
            [proc,t]
            def_int $x = ;
            return;
        "});
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Syntax);
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].body.iter().any(Stmt::is_error));
        assert!(scripts[0]
            .body
            .iter()
            .any(|stmt| matches!(stmt.kind, StmtKind::Return(_))));
    }

    #[test]
    fn fail_fast_escalates_first_syntax_error() {
        let lexer = Lexer::new(&script_table(), "[proc,t]\ndef_int = 1;")
            .expect("lexing should succeed");
        let mut parser = ScriptParser::fail_fast(lexer);
        assert!(parser.parse().is_err());
    }

    #[test]
    fn duplicate_default_case_is_reported() {
        let (_, errors) = parse(indoc! {"
            [proc,t](int $x)
            switch_int ($x) {
                case default:
                    return;
                case default:
                    return;
            }
        "});
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("default"));
    }
}
