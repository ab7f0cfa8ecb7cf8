use rustc_hash::FxHashSet;

use crate::ast::{Expr, ExprKind, Operator, Script, Stmt, StmtKind, SwitchCase};
use crate::compiler::CompilerEnvironment;
use crate::error::{CompileError, ErrorKind, Phase, Reporter};
use crate::span::SourceRange;
use crate::symbol::{ScopeStack, ScriptInfo, SymbolTable, VariableDomain, VariableInfo};
use crate::trigger::TriggerType;
use crate::types::{StackType, Type};

struct ScriptContext {
    trigger: TriggerType,
    returns: Type,
}

/// Two passes: `declare` registers every script signature, `check` walks
/// the bodies stamping resolved symbols and types onto the tree. After a
/// mismatch the walk continues with the operator's result type so one pass
/// surfaces as many findings as possible.
pub struct Analyzer<'a> {
    environment: &'a CompilerEnvironment,
    symbols: &'a mut SymbolTable,
    reporter: Reporter,
    scopes: ScopeStack,
    current: Option<ScriptContext>,
    loop_depth: usize,
}

impl<'a> Analyzer<'a> {
    pub fn new(environment: &'a CompilerEnvironment, symbols: &'a mut SymbolTable) -> Self {
        Self {
            environment,
            symbols,
            reporter: Reporter::new(),
            scopes: ScopeStack::new(),
            current: None,
            loop_depth: 0,
        }
    }

    pub fn fail_fast(environment: &'a CompilerEnvironment, symbols: &'a mut SymbolTable) -> Self {
        Self {
            reporter: Reporter::fail_fast(),
            ..Self::new(environment, symbols)
        }
    }

    pub fn errors(&self) -> &[CompileError] {
        self.reporter.errors()
    }

    pub fn take_errors(&mut self) -> Vec<CompileError> {
        self.reporter.take_errors()
    }

    pub fn has_errors(&self) -> bool {
        self.reporter.has_errors()
    }

    // Registered up front so calls resolve regardless of declaration order.
    pub fn declare(&mut self, scripts: &[Script]) -> Result<(), CompileError> {
        for script in scripts {
            let trigger = match self.environment.lookup_trigger(&script.trigger.text) {
                Some(trigger) => trigger,
                None => {
                    self.error(
                        ErrorKind::UnresolvedSymbol,
                        script.trigger.range,
                        format!("Unknown trigger: {}", script.trigger.text),
                    )?;
                    continue;
                }
            };
            if !trigger.has_returns() && !script.returns.is_unit() {
                self.error(
                    ErrorKind::TriggerCapability,
                    script.name.range,
                    format!(
                        "Trigger type '{}' does not allow return values",
                        trigger.representation()
                    ),
                )?;
            }
            let arguments = Type::from_list(
                script
                    .parameters
                    .iter()
                    .map(|parameter| Type::from(parameter.ty))
                    .collect(),
            );
            let info = ScriptInfo {
                trigger,
                name: script.name.text.clone(),
                arguments,
                returns: script.returns.clone(),
            };
            if !self.symbols.define_script(info) {
                self.error(
                    ErrorKind::DuplicateDeclaration,
                    script.name.range,
                    format!("Duplicate script: {}", script.full_name()),
                )?;
            }
        }
        Ok(())
    }

    pub fn check(&mut self, scripts: &mut [Script]) -> Result<(), CompileError> {
        for script in scripts {
            let Some(trigger) = self.environment.lookup_trigger(&script.trigger.text) else {
                continue; // reported during declaration
            };
            self.current = Some(ScriptContext {
                trigger,
                returns: script.returns.clone(),
            });
            self.scopes = ScopeStack::new();
            self.scopes.push();
            self.loop_depth = 0;
            for parameter in &script.parameters {
                if self
                    .scopes
                    .declare(&parameter.name.text, Type::from(parameter.ty))
                    .is_none()
                {
                    self.error(
                        ErrorKind::DuplicateDeclaration,
                        parameter.name.range,
                        format!("Duplicate parameter: ${}", parameter.name.text),
                    )?;
                }
            }
            for stmt in &mut script.body {
                self.statement(stmt)?;
            }
            self.scopes.pop();
        }
        self.current = None;
        Ok(())
    }

    fn statement(&mut self, stmt: &mut Stmt) -> Result<(), CompileError> {
        let range = stmt.range;
        match &mut stmt.kind {
            StmtKind::Block(statements) => {
                self.scopes.push();
                for statement in statements {
                    self.statement(statement)?;
                }
                self.scopes.pop();
            }
            StmtKind::If {
                condition,
                true_branch,
                false_branch,
            } => {
                self.condition(condition)?;
                self.statement(true_branch)?;
                if let Some(false_branch) = false_branch {
                    self.statement(false_branch)?;
                }
            }
            StmtKind::While { condition, body } => {
                self.condition(condition)?;
                self.loop_depth += 1;
                self.statement(body)?;
                self.loop_depth -= 1;
            }
            StmtKind::DoWhile { body, condition } => {
                self.loop_depth += 1;
                self.statement(body)?;
                self.loop_depth -= 1;
                self.condition(condition)?;
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.error(
                        ErrorKind::MisplacedStatement,
                        range,
                        "Break statement is not allowed outside of a loop",
                    )?;
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.error(
                        ErrorKind::MisplacedStatement,
                        range,
                        "Continue statement is not allowed outside of a loop",
                    )?;
                }
            }
            StmtKind::Declaration {
                ty,
                name,
                initializer,
                resolved,
            } => {
                let declared = Type::from(*ty);
                if let Some(initializer) = initializer {
                    if let Some(found) = self.expression(initializer)? {
                        if found != declared {
                            self.type_mismatch(initializer.range, &found, &declared)?;
                        }
                    }
                }
                match self.scopes.declare(&name.text, declared) {
                    Some(info) => *resolved = Some(info),
                    None => {
                        self.error(
                            ErrorKind::DuplicateDeclaration,
                            name.range,
                            format!("Duplicate local variable: ${}", name.text),
                        )?;
                    }
                }
            }
            StmtKind::Assignment {
                domain,
                name,
                value,
                resolved,
            } => {
                let info = self.resolve_variable(*domain, &name.text);
                let found = self.expression(value)?;
                match info {
                    Some(info) => {
                        if let Some(found) = found {
                            if found != info.ty {
                                self.type_mismatch(value.range, &found, &info.ty)?;
                            }
                        }
                        *resolved = Some(info);
                    }
                    None => {
                        self.error(
                            ErrorKind::UnresolvedSymbol,
                            name.range,
                            format!("Unresolved variable: {}{}", domain.sigil(), name.text),
                        )?;
                    }
                }
            }
            StmtKind::Return(value) => {
                let (trigger, returns) = match &self.current {
                    Some(context) => (context.trigger, context.returns.clone()),
                    None => return Ok(()),
                };
                match value {
                    Some(value) => {
                        let found = self.expression(value)?;
                        if !trigger.has_returns() {
                            self.error(
                                ErrorKind::TriggerCapability,
                                value.range,
                                format!(
                                    "Trigger type '{}' does not allow return values",
                                    trigger.representation()
                                ),
                            )?;
                        } else if let Some(found) = found {
                            if found != returns {
                                self.type_mismatch(value.range, &found, &returns)?;
                            }
                        }
                    }
                    None => {
                        if !returns.is_unit() {
                            self.error(
                                ErrorKind::TypeMismatch,
                                range,
                                format!(
                                    "Missing return value of type {}",
                                    returns.representation()
                                ),
                            )?;
                        }
                    }
                }
            }
            StmtKind::Switch {
                ty,
                condition,
                cases,
                default_case,
            } => {
                let expected = Type::from(*ty);
                if let Some(found) = self.expression(condition)? {
                    if found != expected {
                        self.type_mismatch(condition.range, &found, &expected)?;
                    }
                }
                let mut seen = FxHashSet::default();
                // Mutable split: fold keys first, then walk bodies.
                for case in cases.iter_mut().chain(default_case.iter_mut()) {
                    self.switch_case(case, &mut seen)?;
                }
            }
            StmtKind::Expression(expr) => {
                self.expression(expr)?;
            }
            StmtKind::Error => {}
        }
        Ok(())
    }

    fn switch_case(
        &mut self,
        case: &mut SwitchCase,
        seen: &mut FxHashSet<i32>,
    ) -> Result<(), CompileError> {
        case.resolved_keys.clear();
        for key in &mut case.keys {
            self.expression(key)?;
            let value = match key.kind {
                ExprKind::LiteralInt(value) => value,
                ExprKind::LiteralBool(value) => value as i32,
                _ => {
                    self.error(
                        ErrorKind::TypeMismatch,
                        key.range,
                        "Switch case keys must be constant",
                    )?;
                    continue;
                }
            };
            if !seen.insert(value) {
                self.error(
                    ErrorKind::DuplicateDeclaration,
                    key.range,
                    format!("Duplicate case key: {value}"),
                )?;
                continue;
            }
            case.resolved_keys.push(value);
        }
        self.scopes.push();
        for stmt in &mut case.body {
            self.statement(stmt)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn condition(&mut self, condition: &mut Expr) -> Result<(), CompileError> {
        if let Some(found) = self.expression(condition)? {
            if found != Type::BOOLEAN {
                self.type_mismatch(condition.range, &found, &Type::BOOLEAN)?;
            }
        }
        Ok(())
    }

    // None means the type could not be established and was already reported.
    fn expression(&mut self, expr: &mut Expr) -> Result<Option<Type>, CompileError> {
        let range = expr.range;
        let ty = match &mut expr.kind {
            ExprKind::LiteralInt(_) => Some(Type::INT),
            ExprKind::LiteralLong(_) => Some(Type::LONG),
            ExprKind::LiteralString(_) => Some(Type::STRING),
            ExprKind::LiteralBool(_) => Some(Type::BOOLEAN),
            ExprKind::Variable {
                domain,
                name,
                resolved,
            } => match self.resolve_variable(*domain, &name.text) {
                Some(info) => {
                    let ty = info.ty.clone();
                    *resolved = Some(info);
                    Some(ty)
                }
                None => {
                    self.error(
                        ErrorKind::UnresolvedSymbol,
                        name.range,
                        format!("Unresolved variable: {}{}", domain.sigil(), name.text),
                    )?;
                    None
                }
            },
            ExprKind::Binary {
                operator,
                left,
                right,
            } => {
                let operator = *operator;
                let left_ty = self.expression(left)?;
                let right_ty = self.expression(right)?;
                Some(self.binary(operator, range, left_ty, right_ty)?)
            }
            ExprKind::Call { name, arguments } => {
                let mut types = Vec::with_capacity(arguments.len());
                let mut known = true;
                for argument in arguments.iter_mut() {
                    match self.expression(argument)? {
                        Some(ty) => types.push(ty),
                        None => known = false,
                    }
                }
                let Some(info) = self
                    .symbols
                    .lookup_script(TriggerType::Proc, &name.text)
                    .cloned()
                else {
                    self.error(
                        ErrorKind::UnresolvedSymbol,
                        name.range,
                        format!("Could not resolve proc script with the name: {}", name.text),
                    )?;
                    return Ok(None);
                };
                if known {
                    let given = Type::from_list(types);
                    if given.flattened() != info.arguments.flattened() {
                        self.error(
                            ErrorKind::Arity,
                            range,
                            format!(
                                "Script '{}' expects arguments ({}), got ({})",
                                name.text,
                                info.arguments.representation(),
                                given.representation()
                            ),
                        )?;
                    }
                }
                Some(info.returns)
            }
            ExprKind::Tuple(values) => {
                let mut types = Vec::with_capacity(values.len());
                let mut known = true;
                for value in values.iter_mut() {
                    match self.expression(value)? {
                        Some(ty) => types.push(ty),
                        None => known = false,
                    }
                }
                if known {
                    Some(Type::from_list(types))
                } else {
                    None
                }
            }
            ExprKind::Error => None,
        };
        expr.ty = ty.clone();
        Ok(ty)
    }

    fn binary(
        &mut self,
        operator: Operator,
        range: SourceRange,
        left: Option<Type>,
        right: Option<Type>,
    ) -> Result<Type, CompileError> {
        // Arithmetic runs on the int stack only.
        if operator.is_arithmetic() {
            for side in [&left, &right] {
                if let Some(ty) = side {
                    if *ty != Type::INT {
                        self.type_mismatch(range, ty, &Type::INT)?;
                    }
                }
            }
            return Ok(Type::INT);
        }
        if operator.is_logical() {
            for side in [&left, &right] {
                if let Some(ty) = side {
                    if *ty != Type::BOOLEAN {
                        self.type_mismatch(range, ty, &Type::BOOLEAN)?;
                    }
                }
            }
            return Ok(Type::BOOLEAN);
        }
        // Relational and equality comparisons work on single int-stack
        // values; the machine only branches on the int stack.
        if let (Some(l), Some(r)) = (&left, &right) {
            let comparable = l == r
                && l.slot_count() == 1
                && l.stack_type() == Some(StackType::Int);
            if !comparable {
                self.type_mismatch(range, r, l)?;
            }
        }
        Ok(Type::BOOLEAN)
    }

    fn resolve_variable(&self, domain: VariableDomain, name: &str) -> Option<VariableInfo> {
        match domain {
            VariableDomain::Local => self.scopes.lookup(name).cloned(),
            VariableDomain::Global => self.symbols.lookup_global(name).cloned(),
        }
    }

    fn type_mismatch(
        &mut self,
        range: SourceRange,
        found: &Type,
        expected: &Type,
    ) -> Result<(), CompileError> {
        self.error(
            ErrorKind::TypeMismatch,
            range,
            format!(
                "Type mismatch: cannot convert from {} to {}",
                found.representation(),
                expected.representation()
            ),
        )
    }

    fn error(
        &mut self,
        kind: ErrorKind,
        range: SourceRange,
        message: impl Into<String>,
    ) -> Result<(), CompileError> {
        self.reporter
            .report(CompileError::new(Phase::Analysis, kind, range, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompilerEnvironment;
    use crate::lexer::Lexer;
    use crate::parser::ScriptParser;
    use crate::table::script_table;
    use indoc::indoc;

    fn analyze(input: &str) -> (Vec<Script>, Vec<CompileError>) {
        let lexer = Lexer::new(&script_table(), input).expect("lexing should succeed");
        let mut parser = ScriptParser::new(lexer);
        let mut scripts = parser.parse().expect("accumulating parser never errors");
        assert!(parser.errors().is_empty(), "parse errors: {:?}", parser.errors());

        let environment = CompilerEnvironment::with_defaults();
        let mut symbols = SymbolTable::new();
        let mut analyzer = Analyzer::new(&environment, &mut symbols);
        analyzer.declare(&scripts).expect("accumulating analyzer never errors");
        analyzer.check(&mut scripts).expect("accumulating analyzer never errors");
        let errors = analyzer.take_errors();
        (scripts, errors)
    }

    fn analyze_ok(input: &str) -> Vec<Script> {
        let (scripts, errors) = analyze(input);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        scripts
    }

    fn single_error(input: &str) -> CompileError {
        let (_, mut errors) = analyze(input);
        assert_eq!(errors.len(), 1, "expected one error, got {errors:?}");
        errors.remove(0)
    }

    #[test]
    fn arithmetic_on_ints_types_as_int() {
        let scripts = analyze_ok("[proc,t](int)\nreturn 1 + 2;\n");
        match &scripts[0].body[0].kind {
            StmtKind::Return(Some(expr)) => assert_eq!(expr.ty, Some(Type::INT)),
            other => panic!("expected return, got {other:?}"),
        }
    }

    #[test]
    fn adding_int_and_string_is_a_type_mismatch() {
        let error = single_error("[proc,t](int)\nreturn 1 + \"a\";\n");
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
        assert!(error.message.contains("cannot convert from string to int"));
    }

    #[test]
    fn mismatch_continues_with_operator_result_type() {
        // One mismatch inside, and the outer return still types as int.
        let (scripts, errors) = analyze("[proc,t](int)\nreturn (1 + \"a\") + 3;\n");
        assert_eq!(errors.len(), 1);
        match &scripts[0].body[0].kind {
            StmtKind::Return(Some(expr)) => assert_eq!(expr.ty, Some(Type::INT)),
            other => panic!("expected return, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_local_in_same_scope_errors() {
        let error = single_error(indoc! {"
            [proc,t]
            def_int $x = 1;
            def_int $x = 2;
        "});
        assert_eq!(error.kind, ErrorKind::DuplicateDeclaration);
    }

    #[test]
    fn shadowing_in_nested_scope_is_allowed() {
        analyze_ok(indoc! {"
            [proc,t]
            def_int $x = 1;
            {
                def_string $x = \"a\";
                $x = \"b\";
            }
            $x = 2;
        "});
    }

    #[test]
    fn local_lookup_never_falls_back_to_globals() {
        let error = single_error("[proc,t]\n$missing = 1;\n");
        assert_eq!(error.kind, ErrorKind::UnresolvedSymbol);
        assert!(error.message.contains("$missing"));
    }

    #[test]
    fn return_under_no_return_trigger_is_a_capability_error() {
        let error = single_error("[clientscript,t]\nreturn 5;\n");
        assert_eq!(error.kind, ErrorKind::TriggerCapability);
        assert!(error.message.contains("clientscript"));
    }

    #[test]
    fn declared_returns_under_no_return_trigger_error_at_declaration() {
        let error = single_error("[clientscript,t](int)\n");
        assert_eq!(error.kind, ErrorKind::TriggerCapability);
    }

    #[test]
    fn call_resolves_against_declarations_in_any_order() {
        analyze_ok(indoc! {"
            [proc,caller](int)
            return ~callee(3);
            [proc,callee](int $x)(int)
            return $x;
        "});
    }

    #[test]
    fn call_to_unknown_script_is_unresolved() {
        let error = single_error("[proc,t]\n~missing();\n");
        assert_eq!(error.kind, ErrorKind::UnresolvedSymbol);
    }

    #[test]
    fn call_arity_is_checked_by_flattened_types() {
        let error = single_error(indoc! {"
            [proc,caller]
            ~callee(1);
            [proc,callee](int $x, string $s)
            return;
        "});
        assert_eq!(error.kind, ErrorKind::Arity);
        assert!(error.message.contains("int,string"));
    }

    #[test]
    fn multi_value_return_matches_flattened_return_type() {
        analyze_ok("[proc,pair](int,string)\nreturn 1, \"a\";\n");
        let error = single_error("[proc,pair](int,string)\nreturn \"a\", 1;\n");
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn break_outside_a_loop_is_misplaced() {
        let error = single_error("[proc,t]\nbreak;\n");
        assert_eq!(error.kind, ErrorKind::MisplacedStatement);
        assert!(error.message.contains("Break"));
    }

    #[test]
    fn continue_outside_a_loop_is_misplaced() {
        let error = single_error("[proc,t]\ncontinue;\n");
        assert_eq!(error.kind, ErrorKind::MisplacedStatement);
    }

    #[test]
    fn break_and_continue_inside_loops_are_allowed() {
        analyze_ok(indoc! {"
            [proc,t](int $a)
            while ($a > 0) {
                if ($a = 5) {
                    continue;
                }
                break;
            }
            do {
                break;
            } while ($a > 0);
        "});
    }

    #[test]
    fn break_after_a_loop_body_ends_is_misplaced_again() {
        let error = single_error(indoc! {"
            [proc,t](int $a)
            while ($a > 0) {
                $a = $a - 1;
            }
            break;
        "});
        assert_eq!(error.kind, ErrorKind::MisplacedStatement);
    }

    #[test]
    fn do_while_condition_must_be_boolean() {
        let error = single_error(indoc! {"
            [proc,t](int $a)
            do {
                $a = $a - 1;
            } while ($a);
        "});
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
        assert!(error.message.contains("boolean"));
    }

    #[test]
    fn condition_must_be_boolean() {
        let error = single_error("[proc,t]\nif (1) return;\n");
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
        assert!(error.message.contains("boolean"));
    }

    #[test]
    fn comparisons_and_logical_operators_type_as_boolean() {
        analyze_ok(indoc! {"
            [proc,t](int $a, int $b)
            if ($a < $b & $a > 0 | $a = $b) return;
        "});
    }

    #[test]
    fn duplicate_switch_case_key_errors() {
        let error = single_error(indoc! {"
            [proc,t](int $x)
            switch_int ($x) {
                case 1, 1:
                    return;
            }
        "});
        assert_eq!(error.kind, ErrorKind::DuplicateDeclaration);
        assert!(error.message.contains("1"));
    }

    #[test]
    fn switch_case_keys_fold_to_constants() {
        let scripts = analyze_ok(indoc! {"
            [proc,t](int $x)
            switch_int ($x) {
                case 3, 5:
                    return;
                case default:
                    return;
            }
        "});
        match &scripts[0].body[0].kind {
            StmtKind::Switch { cases, .. } => {
                assert_eq!(cases[0].resolved_keys, vec![3, 5]);
            }
            other => panic!("expected switch, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_script_signature_errors() {
        let error = single_error(indoc! {"
            [proc,t]
            return;
            [proc,t]
            return;
        "});
        assert_eq!(error.kind, ErrorKind::DuplicateDeclaration);
        assert!(error.message.contains("[proc,t]"));
    }

    #[test]
    fn variables_are_stamped_with_resolved_symbols() {
        let scripts = analyze_ok("[proc,t](int $a)(int)\nreturn $a;\n");
        match &scripts[0].body[0].kind {
            StmtKind::Return(Some(expr)) => match &expr.kind {
                ExprKind::Variable { resolved, .. } => {
                    let info = resolved.as_ref().expect("resolved");
                    assert_eq!(info.ty, Type::INT);
                    assert_eq!(info.domain, VariableDomain::Local);
                }
                other => panic!("expected variable, got {other:?}"),
            },
            other => panic!("expected return, got {other:?}"),
        }
    }
}
