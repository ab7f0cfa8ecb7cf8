use rustc_hash::FxHashMap;

use crate::ast::{Expr, ExprKind, Operator, Script, Stmt, StmtKind};
use crate::binary::BinaryScript;
use crate::error::{CompileError, ErrorKind, Phase};
use crate::opcode::CoreOpcode;
use crate::span::SourceRange;
use crate::symbol::{VariableDomain, VariableInfo};
use crate::types::{DefaultValue, PrimitiveType, StackType, Type};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub id: usize,
    pub name: String,
}

/// Execution falls through to the next block in bind order unless an
/// instruction branches.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub label: Label,
    pub instructions: Vec<Instruction>,
}

// Symbolic until the writer resolves it.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i32),
    Long(i64),
    String(String),
    Label(Label),
    Local { stack: StackType, slot: usize },
    Table(usize),
    ScriptName(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: CoreOpcode,
    pub operand: Operand,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchTable {
    pub id: usize,
    pub cases: Vec<SwitchTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchTarget {
    pub keys: Vec<i32>,
    pub label: Label,
}

/// Turns analyzer slot ids into the dense per-stack indices the runtime
/// frames use, parameters first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalMap {
    parameters: FxHashMap<StackType, Vec<usize>>,
    locals: FxHashMap<StackType, Vec<usize>>,
}

impl LocalMap {
    pub fn register_parameter(&mut self, stack: StackType, slot: usize) {
        self.parameters.entry(stack).or_default().push(slot);
    }

    pub fn register_local(&mut self, stack: StackType, slot: usize) {
        self.locals.entry(stack).or_default().push(slot);
    }

    pub fn parameter_count(&self, stack: StackType) -> usize {
        self.parameters.get(&stack).map_or(0, Vec::len)
    }

    pub fn local_count(&self, stack: StackType) -> usize {
        self.locals.get(&stack).map_or(0, Vec::len)
    }

    pub fn index_of(&self, stack: StackType, slot: usize) -> Option<usize> {
        let parameters = self.parameters.get(&stack);
        if let Some(position) = parameters.and_then(|slots| slots.iter().position(|&s| s == slot))
        {
            return Some(position);
        }
        let offset = parameters.map_or(0, Vec::len);
        self.locals
            .get(&stack)
            .and_then(|slots| slots.iter().position(|&s| s == slot))
            .map(|position| offset + position)
    }
}

struct Context {
    name: String,
    returns: Type,
}

/// Branch targets of the innermost enclosing loop.
struct LoopLabels {
    continue_label: Label,
    break_label: Label,
}

/// Lowers analyzed scripts to blocks of symbolic instructions. Expects a
/// tree the analyzer finished without errors.
pub struct CodeGenerator {
    contexts: Vec<Context>,
    blocks: Vec<Block>,
    locals: LocalMap,
    switches: Vec<SwitchTable>,
    loops: Vec<LoopLabels>,
    labels: usize,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            contexts: Vec::new(),
            blocks: Vec::new(),
            locals: LocalMap::default(),
            switches: Vec::new(),
            loops: Vec::new(),
            labels: 0,
        }
    }

    pub fn generate(&mut self, script: &Script) -> Result<BinaryScript, CompileError> {
        self.blocks.clear();
        self.switches.clear();
        self.locals = LocalMap::default();
        self.loops.clear();
        self.labels = 0;
        self.contexts.push(Context {
            name: script.full_name(),
            returns: script.returns.clone(),
        });

        let entry = self.label("entry");
        self.bind(&entry);
        // Parameter slots mirror the analyzer's declaration order.
        for (slot, parameter) in script.parameters.iter().enumerate() {
            if let Some(stack) = parameter.ty.stack_type() {
                self.locals.register_parameter(stack, slot);
            }
        }
        for stmt in &script.body {
            self.statement(stmt)?;
        }
        self.terminate(script.range)?;

        let context = self.contexts.pop();
        Ok(BinaryScript {
            name: context.map(|c| c.name).unwrap_or_default(),
            blocks: std::mem::take(&mut self.blocks),
            locals: std::mem::take(&mut self.locals),
            switches: std::mem::take(&mut self.switches),
        })
    }

    // Implicit return when control can fall off the end: defaults for every
    // declared return slot, then a return.
    fn terminate(&mut self, range: SourceRange) -> Result<(), CompileError> {
        let ends_in_return = self
            .blocks
            .last()
            .and_then(|block| block.instructions.last())
            .is_some_and(|instruction| instruction.opcode == CoreOpcode::Return);
        if ends_in_return {
            return Ok(());
        }
        let returns = self
            .contexts
            .last()
            .map(|context| context.returns.clone())
            .unwrap_or_else(Type::unit);
        for primitive in returns.flattened() {
            self.push_default(primitive, range);
        }
        self.emit(CoreOpcode::Return, Operand::Int(0), range);
        Ok(())
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        let range = stmt.range;
        match &stmt.kind {
            StmtKind::Block(statements) => {
                for statement in statements {
                    self.statement(statement)?;
                }
            }
            StmtKind::If {
                condition,
                true_branch,
                false_branch,
            } => {
                let true_label = self.label("if_true");
                match false_branch {
                    Some(false_branch) => {
                        let else_label = self.label("if_else");
                        let end = self.label("if_end");
                        self.condition(condition, &true_label, &else_label)?;
                        self.bind(&true_label);
                        self.statement(true_branch)?;
                        self.emit(CoreOpcode::Branch, Operand::Label(end.clone()), range);
                        self.bind(&else_label);
                        self.statement(false_branch)?;
                        self.bind(&end);
                    }
                    None => {
                        let end = self.label("if_end");
                        self.condition(condition, &true_label, &end)?;
                        self.bind(&true_label);
                        self.statement(true_branch)?;
                        self.bind(&end);
                    }
                }
            }
            StmtKind::While { condition, body } => {
                let start = self.label("while_start");
                let body_label = self.label("while_true");
                let end = self.label("while_end");
                self.bind(&start);
                self.condition(condition, &body_label, &end)?;
                self.bind(&body_label);
                self.loops.push(LoopLabels {
                    continue_label: start.clone(),
                    break_label: end.clone(),
                });
                self.statement(body)?;
                self.loops.pop();
                // Back-branch to re-evaluate the condition.
                self.emit(CoreOpcode::Branch, Operand::Label(start), range);
                self.bind(&end);
            }
            StmtKind::DoWhile { body, condition } => {
                let body_label = self.label("do_body");
                let condition_label = self.label("do_cond");
                let end = self.label("do_end");
                self.bind(&body_label);
                self.loops.push(LoopLabels {
                    continue_label: condition_label.clone(),
                    break_label: end.clone(),
                });
                self.statement(body)?;
                self.loops.pop();
                self.bind(&condition_label);
                self.condition(condition, &body_label, &end)?;
                self.bind(&end);
            }
            StmtKind::Break => {
                let target = self.loop_target(range, |labels| labels.break_label.clone())?;
                self.emit(CoreOpcode::Branch, Operand::Label(target), range);
            }
            StmtKind::Continue => {
                let target = self.loop_target(range, |labels| labels.continue_label.clone())?;
                self.emit(CoreOpcode::Branch, Operand::Label(target), range);
            }
            StmtKind::Declaration {
                ty,
                initializer,
                resolved,
                ..
            } => {
                match initializer {
                    Some(initializer) => self.expression(initializer)?,
                    None => self.push_default(*ty, range),
                }
                let info = self.resolved(resolved, range)?;
                if let Some(stack) = stack_of(&info.ty) {
                    self.locals.register_local(stack, info.slot);
                }
                self.store(&info, range)?;
            }
            StmtKind::Assignment {
                value, resolved, ..
            } => {
                self.expression(value)?;
                let info = self.resolved(resolved, range)?;
                self.store(&info, range)?;
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expression(value)?;
                }
                self.emit(CoreOpcode::Return, Operand::Int(0), range);
            }
            StmtKind::Switch {
                condition,
                cases,
                default_case,
                ..
            } => {
                self.expression(condition)?;
                let end = self.label("switch_end");
                let table = self.switches.len();
                let mut targets = Vec::with_capacity(cases.len());
                let mut case_labels = Vec::with_capacity(cases.len());
                for case in cases {
                    let label = self.label("switch_case");
                    targets.push(SwitchTarget {
                        keys: case.resolved_keys.clone(),
                        label: label.clone(),
                    });
                    case_labels.push(label);
                }
                self.switches.push(SwitchTable { id: table, cases: targets });
                self.emit(CoreOpcode::Switch, Operand::Table(table), range);
                // No key matched: fall to the default case, or past the
                // whole construct when there is none.
                let default_label = default_case.as_ref().map(|_| self.label("switch_default"));
                let miss = default_label.clone().unwrap_or_else(|| end.clone());
                self.emit(CoreOpcode::Branch, Operand::Label(miss), range);
                for (case, label) in cases.iter().zip(case_labels) {
                    self.bind(&label);
                    for statement in &case.body {
                        self.statement(statement)?;
                    }
                    self.emit(CoreOpcode::Branch, Operand::Label(end.clone()), case.range);
                }
                if let (Some(case), Some(label)) = (default_case, default_label) {
                    self.bind(&label);
                    for statement in &case.body {
                        self.statement(statement)?;
                    }
                    self.emit(CoreOpcode::Branch, Operand::Label(end.clone()), case.range);
                }
                self.bind(&end);
            }
            StmtKind::Expression(expr) => {
                self.expression(expr)?;
                let ty = expr.ty.clone().unwrap_or_else(Type::unit);
                for primitive in ty.flattened().into_iter().rev() {
                    let opcode = match primitive.stack_type() {
                        Some(StackType::String) => CoreOpcode::PopStringDiscard,
                        Some(StackType::Long) => CoreOpcode::PopLongDiscard,
                        _ => CoreOpcode::PopIntDiscard,
                    };
                    self.emit(opcode, Operand::Int(0), range);
                }
            }
            StmtKind::Error => {}
        }
        Ok(())
    }

    fn expression(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let range = expr.range;
        match &expr.kind {
            ExprKind::LiteralInt(value) => {
                self.emit(CoreOpcode::PushConstantInt, Operand::Int(*value), range);
            }
            ExprKind::LiteralLong(value) => {
                self.emit(CoreOpcode::PushConstantLong, Operand::Long(*value), range);
            }
            ExprKind::LiteralString(value) => {
                self.emit(
                    CoreOpcode::PushConstantString,
                    Operand::String(value.clone()),
                    range,
                );
            }
            ExprKind::LiteralBool(value) => {
                self.emit(
                    CoreOpcode::PushConstantInt,
                    Operand::Int(*value as i32),
                    range,
                );
            }
            ExprKind::Variable { resolved, .. } => {
                let info = self.resolved(resolved, range)?;
                self.load(&info, range)?;
            }
            ExprKind::Binary {
                operator,
                left,
                right,
            } => {
                if operator.is_arithmetic() {
                    self.expression(left)?;
                    self.expression(right)?;
                    let opcode = match operator {
                        Operator::Add => CoreOpcode::Add,
                        Operator::Subtract => CoreOpcode::Sub,
                        Operator::Multiply => CoreOpcode::Mul,
                        Operator::Divide => CoreOpcode::Div,
                        _ => CoreOpcode::Mod,
                    };
                    self.emit(opcode, Operand::Int(0), range);
                } else {
                    // A comparison in value position materializes 1 or 0.
                    let true_label = self.label("cond_true");
                    let false_label = self.label("cond_false");
                    let end = self.label("cond_end");
                    self.condition(expr, &true_label, &false_label)?;
                    self.bind(&true_label);
                    self.emit(CoreOpcode::PushConstantInt, Operand::Int(1), range);
                    self.emit(CoreOpcode::Branch, Operand::Label(end.clone()), range);
                    self.bind(&false_label);
                    self.emit(CoreOpcode::PushConstantInt, Operand::Int(0), range);
                    self.bind(&end);
                }
            }
            ExprKind::Call { name, arguments } => {
                for argument in arguments {
                    self.expression(argument)?;
                }
                self.emit(
                    CoreOpcode::GosubWithParams,
                    Operand::ScriptName(format!("[proc,{}]", name.text)),
                    range,
                );
            }
            ExprKind::Tuple(values) => {
                for value in values {
                    self.expression(value)?;
                }
            }
            ExprKind::Error => {}
        }
        Ok(())
    }

    // Jump to `true_label` when the condition holds, `false_label`
    // otherwise. Logical operators short-circuit.
    fn condition(
        &mut self,
        expr: &Expr,
        true_label: &Label,
        false_label: &Label,
    ) -> Result<(), CompileError> {
        let range = expr.range;
        if let ExprKind::Binary {
            operator,
            left,
            right,
        } = &expr.kind
        {
            match operator {
                Operator::Or => {
                    let next = self.label("or_next");
                    self.condition(left, true_label, &next)?;
                    self.bind(&next);
                    self.condition(right, true_label, false_label)?;
                    return Ok(());
                }
                Operator::And => {
                    let next = self.label("and_next");
                    self.condition(left, &next, false_label)?;
                    self.bind(&next);
                    self.condition(right, true_label, false_label)?;
                    return Ok(());
                }
                operator if operator.is_relational() => {
                    self.expression(left)?;
                    self.expression(right)?;
                    let opcode = match operator {
                        Operator::Equal => CoreOpcode::BranchEquals,
                        Operator::NotEqual => CoreOpcode::BranchNot,
                        Operator::LessThan => CoreOpcode::BranchLessThan,
                        Operator::GreaterThan => CoreOpcode::BranchGreaterThan,
                        Operator::LessThanOrEqual => CoreOpcode::BranchLessThanOrEquals,
                        _ => CoreOpcode::BranchGreaterThanOrEquals,
                    };
                    self.emit(opcode, Operand::Label(true_label.clone()), range);
                    self.emit(
                        CoreOpcode::Branch,
                        Operand::Label(false_label.clone()),
                        range,
                    );
                    return Ok(());
                }
                _ => {}
            }
        }
        // Any other boolean-typed expression: compare its value to 1.
        self.expression(expr)?;
        self.emit(CoreOpcode::PushConstantInt, Operand::Int(1), range);
        self.emit(
            CoreOpcode::BranchEquals,
            Operand::Label(true_label.clone()),
            range,
        );
        self.emit(
            CoreOpcode::Branch,
            Operand::Label(false_label.clone()),
            range,
        );
        Ok(())
    }

    fn load(&mut self, info: &VariableInfo, range: SourceRange) -> Result<(), CompileError> {
        let stack = self.stack_for(info, range)?;
        let (opcode, operand) = match info.domain {
            VariableDomain::Local => (
                match stack {
                    StackType::Int => CoreOpcode::PushIntLocal,
                    StackType::String => CoreOpcode::PushStringLocal,
                    StackType::Long => CoreOpcode::PushLongLocal,
                },
                Operand::Local {
                    stack,
                    slot: info.slot,
                },
            ),
            VariableDomain::Global => (
                match stack {
                    StackType::Int => CoreOpcode::PushIntGlobal,
                    StackType::String => CoreOpcode::PushStringGlobal,
                    StackType::Long => CoreOpcode::PushLongGlobal,
                },
                Operand::Int(info.slot as i32),
            ),
        };
        self.emit(opcode, operand, range);
        Ok(())
    }

    fn store(&mut self, info: &VariableInfo, range: SourceRange) -> Result<(), CompileError> {
        let stack = self.stack_for(info, range)?;
        let (opcode, operand) = match info.domain {
            VariableDomain::Local => (
                match stack {
                    StackType::Int => CoreOpcode::PopIntLocal,
                    StackType::String => CoreOpcode::PopStringLocal,
                    StackType::Long => CoreOpcode::PopLongLocal,
                },
                Operand::Local {
                    stack,
                    slot: info.slot,
                },
            ),
            VariableDomain::Global => (
                match stack {
                    StackType::Int => CoreOpcode::PopIntGlobal,
                    StackType::String => CoreOpcode::PopStringGlobal,
                    StackType::Long => CoreOpcode::PopLongGlobal,
                },
                Operand::Int(info.slot as i32),
            ),
        };
        self.emit(opcode, operand, range);
        Ok(())
    }

    fn push_default(&mut self, primitive: PrimitiveType, range: SourceRange) {
        match primitive.default_value() {
            DefaultValue::Int(value) => {
                self.emit(CoreOpcode::PushConstantInt, Operand::Int(value), range);
            }
            DefaultValue::Long(value) => {
                self.emit(CoreOpcode::PushConstantLong, Operand::Long(value), range);
            }
            DefaultValue::String(value) => {
                self.emit(
                    CoreOpcode::PushConstantString,
                    Operand::String(value.to_owned()),
                    range,
                );
            }
        }
    }

    fn loop_target(
        &self,
        range: SourceRange,
        pick: impl Fn(&LoopLabels) -> Label,
    ) -> Result<Label, CompileError> {
        self.loops.last().map(pick).ok_or_else(|| {
            CompileError::new(
                Phase::Codegen,
                ErrorKind::MisplacedStatement,
                range,
                "Loop control statement outside of a loop",
            )
        })
    }

    fn resolved(
        &self,
        resolved: &Option<VariableInfo>,
        range: SourceRange,
    ) -> Result<VariableInfo, CompileError> {
        resolved.clone().ok_or_else(|| {
            CompileError::new(
                Phase::Codegen,
                ErrorKind::UnresolvedSymbol,
                range,
                "Variable was not resolved by analysis",
            )
        })
    }

    fn stack_for(
        &self,
        info: &VariableInfo,
        range: SourceRange,
    ) -> Result<StackType, CompileError> {
        stack_of(&info.ty).ok_or_else(|| {
            CompileError::new(
                Phase::Codegen,
                ErrorKind::TypeMismatch,
                range,
                format!("Variable ${} has no stack type", info.name),
            )
        })
    }

    fn label(&mut self, prefix: &str) -> Label {
        let id = self.labels;
        self.labels += 1;
        Label {
            id,
            name: format!("{prefix}_{id}"),
        }
    }

    fn bind(&mut self, label: &Label) {
        self.blocks.push(Block {
            label: label.clone(),
            instructions: Vec::new(),
        });
    }

    fn emit(&mut self, opcode: CoreOpcode, operand: Operand, range: SourceRange) {
        if let Some(block) = self.blocks.last_mut() {
            block.instructions.push(Instruction {
                opcode,
                operand,
                range,
            });
        }
    }
}

fn stack_of(ty: &Type) -> Option<StackType> {
    ty.stack_type()
}
