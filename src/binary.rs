use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use crate::codegen::{Block, LocalMap, Operand, SwitchTable};
use crate::error::{CompileError, ErrorKind, Phase};
use crate::idmap::IdProvider;
use crate::opcode::{CoreOpcode, InstructionMap};
use crate::span::SourceRange;
use crate::types::StackType;

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryScript {
    pub name: String,
    pub blocks: Vec<Block>,
    pub locals: LocalMap,
    pub switches: Vec<SwitchTable>,
}

impl BinaryScript {
    pub fn listing(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.name);
        let mut address = 0usize;
        for block in &self.blocks {
            let _ = writeln!(out, "  {}:", block.label.name);
            for instruction in &block.instructions {
                let operand = match &instruction.operand {
                    Operand::Int(value) => value.to_string(),
                    Operand::Long(value) => format!("{value}L"),
                    Operand::String(value) => format!("{value:?}"),
                    Operand::Label(label) => label.name.clone(),
                    Operand::Local { stack, slot } => format!("{stack:?}[{slot}]"),
                    Operand::Table(index) => format!("table#{index}"),
                    Operand::ScriptName(name) => name.clone(),
                };
                let _ = writeln!(
                    out,
                    "    {address:4}: {:<28} {operand}",
                    instruction.opcode.mnemonic()
                );
                address += 1;
            }
        }
        out
    }
}

/// Sink for generated scripts.
pub trait CodeWriter {
    type Output;

    fn write(&mut self, script: &BinaryScript) -> Result<Self::Output, CompileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameCounts {
    pub int: usize,
    pub string: usize,
    pub long: usize,
}

impl FrameCounts {
    fn get(&self, stack: StackType) -> usize {
        match stack {
            StackType::Int => self.int,
            StackType::String => self.string,
            StackType::Long => self.long,
        }
    }

    fn set(&mut self, stack: StackType, value: usize) {
        match stack {
            StackType::Int => self.int = value,
            StackType::String => self.string = value,
            StackType::Long => self.long = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BytecodeOperand {
    Int(i32),
    Long(i64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeInstruction {
    pub code: i32,
    pub large: bool,
    pub operand: BytecodeOperand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeScript {
    pub name: String,
    pub parameter_counts: FrameCounts,
    // Parameters included.
    pub local_counts: FrameCounts,
    pub instructions: Vec<BytecodeInstruction>,
    pub switch_tables: Vec<Vec<(i32, i32)>>,
}

impl BytecodeScript {
    // Layout: name, instruction stream, switch tables, frame-count trailer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.name.as_bytes());
        out.push(0);
        push_u32(&mut out, self.instructions.len() as u32);
        for instruction in &self.instructions {
            push_u16(&mut out, instruction.code as u16);
            match &instruction.operand {
                BytecodeOperand::String(value) => {
                    out.extend_from_slice(value.as_bytes());
                    out.push(0);
                }
                BytecodeOperand::Long(value) => out.extend_from_slice(&value.to_be_bytes()),
                BytecodeOperand::Int(value) => {
                    if instruction.large {
                        out.extend_from_slice(&value.to_be_bytes());
                    } else {
                        out.push(*value as u8);
                    }
                }
            }
        }
        out.push(self.switch_tables.len() as u8);
        for table in &self.switch_tables {
            push_u16(&mut out, table.len() as u16);
            for (key, offset) in table {
                out.extend_from_slice(&key.to_be_bytes());
                out.extend_from_slice(&offset.to_be_bytes());
            }
        }
        for counts in [&self.local_counts, &self.parameter_counts] {
            push_u16(&mut out, counts.int as u16);
            push_u16(&mut out, counts.string as u16);
            push_u16(&mut out, counts.long as u16);
        }
        out
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Two passes: the first assigns every instruction an address and every
/// label the address of its block, the second rewrites symbolic operands
/// into numbers. Branch offsets are relative to the following instruction,
/// switch offsets to their switch instruction.
pub struct BytecodeWriter<'a> {
    instructions: &'a InstructionMap,
    ids: &'a dyn IdProvider,
}

impl<'a> BytecodeWriter<'a> {
    pub fn new(instructions: &'a InstructionMap, ids: &'a dyn IdProvider) -> Self {
        Self { instructions, ids }
    }

    fn internal(
        &self,
        script: &BinaryScript,
        message: impl Into<String>,
    ) -> CompileError {
        let range = script
            .blocks
            .first()
            .and_then(|block| block.instructions.first())
            .map(|instruction| instruction.range)
            .unwrap_or_default();
        CompileError::new(Phase::Codegen, ErrorKind::UnresolvedSymbol, range, message)
    }
}

impl CodeWriter for BytecodeWriter<'_> {
    type Output = BytecodeScript;

    fn write(&mut self, script: &BinaryScript) -> Result<BytecodeScript, CompileError> {
        if !self.instructions.is_ready() {
            return Err(self.internal(script, "Instruction map is missing core opcode bindings"));
        }
        // The serialized form stores the table count in one byte and each
        // table's case count in two.
        if script.switches.len() > u8::MAX as usize {
            return Err(CompileError::new(
                Phase::Codegen,
                ErrorKind::LimitExceeded,
                SourceRange::default(),
                format!(
                    "Script has {} switch tables; the bytecode format allows {}",
                    script.switches.len(),
                    u8::MAX
                ),
            ));
        }

        let mut label_addresses: FxHashMap<usize, i32> = FxHashMap::default();
        let mut address = 0i32;
        for block in &script.blocks {
            label_addresses.insert(block.label.id, address);
            address += block.instructions.len() as i32;
        }

        let mut instructions = Vec::with_capacity(address as usize);
        let mut switch_addresses: FxHashMap<usize, i32> = FxHashMap::default();
        let mut address = 0i32;
        for block in &script.blocks {
            for instruction in &block.instructions {
                let mapped = self
                    .instructions
                    .lookup(instruction.opcode)
                    .ok_or_else(|| self.internal(script, "Unmapped core opcode"))?;
                let operand = match &instruction.operand {
                    Operand::Int(value) => BytecodeOperand::Int(*value),
                    Operand::Long(value) => BytecodeOperand::Long(*value),
                    Operand::String(value) => BytecodeOperand::String(value.clone()),
                    Operand::Label(label) => {
                        let target = label_addresses.get(&label.id).ok_or_else(|| {
                            self.internal(script, format!("Unbound label: {}", label.name))
                        })?;
                        BytecodeOperand::Int(target - address - 1)
                    }
                    Operand::Local { stack, slot } => {
                        let index = script.locals.index_of(*stack, *slot).ok_or_else(|| {
                            self.internal(script, format!("Unregistered local slot: {slot}"))
                        })?;
                        BytecodeOperand::Int(index as i32)
                    }
                    Operand::Table(index) => {
                        if instruction.opcode == CoreOpcode::Switch {
                            switch_addresses.insert(*index, address);
                        }
                        BytecodeOperand::Int(*index as i32)
                    }
                    Operand::ScriptName(name) => {
                        let id = self.ids.find_script(name).ok_or_else(|| {
                            CompileError::new(
                                Phase::Codegen,
                                ErrorKind::UnknownScriptReference,
                                instruction.range,
                                format!("Could not find a script with the name: {name}"),
                            )
                        })?;
                        BytecodeOperand::Int(id)
                    }
                };
                instructions.push(BytecodeInstruction {
                    code: mapped.code,
                    large: mapped.large,
                    operand,
                });
                address += 1;
            }
        }

        let mut switch_tables = Vec::with_capacity(script.switches.len());
        for table in &script.switches {
            let base = switch_addresses.get(&table.id).copied().ok_or_else(|| {
                self.internal(script, format!("Switch table {} is never used", table.id))
            })?;
            let mut entries = Vec::new();
            for target in &table.cases {
                let target_address = label_addresses.get(&target.label.id).ok_or_else(|| {
                    self.internal(script, format!("Unbound label: {}", target.label.name))
                })?;
                for key in &target.keys {
                    entries.push((*key, target_address - base - 1));
                }
            }
            if entries.len() > u16::MAX as usize {
                return Err(CompileError::new(
                    Phase::Codegen,
                    ErrorKind::LimitExceeded,
                    SourceRange::default(),
                    format!(
                        "Switch table has {} cases; the bytecode format allows {}",
                        entries.len(),
                        u16::MAX
                    ),
                ));
            }
            switch_tables.push(entries);
        }

        let mut parameter_counts = FrameCounts::default();
        let mut local_counts = FrameCounts::default();
        for stack in [StackType::Int, StackType::String, StackType::Long] {
            let parameters = script.locals.parameter_count(stack);
            parameter_counts.set(stack, parameters);
            local_counts.set(stack, parameters + script.locals.local_count(stack));
        }
        debug_assert!(local_counts.get(StackType::Int) >= parameter_counts.get(StackType::Int));

        Ok(BytecodeScript {
            name: script.name.clone(),
            parameter_counts,
            local_counts,
            instructions,
            switch_tables,
        })
    }
}
