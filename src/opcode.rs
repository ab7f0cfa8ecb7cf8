use rustc_hash::FxHashMap;

// Core opcodes are abstract; the instruction map binds each one to the
// numeric opcode of a concrete runtime revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreOpcode {
    PushConstantInt,
    PushConstantString,
    PushConstantLong,
    PushIntLocal,
    PushStringLocal,
    PushLongLocal,
    PopIntLocal,
    PopStringLocal,
    PopLongLocal,
    PushIntGlobal,
    PushStringGlobal,
    PushLongGlobal,
    PopIntGlobal,
    PopStringGlobal,
    PopLongGlobal,
    Branch,
    BranchNot,
    BranchEquals,
    BranchLessThan,
    BranchGreaterThan,
    BranchLessThanOrEquals,
    BranchGreaterThanOrEquals,
    Switch,
    GosubWithParams,
    Return,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    PopIntDiscard,
    PopStringDiscard,
    PopLongDiscard,
}

impl CoreOpcode {
    pub const ALL: [CoreOpcode; 33] = [
        CoreOpcode::PushConstantInt,
        CoreOpcode::PushConstantString,
        CoreOpcode::PushConstantLong,
        CoreOpcode::PushIntLocal,
        CoreOpcode::PushStringLocal,
        CoreOpcode::PushLongLocal,
        CoreOpcode::PopIntLocal,
        CoreOpcode::PopStringLocal,
        CoreOpcode::PopLongLocal,
        CoreOpcode::PushIntGlobal,
        CoreOpcode::PushStringGlobal,
        CoreOpcode::PushLongGlobal,
        CoreOpcode::PopIntGlobal,
        CoreOpcode::PopStringGlobal,
        CoreOpcode::PopLongGlobal,
        CoreOpcode::Branch,
        CoreOpcode::BranchNot,
        CoreOpcode::BranchEquals,
        CoreOpcode::BranchLessThan,
        CoreOpcode::BranchGreaterThan,
        CoreOpcode::BranchLessThanOrEquals,
        CoreOpcode::BranchGreaterThanOrEquals,
        CoreOpcode::Switch,
        CoreOpcode::GosubWithParams,
        CoreOpcode::Return,
        CoreOpcode::Add,
        CoreOpcode::Sub,
        CoreOpcode::Mul,
        CoreOpcode::Div,
        CoreOpcode::Mod,
        CoreOpcode::PopIntDiscard,
        CoreOpcode::PopStringDiscard,
        CoreOpcode::PopLongDiscard,
    ];

    // The narrow (single-byte operand) set is fixed by the runtime.
    pub fn is_large_operand(&self) -> bool {
        !matches!(
            self,
            CoreOpcode::Return
                | CoreOpcode::PopIntDiscard
                | CoreOpcode::PopStringDiscard
                | CoreOpcode::Add
                | CoreOpcode::Sub
                | CoreOpcode::Mul
                | CoreOpcode::Div
                | CoreOpcode::Mod
        )
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            CoreOpcode::PushConstantInt => "push_constant_int",
            CoreOpcode::PushConstantString => "push_constant_string",
            CoreOpcode::PushConstantLong => "push_constant_long",
            CoreOpcode::PushIntLocal => "push_int_local",
            CoreOpcode::PushStringLocal => "push_string_local",
            CoreOpcode::PushLongLocal => "push_long_local",
            CoreOpcode::PopIntLocal => "pop_int_local",
            CoreOpcode::PopStringLocal => "pop_string_local",
            CoreOpcode::PopLongLocal => "pop_long_local",
            CoreOpcode::PushIntGlobal => "push_int_global",
            CoreOpcode::PushStringGlobal => "push_string_global",
            CoreOpcode::PushLongGlobal => "push_long_global",
            CoreOpcode::PopIntGlobal => "pop_int_global",
            CoreOpcode::PopStringGlobal => "pop_string_global",
            CoreOpcode::PopLongGlobal => "pop_long_global",
            CoreOpcode::Branch => "branch",
            CoreOpcode::BranchNot => "branch_not",
            CoreOpcode::BranchEquals => "branch_equals",
            CoreOpcode::BranchLessThan => "branch_less_than",
            CoreOpcode::BranchGreaterThan => "branch_greater_than",
            CoreOpcode::BranchLessThanOrEquals => "branch_less_than_or_equals",
            CoreOpcode::BranchGreaterThanOrEquals => "branch_greater_than_or_equals",
            CoreOpcode::Switch => "switch",
            CoreOpcode::GosubWithParams => "gosub_with_params",
            CoreOpcode::Return => "return",
            CoreOpcode::Add => "add",
            CoreOpcode::Sub => "sub",
            CoreOpcode::Mul => "mul",
            CoreOpcode::Div => "div",
            CoreOpcode::Mod => "mod",
            CoreOpcode::PopIntDiscard => "pop_int_discard",
            CoreOpcode::PopStringDiscard => "pop_string_discard",
            CoreOpcode::PopLongDiscard => "pop_long_discard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedOpcode {
    pub opcode: CoreOpcode,
    pub code: i32,
    pub large: bool,
}

/// The writer refuses to run until every core opcode has a binding.
#[derive(Debug, Default)]
pub struct InstructionMap {
    mappings: FxHashMap<CoreOpcode, MappedOpcode>,
}

impl InstructionMap {
    pub fn new() -> Self {
        Self::default()
    }

    // Sequential numbering for runtimes without a bespoke one.
    pub fn with_defaults() -> Self {
        let mut map = Self::new();
        for (code, opcode) in CoreOpcode::ALL.into_iter().enumerate() {
            map.register(opcode, code as i32);
        }
        map
    }

    pub fn register(&mut self, opcode: CoreOpcode, code: i32) {
        self.mappings.insert(
            opcode,
            MappedOpcode {
                opcode,
                code,
                large: opcode.is_large_operand(),
            },
        );
    }

    pub fn lookup(&self, opcode: CoreOpcode) -> Option<MappedOpcode> {
        self.mappings.get(&opcode).copied()
    }

    pub fn is_ready(&self) -> bool {
        CoreOpcode::ALL
            .iter()
            .all(|opcode| self.mappings.contains_key(opcode))
    }
}
