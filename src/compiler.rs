use rustc_hash::FxHashMap;

use crate::analysis::Analyzer;
use crate::binary::{BinaryScript, BytecodeScript, BytecodeWriter, CodeWriter};
use crate::codegen::CodeGenerator;
use crate::error::CompileError;
use crate::idmap::IdProvider;
use crate::lexer::Lexer;
use crate::opcode::InstructionMap;
use crate::parser::ScriptParser;
use crate::symbol::SymbolTable;
use crate::table::{script_table, LexicalTable};
use crate::token::Kind;
use crate::trigger::TriggerType;
use crate::types::Type;

/// Registry of the trigger types a deployment accepts. Nothing here is
/// global; two environments can disagree about what triggers exist.
#[derive(Debug, Default)]
pub struct CompilerEnvironment {
    triggers: FxHashMap<String, TriggerType>,
}

impl CompilerEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut environment = Self::new();
        for trigger in TriggerType::ALL {
            environment.register_trigger(trigger);
        }
        environment
    }

    pub fn register_trigger(&mut self, trigger: TriggerType) {
        self.triggers
            .insert(trigger.representation().to_owned(), trigger);
    }

    pub fn lookup_trigger(&self, representation: &str) -> Option<TriggerType> {
        self.triggers.get(representation).copied()
    }
}

#[derive(Debug)]
pub struct CompileResult {
    pub scripts: Vec<BinaryScript>,
    pub errors: Vec<CompileError>,
}

impl CompileResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The compilation pipeline: lex, parse, analyze, generate.
pub struct Compiler {
    table: LexicalTable<Kind>,
    environment: CompilerEnvironment,
    symbols: SymbolTable,
    instructions: InstructionMap,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_instructions(InstructionMap::with_defaults())
    }

    pub fn with_instructions(instructions: InstructionMap) -> Self {
        Self {
            table: script_table(),
            environment: CompilerEnvironment::with_defaults(),
            symbols: SymbolTable::new(),
            instructions,
        }
    }

    pub fn environment(&self) -> &CompilerEnvironment {
        &self.environment
    }

    pub fn define_global(&mut self, name: impl Into<String>, ty: Type) {
        self.symbols.define_global(name, ty);
    }

    // Generation runs only when lexing, parsing and analysis all finished
    // without a single report.
    pub fn compile(&self, source: &str) -> CompileResult {
        let lexer = match Lexer::new(&self.table, source) {
            Ok(lexer) => lexer,
            Err(error) => {
                return CompileResult {
                    scripts: Vec::new(),
                    errors: vec![error],
                }
            }
        };

        let mut parser = ScriptParser::new(lexer);
        let mut scripts = match parser.parse() {
            Ok(scripts) => scripts,
            Err(error) => {
                return CompileResult {
                    scripts: Vec::new(),
                    errors: vec![error],
                }
            }
        };
        let mut errors = parser.take_errors();

        let mut symbols = self.symbols.clone();
        let mut analyzer = Analyzer::new(&self.environment, &mut symbols);
        if let Err(error) = analyzer.declare(&scripts) {
            errors.push(error);
        }
        if let Err(error) = analyzer.check(&mut scripts) {
            errors.push(error);
        }
        errors.extend(analyzer.take_errors());

        if !errors.is_empty() {
            return CompileResult {
                scripts: Vec::new(),
                errors,
            };
        }

        let mut generator = CodeGenerator::new();
        let mut compiled = Vec::new();
        for script in &scripts {
            match generator.generate(script) {
                Ok(binary) => compiled.push(binary),
                Err(error) => errors.push(error),
            }
        }
        CompileResult {
            scripts: compiled,
            errors,
        }
    }

    pub fn assemble(
        &self,
        script: &BinaryScript,
        ids: &dyn IdProvider,
    ) -> Result<BytecodeScript, CompileError> {
        BytecodeWriter::new(&self.instructions, ids).write(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::idmap::ScriptIdTable;
    use indoc::indoc;

    #[test]
    fn environment_lookup_round_trips() {
        let environment = CompilerEnvironment::with_defaults();
        assert_eq!(
            environment.lookup_trigger("proc"),
            Some(TriggerType::Proc)
        );
        assert_eq!(environment.lookup_trigger("onclick"), None);
        assert_eq!(CompilerEnvironment::new().lookup_trigger("proc"), None);
    }

    #[test]
    fn compiles_a_unit_end_to_end() {
        let compiler = Compiler::new();
        let result = compiler.compile(indoc! {"
            [proc,max](int $a, int $b)(int)
            if ($a > $b) {
                return $a;
            }
            return $b;
            [clientscript,startup]
            ~max(1, 2);
        "});
        assert!(result.is_success(), "errors: {:?}", result.errors);
        assert_eq!(result.scripts.len(), 2);
        assert_eq!(result.scripts[0].name, "[proc,max]");
        assert_eq!(result.scripts[1].name, "[clientscript,startup]");
    }

    #[test]
    fn analysis_errors_suppress_generation() {
        let compiler = Compiler::new();
        let result = compiler.compile(indoc! {"
            [proc,ok]
            return;
            [proc,bad](int)
            return \"nope\";
        "});
        assert!(!result.is_success());
        assert!(result.scripts.is_empty());
        assert!(result
            .errors
            .iter()
            .any(|error| error.kind == ErrorKind::TypeMismatch));
    }

    #[test]
    fn lexical_failure_produces_a_single_error() {
        let compiler = Compiler::new();
        let result = compiler.compile("[proc,t]\nreturn @;\n");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Lexical);
        assert!(result.scripts.is_empty());
    }

    #[test]
    fn predeclared_globals_resolve() {
        let mut compiler = Compiler::new();
        compiler.define_global("damage_boost", Type::INT);
        let result = compiler.compile(indoc! {"
            [proc,apply](int $base)(int)
            return $base + %damage_boost;
        "});
        assert!(result.is_success(), "errors: {:?}", result.errors);
    }

    #[test]
    fn assembles_against_an_id_table() {
        let compiler = Compiler::new();
        let result = compiler.compile(indoc! {"
            [proc,caller]
            ~callee();
            [proc,callee]
            return;
        "});
        assert!(result.is_success(), "errors: {:?}", result.errors);

        let mut ids = ScriptIdTable::new();
        ids.insert("[proc,callee]", 7);
        let assembled = compiler.assemble(&result.scripts[0], &ids);
        assert!(assembled.is_ok());

        let missing = compiler.assemble(&result.scripts[0], &ScriptIdTable::new());
        assert_eq!(
            missing.expect_err("should fail").kind,
            ErrorKind::UnknownScriptReference
        );
    }
}
