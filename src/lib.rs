pub mod analysis;
pub mod ast;
pub mod binary;
pub mod codegen;
pub mod compiler;
pub mod error;
pub mod idmap;
pub mod lexer;
pub mod opcode;
pub mod parser;
pub mod span;
pub mod symbol;
pub mod table;
pub mod token;
pub mod tokenizer;
pub mod trigger;
pub mod types;

pub use compiler::{CompileResult, Compiler, CompilerEnvironment};
pub use error::{CompileError, ErrorKind};
