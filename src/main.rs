use std::fs;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};

use scriptc::Compiler;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut input_path: Option<String> = None;

    if let Some(arg) = args.next() {
        input_path = Some(arg);
        if args.next().is_some() {
            bail!("Only one input file is supported");
        }
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let compiler = Compiler::new();
    let result = compiler.compile(&source);

    for error in &result.errors {
        eprintln!("{error}");
    }
    if !result.errors.is_empty() {
        bail!("Compilation failed with {} error(s)", result.errors.len());
    }

    for script in &result.scripts {
        print!("{}", script.listing());
    }
    Ok(())
}
