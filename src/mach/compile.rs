use super::codegen;
use super::program::Program;
use super::runtime;
use super::var::VarTable;
use crate::lang;
use crate::lang::Error;
use crate::term::Console;

type Result<T> = std::result::Result<T, Error>;

/// Dump switches honored while loading a script.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadOptions {
    pub dump_preprocessed: bool,
    pub dump_ast: bool,
}

/// A loaded script: compiled bytecode plus the variable store it runs
/// against. Loading runs the whole front end; `execute` runs the
/// program against a fresh status, so it can be called again.
pub struct Machine {
    pub program: Program,
    pub vars: VarTable,
}

impl Machine {
    pub fn load(script: &str, options: &LoadOptions) -> Result<Machine> {
        let preprocessed = lang::preprocess(script)?;
        if options.dump_preprocessed {
            println!(
                "====PREPROCESSED SCRIPT({} bytes)\n----begin----\n{}\n----end----",
                preprocessed.len(),
                preprocessed
            );
        }

        let ast = lang::parse(&preprocessed)?;
        if options.dump_ast {
            println!("====ABSTRACT SYNTAX TREE\n{:#?}", ast);
        }

        let mut program = Program::new();
        let mut vars = VarTable::new();
        codegen::discover(&ast, &mut vars, &mut program);
        codegen::generate(&mut program, &vars, &ast)?;

        Ok(Machine { program, vars })
    }

    pub fn execute(&mut self, console: &mut dyn Console) -> Result<()> {
        runtime::execute(&self.program, &mut self.vars, console)
    }

    pub fn disassemble(&self) -> Result<String> {
        self.program.disassemble(&self.vars)
    }
}
