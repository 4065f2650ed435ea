#![allow(dead_code)]

use hsp::lang::Error;
use hsp::mach::{LoadOptions, Machine};
use hsp::term::MockConsole;

/// Loads and runs a script, returning everything it printed.
pub fn run(src: &str) -> String {
    run_with_input(src, "")
}

pub fn run_with_input(src: &str, input: &str) -> String {
    let mut machine = match Machine::load(src, &LoadOptions::default()) {
        Ok(machine) => machine,
        Err(e) => panic!("load failed: {}", e),
    };
    let mut console = MockConsole::with_input(input);
    if let Err(e) = machine.execute(&mut console) {
        panic!("execute failed: {}\noutput so far: {:?}", e, console.output);
    }
    console.output
}

/// Runs a script expected to fail and returns the error, whether it is
/// raised while loading or while executing.
pub fn run_err(src: &str) -> Error {
    let mut machine = match Machine::load(src, &LoadOptions::default()) {
        Ok(machine) => machine,
        Err(e) => return e,
    };
    let mut console = MockConsole::new();
    match machine.execute(&mut console) {
        Ok(()) => panic!("expected an error, got output {:?}", console.output),
        Err(e) => e,
    }
}
