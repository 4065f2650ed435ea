//! Command line launcher: parses the flags, loads the script file, and
//! runs it. All diagnostics go to stderr; the process exits nonzero on
//! any error.

use ansi_term::Style;
use hsp::mach::{LoadOptions, Machine};
use hsp::term::StdConsole;

struct Args {
    filename: Option<String>,
    show_script: bool,
    show_preprocessed: bool,
    show_ast: bool,
    show_code: bool,
    show_help: bool,
}

fn print_help() {
    println!(
        "hsp : commandline tool options\n\
         \x20 <bin> [<options>...] -f <SCRIPT_FILE>\n\
         \x20   -f : specify file path to execute\n\
         \n\
         \x20 options are followings\n\
         \x20   -s : show loaded script file contents\n\
         \x20   -p : show preprocessed script contents\n\
         \x20   -a : show abstract-syntax-tree constructed from loaded script\n\
         \x20   -e : show instruction code for execution\n\
         \x20   -h : show (this) help"
    );
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", Style::new().bold().paint("error:"), message);
    std::process::exit(-1);
}

fn parse_args() -> Args {
    let mut args = Args {
        filename: None,
        show_script: false,
        show_preprocessed: false,
        show_ast: false,
        show_code: false,
        show_help: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-f" => match iter.next() {
                Some(filename) => args.filename = Some(filename),
                None => fail("cannot read the script file path after -f"),
            },
            "-s" => args.show_script = true,
            "-p" => args.show_preprocessed = true,
            "-a" => args.show_ast = true,
            "-e" => args.show_code = true,
            "-h" => args.show_help = true,
            other => {
                print_help();
                fail(&format!("unknown argument: {}", other));
            }
        }
    }
    args
}

fn main() {
    let args = parse_args();

    if args.show_help {
        print_help();
        return;
    }

    let filename = match &args.filename {
        Some(filename) => filename,
        None => {
            print_help();
            fail("a script file must be given with -f");
        }
    };

    let script = match std::fs::read_to_string(filename) {
        Ok(script) => script,
        Err(e) => fail(&format!("cannot read the script file {}: {}", filename, e)),
    };

    if args.show_script {
        println!(
            "====LOADED SCRIPT FILE({} bytes)\n----begin----\n{}\n----end----",
            script.len(),
            script
        );
    }

    let options = LoadOptions {
        dump_preprocessed: args.show_preprocessed,
        dump_ast: args.show_ast,
    };
    let mut machine = match Machine::load(&script, &options) {
        Ok(machine) => machine,
        Err(e) => fail(&e.to_string()),
    };

    if args.show_code {
        match machine.disassemble() {
            Ok(listing) => println!("====INSTRUCTION CODE\n{}", listing),
            Err(e) => fail(&e.to_string()),
        }
    }

    let mut console = StdConsole::new();
    if let Err(e) = machine.execute(&mut console) {
        fail(&e.to_string());
    }
}
