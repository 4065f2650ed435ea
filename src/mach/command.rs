use super::runtime::ExecStatus;
use super::val::{Type, Val};
use super::var::{VarId, VarTable};
use crate::lang::Error;
use crate::term::Console;
use rand::{rngs::StdRng, SeedableRng};
use std::convert::TryFrom;

type Result<T> = std::result::Result<T, Error>;

/// Statement-form built-ins. Arguments are on the value stack in
/// left-to-right order; a command consumes them and pushes nothing.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(i32)]
pub enum Command {
    Dim = 0,
    DDim,
    SDim,
    Poke,
    WPoke,
    LPoke,
    Mes,
    Input,
    Randomize,
    Bench,
}

impl Command {
    pub fn from_name(s: &str) -> Option<Command> {
        use Command::*;
        static TABLE: &[(Command, &str)] = &[
            (Dim, "dim"),
            (DDim, "ddim"),
            (SDim, "sdim"),
            (Poke, "poke"),
            (WPoke, "wpoke"),
            (LPoke, "lpoke"),
            (Mes, "mes"),
            (Input, "input"),
            (Randomize, "randomize"),
        ];
        if s.eq_ignore_ascii_case("bench") {
            return if cfg!(feature = "bench-timer") {
                Some(Bench)
            } else {
                None
            };
        }
        TABLE
            .iter()
            .find(|(_, word)| word.eq_ignore_ascii_case(s))
            .map(|(command, _)| *command)
    }

    pub fn exec(
        self,
        vars: &mut VarTable,
        status: &mut ExecStatus,
        console: &mut dyn Console,
        argc: i32,
    ) -> Result<()> {
        match self {
            Command::Dim => prepare_array(vars, status, argc, Type::Int, "dim"),
            Command::DDim => prepare_array(vars, status, argc, Type::Double, "ddim"),
            Command::SDim => sdim(vars, status, argc),
            Command::Poke => poke(vars, status, argc, 1),
            Command::WPoke => poke(vars, status, argc, 2),
            Command::LPoke => poke(vars, status, argc, 4),
            Command::Mes => mes(vars, status, console, argc),
            Command::Input => input(vars, status, console, argc),
            Command::Randomize => randomize(vars, status, argc),
            Command::Bench => bench(vars, status, console, argc),
        }
    }
}

impl TryFrom<i32> for Command {
    type Error = Error;
    fn try_from(word: i32) -> Result<Command> {
        use Command::*;
        static ALL: &[Command] = &[
            Dim, DDim, SDim, Poke, WPoke, LPoke, Mes, Input, Randomize, Bench,
        ];
        if word < 0 || word as usize >= ALL.len() {
            return Err(error!(InternalError; format!("unknown command word {}", word)));
        }
        Ok(ALL[word as usize])
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Command::*;
        let s = match self {
            Dim => "dim",
            DDim => "ddim",
            SDim => "sdim",
            Poke => "poke",
            WPoke => "wpoke",
            LPoke => "lpoke",
            Mes => "mes",
            Input => "input",
            Randomize => "randomize",
            Bench => "bench",
        };
        write!(f, "{}", s)
    }
}

pub(crate) fn check_argc(name: &str, argc: i32, min: i32, max: i32) -> Result<()> {
    if argc < min {
        return Err(error!(IllegalArgument; format!("{}: too few arguments", name)));
    }
    if argc > max {
        return Err(error!(IllegalArgument;
            format!("{}: too many arguments ({} given)", name, argc)));
    }
    Ok(())
}

/// The variable a command writes through: a reference to element zero.
pub(crate) fn scalar_target(v: &Val, name: &str) -> Result<VarId> {
    match v {
        Val::VarRef { var, index } => {
            if *index > 0 {
                return Err(error!(IllegalArgument;
                    format!("{}: the target variable is indexed as an array", name)));
            }
            Ok(*var)
        }
        _ => Err(error!(IllegalArgument; format!("{}: the target is not a variable", name))),
    }
}

fn prepare_array(
    vars: &mut VarTable,
    status: &mut ExecStatus,
    argc: i32,
    ty: Type,
    name: &str,
) -> Result<()> {
    check_argc(name, argc, 2, 2)?;
    let (id, length) = {
        let args = status.stack.top(argc as usize)?;
        let id = scalar_target(&args[0], name)?;
        (id, args[1].calc_int(vars)?)
    };
    if length <= 0 {
        return Err(error!(IllegalArgument;
            format!("{}: cannot allocate {} elements", name, length)));
    }
    vars[id].prepare(ty, 64, length as usize);
    status.stack.drop_n(argc as usize)
}

fn sdim(vars: &mut VarTable, status: &mut ExecStatus, argc: i32) -> Result<()> {
    check_argc("sdim", argc, 2, 3)?;
    let (id, granule, length) = {
        let args = status.stack.top(argc as usize)?;
        let id = scalar_target(&args[0], "sdim")?;
        let granule = args[1].calc_int(vars)?;
        let length = if argc > 2 { args[2].calc_int(vars)? } else { 1 };
        (id, granule, length)
    };
    if granule <= 0 {
        return Err(error!(IllegalArgument; "sdim: the granule must be at least 1 byte"));
    }
    if length <= 0 {
        return Err(error!(IllegalArgument;
            format!("sdim: cannot allocate {} elements", length)));
    }
    vars[id].prepare(Type::Str, granule as usize, length as usize);
    status.stack.drop_n(argc as usize)
}

fn poke(vars: &mut VarTable, status: &mut ExecStatus, argc: i32, width: usize) -> Result<()> {
    let name = match width {
        1 => "poke",
        2 => "wpoke",
        _ => "lpoke",
    };
    check_argc(name, argc, 3, 3)?;
    let (id, byte_index, value) = {
        let args = status.stack.top(argc as usize)?;
        let id = scalar_target(&args[0], name)?;
        (id, args[1].calc_int(vars)?, args[2].calc_int(vars)?)
    };
    match width {
        1 => vars[id].poke(byte_index, value)?,
        2 => vars[id].wpoke(byte_index, value)?,
        _ => vars[id].lpoke(byte_index, value)?,
    }
    status.stack.drop_n(argc as usize)
}

fn mes(
    vars: &mut VarTable,
    status: &mut ExecStatus,
    console: &mut dyn Console,
    argc: i32,
) -> Result<()> {
    check_argc("mes", argc, 1, 1)?;
    let text = {
        let args = status.stack.top(argc as usize)?;
        let mut v = args[0].clone();
        v.isolate(vars)?;
        match v {
            Val::Str(s) => s,
            _ => return Err(error!(TypeMismatch; "mes: the argument is not a string")),
        }
    };
    console.write_line(&text)?;
    status.stack.drop_n(argc as usize)
}

fn input(
    vars: &mut VarTable,
    status: &mut ExecStatus,
    console: &mut dyn Console,
    argc: i32,
) -> Result<()> {
    check_argc("input", argc, 2, 3)?;
    let (id, length, mode) = {
        let args = status.stack.top(argc as usize)?;
        let id = scalar_target(&args[0], "input")?;
        let length = args[1].calc_int(vars)?;
        let mode = if argc > 2 { args[2].calc_int(vars)? } else { 0 };
        (id, length, mode)
    };
    let bytes = console.read_input(length.max(0) as usize, mode)?;
    status.strsize = bytes.len() as i32;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    vars[id].set(&Val::Str(text), 0)?;
    status.stack.drop_n(argc as usize)
}

fn randomize(vars: &mut VarTable, status: &mut ExecStatus, argc: i32) -> Result<()> {
    check_argc("randomize", argc, 0, 1)?;
    let seed = if argc == 0 {
        chrono::Utc::now().timestamp() as u64
    } else {
        let args = status.stack.top(argc as usize)?;
        args[0].calc_int(vars)? as u64
    };
    status.rng = StdRng::seed_from_u64(seed);
    status.stack.drop_n(argc as usize)
}

#[cfg(feature = "bench-timer")]
fn bench(
    vars: &mut VarTable,
    status: &mut ExecStatus,
    console: &mut dyn Console,
    argc: i32,
) -> Result<()> {
    check_argc("bench", argc, 0, 1)?;
    let display = if argc > 0 {
        let args = status.stack.top(argc as usize)?;
        args[0].boolean(vars)?
    } else {
        false
    };
    let now = std::time::Instant::now();
    let elapsed = status
        .bench_prev
        .map(|prev| now.duration_since(prev).as_micros() as f64);
    if display {
        if let Some(elapsed) = elapsed {
            console.write_line(&format!("bench[diff] {}[us]", elapsed as i64))?;
        }
    }
    status.refdval = elapsed.unwrap_or(0.0);
    status.bench_prev = Some(now);
    status.stack.drop_n(argc as usize)
}

#[cfg(not(feature = "bench-timer"))]
fn bench(
    _vars: &mut VarTable,
    _status: &mut ExecStatus,
    _console: &mut dyn Console,
    _argc: i32,
) -> Result<()> {
    Err(error!(InternalError; "bench is not enabled in this build"))
}
