use super::command::{check_argc, scalar_target};
use super::runtime::ExecStatus;
use super::val::{Type, Val};
use super::var::VarTable;
use crate::lang::Error;
use rand::Rng;
use std::convert::TryFrom;

type Result<T> = std::result::Result<T, Error>;

/// Expression-form built-ins. Arguments are consumed from the value
/// stack and exactly one result is pushed back.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(i32)]
pub enum Function {
    Int = 0,
    Double,
    Str,
    Peek,
    WPeek,
    LPeek,
    Rnd,
    Abs,
    AbsF,
    Deg2Rad,
    Rad2Deg,
    Sin,
    Cos,
    Tan,
    Atan,
    ExpF,
    LogF,
    PowF,
    Sqrt,
    Limit,
    LimitF,
    StrLen,
}

impl Function {
    pub fn from_name(s: &str) -> Option<Function> {
        use Function::*;
        static TABLE: &[(Function, &str)] = &[
            (Int, "int"),
            (Double, "double"),
            (Str, "str"),
            (Peek, "peek"),
            (WPeek, "wpeek"),
            (LPeek, "lpeek"),
            (Rnd, "rnd"),
            (Abs, "abs"),
            (AbsF, "absf"),
            (Deg2Rad, "deg2rad"),
            (Rad2Deg, "rad2deg"),
            (Sin, "sin"),
            (Cos, "cos"),
            (Tan, "tan"),
            (Atan, "atan"),
            (ExpF, "expf"),
            (LogF, "logf"),
            (PowF, "powf"),
            (Sqrt, "sqrt"),
            (Limit, "limit"),
            (LimitF, "limitf"),
            (StrLen, "strlen"),
        ];
        TABLE
            .iter()
            .find(|(_, word)| word.eq_ignore_ascii_case(s))
            .map(|(function, _)| *function)
    }

    pub fn exec(self, vars: &VarTable, status: &mut ExecStatus, argc: i32) -> Result<()> {
        use Function::*;
        match self {
            Int => {
                let v = unary_arg(self, vars, status, argc)?.calc_int(vars)?;
                finish(status, argc, Val::Int(v))
            }
            Double => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v))
            }
            Str => {
                let v = unary_arg(self, vars, status, argc)?.calc_str(vars)?;
                finish(status, argc, Val::Str(v))
            }
            Peek | WPeek | LPeek => {
                let name = self.to_string();
                check_argc(&name, argc, 2, 2)?;
                let (id, byte_index) = {
                    let args = status.stack.top(argc as usize)?;
                    let id = scalar_target(&args[0], &name)?;
                    (id, args[1].calc_int(vars)?)
                };
                let v = match self {
                    Peek => vars[id].peek(byte_index)?,
                    WPeek => vars[id].wpeek(byte_index)?,
                    _ => vars[id].lpeek(byte_index)?,
                };
                finish(status, argc, Val::Int(v))
            }
            Rnd => {
                let n = unary_arg(self, vars, status, argc)?.calc_int(vars)?;
                if n < 1 {
                    return Err(error!(IllegalArgument;
                        format!("rnd: the bound must be 1 or more ({} given)", n)));
                }
                let v = status.rng.gen_range(0..n);
                finish(status, argc, Val::Int(v))
            }
            Abs => {
                let v = unary_arg(self, vars, status, argc)?.calc_int(vars)?;
                finish(status, argc, Val::Int(v.wrapping_abs()))
            }
            AbsF => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v.abs()))
            }
            Deg2Rad => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v * std::f64::consts::PI / 180.0))
            }
            Rad2Deg => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v * 180.0 / std::f64::consts::PI))
            }
            Sin => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v.sin()))
            }
            Cos => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v.cos()))
            }
            Tan => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v.tan()))
            }
            Atan => {
                check_argc("atan", argc, 2, 2)?;
                let (y, x) = {
                    let args = status.stack.top(argc as usize)?;
                    (args[0].calc_double(vars)?, args[1].calc_double(vars)?)
                };
                finish(status, argc, Val::Double(y.atan2(x)))
            }
            ExpF => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v.exp()))
            }
            LogF => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v.ln()))
            }
            PowF => {
                check_argc("powf", argc, 2, 2)?;
                let (x, y) = {
                    let args = status.stack.top(argc as usize)?;
                    (args[0].calc_double(vars)?, args[1].calc_double(vars)?)
                };
                finish(status, argc, Val::Double(x.powf(y)))
            }
            Sqrt => {
                let v = unary_arg(self, vars, status, argc)?.calc_double(vars)?;
                finish(status, argc, Val::Double(v.sqrt()))
            }
            Limit => {
                check_argc("limit", argc, 3, 3)?;
                let (low, value, high) = {
                    let args = status.stack.top(argc as usize)?;
                    (
                        args[0].calc_int(vars)?,
                        args[1].calc_int(vars)?,
                        args[2].calc_int(vars)?,
                    )
                };
                let mut v = value;
                if v < low {
                    v = low;
                }
                if v > high {
                    v = high;
                }
                finish(status, argc, Val::Int(v))
            }
            LimitF => {
                check_argc("limitf", argc, 3, 3)?;
                let (low, value, high) = {
                    let args = status.stack.top(argc as usize)?;
                    (
                        args[0].calc_double(vars)?,
                        args[1].calc_double(vars)?,
                        args[2].calc_double(vars)?,
                    )
                };
                let mut v = value;
                if v < low {
                    v = low;
                }
                if v > high {
                    v = high;
                }
                finish(status, argc, Val::Double(v))
            }
            StrLen => {
                check_argc("strlen", argc, 1, 1)?;
                let v = {
                    let args = status.stack.top(argc as usize)?;
                    if args[0].primitive_type(vars) != Type::Str {
                        return Err(error!(TypeMismatch; "strlen: the argument is not a string"));
                    }
                    args[0].calc_str(vars)?
                };
                finish(status, argc, Val::Int(v.len() as i32))
            }
        }
    }
}

fn unary_arg(
    function: Function,
    _vars: &VarTable,
    status: &mut ExecStatus,
    argc: i32,
) -> Result<Val> {
    check_argc(&function.to_string(), argc, 1, 1)?;
    let args = status.stack.top(argc as usize)?;
    Ok(args[0].clone())
}

fn finish(status: &mut ExecStatus, argc: i32, result: Val) -> Result<()> {
    status.stack.drop_n(argc as usize)?;
    status.stack.push(result)
}

impl TryFrom<i32> for Function {
    type Error = Error;
    fn try_from(word: i32) -> Result<Function> {
        use Function::*;
        static ALL: &[Function] = &[
            Int, Double, Str, Peek, WPeek, LPeek, Rnd, Abs, AbsF, Deg2Rad, Rad2Deg, Sin, Cos, Tan,
            Atan, ExpF, LogF, PowF, Sqrt, Limit, LimitF, StrLen,
        ];
        if word < 0 || word as usize >= ALL.len() {
            return Err(error!(InternalError; format!("unknown function word {}", word)));
        }
        Ok(ALL[word as usize])
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Function::*;
        let s = match self {
            Int => "int",
            Double => "double",
            Str => "str",
            Peek => "peek",
            WPeek => "wpeek",
            LPeek => "lpeek",
            Rnd => "rnd",
            Abs => "abs",
            AbsF => "absf",
            Deg2Rad => "deg2rad",
            Rad2Deg => "rad2deg",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Atan => "atan",
            ExpF => "expf",
            LogF => "logf",
            PowF => "powf",
            Sqrt => "sqrt",
            Limit => "limit",
            LimitF => "limitf",
            StrLen => "strlen",
        };
        write!(f, "{}", s)
    }
}
