use super::code::stride_of;
use super::command::Command;
use super::function::Function;
use super::opcode::{Opcode, Sysvar};
use super::program::Program;
use super::stack::Stack;
use super::val::{Type, Val};
use super::var::VarTable;
use crate::lang::Error;
use crate::term::Console;
use rand::{rngs::StdRng, SeedableRng};
use std::convert::TryFrom;

type Result<T> = std::result::Result<T, Error>;

const CALL_FRAME_MAX: usize = 16;
const LOOP_FRAME_MAX: usize = 16;

#[derive(Debug)]
pub struct LoopFrame {
    start: usize,
    end: usize,
    counter: i32,
    max: i32,
    /// The user-visible iteration counter, read through `cnt`.
    cnt: i32,
}

/// Per-execution machine state: the value stack, the program counter,
/// the call and loop frame stacks, and the system-variable slots. A
/// fresh one is created for every `execute`, so independent runs share
/// nothing, including the PRNG and the benchmark timer state.
pub struct ExecStatus {
    pub stack: Stack<Val>,
    pub pc: usize,
    pub call_frames: Vec<usize>,
    pub loop_frames: Vec<LoopFrame>,
    pub is_end: bool,
    pub stat: i32,
    pub refdval: f64,
    pub refstr: String,
    pub strsize: i32,
    pub rng: StdRng,
    pub bench_prev: Option<std::time::Instant>,
}

impl ExecStatus {
    pub fn new() -> ExecStatus {
        ExecStatus {
            stack: Stack::new("value stack overflow"),
            pc: 0,
            call_frames: vec![],
            loop_frames: vec![],
            is_end: false,
            stat: 0,
            refdval: 0.0,
            refstr: String::new(),
            strsize: 0,
            rng: StdRng::seed_from_u64(1),
            bench_prev: None,
        }
    }
}

impl Default for ExecStatus {
    fn default() -> ExecStatus {
        ExecStatus::new()
    }
}

/// Runs the program to completion against a fresh status.
pub fn execute(program: &Program, vars: &mut VarTable, console: &mut dyn Console) -> Result<()> {
    if program.code.is_empty() {
        return Err(error!(InternalError; "there is no code to execute"));
    }
    let mut status = ExecStatus::new();
    execute_inner(program, vars, &mut status, console)
}

fn execute_inner(
    program: &Program,
    vars: &mut VarTable,
    status: &mut ExecStatus,
    console: &mut dyn Console,
) -> Result<()> {
    loop {
        if status.is_end || status.pc >= program.code.len() {
            break;
        }

        let op_position = status.pc;
        let op = Opcode::try_from(program.code.read(status.pc))?;
        status.pc += 1;

        match op {
            Opcode::Nop | Opcode::Label => {}

            Opcode::PushInt => {
                let v = program.code.read(status.pc);
                status.pc += 1;
                status.stack.push(Val::Int(v))?;
            }

            Opcode::PushDouble => {
                let v = program.code.read_f64(status.pc);
                status.pc += stride_of::<f64>();
                status.stack.push(Val::Double(v))?;
            }

            Opcode::PushString => {
                let id = program.code.read(status.pc) as usize;
                status.pc += 1;
                status.stack.push(Val::Str(program.string(id).to_string()))?;
            }

            Opcode::PushVariable => {
                let id = program.code.read(status.pc) as usize;
                status.pc += 1;
                let index = status.stack.pop()?.calc_int(vars)?;
                status.stack.push(Val::VarRef { var: id, index })?;
            }

            Opcode::PushSysvar => {
                let sysvar = Sysvar::try_from(program.code.read(status.pc))?;
                status.pc += 1;
                let value = match sysvar {
                    Sysvar::Cnt => {
                        let frame = status.loop_frames.last().ok_or_else(
                            || error!(LoopMismatch; "cnt is only valid inside repeat"),
                        )?;
                        Val::Int(frame.cnt)
                    }
                    Sysvar::Stat => Val::Int(status.stat),
                    Sysvar::Refdval => Val::Double(status.refdval),
                    Sysvar::Refstr => Val::Str(status.refstr.clone()),
                    Sysvar::Strsize => Val::Int(status.strsize),
                    Sysvar::Looplev => Val::Int(status.loop_frames.len() as i32),
                };
                status.stack.push(value)?;
            }

            Opcode::Assign
            | Opcode::AddAssign
            | Opcode::SubAssign
            | Opcode::MulAssign
            | Opcode::DivAssign
            | Opcode::ModAssign
            | Opcode::BOrAssign
            | Opcode::BAndAssign
            | Opcode::BXorAssign => {
                let mut rhs = status.stack.pop()?;
                let lhs = status.stack.pop()?;
                let (id, index) = match lhs {
                    Val::VarRef { var, index } => (var, index),
                    _ => {
                        return Err(error!(TypeMismatch;
                            "the assignment target is not a variable"));
                    }
                };
                rhs.isolate(vars)?;
                if op == Opcode::Assign {
                    vars[id].set(&rhs, index)?;
                } else {
                    let converted = rhs.convert(vars[id].element_type(), vars)?;
                    match op {
                        Opcode::AddAssign => vars[id].add_assign(&converted, index)?,
                        Opcode::SubAssign => vars[id].sub_assign(&converted, index)?,
                        Opcode::MulAssign => vars[id].mul_assign(&converted, index)?,
                        Opcode::DivAssign => vars[id].div_assign(&converted, index)?,
                        Opcode::ModAssign => vars[id].mod_assign(&converted, index)?,
                        Opcode::BOrAssign => vars[id].bor_assign(&converted, index)?,
                        Opcode::BAndAssign => vars[id].band_assign(&converted, index)?,
                        _ => vars[id].bxor_assign(&converted, index)?,
                    }
                }
            }

            Opcode::BOr
            | Opcode::BAnd
            | Opcode::BXor
            | Opcode::Eq
            | Opcode::Neq
            | Opcode::Gt
            | Opcode::GtOrEq
            | Opcode::Lt
            | Opcode::LtOrEq
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod => {
                let rhs = status.stack.pop()?;
                let mut lhs = status.stack.pop()?;
                lhs.isolate(vars)?;
                let result = match op {
                    Opcode::BOr => lhs.bor(&rhs, vars)?,
                    Opcode::BAnd => lhs.band(&rhs, vars)?,
                    Opcode::BXor => lhs.bxor(&rhs, vars)?,
                    Opcode::Eq => lhs.eq(&rhs, vars)?,
                    Opcode::Neq => lhs.neq(&rhs, vars)?,
                    Opcode::Gt => lhs.gt(&rhs, vars)?,
                    Opcode::GtOrEq => lhs.gtoe(&rhs, vars)?,
                    Opcode::Lt => lhs.lt(&rhs, vars)?,
                    Opcode::LtOrEq => lhs.ltoe(&rhs, vars)?,
                    Opcode::Add => lhs.add(&rhs, vars)?,
                    Opcode::Sub => lhs.sub(&rhs, vars)?,
                    Opcode::Mul => lhs.mul(&rhs, vars)?,
                    Opcode::Div => lhs.div(&rhs, vars)?,
                    _ => lhs.modulo(&rhs, vars)?,
                };
                status.stack.push(result)?;
            }

            Opcode::UnaryMinus => {
                let mut v = status.stack.pop()?;
                v.isolate(vars)?;
                status.stack.push(v.neg()?)?;
            }

            Opcode::If => {
                let offset = program.code.read(status.pc);
                status.pc += 1;
                let cond = status.stack.pop()?;
                if !cond.boolean(vars)? {
                    status.pc = op_position + offset as usize;
                }
            }

            Opcode::Repeat => {
                let end = program.code.read(status.pc) as usize;
                status.pc += 1;
                let max = status.stack.pop()?.calc_int(vars)?;
                if status.loop_frames.len() + 1 >= LOOP_FRAME_MAX {
                    return Err(error!(LoopMismatch; "repeat nesting is too deep"));
                }
                status.loop_frames.push(LoopFrame {
                    start: status.pc,
                    end,
                    counter: 0,
                    max,
                    cnt: 0,
                });
            }

            Opcode::RepeatCheck => {
                let frame = status.loop_frames.last().ok_or_else(
                    || error!(InternalError; "repeat check without a loop frame"),
                )?;
                if frame.max >= 0 && frame.counter >= frame.max {
                    status.pc = frame.end + 1;
                    status.loop_frames.pop();
                }
            }

            Opcode::Loop | Opcode::Continue => {
                let frame = status.loop_frames.last_mut().ok_or_else(
                    || error!(LoopMismatch; "loop or continue outside a repeat"),
                )?;
                frame.counter += 1;
                frame.cnt += 1;
                status.pc = frame.start;
            }

            Opcode::Break => {
                let frame = status.loop_frames.last().ok_or_else(
                    || error!(LoopMismatch; "break outside a repeat"),
                )?;
                status.pc = frame.end + 1;
                status.loop_frames.pop();
            }

            Opcode::Gosub => {
                let id = program.code.read(status.pc) as usize;
                status.pc += 1;
                if status.call_frames.len() + 1 >= CALL_FRAME_MAX {
                    return Err(error!(GosubMismatch; "gosub nesting is too deep"));
                }
                status.call_frames.push(status.pc);
                status.pc = program.label(id).position;
            }

            Opcode::Goto => {
                let id = program.code.read(status.pc) as usize;
                status.pc = program.label(id).position;
            }

            Opcode::Command => {
                let command = Command::try_from(program.code.read(status.pc))?;
                let argc = program.code.read(status.pc + 1);
                status.pc += 2;
                command.exec(vars, status, console, argc)?;
            }

            Opcode::Function => {
                let function = Function::try_from(program.code.read(status.pc))?;
                let argc = program.code.read(status.pc + 1);
                status.pc += 2;
                function.exec(vars, status, argc)?;
            }

            Opcode::Jump => {
                status.pc = program.code.read(status.pc) as usize;
            }

            Opcode::JumpRelative => {
                let offset = program.code.read(status.pc);
                status.pc = op_position + offset as usize;
            }

            Opcode::Return => {
                let argc = program.code.read(status.pc);
                status.pc += 1;
                if status.call_frames.is_empty() {
                    return Err(error!(GosubMismatch; "return outside a subroutine"));
                }
                if argc > 0 {
                    let v = status.stack.pop()?;
                    match v.primitive_type(vars) {
                        Type::Int => status.stat = v.calc_int(vars)?,
                        Type::Double => status.refdval = v.calc_double(vars)?,
                        Type::Str => status.refstr = v.calc_str(vars)?,
                    }
                }
                status.pc = status.call_frames.pop().ok_or_else(
                    || error!(InternalError; "the call frame disappeared"),
                )?;
            }

            Opcode::End => {
                status.is_end = true;
            }
        }
    }
    Ok(())
}
