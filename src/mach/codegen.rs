use super::code::Code;
use super::command::Command;
use super::function::Function;
use super::opcode::{Opcode, Sysvar};
use super::program::Program;
use super::var::VarTable;
use crate::lang::ast::{AssignOp, Ast, BinOp};
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

const REPEAT_NEST_MAX: usize = 32;

/// Discovery pre-pass: creates a variable for every name that does not
/// resolve to a built-in function or system variable, and a label-table
/// entry for every label node.
pub fn discover(ast: &[Ast], vars: &mut VarTable, program: &mut Program) {
    for statement in ast {
        discover_node(statement, vars, program);
    }
}

fn discover_node(node: &Ast, vars: &mut VarTable, program: &mut Program) {
    let ensure = |name: &str, vars: &mut VarTable| {
        if Function::from_name(name).is_none() && Sysvar::from_name(name).is_none() {
            vars.ensure(name);
        }
    };
    match node {
        Ast::Label(name) => program.add_label(name),
        Ast::Variable(name, index) => {
            ensure(name, vars);
            if let Some(index) = index {
                discover_node(index, vars, program);
            }
        }
        Ast::IdentExpr(name, _, args) => {
            ensure(name, vars);
            if let Some(args) = args {
                discover_node(args, vars, program);
            }
        }
        Ast::Block(left, right) | Ast::Arguments(left, right) => {
            if let Some(left) = left {
                discover_node(left, vars, program);
            }
            if let Some(right) = right {
                discover_node(right, vars, program);
            }
        }
        Ast::Command(_, _, args) => {
            if let Some(args) = args {
                discover_node(args, vars, program);
            }
        }
        Ast::Assign(_, lhs, rhs) => {
            discover_node(lhs, vars, program);
            discover_node(rhs, vars, program);
        }
        Ast::Binary(_, lhs, rhs) => {
            discover_node(lhs, vars, program);
            discover_node(rhs, vars, program);
        }
        Ast::Paren(inner) | Ast::UnaryMinus(inner) => discover_node(inner, vars, program),
        Ast::Return(expr) | Ast::Repeat(expr, _) => {
            if let Some(expr) = expr {
                discover_node(expr, vars, program);
            }
        }
        Ast::If(cond, then_block, else_block) => {
            discover_node(cond, vars, program);
            discover_node(then_block, vars, program);
            if let Some(else_block) = else_block {
                discover_node(else_block, vars, program);
            }
        }
        Ast::Empty
        | Ast::Int(_)
        | Ast::Real(_)
        | Ast::Str(_)
        | Ast::End
        | Ast::Goto(..)
        | Ast::Gosub(..)
        | Ast::Loop(_)
        | Ast::Continue
        | Ast::Break => {}
    }
}

/// Walks the statement list and emits bytecode into the program.
pub fn generate(program: &mut Program, vars: &VarTable, ast: &[Ast]) -> Result<()> {
    let mut generator = Generator {
        program,
        vars,
        depth: 0,
        repeat_heads: vec![],
    };
    for statement in ast {
        generator.walk(statement)?;
    }
    if !generator.repeat_heads.is_empty() {
        return Err(error!(LoopMismatch; "a repeat is not closed with loop"));
    }
    if program.code.is_empty() {
        program.code.write_op(Opcode::Nop);
    }
    Ok(())
}

struct Generator<'a> {
    program: &'a mut Program,
    vars: &'a VarTable,
    /// Symbolic value-stack depth, used to count call arguments.
    depth: i32,
    repeat_heads: Vec<usize>,
}

impl<'a> Generator<'a> {
    fn walk(&mut self, node: &Ast) -> Result<()> {
        match node {
            Ast::Empty => {}

            Ast::Label(name) => {
                let position = self.program.code.len();
                if let Some(id) = self.program.search_label(name) {
                    self.program.set_label_position(id, position);
                }
                self.program.code.write_op(Opcode::Label);
            }

            Ast::Block(left, right) => {
                if let Some(left) = left {
                    self.walk(left)?;
                }
                if let Some(right) = right {
                    self.walk(right)?;
                }
            }

            Ast::Command(name, line, args) => {
                let command = Command::from_name(name).ok_or_else(
                    || error!(UndefinedCommand, *line; name.clone()),
                )?;
                let top = self.depth;
                if let Some(args) = args {
                    self.walk(args)?;
                }
                let argc = self.depth - top;
                self.program.code.write_op(Opcode::Command);
                self.program.code.write(command as Code);
                self.program.code.write(argc);
                self.depth = top;
            }

            Ast::Arguments(left, right) => {
                if let Some(left) = left {
                    self.walk(left)?;
                }
                if let Some(right) = right {
                    self.walk(right)?;
                }
            }

            Ast::Assign(op, lhs, rhs) => {
                self.walk(lhs)?;
                self.walk(rhs)?;
                self.program.code.write_op(match op {
                    AssignOp::Set => Opcode::Assign,
                    AssignOp::Add => Opcode::AddAssign,
                    AssignOp::Sub => Opcode::SubAssign,
                    AssignOp::Mul => Opcode::MulAssign,
                    AssignOp::Div => Opcode::DivAssign,
                    AssignOp::Mod => Opcode::ModAssign,
                    AssignOp::BOr => Opcode::BOrAssign,
                    AssignOp::BAnd => Opcode::BAndAssign,
                    AssignOp::BXor => Opcode::BXorAssign,
                });
                self.depth -= 2;
            }

            Ast::Variable(name, index) => {
                match index {
                    Some(index) => self.walk(index)?,
                    None => {
                        self.program.code.write_op(Opcode::PushInt);
                        self.program.code.write(0);
                        self.depth += 1;
                    }
                }
                let id = self.vars.search(name).ok_or_else(
                    || error!(SyntaxError; format!("{} is reserved for a built-in", name)),
                )?;
                self.program.code.write_op(Opcode::PushVariable);
                self.program.code.write(id as Code);
            }

            Ast::Paren(inner) => self.walk(inner)?,

            Ast::Binary(op, lhs, rhs) => {
                self.walk(lhs)?;
                self.walk(rhs)?;
                self.program.code.write_op(match op {
                    BinOp::BOr => Opcode::BOr,
                    BinOp::BAnd => Opcode::BAnd,
                    BinOp::BXor => Opcode::BXor,
                    BinOp::Eq => Opcode::Eq,
                    BinOp::Neq => Opcode::Neq,
                    BinOp::Gt => Opcode::Gt,
                    BinOp::GtOrEq => Opcode::GtOrEq,
                    BinOp::Lt => Opcode::Lt,
                    BinOp::LtOrEq => Opcode::LtOrEq,
                    BinOp::Add => Opcode::Add,
                    BinOp::Sub => Opcode::Sub,
                    BinOp::Mul => Opcode::Mul,
                    BinOp::Div => Opcode::Div,
                    BinOp::Mod => Opcode::Mod,
                });
                self.depth -= 1;
            }

            Ast::UnaryMinus(inner) => {
                self.walk(inner)?;
                self.program.code.write_op(Opcode::UnaryMinus);
            }

            Ast::Int(value) => {
                self.program.code.write_op(Opcode::PushInt);
                self.program.code.write(*value);
                self.depth += 1;
            }

            Ast::Real(value) => {
                self.program.code.write_op(Opcode::PushDouble);
                self.program.code.write_f64(*value);
                self.depth += 1;
            }

            Ast::Str(value) => {
                let id = self.program.intern_string(value);
                self.program.code.write_op(Opcode::PushString);
                self.program.code.write(id as Code);
                self.depth += 1;
            }

            Ast::IdentExpr(name, line, args) => {
                let top = self.depth;
                if let Some(args) = args {
                    self.walk(args)?;
                }
                let argc = self.depth - top;

                if let Some(function) = Function::from_name(name) {
                    self.program.code.write_op(Opcode::Function);
                    self.program.code.write(function as Code);
                    self.program.code.write(argc);
                } else if let Some(sysvar) = Sysvar::from_name(name) {
                    if argc > 0 {
                        return Err(error!(SyntaxError, *line;
                            format!("system variable {} takes no index", name)));
                    }
                    self.program.code.write_op(Opcode::PushSysvar);
                    self.program.code.write(sysvar as Code);
                } else {
                    if argc > 1 {
                        return Err(error!(UndefinedFunction, *line; format!(
                            "{} is not a function and array indexes have a single dimension",
                            name
                        )));
                    }
                    let id = self.vars.search(name).ok_or_else(
                        || error!(InternalError, *line; format!("variable {} was not discovered", name)),
                    )?;
                    if argc == 0 {
                        self.program.code.write_op(Opcode::PushInt);
                        self.program.code.write(0);
                    }
                    self.program.code.write_op(Opcode::PushVariable);
                    self.program.code.write(id as Code);
                }
                self.depth = top + 1;
            }

            Ast::End => self.program.code.write_op(Opcode::End),

            Ast::Return(expr) => {
                let argc = match expr {
                    Some(expr) => {
                        self.walk(expr)?;
                        self.depth -= 1;
                        1
                    }
                    None => 0,
                };
                self.program.code.write_op(Opcode::Return);
                self.program.code.write(argc);
            }

            Ast::Goto(name, line) => {
                let id = self.label_id(name, *line)?;
                self.program.code.write_op(Opcode::Goto);
                self.program.code.write(id as Code);
            }

            Ast::Gosub(name, line) => {
                let id = self.label_id(name, *line)?;
                self.program.code.write_op(Opcode::Gosub);
                self.program.code.write(id as Code);
            }

            Ast::Repeat(expr, line) => {
                match expr {
                    Some(expr) => self.walk(expr)?,
                    None => {
                        self.program.code.write_op(Opcode::PushInt);
                        self.program.code.write(-1);
                        self.depth += 1;
                    }
                }
                self.depth -= 1;
                let head = self.program.code.len();
                self.program.code.write_op(Opcode::Repeat);
                self.program.code.write(0); // end position, patched at loop
                if self.repeat_heads.len() >= REPEAT_NEST_MAX {
                    return Err(error!(LoopMismatch, *line; "repeat nesting is too deep"));
                }
                self.repeat_heads.push(head);
                self.program.code.write_op(Opcode::RepeatCheck);
            }

            Ast::Loop(line) => {
                let head = self.repeat_heads.pop().ok_or_else(
                    || error!(LoopMismatch, *line; "loop without a repeat"),
                )?;
                let position = self.program.code.len();
                self.program.code.write_op(Opcode::Loop);
                self.program.code.patch(head + 1, position as Code);
            }

            Ast::Continue => self.program.code.write_op(Opcode::Continue),
            Ast::Break => self.program.code.write_op(Opcode::Break),

            Ast::If(cond, then_block, else_block) => {
                self.walk(cond)?;
                self.depth -= 1;

                let root = self.program.code.len();
                self.program.code.write_op(Opcode::If);
                self.program.code.write(0); // offset to the false branch

                self.walk(then_block)?;
                let true_tail = self.program.code.len();
                self.program.code.write_op(Opcode::JumpRelative);
                self.program.code.write(0); // offset past the false branch

                let false_head = self.program.code.len();
                if let Some(else_block) = else_block {
                    self.walk(else_block)?;
                }
                let tail = self.program.code.len();

                self.program.code.patch(root + 1, (false_head - root) as Code);
                self.program
                    .code
                    .patch(true_tail + 1, (tail - true_tail) as Code);
            }
        }
        Ok(())
    }

    fn label_id(&self, name: &str, line: usize) -> Result<usize> {
        self.program
            .search_label(name)
            .ok_or_else(|| error!(UndefinedLabel, line; format!("*{}", name)))
    }
}
