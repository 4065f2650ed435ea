use super::code::{stride_of, CodeBuffer};
use super::command::Command;
use super::function::Function;
use super::opcode::{Opcode, Sysvar};
use super::var::VarTable;
use crate::lang::Error;
use std::convert::TryFrom;

type Result<T> = std::result::Result<T, Error>;

/// A jump target. Entries are created during the discovery pre-pass
/// with position zero; the real position is patched in when the code
/// generator emits the label.
#[derive(Debug)]
pub struct Label {
    pub name: String,
    pub position: usize,
}

/// The compiled form of a script: the bytecode, the label table, and
/// the interned string literals. Bytecode refers to labels, strings,
/// and variables through index handles, so it owns no pointers and
/// nothing borrowed from the AST.
#[derive(Debug, Default)]
pub struct Program {
    pub code: CodeBuffer,
    labels: Vec<Label>,
    strings: Vec<String>,
}

impl Program {
    pub fn new() -> Program {
        Program::default()
    }

    pub fn add_label(&mut self, name: &str) {
        self.labels.push(Label {
            name: name.to_string(),
            position: 0,
        });
    }

    pub fn search_label(&self, name: &str) -> Option<usize> {
        self.labels
            .iter()
            .position(|label| label.name.eq_ignore_ascii_case(name))
    }

    pub fn label(&self, id: usize) -> &Label {
        &self.labels[id]
    }

    pub fn set_label_position(&mut self, id: usize, position: usize) {
        self.labels[id].position = position;
    }

    pub fn intern_string(&mut self, s: &str) -> usize {
        self.strings.push(s.to_string());
        self.strings.len() - 1
    }

    pub fn string(&self, id: usize) -> &str {
        &self.strings[id]
    }

    /// Renders the instruction stream for the `-e` dump.
    pub fn disassemble(&self, vars: &VarTable) -> Result<String> {
        let mut out = String::new();
        let mut pc = 0;
        while pc < self.code.len() {
            let op = Opcode::try_from(self.code.read(pc))?;
            out.push_str(&format!("{:04} {}", pc, op));
            pc += 1;
            match op {
                Opcode::PushInt => {
                    out.push_str(&format!(" {}", self.code.read(pc)));
                    pc += 1;
                }
                Opcode::PushDouble => {
                    out.push_str(&format!(" {}", self.code.read_f64(pc)));
                    pc += stride_of::<f64>();
                }
                Opcode::PushString => {
                    let id = self.code.read(pc) as usize;
                    out.push_str(&format!(" {:?}", self.string(id)));
                    pc += 1;
                }
                Opcode::PushVariable => {
                    let id = self.code.read(pc) as usize;
                    out.push_str(&format!(" {}", vars[id].name()));
                    pc += 1;
                }
                Opcode::PushSysvar => {
                    let sysvar = Sysvar::try_from(self.code.read(pc))?;
                    out.push_str(&format!(" {}", sysvar));
                    pc += 1;
                }
                Opcode::If
                | Opcode::Repeat
                | Opcode::Jump
                | Opcode::JumpRelative
                | Opcode::Return => {
                    out.push_str(&format!(" {}", self.code.read(pc)));
                    pc += 1;
                }
                Opcode::Gosub | Opcode::Goto => {
                    let label = self.label(self.code.read(pc) as usize);
                    out.push_str(&format!(" *{} ({})", label.name, label.position));
                    pc += 1;
                }
                Opcode::Command => {
                    let command = Command::try_from(self.code.read(pc))?;
                    let argc = self.code.read(pc + 1);
                    out.push_str(&format!(" {} argc={}", command, argc));
                    pc += 2;
                }
                Opcode::Function => {
                    let function = Function::try_from(self.code.read(pc))?;
                    let argc = self.code.read(pc + 1);
                    out.push_str(&format!(" {} argc={}", function, argc));
                    pc += 2;
                }
                _ => {}
            }
            out.push('\n');
        }
        Ok(out)
    }
}
