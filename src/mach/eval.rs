/*!
## Immediate expression evaluator

A reduced evaluator for the pure-expression subtrees the preprocessor
feeds `#if` and `#enum`. Only literals and operators are allowed;
variables, system variables, functions, and labels are rejected.

*/

use super::val::Val;
use super::var::VarTable;
use crate::lang::ast::{Ast, BinOp};
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

pub fn evaluate_immediate(ast: &Ast) -> Result<Val> {
    let vars = VarTable::new();
    let mut stack: Vec<Val> = vec![];
    evaluate_node(ast, &mut stack, &vars)?;
    match (stack.pop(), stack.is_empty()) {
        (Some(value), true) => Ok(value),
        _ => Err(error!(InternalError; "expression did not yield a single value")),
    }
}

fn evaluate_node(node: &Ast, stack: &mut Vec<Val>, vars: &VarTable) -> Result<()> {
    match node {
        Ast::Paren(inner) => evaluate_node(inner, stack, vars)?,

        Ast::Binary(op, lhs, rhs) => {
            evaluate_node(lhs, stack, vars)?;
            evaluate_node(rhs, stack, vars)?;
            let rhs = stack
                .pop()
                .ok_or_else(|| error!(InternalError; "missing right operand"))?;
            let lhs = stack
                .pop()
                .ok_or_else(|| error!(InternalError; "missing left operand"))?;
            let result = match op {
                BinOp::BOr => lhs.bor(&rhs, vars)?,
                BinOp::BAnd => lhs.band(&rhs, vars)?,
                BinOp::BXor => lhs.bxor(&rhs, vars)?,
                BinOp::Eq => lhs.eq(&rhs, vars)?,
                BinOp::Neq => lhs.neq(&rhs, vars)?,
                BinOp::Gt => lhs.gt(&rhs, vars)?,
                BinOp::GtOrEq => lhs.gtoe(&rhs, vars)?,
                BinOp::Lt => lhs.lt(&rhs, vars)?,
                BinOp::LtOrEq => lhs.ltoe(&rhs, vars)?,
                BinOp::Add => lhs.add(&rhs, vars)?,
                BinOp::Sub => lhs.sub(&rhs, vars)?,
                BinOp::Mul => lhs.mul(&rhs, vars)?,
                BinOp::Div => lhs.div(&rhs, vars)?,
                BinOp::Mod => lhs.modulo(&rhs, vars)?,
            };
            stack.push(result);
        }

        Ast::UnaryMinus(inner) => {
            evaluate_node(inner, stack, vars)?;
            let value = stack
                .pop()
                .ok_or_else(|| error!(InternalError; "missing operand"))?;
            stack.push(value.neg()?);
        }

        Ast::Int(value) => stack.push(Val::Int(*value)),
        Ast::Real(value) => stack.push(Val::Double(*value)),
        Ast::Str(value) => stack.push(Val::Str(value.clone())),

        _ => {
            return Err(error!(PreproError;
                "only literal expressions can be evaluated in a directive"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{parse_expression, TokenStream};

    fn eval(src: &str) -> Result<Val> {
        let mut stream = TokenStream::new(src);
        let ast = parse_expression(&mut stream)?;
        evaluate_immediate(&ast)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Val::Int(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Val::Int(9));
        assert_eq!(eval("-2 * 3").unwrap(), Val::Int(-6));
        assert_eq!(eval("5 \\ 3").unwrap(), Val::Int(2));
    }

    #[test]
    fn test_comparison_and_bitwise() {
        assert_eq!(eval("3 > 2").unwrap(), Val::Int(1));
        assert_eq!(eval("1 | 2 & 3").unwrap(), Val::Int(3));
        assert_eq!(eval("2 = 2").unwrap(), Val::Int(1));
    }

    #[test]
    fn test_doubles() {
        assert_eq!(eval("5.0 / 2.0").unwrap(), Val::Double(2.5));
    }

    #[test]
    fn test_identifiers_are_rejected() {
        assert!(eval("a + 1").is_err());
        assert!(eval("rnd(3)").is_err());
    }
}
