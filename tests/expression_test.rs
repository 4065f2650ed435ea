mod common;
use common::*;
use hsp::lang::ErrorCode;

#[test]
fn test_precedence() {
    assert_eq!(run("mes str(1+2*3)"), "7\n");
    assert_eq!(run("mes str((1+2)*3)"), "9\n");
    assert_eq!(run("mes str(1|2&3)"), "3\n");
    assert_eq!(run("mes str(-2*3)"), "-6\n");
    assert_eq!(run("mes str(5\\3)"), "2\n");
    assert_eq!(run("mes str(5.0/2.0)"), "2.500000\n");
}

#[test]
fn test_left_associativity() {
    assert_eq!(run("mes str(8/4/2)"), "1\n");
    assert_eq!(run("mes str(10-3-2)"), "5\n");
}

#[test]
fn test_variables_in_expressions() {
    assert_eq!(run("a=1 : b=2 : mes str(a+b)"), "3\n");
    assert_eq!(run("a=1+2*3 : mes str(a*2)"), "14\n");
}

#[test]
fn test_result_type_follows_left_operand() {
    assert_eq!(run("mes str(5/2)"), "2\n");
    assert_eq!(run("mes str(5.0/2)"), "2.500000\n");
    assert_eq!(run("mes str(2 + 2.9)"), "4\n");
}

#[test]
fn test_comparisons() {
    assert_eq!(run("mes str(1 < 2)"), "1\n");
    assert_eq!(run("mes str(2 <= 1)"), "0\n");
    assert_eq!(run("mes str(3 >= 3)"), "1\n");
    assert_eq!(run("mes str(1 != 2)"), "1\n");
    // A single = compares inside an expression.
    assert_eq!(run("mes str(2 = 2)"), "1\n");
}

#[test]
fn test_operator_word_shadows() {
    assert_eq!(run("mes str(1 and 3)"), "1\n");
    assert_eq!(run("mes str(1 or 2)"), "3\n");
    assert_eq!(run("mes str(5 xor 1)"), "4\n");
    assert_eq!(run("mes str(1 not 2)"), "1\n");
}

#[test]
fn test_string_concat_and_equality() {
    assert_eq!(run("s = \"a\" : t = s + \"b\" + str(1) : mes t"), "ab1\n");
    assert_eq!(run("if \"a\" = \"a\" : mes \"eq\""), "eq\n");
    assert_eq!(run("if \"a\" != \"b\" : mes \"ne\""), "ne\n");
}

#[test]
fn test_unary_minus_on_variables() {
    assert_eq!(run("a = 7 : mes str(-a)"), "-7\n");
    assert_eq!(run("d = 1.5 : mes str(-d)"), "-1.500000\n");
}

#[test]
fn test_int_literal_round_trip() {
    assert_eq!(run("mes str(2147483647)"), "2147483647\n");
    assert_eq!(run("mes str(-2147483648)"), "-2147483648\n");
    assert_eq!(run("mes str(int(str(-2147483648)))"), "-2147483648\n");
    assert_eq!(run("mes str(int(\"42\"))"), "42\n");
}

#[test]
fn test_division_by_zero_is_error() {
    assert_eq!(run_err("mes str(1/0)").code(), ErrorCode::DivisionByZero);
    assert_eq!(run_err("mes str(1\\0)").code(), ErrorCode::DivisionByZero);
}

#[test]
fn test_string_arithmetic_is_error() {
    assert_eq!(run_err("mes \"a\" - \"b\"").code(), ErrorCode::TypeMismatch);
    assert_eq!(run_err("a = \"x\" * 2").code(), ErrorCode::TypeMismatch);
    assert_eq!(run_err("a = \"x\" | 1").code(), ErrorCode::TypeMismatch);
    assert_eq!(run_err("a = \"x\" < \"y\"").code(), ErrorCode::TypeMismatch);
}
