mod common;
use common::*;
use hsp::lang::ErrorCode;

#[test]
fn test_multiple_statements_per_line() {
    assert_eq!(run("a=1 : b=2 : mes str(a+b)"), "3\n");
}

#[test]
fn test_compound_assignments() {
    assert_eq!(run("a = 10 : a -= 3 : a *= 2 : mes str(a)"), "14\n");
    assert_eq!(run("a = 7 : a \\= 4 : mes str(a)"), "3\n");
    assert_eq!(run("a = 1 : a |= 6 : mes str(a)"), "7\n");
    assert_eq!(run("a = 7 : a &= 5 : mes str(a)"), "5\n");
    assert_eq!(run("a = 5 : a ^= 3 : mes str(a)"), "6\n");
    assert_eq!(run("a = 9 : a /= 2 : mes str(a)"), "4\n");
}

#[test]
fn test_compound_assignment_converts_to_variable_type() {
    assert_eq!(run("a = 1 : a += 1.9 : mes str(a)"), "2\n");
    assert_eq!(run("d = 1.5 : d += 1 : mes str(d)"), "2.500000\n");
}

#[test]
fn test_string_compound_assignment() {
    assert_eq!(run("sdim s, 16 : s=\"hi\" : s+=\"!\" : mes s"), "hi!\n");
    assert_eq!(run_err("s = \"a\" : s -= \"b\"").code(), ErrorCode::TypeMismatch);
}

#[test]
fn test_if_single_line() {
    assert_eq!(run("if 1 : mes \"one\""), "one\n");
    assert_eq!(run("if 0 : mes \"one\""), "");
    assert_eq!(run("if 0 : mes \"one\" : else : mes \"two\""), "two\n");
}

#[test]
fn test_if_block_form() {
    let src = "if 1 {\n  mes \"a\"\n  mes \"b\"\n} else {\n  mes \"c\"\n}";
    assert_eq!(run(src), "a\nb\n");
    let src = "if 0 {\n  mes \"a\"\n} else {\n  mes \"c\"\n}";
    assert_eq!(run(src), "c\n");
}

#[test]
fn test_if_condition_materializes_variables() {
    assert_eq!(run("a = 2 : if a : mes \"truthy\""), "truthy\n");
    assert_eq!(run("a = 0 : if a : mes \"truthy\""), "");
}

#[test]
fn test_statements_after_if_line_still_run() {
    assert_eq!(run("if 0 : mes \"no\"\nmes \"after\""), "after\n");
}

#[test]
fn test_arrays() {
    assert_eq!(run("dim n, 4 : n(0)=10 : n(3)=40 : mes str(n(0)+n(3))"), "50\n");
    assert_eq!(run("dim n, 4 : i = 2 : n(i) = 7 : mes str(n(2))"), "7\n");
    assert_eq!(run("ddim d, 3 : d(2) = 2.5 : mes str(d(2))"), "2.500000\n");
    assert_eq!(run("sdim s, 8, 3 : s(1) = \"b\" : mes s(1)"), "b\n");
}

#[test]
fn test_implicit_variables_are_int_arrays_of_16() {
    assert_eq!(run("a(15) = 5 : mes str(a(15))"), "5\n");
    assert_eq!(run_err("a(16) = 5").code(), ErrorCode::SubscriptOutOfRange);
    assert_eq!(run_err("a = 1 : mes str(a(-1))").code(), ErrorCode::SubscriptOutOfRange);
}

#[test]
fn test_assignment_changes_type_at_element_zero() {
    assert_eq!(run("a = 1 : a = \"text\" : mes a"), "text\n");
    assert_eq!(run("a = \"x\" : a = 3 : mes str(a)"), "3\n");
    assert_eq!(
        run_err("dim n, 4 : n(2) = \"oops\"").code(),
        ErrorCode::TypeMismatch
    );
}

#[test]
fn test_end_stops_execution() {
    assert_eq!(run("mes \"a\" : end : mes \"b\""), "a\n");
    assert_eq!(run("mes \"a\"\nend\nmes \"b\""), "a\n");
}

#[test]
fn test_empty_program_runs() {
    assert_eq!(run(""), "");
    assert_eq!(run("\n\n"), "");
}

#[test]
fn test_names_are_case_insensitive() {
    assert_eq!(run("MES STR(1+1)"), "2\n");
    assert_eq!(run("Abc = 41 : mes str(ABC + 1)"), "42\n");
    assert_eq!(run("REPEAT 2 : MES STR(CNT) : LOOP"), "0\n1\n");
    assert_eq!(run("IF 1 : MES \"yes\""), "yes\n");
}

#[test]
fn test_else_without_if_is_error() {
    assert_eq!(run_err("else : mes \"x\"").code(), ErrorCode::SyntaxError);
}
