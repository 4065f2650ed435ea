mod common;
use common::*;
use hsp::lang::ErrorCode;

#[test]
fn test_macro_in_expression() {
    let src = "#define SQ(%1) ((%1)*(%1))\nmes str(SQ(3+1))";
    assert_eq!(run(src), "16\n");
}

#[test]
fn test_enum_numbering() {
    let src = "#enum A\n#enum B\n#enum C=10\n#enum D\n\
               mes str(A)+\",\"+str(B)+\",\"+str(C)+\",\"+str(D)";
    assert_eq!(run(src), "0,1,10,11\n");
}

#[test]
fn test_object_macro() {
    let src = "#define LIMIT 5\na = LIMIT : mes str(a * 2)";
    assert_eq!(run(src), "10\n");
}

#[test]
fn test_macro_names_are_case_insensitive() {
    let src = "#define ANSWER 42\nmes str(answer)";
    assert_eq!(run(src), "42\n");
}

#[test]
fn test_macro_expands_through_other_macros() {
    let src = "#define A B\n#define B 7\nmes str(A)";
    assert_eq!(run(src), "7\n");
}

#[test]
fn test_ctype_macro_in_expression() {
    let src = "#define ctype DOUBLE_IT(%1) ((%1) * 2)\nmes str(DOUBLE_IT(21))";
    assert_eq!(run(src), "42\n");
}

#[test]
fn test_macro_parameter_default() {
    let src = "#define ctype SCALE(%1, %2 = 10) ((%1) * (%2))\nmes str(SCALE(3))";
    assert_eq!(run(src), "30\n");
}

#[test]
fn test_if_region_selects_code() {
    let src = "#define DEBUG 1\n#if DEBUG\nmes \"dbg\"\n#endif\nmes \"always\"";
    assert_eq!(run(src), "dbg\nalways\n");
    let src = "#define DEBUG 0\n#if DEBUG\nmes \"dbg\"\n#endif\nmes \"always\"";
    assert_eq!(run(src), "always\n");
}

#[test]
fn test_ifdef_region() {
    let src = "#define FEATURE\n#ifdef FEATURE\nmes \"on\"\n#endif";
    assert_eq!(run(src), "on\n");
    let src = "#ifdef FEATURE\nmes \"on\"\n#endif\nmes \"end\"";
    assert_eq!(run(src), "end\n");
}

#[test]
fn test_default_pi_macro() {
    assert_eq!(run("mes str(int(M_PI * 1000000))"), "3141592\n");
}

#[test]
fn test_directive_lines_keep_downstream_line_numbers() {
    // The malformed statement sits on the third source line; the parse
    // error must still point there even though directives preceded it.
    let err = run_err("#define NOOP\n\nmes str(1");
    assert_eq!(err.code(), ErrorCode::SyntaxError);
    assert!(err.to_string().contains("line 3"), "{}", err);
}

#[test]
fn test_infinite_recursion_is_reported() {
    let err = run_err("#define A B\n#define B A\nmes str(A)");
    assert_eq!(err.code(), ErrorCode::PreproError);
}

#[test]
fn test_unbalanced_region_is_reported() {
    assert_eq!(run_err("#if 1\nmes \"x\"").code(), ErrorCode::PreproError);
}
