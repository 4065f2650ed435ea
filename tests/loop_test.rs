mod common;
use common::*;
use hsp::lang::ErrorCode;

#[test]
fn test_repeat_runs_body_n_times() {
    assert_eq!(run("repeat 3 : mes str(cnt) : loop"), "0\n1\n2\n");
    assert_eq!(run("repeat 1 : mes \"once\" : loop"), "once\n");
}

#[test]
fn test_repeat_zero_skips_body() {
    assert_eq!(run("repeat 0 : mes \"never\" : loop\nmes \"after\""), "after\n");
}

#[test]
fn test_cnt_accumulates() {
    assert_eq!(run("*l : a=0 : repeat 5 : a+=cnt : loop : mes str(a)"), "10\n");
}

#[test]
fn test_repeat_without_argument_runs_until_break() {
    let src = "a = 0\nrepeat\na += 1\nif a >= 4 : break\nloop\nmes str(a)";
    assert_eq!(run(src), "4\n");
}

#[test]
fn test_break_leaves_the_loop() {
    let src = "repeat 10\nif cnt = 3 : break\nmes str(cnt)\nloop\nmes \"out\"";
    assert_eq!(run(src), "0\n1\n2\nout\n");
}

#[test]
fn test_continue_behaves_like_loop() {
    let src = "a = 0\nrepeat 3\na += 10\ncontinue\na += 100\nloop\nmes str(a)";
    assert_eq!(run(src), "30\n");
}

#[test]
fn test_nested_loops() {
    let src = "repeat 2\nrepeat 3\nmes str(cnt)\nloop\nloop";
    assert_eq!(run(src), "0\n1\n2\n0\n1\n2\n");
}

#[test]
fn test_looplev_reports_depth() {
    let src = "repeat 1\nrepeat 1\nmes str(looplev)\nloop\nmes str(looplev)\nloop";
    assert_eq!(run(src), "2\n1\n");
}

#[test]
fn test_cnt_outside_loop_is_error() {
    assert_eq!(run_err("a = cnt").code(), ErrorCode::LoopMismatch);
}

#[test]
fn test_loop_without_repeat_is_error() {
    assert_eq!(run_err("loop").code(), ErrorCode::LoopMismatch);
}

#[test]
fn test_unclosed_repeat_is_error() {
    assert_eq!(run_err("repeat 3\nmes \"x\"").code(), ErrorCode::LoopMismatch);
}

#[test]
fn test_runtime_repeat_nesting_limit() {
    let mut src = String::new();
    for _ in 0..16 {
        src.push_str("repeat 1\n");
    }
    for _ in 0..16 {
        src.push_str("loop\n");
    }
    assert_eq!(run_err(&src).code(), ErrorCode::LoopMismatch);
}
