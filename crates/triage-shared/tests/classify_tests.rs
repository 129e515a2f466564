//! Tests for classify.rs

use triage_shared::classify::{classify, rules};
use triage_shared::ReasonCode;

#[test]
fn test_time_limit() {
    let log = "run.exe\n300 second time limit exceeded\nEXIT STATUS: 1";
    assert_eq!(classify(log), ReasonCode::Time);
}

#[test]
fn test_filesystem_signals() {
    for log in [
        "as: Fatal error: can't write 12 bytes to section .text",
        "as: Fatal error: can't close bin/foo.o: File truncated",
        "foo.o: File too big",
        "fatal error C1128: number of sections exceeded object file format limit: compile with /bigobj",
        "cp: No matching files were found",
    ] {
        assert_eq!(classify(log), ReasonCode::Filesystem, "log: {}", log);
    }
}

#[test]
fn test_internal_error() {
    assert_eq!(
        classify("foo.cpp:12: internal compiler error: Segmentation fault"),
        ReasonCode::InternalError
    );
    assert_eq!(classify("cl.exe: internal error"), ReasonCode::InternalError);
}

#[test]
fn test_compile_link_run() {
    assert_eq!(
        classify("Compile [2014-10-25 04:00:00 UTC]: fail\nerror: no match"),
        ReasonCode::CompileFail
    );
    assert_eq!(
        classify("Compile [2014-10-25 04:00:00 UTC]: succeed\nLink [2014-10-25 04:00:10 UTC]: fail"),
        ReasonCode::LinkFail
    );
    assert_eq!(
        classify("Link [..]: succeed\nRun [2014-10-25 04:01:00 UTC]: fail\nassertion failed"),
        ReasonCode::RunFail
    );
}

#[test]
fn test_rule_order_beats_text_position() {
    // run failure appears first, time limit later: time still wins
    let log = "Run [x]: fail\n...\n300 second time limit exceeded";
    assert_eq!(classify(log), ReasonCode::Time);

    // link failure before compile failure in the text: compile still wins
    let log = "Link [x]: fail\nCompile [y]: fail";
    assert_eq!(classify(log), ReasonCode::CompileFail);
}

#[test]
fn test_patterns_do_not_cross_lines() {
    assert_eq!(classify("Compile\nfail"), ReasonCode::Unknown);
    assert_eq!(classify("Link [x]:\nfailed later"), ReasonCode::Unknown);
}

#[test]
fn test_case_sensitive() {
    assert_eq!(classify("compile [x]: fail"), ReasonCode::Unknown);
    assert_eq!(classify("FILE TOO BIG"), ReasonCode::Unknown);
}

#[test]
fn test_fallback_unknown() {
    assert_eq!(classify(""), ReasonCode::Unknown);
    assert_eq!(classify("everything went fine"), ReasonCode::Unknown);
}

#[test]
fn test_deterministic() {
    let log = "Compile [x]: succeed\nLink [y]: fail";
    let first = classify(log);
    for _ in 0..10 {
        assert_eq!(classify(log), first);
    }
}

#[test]
fn test_first_matching_rule_decides() {
    // whatever order the rules are probed in, the earliest matching rule wins
    let log = "internal error\nRun [x]: fail";
    let matching: Vec<ReasonCode> = rules()
        .iter()
        .filter(|r| r.matches(log))
        .map(|r| r.reason)
        .collect();
    assert_eq!(matching, vec![ReasonCode::InternalError, ReasonCode::RunFail]);
    assert_eq!(classify(log), matching[0]);
}
