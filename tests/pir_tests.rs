//! Integration tests for the PIR textual format.

use archer::ir::{Module, Opcode};

/// Helper to check if output contains expected patterns.
fn check_output_contains(output: &str, patterns: &[&str]) {
    for pattern in patterns {
        assert!(
            output.contains(pattern),
            "output missing expected pattern: '{pattern}'\nfull output:\n{output}"
        );
    }
}

#[test]
fn parse_and_print_roundtrip() {
    let text = "\
f(%a, %b) {
entry:
    %c = add %a, %b
    condbr %c, ^then, ^done
then:
    %d = sub %c, %a
    br ^done
done:
    ret %c
}
";
    let module = Module::parse(text).unwrap();
    let printed = module.print();
    check_output_contains(
        &printed,
        &[
            "f(%a, %b) {",
            "%c = add %a, %b",
            "condbr %c, ^then, ^done",
            "%d = sub %c, %a",
            "ret %c",
        ],
    );
    // The printed form parses back to the same structure.
    let reparsed = Module::parse(&printed).unwrap();
    assert_eq!(reparsed.functions.len(), module.functions.len());
    assert_eq!(reparsed.blocks.len(), module.blocks.len());
    assert_eq!(reparsed.insts.len(), module.insts.len());
}

#[test]
fn parses_full_marker_catalog() {
    let text = "\
f(%p) {
entry:
    par.enter
    task.spawn @t1
    %x = load %p
    store %p, %x
    task.exit @t1
    task.wait @t1
    barrier
    lock.acquire @m
    lock.release @m
    par.exit
    ret
}
";
    let module = Module::parse(text).unwrap();
    let ops: Vec<Opcode> = module.insts.iter().map(|i| i.op).collect();
    for op in [
        Opcode::ParEnter,
        Opcode::ParExit,
        Opcode::TaskSpawn,
        Opcode::TaskExit,
        Opcode::TaskWait,
        Opcode::Barrier,
        Opcode::LockAcquire,
        Opcode::LockRelease,
    ] {
        assert!(ops.contains(&op), "missing opcode {op:?}");
    }
    assert!(module.sym("t1").is_some());
    assert!(module.sym("m").is_some());
}

#[test]
fn extern_declarations() {
    let module = Module::parse("extern helper\nf() {\nentry:\n    ret\n}\n").unwrap();
    assert_eq!(module.functions.len(), 2);
    assert!(module.functions[0].declaration);
    assert_eq!(module.functions[0].name, "helper");
    assert!(!module.functions[1].declaration);
    assert!(module.print().contains("extern helper"));
}

#[test]
fn call_prints_callee_and_args() {
    let module = Module::parse(
        "extern helper\nf(%p) {\nentry:\n    %r = call @helper, %p\n    ret %r\n}\n",
    )
    .unwrap();
    check_output_contains(&module.print(), &["%r = call @helper, %p"]);
}

#[test]
fn rejects_operand_count_mismatch() {
    let err = Module::parse("f(%a) {\nentry:\n    %c = add %a\n    ret\n}\n").unwrap_err();
    assert!(err.message.contains("expects 2 value operand(s)"));
}

#[test]
fn rejects_marker_without_identity() {
    let err = Module::parse("f() {\nentry:\n    task.spawn\n    ret\n}\n").unwrap_err();
    assert!(err.message.contains("symbol operand"));
}
