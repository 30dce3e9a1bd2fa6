//! End-to-end tests for the pass orchestrator: full pipeline runs, the
//! idempotence witness, fatal-error atomicity, and the registration surface.

use bumpalo::Bump;

use archer::core::{DiagnosticKind, InstrSession, InstrumentError, UnitState};
use archer::ir::Module;
use archer::pass::{
    initialize_archer_passes, register_archer_passes, ArcherInsertionPass, InstrumentationPass,
    ModulePass, PassPipeline, PassRegistry, UnitOutcome,
};
use archer::runtime::decode_tag;

const TWO_TASKS: &str = "f(%p) {
entry:
    par.enter
    task.spawn @t1
    store %p, %p
    task.exit @t1
    task.spawn @t2
    store %p, %p
    task.exit @t2
    task.wait @t1
    task.wait @t2
    par.exit
    ret
}
";

fn run(module: &mut Module) -> (UnitOutcome, Vec<DiagnosticKind>) {
    let arena = Bump::new();
    let session = InstrSession::new(&arena);
    let outcome = InstrumentationPass::new()
        .run_unit(&session, module)
        .expect("pipeline should succeed");
    let kinds = session.diagnostics().iter().map(|d| d.kind).collect();
    (outcome, kinds)
}

/// Trailing immediate of an instruction line, i.e. the emitted tag argument.
fn last_imm(line: &str) -> i64 {
    let (_, digits) = line.rsplit_once('$').expect("line has an immediate");
    digits.trim().parse().expect("immediate parses")
}

#[test]
fn emitted_tags_prove_concurrent_writes_unordered() {
    let mut module = Module::parse(TWO_TASKS).unwrap();
    let (outcome, _) = run(&mut module);
    let UnitOutcome::Instrumented { models, hooks } = outcome else {
        panic!("unit was refused");
    };
    assert!(hooks > 0);

    let out = module.print();
    let tags: Vec<i64> = out
        .lines()
        .filter(|l| l.contains("call @__archer_write"))
        .map(last_imm)
        .collect();
    assert_eq!(tags.len(), 2, "both writes are hooked");

    // The tags alone must let the runtime see the two writes as potentially
    // concurrent: same location, no static order either way.
    let a = decode_tag(tags[0]);
    let b = decode_tag(tags[1]);
    assert_ne!(a.region, b.region);
    let model = &models[0];
    assert!(!model.ordered_before(a, b));
    assert!(!model.ordered_before(b, a));
}

#[test]
fn barrier_splits_four_tasks_in_emitted_tags() {
    let mut module = Module::parse(
        "f(%p) {
entry:
    par.enter
    task.spawn @a
    store %p, %p
    task.exit @a
    task.spawn @b
    store %p, %p
    task.exit @b
    task.wait @a
    task.wait @b
    barrier
    task.spawn @c
    store %p, %p
    task.exit @c
    task.spawn @d
    store %p, %p
    task.exit @d
    task.wait @c
    task.wait @d
    par.exit
    ret
}
",
    )
    .unwrap();
    let (outcome, diags) = run(&mut module);
    assert!(diags.is_empty());
    let UnitOutcome::Instrumented { models, .. } = outcome else {
        panic!("unit was refused");
    };
    let model = &models[0];

    let out = module.print();
    let tags: Vec<_> = out
        .lines()
        .filter(|l| l.contains("call @__archer_write"))
        .map(|l| decode_tag(last_imm(l)))
        .collect();
    assert_eq!(tags.len(), 4);
    let (pre, post) = tags.split_at(2);

    // Every pre-barrier write is ordered before every post-barrier write,
    // across tasks; nothing else is ordered.
    for &p in pre {
        for &q in post {
            assert!(model.ordered_before(p, q));
            assert!(!model.ordered_before(q, p));
        }
    }
    assert!(!model.ordered_before(pre[0], pre[1]));
    assert!(!model.ordered_before(pre[1], pre[0]));
    assert!(!model.ordered_before(post[0], post[1]));
    assert!(!model.ordered_before(post[1], post[0]));
}

#[test]
fn second_run_is_refused() {
    let mut module = Module::parse(TWO_TASKS).unwrap();
    let (first, _) = run(&mut module);
    assert!(matches!(first, UnitOutcome::Instrumented { .. }));
    let hooked = module.print();

    let (second, diags) = run(&mut module);
    assert!(matches!(second, UnitOutcome::Refused));
    assert!(diags.contains(&DiagnosticKind::AlreadyInstrumented));
    // Refusal leaves the module untouched.
    assert_eq!(module.print(), hooked);

    // The same holds after a print/parse round trip, where only the hook
    // declarations witness the earlier run.
    let mut reparsed = Module::parse(&hooked).unwrap();
    let (third, diags) = run(&mut reparsed);
    assert!(matches!(third, UnitOutcome::Refused));
    assert!(diags.contains(&DiagnosticKind::AlreadyInstrumented));
}

#[test]
fn hook_declarations_alone_trigger_refusal() {
    // The instrumented flag does not survive printing; the declarations do.
    let mut module = Module::parse(
        "extern __archer_write
f(%p) {
entry:
    par.enter
    store %p, %p
    par.exit
    ret
}
",
    )
    .unwrap();
    assert!(!module.instrumented);
    let (outcome, diags) = run(&mut module);
    assert!(matches!(outcome, UnitOutcome::Refused));
    assert!(diags.contains(&DiagnosticKind::AlreadyInstrumented));
}

#[test]
fn fatal_error_leaves_module_unmutated() {
    // `g` is malformed; `f` is fine but must not be rewritten either.
    let mut module = Module::parse(
        "f(%p) {
entry:
    par.enter
    store %p, %p
    par.exit
    ret
}
g() {
entry:
    par.exit
    ret
}
",
    )
    .unwrap();
    let original = module.print();
    let arena = Bump::new();
    let session = InstrSession::new(&arena);
    let err = InstrumentationPass::new()
        .run_unit(&session, &mut module)
        .expect_err("malformed unit must fail");
    assert!(matches!(err, InstrumentError::MalformedNesting { .. }));
    assert_eq!(module.print(), original);
    assert!(!module.instrumented);
}

#[test]
fn unit_state_runs_to_completion() {
    let mut module = Module::parse(TWO_TASKS).unwrap();
    let arena = Bump::new();
    let session = InstrSession::new(&arena);
    InstrumentationPass::new()
        .run_unit(&session, &mut module)
        .unwrap();
    assert_eq!(session.state(), UnitState::Done);
    assert!(module.instrumented);

    let stats = session.stats();
    assert_eq!(stats.functions_analyzed, 1);
    // Eight events (region enter/exit, two spawn/exit pairs, two waits) plus
    // two accesses.
    assert_eq!(stats.hooks_inserted, 10);
    assert_eq!(stats.sync_events, 8);
    assert_eq!(stats.memory_accesses, 2);
}

#[test]
fn pipeline_runs_registered_passes_in_order() {
    let mut pipeline = PassPipeline::new();
    register_archer_passes(&mut pipeline);
    assert_eq!(pipeline.pass_names(), vec!["archer-analysis", "archer-insert"]);

    let mut module = Module::parse(TWO_TASKS).unwrap();
    let arena = Bump::new();
    let session = InstrSession::new(&arena);
    pipeline.run(&session, &mut module).unwrap();
    assert!(module.instrumented);
    assert_eq!(session.state(), UnitState::Done);
}

#[test]
fn stray_second_insertion_pass_fails_without_reinstrumenting() {
    let mut pipeline = PassPipeline::new();
    register_archer_passes(&mut pipeline);
    pipeline.add_pass(ArcherInsertionPass::new());

    let mut module = Module::parse(TWO_TASKS).unwrap();
    let arena = Bump::new();
    let session = InstrSession::new(&arena);
    let err = pipeline
        .run(&session, &mut module)
        .expect_err("duplicate insertion pass must fail the state machine");
    assert!(matches!(err, InstrumentError::InvalidState { .. }));

    // The first insertion's hooks are present exactly once; the stray pass
    // failed before rewriting anything.
    let out = module.print();
    assert_eq!(out.matches("call @__archer_write").count(), 2);
    assert_eq!(out.matches("call @__archer_region, $0").count(), 1);
    assert_eq!(session.stats().hooks_inserted, 10);
}

#[test]
fn lone_insertion_pass_leaves_module_untouched() {
    let mut module = Module::parse(TWO_TASKS).unwrap();
    let original = module.print();
    let arena = Bump::new();
    let session = InstrSession::new(&arena);
    let mut insertion = ArcherInsertionPass::new();
    let err = insertion
        .run(&session, &mut module)
        .expect_err("insertion without analysis must fail the state machine");
    assert!(matches!(err, InstrumentError::InvalidState { .. }));
    assert_eq!(module.print(), original);
    assert!(!module.instrumented);
}

#[test]
fn registry_installation_is_idempotent() {
    let mut registry = PassRegistry::new();
    initialize_archer_passes(&mut registry);
    assert!(registry.is_installed("archer-analysis"));
    assert!(registry.is_installed("archer-insert"));
    // Re-initialization must not duplicate the entries.
    initialize_archer_passes(&mut registry);
    assert!(!registry.install("archer-analysis"));
}
