//! Integration tests for the synchronization analyzer: region tree shape,
//! event attribution, diagnostics for unmatched synchronization, and fatal
//! structural errors.

use bumpalo::Bump;

use archer::analyzer::analyze_function;
use archer::core::{DiagnosticKind, InstrSession, InstrumentError};
use archer::ir::Module;
use archer::region::{RegionKind, RegionModel, SyncKind, ROOT_REGION};

fn analyze(text: &str) -> (RegionModel, Vec<DiagnosticKind>) {
    let module = Module::parse(text).unwrap();
    let arena = Bump::new();
    let session = InstrSession::new(&arena);
    let model = analyze_function(&module, &session, module.func_by_name("f").unwrap())
        .expect("analysis should succeed");
    let kinds = session.diagnostics().iter().map(|d| d.kind).collect();
    (model, kinds)
}

fn analyze_err(text: &str) -> InstrumentError {
    let module = Module::parse(text).unwrap();
    let arena = Bump::new();
    let session = InstrSession::new(&arena);
    analyze_function(&module, &session, module.func_by_name("f").unwrap())
        .expect_err("analysis should fail")
}

#[test]
fn region_tree_reflects_nesting() {
    let (model, diags) = analyze(
        "f(%p) {
entry:
    par.enter
    task.spawn @t1
    store %p, %p
    task.exit @t1
    task.wait @t1
    par.exit
    ret
}
",
    );
    assert!(diags.is_empty());
    // root + parallel + task
    assert_eq!(model.regions.len(), 3);
    assert_eq!(model.region(ROOT_REGION).kind, RegionKind::Function);
    let parallel = &model.regions[1];
    assert_eq!(parallel.kind, RegionKind::Parallel);
    assert_eq!(parallel.parent, Some(ROOT_REGION));
    let task = &model.regions[2];
    assert_eq!(task.kind, RegionKind::Task);
    assert_eq!(task.parent, Some(1));
    assert!(!task.exits.is_empty());
    assert!(!task.close_events.is_empty(), "matched wait closes the task");

    // The store is attributed to the task, not the parallel region.
    assert_eq!(model.accesses.len(), 1);
    assert_eq!(model.accesses[0].region, 2);
}

#[test]
fn events_attributed_to_innermost_region() {
    let (model, _) = analyze(
        "f(%p) {
entry:
    par.enter
    barrier
    task.spawn @t
    barrier
    task.exit @t
    task.wait @t
    par.exit
    ret
}
",
    );
    let barriers: Vec<_> = model
        .events
        .iter()
        .filter(|e| e.kind == SyncKind::Barrier)
        .collect();
    assert_eq!(barriers.len(), 2);
    assert_eq!(barriers[0].region, 1, "first barrier belongs to the region");
    assert_eq!(barriers[1].region, 2, "second barrier belongs to the task");
}

#[test]
fn accesses_outside_regions_are_ignored() {
    let (model, _) = analyze(
        "f(%p) {
entry:
    %x = load %p
    par.enter
    store %p, %x
    par.exit
    ret
}
",
    );
    assert_eq!(model.accesses.len(), 1);
    assert_eq!(model.accesses[0].line, 5);
}

#[test]
fn early_exit_normalizes_region_exits() {
    let (model, _) = analyze(
        "f(%c) {
entry:
    par.enter
    condbr %c, ^leave, ^normal
leave:
    ret
normal:
    par.exit
    ret
}
",
    );
    let parallel = &model.regions[1];
    // Both the early ret and the par.exit are recorded as exits.
    assert_eq!(parallel.exits.len(), 2);
}

#[test]
fn unmatched_acquire_is_diagnosed_and_skipped() {
    let (model, diags) = analyze(
        "f(%c, %p) {
entry:
    par.enter
    lock.acquire @m
    store %p, %p
    condbr %c, ^rel, ^skip
rel:
    lock.release @m
    br ^done
skip:
    br ^done
done:
    par.exit
    ret
}
",
    );
    assert!(diags.contains(&DiagnosticKind::UnmatchedAcquire));
    let acquire = model
        .events
        .iter()
        .find(|e| e.kind == SyncKind::LockAcquire)
        .unwrap();
    let release = model
        .events
        .iter()
        .find(|e| e.kind == SyncKind::LockRelease)
        .unwrap();
    assert!(acquire.skip, "unbalanced acquire must not be instrumented");
    assert!(release.skip, "the pair is skipped as a unit");
    // The access stays instrumented conservatively.
    assert!(!model.accesses[0].confined);
}

#[test]
fn balanced_locks_are_not_skipped() {
    let (model, diags) = analyze(
        "f(%p) {
entry:
    par.enter
    lock.acquire @m
    store %p, %p
    lock.release @m
    par.exit
    ret
}
",
    );
    assert!(diags.is_empty());
    assert!(model
        .events
        .iter()
        .filter(|e| matches!(e.kind, SyncKind::LockAcquire | SyncKind::LockRelease))
        .all(|e| !e.skip));
}

#[test]
fn lock_held_across_task_exit_is_diagnosed() {
    let (model, diags) = analyze(
        "f(%p) {
entry:
    par.enter
    task.spawn @t
    lock.acquire @m
    store %p, %p
    task.exit @t
    lock.release @m
    task.wait @t
    par.exit
    ret
}
",
    );
    // Acquire and release sit on different logical threads.
    assert!(diags.contains(&DiagnosticKind::UnmatchedAcquire));
    assert!(model
        .events
        .iter()
        .filter(|e| matches!(e.kind, SyncKind::LockAcquire | SyncKind::LockRelease))
        .all(|e| e.skip));
}

#[test]
fn lock_spanning_a_whole_region_is_not_flagged() {
    let (model, diags) = analyze(
        "f(%p) {
entry:
    lock.acquire @m
    par.enter
    store %p, %p
    par.exit
    lock.release @m
    ret
}
",
    );
    // Acquired and released by the same logical thread, outside the region.
    assert!(diags.is_empty());
    assert!(model
        .events
        .iter()
        .filter(|e| matches!(e.kind, SyncKind::LockAcquire | SyncKind::LockRelease))
        .all(|e| !e.skip));
}

#[test]
fn release_without_acquire_is_diagnosed() {
    let (_, diags) = analyze(
        "f(%p) {
entry:
    par.enter
    lock.release @m
    par.exit
    ret
}
",
    );
    assert!(diags.contains(&DiagnosticKind::UnmatchedRelease));
}

#[test]
fn wait_on_unknown_task_is_diagnosed() {
    let (model, diags) = analyze(
        "f() {
entry:
    par.enter
    task.wait @ghost
    par.exit
    ret
}
",
    );
    assert!(diags.contains(&DiagnosticKind::UnmatchedWait));
    let wait = model
        .events
        .iter()
        .find(|e| e.kind == SyncKind::TaskWait)
        .unwrap();
    assert!(wait.skip);
}

#[test]
fn unawaited_task_is_diagnosed_but_kept() {
    let (model, diags) = analyze(
        "f(%p) {
entry:
    par.enter
    task.spawn @t
    store %p, %p
    task.exit @t
    par.exit
    ret
}
",
    );
    assert!(diags.contains(&DiagnosticKind::TaskNeverAwaited));
    // The task's events and accesses remain instrumented.
    assert!(model.events.iter().all(|e| !e.skip));
    assert_eq!(model.accesses.len(), 1);
}

#[test]
fn unknown_construct_in_region_is_diagnosed() {
    let (model, diags) = analyze(
        "extern helper
f(%p) {
entry:
    par.enter
    call @helper, %p
    par.exit
    ret
}
",
    );
    assert!(diags.contains(&DiagnosticKind::UnknownConstruct));
    // Opaque call: no access recorded for it.
    assert!(model.accesses.is_empty());
}

#[test]
fn confined_alloca_needs_no_hooks() {
    let (model, diags) = analyze(
        "f(%p) {
entry:
    par.enter
    task.spawn @t
    %q = alloca $8
    %x = load %p
    store %q, %x
    %y = load %q
    task.exit @t
    task.wait @t
    par.exit
    ret
}
",
    );
    assert!(diags.is_empty());
    let confined: Vec<_> = model.accesses.iter().filter(|a| a.confined).collect();
    // store %q and load %q are confined; load %p is not.
    assert_eq!(confined.len(), 2);
    assert!(model
        .accesses
        .iter()
        .filter(|a| !a.confined)
        .all(|a| a.line == 6));
}

#[test]
fn escaping_alloca_is_not_confined() {
    let (model, _) = analyze(
        "f(%p) {
entry:
    par.enter
    task.spawn @t
    %q = alloca $8
    store %p, %q
    task.exit @t
    task.wait @t
    par.exit
    ret
}
",
    );
    // %q is stored as a value; all its accesses stay instrumented.
    assert!(model.accesses.iter().all(|a| !a.confined));
}

#[test]
fn mismatched_nesting_across_edges_is_fatal() {
    let err = analyze_err(
        "f(%c) {
entry:
    condbr %c, ^a, ^b
a:
    par.enter
    br ^join
b:
    br ^join
join:
    par.exit
    ret
}
",
    );
    assert!(matches!(err, InstrumentError::MalformedNesting { .. }));
}

#[test]
fn par_exit_without_enter_is_fatal() {
    let err = analyze_err("f() {\nentry:\n    par.exit\n    ret\n}\n");
    assert!(matches!(err, InstrumentError::MalformedNesting { .. }));
}

#[test]
fn task_exit_mismatch_is_fatal() {
    let err = analyze_err(
        "f() {
entry:
    par.enter
    task.spawn @t1
    task.exit @t2
    par.exit
    ret
}
",
    );
    assert!(matches!(err, InstrumentError::MalformedNesting { .. }));
}

#[test]
fn region_without_exit_is_fatal() {
    let err = analyze_err(
        "f() {
entry:
    par.enter
    br ^spin
spin:
    br ^spin
}
",
    );
    assert!(matches!(err, InstrumentError::RegionNotClosed { .. }));
}

#[test]
fn marker_in_unreachable_block_is_fatal() {
    let err = analyze_err(
        "f() {
entry:
    ret
island:
    barrier
    ret
}
",
    );
    assert!(matches!(err, InstrumentError::MarkerUnreachable { .. }));
}
