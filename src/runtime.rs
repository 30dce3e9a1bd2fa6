// This module pins down the outbound contract between the instrumentation
// inserter and the external race-detection runtime: the hook symbol names, the
// numeric event-kind codes, the packed 64-bit happens-before tag, and the hook
// placement rules. The argument shape of every inserted call is
// (event-kind, program-location, happens-before-tag, [lock-or-task-identity]);
// memory-access hooks encode their kind in the symbol name and carry the
// accessed address instead. This is a stable external contract: the runtime
// owns the other side, and changes here must be coordinated, not made
// unilaterally.

//! Runtime hook contract.
//!
//! Hook placement: hooks for scope-opening events (`par.enter`,
//! `lock.acquire`) are inserted after their marker so the runtime observes
//! them inside the scope they open; `task.spawn` hooks are inserted before the
//! marker so they execute on the parent side of the lexical task body; every
//! other event hook and all memory-access hooks are inserted before their
//! instruction.

use crate::region::{HbAnnotation, SyncKind};

pub const HOOK_PREFIX: &str = "__archer_";

pub const HOOK_REGION: &str = "__archer_region";
pub const HOOK_TASK: &str = "__archer_task";
pub const HOOK_BARRIER: &str = "__archer_barrier";
pub const HOOK_LOCK: &str = "__archer_lock";
pub const HOOK_READ: &str = "__archer_read";
pub const HOOK_WRITE: &str = "__archer_write";

/// Whether a callee name belongs to the runtime hook namespace.
pub fn is_hook(name: &str) -> bool {
    name.starts_with(HOOK_PREFIX)
}

/// Hook symbol receiving a given synchronization event.
pub fn hook_for_event(kind: SyncKind) -> &'static str {
    match kind {
        SyncKind::RegionEnter | SyncKind::RegionExit => HOOK_REGION,
        SyncKind::TaskSpawn | SyncKind::TaskWait => HOOK_TASK,
        SyncKind::Barrier => HOOK_BARRIER,
        SyncKind::LockAcquire | SyncKind::LockRelease => HOOK_LOCK,
    }
}

/// Numeric event-kind code passed as the hook's first argument.
pub fn event_kind_code(kind: SyncKind) -> i64 {
    match kind {
        SyncKind::RegionEnter => 0,
        SyncKind::RegionExit => 1,
        SyncKind::Barrier => 2,
        SyncKind::TaskSpawn => 3,
        SyncKind::TaskWait => 4,
        SyncKind::LockAcquire => 5,
        SyncKind::LockRelease => 6,
    }
}

// Tag layout: region in the top 24 bits, epoch in the middle 20, sequence
// number in the low 20.
const REGION_BITS: u32 = 24;
const EPOCH_BITS: u32 = 20;
const SEQ_BITS: u32 = 20;
const REGION_MASK: u64 = (1 << REGION_BITS) - 1;
const EPOCH_MASK: u64 = (1 << EPOCH_BITS) - 1;
const SEQ_MASK: u64 = (1 << SEQ_BITS) - 1;

/// Pack a happens-before annotation into the tag argument.
///
/// Returns `None` when any field exceeds its bit budget: a wrapped tag could
/// collide with another annotation and make the runtime infer orderings that
/// were never computed, so the caller drops the hook with a diagnostic
/// instead.
pub fn encode_tag(annot: HbAnnotation) -> Option<i64> {
    if annot.region as u64 > REGION_MASK
        || annot.epoch as u64 > EPOCH_MASK
        || annot.seq as u64 > SEQ_MASK
    {
        return None;
    }
    let packed = ((annot.region as u64) << (EPOCH_BITS + SEQ_BITS))
        | ((annot.epoch as u64) << SEQ_BITS)
        | annot.seq as u64;
    Some(packed as i64)
}

/// Unpack a tag; used by tests and the CLI to verify emitted annotations.
pub fn decode_tag(tag: i64) -> HbAnnotation {
    let packed = tag as u64;
    HbAnnotation {
        region: (packed >> (EPOCH_BITS + SEQ_BITS)) as u32,
        epoch: ((packed >> SEQ_BITS) & EPOCH_MASK) as u32,
        seq: (packed & SEQ_MASK) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_packing_roundtrips() {
        let annot = HbAnnotation { region: 3, epoch: 7, seq: 41 };
        assert_eq!(decode_tag(encode_tag(annot).unwrap()), annot);
    }

    #[test]
    fn oversized_fields_refuse_to_encode() {
        let fits = HbAnnotation { region: (1 << 24) - 1, epoch: (1 << 20) - 1, seq: (1 << 20) - 1 };
        assert!(encode_tag(fits).is_some());
        assert!(encode_tag(HbAnnotation { region: 1 << 24, epoch: 0, seq: 0 }).is_none());
        assert!(encode_tag(HbAnnotation { region: 0, epoch: 1 << 20, seq: 0 }).is_none());
        assert!(encode_tag(HbAnnotation { region: 0, epoch: 0, seq: 1 << 20 }).is_none());
    }

    #[test]
    fn hook_namespace_is_recognized() {
        assert!(is_hook(HOOK_WRITE));
        assert!(!is_hook("memcpy"));
    }
}
