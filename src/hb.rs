// This module implements the happens-before builder, the second stage of the
// pipeline. It takes the region model produced by the analyzer and attaches an
// HbAnnotation (region, epoch, sequence number) to every synchronization event
// and memory access. Each region numbers its item stream in structural walk
// order; a barrier that the analyzer classified as a total cut closes the
// current epoch. Spawn/wait ordering needs no extra bookkeeping here: the
// parent-side anchor events recorded by the analyzer carry the annotations
// that RegionModel::ordered_before projects through the region tree. Lock
// events receive annotations like everything else but contribute no static
// cross-task edges; their identity tag defers ordering to the runtime's
// dynamic lock-history tracking. The soundness rule is structural: an edge
// exists only where the walk proved one, so unordered annotations always mean
// potentially concurrent.

//! Happens-before builder: epoch and sequence assignment over the region model.

use log::debug;

use crate::region::{HbAnnotation, RegionItem, RegionModel, SyncKind};

/// Annotate every event and access in the model.
///
/// Idempotent over a freshly analyzed model; the orchestrator guarantees it
/// runs exactly once per unit.
pub fn build_happens_before(model: &mut RegionModel) {
    for region_idx in 0..model.regions.len() as u32 {
        let items = model.regions[region_idx as usize].items.clone();
        let mut epoch = 0u32;
        let mut seq = 0u32;
        for item in items {
            let annot = HbAnnotation { region: region_idx, epoch, seq };
            match item {
                RegionItem::Event(e) => {
                    let event = &mut model.events[e as usize];
                    event.annot = Some(annot);
                    // The barrier belongs to the epoch it closes; everything
                    // after it starts the next one.
                    if event.kind == SyncKind::Barrier && event.total_cut {
                        epoch += 1;
                    }
                }
                RegionItem::Access(a) => {
                    model.accesses[a as usize].annot = Some(annot);
                }
            }
            seq += 1;
        }
    }
    debug!(
        "happens-before built: {} event(s), {} access(es) annotated",
        model.events.len(),
        model.accesses.len()
    );
}
