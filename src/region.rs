// This module defines the region model produced by the synchronization
// analyzer and consumed by the happens-before builder and the instrumentation
// inserter: an arena of ParallelRegion records addressed by index (parent links
// and child lists instead of pointer trees), the SyncEvent and MemoryAccess
// records attributed to their innermost enclosing region, and the HbAnnotation
// tag (region, epoch, sequence number) attached to every event and access once
// the happens-before build has run. RegionModel::ordered_before implements the
// static partial order over annotations: same-region program order, barrier
// epoch cuts, and spawn/wait edges projected through the region tree via each
// region's parent-side enter and close anchor events. Lock events carry only a
// lock-identity tag; ordering through locks is deferred to the runtime's
// dynamic lock-history tracking.

//! Region model: parallel regions, synchronization events, memory accesses
//! and their happens-before annotations.
//!
//! One model is built per function per pass invocation and discarded when the
//! inserter finishes. A region's events and accesses are stored in structural
//! walk order, which is the order the happens-before builder numbers them in.

use crate::ir::{FuncIdx, InstIdx, SymIdx};

/// Index of a region in [`RegionModel::regions`]. Region 0 is the implicit
/// function-scope root.
pub type RegionIdx = u32;
/// Index of an event in [`RegionModel::events`].
pub type EventIdx = u32;
/// Index of an access in [`RegionModel::accesses`].
pub type AccessIdx = u32;

pub const ROOT_REGION: RegionIdx = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Implicit root scope of the function.
    Function,
    /// Structured parallel region (`par.enter` .. `par.exit`).
    Parallel,
    /// Lexically delimited task (`task.spawn` .. `task.exit`).
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    RegionEnter,
    RegionExit,
    Barrier,
    TaskSpawn,
    TaskWait,
    LockAcquire,
    LockRelease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// Position of an event or access in the static happens-before order.
///
/// `region` is the innermost region whose logical thread of control executes
/// the event; `seq` numbers the region's items in structural walk order;
/// `epoch` counts the total-cut barriers seen in that region before the event.
/// Two annotations with no ordering path between them are potentially
/// concurrent; the builder never fabricates an edge it cannot prove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HbAnnotation {
    pub region: RegionIdx,
    pub epoch: u32,
    pub seq: u32,
}

/// One synchronization construct, attributed to its innermost region.
#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub kind: SyncKind,
    pub region: RegionIdx,
    pub inst: InstIdx,
    pub line: u32,
    /// Lock or task identity, where the kind has one.
    pub ident: Option<SymIdx>,
    /// Excluded from instrumentation by a recoverable diagnostic.
    pub skip: bool,
    /// For barriers: whether the barrier is a total synchronization cut.
    pub total_cut: bool,
    pub annot: Option<HbAnnotation>,
}

/// A read or write inside a parallel region that may need a hook.
#[derive(Debug, Clone)]
pub struct MemoryAccess {
    pub kind: AccessKind,
    pub region: RegionIdx,
    pub inst: InstIdx,
    pub line: u32,
    /// The address value (an instruction index; an `alloca`, argument or load).
    pub addr: InstIdx,
    /// Proven confined to a single task; no hook needed.
    pub confined: bool,
    pub annot: Option<HbAnnotation>,
}

/// Item stream of a region in structural walk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionItem {
    Event(EventIdx),
    Access(AccessIdx),
}

#[derive(Debug, Clone)]
pub struct ParallelRegion {
    pub kind: RegionKind,
    pub parent: Option<RegionIdx>,
    pub children: Vec<RegionIdx>,
    pub depth: u32,
    /// The marker instruction that opened the region (None for the root).
    pub entry: Option<InstIdx>,
    /// Exit marker instructions; non-empty for every non-root region once the
    /// analyzer has normalized exits.
    pub exits: Vec<InstIdx>,
    /// Task or region identity symbol, if the opening marker carried one.
    pub ident: Option<SymIdx>,
    /// Parent-side anchor that starts this region: the `par.enter` event for
    /// parallel regions, the `task.spawn` event for tasks.
    pub enter_event: Option<EventIdx>,
    /// Parent-side anchors that guarantee this region's completion: the
    /// `par.exit` events for parallel regions (synchronous), the matched
    /// `task.wait` events for tasks. Empty for an unawaited task.
    pub close_events: Vec<EventIdx>,
    /// Events and accesses executed by this region's own thread of control,
    /// in structural walk order.
    pub items: Vec<RegionItem>,
}

/// Region model of one function.
#[derive(Debug, Clone)]
pub struct RegionModel {
    pub func: FuncIdx,
    pub regions: Vec<ParallelRegion>,
    pub events: Vec<SyncEvent>,
    pub accesses: Vec<MemoryAccess>,
}

impl RegionModel {
    pub fn new(func: FuncIdx) -> Self {
        Self {
            func,
            regions: vec![ParallelRegion {
                kind: RegionKind::Function,
                parent: None,
                children: Vec::new(),
                depth: 0,
                entry: None,
                exits: Vec::new(),
                ident: None,
                enter_event: None,
                close_events: Vec::new(),
                items: Vec::new(),
            }],
            events: Vec::new(),
            accesses: Vec::new(),
        }
    }

    pub fn region(&self, idx: RegionIdx) -> &ParallelRegion {
        &self.regions[idx as usize]
    }

    pub fn event(&self, idx: EventIdx) -> &SyncEvent {
        &self.events[idx as usize]
    }

    pub fn access(&self, idx: AccessIdx) -> &MemoryAccess {
        &self.accesses[idx as usize]
    }

    /// Number of regions excluding the implicit root.
    pub fn parallel_region_count(&self) -> usize {
        self.regions.len() - 1
    }

    pub fn add_region(
        &mut self,
        kind: RegionKind,
        parent: RegionIdx,
        entry: InstIdx,
        ident: Option<SymIdx>,
    ) -> RegionIdx {
        let idx = self.regions.len() as RegionIdx;
        let depth = self.region(parent).depth + 1;
        self.regions.push(ParallelRegion {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            depth,
            entry: Some(entry),
            exits: Vec::new(),
            ident,
            enter_event: None,
            close_events: Vec::new(),
            items: Vec::new(),
        });
        self.regions[parent as usize].children.push(idx);
        idx
    }

    pub fn add_event(&mut self, event: SyncEvent) -> EventIdx {
        let idx = self.events.len() as EventIdx;
        let region = event.region;
        self.events.push(event);
        self.regions[region as usize].items.push(RegionItem::Event(idx));
        idx
    }

    pub fn add_access(&mut self, access: MemoryAccess) -> AccessIdx {
        let idx = self.accesses.len() as AccessIdx;
        let region = access.region;
        self.accesses.push(access);
        self.regions[region as usize].items.push(RegionItem::Access(idx));
        idx
    }

    /// Whether `a` is an ancestor of `b` (or equal to it).
    pub fn is_ancestor(&self, a: RegionIdx, b: RegionIdx) -> bool {
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.region(cur).parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Lowest common ancestor of two regions.
    pub fn lca(&self, a: RegionIdx, b: RegionIdx) -> RegionIdx {
        let mut x = a;
        let mut y = b;
        while self.region(x).depth > self.region(y).depth {
            x = self.region(x).parent.unwrap_or(ROOT_REGION);
        }
        while self.region(y).depth > self.region(x).depth {
            y = self.region(y).parent.unwrap_or(ROOT_REGION);
        }
        while x != y {
            x = self.region(x).parent.unwrap_or(ROOT_REGION);
            y = self.region(y).parent.unwrap_or(ROOT_REGION);
        }
        x
    }

    /// Static happens-before query over two annotations.
    ///
    /// Returns true only when a structural synchronization path orders `a`
    /// before `b`: program order in the same region, a barrier epoch cut, or
    /// spawn/wait edges projected through the region tree. Anything the walk
    /// cannot prove stays unordered.
    pub fn ordered_before(&self, a: HbAnnotation, b: HbAnnotation) -> bool {
        if a.region == b.region {
            return a.seq < b.seq;
        }
        let l = self.lca(a.region, b.region);
        let completion = self.project_completion(a, l);
        let start = self.project_start(b, l);
        let (Some(start), Some(completion)) = (start, completion) else {
            return false;
        };
        if let Some(seq) = completion.seq {
            if seq <= start.seq {
                return true;
            }
        }
        completion.epoch < start.epoch
    }

    /// Project `b` up to ancestor region `l`: the anchor event after which
    /// everything in `b`'s region chain begins.
    fn project_start(&self, b: HbAnnotation, l: RegionIdx) -> Option<HbAnnotation> {
        let mut ann = b;
        while ann.region != l {
            let enter = self.region(ann.region).enter_event?;
            ann = self.event(enter).annot?;
        }
        Some(ann)
    }

    /// Completion bound of `a` in ancestor region `l`.
    ///
    /// The sequence component is exact only while every region on the path has
    /// a close anchor (exit or matched wait); once a hop has none, only the
    /// epoch bound survives (the region's outstanding work is joined at the
    /// next barrier of its parent).
    fn project_completion(&self, a: HbAnnotation, l: RegionIdx) -> Option<ProjectedBound> {
        let mut epoch = a.epoch;
        let mut seq = Some(a.seq);
        let mut region = a.region;
        while region != l {
            let rec = self.region(region);
            // Conservative close anchor: the last close event in walk order,
            // so only parent items after every possible exit are ordered.
            let close = rec
                .close_events
                .iter()
                .filter_map(|&e| self.event(e).annot)
                .max_by_key(|ann| ann.seq);
            match close {
                Some(ann) => {
                    epoch = ann.epoch;
                    seq = seq.map(|_| ann.seq);
                    region = ann.region;
                }
                None => {
                    let enter = rec.enter_event?;
                    let ann = self.event(enter).annot?;
                    epoch = ann.epoch;
                    seq = None;
                    region = ann.region;
                }
            }
        }
        Some(ProjectedBound { epoch, seq })
    }
}

struct ProjectedBound {
    epoch: u32,
    seq: Option<u32>,
}

impl SyncKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SyncKind::RegionEnter => "region-enter",
            SyncKind::RegionExit => "region-exit",
            SyncKind::Barrier => "barrier",
            SyncKind::TaskSpawn => "task-spawn",
            SyncKind::TaskWait => "task-wait",
            SyncKind::LockAcquire => "lock-acquire",
            SyncKind::LockRelease => "lock-release",
        }
    }
}
