//! Candidate chain enumeration.
//!
//! [`ChainGenerator`] walks the Cartesian power of the catalog like an
//! odometer: position 0 is the stage nearest the route source and turns
//! fastest. A validator that rejects a chain names the lowest position whose
//! change can fix it, and every permutation sharing the rejected suffix is
//! skipped in one step.

use super::catalog::CatalogEntry;
use super::proposal::Route;
use crate::element::StageKlass;
use smallvec::SmallVec;

/// A candidate chain, source side first.
pub type Chain<'a> = SmallVec<[&'a CatalogEntry; 4]>;

/// Outcome of validating a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainVerdict {
    /// The chain is worth probing.
    Accept,
    /// The chain is invalid, as is every chain sharing its entries from
    /// `retry_depth` upwards.
    Reject {
        /// Position to resume enumeration from.
        retry_depth: usize,
    },
}

impl ChainVerdict {
    /// Check if accepted.
    pub fn is_accept(self) -> bool {
        self == Self::Accept
    }

    /// Run the next validator only if this one accepted.
    pub fn and_then(self, next: impl FnOnce() -> ChainVerdict) -> ChainVerdict {
        match self {
            Self::Accept => next(),
            rejected => rejected,
        }
    }
}

// ============================================================================
// Validators
// ============================================================================

/// Every boundary, route endpoints included, must be able to intersect.
///
/// Boundaries are checked from the destination towards the source; boundary
/// `b` sits between positions `b - 1` and `b`.
pub fn validate_chain_caps(route: &Route, chain: &[&CatalogEntry]) -> ChainVerdict {
    let len = chain.len();
    for boundary in (0..=len).rev() {
        let upstream = match boundary {
            0 => &route.source_caps,
            b => &chain[b - 1].src_caps,
        };
        let downstream = if boundary == len {
            &route.destination_caps
        } else {
            &chain[boundary].sink_caps
        };
        if !upstream.can_intersect(downstream) {
            return ChainVerdict::Reject {
                retry_depth: boundary.saturating_sub(1),
            };
        }
    }
    ChainVerdict::Accept
}

/// The same stage type may not appear twice in a row.
pub fn validate_non_consecutive(chain: &[&CatalogEntry]) -> ChainVerdict {
    chain
        .windows(2)
        .rposition(|pair| std::ptr::eq(pair[0], pair[1]))
        .map_or(ChainVerdict::Accept, |depth| ChainVerdict::Reject {
            retry_depth: depth,
        })
}

fn stage_rank(klass: StageKlass) -> u8 {
    if klass.contains(StageKlass::PARSER) {
        0
    } else if klass.contains(StageKlass::DECODER) {
        1
    } else if klass.contains(StageKlass::ENCODER) {
        3
    } else {
        2
    }
}

/// Stages must follow parse, decode, convert, encode order.
///
/// Unclassified stages rank as converters.
pub fn validate_stage_order(chain: &[&CatalogEntry]) -> ChainVerdict {
    let mut next_rank = stage_rank(StageKlass::ENCODER);
    for (depth, entry) in chain.iter().enumerate().rev() {
        let rank = stage_rank(entry.klass);
        if rank > next_rank {
            return ChainVerdict::Reject { retry_depth: depth };
        }
        next_rank = rank;
    }
    ChainVerdict::Accept
}

// ============================================================================
// Generator
// ============================================================================

/// Enumerates the valid chains of one length.
pub struct ChainGenerator<'a, V> {
    entries: &'a [CatalogEntry],
    cursors: SmallVec<[usize; 4]>,
    validate: V,
    fresh: bool,
    exhausted: bool,
}

impl<'a, V> ChainGenerator<'a, V>
where
    V: FnMut(&[&'a CatalogEntry]) -> ChainVerdict,
{
    /// Enumerate chains of `length` entries accepted by `validate`.
    pub fn new(entries: &'a [CatalogEntry], length: usize, validate: V) -> Self {
        Self {
            entries,
            cursors: SmallVec::from_elem(0, length),
            validate,
            fresh: true,
            exhausted: length == 0 || entries.is_empty(),
        }
    }

    /// Step the odometer from position `start`, carrying upwards and
    /// resetting every position below `start`. Returns `false` once every
    /// chain has been visited.
    pub fn advance(&mut self, start: usize) -> bool {
        if self.exhausted {
            return false;
        }
        let mut position = start;
        loop {
            let Some(cursor) = self.cursors.get_mut(position) else {
                self.exhausted = true;
                return false;
            };
            *cursor += 1;
            if *cursor < self.entries.len() {
                break;
            }
            *cursor = 0;
            position += 1;
        }
        self.cursors[..start].fill(0);
        true
    }

    fn current(&self) -> Chain<'a> {
        self.cursors.iter().map(|&i| &self.entries[i]).collect()
    }
}

impl<'a, V> Iterator for ChainGenerator<'a, V>
where
    V: FnMut(&[&'a CatalogEntry]) -> ChainVerdict,
{
    type Item = Chain<'a>;

    fn next(&mut self) -> Option<Chain<'a>> {
        if self.exhausted {
            return None;
        }
        let mut start = 0;
        loop {
            if self.fresh {
                self.fresh = false;
            } else if !self.advance(start) {
                return None;
            }

            let chain = self.current();
            match (self.validate)(&chain) {
                ChainVerdict::Accept => return Some(chain),
                ChainVerdict::Reject { retry_depth } => {
                    start = retry_depth.min(self.cursors.len() - 1);
                }
            }
        }
    }
}
