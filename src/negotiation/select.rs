//! Selection of the cheapest proposal combination.
//!
//! Output ports map to bits. Every proposal, walked up to its root, serves an
//! exact set of ports at a known cost; a subset DP then combines disjoint
//! sets until the full set is covered.

use super::proposal::{ProposalId, ProposalSet};
use crate::error::{Error, Result};
use crate::pipeline::OutputPortId;

/// Most output ports a selection can cover.
///
/// Splitting every port set into two disjoint halves visits `3^k` pairs for
/// `k` ports. At 16 that is about 43 million, well past 20 it is billions.
pub const MAX_OUTPUT_PORTS: usize = 16;

/// The proposals to materialize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Selected proposals and all their ancestors, ascending.
    pub proposals: Vec<ProposalId>,
    /// Total cost of the selected proposals.
    pub cost: u64,
    /// Outputs no combination could serve.
    pub unresolved: Vec<OutputPortId>,
}

impl Selection {
    /// Check if every output is served.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Choice {
    Empty,
    Path(ProposalId),
    Split(usize),
}

/// Select the cheapest set of proposals serving `outputs`.
///
/// Proposals whose lineage serves a port outside `outputs` are ignored. If
/// no combination serves every port, the combination serving the most ports
/// wins (ties go to the cheaper one) and the rest are reported unresolved.
pub fn select(proposals: &ProposalSet, outputs: &[OutputPortId]) -> Result<Selection> {
    if outputs.len() > MAX_OUTPUT_PORTS {
        return Err(Error::TooManyOutputs {
            max: MAX_OUTPUT_PORTS,
        });
    }

    let full = (1usize << outputs.len()) - 1;
    let mut best: Vec<Option<(u64, Choice)>> = vec![None; full + 1];
    best[0] = Some((0, Choice::Empty));

    'proposals: for (id, _) in proposals.iter() {
        let mut mask = 0usize;
        let mut cost = 0u64;
        for ancestor in proposals.lineage(id) {
            let proposal = &proposals[ancestor];
            let Some(bit) = outputs.iter().position(|&o| o == proposal.destination) else {
                continue 'proposals;
            };
            mask |= 1 << bit;
            cost = cost.saturating_add(proposal.cost);
        }
        if best[mask].is_none_or(|(current, _)| cost < current) {
            best[mask] = Some((cost, Choice::Path(id)));
        }
    }

    for set in 1..=full {
        let mut subset = (set - 1) & set;
        while subset > 0 {
            if let (Some((a, _)), Some((b, _))) = (best[subset], best[set ^ subset]) {
                let cost = a.saturating_add(b);
                if best[set].is_none_or(|(current, _)| cost < current) {
                    best[set] = Some((cost, Choice::Split(subset)));
                }
            }
            subset = (subset - 1) & set;
        }
    }

    let chosen = if best[full].is_some() {
        full
    } else {
        (0..=full)
            .filter_map(|mask| best[mask].map(|(cost, _)| (mask, cost)))
            .max_by(|(ma, ca), (mb, cb)| {
                ma.count_ones()
                    .cmp(&mb.count_ones())
                    .then(cb.cmp(ca))
                    .then(mb.cmp(ma))
            })
            .map_or(0, |(mask, _)| mask)
    };

    let mut selected = Vec::new();
    let mut pending = vec![chosen];
    while let Some(mask) = pending.pop() {
        match best[mask] {
            Some((_, Choice::Path(id))) => selected.extend(proposals.lineage(id)),
            Some((_, Choice::Split(subset))) => pending.extend([subset, mask ^ subset]),
            Some((_, Choice::Empty)) | None => {}
        }
    }
    selected.sort();
    selected.dedup();

    let unresolved: Vec<OutputPortId> = outputs
        .iter()
        .enumerate()
        .filter(|(bit, _)| chosen & (1 << bit) == 0)
        .map(|(_, &port)| port)
        .collect();
    let cost = best[chosen].map_or(0, |(cost, _)| cost);

    tracing::debug!(
        selected = selected.len(),
        cost,
        unresolved = unresolved.len(),
        "selected proposals"
    );
    Ok(Selection {
        proposals: selected,
        cost,
        unresolved,
    })
}
