//! Proposal generation.
//!
//! A [`Proposal`] is one way of serving an output port: a negotiated chain of
//! steps hanging either off an input port or off a step of another proposal.
//! Proposals form a forest stored in a [`ProposalSet`] arena.

use super::catalog::{CatalogEntry, StageCatalog};
use super::chain::ChainGenerator;
use super::policy::ConvertPolicy;
use super::probe::ProbeCache;
use crate::element::StageFactory;
use crate::format::{Caps, MediaFormat};
use crate::pipeline::{InputPortId, OutputPortId};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// Index of a proposal in its [`ProposalSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalId(pub(crate) usize);

impl ProposalId {
    /// Get the arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proposal{}", self.0)
    }
}

/// Where a proposal's chain attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProposalParent {
    /// Directly on an input port.
    Port(InputPortId),
    /// On the output of a step of another proposal.
    Step {
        /// The parent proposal.
        proposal: ProposalId,
        /// Index into the parent's steps.
        step: usize,
    },
}

/// One negotiated stage of a proposal.
#[derive(Debug, Clone)]
pub struct TransformationStep {
    /// Stage type.
    pub factory: Arc<StageFactory>,
    /// Format entering the stage.
    pub input: MediaFormat,
    /// Format leaving the stage.
    pub output: MediaFormat,
    /// Policy cost of this step.
    pub cost: u64,
}

/// A way of serving one output port.
#[derive(Debug, Clone)]
pub struct Proposal {
    /// Attachment point.
    pub parent: ProposalParent,
    /// Served output port.
    pub destination: OutputPortId,
    /// Steps in data order; empty for a passthrough.
    pub steps: Vec<TransformationStep>,
    /// Sum of the step costs.
    pub cost: u64,
}

impl Proposal {
    fn new(parent: ProposalParent, destination: OutputPortId, steps: Vec<TransformationStep>) -> Self {
        let cost = steps.iter().fold(0u64, |acc, s| acc.saturating_add(s.cost));
        Self {
            parent,
            destination,
            steps,
            cost,
        }
    }

    /// Check if the proposal links its parent straight to the output.
    pub fn is_passthrough(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A conversion problem between two endpoints.
#[derive(Debug, Clone)]
pub struct Route {
    /// Input port, or `None` when the route starts at a step output.
    pub source: Option<InputPortId>,
    /// What the source produces.
    pub source_caps: Caps,
    /// Output port to serve.
    pub destination: OutputPortId,
    /// What the destination accepts.
    pub destination_caps: Caps,
}

/// Arena of proposals.
#[derive(Debug, Clone, Default)]
pub struct ProposalSet {
    proposals: Vec<Proposal>,
}

impl ProposalSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a proposal and return its id.
    pub fn push(&mut self, proposal: Proposal) -> ProposalId {
        self.proposals.push(proposal);
        ProposalId(self.proposals.len() - 1)
    }

    /// Get a proposal by id.
    pub fn get(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(id.0)
    }

    /// Number of proposals.
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Iterate in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ProposalId, &Proposal)> {
        self.proposals
            .iter()
            .enumerate()
            .map(|(i, p)| (ProposalId(i), p))
    }

    /// `id` followed by each of its ancestors, nearest first.
    pub fn lineage(&self, id: ProposalId) -> impl Iterator<Item = ProposalId> + '_ {
        std::iter::successors(Some(id), |&current| match self.proposals[current.0].parent {
            ProposalParent::Step { proposal, .. } => Some(proposal),
            ProposalParent::Port(_) => None,
        })
    }

    /// Input port at the root of `id`'s tree.
    pub fn root_port(&self, id: ProposalId) -> Option<InputPortId> {
        self.lineage(id)
            .last()
            .and_then(|root| match self.proposals[root.0].parent {
                ProposalParent::Port(port) => Some(port),
                ProposalParent::Step { .. } => None,
            })
    }

    fn serves_in_lineage(&self, id: ProposalId, destination: OutputPortId) -> bool {
        self.lineage(id)
            .any(|p| self.proposals[p.0].destination == destination)
    }
}

impl Index<ProposalId> for ProposalSet {
    type Output = Proposal;

    fn index(&self, id: ProposalId) -> &Proposal {
        &self.proposals[id.0]
    }
}

/// Builds the proposal forest for one planning pass.
pub struct ProposalGenerator<'p> {
    catalog: &'p StageCatalog,
    policy: &'p dyn ConvertPolicy,
    max_chain_length: usize,
    probes: ProbeCache,
    proposals: ProposalSet,
}

impl<'p> ProposalGenerator<'p> {
    /// Create a generator over `catalog`, steered by `policy`.
    pub fn new(
        catalog: &'p StageCatalog,
        policy: &'p dyn ConvertPolicy,
        max_chain_length: usize,
    ) -> Self {
        Self {
            catalog,
            policy,
            max_chain_length,
            probes: ProbeCache::new(),
            proposals: ProposalSet::new(),
        }
    }

    /// Log every probe at trace level.
    pub fn with_probe_tracing(mut self, enabled: bool) -> Self {
        self.probes = self.probes.with_probe_tracing(enabled);
        self
    }

    /// Proposals generated so far.
    pub fn proposals(&self) -> &ProposalSet {
        &self.proposals
    }

    /// Consume the generator, keeping the proposals.
    pub fn into_proposals(self) -> ProposalSet {
        self.proposals
    }

    /// Generate the proposals for one route.
    ///
    /// A passthrough is the only proposal when the endpoints already agree.
    /// Otherwise every valid chain of the shortest length that yields
    /// anything is probed and kept.
    pub fn generate_route_proposals(
        &mut self,
        route: &Route,
        parent: ProposalParent,
    ) -> Vec<ProposalId> {
        let (catalog, policy) = (self.catalog, self.policy);
        if !policy.validate_route(route) {
            tracing::trace!(destination = %route.destination, "route refused by policy");
            return Vec::new();
        }

        if route.destination_caps.can_intersect(&route.source_caps) {
            let id = self
                .proposals
                .push(Proposal::new(parent, route.destination, Vec::new()));
            return vec![id];
        }

        for length in 1..=self.max_chain_length {
            let chains = ChainGenerator::new(
                catalog.entries(),
                length,
                |chain: &[&'p CatalogEntry]| policy.validate_chain(route, chain),
            );
            let mut found = Vec::new();
            for chain in chains {
                if let Some(steps) = self.probes.probe(policy, route, &chain) {
                    found.push(
                        self.proposals
                            .push(Proposal::new(parent, route.destination, steps)),
                    );
                }
            }
            if !found.is_empty() {
                tracing::trace!(
                    destination = %route.destination,
                    length,
                    count = found.len(),
                    "route solved"
                );
                return found;
            }
        }
        Vec::new()
    }

    /// Branch off every step of `parent` towards `destination`.
    pub fn generate_branch_proposals(
        &mut self,
        parent: ProposalId,
        destination: OutputPortId,
        destination_caps: &Caps,
    ) -> Vec<ProposalId> {
        if self.proposals.serves_in_lineage(parent, destination) {
            return Vec::new();
        }

        let outputs: Vec<MediaFormat> = self.proposals[parent]
            .steps
            .iter()
            .map(|s| s.output.clone())
            .collect();
        let mut found = Vec::new();
        for (step, output) in outputs.into_iter().enumerate() {
            let route = Route {
                source: None,
                source_caps: Caps::fixed(output),
                destination,
                destination_caps: destination_caps.clone(),
            };
            found.extend(self.generate_route_proposals(
                &route,
                ProposalParent::Step {
                    proposal: parent,
                    step,
                },
            ));
        }
        found
    }

    /// Generate direct proposals for every (output, input) pair, then branch
    /// proposals round by round until a round yields nothing.
    pub fn generate_proposals(
        &mut self,
        inputs: &[(InputPortId, MediaFormat)],
        outputs: &[(OutputPortId, Caps)],
    ) -> &ProposalSet {
        let mut round = Vec::new();
        for (destination, caps) in outputs {
            for (port, format) in inputs {
                let route = Route {
                    source: Some(*port),
                    source_caps: Caps::fixed(format.clone()),
                    destination: *destination,
                    destination_caps: caps.clone(),
                };
                round.extend(self.generate_route_proposals(&route, ProposalParent::Port(*port)));
            }
        }
        tracing::debug!(direct = round.len(), "generated direct proposals");

        let mut rounds = 0;
        while !round.is_empty() {
            let mut next = Vec::new();
            for (destination, caps) in outputs {
                for &parent in &round {
                    next.extend(self.generate_branch_proposals(parent, *destination, caps));
                }
            }
            rounds += 1;
            tracing::debug!(round = rounds, branches = next.len(), "generated branch proposals");
            round = next;
        }

        tracing::debug!(
            total = self.proposals.len(),
            probe_instances = self.probes.instances(),
            "proposal generation finished"
        );
        &self.proposals
    }
}

impl fmt::Debug for ProposalGenerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposalGenerator")
            .field("catalog", &self.catalog.len())
            .field("max_chain_length", &self.max_chain_length)
            .field("proposals", &self.proposals.len())
            .finish()
    }
}
