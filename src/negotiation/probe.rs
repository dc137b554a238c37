//! Sandbox probing of candidate chains.
//!
//! A candidate is only trusted once real stage instances have negotiated it
//! end to end. [`ProbeCache`] keeps a scratch [`Graph`] and a pool of stage
//! instances per factory so that repeated probes during one planning pass
//! reuse them.

use super::catalog::CatalogEntry;
use super::policy::ConvertPolicy;
use super::proposal::{Route, TransformationStep};
use crate::element::StageFactory;
use crate::event::Event;
use crate::observability::record_probe;
use crate::pipeline::{Graph, LinkFlags, NodeId};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct ProbeSlot {
    node: NodeId,
    in_use: bool,
}

/// Scratch graph and probe instances for one planning pass.
#[derive(Debug, Default)]
pub struct ProbeCache {
    graph: Graph,
    slots: HashMap<String, Vec<ProbeSlot>>,
    trace_probes: bool,
}

impl ProbeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every probed candidate at trace level.
    pub fn with_probe_tracing(mut self, enabled: bool) -> Self {
        self.trace_probes = enabled;
        self
    }

    /// Number of stage instances created so far.
    pub fn instances(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    /// Number of instances currently taken by a probe.
    pub fn in_use(&self) -> usize {
        self.slots.values().flatten().filter(|s| s.in_use).count()
    }

    fn acquire(&mut self, factory: &Arc<StageFactory>) -> NodeId {
        let slots = self.slots.entry(factory.name().to_string()).or_default();
        if let Some(slot) = slots.iter_mut().find(|s| !s.in_use) {
            slot.in_use = true;
            return slot.node;
        }
        let name = format!("probe_{}_{}", factory.name(), slots.len());
        let node = self.graph.add_stage(name, factory.clone());
        slots.push(ProbeSlot { node, in_use: true });
        node
    }

    fn release(&mut self, node: NodeId) {
        self.graph.reset_stage(node);
        if let Some(slot) = self
            .slots
            .values_mut()
            .flatten()
            .find(|slot| slot.node == node)
        {
            slot.in_use = false;
        }
    }

    /// Instantiate `chain` between the route's endpoints and negotiate it.
    ///
    /// Returns the negotiated steps with their costs, or `None` if any link,
    /// caps query or negotiation fails.
    pub fn probe(
        &mut self,
        policy: &dyn ConvertPolicy,
        route: &Route,
        chain: &[&CatalogEntry],
    ) -> Option<Vec<TransformationStep>> {
        let steps = self.probe_chain(policy, route, chain);
        record_probe(steps.is_some());
        if self.trace_probes {
            let names: Vec<&str> = chain.iter().map(|e| e.name()).collect();
            tracing::trace!(
                destination = %route.destination,
                chain = ?names,
                accepted = steps.is_some(),
                "probed chain"
            );
        }
        steps
    }

    fn probe_chain(
        &mut self,
        policy: &dyn ConvertPolicy,
        route: &Route,
        chain: &[&CatalogEntry],
    ) -> Option<Vec<TransformationStep>> {
        let source = route.source_caps.fixate()?;

        let mut guard = ProbeChain {
            cache: self,
            nodes: SmallVec::new(),
            links: SmallVec::new(),
            stub: None,
        };
        for entry in chain {
            let node = guard.cache.acquire(&entry.factory);
            guard.nodes.push(node);
        }
        let (&first, &last) = (guard.nodes.first()?, guard.nodes.last()?);

        for i in 1..guard.nodes.len() {
            let (src, dst) = (guard.nodes[i - 1], guard.nodes[i]);
            guard.link(src, dst, LinkFlags::NO_RECONFIGURE)?;
        }
        let stub = guard
            .cache
            .graph
            .add_stub("probe_stub", route.destination_caps.clone());
        guard.stub = Some(stub);
        guard.link(
            last,
            stub,
            LinkFlags::NO_RECONFIGURE | LinkFlags::CHECK_CAPS,
        )?;

        let upstream = guard.cache.graph.query_caps(first, None);
        if !upstream.can_intersect(&route.source_caps) {
            tracing::trace!(chain_head = %chain[0].name(), "chain cannot accept the source");
            return None;
        }

        if let Err(e) = guard.cache.graph.send_event(first, Event::Caps(source)) {
            tracing::trace!(error = %e, "probe negotiation failed");
            return None;
        }

        chain
            .iter()
            .zip(&guard.nodes)
            .map(|(entry, &node)| {
                let (input, output) = guard.cache.graph.stage_formats(node)?.clone();
                let cost = policy.cost_step(&entry.factory, &input, &output);
                Some(TransformationStep {
                    factory: entry.factory.clone(),
                    input,
                    output,
                    cost,
                })
            })
            .collect()
    }
}

/// Links and instances of one probe, released on drop.
struct ProbeChain<'c> {
    cache: &'c mut ProbeCache,
    nodes: SmallVec<[NodeId; 4]>,
    links: SmallVec<[(NodeId, NodeId); 5]>,
    stub: Option<NodeId>,
}

impl ProbeChain<'_> {
    fn link(&mut self, src: NodeId, dst: NodeId, flags: LinkFlags) -> Option<()> {
        match self.cache.graph.link(src, dst, flags) {
            Ok(()) => {
                self.links.push((src, dst));
                Some(())
            }
            Err(e) => {
                tracing::trace!(error = %e, "probe link failed");
                None
            }
        }
    }
}

impl Drop for ProbeChain<'_> {
    fn drop(&mut self) {
        for (src, dst) in self.links.drain(..) {
            self.cache.graph.unlink(src, dst);
        }
        if let Some(stub) = self.stub.take() {
            // The stub was added by this probe and nothing else removes it.
            let _ = self.cache.graph.remove_node(stub);
        }
        for node in self.nodes.drain(..) {
            self.cache.release(node);
        }
    }
}
