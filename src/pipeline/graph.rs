//! Live processing graph using daggy.
//!
//! Nodes are stages, tees, discard sinks, probe stubs and the element's own
//! ports. Buffers, events and caps queries are dispatched synchronously by
//! walking the graph downstream from the node they enter at.

use super::port::{InputPortId, OutputPortId, PortPeer};
use crate::buffer::Buffer;
use crate::element::{PadDirection, Stage, StageFactory};
use crate::elements::{DiscardSink, Tee};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::format::{Caps, MediaFormat};
use crate::negotiation::NegotiationError;
use daggy::NodeIndex;
use daggy::petgraph::Direction;
use daggy::petgraph::visit::EdgeRef;
use daggy::stable_dag::StableDag;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) NodeIndex);

impl NodeId {
    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0.index()
    }
}

/// Flags controlling how a link is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LinkFlags(u32);

impl LinkFlags {
    /// No special behaviour.
    pub const NONE: Self = Self(0);
    /// Do not flag the upstream node for renegotiation.
    pub const NO_RECONFIGURE: Self = Self(1 << 0);
    /// Refuse the link when the two sides cannot agree on any format.
    pub const CHECK_CAPS: Self = Self(1 << 1);

    /// Check if contains a flag.
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of flags.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for LinkFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A link between two nodes.
#[derive(Debug, Clone)]
pub struct Link {
    /// Name of the source pad.
    pub src_pad: String,
    /// Name of the sink pad.
    pub sink_pad: String,
}

impl Link {
    /// Create a link with specific pad names.
    pub fn with_pads(src_pad: impl Into<String>, sink_pad: impl Into<String>) -> Self {
        Self {
            src_pad: src_pad.into(),
            sink_pad: sink_pad.into(),
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// A stage instance together with its negotiation state.
pub struct StageNode {
    stage: Box<dyn Stage>,
    factory: Arc<StageFactory>,
    sink_caps: Caps,
    src_caps: Caps,
    formats: Option<(MediaFormat, MediaFormat)>,
    planned_output: Option<MediaFormat>,
}

impl StageNode {
    fn new(factory: Arc<StageFactory>) -> Self {
        let (sink_caps, src_caps) = factory
            .single_templates()
            .map(|(sink, src)| (sink.caps.clone(), src.caps.clone()))
            .unwrap_or_else(|| (Caps::any(), Caps::any()));
        Self {
            stage: factory.create(),
            factory,
            sink_caps,
            src_caps,
            formats: None,
            planned_output: None,
        }
    }

    /// The factory this stage was created from.
    pub fn factory(&self) -> &Arc<StageFactory> {
        &self.factory
    }

    /// Negotiated input and output formats.
    pub fn formats(&self) -> Option<&(MediaFormat, MediaFormat)> {
        self.formats.as_ref()
    }

    /// Output format preferred during negotiation.
    pub fn planned_output(&self) -> Option<&MediaFormat> {
        self.planned_output.as_ref()
    }

    fn negotiate(
        &mut self,
        name: &str,
        input: &MediaFormat,
        downstream: &Caps,
        downstream_name: &str,
    ) -> Result<MediaFormat> {
        if !self.sink_caps.accepts(input) {
            return Err(NegotiationError::not_accepted(name, input).into());
        }

        let reachable = self
            .stage
            .transform_caps(PadDirection::Input, &Caps::fixed(input.clone()))
            .intersect(&self.src_caps);
        let candidates = reachable.intersect(downstream);
        if candidates.is_empty() {
            return Err(NegotiationError::no_common_format(
                name,
                downstream_name,
                &format!("{reachable:?}"),
                &format!("{downstream:?}"),
            )
            .into());
        }

        let output = self
            .planned_output
            .clone()
            .filter(|planned| candidates.accepts(planned))
            .or_else(|| self.stage.fixate(input, &candidates))
            .ok_or_else(|| NegotiationError::CannotFixate {
                node: name.to_string(),
            })?;

        self.stage.set_formats(input, &output)?;
        self.formats = Some((input.clone(), output.clone()));
        Ok(output)
    }

    fn reset(&mut self) {
        self.stage.reset();
        self.formats = None;
    }
}

/// What a node is.
pub enum NodeKind {
    /// A single-input, single-output stage.
    Stage(StageNode),
    /// Fan-out to any number of consumers.
    Tee(Tee),
    /// Swallows everything.
    Discard(DiscardSink),
    /// Probe consumer that only accepts the given caps.
    Stub(Caps),
    /// An input port of the element; data enters the graph here.
    Ingress(InputPortId),
    /// An output port of the element; data leaves the graph here.
    Egress {
        /// The port.
        port: OutputPortId,
        /// Downstream consumer, if one is connected.
        peer: Option<Arc<dyn PortPeer>>,
    },
}

impl NodeKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Stage(_) => "stage",
            Self::Tee(_) => "tee",
            Self::Discard(_) => "discard",
            Self::Stub(_) => "stub",
            Self::Ingress(_) => "ingress",
            Self::Egress { .. } => "egress",
        }
    }
}

/// A node in the graph.
pub struct Node {
    name: String,
    kind: NodeKind,
    needs_reconfigure: bool,
}

impl Node {
    /// Get the node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get what the node is.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The stage, if this is a stage node.
    pub fn as_stage(&self) -> Option<&StageNode> {
        match &self.kind {
            NodeKind::Stage(stage) => Some(stage),
            _ => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind.label())
            .finish()
    }
}

// ============================================================================
// Graph
// ============================================================================

/// A processing graph represented as a directed acyclic graph.
pub struct Graph {
    dag: StableDag<Node, Link>,
    nodes_by_name: HashMap<String, NodeId>,
    ingress: HashMap<InputPortId, NodeId>,
    egress: HashMap<OutputPortId, NodeId>,
    name_counters: HashMap<String, u32>,
    draining: bool,
    drained: Vec<OutputPortId>,
    retired: bool,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            dag: StableDag::new(),
            nodes_by_name: HashMap::new(),
            ingress: HashMap::new(),
            egress: HashMap::new(),
            name_counters: HashMap::new(),
            draining: false,
            drained: Vec::new(),
            retired: false,
        }
    }

    /// Generate a node name `<prefix><n>` not handed out since the last clear.
    pub fn unique_name(&mut self, prefix: &str) -> String {
        let counter = self.name_counters.entry(prefix.to_string()).or_default();
        let name = format!("{prefix}{counter}");
        *counter += 1;
        name
    }

    fn insert(&mut self, name: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.dag.add_node(Node {
            name: name.clone(),
            kind,
            needs_reconfigure: false,
        }));
        self.nodes_by_name.insert(name, id);
        id
    }

    /// Instantiate a stage from `factory`.
    pub fn add_stage(&mut self, name: impl Into<String>, factory: Arc<StageFactory>) -> NodeId {
        self.insert(name.into(), NodeKind::Stage(StageNode::new(factory)))
    }

    /// Add a tee.
    pub fn add_tee(&mut self, name: impl Into<String>) -> NodeId {
        self.insert(name.into(), NodeKind::Tee(Tee::new()))
    }

    /// Add a discard sink.
    pub fn add_discard(&mut self, name: impl Into<String>) -> NodeId {
        self.insert(name.into(), NodeKind::Discard(DiscardSink::new()))
    }

    /// Add a stub consumer accepting `caps`.
    pub fn add_stub(&mut self, name: impl Into<String>, caps: Caps) -> NodeId {
        self.insert(name.into(), NodeKind::Stub(caps))
    }

    /// Add the node for an input port.
    pub fn add_ingress(&mut self, port: InputPortId) -> NodeId {
        let id = self.insert(port.to_string(), NodeKind::Ingress(port));
        self.ingress.insert(port, id);
        id
    }

    /// Add the node for an output port.
    pub fn add_egress(&mut self, port: OutputPortId, peer: Option<Arc<dyn PortPeer>>) -> NodeId {
        let id = self.insert(port.to_string(), NodeKind::Egress { port, peer });
        self.egress.insert(port, id);
        id
    }

    /// Replace the peer of an output port.
    pub fn set_egress_peer(
        &mut self,
        port: OutputPortId,
        peer: Option<Arc<dyn PortPeer>>,
    ) -> Result<()> {
        let id = self
            .egress(port)
            .ok_or_else(|| Error::UnknownPort(port.to_string()))?;
        if let NodeKind::Egress { peer: slot, .. } = &mut self.node_mut(id)?.kind {
            *slot = peer;
        }
        Ok(())
    }

    /// Output format a stage should prefer when it negotiates.
    pub fn set_planned_output(&mut self, id: NodeId, format: MediaFormat) -> Result<()> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Stage(stage) => {
                stage.planned_output = Some(format);
                Ok(())
            }
            other => Err(Error::LinkRefused(format!(
                "{} node has no output format to plan",
                other.label()
            ))),
        }
    }

    /// Forget a stage's negotiated and planned formats so it can be reused.
    pub fn reset_stage(&mut self, id: NodeId) {
        if let Some(Node {
            kind: NodeKind::Stage(stage),
            ..
        }) = self.dag.node_weight_mut(id.0)
        {
            stage.reset();
            stage.planned_output = None;
        }
    }

    /// Remove a node and all its links.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let node = self
            .dag
            .remove_node(id.0)
            .ok_or(Error::UnknownNode(id.index()))?;
        self.nodes_by_name.remove(&node.name);
        match node.kind {
            NodeKind::Ingress(port) => {
                self.ingress.remove(&port);
            }
            NodeKind::Egress { port, .. } => {
                self.egress.remove(&port);
            }
            NodeKind::Stage(mut stage) => stage.reset(),
            _ => {}
        }
        Ok(())
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.dag.node_weight(id.0)
    }

    fn node_ref(&self, id: NodeId) -> Result<&Node> {
        self.node(id).ok_or(Error::UnknownNode(id.index()))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.dag
            .node_weight_mut(id.0)
            .ok_or(Error::UnknownNode(id.index()))
    }

    /// Get a node ID by name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes_by_name.get(name).copied()
    }

    /// The node of an input port.
    pub fn ingress(&self, port: InputPortId) -> Option<NodeId> {
        self.ingress.get(&port).copied()
    }

    /// The node of an output port.
    pub fn egress(&self, port: OutputPortId) -> Option<NodeId> {
        self.egress.get(&port).copied()
    }

    /// Negotiated formats of a stage node.
    pub fn stage_formats(&self, id: NodeId) -> Option<&(MediaFormat, MediaFormat)> {
        self.node(id)?.as_stage()?.formats()
    }

    /// Whether a link without [`LinkFlags::NO_RECONFIGURE`] flagged this node.
    pub fn needs_reconfigure(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.needs_reconfigure)
    }

    /// Downstream nodes, in link order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        if self.node(id).is_none() {
            return Vec::new();
        }
        let mut edges: Vec<_> = self
            .dag
            .graph()
            .edges_directed(id.0, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(edge, _)| edge.index());
        edges.into_iter().map(|(_, node)| NodeId(node)).collect()
    }

    /// The upstream node, if linked.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?;
        self.dag
            .graph()
            .edges_directed(id.0, Direction::Incoming)
            .map(|e| NodeId(e.source()))
            .next()
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.dag.graph().node_count()
    }

    /// Get the number of links.
    pub fn edge_count(&self) -> usize {
        self.dag.graph().edge_count()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.dag.graph().node_count() == 0
    }

    // ========================================================================
    // Linking
    // ========================================================================

    /// Link `src`'s free (or newly requested) src pad to `dst`'s sink pad.
    pub fn link(&mut self, src: NodeId, dst: NodeId, flags: LinkFlags) -> Result<()> {
        let dst_node = self.node_ref(dst)?;
        let dst_name = dst_node.name.clone();
        if matches!(dst_node.kind, NodeKind::Ingress(_)) || self.parent(dst).is_some() {
            return Err(Error::LinkRefused(format!("{dst_name} has no free sink pad")));
        }

        let src_node = self.node_ref(src)?;
        let src_name = src_node.name.clone();
        let src_free = match src_node.kind {
            NodeKind::Stage(_) | NodeKind::Ingress(_) => self.children(src).is_empty(),
            NodeKind::Tee(_) => true,
            _ => false,
        };
        if !src_free {
            return Err(Error::LinkRefused(format!("{src_name} has no free src pad")));
        }

        if flags.contains(LinkFlags::CHECK_CAPS) {
            let offered = self.src_caps(src);
            let accepted = self.query_caps(dst, None);
            if !offered.can_intersect(&accepted) {
                return Err(NegotiationError::no_common_format(
                    src_name,
                    dst_name,
                    &format!("{offered:?}"),
                    &format!("{accepted:?}"),
                )
                .into());
            }
        }

        let src_pad = match &mut self.node_mut(src)?.kind {
            NodeKind::Tee(tee) => tee.request_pad(),
            _ => "src".to_string(),
        };

        self.dag
            .add_edge(src.0, dst.0, Link::with_pads(src_pad, "sink"))
            .map_err(|_| Error::WouldCycle {
                upstream: src_name.clone(),
                downstream: dst_name.clone(),
            })?;

        if !flags.contains(LinkFlags::NO_RECONFIGURE) {
            self.node_mut(src)?.needs_reconfigure = true;
        }

        tracing::trace!(upstream = %src_name, downstream = %dst_name, "linked");
        Ok(())
    }

    /// Remove the link from `src` to `dst`. Returns whether one existed.
    pub fn unlink(&mut self, src: NodeId, dst: NodeId) -> bool {
        match self.dag.graph().find_edge(src.0, dst.0) {
            Some(edge) => self.dag.remove_edge(edge).is_some(),
            None => false,
        }
    }

    fn src_caps(&self, id: NodeId) -> Caps {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Stage(stage)) => stage.src_caps.clone(),
            Some(NodeKind::Tee(_) | NodeKind::Ingress(_)) => Caps::any(),
            _ => Caps::empty(),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Formats `id` accepts on its sink pad, given everything downstream.
    pub fn query_caps(&self, id: NodeId, filter: Option<&Caps>) -> Caps {
        let Some(node) = self.node(id) else {
            return Caps::empty();
        };

        let caps = match &node.kind {
            NodeKind::Stage(stage) => {
                let downstream = match self.children(id).first() {
                    Some(&child) => self.query_caps(child, Some(&stage.src_caps)),
                    None => stage.src_caps.clone(),
                };
                stage
                    .stage
                    .transform_caps(PadDirection::Output, &downstream)
                    .intersect(&stage.sink_caps)
            }
            NodeKind::Tee(_) => self
                .children(id)
                .into_iter()
                .fold(Caps::any(), |acc, child| {
                    acc.intersect(&self.query_caps(child, None))
                }),
            NodeKind::Discard(_) => Caps::any(),
            NodeKind::Stub(caps) => caps.clone(),
            NodeKind::Ingress(_) => Caps::empty(),
            NodeKind::Egress { peer, .. } => match peer {
                Some(peer) => peer.query_caps(None),
                None => Caps::any(),
            },
        };

        caps.filtered(filter)
    }

    /// Send an event into `id`'s sink pad.
    ///
    /// A caps event makes stages negotiate their output format. Fan-out
    /// continues past failing branches; the first error is returned.
    pub fn send_event(&mut self, id: NodeId, event: Event) -> Result<()> {
        let children = self.children(id);

        let negotiating = matches!(
            (&event, &self.node_ref(id)?.kind),
            (Event::Caps(_), NodeKind::Stage(_))
        );
        let downstream = if negotiating {
            Some(match children.first() {
                Some(&child) => (
                    self.query_caps(child, None),
                    self.node_ref(child)?.name.clone(),
                ),
                None => (Caps::any(), "unlinked".to_string()),
            })
        } else {
            None
        };

        let draining = self.draining;
        let node = self.node_mut(id)?;
        let forward = match &mut node.kind {
            NodeKind::Stage(stage) => match (event, downstream) {
                (Event::Caps(format), Some((caps, downstream_name))) => Event::Caps(
                    stage.negotiate(&node.name, &format, &caps, &downstream_name)?,
                ),
                (event, _) => event,
            },
            NodeKind::Tee(_) | NodeKind::Ingress(_) => event,
            NodeKind::Discard(_) => return Ok(()),
            NodeKind::Stub(caps) => {
                return match &event {
                    Event::Caps(format) if !caps.accepts(format) => {
                        Err(NegotiationError::not_accepted(node.name.as_str(), format).into())
                    }
                    _ => Ok(()),
                };
            }
            NodeKind::Egress { port, peer } => {
                let (port, peer) = (*port, peer.clone());
                if draining && event.is_eos() {
                    tracing::debug!(%port, "drained");
                    self.drained.push(port);
                    return Ok(());
                }
                return match peer {
                    Some(peer) => peer.push_event(event),
                    None => Ok(()),
                };
            }
        };

        let mut result = Ok(());
        for child in children {
            let sent = self.send_event(child, forward.clone());
            if result.is_ok() {
                result = sent;
            }
        }
        result
    }

    /// Push a buffer into `id`'s sink pad.
    pub fn push_buffer(&mut self, id: NodeId, buffer: Buffer) -> Result<()> {
        let children = self.children(id);
        let node = self.node_mut(id)?;

        match &mut node.kind {
            NodeKind::Stage(stage) => {
                if stage.formats.is_none() {
                    return Err(Error::stage(node.name.as_str(), "not negotiated"));
                }
                match (stage.stage.process(buffer)?, children.first()) {
                    (Some(out), Some(&child)) => self.push_buffer(child, out),
                    _ => Ok(()),
                }
            }
            NodeKind::Tee(tee) => {
                tee.record(&buffer);
                let mut result = Ok(());
                for child in children {
                    let pushed = self.push_buffer(child, buffer.clone());
                    if result.is_ok() {
                        result = pushed;
                    }
                }
                result
            }
            NodeKind::Discard(sink) => {
                sink.consume(buffer);
                Ok(())
            }
            NodeKind::Stub(_) => Ok(()),
            NodeKind::Ingress(_) => match children.first() {
                Some(&child) => self.push_buffer(child, buffer),
                None => Ok(()),
            },
            NodeKind::Egress { peer, .. } => match peer.clone() {
                Some(peer) => peer.push_buffer(buffer),
                None => Ok(()),
            },
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// While draining, end-of-stream reaching an output port is recorded
    /// instead of forwarded.
    pub fn set_draining(&mut self, draining: bool) {
        self.draining = draining;
        if !draining {
            self.drained.clear();
        }
    }

    /// Output ports that received end-of-stream while draining.
    pub fn take_drained(&mut self) -> Vec<OutputPortId> {
        std::mem::take(&mut self.drained)
    }

    /// Mark the graph as drained and awaiting teardown. Data must not enter
    /// a retired graph; [`clear`](Self::clear) puts it back in service.
    pub fn retire(&mut self) {
        self.retired = true;
    }

    /// Check if the graph was retired since the last clear.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Remove every link and every node except the port nodes.
    pub fn clear(&mut self) {
        let doomed: Vec<NodeId> = self
            .dag
            .graph()
            .node_indices()
            .map(NodeId)
            .filter(|&id| {
                self.node(id).is_some_and(|n| {
                    !matches!(n.kind, NodeKind::Ingress(_) | NodeKind::Egress { .. })
                })
            })
            .collect();
        for id in doomed {
            // Ids come straight from the dag.
            let _ = self.remove_node(id);
        }

        let edges: Vec<_> = self.dag.graph().edge_indices().collect();
        for edge in edges {
            self.dag.remove_edge(edge);
        }

        for id in self.ingress.values().chain(self.egress.values()) {
            if let Some(node) = self.dag.node_weight_mut(id.0) {
                node.needs_reconfigure = false;
            }
        }
        self.name_counters.clear();
        self.set_draining(false);
        self.retired = false;
    }

    /// Structural description of everything reachable from each input port,
    /// in port order. Tee branches are sorted.
    pub fn topology(&self) -> Vec<String> {
        let mut ports: Vec<_> = self.ingress.iter().map(|(p, id)| (*p, *id)).collect();
        ports.sort_by_key(|(port, _)| *port);
        ports.into_iter().map(|(_, id)| self.describe(id)).collect()
    }

    fn describe(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        let here = match &node.kind {
            NodeKind::Stage(stage) => match stage.formats() {
                Some((_, output)) => format!("{}({})", stage.factory.name(), output),
                None => stage.factory.name().to_string(),
            },
            NodeKind::Ingress(port) => port.to_string(),
            NodeKind::Egress { port, .. } => port.to_string(),
            other => other.label().to_string(),
        };

        let mut branches: Vec<String> = self
            .children(id)
            .into_iter()
            .map(|child| self.describe(child))
            .collect();
        branches.sort();
        match branches.as_slice() {
            [] => here,
            [only] => format!("{here} -> {only}"),
            _ => format!("{here} -> [{}]", branches.join(", ")),
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .field("draining", &self.draining)
            .field("retired", &self.retired)
            .finish()
    }
}
