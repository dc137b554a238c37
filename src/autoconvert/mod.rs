//! The autoconvert element.
//!
//! [`AutoConvert`] owns any number of input and output ports and keeps a
//! conversion graph between them. The first graph is planned once every
//! input has announced its format. Afterwards, an output flagged for
//! reconfiguration (or a format change on an input) makes the next buffer
//! drain the old graph with end-of-stream, tear it down and plan a new one.
//!
//! # Locking
//!
//! `control` (ports, policy, build state) is always taken before `graph`.
//! Buffers and events are delivered with only `graph` held, so a peer may
//! call back into the element from inside a push. Port peers and the
//! reconfigure set live behind their own leaf locks: caps queries and
//! reconfigure requests never wait on a push or a rebuild, and no leaf lock
//! is held while a peer is called.
//!
//! # Example
//!
//! ```rust
//! use autoconvert::autoconvert::AutoConvert;
//! use autoconvert::config::AutoConvertConfig;
//! use autoconvert::event::Event;
//! use autoconvert::format::{Framerate, MediaFormat, PixelFormat, VideoFormat};
//! use autoconvert::negotiation::VideoConvertPolicy;
//!
//! let element = AutoConvert::new(
//!     AutoConvertConfig::new("ac0"),
//!     Box::new(VideoConvertPolicy::new()),
//! )
//! .unwrap();
//!
//! let input = element.request_input(None);
//! let _output = element.request_output(None).unwrap();
//!
//! let format = VideoFormat::new(640, 360, PixelFormat::I420, Framerate::FPS_30);
//! element.send_event(input, Event::Caps(MediaFormat::VideoRaw(format))).unwrap();
//! assert_eq!(element.topology(), vec!["sink_0 -> tee -> src_0"]);
//! ```

mod builder;
mod state;

pub use builder::{BuildReport, build_graph};
pub use state::BuildState;

use crate::buffer::Buffer;
use crate::config::AutoConvertConfig;
use crate::error::{Error, Result};
use crate::event::{Event, StickyEvents};
use crate::format::{Caps, MediaFormat};
use crate::negotiation::{
    ConvertPolicy, MAX_OUTPUT_PORTS, NegotiationError, ProposalGenerator, StageCatalog, select,
};
use crate::observability::{PlannerMetrics, init_metrics, instrument_build, trace_state_change};
use crate::pipeline::{Graph, InputPortId, OutputPortId, PortPeer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

type PeerHandle = Option<Arc<dyn PortPeer>>;

/// Peers of every port. Written under `control`, read without it.
#[derive(Default)]
struct Peers {
    inputs: BTreeMap<InputPortId, PeerHandle>,
    outputs: BTreeMap<OutputPortId, PeerHandle>,
}

struct Control {
    policy: Box<dyn ConvertPolicy>,
    catalog: StageCatalog,
    inputs: BTreeMap<InputPortId, StickyEvents>,
    outputs: BTreeSet<OutputPortId>,
    next_input: u32,
    next_output: u32,
    state: BuildState,
    built: bool,
    force_rebuild: bool,
    last_report: Option<BuildReport>,
}

/// An element that plans and maintains a conversion graph between its ports.
pub struct AutoConvert {
    config: AutoConvertConfig,
    metrics: PlannerMetrics,
    control: Mutex<Control>,
    idle: Condvar,
    graph: Mutex<Graph>,
    peers: Mutex<Peers>,
    reconfigure: Mutex<BTreeSet<OutputPortId>>,
    sink_caps: Caps,
    src_caps: Caps,
}

impl AutoConvert {
    /// Create an element planning with `policy`.
    ///
    /// Fails with [`Error::MissingCatalog`] if the policy supplies no stage
    /// catalog.
    pub fn new(config: AutoConvertConfig, policy: Box<dyn ConvertPolicy>) -> Result<Self> {
        init_metrics();
        let catalog = StageCatalog::from_policy(policy.as_ref())?;
        tracing::info!(
            element = %config.name,
            stages = catalog.len(),
            "autoconvert created"
        );
        Ok(Self {
            metrics: PlannerMetrics::new(&config.name),
            config,
            sink_caps: catalog.sink_caps().clone(),
            src_caps: catalog.src_caps().clone(),
            control: Mutex::new(Control {
                policy,
                catalog,
                inputs: BTreeMap::new(),
                outputs: BTreeSet::new(),
                next_input: 0,
                next_output: 0,
                state: BuildState::Idle,
                built: false,
                force_rebuild: false,
                last_report: None,
            }),
            idle: Condvar::new(),
            graph: Mutex::new(Graph::new()),
            peers: Mutex::new(Peers::default()),
            reconfigure: Mutex::new(BTreeSet::new()),
        })
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Element configuration.
    pub fn config(&self) -> &AutoConvertConfig {
        &self.config
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn peers(&self) -> MutexGuard<'_, Peers> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reconfigure_set(&self) -> MutexGuard<'_, BTreeSet<OutputPortId>> {
        self.reconfigure.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_idle(&self) -> MutexGuard<'_, Control> {
        let mut control = self.control();
        while control.state != BuildState::Idle {
            control = self
                .idle
                .wait(control)
                .unwrap_or_else(PoisonError::into_inner);
        }
        control
    }

    // ========================================================================
    // Ports
    // ========================================================================

    /// Add an input port. `peer` is the upstream producer, used for caps
    /// queries.
    pub fn request_input(&self, peer: Option<Arc<dyn PortPeer>>) -> InputPortId {
        let mut control = self.wait_idle();
        let id = InputPortId(control.next_input);
        control.next_input += 1;
        control.inputs.insert(id, StickyEvents::new());
        self.peers().inputs.insert(id, peer);
        self.graph().add_ingress(id);
        tracing::debug!(element = %self.config.name, port = %id, "input port added");
        id
    }

    /// Remove an input port. A built graph is rebuilt on the next buffer.
    pub fn release_input(&self, port: InputPortId) -> Result<()> {
        let mut control = self.wait_idle();
        control
            .inputs
            .remove(&port)
            .ok_or_else(|| Error::UnknownPort(port.to_string()))?;
        self.peers().inputs.remove(&port);
        let mut graph = self.graph();
        if let Some(ingress) = graph.ingress(port) {
            graph.remove_node(ingress)?;
        }
        if control.built {
            control.force_rebuild = true;
        }
        tracing::debug!(element = %self.config.name, %port, "input port released");
        Ok(())
    }

    /// Add an output port feeding `peer`.
    pub fn request_output(&self, peer: Option<Arc<dyn PortPeer>>) -> Result<OutputPortId> {
        let mut control = self.wait_idle();
        if control.outputs.len() >= MAX_OUTPUT_PORTS {
            return Err(Error::TooManyOutputs {
                max: MAX_OUTPUT_PORTS,
            });
        }
        let id = OutputPortId(control.next_output);
        control.next_output += 1;
        control.outputs.insert(id);
        self.peers().outputs.insert(id, peer.clone());
        self.graph().add_egress(id, peer);
        if control.built {
            self.reconfigure_set().insert(id);
        }
        tracing::debug!(element = %self.config.name, port = %id, "output port added");
        Ok(id)
    }

    /// Remove an output port. A built graph is rebuilt on the next buffer.
    pub fn release_output(&self, port: OutputPortId) -> Result<()> {
        let mut control = self.wait_idle();
        if !control.outputs.remove(&port) {
            return Err(Error::UnknownPort(port.to_string()));
        }
        self.peers().outputs.remove(&port);
        let mut graph = self.graph();
        if let Some(egress) = graph.egress(port) {
            graph.remove_node(egress)?;
        }
        self.reconfigure_set().remove(&port);
        if control.built {
            control.force_rebuild = true;
        }
        tracing::debug!(element = %self.config.name, %port, "output port released");
        Ok(())
    }

    /// Connect an output port to a new consumer and flag it for
    /// reconfiguration.
    pub fn set_output_peer(&self, port: OutputPortId, peer: Option<Arc<dyn PortPeer>>) -> Result<()> {
        let control = self.wait_idle();
        if !control.outputs.contains(&port) {
            return Err(Error::UnknownPort(port.to_string()));
        }
        self.peers().outputs.insert(port, peer.clone());
        self.graph().set_egress_peer(port, peer)?;
        if control.built {
            self.reconfigure_set().insert(port);
        }
        Ok(())
    }

    /// Flag an output port whose consumer wants different caps. The graph is
    /// rebuilt when the next buffer arrives.
    pub fn reconfigure_output(&self, port: OutputPortId) {
        tracing::debug!(element = %self.config.name, %port, "reconfigure requested");
        self.reconfigure_set().insert(port);
    }

    /// Input ports in id order.
    pub fn input_ports(&self) -> Vec<InputPortId> {
        self.control().inputs.keys().copied().collect()
    }

    /// Output ports in id order.
    pub fn output_ports(&self) -> Vec<OutputPortId> {
        self.control().outputs.iter().copied().collect()
    }

    // ========================================================================
    // Data flow
    // ========================================================================

    /// Deliver an event arriving on an input port.
    ///
    /// Sticky events are remembered for replay. The caps event that gives
    /// every input a format builds the first graph; a later caps event
    /// schedules a rebuild. Other events are forwarded into a built graph.
    pub fn send_event(&self, port: InputPortId, event: Event) -> Result<()> {
        let mut control = self.wait_idle();
        control
            .inputs
            .get_mut(&port)
            .ok_or_else(|| Error::UnknownPort(port.to_string()))?
            .store(&event);

        if let Event::Caps(format) = &event {
            tracing::debug!(element = %self.config.name, %port, %format, "input caps");
            if control.built {
                control.force_rebuild = true;
                return Ok(());
            }
            if control.inputs.values().all(|sticky| sticky.caps().is_some()) {
                self.rebuild(control, "initial")?;
            }
            return Ok(());
        }

        if !control.built {
            return Ok(());
        }
        drop(control);
        let Some(mut graph) = self.live_graph() else {
            return Ok(());
        };
        let ingress = graph
            .ingress(port)
            .ok_or_else(|| Error::UnknownPort(port.to_string()))?;
        graph.send_event(ingress, event)
    }

    /// Push a buffer into an input port.
    ///
    /// Runs a pending rebuild first. Fails with
    /// [`NegotiationError::NotNegotiated`] before the first graph exists.
    pub fn push(&self, port: InputPortId, buffer: Buffer) -> Result<()> {
        let mut control = self.wait_idle();
        if !control.inputs.contains_key(&port) {
            return Err(Error::UnknownPort(port.to_string()));
        }
        if control.built {
            let reason = if control.force_rebuild {
                Some("input-changed")
            } else if !self.reconfigure_set().is_empty() {
                Some("reconfigure")
            } else {
                None
            };
            if let Some(reason) = reason {
                control = self.rebuild(control, reason)?;
            }
        }
        if !control.built {
            return Err(NegotiationError::NotNegotiated {
                port: port.to_string(),
            }
            .into());
        }

        drop(control);
        let mut graph = self.live_graph().ok_or_else(|| NegotiationError::NotNegotiated {
            port: port.to_string(),
        })?;
        let ingress = graph
            .ingress(port)
            .ok_or_else(|| Error::UnknownPort(port.to_string()))?;
        graph.push_buffer(ingress, buffer)
    }

    /// Take the graph for data flow without holding `control`.
    ///
    /// A rebuild may start between releasing `control` and taking `graph`.
    /// Its drained graph is retired, so wait for `Idle` and take the new one.
    /// `None` if that rebuild failed.
    fn live_graph(&self) -> Option<MutexGuard<'_, Graph>> {
        loop {
            let graph = self.graph();
            if !graph.is_retired() {
                return Some(graph);
            }
            drop(graph);
            if !self.wait_idle().built {
                return None;
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Caps an input port can accept: whatever any output consumer takes
    /// unchanged, plus whatever some stage accepts.
    pub fn query_input_caps(&self, port: InputPortId, filter: Option<&Caps>) -> Result<Caps> {
        let opposite: Vec<PeerHandle> = {
            let peers = self.peers();
            if !peers.inputs.contains_key(&port) {
                return Err(Error::UnknownPort(port.to_string()));
            }
            peers.outputs.values().cloned().collect()
        };
        let caps = opposite
            .iter()
            .map(|peer| peer_caps(peer.as_deref(), filter))
            .fold(self.sink_caps.clone(), Caps::merged);
        Ok(caps.filtered(filter))
    }

    /// Caps an output port can produce: whatever any input producer offers,
    /// plus whatever some stage produces.
    pub fn query_output_caps(&self, port: OutputPortId, filter: Option<&Caps>) -> Result<Caps> {
        let opposite: Vec<PeerHandle> = {
            let peers = self.peers();
            if !peers.outputs.contains_key(&port) {
                return Err(Error::UnknownPort(port.to_string()));
            }
            peers.inputs.values().cloned().collect()
        };
        let caps = opposite
            .iter()
            .map(|peer| peer_caps(peer.as_deref(), filter))
            .fold(self.src_caps.clone(), Caps::merged);
        Ok(caps.filtered(filter))
    }

    /// Current format of an input port.
    pub fn input_format(&self, port: InputPortId) -> Option<MediaFormat> {
        self.control()
            .inputs
            .get(&port)
            .and_then(|sticky| sticky.caps().cloned())
    }

    /// Check if an input port has a current format.
    pub fn has_format(&self, port: InputPortId) -> bool {
        self.input_format(port).is_some()
    }

    /// Current build state.
    pub fn state(&self) -> BuildState {
        self.control().state
    }

    /// Check if a graph has been built.
    pub fn is_built(&self) -> bool {
        self.control().built
    }

    /// Report of the last successful build.
    pub fn last_report(&self) -> Option<BuildReport> {
        self.control().last_report.clone()
    }

    /// One line per input port describing the live graph behind it.
    pub fn topology(&self) -> Vec<String> {
        let _control = self.control();
        self.graph().topology()
    }

    // ========================================================================
    // Rebuild
    // ========================================================================

    fn set_state(&self, control: &mut Control, next: BuildState) {
        let from = control.state;
        if control.state.transition(next) {
            trace_state_change(&self.config.name, &from.to_string(), &next.to_string());
        }
    }

    /// Drain the live graph, then plan and build a new one.
    ///
    /// Releases the control lock while end-of-stream travels through the old
    /// graph; other callers wait for `Idle` meanwhile.
    fn rebuild<'a>(
        &'a self,
        mut control: MutexGuard<'a, Control>,
        reason: &'static str,
    ) -> Result<MutexGuard<'a, Control>> {
        let _span = instrument_build(&self.config.tracing, &self.config.name, reason);
        let _timer = self.metrics.start_timer();

        self.set_state(&mut control, BuildState::Draining);
        if control.built {
            let mut graph = self.graph();
            let live: Vec<_> = control
                .inputs
                .keys()
                .filter_map(|&port| graph.ingress(port))
                .filter(|&ingress| !graph.children(ingress).is_empty())
                .collect();
            let mut pending: BTreeSet<OutputPortId> = control
                .outputs
                .iter()
                .copied()
                .filter(|&port| graph.egress(port).is_some_and(|e| graph.parent(e).is_some()))
                .collect();
            graph.retire();
            drop(control);

            if !live.is_empty() {
                graph.set_draining(true);
                for ingress in live {
                    if let Err(e) = graph.send_event(ingress, Event::Eos) {
                        tracing::warn!(element = %self.config.name, error = %e, "drain failed");
                    }
                }
                for port in graph.take_drained() {
                    pending.remove(&port);
                }
                graph.set_draining(false);
            }
            if !pending.is_empty() {
                tracing::warn!(
                    element = %self.config.name,
                    pending = ?pending,
                    "outputs did not drain, rebuilding anyway"
                );
            }
            drop(graph);
            control = self.control();
        }
        self.set_state(&mut control, BuildState::Rebuilding);

        let result = self.build(&mut control, reason);
        if result.is_err() {
            control.built = false;
            self.graph().retire();
        }

        self.set_state(&mut control, BuildState::Idle);
        self.idle.notify_all();
        result.map(|_| control)
    }

    fn build(&self, control: &mut Control, reason: &'static str) -> Result<BuildReport> {
        let formats: Vec<(InputPortId, MediaFormat)> = control
            .inputs
            .iter()
            .filter_map(|(&id, sticky)| Some((id, sticky.caps()?.clone())))
            .collect();
        let input_formats: Vec<MediaFormat> = formats.iter().map(|(_, f)| f.clone()).collect();
        control.policy.begin_building_graph(&input_formats);

        let output_peers: Vec<(OutputPortId, PeerHandle)> = self
            .peers()
            .outputs
            .iter()
            .map(|(&id, peer)| (id, peer.clone()))
            .collect();
        let outputs: Vec<(OutputPortId, Caps)> = output_peers
            .iter()
            .map(|(id, peer)| (*id, peer_caps(peer.as_deref(), None)))
            .collect();

        let mut graph = self.graph();
        graph.clear();

        let mut generator = ProposalGenerator::new(
            &control.catalog,
            control.policy.as_ref(),
            self.config.max_chain_length,
        )
        .with_probe_tracing(self.config.tracing.probe_tracing);
        generator.generate_proposals(&formats, &outputs);
        let proposals = generator.into_proposals();
        self.metrics.record_proposals(proposals.len());

        let ports: Vec<OutputPortId> = outputs.iter().map(|(port, _)| *port).collect();
        let selection = select(&proposals, &ports)?;

        let sticky: Vec<(InputPortId, &StickyEvents)> = control
            .inputs
            .iter()
            .map(|(&id, sticky)| (id, sticky))
            .collect();
        let report = build_graph(&mut graph, &proposals, &selection, &sticky)?;
        drop(graph);

        self.reconfigure_set().clear();
        control.built = true;
        control.force_rebuild = false;
        control.last_report = Some(report.clone());

        for port in &report.unresolved {
            tracing::warn!(element = %self.config.name, %port, "no conversion found, output left unlinked");
        }
        self.metrics
            .record_build(reason, report.cost, report.unresolved.len());
        tracing::info!(
            element = %self.config.name,
            reason,
            cost = report.cost,
            stages = report.stages,
            tees = report.tees,
            "graph built"
        );
        Ok(report)
    }
}

fn peer_caps(peer: Option<&dyn PortPeer>, filter: Option<&Caps>) -> Caps {
    peer.map_or_else(|| Caps::any().filtered(filter), |p| p.query_caps(filter))
}

impl fmt::Debug for AutoConvert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let control = self.control();
        f.debug_struct("AutoConvert")
            .field("name", &self.config.name)
            .field("inputs", &control.inputs.len())
            .field("outputs", &control.outputs.len())
            .field("state", &control.state)
            .field("built", &control.built)
            .finish()
    }
}
