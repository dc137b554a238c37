//! Materialization of a selection into the live graph.

use crate::error::{Error, Result};
use crate::event::StickyEvents;
use crate::negotiation::{ProposalParent, ProposalSet, Selection};
use crate::pipeline::{Graph, InputPortId, LinkFlags, NodeId, OutputPortId};
use std::collections::{BTreeMap, HashMap};

/// What a build produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Total cost of the selected proposals.
    pub cost: u64,
    /// Output ports that received a chain.
    pub linked: Vec<OutputPortId>,
    /// Output ports left unlinked.
    pub unresolved: Vec<OutputPortId>,
    /// Stage instances created.
    pub stages: usize,
    /// Tees created.
    pub tees: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Attachments {
    count: usize,
    passthrough: bool,
}

/// Build the selected proposals into `graph`.
///
/// `graph` must hold an ingress node for every entry of `inputs` and an
/// egress node for every selected destination, and nothing else. Inputs
/// that feed no proposal are terminated with a discard sink. Afterwards the
/// sticky events of each input, end-of-stream excluded, are replayed into
/// the new graph.
pub fn build_graph(
    graph: &mut Graph,
    proposals: &ProposalSet,
    selection: &Selection,
    inputs: &[(InputPortId, &StickyEvents)],
) -> Result<BuildReport> {
    let mut attachments: BTreeMap<ProposalParent, Attachments> = BTreeMap::new();
    for &id in &selection.proposals {
        let proposal = &proposals[id];
        let entry = attachments.entry(proposal.parent).or_default();
        entry.count += 1;
        entry.passthrough |= proposal.is_passthrough();
    }

    let mut report = BuildReport {
        cost: selection.cost,
        unresolved: selection.unresolved.clone(),
        ..Default::default()
    };
    let mut roots: HashMap<ProposalParent, NodeId> = HashMap::new();

    for (&parent, attached) in &attachments {
        let ProposalParent::Port(port) = parent else {
            continue;
        };
        let ingress = graph
            .ingress(port)
            .ok_or_else(|| Error::UnknownPort(port.to_string()))?;
        let root = if attached.count > 1 || attached.passthrough {
            let tee = add_tee(graph, &mut report);
            graph.link(ingress, tee, LinkFlags::NO_RECONFIGURE)?;
            tee
        } else {
            ingress
        };
        roots.insert(parent, root);
    }

    for &id in &selection.proposals {
        let proposal = &proposals[id];
        let mut tail = *roots.get(&proposal.parent).ok_or_else(|| {
            Error::LinkRefused(format!("no attachment point for {id} ({:?})", proposal.parent))
        })?;

        for (step_index, step) in proposal.steps.iter().enumerate() {
            let name = graph.unique_name(step.factory.name());
            let node = graph.add_stage(name, step.factory.clone());
            graph.set_planned_output(node, step.output.clone())?;
            graph.link(tail, node, LinkFlags::NO_RECONFIGURE)?;
            report.stages += 1;
            tail = node;

            let branch_point = ProposalParent::Step {
                proposal: id,
                step: step_index,
            };
            if attachments.contains_key(&branch_point) {
                let tee = add_tee(graph, &mut report);
                graph.link(node, tee, LinkFlags::NO_RECONFIGURE)?;
                roots.insert(branch_point, tee);
                tail = tee;
            }
        }

        let egress = graph
            .egress(proposal.destination)
            .ok_or_else(|| Error::UnknownPort(proposal.destination.to_string()))?;
        graph.link(tail, egress, LinkFlags::NO_RECONFIGURE)?;
        report.linked.push(proposal.destination);
    }
    report.linked.sort();

    for &(port, _) in inputs {
        let ingress = graph
            .ingress(port)
            .ok_or_else(|| Error::UnknownPort(port.to_string()))?;
        if graph.children(ingress).is_empty() {
            let name = graph.unique_name("discard");
            let discard = graph.add_discard(name);
            graph.link(ingress, discard, LinkFlags::NO_RECONFIGURE)?;
            tracing::debug!(port = %port, "input feeds no output, discarding");
        }
    }

    for &(port, sticky) in inputs {
        let Some(ingress) = graph.ingress(port) else {
            continue;
        };
        for event in sticky.replayable() {
            if let Err(e) = graph.send_event(ingress, event.clone()) {
                tracing::warn!(port = %port, event = event.name(), error = %e, "sticky event replay failed");
            }
        }
    }

    Ok(report)
}

fn add_tee(graph: &mut Graph, report: &mut BuildReport) -> NodeId {
    let name = graph.unique_name("tee");
    report.tees += 1;
    graph.add_tee(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::StageFactory;
    use crate::elements::VideoScale;
    use crate::event::Event;
    use crate::format::{Framerate, MediaFormat, PixelFormat, VideoFormat};
    use crate::negotiation::{Proposal, ProposalId, TransformationStep};
    use std::sync::Arc;

    fn video(w: u32, h: u32) -> MediaFormat {
        MediaFormat::VideoRaw(VideoFormat::new(w, h, PixelFormat::I420, Framerate::FPS_30))
    }

    fn step(factory: &Arc<StageFactory>, from: (u32, u32), to: (u32, u32), cost: u64) -> TransformationStep {
        TransformationStep {
            factory: factory.clone(),
            input: video(from.0, from.1),
            output: video(to.0, to.1),
            cost,
        }
    }

    fn ports(graph: &mut Graph, outputs: u32) {
        graph.add_ingress(InputPortId(0));
        for o in 0..outputs {
            graph.add_egress(OutputPortId(o), None);
        }
    }

    #[test]
    fn test_tee_after_shared_step() {
        let scale = Arc::new(VideoScale::factory());
        let mut set = ProposalSet::new();
        let a = set.push(Proposal {
            parent: ProposalParent::Port(InputPortId(0)),
            destination: OutputPortId(0),
            steps: vec![step(&scale, (1920, 1080), (1280, 720), 10)],
            cost: 10,
        });
        set.push(Proposal {
            parent: ProposalParent::Step {
                proposal: a,
                step: 0,
            },
            destination: OutputPortId(1),
            steps: vec![step(&scale, (1280, 720), (854, 480), 5)],
            cost: 5,
        });
        let selection = Selection {
            proposals: vec![ProposalId(0), ProposalId(1)],
            cost: 15,
            unresolved: Vec::new(),
        };

        let mut graph = Graph::new();
        ports(&mut graph, 2);
        let mut sticky = StickyEvents::new();
        sticky.store(&Event::Caps(video(1920, 1080)));
        sticky.store(&Event::Eos);

        let report = build_graph(&mut graph, &set, &selection, &[(InputPortId(0), &sticky)]).unwrap();
        assert_eq!(report.cost, 15);
        assert_eq!(report.stages, 2);
        assert_eq!(report.tees, 1);
        assert_eq!(report.linked, vec![OutputPortId(0), OutputPortId(1)]);
        assert_eq!(
            graph.topology(),
            vec![
                "sink_0 -> videoscale(video/raw 1280x720 I420 30/1) -> tee -> \
                 [src_0, videoscale(video/raw 854x480 I420 30/1) -> src_1]"
            ]
        );
    }

    #[test]
    fn test_passthrough_gets_root_tee() {
        let mut set = ProposalSet::new();
        set.push(Proposal {
            parent: ProposalParent::Port(InputPortId(0)),
            destination: OutputPortId(0),
            steps: Vec::new(),
            cost: 0,
        });
        let selection = Selection {
            proposals: vec![ProposalId(0)],
            ..Default::default()
        };
        let mut graph = Graph::new();
        ports(&mut graph, 1);

        let report = build_graph(&mut graph, &set, &selection, &[(InputPortId(0), &StickyEvents::new())]).unwrap();
        assert_eq!(report.tees, 1);
        assert_eq!(report.stages, 0);
        assert_eq!(graph.topology(), vec!["sink_0 -> tee -> src_0"]);
    }

    #[test]
    fn test_unused_input_discarded() {
        let mut graph = Graph::new();
        ports(&mut graph, 1);
        let selection = Selection {
            unresolved: vec![OutputPortId(0)],
            ..Default::default()
        };

        let report = build_graph(
            &mut graph,
            &ProposalSet::new(),
            &selection,
            &[(InputPortId(0), &StickyEvents::new())],
        )
        .unwrap();
        assert!(report.linked.is_empty());
        assert_eq!(report.unresolved, vec![OutputPortId(0)]);
        assert_eq!(graph.topology(), vec!["sink_0 -> discard"]);
    }
}
