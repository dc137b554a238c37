//! Planner properties checked against brute force.

use autoconvert::element::{PadTemplate, StageFactory};
use autoconvert::elements::{Identity, VideoConvert, VideoScale};
use autoconvert::format::{
    Caps, Framerate, MediaFormat, PixelFormat, VideoFormat, VideoFormatCaps,
};
use autoconvert::negotiation::{
    CatalogEntry, ChainGenerator, ChainVerdict, DefaultPolicy, Proposal, ProposalGenerator,
    ProposalId, ProposalParent, ProposalSet, Route, StageCatalog, select, validate_chain_caps,
    validate_non_consecutive,
};
use autoconvert::pipeline::{InputPortId, OutputPortId};
use std::sync::Arc;

/// Deterministic generator for test cases.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn video(w: u32, h: u32, pf: PixelFormat) -> MediaFormat {
    MediaFormat::VideoRaw(VideoFormat::new(w, h, pf, Framerate::FPS_30))
}

fn identity_factory(name: &str, sink: Caps, src: Caps) -> Arc<StageFactory> {
    Arc::new(
        StageFactory::new(name, "Filter/Converter/Video", || Box::new(Identity::new()))
            .with_template(PadTemplate::sink(sink))
            .with_template(PadTemplate::src(src)),
    )
}

fn mixed_catalog() -> StageCatalog {
    let gray = Caps::from(VideoFormatCaps::any().with_pixel_formats([PixelFormat::Gray8]));
    StageCatalog::index([
        Arc::new(VideoScale::factory()),
        Arc::new(VideoConvert::factory()),
        identity_factory("grayonly", gray.clone(), gray),
        identity_factory(
            "rgbatoany",
            Caps::from(VideoFormatCaps::rgba()),
            Caps::from(VideoFormatCaps::any()),
        ),
    ])
}

fn names(chain: &[&CatalogEntry]) -> Vec<String> {
    chain.iter().map(|e| e.name().to_string()).collect()
}

fn default_validation(route: &Route, chain: &[&CatalogEntry]) -> ChainVerdict {
    validate_chain_caps(route, chain).and_then(|| validate_non_consecutive(chain))
}

#[test]
fn test_pruned_enumeration_matches_brute_force() {
    let catalog = mixed_catalog();
    let entries = catalog.entries();
    let routes = [
        (
            video(1280, 720, PixelFormat::I420),
            Caps::from(VideoFormatCaps::rgba().with_size(640, 360)),
        ),
        (
            video(640, 480, PixelFormat::Rgba),
            Caps::from(VideoFormatCaps::any().with_pixel_formats([PixelFormat::Gray8])),
        ),
        (video(320, 240, PixelFormat::Gray8), Caps::from(VideoFormatCaps::yuv420())),
    ];

    for (source, destination) in routes {
        let route = Route {
            source: Some(InputPortId::new(0)),
            source_caps: Caps::fixed(source),
            destination: OutputPortId::new(0),
            destination_caps: destination,
        };

        for length in 1..=3u32 {
            let pruned: Vec<Vec<String>> = ChainGenerator::new(
                entries,
                length as usize,
                |chain: &[&CatalogEntry]| default_validation(&route, chain),
            )
            .map(|chain| names(&chain))
            .collect();

            let n = entries.len();
            let brute: Vec<Vec<String>> = (0..n.pow(length))
                .map(|index| {
                    (0..length)
                        .map(|position| &entries[index / n.pow(position) % n])
                        .collect::<Vec<_>>()
                })
                .filter(|chain| default_validation(&route, chain).is_accept())
                .map(|chain| names(&chain))
                .collect();

            assert_eq!(pruned, brute, "length {length}, route {route:?}");
        }
    }
}

#[test]
fn test_accepted_chains_are_valid() {
    let catalog = mixed_catalog();
    let route = Route {
        source: None,
        source_caps: Caps::fixed(video(1280, 720, PixelFormat::I420)),
        destination: OutputPortId::new(0),
        destination_caps: Caps::from(VideoFormatCaps::rgba()),
    };

    for chain in ChainGenerator::new(catalog.entries(), 3, |chain: &[&CatalogEntry]| {
        default_validation(&route, chain)
    }) {
        assert!(chain[0].sink_caps.can_intersect(&route.source_caps));
        assert!(chain[2].src_caps.can_intersect(&route.destination_caps));
        for pair in chain.windows(2) {
            assert!(!std::ptr::eq(pair[0], pair[1]));
            assert!(pair[0].src_caps.can_intersect(&pair[1].sink_caps));
        }
    }
}

#[test]
fn test_passthrough_preferred() {
    let policy = DefaultPolicy::default()
        .with_factory(VideoScale::factory())
        .with_factory(VideoConvert::factory());
    let catalog = StageCatalog::from_policy(&policy).unwrap();
    let mut generator = ProposalGenerator::new(&catalog, &policy, 4);

    let inputs = [(InputPortId::new(0), video(640, 480, PixelFormat::Rgba))];
    let outputs = [(OutputPortId::new(0), Caps::from(VideoFormatCaps::rgba()))];
    generator.generate_proposals(&inputs, &outputs);
    let proposals = generator.into_proposals();

    assert_eq!(proposals.len(), 1);
    let selection = select(&proposals, &[OutputPortId::new(0)]).unwrap();
    assert_eq!(selection.cost, 0);
    assert!(proposals[selection.proposals[0]].is_passthrough());
}

// ============================================================================
// Selector minimality
// ============================================================================

fn random_forest(rng: &mut Lcg, outputs: u32) -> ProposalSet {
    let mut set = ProposalSet::new();
    let count = 1 + rng.below(8) as usize;
    let mut ids: Vec<ProposalId> = Vec::new();

    for _ in 0..count {
        let destination = OutputPortId::new(rng.below(outputs as u64) as u32);
        let candidates: Vec<ProposalId> = ids
            .iter()
            .copied()
            .filter(|&id| set.lineage(id).all(|p| set[p].destination != destination))
            .collect();
        let parent = if candidates.is_empty() || rng.below(2) == 0 {
            ProposalParent::Port(InputPortId::new(rng.below(2) as u32))
        } else {
            ProposalParent::Step {
                proposal: candidates[rng.below(candidates.len() as u64) as usize],
                step: 0,
            }
        };
        ids.push(set.push(Proposal {
            parent,
            destination,
            steps: Vec::new(),
            cost: rng.below(20),
        }));
    }
    set
}

/// Cheapest set of proposals whose lineages serve disjoint port sets covering
/// every output.
fn brute_force_minimum(set: &ProposalSet, outputs: &[OutputPortId]) -> Option<u64> {
    let full = (1u32 << outputs.len()) - 1;
    let paths: Vec<(u32, u64)> = set
        .iter()
        .map(|(id, _)| {
            set.lineage(id).fold((0u32, 0u64), |(mask, cost), p| {
                let bit = outputs.iter().position(|&o| o == set[p].destination).unwrap();
                (mask | 1 << bit, cost + set[p].cost)
            })
        })
        .collect();

    let mut best = None;
    for choice in 0u32..(1 << paths.len()) {
        let mut mask = 0;
        let mut cost = 0;
        let mut disjoint = true;
        for (i, &(path_mask, path_cost)) in paths.iter().enumerate() {
            if choice & (1 << i) == 0 {
                continue;
            }
            disjoint &= mask & path_mask == 0;
            mask |= path_mask;
            cost += path_cost;
        }
        if disjoint && mask == full && best.is_none_or(|b| cost < b) {
            best = Some(cost);
        }
    }
    best
}

#[test]
fn test_selector_matches_brute_force() {
    let mut rng = Lcg(0x5eed);
    for case in 0..300 {
        let output_count = 1 + rng.below(4) as u32;
        let outputs: Vec<OutputPortId> = (0..output_count).map(OutputPortId::new).collect();
        let set = random_forest(&mut rng, output_count);

        let selection = select(&set, &outputs).unwrap();
        let selected_cost: u64 = selection.proposals.iter().map(|&id| set[id].cost).sum();
        assert_eq!(selected_cost, selection.cost, "case {case}");

        match brute_force_minimum(&set, &outputs) {
            Some(minimum) => {
                assert!(selection.is_complete(), "case {case}");
                assert_eq!(selection.cost, minimum, "case {case}: {set:?}");
            }
            None => assert!(!selection.is_complete(), "case {case}"),
        }

        let mut served: Vec<_> = selection
            .proposals
            .iter()
            .map(|&id| set[id].destination)
            .collect();
        served.sort();
        served.dedup();
        assert_eq!(served.len() + selection.unresolved.len(), outputs.len(), "case {case}");
    }
}
