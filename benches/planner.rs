//! Benchmarks for planning: chain enumeration, proposal generation and
//! selection.
//!
//! Run with:
//!   cargo bench --bench planner

use autoconvert::format::{Caps, Framerate, MediaFormat, PixelFormat, VideoFormat, VideoFormatCaps};
use autoconvert::negotiation::{
    CatalogEntry, ChainGenerator, ConvertPolicy, Proposal, ProposalGenerator, ProposalParent,
    ProposalSet, Route, StageCatalog, VideoConvertPolicy, select,
};
use autoconvert::pipeline::{InputPortId, OutputPortId};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn video(w: u32, h: u32, pf: PixelFormat) -> MediaFormat {
    MediaFormat::VideoRaw(VideoFormat::new(w, h, pf, Framerate::FPS_30))
}

fn bench_chain_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_generation");
    let policy = VideoConvertPolicy::new();
    let catalog = StageCatalog::from_policy(&policy).unwrap();
    let route = Route {
        source: Some(InputPortId::new(0)),
        source_caps: Caps::fixed(video(1920, 1080, PixelFormat::I420)),
        destination: OutputPortId::new(0),
        destination_caps: Caps::from(VideoFormatCaps::rgba().with_size(640, 360)),
    };

    for length in 1..=4usize {
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, &length| {
            b.iter(|| {
                ChainGenerator::new(catalog.entries(), length, |chain: &[&CatalogEntry]| {
                    policy.validate_chain(&route, chain)
                })
                .count()
            });
        });
    }

    group.finish();
}

fn bench_proposal_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("proposal_generation");
    let policy = VideoConvertPolicy::new();
    let catalog = StageCatalog::from_policy(&policy).unwrap();
    let inputs = [(InputPortId::new(0), video(1920, 1080, PixelFormat::I420))];
    let targets = [
        Caps::from(VideoFormatCaps::yuv420().with_size(1280, 720)),
        Caps::from(VideoFormatCaps::rgba().with_size(640, 360)),
        Caps::from(VideoFormatCaps::any().with_pixel_formats([PixelFormat::Gray8])),
    ];

    for count in 1..=targets.len() {
        let outputs: Vec<(OutputPortId, Caps)> = targets[..count]
            .iter()
            .enumerate()
            .map(|(i, caps)| (OutputPortId::new(i as u32), caps.clone()))
            .collect();
        group.bench_with_input(BenchmarkId::new("outputs", count), &outputs, |b, outputs| {
            b.iter(|| {
                let mut generator = ProposalGenerator::new(&catalog, &policy, 3);
                generator.generate_proposals(&inputs, outputs);
                generator.into_proposals().len()
            });
        });
    }

    group.finish();
}

/// A forest where every output can be served directly or off any earlier
/// proposal for a different output.
fn synthetic_forest(outputs: u32) -> ProposalSet {
    let mut set = ProposalSet::new();
    let mut roots = Vec::new();
    for o in 0..outputs {
        roots.push(set.push(Proposal {
            parent: ProposalParent::Port(InputPortId::new(0)),
            destination: OutputPortId::new(o),
            steps: Vec::new(),
            cost: 10 + u64::from(o % 7),
        }));
    }
    for (i, &root) in roots.iter().enumerate() {
        for o in 0..outputs {
            if o as usize != i {
                set.push(Proposal {
                    parent: ProposalParent::Step {
                        proposal: root,
                        step: 0,
                    },
                    destination: OutputPortId::new(o),
                    steps: Vec::new(),
                    cost: 1 + u64::from((o + i as u32) % 5),
                });
            }
        }
    }
    set
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");

    for outputs in [2u32, 4, 8, 12, 16] {
        let set = synthetic_forest(outputs);
        let ports: Vec<OutputPortId> = (0..outputs).map(OutputPortId::new).collect();
        group.bench_with_input(BenchmarkId::new("outputs", outputs), &set, |b, set| {
            b.iter(|| select(set, &ports).unwrap().cost);
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_chain_generation,
    bench_proposal_generation,
    bench_selection,
);
criterion_main!(benches);
