//! This bench builds and filters a diamond-shaped module graph: one
//! microservice importing several systems, all of which import one shared
//! external module.

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nonempty::NonEmpty;
use reqtrace::{
    CombinedRawDataset, FilterRule, UrnId, generate,
    domain::{
        MvrData, RawDataset, RequirementData, SvcData, Variant,
        raw::{Metadata, MvrsDocument, RequirementsDocument, SvcsDocument},
    },
};

const REQUIREMENTS_PER_MODULE: usize = 200;

fn module(urn: &str, variant: Variant) -> RawDataset {
    let mut document = RequirementsDocument::new(Metadata::new(urn, variant, urn));
    for i in 0..REQUIREMENTS_PER_MODULE {
        let id = UrnId::new(urn, format!("REQ_{i:04}"));
        document
            .requirements
            .insert(id.clone(), RequirementData::new(id, "requirement"));
    }
    RawDataset::new(document)
}

fn diamond(systems: usize) -> CombinedRawDataset {
    let system_urns: Vec<String> = (0..systems).map(|i| format!("sys-{i:03}")).collect();
    let mut crd = CombinedRawDataset::new("ms-001");

    let mut root = module("ms-001", Variant::Microservice);
    let mut svcs = SvcsDocument::default();
    let mut mvrs = MvrsDocument::default();
    for (n, urn) in system_urns.iter().enumerate() {
        // every tenth requirement of each system is excluded
        root.requirements.filters.insert(
            urn.clone(),
            FilterRule::excluding(
                (0..REQUIREMENTS_PER_MODULE)
                    .step_by(10)
                    .map(|i| UrnId::new(urn.as_str(), format!("REQ_{i:04}"))),
            ),
        );
        for i in 0..REQUIREMENTS_PER_MODULE {
            let svc = UrnId::new("ms-001", format!("SVC_{n:03}_{i:04}"));
            let requirement = UrnId::new(urn.as_str(), format!("REQ_{i:04}"));
            svcs.cases.insert(
                svc.clone(),
                SvcData::new(svc.clone(), "svc", NonEmpty::new(requirement)),
            );
            let mvr = UrnId::new("ms-001", format!("MVR_{n:03}_{i:04}"));
            mvrs.results
                .insert(mvr.clone(), MvrData::new(mvr, NonEmpty::new(svc)));
        }
    }
    root.svcs = Some(svcs);
    root.mvrs = Some(mvrs);
    crd.insert(root, system_urns.clone());

    for urn in &system_urns {
        crd.insert(module(urn, Variant::System), ["ext-001".to_string()]);
    }
    crd.insert(module("ext-001", Variant::External), Vec::new());
    crd
}

fn generate_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for systems in [4, 16] {
        let crd = diamond(systems);
        group.bench_with_input(BenchmarkId::new("unfiltered", systems), &crd, |b, crd| {
            b.iter(|| generate(crd, false).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("filtered", systems), &crd, |b, crd| {
            b.iter(|| generate(crd, true).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, generate_model);
criterion_main!(benches);
