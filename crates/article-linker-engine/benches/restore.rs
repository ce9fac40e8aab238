use std::collections::BTreeMap;

use article_linker_engine::{Linker, LinkerSettings, ResourceId, Rgb, StaticLayout};
use criterion::{Criterion, criterion_group, criterion_main};
mod common;

fn bench_restore(c: &mut Criterion) {
    let mut group = c.benchmark_group("restore");
    group.sample_size(10);

    let doc = common::generate_document(500);
    let state = common::generate_link_state(500);
    let registry = BTreeMap::from([(ResourceId::new("r1"), Rgb::new(200, 40, 40))]);
    let layout = StaticLayout::uniform(&doc, 24.0, 800.0);

    group.bench_function("restore_1000_links", |b| {
        let mut linker = Linker::new(doc.clone(), layout.clone(), LinkerSettings::default());
        b.iter(|| {
            let report = linker.restore(std::hint::black_box(&state), &registry);
            std::hint::black_box(report);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_restore);
criterion_main!(benches);
