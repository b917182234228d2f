// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the pure policy functions of plugwerk-setup:
// tier resolution, name probing, locale mapping and PPD page-size lookup.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use plugwerk_core::ppd::PpdFile;
use plugwerk_core::types::{DeviceIdentity, DriverCandidate, MatchTier, PaperSize, QueueName};
use plugwerk_setup::naming::{base_name, pick_free_name};
use plugwerk_setup::paper::{default_page_size_choice, paper_size_for_locale};
use plugwerk_setup::resolver::best_candidate;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 200 candidates, best tier last.
fn candidates() -> Vec<DriverCandidate> {
    let mut list: Vec<_> = (0..199)
        .map(|i| {
            let tier = if i % 2 == 0 { MatchTier::Generic } else { MatchTier::None };
            DriverCandidate::new(format!("driver-{i}.ppd"), tier)
        })
        .collect();
    list.push(DriverCandidate::new("exact.ppd", MatchTier::Exact));
    list
}

/// A PPD with a long `PageSize` option.
fn ppd_text() -> String {
    let mut text = String::from("*PPD-Adobe: \"4.3\"\n*OpenGroup: General/General\n");
    text.push_str("*OpenUI *PageSize/Media Size: PickOne\n*DefaultPageSize: Letter\n");
    for i in 0..100 {
        text.push_str(&format!("*PageSize Custom{i}/Custom {i}: \"\"\n"));
    }
    text.push_str("*PageSize Letter/US Letter: \"\"\n*PageSize A4/A4: \"\"\n");
    text.push_str("*CloseUI: *PageSize\n*CloseGroup: General\n");
    text
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_best_candidate(c: &mut Criterion) {
    let list = candidates();
    c.bench_function("best_candidate (200 candidates)", |b| {
        b.iter(|| best_candidate(black_box(&list)))
    });
}

fn bench_name_allocation(c: &mut Criterion) {
    let identity = DeviceIdentity::from_device_id("MFG:Acme;MDL:Widget 3000;CMD:PCL;");
    let base = QueueName::try_from("Widget-3000").expect("valid name");
    let taken: Vec<String> = std::iter::once("Widget-3000".to_string())
        .chain((2..100).map(|i| format!("Widget-3000-{i}")))
        .collect();

    c.bench_function("base_name (device id)", |b| {
        b.iter(|| base_name(black_box(&identity)))
    });
    c.bench_function("pick_free_name (99 taken)", |b| {
        b.iter(|| pick_free_name(black_box(&base), black_box(&taken)))
    });
}

fn bench_paper_size(c: &mut Criterion) {
    c.bench_function("paper_size_for_locale", |b| {
        b.iter(|| {
            paper_size_for_locale(black_box("en_US.UTF-8"));
            paper_size_for_locale(black_box("de_DE.UTF-8"))
        })
    });

    let text = ppd_text();
    c.bench_function("ppd parse + page size choice (100 sizes)", |b| {
        b.iter(|| {
            let mut ppd = PpdFile::parse(black_box(&text)).expect("parse");
            default_page_size_choice(&mut ppd, PaperSize::A4)
        })
    });
}

criterion_group!(
    benches,
    bench_best_candidate,
    bench_name_allocation,
    bench_paper_size
);
criterion_main!(benches);
