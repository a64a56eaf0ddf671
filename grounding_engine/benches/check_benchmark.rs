//! Criterion benchmarks for the grounding engine.
//!
//! Benchmarks measure `Grounder::validate` throughput over synthetic
//! responses of varying length and violation density.

use criterion::{criterion_group, criterion_main, Criterion};

use grounding_engine::{CheckInput, Config, EvidenceIndexBuilder, Grounder};

fn synthetic_response(claims: usize) -> String {
    let mut response = String::from("Here is a summary of the change.\n");
    for i in 0..claims {
        response.push_str(&format!(
            "See main.go:{} where HandleRequest() calls ValidateToken() and logs errors.\n",
            (i % 50) + 1
        ));
    }
    response
}

fn make_input(claims: usize) -> CheckInput {
    let evidence = EvidenceIndexBuilder::new()
        .known_files(vec!["main.go".to_string()])
        .known_symbols(vec!["HandleRequest".to_string(), "ValidateToken".to_string()])
        .build();

    CheckInput {
        response: synthetic_response(claims),
        user_question: "What does the handler do?".to_string(),
        project_root: String::new(),
        project_language: "go".to_string(),
        code_context: Vec::new(),
        tool_results: Vec::new(),
        evidence,
        additional_samples: Vec::new(),
    }
}

fn bench_validate(c: &mut Criterion) {
    let grounder = Grounder::new(Config::default());

    let mut group = c.benchmark_group("validate");
    for claims in [10usize, 100, 500] {
        let input = make_input(claims);
        group.bench_function(format!("claims_{claims}"), |b| {
            b.iter(|| std::hint::black_box(grounder.validate(std::hint::black_box(&input))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_validate);
criterion_main!(benches);
