use chocopy::lexer;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

static INPUTS: [(&str, &str); 3] = [
    ("fib", include_str!("../../demos/fib.py")),
    ("lists", include_str!("../../demos/lists.py")),
    ("strings", include_str!("../../demos/strings.py")),
];

fn criterion_benchmark(c: &mut Criterion) {
    let mut tokens = Vec::with_capacity(1024);

    for (name, input) in INPUTS {
        c.bench_function(&format!("lexer/{name}"), |b| {
            b.iter(|| {
                tokens.clear();
                lexer::lex(black_box(input), &mut tokens).unwrap();
                black_box(tokens.len());
            });
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
