use criterion::{black_box, criterion_group, criterion_main, Criterion};

use inkmath_core::normalize::{clean_feedback, normalize};

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    let clean = r#"{"isCorrect": true, "feedback": "Nice move", "confidence": 0.9}"#;

    let fenced = r#"Sure, here is my judgment:

```json
{"isCorrect": true, "feedback": "Nice move", "explanation": "sign handled", "confidence": 0.9}
```

Let me know if you want more detail."#;

    let broken = {
        let mut s = String::from(r#"{"score": 72, "feedback": "Solid work", "suggestions": ["check signs", "verify the answer"], "#);
        for i in 0..20 {
            s.push_str(&format!("garbage_{i} "));
        }
        s.push('}');
        s
    };

    group.bench_function("strict_parse", |b| {
        b.iter(|| normalize(black_box(clean)))
    });

    group.bench_function("fenced_with_prose", |b| {
        b.iter(|| normalize(black_box(fenced)))
    });

    group.bench_function("field_salvage", |b| {
        b.iter(|| normalize(black_box(&broken)))
    });

    group.finish();
}

fn bench_clean_feedback(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean_feedback");

    group.bench_function("artifacts", |b| {
        b.iter(|| clean_feedback(black_box(r#""feedback": "Great job moving that term","#)))
    });

    group.bench_function("already_marked", |b| {
        b.iter(|| clean_feedback(black_box("✅ Already decorated feedback")))
    });

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_clean_feedback);
criterion_main!(benches);
