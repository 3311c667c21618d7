use better_bible::content::normalize;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

const FENCED_REPLY: &str = r#"Sure! Here is the lesson you asked for.
```json
{
  "paraphrase": "God loved the world so much that He gave His only Son, so everyone who trusts Him will live forever.",
  "story": "Sam found a lost puppy and gave up his afternoon to find its owner.",
  "prayer": "Dear God, thank you for loving us so much. Amen.",
  "activities": ["Draw a heart with the verse inside", "Share a snack with a friend", "Memorize the verse"],
  "keyPoints": ["God loves everyone", "Jesus is God's gift", "We can trust Him"]
}
```
Let me know if you'd like another version."#;

fn bench_normalize(c: &mut Criterion) {
    let prose_braces = format!(
        "Note: use {{curly}} braces {{like this}} carefully. {}",
        FENCED_REPLY
    );
    let refusal = "Sorry, I cannot help with that request. ".repeat(20);

    c.bench_function("normalize/fenced_json", |b| {
        b.iter(|| black_box(normalize(black_box(FENCED_REPLY))));
    });
    c.bench_function("normalize/prose_with_braces", |b| {
        b.iter(|| black_box(normalize(black_box(&prose_braces))));
    });
    c.bench_function("normalize/refusal_degraded", |b| {
        b.iter(|| black_box(normalize(black_box(&refusal))));
    });
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
