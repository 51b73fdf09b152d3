use criterion::{Criterion, black_box, criterion_group, criterion_main};
use reelcast::pagination::paginate;
use reelcast::upstream::transform_response;
use serde_json::{Value, json};

/// Upstream envelope with `n` items, every tenth one missing its thumbnail.
fn envelope(n: usize) -> Value {
    let data: Vec<Value> = (0..n)
        .map(|i| {
            if i % 10 == 0 {
                json!({ "mp4_url": format!("https://cdn.example.com/{i}.mp4") })
            } else {
                json!({
                    "medium_thumb": format!("https://cdn.example.com/{i}.jpg"),
                    "mp4_url": format!("https://cdn.example.com/{i}.mp4"),
                    "action_name": "Shop",
                    "meta": { "title": { "text": format!("Reel {i}") } }
                })
            }
        })
        .collect();
    json!({ "code": 200, "data": data })
}

fn bench_transform(c: &mut Criterion) {
    let payload = envelope(500);
    c.bench_function("transform_500_items", |b| {
        b.iter(|| transform_response(black_box(&payload), "Bench"))
    });
}

fn bench_paginate(c: &mut Criterion) {
    let dataset = transform_response(&envelope(5000), "Bench");
    c.bench_function("paginate_middle_page", |b| {
        b.iter(|| {
            let page = paginate(black_box(&dataset.reels), 100, 20).unwrap();
            serde_json::to_vec(&page).unwrap()
        })
    });
}

criterion_group!(benches, bench_transform, bench_paginate);
criterion_main!(benches);
