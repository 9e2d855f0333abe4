use content_link_stega::{combine, decode_raw, split};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn decode_short_marker(c: &mut Criterion) {
    let text = combine(
        "Hello world",
        &json!({
            "origin": "datocms.com",
            "href": "https://acme.admin.datocms.com/editor/item_types/post/items/123/edit#fieldPath=title.en",
        }),
    )
    .unwrap();

    c.bench_function("decode_short_marker", |b| {
        b.iter(|| decode_raw(black_box(&text)))
    });
}

fn split_plain_paragraph(c: &mut Criterion) {
    let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(40);

    c.bench_function("split_plain_paragraph", |b| {
        b.iter(|| split(black_box(&text)))
    });
}

criterion_group!(benches, decode_short_marker, split_plain_paragraph);
criterion_main!(benches);
