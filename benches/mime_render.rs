use std::time::SystemTime;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mxmail::{
    message::mimebody::{attachment_lines, Boundary, MimeBody},
    Message,
};

fn message(body: &str) -> Message {
    let mut message = Message::new("Order #1042 shipped", body);
    message
        .sender("shop@example.com", Some("Example Shop"))
        .unwrap()
        .to("customer@example.org")
        .unwrap()
        .cc("sales@example.com")
        .unwrap();
    message
}

fn criterion_benchmark(c: &mut Criterion) {
    let short = message("Your parcel is on its way.");
    let long = message(&"<p>Thanks for shopping with us!</p>\n".repeat(2_000));
    let now = SystemTime::now();

    c.bench_function("render short message", |b| {
        b.iter(|| MimeBody::new(black_box(&short), "example.com", now))
    });
    c.bench_function("render long html message", |b| {
        b.iter(|| MimeBody::new(black_box(&long), "example.com", now))
    });

    let boundary = Boundary::from_timestamp(1_700_000_000_000);
    let content = vec![0x5a_u8; 256 * 1024];
    c.bench_function("render 256KiB attachment", |b| {
        b.iter(|| attachment_lines(&boundary, "invoice.pdf", black_box(&content)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
