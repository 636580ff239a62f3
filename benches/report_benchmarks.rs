//! Agent overhead benchmarks for fnpipe
//!
//! Run with: cargo bench --bench report_benchmarks
//!
//! Measures the cost the agent adds around a handler: a full instrumented
//! invocation, report serialization and event-type detection.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use fnpipe::handlers::{create_handler, FixedDice};
use fnpipe::plugins::event_info::types::detect;
use fnpipe::plugins::{EventInfoPlugin, TracePlugin};
use fnpipe::report::MemoryReportSender;
use fnpipe::system::MockSystemProbe;
use fnpipe::{Agent, Config, LambdaContext};

fn bench_config() -> Config {
    Config {
        token: "bench-token".into(),
        ..Config::default()
    }
}

fn api_gateway_event() -> Value {
    json!({
        "httpMethod": "GET",
        "path": "/bench",
        "resource": "/bench",
        "headers": {"Host": "example.com", "User-Agent": "criterion"},
        "requestContext": {"stage": "bench", "requestId": "req-1"}
    })
}

fn s3_event() -> Value {
    json!({
        "Records": [{
            "eventVersion": "2.0",
            "eventSource": "aws:s3",
            "awsRegion": "us-east-1",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": {"name": "bench-bucket", "arn": "arn:aws:s3:::bench-bucket"},
                "object": {"key": "bench.json", "size": 1024}
            }
        }]
    })
}

fn bench_invocation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let sender = Arc::new(MemoryReportSender::new());
    let agent = rt.block_on(async {
        Agent::builder(bench_config())
            .plugin(Arc::new(TracePlugin::new(true)))
            .plugin(Arc::new(EventInfoPlugin::new(true)))
            .sender(sender.clone())
            .system(Arc::new(MockSystemProbe))
            .build()
            .await
            .unwrap()
    });
    let agent = Arc::new(agent);

    let mut group = c.benchmark_group("invocation");
    for name in ["simple-success", "custom-events", "thrown-failure"] {
        let instrumented = agent.instrument(create_handler(name, Arc::new(FixedDice(0.25))).unwrap());
        group.bench_function(name, |b| {
            b.to_async(&rt).iter(|| async {
                let lambda = LambdaContext::local("bench", Duration::from_secs(30));
                black_box(instrumented.call(api_gateway_event(), lambda).await)
            });
        });
    }
    group.finish();
}

fn bench_report_serialize(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let sender = Arc::new(MemoryReportSender::new());
    let report = rt.block_on(async {
        let agent = Agent::builder(bench_config())
            .sender(sender.clone())
            .system(Arc::new(MockSystemProbe))
            .build()
            .await
            .unwrap();
        let handler = create_handler("custom-events", Arc::new(FixedDice(0.75))).unwrap();
        let lambda = LambdaContext::local("bench", Duration::from_secs(30));
        let _ = agent.invoke(handler.as_ref(), json!({}), lambda).await;
        sender.last().unwrap()
    });

    c.bench_function("report_to_json", |b| {
        b.iter(|| serde_json::to_vec(black_box(&report)).unwrap());
    });
}

fn bench_event_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_detect");
    let api = api_gateway_event();
    let s3 = s3_event();
    let unknown = json!({"hello": "world"});
    group.bench_function("api_gateway", |b| b.iter(|| detect(black_box(&api))));
    group.bench_function("s3", |b| b.iter(|| detect(black_box(&s3))));
    group.bench_function("unknown", |b| b.iter(|| detect(black_box(&unknown))));
    group.finish();
}

criterion_group!(
    benches,
    bench_invocation,
    bench_report_serialize,
    bench_event_detect,
);

criterion_main!(benches);
