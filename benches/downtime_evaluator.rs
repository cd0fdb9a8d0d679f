//! 宕机判定基准测试
//!
//! 测试大量端点、长历史下的判定与消息渲染性能

use algo_vitals::health::{DowntimeEvaluator, DowntimePolicy, History, RunReport};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::time::Duration;

fn report(endpoints: usize, ticks: usize) -> RunReport {
    let titles: Vec<String> = (0..endpoints).map(|i| format!("Node {i}")).collect();
    let mut report = RunReport::new(Duration::from_secs(5), titles.iter().map(String::as_str));
    report.ticks = ticks;

    for (i, history) in report.histories.values_mut().enumerate() {
        *history = (0..ticks).map(|t| (t + i) % 3 != 0).collect::<History>();
    }
    report
}

fn downtime_evaluator_benchmark(c: &mut Criterion) {
    let report = report(100, 720);

    c.bench_function("evaluate_report_ratio", |b| {
        let evaluator = DowntimeEvaluator::new(
            DowntimePolicy::Ratio {
                threshold_percent: 20.0,
            },
            Duration::from_secs(5),
        )
        .unwrap();

        b.iter(|| black_box(evaluator.evaluate_report(black_box(&report)).unwrap()));
    });

    c.bench_function("evaluate_report_duration", |b| {
        let evaluator =
            DowntimeEvaluator::new(DowntimePolicy::Duration, Duration::from_secs(5)).unwrap();

        b.iter(|| black_box(evaluator.evaluate_report(black_box(&report)).unwrap()));
    });
}

criterion_group!(benches, downtime_evaluator_benchmark);
criterion_main!(benches);
