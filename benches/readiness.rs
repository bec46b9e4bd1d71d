//! Benchmarks for readiness recalculation and workspace ranking.
//!
//! Run with: `cargo bench`

use chrono::{Duration, NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use uuid::Uuid;

use caseflow::domain::models::{CasePlan, DeadlineSource, StepDependency, StepStatus, WorkflowStep};
use caseflow::services::{ReadinessEvaluator, WorkspaceRanker};

/// A plan of `size` steps where each step depends on the two before it and
/// every third step is complete.
fn layered_plan(size: usize) -> CasePlan {
    let tenant_id = Uuid::new_v4();
    let case_id = Uuid::new_v4();
    let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default();
    let now = Utc::now();

    let steps: Vec<WorkflowStep> = (0..size)
        .map(|i| {
            let mut step = WorkflowStep::new(case_id, tenant_id, format!("step-{i}"), format!("Step {i}"), i as u32 + 1)
                .with_due_date(today + Duration::days((i % 45) as i64), DeadlineSource::PlanDefault);
            if i % 3 == 0 {
                step.set_status(StepStatus::Complete, now);
            }
            step
        })
        .collect();

    let mut dependencies = Vec::new();
    for i in 1..size {
        dependencies.push(StepDependency::new(case_id, steps[i].id, steps[i - 1].id));
        if i >= 2 {
            dependencies.push(StepDependency::new(case_id, steps[i].id, steps[i - 2].id));
        }
    }

    CasePlan::new(tenant_id, case_id, steps, dependencies)
}

fn bench_recalculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("readiness_recalculate");
    let evaluator = ReadinessEvaluator::new();

    for size in [6usize, 50, 200] {
        let plan = layered_plan(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &plan, |b, plan| {
            b.iter(|| {
                let mut plan = plan.clone();
                black_box(evaluator.recalculate(&mut plan, Utc::now()))
            });
        });
    }
    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("workspace_rank");
    let ranker = WorkspaceRanker::new();
    let today = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap_or_default();

    for size in [6usize, 50, 200] {
        let mut plan = layered_plan(size);
        ReadinessEvaluator::new().recalculate(&mut plan, Utc::now());
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &plan, |b, plan| {
            b.iter(|| black_box(ranker.rank(black_box(plan), today)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_recalculate, bench_rank);
criterion_main!(benches);
