// tests/plan_properties.rs
mod common;
use crate::common::builders::fast_settings;
use crate::common::fake_work::FlakyWork;

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use serde_json::json;
use taskdag::dag::TaskSpec;
use taskdag::engine::Orchestrator;
use taskdag::errors::{TaskdagError, ValidationError};
use taskdag::types::RunMode;

/// Dependency lists for `n` tasks where task `i` may only depend on tasks
/// `0..i`, so the graph is always acyclic.
fn acyclic_deps(max_tasks: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        if i == 0 {
                            BTreeSet::new()
                        } else {
                            picks.into_iter().map(|p| p % i).collect()
                        }
                    })
                    .collect()
            },
        )
    })
}

/// Register tasks in a shuffled order so the plan can't just echo
/// registration order.
fn build(deps: &[BTreeSet<usize>], rotate: usize) -> Orchestrator {
    let orch = Orchestrator::new(fast_settings(3));
    let n = deps.len();
    for k in 0..n {
        let i = (k + rotate) % n;
        let spec = TaskSpec::new(format!("t{i}"), FlakyWork::ok(json!(i)))
            .after_all(deps[i].iter().map(|d| format!("t{d}")));
        orch.register(spec).expect("acyclic tasks register");
    }
    orch
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn plan_orders_every_task_after_its_dependencies(
        deps in acyclic_deps(12),
        rotate in 0usize..12,
    ) {
        let orch = build(&deps, rotate);
        let order = orch.plan().expect("acyclic graph plans");

        prop_assert_eq!(order.len(), deps.len());
        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(p, name)| (name.as_str(), p)).collect();

        for (i, ds) in deps.iter().enumerate() {
            let me = position[format!("t{i}").as_str()];
            for d in ds {
                let dep_key = format!("t{d}");
                prop_assert!(position[dep_key.as_str()] < me);
            }
        }
    }

    #[test]
    fn closing_a_back_edge_always_yields_a_cycle(
        deps in acyclic_deps(8),
    ) {
        let n = deps.len();
        prop_assume!(n >= 2);

        // Chain t0 <- t1 <- ... <- t{n-1}, then make t0 depend on the last.
        let orch = Orchestrator::new(fast_settings(2));
        orch.register(TaskSpec::new("t0", FlakyWork::ok(json!(0))).after(format!("t{}", n - 1)))
            .expect("register");
        for i in 1..n {
            orch.register(TaskSpec::new(format!("t{i}"), FlakyWork::ok(json!(i))).after(format!("t{}", i - 1)))
                .expect("register");
        }

        match orch.plan() {
            Err(TaskdagError::Validation(ValidationError::CyclicDependency { members })) => {
                prop_assert_eq!(members.len(), n);
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn sequential_and_parallel_runs_agree(
        deps in acyclic_deps(8),
        rotate in 0usize..8,
    ) {
        let rt = runtime();
        let orch = build(&deps, rotate);

        let sequential = rt.block_on(orch.run(RunMode::Sequential)).expect("sequential run");
        let parallel = rt.block_on(orch.run(RunMode::Parallel)).expect("parallel run");

        prop_assert_eq!(sequential.len(), deps.len());
        prop_assert_eq!(sequential, parallel);
    }
}
