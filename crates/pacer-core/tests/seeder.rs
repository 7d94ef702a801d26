//! Seed allocation across runs, repeats and dynamically added scenarios

use pacer_core::{
    Dispatcher, Event, InterruptHandle, MonotonicScheduler, Plugin, RunArgs, Scenario,
    ScenarioResult, SeederPlugin, SharedRandom, StandardRandomGenerator, MAX_SEED, MIN_SEED,
};
use pacer_testkit::{make_report, make_report_with, make_result, make_scenario, make_scenarios_at};
use std::collections::HashSet;
use std::sync::Arc;

struct Seeded {
    plugin: Arc<SeederPlugin>,
    dispatcher: Dispatcher,
    random: SharedRandom,
}

impl Seeded {
    async fn start(seed: &str, fixed_seed: bool, discovered: &[Arc<Scenario>]) -> Self {
        let random = SharedRandom::new();
        let plugin = Arc::new(SeederPlugin::new(random.clone()));
        let dispatcher = Dispatcher::new();
        plugin.clone().subscribe(&dispatcher);

        let args = RunArgs::default()
            .with_seed(seed)
            .with_fixed_seed(fixed_seed);
        dispatcher
            .fire(&Event::ArgParsed {
                args: Arc::new(args),
            })
            .await
            .unwrap();
        dispatcher
            .fire(&Event::Startup {
                scheduler: MonotonicScheduler::factory()(discovered.to_vec()),
                interrupt: InterruptHandle::new(),
            })
            .await
            .unwrap();

        Self {
            plugin,
            dispatcher,
            random,
        }
    }

    /// Fire a run event and return the seed the execution observes
    async fn run(&self, scenario: &Arc<Scenario>) -> u64 {
        self.dispatcher
            .fire(&Event::ScenarioRun {
                scenario_result: ScenarioResult::new(scenario.clone()),
            })
            .await
            .unwrap();
        self.plugin.last_seed().unwrap()
    }
}

fn discovered() -> Vec<Arc<Scenario>> {
    make_scenarios_at(&["scenarios/a.rs", "scenarios/b.rs", "scenarios/dir/c.rs"])
}

#[tokio::test]
async fn test_same_run_seed_same_base_seeds() {
    let scenarios = discovered();
    let first = Seeded::start("replay", false, &scenarios).await;
    let second = Seeded::start("replay", false, &scenarios).await;
    let other = Seeded::start("different", false, &scenarios).await;

    let ids: Vec<&str> = scenarios.iter().map(|s| s.unique_id()).collect();
    for id in &ids {
        assert_eq!(first.plugin.base_seed(id), second.plugin.base_seed(id));
    }
    assert!(ids
        .iter()
        .any(|id| first.plugin.base_seed(id) != other.plugin.base_seed(id)));
}

#[tokio::test]
async fn test_repeats_get_distinct_seeds() {
    let scenarios = discovered();
    let seeded = Seeded::start("replay", false, &scenarios).await;

    let seeds: Vec<u64> = vec![
        seeded.run(&scenarios[0]).await,
        seeded.run(&scenarios[0]).await,
        seeded.run(&scenarios[0]).await,
    ];

    assert_eq!(seeds.iter().collect::<HashSet<_>>().len(), 3);
    assert!(seeds.iter().all(|seed| (MIN_SEED..=MAX_SEED).contains(seed)));
}

#[tokio::test]
async fn test_kth_execution_uses_kth_derived_draw() {
    let scenarios = discovered();
    let seeded = Seeded::start("replay", false, &scenarios).await;
    let base = seeded.plugin.base_seed(scenarios[1].unique_id()).unwrap();

    let mut derived = StandardRandomGenerator::new(base);
    let expected: Vec<u64> = (0..3).map(|_| derived.next_seed()).collect();

    let mut observed = Vec::new();
    for _ in 0..3 {
        observed.push(seeded.run(&scenarios[1]).await);
    }
    assert_eq!(observed, expected);
}

#[tokio::test]
async fn test_fixed_seed_reuses_base_seed() {
    let scenarios = discovered();
    let seeded = Seeded::start("replay", true, &scenarios).await;
    let base = seeded.plugin.base_seed(scenarios[0].unique_id()).unwrap();

    for _ in 0..3 {
        assert_eq!(seeded.run(&scenarios[0]).await, base);
    }
}

#[tokio::test]
async fn test_shared_generator_is_reseeded_per_execution() {
    let scenarios = discovered();
    let seeded = Seeded::start("replay", false, &scenarios).await;

    let seed = seeded.run(&scenarios[2]).await;
    let observed = seeded.random.random_int(0, u64::MAX);

    let mut expected = StandardRandomGenerator::new(seed);
    assert_eq!(observed, expected.random_int(0, u64::MAX));
}

#[tokio::test]
async fn test_dynamic_scenarios_are_reproducible() {
    let scenarios = discovered();
    let late_one = make_scenario("late_one");
    let late_two = make_scenario("late_two");

    let first = Seeded::start("replay", false, &scenarios).await;
    let a1 = first.run(&late_one).await;
    let b1 = first.run(&late_two).await;

    // Scenario bodies drawing from the shared generator in between must not
    // shift the overflow sequence
    let second = Seeded::start("replay", false, &scenarios).await;
    second.run(&scenarios[0]).await;
    second.random.random_int(0, 100);
    let a2 = second.run(&late_one).await;
    second.random.random_int(0, 100);
    second.random.random_int(0, 100);
    let b2 = second.run(&late_two).await;

    assert_eq!(a1, a2);
    assert_eq!(b1, b2);
    assert_ne!(
        first.plugin.base_seed(late_one.unique_id()),
        first.plugin.base_seed(late_two.unique_id())
    );
}

#[tokio::test]
async fn test_discovered_seed_independent_of_execution_order() {
    let scenarios = discovered();

    let forward = Seeded::start("replay", false, &scenarios).await;
    let forward_c = {
        forward.run(&scenarios[0]).await;
        forward.run(&scenarios[2]).await
    };

    let backward = Seeded::start("replay", false, &scenarios).await;
    let backward_c = backward.run(&scenarios[2]).await;

    assert_eq!(forward_c, backward_c);
}

#[tokio::test]
async fn test_cleanup_prints_replay_seed_when_something_ran() {
    let seeded = Seeded::start("replay", false, &discovered()).await;

    let report = make_report_with(vec![make_result("a").mark_passed()]);
    seeded
        .dispatcher
        .fire(&Event::Cleanup {
            report: report.clone(),
        })
        .await
        .unwrap();
    assert_eq!(report.lock().summary(), ["--seed replay"]);

    let empty = make_report();
    seeded
        .dispatcher
        .fire(&Event::Cleanup {
            report: empty.clone(),
        })
        .await
        .unwrap();
    assert!(empty.lock().summary().is_empty());
}
