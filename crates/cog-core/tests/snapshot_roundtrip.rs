//! Snapshot round-trip tests
//!
//! Restoring a snapshot and continuing must be indistinguishable from
//! never having snapshotted, and corruption must fail loudly without
//! touching the running world.

use cog_core::{load_snapshot_from_file, write_snapshot_to_dir, Config, CoreError, Simulation};
use cog_core::snapshot::SnapshotHandle;
use cog_events::{Stimulus, StimulusCategory};

fn test_config(seed: u64, agents: usize) -> Config {
    let mut config = Config::default();
    config.simulation.seed = seed;
    config.simulation.agent_count = agents;
    config.simulation.snapshot_interval = 0;
    config
}

fn advance(sim: &mut Simulation, ticks: u64) {
    for _ in 0..ticks {
        sim.advance_tick(&[]).expect("tick should not fail");
    }
}

#[test]
fn restore_is_a_noop_for_future_determinism() {
    let mut sim = Simulation::initialize(test_config(42, 10)).unwrap();
    advance(&mut sim, 20);
    // Residual sentiment is part of the captured state too.
    sim.advance_tick(&[Stimulus::new(StimulusCategory::Sentiment, 0.6)])
        .unwrap();
    advance(&mut sim, 4);

    let handle = sim.snapshot("midpoint").unwrap();
    advance(&mut sim, 25);
    let original_hash = sim.state_hash().unwrap();
    let original_events = sim.event_count();

    sim.restore(&handle).unwrap();
    assert_eq!(sim.current_tick(), 25);
    advance(&mut sim, 25);

    assert_eq!(sim.state_hash().unwrap(), original_hash);
    assert_eq!(sim.event_count(), original_events);
}

#[test]
fn unknown_handle_is_a_distinct_error() {
    let mut sim = Simulation::initialize(test_config(42, 6)).unwrap();
    let missing = SnapshotHandle {
        snapshot_id: "snap_999999".to_string(),
        tick: 0,
        content_hash: 0,
    };
    assert!(matches!(
        sim.restore(&missing),
        Err(CoreError::UnknownSnapshot(_))
    ));
}

#[test]
fn tampered_handle_hash_fails_integrity() {
    let mut sim = Simulation::initialize(test_config(42, 6)).unwrap();
    advance(&mut sim, 5);
    let mut handle = sim.snapshot("checkpoint").unwrap();
    handle.content_hash ^= 0xDEAD_BEEF;
    assert!(matches!(sim.restore(&handle), Err(CoreError::Integrity(_))));
}

#[test]
fn snapshot_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulation::initialize(test_config(42, 8)).unwrap();
    advance(&mut sim, 10);

    let snapshot = sim.export_snapshot("persisted").unwrap();
    let path = write_snapshot_to_dir(&snapshot, dir.path()).unwrap();
    let loaded = load_snapshot_from_file(&path).unwrap();
    assert_eq!(loaded, snapshot);
}

#[test]
fn corrupted_snapshot_file_fails_and_preserves_the_world() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulation::initialize(test_config(42, 8)).unwrap();
    advance(&mut sim, 10);

    let snapshot = sim.export_snapshot("persisted").unwrap();
    let path = write_snapshot_to_dir(&snapshot, dir.path()).unwrap();

    // Flip one byte inside the agent table.
    let mut content = std::fs::read_to_string(&path).unwrap();
    let target = content.find("agent_0001").unwrap();
    content.replace_range(target..target + 10, "agent_9991");
    std::fs::write(&path, content).unwrap();

    let before = sim.state_hash().unwrap();
    match load_snapshot_from_file(&path) {
        Err(CoreError::Integrity(_)) => {}
        other => panic!("expected integrity failure, got {:?}", other.map(|s| s.meta)),
    }
    assert_eq!(sim.state_hash().unwrap(), before);
}

#[test]
fn restore_resets_transient_tick_state() {
    let mut sim = Simulation::initialize(test_config(9, 8)).unwrap();
    advance(&mut sim, 12);
    let handle = sim.snapshot("mid").unwrap();
    advance(&mut sim, 3);

    sim.restore(&handle).unwrap();
    // The next tick after restore continues the sequence cleanly.
    let result = sim.advance_tick(&[]).unwrap();
    assert_eq!(result.tick, 13);
}
