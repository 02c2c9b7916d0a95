use std::sync::Arc;

use anyhow::Result;

use crate::error::Error;
use crate::fixtures::{auto_resource, master_slave, names, state_map, state_model};
use crate::models::{AssignmentMode, ClusterSnapshot, ResourceConfig, STATE_DROPPED};
use crate::stages::{compute_best_possible_state, BestPossibleStateStage, ClusterEvent, ResourceComputationStage, Stage};

fn snapshot(live: &[&str], ideal_states: Vec<ResourceConfig>) -> ClusterSnapshot {
    ClusterSnapshot {
        live_instances: names(live),
        ideal_states,
        state_model_defs: vec![master_slave(), state_model("OnlineOffline", &[("ONLINE", "R"), ("OFFLINE", "N")])],
        ..Default::default()
    }
}

#[test]
fn computes_target_for_every_partition() {
    let snapshot = snapshot(&["a", "b", "c"], vec![auto_resource("db", "MasterSlave", &[("db_0", &["a", "b", "c"]), ("db_1", &["c", "b", "a"])])]);

    let (output, errors) = compute_best_possible_state(&snapshot, &snapshot.resources());

    assert!(errors.is_empty(), "expected no errors, got {:?}", errors);
    let db_0 = output.state_map("db", "db_0").cloned().unwrap_or_default();
    let db_1 = output.state_map("db", "db_1").cloned().unwrap_or_default();
    assert_eq!(db_0, state_map(&[("a", "MASTER"), ("b", "SLAVE"), ("c", "SLAVE")]));
    assert_eq!(db_1, state_map(&[("c", "MASTER"), ("b", "SLAVE"), ("a", "SLAVE")]));
}

#[test]
fn placeholder_preference_list_uses_live_instances() {
    let snapshot = snapshot(&["b", "a"], vec![auto_resource("db", "MasterSlave", &[("db_0", &[""])])]);

    let (output, _) = compute_best_possible_state(&snapshot, &snapshot.resources());

    let db_0 = output.state_map("db", "db_0").cloned().unwrap_or_default();
    assert_eq!(db_0, state_map(&[("b", "MASTER"), ("a", "SLAVE")]));
}

#[test]
fn deleted_resource_is_drained_using_recorded_state_model() {
    let mut snapshot = snapshot(&["a", "b"], vec![]);
    snapshot.current_state.set_state("db", "db_0", "a", "MASTER");
    snapshot.current_state.set_state("db", "db_0", "b", "SLAVE");
    snapshot.current_state.set_state_model_def("db", "MasterSlave");

    let (output, errors) = compute_best_possible_state(&snapshot, &snapshot.resources());

    assert!(errors.is_empty(), "expected no errors, got {:?}", errors);
    let db_0 = output.state_map("db", "db_0").cloned().unwrap_or_default();
    assert_eq!(db_0, state_map(&[("a", STATE_DROPPED), ("b", STATE_DROPPED)]));
}

#[test]
fn deleted_resource_without_recorded_state_model_is_reported() {
    let mut snapshot = snapshot(&["a"], vec![]);
    snapshot.current_state.set_state("db", "db_0", "a", "MASTER");

    let (output, errors) = compute_best_possible_state(&snapshot, &snapshot.resources());

    assert!(output.is_empty(), "expected empty output, got {:?}", output);
    assert!(matches!(errors.as_slice(), [Error::MissingStateModelRef { resource }] if resource == "db"), "unexpected errors {:?}", errors);
}

#[test]
fn unknown_state_model_skips_only_that_resource() {
    let snapshot = snapshot(
        &["a", "b"],
        vec![
            auto_resource("db", "MasterSlave", &[("db_0", &["a", "b"])]),
            auto_resource("log", "LeaderStandby", &[("log_0", &["a", "b"])]),
        ],
    );

    let (output, errors) = compute_best_possible_state(&snapshot, &snapshot.resources());

    assert!(output.resource("log").is_none(), "expected resource with unknown state model to be excluded");
    assert!(output.state_map("db", "db_0").is_some(), "expected other resources to be computed");
    assert!(
        matches!(errors.as_slice(), [Error::UnknownStateModel { resource, state_model }] if resource == "log" && state_model == "LeaderStandby"),
        "unexpected errors {:?}",
        errors
    );
}

#[test]
fn customized_resource_passes_explicit_map_through() {
    let mut config = auto_resource("db", "MasterSlave", &[]);
    config.mode = AssignmentMode::Customized;
    // Two masters and a dead worker: no capacity or liveness checks are applied.
    config
        .instance_state_maps
        .insert("db_0".into(), state_map(&[("a", "MASTER"), ("b", "MASTER"), ("z", "SLAVE")]));
    let snapshot = snapshot(&["a", "b"], vec![config]);

    let (output, errors) = compute_best_possible_state(&snapshot, &snapshot.resources());

    assert!(errors.is_empty(), "expected no errors, got {:?}", errors);
    let db_0 = output.state_map("db", "db_0").cloned().unwrap_or_default();
    assert_eq!(db_0, state_map(&[("a", "MASTER"), ("b", "MASTER"), ("z", "SLAVE")]));
}

#[test]
fn customized_partition_without_map_has_empty_target() {
    let mut config = auto_resource("db", "MasterSlave", &[]);
    config.mode = AssignmentMode::Customized;
    config.instance_state_maps.insert("db_0".into(), state_map(&[("a", "MASTER")]));
    let mut snapshot = snapshot(&["a"], vec![config]);
    snapshot.current_state.set_state("db", "db_1", "a", "SLAVE");

    let (output, _) = compute_best_possible_state(&snapshot, &snapshot.resources());

    assert_eq!(output.state_map("db", "db_1").cloned(), Some(Default::default()));
}

#[test]
fn partition_missing_from_config_drops_reported_workers() {
    let mut snapshot = snapshot(&["a", "b"], vec![auto_resource("db", "MasterSlave", &[("db_0", &["a", "b"])])]);
    snapshot.current_state.set_state("db", "db_9", "b", "SLAVE");

    let (output, _) = compute_best_possible_state(&snapshot, &snapshot.resources());

    let db_9 = output.state_map("db", "db_9").cloned().unwrap_or_default();
    assert_eq!(db_9, state_map(&[("b", STATE_DROPPED)]));
}

#[test]
fn repeated_passes_are_identical() -> Result<()> {
    let mut snapshot = snapshot(
        &["a", "b", "c", "d"],
        vec![
            auto_resource("db", "MasterSlave", &[("db_0", &["a", "b", "c"]), ("db_1", &[""])]),
            auto_resource("cache", "OnlineOffline", &[("cache_0", &["d", "c"])]),
        ],
    );
    snapshot.current_state.set_state("db", "db_0", "b", "ERROR");
    snapshot.current_state.set_state("db", "db_1", "z", "SLAVE");

    let (first, _) = compute_best_possible_state(&snapshot, &snapshot.resources());
    let (second, _) = compute_best_possible_state(&snapshot, &snapshot.resources());

    assert_eq!(serde_json::to_string(&first)?, serde_json::to_string(&second)?);
    Ok(())
}

#[test]
fn stage_requires_resources() {
    let mut event = ClusterEvent::new("test", Arc::new(snapshot(&["a"], vec![])));

    let res = BestPossibleStateStage.process(&mut event);

    assert!(matches!(res, Err(Error::MissingAttributes(_))), "expected missing attributes error, got {:?}", res);
    assert!(event.best_possible_state.is_none());
}

#[test]
fn stage_records_output_and_resource_errors() -> Result<()> {
    let snapshot = snapshot(
        &["a", "b"],
        vec![
            auto_resource("db", "MasterSlave", &[("db_0", &["a", "b"])]),
            auto_resource("log", "LeaderStandby", &[("log_0", &["a"])]),
        ],
    );
    let mut event = ClusterEvent::new("test", Arc::new(snapshot));

    ResourceComputationStage.process(&mut event)?;
    BestPossibleStateStage.process(&mut event)?;

    let output = event.best_possible_state.as_ref().expect("best possible state recorded");
    assert_eq!(output.state("db", "db_0", "a"), Some("MASTER"));
    assert_eq!(output.state("db", "db_0", "b"), Some("SLAVE"));
    assert_eq!(event.resource_errors.len(), 1, "expected 1 resource error, got {:?}", event.resource_errors);
    Ok(())
}
