use std::collections::BTreeMap;

use crate::models::{AssignmentMode, ResourceConfig, StateModelDefinition, StateModelRecord};

/// Build a state model from `(state, capacity)` pairs given in priority order.
pub fn state_model(name: &str, states: &[(&str, &str)]) -> StateModelDefinition {
    let record = StateModelRecord {
        name: name.into(),
        states: states.iter().map(|(state, _)| state.to_string()).collect(),
        counts: states.iter().map(|(state, count)| (state.to_string(), count.to_string())).collect(),
        initial_state: None,
    };
    StateModelDefinition::try_from(record).expect("valid fixture state model")
}

/// The canonical `MasterSlave` model: one master, every other candidate a slave.
pub fn master_slave() -> StateModelDefinition {
    state_model("MasterSlave", &[("MASTER", "1"), ("SLAVE", "R")])
}

/// Build a list of worker names.
pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Build a worker to state map.
pub fn state_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries.iter().map(|(worker, state)| (worker.to_string(), state.to_string())).collect()
}

/// Build an `AUTO` mode resource with the given preference lists.
pub fn auto_resource(name: &str, state_model: &str, lists: &[(&str, &[&str])]) -> ResourceConfig {
    ResourceConfig {
        name: name.into(),
        state_model_def_ref: state_model.into(),
        mode: AssignmentMode::Auto,
        preference_lists: lists.iter().map(|(partition, list)| (partition.to_string(), names(list))).collect(),
        ..Default::default()
    }
}
