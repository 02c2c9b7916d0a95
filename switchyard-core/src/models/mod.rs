//! Switchyard cluster data models.
//!
//! All models here are read fresh from a cluster snapshot for each computation pass, and none
//! of them are mutated by the computation itself.

mod current_state;
mod ideal_state;
mod message;
mod output;
mod snapshot;
mod state_model;

pub use current_state::{CurrentStateSnapshot, ResourceCurrentState};
pub use ideal_state::{AssignmentMode, ResourceConfig, ResourceEntry, PREFERENCE_LIST_ALL_LIVE};
pub use message::Message;
pub use output::BestPossibleStateOutput;
pub use snapshot::{ClusterSnapshot, Resource};
pub use state_model::{
    lookup_state_model, resolve_capacity, StateCapacity, StateModelDefinition, StateModelRecord, StateSpec, CAPACITY_ALL_LIVE, CAPACITY_REPLICA_COUNT,
    STATE_DROPPED, STATE_ERROR, STATE_OFFLINE,
};
