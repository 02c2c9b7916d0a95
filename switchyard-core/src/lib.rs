//! Switchyard core.
//!
//! The decision kernel of the Switchyard controller: given a snapshot of the cluster, compute
//! the state every worker should hold for every partition, and the transitions needed to get
//! there. Everything here is a pure function of its inputs; the caller supplies snapshots and
//! owns whatever is produced.

pub mod error;
#[cfg(test)]
mod fixtures;
pub mod models;
pub mod placement;
pub mod stages;

pub use error::{CapacityError, Error};
