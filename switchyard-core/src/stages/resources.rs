use crate::error::{Error, Result};
use crate::stages::{ClusterEvent, Stage};

/// A stage computing the set of managed resources from the snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResourceComputationStage;

impl Stage for ResourceComputationStage {
    fn name(&self) -> &'static str {
        "resource_computation"
    }

    #[tracing::instrument(level = "debug", skip(self, event), fields(event = %event.name))]
    fn process(&self, event: &mut ClusterEvent) -> Result<()> {
        let snapshot = event.snapshot.as_ref().ok_or(Error::MissingAttributes("SNAPSHOT"))?;
        let resources = snapshot.resources();
        tracing::debug!(resources = resources.len(), "computed managed resources");
        event.resources = Some(resources);
        Ok(())
    }
}
