//! Preference list resolution.

use crate::models::{ResourceConfig, PREFERENCE_LIST_ALL_LIVE};

/// Resolve the ordered candidate workers of a partition.
///
/// - A partition with no declared list has no candidates, and `None` is returned.
/// - A declared list consisting solely of the `""` placeholder resolves to every live worker,
///   in the order the live workers were supplied. That order is only as stable as the
///   membership enumeration of the snapshot source.
/// - Any other declared list is returned verbatim, including workers which are not live.
pub fn resolve_preference_list(partition: &str, config: &ResourceConfig, live_instances: &[String]) -> Option<Vec<String>> {
    match config.preference_list(partition)? {
        [placeholder] if placeholder == PREFERENCE_LIST_ALL_LIVE => Some(live_instances.to_vec()),
        list => Some(list.to_vec()),
    }
}
