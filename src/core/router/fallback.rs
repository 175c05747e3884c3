//! Fallback chain construction (§4.11): the ordered candidate list minus
//! the head becomes the fallback chain the dispatcher walks on failure.

use crate::core::types::ModelId;

pub fn fallback_chain(ordered_ids: &[ModelId]) -> Vec<ModelId> {
    ordered_ids.iter().skip(1).cloned().collect()
}
