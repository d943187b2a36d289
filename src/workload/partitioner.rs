use super::types::WorkloadSpec;

/// Equal share of `total_size` for `instance_count` members, rounded down.
/// `None` when there is nobody to share with.
pub fn chunk_size(total_size: u64, instance_count: usize) -> Option<u64> {
    if instance_count == 0 {
        return None;
    }
    Some(total_size / instance_count as u64)
}

/// Recomputes `spec.chunk_size` for the current fleet size.
///
/// With an empty fleet the last valid chunk size is retained, so the next
/// member to register starts from a sensible value instead of zero.
/// Returns true when the chunk size changed.
pub fn recompute(spec: &mut WorkloadSpec, instance_count: usize) -> bool {
    match chunk_size(spec.total_size, instance_count) {
        Some(chunk) => {
            let changed = spec.chunk_size != chunk;
            spec.chunk_size = chunk;
            changed
        }
        None => {
            tracing::warn!(
                "No instances registered, keeping chunk size at {} MiB",
                spec.chunk_size
            );
            false
        }
    }
}
