use super::node::LocalView;

/// Plaintext gauges in `name value` lines.
pub fn report_metrics(view: &LocalView) -> String {
    let mut body = String::new();
    body.push_str(&format!("instances_count {}\n", view.members.len()));
    body.push_str(&format!("workload_mib {}\n", view.workload.total_size));
    body.push_str(&format!("chunksize_mib {}\n", view.workload.chunk_size));
    body
}
