use crate::models::GraphQuery;

/// Resolve a project-tab query key to its render targets.
pub fn project_query(key: &str, project_id: &str) -> Option<GraphQuery> {
    let metric = match key {
        "project_allocated_instances" => "instances",
        "project_allocated_cpu" => "cpu",
        "project_allocated_memory" => "memory",
        "project_allocated_ephemeral_disk" => "disk",
        _ => return None,
    };
    Some(GraphQuery::single(format!(
        "aliasByNode(keepLastValue(projects.{}.cloud_usage.*.{}), 3)",
        project_id, metric
    )))
}

/// Resolve an instance-tab query key to its render targets.
pub fn instance_query(key: &str, project_id: &str, instance_id: &str) -> Option<GraphQuery> {
    let base = format!("projects.{}.instances.{}", project_id, instance_id);
    let query = match key {
        "instance_actual_cpu_time" => GraphQuery::single(format!(
            "aliasByNode(derivative(summarize({}.cpu.cpu_time, '10min', 'avg')), 5)",
            base
        )),
        "instance_actual_memory" => GraphQuery::with_floor(vec![
            format!("aliasByNode(scale({}.memory.available, 1024), 5)", base),
            format!("aliasByNode(scale({}.memory.used, 1024), 5)", base),
        ]),
        "instance_actual_network_bytes" => GraphQuery::with_floor(vec![
            format!("aliasByNode(derivative(summarize({}.interface.eth0.rx_bytes, '10min', 'max')), 6)", base),
            format!("aliasByNode(derivative(summarize({}.interface.eth0.tx_bytes, '10min', 'max')), 6)", base),
        ]),
        "instance_actual_disk_usage" => {
            GraphQuery::with_floor(vec![format!("aliasByNode({}.disk.vda.bytes_used, 6)", base)])
        }
        "instance_actual_disk_io" => GraphQuery::with_floor(vec![
            format!("aliasByNode(derivative(summarize({}.disk.vda.wr_req, '10min', 'avg')), 6)", base),
            format!("aliasByNode(derivative(summarize({}.disk.vda.rd_req, '10min', 'avg')), 6)", base),
        ]),
        _ => return None,
    };
    Some(query)
}

/// Hourly-summed account size for one project's object storage.
pub fn object_storage_usage_query(project_id: &str) -> GraphQuery {
    GraphQuery::single(format!(
        "aliasByNode(smartSummarize(sumSeries(swift.*.project.{}.account_size), '1h', 'sum'), 4)",
        project_id
    ))
}
