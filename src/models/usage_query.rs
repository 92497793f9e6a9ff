use serde::Serialize;

/// Window offered on the usage graph pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TimeWindow {
    Week,
    TwoWeeks,
    Month,
    Quarter,
}

impl TimeWindow {
    pub fn all() -> &'static [TimeWindow] {
        &[TimeWindow::Week, TimeWindow::TwoWeeks, TimeWindow::Month, TimeWindow::Quarter]
    }

    pub fn parse(s: &str) -> Option<TimeWindow> {
        match s {
            "7d" => Some(TimeWindow::Week),
            "14d" => Some(TimeWindow::TwoWeeks),
            "30d" => Some(TimeWindow::Month),
            "90d" => Some(TimeWindow::Quarter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Week => "7d",
            TimeWindow::TwoWeeks => "14d",
            TimeWindow::Month => "30d",
            TimeWindow::Quarter => "90d",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::Week => "7 Days",
            TimeWindow::TwoWeeks => "14 Days",
            TimeWindow::Month => "30 Days",
            TimeWindow::Quarter => "90 Days",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphFormat {
    Json,
    Csv,
}

impl GraphFormat {
    pub fn parse(s: &str) -> Option<GraphFormat> {
        match s {
            "json" => Some(GraphFormat::Json),
            "csv" => Some(GraphFormat::Csv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GraphFormat::Json => "json",
            GraphFormat::Csv => "csv",
        }
    }
}

/// One render request: the `target` expressions plus an optional `yMin`.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphQuery {
    pub targets: Vec<String>,
    pub y_min: Option<i64>,
}

impl GraphQuery {
    pub fn single(target: String) -> Self {
        GraphQuery { targets: vec![target], y_min: None }
    }

    pub fn with_floor(targets: Vec<String>) -> Self {
        GraphQuery { targets, y_min: Some(0) }
    }
}

/// (label, key) pair listed on a usage tab.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct QueryOption {
    pub label: &'static str,
    pub key: &'static str,
}

pub const PROJECT_QUERIES: &[QueryOption] = &[
    QueryOption { label: "Instances", key: "project_allocated_instances" },
    QueryOption { label: "CPU", key: "project_allocated_cpu" },
    QueryOption { label: "Memory (gb)", key: "project_allocated_memory" },
    QueryOption { label: "Ephemeral Disk (gb)", key: "project_allocated_ephemeral_disk" },
];

pub const INSTANCE_QUERIES: &[QueryOption] = &[
    QueryOption { label: "CPU Time (Seconds)", key: "instance_actual_cpu_time" },
    QueryOption { label: "Memory Usage", key: "instance_actual_memory" },
    QueryOption { label: "Network (Bytes)", key: "instance_actual_network_bytes" },
    QueryOption { label: "Disk Usage", key: "instance_actual_disk_usage" },
    QueryOption { label: "Disk IO", key: "instance_actual_disk_io" },
];
