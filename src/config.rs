use serde::{Deserialize, Serialize};

/// Graph construction knobs. Kept small and explicit.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GraphConfig {
    /// Graph name, used in diagnostics and dot output (`None` = "graph").
    pub name: Option<String>,

    /// Packet-count cap for pipes created by `Graph::connect` (0 = uncapped).
    #[serde(default)]
    pub default_max_length: usize,

    /// Byte-weight cap for pipes created by `Graph::connect` (0 = uncapped).
    #[serde(default)]
    pub default_max_weight: usize,
}
