//! Routing options and their TOML representation.

use {
    crate::pools::PoolId,
    anyhow::{Context, Result, ensure},
    serde::Deserialize,
    std::path::Path,
};

/// Bounds for candidate path discovery.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct GraphTraversalConfig {
    /// Maximum number of hops of any path.
    pub max_depth: usize,

    /// Maximum number of hops of a path without linear pools.
    pub max_non_boosted_path_depth: usize,

    /// Maximum number of intermediate tokens of a boosted path that are not
    /// held by one of its linear pools.
    pub max_non_boosted_hop_tokens_in_boosted_path: usize,

    /// Number of ranked candidates kept after discovery. Direct paths are
    /// always kept on top of these.
    pub approx_paths_to_return: usize,

    /// Restricts discovery to these pools when set.
    pub pool_ids_to_include: Option<Vec<PoolId>>,
}

impl Default for GraphTraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_non_boosted_path_depth: 3,
            max_non_boosted_hop_tokens_in_boosted_path: 2,
            approx_paths_to_return: 5,
            pool_ids_to_include: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct SwapOptions {
    pub graph_traversal_config: GraphTraversalConfig,

    /// Maximum number of paths a swap is split across.
    pub max_paths: usize,

    /// Rounds of moving amounts between paths after the initial split.
    pub refinement_iterations: usize,
}

impl Default for SwapOptions {
    fn default() -> Self {
        Self {
            graph_traversal_config: Default::default(),
            max_paths: 3,
            refinement_iterations: 6,
        }
    }
}

impl SwapOptions {
    /// Reads options from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading swap options from {path:?}"))?;
        let options: Self = toml::from_str(&data)
            .with_context(|| format!("parsing swap options from {path:?}"))?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.max_paths > 0, "max-paths must be positive");
        ensure!(
            self.graph_traversal_config.max_depth > 0,
            "max-depth must be positive"
        );
        Ok(())
    }
}
