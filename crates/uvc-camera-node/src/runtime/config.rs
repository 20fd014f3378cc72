use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read `path` and deserialize it as the node's YAML config type.
pub fn load_config<C: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<C> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_yaml::from_str(&yaml).with_context(|| format!("parsing config {}", path.display()))
}
