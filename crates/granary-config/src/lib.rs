use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::error;
use walkdir::WalkDir;

mod policies;

pub use policies::{
    BadRecordPolicy, EmptyListPolicy, NullPolicy, NumberPolicy, Policies,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub metadata: Metadata,
    pub spec: Spec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Pipeline name (unique)
    pub name: String,

    /// Business oriented tenant identifier
    #[serde(default)]
    pub tenant: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Spec {
    /// Routing and inference policy knobs.
    pub policies: Policies,

    /// Multi sink config
    pub sinks: Vec<SinkCfg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkCfg {
    /// Append rows as JSON lines under `dir/<table>.ndjson`, schema beside it.
    Ndjson { id: String, dir: String },

    /// Serialize rows to standard output. Debugging aid.
    Stdout { id: String },

    /// Keep rows in memory. Dry runs and tests.
    Memory { id: String },
}

impl SinkCfg {
    pub fn id(&self) -> &str {
        match self {
            SinkCfg::Ndjson { id, .. } => id,
            SinkCfg::Stdout { id } => id,
            SinkCfg::Memory { id } => id,
        }
    }
}

pub fn load_from_path(file_path: &str) -> Result<PipelineSpec> {
    let raw = fs::read_to_string(file_path)
        .with_context(|| format!("reading config {file_path}"))?;
    let with_env = shellexpand::env(&raw)
        .with_context(|| "expanding env variables in config")?
        .to_string();
    let spec: PipelineSpec =
        serde_yaml::from_str(&with_env).with_context(|| "parsing yaml")?;

    Ok(spec)
}

pub fn load_from_dir(dir_path: &str) -> Result<Vec<PipelineSpec>> {
    let mut specs = Vec::<PipelineSpec>::new();
    for entry in WalkDir::new(dir_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        if let Some(path_str) = entry.path().to_str() {
            let spec = load_from_path(path_str).with_context(|| {
                format!("loading pipeline from {:?}", entry.path())
            })?;
            specs.push(spec);
        } else {
            error!(file=%entry.path().display(), "skipping file in config dir")
        }
    }

    Ok(specs)
}

pub fn load_cfg(path: &str) -> Result<Vec<PipelineSpec>> {
    let cfg_path = std::path::Path::new(path);

    match cfg_path.is_dir() {
        true => load_from_dir(path),
        false => {
            let spec = load_from_path(path)?;
            Ok(vec![spec])
        }
    }
}
