use std::{
    fmt,
    path::{Path, PathBuf},
};

use hf_hub::{
    Repo, RepoType,
    api::sync::{ApiBuilder, ApiRepo},
};

use crate::{config::ModelSource, error::LoadError};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const GENERATION_CONFIG_FILE: &str = "generation_config.json";

/// Local paths of a model artifact and its tokenizer, both fetched from one
/// repository handle.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
    /// Not every repository ships one.
    pub generation_config: Option<PathBuf>,
}

pub fn fetch(
    source: &ModelSource,
    model_file: &str,
    cache_dir: Option<&Path>,
) -> Result<ModelFiles, LoadError> {
    let repo = open_repo(source, cache_dir)?;
    let tokenizer = download(&repo, TOKENIZER_FILE)?;
    let generation_config = match download(&repo, GENERATION_CONFIG_FILE) {
        Ok(path) => Some(path),
        Err(err) => {
            tracing::debug!(error = %err, "no generation config; using tokenizer stop tokens");
            None
        }
    };
    let model = repo.get(model_file).map_err(|e| {
        let err = missing_artifact(&source.model_id, model_file, e);
        tracing::warn!(error = %err, "model artifact unavailable");
        err
    })?;
    Ok(ModelFiles {
        model,
        tokenizer,
        generation_config,
    })
}

/// End-of-sequence ids declared by a `generation_config.json`. The field is
/// either a single id or a list; anything else declares nothing.
pub fn declared_eos_ids(raw: &str) -> Result<Vec<u32>, LoadError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| LoadError::Hub(format!("{GENERATION_CONFIG_FILE}: {e}")))?;
    let ids: Vec<u64> = match value.get("eos_token_id") {
        Some(serde_json::Value::Number(n)) => n.as_u64().into_iter().collect(),
        Some(serde_json::Value::Array(items)) => {
            items.iter().filter_map(serde_json::Value::as_u64).collect()
        }
        _ => Vec::new(),
    };
    Ok(ids.into_iter().filter_map(|id| u32::try_from(id).ok()).collect())
}

fn missing_artifact(model_id: &str, model_file: &str, err: impl fmt::Display) -> LoadError {
    LoadError::Hub(format!(
        "{model_file}: {err}; set MODEL_FILE to a TorchScript artifact present in {model_id}"
    ))
}

fn open_repo(source: &ModelSource, cache_dir: Option<&Path>) -> Result<ApiRepo, LoadError> {
    let mut builder = ApiBuilder::new().with_token(source.access_token.clone());
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir.to_path_buf());
    }
    let api = builder
        .build()
        .map_err(|e| LoadError::Hub(format!("hub client init failed: {e}")))?;

    let repo = match source.revision.as_ref() {
        Some(rev) => Repo::with_revision(source.model_id.clone(), RepoType::Model, rev.clone()),
        None => Repo::model(source.model_id.clone()),
    };
    Ok(api.repo(repo))
}

fn download(repo: &ApiRepo, filename: &str) -> Result<PathBuf, LoadError> {
    tracing::debug!(filename, "fetching model artifact");
    repo.get(filename)
        .map_err(|e| LoadError::Hub(format!("{filename}: {e}")))
}
