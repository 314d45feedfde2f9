use std::{
    env, fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_MODEL_ID: &str = "meta-llama/Meta-Llama-3-70B-Instruct";
pub const DEFAULT_MODEL_FILE: &str = "model.ts";
const DEFAULT_PORT: u16 = 5000;

/// Where the model and its tokenizer are acquired from. Both artifacts are
/// always resolved through the same source.
#[derive(Clone)]
pub struct ModelSource {
    pub model_id: String,
    pub revision: Option<String>,
    pub access_token: Option<String>,
}

impl fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSource")
            .field("model_id", &self.model_id)
            .field("revision", &self.revision)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub source: ModelSource,
    pub model_file: String,
    pub cache_dir: Option<PathBuf>,
    pub generation_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("SERVER_ADDR")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT));

        let model_id = lookup("MODEL_ID")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
        let revision = lookup("MODEL_REVISION").filter(|v| !v.trim().is_empty());
        let access_token = lookup("HF_TOKEN").filter(|v| !v.trim().is_empty());

        let model_file = lookup("MODEL_FILE").unwrap_or_else(|| DEFAULT_MODEL_FILE.to_string());
        let cache_dir = lookup("HF_CACHE_DIR").map(PathBuf::from);

        let generation_timeout = lookup("GENERATION_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(300));

        Self {
            listen_addr,
            source: ModelSource {
                model_id,
                revision,
                access_token,
            },
            model_file,
            cache_dir,
            generation_timeout,
        }
    }
}
