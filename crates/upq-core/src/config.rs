use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

/// Upload transport backend: one-file-per-frame form POST, or the batch
/// backend which queues multiple files on a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Form,
    Batch,
}

/// Global configuration loaded from `~/.config/upq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpqConfig {
    /// Maximum concurrent in-flight uploads across every registered widget.
    /// Kept at 1 by default so a spare connection to the server stays free
    /// for interactive traffic, monitor polls included.
    pub max_active_uploads: usize,
    /// Default progress poll interval in milliseconds.
    pub progress_interval_ms: u64,
    /// Optional transport backend override. When missing, the backend is
    /// chosen by capability detection at startup.
    #[serde(default)]
    pub transport: Option<TransportKind>,
}

impl Default for UpqConfig {
    fn default() -> Self {
        Self {
            max_active_uploads: 1,
            progress_interval_ms: 1000,
            transport: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("upq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UpqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UpqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: UpqConfig = toml::from_str(&data)?;
    Ok(cfg)
}

fn default_true() -> bool {
    true
}

/// Per-widget upload settings: where to send files, where to poll progress,
/// and how the widget behaves between selection and admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Receiver endpoint: the multipart POST target.
    pub receiver: String,
    /// Monitor endpoint for progress queries. Defaults to the receiver.
    #[serde(default)]
    pub monitor: Option<String>,
    /// Extra key/value pairs appended to every receiver/monitor URL.
    #[serde(default)]
    pub parameters: Vec<(String, String)>,
    /// Start sending as soon as files are ready, rather than waiting for an
    /// explicit send trigger.
    #[serde(default = "default_true")]
    pub auto_send: bool,
    /// Client-side size cap in bytes. Oversized selections are ignored.
    #[serde(default)]
    pub maximum_size: Option<u64>,
    /// Poll period override in milliseconds; falls back to the global config.
    #[serde(default)]
    pub progress_interval_ms: Option<u64>,
    /// Allow selecting more files while an upload is in flight. When false the
    /// widget holds a single frame at a time and replaces it after each upload.
    #[serde(default)]
    pub queue_enabled: bool,
    /// Whether a manual submit control is rendered at all.
    #[serde(default = "default_true")]
    pub send_button_displayed: bool,
    /// Label for the manual submit control.
    #[serde(default)]
    pub send_button_text: Option<String>,
    /// Label shown on the submit control while a queued upload awaits its slot.
    #[serde(default)]
    pub send_button_wait_text: Option<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            receiver: String::new(),
            monitor: None,
            parameters: Vec::new(),
            auto_send: true,
            maximum_size: None,
            progress_interval_ms: None,
            queue_enabled: false,
            send_button_displayed: true,
            send_button_text: None,
            send_button_wait_text: None,
        }
    }
}

impl UploadSettings {
    /// Effective poll interval, widget override first, then global config.
    pub fn effective_interval_ms(&self, cfg: &UpqConfig) -> u64 {
        self.progress_interval_ms.unwrap_or(cfg.progress_interval_ms)
    }

    /// Receiver URL for one upload frame: base receiver plus `pid`, upload
    /// index `x`, and all caller-supplied parameters.
    pub fn receiver_url(&self, process_id: &str, upload_id: u64) -> Result<String> {
        service_url(&self.receiver, process_id, upload_id, &self.parameters)
    }

    /// Monitor URL for one upload frame. Falls back to the receiver endpoint
    /// when no separate monitor is configured.
    pub fn monitor_url(&self, process_id: &str, upload_id: u64) -> Result<String> {
        let base = self.monitor.as_deref().unwrap_or(&self.receiver);
        service_url(base, process_id, upload_id, &self.parameters)
    }
}

fn service_url(
    base: &str,
    process_id: &str,
    upload_id: u64,
    parameters: &[(String, String)],
) -> Result<String> {
    let mut url = Url::parse(base).with_context(|| format!("invalid service URL: {}", base))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("pid", process_id);
        query.append_pair("x", &upload_id.to_string());
        for (key, value) in parameters {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}
