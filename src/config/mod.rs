use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Source file resolution
    pub source: SourceConfig,

    /// Download settings
    pub fetch: FetchConfig,

    /// Audio extraction settings
    pub transcode: TranscodeConfig,

    /// Speech-to-text service settings
    pub transcription: TranscriptionConfig,

    /// Callback delivery settings
    pub notify: NotifyConfig,

    /// Worker pool sizing
    pub workers: WorkerConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Prefix the file id is appended to when building the download URL
    pub export_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-download timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Run ffmpeg before transcription; when false files are submitted as-is
    pub enabled: bool,

    /// ffmpeg executable name or path
    pub ffmpeg_path: String,

    /// Output audio bitrate
    pub bitrate: String,

    /// Output sample rate in Hz
    pub sample_rate: u32,

    /// Upper bound on a single ffmpeg run in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,

    /// Whisper model name
    pub model: String,

    /// Largest audio file the service accepts, in bytes
    pub max_file_size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Callback request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of jobs running at once
    pub concurrency: usize,

    /// Maximum number of accepted jobs waiting for a worker
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory for per-job staging directories (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            source: SourceConfig {
                export_url: "https://drive.google.com/uc?export=download&id=".to_string(),
            },
            fetch: FetchConfig { timeout_secs: 300 },
            transcode: TranscodeConfig {
                enabled: true,
                ffmpeg_path: "ffmpeg".to_string(),
                bitrate: "192k".to_string(),
                sample_rate: 22050,
                timeout_secs: 600,
            },
            transcription: TranscriptionConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "whisper-1".to_string(),
                max_file_size_bytes: 25 * 1024 * 1024,
            },
            notify: NotifyConfig { timeout_secs: 30 },
            workers: WorkerConfig {
                concurrency: 4,
                queue_capacity: 32,
            },
            app: AppConfig { temp_dir: None },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Config::default().server
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Config::default().source
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Config::default().fetch
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Config::default().transcode
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Config::default().transcription
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Config::default().notify
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Config::default().workers
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Config::default().app
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            tracing::debug!(path = %config_path.display(), "Loaded configuration file");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("vidscribe").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers.concurrency == 0 {
            anyhow::bail!("workers.concurrency must be at least 1");
        }

        if self.workers.queue_capacity == 0 {
            anyhow::bail!("workers.queue_capacity must be at least 1");
        }

        if self.transcription.max_file_size_bytes == 0 {
            anyhow::bail!("transcription.max_file_size_bytes must be positive");
        }

        for (name, value) in [
            ("fetch.timeout_secs", self.fetch.timeout_secs),
            ("notify.timeout_secs", self.notify.timeout_secs),
            ("transcode.timeout_secs", self.transcode.timeout_secs),
        ] {
            if value == 0 {
                anyhow::bail!("{} must be positive", name);
            }
        }

        for (name, value) in [
            ("transcription.base_url", &self.transcription.base_url),
            ("source.export_url", &self.source.export_url),
        ] {
            let parsed = Url::parse(value)
                .with_context(|| format!("{} is not a valid URL: {}", name, value))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("{} must use HTTP or HTTPS protocol", name);
            }
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen Address: {}:{}", self.server.host, self.server.port);
        println!("  Export URL: {}", self.source.export_url);
        println!("  Fetch Timeout: {}s", self.fetch.timeout_secs);
        println!("  Transcode: {}", if self.transcode.enabled { "enabled" } else { "disabled" });
        if self.transcode.enabled {
            println!("  ffmpeg: {} ({} @ {} Hz)", self.transcode.ffmpeg_path, self.transcode.bitrate, self.transcode.sample_rate);
        }
        println!("  Transcription: {} ({})", self.transcription.base_url, self.transcription.model);
        println!("  Max Audio Size: {}", crate::utils::format_file_size(self.transcription.max_file_size_bytes));
        println!("  Workers: {} (queue {})", self.workers.concurrency, self.workers.queue_capacity);
        if let Some(dir) = &self.app.temp_dir {
            println!("  Temp Dir: {}", dir.display());
        }
    }

    /// Directory under which per-job staging directories are created
    pub fn staging_root(&self) -> PathBuf {
        self.app.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify.timeout_secs)
    }
}
