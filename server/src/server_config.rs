use config::Config;
use serde::Deserialize;
use std::{env, path::Path};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Inbox messages newer than this many days are considered
    pub lookback_days: i64,
    pub max_messages: u32,
    pub max_proposed_labels: usize,
    /// Bodies are truncated to this length before classification
    pub body_char_limit: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            lookback_days: 14,
            max_messages: 100,
            max_proposed_labels: 4,
            body_char_limit: 8_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub default_timezone: String,
    pub default_window_start: String,
    pub default_window_end: String,
    pub default_interval_minutes: i32,
    /// Run the sweep from an in-process job in addition to the HTTP entry point
    pub in_process_cron: bool,
    pub cron_every_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_timezone: "America/New_York".to_string(),
            default_window_start: "07:00".to_string(),
            default_window_end: "21:00".to_string(),
            default_interval_minutes: 60,
            in_process_cron: true,
            cron_every_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestTrigger {
    /// Send a digest after a run that created at least one draft
    DraftsCreated,
    /// Send a digest after a run that processed at least one message
    AnyProcessed,
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub trigger: DigestTrigger,
    pub lookback_hours: i64,
    /// Subjects containing any of these markers are excluded from triage
    /// and from the digest's own input set
    pub subject_markers: Vec<String>,
    pub recipient_override: Option<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            trigger: DigestTrigger::DraftsCreated,
            lookback_hours: 24,
            subject_markers: vec![
                "AI Email Summary".to_string(),
                "Inbox Summary".to_string(),
                "AI Gmail Agent Summary".to_string(),
            ],
            recipient_override: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub id: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: "sonar-pro".to_string(),
            temperature: 0.2,
            max_tokens: 800,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    pub token_uri: String,
    #[serde(skip)]
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    triage: TriageConfig,
    #[serde(default)]
    schedule: ScheduleConfig,
    #[serde(default)]
    digest: DigestConfig,
    #[serde(default)]
    model: ModelConfig,
    #[serde(default)]
    gmail: GmailConfig,
}

#[derive(Debug)]
pub struct ServerConfig {
    pub triage: TriageConfig,
    pub schedule: ScheduleConfig,
    pub digest: DigestConfig,
    pub model: ModelConfig,
    pub gmail: GmailConfig,
    /// Shared secret for the cron/jobs endpoints. Missing config is a 500
    /// at request entry, not a startup failure.
    pub cron_secret: Option<String>,
    /// Base URL the runner uses to dispatch triage requests back into
    /// this deployment
    pub app_url: Option<Url>,
    pub sonar_api_key: Option<String>,
    /// Overrides the Gmail sendAs signature when set
    pub signature_override: Option<String>,
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let root = env::var("APP_DIR").unwrap_or_else(|_| {
            let dir =
                env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR or APP_DIR is required");
            let dir = Path::new(&dir).parent().unwrap().display().to_string();
            format!("{}/config", dir)
        });
        let path = format!("{root}/config.toml");

        let cfg_file: ConfigFile = Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .build()?
            .try_deserialize()?;

        let ConfigFile {
            triage,
            schedule,
            digest,
            model,
            mut gmail,
        } = cfg_file;

        gmail.client_id = env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
        gmail.client_secret = env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();

        let app_url = match env::var("APP_URL") {
            Ok(raw) => Some(Url::parse(&raw)?),
            Err(_) => None,
        };

        Ok(ServerConfig {
            triage,
            schedule,
            digest,
            model,
            gmail,
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            app_url,
            sonar_api_key: env::var("SONAR_API_KEY").ok().filter(|s| !s.is_empty()),
            signature_override: env::var("CUSTOM_SIGNATURE_HTML")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            triage: TriageConfig::default(),
            schedule: ScheduleConfig::default(),
            digest: DigestConfig::default(),
            model: ModelConfig::default(),
            gmail: GmailConfig::default(),
            cron_secret: None,
            app_url: None,
            sonar_api_key: None,
            signature_override: None,
        }
    }
}
