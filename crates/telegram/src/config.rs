use {
    relaybot_relay::SenderId,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    teloxide::types::ParseMode,
};

/// How relayed captions are interpreted by Telegram.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptionFormat {
    /// Send captions as-is.
    Plain,
    /// Telegram's legacy Markdown.
    #[default]
    Markdown,
    Html,
}

impl CaptionFormat {
    #[allow(deprecated)]
    pub fn parse_mode(self) -> Option<ParseMode> {
        match self {
            Self::Plain => None,
            Self::Markdown => Some(ParseMode::Markdown),
            Self::Html => Some(ParseMode::Html),
        }
    }
}

/// The `[telegram]` section of the process config.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramBotConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// User ids that are always authorized and may manage the authorized-user set.
    pub owners: Vec<u64>,

    pub caption_format: CaptionFormat,

    /// Long-polling timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,
}

impl TelegramBotConfig {
    /// Read the section from the untyped config value. A missing section
    /// yields the defaults.
    pub fn from_value(value: &serde_json::Value) -> anyhow::Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("invalid [telegram] config: {e}"))
    }

    pub fn is_owner(&self, sender: SenderId) -> bool {
        self.owners.contains(&sender.0)
    }

    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for TelegramBotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBotConfig")
            .field("token", &"[REDACTED]")
            .field("owners", &self.owners)
            .field("caption_format", &self.caption_format)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramBotConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            owners: Vec::new(),
            caption_format: CaptionFormat::default(),
            poll_timeout_secs: 30,
        }
    }
}
