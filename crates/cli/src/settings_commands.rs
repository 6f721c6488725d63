use std::sync::Arc;

use {
    clap::Subcommand,
    relaybot_config::RelaybotConfig,
    relaybot_relay::{SenderId, SettingsCache},
};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the stored relay settings.
    Show,
    /// Set the destination channel (numeric id or @username).
    SetChannel {
        #[arg(allow_hyphen_values = true)]
        channel_id: String,
    },
    /// Set the text appended to every caption.
    SetSuffix { text: String },
    /// Stop appending a caption suffix.
    ClearSuffix,
    /// Authorize a Telegram user id.
    AddUser { user_id: u64 },
    /// Revoke a Telegram user id.
    RemoveUser { user_id: u64 },
}

pub async fn handle_settings(action: SettingsAction, config: &RelaybotConfig) -> anyhow::Result<()> {
    let settings = SettingsCache::new(Arc::new(crate::open_store(config).await?));
    println!("{}", apply(&settings, action).await?);
    Ok(())
}

async fn apply(settings: &SettingsCache, action: SettingsAction) -> anyhow::Result<String> {
    let output = match action {
        SettingsAction::Show => {
            let current = settings.get().await?;
            let users = current
                .authorized_users
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            format!(
                "Destination:      {}\nCaption suffix:   {}\nAuthorized users: {}",
                current.channel_id.as_deref().unwrap_or("not set"),
                current.caption_suffix.as_deref().unwrap_or("none"),
                if users.is_empty() {
                    "none".to_string()
                } else {
                    users.join(", ")
                },
            )
        },
        SettingsAction::SetChannel { channel_id } => {
            settings.set_channel_id(&channel_id).await?;
            format!("Destination channel set to {}.", channel_id.trim())
        },
        SettingsAction::SetSuffix { text } => {
            settings.set_caption_suffix(Some(&text)).await?;
            "Caption suffix updated.".to_string()
        },
        SettingsAction::ClearSuffix => {
            settings.set_caption_suffix(None).await?;
            "Caption suffix cleared.".to_string()
        },
        SettingsAction::AddUser { user_id } => {
            if settings.add_authorized_user(SenderId(user_id)).await? {
                format!("User {user_id} authorized.")
            } else {
                format!("User {user_id} was already authorized.")
            }
        },
        SettingsAction::RemoveUser { user_id } => {
            if settings.remove_authorized_user(SenderId(user_id)).await? {
                format!("User {user_id} removed.")
            } else {
                format!("User {user_id} was not authorized.")
            }
        },
    };
    Ok(output)
}
