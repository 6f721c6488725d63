use {
    teloxide::types::{MediaKind, Message, MessageId, MessageKind},
    tracing::{debug, info, warn},
};

use relaybot_relay::{
    CaptionOutcome, ConversationId, Item, ItemId, Notice, Notifier, SenderId, compose,
};

use crate::{
    Result,
    access::{self, Permission, Role},
    commands::{self, Command, HELP_TEXT},
    link::{self, PostLink},
    state::BotState,
};

/// Handle a single inbound Telegram message (called from the polling loop).
pub async fn handle_message(msg: Message, state: &BotState) -> Result<()> {
    let Some(sender) = msg.from.as_ref().map(|u| SenderId(u.id.0)) else {
        debug!(chat_id = msg.chat.id.0, "ignoring message without sender");
        return Ok(());
    };
    let conversation = ConversationId(msg.chat.id.0);

    if let Some(text) = msg.text()
        && let Some(parsed) = commands::parse(text)
    {
        let reply = match parsed {
            Ok(command) => run_command(state, sender, command).await,
            Err(e) => e.to_string(),
        };
        state
            .outbound
            .send_text(msg.chat.id, &reply, Some(msg.id))
            .await?;
        return Ok(());
    }

    let item = extract_item(&msg, sender);
    let text = msg.text();
    if item.is_none() && text.is_none() {
        debug!(
            conversation = %conversation,
            kind = describe_media_kind(&msg).unwrap_or("service"),
            "ignoring unsupported message"
        );
        return Ok(());
    }

    let role = match access::resolve_role(&state.config, state.service.settings(), sender).await {
        Ok(role) => role,
        Err(e) => {
            warn!(sender = %sender, error = %e, "could not resolve sender role");
            notify(state, conversation, Notice::SettingsUnavailable).await;
            return Ok(());
        },
    };
    if let Err(reason) = access::check_access(role, Permission::Relay) {
        warn!(sender = %sender, conversation = %conversation, %reason, "access denied");
        return Ok(());
    }

    if let Some(item) = item {
        let outcome = state.service.on_arrival(item).await;
        debug!(conversation = %conversation, ?outcome, "item received");
        return Ok(());
    }

    if let Some(text) = text {
        handle_text(state, conversation, msg.id, text).await?;
    }
    Ok(())
}

/// Free text goes to a pending caption request first, then to the post-link
/// relay.
async fn handle_text(
    state: &BotState,
    conversation: ConversationId,
    message: MessageId,
    text: &str,
) -> Result<()> {
    match state
        .service
        .on_text(conversation, ItemId(message.0), text)
        .await
    {
        CaptionOutcome::Ignored => {},
        outcome => {
            debug!(conversation = %conversation, ?outcome, "caption handled");
            return Ok(());
        },
    }

    match link::find_post_link(text) {
        Some(link) => relay_link(state, conversation, message, text, &link).await,
        None => {
            debug!(conversation = %conversation, "text without pending caption ignored");
            Ok(())
        },
    }
}

async fn relay_link(
    state: &BotState,
    conversation: ConversationId,
    message: MessageId,
    text: &str,
    link: &PostLink,
) -> Result<()> {
    let settings = match state.service.settings().get().await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(conversation = %conversation, error = %e, "settings unavailable for link relay");
            notify(state, conversation, Notice::SettingsUnavailable).await;
            return Ok(());
        },
    };
    let Some(destination) = settings.channel_id else {
        notify(state, conversation, Notice::ChannelNotConfigured).await;
        return Ok(());
    };

    state
        .outbound
        .send_text(
            teloxide::types::ChatId(conversation.0),
            "🔄 Processing link...",
            Some(message),
        )
        .await?;

    let caption = compose(text, settings.caption_suffix.as_deref());
    let reply_to = ItemId(message.0);
    match state
        .outbound
        .relay_post(link, &destination, &caption)
        .await
    {
        Ok(()) => {
            info!(
                conversation = %conversation,
                source = %link.channel,
                post = link.message_id,
                "post link relayed"
            );
            notify(state, conversation, Notice::Relayed { reply_to }).await;
        },
        Err(e) => {
            warn!(
                conversation = %conversation,
                source = %link.channel,
                post = link.message_id,
                error = %e,
                "post link relay failed"
            );
            notify(state, conversation, Notice::RelayFailed {
                reply_to,
                reason: e.reason,
            })
            .await;
        },
    }
    Ok(())
}

async fn run_command(state: &BotState, sender: SenderId, command: Command) -> String {
    let role = match access::resolve_role(&state.config, state.service.settings(), sender).await {
        Ok(role) => role,
        Err(e) => {
            warn!(sender = %sender, error = %e, "could not resolve sender role");
            return "⚠️ Relay settings could not be loaded. Please try again later.".into();
        },
    };

    if let Some(permission) = required_permission(&command)
        && let Err(reason) = access::check_access(role, permission)
    {
        warn!(sender = %sender, ?command, %reason, "command denied");
        return format!("⛔ Sorry, {reason}.");
    }

    let settings = state.service.settings();
    match command {
        Command::Start | Command::Help => help_text(sender, role),
        Command::Settings => match settings.get().await {
            Ok(current) => {
                let timing = state.service.timing();
                let users = join_ids(current.authorized_users.iter().map(|u| u.0));
                let owners = join_ids(state.config.owners.iter().copied());
                format!(
                    "Destination: {}\nCaption suffix: {}\nAuthorized users: {}\nOwners: {}\nQuiet period: {} ms, pacing: {} ms",
                    current.channel_id.as_deref().unwrap_or("not set"),
                    current.caption_suffix.as_deref().unwrap_or("none"),
                    users,
                    owners,
                    timing.quiet_period.as_millis(),
                    timing.pacing.as_millis(),
                )
            },
            Err(e) => format!("❌ Could not read settings: {e}"),
        },
        Command::SetChannel(channel_id) => match settings.set_channel_id(&channel_id).await {
            Ok(()) => {
                info!(sender = %sender, channel_id = %channel_id, "destination changed");
                format!("✅ Destination channel set to {channel_id}.")
            },
            Err(e) => format!("❌ Could not set the channel: {e}"),
        },
        Command::SetSuffix(suffix) => match settings.set_caption_suffix(Some(&suffix)).await {
            Ok(()) => "✅ Caption suffix updated.".into(),
            Err(e) => format!("❌ Could not set the suffix: {e}"),
        },
        Command::ClearSuffix => match settings.set_caption_suffix(None).await {
            Ok(()) => "✅ Caption suffix cleared.".into(),
            Err(e) => format!("❌ Could not clear the suffix: {e}"),
        },
        Command::AddUser(user) => match settings.add_authorized_user(user).await {
            Ok(true) => format!("✅ User {user} can now use the bot."),
            Ok(false) => format!("User {user} was already authorized."),
            Err(e) => format!("❌ Could not add user {user}: {e}"),
        },
        Command::RemoveUser(user) => match settings.remove_authorized_user(user).await {
            Ok(removed) => {
                let mut reply = if removed {
                    format!("✅ User {user} was removed.")
                } else {
                    format!("User {user} was not authorized.")
                };
                if state.config.is_owner(user) {
                    reply.push_str(" They remain an owner through the config file.");
                }
                reply
            },
            Err(e) => format!("❌ Could not remove user {user}: {e}"),
        },
    }
}

fn required_permission(command: &Command) -> Option<Permission> {
    match command {
        Command::Start | Command::Help => None,
        Command::Settings
        | Command::SetChannel(_)
        | Command::SetSuffix(_)
        | Command::ClearSuffix => Some(Permission::Configure),
        Command::AddUser(_) | Command::RemoveUser(_) => Some(Permission::ManageUsers),
    }
}

fn help_text(sender: SenderId, role: Role) -> String {
    let status = match role {
        Role::Owner => "You are an owner.",
        Role::Authorized => "You are authorized.",
        Role::Stranger => "You are not authorized yet. Ask an owner to run /adduser with your id.",
    };
    format!("{HELP_TEXT}\n\nYour user id: {sender}\n{status}")
}

fn join_ids(ids: impl Iterator<Item = u64>) -> String {
    let joined = ids.map(|id| id.to_string()).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none".into()
    } else {
        joined
    }
}

/// Best-effort notice outside the pipeline.
async fn notify(state: &BotState, conversation: ConversationId, notice: Notice) {
    if let Err(e) = state.outbound.notify(conversation, notice).await {
        debug!(conversation = %conversation, error = %e, "failed to send notice");
    }
}

/// Build an [`Item`] from a relayable media message.
fn extract_item(msg: &Message, sender: SenderId) -> Option<Item> {
    let caption = relayable_caption(msg)?;
    Some(Item {
        id: ItemId(msg.id.0),
        conversation: ConversationId(msg.chat.id.0),
        sender,
        caption,
    })
}

/// `Some(caption)` for the media kinds that are relayed, `None` otherwise.
fn relayable_caption(msg: &Message) -> Option<Option<String>> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Video(v) => Some(v.caption.clone()),
            MediaKind::Document(d) => Some(d.caption.clone()),
            MediaKind::Photo(p) => Some(p.caption.clone()),
            MediaKind::Audio(a) => Some(a.caption.clone()),
            MediaKind::Animation(a) => Some(a.caption.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Describe a media kind for logging purposes.
fn describe_media_kind(msg: &Message) -> Option<&'static str> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(_) => None,
            MediaKind::Contact(_) => Some("contact"),
            MediaKind::Location(_) => Some("location"),
            MediaKind::Poll(_) => Some("poll"),
            MediaKind::Sticker(_) => Some("sticker"),
            MediaKind::VideoNote(_) => Some("video note"),
            MediaKind::Voice(_) => Some("voice"),
            _ => Some("other media"),
        },
        _ => None,
    }
}
