use relaybot_relay::{SenderId, SettingsCache};

use crate::config::TelegramBotConfig;

/// What a sender is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Listed in the config file's `owners`.
    Owner,
    /// Present in the durable authorized-user set.
    Authorized,
    Stranger,
}

/// Operation a sender asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Submit items, captions and post links.
    Relay,
    /// Read or change the destination channel and caption suffix.
    Configure,
    /// Add or remove authorized users.
    ManageUsers,
}

/// Resolve a sender's role. Owners never touch the settings store.
pub async fn resolve_role(
    config: &TelegramBotConfig,
    settings: &SettingsCache,
    sender: SenderId,
) -> relaybot_relay::Result<Role> {
    if config.is_owner(sender) {
        return Ok(Role::Owner);
    }
    if settings.is_authorized(sender).await? {
        Ok(Role::Authorized)
    } else {
        Ok(Role::Stranger)
    }
}

/// Returns `Ok(())` if `role` grants `permission`.
pub fn check_access(role: Role, permission: Permission) -> Result<(), AccessDenied> {
    match (permission, role) {
        (_, Role::Owner) => Ok(()),
        (Permission::Relay | Permission::Configure, Role::Authorized) => Ok(()),
        (Permission::ManageUsers, Role::Authorized) => Err(AccessDenied::NotOwner),
        (_, Role::Stranger) => Err(AccessDenied::NotAuthorized),
    }
}

/// Reason a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    NotAuthorized,
    NotOwner,
}

impl std::fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthorized => write!(f, "you are not authorized to use this bot"),
            Self::NotOwner => write!(f, "only an owner can manage users"),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        relaybot_relay::{RelaySettings, store_memory::InMemorySettingsStore},
        rstest::rstest,
        std::sync::Arc,
    };

    fn cache_with(users: &[u64]) -> SettingsCache {
        SettingsCache::new(Arc::new(InMemorySettingsStore::with_settings(
            RelaySettings {
                authorized_users: users.iter().copied().map(SenderId).collect(),
                ..Default::default()
            },
        )))
    }

    fn owners(ids: &[u64]) -> TelegramBotConfig {
        TelegramBotConfig {
            owners: ids.to_vec(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn owner_wins_over_store() {
        let role = resolve_role(&owners(&[1]), &cache_with(&[]), SenderId(1))
            .await
            .unwrap();
        assert_eq!(role, Role::Owner);
    }

    #[tokio::test]
    async fn store_membership_authorizes() {
        let cache = cache_with(&[5]);
        let cfg = owners(&[1]);
        assert_eq!(
            resolve_role(&cfg, &cache, SenderId(5)).await.unwrap(),
            Role::Authorized
        );
        assert_eq!(
            resolve_role(&cfg, &cache, SenderId(6)).await.unwrap(),
            Role::Stranger
        );
    }

    #[tokio::test]
    async fn newly_added_user_is_authorized_immediately() {
        let cache = cache_with(&[]);
        let cfg = owners(&[]);
        cache.add_authorized_user(SenderId(9)).await.unwrap();
        assert_eq!(
            resolve_role(&cfg, &cache, SenderId(9)).await.unwrap(),
            Role::Authorized
        );
    }

    #[rstest]
    #[case(Role::Owner, Permission::ManageUsers, Ok(()))]
    #[case(Role::Owner, Permission::Relay, Ok(()))]
    #[case(Role::Authorized, Permission::Relay, Ok(()))]
    #[case(Role::Authorized, Permission::Configure, Ok(()))]
    #[case(Role::Authorized, Permission::ManageUsers, Err(AccessDenied::NotOwner))]
    #[case(Role::Stranger, Permission::Relay, Err(AccessDenied::NotAuthorized))]
    #[case(Role::Stranger, Permission::Configure, Err(AccessDenied::NotAuthorized))]
    fn permissions(
        #[case] role: Role,
        #[case] permission: Permission,
        #[case] expected: Result<(), AccessDenied>,
    ) {
        assert_eq!(check_access(role, permission), expected);
    }
}
