//! Command authorization.
//!
//! Authorization is an ordered list of named rules. Each rule either decides
//! ([`Verdict::Allow`] / [`Verdict::Deny`]) or passes to the next one; if no
//! rule decides, access is denied. The order is fixed:
//!
//! 1. `guild_only` - a guild-only command outside a guild is denied outright
//! 2. `unrestricted` - no roles, no permissions and level `EVERYONE` is allowed
//! 3. `bot_owner` - the bot owner is allowed
//! 4. `guild_role_or_permission` - in a guild, any required role or
//!    permission is allowed
//! 5. `permission_level` - a caller at or above the minimum level is allowed
//!
//! The facts about the caller come from the [`Caller`] trait, so each rule
//! can be tested in isolation without a gateway.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::warn;

use alyx_core::{Permission, PermissionLevel, UserId};

use super::declaration::CommandDeclaration;
use crate::context::CommandContext;

// ============================================================================
// Authorization requirements
// ============================================================================

/// Requirements drawn from a command's terminal declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authorization {
    pub permissions: Vec<Permission>,
    pub roles: Vec<String>,
    pub level: PermissionLevel,
    pub guild_only: bool,
}

impl Authorization {
    pub fn from_declaration(declaration: &CommandDeclaration) -> Self {
        Self {
            permissions: declaration.permissions().to_vec(),
            roles: declaration.roles().to_vec(),
            level: declaration.minimum_level(),
            guild_only: declaration.is_guild_only(),
        }
    }

    /// No roles, no permissions and no minimum level.
    pub fn is_unrestricted(&self) -> bool {
        self.roles.is_empty()
            && self.permissions.is_empty()
            && self.level == PermissionLevel::Everyone
    }
}

// ============================================================================
// Caller
// ============================================================================

/// Facts about the user invoking a command.
#[async_trait]
pub trait Caller: Send + Sync {
    /// Whether the invocation happened inside a guild.
    fn in_guild(&self) -> bool;

    fn is_bot_owner(&self) -> bool;

    /// Names of the caller's roles in the current guild.
    async fn role_names(&self) -> Vec<String>;

    /// Whether the caller holds `permission`, either in the current channel
    /// (channel-scoped permissions only) or guild-wide.
    async fn has_permission(&self, permission: &Permission) -> bool;

    async fn level(&self) -> PermissionLevel;
}

// ============================================================================
// Rules
// ============================================================================

/// Outcome of a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
    /// The rule does not apply; ask the next one.
    Continue,
}

/// One named authorization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRule {
    GuildOnly,
    Unrestricted,
    BotOwner,
    GuildRoleOrPermission,
    PermissionLevel,
}

impl AuthRule {
    /// Evaluation order.
    pub const ORDER: [AuthRule; 5] = [
        AuthRule::GuildOnly,
        AuthRule::Unrestricted,
        AuthRule::BotOwner,
        AuthRule::GuildRoleOrPermission,
        AuthRule::PermissionLevel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::GuildOnly => "guild_only",
            Self::Unrestricted => "unrestricted",
            Self::BotOwner => "bot_owner",
            Self::GuildRoleOrPermission => "guild_role_or_permission",
            Self::PermissionLevel => "permission_level",
        }
    }

    pub async fn evaluate(self, auth: &Authorization, caller: &dyn Caller) -> Verdict {
        match self {
            Self::GuildOnly => {
                if auth.guild_only && !caller.in_guild() {
                    Verdict::Deny
                } else {
                    Verdict::Continue
                }
            }
            Self::Unrestricted => allow_if(auth.is_unrestricted()),
            Self::BotOwner => allow_if(caller.is_bot_owner()),
            Self::GuildRoleOrPermission => {
                if !caller.in_guild() {
                    return Verdict::Continue;
                }
                if !auth.roles.is_empty() {
                    let held = caller.role_names().await;
                    if auth.roles.iter().any(|r| held.contains(r)) {
                        return Verdict::Allow;
                    }
                }
                for permission in &auth.permissions {
                    if caller.has_permission(permission).await {
                        return Verdict::Allow;
                    }
                }
                Verdict::Continue
            }
            Self::PermissionLevel => allow_if(caller.level().await.is_at_least(auth.level)),
        }
    }
}

fn allow_if(condition: bool) -> Verdict {
    if condition {
        Verdict::Allow
    } else {
        Verdict::Continue
    }
}

/// The result of running every rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthDecision {
    pub allowed: bool,
    /// The rule that decided, or `None` when no rule allowed access.
    pub rule: Option<AuthRule>,
}

/// Runs the rules in [`AuthRule::ORDER`], stopping at the first decision.
pub async fn authorize(auth: &Authorization, caller: &dyn Caller) -> AuthDecision {
    for rule in AuthRule::ORDER {
        match rule.evaluate(auth, caller).await {
            Verdict::Allow => {
                return AuthDecision {
                    allowed: true,
                    rule: Some(rule),
                };
            }
            Verdict::Deny => {
                return AuthDecision {
                    allowed: false,
                    rule: Some(rule),
                };
            }
            Verdict::Continue => {}
        }
    }
    AuthDecision {
        allowed: false,
        rule: None,
    }
}

// ============================================================================
// AccessPolicy
// ============================================================================

/// Bot-wide configuration used to compute a caller's [`PermissionLevel`].
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub owner: Option<UserId>,
    pub bot_admins: HashSet<UserId>,
    /// Role names granting [`PermissionLevel::Admin`].
    pub admin_roles: Vec<String>,
    /// Role names granting [`PermissionLevel::Mod`].
    pub mod_roles: Vec<String>,
}

impl AccessPolicy {
    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == Some(user)
    }

    /// Computes the level of `user` holding `roles` in the current guild.
    pub fn level_for(&self, user: UserId, roles: &[String]) -> PermissionLevel {
        if self.is_owner(user) {
            PermissionLevel::BotOwner
        } else if self.bot_admins.contains(&user) {
            PermissionLevel::BotAdmin
        } else if roles.iter().any(|r| self.admin_roles.contains(r)) {
            PermissionLevel::Admin
        } else if roles.iter().any(|r| self.mod_roles.contains(r)) {
            PermissionLevel::Mod
        } else {
            PermissionLevel::Everyone
        }
    }
}

// ============================================================================
// ContextCaller
// ============================================================================

/// A [`Caller`] backed by the gateway of a live [`CommandContext`].
///
/// Gateway failures count as "does not hold" and are logged.
pub struct ContextCaller<'a> {
    ctx: &'a CommandContext,
    policy: &'a AccessPolicy,
}

impl<'a> ContextCaller<'a> {
    pub fn new(ctx: &'a CommandContext, policy: &'a AccessPolicy) -> Self {
        Self { ctx, policy }
    }
}

#[async_trait]
impl<'a> Caller for ContextCaller<'a> {
    fn in_guild(&self) -> bool {
        self.ctx.is_guild()
    }

    fn is_bot_owner(&self) -> bool {
        self.policy.is_owner(self.ctx.author().id)
    }

    async fn role_names(&self) -> Vec<String> {
        let Some(guild) = self.ctx.guild_id() else {
            return Vec::new();
        };
        match self.ctx.gateway().member_roles(guild, self.ctx.author().id).await {
            Ok(roles) => roles.into_iter().map(|r| r.name).collect(),
            Err(e) => {
                warn!(user = %self.ctx.author().id, error = %e, "Failed to fetch member roles");
                Vec::new()
            }
        }
    }

    async fn has_permission(&self, permission: &Permission) -> bool {
        let Some(guild) = self.ctx.guild_id() else {
            return false;
        };
        let gateway = self.ctx.gateway();
        let user = self.ctx.author().id;

        let scopes = if permission.is_channel() {
            vec![Some(self.ctx.channel_id()), None]
        } else {
            vec![None]
        };
        for channel in scopes {
            match gateway.has_permission(guild, channel, user, permission).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    warn!(%user, permission = %permission, error = %e, "Permission check failed");
                }
            }
        }
        false
    }

    async fn level(&self) -> PermissionLevel {
        let roles = if self.ctx.is_guild() {
            self.role_names().await
        } else {
            Vec::new()
        };
        self.policy.level_for(self.ctx.author().id, &roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeCaller {
        guild: bool,
        owner: bool,
        roles: Vec<String>,
        permissions: Vec<Permission>,
        level: PermissionLevel,
    }

    #[async_trait]
    impl Caller for FakeCaller {
        fn in_guild(&self) -> bool {
            self.guild
        }

        fn is_bot_owner(&self) -> bool {
            self.owner
        }

        async fn role_names(&self) -> Vec<String> {
            self.roles.clone()
        }

        async fn has_permission(&self, permission: &Permission) -> bool {
            self.permissions.contains(permission)
        }

        async fn level(&self) -> PermissionLevel {
            self.level
        }
    }

    fn guild_caller() -> FakeCaller {
        FakeCaller {
            guild: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unrestricted_allows_everyone() {
        let decision = authorize(&Authorization::default(), &FakeCaller::default()).await;
        assert!(decision.allowed);
        assert_eq!(decision.rule, Some(AuthRule::Unrestricted));
    }

    #[tokio::test]
    async fn test_guild_only_dominates_owner() {
        let auth = Authorization {
            guild_only: true,
            ..Default::default()
        };
        let caller = FakeCaller {
            owner: true,
            level: PermissionLevel::BotOwner,
            ..Default::default()
        };
        let decision = authorize(&auth, &caller).await;
        assert!(!decision.allowed);
        assert_eq!(decision.rule, Some(AuthRule::GuildOnly));
    }

    #[tokio::test]
    async fn test_owner_bypasses_requirements() {
        let auth = Authorization {
            level: PermissionLevel::BotAdmin,
            ..Default::default()
        };
        let caller = FakeCaller {
            owner: true,
            ..Default::default()
        };
        assert_eq!(authorize(&auth, &caller).await.rule, Some(AuthRule::BotOwner));
    }

    #[tokio::test]
    async fn test_role_or_permission_in_guild() {
        let auth = Authorization {
            roles: vec!["Moderators".into()],
            permissions: vec![Permission::MANAGE_MESSAGES],
            level: PermissionLevel::Admin,
            ..Default::default()
        };

        let mut by_role = guild_caller();
        by_role.roles = vec!["Moderators".into()];
        assert_eq!(
            authorize(&auth, &by_role).await.rule,
            Some(AuthRule::GuildRoleOrPermission)
        );

        let mut by_permission = guild_caller();
        by_permission.permissions = vec![Permission::MANAGE_MESSAGES];
        assert!(authorize(&auth, &by_permission).await.allowed);

        // Roles never count outside a guild.
        let mut dm = by_role;
        dm.guild = false;
        assert!(!authorize(&auth, &dm).await.allowed);
    }

    #[tokio::test]
    async fn test_level_rule() {
        let auth = Authorization {
            level: PermissionLevel::Mod,
            ..Default::default()
        };
        let mut caller = guild_caller();
        caller.level = PermissionLevel::Admin;
        assert_eq!(
            authorize(&auth, &caller).await.rule,
            Some(AuthRule::PermissionLevel)
        );

        caller.level = PermissionLevel::Everyone;
        let decision = authorize(&auth, &caller).await;
        assert!(!decision.allowed);
        assert_eq!(decision.rule, None);
    }

    #[test]
    fn test_policy_levels() {
        let policy = AccessPolicy {
            owner: Some(UserId(1)),
            bot_admins: [UserId(2)].into_iter().collect(),
            admin_roles: vec!["Admins".into()],
            mod_roles: vec!["Mods".into()],
        };
        assert_eq!(policy.level_for(UserId(1), &[]), PermissionLevel::BotOwner);
        assert_eq!(policy.level_for(UserId(2), &[]), PermissionLevel::BotAdmin);
        assert_eq!(
            policy.level_for(UserId(3), &["Mods".into(), "Admins".into()]),
            PermissionLevel::Admin
        );
        assert_eq!(policy.level_for(UserId(3), &["Mods".into()]), PermissionLevel::Mod);
        assert_eq!(policy.level_for(UserId(3), &[]), PermissionLevel::Everyone);
    }
}
