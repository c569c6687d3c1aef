//! Visibility state machine for moderated entities.
//!
//! Users, posts, and comments all carry soft-delete style flags. Rather
//! than scattering ad-hoc boolean checks, the flags collapse into a single
//! tagged state ([`Visibility`]) with an explicit transition table, and a
//! richer derivation ([`AccountStanding`]) for user accounts where email
//! verification and admin approval gate authentication.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Privilege level attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse the stored representation. Unknown values map to the least
    /// privileged role rather than failing the whole row.
    pub fn parse(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// The moderation state shared by every soft-deletable entity.
///
/// Posts and comments only ever occupy `Active` or `Deleted`; user
/// accounts additionally use `Suspended` (banned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Active,
    Suspended,
    Deleted,
}

/// A moderation action requested against an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Suspend,
    Unsuspend,
    Delete,
    Restore,
}

impl Visibility {
    /// Whether ordinary callers may see the entity.
    pub fn is_visible(&self) -> bool {
        matches!(self, Visibility::Active)
    }

    /// The transition table. Returns `None` when the action is not legal
    /// from the current state. `Deleted` is terminal for users (restore is
    /// only defined for content); the caller decides whether a no-op
    /// transition is reported as success (admin flag operations are
    /// idempotent at the API level).
    pub fn step(self, action: ModerationAction) -> Option<Visibility> {
        use ModerationAction::*;
        use Visibility::*;
        match (self, action) {
            (Active, Suspend) => Some(Suspended),
            (Suspended, Unsuspend) => Some(Active),
            (Active, Delete) | (Suspended, Delete) => Some(Deleted),
            (Deleted, Restore) => Some(Active),
            _ => None,
        }
    }

    /// Resolve an owner-scoped content transition. Posts and comments only
    /// occupy `Active` and `Deleted`, so each legal action has exactly one
    /// source state; returns `(from, to)`, or `None` when the action never
    /// applies to content (suspension is account-only).
    pub fn content_transition(action: ModerationAction) -> Option<(Visibility, Visibility)> {
        [Visibility::Active, Visibility::Deleted]
            .into_iter()
            .find_map(|from| match from.step(action) {
                Some(to @ (Visibility::Active | Visibility::Deleted)) => Some((from, to)),
                _ => None,
            })
    }
}

// ---------------------------------------------------------------------------
// Account standing
// ---------------------------------------------------------------------------

/// The raw flag set persisted on a user row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountFlags {
    pub is_approved: bool,
    pub is_verified: bool,
    pub is_banned: bool,
    pub is_deleted: bool,
}

/// Authentication eligibility derived from [`AccountFlags`].
///
/// Lifecycle: `Unverified` -> (verify email) -> `PendingApproval` ->
/// (admin approval) -> `Active` <-> `Banned`; any state -> `Deleted`,
/// which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStanding {
    Unverified,
    PendingApproval,
    Active,
    Banned,
    Deleted,
}

/// Reason a login attempt is refused for an existing, password-matching
/// account. Ordered by reporting priority: banned before unverified
/// before pending approval. Unverified-before-pending is deliberate: a
/// fresh account (neither verified nor approved) is told about the
/// missing verification first, and approval becomes the reported reason
/// only once the email is verified. Keep that order in sync with the
/// signup walkthrough tests before rearranging the checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginDenied {
    Deleted,
    Banned,
    Unverified,
    Pending,
}

impl AccountFlags {
    /// Collapse the flag combination into a single standing. Deletion
    /// dominates, then ban, then the verification/approval ladder.
    pub fn standing(&self) -> AccountStanding {
        if self.is_deleted {
            AccountStanding::Deleted
        } else if self.is_banned {
            AccountStanding::Banned
        } else if !self.is_verified {
            AccountStanding::Unverified
        } else if !self.is_approved {
            AccountStanding::PendingApproval
        } else {
            AccountStanding::Active
        }
    }

    /// Decide login eligibility. Succeeds only for fully active accounts;
    /// the denial reason follows the standing derivation, so a banned,
    /// unverified account reports the ban, and an unverified account
    /// reports the missing verification before the missing approval.
    pub fn login_gate(&self) -> Result<(), LoginDenied> {
        match self.standing() {
            AccountStanding::Active => Ok(()),
            AccountStanding::Deleted => Err(LoginDenied::Deleted),
            AccountStanding::Banned => Err(LoginDenied::Banned),
            AccountStanding::Unverified => Err(LoginDenied::Unverified),
            AccountStanding::PendingApproval => Err(LoginDenied::Pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_transition_table() {
        use ModerationAction::*;
        use Visibility::*;

        assert_eq!(Active.step(Suspend), Some(Suspended));
        assert_eq!(Suspended.step(Unsuspend), Some(Active));
        assert_eq!(Active.step(Delete), Some(Deleted));
        assert_eq!(Suspended.step(Delete), Some(Deleted));
        assert_eq!(Deleted.step(Restore), Some(Active));

        // Illegal moves.
        assert_eq!(Deleted.step(Suspend), None);
        assert_eq!(Deleted.step(Delete), None);
        assert_eq!(Active.step(Unsuspend), None);
        assert_eq!(Active.step(Restore), None);
    }

    #[test]
    fn content_transitions_resolve_their_source_state() {
        use ModerationAction::*;
        use Visibility::*;

        assert_eq!(Visibility::content_transition(Delete), Some((Active, Deleted)));
        assert_eq!(Visibility::content_transition(Restore), Some((Deleted, Active)));

        // Suspension only exists for accounts.
        assert_eq!(Visibility::content_transition(Suspend), None);
        assert_eq!(Visibility::content_transition(Unsuspend), None);
    }

    #[test]
    fn standing_derivation() {
        let mut flags = AccountFlags::default();
        assert_eq!(flags.standing(), AccountStanding::Unverified);

        flags.is_verified = true;
        assert_eq!(flags.standing(), AccountStanding::PendingApproval);

        flags.is_approved = true;
        assert_eq!(flags.standing(), AccountStanding::Active);

        flags.is_banned = true;
        assert_eq!(flags.standing(), AccountStanding::Banned);

        flags.is_deleted = true;
        assert_eq!(flags.standing(), AccountStanding::Deleted);
    }

    #[test]
    fn login_gate_priority_order() {
        // Banned wins over both verification gates.
        let flags = AccountFlags {
            is_banned: true,
            ..Default::default()
        };
        assert_eq!(flags.login_gate(), Err(LoginDenied::Banned));

        // Missing verification is reported before missing approval.
        let flags = AccountFlags::default();
        assert_eq!(flags.login_gate(), Err(LoginDenied::Unverified));

        let flags = AccountFlags {
            is_verified: true,
            ..Default::default()
        };
        assert_eq!(flags.login_gate(), Err(LoginDenied::Pending));

        let flags = AccountFlags {
            is_approved: true,
            is_verified: true,
            ..Default::default()
        };
        assert_eq!(flags.login_gate(), Ok(()));
    }

    #[test]
    fn login_gate_rejects_every_non_active_combination() {
        for bits in 0..16u8 {
            let flags = AccountFlags {
                is_approved: bits & 1 != 0,
                is_verified: bits & 2 != 0,
                is_banned: bits & 4 != 0,
                is_deleted: bits & 8 != 0,
            };
            let eligible = flags.is_approved
                && flags.is_verified
                && !flags.is_banned
                && !flags.is_deleted;
            assert_eq!(flags.login_gate().is_ok(), eligible, "flags: {flags:?}");
        }
    }

    #[test]
    fn role_round_trip() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("garbage"), Role::User);
        assert_eq!(Role::Admin.as_str(), "admin");
    }
}
