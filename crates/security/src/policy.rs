use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// Role granted full administrative rights; the default edit allow-list.
pub const ADMIN_ROLE: &str = "ADMIN";

/// Allow-list entry that opens editing to every role.
pub const ALL_ROLES: &str = "ALL";

/// Edit permissions attached to a resource.
///
/// Unset lists fall back to the defaults: only [`ADMIN_ROLE`] and no group restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPermissions {
    /// Explicit override; `Some(true)` grants editing to anyone.
    #[serde(default)]
    pub can_edit: Option<bool>,
    #[serde(default, rename = "editingAllowedRoles")]
    pub allowed_roles: Option<Vec<String>>,
    #[serde(default, rename = "editingAllowedGroups")]
    pub allowed_groups: Option<Vec<String>>,
}

impl EditPermissions {
    pub fn allowed_roles(&self) -> Vec<&str> {
        match &self.allowed_roles {
            Some(roles) => roles.iter().map(String::as_str).collect(),
            None => vec![ADMIN_ROLE],
        }
    }

    pub fn allowed_groups(&self) -> &[String] {
        self.allowed_groups.as_deref().unwrap_or_default()
    }

    pub fn allows(&self, principal: Option<&Principal>) -> bool {
        can_edit(self, principal)
    }
}

/// Decides whether `principal` may edit a resource with the given permissions.
///
/// Evaluated fresh on every call: role and group membership change independently
/// of the resource, so no decision is cached.
pub fn can_edit(permissions: &EditPermissions, principal: Option<&Principal>) -> bool {
    if permissions.can_edit == Some(true) {
        return true;
    }

    let roles = permissions.allowed_roles();
    if roles.contains(&ALL_ROLES) {
        return true;
    }

    let Some(principal) = principal else {
        return false;
    };
    let Some(role) = principal.role() else {
        return false;
    };

    let allowed = if role == ADMIN_ROLE {
        let groups = permissions.allowed_groups();
        groups.is_empty() || groups.iter().any(|g| principal.in_enabled_group(g))
    } else {
        roles.contains(&role)
    };

    tracing::trace!(role, allowed, "edit authorization");
    allowed
}

#[cfg(test)]
mod tests {
    use super::{EditPermissions, can_edit};
    use crate::principal::{Principal, UserGroup};

    fn user() -> Principal {
        Principal::new("USER").with_group(UserGroup::enabled("test"))
    }

    fn admin() -> Principal {
        Principal::new("ADMIN").with_group(UserGroup::enabled("test"))
    }

    fn perms(roles: Option<&[&str]>, groups: Option<&[&str]>) -> EditPermissions {
        EditPermissions {
            can_edit: None,
            allowed_roles: roles.map(|r| r.iter().map(|s| s.to_string()).collect()),
            allowed_groups: groups.map(|g| g.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn explicit_override_wins() {
        let p = EditPermissions {
            can_edit: Some(true),
            ..perms(Some(&["NOBODY"]), Some(&["none"]))
        };
        assert!(can_edit(&p, Some(&user())));
        assert!(can_edit(&p, None));
    }

    #[test]
    fn explicit_false_falls_through_to_roles() {
        let p = EditPermissions {
            can_edit: Some(false),
            ..perms(Some(&["USER"]), Some(&["test"]))
        };
        assert!(can_edit(&p, Some(&user())));
    }

    #[test]
    fn all_roles_wildcard() {
        assert!(can_edit(&perms(Some(&["ALL"]), None), Some(&user())));
        assert!(can_edit(&perms(Some(&["ALL"]), None), None));
    }

    #[test]
    fn admin_with_empty_groups() {
        assert!(can_edit(&perms(Some(&["ADMIN"]), Some(&[])), Some(&admin())));
    }

    #[test]
    fn admin_matching_allowed_group() {
        assert!(can_edit(&perms(None, Some(&["test"])), Some(&admin())));
    }

    #[test]
    fn admin_outside_allowed_groups() {
        assert!(!can_edit(&perms(None, Some(&["other"])), Some(&admin())));
    }

    #[test]
    fn admin_disabled_group_does_not_count() {
        let admin = Principal::new("ADMIN").with_group(UserGroup::disabled("test"));
        assert!(!can_edit(&perms(None, Some(&["test"])), Some(&admin)));
    }

    #[test]
    fn admin_with_defaults() {
        assert!(can_edit(&EditPermissions::default(), Some(&admin())));
    }

    #[test]
    fn user_in_allowed_roles() {
        assert!(can_edit(&perms(Some(&["USER"]), None), Some(&user())));
    }

    #[test]
    fn user_not_in_roles_is_denied_even_with_matching_groups() {
        assert!(!can_edit(&perms(Some(&["USER1"]), Some(&["some"])), Some(&user())));
        assert!(!can_edit(&perms(Some(&["USER1"]), Some(&["test"])), Some(&user())));
    }

    #[test]
    fn user_with_defaults_is_denied() {
        assert!(!can_edit(&EditPermissions::default(), Some(&user())));
    }

    #[test]
    fn anonymous_is_denied() {
        assert!(!can_edit(&EditPermissions::default(), None));
        assert!(!can_edit(&EditPermissions::default(), Some(&Principal::default())));
    }

    #[test]
    fn decodes_resource_permissions() {
        let p: EditPermissions = serde_json::from_str(
            r#"{"canEdit":false,"editingAllowedRoles":["USER"],"editingAllowedGroups":["test"]}"#,
        )
        .unwrap();
        assert_eq!(p.allowed_roles(), vec!["USER"]);
        assert!(p.allows(Some(&user())));
    }

    #[test]
    fn security_user_with_wrapped_group_is_evaluated() {
        let p: EditPermissions = serde_json::from_str(
            r#"{"canEdit":false,"editingAllowedRoles":["ADMIN"],"editingAllowedGroups":["test"]}"#,
        )
        .unwrap();
        let admin: Principal = serde_json::from_str(
            r#"{"role":"ADMIN","groups":{"group":{"enabled":true,"groupName":"test"}}}"#,
        )
        .unwrap();
        assert!(can_edit(&p, Some(&admin)));
    }
}
