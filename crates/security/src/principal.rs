use serde::{Deserialize, Deserializer, Serialize};

/// Group membership of a user, as reported by the security service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    pub group_name: String,
    #[serde(default)]
    pub enabled: bool,
}

impl UserGroup {
    pub fn enabled(name: impl Into<String>) -> Self {
        Self {
            group_name: name.into(),
            enabled: true,
        }
    }

    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            group_name: name.into(),
            enabled: false,
        }
    }
}

/// The acting identity: a role and its group memberships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "deserialize_groups")]
    pub groups: Vec<UserGroup>,
}

// Security services report groups either as a list or wrapped as
// `{"group": {..}}` / `{"group": [..]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum GroupsRepr {
    List(Vec<UserGroup>),
    Wrapped { group: OneOrMany },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(UserGroup),
    Many(Vec<UserGroup>),
}

fn deserialize_groups<'de, D>(deserializer: D) -> Result<Vec<UserGroup>, D::Error>
where
    D: Deserializer<'de>,
{
    let groups = match Option::<GroupsRepr>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(GroupsRepr::List(groups)) => groups,
        Some(GroupsRepr::Wrapped {
            group: OneOrMany::One(group),
        }) => vec![group],
        Some(GroupsRepr::Wrapped {
            group: OneOrMany::Many(groups),
        }) => groups,
    };
    Ok(groups)
}

impl Principal {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: UserGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Names of the groups that are currently enabled.
    pub fn enabled_groups(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .filter(|g| g.enabled)
            .map(|g| g.group_name.as_str())
    }

    pub fn in_enabled_group(&self, name: &str) -> bool {
        self.enabled_groups().any(|g| g == name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Principal, UserGroup};

    #[test]
    fn disabled_groups_are_ignored() {
        let p = Principal::new("USER")
            .with_group(UserGroup::enabled("editors"))
            .with_group(UserGroup::disabled("admins"));
        assert_eq!(p.enabled_groups().collect::<Vec<_>>(), vec!["editors"]);
        assert!(p.in_enabled_group("editors"));
        assert!(!p.in_enabled_group("admins"));
    }

    #[test]
    fn decodes_security_user() {
        let p: Principal = serde_json::from_str(
            r#"{"role":"ADMIN","groups":[{"groupName":"test","enabled":true}]}"#,
        )
        .unwrap();
        assert_eq!(p.role(), Some("ADMIN"));
        assert!(p.in_enabled_group("test"));
    }

    #[test]
    fn decodes_wrapped_single_group() {
        let p: Principal = serde_json::from_str(
            r#"{"role":"USER","groups":{"group":{"enabled":true,"groupName":"test"}}}"#,
        )
        .unwrap();
        assert_eq!(p.groups, vec![UserGroup::enabled("test")]);
    }

    #[test]
    fn decodes_wrapped_group_list() {
        let p: Principal = serde_json::from_str(
            r#"{"role":"USER","groups":{"group":[
                {"enabled":true,"groupName":"test"},
                {"enabled":false,"groupName":"everyone"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(p.enabled_groups().collect::<Vec<_>>(), vec!["test"]);
        assert_eq!(p.groups.len(), 2);
    }

    #[test]
    fn missing_or_null_groups_decode_empty() {
        let p: Principal = serde_json::from_str(r#"{"role":"USER"}"#).unwrap();
        assert!(p.groups.is_empty());
        let p: Principal = serde_json::from_str(r#"{"role":"USER","groups":null}"#).unwrap();
        assert!(p.groups.is_empty());
    }
}
