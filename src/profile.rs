// src/profile.rs
// =============================================================================
// This file defines the item our crawler visits: a profile.
//
// The scheduler only cares about identity (the id). Everything else is
// optional display data that sources may or may not fill in, and that the
// writer passes through to the output.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// One crawled profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    /// Stable identifier, used to build the next request
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(
        default,
        alias = "full_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(
        default,
        alias = "profile_pic_url",
        alias = "profile_pic_url_hd",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_url: Option<String>,
    /// Category of the seed this profile was reached from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// A child that does not know its category gets the parent's.
    pub fn inherit_category(&mut self, parent: &Profile) {
        if self.category.is_none() {
            self.category = parent.category.clone();
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "<Profile {} {} {} {}>",
            or_dash(&self.category),
            self.id,
            or_dash(&self.username),
            or_dash(&self.display_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let profile = Profile::new("42").with_username("alice").with_category("art");
        assert_eq!(profile.to_string(), "<Profile art 42 alice ->");
    }

    #[test]
    fn test_inherit_category() {
        let parent = Profile::new("1").with_category("music");

        let mut child = Profile::new("1/1");
        child.inherit_category(&parent);
        assert_eq!(child.category.as_deref(), Some("music"));

        let mut tagged = Profile::new("1/2").with_category("sport");
        tagged.inherit_category(&parent);
        assert_eq!(tagged.category.as_deref(), Some("sport"));
    }

    #[test]
    fn test_deserialize_partial_profile() {
        let profile: Profile =
            serde_json::from_str(r#"{"id": "7", "profile_pic_url": "https://img/7.png"}"#).unwrap();

        assert_eq!(profile.id, "7");
        assert_eq!(profile.avatar_url.as_deref(), Some("https://img/7.png"));
        assert_eq!(profile.username, None);
    }

    #[test]
    fn test_deserialize_upstream_field_names() {
        let profile: Profile = serde_json::from_str(
            r#"{"id": "1", "full_name": "Alice", "profile_pic_url_hd": "https://img/1.png"}"#,
        )
        .unwrap();

        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(profile.avatar_url.as_deref(), Some("https://img/1.png"));
    }

    #[test]
    fn test_serialize_skips_missing_fields() {
        let json = serde_json::to_string(&Profile::new("7")).unwrap();
        assert_eq!(json, r#"{"id":"7"}"#);
    }
}
