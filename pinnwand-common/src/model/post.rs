use crate::model::{
    Id,
    group::{Group, GroupMarker},
    user::{User, UserMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::Display;
use thiserror::Error;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub text: PostText,
    pub published_at: UtcDateTime,
    pub group: Option<Group>,
    /// Relative path under the media root.
    pub image: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct NewPost {
    pub author: Id<UserMarker>,
    pub text: PostText,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostUpdate {
    pub text: PostText,
    pub group: Option<Id<GroupMarker>>,
    /// `None` keeps the stored image.
    pub image: Option<String>,
}

/// Post body, whitespace-trimmed and non-empty.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostText(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The post text may not be empty")]
pub struct InvalidPostTextError;

impl PostText {
    pub fn new(text: &str) -> Result<Self, InvalidPostTextError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Err(InvalidPostTextError)
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for PostText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for PostText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostText::new(&inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"PostText"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let text = PostText::new("  Hello\n").unwrap();
        assert_eq!(text.get(), "Hello");
    }

    #[test]
    fn rejects_blank_text() {
        assert!(PostText::new("").is_err());
        assert!(PostText::new(" \t\n").is_err());
    }
}
