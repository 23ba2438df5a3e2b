use serde::{Deserialize, Serialize};

use super::{PostId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "userId")]
    pub author_id: UserId,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub reactions: Reactions,
}

impl Post {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub dislikes: u32,
}

/// One page of a post collection, as returned by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: u32,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub limit: u32,
}

impl PostPage {
    pub fn contains(&self, id: PostId) -> bool {
        self.posts.iter().any(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub body: String,
    #[serde(rename = "userId")]
    pub author_id: UserId,
}

/// Full replacement of the editable fields of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostUpdate {
    pub title: String,
    pub body: String,
    #[serde(rename = "userId")]
    pub author_id: UserId,
}

impl From<&Post> for PostUpdate {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            body: post.body.clone(),
            author_id: post.author_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_reactions_default_to_zero() {
        let post: Post =
            serde_json::from_str(r#"{"id":1,"title":"t","body":"b","userId":3}"#).unwrap();
        assert_eq!(post.reactions, Reactions::default());
        assert!(post.tags.is_empty());
    }

    #[test]
    fn update_payload_uses_wire_names() {
        let update = PostUpdate {
            title: "t".into(),
            body: "b".into(),
            author_id: 4,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["userId"], 4);
    }
}
