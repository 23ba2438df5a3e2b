use serde::{Deserialize, Serialize};

use super::{CommentId, PostId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub body: String,
    pub post_id: PostId,
    #[serde(default)]
    pub likes: u32,
    pub user: CommentUser,
}

impl Comment {
    pub fn author_id(&self) -> UserId {
        self.user.id
    }
    pub fn is_pending(&self) -> bool {
        self.id < 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub total: u32,
}

impl CommentPage {
    pub fn get(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }
    pub fn get_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == id)
    }
    pub fn remove(&mut self, id: CommentId) -> Option<Comment> {
        let index = self.comments.iter().position(|c| c.id == id)?;
        self.total = self.total.saturating_sub(1);
        Some(self.comments.remove(index))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub body: String,
    pub post_id: PostId,
    #[serde(rename = "userId")]
    pub author_id: UserId,
}
