pub mod comment;
pub mod post;
pub mod tag;

pub use comment::{Comment, CommentPage, CommentUser, NewComment};
pub use post::{NewPost, Post, PostPage, PostUpdate, Reactions};
pub use tag::Tag;

use serde::{Deserialize, Serialize};

pub type PostId = u32;
pub type UserId = u32;
/// Negative ids are local placeholders awaiting server confirmation.
pub type CommentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawUser")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub image: Option<String>,
}

/// The backend returns either `fullName` or a `firstName`/`lastName` pair
/// depending on the endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    id: UserId,
    #[serde(default)]
    username: String,
    full_name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    image: Option<String>,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        let full_name = raw.full_name.unwrap_or_else(|| {
            [raw.first_name, raw.last_name]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        });
        Self {
            id: raw.id,
            username: raw.username,
            full_name,
            image: raw.image,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserList {
    pub users: Vec<User>,
}
