use clap::Subcommand;

use crate::{
    entity::{CommentId, PostId, UserId},
    location::SortOrder,
};

/// One action on the screen, run before it is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand, Default)]
pub enum Command {
    /// Show the current page
    #[default]
    List,
    /// Search posts (an empty text clears the search)
    Search { text: String },
    /// Filter by tag slug, `all` clears the filter
    Tag { tag: String },
    /// Change sorting
    Sort {
        /// Field name, `none` clears it
        #[arg(long)]
        by: Option<String>,
        #[arg(long)]
        order: Option<SortOrder>,
    },
    /// Change the page size
    PageSize { limit: u32 },
    /// Go to the next page
    Next,
    /// Go to the previous page
    Prev,
    /// Open a post with its comments
    Show { id: PostId },
    /// Edit a post
    Edit {
        id: PostId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Add a post
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long)]
        user_id: Option<UserId>,
    },
    /// Delete a post
    Delete { id: PostId },
    /// Comment on a post
    Comment { post: PostId, body: String },
    /// Edit a comment
    EditComment {
        post: PostId,
        id: CommentId,
        body: String,
    },
    /// Delete a comment
    DeleteComment { post: PostId, id: CommentId },
    /// Like a comment
    Like { post: PostId, id: CommentId },
    /// List every tag
    Tags,
    /// Show a user profile
    User { id: UserId },
}
