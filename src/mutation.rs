use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use log::{debug, error, info};

use crate::{
    api::Backend,
    cache::{QueryCache, QueryKey, QueryKind},
    entity::{
        Comment, CommentId, CommentPage, CommentUser, NewComment, NewPost, Post, PostId, PostPage,
        PostUpdate,
    },
    error::{Error, Result},
};

/// Author shown on a comment until the server confirms it.
pub const CURRENT_USER_LABEL: &str = "Current User";

fn logged<T>(action: &str, result: Result<T>) -> Result<T> {
    result.inspect_err(|e| error!("Failed to {}: {}", action, e))
}

/// Rejects the action before any request is sent.
fn ensure(action: &str, valid: bool, reason: &str) -> Result<()> {
    if valid {
        return Ok(());
    }
    logged(action, Err(Error::Validation(reason.to_string())))
}

fn is_post_list(key: &QueryKey) -> bool {
    QueryKind::POST_LISTS.contains(&key.kind())
}

/// Copy the fields the server acknowledged onto a cached post.
fn apply_post(post: &mut Post, updated: &Post) {
    post.title.clone_from(&updated.title);
    post.body.clone_from(&updated.body);
    post.author_id = updated.author_id;
    if !updated.tags.is_empty() {
        post.tags.clone_from(&updated.tags);
    }
}

/// Issues create/update/delete requests and applies their effect to the
/// cache once the server has answered.
///
/// Failed mutations are logged and leave the cache as it was.
#[derive(Debug)]
pub struct Dispatcher<B> {
    backend: Arc<B>,
    cache: Arc<QueryCache>,
    next_temp_id: AtomicI64,
}

impl<B: Backend> Dispatcher<B> {
    pub fn new(backend: Arc<B>, cache: Arc<QueryCache>) -> Self {
        Self {
            backend,
            cache,
            next_temp_id: AtomicI64::new(-1),
        }
    }

    fn temp_id(&self) -> CommentId {
        self.next_temp_id.fetch_sub(1, Ordering::Relaxed)
    }

    pub async fn add_post(&self, post: NewPost) -> Result<Post> {
        ensure("add post", !post.title.trim().is_empty(), "post title is empty")?;
        let created = logged("add post", self.backend.add_post(&post).await)?;
        info!("Added post {}", created.id);

        let mut kinds = QueryKind::POST_LISTS.to_vec();
        kinds.push(QueryKind::Tags);
        self.cache.invalidate_kinds(&kinds);
        Ok(created)
    }

    pub async fn update_post(&self, id: PostId, update: PostUpdate) -> Result<Post> {
        ensure("update post", !update.title.trim().is_empty(), "post title is empty")?;
        let updated = logged("update post", self.backend.update_post(id, &update).await)?;
        info!("Updated post {}", id);

        let detail = QueryKey::PostDetail(id);
        if !self.cache.update::<Post>(&detail, |post| apply_post(post, &updated)) {
            self.cache.set(detail, updated.clone());
        }
        let pages = self.cache.update_where::<PostPage>(is_post_list, |page| {
            for post in page.posts.iter_mut().filter(|p| p.id == id) {
                apply_post(post, &updated);
            }
        });
        debug!("Patched post {} in {} cached pages", id, pages);
        Ok(updated)
    }

    /// Drops the post from every cached list page and marks those pages
    /// stale; other keys are left alone.
    pub async fn delete_post(&self, id: PostId) -> Result<()> {
        logged("delete post", self.backend.delete_post(id).await)?;
        info!("Deleted post {}", id);

        let lists = self.cache.keys_where(is_post_list);
        for key in lists.iter() {
            self.cache.update::<PostPage>(key, |page| {
                if page.contains(id) {
                    page.posts.retain(|p| p.id != id);
                    page.total = page.total.saturating_sub(1);
                }
            });
            self.cache.invalidate(key);
        }
        self.cache.remove(&QueryKey::PostDetail(id));
        self.cache.remove(&QueryKey::CommentsByPost(id));
        Ok(())
    }

    /// The comment appears in the cache under a temporary id right away and
    /// is swapped for the server's comment once the request succeeds, or
    /// removed again when it fails.
    pub async fn add_comment(&self, comment: NewComment) -> Result<Comment> {
        ensure("add comment", !comment.body.trim().is_empty(), "comment body is empty")?;

        let key = QueryKey::CommentsByPost(comment.post_id);
        let temp_id = self.temp_id();
        let placeholder = Comment {
            id: temp_id,
            body: comment.body.clone(),
            post_id: comment.post_id,
            likes: 0,
            user: CommentUser {
                id: comment.author_id,
                username: CURRENT_USER_LABEL.to_string(),
                full_name: CURRENT_USER_LABEL.to_string(),
            },
        };
        let appended = self.cache.update::<CommentPage>(&key, |page| {
            page.comments.push(placeholder.clone());
            page.total += 1;
        });
        if !appended {
            self.cache.set(
                key.clone(),
                CommentPage {
                    comments: vec![placeholder],
                    total: 1,
                },
            );
            self.cache.invalidate(&key);
        }

        match logged("add comment", self.backend.add_comment(&comment).await) {
            Ok(created) => {
                info!("Added comment {} to post {}", created.id, created.post_id);
                self.cache.update::<CommentPage>(&key, |page| {
                    if let Some(slot) = page.get_mut(temp_id) {
                        *slot = created.clone();
                    }
                });
                Ok(created)
            }
            Err(e) => {
                self.cache.update::<CommentPage>(&key, |page| {
                    page.remove(temp_id);
                });
                Err(e)
            }
        }
    }

    pub async fn update_comment(&self, post_id: PostId, id: CommentId, body: String) -> Result<Comment> {
        ensure("update comment", !body.trim().is_empty(), "comment body is empty")?;
        ensure("update comment", id >= 0, "comment is still being saved")?;
        let updated = logged("update comment", self.backend.update_comment(id, &body).await)?;
        info!("Updated comment {}", id);

        self.cache
            .update::<CommentPage>(&QueryKey::CommentsByPost(post_id), |page| {
                if let Some(comment) = page.get_mut(id) {
                    comment.body.clone_from(&updated.body);
                }
            });
        Ok(updated)
    }

    pub async fn delete_comment(&self, post_id: PostId, id: CommentId) -> Result<()> {
        ensure("delete comment", id >= 0, "comment is still being saved")?;
        logged("delete comment", self.backend.delete_comment(id).await)?;
        info!("Deleted comment {}", id);

        self.cache
            .update::<CommentPage>(&QueryKey::CommentsByPost(post_id), |page| {
                page.remove(id);
            });
        Ok(())
    }

    /// Sends the cached like count plus one and stores the confirmed count on
    /// that comment only. Returns the new count.
    pub async fn like_comment(&self, post_id: PostId, id: CommentId) -> Result<u32> {
        ensure("like comment", id >= 0, "comment is still being saved")?;
        let key = QueryKey::CommentsByPost(post_id);
        let current = self
            .cache
            .get::<CommentPage>(&key)
            .and_then(|page| page.get(id).map(|c| c.likes))
            .ok_or_else(|| Error::NotFound(format!("comment {} of post {}", id, post_id)));
        let current = logged("like comment", current)?;

        let liked = logged(
            "like comment",
            self.backend.like_comment(id, current.saturating_add(1)).await,
        )?;
        let likes = liked.likes;
        debug!("Comment {} now has {} likes", id, likes);

        self.cache.update::<CommentPage>(&key, |page| {
            if let Some(comment) = page.get_mut(id) {
                comment.likes = likes;
            }
        });
        Ok(likes)
    }
}
