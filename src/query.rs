use std::{future::Future, sync::Arc};

use log::{trace, warn};

use crate::{
    api::Backend,
    cache::{Cached, ListParams, QueryCache, QueryKey},
    entity::{CommentPage, Post, PostId, PostPage, Tag, User, UserId},
    error::Result,
};

/// Reads through the [`QueryCache`], fetching a key only when it is missing
/// or stale and its required parameters are present.
///
/// A failed fetch is logged and reported as absent data.
#[derive(Debug)]
pub struct Queries<B> {
    backend: Arc<B>,
    cache: Arc<QueryCache>,
}

impl<B> Clone for Queries<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<B: Backend> Queries<B> {
    pub fn new(backend: Arc<B>, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    async fn fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Option<T>
    where
        T: Cached + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.cache.is_fresh(&key) {
            trace!("Cache hit {}", key);
            return self.cache.get(&key);
        }

        let ticket = self.cache.begin_fetch(&key);
        match fetch().await {
            Ok(value) => {
                if self.cache.finish_fetch(key.clone(), ticket, value.clone()) {
                    Some(value)
                } else {
                    self.cache.get(&key).or(Some(value))
                }
            }
            Err(e) => {
                warn!("Failed to load {}: {}", key, e);
                None
            }
        }
    }

    pub async fn post_list(&self, params: &ListParams) -> Option<PostPage> {
        let key = QueryKey::PostList(params.clone());
        self.fetch(key, || self.backend.list_posts(params)).await
    }

    /// Skipped entirely while no tag is selected.
    pub async fn posts_by_tag(&self, params: &ListParams, tag: Option<&str>) -> Option<PostPage> {
        let tag = tag.filter(|tag| !tag.is_empty())?;
        let key = QueryKey::PostsByTag(params.clone(), tag.to_string());
        self.fetch(key, || self.backend.posts_by_tag(params, tag))
            .await
    }

    /// Skipped entirely while the search text is empty.
    pub async fn search_posts(&self, params: &ListParams, query: Option<&str>) -> Option<PostPage> {
        let query = query.filter(|query| !query.is_empty())?;
        let key = QueryKey::PostSearch(params.clone(), query.to_string());
        self.fetch(key, || self.backend.search_posts(params, query))
            .await
    }

    pub async fn post(&self, id: Option<PostId>) -> Option<Post> {
        let id = id?;
        self.fetch(QueryKey::PostDetail(id), || self.backend.get_post(id))
            .await
    }

    pub async fn users(&self) -> Option<Vec<User>> {
        self.fetch(QueryKey::Users, || self.backend.list_users())
            .await
    }

    pub async fn user(&self, id: Option<UserId>) -> Option<User> {
        let id = id?;
        self.fetch(QueryKey::User(id), || self.backend.get_user(id))
            .await
    }

    pub async fn tags(&self) -> Option<Vec<Tag>> {
        self.fetch(QueryKey::Tags, || self.backend.list_tags()).await
    }

    pub async fn comments(&self, post_id: Option<PostId>) -> Option<CommentPage> {
        let post_id = post_id?;
        self.fetch(QueryKey::CommentsByPost(post_id), || {
            self.backend.comments_by_post(post_id)
        })
        .await
    }
}
