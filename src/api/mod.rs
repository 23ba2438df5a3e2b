pub mod rest;

pub use rest::RestClient;

use std::{future::Future, sync::Arc};

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::{
    cache::ListParams,
    entity::{
        Comment, CommentId, CommentPage, NewComment, NewPost, Post, PostId, PostPage, PostUpdate,
        Tag, User, UserId,
    },
    error::Result,
};

/// One call per logical backend operation. Every call either succeeds with
/// the server's view of the entity or fails; there is no partial outcome.
pub trait Backend: Send + Sync {
    fn list_posts(&self, params: &ListParams) -> impl Future<Output = Result<PostPage>> + Send;
    fn posts_by_tag(
        &self,
        params: &ListParams,
        tag: &str,
    ) -> impl Future<Output = Result<PostPage>> + Send;
    fn search_posts(
        &self,
        params: &ListParams,
        query: &str,
    ) -> impl Future<Output = Result<PostPage>> + Send;
    fn get_post(&self, id: PostId) -> impl Future<Output = Result<Post>> + Send;
    fn list_tags(&self) -> impl Future<Output = Result<Vec<Tag>>> + Send;
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send;
    fn get_user(&self, id: UserId) -> impl Future<Output = Result<User>> + Send;
    fn comments_by_post(&self, post_id: PostId)
        -> impl Future<Output = Result<CommentPage>> + Send;

    fn add_post(&self, post: &NewPost) -> impl Future<Output = Result<Post>> + Send;
    fn update_post(
        &self,
        id: PostId,
        update: &PostUpdate,
    ) -> impl Future<Output = Result<Post>> + Send;
    fn delete_post(&self, id: PostId) -> impl Future<Output = Result<Post>> + Send;
    fn add_comment(&self, comment: &NewComment) -> impl Future<Output = Result<Comment>> + Send;
    fn update_comment(
        &self,
        id: CommentId,
        body: &str,
    ) -> impl Future<Output = Result<Comment>> + Send;
    fn delete_comment(&self, id: CommentId) -> impl Future<Output = Result<Comment>> + Send;
    fn like_comment(
        &self,
        id: CommentId,
        likes: u32,
    ) -> impl Future<Output = Result<Comment>> + Send;
}

/// Shared HTTP plumbing: one pooled client and a permit per in-flight request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: ClientWithMiddleware,
    semaphore: Arc<Semaphore>,
}

impl ApiClient {
    pub fn new(limit: usize, retries: u32) -> Self {
        let builder = ClientBuilder::new(Client::new());
        let client = if retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(retries);
            builder
                .with(RetryTransientMiddleware::new_with_policy(retry_policy))
                .build()
        } else {
            builder.build()
        };

        Self {
            client,
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    pub async fn client(&self) -> (ClientWithMiddleware, Option<SemaphorePermit<'_>>) {
        // the semaphore is never closed
        let permit = self.semaphore.acquire().await.ok();
        (self.client.clone(), permit)
    }
}
