use log::{debug, log_enabled, trace};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::{
    cache::ListParams,
    config::Config,
    entity::{
        Comment, CommentId, CommentPage, NewComment, NewPost, Post, PostId, PostPage, PostUpdate,
        Tag, User, UserId, UserList,
    },
    error::{Error, Result},
};

use super::{ApiClient, Backend};

/// [`Backend`] over the dummyjson-style REST API.
#[derive(Debug, Clone)]
pub struct RestClient {
    inner: ApiClient,
    base: Url,
}

impl RestClient {
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(config.base_url())?;
        Ok(Self::with_base(base, config.limit(), config.retries()))
    }

    pub fn with_base(mut base: Url, limit: usize, retries: u32) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            inner: ApiClient::new(limit, retries),
            base,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn list_endpoint(&self, path: &str, params: &ListParams, extra: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.endpoint(path)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in extra {
                query.append_pair(key, value);
            }
            query
                .append_pair("limit", &params.limit.to_string())
                .append_pair("skip", &params.skip.to_string());
            if let Some(sort_by) = &params.sort_by {
                query
                    .append_pair("sortBy", sort_by)
                    .append_pair("order", params.order.as_str());
            }
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, url: Url, body: Option<Value>) -> Result<T> {
        let (client, _permit) = self.inner.client().await;
        debug!("{} {}", method, url);

        let mut request = client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(Error::Status {
                status,
                url: url.to_string(),
            });
        }

        let response = response.text().await?;
        if log_enabled!(log::Level::Trace) {
            if let Ok(value) = serde_json::from_str::<Value>(&response) {
                trace!("{}", serde_json::to_string_pretty(&value)?);
            }
        }

        Ok(serde_json::from_str(&response)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.send(Method::GET, url, None).await
    }
}

impl Backend for RestClient {
    async fn list_posts(&self, params: &ListParams) -> Result<PostPage> {
        let url = self.list_endpoint("posts", params, &[])?;
        self.get(url).await
    }

    async fn posts_by_tag(&self, params: &ListParams, tag: &str) -> Result<PostPage> {
        let path = format!("posts/tag/{}", urlencoding::encode(tag));
        let url = self.list_endpoint(&path, params, &[])?;
        self.get(url).await
    }

    async fn search_posts(&self, params: &ListParams, query: &str) -> Result<PostPage> {
        let url = self.list_endpoint("posts/search", params, &[("q", query)])?;
        self.get(url).await
    }

    async fn get_post(&self, id: PostId) -> Result<Post> {
        let url = self.endpoint(&format!("posts/{}", id))?;
        self.get(url).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let url = self.endpoint("posts/tags")?;
        self.get(url).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut url = self.endpoint("users")?;
        url.query_pairs_mut()
            .append_pair("limit", "0")
            .append_pair("select", "username,image,firstName,lastName");
        let list: UserList = self.get(url).await?;
        Ok(list.users)
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let url = self.endpoint(&format!("users/{}", id))?;
        self.get(url).await
    }

    async fn comments_by_post(&self, post_id: PostId) -> Result<CommentPage> {
        let url = self.endpoint(&format!("comments/post/{}", post_id))?;
        self.get(url).await
    }

    async fn add_post(&self, post: &NewPost) -> Result<Post> {
        let url = self.endpoint("posts/add")?;
        self.send(Method::POST, url, Some(serde_json::to_value(post)?))
            .await
    }

    async fn update_post(&self, id: PostId, update: &PostUpdate) -> Result<Post> {
        let url = self.endpoint(&format!("posts/{}", id))?;
        self.send(Method::PUT, url, Some(serde_json::to_value(update)?))
            .await
    }

    async fn delete_post(&self, id: PostId) -> Result<Post> {
        let url = self.endpoint(&format!("posts/{}", id))?;
        self.send(Method::DELETE, url, None).await
    }

    async fn add_comment(&self, comment: &NewComment) -> Result<Comment> {
        let url = self.endpoint("comments/add")?;
        self.send(Method::POST, url, Some(serde_json::to_value(comment)?))
            .await
    }

    async fn update_comment(&self, id: CommentId, body: &str) -> Result<Comment> {
        let url = self.endpoint(&format!("comments/{}", id))?;
        self.send(Method::PUT, url, Some(json!({ "body": body })))
            .await
    }

    async fn delete_comment(&self, id: CommentId) -> Result<Comment> {
        let url = self.endpoint(&format!("comments/{}", id))?;
        self.send(Method::DELETE, url, None).await
    }

    async fn like_comment(&self, id: CommentId, likes: u32) -> Result<Comment> {
        let url = self.endpoint(&format!("comments/{}", id))?;
        self.send(Method::PATCH, url, Some(json!({ "likes": likes })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SortOrder;

    fn client(base: &str) -> RestClient {
        RestClient::with_base(Url::parse(base).unwrap(), 1, 0)
    }

    fn params(sort_by: Option<&str>) -> ListParams {
        ListParams {
            limit: 10,
            skip: 20,
            sort_by: sort_by.map(str::to_string),
            order: SortOrder::Desc,
        }
    }

    #[test]
    fn base_path_is_kept() {
        let client = client("http://localhost:8080/api");
        assert_eq!(
            client.endpoint("posts/3").unwrap().as_str(),
            "http://localhost:8080/api/posts/3"
        );
    }

    #[test]
    fn list_without_sort_omits_order() {
        let client = client("https://dummyjson.com");
        let url = client.list_endpoint("posts", &params(None), &[]).unwrap();
        assert_eq!(url.as_str(), "https://dummyjson.com/posts?limit=10&skip=20");
    }

    #[test]
    fn search_puts_query_first() {
        let client = client("https://dummyjson.com");
        let url = client
            .list_endpoint("posts/search", &params(Some("title")), &[("q", "his mother")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://dummyjson.com/posts/search?q=his+mother&limit=10&skip=20&sortBy=title&order=desc"
        );
    }

    #[test]
    fn tag_segment_is_encoded() {
        let client = client("https://dummyjson.com");
        let path = format!("posts/tag/{}", urlencoding::encode("sci fi"));
        let url = client.list_endpoint(&path, &params(None), &[]).unwrap();
        assert!(url.as_str().starts_with("https://dummyjson.com/posts/tag/sci%20fi?"));
    }
}
