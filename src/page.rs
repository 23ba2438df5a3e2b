//! The posts manager screen.
//!
//! Every navigation action is a [`LocationUpdate`]; [`PostsManager::refresh`]
//! re-derives all query keys from the location and composes the [`Screen`].

use std::sync::Arc;

use chrono::{DateTime, Local};
use futures::join;
use log::{debug, info};

use crate::{
    api::Backend,
    cache::{ListParams, QueryCache, QueryKey},
    dialog::{AddCommentDialog, AddPostDialog, EditCommentDialog, EditPostDialog, EditPostForm},
    entity::{Comment, CommentId, CommentPage, Post, PostId, PostPage, Tag, User, UserId},
    error::{Error, Result},
    location::{Location, LocationUpdate, Param, QueryState, SortOrder, ViewMode},
    mutation::Dispatcher,
    query::Queries,
    view::{join_authors, select_active_posts, ActiveFilter, Pagination, PostWithAuthor},
};

/// The open post, in detail or edit mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPost {
    pub id: PostId,
    pub mode: ViewMode,
    pub post: Option<Post>,
    pub author: Option<User>,
    /// Only loaded in detail mode.
    pub comments: Option<CommentPage>,
}

/// Everything needed to draw the screen once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub state: QueryState,
    pub posts: Vec<PostWithAuthor>,
    pub pagination: Pagination,
    /// A list query the location asks for has no data.
    pub loading: bool,
    /// When the displayed collection was last written to the cache.
    pub updated: Option<DateTime<Local>>,
    pub tags: Vec<Tag>,
    pub selected: Option<SelectedPost>,
    pub profile: Option<User>,
}

/// Cache key of the collection whose posts are displayed.
fn active_key(state: &QueryState) -> QueryKey {
    let params = ListParams::from(state);
    match ActiveFilter::from_state(state) {
        ActiveFilter::Search(query) => QueryKey::PostSearch(params, query.to_string()),
        ActiveFilter::Tag(tag) => QueryKey::PostsByTag(params, tag.to_string()),
        ActiveFilter::None => QueryKey::PostList(params),
    }
}

impl Screen {
    pub fn search(&self) -> &str {
        self.state.search.as_deref().unwrap_or_default()
    }
}

pub struct PostsManager<B> {
    location: Location,
    queries: Queries<B>,
    dispatcher: Dispatcher<B>,
    current_user: UserId,
    profile: Option<UserId>,
    pub add_post: AddPostDialog,
    pub edit_post: EditPostDialog,
    pub add_comment: AddCommentDialog,
    pub edit_comment: EditCommentDialog,
}

impl<B: Backend> PostsManager<B> {
    pub fn new(backend: B, location: Location, current_user: UserId) -> Self {
        let backend = Arc::new(backend);
        let cache = Arc::new(QueryCache::new());
        Self {
            location,
            queries: Queries::new(backend.clone(), cache.clone()),
            dispatcher: Dispatcher::new(backend, cache),
            current_user,
            profile: None,
            add_post: Default::default(),
            edit_post: Default::default(),
            add_comment: Default::default(),
            edit_comment: Default::default(),
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn state(&self) -> QueryState {
        self.location.read()
    }

    pub fn cache(&self) -> &QueryCache {
        self.queries.cache()
    }

    pub fn dispatcher(&self) -> &Dispatcher<B> {
        &self.dispatcher
    }

    pub fn navigate(&mut self, update: LocationUpdate) {
        self.location.update(update);
    }

    //==========================================================================
    // Navigation
    //==========================================================================

    pub fn search(&mut self, text: &str) {
        let text = Some(text).filter(|text| !text.is_empty());
        self.navigate(
            LocationUpdate::new()
                .set_opt(Param::Search, text)
                .set(Param::Skip, 0),
        );
    }

    /// `all` or an empty slug clears the tag filter.
    pub fn select_tag(&mut self, tag: &str) {
        let tag = Some(tag).filter(|tag| !tag.is_empty() && *tag != "all");
        self.navigate(
            LocationUpdate::new()
                .set_opt(Param::Tag, tag)
                .set(Param::Skip, 0),
        );
    }

    /// `none` or an empty field clears sorting.
    pub fn sort_by(&mut self, field: &str) {
        let field = Some(field).filter(|field| !field.is_empty() && *field != "none");
        self.navigate(LocationUpdate::new().set_opt(Param::SortBy, field));
    }

    pub fn sort_order(&mut self, order: SortOrder) {
        self.navigate(LocationUpdate::new().set(Param::SortOrder, order));
    }

    pub fn set_page_size(&mut self, limit: u32) {
        self.navigate(
            LocationUpdate::new()
                .set(Param::Limit, limit.max(1))
                .set(Param::Skip, 0),
        );
    }

    /// Paginates the collection the current location selects, as far as it
    /// is cached. Nothing to page through until it has been loaded.
    pub fn pagination(&self) -> Pagination {
        let state = self.state();
        let total = self
            .cache()
            .get::<PostPage>(&active_key(&state))
            .map_or(0, |page| page.total);
        Pagination::new(&state, total)
    }

    /// Returns false when already on the last page.
    pub fn next_page(&mut self) -> bool {
        let pagination = self.pagination();
        if !pagination.has_next() {
            return false;
        }
        self.navigate(LocationUpdate::new().set(Param::Skip, pagination.next_skip()));
        true
    }

    /// Returns false when already on the first page.
    pub fn prev_page(&mut self) -> bool {
        let pagination = self.pagination();
        if !pagination.has_prev() {
            return false;
        }
        self.navigate(LocationUpdate::new().set(Param::Skip, pagination.prev_skip()));
        true
    }

    pub fn open_post(&mut self, id: PostId, mode: ViewMode) {
        self.navigate(
            LocationUpdate::new()
                .set(Param::SelectedPostId, id)
                .set(Param::Mode, mode),
        );
    }

    pub fn close_post(&mut self) {
        self.edit_post.close();
        self.navigate(
            LocationUpdate::new()
                .remove(Param::SelectedPostId)
                .remove(Param::Mode),
        );
    }

    pub fn view_profile(&mut self, id: UserId) {
        self.profile = Some(id);
    }

    pub fn close_profile(&mut self) {
        self.profile = None;
    }

    //==========================================================================
    // Mutations
    //==========================================================================

    fn selected_post_id(&self) -> Result<PostId> {
        self.state()
            .selected_post_id
            .ok_or_else(|| Error::Validation("no post is selected".into()))
    }

    pub fn open_add_post(&mut self) {
        self.add_post.open_for(self.current_user);
    }

    pub async fn submit_add_post(&mut self) -> Result<Post> {
        self.add_post.submit(&self.dispatcher).await
    }

    /// Save the edit form and leave edit mode.
    pub async fn submit_edit_post(&mut self) -> Result<Post> {
        let post = self.edit_post.submit(&self.dispatcher).await?;
        self.close_post();
        Ok(post)
    }

    pub async fn delete_post(&mut self, id: PostId) -> Result<()> {
        self.dispatcher.delete_post(id).await?;
        if self.state().selected_post_id == Some(id) {
            self.close_post();
        }
        Ok(())
    }

    pub fn open_add_comment(&mut self) -> Result<()> {
        let post_id = self.selected_post_id()?;
        self.add_comment.open_for(post_id, self.current_user);
        Ok(())
    }

    pub async fn submit_add_comment(&mut self) -> Result<Comment> {
        self.add_comment.submit(&self.dispatcher).await
    }

    pub fn open_edit_comment(&mut self, comment: &Comment) {
        self.edit_comment.open_with(comment.into());
    }

    pub async fn submit_edit_comment(&mut self) -> Result<Comment> {
        self.edit_comment.submit(&self.dispatcher).await
    }

    pub async fn delete_comment(&mut self, id: CommentId) -> Result<()> {
        let post_id = self.selected_post_id()?;
        self.dispatcher.delete_comment(post_id, id).await
    }

    pub async fn like_comment(&mut self, id: CommentId) -> Result<u32> {
        let post_id = self.selected_post_id()?;
        self.dispatcher.like_comment(post_id, id).await
    }

    //==========================================================================
    // Rendering
    //==========================================================================

    /// Load (or reuse) every query the current location needs and compose
    /// the screen.
    pub async fn refresh(&mut self) -> Screen {
        let state = self.location.read();
        let params = ListParams::from(&state);
        let mode = state
            .selected_post_id
            .map(|_| state.mode.unwrap_or(ViewMode::Detail));
        let comments_for = state
            .selected_post_id
            .filter(|_| mode == Some(ViewMode::Detail));

        let queries = &self.queries;
        let (plain, by_tag, search, detail, users, tags, comments, profile) = join!(
            queries.post_list(&params),
            queries.posts_by_tag(&params, state.tag.as_deref()),
            queries.search_posts(&params, state.search.as_deref()),
            queries.post(state.selected_post_id),
            queries.users(),
            queries.tags(),
            queries.comments(comments_for),
            queries.user(self.profile),
        );

        let filter = ActiveFilter::from_state(&state);
        let wants = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        let loading = plain.is_none()
            || (wants(&state.tag) && by_tag.is_none())
            || (wants(&state.search) && search.is_none());
        let updated = self.cache().updated(&active_key(&state));
        let (posts, total) =
            select_active_posts(plain.as_ref(), by_tag.as_ref(), search.as_ref(), filter);
        let users = users.unwrap_or_default();
        let posts = join_authors(posts, &users);
        debug!("{} of {} posts on screen", posts.len(), total);

        let selected = match (state.selected_post_id, mode) {
            (Some(id), Some(mode)) => {
                let author = detail
                    .as_ref()
                    .and_then(|post| users.iter().find(|u| u.id == post.author_id))
                    .cloned();
                Some(SelectedPost {
                    id,
                    mode,
                    post: detail,
                    author,
                    comments,
                })
            }
            _ => None,
        };
        self.sync_edit_dialog(selected.as_ref());

        Screen {
            pagination: Pagination::new(&state, total),
            state,
            posts,
            loading,
            updated,
            tags: tags.unwrap_or_default(),
            selected,
            profile,
        }
    }

    /// Seed the edit form from the loaded post when entering edit mode and
    /// drop it when leaving.
    fn sync_edit_dialog(&mut self, selected: Option<&SelectedPost>) {
        match selected {
            Some(SelectedPost {
                mode: ViewMode::Edit,
                post: Some(post),
                ..
            }) => {
                if !self.edit_post.is_open() || self.edit_post.fields().id != post.id {
                    info!("Editing post {}", post.id);
                    self.edit_post.open_with(EditPostForm::from(post));
                }
            }
            _ => {
                if self.edit_post.is_open() {
                    self.edit_post.close();
                }
            }
        }
    }
}
