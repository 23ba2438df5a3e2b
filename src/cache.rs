use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Local};
use log::{debug, trace};

use crate::{
    entity::{CommentPage, Post, PostId, PostPage, Tag, User, UserId},
    location::{QueryState, SortOrder},
};

/// Pagination and ordering shared by every post list query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListParams {
    pub limit: u32,
    pub skip: u32,
    pub sort_by: Option<String>,
    pub order: SortOrder,
}

impl From<&QueryState> for ListParams {
    fn from(state: &QueryState) -> Self {
        Self {
            limit: state.limit,
            skip: state.skip,
            sort_by: state.sort_by.clone(),
            order: state.sort_order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    PostList,
    PostsByTag,
    PostSearch,
    PostDetail,
    Users,
    User,
    Tags,
    CommentsByPost,
}

impl QueryKind {
    pub const POST_LISTS: [QueryKind; 3] = [Self::PostList, Self::PostsByTag, Self::PostSearch];
}

/// Identifies one cache entry: resource kind plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    PostList(ListParams),
    PostsByTag(ListParams, String),
    PostSearch(ListParams, String),
    PostDetail(PostId),
    Users,
    User(UserId),
    Tags,
    CommentsByPost(PostId),
}

impl QueryKey {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::PostList(_) => QueryKind::PostList,
            Self::PostsByTag(..) => QueryKind::PostsByTag,
            Self::PostSearch(..) => QueryKind::PostSearch,
            Self::PostDetail(_) => QueryKind::PostDetail,
            Self::Users => QueryKind::Users,
            Self::User(_) => QueryKind::User,
            Self::Tags => QueryKind::Tags,
            Self::CommentsByPost(_) => QueryKind::CommentsByPost,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::PostList(p) => write!(f, "posts[{}+{}]", p.skip, p.limit),
            Self::PostsByTag(p, tag) => write!(f, "posts#{}[{}+{}]", tag, p.skip, p.limit),
            Self::PostSearch(p, q) => write!(f, "posts?{}[{}+{}]", q, p.skip, p.limit),
            Self::PostDetail(id) => write!(f, "post/{}", id),
            Self::Users => write!(f, "users"),
            Self::User(id) => write!(f, "user/{}", id),
            Self::Tags => write!(f, "tags"),
            Self::CommentsByPost(id) => write!(f, "comments/{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Posts(PostPage),
    Post(Post),
    Users(Vec<User>),
    User(User),
    Tags(Vec<Tag>),
    Comments(CommentPage),
}

/// Conversion between a typed query result and its cache slot.
pub trait Cached: Sized {
    fn into_value(self) -> CacheValue;
    fn from_value(value: CacheValue) -> Option<Self>;
}

macro_rules! cached {
    ($ty:ty, $variant:ident) => {
        impl Cached for $ty {
            fn into_value(self) -> CacheValue {
                CacheValue::$variant(self)
            }
            fn from_value(value: CacheValue) -> Option<Self> {
                match value {
                    CacheValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

cached!(PostPage, Posts);
cached!(Post, Post);
cached!(Vec<User>, Users);
cached!(User, User);
cached!(Vec<Tag>, Tags);
cached!(CommentPage, Comments);

#[derive(Debug, Clone)]
struct Entry {
    value: CacheValue,
    stale: bool,
    updated: DateTime<Local>,
}

/// Marks the state of a key when a fetch for it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<QueryKey, Entry>,
    /// Bumped on every write, invalidation or removal of a key.
    epochs: HashMap<QueryKey, u64>,
}

impl Inner {
    fn touch(&mut self, key: &QueryKey) {
        *self.epochs.entry(key.clone()).or_default() += 1;
    }
    fn epoch(&self, key: &QueryKey) -> u64 {
        self.epochs.get(key).copied().unwrap_or_default()
    }
}

/// Server data keyed by [`QueryKey`].
///
/// The lock is never held across an `.await`; each key is written only by the
/// fetch or mutation responsible for it.
#[derive(Debug, Default)]
pub struct QueryCache(Mutex<Inner>);

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get<T: Cached>(&self, key: &QueryKey) -> Option<T> {
        let inner = self.lock();
        let entry = inner.entries.get(key)?;
        T::from_value(entry.value.clone())
    }

    /// True when the key holds data that has not been invalidated.
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.lock().entries.get(key).is_some_and(|e| !e.stale)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn updated(&self, key: &QueryKey) -> Option<DateTime<Local>> {
        self.lock().entries.get(key).map(|e| e.updated)
    }

    pub fn set<T: Cached>(&self, key: QueryKey, value: T) {
        let mut inner = self.lock();
        trace!("Cache set {}", key);
        inner.touch(&key);
        inner.entries.insert(
            key,
            Entry {
                value: value.into_value(),
                stale: false,
                updated: Local::now(),
            },
        );
    }

    /// Patch the cached value in place. Returns false when the key is empty
    /// or holds another type.
    pub fn update<T: Cached>(&self, key: &QueryKey, patch: impl FnOnce(&mut T)) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.get_mut(key) else {
            return false;
        };
        let Some(mut value) = T::from_value(entry.value.clone()) else {
            return false;
        };
        patch(&mut value);
        entry.value = value.into_value();
        entry.updated = Local::now();
        inner.touch(key);
        trace!("Cache patch {}", key);
        true
    }

    /// Patch every cached value whose key matches `filter`.
    pub fn update_where<T: Cached>(
        &self,
        filter: impl Fn(&QueryKey) -> bool,
        mut patch: impl FnMut(&mut T),
    ) -> usize {
        let keys = self.keys_where(filter);
        keys.iter()
            .filter(|key| self.update::<T>(key, &mut patch))
            .count()
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        let mut inner = self.lock();
        inner.touch(key);
        let removed = inner.entries.remove(key).is_some();
        if removed {
            debug!("Cache drop {}", key);
        }
        removed
    }

    /// Mark a key stale so the next read refetches it.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut inner = self.lock();
        inner.touch(key);
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.stale = true;
            debug!("Cache invalidate {}", key);
        }
    }

    pub fn invalidate_kinds(&self, kinds: &[QueryKind]) -> usize {
        let keys = self.keys_where(|key| kinds.contains(&key.kind()));
        for key in keys.iter() {
            self.invalidate(key);
        }
        keys.len()
    }

    pub fn keys_where(&self, filter: impl Fn(&QueryKey) -> bool) -> Vec<QueryKey> {
        self.lock()
            .entries
            .keys()
            .filter(|key| filter(key))
            .cloned()
            .collect()
    }

    /// Record the state of `key` before issuing a fetch for it.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        FetchTicket(self.lock().epoch(key))
    }

    /// Store a fetch result unless the key was written, removed or
    /// invalidated while the request was in flight.
    pub fn finish_fetch<T: Cached>(&self, key: QueryKey, ticket: FetchTicket, value: T) -> bool {
        let mut inner = self.lock();
        if inner.epoch(&key) != ticket.0 {
            debug!("Discarding superseded result for {}", key);
            return false;
        }
        inner.touch(&key);
        inner.entries.insert(
            key,
            Entry {
                value: value.into_value(),
                stale: false,
                updated: Local::now(),
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Reactions;

    fn post(id: PostId) -> Post {
        Post {
            id,
            title: format!("post {}", id),
            body: String::new(),
            author_id: 1,
            tags: vec![],
            reactions: Reactions::default(),
        }
    }

    fn params(skip: u32) -> ListParams {
        ListParams {
            limit: 10,
            skip,
            sort_by: None,
            order: SortOrder::Asc,
        }
    }

    #[test]
    fn keys_are_exact() {
        let cache = QueryCache::new();
        cache.set(QueryKey::PostDetail(1), post(1));
        assert_eq!(cache.get::<Post>(&QueryKey::PostDetail(1)), Some(post(1)));
        assert_eq!(cache.get::<Post>(&QueryKey::PostDetail(2)), None);
        assert_eq!(cache.get::<PostPage>(&QueryKey::PostDetail(1)), None);
        assert_eq!(cache.get::<PostPage>(&QueryKey::PostList(params(0))), None);
    }

    #[test]
    fn invalidate_keeps_value_but_marks_stale() {
        let cache = QueryCache::new();
        let key = QueryKey::PostList(params(0));
        cache.set(key.clone(), PostPage::default());
        assert!(cache.is_fresh(&key));
        cache.invalidate(&key);
        assert!(!cache.is_fresh(&key));
        assert!(cache.contains(&key));
    }

    #[test]
    fn invalidate_kinds_leaves_other_kinds_alone() {
        let cache = QueryCache::new();
        cache.set(QueryKey::PostList(params(0)), PostPage::default());
        cache.set(QueryKey::PostList(params(10)), PostPage::default());
        cache.set(QueryKey::PostDetail(3), post(3));
        assert_eq!(cache.invalidate_kinds(&QueryKind::POST_LISTS), 2);
        assert!(cache.is_fresh(&QueryKey::PostDetail(3)));
    }

    #[test]
    fn update_patches_only_the_target() {
        let cache = QueryCache::new();
        cache.set(QueryKey::PostDetail(1), post(1));
        cache.set(QueryKey::PostDetail(2), post(2));
        assert!(cache.update::<Post>(&QueryKey::PostDetail(1), |p| p.title = "new".into()));
        assert_eq!(cache.get::<Post>(&QueryKey::PostDetail(1)).unwrap().title, "new");
        assert_eq!(cache.get::<Post>(&QueryKey::PostDetail(2)), Some(post(2)));
        assert!(!cache.update::<Post>(&QueryKey::PostDetail(9), |_| {}));
    }

    #[test]
    fn superseded_fetch_is_discarded() {
        let cache = QueryCache::new();
        let key = QueryKey::PostDetail(4);
        let ticket = cache.begin_fetch(&key);
        cache.set(key.clone(), post(40));
        assert!(!cache.finish_fetch(key.clone(), ticket, post(4)));
        assert_eq!(cache.get::<Post>(&key).unwrap().id, 40);

        let ticket = cache.begin_fetch(&key);
        assert!(cache.finish_fetch(key.clone(), ticket, post(4)));
        assert_eq!(cache.get::<Post>(&key).unwrap().id, 4);
    }

    #[test]
    fn invalidation_during_fetch_discards_result() {
        let cache = QueryCache::new();
        let key = QueryKey::Tags;
        let ticket = cache.begin_fetch(&key);
        cache.invalidate(&key);
        assert!(!cache.finish_fetch(key.clone(), ticket, vec![Tag::new("a")]));
        assert!(cache.is_empty());
    }
}
