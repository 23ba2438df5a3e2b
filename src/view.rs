use std::{collections::HashMap, fmt};

use crate::{
    entity::{Post, PostPage, User},
    location::QueryState,
};

/// Which collection decides the displayed posts. Search wins over tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFilter<'a> {
    None,
    Tag(&'a str),
    Search(&'a str),
}

impl<'a> ActiveFilter<'a> {
    pub fn from_state(state: &'a QueryState) -> Self {
        let non_empty = |value: &'a Option<String>| value.as_deref().filter(|v| !v.is_empty());
        match (non_empty(&state.search), non_empty(&state.tag)) {
            (Some(query), _) => Self::Search(query),
            (None, Some(tag)) => Self::Tag(tag),
            (None, None) => Self::None,
        }
    }
}

/// The posts and total of whichever collection the filter selects. Missing
/// data yields an empty page.
pub fn select_active_posts(
    plain: Option<&PostPage>,
    by_tag: Option<&PostPage>,
    search: Option<&PostPage>,
    filter: ActiveFilter,
) -> (Vec<Post>, u32) {
    let page = match filter {
        ActiveFilter::Search(_) => search,
        ActiveFilter::Tag(_) => by_tag,
        ActiveFilter::None => plain,
    };
    page.map(|page| (page.posts.clone(), page.total))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWithAuthor {
    pub post: Post,
    /// `None` when the author is not in the user list.
    pub author: Option<User>,
}

pub fn join_authors(posts: Vec<Post>, users: &[User]) -> Vec<PostWithAuthor> {
    let users: HashMap<_, _> = users.iter().map(|user| (user.id, user)).collect();
    posts
        .into_iter()
        .map(|post| PostWithAuthor {
            author: users.get(&post.author_id).map(|user| (*user).clone()),
            post,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    Plain(&'a str),
    Marked(&'a str),
}

impl fmt::Display for Span<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Plain(text) => f.write_str(text),
            Self::Marked(text) => write!(f, "[{}]", text),
        }
    }
}

/// Byte length of the case-insensitive match of `needle` at the start of
/// `haystack`, if any.
fn match_len(haystack: &str, needle: &str) -> Option<usize> {
    let mut rest = haystack.char_indices();
    let mut consumed = 0;
    for expected in needle.chars() {
        let (index, found) = rest.next()?;
        if !found.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
        consumed = index + found.len_utf8();
    }
    Some(consumed)
}

/// Split `text` into plain and marked spans, marking every case-insensitive
/// occurrence of `query` from left to right.
pub fn highlight<'a>(text: &'a str, query: &str) -> Vec<Span<'a>> {
    if text.is_empty() {
        return vec![];
    }
    if query.trim().is_empty() {
        return vec![Span::Plain(text)];
    }

    let mut spans = vec![];
    let mut plain_start = 0;
    let mut cursor = 0;
    while cursor < text.len() {
        match match_len(&text[cursor..], query) {
            Some(len) => {
                if plain_start < cursor {
                    spans.push(Span::Plain(&text[plain_start..cursor]));
                }
                spans.push(Span::Marked(&text[cursor..cursor + len]));
                cursor += len;
                plain_start = cursor;
            }
            None => {
                cursor += text[cursor..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    if plain_start < text.len() {
        spans.push(Span::Plain(&text[plain_start..]));
    }
    spans
}

pub fn render_spans(spans: &[Span]) -> String {
    spans.iter().map(ToString::to_string).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u32,
    pub limit: u32,
    pub total: u32,
}

impl Pagination {
    pub fn new(state: &QueryState, total: u32) -> Self {
        Self {
            skip: state.skip,
            limit: state.limit,
            total,
        }
    }
    pub fn has_prev(&self) -> bool {
        self.skip != 0
    }
    pub fn has_next(&self) -> bool {
        self.skip.saturating_add(self.limit) < self.total
    }
    pub fn prev_skip(&self) -> u32 {
        self.skip.saturating_sub(self.limit)
    }
    pub fn next_skip(&self) -> u32 {
        self.skip.saturating_add(self.limit)
    }
    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.skip / self.limit.max(1) + 1
    }
    pub fn pages(&self) -> u32 {
        self.total.div_ceil(self.limit.max(1)).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChip {
    pub slug: String,
    pub active: bool,
}

pub fn tag_chips(post: &Post, active: Option<&str>) -> Vec<TagChip> {
    post.tags
        .iter()
        .map(|slug| TagChip {
            slug: slug.clone(),
            active: active == Some(slug.as_str()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::entity::Reactions;

    fn post(id: u32, author_id: u32, tags: &[&str]) -> Post {
        Post {
            id,
            title: format!("post {}", id),
            body: String::new(),
            author_id,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            reactions: Reactions::default(),
        }
    }

    fn page(ids: &[u32], total: u32) -> PostPage {
        PostPage {
            posts: ids.iter().map(|id| post(*id, 1, &[])).collect(),
            total,
            skip: 0,
            limit: 10,
        }
    }

    fn user(id: u32) -> User {
        User {
            id,
            username: format!("user{}", id),
            full_name: String::new(),
            image: None,
        }
    }

    #[test]
    fn search_wins_over_tag() {
        let state = QueryState {
            search: Some("love".into()),
            tag: Some("history".into()),
            ..Default::default()
        };
        let filter = ActiveFilter::from_state(&state);
        assert_eq!(filter, ActiveFilter::Search("love"));

        let (plain, tag, search) = (page(&[1], 100), page(&[2], 20), page(&[3], 3));
        let (posts, total) = select_active_posts(Some(&plain), Some(&tag), Some(&search), filter);
        assert_eq!(posts[0].id, 3);
        assert_eq!(total, 3);
    }

    #[test]
    fn tag_then_plain() {
        let (plain, tag) = (page(&[1], 100), page(&[2], 20));
        let (posts, total) = select_active_posts(Some(&plain), Some(&tag), None, ActiveFilter::Tag("x"));
        assert_eq!((posts[0].id, total), (2, 20));
        let (posts, total) = select_active_posts(Some(&plain), Some(&tag), None, ActiveFilter::None);
        assert_eq!((posts[0].id, total), (1, 100));
    }

    #[test]
    fn missing_collection_is_empty() {
        let plain = page(&[1], 100);
        let selected = select_active_posts(Some(&plain), None, None, ActiveFilter::Search("x"));
        assert_eq!(selected, (vec![], 0));
    }

    #[test]
    fn unknown_author_is_absent() {
        let joined = join_authors(vec![post(1, 5, &[]), post(2, 9, &[])], &[user(5)]);
        assert_eq!(joined[0].author.as_ref().map(|u| u.id), Some(5));
        assert_eq!(joined[1].author, None);
    }

    #[test]
    fn highlight_marks_every_occurrence() {
        let spans = highlight("Love is all you need, love", "LOVE");
        assert_eq!(
            spans,
            vec![
                Span::Marked("Love"),
                Span::Plain(" is all you need, "),
                Span::Marked("love"),
            ]
        );
        assert_eq!(render_spans(&spans), "[Love] is all you need, [love]");
    }

    #[test]
    fn highlight_empty_query_is_unmodified() {
        assert_eq!(highlight("text", ""), vec![Span::Plain("text")]);
        assert_eq!(highlight("text", "  "), vec![Span::Plain("text")]);
        assert!(highlight("", "x").is_empty());
    }

    #[test]
    fn highlight_is_literal() {
        assert_eq!(
            highlight("a.b axb", "."),
            vec![Span::Plain("a"), Span::Marked("."), Span::Plain("b axb")]
        );
    }

    #[test]
    fn highlight_handles_multibyte() {
        assert_eq!(
            highlight("게시물 ÉCOLE école", "école"),
            vec![
                Span::Plain("게시물 "),
                Span::Marked("ÉCOLE"),
                Span::Plain(" "),
                Span::Marked("école"),
            ]
        );
    }

    #[test]
    fn pagination_controls() {
        let first = Pagination { skip: 0, limit: 10, total: 25 };
        assert!(!first.has_prev());
        assert!(first.has_next());
        assert_eq!((first.page(), first.pages()), (1, 3));

        let last = Pagination { skip: 20, limit: 10, total: 25 };
        assert!(last.has_prev());
        assert!(!last.has_next());
        assert_eq!(last.prev_skip(), 10);

        let odd = Pagination { skip: 5, limit: 10, total: 15 };
        assert_eq!(odd.prev_skip(), 0);
        assert!(!odd.has_next());
    }

    #[test]
    fn chips_flag_active_tag() {
        let chips = tag_chips(&post(1, 1, &["love", "history"]), Some("history"));
        assert!(!chips[0].active);
        assert!(chips[1].active);
    }

    /// Marked spans are kept, plain spans are searched again.
    fn highlight_spans<'a>(spans: &[Span<'a>], query: &str) -> Vec<Span<'a>> {
        spans
            .iter()
            .flat_map(|span| match span {
                Span::Plain(text) => highlight(*text, query),
                Span::Marked(text) => vec![Span::Marked(*text)],
            })
            .collect()
    }

    proptest! {
        #[test]
        fn highlight_is_idempotent(text in "[a-cA-C ]{0,24}", query in "[a-cA-C]{1,3}") {
            let once = highlight(&text, &query);
            prop_assert_eq!(highlight_spans(&once, &query), once.clone());
            let joined: String = once.iter().map(|s| match s {
                Span::Plain(t) | Span::Marked(t) => *t,
            }).collect();
            prop_assert_eq!(joined, text);
        }

        #[test]
        fn pagination_bounds(skip in 0u32..200, limit in 1u32..50, total in 0u32..200) {
            let pagination = Pagination { skip, limit, total };
            prop_assert_eq!(pagination.has_next(), skip + limit < total);
            prop_assert_eq!(pagination.has_prev(), skip != 0);
        }
    }
}
