//! The navigable location is the only persisted screen state.
//!
//! [`Location`] keeps the raw query parameters in the order they appeared,
//! [`QueryState`] is the typed view of them. Every state change goes through
//! [`Location::update`] with a [`LocationUpdate`], so a location string alone
//! is enough to rebuild the whole screen.

use std::fmt;

use clap::ValueEnum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use crate::entity::PostId;

pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
    fn parse(value: &str) -> Self {
        match value {
            "desc" => Self::Desc,
            _ => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Detail,
    Edit,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detail => "detail",
            Self::Edit => "edit",
        }
    }
    fn parse(value: &str) -> Option<Self> {
        match value {
            "detail" => Some(Self::Detail),
            "edit" => Some(Self::Edit),
            _ => None,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Skip,
    Limit,
    Search,
    SortBy,
    SortOrder,
    Tag,
    SelectedPostId,
    Mode,
}

impl Param {
    pub const ALL: [Param; 8] = [
        Self::Skip,
        Self::Limit,
        Self::Search,
        Self::SortBy,
        Self::SortOrder,
        Self::Tag,
        Self::SelectedPostId,
        Self::Mode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Limit => "limit",
            Self::Search => "search",
            Self::SortBy => "sortBy",
            Self::SortOrder => "sortOrder",
            Self::Tag => "tag",
            Self::SelectedPostId => "selectedPostId",
            Self::Mode => "mode",
        }
    }
}

/// Everything the screen displays, derived from the location alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryState {
    pub skip: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub tag: Option<String>,
    pub selected_post_id: Option<PostId>,
    pub mode: Option<ViewMode>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
            search: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
            tag: None,
            selected_post_id: None,
            mode: None,
        }
    }
}

impl QueryState {
    pub fn from_query(query: &str) -> Self {
        Location::parse(query).read()
    }

    /// Serialize into a location query, leaving out every default value.
    pub fn to_query(&self) -> String {
        let mut location = Location::default();
        location.update(self.to_update());
        location.query()
    }

    /// A full update that moves any location to exactly this state.
    pub fn to_update(&self) -> LocationUpdate {
        let defaults = Self::default();
        LocationUpdate::new()
            .set_opt(Param::Skip, (self.skip != defaults.skip).then_some(self.skip))
            .set_opt(Param::Limit, (self.limit != defaults.limit).then_some(self.limit))
            .set_opt(Param::Search, self.search.as_deref())
            .set_opt(Param::SortBy, self.sort_by.as_deref())
            .set_opt(
                Param::SortOrder,
                (self.sort_order != defaults.sort_order).then_some(self.sort_order),
            )
            .set_opt(Param::Tag, self.tag.as_deref())
            .set_opt(Param::SelectedPostId, self.selected_post_id)
            .set_opt(Param::Mode, self.mode)
    }
}

/// A partial change of location parameters. `None` removes the parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationUpdate(Vec<(Param, Option<String>)>);

impl LocationUpdate {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set(mut self, param: Param, value: impl ToString) -> Self {
        self.0.push((param, Some(value.to_string())));
        self
    }
    pub fn remove(mut self, param: Param) -> Self {
        self.0.push((param, None));
        self
    }
    pub fn set_opt<T: ToString>(self, param: Param, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(param, value),
            None => self.remove(param),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The current navigable location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    params: Vec<(String, String)>,
}

impl Location {
    /// Accepts a bare query (`skip=10`), a query with its `?`, or a full URL.
    /// Only the part before the first `?` decides whether it is a URL.
    pub fn parse(location: &str) -> Self {
        let base = location.split('?').next().unwrap_or_default();
        let query = if base.contains("://") {
            match Url::parse(location) {
                Ok(url) => url.query().unwrap_or_default().to_string(),
                Err(e) => {
                    warn!("Ignoring malformed location {}: {}", location, e);
                    location
                        .split_once('?')
                        .map(|(_, query)| query.to_string())
                        .unwrap_or_default()
                }
            }
        } else {
            location.trim_start_matches('?').to_string()
        };
        let params = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self { params }
    }

    pub fn get(&self, param: Param) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == param.as_str())
            .map(|(_, value)| value.as_str())
    }

    pub fn read(&self) -> QueryState {
        let defaults = QueryState::default();
        let text = |param| {
            self.get(param)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        QueryState {
            skip: self
                .get(Param::Skip)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.skip),
            limit: self
                .get(Param::Limit)
                .and_then(|v| v.parse().ok())
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.limit),
            search: text(Param::Search),
            sort_by: text(Param::SortBy).filter(|field| field != "none"),
            sort_order: self
                .get(Param::SortOrder)
                .map(SortOrder::parse)
                .unwrap_or(defaults.sort_order),
            tag: text(Param::Tag),
            selected_post_id: self
                .get(Param::SelectedPostId)
                .and_then(|v| v.parse().ok()),
            mode: self.get(Param::Mode).and_then(ViewMode::parse),
        }
    }

    /// Merge `update` into the current parameters and navigate there.
    /// Existing parameters keep their position, new ones are appended.
    pub fn update(&mut self, update: LocationUpdate) {
        if update.is_empty() {
            return;
        }
        let previous = self.params.clone();
        for (param, value) in update.0 {
            let key = param.as_str();
            match value {
                Some(value) => match self.params.iter_mut().find(|(k, _)| k == key) {
                    Some(slot) => slot.1 = value,
                    None => self.params.push((key.to_string(), value)),
                },
                None => self.params.retain(|(k, _)| k != key),
            }
        }
        if previous != self.params {
            debug!("Navigate to {}", self.query());
        }
    }

    pub fn query(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();
        format!("?{}", query)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.query())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_location_reads_defaults() {
        let state = Location::default().read();
        assert_eq!(state, QueryState::default());
        assert_eq!(state.limit, 10);
        assert_eq!(state.sort_order, SortOrder::Asc);
    }

    #[test]
    fn reads_every_parameter() {
        let location = Location::parse(
            "?skip=20&limit=30&search=his%20mother&sortBy=title&sortOrder=desc&tag=love&selectedPostId=7&mode=edit",
        );
        let state = location.read();
        assert_eq!(state.skip, 20);
        assert_eq!(state.limit, 30);
        assert_eq!(state.search.as_deref(), Some("his mother"));
        assert_eq!(state.sort_by.as_deref(), Some("title"));
        assert_eq!(state.sort_order, SortOrder::Desc);
        assert_eq!(state.tag.as_deref(), Some("love"));
        assert_eq!(state.selected_post_id, Some(7));
        assert_eq!(state.mode, Some(ViewMode::Edit));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let state = QueryState::from_query("skip=abc&limit=0&sortOrder=up&mode=x&sortBy=none");
        assert_eq!(state, QueryState::default());
    }

    #[test]
    fn full_url_is_accepted() {
        let state = QueryState::from_query("http://localhost:5173/?tag=history");
        assert_eq!(state.tag.as_deref(), Some("history"));

        let state = QueryState::from_query("http://localhost:5173/");
        assert_eq!(state, QueryState::default());
    }

    #[test]
    fn urls_inside_values_stay_in_the_query() {
        let state = QueryState::from_query("?search=see://here&tag=web");
        assert_eq!(state.search.as_deref(), Some("see://here"));
        assert_eq!(state.tag.as_deref(), Some("web"));

        let state = QueryState::from_query("search=a%3A%2F%2Fb");
        assert_eq!(state.search.as_deref(), Some("a://b"));
    }

    #[test]
    fn malformed_url_keeps_its_query() {
        let state = QueryState::from_query("http://[broken/?tag=love");
        assert_eq!(state.tag.as_deref(), Some("love"));
    }

    #[test]
    fn update_merges_and_removes() {
        let mut location = Location::parse("?search=foo&skip=30&other=keep");
        location.update(
            LocationUpdate::new()
                .remove(Param::Search)
                .set(Param::Skip, 0)
                .set(Param::Tag, "love"),
        );
        assert_eq!(location.query(), "?skip=0&other=keep&tag=love");
    }

    #[test]
    fn setting_the_same_value_keeps_the_location() {
        let mut location = Location::parse("?tag=a&skip=0");
        location.update(LocationUpdate::new().set(Param::Tag, "a"));
        assert_eq!(location.query(), "?tag=a&skip=0");
    }

    #[test]
    fn defaults_serialize_to_nothing() {
        assert_eq!(QueryState::default().to_query(), "");
    }

    fn arb_text() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[a-zA-Z0-9 &=?%+]{1,12}")
    }

    fn arb_state() -> impl Strategy<Value = QueryState> {
        (
            0u32..1000,
            1u32..100,
            arb_text(),
            prop::option::of(prop::sample::select(vec!["id", "title", "reactions"])),
            prop::sample::select(vec![SortOrder::Asc, SortOrder::Desc]),
            arb_text(),
            prop::option::of(1u32..500),
            prop::option::of(prop::sample::select(vec![ViewMode::Detail, ViewMode::Edit])),
        )
            .prop_map(
                |(skip, limit, search, sort_by, sort_order, tag, selected_post_id, mode)| {
                    QueryState {
                        skip,
                        limit,
                        search,
                        sort_by: sort_by.map(str::to_string),
                        sort_order,
                        tag,
                        selected_post_id,
                        mode,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn query_state_round_trips(state in arb_state()) {
            let query = state.to_query();
            prop_assert_eq!(QueryState::from_query(&query), state);
        }

        #[test]
        fn full_update_overrides_any_location(before in arb_state(), after in arb_state()) {
            let mut location = Location::parse(&before.to_query());
            location.update(after.to_update());
            prop_assert_eq!(location.read(), after);
        }
    }
}
