//! Model search filters
//!
//! Typed builder for the `/search` endpoint's query parameters.

use crate::error::{Error, Result};
use crate::types::{OptionStringExt, QueryParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Search endpoint, relative to the base URL
pub const SEARCH_ENDPOINT: &str = "/search";

/// Parameters set by [`SearchOptions`]; `extra` may not override them
pub const KNOWN_FILTERS: &[&str] = &[
    "type",
    "q",
    "user",
    "categories",
    "tags",
    "licenses",
    "downloadable",
    "animated",
    "min_face_count",
    "max_face_count",
    "sort_by",
];

/// Result ordering
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Best match first
    #[default]
    #[value(alias = "-relevance")]
    Relevance,
    /// Most liked first
    #[value(alias = "-likeCount")]
    Likes,
    /// Most viewed first
    #[value(alias = "-viewCount")]
    Views,
    /// Most recently published first
    #[value(alias = "-publishedAt")]
    Newest,
    /// Oldest publication first
    #[value(alias = "publishedAt")]
    Oldest,
    /// Most recently created first
    #[value(alias = "-createdAt")]
    RecentlyCreated,
    /// Oldest creation first
    #[value(alias = "createdAt")]
    FirstCreated,
}

impl SortOrder {
    /// Value sent as `sort_by`
    pub fn as_param(self) -> &'static str {
        match self {
            SortOrder::Relevance => "-relevance",
            SortOrder::Likes => "-likeCount",
            SortOrder::Views => "-viewCount",
            SortOrder::Newest => "-publishedAt",
            SortOrder::Oldest => "publishedAt",
            SortOrder::RecentlyCreated => "-createdAt",
            SortOrder::FirstCreated => "createdAt",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Filters for a model search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Free-text query
    pub query: Option<String>,
    /// Category slugs
    pub categories: Vec<String>,
    /// Tag slugs
    pub tags: Vec<String>,
    /// License slugs
    pub licenses: Vec<String>,
    /// Only downloadable (or only non-downloadable) models
    pub downloadable: Option<bool>,
    /// Only animated (or only static) models
    pub animated: Option<bool>,
    /// Minimum face count
    pub min_face_count: Option<u64>,
    /// Maximum face count
    pub max_face_count: Option<u64>,
    /// Restrict to one user's models
    pub user: Option<String>,
    /// Ordering
    pub sort_by: SortOrder,
    /// Resource type, sent as `type`
    pub resource_type: String,
    /// Pass-through parameters
    pub extra: BTreeMap<String, String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            query: None,
            categories: Vec::new(),
            tags: Vec::new(),
            licenses: Vec::new(),
            downloadable: None,
            animated: None,
            min_face_count: None,
            max_face_count: None,
            user: None,
            sort_by: SortOrder::default(),
            resource_type: "models".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl SearchOptions {
    /// Search for a free-text query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into().none_if_empty(),
            ..Self::default()
        }
    }

    /// Filter by category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Filter by tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Filter by license
    #[must_use]
    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.licenses.push(license.into());
        self
    }

    /// Set the downloadable filter
    #[must_use]
    pub fn downloadable(mut self, value: bool) -> Self {
        self.downloadable = Some(value);
        self
    }

    /// Set the animated filter
    #[must_use]
    pub fn animated(mut self, value: bool) -> Self {
        self.animated = Some(value);
        self
    }

    /// Set the face count range
    #[must_use]
    pub fn with_face_count(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_face_count = min;
        self.max_face_count = max;
        self
    }

    /// Set the ordering
    #[must_use]
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort_by = sort;
        self
    }

    /// Add a pass-through parameter
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Label used for checkpoint names
    pub fn label(&self) -> String {
        match self.query.as_deref() {
            Some(query) => format!("search_{query}"),
            None => "search".to_string(),
        }
    }

    /// Build the query parameters for the first page
    pub fn to_params(&self) -> Result<QueryParams> {
        if let Some(key) = self
            .extra
            .keys()
            .find(|key| KNOWN_FILTERS.contains(&key.as_str()))
        {
            return Err(Error::invalid_value(
                format!("extra.{key}"),
                "collides with a search filter; use the dedicated option",
            ));
        }

        if let (Some(min), Some(max)) = (self.min_face_count, self.max_face_count) {
            if min > max {
                return Err(Error::invalid_value(
                    "min_face_count",
                    format!("{min} exceeds max_face_count {max}"),
                ));
            }
        }

        let mut params = vec![("type".to_string(), self.resource_type.clone())];
        let mut push = |key: &str, value: String| params.push((key.to_string(), value));

        if let Some(query) = self.query.as_deref().filter(|q| !q.trim().is_empty()) {
            push("q", query.to_string());
        }
        if let Some(user) = &self.user {
            push("user", user.clone());
        }
        if !self.categories.is_empty() {
            push("categories", self.categories.join(","));
        }
        if !self.tags.is_empty() {
            push("tags", self.tags.join(","));
        }
        if !self.licenses.is_empty() {
            push("licenses", self.licenses.join(","));
        }
        if let Some(downloadable) = self.downloadable {
            push("downloadable", downloadable.to_string());
        }
        if let Some(animated) = self.animated {
            push("animated", animated.to_string());
        }
        if let Some(min) = self.min_face_count {
            push("min_face_count", min.to_string());
        }
        if let Some(max) = self.max_face_count {
            push("max_face_count", max.to_string());
        }
        push("sort_by", self.sort_by.as_param().to_string());

        params.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(params)
    }
}
