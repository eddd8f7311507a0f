//! Purpose: Content host contract consumed by the grid renderer.
//! Exports: `ContentItem`, `ContentQuery`, `ResultSet`, `ContentHost`.
//! Role: Black-box collaborator boundary; hosts own item lifecycle entirely.
//! Invariants: The renderer never creates, mutates, or deletes items.
//! Invariants: `total_pages` is computed over the filtered set, not the returned page.

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::settings::{OrderBy, PostStatus, Settings, SortOrder};

fn default_kind() -> String {
    "post".to_string()
}

fn default_status() -> String {
    "publish".to_string()
}

/// One item as the content host exposes it. Timestamps are RFC 3339 text,
/// matching the wire and file representation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(default)]
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_status")]
    pub status: String,
}

impl ContentItem {
    pub fn permalink(&self) -> &str {
        &self.permalink
    }

    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref().filter(|url| !url.is_empty())
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail().is_some()
    }

    /// Modification timestamp, falling back to publication time.
    pub fn modified(&self) -> &str {
        self.modified.as_deref().unwrap_or(&self.date)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContentQuery {
    pub limit: u64,
    pub offset: u64,
    pub orderby: OrderBy,
    pub order: SortOrder,
    pub post_type: String,
    pub post_status: PostStatus,
}

impl ContentQuery {
    /// The renderer's query for one page of the grid. Page numbers are
    /// 1-based; zero normalizes to the first page.
    pub fn for_page(settings: &Settings, page: u64) -> Self {
        let page = page.max(1);
        Self {
            limit: settings.posts_per_page,
            offset: (page - 1) * settings.posts_per_page,
            orderby: settings.orderby,
            order: settings.order,
            post_type: settings.post_type.clone(),
            post_status: settings.post_status,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    pub items: Vec<ContentItem>,
    pub total_pages: u64,
}

pub fn total_pages(total_items: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total_items.div_ceil(limit)
}

/// System-of-record boundary. Implementations: the local file store and the
/// remote HTTP client.
pub trait ContentHost {
    fn query(&self, query: &ContentQuery) -> Result<ResultSet, Error>;
}
