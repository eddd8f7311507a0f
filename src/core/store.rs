//! Purpose: JSON-file content store implementing the content host contract.
//! Exports: `FileStore`.
//! Role: Local system of record so the CLI and server have a working host.
//! Invariants: A missing file is an empty store, not an error.
//! Invariants: Query results are deterministic; ties break by ascending id.

use std::cmp::Ordering;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::content::{ContentHost, ContentItem, ContentQuery, ResultSet, total_pages};
use crate::core::error::{Error, ErrorKind};
use crate::core::settings::{OrderBy, SortOrder};

#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_items(&self) -> Result<Vec<ContentItem>, Error> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("failed to read content file")
                    .with_path(&self.path)
                    .with_source(err));
            }
        };
        serde_json::from_str(&contents).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("content file is not a JSON array of items")
                .with_path(&self.path)
                .with_source(err)
        })
    }

    /// Append one item, assigning the next id and a derived permalink when
    /// the caller left them unset, and rewrite the file.
    pub fn add(&self, mut item: ContentItem) -> Result<ContentItem, Error> {
        let mut items = self.load_items()?;
        if item.id == 0 {
            item.id = items.iter().map(|existing| existing.id).max().unwrap_or(0) + 1;
        }
        if item.permalink.is_empty() {
            item.permalink = format!("/posts/{}", item.id);
        }
        items.push(item.clone());
        self.save_items(&items)?;
        Ok(item)
    }

    fn save_items(&self, items: &[ContentItem]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to create content directory")
                    .with_path(parent)
                    .with_source(err)
            })?;
        }
        let mut body = serde_json::to_string_pretty(items).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode content items")
                .with_source(err)
        })?;
        body.push('\n');
        std::fs::write(&self.path, body).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write content file")
                .with_path(&self.path)
                .with_source(err)
        })
    }
}

impl ContentHost for FileStore {
    fn query(&self, query: &ContentQuery) -> Result<ResultSet, Error> {
        let mut items: Vec<ContentItem> = self
            .load_items()?
            .into_iter()
            .filter(|item| {
                item.kind == query.post_type && item.status == query.post_status.as_str()
            })
            .collect();

        items.sort_by(|a, b| {
            let key = compare_key(a, b, query.orderby);
            let key = match query.order {
                SortOrder::Asc => key,
                SortOrder::Desc => key.reverse(),
            };
            key.then(a.id.cmp(&b.id))
        });

        let pages = total_pages(items.len() as u64, query.limit);
        let start = (query.offset as usize).min(items.len());
        let end = (start + query.limit as usize).min(items.len());
        items = items[start..end].to_vec();

        Ok(ResultSet {
            items,
            total_pages: pages,
        })
    }
}

fn compare_key(a: &ContentItem, b: &ContentItem, orderby: OrderBy) -> Ordering {
    match orderby {
        OrderBy::Date => compare_timestamps(&a.date, &b.date),
        OrderBy::Modified => compare_timestamps(a.modified(), b.modified()),
        OrderBy::Title => compare_text(&a.title, &b.title),
        OrderBy::Author => compare_text(&a.author, &b.author),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

// RFC 3339 when both sides parse; otherwise plain text so malformed
// timestamps still order deterministically.
fn compare_timestamps(a: &str, b: &str) -> Ordering {
    match (parse_timestamp(a), parse_timestamp(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{PostStatus, Settings};

    fn item(id: u64, title: &str, date: &str) -> ContentItem {
        ContentItem {
            id,
            title: title.to_string(),
            permalink: format!("/posts/{id}"),
            excerpt: String::new(),
            thumbnail: None,
            author: String::new(),
            date: date.to_string(),
            modified: None,
            kind: "post".to_string(),
            status: "publish".to_string(),
        }
    }

    fn store_with(items: &[ContentItem]) -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path().join("content.json"));
        for entry in items {
            store.add(entry.clone()).expect("add");
        }
        (dir, store)
    }

    fn query() -> ContentQuery {
        ContentQuery::for_page(&Settings::default(), 1)
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path().join("content.json"));
        let result = store.query(&query()).expect("query");
        assert!(result.items.is_empty());
        assert_eq!(result.total_pages, 0);
    }

    #[test]
    fn malformed_file_is_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("content.json");
        std::fs::write(&path, "{not json").expect("write");
        let err = FileStore::open(&path).query(&query()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn sorts_by_date_with_direction() {
        let (_dir, store) = store_with(&[
            item(1, "Mid", "2026-02-01T00:00:00Z"),
            item(2, "Old", "2026-01-01T00:00:00Z"),
            item(3, "New", "2026-03-01T00:00:00Z"),
        ]);

        let mut by_date = query();
        let asc = store.query(&by_date).expect("query");
        let titles: Vec<&str> = asc.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Old", "Mid", "New"]);

        by_date.order = SortOrder::Desc;
        let desc = store.query(&by_date).expect("query");
        let titles: Vec<&str> = desc.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["New", "Mid", "Old"]);
    }

    #[test]
    fn title_sort_ignores_case_and_breaks_ties_by_id() {
        let (_dir, store) = store_with(&[
            item(1, "beta", "2026-01-01T00:00:00Z"),
            item(2, "Alpha", "2026-01-02T00:00:00Z"),
            item(3, "alpha", "2026-01-03T00:00:00Z"),
        ]);

        let mut by_title = query();
        by_title.orderby = OrderBy::Title;
        let result = store.query(&by_title).expect("query");
        let ids: Vec<u64> = result.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, [2, 3, 1]);
    }

    #[test]
    fn filters_by_type_and_status() {
        let mut draft = item(1, "Draft", "2026-01-01T00:00:00Z");
        draft.status = "draft".to_string();
        let mut page = item(2, "Page", "2026-01-02T00:00:00Z");
        page.kind = "page".to_string();
        let post = item(3, "Post", "2026-01-03T00:00:00Z");
        let (_dir, store) = store_with(&[draft, page, post]);

        let result = store.query(&query()).expect("query");
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].title, "Post");

        let mut drafts = query();
        drafts.post_status = PostStatus::Draft;
        let result = store.query(&drafts).expect("query");
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].title, "Draft");
    }

    #[test]
    fn paging_slices_and_reports_total_pages() {
        let entries: Vec<ContentItem> = (1..=7)
            .map(|n| item(n, &format!("Post {n}"), &format!("2026-01-0{n}T00:00:00Z")))
            .collect();
        let (_dir, store) = store_with(&entries);

        let mut settings = Settings::default();
        settings.posts_per_page = 3;

        let first = store
            .query(&ContentQuery::for_page(&settings, 1))
            .expect("query");
        assert_eq!(first.items.len(), 3);
        assert_eq!(first.total_pages, 3);

        let last = store
            .query(&ContentQuery::for_page(&settings, 3))
            .expect("query");
        assert_eq!(last.items.len(), 1);

        // Past the last page: empty items, unchanged page count.
        let beyond = store
            .query(&ContentQuery::for_page(&settings, 9))
            .expect("query");
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_pages, 3);
    }

    #[test]
    fn add_assigns_ids_and_permalinks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path().join("content.json"));

        let mut first = item(0, "First", "2026-01-01T00:00:00Z");
        first.permalink = String::new();
        let first = store.add(first).expect("add");
        assert_eq!(first.id, 1);
        assert_eq!(first.permalink, "/posts/1");

        let mut second = item(0, "Second", "2026-01-02T00:00:00Z");
        second.permalink = String::new();
        let second = store.add(second).expect("add");
        assert_eq!(second.id, 2);
    }
}
