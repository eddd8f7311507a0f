//! Purpose: Project resolved settings plus queried content into a grid fragment.
//! Exports: `render`, `NO_POSTS_MESSAGE`, pagination labels.
//! Role: Pure function of (settings, query results, page number); no side effects.
//! Invariants: An empty result set is a normal outcome, never an error.
//! Invariants: All item text is HTML-escaped; truncation happens before escaping.

use crate::core::content::{ContentHost, ContentItem, ContentQuery};
use crate::core::error::Error;
use crate::core::excerpt::trim_words;
use crate::core::html::{escape_attr, escape_text};
use crate::core::settings::{Columns, ImagePosition, Settings};

pub const NO_POSTS_MESSAGE: &str = "No posts found";
pub const PREV_LABEL: &str = "&laquo; Previous";
pub const NEXT_LABEL: &str = "Next &raquo;";

/// Render one page of the grid. Host faults propagate unmodified; a page
/// past the end of the result set yields the no-content message like any
/// other empty page.
pub fn render(settings: &Settings, host: &dyn ContentHost, page: u64) -> Result<String, Error> {
    let page = page.max(1);
    let query = ContentQuery::for_page(settings, page);
    let result = host.query(&query)?;

    if result.items.is_empty() {
        return Ok(NO_POSTS_MESSAGE.to_string());
    }

    let mut out = String::new();
    out.push_str(&format!(
        "<div class=\"post-grid {}\">\n",
        columns_class(settings.columns)
    ));
    for item in &result.items {
        push_item(&mut out, settings, item);
    }
    out.push_str("</div>\n");

    out.push_str("<div class=\"pagination\">\n");
    push_page_links(&mut out, result.total_pages, page);
    out.push_str("</div>\n");

    Ok(out)
}

fn columns_class(columns: Columns) -> &'static str {
    match columns {
        Columns::One => "one-column",
        Columns::Two => "two-columns",
        Columns::Three => "three-columns",
    }
}

fn position_class(position: ImagePosition) -> &'static str {
    match position {
        ImagePosition::Top => "image-top",
        ImagePosition::Left => "image-left",
    }
}

fn push_item(out: &mut String, settings: &Settings, item: &ContentItem) {
    out.push_str(&format!(
        "<div class=\"post-item {}\">\n",
        position_class(settings.featured_image_position)
    ));

    if settings.show_featured_image {
        if let Some(thumbnail) = item.thumbnail() {
            out.push_str(&format!(
                "<div class=\"post-thumbnail\"><img class=\"img-fluid\" src=\"{}\" alt=\"{}\"></div>\n",
                escape_attr(thumbnail),
                escape_attr(&item.title)
            ));
        }
    }

    out.push_str("<div class=\"post-content\">\n");
    out.push_str(&format!(
        "<h2 class=\"post-title\"><a class=\"post-link\" href=\"{}\">{}</a></h2>\n",
        escape_attr(item.permalink()),
        escape_text(&item.title)
    ));
    out.push_str(&format!(
        "<p class=\"post-excerpt\">{}</p>\n",
        escape_text(&trim_words(item.excerpt(), settings.excerpt_length))
    ));
    if settings.enable_read_more {
        out.push_str(&format!(
            "<a class=\"read-more-btn\" href=\"{}\">{}</a>\n",
            escape_attr(item.permalink()),
            escape_text(&settings.read_more_text)
        ));
    }
    out.push_str("</div>\n");
    out.push_str("</div>\n");
}

// Mirrors the usual blog pagination strip: previous / numbered pages with
// the current page inert / next. Single-page sets emit nothing.
fn push_page_links(out: &mut String, total_pages: u64, current: u64) {
    if total_pages <= 1 {
        return;
    }
    if current > 1 {
        out.push_str(&format!(
            "<a class=\"prev page-numbers\" href=\"?paged={}\">{}</a>\n",
            current - 1,
            PREV_LABEL
        ));
    }
    for page in 1..=total_pages {
        if page == current {
            out.push_str(&format!(
                "<span class=\"page-numbers current\">{page}</span>\n"
            ));
        } else {
            out.push_str(&format!(
                "<a class=\"page-numbers\" href=\"?paged={page}\">{page}</a>\n"
            ));
        }
    }
    if current < total_pages {
        out.push_str(&format!(
            "<a class=\"next page-numbers\" href=\"?paged={}\">{}</a>\n",
            current + 1,
            NEXT_LABEL
        ));
    }
}
