//! Purpose: Typed display settings with total defaults and sanitize-on-write.
//! Exports: `Settings`, `SettingKey`, `Rejected`, option enums.
//! Role: Leaf configuration store consumed by the renderer and admin surfaces.
//! Invariants: Every option resolves to a valid value; absence is never an error.
//! Invariants: A rejected write leaves the stored value unchanged (no partial writes).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_json::{Value, json};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderBy {
    Date,
    Title,
    Author,
    Modified,
}

impl OrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderBy::Date => "date",
            OrderBy::Title => "title",
            OrderBy::Author => "author",
            OrderBy::Modified => "modified",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        [
            OrderBy::Date,
            OrderBy::Title,
            OrderBy::Author,
            OrderBy::Modified,
        ]
        .into_iter()
        .find(|candidate| token.eq_ignore_ascii_case(candidate.as_str()))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("ASC") {
            Some(SortOrder::Asc)
        } else if token.eq_ignore_ascii_case("DESC") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PostStatus {
    Publish,
    Draft,
    Pending,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        [PostStatus::Publish, PostStatus::Draft, PostStatus::Pending]
            .into_iter()
            .find(|candidate| token.eq_ignore_ascii_case(candidate.as_str()))
    }
}

/// Grid layout width. Out-of-enum numerals are unrepresentable once stored;
/// unrecognized input falls back at the parse boundary instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Columns {
    One,
    Two,
    Three,
}

impl Columns {
    pub fn as_u8(self) -> u8 {
        match self {
            Columns::One => 1,
            Columns::Two => 2,
            Columns::Three => 3,
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "1" => Some(Columns::One),
            "2" => Some(Columns::Two),
            "3" => Some(Columns::Three),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SettingKey {
    PostsPerPage,
    Columns,
    OrderBy,
    Order,
    PostType,
    PostStatus,
    ShowFeaturedImage,
    FeaturedImagePosition,
    EnableReadMore,
    ReadMoreText,
    ExcerptLength,
}

pub const SETTING_KEYS: [SettingKey; 11] = [
    SettingKey::PostsPerPage,
    SettingKey::Columns,
    SettingKey::OrderBy,
    SettingKey::Order,
    SettingKey::PostType,
    SettingKey::PostStatus,
    SettingKey::ShowFeaturedImage,
    SettingKey::FeaturedImagePosition,
    SettingKey::EnableReadMore,
    SettingKey::ReadMoreText,
    SettingKey::ExcerptLength,
];

impl SettingKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::PostsPerPage => "posts_per_page",
            SettingKey::Columns => "columns",
            SettingKey::OrderBy => "orderby",
            SettingKey::Order => "order",
            SettingKey::PostType => "post_type",
            SettingKey::PostStatus => "post_status",
            SettingKey::ShowFeaturedImage => "show_featured_image",
            SettingKey::FeaturedImagePosition => "featured_image_position",
            SettingKey::EnableReadMore => "enable_read_more",
            SettingKey::ReadMoreText => "read_more_text",
            SettingKey::ExcerptLength => "excerpt_length",
        }
    }
}

impl FromStr for SettingKey {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Error> {
        SETTING_KEYS
            .into_iter()
            .find(|key| key.as_str() == name)
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown setting `{name}`"))
                    .with_hint("Run `postgrid settings list` to see valid names.")
            })
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a refused write. The stored value is untouched; the grid
/// rendering path never observes this type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rejected {
    pub key: SettingKey,
    pub reason: String,
}

impl Rejected {
    fn new(key: SettingKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rejected value for `{}`: {}", self.key, self.reason)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub posts_per_page: u64,
    pub columns: Columns,
    pub orderby: OrderBy,
    pub order: SortOrder,
    pub post_type: String,
    pub post_status: PostStatus,
    pub show_featured_image: bool,
    pub featured_image_position: ImagePosition,
    pub enable_read_more: bool,
    pub read_more_text: String,
    pub excerpt_length: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImagePosition {
    Top,
    Left,
}

impl ImagePosition {
    pub fn as_str(self) -> &'static str {
        match self {
            ImagePosition::Top => "top",
            ImagePosition::Left => "left",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("top") {
            Some(ImagePosition::Top)
        } else if token.eq_ignore_ascii_case("left") {
            Some(ImagePosition::Left)
        } else {
            None
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            posts_per_page: 5,
            columns: Columns::One,
            orderby: OrderBy::Date,
            order: SortOrder::Asc,
            post_type: "post".to_string(),
            post_status: PostStatus::Publish,
            show_featured_image: true,
            featured_image_position: ImagePosition::Top,
            enable_read_more: false,
            read_more_text: "Read More".to_string(),
            excerpt_length: 20,
        }
    }
}

impl Settings {
    /// Field-wise resolution from a stored JSON object: a present,
    /// well-typed value wins; anything else resolves to the default.
    pub fn from_json(value: &Value) -> Self {
        let mut settings = Settings::default();
        let Some(object) = value.as_object() else {
            return settings;
        };

        if let Some(count) = object.get("posts_per_page").and_then(positive_count) {
            settings.posts_per_page = count;
        }
        if let Some(columns) = object
            .get("columns")
            .and_then(Value::as_u64)
            .and_then(|n| Columns::parse(&n.to_string()))
        {
            settings.columns = columns;
        }
        if let Some(orderby) = object
            .get("orderby")
            .and_then(Value::as_str)
            .and_then(OrderBy::parse)
        {
            settings.orderby = orderby;
        }
        if let Some(order) = object
            .get("order")
            .and_then(Value::as_str)
            .and_then(SortOrder::parse)
        {
            settings.order = order;
        }
        if let Some(post_type) = object
            .get("post_type")
            .and_then(Value::as_str)
            .filter(|name| is_identifier(name))
        {
            settings.post_type = post_type.to_string();
        }
        if let Some(status) = object
            .get("post_status")
            .and_then(Value::as_str)
            .and_then(PostStatus::parse)
        {
            settings.post_status = status;
        }
        if let Some(show) = object.get("show_featured_image").and_then(Value::as_bool) {
            settings.show_featured_image = show;
        }
        if let Some(position) = object
            .get("featured_image_position")
            .and_then(Value::as_str)
            .and_then(ImagePosition::parse)
        {
            settings.featured_image_position = position;
        }
        if let Some(enabled) = object.get("enable_read_more").and_then(Value::as_bool) {
            settings.enable_read_more = enabled;
        }
        if let Some(text) = object
            .get("read_more_text")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
        {
            settings.read_more_text = text.to_string();
        }
        if let Some(count) = object.get("excerpt_length").and_then(positive_count) {
            settings.excerpt_length = count;
        }

        settings
    }

    pub fn to_json(&self) -> Value {
        json!({
            "posts_per_page": self.posts_per_page,
            "columns": self.columns.as_u8(),
            "orderby": self.orderby.as_str(),
            "order": self.order.as_str(),
            "post_type": self.post_type,
            "post_status": self.post_status.as_str(),
            "show_featured_image": self.show_featured_image,
            "featured_image_position": self.featured_image_position.as_str(),
            "enable_read_more": self.enable_read_more,
            "read_more_text": self.read_more_text,
            "excerpt_length": self.excerpt_length,
        })
    }

    /// Read settings from disk. A missing or malformed file degrades to
    /// defaults; this path never fails.
    pub fn load(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Settings::default();
        };
        match serde_json::from_str::<Value>(&contents) {
            Ok(value) => Settings::from_json(&value),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring malformed settings file");
                Settings::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to create settings directory")
                    .with_path(parent)
                    .with_source(err)
            })?;
        }
        let mut body = serde_json::to_string_pretty(&self.to_json()).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode settings")
                .with_source(err)
        })?;
        body.push('\n');
        std::fs::write(path, body).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write settings file")
                .with_path(path)
                .with_source(err)
        })
    }

    /// Resolved value for one option, for admin-surface display.
    pub fn value(&self, key: SettingKey) -> Value {
        match key {
            SettingKey::PostsPerPage => json!(self.posts_per_page),
            SettingKey::Columns => json!(self.columns.as_u8()),
            SettingKey::OrderBy => json!(self.orderby.as_str()),
            SettingKey::Order => json!(self.order.as_str()),
            SettingKey::PostType => json!(self.post_type),
            SettingKey::PostStatus => json!(self.post_status.as_str()),
            SettingKey::ShowFeaturedImage => json!(self.show_featured_image),
            SettingKey::FeaturedImagePosition => json!(self.featured_image_position.as_str()),
            SettingKey::EnableReadMore => json!(self.enable_read_more),
            SettingKey::ReadMoreText => json!(self.read_more_text),
            SettingKey::ExcerptLength => json!(self.excerpt_length),
        }
    }

    /// Sanitize one raw form value into its option. Integer options parse
    /// best-effort and clamp below 1; enum and boolean options reject
    /// unrecognized tokens outright, leaving the stored value as it was.
    pub fn apply(&mut self, key: SettingKey, raw: &str) -> Result<(), Rejected> {
        match key {
            SettingKey::PostsPerPage => {
                self.posts_per_page = parse_count(key, raw)?;
            }
            SettingKey::ExcerptLength => {
                self.excerpt_length = parse_count(key, raw)?;
            }
            SettingKey::Columns => {
                self.columns = Columns::parse(raw)
                    .ok_or_else(|| Rejected::new(key, "expected 1, 2, or 3"))?;
            }
            SettingKey::OrderBy => {
                self.orderby = OrderBy::parse(raw).ok_or_else(|| {
                    Rejected::new(key, "expected date, title, author, or modified")
                })?;
            }
            SettingKey::Order => {
                self.order = SortOrder::parse(raw)
                    .ok_or_else(|| Rejected::new(key, "expected ASC or DESC"))?;
            }
            SettingKey::PostType => {
                let name = raw.trim();
                if !is_identifier(name) {
                    return Err(Rejected::new(key, "expected a non-empty identifier"));
                }
                self.post_type = name.to_string();
            }
            SettingKey::PostStatus => {
                self.post_status = PostStatus::parse(raw)
                    .ok_or_else(|| Rejected::new(key, "expected publish, draft, or pending"))?;
            }
            SettingKey::ShowFeaturedImage => {
                self.show_featured_image = parse_bool(key, raw)?;
            }
            SettingKey::FeaturedImagePosition => {
                self.featured_image_position = ImagePosition::parse(raw)
                    .ok_or_else(|| Rejected::new(key, "expected top or left"))?;
            }
            SettingKey::EnableReadMore => {
                self.enable_read_more = parse_bool(key, raw)?;
            }
            SettingKey::ReadMoreText => {
                let text = raw.trim();
                if text.is_empty() {
                    return Err(Rejected::new(key, "label must not be empty"));
                }
                self.read_more_text = text.to_string();
            }
        }
        Ok(())
    }
}

fn positive_count(value: &Value) -> Option<u64> {
    value.as_u64().map(|count| count.max(1))
}

fn parse_count(key: SettingKey, raw: &str) -> Result<u64, Rejected> {
    let parsed: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Rejected::new(key, "expected an integer"))?;
    Ok(parsed.max(1) as u64)
}

fn parse_bool(key: SettingKey, raw: &str) -> Result<bool, Rejected> {
    let token = raw.trim().to_ascii_lowercase();
    match token.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Rejected::new(key, "expected a boolean")),
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_option() {
        let settings = Settings::default();
        for key in SETTING_KEYS {
            assert!(!settings.value(key).is_null(), "no default for {key}");
        }
        assert_eq!(settings.posts_per_page, 5);
        assert_eq!(settings.columns, Columns::One);
        assert_eq!(settings.orderby, OrderBy::Date);
        assert_eq!(settings.order, SortOrder::Asc);
        assert_eq!(settings.post_type, "post");
        assert_eq!(settings.post_status, PostStatus::Publish);
        assert!(settings.show_featured_image);
        assert_eq!(settings.featured_image_position, ImagePosition::Top);
        assert!(!settings.enable_read_more);
        assert_eq!(settings.read_more_text, "Read More");
        assert_eq!(settings.excerpt_length, 20);
    }

    #[test]
    fn invalid_enum_write_keeps_prior_value() {
        let mut settings = Settings::default();
        settings.apply(SettingKey::OrderBy, "title").unwrap();

        let rejected = settings.apply(SettingKey::OrderBy, "rank").unwrap_err();
        assert_eq!(rejected.key, SettingKey::OrderBy);
        assert_eq!(settings.orderby, OrderBy::Title);

        assert!(settings.apply(SettingKey::Columns, "4").is_err());
        assert_eq!(settings.columns, Columns::One);
    }

    #[test]
    fn integer_writes_coerce_and_clamp() {
        let mut settings = Settings::default();
        settings.apply(SettingKey::PostsPerPage, " 12 ").unwrap();
        assert_eq!(settings.posts_per_page, 12);

        settings.apply(SettingKey::PostsPerPage, "0").unwrap();
        assert_eq!(settings.posts_per_page, 1);

        settings.apply(SettingKey::ExcerptLength, "-3").unwrap();
        assert_eq!(settings.excerpt_length, 1);

        assert!(settings.apply(SettingKey::ExcerptLength, "many").is_err());
        assert_eq!(settings.excerpt_length, 1);
    }

    #[test]
    fn boolean_writes_accept_common_tokens() {
        let mut settings = Settings::default();
        settings.apply(SettingKey::EnableReadMore, "1").unwrap();
        assert!(settings.enable_read_more);
        settings.apply(SettingKey::EnableReadMore, "off").unwrap();
        assert!(!settings.enable_read_more);
        assert!(settings.apply(SettingKey::EnableReadMore, "maybe").is_err());
    }

    #[test]
    fn post_type_requires_identifier() {
        let mut settings = Settings::default();
        assert!(settings.apply(SettingKey::PostType, "").is_err());
        assert!(settings.apply(SettingKey::PostType, "two words").is_err());
        settings.apply(SettingKey::PostType, "recipe").unwrap();
        assert_eq!(settings.post_type, "recipe");
    }

    #[test]
    fn json_round_trip_preserves_resolved_values() {
        let mut settings = Settings::default();
        settings.apply(SettingKey::Columns, "3").unwrap();
        settings.apply(SettingKey::Order, "DESC").unwrap();
        settings.apply(SettingKey::ReadMoreText, "Continue").unwrap();

        let restored = Settings::from_json(&settings.to_json());
        assert_eq!(restored, settings);
    }

    #[test]
    fn malformed_stored_fields_degrade_to_defaults() {
        let stored = serde_json::json!({
            "posts_per_page": "lots",
            "columns": 9,
            "orderby": "rank",
            "order": "DESC",
            "post_type": "",
            "read_more_text": "   ",
        });
        let settings = Settings::from_json(&stored);
        assert_eq!(settings.posts_per_page, 5);
        assert_eq!(settings.columns, Columns::One);
        assert_eq!(settings.orderby, OrderBy::Date);
        assert_eq!(settings.order, SortOrder::Desc);
        assert_eq!(settings.post_type, "post");
        assert_eq!(settings.read_more_text, "Read More");
    }

    #[test]
    fn unknown_setting_name_is_usage_error() {
        let err = "page_size".parse::<SettingKey>().unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Usage);
    }
}
