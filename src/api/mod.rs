//! Purpose: Define the stable public Rust API boundary for postgrid.
//! Exports: Core types and operations needed by the CLI, server, and tests.
//! Role: Public, additive-only surface; internal module layout stays private.

mod client;
mod remote;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::content::{ContentHost, ContentItem, ContentQuery, ResultSet};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::render::{NO_POSTS_MESSAGE, render};
pub use crate::core::settings::{
    Columns, ImagePosition, OrderBy, PostStatus, Rejected, SETTING_KEYS, SettingKey, Settings,
    SortOrder,
};
pub use crate::core::shortcode::{ExpandContext, GRID_TAG, ShortcodeRegistry};
pub use crate::core::store::FileStore;
pub use client::{ApiResult, LocalClient};
pub use remote::RemoteHost;
