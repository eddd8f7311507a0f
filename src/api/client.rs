//! Purpose: Local client surface tying settings, content store, and renderer together.
//! Exports: `LocalClient`.
//! Role: Stable boundary for the CLI and server; mirrors their path resolution.
//! Invariants: Settings resolution is total; a missing data directory means defaults.

use std::path::{Path, PathBuf};

use crate::core::error::Error;
use crate::core::render;
use crate::core::settings::Settings;
use crate::core::shortcode::{ExpandContext, GRID_TAG, ShortcodeRegistry};
use crate::core::store::FileStore;
use crate::store_paths::{content_path, default_data_dir, settings_path};

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug)]
pub struct LocalClient {
    data_dir: PathBuf,
}

impl LocalClient {
    pub fn new() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn load_settings(&self) -> Settings {
        Settings::load(&settings_path(&self.data_dir))
    }

    pub fn save_settings(&self, settings: &Settings) -> ApiResult<()> {
        settings.save(&settings_path(&self.data_dir))
    }

    pub fn content_store(&self) -> FileStore {
        FileStore::open(content_path(&self.data_dir))
    }

    /// Render one grid page against the local store with current settings.
    pub fn render_page(&self, page: u64) -> ApiResult<String> {
        let settings = self.load_settings();
        let store = self.content_store();
        render::render(&settings, &store, page)
    }

    /// Expand grid triggers in a document the way a template host would:
    /// the renderer is registered as the handler for `[post-grid]`.
    pub fn expand_document(&self, document: &str, page: u64) -> ApiResult<String> {
        let settings = self.load_settings();
        let store = self.content_store();
        let mut registry = ShortcodeRegistry::new();
        registry.register(GRID_TAG, |ctx: &ExpandContext| {
            render::render(&settings, &store, ctx.page)
        });
        registry.expand(document, &ExpandContext { page })
    }
}

impl Default for LocalClient {
    fn default() -> Self {
        Self::new()
    }
}
