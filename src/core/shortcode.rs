//! Purpose: Bind named placeholder triggers to render handlers and expand documents.
//! Exports: `ShortcodeRegistry`, `ExpandContext`, `GRID_TAG`.
//! Role: The template-expansion seam; the init shim registers the grid renderer here.
//! Invariants: Unregistered bracketed text passes through untouched.
//! Invariants: Handler errors abort the current expansion only.

use crate::core::error::Error;

pub const GRID_TAG: &str = "post-grid";

/// Per-expansion navigation state. Triggers accept no other parameters;
/// settings always come from the store the handler captured.
#[derive(Clone, Copy, Debug)]
pub struct ExpandContext {
    pub page: u64,
}

type Handler<'a> = Box<dyn Fn(&ExpandContext) -> Result<String, Error> + 'a>;

#[derive(Default)]
pub struct ShortcodeRegistry<'a> {
    handlers: Vec<(String, Handler<'a>)>,
}

impl<'a> ShortcodeRegistry<'a> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&ExpandContext) -> Result<String, Error> + 'a,
    ) {
        self.handlers.push((name.into(), Box::new(handler)));
    }

    fn lookup(&self, name: &str) -> Option<&Handler<'a>> {
        self.handlers
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, handler)| handler)
    }

    /// Replace each `[name]` occurrence with its handler's output.
    pub fn expand(&self, document: &str, ctx: &ExpandContext) -> Result<String, Error> {
        let mut out = String::with_capacity(document.len());
        let mut rest = document;
        while let Some(start) = rest.find('[') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match tail.find(']') {
                Some(end) => {
                    let name = &tail[1..end];
                    if let Some(handler) = self.lookup(name) {
                        out.push_str(&handler(ctx)?);
                        rest = &tail[end + 1..];
                    } else {
                        out.push('[');
                        rest = &tail[1..];
                    }
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}
