//! `labelview` library crate root.
//!
//! Turns a packed font label (font records, glyph meshes and atlas textures served as
//! JSON by a pack server) plus a short command list into positioned, textured models.
//!
//! Public API philosophy:
//! - Keep modules public so callers can plug in their own renderer (`scene::SceneSink`)
//!   or their own transport (`resource::LayoutResource::from_reader`).
//! - Provide one convenience entrypoint (`view_label`) that mirrors what a label page
//!   does: read the page URL, fetch the resource, lay out the label.
//!
//! Note: the library does **not** initialize logging; callers decide their own setup.

pub mod command;
pub mod config;
pub mod layout;
pub mod query;
pub mod resource;
pub mod scene;

use anyhow::Context as _;

use crate::config::ViewerConfig;
use crate::layout::LayoutSummary;
use crate::query::LabelQuery;
use crate::resource::fetch::ResourceClient;
use crate::scene::SceneSink;

/// Fetch and lay out the label addressed by `page_url` into `scene`.
///
/// The server base comes from `config`, or from the page URL's origin when unset.
pub fn view_label<S: SceneSink + ?Sized>(
    page_url: &str,
    config: &ViewerConfig,
    scene: &mut S,
) -> anyhow::Result<LayoutSummary> {
    let query = LabelQuery::from_page_url(page_url)
        .with_context(|| format!("label page URL {page_url:?}"))?;

    let origin = query::page_origin(page_url).unwrap_or_default();
    let base = config.server_base_or(origin);
    if base.is_empty() {
        anyhow::bail!(
            "page URL has no origin and {} is not set",
            config::ENV_SERVER
        );
    }

    let client = ResourceClient::new(base, config.timeout);
    let resource = client
        .fetch(&query.packfile, &query.flp_id)
        .context("fetch layout resource")?;

    layout::layout_label(&resource, &query.commands, scene).context("lay out label")
}
