//! Thin binary wrapper: lay out one label page and report what was placed.
//!
//! Run:
//! - `cargo run -- 'http://127.0.0.1:8000/label?f=R_PERM.WAD&r=12&c=[...]'`
//! - `RUST_LOG=labelview=debug` shows per-glyph pen positions.

use anyhow::Context as _;
use log::info;

use labelview::config::ViewerConfig;
use labelview::scene::Scene3D;

fn main() -> anyhow::Result<()> {
    // Keep logging setup in the binary so the library remains unopinionated.
    env_logger::init();

    let page_url = std::env::args()
        .nth(1)
        .context("usage: labelview <label page URL>")?;
    let config = ViewerConfig::from_env()?;

    let mut scene = Scene3D::new();
    let summary = labelview::view_label(&page_url, &config, &mut scene)?;

    info!(
        "placed {} models ({} glyphs without mesh), {} materials, pen at ({}, {})",
        summary.models_added,
        summary.glyphs_skipped,
        summary.materials_created,
        summary.cursor.x,
        summary.cursor.y
    );

    for model in &scene.models {
        let [x, y, _] = model.matrix.translation();
        let tris: usize = model.segments.iter().map(|s| s.triangle_count()).sum();
        let texture = model
            .materials
            .first()
            .map(|m| m.name.as_str())
            .unwrap_or("-");
        println!("{}\tx={x}\ty={y}\ttriangles={tris}\ttexture={texture}", model.name);
    }

    let bounds = scene.bounds();
    if !bounds.is_empty() {
        let [w, h, _] = bounds.size();
        println!("bounds {w} x {h}");
    }

    Ok(())
}
