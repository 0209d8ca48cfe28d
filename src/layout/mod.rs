//! Label layout interpreter.
//!
//! Walks a command list once, front to back:
//! - each command is decoded into a `CommandUpdate` and merged into the `Cursor`
//! - each glyph resolves its character entry in the current font
//! - glyphs with geometry become one `Model` each, placed at the pen and scaled by
//!   the current font scale
//! - the pen always advances by the glyph width (fixed-point / 16)
//!
//! Materials are cached per texture name for the duration of a pass, so every glyph
//! sharing an atlas shares one `Rc<Material>`.
//!
//! Failures are fail-fast: the first unresolvable reference aborts the pass. Models
//! already handed to the scene stay there, and no redraw is requested.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};

use crate::command::{Command, CommandError, Cursor, Glyph};
use crate::resource::{CharEntry, LayoutResource, ResourceError};
use crate::scene::{Mat4, Material, Model, SceneSink, Texture, TextureError};

/// Errors that abort a layout pass.
#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("texture {name:?}: {source}")]
    Texture {
        name: String,
        #[source]
        source: TextureError,
    },

    #[error("command {command} draws glyphs before selecting a font")]
    NoFont { command: usize },
}

/// Materials built during a pass, keyed by texture name.
#[derive(Debug, Default)]
pub struct MaterialCache {
    by_texture: HashMap<String, Rc<Material>>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached material for `texture_name`, decoding its texture on first use.
    pub fn get_or_create(
        &mut self,
        resource: &LayoutResource,
        texture_name: &str,
    ) -> Result<Rc<Material>, LayoutError> {
        if let Some(mat) = self.by_texture.get(texture_name) {
            trace!("material cache hit: {texture_name}");
            return Ok(Rc::clone(mat));
        }

        let payload = resource.texture_image(texture_name)?;
        let mut texture =
            Texture::from_base64_png(payload).map_err(|source| LayoutError::Texture {
                name: texture_name.to_string(),
                source,
            })?;
        texture.mark_as_font_texture();
        debug!(
            "decoded font texture {texture_name}: {}x{}",
            texture.width, texture.height
        );

        let mut material = Material::new(texture_name);
        material.set_diffuse(Rc::new(texture));
        let material = Rc::new(material);

        self.by_texture
            .insert(texture_name.to_string(), Rc::clone(&material));
        Ok(material)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_texture.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_texture.is_empty()
    }
}

/// What a completed pass produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSummary {
    pub models_added: usize,
    /// Glyphs without geometry (advanced over, nothing drawn).
    pub glyphs_skipped: usize,
    pub materials_created: usize,
    /// Pen state after the last glyph.
    pub cursor: Cursor,
}

/// Single-pass interpreter over one layout resource.
pub struct LabelInterpreter<'a> {
    resource: &'a LayoutResource,
    cursor: Cursor,
    materials: MaterialCache,
    models_added: usize,
    glyphs_skipped: usize,
}

impl<'a> LabelInterpreter<'a> {
    pub fn new(resource: &'a LayoutResource) -> Self {
        Self {
            resource,
            cursor: Cursor::default(),
            materials: MaterialCache::new(),
            models_added: 0,
            glyphs_skipped: 0,
        }
    }

    #[inline]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    #[inline]
    pub fn materials(&self) -> &MaterialCache {
        &self.materials
    }

    /// Lay out `commands` into `scene`, then request one redraw.
    pub fn run<S: SceneSink + ?Sized>(
        &mut self,
        commands: &[Command],
        scene: &mut S,
    ) -> Result<LayoutSummary, LayoutError> {
        for (index, cmd) in commands.iter().enumerate() {
            self.apply_command(index, cmd, scene)?;
        }
        scene.request_redraw();

        Ok(LayoutSummary {
            models_added: self.models_added,
            glyphs_skipped: self.glyphs_skipped,
            materials_created: self.materials.len(),
            cursor: self.cursor,
        })
    }

    fn apply_command<S: SceneSink + ?Sized>(
        &mut self,
        index: usize,
        cmd: &Command,
        scene: &mut S,
    ) -> Result<(), LayoutError> {
        let update = cmd.to_update(index)?;
        let resource = self.resource;
        self.cursor
            .apply(&update, |handler| resource.font_for_handler(handler))?;

        if update.glyphs.is_empty() {
            return Ok(());
        }
        let font_index = self.cursor.font.ok_or(LayoutError::NoFont { command: index })?;
        let font = resource.font(font_index)?;

        for glyph in &update.glyphs {
            debug!(
                "pen ({}, {}) glyph {} width {}",
                self.cursor.x, self.cursor.y, glyph.glyph_id, glyph.width
            );
            let entry = font.char_entry(glyph.glyph_id)?;
            debug!("char entry {entry:?}");

            if entry.has_mesh() {
                let model = self.build_model(glyph, entry)?;
                scene.add_model(model);
                self.models_added += 1;
            } else {
                self.glyphs_skipped += 1;
            }

            self.cursor.advance(glyph);
        }
        Ok(())
    }

    fn build_model(&mut self, glyph: &Glyph, entry: &CharEntry) -> Result<Model, LayoutError> {
        let part = self.resource.mesh_part(entry.mesh_part_index)?;
        let mut model = Model::new(format!("glyph{}", glyph.glyph_id), part.to_segments());

        if let Some(texture_name) = entry.texture_name() {
            let material = self.materials.get_or_create(self.resource, texture_name)?;
            let slot = model.add_material(material);
            model.set_material_id_all(slot);
        }

        model.matrix = Mat4::glyph_placement(self.cursor.x, self.cursor.y, self.cursor.font_scale);
        Ok(model)
    }
}

/// Lay out a label in one call. See [`LabelInterpreter::run`].
pub fn layout_label<S: SceneSink + ?Sized>(
    resource: &LayoutResource,
    commands: &[Command],
    scene: &mut S,
) -> Result<LayoutSummary, LayoutError> {
    LabelInterpreter::new(resource).run(commands, scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::command::CommandFlags;
    use crate::scene::Scene3D;

    /// One font: glyph 0 textured "atlas", glyph 1 textured "atlas", glyph 2 no mesh,
    /// glyph 3 untextured, glyph 4 textured "missing".
    fn resource() -> LayoutResource {
        let json = format!(
            r#"{{"Data":{{
                "FLP":{{"Fonts":[{{"Flag2Datas2":[
                    {{"MeshPartIndex":0,"Materials":[{{"TextureName":"atlas"}}]}},
                    {{"MeshPartIndex":1,"Materials":[{{"TextureName":"atlas"}}]}},
                    {{"MeshPartIndex":-1}},
                    {{"MeshPartIndex":0,"Materials":[]}},
                    {{"MeshPartIndex":0,"Materials":[{{"TextureName":"missing"}}]}}
                ]}}],"GlobalHandlersIndexes":[{{"IdInThatTypeArray":0}}]}},
                "Model":{{"Meshes":[{{"Parts":[{part},{part}]}}]}},
                "Textures":{{"atlas":{{"Images":[{{"Image":"{png}"}}]}}}}
            }}}}"#,
            part = PART,
            png = png_base64(),
        );
        LayoutResource::from_json(&json).expect("load resource")
    }

    const PART: &str = r#"{"Groups":[{"Objects":[{"MaterialId":2,"Blocks":[[
        {"Uvs":{"U":[0,1,0],"V":[0,0,1]},"Trias":{"X":[0,1,0],"Y":[0,0,1],"Z":[0,0,0],"Skip":[true,true,false]}},
        {"Uvs":{"U":[0,1,0],"V":[0,0,1]},"Trias":{"X":[0,1,1],"Y":[0,0,1],"Z":[0,0,0],"Skip":[true,true,false]}}
    ]]}]}]}"#;

    fn png_base64() -> String {
        use base64::Engine as _;
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn select_font() -> Command {
        Command {
            flags: CommandFlags::FONT.bits(),
            font_handler: Some(0),
            font_scale: Some(1.0),
            ..Default::default()
        }
    }

    fn run(glyphs: Vec<Glyph>) -> (Result<LayoutSummary, LayoutError>, Scene3D) {
        let res = resource();
        let mut scene = Scene3D::new();
        let cmds = vec![
            select_font(),
            Command {
                glyphs,
                ..Default::default()
            },
        ];
        let out = layout_label(&res, &cmds, &mut scene);
        (out, scene)
    }

    fn g(glyph_id: usize, width: f32) -> Glyph {
        Glyph { glyph_id, width }
    }

    #[test]
    fn advances_accumulate_without_offsets() {
        let (out, scene) = run(vec![g(3, 16.0), g(3, 48.0), g(3, 8.0)]);
        let summary = out.expect("layout");
        assert_eq!(summary.cursor.x, 4.5);
        assert_eq!(summary.cursor.y, 0.0);

        let xs: Vec<f32> = scene.models.iter().map(|m| m.matrix.translation()[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 4.0]);
    }

    #[test]
    fn absolute_x_resets_pen() {
        let res = resource();
        let mut scene = Scene3D::new();
        let cmds = vec![
            select_font(),
            Command {
                glyphs: vec![g(3, 160.0), g(3, 160.0)],
                ..Default::default()
            },
            Command {
                flags: CommandFlags::OFFSET_X.bits(),
                offset_x: Some(48.0),
                glyphs: vec![g(3, 32.0), g(3, 0.0)],
                ..Default::default()
            },
        ];
        let summary = layout_label(&res, &cmds, &mut scene).expect("layout");

        let xs: Vec<f32> = scene.models.iter().map(|m| m.matrix.translation()[0]).collect();
        assert_eq!(xs, vec![0.0, 10.0, 3.0, 5.0]);
        assert_eq!(summary.cursor.x, 5.0);
    }

    #[test]
    fn shared_texture_builds_one_material() {
        let (out, scene) = run(vec![g(0, 16.0), g(1, 16.0)]);
        let summary = out.expect("layout");
        assert_eq!(summary.materials_created, 1);

        let a = &scene.models[0].materials[0];
        let b = &scene.models[1].materials[0];
        assert!(Rc::ptr_eq(a, b));
        assert!(a.diffuse.as_ref().is_some_and(|t| t.font_texture));
        assert!(
            scene
                .models
                .iter()
                .flat_map(|m| m.segments.iter())
                .all(|s| s.material_id == Some(0))
        );
    }

    #[test]
    fn untextured_glyph_keeps_pack_material_ids() {
        let (out, scene) = run(vec![g(3, 16.0)]);
        out.expect("layout");
        let model = &scene.models[0];
        assert!(model.materials.is_empty());
        assert_eq!(model.segments.len(), 2);
        assert!(model.segments.iter().all(|s| s.material_id == Some(2)));
    }

    #[test]
    fn no_mesh_glyph_advances_without_model() {
        let (out, scene) = run(vec![g(2, 64.0), g(3, 16.0)]);
        let summary = out.expect("layout");
        assert_eq!(summary.glyphs_skipped, 1);
        assert_eq!(scene.models.len(), 1);
        assert_eq!(scene.models[0].matrix.translation()[0], 4.0);
        assert_eq!(summary.cursor.x, 5.0);
    }

    #[test]
    fn font_scale_and_y_feed_placement() {
        let res = resource();
        let mut scene = Scene3D::new();
        let cmds = vec![Command {
            flags: (CommandFlags::FONT | CommandFlags::OFFSET_Y).bits(),
            font_handler: Some(0),
            font_scale: Some(2.0),
            offset_y: Some(-32.0),
            glyphs: vec![g(3, 16.0)],
            ..Default::default()
        }];
        layout_label(&res, &cmds, &mut scene).expect("layout");
        assert_eq!(scene.models[0].matrix, Mat4::glyph_placement(0.0, -2.0, 2.0));
    }

    #[test]
    fn one_redraw_per_pass() {
        let (out, scene) = run(vec![g(0, 16.0), g(3, 16.0), g(1, 16.0)]);
        out.expect("layout");
        assert_eq!(scene.redraw_requests, 1);
    }

    #[test]
    fn missing_glyph_halts_pass() {
        let (out, scene) = run(vec![g(3, 16.0), g(99, 16.0), g(3, 16.0)]);
        assert!(matches!(
            out,
            Err(LayoutError::Resource(ResourceError::MissingGlyph { glyph_id: 99, .. }))
        ));
        assert_eq!(scene.models.len(), 1);
        assert_eq!(scene.redraw_requests, 0);
    }

    #[test]
    fn missing_texture_halts_pass() {
        let (out, scene) = run(vec![g(4, 16.0)]);
        assert!(matches!(
            out,
            Err(LayoutError::Resource(ResourceError::MissingTexture { .. }))
        ));
        assert!(scene.models.is_empty());
    }

    #[test]
    fn glyphs_before_font_fail() {
        let res = resource();
        let mut scene = Scene3D::new();
        let cmds = vec![Command {
            glyphs: vec![g(0, 16.0)],
            ..Default::default()
        }];
        assert!(matches!(
            layout_label(&res, &cmds, &mut scene),
            Err(LayoutError::NoFont { command: 0 })
        ));
    }

    #[test]
    fn unknown_handler_fails() {
        let res = resource();
        let mut scene = Scene3D::new();
        let cmds = vec![Command {
            font_handler: Some(3),
            ..select_font()
        }];
        assert!(matches!(
            layout_label(&res, &cmds, &mut scene),
            Err(LayoutError::Resource(ResourceError::MissingHandler { handler: 3 }))
        ));
    }
}
