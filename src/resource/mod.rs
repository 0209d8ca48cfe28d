//! Layout resource decoding.
//!
//! The pack server answers `GET /json/pack/{packfile}/{flpid}` with:
//!
//! ```text
//! { "Data": { "FLP":      { "Fonts": [...], "GlobalHandlersIndexes": [...] },
//!             "Model":    { "Meshes": [...] },
//!             "Textures": { "<name>": { "Images": [ { "Image": "<base64 png>" } ] } } } }
//! ```
//!
//! Everything is read-only after load. Font records carry one of two alternative
//! character tables (`Flag4Datas2` / `Flag2Datas2`); we pick the table once per font
//! at load time so the interpreter never has to guess. A font with both or neither
//! table is kept as a defect and only reported when a label draws with it.

pub mod fetch;
pub mod mesh;

use std::collections::BTreeMap;
use std::io::Read;

use serde::Deserialize;

use mesh::{Mesh, MeshPart, null_as_default};

/// Mesh part sentinel for glyphs without geometry (e.g. space).
pub const NO_MESH: i32 = -1;

/// Errors produced while loading or querying a layout resource.
#[derive(thiserror::Error, Debug)]
pub enum ResourceError {
    #[error("layout resource is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("font {font} has both Flag4Datas2 and Flag2Datas2 character tables")]
    AmbiguousCharTable { font: usize },

    #[error("font {font} has no character table")]
    MissingCharTable { font: usize },

    #[error("no global handler with index {handler}")]
    MissingHandler { handler: usize },

    #[error("handler {handler} points at font {font}, which does not exist")]
    MissingFont { handler: usize, font: usize },

    #[error("font {font} does not exist")]
    NoSuchFont { font: usize },

    #[error("glyph id {glyph_id} not found in font {font}")]
    MissingGlyph { font: usize, glyph_id: usize },

    #[error("layout resource has no mesh")]
    MissingMesh,

    #[error("mesh part {index} not found")]
    MissingMeshPart { index: i32 },

    #[error("texture {name:?} not found")]
    MissingTexture { name: String },

    #[error("texture {name:?} has no image")]
    MissingTextureImage { name: String },
}

#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    #[serde(rename = "Data")]
    data: PackData,
}

#[derive(Debug, Clone, Deserialize)]
struct PackData {
    #[serde(rename = "FLP")]
    flp: FlpData,
    #[serde(rename = "Model", default)]
    model: Option<ModelData>,
    #[serde(rename = "Textures", default, deserialize_with = "null_as_default")]
    textures: BTreeMap<String, TextureEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FlpData {
    #[serde(deserialize_with = "null_as_default")]
    fonts: Vec<FontRecord>,
    #[serde(deserialize_with = "null_as_default")]
    global_handlers_indexes: Vec<HandlerIndex>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ModelData {
    #[serde(deserialize_with = "null_as_default")]
    meshes: Vec<Mesh>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TextureEntry {
    #[serde(deserialize_with = "null_as_default")]
    images: Vec<TextureImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TextureImage {
    image: String,
}

/// Entry of the FLP global handler table.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HandlerIndex {
    pub id_in_that_type_array: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FontRecord {
    flag4_datas2: Option<Vec<CharEntry>>,
    flag2_datas2: Option<Vec<CharEntry>>,
}

/// Per-glyph character data of a font.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CharEntry {
    /// Index into the resource mesh parts, or [`NO_MESH`].
    pub mesh_part_index: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub materials: Vec<CharMaterial>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CharMaterial {
    pub texture_name: String,
}

impl CharEntry {
    #[inline]
    pub fn has_mesh(&self) -> bool {
        self.mesh_part_index != NO_MESH
    }

    /// Texture of the first material, when it names one.
    pub fn texture_name(&self) -> Option<&str> {
        self.materials
            .first()
            .map(|m| m.texture_name.as_str())
            .filter(|name| !name.is_empty())
    }
}

/// The character table variant a font was authored with.
#[derive(Debug, Clone, PartialEq)]
pub enum CharTable {
    Flag4(Vec<CharEntry>),
    Flag2(Vec<CharEntry>),
}

impl CharTable {
    #[inline]
    pub fn entries(&self) -> &[CharEntry] {
        match self {
            CharTable::Flag4(e) | CharTable::Flag2(e) => e,
        }
    }
}

/// A font with its character table resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub index: usize,
    pub table: CharTable,
}

/// Why a font record has no usable character table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontDefect {
    BothTables,
    NoTable,
}

impl FontDefect {
    fn into_error(self, font: usize) -> ResourceError {
        match self {
            FontDefect::BothTables => ResourceError::AmbiguousCharTable { font },
            FontDefect::NoTable => ResourceError::MissingCharTable { font },
        }
    }
}

impl Font {
    fn resolve(index: usize, record: FontRecord) -> Result<Self, FontDefect> {
        let table = match (record.flag4_datas2, record.flag2_datas2) {
            (Some(t), None) => CharTable::Flag4(t),
            (None, Some(t)) => CharTable::Flag2(t),
            (Some(_), Some(_)) => return Err(FontDefect::BothTables),
            (None, None) => return Err(FontDefect::NoTable),
        };
        Ok(Self { index, table })
    }

    pub fn char_entry(&self, glyph_id: usize) -> Result<&CharEntry, ResourceError> {
        self.table
            .entries()
            .get(glyph_id)
            .ok_or(ResourceError::MissingGlyph {
                font: self.index,
                glyph_id,
            })
    }
}

/// Decoded, read-only layout resource.
#[derive(Debug, Clone)]
pub struct LayoutResource {
    /// Fonts in `Fonts` order; defective records keep their slot.
    pub fonts: Vec<Result<Font, FontDefect>>,
    pub handlers: Vec<HandlerIndex>,
    pub meshes: Vec<Mesh>,
    /// Texture name -> base64 PNG payload of each image.
    pub textures: BTreeMap<String, Vec<String>>,
}

impl LayoutResource {
    pub fn from_json(json: &str) -> Result<Self, ResourceError> {
        Self::from_envelope(serde_json::from_str(json)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, ResourceError> {
        Self::from_envelope(serde_json::from_reader(reader)?)
    }

    fn from_envelope(env: Envelope) -> Result<Self, ResourceError> {
        let PackData {
            flp,
            model,
            textures,
        } = env.data;

        let fonts = flp
            .fonts
            .into_iter()
            .enumerate()
            .map(|(i, rec)| {
                let font = Font::resolve(i, rec);
                if let Err(defect) = &font {
                    log::warn!("font {i} is unusable: {defect:?}");
                }
                font
            })
            .collect();

        let textures = textures
            .into_iter()
            .map(|(name, entry)| (name, entry.images.into_iter().map(|i| i.image).collect()))
            .collect();

        Ok(Self {
            fonts,
            handlers: flp.global_handlers_indexes,
            meshes: model.map(|m| m.meshes).unwrap_or_default(),
            textures,
        })
    }

    /// Resolve a command font handler into a font index.
    pub fn font_for_handler(&self, handler: usize) -> Result<usize, ResourceError> {
        let idx = self
            .handlers
            .get(handler)
            .ok_or(ResourceError::MissingHandler { handler })?
            .id_in_that_type_array;
        if idx >= self.fonts.len() {
            return Err(ResourceError::MissingFont { handler, font: idx });
        }
        Ok(idx)
    }

    /// Font by index. Indices come from [`Self::font_for_handler`].
    ///
    /// A defective font record is reported here, not at load time.
    pub fn font(&self, index: usize) -> Result<&Font, ResourceError> {
        match self.fonts.get(index) {
            Some(Ok(font)) => Ok(font),
            Some(Err(defect)) => Err(defect.into_error(index)),
            None => Err(ResourceError::NoSuchFont { font: index }),
        }
    }

    /// Mesh part of the label mesh (glyph geometry lives in the first mesh).
    pub fn mesh_part(&self, index: i32) -> Result<&MeshPart, ResourceError> {
        let mesh = self.meshes.first().ok_or(ResourceError::MissingMesh)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| mesh.parts.get(i))
            .ok_or(ResourceError::MissingMeshPart { index })
    }

    /// Base64 payload of the first image of `name`.
    pub fn texture_image(&self, name: &str) -> Result<&str, ResourceError> {
        let images = self
            .textures
            .get(name)
            .ok_or_else(|| ResourceError::MissingTexture {
                name: name.to_string(),
            })?;
        images
            .first()
            .map(String::as_str)
            .ok_or_else(|| ResourceError::MissingTextureImage {
                name: name.to_string(),
            })
    }
}
