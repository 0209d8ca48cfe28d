//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Base64 PNG of a `size` x `size` white atlas.
pub fn atlas_png_base64(size: u32) -> String {
    let img = image::RgbaImage::from_pixel(size, size, image::Rgba([255, 255, 255, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    STANDARD.encode(bytes)
}

/// A one-triangle mesh part.
pub const TRIANGLE_PART: &str = r#"{"Groups":[{"Objects":[{"MaterialId":0,"Blocks":[[
    {"Uvs":{"U":[0,1,0],"V":[0,0,1]},
     "Trias":{"X":[0,1,0],"Y":[0,0,1],"Z":[0,0,0],"Skip":[true,true,false]}}
]]}]}],"JointId":0}"#;

/// Pack JSON with one font reachable through handler 0:
/// glyph 0 = `A`, glyph 1 = `B` (both textured with "font_atlas"), glyph 2 = space.
pub fn two_glyph_pack() -> String {
    format!(
        r#"{{"Data":{{
            "FLP":{{
                "Fonts":[{{"Flag4Datas2":[
                    {{"MeshPartIndex":0,"Materials":[{{"TextureName":"font_atlas"}}]}},
                    {{"MeshPartIndex":1,"Materials":[{{"TextureName":"font_atlas"}}]}},
                    {{"MeshPartIndex":-1,"Materials":null}}
                ],"Flag2Datas2":null}}],
                "GlobalHandlersIndexes":[{{"IdInThatTypeArray":0}}]
            }},
            "Model":{{"Meshes":[{{"Parts":[{part},{part}]}}]}},
            "Textures":{{"font_atlas":{{"Images":[{{"Image":"{png}"}}]}}}}
        }}}}"#,
        part = TRIANGLE_PART,
        png = atlas_png_base64(4),
    )
}

/// `A` (advance 160) then `B` (advance 320), selecting font + position first.
pub const AB_COMMANDS: &str = r#"[{"Flags":11,"FontHandler":0,"FontScale":1.0,
    "OffsetX":0,"OffsetY":0,
    "Glyphs":[{"GlyphId":0,"Width":160},{"GlyphId":1,"Width":320}]}]"#;
