//! Label layout commands.
//!
//! On the wire a command is a sparse record: a `Flags` bitmask says which of the
//! optional fields carry a new value, everything else inherits the previous state.
//! We turn each wire record into an explicit [`CommandUpdate`] (optional fields only)
//! and merge it into a [`Cursor`] instead of testing bits at every use site.

use serde::Deserialize;

/// Fixed-point divisor used by pack offsets and advance widths.
pub const FIXED_POINT_DIVISOR: f32 = 16.0;

/// Convert a fixed-point pack value into label units.
#[inline]
pub fn fixed_to_units(v: f32) -> f32 {
    v / FIXED_POINT_DIVISOR
}

/// Bits of `Command::flags`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct CommandFlags(u32);

impl CommandFlags {
    pub const OFFSET_Y: Self = Self(1);
    pub const OFFSET_X: Self = Self(2);
    pub const FONT: Self = Self(8);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for CommandFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::fmt::Display for CommandFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("command list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("command {index}: flag {flag} is set but `{field}` is missing")]
    MissingField {
        index: usize,
        flag: CommandFlags,
        field: &'static str,
    },
}

/// One glyph of a run: which character entry to draw and how far to advance.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Glyph {
    pub glyph_id: usize,
    /// Advance width, fixed-point.
    pub width: f32,
}

/// A command as it appears in the page's `c` parameter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Command {
    pub flags: u32,
    pub font_handler: Option<usize>,
    pub font_scale: Option<f32>,
    pub offset_x: Option<f32>,
    pub offset_y: Option<f32>,
    pub glyphs: Vec<Glyph>,
}

/// Font selection carried by a command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSelect {
    pub handler: usize,
    pub scale: f32,
}

/// Explicit partial update: `None` means "keep the previous value".
///
/// Offsets are already converted to label units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandUpdate {
    pub font: Option<FontSelect>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub glyphs: Vec<Glyph>,
}

impl Command {
    #[inline]
    pub fn flags(&self) -> CommandFlags {
        CommandFlags::from_bits(self.flags)
    }

    /// Decode the flag-driven record into a [`CommandUpdate`].
    ///
    /// `index` is only used for error reporting.
    pub fn to_update(&self, index: usize) -> Result<CommandUpdate, CommandError> {
        let flags = self.flags();
        let missing = |flag, field| CommandError::MissingField { index, flag, field };

        let font = if flags.contains(CommandFlags::FONT) {
            let handler = self
                .font_handler
                .ok_or_else(|| missing(CommandFlags::FONT, "FontHandler"))?;
            let scale = self
                .font_scale
                .ok_or_else(|| missing(CommandFlags::FONT, "FontScale"))?;
            Some(FontSelect { handler, scale })
        } else {
            None
        };

        let x = if flags.contains(CommandFlags::OFFSET_X) {
            let v = self
                .offset_x
                .ok_or_else(|| missing(CommandFlags::OFFSET_X, "OffsetX"))?;
            Some(fixed_to_units(v))
        } else {
            None
        };

        let y = if flags.contains(CommandFlags::OFFSET_Y) {
            let v = self
                .offset_y
                .ok_or_else(|| missing(CommandFlags::OFFSET_Y, "OffsetY"))?;
            Some(fixed_to_units(v))
        } else {
            None
        };

        Ok(CommandUpdate {
            font,
            x,
            y,
            glyphs: self.glyphs.clone(),
        })
    }
}

/// Parse the JSON command array passed in the page's `c` parameter.
pub fn parse_commands(json: &str) -> Result<Vec<Command>, CommandError> {
    Ok(serde_json::from_str(json)?)
}

/// Interpreter pen state carried across commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    /// Index into the resource's font list, once a font was selected.
    pub font: Option<usize>,
    pub x: f32,
    pub y: f32,
    pub font_scale: f32,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            font: None,
            x: 0.0,
            y: 0.0,
            font_scale: 1.0,
        }
    }
}

impl Cursor {
    /// Merge an update into the cursor.
    ///
    /// `resolve_font` maps a font handler to a concrete font index; it is only called
    /// when the update selects a font.
    pub fn apply<E>(
        &mut self,
        update: &CommandUpdate,
        resolve_font: impl FnOnce(usize) -> Result<usize, E>,
    ) -> Result<(), E> {
        if let Some(sel) = update.font {
            self.font = Some(resolve_font(sel.handler)?);
            self.font_scale = sel.scale;
        }
        if let Some(x) = update.x {
            self.x = x;
        }
        if let Some(y) = update.y {
            self.y = y;
        }
        Ok(())
    }

    #[inline]
    pub fn advance(&mut self, glyph: &Glyph) {
        self.x += fixed_to_units(glyph.width);
    }
}
