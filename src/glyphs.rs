//! Character bitmaps for the 5x5 matrix.
//!
//! Glyphs are written row by row (`'#'` lit, anything else unlit) because
//! that is how they read in source, then reshaped once into columns since
//! rendering and scrolling both walk the display a column at a time.
//!
//! Only a small set of characters is defined. Anything else falls back to
//! the `?` glyph.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Rows in every glyph (and on the display).
pub const GLYPH_ROWS: usize = 5;

/// One column of a glyph, top row first. `true` means lit.
pub type Column = [bool; GLYPH_ROWS];

/// An all-unlit column, used for spacing and centering.
pub const BLANK_COLUMN: Column = [false; GLYPH_ROWS];

const FALLBACK: char = '?';

// Each entry is GLYPH_ROWS rows of equal width, concatenated.
const GLYPH_SOURCES: &[(char, &str)] = &[
    (' ', concat!("   ", "   ", "   ", "   ", "   ")),
    ('0', concat!(" ## ", "#  #", "#  #", "#  #", " ## ")),
    ('1', concat!(" # ", "## ", " # ", " # ", "###")),
    ('2', concat!("### ", "   #", " ## ", "#   ", "####")),
    ('3', concat!("####", "   #", "  # ", "#  #", " ## ")),
    ('4', concat!("  ## ", " # # ", "#  # ", "#####", "   # ")),
    ('5', concat!("#####", "#    ", "#### ", "    #", "#### ")),
    ('6', concat!("   # ", "  #  ", " ### ", "#   #", " ### ")),
    ('7', concat!("#####", "   # ", "  #  ", " #   ", "#    ")),
    ('8', concat!(" ### ", "#   #", " ### ", "#   #", " ### ")),
    ('9', concat!(" ### ", "#   #", " ### ", "  #  ", " #   ")),
    ('?', concat!(" ### ", "#   #", "  ## ", "     ", "  #  ")),
];

static GLYPHS: LazyLock<HashMap<char, Glyph>> = LazyLock::new(|| {
    GLYPH_SOURCES
        .iter()
        .map(|&(letter, rows)| (letter, Glyph::from_rows(rows)))
        .collect()
});

/// A renderable character: an ordered run of columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Glyph {
    columns: Vec<Column>,
}

impl Glyph {
    /// Reshape a row-major bitmap string into columns.
    fn from_rows(rows: &str) -> Self {
        let cells: Vec<bool> = rows.chars().map(|c| c == '#').collect();
        let width = cells.len() / GLYPH_ROWS;
        let mut columns = vec![BLANK_COLUMN; width];

        for (index, lit) in cells.into_iter().enumerate() {
            columns[index % width][index / width] = lit;
        }

        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Center the glyph in a frame `frame_width` columns wide, padding with
    /// `floor(extra / 2)` blank columns on the left and the rest on the right.
    pub fn monospaced(&self, frame_width: usize) -> Vec<Column> {
        let extra = frame_width.saturating_sub(self.width());
        let left = extra / 2;
        let right = extra - left;

        let mut columns = Vec::with_capacity(self.width() + extra);
        columns.extend(std::iter::repeat_n(BLANK_COLUMN, left));
        columns.extend_from_slice(&self.columns);
        columns.extend(std::iter::repeat_n(BLANK_COLUMN, right));
        columns
    }
}

/// Look up a character's glyph. Never fails: unknown characters get `?`.
pub fn get_glyph(letter: char) -> &'static Glyph {
    GLYPHS
        .get(&letter)
        .unwrap_or_else(|| &GLYPHS[&FALLBACK])
}
