//! RGBA colors and GIF color tables.

/// Largest color table GIF can address.
pub const MAX_PALETTE_SIZE: usize = 256;

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Fully transparent black, written for out-of-range palette indices.
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Create a color from all four channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// The same color with alpha forced to opaque.
    pub const fn opaque(self) -> Self {
        Self::rgb(self.r, self.g, self.b)
    }

    /// Channels as an `[r, g, b, a]` array.
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for Color {
    fn from(c: [u8; 4]) -> Self {
        Color::new(c[0], c[1], c[2], c[3])
    }
}

impl From<[u8; 3]> for Color {
    fn from(c: [u8; 3]) -> Self {
        Color::rgb(c[0], c[1], c[2])
    }
}

/// An ordered color table.
///
/// Entries are unique by construction when built by a palette extractor, but
/// the type does not enforce it. GIF stores tables with a power-of-two entry
/// count; [`Palette::clip`] normalizes a table to that shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Create an empty palette.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a palette from a list of colors.
    pub fn from_colors(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the palette has no entries.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// All entries in table order.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Entry at `index`, if present.
    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    /// Append an entry.
    pub fn push(&mut self, color: Color) {
        self.colors.push(color);
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.colors.clear();
    }

    /// Normalize the table to a power-of-two size no larger than `max_size`.
    ///
    /// Oversized tables are truncated to the cap. Undersized tables are padded
    /// with opaque black up to the next power of two, never below 2 entries.
    /// `max_size` is floored to a power of two within `2..=256`. An empty
    /// palette stays empty.
    pub fn clip(&mut self, max_size: usize) {
        if self.colors.is_empty() {
            return;
        }
        let cap = floor_power_of_two(max_size.clamp(2, MAX_PALETTE_SIZE));
        let target = if self.colors.len() >= cap {
            cap
        } else {
            self.colors.len().next_power_of_two().max(2)
        };
        self.colors.resize(target, Color::BLACK);
    }

    /// The 3-bit size field GIF stores for this table: `log2(entries) - 1`.
    ///
    /// Tables that are not a power of two report the field of the next larger
    /// table; writers pad the remainder.
    pub fn size_field(&self) -> u8 {
        let entries = self.colors.len().clamp(2, MAX_PALETTE_SIZE).next_power_of_two();
        (entries.trailing_zeros() - 1) as u8
    }
}

impl From<Vec<Color>> for Palette {
    fn from(colors: Vec<Color>) -> Self {
        Palette::from_colors(colors)
    }
}

fn floor_power_of_two(n: usize) -> usize {
    debug_assert!(n > 0);
    1 << (usize::BITS - 1 - n.leading_zeros())
}
