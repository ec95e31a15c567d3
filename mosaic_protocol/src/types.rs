// Core value types for the canvas protocol.
//
// `TileColor` is the fixed 16-entry palette shared by every client and the
// server. Colors travel on the wire as their stable integer code (0-15);
// deserialization goes through `TryFrom<u8>` so an out-of-range code is a
// decode error and never becomes a `Tile`.
//
// `Tile` is one addressable cell of the shared canvas: position, owner,
// color, and the wall-clock timestamp the owner stamped it with. It is a
// plain value — once constructed it is never mutated, only replaced.

use serde::{Deserialize, Serialize};

/// The shared palette. Wire codes are the enum discriminants, 0-15, and are
/// stable across protocol versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TileColor {
    Black = 0,
    Gray = 1,
    Silver = 2,
    White = 3,
    Maroon = 4,
    Red = 5,
    Olive = 6,
    Yellow = 7,
    Green = 8,
    Lime = 9,
    Teal = 10,
    Aqua = 11,
    Navy = 12,
    Blue = 13,
    Purple = 14,
    Fuchsia = 15,
}

impl TileColor {
    /// All palette entries in wire-code order.
    pub const ALL: [TileColor; 16] = [
        TileColor::Black,
        TileColor::Gray,
        TileColor::Silver,
        TileColor::White,
        TileColor::Maroon,
        TileColor::Red,
        TileColor::Olive,
        TileColor::Yellow,
        TileColor::Green,
        TileColor::Lime,
        TileColor::Teal,
        TileColor::Aqua,
        TileColor::Navy,
        TileColor::Blue,
        TileColor::Purple,
        TileColor::Fuchsia,
    ];

    /// The stable wire code for this color.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a palette entry by wire code. This is the single validation
    /// point for color codes — `None` for anything outside 0-15.
    pub fn from_code(code: u8) -> Option<TileColor> {
        TileColor::ALL.get(usize::from(code)).copied()
    }

    /// Display color for renderers.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            TileColor::Black => (0, 0, 0),
            TileColor::Gray => (128, 128, 128),
            TileColor::Silver => (192, 192, 192),
            TileColor::White => (255, 255, 255),
            TileColor::Maroon => (128, 0, 0),
            TileColor::Red => (255, 0, 0),
            TileColor::Olive => (128, 128, 0),
            TileColor::Yellow => (255, 255, 0),
            TileColor::Green => (0, 128, 0),
            TileColor::Lime => (0, 255, 0),
            TileColor::Teal => (0, 128, 128),
            TileColor::Aqua => (0, 255, 255),
            TileColor::Navy => (0, 0, 128),
            TileColor::Blue => (0, 0, 255),
            TileColor::Purple => (128, 0, 128),
            TileColor::Fuchsia => (255, 0, 255),
        }
    }

    /// Human-readable palette name.
    pub fn name(self) -> &'static str {
        match self {
            TileColor::Black => "black",
            TileColor::Gray => "gray",
            TileColor::Silver => "silver",
            TileColor::White => "white",
            TileColor::Maroon => "maroon",
            TileColor::Red => "red",
            TileColor::Olive => "olive",
            TileColor::Yellow => "yellow",
            TileColor::Green => "green",
            TileColor::Lime => "lime",
            TileColor::Teal => "teal",
            TileColor::Aqua => "aqua",
            TileColor::Navy => "navy",
            TileColor::Blue => "blue",
            TileColor::Purple => "purple",
            TileColor::Fuchsia => "fuchsia",
        }
    }
}

impl From<TileColor> for u8 {
    fn from(color: TileColor) -> u8 {
        color.code()
    }
}

impl TryFrom<u8> for TileColor {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        TileColor::from_code(code).ok_or_else(|| format!("invalid color code {code} (expected 0-15)"))
    }
}

/// One cell of the shared canvas.
///
/// `timestamp` is wall-clock milliseconds since the Unix epoch, stamped by
/// the client that proposed the change. The server resolves concurrent
/// writes to the same position (last writer wins); clients apply whatever
/// the server sends without comparing timestamps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub row: u16,
    pub col: u16,
    pub owner: String,
    pub color: TileColor,
    pub timestamp: u64,
}

impl Tile {
    pub fn new(row: u16, col: u16, owner: impl Into<String>, color: TileColor, timestamp: u64) -> Self {
        Tile {
            row,
            col,
            owner: owner.into(),
            color,
            timestamp,
        }
    }

    /// The default cell state after board allocation: unowned, white,
    /// timestamp zero.
    pub fn blank(row: u16, col: u16) -> Self {
        Tile::new(row, col, "", TileColor::White, 0)
    }
}
