// The canvas grid.
//
// `Board` is the full dim×dim grid of tiles at a point in time. The server
// holds the authoritative copy; a complete `Board` travels inside the
// `Message::Board` snapshot during initial synchronization, after which
// clients patch their local copy one tile at a time.
//
// The grid is stored row-major in a flat `Vec<Tile>`. Every position holds
// exactly one tile from allocation onward — blank until first written.
// Out-of-range access is a caller bug and panics; the protocol guarantees
// in-range positions for every tile the server sends on a given dimension.
//
// Deserialization is validated: a snapshot whose cell count or cell
// positions disagree with its dimension fails to decode rather than
// producing a half-formed grid.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Tile;

/// A dim×dim grid of tiles, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBoard")]
pub struct Board {
    dim: u16,
    cells: Vec<Tile>,
}

/// Unvalidated mirror of `Board` used during deserialization.
#[derive(Deserialize)]
struct RawBoard {
    dim: u16,
    cells: Vec<Tile>,
}

impl TryFrom<RawBoard> for Board {
    type Error = String;

    fn try_from(raw: RawBoard) -> Result<Self, Self::Error> {
        if raw.dim == 0 {
            return Err("board dimension must be at least 1".into());
        }
        let expected = usize::from(raw.dim) * usize::from(raw.dim);
        if raw.cells.len() != expected {
            return Err(format!(
                "board snapshot has {} cells, expected {expected} for dim {}",
                raw.cells.len(),
                raw.dim
            ));
        }
        for (i, tile) in raw.cells.iter().enumerate() {
            let row = (i / usize::from(raw.dim)) as u16;
            let col = (i % usize::from(raw.dim)) as u16;
            if tile.row != row || tile.col != col {
                return Err(format!(
                    "board snapshot cell {i} carries position ({},{}), expected ({row},{col})",
                    tile.row, tile.col
                ));
            }
        }
        Ok(Board {
            dim: raw.dim,
            cells: raw.cells,
        })
    }
}

impl Board {
    /// A freshly allocated board: every cell blank.
    pub fn blank(dim: u16) -> Self {
        assert!(dim > 0, "board dimension must be at least 1");
        let mut cells = Vec::with_capacity(usize::from(dim) * usize::from(dim));
        for row in 0..dim {
            for col in 0..dim {
                cells.push(Tile::blank(row, col));
            }
        }
        Board { dim, cells }
    }

    pub fn dim(&self) -> u16 {
        self.dim
    }

    /// The tile at (row, col). Panics if the position is out of range.
    pub fn tile(&self, row: u16, col: u16) -> &Tile {
        let index = self.index(row, col);
        &self.cells[index]
    }

    /// Overwrite the cell at the tile's position, unconditionally. The last
    /// write wins — ordering is the server's job, not the client's. Panics
    /// if the position is out of range.
    pub fn set_tile(&mut self, tile: Tile) {
        let index = self.index(tile.row, tile.col);
        self.cells[index] = tile;
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter()
    }

    fn index(&self, row: u16, col: u16) -> usize {
        assert!(
            row < self.dim && col < self.dim,
            "position ({row},{col}) out of range for a {dim}x{dim} board",
            dim = self.dim
        );
        usize::from(row) * usize::from(self.dim) + usize::from(col)
    }
}

/// One hex palette digit per cell, one row per line. This is what a client
/// prints to the terminal after a full synchronization.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.dim {
            for col in 0..self.dim {
                let code = self.tile(row, col).color.code();
                let digit = char::from_digit(u32::from(code), 16).unwrap_or('?');
                write!(f, "{digit}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
