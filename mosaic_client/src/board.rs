// The local board and its observer capability.
//
// `ObservableBoard` is the client's copy of the canvas, shared between the
// session's receive loop (sole mutator) and whatever renders it. The grid
// sits behind a `Mutex` so a rendering thread can read tiles while the
// receive loop patches them; observer callbacks fire *after* the lock is
// released and carry owned data, so an observer may read the board
// re-entrantly without deadlocking.
//
// The observer is a capability, not an inheritance relationship: the core
// holds a `BoardObserver` and never knows how rendering happens. For a
// renderer on its own thread, `BoardEvent` + the `mpsc::Sender` impl turn
// the callbacks into a queue of immutable updates.

use std::sync::Mutex;
use std::sync::mpsc;

use mosaic_protocol::board::Board;
use mosaic_protocol::types::Tile;

/// Render-on-notify capability implemented by the UI layer.
///
/// Callbacks are delivered synchronously on the receive-loop thread, so
/// implementations should hand work off rather than render in place.
pub trait BoardObserver: Send + Sync {
    /// The board was (re)allocated to `dim` × `dim` blank cells.
    fn board_allocated(&self, dim: u16);
    /// One cell changed. Fires for incremental updates, not for the cells
    /// of the initial bulk load — `board_allocated` already announced that
    /// everything is new.
    fn tile_changed(&self, tile: &Tile);
}

/// An observer notification as a value, for queue-based consumers.
#[derive(Clone, Debug, PartialEq)]
pub enum BoardEvent {
    Allocated(u16),
    TileChanged(Tile),
}

/// Queue-of-updates observer: each notification becomes a `BoardEvent` on
/// the channel. A dropped receiver just means nobody is rendering anymore;
/// updates are discarded and the session carries on.
impl BoardObserver for mpsc::Sender<BoardEvent> {
    fn board_allocated(&self, dim: u16) {
        let _ = self.send(BoardEvent::Allocated(dim));
    }

    fn tile_changed(&self, tile: &Tile) {
        let _ = self.send(BoardEvent::TileChanged(tile.clone()));
    }
}

/// The client's local canvas plus the observer capability.
///
/// Unallocated until the first `allocate` call — the dimension is the
/// server's to announce. Accessing tiles before allocation is a caller bug
/// and panics, as does any out-of-range position afterward.
pub struct ObservableBoard {
    grid: Mutex<Option<Board>>,
    observer: Box<dyn BoardObserver>,
}

impl ObservableBoard {
    pub fn new(observer: impl BoardObserver + 'static) -> Self {
        ObservableBoard {
            grid: Mutex::new(None),
            observer: Box::new(observer),
        }
    }

    /// (Re)size the grid to `dim` × `dim` blank cells, discarding all prior
    /// cell state, then notify the observer of the new shape.
    pub fn allocate(&self, dim: u16) {
        {
            let mut grid = self.grid.lock().unwrap();
            *grid = Some(Board::blank(dim));
        }
        self.observer.board_allocated(dim);
    }

    /// Bulk-load one cell during initial synchronization. No per-cell
    /// notification.
    pub fn set_up_tile(&self, tile: Tile) {
        let mut grid = self.grid.lock().unwrap();
        grid.as_mut()
            .expect("board written before allocation")
            .set_tile(tile);
    }

    /// Apply one incremental update: overwrite the cell unconditionally,
    /// then notify the observer with exactly that tile.
    pub fn set_tile(&self, tile: Tile) {
        {
            let mut grid = self.grid.lock().unwrap();
            grid.as_mut()
                .expect("board written before allocation")
                .set_tile(tile.clone());
        }
        self.observer.tile_changed(&tile);
    }

    /// The tile at (row, col), cloned out under the lock.
    pub fn tile(&self, row: u16, col: u16) -> Tile {
        let grid = self.grid.lock().unwrap();
        grid.as_ref()
            .expect("board read before allocation")
            .tile(row, col)
            .clone()
    }

    pub fn dim(&self) -> u16 {
        let grid = self.grid.lock().unwrap();
        grid.as_ref().expect("board read before allocation").dim()
    }

    pub fn is_allocated(&self) -> bool {
        self.grid.lock().unwrap().is_some()
    }

    /// A full copy of the current grid, for rendering or printing.
    pub fn snapshot(&self) -> Board {
        let grid = self.grid.lock().unwrap();
        grid.as_ref().expect("board read before allocation").clone()
    }
}
