//! Board topologies.
//!
//! A topology decides which coordinates exist, where players spawn and which
//! way they face, which coordinates belong to which player, when a region is
//! full and how removing it compacts the board. The [`Game`](crate::Game)
//! itself is topology-agnostic and talks to one boxed [`Topology`].

mod bottle;
mod ring;
mod traditional;

pub use bottle::Bottle;
pub use ring::Ring;
pub use traditional::Traditional;

use std::collections::HashMap;
use std::fmt;

use crate::board::Board;
use crate::player::Player;
use crate::square::Square;
use crate::types::{Cell, Color, StyledRow, TopologyKind, WorldPoint};

/// A full region found by [`Topology::find_full_regions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    /// Part of a row: a traditional row, a whole bottle row or one bottle's
    /// slice of a narrow row.
    Slice { y: i32, xs: Vec<i32> },
    /// Ring board line. `dir` points toward the hub and is the direction
    /// squares behind the line move in.
    Line {
        dir: (i32, i32),
        points: Vec<WorldPoint>,
    },
    /// Every coordinate at one Chebyshev radius of the ring board.
    Ring {
        radius: i32,
        points: Vec<WorldPoint>,
    },
}

impl Region {
    pub fn points(&self) -> Vec<WorldPoint> {
        match self {
            Region::Slice { y, xs } => xs.iter().map(|&x| (x, *y)).collect(),
            Region::Line { points, .. } | Region::Ring { points, .. } => points.clone(),
        }
    }

    pub fn is_ring(&self) -> bool {
        matches!(self, Region::Ring { .. })
    }
}

/// Orientation and spawn point chosen for a joining player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerGeometry {
    pub up: (i32, i32),
    pub spawn: WorldPoint,
}

/// Everything a topology needs to draw the board for one viewer.
pub struct RenderContext<'a> {
    pub players: &'a [Player],
    pub viewer: usize,
    /// Two terminal cells per occupied or flashing coordinate.
    pub cells: &'a HashMap<WorldPoint, [Cell; 2]>,
}

impl RenderContext<'_> {
    pub fn cells_at(&self, point: WorldPoint) -> [Cell; 2] {
        self.cells
            .get(&point)
            .copied()
            .unwrap_or([Cell::default(), Cell::default()])
    }

    pub fn push_square(&self, row: &mut StyledRow, point: WorldPoint) {
        row.extend_from_slice(&self.cells_at(point));
    }
}

pub trait Topology: fmt::Debug + Send + Sync {
    fn kind(&self) -> TopologyKind;

    /// Set up the valid-coordinate mask of an empty game.
    fn init(&self, _board: &mut Board) {}

    /// Extend the board for the player about to be appended to `players`.
    fn add_player(&self, board: &mut Board, players: &[Player], color: Color) -> PlayerGeometry;

    /// Remove `players[index]` and adjust the board and the remaining
    /// players' geometry.
    fn remove_player(&self, board: &mut Board, players: &mut Vec<Player>, index: usize);

    /// Whether `point` lies in the area wiped when `players[index]` finishes
    /// waiting.
    fn owns(&self, players: &[Player], index: usize, point: WorldPoint) -> bool;

    /// Topology-specific constraint on moving squares.
    fn moving_square_is_valid(
        &self,
        board: &Board,
        player_count: usize,
        player: &Player,
        square: &Square,
    ) -> bool;

    /// Adjust a moving square after it moved or rotated.
    fn fix_moving_square(&self, _player: &Player, _square: &mut Square) {}

    /// Full regions, in the order they must be removed.
    fn find_full_regions(&self, board: &Board, players: &[Player]) -> Vec<Region>;

    /// Delete one region and compact the board.
    fn remove_region(&self, board: &mut Board, region: &Region);

    fn render(&self, ctx: &RenderContext<'_>) -> Vec<StyledRow>;
}

pub fn topology_for(kind: TopologyKind) -> Box<dyn Topology> {
    match kind {
        TopologyKind::Traditional => Box::new(Traditional),
        TopologyKind::Bottle => Box::new(Bottle),
        TopologyKind::Ring => Box::new(Ring),
    }
}

/// Delete the cells `(x, y)` for `x` in `xs` and move everything above them
/// (in the same columns) down by one.
pub(crate) fn remove_slice(board: &mut Board, y: i32, xs: &[i32]) {
    for &x in xs {
        board.remove((x, y));
    }
    board.remap(|(px, py), _| {
        if py < y && xs.contains(&px) {
            Some((px, py + 1))
        } else {
            Some((px, py))
        }
    });
}

/// Delete columns `left..left + width` and close the gap, for landed squares
/// and moving blocks alike.
pub(crate) fn wipe_columns(board: &mut Board, players: &mut [Player], left: i32, width: i32) {
    let right = left + width;
    board.remap(|(x, y), _| {
        if x < left {
            Some((x, y))
        } else if x >= right {
            Some((x - width, y))
        } else {
            None
        }
    });

    for player in players.iter_mut() {
        if let Some(block) = player.block_mut() {
            block.squares.retain(|sq| sq.x < left || sq.x >= right);
            for sq in block.squares.iter_mut() {
                if sq.x >= right {
                    sq.x -= width;
                }
            }
        }
    }
}

/// Center `text` in `width` columns.
pub(crate) fn centered(text: &str, width: usize) -> String {
    format!("{:^width$}", text, width = width)
}
