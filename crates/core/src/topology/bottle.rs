//! One vase-shaped bottle per player, with walls between neighbours.
//!
//! Each bottle template row is 20 characters, two per cell. `xx` marks a
//! playable cell. Rows framed by `|` on both sides are "whole" rows: they
//! extend across all bottles, and the walls between bottles on those rows
//! are landed separator squares.

use std::collections::BTreeSet;

use super::{centered, remove_slice, wipe_columns, PlayerGeometry, Region, RenderContext, Topology};
use crate::board::Board;
use crate::player::Player;
use crate::square::{Square, SquareContent};
use crate::types::{
    push_str, Cell, CellStyle, Color, StyledRow, TopologyKind, WorldPoint, BOTTLE_INNER_WIDTH,
    BOTTLE_OUTER_WIDTH,
};

const BOTTLE: [&str; 21] = [
    r"    |xxxxxxxxxx|    ",
    r"    |xxxxxxxxxx|    ",
    r"    |xxxxxxxxxx|    ",
    r"    |xxxxxxxxxx|    ",
    r"    /xxxxxxxxxx\    ",
    r"   /.xxxxxxxxxx.\   ",
    r"  /xxxxxxxxxxxxxx\  ",
    r" /.xxxxxxxxxxxxxx.\ ",
    r"/xxxxxxxxxxxxxxxxxx\",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
    r"|xxxxxxxxxxxxxxxxxx|",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct Bottle;

fn width(players: usize) -> i32 {
    (BOTTLE_OUTER_WIDTH * players as i32 - 1).max(0)
}

fn is_whole_row(y: i32) -> bool {
    let row = BOTTLE[y as usize].as_bytes();
    row.first() == Some(&b'|') && row.last() == Some(&b'|')
}

fn template_has_cell(y: i32, x: i32) -> bool {
    let row = BOTTLE[y as usize].as_bytes();
    let start = (2 * x + 1) as usize;
    row.get(start..start + 2) == Some(b"xx".as_slice())
}

fn is_wall_x(x: i32) -> bool {
    x % BOTTLE_OUTER_WIDTH == BOTTLE_OUTER_WIDTH - 1
}

fn spawn_for(index: usize) -> WorldPoint {
    (
        index as i32 * BOTTLE_OUTER_WIDTH + BOTTLE_INNER_WIDTH / 2,
        -1,
    )
}

/// Valid coordinates for `players` side-by-side bottles, walls included.
fn mask(players: usize) -> BTreeSet<WorldPoint> {
    let mut valid = BTreeSet::new();
    for i in 0..players as i32 {
        let x_offset = BOTTLE_OUTER_WIDTH * i;
        for y in 0..BOTTLE.len() as i32 {
            for x in 0..BOTTLE_INNER_WIDTH {
                if template_has_cell(y, x) {
                    valid.insert((x + x_offset, y));
                }
            }
            if i > 0 && is_whole_row(y) {
                valid.insert((x_offset - 1, y));
            }
        }
    }
    valid
}

fn set_wall(board: &mut Board, wall_x: i32, left: Color, right: Color) {
    for y in 0..BOTTLE.len() as i32 {
        if is_whole_row(y) {
            board.insert((wall_x, y), SquareContent::Separator { left, right });
        }
    }
}

impl Topology for Bottle {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Bottle
    }

    fn add_player(&self, board: &mut Board, players: &[Player], color: Color) -> PlayerGeometry {
        let index = players.len();
        board.set_valid(mask(index + 1));
        if let Some(left_neighbour) = players.last() {
            let wall_x = BOTTLE_OUTER_WIDTH * index as i32 - 1;
            set_wall(board, wall_x, left_neighbour.color, color);
        }
        PlayerGeometry {
            up: (0, -1),
            spawn: spawn_for(index),
        }
    }

    fn remove_player(&self, board: &mut Board, players: &mut Vec<Player>, index: usize) {
        let count = players.len();
        let i = index as i32;
        let (left, width) = if count <= 1 {
            (0, BOTTLE_INNER_WIDTH)
        } else if index == 0 {
            // Bottle and the wall on its right.
            (0, BOTTLE_OUTER_WIDTH)
        } else {
            // Wall on the left and the bottle.
            if index + 1 < count {
                let wall_x = BOTTLE_OUTER_WIDTH * (i + 1) - 1;
                set_wall(
                    board,
                    wall_x,
                    players[index - 1].color,
                    players[index + 1].color,
                );
            }
            (BOTTLE_OUTER_WIDTH * i - 1, BOTTLE_OUTER_WIDTH)
        };

        players.remove(index);
        wipe_columns(board, players, left, width);
        board.set_valid(mask(players.len()));
        for (i, player) in players.iter_mut().enumerate() {
            player.spawn = spawn_for(i);
        }
    }

    // Walls between bottles belong to neither neighbour.
    fn owns(&self, _players: &[Player], index: usize, (x, _): WorldPoint) -> bool {
        let left = BOTTLE_OUTER_WIDTH * index as i32;
        (left..left + BOTTLE_INNER_WIDTH).contains(&x)
    }

    fn moving_square_is_valid(
        &self,
        board: &Board,
        _player_count: usize,
        _player: &Player,
        square: &Square,
    ) -> bool {
        // Only the neck may stick out above the top.
        board.is_valid_coord((square.x, square.y.max(0)))
    }

    fn find_full_regions(&self, board: &Board, players: &[Player]) -> Vec<Region> {
        let w = width(players.len());
        let mut regions = Vec::new();
        if players.is_empty() {
            return regions;
        }

        for y in 0..BOTTLE.len() as i32 {
            if is_whole_row(y) {
                if (0..w).all(|x| board.is_landed((x, y))) {
                    // Walls are never cleared.
                    let xs = (0..w).filter(|&x| !is_wall_x(x)).collect();
                    regions.push(Region::Slice { y, xs });
                }
                continue;
            }
            for index in 0..players.len() {
                let xs: Vec<i32> = (0..w)
                    .filter(|&x| {
                        board.is_valid_coord((x, y)) && self.owns(players, index, (x, y))
                    })
                    .collect();
                if !xs.is_empty() && xs.iter().all(|&x| board.is_landed((x, y))) {
                    regions.push(Region::Slice { y, xs });
                }
            }
        }
        regions
    }

    fn remove_region(&self, board: &mut Board, region: &Region) {
        if let Region::Slice { y, xs } = region {
            remove_slice(board, *y, xs);
        }
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Vec<StyledRow> {
        let bottle_chars = BOTTLE[0].len();
        let mut lines = Vec::new();

        for (y, template) in BOTTLE.iter().enumerate() {
            let repeated = template.repeat(ctx.players.len());
            // Walls between bottles are separator squares drawn from the board.
            let repeated = repeated.replace("||", "xx");

            let mut line = StyledRow::new();
            for (index, byte) in repeated.bytes().enumerate() {
                if byte == b'x' {
                    if index % 2 == 1 {
                        ctx.push_square(&mut line, ((index / 2) as i32, y as i32));
                    }
                    continue;
                }
                let owner = ctx
                    .players
                    .get(index / bottle_chars)
                    .map(|p| p.color)
                    .unwrap_or_default();
                line.push(Cell {
                    ch: byte as char,
                    style: CellStyle::fg(owner),
                });
            }
            lines.push(line);
        }

        let mut bottom_line = StyledRow::new();
        let mut name_line = StyledRow::new();
        let outer_chars = 2 * BOTTLE_OUTER_WIDTH as usize;
        for (i, player) in ctx.players.iter().enumerate() {
            let style = CellStyle::fg(player.color);
            let edge = if i == ctx.viewer { "==" } else { "--" };
            push_str(
                &mut bottom_line,
                &format!("o{}o", edge.repeat(BOTTLE_INNER_WIDTH as usize)),
                style,
            );
            push_str(
                &mut name_line,
                &centered(&player.name_string(outer_chars), outer_chars),
                style,
            );
        }
        lines.push(bottom_line);
        lines.push(name_line);
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_cells() {
        let row0: Vec<i32> = (0..9).filter(|&x| template_has_cell(0, x)).collect();
        assert_eq!(row0, vec![2, 3, 4, 5, 6]);
        let row5: Vec<i32> = (0..9).filter(|&x| template_has_cell(5, x)).collect();
        assert_eq!(row5, vec![2, 3, 4, 5, 6]);
        let row6: Vec<i32> = (0..9).filter(|&x| template_has_cell(6, x)).collect();
        assert_eq!(row6, (1..=7).collect::<Vec<_>>());
        let row8: Vec<i32> = (0..9).filter(|&x| template_has_cell(8, x)).collect();
        assert_eq!(row8, (0..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_whole_rows() {
        let whole: Vec<i32> = (0..21).filter(|&y| is_whole_row(y)).collect();
        assert_eq!(whole, (9..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_mask_includes_walls_only_between_bottles() {
        let one = mask(1);
        assert!(!one.contains(&(9, 10)));
        let two = mask(2);
        assert!(two.contains(&(9, 10)));
        assert!(!two.contains(&(9, 8)));
        assert!(two.contains(&(12, 0)));
        assert_eq!(two.len(), 2 * one.len() + 12);
    }

    #[test]
    fn test_wall_detection() {
        assert!(is_wall_x(9));
        assert!(is_wall_x(19));
        assert!(!is_wall_x(10));
    }
}
