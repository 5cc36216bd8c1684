//! Rectangular board with one vertical lane per player.

use super::{centered, remove_slice, wipe_columns, PlayerGeometry, Region, RenderContext, Topology};
use crate::board::Board;
use crate::player::Player;
use crate::square::Square;
use crate::types::{
    push_str, CellStyle, Color, StyledRow, TopologyKind, WorldPoint, TRADITIONAL_HEIGHT,
    WIDTH_PER_PLAYER,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Traditional;

fn width(players: usize) -> i32 {
    WIDTH_PER_PLAYER * players as i32
}

fn spawn_for(index: usize) -> WorldPoint {
    (index as i32 * WIDTH_PER_PLAYER + WIDTH_PER_PLAYER / 2, -1)
}

fn rebuild_mask(board: &mut Board, players: usize) {
    board.clear_valid();
    for y in 0..TRADITIONAL_HEIGHT {
        for x in 0..width(players) {
            board.add_valid((x, y));
        }
    }
}

impl Topology for Traditional {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Traditional
    }

    fn add_player(&self, board: &mut Board, players: &[Player], _color: Color) -> PlayerGeometry {
        let index = players.len();
        rebuild_mask(board, index + 1);
        PlayerGeometry {
            up: (0, -1),
            spawn: spawn_for(index),
        }
    }

    fn remove_player(&self, board: &mut Board, players: &mut Vec<Player>, index: usize) {
        players.remove(index);
        wipe_columns(board, players, index as i32 * WIDTH_PER_PLAYER, WIDTH_PER_PLAYER);
        rebuild_mask(board, players.len());
        for (i, player) in players.iter_mut().enumerate() {
            player.spawn = spawn_for(i);
        }
    }

    fn owns(&self, _players: &[Player], index: usize, (x, _): WorldPoint) -> bool {
        let left = index as i32 * WIDTH_PER_PLAYER;
        (left..left + WIDTH_PER_PLAYER).contains(&x)
    }

    fn moving_square_is_valid(
        &self,
        _board: &Board,
        player_count: usize,
        _player: &Player,
        square: &Square,
    ) -> bool {
        // Blocks may stick out above the top.
        (0..width(player_count)).contains(&square.x) && square.y < TRADITIONAL_HEIGHT
    }

    fn find_full_regions(&self, board: &Board, players: &[Player]) -> Vec<Region> {
        let w = width(players.len());
        if w == 0 {
            return Vec::new();
        }
        (0..TRADITIONAL_HEIGHT)
            .filter(|&y| (0..w).all(|x| board.is_landed((x, y))))
            .map(|y| Region::Slice {
                y,
                xs: (0..w).collect(),
            })
            .collect()
    }

    fn remove_region(&self, board: &mut Board, region: &Region) {
        if let Region::Slice { y, xs } = region {
            remove_slice(board, *y, xs);
        }
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Vec<StyledRow> {
        let lane_chars = 2 * WIDTH_PER_PLAYER as usize;
        let w = width(ctx.players.len());

        let mut name_line = StyledRow::new();
        let mut header_line = StyledRow::new();
        push_str(&mut name_line, " ", CellStyle::default());
        push_str(&mut header_line, "o", CellStyle::default());
        for (i, player) in ctx.players.iter().enumerate() {
            let style = CellStyle::fg(player.color);
            push_str(
                &mut name_line,
                &centered(&player.name_string(lane_chars), lane_chars),
                style,
            );
            let edge = if i == ctx.viewer { "==" } else { "--" };
            push_str(&mut header_line, &edge.repeat(WIDTH_PER_PLAYER as usize), style);
        }
        push_str(&mut header_line, "o", CellStyle::default());

        let mut lines = vec![name_line, header_line];
        for y in 0..TRADITIONAL_HEIGHT {
            let mut line = StyledRow::new();
            push_str(&mut line, "|", CellStyle::default());
            for x in 0..w {
                ctx.push_square(&mut line, (x, y));
            }
            push_str(&mut line, "|", CellStyle::default());
            lines.push(line);
        }

        let mut bottom = StyledRow::new();
        push_str(
            &mut bottom,
            &format!("o{}o", "--".repeat(w as usize)),
            CellStyle::default(),
        );
        lines.push(bottom);
        lines
    }
}
