//! Square ring around a central hub. Every player falls toward the middle
//! from their own side, and blocks that pass the middle wrap around.

use std::collections::{BTreeSet, HashSet};

use super::{centered, PlayerGeometry, Region, RenderContext, Topology};
use crate::board::Board;
use crate::player::Player;
use crate::square::Square;
use crate::types::{
    push_str, CellStyle, Color, StyledRow, TopologyKind, WorldPoint, GAME_RADIUS,
    MIDDLE_AREA_RADIUS,
};

const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// Inner width of the hub frame, in characters.
const HUB_INNER: usize = 4 * MIDDLE_AREA_RADIUS as usize;

#[derive(Debug, Default, Clone, Copy)]
pub struct Ring;

fn chebyshev((x, y): WorldPoint) -> i32 {
    x.abs().max(y.abs())
}

fn in_hub(point: WorldPoint) -> bool {
    chebyshev(point) <= MIDDLE_AREA_RADIUS
}

/// Lines of the ring board with their compaction direction.
///
/// Rows and columns crossing the hub are split into two halves.
fn all_lines() -> Vec<((i32, i32), Vec<WorldPoint>)> {
    let r = GAME_RADIUS;
    let m = MIDDLE_AREA_RADIUS;
    let mut lines = Vec::new();

    for y in -r..=r {
        let dir = (0, if y > 0 { -1 } else { 1 });
        if y.abs() > m {
            lines.push((dir, (-r..=r).map(|x| (x, y)).collect()));
        } else {
            lines.push((dir, (-r..-m).map(|x| (x, y)).collect()));
            lines.push((dir, (m + 1..=r).map(|x| (x, y)).collect()));
        }
    }

    for x in -r..=r {
        let dir = (if x > 0 { -1 } else { 1 }, 0);
        if x.abs() > m {
            lines.push((dir, (-r..=r).map(|y| (x, y)).collect()));
        } else {
            lines.push((dir, (-r..-m).map(|y| (x, y)).collect()));
            lines.push((dir, (m + 1..=r).map(|y| (x, y)).collect()));
        }
    }
    lines
}

fn dot((ax, ay): (i32, i32), (bx, by): (i32, i32)) -> i32 {
    ax * bx + ay * by
}

/// Perpendicular coordinate of `point` relative to `dir`.
fn determinant((dx, dy): (i32, i32), (x, y): WorldPoint) -> i32 {
    dy * x - dx * y
}

fn delete_line(board: &mut Board, dir: (i32, i32), points: &[WorldPoint]) {
    let Some(&first) = points.first() else {
        return;
    };
    let line_dot = dot(dir, first);
    let determinants: HashSet<i32> = points.iter().map(|&p| determinant(dir, p)).collect();

    for &p in points {
        board.remove(p);
    }
    board.remap(|p, _| {
        if determinants.contains(&determinant(dir, p)) && dot(dir, p) < line_dot {
            Some((p.0 + dir.0, p.1 + dir.1))
        } else {
            Some(p)
        }
    });
}

fn delete_ring(board: &mut Board, radius: i32) {
    board.remap(|(x, y), _| {
        let r = chebyshev((x, y));
        if r < radius {
            return Some((x, y));
        }
        if r == radius {
            return None;
        }
        // Diagonal squares move on both axes.
        let (mut nx, mut ny) = (x, y);
        if x.abs() >= y.abs() {
            nx -= x.signum();
        }
        if y.abs() >= x.abs() {
            ny -= y.signum();
        }
        Some((nx, ny))
    });
}

/// Player letters of the hub label, by direction relative to the viewer.
fn hub_slot(relative_up: (i32, i32)) -> Option<usize> {
    match relative_up {
        (0, -1) => Some(0), // top
        (-1, 0) => Some(1), // left
        (1, 0) => Some(2),  // right
        (0, 1) => Some(3),  // bottom
        _ => None,
    }
}

/// Hub drawing: player names around a frame, in each player's color.
fn hub_rows(ctx: &RenderContext<'_>) -> Vec<StyledRow> {
    let viewer = &ctx.players[ctx.viewer];
    let mut slots: [Option<&Player>; 4] = [None; 4];
    for player in ctx.players {
        if let Some(slot) = hub_slot(viewer.world_to_player(player.up)) {
            slots[slot] = Some(player);
        }
    }
    let color = |slot: usize| slots[slot].map(|p| p.color).unwrap_or_default();
    let half = HUB_INNER / 2;
    let side_rows = 2 * MIDDLE_AREA_RADIUS as usize - 3;

    let side_text = |slot: usize| -> Vec<String> {
        let name: Vec<char> = slots[slot]
            .map(|p| p.name_string(half * side_rows))
            .unwrap_or_default()
            .chars()
            .collect();
        let chunks: Vec<String> = name.chunks(half).map(|c| c.iter().collect()).collect();
        let pad = side_rows.saturating_sub(chunks.len());
        let mut rows = vec![String::new(); pad / 2];
        rows.extend(chunks);
        rows.resize(side_rows, String::new());
        rows
    };
    let left = side_text(1);
    let right = side_text(2);

    let mut rows = Vec::new();

    let mut top = StyledRow::new();
    push_str(&mut top, "o", CellStyle::default());
    push_str(&mut top, &"=".repeat(HUB_INNER), CellStyle::fg(color(0)));
    push_str(&mut top, "o", CellStyle::default());
    rows.push(top);

    let mut framed = |text_cells: Vec<(String, Color)>| {
        let mut row = StyledRow::new();
        push_str(&mut row, "|", CellStyle::fg(color(1)));
        for (text, c) in text_cells {
            push_str(&mut row, &text, CellStyle::fg(c));
        }
        push_str(&mut row, "|", CellStyle::fg(color(2)));
        rows.push(row);
    };

    let top_name = slots[0].map(|p| p.name_string(HUB_INNER)).unwrap_or_default();
    framed(vec![(centered(&top_name, HUB_INNER), color(0))]);
    for i in 0..side_rows {
        framed(vec![
            (format!("{:<half$}", left[i], half = half), color(1)),
            (format!("{:>half$}", right[i], half = half), color(2)),
        ]);
    }
    let bottom_name = slots[3].map(|p| p.name_string(HUB_INNER)).unwrap_or_default();
    framed(vec![(centered(&bottom_name, HUB_INNER), color(3))]);

    let mut bottom = StyledRow::new();
    push_str(&mut bottom, "o", CellStyle::default());
    push_str(&mut bottom, &"-".repeat(HUB_INNER), CellStyle::fg(color(3)));
    push_str(&mut bottom, "o", CellStyle::default());
    rows.push(bottom);
    rows
}

impl Topology for Ring {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Ring
    }

    fn init(&self, board: &mut Board) {
        let r = GAME_RADIUS;
        let valid: BTreeSet<WorldPoint> = (-r..=r)
            .flat_map(|x| (-r..=r).map(move |y| (x, y)))
            .filter(|&p| !in_hub(p))
            .collect();
        board.set_valid(valid);
    }

    fn add_player(&self, _board: &mut Board, players: &[Player], _color: Color) -> PlayerGeometry {
        let used: Vec<(i32, i32)> = players.iter().map(|p| p.up).collect();
        let unused: Vec<(i32, i32)> = DIRECTIONS
            .iter()
            .copied()
            .filter(|d| !used.contains(d))
            .collect();

        // Prefer facing an existing player; pick the smallest for reproducibility.
        let opposite = unused
            .iter()
            .copied()
            .filter(|&(x, y)| used.contains(&(-x, -y)))
            .min();
        let up = opposite
            .or_else(|| unused.iter().copied().min())
            .unwrap_or((0, -1));

        PlayerGeometry {
            up,
            spawn: ((GAME_RADIUS + 1) * up.0, (GAME_RADIUS + 1) * up.1),
        }
    }

    fn remove_player(&self, _board: &mut Board, players: &mut Vec<Player>, index: usize) {
        players.remove(index);
    }

    fn owns(&self, players: &[Player], index: usize, (x, y): WorldPoint) -> bool {
        let Some(player) = players.get(index) else {
            return false;
        };
        let d = dot(player.up, (x, y));
        d >= 0 && 2 * d * d >= x * x + y * y
    }

    fn moving_square_is_valid(
        &self,
        _board: &Board,
        _player_count: usize,
        player: &Player,
        square: &Square,
    ) -> bool {
        if in_hub(square.pos()) {
            return false;
        }
        let (px, _) = player.world_to_player(square.pos());
        (-GAME_RADIUS..=GAME_RADIUS).contains(&px)
    }

    fn fix_moving_square(&self, player: &Player, square: &mut Square) {
        let (x, mut y) = player.world_to_player(square.pos());

        // Blocks start wrapping once they have passed the middle.
        if y > 0 {
            square.wraps_around = true;
        }
        if square.wraps_around {
            y = (y + GAME_RADIUS).rem_euclid(2 * GAME_RADIUS + 1) - GAME_RADIUS;
            (square.x, square.y) = player.player_to_world((x, y));
        }
    }

    fn find_full_regions(&self, board: &Board, _players: &[Player]) -> Vec<Region> {
        let mut ring_counts = [0usize; GAME_RADIUS as usize + 1];
        for (point, _) in board.landed() {
            let r = chebyshev(point);
            if r <= GAME_RADIUS {
                ring_counts[r as usize] += 1;
            }
        }

        let mut lines: Vec<Region> = all_lines()
            .into_iter()
            .filter(|(_, points)| points.iter().all(|&p| board.is_landed(p)))
            .map(|(dir, points)| Region::Line { dir, points })
            .collect();
        // Outermost lines first, so removing one does not move the next.
        lines.sort_by_key(|region| match region {
            Region::Line { dir, points } => points.first().map_or(0, |&p| dot(*dir, p)),
            _ => 0,
        });

        let mut rings: Vec<Region> = (MIDDLE_AREA_RADIUS + 1..=GAME_RADIUS)
            .rev()
            .filter(|&r| ring_counts[r as usize] == 8 * r as usize)
            .map(|radius| Region::Ring {
                radius,
                points: board
                    .landed()
                    .map(|(p, _)| p)
                    .filter(|&p| chebyshev(p) == radius)
                    .collect(),
            })
            .collect();

        lines.append(&mut rings);
        lines
    }

    fn remove_region(&self, board: &mut Board, region: &Region) {
        match region {
            Region::Line { dir, points } => delete_line(board, *dir, points),
            Region::Ring { radius, .. } => delete_ring(board, *radius),
            Region::Slice { .. } => {}
        }
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Vec<StyledRow> {
        let r = GAME_RADIUS;
        let border = format!("o{}o", "--".repeat((2 * r + 1) as usize));
        let mut lines = Vec::new();

        let mut top = StyledRow::new();
        push_str(&mut top, &border, CellStyle::default());
        lines.push(top);

        let Some(viewer) = ctx.players.get(ctx.viewer) else {
            return lines;
        };
        let hub = hub_rows(ctx);

        for y in -r..=r {
            let mut line = StyledRow::new();
            push_str(&mut line, "|", CellStyle::default());
            let mut hub_drawn = false;
            for x in -r..=r {
                if in_hub((x, y)) {
                    if !hub_drawn {
                        if let Some(row) = hub.get((y + MIDDLE_AREA_RADIUS) as usize) {
                            line.extend_from_slice(row);
                        }
                        hub_drawn = true;
                    }
                    continue;
                }
                ctx.push_square(&mut line, viewer.player_to_world((x, y)));
            }
            push_str(&mut line, "|", CellStyle::default());
            lines.push(line);
        }

        let mut bottom = StyledRow::new();
        push_str(&mut bottom, &border, CellStyle::default());
        lines.push(bottom);
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Shape;
    use crate::square::SquareContent;

    fn content() -> SquareContent {
        SquareContent::Normal {
            shape: Shape::Z,
            backwards: false,
        }
    }

    #[test]
    fn test_line_count() {
        // 29 rows, 7 of them split, and the same for columns.
        assert_eq!(all_lines().len(), 2 * (29 + 7));
        for (_, points) in all_lines() {
            assert!(points.iter().all(|&p| !in_hub(p)));
        }
    }

    #[test]
    fn test_delete_ring_moves_outer_squares_inward() {
        let mut board = Board::new();
        board.insert((5, 0), content());
        board.insert((6, 0), content());
        board.insert((6, 6), content());
        board.insert((4, 0), content());
        delete_ring(&mut board, 5);
        assert!(board.is_landed((4, 0)));
        assert!(board.is_landed((5, 0)));
        assert!(board.is_landed((5, 5)));
        assert_eq!(board.landed_count(), 3);
    }

    #[test]
    fn test_delete_line_moves_far_side_only() {
        let mut board = Board::new();
        // Top row, direction (0, 1): squares above it (smaller y) move down.
        let points: Vec<WorldPoint> = (-14..=14).map(|x| (x, -10)).collect();
        for &p in &points {
            board.insert(p, content());
        }
        board.insert((2, -12), content());
        board.insert((2, -5), content());
        delete_line(&mut board, (0, 1), &points);
        assert!(board.is_landed((2, -11)));
        assert!(board.is_landed((2, -5)));
        assert_eq!(board.landed_count(), 2);
    }

    #[test]
    fn test_determinant_distinguishes_columns() {
        assert_ne!(determinant((0, 1), (1, 5)), determinant((0, 1), (2, 5)));
        assert_eq!(determinant((0, 1), (1, 5)), determinant((0, 1), (1, -7)));
    }
}
