//! Block shapes, templates and the random block factory.

use arrayvec::ArrayVec;

use crate::player::Player;
use crate::rng::SimpleRng;
use crate::square::{Square, SquareContent};
use crate::types::{Color, PlayerPoint, BOMB_TIMER_START, DRILL_HEIGHT, MAX_BLOCK_SQUARES};

/// The seven classic shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    L,
    I,
    J,
    O,
    T,
    Z,
    S,
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::L,
        Shape::I,
        Shape::J,
        Shape::O,
        Shape::T,
        Shape::Z,
        Shape::S,
    ];

    /// Square positions relative to the rotation center, `y <= 0`.
    pub fn coords(self) -> [PlayerPoint; 4] {
        match self {
            Shape::L => [(-1, 0), (0, 0), (1, 0), (1, -1)],
            Shape::I => [(-2, 0), (-1, 0), (0, 0), (1, 0)],
            Shape::J => [(-1, -1), (-1, 0), (0, 0), (1, 0)],
            Shape::O => [(-1, 0), (0, 0), (0, -1), (-1, -1)],
            Shape::T => [(-1, 0), (0, 0), (1, 0), (0, -1)],
            Shape::Z => [(-1, -1), (0, -1), (0, 0), (1, 0)],
            Shape::S => [(1, -1), (0, -1), (0, 0), (-1, 0)],
        }
    }

    /// Background color. L should be orange but the ANSI palette has none.
    pub fn color(self) -> Color {
        match self {
            Shape::L => Color::White,
            Shape::I => Color::Cyan,
            Shape::J => Color::Blue,
            Shape::O => Color::Yellow,
            Shape::T => Color::Magenta,
            Shape::Z => Color::Red,
            Shape::S => Color::Green,
        }
    }

    /// Shapes with only two distinct orientations.
    pub fn is_two_state(self) -> bool {
        matches!(self, Shape::I | Shape::S | Shape::Z)
    }

    pub fn letter(self) -> char {
        match self {
            Shape::L => 'L',
            Shape::I => 'I',
            Shape::J => 'J',
            Shape::O => 'O',
            Shape::T => 'T',
            Shape::Z => 'Z',
            Shape::S => 'S',
        }
    }
}

/// Squares of a block in spawn orientation, not yet placed on a board.
///
/// Used for the next-block preview and the held block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    squares: ArrayVec<(PlayerPoint, SquareContent), MAX_BLOCK_SQUARES>,
}

impl BlockTemplate {
    pub fn normal(shape: Shape) -> Self {
        let content = SquareContent::Normal {
            shape,
            backwards: false,
        };
        Self {
            squares: shape.coords().iter().map(|&p| (p, content)).collect(),
        }
    }

    pub fn bomb(id: u64) -> Self {
        let content = SquareContent::Bomb {
            id,
            timer: BOMB_TIMER_START,
        };
        Self {
            squares: Shape::O.coords().iter().map(|&p| (p, content)).collect(),
        }
    }

    pub fn drill() -> Self {
        let mut squares = ArrayVec::new();
        for x in -1..=0 {
            for y in (1 - DRILL_HEIGHT)..=0 {
                let content = SquareContent::Drill {
                    picture_x: 1 + x,
                    picture_y: DRILL_HEIGHT - 1 + y,
                    frame: 0,
                };
                squares.push(((x, y), content));
            }
        }
        Self { squares }
    }

    pub fn squares(&self) -> &[(PlayerPoint, SquareContent)] {
        &self.squares
    }

    pub fn is_drill(&self) -> bool {
        self.squares.iter().any(|(_, c)| c.is_drill())
    }

    /// Advance the drill animation frame. Returns whether anything changed.
    pub fn animate(&mut self) -> bool {
        let mut changed = false;
        for (_, content) in self.squares.iter_mut() {
            if let SquareContent::Drill { frame, .. } = content {
                *frame = frame.wrapping_add(1);
                changed = true;
            }
        }
        changed
    }

    /// Place the template at the player's spawn point, in the player's frame.
    pub fn spawn(&self, player: &Player) -> MovingBlock {
        let (sx, sy) = player.spawn;
        let squares = self
            .squares
            .iter()
            .map(|&(home, content)| {
                let (wx, wy) = player.player_to_world(home);
                Square {
                    x: sx + wx,
                    y: sy + wy,
                    offset_x: -wx,
                    offset_y: -wy,
                    home,
                    wraps_around: false,
                    content,
                }
            })
            .collect();
        MovingBlock {
            squares,
            fast_down: false,
            came_from_hold: false,
        }
    }
}

/// Squares currently controlled by one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovingBlock {
    pub squares: ArrayVec<Square, MAX_BLOCK_SQUARES>,
    /// Soft drop: moved by the fast gravity task.
    pub fast_down: bool,
    /// Set on blocks issued by a hold, so they cannot be held again.
    pub came_from_hold: bool,
}

impl MovingBlock {
    /// Back to spawn orientation, keeping the current square contents.
    ///
    /// Rotation toggles are reset, bomb timers keep ticking where they were.
    pub fn to_template(&self) -> BlockTemplate {
        let squares = self
            .squares
            .iter()
            .map(|sq| {
                let content = match sq.content {
                    SquareContent::Normal { shape, .. } => SquareContent::Normal {
                        shape,
                        backwards: false,
                    },
                    other => other,
                };
                (sq.home, content)
            })
            .collect();
        BlockTemplate { squares }
    }

    pub fn is_drill(&self) -> bool {
        self.squares.iter().any(|sq| sq.content.is_drill())
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }
}

/// Produces the next block for a player.
///
/// Bombs and drills get more likely as the score grows.
#[derive(Debug, Clone)]
pub struct BlockFactory {
    rng: SimpleRng,
    next_bomb_id: u64,
    fixed: Option<BlockTemplate>,
}

impl BlockFactory {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: SimpleRng::new(seed),
            next_bomb_id: 1,
            fixed: None,
        }
    }

    /// A factory that always produces the same block.
    ///
    /// Bomb templates still get a fresh id every time.
    pub fn fixed(template: BlockTemplate) -> Self {
        Self {
            rng: SimpleRng::new(1),
            next_bomb_id: 1,
            fixed: Some(template),
        }
    }

    fn bomb_id(&mut self) -> u64 {
        let id = self.next_bomb_id;
        self.next_bomb_id += 1;
        id
    }

    pub fn create(&mut self, score: u64) -> BlockTemplate {
        if let Some(template) = &self.fixed {
            let mut template = template.clone();
            if template.squares.iter().any(|(_, c)| c.is_bomb()) {
                let id = self.bomb_id();
                for (_, content) in template.squares.iter_mut() {
                    if let SquareContent::Bomb { id: bomb_id, .. } = content {
                        *bomb_id = id;
                    }
                }
            }
            return template;
        }

        let bomb_percent = score as f64 / 800.0 + 1.0;
        let drill_percent = score as f64 / 2000.0;

        if self.rng.next_percent() < bomb_percent {
            let id = self.bomb_id();
            BlockTemplate::bomb(id)
        } else if self.rng.next_percent() < drill_percent {
            BlockTemplate::drill()
        } else {
            let index = self.rng.next_range(Shape::ALL.len() as u32) as usize;
            BlockTemplate::normal(Shape::ALL[index])
        }
    }
}
