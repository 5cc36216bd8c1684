//! Squares: the smallest unit of board occupancy.
//!
//! A square is either part of a moving block (then it carries an offset to
//! the block's rotation center) or stored in the landed set, where only its
//! [`SquareContent`] matters.

use crate::block::Shape;
use crate::types::{Cell, CellStyle, Color, PlayerPoint, WorldPoint};

/// Drill animation, 4 frames of 5 rows by 4 characters.
const DRILL_PICTURES: [[&str; 5]; 4] = [
    ["| /|", "|/ |", "| .|", "|. |", " \\/ "],
    ["|/ |", "| .|", "|. |", "| /|", " \\/ "],
    ["| .|", "|. |", "| /|", "|/ |", " \\/ "],
    ["|. |", "| /|", "|/ |", "| .|", " \\/ "],
];

/// What a square is, independent of where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareContent {
    /// Part of one of the seven classic shapes.
    ///
    /// `backwards` is the direction toggle of two-state shapes (I, S, Z).
    Normal { shape: Shape, backwards: bool },
    /// Counts down once per second and explodes at zero.
    Bomb { id: u64, timer: i32 },
    /// Drills through landed normal squares. `picture_*` selects the part of
    /// the drill picture this square shows.
    Drill {
        picture_x: i32,
        picture_y: i32,
        frame: u32,
    },
    /// Landed wall between two bottles.
    Separator { left: Color, right: Color },
}

impl SquareContent {
    pub fn is_normal(&self) -> bool {
        matches!(self, SquareContent::Normal { .. })
    }

    pub fn is_bomb(&self) -> bool {
        matches!(self, SquareContent::Bomb { .. })
    }

    pub fn is_drill(&self) -> bool {
        matches!(self, SquareContent::Drill { .. })
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, SquareContent::Separator { .. })
    }

    pub fn bomb_id(&self) -> Option<u64> {
        match self {
            SquareContent::Bomb { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// The two terminal cells this square occupies.
    pub fn cells(&self, landed: bool) -> [Cell; 2] {
        match *self {
            SquareContent::Normal { shape, .. } => {
                let style = CellStyle::bg(shape.color());
                [style.into_cell(' '), style.into_cell(' ')]
            }
            SquareContent::Bomb { timer, .. } => {
                let fg = if timer <= 3 { Color::Red } else { Color::Yellow };
                let style = CellStyle::fg(fg);
                let text = format!("{:^2}", timer);
                let mut chars = text.chars();
                let a = chars.next().unwrap_or(' ');
                let b = chars.next().unwrap_or(' ');
                [style.into_cell(a), style.into_cell(b)]
            }
            SquareContent::Drill {
                picture_x,
                picture_y,
                frame,
            } => {
                let picture = &DRILL_PICTURES[frame as usize % DRILL_PICTURES.len()];
                let row = picture
                    .get(picture_y.clamp(0, 4) as usize)
                    .copied()
                    .unwrap_or("    ");
                let start = (2 * picture_x.clamp(0, 1)) as usize;
                let mut chars = row.chars().skip(start);
                let style = if landed {
                    CellStyle::bg(Color::Gray)
                } else {
                    CellStyle::default()
                };
                let a = chars.next().unwrap_or(' ');
                let b = chars.next().unwrap_or(' ');
                [style.into_cell(a), style.into_cell(b)]
            }
            SquareContent::Separator { left, right } => [
                CellStyle::fg(left).into_cell('|'),
                CellStyle::fg(right).into_cell('|'),
            ],
        }
    }
}

/// A square of a moving block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Square {
    pub x: i32,
    pub y: i32,
    /// Vector from this square to the block's rotation center.
    pub offset_x: i32,
    pub offset_y: i32,
    /// Position in the unrotated block template, used when the block is held.
    pub home: PlayerPoint,
    /// Ring board: set once the square has passed the middle of the board.
    pub wraps_around: bool,
    pub content: SquareContent,
}

impl Square {
    pub fn pos(&self) -> WorldPoint {
        (self.x, self.y)
    }

    pub fn center(&self) -> WorldPoint {
        (self.x + self.offset_x, self.y + self.offset_y)
    }

    /// Quarter turn around the rotation center.
    fn turn(&mut self, counter_clockwise: bool) {
        self.x += self.offset_x;
        self.y += self.offset_y;
        (self.offset_x, self.offset_y) = if counter_clockwise {
            (self.offset_y, -self.offset_x)
        } else {
            (-self.offset_y, self.offset_x)
        };
        self.x -= self.offset_x;
        self.y -= self.offset_y;
    }

    /// Rotate according to the square's kind.
    ///
    /// O, bombs, drills and separators stay put. I, S and Z alternate between
    /// two orientations regardless of the requested direction.
    pub fn rotate(&mut self, counter_clockwise: bool) {
        match self.content {
            SquareContent::Normal {
                shape: Shape::O, ..
            } => {}
            SquareContent::Normal { shape, backwards } if shape.is_two_state() => {
                self.turn(!backwards);
                self.content = SquareContent::Normal {
                    shape,
                    backwards: !backwards,
                };
            }
            SquareContent::Normal { .. } => self.turn(counter_clockwise),
            SquareContent::Bomb { .. }
            | SquareContent::Drill { .. }
            | SquareContent::Separator { .. } => {}
        }
    }
}
