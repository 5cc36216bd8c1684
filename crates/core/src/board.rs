//! Landed squares, the valid-coordinate mask and the flash overlay.
//!
//! Landed squares are keyed by coordinate, so two landed squares can never
//! share a cell. Ordered maps keep every iteration (and therefore every
//! "last write wins" collision) reproducible.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::square::SquareContent;
use crate::types::{Color, WorldPoint};

#[derive(Debug, Clone, Default)]
pub struct Board {
    landed: BTreeMap<WorldPoint, SquareContent>,
    valid: BTreeSet<WorldPoint>,
    flashing: HashMap<WorldPoint, Color>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, point: WorldPoint) -> Option<&SquareContent> {
        self.landed.get(&point)
    }

    pub fn is_landed(&self, point: WorldPoint) -> bool {
        self.landed.contains_key(&point)
    }

    pub fn insert(&mut self, point: WorldPoint, content: SquareContent) -> Option<SquareContent> {
        self.landed.insert(point, content)
    }

    pub fn remove(&mut self, point: WorldPoint) -> Option<SquareContent> {
        self.landed.remove(&point)
    }

    pub fn landed(&self) -> impl Iterator<Item = (WorldPoint, &SquareContent)> + '_ {
        self.landed.iter().map(|(p, c)| (*p, c))
    }

    pub fn landed_mut(&mut self) -> impl Iterator<Item = (WorldPoint, &mut SquareContent)> + '_ {
        self.landed.iter_mut().map(|(p, c)| (*p, c))
    }

    pub fn landed_count(&self) -> usize {
        self.landed.len()
    }

    /// Keep only the landed squares matching the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(WorldPoint, &SquareContent) -> bool) {
        self.landed.retain(|p, c| keep(*p, c));
    }

    /// Move every landed square to `f(point)`, deleting it when `f` returns `None`.
    ///
    /// Squares are processed in coordinate order, and when two squares end up
    /// in the same cell the later one wins.
    pub fn remap(&mut self, mut f: impl FnMut(WorldPoint, &SquareContent) -> Option<WorldPoint>) {
        let old = std::mem::take(&mut self.landed);
        for (point, content) in old {
            if let Some(target) = f(point, &content) {
                self.landed.insert(target, content);
            }
        }
    }

    pub fn clear_landed(&mut self) {
        self.landed.clear();
    }

    pub fn is_valid_coord(&self, point: WorldPoint) -> bool {
        self.valid.contains(&point)
    }

    pub fn valid_coords(&self) -> impl Iterator<Item = WorldPoint> + '_ {
        self.valid.iter().copied()
    }

    pub fn add_valid(&mut self, point: WorldPoint) {
        self.valid.insert(point);
    }

    pub fn set_valid(&mut self, valid: BTreeSet<WorldPoint>) {
        self.valid = valid;
    }

    pub fn clear_valid(&mut self) {
        self.valid.clear();
    }

    /// Landed squares outside the valid area.
    pub fn stray_squares(&self) -> impl Iterator<Item = WorldPoint> + '_ {
        self.landed.keys().copied().filter(|p| !self.valid.contains(p))
    }

    pub fn flash_color(&self, point: WorldPoint) -> Option<Color> {
        self.flashing.get(&point).copied()
    }

    pub fn flashing(&self) -> impl Iterator<Item = (WorldPoint, Color)> + '_ {
        self.flashing.iter().map(|(p, c)| (*p, *c))
    }

    pub fn set_flash(&mut self, points: impl IntoIterator<Item = WorldPoint>, color: Color) {
        for point in points {
            self.flashing.insert(point, color);
        }
    }

    /// Overlapping flashes may have removed some points already.
    pub fn clear_flash(&mut self, points: impl IntoIterator<Item = WorldPoint>) {
        for point in points {
            self.flashing.remove(&point);
        }
    }

    pub fn clear_all_flashes(&mut self) {
        self.flashing.clear();
    }
}
