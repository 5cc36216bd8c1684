//! The topology-agnostic game state machine.
//!
//! [`Game`] owns the players, the board and the score. Every public mutation
//! keeps the board valid: no coordinate is occupied twice, landed squares
//! stay inside the valid area and moving squares satisfy the topology's own
//! constraint. Moves and rotations are transactions that either commit or
//! leave the state exactly as it was.
//!
//! Nothing here knows about time. The engine decides when gravity, bombs,
//! countdowns and flashes happen and calls into this type under its lock.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::block::{BlockFactory, BlockTemplate, MovingBlock};
use crate::board::Board;
use crate::player::{ControlState, Player, PlayerId};
use crate::scoring::score_for_regions;
use crate::square::SquareContent;
use crate::summary::GameSummary;
use crate::topology::{topology_for, Region, RenderContext, Topology};
use crate::types::{
    push_str, Cell, CellStyle, Color, StyledRow, TopologyKind, WorldPoint, BOMB_RADIUS,
    WAIT_COUNTER_START,
};

/// Hard drops give up after this many steps. Ring columns can be endless.
pub const HARD_DROP_LIMIT: u32 = 64;

/// How far ahead the landing prediction looks.
const PREDICTION_STEPS: u32 = 40;

/// Regions found full by [`Game::begin_clear`], waiting to be removed.
///
/// Consumed by [`Game::commit_clear`]. A pending clear from before a restart
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct PendingClear {
    epoch: u64,
    regions: Vec<Region>,
    points: BTreeSet<WorldPoint>,
}

impl PendingClear {
    /// Every coordinate about to be removed, for flashing.
    pub fn points(&self) -> &BTreeSet<WorldPoint> {
        &self.points
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

/// Result of one second of a wait countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTick {
    Counting(u32),
    /// Reached zero. Call [`Game::finish_wait`] after flashing.
    Expired,
    /// The player left or is no longer waiting.
    Gone,
}

pub struct Game {
    topology: Box<dyn Topology>,
    players: Vec<Player>,
    board: Board,
    score: u64,
    factory: BlockFactory,
    /// Bumped by [`Game::restart`].
    epoch: u64,
    next_player_id: PlayerId,
    wait_counter_start: u32,
    started_waits: Vec<PlayerId>,
    changed: bool,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("kind", &self.kind())
            .field("players", &self.players.len())
            .field("landed", &self.board.landed_count())
            .field("score", &self.score)
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl Game {
    pub fn new(kind: TopologyKind, seed: u32) -> Self {
        Self::with_factory(kind, BlockFactory::new(seed))
    }

    pub fn with_factory(kind: TopologyKind, factory: BlockFactory) -> Self {
        let topology = topology_for(kind);
        let mut board = Board::new();
        topology.init(&mut board);
        Self {
            topology,
            players: Vec::new(),
            board,
            score: 0,
            factory,
            epoch: 0,
            next_player_id: 1,
            wait_counter_start: WAIT_COUNTER_START,
            started_waits: Vec::new(),
            changed: false,
        }
    }

    pub fn set_wait_counter_start(&mut self, seconds: u32) {
        self.wait_counter_start = seconds.max(1);
    }

    pub fn kind(&self) -> TopologyKind {
        self.topology.kind()
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Put a landed square on the board. Used to set up scenarios.
    pub fn set_landed(&mut self, point: WorldPoint, content: SquareContent) -> bool {
        if !self.board.is_valid_coord(point) || self.is_moving_square(point) {
            return false;
        }
        self.board.insert(point, content);
        self.changed = true;
        true
    }

    pub fn landed(&self, point: WorldPoint) -> Option<&SquareContent> {
        self.board.get(point)
    }

    fn index_of(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn is_moving_square(&self, point: WorldPoint) -> bool {
        self.players
            .iter()
            .filter_map(Player::block)
            .any(|b| b.squares.iter().any(|sq| sq.pos() == point))
    }

    /// Check the board invariant.
    pub fn is_valid(&self) -> bool {
        if self.board.stray_squares().next().is_some() {
            return false;
        }
        let mut seen = HashSet::new();
        for player in &self.players {
            let Some(block) = player.block() else {
                continue;
            };
            for sq in &block.squares {
                if self.board.is_landed(sq.pos())
                    || !seen.insert(sq.pos())
                    || !self.topology.moving_square_is_valid(
                        &self.board,
                        self.players.len(),
                        player,
                        sq,
                    )
                {
                    return false;
                }
            }
        }
        true
    }

    /// Whether `block` could be the moving block of `players[index]` without
    /// breaking the invariant. The player's current block is ignored.
    fn block_fits(&self, index: usize, block: &MovingBlock) -> bool {
        self.block_fits_drilling(index, block, false)
    }

    /// Like [`Self::block_fits`], but with `drilling` a drill square may
    /// overlap a landed Normal square it would drill away.
    fn block_fits_drilling(&self, index: usize, block: &MovingBlock, drilling: bool) -> bool {
        let Some(player) = self.players.get(index) else {
            return false;
        };
        let mut seen = HashSet::with_capacity(block.squares.len());
        for sq in &block.squares {
            let drills_through = drilling
                && sq.content.is_drill()
                && self.board.get(sq.pos()).is_some_and(SquareContent::is_normal);
            if (self.board.is_landed(sq.pos()) && !drills_through)
                || !seen.insert(sq.pos())
                || !self
                    .topology
                    .moving_square_is_valid(&self.board, self.players.len(), player, sq)
            {
                return false;
            }
        }
        self.players
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .filter_map(|(_, p)| p.block())
            .all(|b| b.squares.iter().all(|sq| !seen.contains(&sq.pos())))
    }

    fn take_block(&mut self, index: usize) -> Option<MovingBlock> {
        let player = self.players.get_mut(index)?;
        match std::mem::replace(&mut player.control, ControlState::Inactive) {
            ControlState::Active(block) => Some(block),
            other => {
                player.control = other;
                None
            }
        }
    }

    fn put_block(&mut self, index: usize, block: MovingBlock) {
        if let Some(player) = self.players.get_mut(index) {
            player.control = ControlState::Active(block);
        }
    }

    /// Hand `block` to the player, or start waiting if it does not fit.
    fn activate(&mut self, index: usize, block: MovingBlock) {
        if self.block_fits(index, &block) {
            self.put_block(index, block);
            self.changed = true;
        } else {
            self.start_wait(index);
        }
    }

    fn new_block(&mut self, index: usize) {
        let next = self.factory.create(self.score);
        let Some(player) = self.players.get_mut(index) else {
            return;
        };
        let template = std::mem::replace(&mut player.next, next);
        let block = template.spawn(player);
        debug!(player = %player.name, "new block");
        self.activate(index, block);
    }

    fn start_wait(&mut self, index: usize) {
        let start = self.wait_counter_start;
        if let Some(player) = self.players.get_mut(index) {
            debug!(player = %player.name, seconds = start, "wait countdown started");
            player.control = ControlState::Waiting(start);
            self.started_waits.push(player.id);
            self.changed = true;
        }
    }

    // Joining and leaving

    /// Whether a player called `name` can join (or rejoin) right now.
    pub fn can_join(&self, name: &str) -> bool {
        self.find_by_name(name).is_some() || self.players.len() < self.kind().max_players()
    }

    fn find_by_name(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.players
            .iter()
            .position(|p| p.name.to_lowercase() == name)
    }

    /// Return the player called `name` (case-insensitive), adding one if
    /// there is none yet. `None` when the game is full.
    pub fn get_or_add_player(&mut self, name: &str) -> Option<PlayerId> {
        if let Some(index) = self.find_by_name(name) {
            let player = &mut self.players[index];
            player.connected = true;
            let id = player.id;
            if matches!(player.control, ControlState::Inactive) {
                self.new_block(index);
            }
            info!(player = %name, "player rejoined");
            return Some(id);
        }
        if self.players.len() >= self.kind().max_players() {
            return None;
        }

        let color = Color::PLAYER_COLORS
            .iter()
            .copied()
            .find(|c| self.players.iter().all(|p| p.color != *c))
            .unwrap_or(Color::White);
        let geometry = self
            .topology
            .add_player(&mut self.board, &self.players, color);

        let id = self.next_player_id;
        self.next_player_id += 1;
        let next = self.factory.create(self.score);
        self.players.push(Player::new(
            id,
            name,
            color,
            geometry.up,
            geometry.spawn,
            next,
        ));
        self.new_block(self.players.len() - 1);
        info!(player = %name, id, players = self.players.len(), "player joined");
        self.changed = true;
        Some(id)
    }

    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let name = self.players[index].name.clone();
        self.topology
            .remove_player(&mut self.board, &mut self.players, index);
        self.started_waits.retain(|w| *w != id);
        self.changed = true;
        info!(player = %name, players = self.players.len(), "player left");
        true
    }

    /// A player without a client keeps its place but stops playing.
    pub fn set_connected(&mut self, id: PlayerId, connected: bool) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let player = &mut self.players[index];
        player.connected = connected;
        if !connected && player.is_active() {
            player.control = ControlState::Inactive;
        }
        self.changed = true;
        true
    }

    // Moving blocks

    /// Move a player's block, drilling through landed squares if allowed.
    ///
    /// With `player_relative` the offset is in the player's own frame, so
    /// `(0, 1)` is "down" for everyone.
    pub fn try_move(
        &mut self,
        id: PlayerId,
        dx: i32,
        dy: i32,
        player_relative: bool,
        allow_drilling: bool,
    ) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let (dx, dy) = if player_relative {
            self.players[index].player_to_world((dx, dy))
        } else {
            (dx, dy)
        };
        let Some(mut block) = self.take_block(index) else {
            return false;
        };
        let saved = block.squares.clone();

        for sq in block.squares.iter_mut() {
            sq.x += dx;
            sq.y += dy;
        }

        let player = &self.players[index];
        for sq in block.squares.iter_mut() {
            self.topology.fix_moving_square(player, sq);
        }

        // Drills work on wrapped positions.
        let mut drilled = Vec::new();
        if allow_drilling {
            for sq in block.squares.iter().filter(|sq| sq.content.is_drill()) {
                if self.board.get(sq.pos()).is_some_and(SquareContent::is_normal) {
                    if let Some(content) = self.board.remove(sq.pos()) {
                        drilled.push((sq.pos(), content));
                    }
                }
            }
        }

        let ok = self.block_fits(index, &block);
        if ok {
            self.changed = true;
        } else {
            for (point, content) in drilled {
                self.board.insert(point, content);
            }
            block.squares = saved;
        }
        self.put_block(index, block);
        ok
    }

    pub fn rotate(&mut self, id: PlayerId, counter_clockwise: bool) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let Some(mut block) = self.take_block(index) else {
            return false;
        };
        let saved = block.squares.clone();

        let player = &self.players[index];
        for sq in block.squares.iter_mut() {
            sq.rotate(counter_clockwise);
            self.topology.fix_moving_square(player, sq);
        }

        let ok = self.block_fits(index, &block);
        if ok {
            self.changed = true;
        } else {
            block.squares = saved;
        }
        self.put_block(index, block);
        ok
    }

    pub fn set_fast_down(&mut self, id: PlayerId, value: bool) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        match self.players[index].block_mut() {
            Some(block) if block.fast_down != value => {
                block.fast_down = value;
                true
            }
            _ => false,
        }
    }

    /// Put the block aside, or swap it with the one put aside earlier.
    ///
    /// A block that came out of hold cannot be held again before it lands.
    pub fn hold(&mut self, id: PlayerId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let can_hold = self.players[index]
            .block()
            .is_some_and(|b| !b.came_from_hold);
        if !can_hold {
            return false;
        }
        let Some(block) = self.take_block(index) else {
            return false;
        };

        let current = block.to_template();
        let score = self.score;
        let player = &mut self.players[index];
        let template = match player.held.replace(current) {
            Some(held) => held,
            None => {
                let next = self.factory.create(score);
                std::mem::replace(&mut player.next, next)
            }
        };
        let mut issued = template.spawn(player);
        issued.came_from_hold = true;
        debug!(player = %player.name, "hold");
        self.changed = true;
        self.activate(index, issued);
        true
    }

    /// Drop the block as far as it goes and land it.
    ///
    /// Returns false for players without a block. Landing does not clear
    /// full regions; the caller runs [`Game::begin_clear`] afterwards.
    pub fn hard_drop(&mut self, id: PlayerId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if !self.players[index].is_active() {
            return false;
        }
        let mut steps = 0;
        while steps < HARD_DROP_LIMIT && self.try_move(id, 0, 1, true, true) {
            steps += 1;
        }
        if steps < HARD_DROP_LIMIT {
            self.settle(index);
        }
        true
    }

    /// Upside-down view for a lone ring player.
    pub fn flip(&mut self, id: PlayerId) -> bool {
        if self.kind() != TopologyKind::Ring || self.players.len() != 1 {
            return false;
        }
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.players[index].flip_view();
        let fits = self.players[index]
            .block()
            .map_or(true, |b| self.block_fits(index, b));
        if fits {
            self.changed = true;
        } else {
            self.players[index].flip_view();
        }
        fits
    }

    /// Land a blocked block, or start waiting if it sticks out.
    fn settle(&mut self, index: usize) {
        let Some(block) = self.take_block(index) else {
            return;
        };
        if block
            .squares
            .iter()
            .all(|sq| self.board.is_valid_coord(sq.pos()))
        {
            for sq in &block.squares {
                self.board.insert(sq.pos(), sq.content);
            }
            self.changed = true;
            self.new_block(index);
        } else {
            // Sticking out of the top is this game's version of losing.
            self.start_wait(index);
        }
    }

    fn respawn_emptied(&mut self) {
        for index in 0..self.players.len() {
            if self.players[index].block().is_some_and(MovingBlock::is_empty) {
                self.new_block(index);
            }
        }
    }

    /// One gravity step for the blocks in the given speed class.
    ///
    /// Blocks can be in each other's way, so moving repeats until nothing
    /// moves. Drills go last so they only drill what nobody else fills.
    pub fn move_blocks_down(&mut self, fast: bool) {
        self.respawn_emptied();

        let mut todo: Vec<(bool, PlayerId)> = self
            .players
            .iter()
            .filter_map(|p| {
                p.block()
                    .filter(|b| b.fast_down == fast)
                    .map(|b| (b.is_drill(), p.id))
            })
            .collect();
        todo.sort_by_key(|(is_drill, _)| *is_drill);

        loop {
            let before = todo.len();
            todo.retain(|&(_, id)| !self.try_move(id, 0, 1, true, true));
            if todo.len() == before {
                break;
            }
        }

        for (_, id) in todo {
            let Some(index) = self.index_of(id) else {
                continue;
            };
            if fast {
                self.set_fast_down(id, false);
            } else {
                self.settle(index);
            }
        }
    }

    // Clearing full regions

    /// First phase of clearing: find what is full.
    pub fn begin_clear(&self) -> Option<PendingClear> {
        let regions = self
            .topology
            .find_full_regions(&self.board, &self.players);
        if regions.is_empty() {
            return None;
        }
        let points = regions.iter().flat_map(Region::points).collect();
        Some(PendingClear {
            epoch: self.epoch,
            regions,
            points,
        })
    }

    /// Second phase: delete, compact and score. Returns false if the game
    /// was restarted in between.
    pub fn commit_clear(&mut self, pending: PendingClear) -> bool {
        if pending.epoch != self.epoch {
            return false;
        }
        for region in &pending.regions {
            self.topology.remove_region(&mut self.board, region);
        }
        let awarded = score_for_regions(&pending.regions, self.players.len());
        self.score += awarded;
        debug!(
            regions = pending.regions.len(),
            awarded,
            score = self.score,
            "regions cleared"
        );
        self.repair_overlaps();
        self.changed = true;
        debug_assert!(self.is_valid(), "board invalid after clearing");
        true
    }

    /// Compacting can move a landed square under a moving one. The landed
    /// square loses.
    pub fn repair_overlaps(&mut self) -> usize {
        let overlapping: Vec<WorldPoint> = self
            .players
            .iter()
            .filter_map(Player::block)
            .flat_map(|b| b.squares.iter().map(|sq| sq.pos()))
            .filter(|p| self.board.is_landed(*p))
            .collect();
        for point in &overlapping {
            warn!(x = point.0, y = point.1, "landed square under moving block, deleting it");
            self.board.remove(*point);
        }
        overlapping.len()
    }

    // Bombs and drills

    /// Count every bomb down by one. Returns whether there were any.
    pub fn tick_bombs(&mut self) -> bool {
        let mut any = false;
        let landed = self.board.landed_mut().map(|(_, c)| c);
        let moving = self
            .players
            .iter_mut()
            .filter_map(Player::block_mut)
            .flat_map(|b| b.squares.iter_mut().map(|sq| &mut sq.content));
        for content in landed.chain(moving) {
            if let SquareContent::Bomb { timer, .. } = content {
                *timer -= 1;
                any = true;
            }
        }
        if any {
            self.changed = true;
        }
        any
    }

    /// Bombs whose timer has run out, with their ids.
    pub fn ripe_bombs(&self) -> Vec<(WorldPoint, u64)> {
        let landed = self.board.landed().map(|(p, c)| (p, *c));
        let moving = self
            .players
            .iter()
            .filter_map(Player::block)
            .flat_map(|b| b.squares.iter().map(|sq| (sq.pos(), sq.content)));
        landed
            .chain(moving)
            .filter_map(|(p, c)| match c {
                SquareContent::Bomb { id, timer } if timer <= 0 => Some((p, id)),
                _ => None,
            })
            .collect()
    }

    /// Valid coordinates within the blast radius of any center.
    pub fn explosion_area(&self, centers: &[WorldPoint]) -> BTreeSet<WorldPoint> {
        let limit = BOMB_RADIUS * BOMB_RADIUS;
        self.board
            .valid_coords()
            .filter(|&(x, y)| {
                centers.iter().any(|&(cx, cy)| {
                    let (dx, dy) = ((x - cx) as f32, (y - cy) as f32);
                    dx * dx + dy * dy < limit
                })
            })
            .collect()
    }

    /// Clear everything in `area` along with every square of the bombs in
    /// `exploded`. Returns the positions of bombs caught in the area that
    /// have not exploded yet; they explode in the next round.
    pub fn detonate(
        &mut self,
        area: &BTreeSet<WorldPoint>,
        exploded: &mut HashSet<u64>,
    ) -> Vec<WorldPoint> {
        let mut chained = Vec::new();
        let mut newly_exploded = HashSet::new();
        let landed = self.board.landed().map(|(p, c)| (p, *c));
        let moving = self
            .players
            .iter()
            .filter_map(Player::block)
            .flat_map(|b| b.squares.iter().map(|sq| (sq.pos(), sq.content)));
        for (point, content) in landed.chain(moving) {
            if let Some(id) = content.bomb_id() {
                if area.contains(&point) && !exploded.contains(&id) {
                    chained.push(point);
                    newly_exploded.insert(id);
                }
            }
        }

        let gone = |point: WorldPoint, content: &SquareContent| {
            area.contains(&point) || content.bomb_id().is_some_and(|id| exploded.contains(&id))
        };
        self.board.retain(|p, c| !gone(p, c));
        for player in self.players.iter_mut() {
            if let Some(block) = player.block_mut() {
                block.squares.retain(|sq| !gone(sq.pos(), &sq.content));
            }
        }

        exploded.extend(newly_exploded);
        self.respawn_emptied();
        self.changed = true;
        debug!(cleared = area.len(), chained = chained.len(), "bomb exploded");
        chained
    }

    /// Advance the drill pictures of moving, next and held blocks.
    pub fn advance_drill_animation(&mut self) -> bool {
        let mut changed = false;
        for player in self.players.iter_mut() {
            if let Some(block) = player.block_mut() {
                for sq in block.squares.iter_mut() {
                    if let SquareContent::Drill { frame, .. } = &mut sq.content {
                        *frame = frame.wrapping_add(1);
                        changed = true;
                    }
                }
            }
            changed |= player.next.animate();
            if let Some(held) = player.held.as_mut() {
                changed |= held.animate();
            }
        }
        if changed {
            self.changed = true;
        }
        changed
    }

    // Wait countdowns

    /// Players that started waiting since the last call.
    pub fn take_started_waits(&mut self) -> Vec<PlayerId> {
        std::mem::take(&mut self.started_waits)
    }

    pub fn tick_wait(&mut self, id: PlayerId) -> WaitTick {
        let Some(index) = self.index_of(id) else {
            return WaitTick::Gone;
        };
        let player = &mut self.players[index];
        let ControlState::Waiting(n) = player.control else {
            return WaitTick::Gone;
        };
        let left = n.saturating_sub(1);
        player.control = ControlState::Waiting(left);
        self.changed = true;
        if left == 0 {
            WaitTick::Expired
        } else {
            WaitTick::Counting(left)
        }
    }

    /// Landed squares in the area a waiting player's countdown will wipe.
    pub fn owned_landed(&self, id: PlayerId) -> BTreeSet<WorldPoint> {
        let Some(index) = self.index_of(id) else {
            return BTreeSet::new();
        };
        self.board
            .landed()
            .map(|(p, _)| p)
            .filter(|&p| self.topology.owns(&self.players, index, p))
            .collect()
    }

    /// End a countdown: wipe the player's area and give them a new block,
    /// or make them inactive if nobody is there to play.
    pub fn finish_wait(&mut self, id: PlayerId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if !self.players[index].is_waiting() {
            return false;
        }
        let wiped = self.owned_landed(id);
        self.board.retain(|p, _| !wiped.contains(&p));
        self.changed = true;
        if self.players[index].connected {
            self.new_block(index);
        } else {
            self.players[index].control = ControlState::Inactive;
        }
        true
    }

    /// Over when nobody is steering a block anymore.
    pub fn is_over(&self) -> bool {
        !self.players.is_empty() && !self.players.iter().any(Player::is_active)
    }

    /// Start again with the same players. Pending clears become stale.
    pub fn restart(&mut self) {
        self.epoch += 1;
        self.score = 0;
        self.board.retain(|_, c| c.is_separator());
        self.board.clear_all_flashes();
        self.started_waits.clear();
        for index in 0..self.players.len() {
            let next = self.factory.create(0);
            let player = &mut self.players[index];
            player.control = ControlState::Inactive;
            player.held = None;
            player.next = next;
        }
        for index in 0..self.players.len() {
            if self.players[index].connected {
                self.new_block(index);
            }
        }
        self.changed = true;
        info!(epoch = self.epoch, "game restarted");
    }

    // Flashing and change tracking

    pub fn set_flash(&mut self, points: impl IntoIterator<Item = WorldPoint>, color: Color) {
        self.board.set_flash(points, color);
        self.changed = true;
    }

    pub fn clear_flash(&mut self, points: impl IntoIterator<Item = WorldPoint>) {
        self.board.clear_flash(points);
        self.changed = true;
    }

    /// Whether anything visible changed since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    // Output

    /// Where the viewer's block would land if dropped without drilling.
    pub fn predict_landing(&self, viewer: PlayerId) -> Option<Vec<WorldPoint>> {
        let index = self.index_of(viewer)?;
        let player = &self.players[index];
        let block = player.block()?;
        let drilling = block.is_drill();

        let (dx, dy) = player.player_to_world((0, 1));
        let mut current = block.clone();
        let mut steps = 0;
        while steps < PREDICTION_STEPS {
            let mut next = current.clone();
            for sq in next.squares.iter_mut() {
                sq.x += dx;
                sq.y += dy;
                self.topology.fix_moving_square(player, sq);
            }
            if !self.block_fits_drilling(index, &next, drilling) {
                break;
            }
            current = next;
            steps += 1;
        }
        if steps == 0 || steps == PREDICTION_STEPS {
            return None;
        }
        Some(current.squares.iter().map(|sq| sq.pos()).collect())
    }

    /// The board as seen by `viewer`.
    pub fn renderable_lines(&self, viewer: PlayerId) -> Vec<StyledRow> {
        let Some(index) = self.index_of(viewer) else {
            return Vec::new();
        };
        let mut cells: HashMap<WorldPoint, [Cell; 2]> = HashMap::new();
        for (point, content) in self.board.landed() {
            if self.board.is_valid_coord(point) {
                cells.insert(point, content.cells(true));
            }
        }
        if let Some(points) = self.predict_landing(viewer) {
            let style = CellStyle::default();
            for point in points {
                // Drill predictions can cover landed squares.
                cells
                    .entry(point)
                    .and_modify(|pair| {
                        if pair.iter().all(|cell| cell.ch == ' ') {
                            pair.iter_mut().for_each(|cell| cell.ch = ':');
                        }
                    })
                    .or_insert([style.into_cell(':'), style.into_cell(':')]);
            }
        }
        for player in &self.players {
            if let Some(block) = player.block() {
                for sq in &block.squares {
                    cells.insert(sq.pos(), sq.content.cells(false));
                }
            }
        }
        for (point, color) in self.board.flashing() {
            let cell = CellStyle::bg(color).into_cell(' ');
            cells.insert(point, [cell, cell]);
        }

        self.topology.render(&RenderContext {
            players: &self.players,
            viewer: index,
            cells: &cells,
        })
    }

    pub fn next_preview(&self, viewer: PlayerId) -> Vec<StyledRow> {
        self.player(viewer)
            .map(|p| template_rows(&p.next))
            .unwrap_or_default()
    }

    pub fn held_preview(&self, viewer: PlayerId) -> Vec<StyledRow> {
        self.player(viewer)
            .and_then(|p| p.held.as_ref())
            .map(template_rows)
            .unwrap_or_default()
    }

    pub fn summary(&self, duration_secs: u64) -> GameSummary {
        GameSummary {
            mode: self.kind().as_str().to_string(),
            score: self.score,
            duration_secs,
            player_names: self.players.iter().map(|p| p.name.clone()).collect(),
        }
    }
}

/// Small drawing of a block template, two cells per square.
fn template_rows(template: &BlockTemplate) -> Vec<StyledRow> {
    let squares = template.squares();
    let Some(min_x) = squares.iter().map(|((x, _), _)| *x).min() else {
        return Vec::new();
    };
    let max_x = squares.iter().map(|((x, _), _)| *x).max().unwrap_or(min_x);
    let min_y = squares.iter().map(|((_, y), _)| *y).min().unwrap_or(0);
    let max_y = squares.iter().map(|((_, y), _)| *y).max().unwrap_or(0);

    let by_point: HashMap<_, _> = squares.iter().map(|(p, c)| (*p, *c)).collect();
    (min_y..=max_y)
        .map(|y| {
            let mut row = StyledRow::new();
            for x in min_x..=max_x {
                match by_point.get(&(x, y)) {
                    Some(content) => row.extend_from_slice(&content.cells(false)),
                    None => push_str(&mut row, "  ", CellStyle::default()),
                }
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Shape;
    use crate::types::row_text;

    fn normal(shape: Shape) -> SquareContent {
        SquareContent::Normal {
            shape,
            backwards: false,
        }
    }

    fn fixed_game(kind: TopologyKind, shape: Shape) -> Game {
        Game::with_factory(kind, BlockFactory::fixed(BlockTemplate::normal(shape)))
    }

    fn positions(game: &Game, id: PlayerId) -> Vec<WorldPoint> {
        let mut points: Vec<_> = game
            .player(id)
            .and_then(Player::block)
            .map(|b| b.squares.iter().map(|sq| sq.pos()).collect())
            .unwrap_or_default();
        points.sort();
        points
    }

    #[test]
    fn test_join_spawns_block_above_lane() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        let id = game.get_or_add_player("Alice").unwrap();
        assert_eq!(positions(&game, id), vec![(2, -2), (2, -1), (3, -2), (3, -1)]);
        assert!(game.is_valid());
        assert!(!game.is_over());
    }

    #[test]
    fn test_get_or_add_player_is_case_insensitive() {
        let mut game = Game::new(TopologyKind::Traditional, 7);
        let a = game.get_or_add_player("Alice").unwrap();
        let b = game.get_or_add_player("aLICE").unwrap();
        assert_eq!(a, b);
        assert_eq!(game.players().len(), 1);
    }

    #[test]
    fn test_player_colors_are_distinct() {
        let mut game = Game::new(TopologyKind::Traditional, 7);
        for name in ["a", "b", "c"] {
            game.get_or_add_player(name);
        }
        let colors: HashSet<_> = game.players().iter().map(|p| p.color).collect();
        assert_eq!(colors.len(), 3);
    }

    #[test]
    fn test_full_game_rejects_new_names() {
        let mut game = Game::new(TopologyKind::Bottle, 7);
        for name in ["a", "b", "c"] {
            assert!(game.get_or_add_player(name).is_some());
        }
        assert!(!game.can_join("d"));
        assert!(game.can_join("A"));
        assert_eq!(game.get_or_add_player("d"), None);
    }

    #[test]
    fn test_move_stops_at_walls() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        let id = game.get_or_add_player("Alice").unwrap();
        let mut moves = 0;
        while game.try_move(id, -1, 0, true, false) {
            moves += 1;
        }
        assert_eq!(moves, 2);
        assert_eq!(positions(&game, id)[0].0, 0);
        assert!(game.is_valid());
    }

    #[test]
    fn test_rejected_move_leaves_state_unchanged() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        let id = game.get_or_add_player("Alice").unwrap();
        for x in 0..7 {
            game.set_landed((x, 19), normal(Shape::T));
        }
        for _ in 0..40 {
            game.try_move(id, 0, 1, true, false);
        }
        let before = positions(&game, id);
        assert_eq!(before, vec![(2, 17), (2, 18), (3, 17), (3, 18)]);
        assert!(!game.try_move(id, 0, 1, true, false));
        assert_eq!(positions(&game, id), before);
        assert_eq!(game.board().landed_count(), 7);
    }

    #[test]
    fn test_rotate_is_rolled_back_at_wall() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::I);
        let id = game.get_or_add_player("Alice").unwrap();
        for _ in 0..5 {
            game.try_move(id, 0, 1, true, false);
        }
        assert!(game.rotate(id, false));
        // Vertical I against the left wall cannot turn back.
        while game.try_move(id, -1, 0, true, false) {}
        let before = positions(&game, id);
        if !game.rotate(id, false) {
            assert_eq!(positions(&game, id), before);
        }
        assert!(game.is_valid());
    }

    #[test]
    fn test_gravity_lands_and_spawns() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        let id = game.get_or_add_player("Alice").unwrap();
        for _ in 0..25 {
            game.move_blocks_down(false);
        }
        assert_eq!(game.board().landed_count(), 4);
        assert!(game.landed((2, 19)).is_some());
        assert!(game.player(id).unwrap().is_active());
        assert!(game.is_valid());
    }

    #[test]
    fn test_fast_tick_only_clears_flag_when_blocked() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        let id = game.get_or_add_player("Alice").unwrap();
        game.set_fast_down(id, true);
        for _ in 0..25 {
            game.move_blocks_down(true);
        }
        let block = game.player(id).unwrap().block().unwrap();
        assert!(!block.fast_down);
        assert_eq!(game.board().landed_count(), 0);
    }

    #[test]
    fn test_overhang_starts_wait() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        game.set_wait_counter_start(3);
        let id = game.get_or_add_player("Alice").unwrap();
        game.set_landed((2, 0), normal(Shape::T));
        game.move_blocks_down(false);
        assert_eq!(game.player(id).unwrap().control, ControlState::Waiting(3));
        assert_eq!(game.take_started_waits(), vec![id]);
        assert!(game.is_over());

        assert_eq!(game.tick_wait(id), WaitTick::Counting(2));
        assert_eq!(game.tick_wait(id), WaitTick::Counting(1));
        assert_eq!(game.tick_wait(id), WaitTick::Expired);
        assert_eq!(game.owned_landed(id).len(), 1);
        assert!(game.finish_wait(id));
        assert_eq!(game.board().landed_count(), 0);
        assert!(game.player(id).unwrap().is_active());
    }

    #[test]
    fn test_disconnected_player_becomes_inactive_after_wait() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        game.set_wait_counter_start(1);
        let id = game.get_or_add_player("Alice").unwrap();
        game.set_landed((3, 0), normal(Shape::T));
        game.move_blocks_down(false);
        game.set_connected(id, false);
        assert_eq!(game.tick_wait(id), WaitTick::Expired);
        game.finish_wait(id);
        assert_eq!(game.player(id).unwrap().control, ControlState::Inactive);
        assert_eq!(game.tick_wait(id), WaitTick::Gone);
    }

    #[test]
    fn test_hold_then_hold_again_is_noop() {
        let mut game = Game::new(TopologyKind::Traditional, 99);
        let id = game.get_or_add_player("Alice").unwrap();
        let first = game.player(id).unwrap().block().unwrap().to_template();
        let next = game.player(id).unwrap().next.clone();

        assert!(game.hold(id));
        let player = game.player(id).unwrap();
        assert_eq!(player.held.as_ref(), Some(&first));
        assert_eq!(player.block().unwrap().to_template(), next);

        assert!(!game.hold(id));
        assert_eq!(game.player(id).unwrap().held.as_ref(), Some(&first));
    }

    #[test]
    fn test_hold_swaps_after_landing() {
        let mut game = Game::new(TopologyKind::Traditional, 99);
        let id = game.get_or_add_player("Alice").unwrap();
        let first = game.player(id).unwrap().block().unwrap().to_template();
        game.hold(id);
        assert!(game.hard_drop(id));
        let current = game.player(id).unwrap().block().unwrap().to_template();

        assert!(game.hold(id));
        let player = game.player(id).unwrap();
        assert_eq!(player.block().unwrap().to_template(), first);
        assert_eq!(player.held.as_ref(), Some(&current));
    }

    #[test]
    fn test_clear_scores_and_shifts() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        game.get_or_add_player("Alice").unwrap();
        for y in [18, 19] {
            for x in 0..7 {
                game.set_landed((x, y), normal(Shape::L));
            }
        }
        game.set_landed((3, 17), normal(Shape::J));

        let pending = game.begin_clear().unwrap();
        assert_eq!(pending.points().len(), 14);
        assert!(game.commit_clear(pending));
        assert_eq!(game.score(), 30);
        assert_eq!(game.board().landed_count(), 1);
        assert_eq!(game.landed((3, 19)), Some(&normal(Shape::J)));
    }

    #[test]
    fn test_two_players_double_score() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        game.get_or_add_player("a");
        game.get_or_add_player("b");
        for y in [18, 19] {
            for x in 0..14 {
                game.set_landed((x, y), normal(Shape::L));
            }
        }
        let pending = game.begin_clear().unwrap();
        game.commit_clear(pending);
        assert_eq!(game.score(), 60);
    }

    #[test]
    fn test_stale_clear_is_ignored_after_restart() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        game.get_or_add_player("Alice");
        for x in 0..7 {
            game.set_landed((x, 19), normal(Shape::L));
        }
        let pending = game.begin_clear().unwrap();
        game.restart();
        assert!(!game.commit_clear(pending));
        assert_eq!(game.score(), 0);
        assert_eq!(game.epoch(), 1);
    }

    #[test]
    fn test_repair_deletes_landed_under_moving() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        let id = game.get_or_add_player("Alice").unwrap();
        for _ in 0..5 {
            game.try_move(id, 0, 1, true, false);
        }
        let point = positions(&game, id)[0];
        game.board.insert(point, normal(Shape::S));
        assert!(!game.is_valid());
        assert_eq!(game.repair_overlaps(), 1);
        assert!(game.is_valid());
    }

    #[test]
    fn test_bomb_ticks_and_chains() {
        let mut game = Game::with_factory(
            TopologyKind::Traditional,
            BlockFactory::fixed(BlockTemplate::bomb(0)),
        );
        let id = game.get_or_add_player("Alice").unwrap();
        game.set_landed((3, 15), SquareContent::Bomb { id: 90, timer: 1 });
        game.set_landed((5, 15), SquareContent::Bomb { id: 91, timer: 10 });
        game.set_landed((6, 17), normal(Shape::Z));
        game.set_landed((0, 12), normal(Shape::Z));

        assert!(game.tick_bombs());
        let moving = game.player(id).unwrap().block().unwrap().squares[0].content;
        assert_eq!(moving, SquareContent::Bomb { id: 1, timer: 14 });

        let ripe = game.ripe_bombs();
        assert_eq!(ripe, vec![((3, 15), 90)]);
        let mut exploded: HashSet<u64> = ripe.iter().map(|(_, id)| *id).collect();
        let area = game.explosion_area(&[(3, 15)]);
        assert!(area.contains(&(0, 15)));
        assert!(!area.contains(&(3, 19)));

        let chained = game.detonate(&area, &mut exploded);
        assert_eq!(chained, vec![(5, 15)]);
        assert!(game.landed((0, 12)).is_some());

        let area = game.explosion_area(&chained);
        assert!(game.detonate(&area, &mut exploded).is_empty());
        assert!(game.landed((6, 17)).is_none());
        assert!(game.is_valid());
    }

    #[test]
    fn test_drill_goes_through_landed_squares() {
        let mut game = Game::with_factory(
            TopologyKind::Traditional,
            BlockFactory::fixed(BlockTemplate::drill()),
        );
        let id = game.get_or_add_player("Alice").unwrap();
        game.set_landed((3, 10), normal(Shape::T));
        for _ in 0..30 {
            game.move_blocks_down(false);
        }
        assert!(game.landed((3, 10)).is_none());
        // Drill landed at the bottom with its 10 squares.
        assert!(game.landed((3, 19)).is_some_and(SquareContent::is_drill));
        assert!(game.player(id).unwrap().is_active());
    }

    #[test]
    fn test_ring_drill_drills_at_wrapped_position() {
        let mut game = Game::with_factory(
            TopologyKind::Ring,
            BlockFactory::fixed(BlockTemplate::drill()),
        );
        let id = game.get_or_add_player("Alice").unwrap();
        assert!(game.try_move(id, 6, 0, true, false));

        let lowest = |game: &Game| {
            let player = game.player(id).unwrap();
            player
                .block()
                .unwrap()
                .squares
                .iter()
                .map(|sq| player.world_to_player(sq.pos()).1)
                .max()
                .unwrap()
        };
        while lowest(&game) < 14 {
            assert!(game.try_move(id, 0, 1, true, false));
        }

        let across = game.player(id).unwrap().player_to_world((6, -14));
        game.set_landed(across, normal(Shape::I));
        assert!(game.try_move(id, 0, 1, true, true));
        assert!(game.landed(across).is_none());
        assert!(game.is_valid());
    }

    #[test]
    fn test_drill_prediction_goes_through_landed_squares() {
        let mut game = Game::with_factory(
            TopologyKind::Traditional,
            BlockFactory::fixed(BlockTemplate::drill()),
        );
        let id = game.get_or_add_player("Alice").unwrap();
        game.set_landed((3, 17), normal(Shape::J));

        let predicted = game.predict_landing(id).unwrap();
        assert!(predicted.contains(&(3, 17)));
        assert!(predicted.contains(&(3, 19)));

        let lines = game.renderable_lines(id);
        assert_eq!(lines[19][7].ch, ':');
        assert_eq!(lines[19][7].style.bg, Shape::J.color());
        // Prediction only; nothing was drilled.
        assert!(game.landed((3, 17)).is_some());
    }

    #[test]
    fn test_drill_animation_advances() {
        let mut game = Game::with_factory(
            TopologyKind::Traditional,
            BlockFactory::fixed(BlockTemplate::drill()),
        );
        let id = game.get_or_add_player("Alice").unwrap();
        assert!(game.advance_drill_animation());
        let content = game.player(id).unwrap().block().unwrap().squares[0].content;
        assert!(matches!(content, SquareContent::Drill { frame: 1, .. }));
    }

    #[test]
    fn test_flip_only_for_single_ring_player() {
        let mut game = fixed_game(TopologyKind::Ring, Shape::T);
        let a = game.get_or_add_player("a").unwrap();
        assert!(game.flip(a));
        assert_eq!(game.player(a).unwrap().up, (0, 1));
        assert!(game.is_valid());
        game.get_or_add_player("b");
        assert!(!game.flip(a));

        let mut traditional = fixed_game(TopologyKind::Traditional, Shape::T);
        let id = traditional.get_or_add_player("a").unwrap();
        assert!(!traditional.flip(id));
    }

    #[test]
    fn test_renderable_lines_show_prediction_and_flash() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        let id = game.get_or_add_player("Alice").unwrap();
        let lines = game.renderable_lines(id);
        assert_eq!(lines.len(), 23);
        assert_eq!(lines[2].len(), 16);
        assert!(row_text(&lines[21]).contains("::::"));

        game.set_landed((0, 19), normal(Shape::J));
        game.set_flash([(0, 19)], Color::White);
        let lines = game.renderable_lines(id);
        assert_eq!(lines[21][1].style.bg, Color::White);
        game.clear_flash([(0, 19)]);
        let lines = game.renderable_lines(id);
        assert_eq!(lines[21][1].style.bg, Shape::J.color());
    }

    #[test]
    fn test_previews() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::I);
        let id = game.get_or_add_player("Alice").unwrap();
        let next = game.next_preview(id);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].len(), 8);
        assert!(game.held_preview(id).is_empty());
        game.hold(id);
        assert_eq!(game.held_preview(id).len(), 1);
    }

    #[test]
    fn test_change_flag_coalesces() {
        let mut game = fixed_game(TopologyKind::Traditional, Shape::O);
        let id = game.get_or_add_player("Alice").unwrap();
        game.try_move(id, 1, 0, true, false);
        game.try_move(id, -1, 0, true, false);
        assert!(game.take_changed());
        assert!(!game.take_changed());
    }

    #[test]
    fn test_summary() {
        let mut game = Game::new(TopologyKind::Bottle, 3);
        game.get_or_add_player("Alice");
        let summary = game.summary(42);
        assert_eq!(summary.mode, "bottle");
        assert_eq!(summary.duration_secs, 42);
        assert_eq!(summary.player_names, vec!["Alice".to_string()]);
    }
}
