//! Score calculation for cleared regions.
//!
//! Line-type regions (rows, bottle slices, ring lines) use a table indexed by
//! the number of regions cleared at once. With more players a full line needs
//! every player's part to be full at the same time, which gets exponentially
//! less likely, so the base score doubles per extra player.
//!
//! Full rings of the ring board are worth a flat [`RING_SCORE`] each.

use crate::topology::Region;

/// Points for one full ring.
pub const RING_SCORE: u64 = 100;

/// Base points for clearing `count` line-type regions at once (one player).
pub fn base_line_score(count: usize) -> u64 {
    match count {
        0 => 0,
        1 => 10,
        2 => 30,
        3 => 60,
        _ => 100,
    }
}

/// Points for `count` line-type regions with `players` players in the game.
///
/// ```
/// use catris_core::scoring::line_clear_score;
///
/// assert_eq!(line_clear_score(1, 1), 10);
/// assert_eq!(line_clear_score(2, 2), 60);
/// assert_eq!(line_clear_score(1, 0), 0);
/// ```
pub fn line_clear_score(count: usize, players: usize) -> u64 {
    if players == 0 {
        return 0;
    }
    let exponent = (players - 1).min(62) as u32;
    base_line_score(count).saturating_mul(1u64 << exponent)
}

/// Total points for a batch of regions cleared together.
pub fn score_for_regions(regions: &[Region], players: usize) -> u64 {
    let rings = regions.iter().filter(|r| r.is_ring()).count() as u64;
    let lines = regions.len() - rings as usize;
    line_clear_score(lines, players) + rings * RING_SCORE
}
