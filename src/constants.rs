pub const TICK_RATE: u32 = 60;
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;

pub const TILE_SIZE: f32 = 16.0;

pub const PLAYER_SPEED: f32 = 100.0;
pub const GHOST_SPEED: f32 = 100.0;
pub const GHOST_FRIGHTENED_SPEED: f32 = 50.0;
pub const GHOST_SPAWN_SPEED: f32 = 150.0;

pub const PLAYER_COLLIDE_RADIUS: f32 = 5.0;
pub const GHOST_COLLIDE_RADIUS: f32 = 5.0;
pub const PELLET_RADIUS: f32 = 4.0;
pub const POWER_PELLET_RADIUS: f32 = 8.0;
pub const FRUIT_COLLIDE_RADIUS: f32 = 8.0;

pub const PELLET_POINTS: u32 = 10;
pub const POWER_PELLET_POINTS: u32 = 50;
pub const GHOST_BASE_POINTS: u32 = 200;

pub const STARTING_LIVES: i32 = 5;

/// Forward-only global phase schedule: (scatter secs, chase secs) pairs.
/// Once the table is exhausted the cycle holds at chase for good.
pub const SCATTER_CHASE_SCHEDULE: [(f32, f32); 3] = [(7.0, 20.0), (7.0, 20.0), (5.0, 20.0)];
pub const FINAL_SCATTER_TIME: f32 = 5.0;

pub const FRIGHTENED_TIME: f32 = 7.0;
pub const HOME_EXIT_DELAY: f32 = 0.7;

/// Pellet-count thresholds opening the home exits of the two locked ghosts.
pub const AMBUSHER_UNLOCK_PELLETS: u32 = 30;
pub const FLANKER_UNLOCK_PELLETS: u32 = 70;

pub const FRUIT_PELLET_THRESHOLDS: [u32; 2] = [50, 140];
pub const FRUIT_LIFETIME: f32 = 5.0;

pub const AMBUSH_LOOKAHEAD_TILES: f32 = 4.0;
pub const FLANK_RANGE_TILES: f32 = 8.0;
pub const SKITTISH_RANGE_TILES: f32 = 8.0;

pub const POWER_PELLET_FLASH_TIME: f32 = 0.2;
pub const BACKGROUND_FLASH_TIME: f32 = 0.2;

pub const CAPTURE_PAUSE_TIME: f32 = 3.0;
pub const GHOST_EATEN_PAUSE_TIME: f32 = 1.0;

pub fn fruit_points(level: usize) -> u32 {
    100 + level as u32 * 20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fruit_points_scale_with_level() {
        assert_eq!(fruit_points(0), 100);
        assert_eq!(fruit_points(3), 160);
    }
}
