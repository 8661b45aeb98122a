use std::ops::{Add, AddAssign, Mul, Sub};

use serde::Serialize;

use crate::constants::TILE_SIZE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    #[default]
    None,
}

pub const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    pub fn vector(self) -> Vec2 {
        match self {
            Self::Up => Vec2 { x: 0.0, y: -1.0 },
            Self::Down => Vec2 { x: 0.0, y: 1.0 },
            Self::Left => Vec2 { x: -1.0, y: 0.0 },
            Self::Right => Vec2 { x: 1.0, y: 0.0 },
            Self::None => Vec2 { x: 0.0, y: 0.0 },
        }
    }

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn magnitude_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance_squared(self, other: Vec2) -> f32 {
        (self - other).magnitude_squared()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Integer tile coordinates, the identity of a maze node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Tile {
    pub col: i32,
    pub row: i32,
}

impl Tile {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub fn position(self) -> Vec2 {
        Vec2::new(self.col as f32 * TILE_SIZE, self.row as f32 * TILE_SIZE)
    }

    pub const fn offset(self, dcol: i32, drow: i32) -> Self {
        Self::new(self.col + dcol, self.row + drow)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostType {
    Chaser,
    Ambusher,
    Flanker,
    Skittish,
}

pub const GHOST_TYPES: [GhostType; 4] = [
    GhostType::Chaser,
    GhostType::Ambusher,
    GhostType::Flanker,
    GhostType::Skittish,
];

impl GhostType {
    pub fn index(self) -> usize {
        match self {
            Self::Chaser => 0,
            Self::Ambusher => 1,
            Self::Flanker => 2,
            Self::Skittish => 3,
        }
    }
}

/// Who is asking to traverse a link. Access masks are keyed by actor so a
/// single node can be open to ghosts but closed to the player, or closed to
/// one ghost only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Player,
    Ghost(GhostType),
}

impl Actor {
    pub fn bit(self) -> u8 {
        match self {
            Self::Player => 1,
            Self::Ghost(ghost) => 1 << (1 + ghost.index()),
        }
    }
}

pub const ALL_ACTORS_MASK: u8 = 0b1_1111;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostMode {
    Scatter,
    Chase,
    Frightened,
    Spawn,
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PelletKind {
    Pellet,
    PowerPellet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    Ready,
    Paused,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Win,
    Loss,
    Truncated,
}

/// External control requests queued into the engine between ticks. Processed
/// in order during the tick, ignored entirely in automated sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    TogglePause,
    SetDirection(Direction),
}

/// Deferred work resolved by the tick controller when a timed pause expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledAction {
    ResumeShowEntities,
    Restart,
    ResetLevel,
    AdvanceLevel,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub tile: Tile,
    #[serde(rename = "targetTile")]
    pub target_tile: Tile,
    pub position: Vec2,
    pub direction: Direction,
    pub alive: bool,
    pub visible: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    #[serde(rename = "type")]
    pub ghost_type: GhostType,
    pub tile: Tile,
    #[serde(rename = "targetTile")]
    pub target_tile: Tile,
    pub position: Vec2,
    pub direction: Direction,
    pub mode: GhostMode,
    pub visible: bool,
    pub points: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PelletView {
    pub tile: Tile,
    pub kind: PelletKind,
    pub points: u32,
    pub visible: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct FruitView {
    pub tile: Tile,
    pub points: u32,
    #[serde(rename = "timeLeft")]
    pub time_left: f32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    PelletEaten {
        tile: Tile,
        kind: PelletKind,
        points: u32,
    },
    HomeExitOpened {
        ghost: GhostType,
    },
    FruitSpawned {
        tile: Tile,
    },
    FruitTaken {
        points: u32,
    },
    FruitExpired,
    GhostEaten {
        ghost: GhostType,
        points: u32,
    },
    PlayerCaptured {
        #[serde(rename = "livesLeft")]
        lives_left: i32,
    },
    LevelCleared {
        level: usize,
    },
    LevelReset,
    GameOver,
    GameRestarted,
    LevelAdvanced {
        level: usize,
    },
}

/// Per-tick read-only state handed to renderers and harnesses. The engine
/// never depends on what a consumer does with it.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub score: u32,
    pub lives: i32,
    pub level: usize,
    pub paused: bool,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub pellets: Vec<PelletView>,
    pub fruit: Option<FruitView>,
    #[serde(rename = "pelletsEaten")]
    pub pellets_eaten: u32,
    pub message: Option<MessageKey>,
    #[serde(rename = "backgroundFlash")]
    pub background_flash: bool,
    pub events: Vec<RuntimeEvent>,
}

/// Static per-level data a renderer needs once, at session start.
#[derive(Clone, Debug, Serialize)]
pub struct WorldInit {
    pub level: usize,
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub layout: Vec<String>,
    /// Visual-orientation hints for wall sprites; opaque to the simulation.
    pub rotation: Vec<String>,
}

/// What the external optimization loop consumes when a session ends.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct SessionResult {
    pub score: u32,
    pub outcome: SessionOutcome,
    pub level: usize,
    pub ticks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involutive() {
        for dir in DIRECTIONS {
            assert_eq!(dir.opposite().opposite(), dir);
        }
        assert_eq!(Direction::None.opposite(), Direction::None);
    }

    #[test]
    fn actor_bits_are_distinct() {
        let mut mask = 0u8;
        for actor in [
            Actor::Player,
            Actor::Ghost(GhostType::Chaser),
            Actor::Ghost(GhostType::Ambusher),
            Actor::Ghost(GhostType::Flanker),
            Actor::Ghost(GhostType::Skittish),
        ] {
            assert_eq!(mask & actor.bit(), 0);
            mask |= actor.bit();
        }
        assert_eq!(mask, ALL_ACTORS_MASK);
    }

    #[test]
    fn tile_position_scales_by_tile_size() {
        let pos = Tile::new(3, 2).position();
        assert_eq!(pos, Vec2::new(3.0 * TILE_SIZE, 2.0 * TILE_SIZE));
    }

    #[test]
    fn parse_move_accepts_known_values_only() {
        assert_eq!(Direction::parse_move("left"), Some(Direction::Left));
        assert_eq!(Direction::parse_move("none"), Some(Direction::None));
        assert_eq!(Direction::parse_move("sideways"), None);
    }
}
