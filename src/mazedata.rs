use crate::maze::{HOME_CENTER_OFFSET, HOME_DOOR_OFFSET, HOME_LEFT_OFFSET, HOME_RIGHT_OFFSET};
use crate::types::{GhostType, Tile};

/// One level's maze description: the two aligned character grids plus the
/// named tile offsets the simulation needs to place everything.
#[derive(Clone, Debug)]
pub struct MazeLevel {
    pub name: &'static str,
    pub layout: &'static [&'static str],
    pub rotation: &'static [&'static str],
    pub player_start: Tile,
    pub fruit_tile: Tile,
    pub home_offset: Tile,
    pub home_connect_left: Tile,
    pub home_connect_right: Tile,
    pub portal_pairs: &'static [(Tile, Tile)],
    /// Scatter corners indexed by ghost identity.
    pub ghost_corners: [Tile; 4],
    /// Junctions where ghosts may not turn upward.
    pub ghost_deny_up: &'static [Tile],
}

impl MazeLevel {
    pub fn door_tile(&self) -> Tile {
        self.home_offset.offset(HOME_DOOR_OFFSET.0, HOME_DOOR_OFFSET.1)
    }

    pub fn spawn_tile(&self) -> Tile {
        self.home_offset.offset(HOME_CENTER_OFFSET.0, HOME_CENTER_OFFSET.1)
    }

    pub fn ghost_start(&self, ghost: GhostType) -> Tile {
        let (dcol, drow) = match ghost {
            GhostType::Chaser => HOME_DOOR_OFFSET,
            GhostType::Ambusher => HOME_LEFT_OFFSET,
            GhostType::Flanker => HOME_RIGHT_OFFSET,
            GhostType::Skittish => HOME_CENTER_OFFSET,
        };
        self.home_offset.offset(dcol, drow)
    }

    pub fn corner(&self, ghost: GhostType) -> Tile {
        self.ghost_corners[ghost.index()]
    }

    pub fn rows(&self) -> usize {
        self.layout.len()
    }

    pub fn cols(&self) -> usize {
        self.layout.first().map(|line| line.len()).unwrap_or(0)
    }
}

/// Levels rotate over the built-in table.
pub fn level(index: usize) -> &'static MazeLevel {
    &LEVELS[index % LEVELS.len()]
}

pub fn level_count() -> usize {
    LEVELS.len()
}

const ALPHA_LAYOUT: [&str; 13] = [
    "XXXXXXXXXXXXXXXXX",
    "XP...+..+..+...PX",
    "X.XXX.XXXXX.XXX.X",
    "X.XXX.XXXXX.XXX.X",
    "X+...nXXXXXn...+X",
    "X.XXXXXXXXXXXXX.X",
    "n+XXXXXXXXXXXXX+n",
    "X.XXXXXXXXXXXXX.X",
    "X+...+XXXXX+...+X",
    "X.XXX.XXXXX.XXX.X",
    "X.XXX.XXXXX.XXX.X",
    "XP...+..+..+...PX",
    "XXXXXXXXXXXXXXXXX",
];

const BETA_LAYOUT: [&str; 13] = [
    "XXXXXXXXXXXXXXXXX",
    "X+...+..+..+...+X",
    "X.XXX.XXXXX.XXX.X",
    "X.XXX.XXXXX.XXX.X",
    "XP...nXXXXXn...PX",
    "X.XXXXXXXXXXXXX.X",
    "n+XXXXXXXXXXXXX+n",
    "X.XXXXXXXXXXXXX.X",
    "XP...+XXXXX+...PX",
    "X.XXX.XXXXX.XXX.X",
    "X.XXX.XXXXX.XXX.X",
    "X+...+..+..+...+X",
    "XXXXXXXXXXXXXXXXX",
];

/// Wall-sprite orientation hints; same shape as the layouts, never read by
/// the simulation.
const ROTATION: [&str; 13] = [
    "00000000000000000",
    "0...............0",
    "0.000.00000.000.0",
    "0.000.00000.000.0",
    "0.....00000.....0",
    "0.0000000000000.0",
    "..0000000000000..",
    "0.0000000000000.0",
    "0.....00000.....0",
    "0.000.00000.000.0",
    "0.000.00000.000.0",
    "0...............0",
    "00000000000000000",
];

static LEVELS: [MazeLevel; 2] = [
    MazeLevel {
        name: "alpha",
        layout: &ALPHA_LAYOUT,
        rotation: &ROTATION,
        player_start: Tile::new(8, 11),
        fruit_tile: Tile::new(8, 1),
        home_offset: Tile::new(6, 4),
        home_connect_left: Tile::new(5, 4),
        home_connect_right: Tile::new(11, 4),
        portal_pairs: &[(Tile::new(0, 6), Tile::new(16, 6))],
        ghost_corners: [
            Tile::new(16, 0),
            Tile::new(0, 0),
            Tile::new(16, 12),
            Tile::new(0, 12),
        ],
        ghost_deny_up: &[Tile::new(5, 11), Tile::new(11, 11)],
    },
    MazeLevel {
        name: "beta",
        layout: &BETA_LAYOUT,
        rotation: &ROTATION,
        player_start: Tile::new(8, 11),
        fruit_tile: Tile::new(8, 1),
        home_offset: Tile::new(6, 4),
        home_connect_left: Tile::new(5, 4),
        home_connect_right: Tile::new(11, 4),
        portal_pairs: &[(Tile::new(0, 6), Tile::new(16, 6))],
        ghost_corners: [
            Tile::new(16, 0),
            Tile::new(0, 0),
            Tile::new(16, 12),
            Tile::new(0, 12),
        ],
        ghost_deny_up: &[Tile::new(5, 11), Tile::new(11, 11)],
    },
];
