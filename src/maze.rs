use std::collections::{BTreeMap, VecDeque};

use crate::error::{GameError, GameResult};
use crate::mazedata::MazeLevel;
use crate::types::{Actor, Direction, Tile, Vec2, ALL_ACTORS_MASK, DIRECTIONS};

pub const NODE_SYMBOLS: [char; 3] = ['+', 'P', 'n'];
pub const PATH_SYMBOLS: [char; 4] = ['.', '-', '|', 'p'];
pub const WALL_SYMBOL: char = 'X';

/// Ghost-home sub-grid, stitched into the maze at each level's home offset.
/// The door sits on the top row and is wired sideways into the maze proper.
const HOME_LAYOUT: [&str; 5] = ["XX+XX", "XX.XX", "+X.X+", "+.+.+", "+XXX+"];

pub const HOME_DOOR_OFFSET: (i32, i32) = (2, 0);
pub const HOME_CENTER_OFFSET: (i32, i32) = (2, 3);
pub const HOME_LEFT_OFFSET: (i32, i32) = (0, 3);
pub const HOME_RIGHT_OFFSET: (i32, i32) = (4, 3);

fn dir_index(dir: Direction) -> usize {
    match dir {
        Direction::Up => 0,
        Direction::Down => 1,
        Direction::Left => 2,
        Direction::Right => 3,
        Direction::None => unreachable!("no link slot for a stopped direction"),
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub tile: Tile,
    pub position: Vec2,
    neighbors: [Option<usize>; 4],
    access: [u8; 4],
    pub portal: Option<usize>,
}

impl Node {
    fn new(tile: Tile) -> Self {
        Self {
            tile,
            position: tile.position(),
            neighbors: [None; 4],
            access: [ALL_ACTORS_MASK; 4],
            portal: None,
        }
    }
}

/// Arena-allocated maze graph. Nodes are addressed by stable index; links are
/// per-direction optional indices, so the cyclic node/neighbor structure
/// needs no shared ownership.
#[derive(Clone, Debug)]
pub struct MazeGraph {
    nodes: Vec<Node>,
    lut: BTreeMap<Tile, usize>,
}

impl MazeGraph {
    /// Builds the full graph for one level: parse the layout grid, stitch in
    /// the home block, wire the door, and link the portal pairs.
    pub fn from_level(level: &MazeLevel) -> GameResult<Self> {
        let mut graph = Self::parse(level.layout)?;
        let door = graph.attach_home(level.home_offset)?;
        graph.connect_door(door, level.home_connect_left, Direction::Left)?;
        graph.connect_door(door, level.home_connect_right, Direction::Right)?;
        for (a, b) in level.portal_pairs {
            graph.set_portal_pair(*a, *b)?;
        }
        Ok(graph)
    }

    /// Parses a topology grid into nodes and links. Junction symbols become
    /// nodes; runs of path symbols between two junctions on the same row or
    /// column become a pair of symmetric links.
    pub fn parse(layout: &[&str]) -> GameResult<Self> {
        validate_grid(layout)?;
        let mut graph = Self {
            nodes: Vec::new(),
            lut: BTreeMap::new(),
        };
        graph.add_nodes(layout, Tile::new(0, 0))?;
        graph.connect_horizontally(layout, Tile::new(0, 0));
        graph.connect_vertically(layout, Tile::new(0, 0));
        if graph.nodes.is_empty() {
            return Err(GameError::invalid_maze("layout contains no junction symbols"));
        }
        Ok(graph)
    }

    fn add_nodes(&mut self, grid: &[&str], offset: Tile) -> GameResult<()> {
        for (row, line) in grid.iter().enumerate() {
            for (col, symbol) in line.chars().enumerate() {
                if !NODE_SYMBOLS.contains(&symbol) {
                    continue;
                }
                let tile = offset.offset(col as i32, row as i32);
                if self.lut.contains_key(&tile) {
                    return Err(GameError::invalid_maze(format!(
                        "duplicate junction at ({}, {})",
                        tile.col, tile.row
                    )));
                }
                let id = self.nodes.len();
                self.nodes.push(Node::new(tile));
                self.lut.insert(tile, id);
            }
        }
        Ok(())
    }

    fn connect_horizontally(&mut self, grid: &[&str], offset: Tile) {
        for (row, line) in grid.iter().enumerate() {
            let mut key: Option<usize> = None;
            for (col, symbol) in line.chars().enumerate() {
                if NODE_SYMBOLS.contains(&symbol) {
                    let tile = offset.offset(col as i32, row as i32);
                    let here = self.lut[&tile];
                    if let Some(prev) = key {
                        self.link(prev, here, Direction::Right);
                    }
                    key = Some(here);
                } else if !PATH_SYMBOLS.contains(&symbol) {
                    key = None;
                }
            }
        }
    }

    fn connect_vertically(&mut self, grid: &[&str], offset: Tile) {
        let cols = grid.first().map(|line| line.len()).unwrap_or(0);
        for col in 0..cols {
            let mut key: Option<usize> = None;
            for (row, line) in grid.iter().enumerate() {
                let symbol = line.as_bytes()[col] as char;
                if NODE_SYMBOLS.contains(&symbol) {
                    let tile = offset.offset(col as i32, row as i32);
                    let here = self.lut[&tile];
                    if let Some(prev) = key {
                        self.link(prev, here, Direction::Down);
                    }
                    key = Some(here);
                } else if !PATH_SYMBOLS.contains(&symbol) {
                    key = None;
                }
            }
        }
    }

    fn link(&mut self, from: usize, to: usize, dir: Direction) {
        self.nodes[from].neighbors[dir_index(dir)] = Some(to);
        self.nodes[to].neighbors[dir_index(dir.opposite())] = Some(from);
    }

    fn attach_home(&mut self, offset: Tile) -> GameResult<usize> {
        self.add_nodes(&HOME_LAYOUT, offset)?;
        self.connect_horizontally(&HOME_LAYOUT, offset);
        self.connect_vertically(&HOME_LAYOUT, offset);
        self.node_at(offset.offset(HOME_DOOR_OFFSET.0, HOME_DOOR_OFFSET.1))
            .ok_or_else(|| GameError::invalid_maze("home block has no door junction"))
    }

    fn connect_door(&mut self, door: usize, to: Tile, dir: Direction) -> GameResult<()> {
        let other = self.node_at(to).ok_or_else(|| {
            GameError::invalid_maze(format!(
                "home door connection ({}, {}) is not a junction",
                to.col, to.row
            ))
        })?;
        self.link(door, other, dir);
        Ok(())
    }

    pub fn set_portal_pair(&mut self, a: Tile, b: Tile) -> GameResult<()> {
        let id_a = self
            .node_at(a)
            .ok_or_else(|| GameError::invalid_maze(format!("portal ({}, {}) is not a junction", a.col, a.row)))?;
        let id_b = self
            .node_at(b)
            .ok_or_else(|| GameError::invalid_maze(format!("portal ({}, {}) is not a junction", b.col, b.row)))?;
        self.nodes[id_a].portal = Some(id_b);
        self.nodes[id_b].portal = Some(id_a);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn node_at(&self, tile: Tile) -> Option<usize> {
        self.lut.get(&tile).copied()
    }

    pub fn neighbor(&self, id: usize, dir: Direction) -> Option<usize> {
        if dir == Direction::None {
            return None;
        }
        self.nodes[id].neighbors[dir_index(dir)]
    }

    /// A link exists and its access bit for this actor is set.
    pub fn is_accessible(&self, id: usize, dir: Direction, actor: Actor) -> bool {
        if dir == Direction::None {
            return false;
        }
        self.nodes[id].neighbors[dir_index(dir)].is_some()
            && self.nodes[id].access[dir_index(dir)] & actor.bit() != 0
    }

    pub fn deny_access(&mut self, id: usize, dir: Direction, actor: Actor) {
        self.nodes[id].access[dir_index(dir)] &= !actor.bit();
    }

    pub fn allow_access(&mut self, id: usize, dir: Direction, actor: Actor) {
        self.nodes[id].access[dir_index(dir)] |= actor.bit();
    }

    fn link_open(&self, id: usize, dir: Direction, actor: Actor, ignore_access: bool) -> bool {
        if ignore_access {
            dir != Direction::None && self.neighbor(id, dir).is_some()
        } else {
            self.is_accessible(id, dir, actor)
        }
    }

    /// The node reached by moving from `id` in `dir`, or `id` itself when the
    /// move is not open to this actor. Callers treat "same node back" as
    /// "cannot move that way".
    pub fn target_in_direction(
        &self,
        id: usize,
        dir: Direction,
        actor: Actor,
        ignore_access: bool,
    ) -> usize {
        if dir != Direction::None && self.link_open(id, dir, actor, ignore_access) {
            self.nodes[id].neighbors[dir_index(dir)].unwrap_or(id)
        } else {
            id
        }
    }

    /// Candidate directions at a node, excluding the reverse of travel.
    /// When nothing else is open the reverse alone is offered, provided the
    /// traversed link exists to go back through.
    pub fn valid_directions(
        &self,
        id: usize,
        current: Direction,
        actor: Actor,
        ignore_access: bool,
    ) -> Vec<Direction> {
        let mut dirs = Vec::new();
        for dir in DIRECTIONS {
            if dir == current.opposite() && current != Direction::None {
                continue;
            }
            if self.link_open(id, dir, actor, ignore_access) {
                dirs.push(dir);
            }
        }
        if dirs.is_empty() {
            let back = current.opposite();
            if back != Direction::None && self.neighbor(id, back).is_some() {
                dirs.push(back);
            }
        }
        dirs
    }

    /// Every node must be reachable from the start over raw links and
    /// portals; access masks are a gameplay layer, not topology.
    pub fn validate_reachable(&self, start: usize) -> GameResult<()> {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        while let Some(id) = queue.pop_front() {
            let node = &self.nodes[id];
            let links = node.neighbors.iter().flatten().chain(node.portal.iter());
            for &next in links {
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        if let Some(unreached) = seen.iter().position(|reached| !reached) {
            let tile = self.nodes[unreached].tile;
            return Err(GameError::invalid_maze(format!(
                "junction ({}, {}) unreachable from the start node",
                tile.col, tile.row
            )));
        }
        Ok(())
    }
}

fn validate_grid(layout: &[&str]) -> GameResult<()> {
    if layout.is_empty() {
        return Err(GameError::invalid_maze("layout grid is empty"));
    }
    let cols = layout[0].len();
    for (row, line) in layout.iter().enumerate() {
        if line.len() != cols {
            return Err(GameError::invalid_maze(format!(
                "row {} has {} columns, expected {}",
                row,
                line.len(),
                cols
            )));
        }
        for (col, symbol) in line.chars().enumerate() {
            let known = symbol == WALL_SYMBOL
                || NODE_SYMBOLS.contains(&symbol)
                || PATH_SYMBOLS.contains(&symbol);
            if !known {
                return Err(GameError::invalid_maze(format!(
                    "unknown symbol '{}' at ({}, {})",
                    symbol, col, row
                )));
            }
        }
    }
    Ok(())
}

/// Layout and rotation grids must describe the same shape.
pub fn validate_alignment(layout: &[&str], rotation: &[&str]) -> GameResult<()> {
    if layout.len() != rotation.len() {
        return Err(GameError::invalid_maze(format!(
            "rotation grid has {} rows, layout has {}",
            rotation.len(),
            layout.len()
        )));
    }
    for (row, (a, b)) in layout.iter().zip(rotation.iter()).enumerate() {
        if a.len() != b.len() {
            return Err(GameError::invalid_maze(format!(
                "rotation row {} has {} columns, layout has {}",
                row,
                b.len(),
                a.len()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GhostType;

    const SMALL: [&str; 3] = ["+..+.+", "|XXXX|", "+....+"];

    fn small_graph() -> MazeGraph {
        MazeGraph::parse(&SMALL).expect("small layout parses")
    }

    #[test]
    fn parse_finds_junctions_and_links_symmetrically() {
        let graph = small_graph();
        assert_eq!(graph.len(), 5);
        let a = graph.node_at(Tile::new(0, 0)).unwrap();
        let b = graph.node_at(Tile::new(3, 0)).unwrap();
        assert_eq!(graph.neighbor(a, Direction::Right), Some(b));
        assert_eq!(graph.neighbor(b, Direction::Left), Some(a));
        let c = graph.node_at(Tile::new(0, 2)).unwrap();
        assert_eq!(graph.neighbor(a, Direction::Down), Some(c));
        assert_eq!(graph.neighbor(c, Direction::Up), Some(a));
    }

    #[test]
    fn missing_link_is_absent_not_an_error() {
        let graph = small_graph();
        let a = graph.node_at(Tile::new(0, 0)).unwrap();
        assert_eq!(graph.neighbor(a, Direction::Up), None);
        assert_eq!(graph.neighbor(a, Direction::Left), None);
        assert_eq!(graph.neighbor(a, Direction::None), None);
    }

    #[test]
    fn deny_and_allow_access_are_per_actor() {
        let mut graph = small_graph();
        let a = graph.node_at(Tile::new(0, 0)).unwrap();
        let ghost = Actor::Ghost(GhostType::Ambusher);
        assert!(graph.is_accessible(a, Direction::Right, ghost));
        graph.deny_access(a, Direction::Right, ghost);
        assert!(!graph.is_accessible(a, Direction::Right, ghost));
        assert!(graph.is_accessible(a, Direction::Right, Actor::Player));
        assert!(graph.is_accessible(a, Direction::Right, Actor::Ghost(GhostType::Chaser)));
        graph.allow_access(a, Direction::Right, ghost);
        assert!(graph.is_accessible(a, Direction::Right, ghost));
    }

    #[test]
    fn denied_direction_targets_the_same_node_back() {
        let mut graph = small_graph();
        let a = graph.node_at(Tile::new(0, 0)).unwrap();
        graph.deny_access(a, Direction::Right, Actor::Player);
        assert_eq!(graph.target_in_direction(a, Direction::Right, Actor::Player, false), a);
        assert_ne!(graph.target_in_direction(a, Direction::Right, Actor::Player, true), a);
    }

    #[test]
    fn valid_directions_exclude_reverse_until_dead_end() {
        let graph = small_graph();
        // (5, 0) is a dead end from the right: only Down links out besides
        // the Left link we came in on.
        let corner = graph.node_at(Tile::new(5, 0)).unwrap();
        let dirs = graph.valid_directions(corner, Direction::Right, Actor::Player, false);
        assert_eq!(dirs, vec![Direction::Down]);

        let mut sealed = small_graph();
        sealed.deny_access(corner, Direction::Down, Actor::Player);
        let dirs = sealed.valid_directions(corner, Direction::Right, Actor::Player, false);
        assert_eq!(dirs, vec![Direction::Left]);
    }

    #[test]
    fn spawn_bypass_ignores_access_masks() {
        let mut graph = small_graph();
        let a = graph.node_at(Tile::new(0, 0)).unwrap();
        let ghost = Actor::Ghost(GhostType::Chaser);
        graph.deny_access(a, Direction::Right, ghost);
        graph.deny_access(a, Direction::Down, ghost);
        assert!(graph.valid_directions(a, Direction::None, ghost, false).is_empty());
        let dirs = graph.valid_directions(a, Direction::None, ghost, true);
        assert_eq!(dirs, vec![Direction::Down, Direction::Right]);
    }

    #[test]
    fn portal_pair_links_both_ways() {
        let mut graph = small_graph();
        let left = Tile::new(0, 0);
        let right = Tile::new(5, 0);
        graph.set_portal_pair(left, right).unwrap();
        let a = graph.node_at(left).unwrap();
        let b = graph.node_at(right).unwrap();
        assert_eq!(graph.node(a).portal, Some(b));
        assert_eq!(graph.node(b).portal, Some(a));
    }

    #[test]
    fn ragged_grid_is_rejected() {
        let err = MazeGraph::parse(&["+..+", "+.+"]).unwrap_err();
        assert!(err.to_string().contains("columns"));
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let err = MazeGraph::parse(&["+.?+"]).unwrap_err();
        assert!(err.to_string().contains('?'));
    }

    #[test]
    fn unreachable_junction_is_rejected() {
        let graph = MazeGraph::parse(&["+.+X+.+"]).unwrap();
        let start = graph.node_at(Tile::new(0, 0)).unwrap();
        let err = graph.validate_reachable(start).unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn rotation_alignment_is_validated() {
        assert!(validate_alignment(&["+.+", "+.+"], &["000", "000"]).is_ok());
        assert!(validate_alignment(&["+.+"], &["0000"]).is_err());
        assert!(validate_alignment(&["+.+", "+.+"], &["000"]).is_err());
    }
}
