use crate::agent::Agent;
use crate::constants::{
    AMBUSH_LOOKAHEAD_TILES, FLANK_RANGE_TILES, GHOST_BASE_POINTS, GHOST_FRIGHTENED_SPEED,
    GHOST_SPAWN_SPEED, GHOST_SPEED, SKITTISH_RANGE_TILES, TILE_SIZE,
};
use crate::error::{GameError, GameResult};
use crate::maze::MazeGraph;
use crate::mazedata::MazeLevel;
use crate::modes::{ModeCycle, ModeTransition, PersonalMode};
use crate::rng::Rng;
use crate::types::{Actor, Direction, GhostMode, GhostType, GhostView, Vec2, GHOST_TYPES};

/// What the targeting rules are allowed to see of the player.
#[derive(Clone, Copy, Debug)]
pub struct PlayerSight {
    pub position: Vec2,
    pub direction: Direction,
}

#[derive(Clone, Debug)]
pub struct Ghost {
    pub ghost_type: GhostType,
    pub agent: Agent,
    pub mode: PersonalMode,
    pub start_node: usize,
    pub corner: Vec2,
    pub points: u32,
}

/// The four pursuer identities as data-parameterized instances of one
/// strategy: an identity-keyed corner/offset table, not four behaviors.
#[derive(Clone, Debug)]
pub struct GhostSquad {
    pub ghosts: Vec<Ghost>,
    spawn_node: usize,
    spawn_position: Vec2,
    home_door: usize,
    door_position: Vec2,
    /// Interior home junctions, door excluded. A ghost standing on one of
    /// these heads for the door before resuming its real goal, so corner
    /// assignments below the maze cannot strand it inside.
    home_nodes: Vec<usize>,
}

impl GhostSquad {
    pub fn new(graph: &MazeGraph, level: &MazeLevel, cycle: &ModeCycle) -> GameResult<Self> {
        let spawn_node = graph.node_at(level.spawn_tile()).ok_or_else(|| {
            GameError::invalid_maze("ghost spawn tile is not a junction")
        })?;
        let home_door = graph.node_at(level.door_tile()).ok_or_else(|| {
            GameError::invalid_maze("home door tile is not a junction")
        })?;
        let mut ghosts = Vec::with_capacity(GHOST_TYPES.len());
        for ghost_type in GHOST_TYPES {
            let start_tile = level.ghost_start(ghost_type);
            let start_node = graph.node_at(start_tile).ok_or_else(|| {
                GameError::invalid_maze(format!(
                    "ghost start ({}, {}) is not a junction",
                    start_tile.col, start_tile.row
                ))
            })?;
            ghosts.push(Ghost {
                ghost_type,
                agent: Agent::new(graph, start_node, GHOST_SPEED),
                mode: PersonalMode::new(cycle.current()),
                start_node,
                corner: level.corner(ghost_type).position(),
                points: GHOST_BASE_POINTS,
            });
        }
        let mut home_nodes = Vec::new();
        for drow in 0..5 {
            for dcol in 0..5 {
                let tile = level.home_offset.offset(dcol, drow);
                if tile == level.door_tile() {
                    continue;
                }
                if let Some(id) = graph.node_at(tile) {
                    home_nodes.push(id);
                }
            }
        }
        Ok(Self {
            ghosts,
            spawn_node,
            spawn_position: graph.node(spawn_node).position,
            home_door,
            door_position: graph.node(home_door).position,
            home_nodes,
        })
    }

    pub fn update(
        &mut self,
        dt: f32,
        graph: &mut MazeGraph,
        cycle: &ModeCycle,
        player: &PlayerSight,
        rng: &mut Rng,
    ) {
        let global = cycle.current();
        let chaser_position = self.ghosts[GhostType::Chaser.index()].agent.position;
        for i in 0..self.ghosts.len() {
            let ghost_type = self.ghosts[i].ghost_type;
            match self.ghosts[i].mode.update(dt, global) {
                Some(ModeTransition::FrightenedEnded) => {
                    self.ghosts[i].agent.speed = GHOST_SPEED;
                }
                Some(ModeTransition::ExitedHome) => {
                    self.ghosts[i].agent.speed = GHOST_SPEED;
                    graph.deny_access(self.home_door, Direction::Down, Actor::Ghost(ghost_type));
                }
                None => {}
            }

            self.ghosts[i].agent.advance(dt);
            if !self.ghosts[i].agent.overshot_target(graph) {
                continue;
            }
            self.ghosts[i].agent.arrive();
            if self.ghosts[i].mode.current == GhostMode::Spawn
                && self.ghosts[i].agent.node == self.spawn_node
            {
                self.ghosts[i].mode.set_idle();
                self.ghosts[i].agent.speed = GHOST_SPEED;
            }

            let mode = self.ghosts[i].mode.current;
            let actor = Actor::Ghost(ghost_type);
            let spawn_bypass = mode == GhostMode::Spawn;
            let dirs = graph.valid_directions(
                self.ghosts[i].agent.node,
                self.ghosts[i].agent.direction,
                actor,
                spawn_bypass,
            );
            let chosen = if dirs.is_empty() {
                Direction::None
            } else if mode == GhostMode::Frightened {
                dirs[rng.pick_index(dirs.len())]
            } else {
                let goal = self.goal_for(i, mode, player, chaser_position);
                best_direction(graph, self.ghosts[i].agent.node, &dirs, goal)
            };
            self.ghosts[i].agent.complete_move(graph, actor, chosen, spawn_bypass);
        }
    }

    fn goal_for(
        &self,
        index: usize,
        mode: GhostMode,
        player: &PlayerSight,
        chaser_position: Vec2,
    ) -> Vec2 {
        let ghost = &self.ghosts[index];
        match mode {
            GhostMode::Spawn | GhostMode::Idle => self.spawn_position,
            GhostMode::Scatter | GhostMode::Chase
                if self.home_nodes.contains(&ghost.agent.node) =>
            {
                self.door_position
            }
            GhostMode::Scatter => ghost.corner,
            _ => chase_goal(ghost, player, chaser_position),
        }
    }

    /// Power-pellet broadcast. Spawning ghosts are unaffected; everyone else
    /// flips to frightened, reversing once on a fresh entry. The scoring
    /// chain restarts with every broadcast.
    pub fn start_frightened(&mut self) {
        self.reset_points();
        for ghost in &mut self.ghosts {
            if ghost.mode.set_frightened() {
                ghost.agent.speed = GHOST_FRIGHTENED_SPEED;
                ghost.agent.reverse();
            }
        }
    }

    /// One-way trip home at elevated speed, ignoring normal access rules.
    pub fn start_spawn(&mut self, index: usize, graph: &mut MazeGraph) {
        let ghost = &mut self.ghosts[index];
        ghost.mode.set_spawn();
        ghost.agent.speed = GHOST_SPAWN_SPEED;
        graph.allow_access(self.home_door, Direction::Down, Actor::Ghost(ghost.ghost_type));
    }

    pub fn update_points(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.points *= 2;
        }
    }

    pub fn reset_points(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.points = GHOST_BASE_POINTS;
        }
    }

    pub fn hide(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.agent.visible = false;
        }
    }

    pub fn show(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.agent.visible = true;
        }
    }

    pub fn any_frightened(&self) -> bool {
        self.ghosts
            .iter()
            .any(|ghost| ghost.mode.current == GhostMode::Frightened)
    }

    /// Back to start nodes and the current global phase. Gate unlocks follow
    /// the pellet counter, which persists across a level reset, so access
    /// masks are not touched here except the home door.
    pub fn reset(&mut self, graph: &mut MazeGraph, cycle: &ModeCycle) {
        for ghost in &mut self.ghosts {
            let start = ghost.start_node;
            ghost.agent.set_start_node(graph, start);
            ghost.agent.speed = GHOST_SPEED;
            ghost.agent.visible = true;
            ghost.mode = PersonalMode::new(cycle.current());
            ghost.points = GHOST_BASE_POINTS;
            graph.deny_access(self.home_door, Direction::Down, Actor::Ghost(ghost.ghost_type));
        }
    }

    pub fn views(&self, graph: &MazeGraph) -> Vec<GhostView> {
        self.ghosts
            .iter()
            .map(|ghost| GhostView {
                ghost_type: ghost.ghost_type,
                tile: ghost.agent.tile(graph),
                target_tile: ghost.agent.target_tile(graph),
                position: ghost.agent.position,
                direction: ghost.agent.direction,
                mode: ghost.mode.current,
                visible: ghost.agent.visible,
                points: ghost.points,
            })
            .collect()
    }
}

/// Identity-specific chase goals; the shared routing below does the rest.
pub(crate) fn chase_goal(ghost: &Ghost, player: &PlayerSight, chaser_position: Vec2) -> Vec2 {
    match ghost.ghost_type {
        GhostType::Chaser => player.position,
        GhostType::Ambusher => {
            player.position + player.direction.vector() * (TILE_SIZE * AMBUSH_LOOKAHEAD_TILES)
        }
        GhostType::Flanker => {
            let range = TILE_SIZE * FLANK_RANGE_TILES;
            if ghost.agent.position.distance_squared(chaser_position) <= range * range {
                player.position
            } else {
                ghost.corner
            }
        }
        GhostType::Skittish => {
            let range = TILE_SIZE * SKITTISH_RANGE_TILES;
            if ghost.agent.position.distance_squared(player.position) > range * range {
                player.position
            } else {
                ghost.corner
            }
        }
    }
}

/// Among the open candidates, the direction whose resulting node lies
/// closest to the goal; earlier candidates win exact ties.
fn best_direction(graph: &MazeGraph, node: usize, dirs: &[Direction], goal: Vec2) -> Direction {
    let mut best = dirs[0];
    let mut best_distance = f32::INFINITY;
    for &dir in dirs {
        let Some(next) = graph.neighbor(node, dir) else {
            continue;
        };
        let distance = graph.node(next).position.distance_squared(goal);
        if distance < best_distance {
            best_distance = distance;
            best = dir;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_DT;
    use crate::mazedata;
    use crate::types::Tile;

    fn setup() -> (MazeGraph, ModeCycle, GhostSquad) {
        let level = mazedata::level(0);
        let graph = MazeGraph::from_level(level).unwrap();
        let cycle = ModeCycle::new();
        let squad = GhostSquad::new(&graph, level, &cycle).unwrap();
        (graph, cycle, squad)
    }

    fn sight(position: Vec2, direction: Direction) -> PlayerSight {
        PlayerSight {
            position,
            direction,
        }
    }

    #[test]
    fn chaser_targets_the_player_directly() {
        let (_, _, squad) = setup();
        let player = sight(Vec2::new(64.0, 32.0), Direction::Left);
        let ghost = &squad.ghosts[GhostType::Chaser.index()];
        assert_eq!(chase_goal(ghost, &player, Vec2::default()), player.position);
    }

    #[test]
    fn ambusher_leads_the_player_by_four_tiles() {
        let (_, _, squad) = setup();
        let player = sight(Vec2::new(64.0, 32.0), Direction::Left);
        let ghost = &squad.ghosts[GhostType::Ambusher.index()];
        let goal = chase_goal(ghost, &player, Vec2::default());
        assert_eq!(goal, Vec2::new(64.0 - 4.0 * TILE_SIZE, 32.0));
    }

    #[test]
    fn flanker_mirrors_the_chaser_only_when_close_to_it() {
        let (_, _, squad) = setup();
        let player = sight(Vec2::new(64.0, 32.0), Direction::Up);
        let flanker = &squad.ghosts[GhostType::Flanker.index()];
        let near = flanker.agent.position + Vec2::new(TILE_SIZE, 0.0);
        assert_eq!(chase_goal(flanker, &player, near), player.position);

        let far = flanker.agent.position + Vec2::new(100.0 * TILE_SIZE, 0.0);
        assert_eq!(chase_goal(flanker, &player, far), flanker.corner);
    }

    #[test]
    fn skittish_retreats_to_its_corner_when_the_player_is_close() {
        let (_, _, squad) = setup();
        let ghost = &squad.ghosts[GhostType::Skittish.index()];
        let near = sight(ghost.agent.position + Vec2::new(TILE_SIZE, 0.0), Direction::Left);
        assert_eq!(chase_goal(ghost, &near, Vec2::default()), ghost.corner);

        let far = sight(
            ghost.agent.position + Vec2::new(50.0 * TILE_SIZE, 0.0),
            Direction::Left,
        );
        assert_eq!(chase_goal(ghost, &far, Vec2::default()), far.position);
    }

    #[test]
    fn frightened_entry_reverses_exactly_once() {
        let (graph, _, mut squad) = setup();
        let chaser = GhostType::Chaser.index();
        // Put the chaser mid-link heading right along the top corridor.
        let from = graph.node_at(Tile::new(1, 1)).unwrap();
        let to = graph.node_at(Tile::new(5, 1)).unwrap();
        squad.ghosts[chaser].agent.node = from;
        squad.ghosts[chaser].agent.target = to;
        squad.ghosts[chaser].agent.direction = Direction::Right;
        squad.ghosts[chaser].agent.position = Vec2::new(3.0 * TILE_SIZE, TILE_SIZE);

        squad.start_frightened();
        assert_eq!(squad.ghosts[chaser].agent.direction, Direction::Left);
        assert_eq!(squad.ghosts[chaser].agent.node, to);
        assert_eq!(squad.ghosts[chaser].agent.target, from);
        assert_eq!(squad.ghosts[chaser].agent.speed, GHOST_FRIGHTENED_SPEED);

        // A second broadcast refreshes the timer without a second reversal.
        squad.start_frightened();
        assert_eq!(squad.ghosts[chaser].agent.direction, Direction::Left);
        assert_eq!(squad.ghosts[chaser].agent.node, to);
    }

    #[test]
    fn spawn_trip_ends_in_idle_then_rejoins_the_cycle() {
        let (mut graph, cycle, mut squad) = setup();
        let chaser = GhostType::Chaser.index();
        let door = graph.node_at(mazedata::level(0).door_tile()).unwrap();

        // Eaten somewhere in the maze; park it on the door for a short trip.
        squad.start_spawn(chaser, &mut graph);
        squad.ghosts[chaser].agent.set_start_node(&graph, door);
        assert_eq!(squad.ghosts[chaser].agent.speed, GHOST_SPAWN_SPEED);

        let player = sight(Vec2::new(8.0 * TILE_SIZE, 11.0 * TILE_SIZE), Direction::Left);
        let mut rng = Rng::new(1);
        let mut reached_idle = false;
        for _ in 0..((3.0 / TICK_DT) as usize) {
            squad.update(TICK_DT, &mut graph, &cycle, &player, &mut rng);
            if squad.ghosts[chaser].mode.current == GhostMode::Idle {
                reached_idle = true;
            }
        }
        assert!(reached_idle, "spawn trip never reached idle");
        // Idle expired long ago; the ghost follows the global phase again at
        // normal speed and the door is sealed behind it.
        assert_eq!(squad.ghosts[chaser].mode.current, cycle.current());
        assert_eq!(squad.ghosts[chaser].agent.speed, GHOST_SPEED);
        assert!(!graph.is_accessible(door, Direction::Down, Actor::Ghost(GhostType::Chaser)));
    }

    #[test]
    fn point_chain_doubles_per_catch_and_resets_on_broadcast() {
        let (_, _, mut squad) = setup();
        squad.start_frightened();
        assert!(squad.ghosts.iter().all(|g| g.points == GHOST_BASE_POINTS));
        squad.update_points();
        squad.update_points();
        assert!(squad.ghosts.iter().all(|g| g.points == GHOST_BASE_POINTS * 4));
        squad.start_frightened();
        assert!(squad.ghosts.iter().all(|g| g.points == GHOST_BASE_POINTS));
    }

    #[test]
    fn best_direction_prefers_earlier_candidates_on_ties() {
        let layout = ["X+X", "+++", "X+X"];
        let graph = MazeGraph::parse(&layout).unwrap();
        let center = graph.node_at(Tile::new(1, 1)).unwrap();
        let dirs = graph.valid_directions(center, Direction::None, Actor::Player, false);
        assert_eq!(dirs.len(), 4);
        // All four neighbors are equidistant from the center itself.
        let goal = graph.node(center).position;
        assert_eq!(best_direction(&graph, center, &dirs, goal), Direction::Up);
    }

    #[test]
    fn squad_reset_returns_everyone_home_in_phase() {
        let (mut graph, cycle, mut squad) = setup();
        let chaser = GhostType::Chaser.index();
        squad.start_frightened();
        squad.hide();
        squad.update_points();
        let roam = graph.node_at(Tile::new(1, 1)).unwrap();
        squad.ghosts[chaser].agent.set_start_node(&graph, roam);

        squad.reset(&mut graph, &cycle);
        for ghost in &squad.ghosts {
            assert_eq!(ghost.agent.node, ghost.start_node);
            assert_eq!(ghost.mode.current, cycle.current());
            assert_eq!(ghost.points, GHOST_BASE_POINTS);
            assert!(ghost.agent.visible);
            assert_eq!(ghost.agent.speed, GHOST_SPEED);
        }
    }
}
