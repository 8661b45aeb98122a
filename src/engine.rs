use std::collections::VecDeque;

use crate::agent::Agent;
use crate::constants::{
    AMBUSHER_UNLOCK_PELLETS, BACKGROUND_FLASH_TIME, CAPTURE_PAUSE_TIME, FLANKER_UNLOCK_PELLETS,
    FRUIT_COLLIDE_RADIUS, FRUIT_PELLET_THRESHOLDS, GHOST_COLLIDE_RADIUS, GHOST_EATEN_PAUSE_TIME,
    PLAYER_COLLIDE_RADIUS, PLAYER_SPEED, STARTING_LIVES,
};
use crate::decision::{GhostObs, Observation, PlayerController};
use crate::error::{GameError, GameResult};
use crate::ghosts::{GhostSquad, PlayerSight};
use crate::maze::{validate_alignment, MazeGraph};
use crate::mazedata::{self, MazeLevel};
use crate::modes::ModeCycle;
use crate::pellets::{Fruit, PelletField};
use crate::rng::Rng;
use crate::types::{
    Actor, ControlEvent, Direction, FruitView, GhostMode, GhostType, MessageKey, PelletKind,
    PlayerView, RuntimeEvent, ScheduledAction, SessionOutcome, SessionResult, Snapshot, WorldInit,
    GHOST_TYPES,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    /// Driven by a human host; control events are honored and nothing limits
    /// the session length.
    Interactive,
    /// Driven by a policy under a hard step ceiling; control events are
    /// suppressed and the session reports a result when it ends.
    Automated { step_limit: u64 },
}

#[derive(Clone, Copy, Debug)]
pub struct GameEngineOptions {
    pub mode: SessionMode,
    pub start_level: usize,
    pub starting_lives: i32,
    pub seed: u32,
}

impl Default for GameEngineOptions {
    fn default() -> Self {
        Self {
            mode: SessionMode::Interactive,
            start_level: 0,
            starting_lives: STARTING_LIVES,
            seed: 0,
        }
    }
}

/// Timed pause with an explicit scheduled action instead of a stored
/// callback. The action fires exactly once, when the timer expires.
#[derive(Clone, Debug)]
struct PauseState {
    paused: bool,
    timer: f32,
    pause_time: Option<f32>,
    action: Option<ScheduledAction>,
}

impl PauseState {
    fn new(paused: bool) -> Self {
        Self {
            paused,
            timer: 0.0,
            pause_time: None,
            action: None,
        }
    }

    fn schedule(&mut self, secs: f32, action: ScheduledAction) {
        self.paused = true;
        self.timer = 0.0;
        self.pause_time = Some(secs);
        self.action = Some(action);
    }

    fn update(&mut self, dt: f32) -> Option<ScheduledAction> {
        let limit = self.pause_time?;
        self.timer += dt;
        if self.timer < limit {
            return None;
        }
        self.timer = 0.0;
        self.pause_time = None;
        self.paused = false;
        self.action.take()
    }
}

#[derive(Clone, Debug)]
struct PlayerInternal {
    agent: Agent,
    alive: bool,
    start_node: usize,
}

/// Everything a level rebuild produces in one go.
struct LoadedLevel {
    data: &'static MazeLevel,
    graph: MazeGraph,
    pellets: PelletField,
    player: PlayerInternal,
    ghosts: GhostSquad,
    cycle: ModeCycle,
    ambusher_gate: (usize, Direction),
    flanker_gate: (usize, Direction),
}

/// Fixed-tick simulation controller. One call to `step` fully resolves a
/// tick — timers, movement, collisions, pause expiry, queued control — in
/// that order, before any snapshot is taken.
pub struct GameEngine {
    mode: SessionMode,
    start_level: usize,
    starting_lives: i32,

    level: usize,
    score: u32,
    lives: i32,

    data: &'static MazeLevel,
    graph: MazeGraph,
    pellets: PelletField,
    fruit: Option<Fruit>,
    player: PlayerInternal,
    controller: PlayerController,
    ghosts: GhostSquad,
    cycle: ModeCycle,
    ambusher_gate: (usize, Direction),
    flanker_gate: (usize, Direction),

    pause: PauseState,
    message: Option<MessageKey>,
    flash_enabled: bool,
    flash_on: bool,
    flash_timer: f32,

    control_queue: VecDeque<ControlEvent>,
    events: Vec<RuntimeEvent>,
    rng: Rng,
    tick: u64,
    ended: bool,
    outcome: Option<SessionOutcome>,
}

impl GameEngine {
    pub fn new(options: GameEngineOptions, controller: PlayerController) -> GameResult<Self> {
        let loaded = load_level(options.start_level)?;
        let interactive = options.mode == SessionMode::Interactive;
        Ok(Self {
            mode: options.mode,
            start_level: options.start_level,
            starting_lives: options.starting_lives,
            level: options.start_level,
            score: 0,
            lives: options.starting_lives,
            data: loaded.data,
            graph: loaded.graph,
            pellets: loaded.pellets,
            fruit: None,
            player: loaded.player,
            controller,
            ghosts: loaded.ghosts,
            cycle: loaded.cycle,
            ambusher_gate: loaded.ambusher_gate,
            flanker_gate: loaded.flanker_gate,
            pause: PauseState::new(interactive),
            message: interactive.then_some(MessageKey::Ready),
            flash_enabled: false,
            flash_on: false,
            flash_timer: 0.0,
            control_queue: VecDeque::new(),
            events: Vec::new(),
            rng: Rng::new(options.seed),
            tick: 0,
            ended: false,
            outcome: None,
        })
    }

    pub fn push_control(&mut self, event: ControlEvent) {
        self.control_queue.push_back(event);
    }

    pub fn step(&mut self, dt: f32) -> GameResult<()> {
        if self.ended {
            return Ok(());
        }
        self.tick += 1;

        self.pellets.update(dt);
        self.update_flash(dt);

        if !self.pause.paused {
            self.cycle.update(dt);
            let sight = PlayerSight {
                position: self.player.agent.position,
                direction: self.player.agent.direction,
            };
            self.ghosts
                .update(dt, &mut self.graph, &self.cycle, &sight, &mut self.rng);
            if let Some(fruit) = &mut self.fruit {
                fruit.update(dt);
            }
            self.check_pellet_events();
            self.check_ghost_events();
            self.check_fruit_events();
        }

        if self.player.alive && !self.pause.paused {
            self.update_player(dt)?;
        }

        if let Some(action) = self.pause.update(dt) {
            self.resolve_action(action)?;
        }

        self.process_control_events();

        if let SessionMode::Automated { step_limit } = self.mode {
            if !self.ended && self.tick >= step_limit {
                self.ended = true;
                self.outcome = Some(SessionOutcome::Truncated);
            }
        }
        Ok(())
    }

    fn update_player(&mut self, dt: f32) -> GameResult<()> {
        let observation = self.build_observation();
        let requested = self.controller.next_direction(&observation)?;
        let agent = &mut self.player.agent;
        agent.advance(dt);
        if agent.overshot_target(&self.graph) {
            agent.arrive();
            agent.complete_move(&self.graph, Actor::Player, requested, false);
        } else if requested != Direction::None && requested == agent.direction.opposite() {
            agent.reverse();
        }
        Ok(())
    }

    fn check_pellet_events(&mut self) {
        let position = self.player.agent.position;
        let hit = self.pellets.pellets.iter().position(|pellet| {
            let reach = pellet.radius() + PLAYER_COLLIDE_RADIUS;
            pellet.position.distance_squared(position) <= reach * reach
        });
        let Some(index) = hit else {
            return;
        };
        let pellet = self.pellets.take(index);
        self.score += pellet.points;
        self.events.push(RuntimeEvent::PelletEaten {
            tile: pellet.tile,
            kind: pellet.kind,
            points: pellet.points,
        });

        if self.pellets.num_eaten == AMBUSHER_UNLOCK_PELLETS {
            let (node, dir) = self.ambusher_gate;
            self.graph
                .allow_access(node, dir, Actor::Ghost(GhostType::Ambusher));
            self.events.push(RuntimeEvent::HomeExitOpened {
                ghost: GhostType::Ambusher,
            });
        }
        if self.pellets.num_eaten == FLANKER_UNLOCK_PELLETS {
            let (node, dir) = self.flanker_gate;
            self.graph
                .allow_access(node, dir, Actor::Ghost(GhostType::Flanker));
            self.events.push(RuntimeEvent::HomeExitOpened {
                ghost: GhostType::Flanker,
            });
        }

        if pellet.kind == PelletKind::PowerPellet {
            self.ghosts.start_frightened();
        }

        if self.pellets.is_empty() {
            self.flash_enabled = true;
            self.events.push(RuntimeEvent::LevelCleared { level: self.level });
            // Both modes mark the session ended; an interactive host exits
            // on seeing it, the automated harness records a win.
            self.ended = true;
            self.outcome = Some(SessionOutcome::Win);
        }
    }

    fn check_ghost_events(&mut self) {
        if self.ended {
            return;
        }
        let reach = PLAYER_COLLIDE_RADIUS + GHOST_COLLIDE_RADIUS;
        for index in 0..self.ghosts.ghosts.len() {
            let distance = self.ghosts.ghosts[index]
                .agent
                .position
                .distance_squared(self.player.agent.position);
            if distance > reach * reach {
                continue;
            }
            match self.ghosts.ghosts[index].mode.current {
                GhostMode::Frightened => {
                    let ghost_type = self.ghosts.ghosts[index].ghost_type;
                    let points = self.ghosts.ghosts[index].points;
                    self.player.agent.visible = false;
                    self.ghosts.ghosts[index].agent.visible = false;
                    self.score += points;
                    self.events.push(RuntimeEvent::GhostEaten {
                        ghost: ghost_type,
                        points,
                    });
                    self.ghosts.update_points();
                    self.pause
                        .schedule(GHOST_EATEN_PAUSE_TIME, ScheduledAction::ResumeShowEntities);
                    self.ghosts.start_spawn(index, &mut self.graph);
                }
                // Pass-through on the way home; no interaction either way.
                GhostMode::Spawn | GhostMode::Idle => {}
                GhostMode::Scatter | GhostMode::Chase => {
                    if !self.player.alive {
                        continue;
                    }
                    self.lives -= 1;
                    self.events.push(RuntimeEvent::PlayerCaptured {
                        lives_left: self.lives,
                    });
                    self.player.alive = false;
                    self.player.agent.direction = Direction::None;
                    self.ghosts.hide();
                    if self.lives <= 0 {
                        self.message = Some(MessageKey::GameOver);
                        self.events.push(RuntimeEvent::GameOver);
                        match self.mode {
                            SessionMode::Automated { .. } => {
                                self.ended = true;
                                self.outcome = Some(SessionOutcome::Loss);
                            }
                            SessionMode::Interactive => {
                                self.pause
                                    .schedule(CAPTURE_PAUSE_TIME, ScheduledAction::Restart);
                            }
                        }
                    } else {
                        self.pause
                            .schedule(CAPTURE_PAUSE_TIME, ScheduledAction::ResetLevel);
                    }
                }
            }
        }
    }

    fn check_fruit_events(&mut self) {
        if self.ended {
            return;
        }
        if FRUIT_PELLET_THRESHOLDS.contains(&self.pellets.num_eaten) && self.fruit.is_none() {
            let fruit = Fruit::new(self.data.fruit_tile, self.level);
            self.events.push(RuntimeEvent::FruitSpawned { tile: fruit.tile });
            self.fruit = Some(fruit);
        }
        let Some(fruit) = &self.fruit else {
            return;
        };
        let reach = PLAYER_COLLIDE_RADIUS + FRUIT_COLLIDE_RADIUS;
        if fruit.position.distance_squared(self.player.agent.position) <= reach * reach {
            self.score += fruit.points;
            self.events.push(RuntimeEvent::FruitTaken {
                points: fruit.points,
            });
            self.fruit = None;
        } else if fruit.expired() {
            self.events.push(RuntimeEvent::FruitExpired);
            self.fruit = None;
        }
    }

    fn resolve_action(&mut self, action: ScheduledAction) -> GameResult<()> {
        match action {
            ScheduledAction::ResumeShowEntities => self.show_entities(),
            ScheduledAction::Restart => self.restart()?,
            ScheduledAction::ResetLevel => self.reset_level(),
            ScheduledAction::AdvanceLevel => self.advance_level()?,
        }
        Ok(())
    }

    fn process_control_events(&mut self) {
        while let Some(event) = self.control_queue.pop_front() {
            if matches!(self.mode, SessionMode::Automated { .. }) {
                continue;
            }
            match event {
                ControlEvent::SetDirection(direction) => self.controller.set_held(direction),
                ControlEvent::TogglePause => {
                    if !self.player.alive || self.ended || self.pause.pause_time.is_some() {
                        continue;
                    }
                    self.pause.paused = !self.pause.paused;
                    if self.pause.paused {
                        self.message = Some(MessageKey::Paused);
                    } else {
                        self.message = None;
                        self.show_entities();
                    }
                }
            }
        }
    }

    fn show_entities(&mut self) {
        self.player.agent.visible = true;
        self.ghosts.show();
    }

    fn reset_level(&mut self) {
        let start = self.player.start_node;
        self.player.agent.set_start_node(&self.graph, start);
        self.player
            .agent
            .set_between_nodes(&self.graph, Direction::Left, Actor::Player);
        self.player.agent.speed = PLAYER_SPEED;
        self.player.agent.visible = true;
        self.player.alive = true;
        self.cycle = ModeCycle::new();
        self.ghosts.reset(&mut self.graph, &self.cycle);
        self.fruit = None;
        self.apply_session_idle_state();
        self.events.push(RuntimeEvent::LevelReset);
    }

    fn restart(&mut self) -> GameResult<()> {
        self.level = self.start_level;
        self.score = 0;
        self.lives = self.starting_lives;
        self.load_current_level()?;
        self.apply_session_idle_state();
        self.events.push(RuntimeEvent::GameRestarted);
        Ok(())
    }

    /// Reachable through `schedule_pause` for hosts that opt into level
    /// progression; the default flows end the session at level clear.
    fn advance_level(&mut self) -> GameResult<()> {
        self.level += 1;
        self.load_current_level()?;
        self.apply_session_idle_state();
        self.events.push(RuntimeEvent::LevelAdvanced { level: self.level });
        Ok(())
    }

    fn load_current_level(&mut self) -> GameResult<()> {
        let loaded = load_level(self.level)?;
        self.data = loaded.data;
        self.graph = loaded.graph;
        self.pellets = loaded.pellets;
        self.player = loaded.player;
        self.ghosts = loaded.ghosts;
        self.cycle = loaded.cycle;
        self.ambusher_gate = loaded.ambusher_gate;
        self.flanker_gate = loaded.flanker_gate;
        self.fruit = None;
        self.flash_enabled = false;
        self.flash_on = false;
        self.flash_timer = 0.0;
        Ok(())
    }

    /// Interactive sessions wait paused for a resume; automated ones keep
    /// running, since nobody is there to press anything.
    fn apply_session_idle_state(&mut self) {
        match self.mode {
            SessionMode::Interactive => {
                self.pause.paused = true;
                self.message = Some(MessageKey::Ready);
            }
            SessionMode::Automated { .. } => {
                self.pause.paused = false;
                self.message = None;
            }
        }
    }

    fn update_flash(&mut self, dt: f32) {
        if !self.flash_enabled {
            return;
        }
        self.flash_timer += dt;
        if self.flash_timer >= BACKGROUND_FLASH_TIME {
            self.flash_timer -= BACKGROUND_FLASH_TIME;
            self.flash_on = !self.flash_on;
        }
    }

    fn build_observation(&self) -> Observation {
        let player_tile = self.player.agent.tile(&self.graph);
        let nearest = self
            .pellets
            .pellets
            .iter()
            .min_by(|a, b| {
                let da = a.position.distance_squared(self.player.agent.position);
                let db = b.position.distance_squared(self.player.agent.position);
                da.total_cmp(&db)
            })
            .map(|pellet| {
                (
                    (pellet.tile.col - player_tile.col) as f32,
                    (pellet.tile.row - player_tile.row) as f32,
                )
            })
            .unwrap_or((0.0, 0.0));
        let mut ghosts = [GhostObs::default(); 4];
        for (slot, ghost) in ghosts.iter_mut().zip(self.ghosts.ghosts.iter()) {
            let tile = ghost.agent.tile(&self.graph);
            *slot = GhostObs {
                delta: (
                    (tile.col - player_tile.col) as f32,
                    (tile.row - player_tile.row) as f32,
                ),
                frightened: ghost.mode.current == GhostMode::Frightened,
            };
        }
        Observation {
            player_tile,
            player_direction: self.player.agent.direction,
            cols: self.data.cols() as f32,
            rows: self.data.rows() as f32,
            nearest_pellet_delta: nearest,
            ghosts,
            pellets_remaining: self.pellets.remaining_fraction(),
            any_frightened: self.ghosts.any_frightened(),
        }
    }

    /// Schedules a timed pause resolving to `action`, the mechanism behind
    /// the delayed reset/restart choreography.
    pub fn schedule_pause(&mut self, secs: f32, action: ScheduledAction) {
        self.pause.schedule(secs, action);
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_paused(&self) -> bool {
        self.pause.paused
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn pellets_eaten(&self) -> u32 {
        self.pellets.num_eaten
    }

    pub fn result(&self) -> SessionResult {
        SessionResult {
            score: self.score,
            outcome: self.outcome.unwrap_or(SessionOutcome::Truncated),
            level: self.level,
            ticks: self.tick,
        }
    }

    pub fn world_init(&self) -> WorldInit {
        WorldInit {
            level: self.level,
            name: self.data.name.to_string(),
            rows: self.data.rows(),
            cols: self.data.cols(),
            layout: self.data.layout.iter().map(|line| line.to_string()).collect(),
            rotation: self.data.rotation.iter().map(|line| line.to_string()).collect(),
        }
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let player = PlayerView {
            tile: self.player.agent.tile(&self.graph),
            target_tile: self.player.agent.target_tile(&self.graph),
            position: self.player.agent.position,
            direction: self.player.agent.direction,
            alive: self.player.alive,
            visible: self.player.agent.visible,
        };
        let snapshot = Snapshot {
            tick: self.tick,
            score: self.score,
            lives: self.lives,
            level: self.level,
            paused: self.pause.paused,
            player,
            ghosts: self.ghosts.views(&self.graph),
            pellets: self.pellets.views(),
            fruit: self.fruit.as_ref().map(|fruit| FruitView {
                tile: fruit.tile,
                points: fruit.points,
                time_left: fruit.time_left(),
            }),
            pellets_eaten: self.pellets.num_eaten,
            message: self.message,
            background_flash: self.flash_on,
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        };
        snapshot
    }
}

fn load_level(index: usize) -> GameResult<LoadedLevel> {
    let data = mazedata::level(index);
    validate_alignment(data.layout, data.rotation)?;
    let mut graph = MazeGraph::from_level(data)?;

    let start_node = graph.node_at(data.player_start).ok_or_else(|| {
        GameError::invalid_maze(format!(
            "player start ({}, {}) is not a junction",
            data.player_start.col, data.player_start.row
        ))
    })?;
    graph.validate_reachable(start_node)?;

    let door = graph
        .node_at(data.door_tile())
        .ok_or_else(|| GameError::invalid_maze("home door tile is not a junction"))?;
    graph.deny_access(door, Direction::Down, Actor::Player);
    for ghost_type in GHOST_TYPES {
        graph.deny_access(door, Direction::Down, Actor::Ghost(ghost_type));
    }

    let ambusher_node = graph
        .node_at(data.ghost_start(GhostType::Ambusher))
        .ok_or_else(|| GameError::invalid_maze("ambusher start is not a junction"))?;
    let flanker_node = graph
        .node_at(data.ghost_start(GhostType::Flanker))
        .ok_or_else(|| GameError::invalid_maze("flanker start is not a junction"))?;
    let ambusher_gate = (ambusher_node, Direction::Right);
    let flanker_gate = (flanker_node, Direction::Left);
    graph.deny_access(ambusher_node, Direction::Right, Actor::Ghost(GhostType::Ambusher));
    graph.deny_access(flanker_node, Direction::Left, Actor::Ghost(GhostType::Flanker));

    for tile in data.ghost_deny_up {
        let node = graph.node_at(*tile).ok_or_else(|| {
            GameError::invalid_maze(format!(
                "upward-turn restriction ({}, {}) is not a junction",
                tile.col, tile.row
            ))
        })?;
        for ghost_type in GHOST_TYPES {
            graph.deny_access(node, Direction::Up, Actor::Ghost(ghost_type));
        }
    }

    let cycle = ModeCycle::new();
    let ghosts = GhostSquad::new(&graph, data, &cycle)?;
    let mut agent = Agent::new(&graph, start_node, PLAYER_SPEED);
    agent.set_between_nodes(&graph, Direction::Left, Actor::Player);
    let player = PlayerInternal {
        agent,
        alive: true,
        start_node,
    };
    let pellets = PelletField::parse(data.layout);

    Ok(LoadedLevel {
        data,
        graph,
        pellets,
        player,
        ghosts,
        cycle,
        ambusher_gate,
        flanker_gate,
    })
}
