use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};
use crate::types::{Direction, Tile, DIRECTIONS};

pub const OBSERVATION_LEN: usize = 22;

#[derive(Clone, Copy, Debug, Default)]
pub struct GhostObs {
    /// Tile delta from the player to this ghost.
    pub delta: (f32, f32),
    pub frightened: bool,
}

/// Everything a movement policy gets to see, flattened into a fixed-width
/// vector for black-box adapters.
#[derive(Clone, Debug)]
pub struct Observation {
    pub player_tile: Tile,
    pub player_direction: Direction,
    pub cols: f32,
    pub rows: f32,
    /// Tile delta from the player to the nearest remaining pellet.
    pub nearest_pellet_delta: (f32, f32),
    pub ghosts: [GhostObs; 4],
    pub pellets_remaining: f32,
    pub any_frightened: bool,
}

impl Observation {
    pub fn to_vector(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(OBSERVATION_LEN);
        out.push(self.player_tile.col as f32 / self.cols);
        out.push(self.player_tile.row as f32 / self.rows);
        for dir in DIRECTIONS {
            out.push(if self.player_direction == dir { 1.0 } else { 0.0 });
        }
        out.push(self.nearest_pellet_delta.0 / self.cols);
        out.push(self.nearest_pellet_delta.1 / self.rows);
        for ghost in self.ghosts {
            out.push(ghost.delta.0 / self.cols);
            out.push(ghost.delta.1 / self.rows);
            out.push(if ghost.frightened { 1.0 } else { 0.0 });
        }
        out.push(self.pellets_remaining);
        out.push(if self.any_frightened { 1.0 } else { 0.0 });
        out
    }
}

/// The per-tick movement decision contract. The held-input adapter services
/// interactive hosts; policy adapters wrap externally-trained parameters;
/// anything else plugs in as a boxed source.
pub trait DecisionSource {
    fn next_direction(&mut self, observation: &Observation) -> GameResult<Direction>;
}

/// Tagged variant over the known source kinds, so the engine dispatches
/// without a trait object in the common cases.
pub enum PlayerController {
    Held(HeldInput),
    Policy(TablePolicy),
    External(Box<dyn DecisionSource>),
}

impl PlayerController {
    pub fn next_direction(&mut self, observation: &Observation) -> GameResult<Direction> {
        match self {
            Self::Held(input) => Ok(input.held),
            Self::Policy(policy) => Ok(policy.decide(observation)),
            Self::External(source) => source.next_direction(observation),
        }
    }

    /// Routes an interactive direction request to the held-input adapter;
    /// other sources make their own decisions and ignore it.
    pub fn set_held(&mut self, direction: Direction) {
        if let Self::Held(input) = self {
            input.held = direction;
        }
    }
}

/// Mirrors the discrete key-press state an interactive host reads for us.
/// It cannot fail, which is why interactive sessions have no decision-source
/// failure path.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeldInput {
    pub held: Direction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PolicyFile {
    version: u8,
    name: String,
    /// One weight row per direction, `OBSERVATION_LEN` wide.
    weights: Vec<Vec<f32>>,
}

/// Linear scoring policy over the observation vector: one weight row per
/// direction, highest dot product wins. Trained parameter sets load from
/// JSON; the built-in default steers toward pellets and away from ghosts.
#[derive(Clone, Debug)]
pub struct TablePolicy {
    pub name: String,
    weights: [[f32; OBSERVATION_LEN]; 4],
}

impl TablePolicy {
    pub fn decide(&self, observation: &Observation) -> Direction {
        let features = observation.to_vector();
        let mut best = Direction::None;
        let mut best_score = f32::NEG_INFINITY;
        for (row, dir) in DIRECTIONS.iter().enumerate() {
            let score: f32 = self.weights[row]
                .iter()
                .zip(features.iter())
                .map(|(w, f)| w * f)
                .sum();
            if score > best_score {
                best_score = score;
                best = *dir;
            }
        }
        best
    }

    /// Heads for the nearest pellet, with a mild push away from whichever
    /// ghosts are nearby. Good enough to exercise a session end to end.
    pub fn greedy_default() -> Self {
        let mut weights = [[0.0; OBSERVATION_LEN]; 4];
        // Feature indices: 6 = pellet dx, 7 = pellet dy, then per ghost
        // (dx, dy, frightened) starting at 8.
        let (up, down, left, right) = (0, 1, 2, 3);
        weights[up][7] = -4.0;
        weights[down][7] = 4.0;
        weights[left][6] = -4.0;
        weights[right][6] = 4.0;
        for ghost in 0..4 {
            let dx = 8 + ghost * 3;
            let dy = dx + 1;
            weights[up][dy] = 1.0;
            weights[down][dy] = -1.0;
            weights[left][dx] = 1.0;
            weights[right][dx] = -1.0;
        }
        Self {
            name: "greedy-default".to_string(),
            weights,
        }
    }

    /// Loads trained parameters saved by an external optimization run.
    /// Anything absent or malformed is a recoverable `ResourceMissing`.
    pub fn from_file(path: &Path) -> GameResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| GameError::resource_missing(path, err.to_string()))?;
        let file: PolicyFile = serde_json::from_str(&text)
            .map_err(|err| GameError::resource_missing(path, err.to_string()))?;
        if file.weights.len() != 4 {
            return Err(GameError::resource_missing(
                path,
                format!("expected 4 weight rows, found {}", file.weights.len()),
            ));
        }
        let mut weights = [[0.0; OBSERVATION_LEN]; 4];
        for (row, values) in file.weights.iter().enumerate() {
            if values.len() != OBSERVATION_LEN {
                return Err(GameError::resource_missing(
                    path,
                    format!(
                        "weight row {} has {} entries, expected {}",
                        row,
                        values.len(),
                        OBSERVATION_LEN
                    ),
                ));
            }
            weights[row].copy_from_slice(values);
        }
        Ok(Self {
            name: file.name,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> Observation {
        Observation {
            player_tile: Tile::new(4, 2),
            player_direction: Direction::Left,
            cols: 17.0,
            rows: 13.0,
            nearest_pellet_delta: (3.0, 0.0),
            ghosts: [GhostObs::default(); 4],
            pellets_remaining: 0.5,
            any_frightened: false,
        }
    }

    #[test]
    fn observation_vector_has_the_advertised_width() {
        assert_eq!(observation().to_vector().len(), OBSERVATION_LEN);
    }

    #[test]
    fn greedy_default_moves_toward_the_nearest_pellet() {
        let policy = TablePolicy::greedy_default();
        let mut obs = observation();
        obs.nearest_pellet_delta = (5.0, 0.0);
        assert_eq!(policy.decide(&obs), Direction::Right);
        obs.nearest_pellet_delta = (0.0, -5.0);
        assert_eq!(policy.decide(&obs), Direction::Up);
    }

    #[test]
    fn held_input_echoes_the_last_set_direction() {
        let mut controller = PlayerController::Held(HeldInput::default());
        assert_eq!(
            controller.next_direction(&observation()).unwrap(),
            Direction::None
        );
        controller.set_held(Direction::Down);
        assert_eq!(
            controller.next_direction(&observation()).unwrap(),
            Direction::Down
        );
    }

    #[test]
    fn external_source_failures_propagate() {
        struct Broken;
        impl DecisionSource for Broken {
            fn next_direction(&mut self, _observation: &Observation) -> GameResult<Direction> {
                Err(GameError::decision_source("adapter crashed"))
            }
        }
        let mut controller = PlayerController::External(Box::new(Broken));
        let err = controller.next_direction(&observation()).unwrap_err();
        assert!(matches!(err, GameError::DecisionSource { .. }));
    }

    #[test]
    fn missing_policy_file_is_recoverable() {
        let err = TablePolicy::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn malformed_policy_file_is_recoverable() {
        let dir = std::env::temp_dir();
        let path = dir.join("maze-chase-truncated-policy-test.json");
        fs::write(&path, "{\"version\":1,\"name\":\"x\",\"weights\":[[0.5]]}").unwrap();
        let err = TablePolicy::from_file(&path).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("expected 4 weight rows"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn policy_round_trips_through_json() {
        let dir = std::env::temp_dir();
        let path = dir.join("maze-chase-policy-roundtrip-test.json");
        let policy = TablePolicy::greedy_default();
        let file = PolicyFile {
            version: 1,
            name: policy.name.clone(),
            weights: policy.weights.iter().map(|row| row.to_vec()).collect(),
        };
        fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();
        let loaded = TablePolicy::from_file(&path).unwrap();
        assert_eq!(loaded.name, "greedy-default");
        let obs = observation();
        assert_eq!(loaded.decide(&obs), policy.decide(&obs));
        let _ = fs::remove_file(&path);
    }
}
