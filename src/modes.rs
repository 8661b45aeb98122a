use crate::constants::{FINAL_SCATTER_TIME, FRIGHTENED_TIME, HOME_EXIT_DELAY, SCATTER_CHASE_SCHEDULE};
use crate::types::GhostMode;

/// The shared scatter/chase schedule. Phases advance forward only; once the
/// configured table is exhausted the cycle holds at chase for the rest of
/// the level.
#[derive(Clone, Debug)]
pub struct ModeCycle {
    phases: Vec<(GhostMode, Option<f32>)>,
    index: usize,
    timer: f32,
}

impl ModeCycle {
    pub fn new() -> Self {
        let mut phases = Vec::new();
        for (scatter, chase) in SCATTER_CHASE_SCHEDULE {
            phases.push((GhostMode::Scatter, Some(scatter)));
            phases.push((GhostMode::Chase, Some(chase)));
        }
        phases.push((GhostMode::Scatter, Some(FINAL_SCATTER_TIME)));
        phases.push((GhostMode::Chase, None));
        Self {
            phases,
            index: 0,
            timer: 0.0,
        }
    }

    pub fn update(&mut self, dt: f32) {
        let Some(duration) = self.phases[self.index].1 else {
            return;
        };
        self.timer += dt;
        if self.timer >= duration {
            self.timer = 0.0;
            self.index += 1;
        }
    }

    pub fn current(&self) -> GhostMode {
        self.phases[self.index].0
    }

    pub fn phase_index(&self) -> usize {
        self.index
    }
}

impl Default for ModeCycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Emitted when a personal override expires so the owner can restore speed
/// and access state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeTransition {
    FrightenedEnded,
    ExitedHome,
}

/// Per-ghost mode layered over the global cycle. Frightened and the
/// spawn/idle return trip take precedence; while neither is active the
/// ghost simply mirrors whatever the cycle says.
#[derive(Clone, Debug)]
pub struct PersonalMode {
    pub current: GhostMode,
    timer: f32,
}

impl PersonalMode {
    pub fn new(global: GhostMode) -> Self {
        Self {
            current: global,
            timer: 0.0,
        }
    }

    pub fn update(&mut self, dt: f32, global: GhostMode) -> Option<ModeTransition> {
        match self.current {
            GhostMode::Frightened => {
                self.timer += dt;
                if self.timer >= FRIGHTENED_TIME {
                    self.current = global;
                    return Some(ModeTransition::FrightenedEnded);
                }
            }
            GhostMode::Idle => {
                self.timer += dt;
                if self.timer >= HOME_EXIT_DELAY {
                    self.current = global;
                    return Some(ModeTransition::ExitedHome);
                }
            }
            GhostMode::Spawn => {}
            GhostMode::Scatter | GhostMode::Chase => {
                self.current = global;
            }
        }
        None
    }

    /// Returns true only on a fresh entry; a ghost already frightened has
    /// its countdown restarted, and a spawning ghost is unaffected.
    pub fn set_frightened(&mut self) -> bool {
        match self.current {
            GhostMode::Spawn => false,
            GhostMode::Frightened => {
                self.timer = 0.0;
                false
            }
            _ => {
                self.current = GhostMode::Frightened;
                self.timer = 0.0;
                true
            }
        }
    }

    pub fn set_spawn(&mut self) {
        self.current = GhostMode::Spawn;
        self.timer = 0.0;
    }

    pub fn set_idle(&mut self) {
        self.current = GhostMode::Idle;
        self.timer = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_DT;

    fn run(cycle: &mut ModeCycle, secs: f32) {
        let ticks = (secs / TICK_DT).round() as usize;
        for _ in 0..ticks {
            cycle.update(TICK_DT);
        }
    }

    #[test]
    fn cycle_alternates_scatter_and_chase() {
        let mut cycle = ModeCycle::new();
        assert_eq!(cycle.current(), GhostMode::Scatter);
        run(&mut cycle, 7.1);
        assert_eq!(cycle.current(), GhostMode::Chase);
        run(&mut cycle, 20.1);
        assert_eq!(cycle.current(), GhostMode::Scatter);
    }

    #[test]
    fn cycle_is_monotonic_and_exhausts_to_permanent_chase() {
        let mut cycle = ModeCycle::new();
        let mut last_index = 0;
        let total: f32 = SCATTER_CHASE_SCHEDULE
            .iter()
            .map(|(s, c)| s + c)
            .sum::<f32>()
            + FINAL_SCATTER_TIME;
        for _ in 0..((total / TICK_DT) as usize + 120) {
            cycle.update(TICK_DT);
            assert!(cycle.phase_index() >= last_index);
            last_index = cycle.phase_index();
        }
        assert_eq!(cycle.current(), GhostMode::Chase);
        // Exhausted: a long stretch of extra time changes nothing.
        run(&mut cycle, 600.0);
        assert_eq!(cycle.current(), GhostMode::Chase);
        assert_eq!(cycle.phase_index(), last_index);
    }

    #[test]
    fn frightened_preempts_scatter_and_chase_but_not_spawn() {
        let mut scattering = PersonalMode::new(GhostMode::Scatter);
        assert!(scattering.set_frightened());
        assert_eq!(scattering.current, GhostMode::Frightened);

        let mut chasing = PersonalMode::new(GhostMode::Chase);
        assert!(chasing.set_frightened());
        assert_eq!(chasing.current, GhostMode::Frightened);

        let mut spawning = PersonalMode::new(GhostMode::Chase);
        spawning.set_spawn();
        assert!(!spawning.set_frightened());
        assert_eq!(spawning.current, GhostMode::Spawn);
    }

    #[test]
    fn frightened_expiry_reverts_to_the_current_global_phase() {
        let mut mode = PersonalMode::new(GhostMode::Scatter);
        mode.set_frightened();
        // The global cycle moved on to chase while the ghost was frightened.
        let mut transition = None;
        let ticks = (FRIGHTENED_TIME / TICK_DT) as usize + 2;
        for _ in 0..ticks {
            if let Some(t) = mode.update(TICK_DT, GhostMode::Chase) {
                transition = Some(t);
                break;
            }
        }
        assert_eq!(transition, Some(ModeTransition::FrightenedEnded));
        assert_eq!(mode.current, GhostMode::Chase);
    }

    #[test]
    fn refreshing_frightened_restarts_the_countdown() {
        let mut mode = PersonalMode::new(GhostMode::Chase);
        assert!(mode.set_frightened());
        for _ in 0..((FRIGHTENED_TIME / TICK_DT) as usize - 10) {
            assert!(mode.update(TICK_DT, GhostMode::Chase).is_none());
        }
        assert!(!mode.set_frightened());
        // Nearly a full window again before expiry.
        for _ in 0..((FRIGHTENED_TIME / TICK_DT) as usize - 10) {
            assert!(mode.update(TICK_DT, GhostMode::Chase).is_none());
        }
        assert_eq!(mode.current, GhostMode::Frightened);
    }

    #[test]
    fn spawn_holds_until_idle_then_rejoins_the_cycle() {
        let mut mode = PersonalMode::new(GhostMode::Scatter);
        mode.set_spawn();
        for _ in 0..1000 {
            assert!(mode.update(TICK_DT, GhostMode::Chase).is_none());
        }
        assert_eq!(mode.current, GhostMode::Spawn);
        mode.set_idle();
        let mut transition = None;
        for _ in 0..((HOME_EXIT_DELAY / TICK_DT) as usize + 2) {
            if let Some(t) = mode.update(TICK_DT, GhostMode::Chase) {
                transition = Some(t);
                break;
            }
        }
        assert_eq!(transition, Some(ModeTransition::ExitedHome));
        assert_eq!(mode.current, GhostMode::Chase);
    }
}
