use crate::maze::MazeGraph;
use crate::types::{Actor, Direction, Tile, Vec2};

/// Shared movement base for the player and the ghosts: a continuous position
/// sliding along the link between the current node and a target node.
#[derive(Clone, Debug)]
pub struct Agent {
    pub node: usize,
    pub target: usize,
    pub position: Vec2,
    pub direction: Direction,
    pub speed: f32,
    pub visible: bool,
}

impl Agent {
    pub fn new(graph: &MazeGraph, node: usize, speed: f32) -> Self {
        Self {
            node,
            target: node,
            position: graph.node(node).position,
            direction: Direction::None,
            speed,
            visible: true,
        }
    }

    pub fn set_start_node(&mut self, graph: &MazeGraph, node: usize) {
        self.node = node;
        self.target = node;
        self.direction = Direction::None;
        self.position = graph.node(node).position;
    }

    /// Places the agent halfway along the link in `dir`, already moving.
    /// Falls back to resting at the node when no link is open that way.
    pub fn set_between_nodes(&mut self, graph: &MazeGraph, dir: Direction, actor: Actor) {
        let target = graph.target_in_direction(self.node, dir, actor, false);
        if target != self.node {
            self.target = target;
            self.direction = dir;
            let a = graph.node(self.node).position;
            let b = graph.node(target).position;
            self.position = (a + b) * 0.5;
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.position += self.direction.vector() * self.speed * dt;
    }

    /// Travelled at least as far along the link as the target node.
    pub fn overshot_target(&self, graph: &MazeGraph) -> bool {
        let origin = graph.node(self.node).position;
        let span = graph.node(self.target).position - origin;
        let travelled = self.position - origin;
        travelled.magnitude_squared() >= span.magnitude_squared()
    }

    /// Reversal along the traversed link is always legal: swap the endpoints
    /// and flip the direction of travel.
    pub fn reverse(&mut self) {
        if self.direction == Direction::None {
            return;
        }
        self.direction = self.direction.opposite();
        std::mem::swap(&mut self.node, &mut self.target);
    }

    pub fn snap_to_node(&mut self, graph: &MazeGraph) {
        self.position = graph.node(self.node).position;
    }

    /// Promote the target to current on arrival. Portal hops and the next
    /// target are resolved by `complete_move`.
    pub fn arrive(&mut self) {
        self.node = self.target;
    }

    /// Settle the arrival: hop through a portal twin if the node has one,
    /// then route toward `chosen` when that link is open, else keep going
    /// straight, else stop. Position snaps to the (possibly teleported) node.
    pub fn complete_move(
        &mut self,
        graph: &MazeGraph,
        actor: Actor,
        chosen: Direction,
        ignore_access: bool,
    ) {
        if let Some(twin) = graph.node(self.node).portal {
            self.node = twin;
        }
        let target = graph.target_in_direction(self.node, chosen, actor, ignore_access);
        if target != self.node {
            self.target = target;
            self.direction = chosen;
        } else {
            let ahead = graph.target_in_direction(self.node, self.direction, actor, ignore_access);
            self.target = ahead;
            if ahead == self.node {
                self.direction = Direction::None;
            }
        }
        self.snap_to_node(graph);
    }

    pub fn tile(&self, graph: &MazeGraph) -> Tile {
        graph.node(self.node).tile
    }

    pub fn target_tile(&self, graph: &MazeGraph) -> Tile {
        graph.node(self.target).tile
    }

    /// Position lies on the closed segment between current and target node.
    /// Axis-aligned links make this an interval check per coordinate.
    pub fn on_segment(&self, graph: &MazeGraph) -> bool {
        let a = graph.node(self.node).position;
        let b = graph.node(self.target).position;
        let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
        let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
        let eps = 1e-3;
        self.position.x >= min_x - eps
            && self.position.x <= max_x + eps
            && self.position.y >= min_y - eps
            && self.position.y <= max_y + eps
    }
}
