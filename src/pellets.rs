use crate::constants::{
    fruit_points, FRUIT_LIFETIME, PELLET_POINTS, PELLET_RADIUS, POWER_PELLET_FLASH_TIME,
    POWER_PELLET_POINTS, POWER_PELLET_RADIUS,
};
use crate::types::{PelletKind, PelletView, Tile, Vec2};

const PELLET_SYMBOLS: [char; 2] = ['.', '+'];
const POWER_PELLET_SYMBOLS: [char; 2] = ['P', 'p'];

#[derive(Clone, Debug)]
pub struct Pellet {
    pub tile: Tile,
    pub position: Vec2,
    pub kind: PelletKind,
    pub points: u32,
    pub visible: bool,
}

impl Pellet {
    pub fn new(tile: Tile, kind: PelletKind) -> Self {
        let points = match kind {
            PelletKind::Pellet => PELLET_POINTS,
            PelletKind::PowerPellet => POWER_PELLET_POINTS,
        };
        Self {
            tile,
            position: tile.position(),
            kind,
            points,
            visible: true,
        }
    }

    pub fn radius(&self) -> f32 {
        match self.kind {
            PelletKind::Pellet => PELLET_RADIUS,
            PelletKind::PowerPellet => POWER_PELLET_RADIUS,
        }
    }
}

/// The level's active consumable set. Pellets leave the set on consumption
/// and only come back on a level rebuild.
#[derive(Clone, Debug)]
pub struct PelletField {
    pub pellets: Vec<Pellet>,
    pub num_eaten: u32,
    total: usize,
    flash_timer: f32,
}

impl PelletField {
    pub fn parse(layout: &[&str]) -> Self {
        let mut pellets = Vec::new();
        for (row, line) in layout.iter().enumerate() {
            for (col, symbol) in line.chars().enumerate() {
                let tile = Tile::new(col as i32, row as i32);
                if PELLET_SYMBOLS.contains(&symbol) {
                    pellets.push(Pellet::new(tile, PelletKind::Pellet));
                } else if POWER_PELLET_SYMBOLS.contains(&symbol) {
                    pellets.push(Pellet::new(tile, PelletKind::PowerPellet));
                }
            }
        }
        let total = pellets.len();
        Self {
            pellets,
            num_eaten: 0,
            total,
            flash_timer: 0.0,
        }
    }

    /// Power pellets blink on a fixed cadence; plain pellets stay lit.
    pub fn update(&mut self, dt: f32) {
        self.flash_timer += dt;
        if self.flash_timer >= POWER_PELLET_FLASH_TIME {
            self.flash_timer -= POWER_PELLET_FLASH_TIME;
            for pellet in &mut self.pellets {
                if pellet.kind == PelletKind::PowerPellet {
                    pellet.visible = !pellet.visible;
                }
            }
        }
    }

    pub fn take(&mut self, index: usize) -> Pellet {
        self.num_eaten += 1;
        self.pellets.remove(index)
    }

    pub fn is_empty(&self) -> bool {
        self.pellets.is_empty()
    }

    pub fn remaining_fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.pellets.len() as f32 / self.total as f32
    }

    pub fn views(&self) -> Vec<PelletView> {
        self.pellets
            .iter()
            .map(|pellet| PelletView {
                tile: pellet.tile,
                kind: pellet.kind,
                points: pellet.points,
                visible: pellet.visible,
            })
            .collect()
    }
}

/// One-shot bonus item: appears at pellet-count thresholds, despawns on a
/// timer if nobody claims it.
#[derive(Clone, Debug)]
pub struct Fruit {
    pub tile: Tile,
    pub position: Vec2,
    pub points: u32,
    timer: f32,
}

impl Fruit {
    pub fn new(tile: Tile, level: usize) -> Self {
        Self {
            tile,
            position: tile.position(),
            points: fruit_points(level),
            timer: 0.0,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.timer += dt;
    }

    pub fn expired(&self) -> bool {
        self.timer >= FRUIT_LIFETIME
    }

    pub fn time_left(&self) -> f32 {
        (FRUIT_LIFETIME - self.timer).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: [&str; 3] = ["P..+", "X.XX", "n-.p"];

    #[test]
    fn parse_collects_pellets_by_symbol() {
        let field = PelletField::parse(&LAYOUT);
        // P . . + . . p carry consumables; n, -, X do not.
        assert_eq!(field.pellets.len(), 7);
        let power: Vec<_> = field
            .pellets
            .iter()
            .filter(|p| p.kind == PelletKind::PowerPellet)
            .collect();
        assert_eq!(power.len(), 2);
        assert_eq!(power[0].tile, Tile::new(0, 0));
        assert_eq!(power[1].tile, Tile::new(3, 2));
    }

    #[test]
    fn take_counts_and_shrinks_the_active_set() {
        let mut field = PelletField::parse(&LAYOUT);
        let before = field.pellets.len();
        let pellet = field.take(0);
        assert_eq!(pellet.points, POWER_PELLET_POINTS);
        assert_eq!(field.pellets.len(), before - 1);
        assert_eq!(field.num_eaten, 1);
        assert!(field.remaining_fraction() < 1.0);
    }

    #[test]
    fn power_pellets_blink_on_the_flash_cadence() {
        let mut field = PelletField::parse(&LAYOUT);
        field.update(POWER_PELLET_FLASH_TIME + 0.01);
        for pellet in &field.pellets {
            match pellet.kind {
                PelletKind::PowerPellet => assert!(!pellet.visible),
                PelletKind::Pellet => assert!(pellet.visible),
            }
        }
    }

    #[test]
    fn fruit_expires_after_its_lifetime() {
        let mut fruit = Fruit::new(Tile::new(2, 2), 1);
        assert_eq!(fruit.points, 120);
        fruit.update(FRUIT_LIFETIME / 2.0);
        assert!(!fruit.expired());
        fruit.update(FRUIT_LIFETIME);
        assert!(fruit.expired());
        assert_eq!(fruit.time_left(), 0.0);
    }
}
