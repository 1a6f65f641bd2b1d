use crate::constants::{DISPLAY_LERP_RATE, PACMAN_MOVE_INTERVAL_MS, TELEPORT_EXTRA_DELAY_MS};
use crate::map::GameMap;
use crate::types::Direction;

#[derive(Clone, Debug)]
pub struct Pacman {
    pub x: i32,
    pub y: i32,
    pub display_x: f32,
    pub display_y: f32,
    pub direction: Direction,
    pub next_direction: Direction,
    pub last_move_time: u64,
    pub frozen: bool,
}

impl Pacman {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            display_x: x as f32,
            display_y: y as f32,
            direction: Direction::None,
            next_direction: Direction::None,
            last_move_time: 0,
            frozen: false,
        }
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.next_direction = direction;
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
        self.direction = Direction::None;
        self.next_direction = Direction::None;
    }

    pub fn advance(&mut self, now: u64, map: &GameMap) -> bool {
        if self.frozen {
            return false;
        }
        self.settle_display();
        if (now.saturating_sub(self.last_move_time) as f32) < PACMAN_MOVE_INTERVAL_MS {
            return false;
        }

        if self.next_direction != Direction::None {
            let (bx, by) = self.next_direction.step(self.x, self.y);
            if map.is_walkable(bx, by, false) {
                self.direction = self.next_direction;
            } else if self.try_teleport(now, map) {
                return true;
            }
        }

        let (nx, ny) = self.direction.step(self.x, self.y);
        if self.direction != Direction::None && map.is_walkable(nx, ny, false) {
            self.x = nx;
            self.y = ny;
            self.last_move_time = now;
            return true;
        }

        false
    }

    fn try_teleport(&mut self, now: u64, map: &GameMap) -> bool {
        let Some((point_a, point_b)) = map.teleport_pair() else {
            return false;
        };
        let target = if self.x == point_a.x && self.y == point_a.y {
            point_b
        } else if self.x == point_b.x && self.y == point_b.y {
            point_a
        } else {
            return false;
        };
        self.x = target.x;
        self.y = target.y;
        self.display_x = target.x as f32;
        self.display_y = target.y as f32;
        self.last_move_time = now + TELEPORT_EXTRA_DELAY_MS;
        true
    }

    fn settle_display(&mut self) {
        self.display_x += (self.x as f32 - self.display_x) * DISPLAY_LERP_RATE;
        self.display_y += (self.y as f32 - self.display_y) * DISPLAY_LERP_RATE;
    }
}
