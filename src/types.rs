use serde::Serialize;

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

impl Direction {
    // Action encoding: 0 = up, 1 = down, 2 = left, 3 = right.
    pub const CARDINALS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn from_action(action: usize) -> Option<Self> {
        match action {
            0 => Some(Self::Up),
            1 => Some(Self::Down),
            2 => Some(Self::Left),
            3 => Some(Self::Right),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }

    pub fn step(self, x: i32, y: i32) -> (i32, i32) {
        let (dx, dy) = self.delta();
        (x + dx, y + dy)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Dot,
    Wall,
    Empty,
    PowerPellet,
    Door,
    GhostCell,
}

impl CellType {
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dot),
            1 => Some(Self::Wall),
            2 => Some(Self::Empty),
            3 => Some(Self::PowerPellet),
            4 => Some(Self::Door),
            5 => Some(Self::GhostCell),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostType {
    Blinky,
    Pinky,
    Clyde,
    Inky,
}

impl GhostType {
    pub fn value(self) -> u8 {
        match self {
            Self::Blinky => 0,
            Self::Pinky => 1,
            Self::Clyde => 2,
            Self::Inky => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostState {
    Frightened,
    Scatter,
    Chase,
}

impl GhostState {
    pub fn value(self) -> u8 {
        match self {
            Self::Frightened => 0,
            Self::Scatter => 1,
            Self::Chase => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    GridExact,
    GridOrProximity,
}

impl CollisionPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "grid" => Some(Self::GridExact),
            "proximity" => Some(Self::GridOrProximity),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Collectible {
    pub x: i32,
    pub y: i32,
    pub kind: CellType,
}

#[derive(Clone, Copy, Debug)]
pub struct GhostSnapshot {
    pub x: i32,
    pub y: i32,
    pub ghost_type: GhostType,
}

/// Read-only view of the board handed to each ghost while it decides a move.
#[derive(Clone, Debug)]
pub struct GameStateView {
    pub pacman: Vec2,
    pub ghosts: Vec<GhostSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PacmanInfo {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostInfo {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub ghost_type: GhostType,
    pub state: GhostState,
}

#[derive(Clone, Debug, Serialize)]
pub struct StepInfo {
    pub pacman: PacmanInfo,
    pub ghosts: Vec<GhostInfo>,
    pub timestamp: u64,
    pub game_over: bool,
    pub score: i32,
    pub lives: i32,
}

pub fn manhattan(x1: i32, y1: i32, x2: i32, y2: i32) -> i32 {
    (x1 - x2).abs() + (y1 - y2).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_encoding_matches_cardinal_order() {
        for (action, expected) in Direction::CARDINALS.iter().enumerate() {
            assert_eq!(Direction::from_action(action), Some(*expected));
        }
        assert_eq!(Direction::from_action(4), None);
    }

    #[test]
    fn cell_type_round_trips_from_map_values() {
        assert_eq!(CellType::from_value(0), Some(CellType::Dot));
        assert_eq!(CellType::from_value(3), Some(CellType::PowerPellet));
        assert_eq!(CellType::from_value(5), Some(CellType::GhostCell));
        assert_eq!(CellType::from_value(6), None);
    }

    #[test]
    fn ghost_enum_values_are_stable() {
        assert_eq!(GhostType::Blinky.value(), 0);
        assert_eq!(GhostType::Pinky.value(), 1);
        assert_eq!(GhostType::Clyde.value(), 2);
        assert_eq!(GhostType::Inky.value(), 3);
        assert_eq!(GhostState::Frightened.value(), 0);
        assert_eq!(GhostState::Scatter.value(), 1);
        assert_eq!(GhostState::Chase.value(), 2);
    }

    #[test]
    fn manhattan_is_symmetric() {
        assert_eq!(manhattan(1, 2, 4, 6), 7);
        assert_eq!(manhattan(4, 6, 1, 2), 7);
        assert_eq!(manhattan(3, 3, 3, 3), 0);
    }
}
