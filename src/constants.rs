pub const TICK_MS: u64 = 225;

pub const PACMAN_MOVE_INTERVAL_MS: f32 = 225.0;
pub const TELEPORT_EXTRA_DELAY_MS: u64 = 250;

pub const GHOST_BASE_INTERVAL_FACTOR: f32 = 1.3;
pub const GHOST_FRIGHTENED_SLOWDOWN: f32 = 0.8;
pub const GHOST_MIN_INTERVAL_FACTOR: f32 = 1.15;
pub const GHOST_SPEED_RAMP_STEP_MS: u64 = 10_000;
pub const GHOST_SPEED_RAMP_RATE: f32 = 0.05;
pub const GHOST_SPEED_RAMP_CAP: f32 = 0.15;

pub const FRIGHTENED_DURATION_MS: u64 = 7_000;
pub const SCATTER_CHASE_CYCLE_MS: [u64; 8] = [
    7_000,
    20_000,
    7_000,
    20_000,
    5_000,
    20_000,
    5_000,
    u64::MAX,
];

pub const DOT_SCORE: i32 = 10;
pub const POWER_PELLET_SCORE: i32 = 50;
pub const GHOST_STREAK_BASE: i32 = 200;

pub const TERMINAL_STEP_REWARD: f32 = -250.0;
pub const STALL_PENALTY: f32 = 25.0;
pub const NO_PROGRESS_PENALTY: f32 = 10.0;
pub const LEVEL_CLEAR_BONUS: f32 = 250.0;
pub const CHASE_PROXIMITY_RADIUS: i32 = 3;
pub const CHASE_PROXIMITY_PENALTY: f32 = 10.0;
pub const FRIGHTENED_PROXIMITY_RADIUS: i32 = 8;
pub const FRIGHTENED_PROXIMITY_BONUS: f32 = 3.0;

pub const MAX_EPISODE_STEPS: u32 = 10_000;
pub const ACTION_HISTORY_LEN: usize = 8;

pub const PROXIMITY_COLLISION_RADIUS: f32 = 0.5;
pub const DISPLAY_LERP_RATE: f32 = 0.5;

pub const OBSERVATION_LEN: usize = 76;

// 0 = dot, 1 = wall, 2 = empty, 3 = power pellet, 4 = door, 5 = ghost cell.
#[rustfmt::skip]
pub const DEFAULT_MAP: [[u8; 19]; 21] = [
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 3, 1, 1, 0, 1, 1, 1, 0, 1, 0, 1, 1, 1, 0, 1, 1, 3, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0, 1, 0, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1],
    [1, 1, 1, 1, 0, 1, 1, 1, 0, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1],
    [1, 1, 1, 1, 0, 1, 2, 2, 2, 2, 2, 2, 2, 1, 0, 1, 1, 1, 1],
    [1, 1, 1, 1, 0, 2, 1, 1, 1, 4, 1, 1, 1, 2, 0, 1, 1, 1, 1],
    [2, 2, 2, 2, 0, 2, 1, 1, 5, 5, 5, 1, 1, 2, 0, 2, 2, 2, 2],
    [1, 1, 1, 1, 0, 2, 1, 1, 1, 1, 1, 1, 1, 2, 0, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0, 1, 0, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 0, 1, 1, 1, 0, 1, 0, 1, 1, 1, 0, 1, 1, 0, 1],
    [1, 3, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 3, 1],
    [1, 0, 1, 1, 0, 1, 1, 1, 0, 1, 0, 1, 1, 1, 0, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0, 1, 0, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
];
