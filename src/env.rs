use crate::constants::{
    ACTION_HISTORY_LEN, CHASE_PROXIMITY_PENALTY, CHASE_PROXIMITY_RADIUS, DEFAULT_MAP, DOT_SCORE,
    FRIGHTENED_PROXIMITY_BONUS, FRIGHTENED_PROXIMITY_RADIUS, GHOST_STREAK_BASE, LEVEL_CLEAR_BONUS,
    MAX_EPISODE_STEPS, NO_PROGRESS_PENALTY, OBSERVATION_LEN, POWER_PELLET_SCORE,
    PROXIMITY_COLLISION_RADIUS, STALL_PENALTY, TERMINAL_STEP_REWARD, TICK_MS,
};
use crate::ghost::Ghost;
use crate::map::{GameMap, MapError};
use crate::pacman::Pacman;
use crate::rng::Rng;
use crate::types::{
    manhattan, CellType, CollisionPolicy, Collectible, Direction, GameStateView, GhostInfo,
    GhostSnapshot, GhostState, GhostType, PacmanInfo, StepInfo, Vec2,
};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("spawn cell ({x}, {y}) is not walkable")]
    UnwalkableSpawn { x: i32, y: i32 },
    #[error("map has no dots or power pellets")]
    NoCollectibles,
}

#[derive(Clone, Debug)]
pub struct GhostSpawn {
    pub ghost_type: GhostType,
    pub spawn: Vec2,
    pub respawn: Vec2,
}

#[derive(Clone, Debug)]
pub struct EnvOptions {
    pub map_rows: Vec<Vec<u8>>,
    pub pacman_spawn: Vec2,
    pub ghost_spawns: Vec<GhostSpawn>,
    pub lives: i32,
    pub collision_policy: CollisionPolicy,
    pub max_episode_steps: u32,
    pub seed: u32,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            map_rows: DEFAULT_MAP.iter().map(|row| row.to_vec()).collect(),
            pacman_spawn: Vec2 { x: 9, y: 15 },
            ghost_spawns: vec![
                GhostSpawn {
                    ghost_type: GhostType::Blinky,
                    spawn: Vec2 { x: 9, y: 8 },
                    respawn: Vec2 { x: 9, y: 9 },
                },
                GhostSpawn {
                    ghost_type: GhostType::Clyde,
                    spawn: Vec2 { x: 8, y: 9 },
                    respawn: Vec2 { x: 8, y: 9 },
                },
                GhostSpawn {
                    ghost_type: GhostType::Inky,
                    spawn: Vec2 { x: 10, y: 9 },
                    respawn: Vec2 { x: 10, y: 9 },
                },
                GhostSpawn {
                    ghost_type: GhostType::Pinky,
                    spawn: Vec2 { x: 9, y: 9 },
                    respawn: Vec2 { x: 9, y: 9 },
                },
            ],
            lives: 1,
            collision_policy: CollisionPolicy::GridExact,
            max_episode_steps: MAX_EPISODE_STEPS,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StepOutcome {
    pub observation: Vec<f32>,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

pub struct PacmanEnv {
    options: EnvOptions,
    base_map: GameMap,
    map: GameMap,
    pacman: Pacman,
    ghosts: Vec<Ghost>,
    dots: Vec<Collectible>,
    total_initial_dots: usize,
    score: i32,
    lives: i32,
    ghost_streak: i32,
    current_time: u64,
    steps: u32,
    game_over: bool,
    prev_pacman_pos: Vec2,
    action_history: VecDeque<usize>,
    rng: Rng,
}

impl PacmanEnv {
    pub fn new(options: EnvOptions) -> Result<Self, EnvError> {
        let base_map = GameMap::from_rows(&options.map_rows)?;
        if !base_map.is_walkable(options.pacman_spawn.x, options.pacman_spawn.y, false) {
            return Err(EnvError::UnwalkableSpawn {
                x: options.pacman_spawn.x,
                y: options.pacman_spawn.y,
            });
        }
        for spawn in &options.ghost_spawns {
            if !base_map.is_walkable(spawn.spawn.x, spawn.spawn.y, true) {
                return Err(EnvError::UnwalkableSpawn {
                    x: spawn.spawn.x,
                    y: spawn.spawn.y,
                });
            }
        }

        let map = base_map.clone();
        let dots = map.collectibles();
        if dots.is_empty() {
            return Err(EnvError::NoCollectibles);
        }
        let total_initial_dots = dots.len();
        let pacman = Pacman::new(options.pacman_spawn.x, options.pacman_spawn.y);
        let ghosts = spawn_ghosts(&options, &map);
        let seed = options.seed;
        let lives = options.lives.max(1);
        let prev_pacman_pos = options.pacman_spawn;

        Ok(Self {
            options,
            base_map,
            map,
            pacman,
            ghosts,
            dots,
            total_initial_dots,
            score: 0,
            lives,
            ghost_streak: GHOST_STREAK_BASE,
            current_time: 0,
            steps: 0,
            game_over: false,
            prev_pacman_pos,
            action_history: VecDeque::with_capacity(ACTION_HISTORY_LEN),
            rng: Rng::new(seed),
        })
    }

    /// Passing a seed reseeds the RNG; `None` keeps the current stream.
    pub fn reset(&mut self, seed: Option<u32>) -> (Vec<f32>, StepInfo) {
        if let Some(seed) = seed {
            self.rng = Rng::new(seed);
        }
        self.map = self.base_map.clone();
        self.dots = self.map.collectibles();
        self.total_initial_dots = self.dots.len();
        self.pacman = Pacman::new(self.options.pacman_spawn.x, self.options.pacman_spawn.y);
        self.ghosts = spawn_ghosts(&self.options, &self.map);
        self.score = 0;
        self.lives = self.options.lives.max(1);
        self.ghost_streak = GHOST_STREAK_BASE;
        self.current_time = 0;
        self.steps = 0;
        self.game_over = false;
        self.prev_pacman_pos = self.options.pacman_spawn;
        self.action_history.clear();
        (self.observation(), self.info())
    }

    pub fn step(&mut self, action: usize) -> StepOutcome {
        if self.game_over {
            return StepOutcome {
                observation: self.observation(),
                reward: TERMINAL_STEP_REWARD,
                terminated: true,
                truncated: false,
                info: self.info(),
            };
        }

        let old_score = self.score;
        self.prev_pacman_pos = Vec2 {
            x: self.pacman.x,
            y: self.pacman.y,
        };

        self.action_history.push_back(action);
        if self.action_history.len() > ACTION_HISTORY_LEN {
            self.action_history.pop_front();
        }
        if let Some(direction) = Direction::from_action(action) {
            self.pacman.set_direction(direction);
        }

        self.current_time += TICK_MS;
        self.steps += 1;
        self.pacman.advance(self.current_time, &self.map);

        let view = self.game_state_view();
        for idx in 0..self.ghosts.len() {
            self.ghosts[idx].update(self.current_time, &self.map, &view, &mut self.rng);
        }

        self.resolve_dot_collisions();
        self.resolve_ghost_collisions();

        let level_completed = self.dots.is_empty();
        let terminated = self.game_over || level_completed;
        let truncated = self.steps > self.options.max_episode_steps;

        let reward = self.compute_reward(old_score, level_completed);

        if level_completed {
            self.reset_level();
        }

        StepOutcome {
            observation: self.observation(),
            reward,
            terminated,
            truncated,
            info: self.info(),
        }
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn dots_left(&self) -> usize {
        self.dots.len()
    }

    pub fn info(&self) -> StepInfo {
        StepInfo {
            pacman: PacmanInfo {
                x: self.pacman.x,
                y: self.pacman.y,
            },
            ghosts: self
                .ghosts
                .iter()
                .map(|ghost| GhostInfo {
                    x: ghost.x,
                    y: ghost.y,
                    ghost_type: ghost.ghost_type,
                    state: ghost.state,
                })
                .collect(),
            timestamp: self.current_time,
            game_over: self.game_over,
            score: self.score,
            lives: self.lives,
        }
    }

    pub fn observation(&self) -> Vec<f32> {
        let mut obs = Vec::with_capacity(OBSERVATION_LEN);
        let max_distance = (self.map.width() + self.map.height()) as f32;

        obs.push(self.pacman.x as f32);
        obs.push(self.pacman.y as f32);

        for slot in 0..4 {
            match self.ghosts.get(slot) {
                Some(ghost) => {
                    let distance = manhattan(ghost.x, ghost.y, self.pacman.x, self.pacman.y);
                    obs.push(ghost.x as f32);
                    obs.push(ghost.y as f32);
                    obs.push(ghost.ghost_type.value() as f32);
                    obs.push(ghost.state.value() as f32);
                    obs.push(ghost.frightened_timer_ms(self.current_time) as f32);
                    obs.push((distance as f32 / max_distance).min(1.0));
                }
                None => obs.extend_from_slice(&[0.0; 6]),
            }
        }

        let mut pellet_slots = 0;
        for dot in &self.dots {
            if dot.kind == CellType::PowerPellet && pellet_slots < 4 {
                let distance = manhattan(dot.x, dot.y, self.pacman.x, self.pacman.y);
                obs.push(dot.x as f32);
                obs.push(dot.y as f32);
                obs.push((distance as f32 / max_distance).min(1.0));
                pellet_slots += 1;
            }
        }
        for _ in pellet_slots..4 {
            obs.extend_from_slice(&[0.0; 3]);
        }

        let mut dot_distances: Vec<(i32, i32, i32)> = self
            .dots
            .iter()
            .filter(|dot| dot.kind == CellType::Dot)
            .map(|dot| {
                (
                    dot.x,
                    dot.y,
                    manhattan(dot.x, dot.y, self.pacman.x, self.pacman.y),
                )
            })
            .collect();
        dot_distances.sort_by_key(|entry| entry.2);
        for slot in 0..4 {
            match dot_distances.get(slot) {
                Some(&(x, y, distance)) => {
                    obs.push(x as f32);
                    obs.push(y as f32);
                    obs.push(distance as f32);
                }
                None => obs.extend_from_slice(&[0.0; 3]),
            }
        }

        obs.push(self.dots.len() as f32);
        obs.push(1.0 - self.dots.len() as f32 / self.total_initial_dots as f32);

        for direction in Direction::CARDINALS {
            let (nx, ny) = direction.step(self.pacman.x, self.pacman.y);
            let legal = self.map.is_walkable(nx, ny, false) || self.is_teleport_exit(nx);
            obs.push(if legal { 1.0 } else { 0.0 });
        }

        for slot in 0..4 {
            match self.ghosts.get(slot) {
                Some(ghost) => {
                    for direction in Direction::CARDINALS {
                        let (nx, ny) = direction.step(ghost.x, ghost.y);
                        obs.push(if ghost.is_valid_move(&self.map, nx, ny) {
                            1.0
                        } else {
                            0.0
                        });
                    }
                    obs.push(ghost.ghost_type.value() as f32);
                }
                None => obs.extend_from_slice(&[0.0; 5]),
            }
        }

        obs
    }

    fn game_state_view(&self) -> GameStateView {
        GameStateView {
            pacman: Vec2 {
                x: self.pacman.x,
                y: self.pacman.y,
            },
            ghosts: self
                .ghosts
                .iter()
                .map(|ghost| GhostSnapshot {
                    x: ghost.x,
                    y: ghost.y,
                    ghost_type: ghost.ghost_type,
                })
                .collect(),
        }
    }

    fn resolve_dot_collisions(&mut self) {
        let (px, py) = (self.pacman.x, self.pacman.y);
        let dots = std::mem::take(&mut self.dots);
        for dot in dots {
            if (dot.x, dot.y) != (px, py) {
                self.dots.push(dot);
                continue;
            }
            match dot.kind {
                CellType::PowerPellet => {
                    self.score += POWER_PELLET_SCORE;
                    self.ghost_streak = GHOST_STREAK_BASE;
                    for idx in 0..self.ghosts.len() {
                        self.ghosts[idx].enter_frightened(self.current_time);
                    }
                }
                _ => self.score += DOT_SCORE,
            }
            self.map.set_cell(dot.x, dot.y, CellType::Empty);
        }
    }

    fn resolve_ghost_collisions(&mut self) {
        for idx in 0..self.ghosts.len() {
            if !self.ghost_hits_pacman(idx) {
                continue;
            }
            if self.ghosts[idx].is_frightened() {
                self.score += self.ghost_streak;
                self.ghost_streak *= 2;
                self.ghosts[idx].on_eaten(self.current_time);
            } else {
                self.lose_life();
                break;
            }
        }
    }

    fn ghost_hits_pacman(&self, idx: usize) -> bool {
        let ghost = &self.ghosts[idx];
        if ghost.x == self.pacman.x && ghost.y == self.pacman.y {
            return true;
        }
        if self.options.collision_policy == CollisionPolicy::GridOrProximity {
            let dx = ghost.display_x - self.pacman.display_x;
            let dy = ghost.display_y - self.pacman.display_y;
            return (dx * dx + dy * dy).sqrt() < PROXIMITY_COLLISION_RADIUS;
        }
        false
    }

    fn lose_life(&mut self) {
        self.lives -= 1;
        if self.lives > 0 {
            self.respawn_entities();
            return;
        }
        self.game_over = true;
        self.pacman.freeze();
        for idx in 0..self.ghosts.len() {
            self.ghosts[idx].freeze();
        }
    }

    fn respawn_entities(&mut self) {
        self.pacman = Pacman::new(self.options.pacman_spawn.x, self.options.pacman_spawn.y);
        self.ghosts = spawn_ghosts(&self.options, &self.map);
        self.prev_pacman_pos = self.options.pacman_spawn;
        self.action_history.clear();
    }

    fn reset_level(&mut self) {
        self.map = self.base_map.clone();
        self.dots = self.map.collectibles();
        self.pacman = Pacman::new(self.options.pacman_spawn.x, self.options.pacman_spawn.y);
        self.ghosts = spawn_ghosts(&self.options, &self.map);
        self.prev_pacman_pos = self.options.pacman_spawn;
        self.action_history.clear();
    }

    fn compute_reward(&self, old_score: i32, level_completed: bool) -> f32 {
        let delta = (self.score - old_score).max(0);
        let mut reward = delta as f32;

        let stalled = self.pacman.x == self.prev_pacman_pos.x
            && self.pacman.y == self.prev_pacman_pos.y;
        if stalled || self.is_oscillation() {
            reward -= STALL_PENALTY;
        }

        if delta == 0 {
            reward -= NO_PROGRESS_PENALTY;
        } else if level_completed {
            reward += LEVEL_CLEAR_BONUS;
        }

        for ghost in &self.ghosts {
            let distance = manhattan(ghost.x, ghost.y, self.pacman.x, self.pacman.y);
            if ghost.state == GhostState::Chase && distance < CHASE_PROXIMITY_RADIUS {
                reward -= (CHASE_PROXIMITY_RADIUS - distance) as f32 * CHASE_PROXIMITY_PENALTY;
            } else if ghost.state == GhostState::Frightened
                && distance < FRIGHTENED_PROXIMITY_RADIUS
            {
                reward += (FRIGHTENED_PROXIMITY_RADIUS - distance) as f32
                    * FRIGHTENED_PROXIMITY_BONUS;
            }
        }

        reward
    }

    fn is_oscillation(&self) -> bool {
        if self.action_history.len() < 2 {
            return false;
        }
        let history: Vec<usize> = self.action_history.iter().copied().collect();
        for window in [2usize, 4, 6, 8] {
            if window > history.len() {
                return false;
            }
            let tail = &history[history.len() - window..];
            let half = window / 2;
            if (0..half).all(|i| is_opposite_action(tail[i], tail[half + i])) {
                return true;
            }
        }
        false
    }

    fn is_teleport_exit(&self, next_x: i32) -> bool {
        if next_x >= 0 && next_x < self.map.width() {
            return false;
        }
        let points = self.map.teleport_points();
        points.len() >= 2
            && points
                .iter()
                .any(|point| point.x == self.pacman.x && point.y == self.pacman.y)
    }
}

fn spawn_ghosts(options: &EnvOptions, map: &GameMap) -> Vec<Ghost> {
    options
        .ghost_spawns
        .iter()
        .map(|spawn| Ghost::new(spawn.ghost_type, spawn.spawn, spawn.respawn, map))
        .collect()
}

fn is_opposite_action(a: usize, b: usize) -> bool {
    matches!((a, b), (0, 1) | (1, 0) | (2, 3) | (3, 2))
}
