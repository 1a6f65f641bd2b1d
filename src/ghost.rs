use crate::constants::{
    DISPLAY_LERP_RATE, FRIGHTENED_DURATION_MS, GHOST_BASE_INTERVAL_FACTOR,
    GHOST_FRIGHTENED_SLOWDOWN, GHOST_MIN_INTERVAL_FACTOR, GHOST_SPEED_RAMP_CAP,
    GHOST_SPEED_RAMP_RATE, GHOST_SPEED_RAMP_STEP_MS, SCATTER_CHASE_CYCLE_MS, TICK_MS,
};
use crate::map::GameMap;
use crate::rng::Rng;
use crate::types::{manhattan, CellType, Direction, GameStateView, GhostState, GhostType, Vec2};
use std::collections::VecDeque;

#[derive(Clone, Debug, Default)]
struct BfsScratch {
    visited: Vec<u32>,
    entry_dir: Vec<Direction>,
    queue: VecDeque<(i32, i32)>,
    stamp: u32,
}

impl BfsScratch {
    fn begin(&mut self, len: usize) {
        if self.visited.len() != len {
            self.visited = vec![0; len];
            self.entry_dir = vec![Direction::None; len];
        }
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.visited.fill(0);
            self.stamp = 1;
        }
        self.queue.clear();
    }

    fn visit(&mut self, idx: usize, entry: Direction) {
        self.visited[idx] = self.stamp;
        self.entry_dir[idx] = entry;
    }

    fn is_visited(&self, idx: usize) -> bool {
        self.visited[idx] == self.stamp
    }
}

#[derive(Clone, Debug)]
pub struct Ghost {
    pub ghost_type: GhostType,
    pub state: GhostState,
    pub x: i32,
    pub y: i32,
    pub display_x: f32,
    pub display_y: f32,
    pub direction: Direction,
    pub move_interval: f32,
    pub last_state_change: u64,
    pub last_move_time: u64,
    pub scatter_target: Vec2,
    pub respawn_cell: Vec2,
    pub exited_house: bool,
    pub cycle_index: usize,
    pub frozen: bool,
    bfs: BfsScratch,
}

impl Ghost {
    pub fn new(ghost_type: GhostType, spawn: Vec2, respawn: Vec2, map: &GameMap) -> Self {
        Self {
            ghost_type,
            state: GhostState::Scatter,
            x: spawn.x,
            y: spawn.y,
            display_x: spawn.x as f32,
            display_y: spawn.y as f32,
            direction: Direction::None,
            move_interval: TICK_MS as f32 * GHOST_BASE_INTERVAL_FACTOR,
            last_state_change: 0,
            last_move_time: 0,
            scatter_target: scatter_corner(ghost_type, map),
            respawn_cell: respawn,
            exited_house: false,
            cycle_index: 0,
            frozen: false,
            bfs: BfsScratch::default(),
        }
    }

    pub fn update(&mut self, now: u64, map: &GameMap, view: &GameStateView, rng: &mut Rng) {
        if self.frozen {
            return;
        }
        if !self.ready_to_move(now) {
            return;
        }

        self.handle_state_transition(now);
        self.update_speed(now);
        self.check_door_exit(map);
        self.direction = self.pick_direction(map, view, rng);

        let (nx, ny) = self.direction.step(self.x, self.y);
        if self.is_valid_move(map, nx, ny) {
            self.last_move_time = now;
            self.x = nx;
            self.y = ny;
        }
    }

    /// Reversing is only allowed when the current cell is a dead end.
    pub fn is_valid_move(&self, map: &GameMap, x: i32, y: i32) -> bool {
        if !map.in_bounds(x, y) {
            return false;
        }
        let can_pass_door = !self.exited_house;
        if !map.is_walkable(x, y, can_pass_door) {
            return false;
        }

        let mut exits = 0;
        for direction in Direction::CARDINALS {
            let (nx, ny) = direction.step(self.x, self.y);
            if map.is_walkable(nx, ny, can_pass_door) {
                exits += 1;
            }
        }
        if exits == 1 {
            return true;
        }

        let (dx, dy) = self.direction.delta();
        !(x == self.x - dx && y == self.y - dy)
    }

    pub fn enter_frightened(&mut self, now: u64) {
        self.state = GhostState::Frightened;
        self.last_state_change = now;
    }

    pub fn on_eaten(&mut self, now: u64) {
        self.last_state_change = now;
        self.state = GhostState::Scatter;
        self.x = self.respawn_cell.x;
        self.y = self.respawn_cell.y;
        self.display_x = self.x as f32;
        self.display_y = self.y as f32;
        self.exited_house = false;
    }

    pub fn is_frightened(&self) -> bool {
        self.state == GhostState::Frightened
    }

    pub fn frightened_timer_ms(&self, now: u64) -> u64 {
        if self.state != GhostState::Frightened {
            return 0;
        }
        FRIGHTENED_DURATION_MS.saturating_sub(now.saturating_sub(self.last_state_change))
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
        self.direction = Direction::None;
    }

    fn ready_to_move(&mut self, now: u64) -> bool {
        if (now.saturating_sub(self.last_move_time) as f32) < self.move_interval {
            self.display_x += (self.x as f32 - self.display_x) * DISPLAY_LERP_RATE;
            self.display_y += (self.y as f32 - self.display_y) * DISPLAY_LERP_RATE;
            return false;
        }
        true
    }

    fn handle_state_transition(&mut self, now: u64) {
        let since_last_change = now.saturating_sub(self.last_state_change);

        if self.state == GhostState::Frightened && since_last_change > FRIGHTENED_DURATION_MS {
            self.state = GhostState::Chase;
            self.last_state_change = now;
            return;
        }

        if since_last_change > SCATTER_CHASE_CYCLE_MS[self.cycle_index] {
            self.state = if self.state == GhostState::Chase {
                GhostState::Scatter
            } else {
                GhostState::Chase
            };
            self.cycle_index = (self.cycle_index + 1).min(SCATTER_CHASE_CYCLE_MS.len() - 1);
            self.last_state_change = now;
        }
    }

    fn update_speed(&mut self, now: u64) {
        if self.state == GhostState::Frightened {
            self.move_interval =
                TICK_MS as f32 * GHOST_BASE_INTERVAL_FACTOR * GHOST_FRIGHTENED_SLOWDOWN;
            return;
        }
        let ramp = ((now / GHOST_SPEED_RAMP_STEP_MS) as f32 * GHOST_SPEED_RAMP_RATE)
            .min(GHOST_SPEED_RAMP_CAP);
        self.move_interval =
            TICK_MS as f32 * (GHOST_BASE_INTERVAL_FACTOR - ramp).max(GHOST_MIN_INTERVAL_FACTOR);
    }

    fn check_door_exit(&mut self, map: &GameMap) {
        if map.cell_at(self.x, self.y) == Some(CellType::Door) {
            let (nx, ny) = self.direction.step(self.x, self.y);
            self.exited_house = map.cell_at(nx, ny) != Some(CellType::GhostCell);
        }
    }

    fn pick_direction(&mut self, map: &GameMap, view: &GameStateView, rng: &mut Rng) -> Direction {
        let direction = match self.state {
            GhostState::Scatter => {
                let corner = self.scatter_target;
                self.direction_towards(map, corner.x, corner.y, rng)
            }
            GhostState::Chase => self.chase_direction(map, view, rng),
            GhostState::Frightened => self.random_valid_direction(map, rng),
        };

        let (nx, ny) = direction.step(self.x, self.y);
        if self.is_valid_move(map, nx, ny) {
            direction
        } else {
            self.random_valid_direction(map, rng)
        }
    }

    fn chase_direction(&mut self, map: &GameMap, view: &GameStateView, rng: &mut Rng) -> Direction {
        let pacman = view.pacman;
        match self.ghost_type {
            GhostType::Blinky => self.direction_towards(map, pacman.x, pacman.y, rng),
            GhostType::Pinky => self.direction_towards(map, pacman.x + 4, pacman.y, rng),
            GhostType::Clyde => {
                let dx = (self.x - pacman.x) as f32;
                let dy = (self.y - pacman.y) as f32;
                if (dx * dx + dy * dy).sqrt() > 8.0 {
                    self.direction_towards(map, pacman.x, pacman.y, rng)
                } else {
                    let corner = self.scatter_target;
                    self.direction_towards(map, corner.x, corner.y, rng)
                }
            }
            GhostType::Inky => {
                let blinky = view
                    .ghosts
                    .iter()
                    .find(|ghost| ghost.ghost_type == GhostType::Blinky);
                match blinky {
                    Some(blinky) => self.direction_towards(
                        map,
                        pacman.x + (pacman.x - blinky.x),
                        pacman.y + (pacman.y - blinky.y),
                        rng,
                    ),
                    None => self.random_valid_direction(map, rng),
                }
            }
        }
    }

    fn direction_towards(
        &mut self,
        map: &GameMap,
        target_x: i32,
        target_y: i32,
        rng: &mut Rng,
    ) -> Direction {
        let mut bfs = std::mem::take(&mut self.bfs);
        let found = self.search_step_towards(map, &mut bfs, target_x, target_y);
        self.bfs = bfs;
        match found {
            Some(direction) => direction,
            None => self.random_valid_direction(map, rng),
        }
    }

    /// Breadth-first search toward the clamped target, keeping the first cell
    /// popped at a strictly smaller Manhattan distance as the fallback goal
    /// when the target itself is unreachable.
    fn search_step_towards(
        &self,
        map: &GameMap,
        bfs: &mut BfsScratch,
        target_x: i32,
        target_y: i32,
    ) -> Option<Direction> {
        let width = map.width();
        let height = map.height();
        let target_x = target_x.clamp(0, width - 1);
        let target_y = target_y.clamp(0, height - 1);

        bfs.begin((width * height) as usize);
        bfs.visit((self.y * width + self.x) as usize, Direction::None);
        bfs.queue.push_back((self.x, self.y));

        let mut closest = (self.x, self.y);
        let mut closest_distance = manhattan(self.x, self.y, target_x, target_y);

        while let Some((x, y)) = bfs.queue.pop_front() {
            let distance = manhattan(x, y, target_x, target_y);
            if distance < closest_distance {
                closest = (x, y);
                closest_distance = distance;
            }
            if x == target_x && y == target_y {
                break;
            }

            for direction in Direction::CARDINALS {
                let (nx, ny) = direction.step(x, y);
                if !self.is_valid_move(map, nx, ny) {
                    continue;
                }
                let idx = (ny * width + nx) as usize;
                if bfs.is_visited(idx) {
                    continue;
                }
                bfs.visit(idx, direction);
                bfs.queue.push_back((nx, ny));
            }
        }

        // Walk the entry directions back to the first step off the start cell.
        let (mut cx, mut cy) = closest;
        loop {
            let entry = bfs.entry_dir[(cy * width + cx) as usize];
            if entry == Direction::None {
                return None;
            }
            let (dx, dy) = entry.delta();
            let (px, py) = (cx - dx, cy - dy);
            if px == self.x && py == self.y {
                return Some(entry);
            }
            cx = px;
            cy = py;
        }
    }

    fn random_valid_direction(&self, map: &GameMap, rng: &mut Rng) -> Direction {
        let mut candidates = Vec::new();
        for direction in Direction::CARDINALS {
            let (nx, ny) = direction.step(self.x, self.y);
            if self.is_valid_move(map, nx, ny) {
                candidates.push(direction);
            }
        }
        if candidates.is_empty() {
            return self.direction;
        }
        candidates[rng.pick_index(candidates.len())]
    }
}

fn scatter_corner(ghost_type: GhostType, map: &GameMap) -> Vec2 {
    let (width, height) = (map.width(), map.height());
    match ghost_type {
        GhostType::Blinky => Vec2 { x: width - 1, y: 0 },
        GhostType::Pinky => Vec2 { x: 0, y: 0 },
        GhostType::Clyde => Vec2 {
            x: 0,
            y: height - 1,
        },
        GhostType::Inky => Vec2 {
            x: width - 1,
            y: height - 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MAP;
    use crate::types::GhostSnapshot;

    fn default_map() -> GameMap {
        let rows: Vec<Vec<u8>> = DEFAULT_MAP.iter().map(|row| row.to_vec()).collect();
        GameMap::from_rows(&rows).unwrap()
    }

    fn corridor_map() -> GameMap {
        // Single open row from (1, 1) to (7, 1).
        let rows = vec![
            vec![1, 1, 1, 1, 1, 1, 1, 1, 1],
            vec![1, 2, 2, 2, 2, 2, 2, 2, 1],
            vec![1, 1, 1, 1, 1, 1, 1, 1, 1],
        ];
        GameMap::from_rows(&rows).unwrap()
    }

    fn make_ghost(ghost_type: GhostType, x: i32, y: i32, map: &GameMap) -> Ghost {
        Ghost::new(
            ghost_type,
            Vec2 { x, y },
            Vec2 { x, y },
            map,
        )
    }

    fn empty_view(pacman_x: i32, pacman_y: i32) -> GameStateView {
        GameStateView {
            pacman: Vec2 {
                x: pacman_x,
                y: pacman_y,
            },
            ghosts: Vec::new(),
        }
    }

    #[test]
    fn scatter_corners_by_type() {
        let map = default_map();
        assert_eq!(
            scatter_corner(GhostType::Blinky, &map),
            Vec2 { x: 18, y: 0 }
        );
        assert_eq!(scatter_corner(GhostType::Pinky, &map), Vec2 { x: 0, y: 0 });
        assert_eq!(scatter_corner(GhostType::Clyde, &map), Vec2 { x: 0, y: 20 });
        assert_eq!(
            scatter_corner(GhostType::Inky, &map),
            Vec2 { x: 18, y: 20 }
        );
    }

    #[test]
    fn frightened_expires_to_chase() {
        let map = default_map();
        let mut ghost = make_ghost(GhostType::Blinky, 4, 3, &map);
        ghost.enter_frightened(1_000);
        assert_eq!(ghost.frightened_timer_ms(3_000), 5_000);

        ghost.handle_state_transition(8_000);
        assert_eq!(ghost.state, GhostState::Frightened);
        ghost.handle_state_transition(8_001);
        assert_eq!(ghost.state, GhostState::Chase);
        assert_eq!(ghost.last_state_change, 8_001);
        assert_eq!(ghost.frightened_timer_ms(8_001), 0);
    }

    #[test]
    fn scatter_chase_cycle_advances_and_caps() {
        let map = default_map();
        let mut ghost = make_ghost(GhostType::Pinky, 4, 3, &map);
        assert_eq!(ghost.state, GhostState::Scatter);

        ghost.handle_state_transition(7_001);
        assert_eq!(ghost.state, GhostState::Chase);
        assert_eq!(ghost.cycle_index, 1);

        ghost.handle_state_transition(7_001 + 20_001);
        assert_eq!(ghost.state, GhostState::Scatter);
        assert_eq!(ghost.cycle_index, 2);

        // Drive through the remaining finite phases.
        let mut now = 7_001 + 20_001;
        for _ in 0..5 {
            now += 21_000;
            ghost.handle_state_transition(now);
        }
        assert_eq!(ghost.cycle_index, SCATTER_CHASE_CYCLE_MS.len() - 1);
        let state = ghost.state;
        ghost.handle_state_transition(now + 10_000_000);
        assert_eq!(ghost.state, state);
    }

    #[test]
    fn speed_ramps_with_elapsed_time() {
        let map = default_map();
        let mut ghost = make_ghost(GhostType::Clyde, 4, 3, &map);

        ghost.update_speed(0);
        assert_eq!(ghost.move_interval, 225.0 * 1.3);
        ghost.update_speed(10_000);
        assert_eq!(ghost.move_interval, 225.0 * 1.25);
        ghost.update_speed(50_000);
        assert_eq!(ghost.move_interval, 225.0 * 1.15);

        ghost.state = GhostState::Frightened;
        ghost.update_speed(50_000);
        assert_eq!(ghost.move_interval, 225.0 * 1.3 * 0.8);
    }

    #[test]
    fn rejects_reversal_except_in_dead_ends() {
        let map = corridor_map();
        let mut ghost = make_ghost(GhostType::Blinky, 3, 1, &map);
        ghost.direction = Direction::Right;
        ghost.exited_house = true;

        assert!(ghost.is_valid_move(&map, 4, 1));
        // The cell behind is off limits while other exits remain.
        assert!(!ghost.is_valid_move(&map, 2, 1));

        // At the corridor's end the only exit is backwards.
        ghost.x = 7;
        ghost.y = 1;
        assert!(ghost.is_valid_move(&map, 6, 1));
    }

    #[test]
    fn bfs_steps_toward_reachable_target() {
        let map = corridor_map();
        let mut ghost = make_ghost(GhostType::Blinky, 3, 1, &map);
        ghost.exited_house = true;
        let mut rng = Rng::new(1);

        assert_eq!(ghost.direction_towards(&map, 7, 1, &mut rng), Direction::Right);
        assert_eq!(ghost.direction_towards(&map, 1, 1, &mut rng), Direction::Left);
    }

    #[test]
    fn bfs_clamps_out_of_bounds_target() {
        let map = corridor_map();
        let mut ghost = make_ghost(GhostType::Blinky, 3, 1, &map);
        ghost.exited_house = true;
        let mut rng = Rng::new(1);

        assert_eq!(
            ghost.direction_towards(&map, 100, 1, &mut rng),
            Direction::Right
        );
        assert_eq!(
            ghost.direction_towards(&map, -100, -100, &mut rng),
            Direction::Left
        );
    }

    #[test]
    fn bfs_heads_for_closest_cell_when_target_is_walled_off() {
        // Target (1, 3) sits in a sealed room; (1, 1) is the closest open cell.
        let rows = vec![
            vec![1, 1, 1, 1, 1],
            vec![1, 2, 2, 2, 1],
            vec![1, 1, 1, 1, 1],
            vec![1, 2, 1, 1, 1],
            vec![1, 1, 1, 1, 1],
        ];
        let map = GameMap::from_rows(&rows).unwrap();
        let mut ghost = make_ghost(GhostType::Blinky, 3, 1, &map);
        ghost.exited_house = true;
        let mut rng = Rng::new(1);

        assert_eq!(ghost.direction_towards(&map, 1, 3, &mut rng), Direction::Left);
    }

    #[test]
    fn door_exit_flag_flips_when_leaving_the_house() {
        let map = default_map();
        let mut ghost = make_ghost(GhostType::Blinky, 9, 8, &map);
        assert!(!ghost.exited_house);

        // Standing on the door facing the house keeps the flag clear.
        ghost.direction = Direction::Down;
        ghost.check_door_exit(&map);
        assert!(!ghost.exited_house);

        // Facing out across the door marks the ghost as escaped.
        ghost.direction = Direction::Up;
        ghost.check_door_exit(&map);
        assert!(ghost.exited_house);
        assert!(!map.is_walkable(9, 8, !ghost.exited_house));
    }

    #[test]
    fn on_eaten_returns_to_respawn_cell_in_scatter() {
        let map = default_map();
        let mut ghost = Ghost::new(
            GhostType::Inky,
            Vec2 { x: 10, y: 9 },
            Vec2 { x: 10, y: 9 },
            &map,
        );
        ghost.x = 4;
        ghost.y = 3;
        ghost.exited_house = true;
        ghost.enter_frightened(5_000);

        ghost.on_eaten(6_000);
        assert_eq!((ghost.x, ghost.y), (10, 9));
        assert_eq!(ghost.display_x, 10.0);
        assert_eq!(ghost.state, GhostState::Scatter);
        assert!(!ghost.exited_house);
        assert_eq!(ghost.last_state_change, 6_000);
    }

    #[test]
    fn update_respects_move_interval_and_freeze() {
        let map = corridor_map();
        let mut ghost = make_ghost(GhostType::Blinky, 3, 1, &map);
        ghost.exited_house = true;
        let mut rng = Rng::new(1);
        let view = empty_view(7, 1);

        ghost.state = GhostState::Chase;
        ghost.last_move_time = 1_000;
        ghost.update(1_100, &map, &view, &mut rng);
        assert_eq!((ghost.x, ghost.y), (3, 1));

        ghost.update(1_000 + 293, &map, &view, &mut rng);
        assert_eq!((ghost.x, ghost.y), (4, 1));

        ghost.freeze();
        ghost.update(10_000, &map, &view, &mut rng);
        assert_eq!((ghost.x, ghost.y), (4, 1));
    }

    #[test]
    fn inky_reflects_pacman_through_blinky() {
        let map = corridor_map();
        let mut ghost = make_ghost(GhostType::Inky, 4, 1, &map);
        ghost.exited_house = true;
        ghost.state = GhostState::Chase;
        ghost.direction = Direction::None;
        let mut rng = Rng::new(1);

        // Blinky at (1, 1), pacman at (3, 1): mirrored target is (5, 1).
        let view = GameStateView {
            pacman: Vec2 { x: 3, y: 1 },
            ghosts: vec![GhostSnapshot {
                x: 1,
                y: 1,
                ghost_type: GhostType::Blinky,
            }],
        };
        assert_eq!(
            ghost.chase_direction(&map, &view, &mut rng),
            Direction::Right
        );
    }

    #[test]
    fn clyde_backs_off_when_close() {
        let map = default_map();
        let mut ghost = make_ghost(GhostType::Clyde, 4, 17, &map);
        ghost.exited_house = true;
        ghost.state = GhostState::Chase;
        let mut rng = Rng::new(1);

        // Far away: head for the player.
        let far = empty_view(14, 3);
        let towards = ghost.chase_direction(&map, &far, &mut rng);
        let expected = ghost.direction_towards(&map, 14, 3, &mut rng);
        assert_eq!(towards, expected);

        // Within eight cells: retreat to the scatter corner instead.
        let near = empty_view(4, 13);
        let retreat = ghost.chase_direction(&map, &near, &mut rng);
        let corner = ghost.scatter_target;
        let expected = ghost.direction_towards(&map, corner.x, corner.y, &mut rng);
        assert_eq!(retreat, expected);
    }
}
