use crate::types::{CellType, Collectible, Vec2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map has no rows")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown cell value {value} at ({x}, {y})")]
    UnknownCell { x: usize, y: usize, value: u8 },
}

#[derive(Clone, Debug)]
pub struct GameMap {
    width: i32,
    height: i32,
    cells: Vec<CellType>,
}

impl GameMap {
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, MapError> {
        let first = rows.first().ok_or(MapError::Empty)?;
        let width = first.len();
        if width == 0 {
            return Err(MapError::Empty);
        }

        let mut cells = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(MapError::RaggedRow {
                    row: y,
                    expected: width,
                    found: row.len(),
                });
            }
            for (x, value) in row.iter().enumerate() {
                let cell = CellType::from_value(*value)
                    .ok_or(MapError::UnknownCell { x, y, value: *value })?;
                cells.push(cell);
            }
        }

        Ok(Self {
            width: width as i32,
            height: rows.len() as i32,
            cells,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    pub fn cell_at(&self, x: i32, y: i32) -> Option<CellType> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(self.cells[(y * self.width + x) as usize])
    }

    pub fn set_cell(&mut self, x: i32, y: i32, cell: CellType) {
        if !self.in_bounds(x, y) {
            return;
        }
        self.cells[(y * self.width + x) as usize] = cell;
    }

    // Out-of-bounds is never walkable; edge wrap is handled by teleport points.
    pub fn is_walkable(&self, x: i32, y: i32, can_pass_door: bool) -> bool {
        match self.cell_at(x, y) {
            None => false,
            Some(CellType::Wall) => false,
            Some(CellType::Door) => can_pass_door,
            Some(_) => true,
        }
    }

    pub fn collectibles(&self) -> Vec<Collectible> {
        let mut collectibles = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                match self.cell_at(x, y) {
                    Some(kind @ (CellType::Dot | CellType::PowerPellet)) => {
                        collectibles.push(Collectible { x, y, kind });
                    }
                    _ => {}
                }
            }
        }
        collectibles
    }

    pub fn teleport_points(&self) -> Vec<Vec2> {
        let mut points = Vec::new();
        for y in 0..self.height {
            for x in [0, self.width - 1] {
                if matches!(
                    self.cell_at(x, y),
                    Some(CellType::Empty | CellType::Dot | CellType::PowerPellet)
                ) {
                    points.push(Vec2 { x, y });
                }
            }
        }
        points
    }

    pub fn teleport_pair(&self) -> Option<(Vec2, Vec2)> {
        let points = self.teleport_points();
        if points.len() < 2 {
            return None;
        }
        Some((points[0], points[1]))
    }
}
