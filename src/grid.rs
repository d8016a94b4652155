//! Farm grid: square matrix of cells, planting, growth and random spawning.

use crate::crops::{CropKind, CropTable};
use rand::Rng;

/// Grid coordinate. `x` is the column, `y` the row; (0, 0) is top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Single farm plot: empty, or a crop with the ticks it has grown since planting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Planted { kind: CropKind, growth: u32 },
}

impl Cell {
    pub fn kind(&self) -> Option<CropKind> {
        match self {
            Self::Empty => None,
            Self::Planted { kind, .. } => Some(*kind),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Square N×N grid stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// All-empty grid with side `size`.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::Empty; size * size],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.size && pos.y < self.size
    }

    #[inline]
    const fn index(&self, pos: Pos) -> usize {
        pos.y * self.size + pos.x
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<Cell> {
        self.contains(pos).then(|| self.cells[self.index(pos)])
    }

    /// Plant `kind` at `pos` with growth 0, replacing whatever was there.
    pub fn plant(&mut self, pos: Pos, kind: CropKind) {
        if self.contains(pos) {
            let idx = self.index(pos);
            self.cells[idx] = Cell::Planted { kind, growth: 0 };
        }
    }

    /// Set a cell directly (used when laying out a board by hand).
    pub fn set(&mut self, pos: Pos, cell: Cell) {
        if self.contains(pos) {
            let idx = self.index(pos);
            self.cells[idx] = cell;
        }
    }

    pub fn clear(&mut self, pos: Pos) {
        self.set(pos, Cell::Empty);
    }

    /// Empty positions in row-major order.
    pub fn empty_cells(&self) -> Vec<Pos> {
        self.iter_cells()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// Plant a random kind in a uniformly random empty cell.
    /// Returns `None` (and draws nothing) when the grid is full.
    pub fn spawn_random<R: Rng + ?Sized>(&mut self, crops: &CropTable, rng: &mut R) -> Option<Pos> {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return None;
        }
        let pos = empty[rng.random_range(0..empty.len())];
        let kind = crops.pick(rng);
        self.plant(pos, kind);
        Some(pos)
    }

    /// Age every planted cell by one tick. Growth stops at the kind's maturity
    /// threshold since only mature/immature is observable.
    pub fn grow(&mut self, crops: &CropTable) {
        for cell in &mut self.cells {
            if let Cell::Planted { kind, growth } = cell {
                let cap = crops.get(*kind).map_or(u32::MAX, |d| d.growth_ticks);
                if *growth < cap {
                    *growth += 1;
                }
            }
        }
    }

    /// Iterate over all cells with their positions, row by row.
    pub fn iter_cells(&self) -> impl Iterator<Item = (Pos, Cell)> + '_ {
        (0..self.size)
            .flat_map(move |y| (0..self.size).map(move |x| Pos::new(x, y)))
            .map(|pos| (pos, self.cells[self.index(pos)]))
    }
}
