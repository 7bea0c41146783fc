//! Grid maze whose walls are rasterised from free-form line segments.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::config::{ConfigError, MAX_GRID_CELLS, MazeBotsConfig};

/// Position of a single grid cell.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    /// Construct a new cell position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Line between two lattice points (cell corners) drawn by the user.
///
/// Serialises as `[x1, y1, x2, y2]`, the layout format wall files use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct WallSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl WallSegment {
    #[must_use]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Whether both end points coincide.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.x1 == self.x2 && self.y1 == self.y2
    }
}

impl From<[i32; 4]> for WallSegment {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<WallSegment> for [i32; 4] {
    fn from(segment: WallSegment) -> Self {
        [segment.x1, segment.y1, segment.x2, segment.y2]
    }
}

impl fmt::Display for WallSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.x1, self.y1, self.x2, self.y2)
    }
}

#[derive(Debug, Clone, Copy)]
enum WallAxis {
    /// Barrier on the right edge of a cell.
    Vertical,
    /// Barrier on the bottom edge of a cell.
    Horizontal,
}

/// Cell-boundary wall model plus the visited set of the agent being evaluated.
#[derive(Debug, Clone)]
pub struct Maze {
    width: i32,
    height: i32,
    segments: Vec<WallSegment>,
    vertical: HashSet<u32>,
    horizontal: HashSet<u32>,
    visited: HashSet<u32>,
}

impl Maze {
    /// Create an empty maze of `width` columns and `height` rows.
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidConfig(
                "maze dimensions must be non-zero",
            ));
        }
        let (Ok(w), Ok(h)) = (i32::try_from(width), i32::try_from(height)) else {
            return Err(ConfigError::InvalidConfig("maze dimensions are too large"));
        };
        if u64::from(width) * u64::from(height) > MAX_GRID_CELLS {
            return Err(ConfigError::InvalidConfig("maze has too many cells"));
        }
        Ok(Self {
            width: w,
            height: h,
            segments: Vec::new(),
            vertical: HashSet::new(),
            horizontal: HashSet::new(),
            visited: HashSet::new(),
        })
    }

    /// Create a maze sized by `config` and walled by `segments`.
    pub fn from_config(
        config: &MazeBotsConfig,
        segments: &[WallSegment],
    ) -> Result<Self, ConfigError> {
        let mut maze = Self::new(config.grid_width, config.grid_height)?;
        maze.rebuild(segments);
        Ok(maze)
    }

    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Cell agents start from.
    #[must_use]
    pub const fn center(&self) -> Cell {
        Cell::new(self.width / 2, self.height / 2)
    }

    /// Whether `(x, y)` lies inside the grid.
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// Segments the wall sets were derived from, in drawing order.
    #[must_use]
    pub fn segments(&self) -> &[WallSegment] {
        &self.segments
    }

    /// Keys of right-edge barriers (`column * height + row`).
    #[must_use]
    pub fn vertical_walls(&self) -> &HashSet<u32> {
        &self.vertical
    }

    /// Keys of bottom-edge barriers (`column * height + row`).
    #[must_use]
    pub fn horizontal_walls(&self) -> &HashSet<u32> {
        &self.horizontal
    }

    /// Replace every segment and re-derive both wall sets.
    pub fn rebuild(&mut self, segments: &[WallSegment]) {
        self.segments = segments.to_vec();
        self.rederive();
    }

    /// Append one segment, rasterising only that segment.
    pub fn add_line(&mut self, segment: WallSegment) {
        self.segments.push(segment);
        self.rasterize(segment);
    }

    /// Remove the segment at `index`.
    ///
    /// Wall keys cannot be traced back to a single segment once merged, so the
    /// remaining segments are rasterised again from scratch.
    pub fn remove_line(&mut self, index: usize) -> Option<WallSegment> {
        if index >= self.segments.len() {
            return None;
        }
        let removed = self.segments.remove(index);
        self.rederive();
        Some(removed)
    }

    fn rederive(&mut self) {
        self.vertical.clear();
        self.horizontal.clear();
        let segments = std::mem::take(&mut self.segments);
        for segment in &segments {
            self.rasterize(*segment);
        }
        debug!(
            segments = segments.len(),
            vertical = self.vertical.len(),
            horizontal = self.horizontal.len(),
            "rebuilt maze walls"
        );
        self.segments = segments;
    }

    /// Walk the segment one column at a time, marking the cell edges it crosses.
    ///
    /// The row position accumulates the slope per column step and rounds half
    /// up; each column step marks a bottom edge and each row change a right
    /// edge. Exact placement matters for reproducibility, so the accumulation
    /// order must not change.
    fn rasterize(&mut self, segment: WallSegment) {
        let segment = self.clamp_to_lattice(segment);
        if segment.is_degenerate() {
            return;
        }
        let WallSegment { x1, y1, x2, y2 } = segment;

        let xunit = if x1 < x2 { 1 } else { -1 };
        let yunit = if y1 < y2 { 1 } else { -1 };
        let ydelta = if x1 == x2 {
            f64::from(yunit)
        } else {
            f64::from(y2 - y1) / f64::from((x2 - x1).abs())
        };
        let xadj = i32::from(x1 >= x2);
        let yadj = i32::from(y1 >= y2);

        let (mut x, mut y) = (x1, y1);
        let mut yreal = f64::from(y1);
        while x != x2 || y != y2 {
            if x != x2 {
                self.insert_wall(WallAxis::Horizontal, x - xadj, y - 1);
                x += xunit;
            }
            yreal += ydelta;
            let ygoal = (yreal + 0.5).floor() as i32;
            if y != ygoal {
                self.insert_wall(WallAxis::Vertical, x - 1, y - yadj);
                y += yunit;
            }
        }
    }

    /// Pull both end points onto the lattice `[0, W] x [0, H]`. Lattice points
    /// beyond it only produce edges that would be dropped anyway.
    fn clamp_to_lattice(&self, segment: WallSegment) -> WallSegment {
        let x = |v: i32| v.clamp(0, self.width);
        let y = |v: i32| v.clamp(0, self.height);
        WallSegment::new(x(segment.x1), y(segment.y1), x(segment.x2), y(segment.y2))
    }

    /// Edges outside the grid coincide with the implicit boundary and are dropped.
    fn insert_wall(&mut self, axis: WallAxis, column: i32, row: i32) {
        let Some(key) = self.wall_key(column, row) else {
            return;
        };
        match axis {
            WallAxis::Vertical => self.vertical.insert(key),
            WallAxis::Horizontal => self.horizontal.insert(key),
        };
    }

    fn wall_key(&self, column: i32, row: i32) -> Option<u32> {
        if !self.contains(column, row) {
            return None;
        }
        u32::try_from(column * self.height + row).ok()
    }

    fn cell_key(&self, x: i32, y: i32) -> Option<u32> {
        if !self.contains(x, y) {
            return None;
        }
        u32::try_from(y * self.width + x).ok()
    }

    fn has_wall(&self, axis: WallAxis, column: i32, row: i32) -> bool {
        let Some(key) = self.wall_key(column, row) else {
            return false;
        };
        match axis {
            WallAxis::Vertical => self.vertical.contains(&key),
            WallAxis::Horizontal => self.horizontal.contains(&key),
        }
    }

    #[must_use]
    pub fn left_border(&self, x: i32, y: i32) -> bool {
        x <= 0 || self.has_wall(WallAxis::Vertical, x - 1, y)
    }

    #[must_use]
    pub fn right_border(&self, x: i32, y: i32) -> bool {
        x >= self.width - 1 || self.has_wall(WallAxis::Vertical, x, y)
    }

    #[must_use]
    pub fn top_border(&self, x: i32, y: i32) -> bool {
        y <= 0 || self.has_wall(WallAxis::Horizontal, x, y - 1)
    }

    #[must_use]
    pub fn bottom_border(&self, x: i32, y: i32) -> bool {
        y >= self.height - 1 || self.has_wall(WallAxis::Horizontal, x, y)
    }

    /// Mark a cell as explored by the current agent. Cells outside the grid are ignored.
    pub fn visit(&mut self, x: i32, y: i32) {
        if let Some(key) = self.cell_key(x, y) {
            self.visited.insert(key);
        }
    }

    #[must_use]
    pub fn is_visited(&self, x: i32, y: i32) -> bool {
        self.cell_key(x, y)
            .is_some_and(|key| self.visited.contains(&key))
    }

    pub fn clear_visited(&mut self) {
        self.visited.clear();
    }

    /// Number of distinct cells explored since the last clear.
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
