//! Elitist behavior archive (the MAP-Elites performance map).
//!
//! Each grid cell keeps the best controller seen for behaviors falling in it.
//! Cells are remembered in first-insertion order, which fixes iteration order
//! for sampling, export and adaptation.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schema::{Behavior, Cell, Controller, GridConfig};

use super::fitness::{Evaluation, MAX_GENE_VARIANCE};
use super::mutation::ControllerRng;

/// Archive errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Cannot sample from an empty archive")]
    Empty,
    #[error("Behavior {0:?} lies outside the grid span")]
    OutOfGrid(Behavior),
    #[error("Grid needs a positive resolution and span, got {resolution} bins over {span}")]
    InvalidGrid { resolution: usize, span: f64 },
    #[error("Entry stored in cell {stored:?} but its behavior maps to {expected:?}")]
    CellMismatch { stored: Cell, expected: Cell },
    #[error("Archive I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Archive JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Square grid over [-span, span]^2 with `resolution` bins per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    resolution: usize,
    span: f64,
}

impl Grid {
    pub fn new(resolution: usize, span: f64) -> Self {
        Self { resolution, span }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.resolution, config.span)
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn span(&self) -> f64 {
        self.span
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.resolution * self.resolution
    }

    /// Reject grids with no bins or no extent.
    pub fn validate(&self) -> Result<(), ArchiveError> {
        if self.resolution == 0 || !(self.span > 0.0) {
            return Err(ArchiveError::InvalidGrid {
                resolution: self.resolution,
                span: self.span,
            });
        }
        Ok(())
    }

    /// Map a behavior to its cell.
    ///
    /// Behaviors outside the span are rejected. A behavior exactly on the
    /// upper edge falls into the last bin.
    pub fn discretize(&self, behavior: &Behavior) -> Result<Cell, ArchiveError> {
        match (self.bin(behavior.x), self.bin(behavior.y)) {
            (Some(x), Some(y)) => Ok(Cell::new(x, y)),
            _ => Err(ArchiveError::OutOfGrid(*behavior)),
        }
    }

    fn bin(&self, value: f64) -> Option<usize> {
        if self.resolution == 0 || !(self.span > 0.0) {
            return None;
        }
        let scaled = (value + self.span) / (2.0 * self.span) * self.resolution as f64;
        if !(0.0..=self.resolution as f64).contains(&scaled) {
            return None;
        }
        Some((scaled.floor() as usize).min(self.resolution - 1))
    }

    /// Behavior at the center of a cell.
    pub fn cell_center(&self, cell: Cell) -> Behavior {
        let width = 2.0 * self.span / self.resolution as f64;
        Behavior::new(
            -self.span + (cell.x as f64 + 0.5) * width,
            -self.span + (cell.y as f64 + 0.5) * width,
        )
    }
}

/// Best controller found for a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub controller: Controller,
    pub behavior: Behavior,
    pub performance: f64,
}

/// Summary statistics of the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub filled: usize,
    pub coverage: f64,
    pub best_performance: f64,
    pub mean_performance: f64,
    /// Sum of performances shifted to be non-negative.
    pub qd_score: f64,
}

/// Elitist archive keyed by grid cell.
#[derive(Debug, Clone)]
pub struct Archive {
    grid: Grid,
    entries: HashMap<Cell, ArchiveEntry>,
    /// Every cell ever filled, in first-insertion order.
    known: Vec<Cell>,
}

impl Archive {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            entries: HashMap::new(),
            known: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Entry stored for `cell`, if any.
    pub fn lookup(&self, cell: Cell) -> Option<&ArchiveEntry> {
        self.entries.get(&cell)
    }

    /// Store the candidate if the cell is empty or it strictly beats the
    /// current entry. Returns whether the archive changed.
    pub fn insert_if_better(
        &mut self,
        cell: Cell,
        controller: Controller,
        behavior: Behavior,
        performance: f64,
    ) -> bool {
        match self.entries.get_mut(&cell) {
            None => {
                self.known.push(cell);
                self.entries.insert(
                    cell,
                    ArchiveEntry {
                        controller,
                        behavior,
                        performance,
                    },
                );
                true
            }
            Some(existing) if performance > existing.performance => {
                *existing = ArchiveEntry {
                    controller,
                    behavior,
                    performance,
                };
                true
            }
            _ => false,
        }
    }

    /// Discretize an evaluation and offer it to the archive.
    pub fn offer(&mut self, evaluation: Evaluation) -> Result<bool, ArchiveError> {
        let cell = self.grid.discretize(&evaluation.behavior)?;
        Ok(self.insert_if_better(
            cell,
            evaluation.controller,
            evaluation.behavior,
            evaluation.performance,
        ))
    }

    /// Uniformly random filled cell.
    pub fn sample_random_known_cell(&self, rng: &mut ControllerRng) -> Result<Cell, ArchiveError> {
        if self.known.is_empty() {
            return Err(ArchiveError::Empty);
        }
        Ok(self.known[rng.pick_index(self.known.len())])
    }

    /// Entry of a uniformly random filled cell.
    pub fn sample_random_entry(
        &self,
        rng: &mut ControllerRng,
    ) -> Result<&ArchiveEntry, ArchiveError> {
        let cell = self.sample_random_known_cell(rng)?;
        Ok(&self.entries[&cell])
    }

    /// Filled cells in first-insertion order.
    pub fn known_cells(&self) -> &[Cell] {
        &self.known
    }

    /// Entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, &ArchiveEntry)> {
        self.known.iter().map(|cell| (*cell, &self.entries[cell]))
    }

    /// Fold another archive into this one with the same elitist rule.
    /// Returns the number of cells that changed.
    pub fn merge(&mut self, other: &Archive) -> usize {
        other
            .iter()
            .filter(|(cell, entry)| {
                self.insert_if_better(
                    *cell,
                    entry.controller.clone(),
                    entry.behavior,
                    entry.performance,
                )
            })
            .count()
    }

    /// Entry with the highest performance. Ties keep the earliest cell.
    pub fn best(&self) -> Option<(Cell, &ArchiveEntry)> {
        self.iter().fold(None, |best, (cell, entry)| match best {
            Some((_, b)) if b.performance >= entry.performance => best,
            _ => Some((cell, entry)),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fraction of grid cells that are filled.
    pub fn coverage(&self) -> f64 {
        match self.grid.cell_count() {
            0 => 0.0,
            cells => self.len() as f64 / cells as f64,
        }
    }

    pub fn stats(&self) -> ArchiveStats {
        let filled = self.len();
        let total: f64 = self.entries.values().map(|e| e.performance).sum();
        let best_performance = self
            .entries
            .values()
            .map(|e| e.performance)
            .fold(f64::NEG_INFINITY, f64::max);

        ArchiveStats {
            filled,
            coverage: self.coverage(),
            best_performance,
            mean_performance: if filled > 0 {
                total / filled as f64
            } else {
                0.0
            },
            qd_score: total + MAX_GENE_VARIANCE * filled as f64,
        }
    }

    /// Write the archive as JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ArchiveError> {
        let export = ArchiveExport {
            grid: self.grid,
            entries: self
                .iter()
                .map(|(cell, entry)| ExportedEntry {
                    cell,
                    entry: entry.clone(),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&export)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read an archive written by [`Archive::save_json`].
    ///
    /// Every entry must sit in the cell its behavior discretizes to.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let content = fs::read_to_string(path)?;
        let export: ArchiveExport = serde_json::from_str(&content)?;
        export.grid.validate()?;

        let mut archive = Self::new(export.grid);
        for ExportedEntry { cell, entry } in export.entries {
            let expected = archive.grid.discretize(&entry.behavior)?;
            if expected != cell {
                return Err(ArchiveError::CellMismatch {
                    stored: cell,
                    expected,
                });
            }
            archive.insert_if_better(cell, entry.controller, entry.behavior, entry.performance);
        }
        Ok(archive)
    }
}

/// On-disk archive format.
#[derive(Debug, Serialize, Deserialize)]
struct ArchiveExport {
    grid: Grid,
    entries: Vec<ExportedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExportedEntry {
    cell: Cell,
    #[serde(flatten)]
    entry: ArchiveEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn grid() -> Grid {
        Grid::new(200, 0.7)
    }

    fn entry_args(value: f64) -> (Controller, Behavior) {
        (Controller::uniform(8, value), Behavior::new(value, value))
    }

    #[test]
    fn test_discretize_reference_points() {
        let grid = grid();
        assert_eq!(
            grid.discretize(&Behavior::new(0.0, 0.0)).unwrap(),
            Cell::new(100, 100)
        );
        assert_eq!(
            grid.discretize(&Behavior::new(-0.7, -0.7)).unwrap(),
            Cell::new(0, 0)
        );
        assert_eq!(
            grid.discretize(&Behavior::new(0.7, 0.7)).unwrap(),
            Cell::new(199, 199)
        );
    }

    #[test]
    fn test_discretize_rejects_out_of_span() {
        let grid = grid();
        assert!(matches!(
            grid.discretize(&Behavior::new(0.71, 0.0)),
            Err(ArchiveError::OutOfGrid(_))
        ));
        assert!(grid.discretize(&Behavior::new(0.0, f64::NAN)).is_err());
    }

    #[test]
    fn test_cell_center_round_trips() {
        let grid = grid();
        let cell = Cell::new(37, 150);
        assert_eq!(grid.discretize(&grid.cell_center(cell)).unwrap(), cell);
    }

    #[test]
    fn test_insert_if_better() {
        let mut archive = Archive::new(grid());
        let cell = Cell::new(3, 4);

        let (c, b) = entry_args(0.1);
        assert!(archive.insert_if_better(cell, c, b, -0.2));

        let (c, b) = entry_args(0.2);
        assert!(!archive.insert_if_better(cell, c, b, -0.3));
        assert_eq!(archive.lookup(cell).unwrap().performance, -0.2);

        // Ties keep the earlier entry.
        let (c, b) = entry_args(0.3);
        assert!(!archive.insert_if_better(cell, c, b, -0.2));
        assert_eq!(archive.lookup(cell).unwrap().controller, Controller::uniform(8, 0.1));

        let (c, b) = entry_args(0.4);
        assert!(archive.insert_if_better(cell, c, b, -0.1));
        assert_eq!(archive.lookup(cell).unwrap().controller, Controller::uniform(8, 0.4));

        assert_eq!(archive.len(), 1);
        assert_eq!(archive.known_cells(), &[cell]);
    }

    #[test]
    fn test_sample_empty_archive_fails() {
        let archive = Archive::new(grid());
        let mut rng = ControllerRng::new(0);
        assert!(matches!(
            archive.sample_random_known_cell(&mut rng),
            Err(ArchiveError::Empty)
        ));
    }

    #[test]
    fn test_sample_returns_known_cells() {
        let mut archive = Archive::new(grid());
        for i in 0..5 {
            let (c, b) = entry_args(0.1);
            archive.insert_if_better(Cell::new(i, i), c, b, 0.0);
        }
        let mut rng = ControllerRng::new(11);
        for _ in 0..50 {
            let cell = archive.sample_random_known_cell(&mut rng).unwrap();
            assert!(archive.lookup(cell).is_some());
        }
    }

    #[test]
    fn test_best_and_stats() {
        let mut archive = Archive::new(grid());
        let (c, b) = entry_args(0.1);
        archive.insert_if_better(Cell::new(0, 0), c, b, -0.1);
        let (c, b) = entry_args(0.2);
        archive.insert_if_better(Cell::new(1, 0), c, b, -0.05);

        let (cell, entry) = archive.best().unwrap();
        assert_eq!(cell, Cell::new(1, 0));
        assert_eq!(entry.performance, -0.05);

        let stats = archive.stats();
        assert_eq!(stats.filled, 2);
        assert!((stats.mean_performance + 0.075).abs() < 1e-12);
        assert!((stats.qd_score - 0.35).abs() < 1e-12);
        assert!((stats.coverage - 2.0 / 40_000.0).abs() < 1e-15);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let mut a = Archive::new(grid());
        let mut b = Archive::new(grid());
        let (c, beh) = entry_args(0.1);
        a.insert_if_better(Cell::new(0, 0), c, beh, -0.3);
        let (c, beh) = entry_args(0.2);
        b.insert_if_better(Cell::new(0, 0), c, beh, -0.1);
        let (c, beh) = entry_args(0.3);
        b.insert_if_better(Cell::new(5, 5), c, beh, -0.2);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        for cell in [Cell::new(0, 0), Cell::new(5, 5)] {
            assert_eq!(ab.lookup(cell), ba.lookup(cell));
        }
        assert_eq!(ab.lookup(Cell::new(0, 0)).unwrap().performance, -0.1);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archive.json");

        let mut archive = Archive::new(grid());
        for (value, performance) in [(0.25, -0.01), (-0.4, -0.02)] {
            let (c, b) = entry_args(value);
            let cell = archive.grid().discretize(&b).unwrap();
            archive.insert_if_better(cell, c, b, performance);
        }
        archive.save_json(&path).unwrap();

        let loaded = Archive::load_json(&path).unwrap();
        assert_eq!(loaded.grid(), archive.grid());
        assert_eq!(loaded.known_cells(), archive.known_cells());
        for (cell, entry) in archive.iter() {
            assert_eq!(loaded.lookup(cell), Some(entry));
        }
    }

    fn write_archive_json(dir: &Path, resolution: usize, cell: Cell) -> std::path::PathBuf {
        let path = dir.join("archive.json");
        let json = format!(
            r#"{{
                "grid": {{ "resolution": {resolution}, "span": 0.7 }},
                "entries": [{{
                    "cell": {{ "x": {}, "y": {} }},
                    "controller": [0.5, 0.5],
                    "behavior": {{ "x": 0.0, "y": 0.0 }},
                    "performance": 0.0
                }}]
            }}"#,
            cell.x, cell.y
        );
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_load_rejects_degenerate_grid() {
        let dir = tempdir().unwrap();
        let path = write_archive_json(dir.path(), 0, Cell::new(0, 0));
        assert!(matches!(
            Archive::load_json(&path),
            Err(ArchiveError::InvalidGrid { resolution: 0, .. })
        ));
    }

    #[test]
    fn test_load_rejects_misplaced_entry() {
        let dir = tempdir().unwrap();
        let path = write_archive_json(dir.path(), 200, Cell::new(9999, 3));
        match Archive::load_json(&path) {
            Err(ArchiveError::CellMismatch { stored, expected }) => {
                assert_eq!(stored, Cell::new(9999, 3));
                assert_eq!(expected, Cell::new(100, 100));
            }
            other => panic!("unexpected load result {other:?}"),
        }

        let path = write_archive_json(dir.path(), 200, Cell::new(100, 100));
        assert_eq!(Archive::load_json(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_degenerate_grid_never_panics() {
        let grid = Grid::new(0, 0.7);
        assert!(grid.validate().is_err());
        assert!(Grid::new(200, 0.0).validate().is_err());
        assert!(Grid::new(200, 0.7).validate().is_ok());
        assert!(matches!(
            grid.discretize(&Behavior::new(0.0, 0.0)),
            Err(ArchiveError::OutOfGrid(_))
        ));
        assert_eq!(Archive::new(grid).coverage(), 0.0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Archive::load_json(dir.path().join("missing.json")),
            Err(ArchiveError::Io(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_worse_or_equal_never_changes_entry(
            stored in -1.0f64..0.0,
            worse in 0.0f64..1.0,
        ) {
            let mut archive = Archive::new(grid());
            let cell = Cell::new(1, 1);
            let (c, b) = entry_args(0.1);
            archive.insert_if_better(cell, c, b, stored);
            let before = archive.lookup(cell).cloned();

            let (c, b) = entry_args(0.9);
            prop_assert!(!archive.insert_if_better(cell, c, b, stored - worse));
            prop_assert_eq!(archive.lookup(cell).cloned(), before);
        }

        #[test]
        fn prop_known_cells_match_entries(
            cells in prop::collection::vec((0usize..10, 0usize..10, -1.0f64..0.0), 0..100),
        ) {
            let mut archive = Archive::new(grid());
            for (x, y, performance) in cells {
                let (c, b) = entry_args(0.5);
                archive.insert_if_better(Cell::new(x, y), c, b, performance);
            }
            prop_assert_eq!(archive.known_cells().len(), archive.len());
            let mut known = archive.known_cells().to_vec();
            known.sort();
            known.dedup();
            prop_assert_eq!(known.len(), archive.len());
        }
    }
}
