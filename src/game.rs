//! Game session: grid, selection, scoring, countdown and screen transitions.

use crate::crops::{CropKind, CropTable};
use crate::grid::{Cell, Grid, Pos};
use log::{debug, info};
use rand::Rng;
use rand::rngs::StdRng;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GRID_SIZE: usize = 5;
pub const DEFAULT_TIME_LIMIT: u32 = 30;
/// Cells left unplanted when a session starts.
pub const DEFAULT_EMPTY_CELLS: usize = 5;
pub const DEFAULT_TICK_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("cell ({x}, {y}) is outside the {size}x{size} grid")]
    OutOfBounds { x: usize, y: usize, size: usize },
    #[error("cannot switch from {from:?} to {to:?}")]
    InvalidTransition { from: Screen, to: Screen },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Start,
    Playing,
    GameOver,
}

/// Why a selection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// Target crop has not finished growing.
    Immature,
    /// Target is the cell already selected.
    SameCell,
    /// Target kind differs from the selected kind.
    Mismatch,
}

/// Result of selecting a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Nothing happened (empty cell, or not playing).
    NoOp,
    /// First half of a pair chosen.
    Pending(Pos),
    Fail(FailReason),
    /// Pair of matching mature crops: (first, second).
    Success(Pos, Pos),
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing changed.
    Idle,
    Counted { remaining: u32 },
    /// The countdown ran out on this tick.
    GameOver,
}

/// Points earned by a harvested pair and where replacements sprouted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harvest {
    pub kind: Option<CropKind>,
    pub points: u32,
    /// Cells planted by the two spawn attempts (fewer than two when the grid was nearly full).
    pub spawned: Vec<Pos>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub score: u32,
    /// Consecutive successful pairs; reset by any failed attempt.
    pub combo: u32,
    pub remaining_time: u32,
    pub screen: Screen,
}

impl SessionState {
    fn fresh(initial_time: u32) -> Self {
        Self {
            score: 0,
            combo: 0,
            remaining_time: initial_time,
            screen: Screen::Start,
        }
    }
}

/// Static parameters of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub grid_size: usize,
    /// Countdown start, in ticks.
    pub initial_time: u32,
    pub crops: CropTable,
    pub empty_cells: usize,
    /// How often the driver should call [`Session::tick`].
    pub tick_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            initial_time: DEFAULT_TIME_LIMIT,
            crops: CropTable::standard(),
            empty_cells: DEFAULT_EMPTY_CELLS,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.grid_size == 0 {
            return Err(EngineError::InvalidConfig("grid size must be positive".into()));
        }
        let cells = self.grid_size * self.grid_size;
        if self.empty_cells > cells {
            return Err(EngineError::InvalidConfig(format!(
                "{} empty cells requested but the grid only has {}",
                self.empty_cells, cells
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(EngineError::InvalidConfig("tick interval must be positive".into()));
        }
        Ok(())
    }
}

/// Pure selection rule: given the pending selection and a target, returns the new
/// selection and the outcome. `pos` must be inside the grid.
pub fn evaluate_selection(
    grid: &Grid,
    crops: &CropTable,
    selection: Option<Pos>,
    pos: Pos,
) -> (Option<Pos>, MatchOutcome) {
    let (kind, growth) = match grid.get(pos) {
        Some(Cell::Planted { kind, growth }) => (kind, growth),
        _ => return (selection, MatchOutcome::NoOp),
    };
    if !crops.is_mature(kind, growth) {
        return (None, MatchOutcome::Fail(FailReason::Immature));
    }
    let Some(first) = selection else {
        return (Some(pos), MatchOutcome::Pending(pos));
    };
    if first == pos {
        return (None, MatchOutcome::Fail(FailReason::SameCell));
    }
    match grid.get(first).and_then(|c| c.kind()) {
        Some(k) if k == kind => (None, MatchOutcome::Success(first, pos)),
        _ => (None, MatchOutcome::Fail(FailReason::Mismatch)),
    }
}

/// One player's game: owns the grid, counters, pending selection and random source.
#[derive(Debug, Clone)]
pub struct Session<R: Rng = StdRng> {
    config: SessionConfig,
    grid: Grid,
    state: SessionState,
    selection: Option<Pos>,
    rng: R,
}

impl<R: Rng> Session<R> {
    /// Build a session on the Start screen with a freshly planted grid.
    pub fn new(config: SessionConfig, mut rng: R) -> Result<Self, EngineError> {
        config.validate()?;
        let grid = plant_initial(&config, &mut rng);
        let state = SessionState::fresh(config.initial_time);
        info!(
            "new session: {}x{} grid, {} planted, {}s",
            config.grid_size,
            config.grid_size,
            grid.occupied_count(),
            config.initial_time
        );
        Ok(Self {
            config,
            grid,
            state,
            selection: None,
            rng,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn crops(&self) -> &CropTable {
        &self.config.crops
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn selection(&self) -> Option<Pos> {
        self.selection
    }

    pub fn is_mature(&self, pos: Pos) -> bool {
        match self.grid.get(pos) {
            Some(Cell::Planted { kind, growth }) => self.config.crops.is_mature(kind, growth),
            _ => false,
        }
    }

    /// Start -> Playing.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.transition(Screen::Start, Screen::Playing)?;
        info!("session started");
        Ok(())
    }

    /// GameOver -> Start, with a new grid and zeroed counters.
    pub fn restart(&mut self) -> Result<(), EngineError> {
        self.transition(Screen::GameOver, Screen::Start)?;
        self.grid = plant_initial(&self.config, &mut self.rng);
        self.state = SessionState::fresh(self.config.initial_time);
        self.selection = None;
        info!("session reset");
        Ok(())
    }

    fn transition(&mut self, from: Screen, to: Screen) -> Result<(), EngineError> {
        if self.state.screen != from {
            return Err(EngineError::InvalidTransition {
                from: self.state.screen,
                to,
            });
        }
        self.state.screen = to;
        Ok(())
    }

    fn check_bounds(&self, x: usize, y: usize) -> Result<Pos, EngineError> {
        let pos = Pos::new(x, y);
        if self.grid.contains(pos) {
            Ok(pos)
        } else {
            Err(EngineError::OutOfBounds {
                x,
                y,
                size: self.grid.size(),
            })
        }
    }

    /// Select the cell at column `x`, row `y` and apply the resulting success or failure.
    pub fn select_cell(&mut self, x: usize, y: usize) -> Result<MatchOutcome, EngineError> {
        let pos = self.check_bounds(x, y)?;
        if self.state.screen != Screen::Playing {
            return Ok(MatchOutcome::NoOp);
        }
        let (selection, outcome) =
            evaluate_selection(&self.grid, &self.config.crops, self.selection, pos);
        self.selection = selection;
        match outcome {
            MatchOutcome::Success(a, b) => {
                self.apply_success(a, b);
            }
            MatchOutcome::Fail(reason) => {
                debug!("pair failed at ({}, {}): {:?}", x, y, reason);
                self.apply_fail();
            }
            MatchOutcome::Pending(_) => debug!("selected ({}, {})", x, y),
            MatchOutcome::NoOp => {}
        }
        Ok(outcome)
    }

    /// Score the pair, bump the combo, clear both cells and make two spawn attempts.
    pub fn apply_success(&mut self, a: Pos, b: Pos) -> Harvest {
        let kind = self
            .grid
            .get(a)
            .and_then(|c| c.kind())
            .or_else(|| self.grid.get(b).and_then(|c| c.kind()));
        let value = kind
            .and_then(|k| self.config.crops.get(k))
            .map_or(0, |d| d.harvest_value);
        let points = value.saturating_mul(self.state.combo.saturating_add(1));
        self.state.score = self.state.score.saturating_add(points);
        self.state.combo = self.state.combo.saturating_add(1);
        self.grid.clear(a);
        self.grid.clear(b);
        let spawned: Vec<Pos> = (0..2)
            .filter_map(|_| self.grid.spawn_random(&self.config.crops, &mut self.rng))
            .collect();
        self.selection = None;
        debug!(
            "harvested {:?} for {} (combo {}), {} new crops",
            kind,
            points,
            self.state.combo,
            spawned.len()
        );
        Harvest {
            kind,
            points,
            spawned,
        }
    }

    /// Break the combo and drop any pending selection.
    pub fn apply_fail(&mut self) {
        self.state.combo = 0;
        self.selection = None;
    }

    /// Advance one tick: grow every crop, then count down. Reaching zero ends the game.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state.screen != Screen::Playing {
            return TickOutcome::Idle;
        }
        self.grid.grow(&self.config.crops);
        self.state.remaining_time = self.state.remaining_time.saturating_sub(1);
        if self.state.remaining_time == 0 {
            self.state.screen = Screen::GameOver;
            self.selection = None;
            info!("time up, final score {}", self.state.score);
            return TickOutcome::GameOver;
        }
        TickOutcome::Counted {
            remaining: self.state.remaining_time,
        }
    }
}

fn plant_initial<R: Rng + ?Sized>(config: &SessionConfig, rng: &mut R) -> Grid {
    let mut grid = Grid::new(config.grid_size);
    let spawns = config.grid_size * config.grid_size - config.empty_cells;
    for _ in 0..spawns {
        grid.spawn_random(&config.crops, rng);
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crops::CropDefinition;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn config(grid_size: usize, crops: CropTable) -> SessionConfig {
        SessionConfig {
            grid_size,
            empty_cells: grid_size * grid_size,
            crops,
            ..SessionConfig::default()
        }
    }

    fn single_crop(growth_ticks: u32, harvest_value: u32) -> CropTable {
        CropTable::new(vec![CropDefinition::new(
            CropKind::Turnip,
            growth_ticks,
            harvest_value,
        )])
        .unwrap()
    }

    fn playing(config: SessionConfig) -> Session {
        let mut session = Session::new(config, rng()).unwrap();
        session.start().unwrap();
        session
    }

    fn put(session: &mut Session, x: usize, y: usize, kind: CropKind, growth: u32) {
        session.grid.set(Pos::new(x, y), Cell::Planted { kind, growth });
    }

    #[test]
    fn test_new_session_plants_all_but_empty_cells() {
        let session = Session::new(SessionConfig::default(), rng()).unwrap();
        assert_eq!(session.grid().occupied_count(), 20);
        assert_eq!(session.state().screen, Screen::Start);
        assert_eq!(session.state().remaining_time, 30);
        assert_eq!(session.state().score, 0);
        assert_eq!(session.selection(), None);
        assert!(
            session
                .grid()
                .iter_cells()
                .all(|(_, c)| matches!(c, Cell::Empty | Cell::Planted { growth: 0, .. }))
        );
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = Session::new(SessionConfig::default(), rng()).unwrap();
        let b = Session::new(SessionConfig::default(), rng()).unwrap();
        assert_eq!(a.grid(), b.grid());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let too_many_empty = SessionConfig {
            empty_cells: 26,
            ..SessionConfig::default()
        };
        assert!(matches!(
            Session::new(too_many_empty, rng()),
            Err(EngineError::InvalidConfig(_))
        ));
        let zero = SessionConfig {
            grid_size: 0,
            empty_cells: 0,
            ..SessionConfig::default()
        };
        assert!(Session::new(zero, rng()).is_err());
    }

    #[test]
    fn test_select_out_of_bounds_is_error() {
        let mut session = playing(SessionConfig::default());
        assert_eq!(
            session.select_cell(5, 0),
            Err(EngineError::OutOfBounds { x: 5, y: 0, size: 5 })
        );
    }

    #[test]
    fn test_select_while_not_playing_is_noop() {
        let mut session = Session::new(config(2, single_crop(1, 5)), rng()).unwrap();
        put(&mut session, 0, 0, CropKind::Turnip, 1);
        assert_eq!(session.select_cell(0, 0), Ok(MatchOutcome::NoOp));
        assert_eq!(session.selection(), None);
    }

    #[test]
    fn test_empty_cell_keeps_selection() {
        let mut session = playing(config(2, single_crop(1, 5)));
        put(&mut session, 0, 0, CropKind::Turnip, 1);
        session.select_cell(0, 0).unwrap();
        assert_eq!(session.select_cell(1, 1), Ok(MatchOutcome::NoOp));
        assert_eq!(session.selection(), Some(Pos::new(0, 0)));
    }

    #[test]
    fn test_immature_and_same_cell_scenario() {
        let mut session = playing(config(2, single_crop(1, 5)));
        put(&mut session, 0, 0, CropKind::Turnip, 1);
        put(&mut session, 0, 1, CropKind::Turnip, 0);

        assert_eq!(
            session.select_cell(0, 0),
            Ok(MatchOutcome::Pending(Pos::new(0, 0)))
        );
        assert_eq!(session.selection(), Some(Pos::new(0, 0)));

        assert_eq!(
            session.select_cell(0, 1),
            Ok(MatchOutcome::Fail(FailReason::Immature))
        );
        assert_eq!(session.selection(), None);

        assert_eq!(
            session.select_cell(0, 0),
            Ok(MatchOutcome::Pending(Pos::new(0, 0)))
        );
        assert_eq!(
            session.select_cell(0, 0),
            Ok(MatchOutcome::Fail(FailReason::SameCell))
        );
        assert_eq!(session.selection(), None);
    }

    #[test]
    fn test_immature_without_selection_breaks_combo() {
        let mut session = playing(config(2, single_crop(3, 5)));
        put(&mut session, 1, 0, CropKind::Turnip, 0);
        session.state.combo = 4;
        assert_eq!(
            session.select_cell(1, 0),
            Ok(MatchOutcome::Fail(FailReason::Immature))
        );
        assert_eq!(session.state().combo, 0);
    }

    #[test]
    fn test_success_scores_with_combo() {
        let crops = single_crop(1, 10);
        let mut session = playing(config(2, crops));
        put(&mut session, 0, 0, CropKind::Turnip, 1);
        put(&mut session, 1, 1, CropKind::Turnip, 1);
        session.state.combo = 2;

        session.select_cell(0, 0).unwrap();
        assert_eq!(
            session.select_cell(1, 1),
            Ok(MatchOutcome::Success(Pos::new(0, 0), Pos::new(1, 1)))
        );
        assert_eq!(session.state().score, 30);
        assert_eq!(session.state().combo, 3);
        assert_eq!(session.selection(), None);
        // both cleared cells were empty again before the two spawns; 4 cells, 2 spawned
        assert_eq!(session.grid().occupied_count(), 2);
        assert!(
            session
                .grid()
                .iter_cells()
                .all(|(_, c)| matches!(c, Cell::Empty | Cell::Planted { growth: 0, .. }))
        );
    }

    #[test]
    fn test_mismatch_fails() {
        let crops = CropTable::new(vec![
            CropDefinition::new(CropKind::Turnip, 1, 10),
            CropDefinition::new(CropKind::Apple, 1, 20),
        ])
        .unwrap();
        let mut session = playing(config(2, crops));
        put(&mut session, 0, 0, CropKind::Turnip, 1);
        put(&mut session, 1, 0, CropKind::Apple, 1);
        session.state.combo = 1;
        session.select_cell(0, 0).unwrap();
        assert_eq!(
            session.select_cell(1, 0),
            Ok(MatchOutcome::Fail(FailReason::Mismatch))
        );
        assert_eq!(session.state().combo, 0);
        assert_eq!(session.state().score, 0);
    }

    #[test]
    fn test_apply_success_on_full_grid_spawns_into_cleared_cells() {
        let mut session = playing(config(2, single_crop(1, 5)));
        for y in 0..2 {
            for x in 0..2 {
                put(&mut session, x, y, CropKind::Turnip, 1);
            }
        }
        let harvest = session.apply_success(Pos::new(0, 0), Pos::new(1, 0));
        assert_eq!(harvest.points, 5);
        assert_eq!(harvest.spawned.len(), 2);
        let mut spawned = harvest.spawned.clone();
        spawned.sort_by_key(|p| (p.y, p.x));
        assert_eq!(spawned, vec![Pos::new(0, 0), Pos::new(1, 0)]);
        assert_eq!(session.grid().occupied_count(), 4);
    }

    #[test]
    fn test_spawn_on_full_grid_is_silent() {
        let crops = single_crop(1, 5);
        let mut grid = Grid::new(1);
        let mut r = rng();
        assert!(grid.spawn_random(&crops, &mut r).is_some());
        assert_eq!(grid.spawn_random(&crops, &mut r), None);
    }

    #[test]
    fn test_tick_grows_and_counts_down() {
        let mut session = playing(config(2, single_crop(3, 5)));
        put(&mut session, 0, 0, CropKind::Turnip, 0);
        assert_eq!(session.tick(), TickOutcome::Counted { remaining: 29 });
        assert_eq!(
            session.grid().get(Pos::new(0, 0)),
            Some(Cell::Planted { kind: CropKind::Turnip, growth: 1 })
        );
        assert_eq!(session.grid().get(Pos::new(1, 1)), Some(Cell::Empty));
    }

    #[test]
    fn test_tick_is_idle_outside_playing() {
        let mut session = Session::new(config(2, single_crop(3, 5)), rng()).unwrap();
        put(&mut session, 0, 0, CropKind::Turnip, 0);
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert_eq!(session.state().remaining_time, 30);
        assert_eq!(
            session.grid().get(Pos::new(0, 0)),
            Some(Cell::Planted { kind: CropKind::Turnip, growth: 0 })
        );
    }

    #[test]
    fn test_terminal_tick_still_grows() {
        let mut session = playing(SessionConfig {
            initial_time: 1,
            ..config(2, single_crop(3, 5))
        });
        put(&mut session, 0, 0, CropKind::Turnip, 0);
        assert_eq!(session.tick(), TickOutcome::GameOver);
        assert_eq!(session.state().screen, Screen::GameOver);
        assert_eq!(session.state().remaining_time, 0);
        assert_eq!(
            session.grid().get(Pos::new(0, 0)),
            Some(Cell::Planted { kind: CropKind::Turnip, growth: 1 })
        );
        assert_eq!(session.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_zero_time_ends_on_first_tick() {
        let mut session = playing(SessionConfig {
            initial_time: 0,
            ..SessionConfig::default()
        });
        assert_eq!(session.tick(), TickOutcome::GameOver);
        assert_eq!(session.state().remaining_time, 0);
    }

    #[test]
    fn test_countdown_round_trip() {
        let mut session = playing(SessionConfig::default());
        for _ in 0..DEFAULT_TIME_LIMIT {
            session.tick();
        }
        assert_eq!(session.state().remaining_time, 0);
        assert_eq!(session.state().screen, Screen::GameOver);
    }

    #[test]
    fn test_screen_transitions() {
        let mut session = Session::new(SessionConfig::default(), rng()).unwrap();
        assert_eq!(
            session.restart(),
            Err(EngineError::InvalidTransition {
                from: Screen::Start,
                to: Screen::Start
            })
        );
        session.start().unwrap();
        assert!(session.start().is_err());
        assert!(session.restart().is_err());
        for _ in 0..DEFAULT_TIME_LIMIT {
            session.tick();
        }
        assert!(session.start().is_err());
        session.restart().unwrap();
        assert_eq!(session.state().screen, Screen::Start);
        assert_eq!(session.state().remaining_time, DEFAULT_TIME_LIMIT);
        assert_eq!(session.grid().occupied_count(), 20);
    }

    #[test]
    fn test_restart_clears_score_and_combo() {
        let mut session = playing(config(2, single_crop(1, 10)));
        put(&mut session, 0, 0, CropKind::Turnip, 1);
        put(&mut session, 1, 0, CropKind::Turnip, 1);
        session.select_cell(0, 0).unwrap();
        session.select_cell(1, 0).unwrap();
        assert!(session.state().score > 0);
        for _ in 0..DEFAULT_TIME_LIMIT {
            session.tick();
        }
        session.restart().unwrap();
        assert_eq!(session.state().score, 0);
        assert_eq!(session.state().combo, 0);
    }

    #[test]
    fn test_score_and_combo_invariants_over_random_play() {
        let mut session = playing(SessionConfig {
            initial_time: 500,
            ..SessionConfig::default()
        });
        let mut picker = StdRng::seed_from_u64(9);
        let mut last_score = 0;
        for step in 0..400 {
            if step % 3 == 0 {
                session.tick();
            }
            let combo_before = session.state().combo;
            let x = picker.random_range(0..5);
            let y = picker.random_range(0..5);
            let outcome = session.select_cell(x, y).unwrap();
            let state = *session.state();
            assert!(state.score >= last_score);
            last_score = state.score;
            match outcome {
                MatchOutcome::Success(..) => assert_eq!(state.combo, combo_before + 1),
                MatchOutcome::Fail(_) => {
                    assert_eq!(state.combo, 0);
                    assert_eq!(session.selection(), None);
                }
                MatchOutcome::Pending(p) => assert_eq!(session.selection(), Some(p)),
                MatchOutcome::NoOp => assert_eq!(state.combo, combo_before),
            }
        }
    }
}
