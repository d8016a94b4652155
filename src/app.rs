//! App: terminal init, main loop, tick scheduling, key and mouse handling.

use crate::game::{FailReason, MatchOutcome, Screen, Session, TickOutcome};
use crate::grid::Pos;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, HarvestFlash};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use log::{debug, trace};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::io::Write;
use std::time::{Duration, Instant};

/// Adapter options that do not affect game rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppConfig {
    /// Go straight to Playing instead of showing the Start screen.
    pub no_menu: bool,
    pub no_animation: bool,
    /// Ring the terminal bell on success, fail and game over.
    pub bell: bool,
}

/// Presentation cue for an engine event; stands in for the sound effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Success,
    Fail,
    GameOver,
}

/// Cue to play for a selection outcome, if any.
pub fn cue_for(outcome: MatchOutcome) -> Option<Cue> {
    match outcome {
        MatchOutcome::Success(..) => Some(Cue::Success),
        MatchOutcome::Fail(_) => Some(Cue::Fail),
        MatchOutcome::Pending(_) | MatchOutcome::NoOp => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: AppConfig,
    theme: Theme,
    session: Session,
    cursor: Pos,
    status: Option<String>,
    flash: Option<HarvestFlash>,
    last_tick: Instant,
    /// Cues raised since the last frame.
    cues: Vec<Cue>,
    /// Terminal area of the last frame; used to map mouse clicks onto the board.
    last_area: Rect,
}

impl App {
    pub fn new(session: Session, theme: Theme, config: AppConfig) -> Result<Self> {
        let mut app = Self {
            config,
            theme,
            session,
            cursor: Pos::new(0, 0),
            status: None,
            flash: None,
            last_tick: Instant::now(),
            cues: Vec::new(),
            last_area: Rect::default(),
        };
        if config.no_menu {
            app.start()?;
        }
        Ok(app)
    }

    fn start(&mut self) -> Result<()> {
        self.session.start()?;
        self.last_tick = Instant::now();
        self.status = Some("Match ripe pairs!".into());
        Ok(())
    }

    fn restart(&mut self) -> Result<()> {
        self.session.restart()?;
        self.cursor = Pos::new(0, 0);
        self.flash = None;
        self.status = None;
        if self.config.no_menu {
            self.start()?;
        }
        Ok(())
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) {
        let max = self.session.grid().size() - 1;
        self.cursor = Pos::new(
            self.cursor.x.saturating_add_signed(dx).min(max),
            self.cursor.y.saturating_add_signed(dy).min(max),
        );
    }

    fn handle_action(&mut self, action: Action) -> Result<Flow> {
        if action == Action::Quit {
            return Ok(Flow::Quit);
        }
        match self.session.state().screen {
            Screen::Start => {
                if action == Action::Select {
                    self.start()?;
                }
            }
            Screen::Playing => match action {
                Action::Up => self.move_cursor(0, -1),
                Action::Down => self.move_cursor(0, 1),
                Action::Left => self.move_cursor(-1, 0),
                Action::Right => self.move_cursor(1, 0),
                Action::Select => self.select(self.cursor)?,
                _ => {}
            },
            Screen::GameOver => {
                if action == Action::Restart {
                    self.restart()?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left)
            || self.session.state().screen != Screen::Playing
        {
            return Ok(());
        }
        let size = self.session.grid().size();
        if let Some(pos) = ui::board_cell_at(self.last_area, size, mouse.column, mouse.row) {
            self.cursor = pos;
            self.select(pos)?;
        }
        Ok(())
    }

    fn select(&mut self, pos: Pos) -> Result<()> {
        let score_before = self.session.state().score;
        let outcome = self.session.select_cell(pos.x, pos.y)?;
        let state = self.session.state();
        let message = match outcome {
            MatchOutcome::NoOp => None,
            MatchOutcome::Pending(_) => Some("Pick its partner".to_string()),
            MatchOutcome::Success(a, b) => {
                if !self.config.no_animation {
                    self.flash = Some(HarvestFlash::new(vec![a, b]));
                }
                Some(format!(
                    "+{} (combo {})",
                    state.score - score_before,
                    state.combo
                ))
            }
            MatchOutcome::Fail(FailReason::Immature) => Some("Not ripe yet".to_string()),
            MatchOutcome::Fail(FailReason::SameCell) => Some("Pick a different plot".to_string()),
            MatchOutcome::Fail(FailReason::Mismatch) => Some("Crops don't match".to_string()),
        };
        if message.is_some() {
            self.status = message;
        }
        if let Some(cue) = cue_for(outcome) {
            self.cues.push(cue);
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        match self.session.tick() {
            TickOutcome::GameOver => {
                self.flash = None;
                self.status = Some("Time's up!".into());
                self.cues.push(Cue::GameOver);
            }
            TickOutcome::Counted { remaining } => trace!("{}s left", remaining),
            TickOutcome::Idle => {}
        }
    }

    /// Run one engine tick per elapsed interval while playing.
    fn drive_ticks(&mut self, now: Instant) {
        if self.session.state().screen != Screen::Playing {
            self.last_tick = now;
            return;
        }
        let interval = self.session.config().tick_interval;
        while self.session.state().screen == Screen::Playing
            && now.saturating_duration_since(self.last_tick) >= interval
        {
            self.last_tick += interval;
            self.on_tick();
        }
    }

    fn play_cues(&mut self) -> Result<()> {
        if self.cues.is_empty() {
            return Ok(());
        }
        debug!("cues: {:?}", self.cues);
        if self.config.bell {
            let mut stdout = std::io::stdout();
            stdout.write_all(b"\x07")?;
            stdout.flush()?;
        }
        self.cues.clear();
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            if self.flash.as_ref().is_some_and(HarvestFlash::done) {
                self.flash = None;
            }
            terminal.draw(|f| {
                self.last_area = f.area();
                ui::draw(
                    f,
                    &self.session,
                    &self.theme,
                    self.cursor,
                    self.status.as_deref(),
                    self.flash.as_mut(),
                    now,
                );
            })?;
            self.play_cues()?;

            // ~60 FPS
            let frame_duration = Duration::from_millis(16);
            let timeout = frame_duration.saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if self.handle_action(key_to_action(key))? == Flow::Quit {
                                return Ok(());
                            }
                        }
                        Event::Mouse(mouse) => self.handle_mouse(mouse)?,
                        _ => {}
                    }
                }
            }

            self.drive_ticks(Instant::now());
        }
    }
}
