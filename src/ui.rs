//! Layout and drawing: farm board, sidebar, start and game-over overlays, harvest flash.

use crate::game::{Screen, Session};
use crate::grid::{Cell, Pos};
use crate::theme::Theme;
use rand::Rng;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns/rows per farm plot (border + icon row).
pub const CELL_WIDTH: u16 = 7;
pub const CELL_HEIGHT: u16 = 3;

const SIDEBAR_WIDTH: u16 = 26;
/// Stats (4) + time (4) + crops (5) + status (3), with gaps.
const SIDEBAR_HEIGHT: u16 = 17;

/// Duration of the white flash over harvested plots.
const HARVEST_FLASH_MS: u32 = 350;

const TITLE: &str = " Crop Match ";
const OVERLAY_WIDTH: u16 = 33;

/// Harvested plots and their running TachyonFX effect.
pub struct HarvestFlash {
    pub cells: Vec<Pos>,
    pub effect: Option<Effect>,
    pub process_time: Option<Instant>,
}

impl HarvestFlash {
    pub fn new(cells: Vec<Pos>) -> Self {
        Self {
            cells,
            effect: None,
            process_time: None,
        }
    }

    pub fn done(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }
}

/// Outer board size (with border) for a grid of side `grid_size`.
fn board_outer_size(grid_size: usize) -> (u16, u16) {
    let n = grid_size as u16;
    (n * CELL_WIDTH + 2, n * CELL_HEIGHT + 2)
}

/// Board (outer, with border) and sidebar rects, centered in `area`.
fn game_rects(area: Rect, grid_size: usize) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size(grid_size);
    let total_w = bw + SIDEBAR_WIDTH;
    let total_h = bh.max(SIDEBAR_HEIGHT);
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(total_h) / 2;
    let board = Rect {
        x,
        y,
        width: bw.min(area.width),
        height: bh.min(area.height),
    };
    let sidebar_x = x + bw;
    let sidebar = Rect {
        x: sidebar_x,
        y,
        width: SIDEBAR_WIDTH.min(area.right().saturating_sub(sidebar_x)),
        height: total_h.min(area.height),
    };
    (board, sidebar)
}

/// Board inner rect (plots only, no border); matches `draw_game` layout.
pub fn board_rect(area: Rect, grid_size: usize) -> Rect {
    let (outer, _) = game_rects(area, grid_size);
    let n = grid_size as u16;
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: (n * CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: (n * CELL_HEIGHT).min(outer.height.saturating_sub(2)),
    }
}

fn plot_rect(board: Rect, pos: Pos) -> Rect {
    Rect {
        x: board.x + pos.x as u16 * CELL_WIDTH,
        y: board.y + pos.y as u16 * CELL_HEIGHT,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    }
}

/// Grid position under terminal cell (`column`, `row`), if it lies on a plot.
pub fn board_cell_at(area: Rect, grid_size: usize, column: u16, row: u16) -> Option<Pos> {
    let board = board_rect(area, grid_size);
    if !board.contains(Position::new(column, row)) {
        return None;
    }
    let x = ((column - board.x) / CELL_WIDTH) as usize;
    let y = ((row - board.y) / CELL_HEIGHT) as usize;
    (x < grid_size && y < grid_size).then_some(Pos::new(x, y))
}

/// Draw the current screen. The board stays visible under the start and game-over overlays.
pub fn draw<R: Rng>(
    frame: &mut Frame,
    session: &Session<R>,
    theme: &Theme,
    cursor: Pos,
    status: Option<&str>,
    flash: Option<&mut HarvestFlash>,
    now: Instant,
) {
    let area = frame.area();
    draw_game(frame, session, theme, cursor, status, area);
    match session.state().screen {
        Screen::Start => draw_start(frame, session, theme, area),
        Screen::Playing => {
            if let Some(flash) = flash {
                apply_harvest_flash(frame, session, flash, area, now);
            }
        }
        Screen::GameOver => draw_game_over(frame, session, theme, area),
    }
}

fn draw_game<R: Rng>(
    frame: &mut Frame,
    session: &Session<R>,
    theme: &Theme,
    cursor: Pos,
    status: Option<&str>,
    area: Rect,
) {
    let size = session.grid().size();
    let (board_outer, sidebar) = game_rects(area, size);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(TITLE, theme.title));
    block.render(board_outer, frame.buffer_mut());

    let board = board_rect(area, size);
    let playing = session.state().screen == Screen::Playing;
    for (pos, cell) in session.grid().iter_cells() {
        let rect = plot_rect(board, pos).intersection(board);
        if rect.is_empty() {
            continue;
        }
        let selected = session.selection() == Some(pos);
        let under_cursor = playing && cursor == pos;
        draw_plot(frame, session, theme, cell, pos, rect, selected, under_cursor);
    }
    draw_sidebar(frame, session, theme, status, sidebar);
}

fn draw_plot<R: Rng>(
    frame: &mut Frame,
    session: &Session<R>,
    theme: &Theme,
    cell: Cell,
    pos: Pos,
    rect: Rect,
    selected: bool,
    under_cursor: bool,
) {
    let (border_type, border_fg) = if selected {
        (BorderType::Thick, theme.selected)
    } else if under_cursor {
        (BorderType::Double, theme.main_fg)
    } else {
        (BorderType::Plain, theme.div_line)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(Style::default().fg(border_fg).bg(theme.bg));
    let inner = block.inner(rect);
    block.render(rect, frame.buffer_mut());

    let icon = match cell {
        Cell::Empty => Span::styled(" ", Style::default().bg(theme.bg)),
        Cell::Planted { kind, .. } if session.is_mature(pos) => Span::styled(
            kind.mature_icon().to_string(),
            Style::default().fg(theme.crop_color(kind)).bg(theme.bg).bold(),
        ),
        Cell::Planted { kind, .. } => Span::styled(
            kind.growing_icon().to_string(),
            Style::default()
                .fg(theme.crop_color(kind))
                .bg(theme.bg)
                .add_modifier(Modifier::DIM),
        ),
    };
    Paragraph::new(Line::from(icon))
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .render(inner, frame.buffer_mut());
}

fn draw_sidebar<R: Rng>(
    frame: &mut Frame,
    session: &Session<R>,
    theme: &Theme,
    status: Option<&str>,
    area: Rect,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let state = session.state();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Score, combo
            Constraint::Length(4), // Time + bar
            Constraint::Length(5), // Crop legend
            Constraint::Length(3), // Status
            Constraint::Fill(1),
        ])
        .split(area);

    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Combo: ", title_style),
            Span::styled(state.combo.to_string(), fg_style),
        ]),
    ];
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    let time_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let time_inner = time_block.inner(chunks[1]);
    time_block.render(chunks[1], frame.buffer_mut());
    let time_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(time_inner);
    Paragraph::new(Line::from(vec![
        Span::styled("Time: ", title_style),
        Span::styled(format!("{}s", state.remaining_time), fg_style),
    ]))
    .render(time_layout[0], frame.buffer_mut());
    let initial = session.config().initial_time;
    let ratio = if initial > 0 {
        (f64::from(state.remaining_time) / f64::from(initial)).min(1.0)
    } else {
        0.0
    };
    let bar_color = if ratio > 0.5 {
        Color::Green
    } else if ratio > 0.2 {
        Color::Yellow
    } else {
        Color::Red
    };
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(bar_color))
        .render(time_layout[1], frame.buffer_mut());

    let crops_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Crops ", title_style));
    let crops_inner = crops_block.inner(chunks[2]);
    crops_block.render(chunks[2], frame.buffer_mut());
    let legend: Vec<Line> = session
        .crops()
        .iter()
        .map(|d| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", d.kind.mature_icon()),
                    Style::default().fg(theme.crop_color(d.kind)).bold(),
                ),
                Span::styled(
                    format!("{:<8}{}t {:>3}pt", format!("{:?}", d.kind), d.growth_ticks, d.harvest_value),
                    fg_style,
                ),
            ])
        })
        .collect();
    Paragraph::new(Text::from(legend)).render(crops_inner, frame.buffer_mut());

    let status_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let status_inner = status_block.inner(chunks[3]);
    status_block.render(chunks[3], frame.buffer_mut());
    Paragraph::new(Line::from(Span::styled(
        status.unwrap_or(""),
        Style::default().fg(theme.inactive_fg),
    )))
    .render(status_inner, frame.buffer_mut());
}

/// Popup centered over the board; the sidebar stays visible.
fn overlay_rect(area: Rect, grid_size: usize, height: u16) -> Rect {
    let (board, _) = game_rects(area, grid_size);
    let w = OVERLAY_WIDTH.min(board.width);
    Rect {
        x: board.x + board.width.saturating_sub(w) / 2,
        y: board.y + board.height.saturating_sub(height) / 2,
        width: w,
        height,
    }
    .intersection(area)
}

fn draw_popup(frame: &mut Frame, theme: &Theme, popup: Rect, lines: Vec<Line>) {
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(TITLE, theme.title)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_start<R: Rng>(frame: &mut Frame, session: &Session<R>, theme: &Theme, area: Rect) {
    let popup = overlay_rect(area, session.grid().size(), 9);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Harvest pairs of ripe crops ",
            Style::default().fg(theme.title).bold(),
        )),
        Line::from(Span::styled(
            format!(" {} seconds on the clock ", session.config().initial_time),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Enter — Start    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
    ];
    draw_popup(frame, theme, popup, lines);
}

fn draw_game_over<R: Rng>(frame: &mut Frame, session: &Session<R>, theme: &Theme, area: Rect) {
    let popup = overlay_rect(area, session.grid().size(), 9);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Final Score: {} ", session.state().score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R — Retry    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    draw_popup(frame, theme, popup, lines);
}

/// Buffer positions covered by the given plots.
fn flash_buffer_positions(board: Rect, cells: &[Pos]) -> HashSet<(u16, u16)> {
    cells
        .iter()
        .flat_map(|&pos| {
            let r = plot_rect(board, pos);
            (r.y..r.y + r.height).flat_map(move |y| (r.x..r.x + r.width).map(move |x| (x, y)))
        })
        .collect()
}

/// Create or advance the harvest flash (TachyonFX: fade harvested plots in from white).
fn apply_harvest_flash<R: Rng>(
    frame: &mut Frame,
    session: &Session<R>,
    flash: &mut HarvestFlash,
    area: Rect,
    now: Instant,
) {
    let board = board_rect(area, session.grid().size());
    let delta = flash
        .process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flash.process_time = Some(now);

    if flash.effect.is_none() {
        let positions = flash_buffer_positions(board, &flash.cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(Color::White, Color::White, (HARVEST_FLASH_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}
