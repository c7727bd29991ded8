//! Full-screen terminal bar chart built on ratatui

use crossterm::cursor::{Hide, Show};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout, Write};
use tracing::warn;

use super::{Chart, ChartModel};
use crate::error::Result;
use crate::frame::Reading;
use crate::spectrum::Rgba;
use crate::status::StatusBoard;

/// Panel the band colors are composited over (a light page, like a web chart)
pub const PANEL_BACKGROUND: (u8, u8, u8) = (250, 250, 250);

/// Columns between bars
const BAR_GAP: u16 = 1;

/// Rows reserved for the status panel (borders included)
const STATUS_HEIGHT: u16 = 5;

/// Terminal bar chart
pub struct TerminalChart<B: Backend> {
    terminal: Terminal<B>,
    owns_screen: bool,
}

impl TerminalChart<CrosstermBackend<Stdout>> {
    /// Take over stdout: raw mode, alternate screen, hidden cursor
    ///
    /// The terminal is restored when the chart is dropped.
    pub fn stdout() -> Result<Self> {
        Self::take_over(io::stdout())
    }
}

impl<W: Write> TerminalChart<CrosstermBackend<W>> {
    /// Raw mode is left again if any later setup step fails
    fn take_over(mut writer: W) -> Result<Self> {
        enable_raw_mode()?;

        if let Err(e) = execute!(writer, EnterAlternateScreen, Hide) {
            restore_terminal();
            return Err(e.into());
        }

        match Terminal::new(CrosstermBackend::new(writer)) {
            Ok(terminal) => Ok(Self {
                terminal,
                owns_screen: true,
            }),
            Err(e) => {
                restore_terminal();
                Err(e.into())
            }
        }
    }
}

impl<B: Backend> TerminalChart<B> {
    /// Draw onto an arbitrary backend without touching the real terminal
    pub fn with_backend(backend: B) -> Result<Self> {
        Ok(Self {
            terminal: Terminal::new(backend)?,
            owns_screen: false,
        })
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl<B: Backend> Drop for TerminalChart<B> {
    fn drop(&mut self) {
        if self.owns_screen {
            restore_terminal();
        }
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
}

impl<B: Backend> Chart for TerminalChart<B> {
    fn redraw(&mut self, model: &ChartModel, status: &StatusBoard) -> Result<()> {
        self.terminal.draw(|frame| draw(frame, model, status))?;
        Ok(())
    }
}

fn draw(frame: &mut Frame, model: &ChartModel, status: &StatusBoard) {
    let [status_area, chart_area] =
        Layout::vertical([Constraint::Length(STATUS_HEIGHT), Constraint::Min(3)]).areas(frame.area());

    let mut lines = vec![
        Line::from(status.connection().to_string()),
        Line::from(status.last_reading().to_string()),
    ];
    if let Some(diagnostic) = status.diagnostic() {
        lines.push(Line::styled(diagnostic.to_string(), Style::default().fg(Color::Yellow)));
    }
    let status_panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Status (q to quit) "));
    frame.render_widget(status_panel, status_area);

    let bars = build_bars(model);
    let (bg_r, bg_g, bg_b) = PANEL_BACKGROUND;
    let panel_style = Style::default().fg(Color::Black).bg(Color::Rgb(bg_r, bg_g, bg_b));
    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", model.dataset.label))
                .style(panel_style),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width(chart_area.width.saturating_sub(2), bars.len()))
        .bar_gap(BAR_GAP)
        .label_style(panel_style);
    frame.render_widget(chart, chart_area);
}

/// One bar per label; missing or non-numeric readings draw at zero height
fn build_bars(model: &ChartModel) -> Vec<Bar<'_>> {
    let colors = model.dataset.background_color.colors();

    model
        .labels
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let reading = model.dataset.data.get(index);
            let color = band_color(colors.get(index));
            Bar::default()
                .label(Line::from(label.as_str()))
                .value(bar_height(reading))
                .text_value(reading.map(Reading::to_string).unwrap_or_default())
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect()
}

fn bar_height(reading: Option<&Reading>) -> u64 {
    match reading.and_then(Reading::value) {
        Some(value) if value > 0.0 => value.round() as u64,
        _ => 0,
    }
}

fn band_color(color: Option<&Rgba>) -> Color {
    let (r, g, b) = color
        .map(|c| c.blend_over(PANEL_BACKGROUND))
        .unwrap_or(PANEL_BACKGROUND);
    Color::Rgb(r, g, b)
}

/// Widest bars that fit `inner_width` columns
fn bar_width(inner_width: u16, bars: usize) -> u16 {
    if bars == 0 {
        return 1;
    }
    let per_bar = inner_width / bars.min(u16::MAX as usize) as u16;
    per_bar.saturating_sub(BAR_GAP).max(1)
}

/// Resolves when the user presses `q`, `Esc` or Ctrl+C
///
/// Raw mode swallows SIGINT, so Ctrl+C has to be read as a key event.
pub async fn wait_for_quit() {
    let mut events = EventStream::new();

    while let Some(event) = events.next().await {
        match event {
            Ok(Event::Key(key)) if is_quit_key(&key) => return,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Terminal input error");
                return;
            }
        }
    }
}

fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{color_for, Band, BandSet};
    use ratatui::backend::TestBackend;

    fn model_with(data: Vec<Reading>) -> ChartModel {
        let bands = BandSet::new(vec![Band::from(415.0), Band::from(555.0), Band::from("clear")]);
        let mut model = ChartModel::new(&bands, "AS7341 Spectrometer");
        model.dataset.data = data;
        model
    }

    fn screen_text(chart: &TerminalChart<TestBackend>) -> String {
        chart
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_redraw_shows_status_and_values() {
        let mut chart = TerminalChart::with_backend(TestBackend::new(60, 20)).unwrap();
        let mut status = StatusBoard::new();
        status.set_connection("client is connected");

        let model = model_with(vec![
            Reading::Value(120.0),
            Reading::Value(340.0),
            Reading::Value(60.0),
        ]);
        chart.redraw(&model, &status).unwrap();

        let text = screen_text(&chart);
        assert!(text.contains("client is connected"));
        assert!(text.contains("AS7341 Spectrometer"));
        assert!(text.contains("340"));
        assert!(text.contains("clear"));
    }

    #[test]
    fn test_redraw_without_data() {
        let mut chart = TerminalChart::with_backend(TestBackend::new(60, 20)).unwrap();
        let model = model_with(Vec::new());

        chart.redraw(&model, &StatusBoard::new()).unwrap();
        chart.redraw(&model, &StatusBoard::new()).unwrap();

        assert!(screen_text(&chart).contains("Waiting for client connection"));
    }

    #[test]
    fn test_diagnostic_is_shown() {
        let mut chart = TerminalChart::with_backend(TestBackend::new(60, 20)).unwrap();
        let mut status = StatusBoard::new();
        status.set_diagnostic("malformed frame: expected 3 tokens, found 2");

        chart.redraw(&model_with(Vec::new()), &status).unwrap();
        assert!(screen_text(&chart).contains("malformed frame"));
    }

    #[test]
    fn test_bar_height() {
        assert_eq!(bar_height(Some(&Reading::Value(340.4))), 340);
        assert_eq!(bar_height(Some(&Reading::Value(-5.0))), 0);
        assert_eq!(bar_height(Some(&Reading::Raw("abc".to_string()))), 0);
        assert_eq!(bar_height(None), 0);
    }

    #[test]
    fn test_band_color() {
        assert_eq!(band_color(Some(&color_for(&Band::from("clear")))), Color::Rgb(0, 0, 0));
        assert_eq!(band_color(Some(&color_for(&Band::from(645.0)))), Color::Rgb(255, 0, 0));
        // Invisible bands disappear into the panel
        assert_eq!(band_color(Some(&color_for(&Band::from(850.0)))), Color::Rgb(250, 250, 250));
        assert_eq!(band_color(None), Color::Rgb(250, 250, 250));
    }

    #[test]
    fn test_bar_width() {
        assert_eq!(bar_width(58, 3), 18);
        assert_eq!(bar_width(58, 10), 4);
        assert_eq!(bar_width(5, 10), 1);
        assert_eq!(bar_width(58, 0), 1);
    }

    /// Writer whose every write fails, like a closed terminal
    struct ClosedTerminal;

    impl Write for ClosedTerminal {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_setup_leaves_raw_mode() {
        let result = TerminalChart::take_over(ClosedTerminal);

        assert!(result.is_err());
        assert!(!crossterm::terminal::is_raw_mode_enabled().unwrap_or(false));
    }

    #[test]
    fn test_quit_keys() {
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    }
}
