use anyhow::Result;
use court_rotation::{db, Assignment, RoundError, SessionError, SessionState, STATION_COUNT};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;

pub struct App {
    pub session: SessionState,
    pub state: TableState,
    /// One-line feedback shown in the status bar
    pub message: Option<String>,
}

impl App {
    pub fn new(session: SessionState) -> Self {
        let mut state = TableState::default();
        if !session.participants.is_empty() {
            state.select(Some(0));
        }

        Self {
            session,
            state,
            message: None,
        }
    }

    fn selected_id(&self) -> Option<String> {
        self.state
            .selected()
            .and_then(|i| self.session.participants.get(i))
            .map(|p| p.id.clone())
    }

    pub fn next(&mut self) {
        let len = self.session.participants.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.session.participants.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn shuffle(&mut self) {
        self.message = Some(match self.session.shuffle() {
            Ok(result) if result.assignments.is_empty() => {
                "Fewer than 4 eligible players: everyone sits out".to_string()
            }
            Ok(result) if result.forced_repeats.is_empty() => {
                format!("Players shuffled across {} courts!", result.assignments.len())
            }
            Ok(result) => format!(
                "Players shuffled across {} courts ({} repeat pairing)",
                result.assignments.len(),
                result.forced_repeats.len()
            ),
            Err(SessionError::Round(RoundError::NoEligibleParticipants)) => {
                "No active players to shuffle".to_string()
            }
            Err(e) => format!("Shuffle failed: {}", e),
        });
    }

    pub fn clear_courts(&mut self) {
        self.session.clear_stations();
        self.message = Some("Courts cleared!".to_string());
    }

    pub fn toggle_pause(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let paused = self.session.get(&id).map(|p| p.is_paused).unwrap_or(false);
        let outcome = if paused {
            self.session.resume(&id)
        } else {
            self.session.pause(&id)
        };
        self.message = Some(match outcome {
            Ok(()) if paused => "Resumed".to_string(),
            Ok(()) => "Paused".to_string(),
            Err(e) => e.to_string(),
        });
    }

    pub fn toggle_active(&mut self) {
        let Some(id) = self.selected_id() else { return };
        self.message = Some(match self.session.toggle_active(&id) {
            Ok(true) => "Checked in".to_string(),
            Ok(false) => "Checked out".to_string(),
            Err(e) => e.to_string(),
        });
    }

    pub fn remove_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        self.message = Some(match self.session.remove_participant(&id) {
            Ok(removed) => format!("Removed {}", removed.name),
            Err(e) => e.to_string(),
        });

        let len = self.session.participants.len();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            _ => {}
        }
    }

    fn names(&self, ids: &[String]) -> String {
        let names: Vec<&str> = ids
            .iter()
            .map(|id| self.session.name_of(id).unwrap_or("?"))
            .collect();
        if names.is_empty() {
            "-".to_string()
        } else {
            names.join(" & ")
        }
    }
}

pub fn run_ui(app: &mut App, conn: &Connection) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, conn);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    conn: &Connection,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            let mutated = match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('s') => {
                    app.shuffle();
                    true
                }
                KeyCode::Char('c') => {
                    app.clear_courts();
                    true
                }
                KeyCode::Char('p') => {
                    app.toggle_pause();
                    true
                }
                KeyCode::Char('a') => {
                    app.toggle_active();
                    true
                }
                KeyCode::Char('d') => {
                    app.remove_selected();
                    true
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    app.next();
                    false
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    app.previous();
                    false
                }
                _ => false,
            };

            if mutated {
                db::save_state(conn, &app.session)?;
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Courts + roster
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60), // Courts
            Constraint::Percentage(40), // Roster + sitting out
        ])
        .split(chunks[1]);

    render_courts(f, content[0], app);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(content[1]);

    render_roster(f, side[0], app);
    render_sitting_out(f, side[1], app);

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let spans = vec![
        Span::styled(
            "🏸 Court Rotation",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{} players", app.session.participants.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{} active", app.session.eligible_count()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{} paused", app.session.paused().len()),
            Style::default().fg(Color::Yellow),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_courts(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let current = app.session.current_round();

    for court in 1..=STATION_COUNT {
        let row = (court - 1) / 2;
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[row]);

        let assignment = current.iter().find(|a| a.station_number == court).copied();
        render_court(f, cols[(court - 1) % 2], app, court, assignment);
    }
}

fn render_court(f: &mut Frame, area: Rect, app: &App, court: usize, assignment: Option<&Assignment>) {
    let content = match assignment {
        Some(a) => vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  Team A: ", Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
                Span::raw(app.names(a.team_a())),
            ]),
            Line::from("  ─────── net ───────"),
            Line::from(vec![
                Span::styled("  Team B: ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::raw(app.names(a.team_b())),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}/4 players assigned", a.player_ids.len()),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ],
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Team not yet formed",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ],
    };

    let border = if assignment.is_some() { Color::Green } else { Color::DarkGray };
    let block = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(format!(" Court {} ", court)),
    );

    f.render_widget(block, area);
}

fn render_roster(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Name", "Status", "Sat out"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.session.participants.iter().map(|p| {
        let color = match p.status_label() {
            "Active" => Color::Green,
            "Paused" => Color::Yellow,
            _ => Color::DarkGray,
        };

        Row::new(vec![
            Cell::from(truncate(&p.name, 22)),
            Cell::from(p.status_label()).style(Style::default().fg(color)),
            Cell::from(format!("{}", p.sit_out_count)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [Constraint::Length(24), Constraint::Length(10), Constraint::Length(8)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Players "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_sitting_out(f: &mut Frame, area: Rect, app: &App) {
    let waiting = app.session.sitting_out();
    let mut content: Vec<Line> = waiting
        .iter()
        .map(|p| Line::from(format!("  {}", p.name)))
        .collect();

    if content.is_empty() {
        content.push(Line::from(Span::styled(
            "  Nobody waiting",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" 🪑 Sitting Out ({}) ", waiting.len())),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if let Some(message) = &app.message {
        status_spans.push(Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" | "));
    }

    for (key, label) in [
        ("s", " Shuffle | "),
        ("c", " Clear | "),
        ("p", " Pause | "),
        ("a", " Check in/out | "),
        ("d", " Delete | "),
        ("↑/↓", " Nav | "),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
