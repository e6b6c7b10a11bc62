/// mtsim live visualizer — attach to any running simulation at any time.
///
/// Run in a separate terminal:
///   cargo run --bin viz [-- /path/to/snapshot.json]
///
/// Polls the snapshot file (default /tmp/mtsim_live.json) every 200ms and
/// renders a live TUI dashboard:
///
///     ┌ header: program / policy / status ─────────────────────────┐
///     │ thread grid (one row per thread) │ Stats: IPC, progress … │
///     │ q/esc: quit  …footer…                                      │
///
/// Press q or Esc to quit. The simulation keeps running unaffected.
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mtsim::metrics::{read_metrics, LiveMetrics, ThreadStatus, METRICS_PATH};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(METRICS_PATH));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &path);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let metrics = read_metrics(path);
        terminal.draw(|f| render(f, metrics.as_ref(), path))?;

        // Non-blocking: poll for 200ms, then redraw regardless
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    break;
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Top-level layout
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, metrics: Option<&LiveMetrics>, path: &Path) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // threads + stats
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, rows[0], metrics);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[1]);

    render_threads(f, cols[0], metrics);
    render_stats(f, cols[1], metrics);
    render_footer(f, rows[2], path);
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

fn render_header(f: &mut Frame, area: Rect, metrics: Option<&LiveMetrics>) {
    let block = Block::default()
        .title(Span::styled(
            " mtsim live monitor ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let (name, policy, status) = metrics
        .map(|m| (m.program_name.as_str(), m.scheduling_policy.as_str(), m.status.as_str()))
        .unwrap_or(("—", "—", "idle"));

    let status_color = match status {
        "running" => Color::Green,
        "complete" => Color::Cyan,
        _ => Color::DarkGray,
    };

    let spans = vec![
        Span::styled("  program: ", Style::default().fg(Color::DarkGray)),
        Span::styled(name, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::styled("   policy: ", Style::default().fg(Color::DarkGray)),
        Span::styled(policy, Style::default().fg(Color::Cyan)),
        Span::styled("   status: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            status.to_uppercase(),
            Style::default().fg(status_color).add_modifier(Modifier::BOLD),
        ),
    ];

    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

// ---------------------------------------------------------------------------
// Thread grid
// ---------------------------------------------------------------------------

fn status_style(status: ThreadStatus) -> (&'static str, Color) {
    match status {
        ThreadStatus::Running => ("██", Color::Green),
        ThreadStatus::Ready   => ("▓▓", Color::Cyan),
        ThreadStatus::Stalled => ("▒▒", Color::Yellow),
        ThreadStatus::Halted  => ("░░", Color::DarkGray),
    }
}

fn render_threads(f: &mut Frame, area: Rect, metrics: Option<&LiveMetrics>) {
    let block = Block::default().title(" Hardware threads ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let legend = Line::from(
        [
            ThreadStatus::Running,
            ThreadStatus::Ready,
            ThreadStatus::Stalled,
            ThreadStatus::Halted,
        ]
        .into_iter()
        .flat_map(|s| {
            let (symbol, color) = status_style(s);
            vec![
                Span::styled(symbol, Style::default().fg(color)),
                Span::raw(format!(" {}   ", s)),
            ]
        })
        .collect::<Vec<_>>(),
    );

    let mut lines: Vec<Line> = vec![legend, Line::raw("")];

    if let Some(m) = metrics {
        for t in &m.threads {
            let (symbol, color) = status_style(t.status);
            let stall = if t.stall_cycles > 0 {
                format!("stall {}", t.stall_cycles)
            } else {
                String::new()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  T{:<3} ", t.id), Style::default().fg(Color::DarkGray)),
                Span::styled(symbol, Style::default().fg(color)),
                Span::raw(format!("  {:>4}/{:<4} ", t.retired, t.program_len)),
                Span::styled(stall, Style::default().fg(Color::Yellow)),
            ]));
        }

        let halted = m.threads.iter().filter(|t| t.status == ThreadStatus::Halted).count();
        lines.push(Line::raw(""));
        lines.push(Line::from(vec![Span::styled(
            format!("  {}/{} threads halted", halted, m.threads.len()),
            Style::default().fg(Color::DarkGray),
        )]));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

// ---------------------------------------------------------------------------
// Stats panel
// ---------------------------------------------------------------------------

fn render_stats(f: &mut Frame, area: Rect, metrics: Option<&LiveMetrics>) {
    let block = Block::default().title(" Stats ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // IPC gauge
            Constraint::Length(1), // spacer
            Constraint::Length(2), // progress gauge
            Constraint::Length(1), // spacer
            Constraint::Min(0),    // text stats
        ])
        .split(inner);

    let Some(m) = metrics else {
        let msg = Paragraph::new(vec![
            Line::raw(""),
            Line::from(Span::styled(
                "  No simulation running.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "  Start mtsim with --live to see data.",
                Style::default().fg(Color::DarkGray),
            )),
        ]);
        f.render_widget(msg, inner);
        return;
    };

    let ipc_pct = (m.ipc * 100.0).clamp(0.0, 100.0) as u16;
    let ipc_color = match ipc_pct {
        0..=33 => Color::Red,
        34..=66 => Color::Yellow,
        _ => Color::Green,
    };
    let ipc_gauge = Gauge::default()
        .block(Block::default().title("IPC"))
        .gauge_style(Style::default().fg(ipc_color))
        .percent(ipc_pct)
        .label(format!("{:.3}", m.ipc));
    f.render_widget(ipc_gauge, rows[0]);

    let done_pct = if m.instructions_total > 0 {
        ((m.instructions as f64 / m.instructions_total as f64) * 100.0) as u16
    } else {
        0
    };
    let done_gauge = Gauge::default()
        .block(Block::default().title("Retired"))
        .gauge_style(Style::default().fg(Color::Blue))
        .percent(done_pct.min(100))
        .label(format!("{} / {}", m.instructions, m.instructions_total));
    f.render_widget(done_gauge, rows[2]);

    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, Style::default().fg(Color::DarkGray)),
            Span::raw(value),
        ])
    };
    let text = vec![
        stat("Cycles:     ", m.cycles.to_string()),
        stat("Switches:   ", m.switches.to_string()),
        stat("Penalty:    ", m.switch_penalty_cycles.to_string()),
        stat("Idle:       ", m.idle_cycles.to_string()),
        stat("Current:    ", format!("T{}", m.current_thread)),
        Line::raw(""),
        stat(
            "Latency:    ",
            format!("load {} / store {}", m.load_latency, m.store_latency),
        ),
        stat("Switch:     ", format!("{} cycles", m.switch_cycles)),
    ];
    f.render_widget(Paragraph::new(text), rows[4]);
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

fn render_footer(f: &mut Frame, area: Rect, path: &Path) {
    let text = Paragraph::new(Span::styled(
        format!(
            "  q / esc: quit    auto-refreshes every 200ms    reads {}",
            path.display()
        ),
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(text, area);
}
