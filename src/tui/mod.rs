mod export;
mod help;
mod state;

use crate::cli::{build_config, export_targets, Cli};
use crate::engine::WebhookClient;
use crate::error::SubmitError;
use crate::model::{AnalysisResponse, ImageSlot, PanelContent, SourceKind, SubmitConfig, Verdict};
use crate::orchestrator::{self, ExportTargets, SubmissionController, UiCommand};
use crate::view::{ChannelView, ViewUpdate};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Terminal,
};
use state::UiState;
use std::{io, path::PathBuf, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

type Outcome = std::result::Result<AnalysisResponse, SubmitError>;

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let transport = WebhookClient::new(&cfg)?;

    // Unbounded channels keep the controller from ever waiting on the UI thread.
    let (view_tx, view_rx) = mpsc::unbounded_channel::<ViewUpdate>();
    let (done_tx, done_rx) = mpsc::unbounded_channel::<Outcome>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    if let Some(path) = args.image.clone() {
        let _ = cmd_tx.send(UiCommand::SelectFile(path));
    }

    let mut controller =
        SubmissionController::new(cfg.clone(), transport, ChannelView::new(view_tx));

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle =
        std::thread::spawn(move || run_threaded(ui_args, cfg, view_rx, done_rx, cmd_tx));

    let res = orchestrator::run_controller(&mut controller, cmd_rx, move |outcome| {
        let _ = done_tx.send(outcome);
    })
    .await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    cfg: SubmitConfig,
    mut view_rx: UnboundedReceiver<ViewUpdate>,
    mut done_rx: UnboundedReceiver<Outcome>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let targets = export_targets(&args);
    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(&cfg.endpoint, args.image.as_deref());

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        drain_view(&mut view_rx, &mut state);
        while let Ok(outcome) = done_rx.try_recv() {
            // Updates sent right before completion may still be queued.
            drain_view(&mut view_rx, &mut state);
            handle_submission_completed(&cfg, &targets, &mut state, outcome);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, k.code, k.modifiers, &cmd_tx) {
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn drain_view(view_rx: &mut UnboundedReceiver<ViewUpdate>, state: &mut UiState) {
    while let Ok(update) = view_rx.try_recv() {
        state.page.apply(update);
    }
}

/// Returns true when the UI should exit.
fn handle_key(
    state: &mut UiState,
    code: KeyCode,
    modifiers: KeyModifiers,
    cmd_tx: &UnboundedSender<UiCommand>,
) -> bool {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        let _ = cmd_tx.send(UiCommand::Quit);
        return true;
    }

    if state.editing_path {
        match code {
            KeyCode::Enter => {
                state.editing_path = false;
                request_analysis(state, cmd_tx, true);
            }
            KeyCode::Esc => state.editing_path = false,
            KeyCode::Backspace => {
                state.path_input.pop();
            }
            KeyCode::Char(c) => state.path_input.push(c),
            _ => {}
        }
        return false;
    }

    match code {
        KeyCode::Char('q') => {
            let _ = cmd_tx.send(UiCommand::Quit);
            return true;
        }
        KeyCode::Char('/') | KeyCode::Char('o') => {
            state.editing_path = true;
            state.show_help = false;
        }
        KeyCode::Enter => request_analysis(state, cmd_tx, false),
        KeyCode::Char('c') => export::copy_summary(state),
        KeyCode::Char('?') => state.show_help = !state.show_help,
        KeyCode::Esc => state.show_help = false,
        _ => {}
    }
    false
}

fn request_analysis(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, reselect: bool) {
    if !state.can_submit() {
        state.info = "Analysis already in progress…".into();
        return;
    }

    let path = state.path_input.trim();
    if !path.is_empty() && (reselect || state.selected_file().is_none()) {
        let _ = cmd_tx.send(UiCommand::SelectFile(PathBuf::from(path)));
    }
    let _ = cmd_tx.send(UiCommand::Submit);
    state.info = "Submitting…".into();
}

fn handle_submission_completed(
    cfg: &SubmitConfig,
    targets: &ExportTargets,
    state: &mut UiState,
    outcome: Outcome,
) {
    if let Err(SubmitError::NoFileSelected) = outcome {
        state.info = "Enter an image path first (press /)".into();
        return;
    }

    let processed = orchestrator::process_submission(
        cfg,
        targets,
        state.selected_file(),
        &state.page,
        &outcome,
    );
    state.last_report = Some(processed.report);

    state.info = match &outcome {
        Ok(r) => format!("Analysis complete: {}", r.result),
        Err(e) => format!("Analysis failed: {e}"),
    };
    if !processed.export_messages.is_empty() {
        state.info = processed.export_messages.join("; ");
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let banner_height = if state.page.error_banner.is_some() { 3 } else { 0 };
    let result_height = if state.page.results_visible { 4 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Endpoint
                Constraint::Length(3), // File selection
                Constraint::Length(3), // Submit button + progress
                Constraint::Length(banner_height),
                Constraint::Length(result_height),
                Constraint::Min(0), // Image cards or help
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Endpoint: ", Style::default().fg(Color::Gray)),
        Span::raw(state.endpoint.clone()),
    ]))
    .block(Block::default().borders(Borders::ALL).title("mri-webhook-cli"));
    f.render_widget(header, chunks[0]);

    draw_file_row(chunks[1], f, state);
    draw_submit_row(chunks[2], f, state);

    if let Some(msg) = state.page.error_banner.as_deref() {
        let banner = Paragraph::new(msg.to_string())
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL).title("Error"));
        f.render_widget(banner, chunks[3]);
    }

    if state.page.results_visible {
        draw_result(chunks[4], f, state);
    }

    if state.show_help {
        help::draw_help(chunks[5], f);
    } else {
        draw_cards(chunks[5], f, state);
    }

    let status = Paragraph::new(Line::from(vec![
        Span::styled(state.info.clone(), Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled("? help · q quit", Style::default().fg(Color::DarkGray)),
    ]));
    f.render_widget(status, chunks[6]);
}

fn draw_file_row(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let (line, title) = if state.editing_path {
        (
            Line::from(vec![
                Span::styled("› ", Style::default().fg(Color::Yellow)),
                Span::raw(state.path_input.clone()),
                Span::styled("▏", Style::default().fg(Color::Yellow)),
            ]),
            "Image path (Enter to analyze, Esc to stop editing)",
        )
    } else {
        (
            Line::from(vec![
                Span::styled("File: ", Style::default().fg(Color::Gray)),
                Span::raw(state.page.file_label.clone()),
            ]),
            "Image",
        )
    };
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_submit_row(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(0)].as_ref())
        .split(area);

    let button_style = if state.page.submit.enabled {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let button = Paragraph::new(format!("[ {} ]", state.page.submit.label))
        .style(button_style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(button, row[0]);

    let progress_block = Block::default().borders(Borders::ALL).title("Progress");
    match state.page.progress {
        Some(pct) => {
            let gauge = Gauge::default()
                .block(progress_block)
                .gauge_style(Style::default().fg(Color::Green))
                .percent(u16::from(pct.min(100)));
            f.render_widget(gauge, row[1]);
        }
        None => f.render_widget(progress_block, row[1]),
    }
}

fn verdict_style(verdict: Option<Verdict>) -> (Style, &'static str) {
    match verdict {
        Some(Verdict::TumorDetected) => (Style::default().fg(Color::Red), "✖"),
        Some(Verdict::NoTumor) => (Style::default().fg(Color::Green), "✔"),
        None => (Style::default(), "•"),
    }
}

fn draw_result(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let result = &state.page.result;
    let (style, glyph) = verdict_style(result.verdict);
    let p = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("{glyph} {}", result.text),
            style.add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Probability: ", Style::default().fg(Color::Gray)),
            Span::styled(result.probability.clone(), style),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Result"));
    f.render_widget(p, area);
}

fn source_label(source: SourceKind) -> &'static str {
    match source {
        SourceKind::DataUri => "data URI",
        SourceKind::Url => "URL",
        SourceKind::Base64 => "base64",
    }
}

fn card_lines(content: &PanelContent) -> Vec<Line<'static>> {
    let gray = Style::default().fg(Color::Gray);
    let dim = Style::default().fg(Color::DarkGray);
    match content {
        PanelContent::Image(img) => vec![
            Line::from(Span::styled(
                format!("▣ {}×{}", img.width, img.height),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(img.mime.clone()),
            Line::from(Span::styled(format!("from {}", source_label(img.source)), gray)),
            Line::from(Span::styled(format!("{} bytes", img.bytes.len()), gray)),
        ],
        PanelContent::Placeholder { caption } => vec![
            Line::from(Span::styled("🖼", dim)),
            Line::from(Span::styled(caption.clone(), dim)),
        ],
        PanelContent::Hidden => Vec::new(),
    }
}

fn draw_cards(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let visible: Vec<ImageSlot> = ImageSlot::ALL
        .into_iter()
        .filter(|slot| *state.page.card(*slot) != PanelContent::Hidden)
        .collect();

    if visible.is_empty() {
        let p = Paragraph::new(Span::styled(
            "No analysis yet",
            Style::default().fg(Color::DarkGray),
        ))
        .block(Block::default().borders(Borders::ALL).title("Images"));
        f.render_widget(p, area);
        return;
    }

    let n = visible.len() as u32;
    let constraints: Vec<Constraint> = visible.iter().map(|_| Constraint::Ratio(1, n)).collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (slot, column) in visible.into_iter().zip(columns.iter()) {
        let p = Paragraph::new(card_lines(state.page.card(slot)))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(slot.title()));
        f.render_widget(p, *column);
    }
}
