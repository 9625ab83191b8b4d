use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit (aborts a running analysis)"),
        ]),
        key_line("/", 11, "Edit image path"),
        key_line("Enter", 7, "Analyze image"),
        key_line("c", 11, "Copy result summary to clipboard"),
        key_line("?", 11, "Toggle this help"),
        Line::from(""),
        Line::from("While editing the path:"),
        key_line("Enter", 7, "Select file and analyze"),
        key_line("Esc", 9, "Stop editing"),
        Line::from(""),
        Line::from("Exports (--export-json, --save-images) run after every analysis."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
