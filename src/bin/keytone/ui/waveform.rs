//! Output oscilloscope, drawn against the amplitude ceiling

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use keytone::io::sample::FULL_SCALE;

/// Scope trace plus dashed ±ceiling guides. `audio_buffer` holds samples in
/// [-1, 1]; `ceiling` is in mix units (e.g. 12000).
///
/// The trace turns red if it ever reaches past the ceiling, which would mean
/// the normalizer let the chord sum too loud.
pub fn render_waveform(frame: &mut Frame, area: Rect, audio_buffer: &[f32], ceiling: f32) {
    let limit = (ceiling / FULL_SCALE) as f64;
    let peak = audio_buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs())) as f64;

    let last = audio_buffer.len().saturating_sub(1).max(1) as f64;
    let trace: Vec<(f64, f64)> = audio_buffer
        .iter()
        .enumerate()
        .map(|(i, &sample)| (i as f64 / last, sample as f64))
        .collect();
    let upper = [(0.0, limit), (1.0, limit)];
    let lower = [(0.0, -limit), (1.0, -limit)];

    // Tolerate the last bit of 16-bit rounding.
    let over = peak > limit + 1.0 / FULL_SCALE as f64;
    let trace_color = if over { Color::Red } else { Color::Cyan };

    let guide = Style::default().fg(Color::DarkGray);
    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(guide)
            .data(&upper),
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(guide)
            .data(&lower),
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(trace_color))
            .data(&trace),
    ];

    let title = format!(
        " Output  peak {:>5.1}%  ceiling {:.1}% ",
        peak * 100.0,
        limit * 100.0
    );
    let bound = limit.max(peak).max(0.05) * 1.15;

    let chart = Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(Axis::default().bounds([0.0, 1.0]).style(guide))
        .y_axis(
            Axis::default()
                .bounds([-bound, bound])
                .style(guide)
                .labels([
                    Span::raw(format!("{:+.2}", -bound)),
                    Span::raw("0"),
                    Span::raw(format!("{:+.2}", bound)),
                ]),
        );

    frame.render_widget(chart, area);
}
