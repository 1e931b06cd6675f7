//! Per-voice envelope meters

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use keytone::{dsp::EnvelopePhase, synth::PoolSnapshot};

use crate::keymap;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

fn phase_color(phase: EnvelopePhase) -> Color {
    match phase {
        EnvelopePhase::Stop => Color::DarkGray,
        EnvelopePhase::Attack => Color::LightGreen,
        EnvelopePhase::Sustain => Color::Cyan,
        EnvelopePhase::RampUp | EnvelopePhase::RampDown => Color::LightYellow,
        EnvelopePhase::Release => Color::LightRed,
    }
}

/// One row per voice: key, pitch, phase, and an amplitude bar scaled to the
/// engine ceiling (the loudest a lone voice can get).
pub fn render_voices(
    frame: &mut Frame,
    area: Rect,
    snapshot: &PoolSnapshot,
    pitches: &[f32],
    ceiling: f32,
) {
    let block = Block::default().title(" Voices ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let ceiling = ceiling.max(1.0);
    let bar_width = inner.width.saturating_sub(36) as usize;

    let lines: Vec<Line> = pitches
        .iter()
        .enumerate()
        .map(|(index, &pitch)| {
            let meter = snapshot.voices.get(index).copied().unwrap_or_default();
            let filled = ((meter.amplitude / ceiling) * bar_width as f32).round() as usize;
            let filled = filled.min(bar_width);
            let color = phase_color(meter.phase);

            Line::from(vec![
                Span::raw(format!(
                    " {}  {:<3} {:>7.2} Hz ",
                    keymap::label(index),
                    NOTE_NAMES[index % 12],
                    pitch
                )),
                Span::styled(format!("{:<9} ", meter.phase.label()), Style::default().fg(color)),
                Span::styled("█".repeat(filled), Style::default().fg(color)),
                Span::styled(
                    "░".repeat(bar_width - filled),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(format!(" {:>5.0}", meter.amplitude)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}
