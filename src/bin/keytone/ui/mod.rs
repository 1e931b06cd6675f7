//! TUI module for keytone
//!
//! Reads the computer keyboard, forwards key events to the synth, and shows
//! per-voice envelope meters plus an oscilloscope of the output.

mod voices;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use std::time::Duration;

use keytone::{
    dsp::Waveform,
    synth::{KeyboardHandle, PoolSnapshot},
    SynthConfig, VoiceCounting, MAX_VOICES,
};

use super::keymap;
use voices::render_voices;
use waveform::render_waveform;

/// Audio visualization buffer size
const VIS_BUFFER_SIZE: usize = 1024;

/// UI application state
pub struct UiApp {
    handle: KeyboardHandle,
    /// Meter snapshots from the render thread
    meter_rx: Consumer<PoolSnapshot>,
    /// Output samples for the scope
    scope_rx: Consumer<f32>,
    snapshot: PoolSnapshot,
    audio_buffer: Vec<f32>,
    pitches: Vec<f32>,
    ceiling: f32,
    waveform: Waveform,
    counting: VoiceCounting,
    /// Keys currently held down (or toggled on)
    held: [bool; MAX_VOICES],
    /// Whether the terminal sends key-release events
    key_release: bool,
    rejected_seen: u32,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        handle: KeyboardHandle,
        meter_rx: Consumer<PoolSnapshot>,
        scope_rx: Consumer<f32>,
        config: &SynthConfig,
        key_release: bool,
    ) -> Self {
        Self {
            handle,
            meter_rx,
            scope_rx,
            snapshot: PoolSnapshot::default(),
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            pitches: config.pitches().collect(),
            ceiling: config.amplitude_ceiling,
            waveform: config.waveform,
            counting: config.voice_counting,
            held: [false; MAX_VOICES],
            key_release,
            rejected_seen: 0,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.poll_meter();

            terminal.draw(|frame| self.render(frame))?;

            // Drain all pending input each frame (~60fps)
            if event::poll(Duration::from_millis(16))? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        self.handle_key(key);
                    }
                }
            }
        }

        let _ = self.handle.stop_all();
        Ok(())
    }

    /// Poll for new audio samples, keeping the last VIS_BUFFER_SIZE
    fn poll_audio(&mut self) {
        while let Ok(sample) = self.scope_rx.pop() {
            self.audio_buffer.push(sample);
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
    }

    /// Keep only the latest snapshot
    fn poll_meter(&mut self) {
        while let Ok(snapshot) = self.meter_rx.pop() {
            self.snapshot = snapshot;
        }

        if self.snapshot.rejected_events > self.rejected_seen {
            tracing::warn!(
                total = self.snapshot.rejected_events,
                new = self.snapshot.rejected_events - self.rejected_seen,
                "synth rejected key events"
            );
            self.rejected_seen = self.snapshot.rejected_events;
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.should_quit = true;
            return;
        }

        if let Some(index) = keymap::voice_for_key(key.code) {
            if index < self.handle.voice_count() {
                self.handle_note(index, key.kind);
            }
            return;
        }

        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Tab => {
                let waveform = self.waveform.next();
                self.waveform = waveform;
                tracing::info!(waveform = waveform.name(), "waveform changed");
                self.send(|h| h.set_waveform(waveform));
            }
            KeyCode::Char(' ') => {
                self.held = [false; MAX_VOICES];
                self.send(|h| h.stop_all());
            }
            _ => {}
        }
    }

    fn handle_note(&mut self, index: usize, kind: KeyEventKind) {
        let down = match (kind, self.key_release) {
            (KeyEventKind::Press, true) if !self.held[index] => true,
            (KeyEventKind::Release, true) if self.held[index] => false,
            (KeyEventKind::Press, false) => !self.held[index],
            _ => return,
        };

        self.held[index] = down;
        tracing::debug!(voice = index, down, "key");
        if down {
            self.send(|h| h.start(index));
        } else {
            self.send(|h| h.stop(index));
        }
    }

    fn send(
        &mut self,
        f: impl FnOnce(&mut KeyboardHandle) -> Result<(), keytone::VoiceError>,
    ) {
        if let Err(err) = f(&mut self.handle) {
            tracing::warn!(%err, "key event dropped");
        }
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),                             // Status
                Constraint::Length(self.pitches.len() as u16 + 2), // Voices
                Constraint::Min(6),                                // Waveform
                Constraint::Length(1),                             // Help bar
            ])
            .split(area);

        let counting = match self.counting {
            VoiceCounting::OnKeyUp => "key-up",
            VoiceCounting::OnSilence => "silence",
        };
        let status = Line::from(vec![
            Span::styled(" keytone ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(format!(
                "  wave: {}  active: {}/{}  counted until: {}",
                self.snapshot.waveform.name(),
                self.snapshot.active,
                self.pitches.len(),
                counting,
            )),
        ]);
        frame.render_widget(Paragraph::new(status), chunks[0]);

        render_voices(frame, chunks[1], &self.snapshot, &self.pitches, self.ceiling);
        render_waveform(frame, chunks[2], &self.audio_buffer, self.ceiling);

        let mode = if self.key_release { "hold" } else { "toggle" };
        let help = Paragraph::new(format!(
            " [Q2W3ER5T6Y7UI] Play ({mode})  [Tab] Waveform  [Space] Release all  [Esc] Quit"
        ))
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
