//! Audio device setup and the main run loop.

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::supports_keyboard_enhancement,
};
use rtrb::{Consumer, Producer, RingBuffer};
use std::io::stdout;

use keytone::{
    io::OutputSample,
    synth::{self, KeyMessage, KeySynth},
    SynthConfig,
};

use super::ui::UiApp;

/// Capacity of the audio→UI scope ring, in mono samples.
const SCOPE_RING_SIZE: usize = 8192;

type RenderSynth = KeySynth<Consumer<KeyMessage>>;

/// Open the default output device, start the synth, and run the UI until quit.
pub fn run(config: SynthConfig) -> EyreResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let supported = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let device_rate = supported.sample_rate().0 as f32;
    if device_rate != config.sample_rate {
        tracing::info!(
            configured = config.sample_rate,
            device = device_rate,
            "using device sample rate"
        );
    }
    let config = config.with_sample_rate(device_rate);

    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    tracing::info!(
        device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
        sample_rate = device_rate,
        channels = stream_config.channels,
        format = ?sample_format,
        voices = config.voice_count,
        waveform = config.waveform.name(),
        "opening output stream"
    );

    // --- Cross-thread rings ---
    let (handle, ends, meter_rx) = synth::channel(config.voice_count);
    let (scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_RING_SIZE);
    let synth = KeySynth::new(&config, ends.rx)
        .wrap_err("invalid synth config")?
        .with_meter(ends.meter_tx);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, synth, scope_tx)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, synth, scope_tx)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, synth, scope_tx)?,
        other => return Err(eyre!("unsupported sample format: {other:?}")),
    };
    stream.play().wrap_err("failed to start output stream")?;

    // Key-up events need the kitty keyboard protocol; without it keys toggle.
    let key_release = supports_keyboard_enhancement().unwrap_or(false);
    if key_release {
        execute!(
            stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    } else {
        tracing::warn!("terminal does not report key releases; keys toggle notes");
    }

    let mut terminal = ratatui::init();
    let mut app = UiApp::new(handle, meter_rx, scope_rx, &config, key_release);
    let res = app.run(&mut terminal);
    ratatui::restore();

    if key_release {
        let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
    }
    drop(stream);
    res
}

fn build_stream<S>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut synth: RenderSynth,
    mut scope_tx: Producer<f32>,
) -> EyreResult<cpal::Stream>
where
    S: OutputSample + cpal::SizedSample,
{
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [S], _: &cpal::OutputCallbackInfo| {
                synth.render(data, channels);

                // Feed the scope with the first channel; drop when the UI lags.
                for frame in data.chunks_exact(channels) {
                    if scope_tx.push(frame[0].to_unit()).is_err() {
                        break;
                    }
                }
            },
            |err| tracing::error!("audio stream error: {err}"),
            None,
        )
        .wrap_err("failed to build output stream")
}
