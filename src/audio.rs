//! Microphone capture using CPAL, written to WAV take files
//!
//! Each recording produces a fresh uniquely-named temp file; the path is
//! handed to the caller on stop and consumed exactly once.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Sample rate in Hz (default: 16000, a fixed low rate suited for speech)
    pub sample_rate: u32,
    /// Number of channels (default: 1 for mono)
    pub channels: u16,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// State of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

/// Captures audio from the default input device into a WAV file
pub struct Recorder {
    device: Device,
    config: RecorderConfig,
    stream_config: StreamConfig,
    input_channels: u16,
    sample_format: SampleFormat,
    state: Arc<Mutex<RecorderState>>,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
    take_path: Option<PathBuf>,
}

impl Recorder {
    /// Create a new Recorder with default settings
    ///
    /// Fails with an audio error when no input device or no usable input
    /// configuration exists, so the caller can surface the condition.
    pub fn new() -> Result<Self> {
        Self::with_config(RecorderConfig::default())
    }

    /// Create a new Recorder with custom configuration
    pub fn with_config(config: RecorderConfig) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("No input device available".to_string()))?;

        // note: device.name() is deprecated in cpal 0.17+, but works
        #[allow(deprecated)]
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using input device: {}", device_name);

        let supported_configs: Vec<_> = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(format!("Failed to get supported configs: {e}")))?
            .collect();

        if supported_configs.is_empty() {
            return Err(Error::Audio("No supported input configs".to_string()));
        }

        let (supported_config, input_channels, sample_format, sample_rate) =
            select_supported_config(&supported_configs, config.sample_rate, config.channels)
                .ok_or_else(|| Error::Audio("No supported input config found".to_string()))?;

        let stream_config = supported_config.config();

        let mut config = config;
        config.sample_rate = sample_rate;
        config.channels = 1;

        debug!(
            "Stream config: {:?} (input channels: {}, format: {:?})",
            stream_config, input_channels, sample_format
        );

        Ok(Self {
            device,
            config,
            stream_config,
            input_channels,
            sample_format,
            state: Arc::new(Mutex::new(RecorderState::Idle)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            take_path: None,
        })
    }

    /// Start a new take
    ///
    /// Allocates a fresh output path and discards anything buffered from a
    /// previous take. Calling while already recording is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if *self.state.lock() == RecorderState::Recording {
            return Ok(());
        }

        self.take_path = Some(
            std::env::temp_dir().join(format!("voxnote-rec-{}.wav", Uuid::new_v4())),
        );
        self.buffer.lock().clear();

        let buffer = Arc::clone(&self.buffer);
        let state = Arc::clone(&self.state);
        let err_fn = |err| error!("Audio stream error: {}", err);

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(buffer, state, err_fn)?,
            SampleFormat::I16 => self.build_stream::<i16>(buffer, state, err_fn)?,
            SampleFormat::U16 => self.build_stream::<u16>(buffer, state, err_fn)?,
            SampleFormat::I24 => self.build_stream::<cpal::I24>(buffer, state, err_fn)?,
            SampleFormat::U24 => self.build_stream::<cpal::U24>(buffer, state, err_fn)?,
            SampleFormat::I32 => self.build_stream::<i32>(buffer, state, err_fn)?,
            SampleFormat::U32 => self.build_stream::<u32>(buffer, state, err_fn)?,
            SampleFormat::I8 => self.build_stream::<i8>(buffer, state, err_fn)?,
            SampleFormat::U8 => self.build_stream::<u8>(buffer, state, err_fn)?,
            SampleFormat::F64 => self.build_stream::<f64>(buffer, state, err_fn)?,
            SampleFormat::I64 => self.build_stream::<i64>(buffer, state, err_fn)?,
            SampleFormat::U64 => self.build_stream::<u64>(buffer, state, err_fn)?,
            _ => {
                return Err(Error::Audio(format!(
                    "Unsupported sample format: {:?}",
                    self.sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::Audio(format!("Failed to start stream: {e}")))?;

        self.stream = Some(stream);
        *self.state.lock() = RecorderState::Recording;

        info!("Recording started");
        Ok(())
    }

    /// Stop the current take and write it out as 16-bit mono WAV
    ///
    /// Returns the path of the finished file. Stopping while idle is an
    /// error.
    pub fn stop(&mut self) -> Result<PathBuf> {
        if *self.state.lock() != RecorderState::Recording {
            return Err(Error::Audio("Not recording".to_string()));
        }

        *self.state.lock() = RecorderState::Idle;
        // drop the stream to stop capture
        self.stream = None;

        let samples = std::mem::take(&mut *self.buffer.lock());
        let path = self
            .take_path
            .take()
            .ok_or_else(|| Error::Audio("No take in progress".to_string()))?;

        write_wav(&path, &samples, self.config.sample_rate)?;
        info!(
            "Recording stopped, {} samples written to {}",
            samples.len(),
            path.display()
        );
        Ok(path)
    }

    /// Get current recorder state
    pub fn state(&self) -> RecorderState {
        *self.state.lock()
    }

    /// Current capture sample rate
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn build_stream<T>(
        &self,
        buffer: Arc<Mutex<Vec<f32>>>,
        state: Arc<Mutex<RecorderState>>,
        err_fn: impl FnMut(cpal::StreamError) + Send + 'static,
    ) -> Result<Stream>
    where
        T: Sample + SizedSample,
        f32: cpal::FromSample<T>,
    {
        let channels = self.input_channels as usize;
        let stream_config = self.stream_config.clone();

        self.device
            .build_input_stream(
                &stream_config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if *state.lock() != RecorderState::Recording {
                        return;
                    }

                    if channels == 1 {
                        buffer
                            .lock()
                            .extend(data.iter().map(|sample| sample.to_sample::<f32>()));
                    } else {
                        let mut buf = buffer.lock();
                        for frame in data.chunks_exact(channels) {
                            let mut sum = 0.0f32;
                            for sample in frame {
                                sum += sample.to_sample::<f32>();
                            }
                            buf.push(sum / channels as f32);
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::Audio(format!("Failed to build stream: {e}")))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        *self.state.lock() = RecorderState::Idle;
        self.stream = None;
    }
}

/// Write f32 samples as a 16-bit mono WAV file
fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| Error::Audio(format!("Failed to create {}: {e}", path.display())))?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * 32767.0) as i16)
            .map_err(|e| Error::Audio(format!("Failed to write sample: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| Error::Audio(format!("Failed to finalize {}: {e}", path.display())))?;
    Ok(())
}

fn select_supported_config(
    ranges: &[cpal::SupportedStreamConfigRange],
    preferred_rate: u32,
    preferred_channels: u16,
) -> Option<(cpal::SupportedStreamConfig, u16, SampleFormat, u32)> {
    let preferred_formats = [
        SampleFormat::F32,
        SampleFormat::I16,
        SampleFormat::U16,
        SampleFormat::I32,
        SampleFormat::U32,
        SampleFormat::F64,
        SampleFormat::I24,
        SampleFormat::U24,
        SampleFormat::I8,
        SampleFormat::U8,
        SampleFormat::I64,
        SampleFormat::U64,
    ];

    for format in preferred_formats {
        let mut candidates: Vec<_> = ranges
            .iter()
            .copied()
            .filter(|range| {
                range.sample_format() == format && range.channels() == preferred_channels
            })
            .collect();

        if candidates.is_empty() {
            candidates = ranges
                .iter()
                .copied()
                .filter(|range| range.sample_format() == format)
                .collect();
        }

        if candidates.is_empty() {
            continue;
        }

        let best = candidates
            .into_iter()
            .min_by_key(|range| sample_rate_distance(*range, preferred_rate))?;

        let sample_rate = choose_sample_rate(best, preferred_rate);
        let supported = best.with_sample_rate(sample_rate);

        return Some((supported, best.channels(), format, sample_rate));
    }

    None
}

fn sample_rate_distance(range: cpal::SupportedStreamConfigRange, preferred_rate: u32) -> u32 {
    let min_rate = range.min_sample_rate();
    let max_rate = range.max_sample_rate();
    if preferred_rate < min_rate {
        min_rate.saturating_sub(preferred_rate)
    } else if preferred_rate > max_rate {
        preferred_rate.saturating_sub(max_rate)
    } else {
        0
    }
}

fn choose_sample_rate(range: cpal::SupportedStreamConfigRange, preferred_rate: u32) -> u32 {
    let min_rate = range.min_sample_rate();
    let max_rate = range.max_sample_rate();
    if preferred_rate < min_rate {
        min_rate
    } else if preferred_rate > max_rate {
        max_rate
    } else {
        preferred_rate
    }
}
