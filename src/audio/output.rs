use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam::channel::{self, Sender};
use tracing::{debug, error, info};

use crate::error::{AudioError, AudioResult};

/// Keeps the device stream alive on its own thread. Dropping the handle
/// stops the stream.
pub struct OutputHandle {
    pub sample_rate: u32,
    pub channels: usize,
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        // Closing the channel wakes the output thread.
        self.shutdown_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Opens the default output device and calls `render(data, channels, sample_rate)`
/// from the audio callback. Blocks until the stream is playing or failed.
pub fn spawn_output<F>(preferred_rate: u32, render: F) -> AudioResult<OutputHandle>
where
    F: FnMut(&mut [f32], usize, u32) + Send + 'static,
{
    let (ready_tx, ready_rx) = channel::bounded::<AudioResult<(u32, usize)>>(1);
    let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);

    let thread = std::thread::Builder::new()
        .name("earstreak-output".into())
        .spawn(move || {
            // cpal streams are not Send, so the stream never leaves this thread.
            let stream = match build_stream(preferred_rate, render) {
                Ok((stream, rate, channels)) => {
                    let _ = ready_tx.send(Ok((rate, channels)));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = shutdown_rx.recv();
            drop(stream);
            debug!("audio output stopped");
        })
        .map_err(|_| AudioError::OutputThread)?;

    match ready_rx.recv() {
        Ok(Ok((sample_rate, channels))) => Ok(OutputHandle {
            sample_rate,
            channels,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        }),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => Err(AudioError::OutputThread),
    }
}

fn build_stream<F>(preferred_rate: u32, mut render: F) -> AudioResult<(cpal::Stream, u32, usize)>
where
    F: FnMut(&mut [f32], usize, u32) + Send + 'static,
{
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;
    let supported = device
        .default_output_config()
        .map_err(|e| AudioError::Stream(e.to_string()))?;

    let channels = supported.channels() as usize;
    let default_rate = supported.sample_rate() as u32;
    let mut config: cpal::StreamConfig = supported.into();

    // Ask for the synthesis rate so no resampling happens; fall back to
    // whatever the device defaults to.
    let sample_rate = if supports_rate(&device, preferred_rate, config.channels) {
        config.sample_rate = preferred_rate;
        preferred_rate
    } else {
        default_rate
    };

    info!(channels, sample_rate, "audio output");

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                render(data, channels, sample_rate);
            },
            |err| error!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::Stream(e.to_string()))?;

    Ok((stream, sample_rate, channels))
}

fn supports_rate(device: &cpal::Device, rate: u32, channels: u16) -> bool {
    match device.supported_output_configs() {
        Ok(mut configs) => configs.any(|c| {
            c.channels() == channels
                && c.sample_format() == cpal::SampleFormat::F32
                && (c.min_sample_rate() as u32) <= rate
                && rate <= (c.max_sample_rate() as u32)
        }),
        Err(_) => false,
    }
}
