//! Control facade
//!
//! [`Amplifier`] is what the audio-delivery side talks to: it publishes
//! control requests, feeds PCM through [`Ingress`] and hands out the one
//! [`Renderer`] that consumes it.

use crate::config::AmpConfig;
use crate::error::{AmpError, Result};
use crate::hal::{DitherSource, FaultIndicator, OutputQueue, Peripherals, Watchdog};
use crate::ingress::{Ingress, SampleFormat};
use crate::renderer::Renderer;
use crate::session::{check_sample_rate, Shared};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Control and feeding side of the amplifier
#[derive(Debug, Clone)]
pub struct Amplifier {
    config: AmpConfig,
    shared: Arc<Shared>,
    ingress: Ingress,
}

impl Amplifier {
    pub fn new(config: AmpConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared::new(config.pcm_buffer_frames));
        let ingress = Ingress::new(Arc::clone(&shared));

        Ok(Self {
            config,
            shared,
            ingress,
        })
    }

    pub fn config(&self) -> &AmpConfig {
        &self.config
    }

    /// Request output at `sample_rate`
    ///
    /// Starting again at a different rate while running is treated as a
    /// rate change. A start after a stop always flushes, in case the
    /// renderer never observed the stop.
    pub fn start(&self, sample_rate: u32) -> Result<()> {
        self.check_rate(sample_rate)?;

        let session = self.shared.session();
        let previous_rate = session.sample_rate();
        let was_enabled = session.is_enabled();

        // published before enabling so a renderer still in Steady resets
        if !was_enabled {
            session.request_flush();
        }
        session.enable(sample_rate);

        if was_enabled && previous_rate != sample_rate {
            session.request_flush();
        }
        info!(sample_rate, "Amplifier start requested");

        Ok(())
    }

    /// Switch rates; implies a flush
    pub fn change_sample_rate(&self, sample_rate: u32) -> Result<()> {
        self.check_rate(sample_rate)?;

        let session = self.shared.session();
        session.set_sample_rate(sample_rate);
        session.request_flush();
        info!(sample_rate, "Sample rate change requested");

        Ok(())
    }

    /// Request the renderer to stop and drop all buffered PCM immediately
    pub fn stop(&self) {
        self.shared.session().disable();
        self.shared.lock_pcm().clear();
        info!("Amplifier stop requested");
    }

    /// Reset the modulators and output cushion on the next render iteration
    pub fn flush(&self) {
        self.shared.session().request_flush();
        debug!("Flush requested");
    }

    pub fn is_started(&self) -> bool {
        self.shared.session().is_enabled()
    }

    /// See [`Ingress::put_frames`]
    pub fn put_frames(
        &self,
        samples: &[u8],
        format: SampleFormat,
        volume: [i16; 3],
        mute: [bool; 3],
    ) -> usize {
        self.ingress.put_frames(samples, format, volume, mute)
    }

    /// Frames waiting in the PCM ring buffer
    pub fn pcm_occupancy(&self) -> usize {
        self.shared.pcm_occupancy()
    }

    /// Feeding handle for another thread
    pub fn ingress(&self) -> Ingress {
        self.ingress.clone()
    }

    /// Build the renderer for this amplifier, to be driven by the caller
    pub fn renderer<Q, W, D, F>(&self, peripherals: Peripherals<Q, W, D, F>) -> Result<Renderer<Q, W, D, F>>
    where
        Q: OutputQueue,
        W: Watchdog,
        D: DitherSource,
        F: FaultIndicator,
    {
        Renderer::new(Arc::clone(&self.shared), self.config.clone(), peripherals)
    }

    /// Run the renderer on a dedicated thread until [`RenderThread::join`]
    pub fn spawn_renderer<Q, W, D, F>(&self, peripherals: Peripherals<Q, W, D, F>) -> Result<RenderThread<Q, W, D, F>>
    where
        Q: OutputQueue + 'static,
        W: Watchdog + 'static,
        D: DitherSource + 'static,
        F: FaultIndicator + 'static,
    {
        let mut renderer = self.renderer(peripherals)?;

        let handle = thread::Builder::new()
            .name("hbridge-render".to_string())
            .spawn(move || {
                let result = renderer.run();
                (renderer, result)
            })?;

        Ok(RenderThread {
            shared: Arc::clone(&self.shared),
            handle,
        })
    }

    /// Ask a spawned renderer loop to exit
    pub fn shutdown(&self) {
        self.shared.session().request_shutdown();
    }

    fn check_rate(&self, sample_rate: u32) -> Result<()> {
        if let Err(e) = check_sample_rate(sample_rate) {
            warn!(sample_rate, "Rejected unsupported sample rate");
            return Err(e);
        }
        Ok(())
    }
}

/// Handle to a renderer running on its own thread
pub struct RenderThread<Q, W, D, F> {
    shared: Arc<Shared>,
    handle: JoinHandle<(Renderer<Q, W, D, F>, Result<()>)>,
}

impl<Q, W, D, F> RenderThread<Q, W, D, F> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop and take the renderer back
    ///
    /// Returns the renderer's own error if it never got past hardware
    /// initialization.
    pub fn join(self) -> Result<Renderer<Q, W, D, F>> {
        self.shared.session().request_shutdown();

        let (renderer, result) = self.handle.join().map_err(|_| AmpError::RendererPanicked)?;
        result?;

        Ok(renderer)
    }
}
