//! PCM ingestion with volume and mute
//!
//! Raw little-endian stereo frames are widened to a common 24-bit scale,
//! attenuated through the [`VolumeTable`], scaled into the modulator domain
//! and written to the shared PCM ring buffer in bounded chunks.

use crate::session::{PcmFrame, Shared};
use hbridge_dsp::scale;
use hbridge_dsp::volume::{Gain, VolumeTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Frames converted and written per lock acquisition
pub const PUT_CHUNK_FRAMES: usize = 64;

/// Index of the master control in the volume and mute arrays
pub const MASTER: usize = 0;
/// Index of the left channel control
pub const LEFT: usize = 1;
/// Index of the right channel control
pub const RIGHT: usize = 2;

/// Output channel addressed by a per-channel volume or mute control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    /// Position in the master, left, right control arrays
    pub fn control_index(self) -> usize {
        match self {
            Channel::Left => LEFT,
            Channel::Right => RIGHT,
        }
    }
}

/// Layout of incoming PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Interleaved `i16` L, R (4 bytes per frame)
    Pcm16,
    /// Interleaved 24-bit samples in the low bits of 32-bit containers,
    /// L, R (8 bytes per frame)
    Pcm24,
}

impl SampleFormat {
    pub fn bytes_per_frame(self) -> usize {
        match self {
            SampleFormat::Pcm16 => 4,
            SampleFormat::Pcm24 => 8,
        }
    }

    /// Decode one frame to the 24-bit scale
    fn decode(self, bytes: &[u8]) -> (i32, i32) {
        match self {
            SampleFormat::Pcm16 => (
                scale::widen_16(i16::from_le_bytes([bytes[0], bytes[1]])),
                scale::widen_16(i16::from_le_bytes([bytes[2], bytes[3]])),
            ),
            SampleFormat::Pcm24 => (
                scale::sign_extend_24(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
                scale::sign_extend_24(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])),
            ),
        }
    }
}

/// Feeding-side handle
///
/// Cheap to clone; every clone writes into the same PCM ring buffer.
#[derive(Debug, Clone)]
pub struct Ingress {
    shared: Arc<Shared>,
    volume: Arc<VolumeTable>,
}

impl Ingress {
    pub fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            volume: Arc::new(VolumeTable::new()),
        }
    }

    /// Convert and enqueue raw stereo frames
    ///
    /// # Arguments
    /// * `samples` - Interleaved little-endian frames; a trailing partial
    ///   frame is ignored
    /// * `format` - Sample layout
    /// * `volume` - Master, left, right volume in 1/256 dB (0 = unity)
    /// * `mute` - Master, left, right mute
    ///
    /// # Returns
    /// Frames stored. While the amplifier is stopped all input is discarded
    /// and reported as accepted, so callers never stall. A stop that lands
    /// part way through a call discards the remaining chunks the same way.
    pub fn put_frames(
        &self,
        samples: &[u8],
        format: SampleFormat,
        volume: [i16; 3],
        mute: [bool; 3],
    ) -> usize {
        let bytes_per_frame = format.bytes_per_frame();
        let offered = samples.len() / bytes_per_frame;

        if !self.shared.session().is_enabled() {
            return offered;
        }

        let left_gain = self.channel_gain(volume, mute, Channel::Left);
        let right_gain = self.channel_gain(volume, mute, Channel::Right);

        let mut chunk = [PcmFrame::default(); PUT_CHUNK_FRAMES];
        let mut stored = 0;

        for raw in samples.chunks(PUT_CHUNK_FRAMES * bytes_per_frame) {
            let mut len = 0;
            for (slot, bytes) in chunk.iter_mut().zip(raw.chunks_exact(bytes_per_frame)) {
                let (left, right) = format.decode(bytes);
                *slot = PcmFrame {
                    left: scale::to_modulator_domain(left_gain.apply(left)),
                    right: scale::to_modulator_domain(right_gain.apply(right)),
                };
                len += 1;
            }

            if len == 0 {
                break;
            }

            let mut pcm = self.shared.lock_pcm();
            // stop() disables before clearing under this lock
            if !self.shared.session().is_enabled() {
                trace!(offered, stored, "Amplifier stopped mid-write, discarding");
                return offered;
            }
            let accepted = pcm.push(&chunk[..len]);
            drop(pcm);
            stored += accepted;

            if accepted < len {
                trace!(offered, stored, "PCM ring buffer full, truncating");
                break;
            }
        }

        stored
    }

    /// Effective gain for one channel: master and channel settings combined
    pub fn channel_gain(&self, volume: [i16; 3], mute: [bool; 3], channel: Channel) -> Gain {
        let channel = channel.control_index();
        if mute[MASTER] || mute[channel] {
            return Gain::MUTE;
        }

        self.volume.gain(volume[MASTER], volume[channel])
    }

    /// Frames waiting in the PCM ring buffer
    pub fn pcm_occupancy(&self) -> usize {
        self.shared.pcm_occupancy()
    }
}
