//! Property tests for PCM ingestion
//!
//! Uses proptest to check, for arbitrary audio and control values:
//! - Volume never amplifies
//! - Mute always silences
//! - 16-bit and 24-bit encodings of the same audio are indistinguishable
//! - Backpressure accepts exactly what fits

use hbridge_amp::test_utils::{SeededDither, SimOutputQueue, SimWatchdog};
use hbridge_amp::{AmpConfig, Amplifier, BridgeFrame, Channel, Ingress, Peripherals, SampleFormat};
use hbridge_dsp::scale;
use proptest::prelude::*;

fn pcm16(frames: &[(i16, i16)]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|&(l, r)| l.to_le_bytes().into_iter().chain(r.to_le_bytes()))
        .collect()
}

fn pcm24_from_16(frames: &[(i16, i16)]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|&(l, r)| {
            let l = (i32::from(l) << 8) as u32 & 0x00FF_FFFF;
            let r = (i32::from(r) << 8) as u32 & 0x00FF_FFFF;
            l.to_le_bytes().into_iter().chain(r.to_le_bytes())
        })
        .collect()
}

fn running(pcm_buffer_frames: usize) -> Amplifier {
    let amp = Amplifier::new(AmpConfig {
        pcm_buffer_frames,
        ..Default::default()
    })
    .unwrap();
    amp.start(48_000).unwrap();
    amp
}

/// One frame through the gain and scaling the ingress path applies
fn scaled(ingress: &Ingress, volume: [i16; 3], mute: [bool; 3], (l, r): (i16, i16)) -> (i32, i32) {
    let left = ingress.channel_gain(volume, mute, Channel::Left);
    let right = ingress.channel_gain(volume, mute, Channel::Right);
    (
        scale::to_modulator_domain(left.apply(scale::widen_16(l))),
        scale::to_modulator_domain(right.apply(scale::widen_16(r))),
    )
}

/// Everything the bridge receives over `iterations` render steps
fn render(amp: &Amplifier, iterations: usize) -> Vec<BridgeFrame> {
    let queue = SimOutputQueue::stereo(8);
    let mut renderer = amp.renderer(Peripherals::new(
        queue.clone(),
        SimWatchdog::new(),
        SeededDither::new(11),
    ))
    .unwrap();

    let mut delivered = Vec::new();
    for _ in 0..iterations {
        renderer.step();
        delivered.extend(queue.clock_out(8));
    }
    delivered
}

fn volume() -> impl Strategy<Value = i16> {
    prop_oneof![Just(0i16), -12_800i16..=0, any::<i16>()]
}

proptest! {
    #[test]
    fn attenuation_never_amplifies(
        l in any::<i16>(),
        r in any::<i16>(),
        master in volume(),
        left in volume(),
        right in volume(),
    ) {
        let amp = running(16);
        let ingress = amp.ingress();
        let (sl, sr) = scaled(&ingress, [master, left, right], [false; 3], (l, r));

        prop_assert!(sl.abs() <= scale::to_modulator_domain(scale::widen_16(l)).abs());
        prop_assert!(sr.abs() <= scale::to_modulator_domain(scale::widen_16(r)).abs());
    }

    #[test]
    fn mute_always_silences(
        l in any::<i16>(),
        r in any::<i16>(),
        master in volume(),
        mute in any::<[bool; 3]>(),
    ) {
        let amp = running(16);
        let ingress = amp.ingress();
        let (sl, sr) = scaled(&ingress, [master, 0, 0], mute, (l, r));

        if mute[0] || mute[1] {
            prop_assert_eq!(sl, 0);
        }
        if mute[0] || mute[2] {
            prop_assert_eq!(sr, 0);
        }
    }

    #[test]
    fn sample_width_does_not_matter(
        frames in prop::collection::vec(any::<(i16, i16)>(), 1..100),
        master in volume(),
        left in volume(),
        right in volume(),
    ) {
        let volume = [master, left, right];

        let narrow = running(256);
        let wide = running(256);
        narrow.put_frames(&pcm16(&frames), SampleFormat::Pcm16, volume, [false; 3]);
        wide.put_frames(&pcm24_from_16(&frames), SampleFormat::Pcm24, volume, [false; 3]);

        prop_assert_eq!(narrow.pcm_occupancy(), frames.len());
        prop_assert_eq!(wide.pcm_occupancy(), frames.len());
        prop_assert_eq!(render(&narrow, 60), render(&wide, 60));
    }

    #[test]
    fn backpressure_accepts_exactly_what_fits(
        capacity in 2usize..300,
        batches in prop::collection::vec(0usize..150, 1..6),
    ) {
        let amp = running(capacity);
        let mut stored = 0;

        for batch in batches {
            let accepted = amp.put_frames(
                &pcm16(&vec![(1, 1); batch]),
                SampleFormat::Pcm16,
                [0; 3],
                [false; 3],
            );
            prop_assert_eq!(accepted, batch.min(capacity - stored));
            stored += accepted;
            prop_assert_eq!(amp.pcm_occupancy(), stored);
        }
    }

    #[test]
    fn stopped_amplifier_accepts_and_drops(
        frames in prop::collection::vec(any::<(i16, i16)>(), 0..300),
    ) {
        let amp = Amplifier::new(AmpConfig::default()).unwrap();

        prop_assert_eq!(
            amp.put_frames(&pcm16(&frames), SampleFormat::Pcm16, [0; 3], [false; 3]),
            frames.len()
        );
        prop_assert_eq!(amp.pcm_occupancy(), 0);
    }
}
