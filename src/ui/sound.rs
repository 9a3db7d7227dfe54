/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::warn;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_click: Arc<Vec<u8>>,
        sfx_correct: Arc<Vec<u8>>,
        sfx_incorrect: Arc<Vec<u8>>,
        sfx_level_complete: Arc<Vec<u8>>,
        sfx_game_over: Arc<Vec<u8>>,
        sfx_victory: Arc<Vec<u8>>,
        sfx_timer_warning: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio output, sound disabled: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_click: Arc::new(make_wav(&gen_blip(880.0, 0.025, 0.2))),
                sfx_correct: Arc::new(make_wav(&gen_correct())),
                sfx_incorrect: Arc::new(make_wav(&gen_incorrect())),
                sfx_level_complete: Arc::new(make_wav(&gen_level_complete())),
                sfx_game_over: Arc::new(make_wav(&gen_game_over())),
                sfx_victory: Arc::new(make_wav(&gen_victory())),
                sfx_timer_warning: Arc::new(make_wav(&gen_tick())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            self.play_bytes(buf.as_ref().clone());
        }

        fn play_bytes(&self, bytes: Vec<u8>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(bytes)) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        /// Reveal blip; pitch rises as the path is drawn.
        pub fn play_path_step(&self, index: usize, total: usize) {
            let ratio = index as f32 / total.max(1) as f32;
            let freq = 400.0 + ratio * 700.0;
            self.play_bytes(make_wav(&gen_blip(freq, 0.03, 0.2)));
        }

        pub fn play_click(&self) { self.play(&self.sfx_click); }
        pub fn play_correct(&self) { self.play(&self.sfx_correct); }
        pub fn play_incorrect(&self) { self.play(&self.sfx_incorrect); }
        pub fn play_level_complete(&self) { self.play(&self.sfx_level_complete); }
        pub fn play_game_over(&self) { self.play(&self.sfx_game_over); }
        pub fn play_victory(&self) { self.play(&self.sfx_victory); }
        pub fn play_timer_warning(&self) { self.play(&self.sfx_timer_warning); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn samples_for(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Simple sine blip at given frequency and duration
    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(duration);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32); // linear fade out
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Notes played back to back, sine + harmonics for a retro tone.
    fn gen_notes(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in notes {
            let n = samples_for(dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Correct placement: two-note rise E6→A6
    fn gen_correct() -> Vec<f32> {
        gen_notes(&[(1319.0, 0.04), (1760.0, 0.07)], 0.25)
    }

    /// Incorrect placement: low buzz with a falling pitch
    fn gen_incorrect() -> Vec<f32> {
        let n = samples_for(0.16);
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 220.0 - t * 80.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                // Square wave
                let wave = if (ti * freq * TAU).sin() >= 0.0 { 1.0 } else { -1.0 };
                wave * (1.0 - t).powf(0.7) * 0.15
            })
            .collect()
    }

    /// Level complete: ascending arpeggio C5→E5→G5→C6
    fn gen_level_complete() -> Vec<f32> {
        gen_notes(&[(523.0, 0.08), (659.0, 0.08), (784.0, 0.08), (1047.0, 0.25)], 0.3)
    }

    /// Game over: sad descending tone A4→F#4→Eb4→C4
    fn gen_game_over() -> Vec<f32> {
        let mut samples = gen_notes(&[(440.0, 0.14), (370.0, 0.14), (311.0, 0.14), (261.0, 0.3)], 0.3);
        // Final fade
        let total = samples.len();
        let fade_len = total / 4;
        for i in (total - fade_len)..total {
            samples[i] *= (total - i) as f32 / fade_len as f32;
        }
        samples
    }

    /// Victory: fanfare, then the arpeggio an octave up
    fn gen_victory() -> Vec<f32> {
        let mut samples = gen_notes(&[(523.0, 0.1), (523.0, 0.1), (784.0, 0.2)], 0.3);
        samples.extend(gen_notes(&[(1047.0, 0.08), (1319.0, 0.08), (1568.0, 0.08), (2093.0, 0.35)], 0.25));
        samples
    }

    /// Timer warning: short woodblock-like tick
    fn gen_tick() -> Vec<f32> {
        let n = samples_for(0.04);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = (1.0 - i as f32 / n as f32).powi(3);
                (t * 1200.0 * TAU).sin() * env * 0.3
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_sample_count() {
            let samples = gen_correct();
            let wav = make_wav(&samples);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + samples.len() * 2);
            let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
            assert_eq!(data_size as usize, samples.len() * 2);
        }

        #[test]
        fn generated_samples_stay_in_range() {
            for samples in [gen_incorrect(), gen_game_over(), gen_victory(), gen_tick()] {
                assert!(!samples.is_empty());
                assert!(samples.iter().all(|s| s.abs() <= 1.0));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_path_step(&self, _index: usize, _total: usize) {}
    pub fn play_click(&self) {}
    pub fn play_correct(&self) {}
    pub fn play_incorrect(&self) {}
    pub fn play_level_complete(&self) {}
    pub fn play_game_over(&self) {}
    pub fn play_victory(&self) {}
    pub fn play_timer_warning(&self) {}
}
