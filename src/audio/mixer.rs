// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Voice mixing and the audio clock.
//!
//! The mixer owns the render-side state of every live voice: sample
//! position, playback rate, and a smoothed gain. The control thread hands
//! it precomputed parameters (start timestamps, rates, gain targets) and
//! the render callback consumes them; the mixer never reads engine state.
//!
//! The audio clock is the number of frames rendered so far divided by the
//! output sample rate. Voice start times are expressed on this clock, and
//! starts that fall inside a render buffer begin at the exact frame.

use std::sync::Arc;

use crate::sample::SampleHandle;

/// Identifier for a live voice
pub type VoiceId = u64;

/// Default gain smoothing time constant for mute/solo ramps, in seconds
pub const GAIN_SMOOTHING_SECONDS: f64 = 0.01;

/// Render state for one live voice
#[derive(Debug)]
struct VoiceDsp {
    id: VoiceId,
    sample: Arc<SampleHandle>,
    /// Fractional frame position within the sample
    position: f64,
    /// Source frames consumed per source-rate output frame
    rate: f64,
    looping: bool,
    /// Audio-clock start time, in seconds
    start_time: f64,
    gain: f32,
    gain_target: f32,
    ended: bool,
}

/// Mixes live voices into the output stream.
pub struct Mixer {
    sample_rate: u32,
    channels: u16,
    voices: Vec<VoiceDsp>,
    frames_rendered: u64,
    /// Per-frame one-pole coefficient derived from the smoothing constant
    gain_alpha: f32,
    gain_smoothing: f64,
    master_gain: f32,
    capture: Option<Vec<f32>>,
}

fn one_pole_alpha(smoothing_seconds: f64, sample_rate: u32) -> f32 {
    if smoothing_seconds <= 0.0 {
        1.0
    } else {
        (1.0 - (-1.0 / (smoothing_seconds * sample_rate as f64)).exp()) as f32
    }
}

impl Mixer {
    /// Create a mixer for the given output format
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            voices: Vec::new(),
            frames_rendered: 0,
            gain_alpha: one_pole_alpha(GAIN_SMOOTHING_SECONDS, sample_rate),
            gain_smoothing: GAIN_SMOOTHING_SECONDS,
            master_gain: 1.0,
            capture: None,
        }
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Current audio-clock time in seconds
    pub fn clock_seconds(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    /// Adopt the format negotiated with the output device.
    ///
    /// The audio clock keeps its current reading across the change.
    pub fn set_output_format(&mut self, sample_rate: u32, channels: u16) {
        let elapsed = self.clock_seconds();
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.frames_rendered = (elapsed * sample_rate as f64) as u64;
        self.gain_alpha = one_pole_alpha(self.gain_smoothing, sample_rate);
    }

    /// Replace the gain smoothing time constant
    pub fn set_gain_smoothing(&mut self, seconds: f64) {
        self.gain_smoothing = seconds.max(0.0);
        self.gain_alpha = one_pole_alpha(self.gain_smoothing, self.sample_rate);
    }

    /// Master output gain
    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
    }

    /// Add a looping voice scheduled at `start_time` on the audio clock.
    ///
    /// The initial gain is applied immediately (no ramp-in). The caller is
    /// responsible for never keeping two voices alive for the same cell.
    pub fn spawn_voice(
        &mut self,
        id: VoiceId,
        sample: Arc<SampleHandle>,
        rate: f64,
        gain: f32,
        start_time: f64,
    ) {
        self.voices.push(VoiceDsp {
            id,
            sample,
            position: 0.0,
            rate,
            looping: true,
            start_time,
            gain,
            gain_target: gain,
            ended: false,
        });
    }

    /// Remove a voice immediately. Unknown ids are ignored.
    pub fn stop_voice(&mut self, id: VoiceId) {
        self.voices.retain(|v| v.id != id);
    }

    /// Remove every voice
    pub fn stop_all_voices(&mut self) {
        self.voices.clear();
    }

    /// Set a voice's gain immediately (live volume slider)
    pub fn set_voice_gain(&mut self, id: VoiceId, gain: f32) {
        if let Some(v) = self.voices.iter_mut().find(|v| v.id == id) {
            v.gain = gain;
            v.gain_target = gain;
        }
    }

    /// Set a voice's gain target, approached with the smoothing constant
    pub fn set_voice_gain_target(&mut self, id: VoiceId, gain: f32) {
        if let Some(v) = self.voices.iter_mut().find(|v| v.id == id) {
            v.gain_target = gain;
        }
    }

    /// Replace a voice's playback rate without interrupting it
    pub fn set_voice_rate(&mut self, id: VoiceId, rate: f64) {
        if let Some(v) = self.voices.iter_mut().find(|v| v.id == id) {
            v.rate = rate;
        }
    }

    /// Disable looping for a voice (it ends when its data runs out)
    pub fn set_voice_looping(&mut self, id: VoiceId, looping: bool) {
        if let Some(v) = self.voices.iter_mut().find(|v| v.id == id) {
            v.looping = looping;
        }
    }

    /// Remove voices whose data ran out and return their ids
    pub fn take_ended(&mut self) -> Vec<VoiceId> {
        let mut ended = Vec::new();
        self.voices.retain(|v| {
            if v.ended {
                ended.push(v.id);
                false
            } else {
                true
            }
        });
        ended
    }

    /// Number of live voices
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Whether the voice still exists
    pub fn has_voice(&self, id: VoiceId) -> bool {
        self.voices.iter().any(|v| v.id == id)
    }

    /// Current (smoothed) gain of a voice
    pub fn voice_gain(&self, id: VoiceId) -> Option<f32> {
        self.voices.iter().find(|v| v.id == id).map(|v| v.gain)
    }

    /// Gain target of a voice
    pub fn voice_gain_target(&self, id: VoiceId) -> Option<f32> {
        self.voices.iter().find(|v| v.id == id).map(|v| v.gain_target)
    }

    /// Playback rate of a voice
    pub fn voice_rate(&self, id: VoiceId) -> Option<f64> {
        self.voices.iter().find(|v| v.id == id).map(|v| v.rate)
    }

    /// Begin capturing rendered output
    pub fn start_capture(&mut self) {
        if self.capture.is_none() {
            self.capture = Some(Vec::new());
        }
    }

    /// Stop capturing and hand back the interleaved frames
    pub fn finish_capture(&mut self) -> Option<Vec<f32>> {
        self.capture.take()
    }

    /// Whether the capture tap is armed
    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// Render one interleaved buffer and advance the audio clock.
    pub fn render(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = 0.0;
        }
        let channels = self.channels.max(1) as usize;
        let frames = out.len() / channels;
        if frames == 0 {
            return;
        }

        let sr = self.sample_rate as f64;
        let buffer_start = self.frames_rendered as f64 / sr;

        for voice in &mut self.voices {
            if voice.ended {
                continue;
            }

            let offset = if voice.start_time <= buffer_start {
                0
            } else {
                let off = ((voice.start_time - buffer_start) * sr).ceil() as usize;
                if off >= frames {
                    continue;
                }
                off
            };

            let src = voice.sample.data();
            let src_channels = voice.sample.channels().max(1) as usize;
            let src_frames = voice.sample.frames();
            if src_frames == 0 {
                voice.ended = true;
                continue;
            }
            let step = voice.rate * voice.sample.sample_rate() as f64 / sr;

            for frame in offset..frames {
                voice.gain += (voice.gain_target - voice.gain) * self.gain_alpha;

                let i0 = voice.position as usize;
                let frac = (voice.position - i0 as f64) as f32;
                let i1 = if i0 + 1 < src_frames {
                    i0 + 1
                } else if voice.looping {
                    0
                } else {
                    i0
                };

                for ch in 0..channels {
                    let sc = ch.min(src_channels - 1);
                    let a = src[i0 * src_channels + sc];
                    let b = src[i1 * src_channels + sc];
                    out[frame * channels + ch] += (a + (b - a) * frac) * voice.gain;
                }

                voice.position += step;
                if voice.position >= src_frames as f64 {
                    if voice.looping {
                        voice.position %= src_frames as f64;
                    } else {
                        voice.ended = true;
                        break;
                    }
                }
            }
        }

        if self.master_gain != 1.0 {
            for s in out.iter_mut() {
                *s *= self.master_gain;
            }
        }

        if let Some(capture) = &mut self.capture {
            capture.extend_from_slice(out);
        }

        self.frames_rendered += frames as u64;
    }
}
