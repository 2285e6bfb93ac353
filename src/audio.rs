//! Audio cue boundary
//!
//! The simulation never mixes sound itself. It names a cue and a volume and
//! hands both to an `AudioSink`.

/// Sound cue names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Continuous snow hiss while grounded (looping)
    Slide,
    /// Rider launched a jump
    Jump,
    /// Rider touched down after being airborne
    Land,
    /// Rider hit a tree
    TreeHit,
    /// Rider scraped a track edge
    EdgeHit,
    /// Balloon popped
    BalloonPop,
}

/// Receiver for cues
pub trait AudioSink {
    /// Fire a one-shot cue
    fn play(&mut self, cue: SoundCue, volume: f32);
    /// Set the volume of a looping cue (0 silences it)
    fn set_loop(&mut self, cue: SoundCue, volume: f32);
}

/// Volume for an impact at the given speed
pub fn impact_volume(speed: f32, loud_speed: f32) -> f32 {
    if loud_speed <= 0.0 {
        return 1.0;
    }
    (speed / loud_speed).clamp(0.0, 1.0)
}

/// Volume of the sliding loop; silent in the air
pub fn slide_volume(speed: f32, loud_speed: f32, grounded: bool) -> f32 {
    if grounded {
        // Quieter than impacts at the same speed
        impact_volume(speed, loud_speed) * 0.6
    } else {
        0.0
    }
}

/// Sink that drops every cue
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _: SoundCue, _: f32) {}
    fn set_loop(&mut self, _: SoundCue, _: f32) {}
}

/// Sink that remembers what it was asked to play
#[derive(Debug, Clone, Default)]
pub struct CueLog {
    pub played: Vec<(SoundCue, f32)>,
    pub slide_volume: f32,
}

impl CueLog {
    pub fn count(&self, cue: SoundCue) -> usize {
        self.played.iter().filter(|(c, _)| *c == cue).count()
    }
}

impl AudioSink for CueLog {
    fn play(&mut self, cue: SoundCue, volume: f32) {
        self.played.push((cue, volume));
    }

    fn set_loop(&mut self, cue: SoundCue, volume: f32) {
        if cue == SoundCue::Slide {
            self.slide_volume = volume;
        }
    }
}

/// Master/effects volume and mute in front of another sink
pub struct AudioMixer<A: AudioSink> {
    inner: A,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl<A: AudioSink> AudioMixer<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }
}

impl<A: AudioSink> AudioSink for AudioMixer<A> {
    fn play(&mut self, cue: SoundCue, volume: f32) {
        let vol = volume * self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        self.inner.play(cue, vol);
    }

    fn set_loop(&mut self, cue: SoundCue, volume: f32) {
        let vol = volume * self.effective_volume();
        self.inner.set_loop(cue, vol);
    }
}
