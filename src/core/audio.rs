use log::{debug, info};

// --- Public API ---

/// The audio hardware's monotonic clock plus the transport controls the
/// rhythm core needs. `dsp_time` keeps advancing while music is paused.
pub trait AudioClock {
    fn dsp_time(&self) -> f64;
    fn play(&mut self);
    fn pause(&mut self);
    fn unpause(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transport {
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// A clock driven by hand. Used by the headless runner and by tests.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: f64,
    transport: Transport,
    position: f64,
    song_length: Option<f64>,
}

impl ManualClock {
    pub fn new(start_time: f64) -> Self {
        Self {
            now: start_time,
            transport: Transport::Idle,
            position: 0.0,
            song_length: None,
        }
    }

    /// Playback stops on its own once this many seconds of music have played.
    pub fn with_song_length(mut self, seconds: f64) -> Self {
        self.song_length = Some(seconds);
        self
    }

    pub fn advance(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        self.now += dt;
        if self.transport != Transport::Playing {
            return;
        }
        self.position += dt;
        if let Some(len) = self.song_length {
            if self.position >= len {
                info!("Music reached its end at {:.3}s.", len);
                self.transport = Transport::Stopped;
            }
        }
    }

    pub fn advance_to(&mut self, time: f64) {
        self.advance(time - self.now);
    }

    /// Seconds of music played so far.
    pub fn position(&self) -> f64 {
        self.position
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AudioClock for ManualClock {
    fn dsp_time(&self) -> f64 {
        self.now
    }

    fn play(&mut self) {
        debug!("Music playing at dsp {:.3}.", self.now);
        self.position = 0.0;
        self.transport = Transport::Playing;
    }

    fn pause(&mut self) {
        if self.transport == Transport::Playing {
            self.transport = Transport::Paused;
        }
    }

    fn unpause(&mut self) {
        if self.transport == Transport::Paused {
            self.transport = Transport::Playing;
        }
    }

    fn stop(&mut self) {
        self.transport = Transport::Stopped;
    }

    fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }
}
