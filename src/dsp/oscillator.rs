//! Anti-aliased sawtooth source using PolyBLEP.

/// Band-limited sawtooth oscillator. Silent until [`start`](Self::start) is
/// called, and silent again after [`stop`](Self::stop).
#[derive(Debug, Clone)]
pub struct SawOscillator {
    frequency: f64,
    phase: f64,
    sample_rate: f64,
    running: bool,
}

impl SawOscillator {
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        SawOscillator {
            frequency,
            // Half a cycle in: the ramp passes through zero at t = 0.
            phase: 0.5,
            sample_rate,
            running: false,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn set_frequency(&mut self, freq: f64) {
        self.frequency = freq;
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Phase increment per sample.
    fn phase_inc(&self) -> f64 {
        self.frequency / self.sample_rate
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f64 {
        if !self.running {
            return 0.0;
        }
        let inc = self.phase_inc();
        // Rises from -1 to +1, then drops; PolyBLEP smooths the drop.
        let sample = 2.0 * self.phase - 1.0 - poly_blep(self.phase, inc);

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }
}

/// PolyBLEP (Polynomial Band-Limited Step) correction.
///
/// `t` is the phase [0, 1), `dt` is the phase increment per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_until_started() {
        let mut osc = SawOscillator::new(150.0, 44100.0);
        for _ in 0..64 {
            assert_eq!(osc.next_sample(), 0.0);
        }
        osc.start();
        let mut any = false;
        for _ in 0..64 {
            any |= osc.next_sample() != 0.0;
        }
        assert!(any, "started oscillator should produce signal");
    }

    #[test]
    fn starts_at_zero() {
        let mut osc = SawOscillator::new(150.0, 44100.0);
        osc.start();
        let s = osc.next_sample();
        assert!(s.abs() < 1e-12, "saw should start at 0, got {s}");
    }

    #[test]
    fn sawtooth_range() {
        let mut osc = SawOscillator::new(300.0, 44100.0);
        osc.start();
        for _ in 0..44100 {
            let s = osc.next_sample();
            assert!((-1.5..=1.5).contains(&s), "Saw out of range: {s}");
        }
    }

    #[test]
    fn stop_silences() {
        let mut osc = SawOscillator::new(150.0, 44100.0);
        osc.start();
        osc.next_sample();
        osc.stop();
        assert!(!osc.is_running());
        assert_eq!(osc.next_sample(), 0.0);
    }

    #[test]
    fn one_rising_crossing_per_period() {
        let mut osc = SawOscillator::new(100.0, 44100.0);
        osc.start();
        let mut prev = osc.next_sample();
        let mut crossings = 0;
        for _ in 1..44100 {
            let s = osc.next_sample();
            if prev <= 0.0 && s > 0.0 {
                crossings += 1;
            }
            prev = s;
        }
        assert!((99..=101).contains(&crossings), "expected ~100 crossings, got {crossings}");
    }
}
