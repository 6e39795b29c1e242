use std::fmt;
use std::time::Instant;

/// Wall-clock timer that prints the elapsed time through `Display`.
pub struct Timer {
    time: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Timer {
            time: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.time.elapsed().as_secs_f64()
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:>8.2} s", self.time.elapsed().as_secs_f32())
    }
}
