//! Voltage Controlled Oscillator.
//!
//! IOW an FM modulator: turns a Float control signal into a rotating unit
//! vector on the complex plane, used by the tone/baseband generator to turn
//! bits into an AFSK or G3RUH-style waveform.
use tnc_macros::Block;

use crate::stream::{ReadStream, WriteStream};
use crate::{Complex, Float};

const MX: f64 = 2.0 * std::f64::consts::PI;

/// Voltage Controlled Oscillator.
///
/// IOW an FM modulator.
#[derive(Block)]
#[tnc(crate, new, sync)]
pub struct Vco {
    #[tnc(in)]
    src: ReadStream<Float>,
    #[tnc(out)]
    dst: WriteStream<Complex>,

    k: f64,

    #[tnc(default)]
    phase: f64,
}

impl Vco {
    fn process_sync(&mut self, a: Float) -> Complex {
        self.phase += self.k * (a as f64);
        if self.phase > MX {
            self.phase -= MX;
        }
        if self.phase < -MX {
            self.phase += MX;
        }
        Complex::new(self.phase.cos() as Float, self.phase.sin() as Float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_zero_input_holds_phase() {
        let input = [0.0 as Float; 4];
        let (mut v, out) = Vco::new(ReadStream::from_slice(&input), 1.0);
        v.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        for c in res.to_vec() {
            assert!((c.norm() - 1.0).abs() < 1e-4);
        }
    }
}
