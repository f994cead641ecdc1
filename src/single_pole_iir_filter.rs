//! Single pole IIR filter.
use tnc_macros::Block;

use crate::stream::{ReadStream, WriteStream};
use crate::Float;

struct SinglePoleIIR<Tout> {
    alpha: Float,
    one_minus_alpha: Float,
    prev_output: Tout,
}

impl<Tout> SinglePoleIIR<Tout>
where
    Tout: Copy + Default + std::ops::Mul<Float, Output = Tout> + std::ops::Add<Output = Tout>,
{
    fn new(alpha: Float) -> Option<Self> {
        let mut r = Self {
            alpha: Float::default(),
            one_minus_alpha: Float::default(),
            prev_output: Tout::default(),
        };
        r.set_taps(alpha)?;
        Some(r)
    }
    fn filter(&mut self, sample: Tout) -> Tout {
        let o: Tout = sample * self.alpha + self.prev_output * self.one_minus_alpha;
        self.prev_output = o;
        o
    }
    fn set_taps(&mut self, alpha: Float) -> Option<()> {
        if !(0.0..=1.0).contains(&alpha) {
            return None;
        }
        self.alpha = alpha;
        self.one_minus_alpha = 1.0 - alpha;
        Some(())
    }
}

/// Single pole IIR (exponential moving average) filter.
#[derive(Block)]
#[tnc(
    crate,
    sync,
    bound = "T: Copy + Default + Send + Sync + 'static + std::ops::Mul<Float, Output = T> + std::ops::Add<Output = T>"
)]
pub struct SinglePoleIIRFilter<T>
where
    T: Copy + Default + std::ops::Mul<T, Output = T> + std::ops::Add<T, Output = T>,
{
    #[tnc(in)]
    src: ReadStream<T>,
    #[tnc(out)]
    dst: WriteStream<T>,
    iir: SinglePoleIIR<T>,
}

impl<T> SinglePoleIIRFilter<T>
where
    T: Copy
        + Default
        + Send
        + Sync
        + 'static
        + std::ops::Mul<Float, Output = T>
        + std::ops::Mul<T, Output = T>
        + std::ops::Add<T, Output = T>,
{
    /// Create a new filter. `alpha` must be in `0.0..=1.0`.
    #[must_use]
    pub fn new(src: ReadStream<T>, alpha: Float) -> Option<(Self, ReadStream<T>)> {
        let (dst, rx) = WriteStream::new();
        Some((
            Self {
                src,
                dst,
                iir: SinglePoleIIR::<T>::new(alpha)?,
            },
            rx,
        ))
    }
    fn process_sync(&mut self, a: T) -> T {
        self.iir.filter(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Complex;

    #[test]
    fn iir_ff() {
        let (mut iir, out) =
            SinglePoleIIRFilter::<Float>::new(ReadStream::from_slice(&[0.1, 0.2]), 0.2).unwrap();
        iir.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        assert_eq!(res.to_vec().len(), 2);
    }

    #[test]
    fn iir_cc() {
        let samples = [Complex::new(1.0, 0.1), Complex::default()];
        let (mut iir, out) = SinglePoleIIRFilter::<Complex>::new(ReadStream::from_slice(&samples), 0.2).unwrap();
        iir.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        assert_eq!(res.to_vec().len(), 2);
    }

    #[test]
    fn reject_bad_alpha() {
        assert!(SinglePoleIIRFilter::<Float>::new(ReadStream::from_slice(&[]), 0.0).is_some());
        assert!(SinglePoleIIRFilter::<Float>::new(ReadStream::from_slice(&[]), 0.1).is_some());
        assert!(SinglePoleIIRFilter::<Float>::new(ReadStream::from_slice(&[]), 1.0).is_some());
        assert!(SinglePoleIIRFilter::<Float>::new(ReadStream::from_slice(&[]), -0.1).is_none());
        assert!(SinglePoleIIRFilter::<Float>::new(ReadStream::from_slice(&[]), 1.1).is_none());
    }
}
