/*! FIR filtering.

TODO:
* Only handles the case where input, output, and tap type are all the same.
*/
use tnc_macros::Block;

use crate::stream::{ReadStream, WriteStream};
use crate::{Complex, Float};

/// A FIR filter kernel: a fixed set of taps, applied to a sliding window.
pub struct FIR<T> {
    taps: Vec<T>,
}

impl<T> FIR<T>
where
    T: Copy + Default + std::ops::Mul<T, Output = T> + std::ops::Add<T, Output = T>,
{
    /// Create a new FIR kernel from taps, in natural (not time-reversed) order.
    #[must_use]
    pub fn new(taps: &[T]) -> Self {
        Self {
            taps: taps.iter().copied().rev().collect(),
        }
    }

    /// Filter a single output sample from the start of `input`.
    ///
    /// `input` must contain at least as many samples as there are taps.
    #[must_use]
    pub fn filter(&self, input: &[T]) -> T {
        input
            .iter()
            .take(self.taps.len())
            .enumerate()
            .fold(T::default(), |acc, (i, x)| acc + *x * self.taps[i])
    }

    /// Filter every valid position in `input`, producing `input.len() -
    /// taps.len() + 1` output samples.
    #[must_use]
    pub fn filter_n(&self, input: &[T]) -> Vec<T> {
        let n = input.len() - self.taps.len() + 1;
        (0..n).map(|i| self.filter(&input[i..])).collect()
    }
}

/// FIR filter block: convolves the input stream with a fixed tap set.
///
/// Unlike most blocks in this crate this one is *not* sample-synchronous:
/// each `work()` call can consume more samples than it produces (`taps.len()
/// - 1` samples of history are needed per output sample), so it implements
/// `Block` by hand instead of deriving `sync`.
pub struct FIRFilter<T> {
    src: ReadStream<T>,
    dst: WriteStream<T>,
    fir: FIR<T>,
    ntaps: usize,
}

impl<T> FIRFilter<T>
where
    T: Copy + Default + std::ops::Mul<T, Output = T> + std::ops::Add<T, Output = T>,
{
    /// Create a new FIR filter block from taps.
    #[must_use]
    pub fn new(src: ReadStream<T>, taps: &[T]) -> (Self, ReadStream<T>) {
        let (dst, rx) = WriteStream::new();
        (
            Self {
                src,
                dst,
                fir: FIR::new(taps),
                ntaps: taps.len(),
            },
            rx,
        )
    }
}

impl<T> crate::block::BlockName for FIRFilter<T> {
    fn block_name(&self) -> &str {
        "FIRFilter"
    }
}

impl<T> crate::block::BlockEOF for FIRFilter<T> {
    fn eof(&mut self) -> bool {
        self.src.eof()
    }
}

impl<T> crate::block::Block for FIRFilter<T>
where
    T: Copy + Default + std::ops::Mul<T, Output = T> + std::ops::Add<T, Output = T>,
{
    fn work(&mut self) -> crate::Result<crate::block::BlockRet<'_>> {
        use crate::block::BlockRet;
        let (input, _tags) = self.src.read_buf()?;
        if input.len() < self.ntaps {
            return Ok(BlockRet::WaitForStream(&self.src, self.ntaps));
        }
        let avail = input.len() - self.ntaps + 1;
        let mut output = self.dst.write_buf()?;
        if output.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.dst, 1));
        }
        let n = avail.min(output.len());
        if n == 0 {
            return Ok(BlockRet::OutputFull);
        }
        let v = input.to_vec();
        let filtered = self.fir.filter_n(&v[..n + self.ntaps - 1]);
        output.slice()[..n].copy_from_slice(&filtered);
        input.consume(n);
        output.produce(n, &[]);
        Ok(BlockRet::Again)
    }
}

/// Design a Hamming-windowed low-pass FIR filter.
///
/// `samp_rate` and `cutoff` and `twidth` are all in Hz.
// TODO: this would be faster if we supported filtering a Complex by a Float.
#[must_use]
pub fn low_pass(samp_rate: Float, cutoff: Float, twidth: Float) -> Vec<Complex> {
    let pi = std::f64::consts::PI as Float;
    let ntaps = {
        let a: Float = 53.0; // Hamming.
        let t = (a * samp_rate / (22.0 * twidth)) as usize;
        if (t & 1) == 0 { t + 1 } else { t }
    };
    let mut taps = vec![Float::default(); ntaps];
    let window: Vec<Float> = {
        // Hamming
        let m = (ntaps - 1) as Float;
        (0..ntaps)
            .map(|n| 0.54 - 0.46 * (2.0 * pi * (n as Float) / m).cos())
            .collect()
    };
    let m = (ntaps - 1) / 2;
    let fwt0 = 2.0 * pi * cutoff / samp_rate;
    for nm in 0..ntaps {
        let n = nm as i64 - m as i64;
        let nf = n as Float;
        taps[nm] = if n == 0 {
            fwt0 / pi * window[nm]
        } else {
            ((nf * fwt0).sin() / (nf * pi)) * window[nm]
        };
    }
    let gain = {
        let gain: Float = 1.0;
        let mut fmax = taps[m];
        for n in 1..=m {
            fmax += 2.0 * taps[n + m];
        }
        gain / fmax
    };
    taps.into_iter().map(|t| Complex::new(t * gain, 0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_almost_equal(left: &[Complex], right: &[Complex]) {
        assert_eq!(left.len(), right.len(), "\nleft: {left:?}\nright: {right:?}");
        for i in 0..left.len() {
            let dist = (left[i] - right[i]).norm_sqr();
            assert!(dist <= 0.001, "\nleft: {left:?}\nright: {right:?}");
        }
    }

    #[test]
    fn test_complex() {
        let input = vec![
            Complex::new(1.0, 0.0),
            Complex::new(2.0, 0.0),
            Complex::new(3.0, 0.2),
            Complex::new(4.1, 0.0),
            Complex::new(5.0, 0.0),
            Complex::new(6.0, 0.2),
        ];
        let taps = vec![Complex::new(0.1, 0.0), Complex::new(1.0, 0.0), Complex::new(0.0, 0.2)];
        let filter = FIR::new(&taps);
        assert_almost_equal(
            &filter.filter_n(&input),
            &[
                Complex::new(2.3, 0.22),
                Complex::new(3.41, 0.6),
                Complex::new(4.56, 0.6),
                Complex::new(5.6, 0.84),
            ],
        );
    }

    #[test]
    fn test_filter_generator() {
        let taps = low_pass(10000.0, 1000.0, 1000.0);
        assert_eq!(taps.len(), 25);
    }

    #[test]
    fn filter_block_produces_expected_count() {
        let input: Vec<Float> = (0..10).map(|i| i as Float).collect();
        let taps = vec![1.0 as Float, 1.0, 1.0];
        let (mut b, out) = FIRFilter::new(ReadStream::from_slice(&input), &taps);
        use crate::block::Block;
        b.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        assert_eq!(res.to_vec().len(), input.len() - taps.len() + 1);
    }
}
