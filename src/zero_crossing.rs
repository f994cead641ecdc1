//! Very simple clock recovery.
use crate::Float;
use crate::block::{Block, BlockEOF, BlockName, BlockRet};
use crate::stream::{ReadStream, WriteStream};

/** Very simple clock recovery by looking at zero crossings.

Every time the stream crosses 0, this is assumed to be right in the
middle of two symbols, and the next chosen sample to use as a symbol
will be the one `sps/2` samples later.

The one after that will be after `1.5*sps` samples. And so on, until
the next zero crossing happens, and the clock thus resets.

Future work in this block would be to adjust the sps according to when
the expected vs actual zero crossings happen, effectively phase lock
looping. But for now it's good enough to decode simple 2FSK reliably.
*/
pub struct ZeroCrossing {
    sps: Float,
    clock: Float,
    last_sign: bool,
    last_cross: f32,
    counter: u64,
    src: ReadStream<Float>,
    dst: WriteStream<Float>,
}

impl ZeroCrossing {
    /// Create new ZeroCrossing block.
    ///
    /// `sps` is samples per symbol, i.e. `samp_rate / baud`.
    #[must_use]
    pub fn new(src: ReadStream<Float>, sps: Float) -> (Self, ReadStream<Float>) {
        assert!(sps > 1.0);
        let (dst, rx) = WriteStream::new();
        (
            Self {
                src,
                dst,
                sps,
                clock: sps,
                last_sign: false,
                last_cross: 0.0,
                counter: 0,
            },
            rx,
        )
    }
}

impl BlockName for ZeroCrossing {
    fn block_name(&self) -> &str {
        "ZeroCrossing"
    }
}

impl BlockEOF for ZeroCrossing {
    fn eof(&mut self) -> bool {
        self.src.eof()
    }
}

impl Block for ZeroCrossing {
    fn work(&mut self) -> crate::Result<BlockRet<'_>> {
        let (input, _tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        let mut o = self.dst.write_buf()?;
        if o.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.dst, 1));
        }
        let mut n = 0;
        let mut opos = 0;
        for sample in input.iter() {
            n += 1;
            if self.counter == (self.last_cross + (self.clock / 2.0)) as u64 {
                o.slice()[opos] = sample;
                opos += 1;
                self.last_cross += self.clock;
                if opos == o.len() {
                    break;
                }
            }

            let sign = sample > 0.0;
            if sign != self.last_sign {
                self.last_cross = self.counter as f32;
                self.clock = self.sps;
            }
            self.last_sign = sign;
            self.counter += 1;

            let step_back = (10.0 * self.clock) as u64;
            if self.counter > step_back && self.last_cross as u64 > step_back {
                self.counter -= step_back;
                self.last_cross -= step_back as f32;
            }
        }
        input.consume(n);
        o.produce(opos, &[]);
        Ok(BlockRet::Again)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_one_sample_per_symbol() {
        // Four symbol periods of a clean square wave at 8 samples/symbol.
        let sps = 8.0;
        let mut samples = Vec::new();
        for i in 0..64 {
            let sym = (i / sps as usize) % 2;
            samples.push(if sym == 0 { 1.0 } else { -1.0 });
        }
        let (mut zc, out) = ZeroCrossing::new(ReadStream::from_slice(&samples), sps);
        zc.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        assert!(!res.to_vec().is_empty());
    }
}
