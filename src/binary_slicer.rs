//! Turn positive Float values into binary `1u8`, and negative into `0u8`.
use tnc_macros::Block;

use crate::Float;
use crate::stream::{ReadStream, WriteStream};

/// Turn positive Float values into binary `1u8`, and negative into `0u8`.
#[derive(Block)]
#[tnc(crate, new, sync)]
pub struct BinarySlicer {
    #[tnc(in)]
    src: ReadStream<Float>,
    #[tnc(out)]
    dst: WriteStream<u8>,
}

impl BinarySlicer {
    fn process_sync(&self, a: Float) -> u8 {
        if a > 0.0 { 1 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_on_zero() {
        let samples = [1.0 as Float, -1.0, 0.5, -0.5, 0.0];
        let (mut b, out) = BinarySlicer::new(ReadStream::from_slice(&samples));
        b.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        assert_eq!(res.to_vec(), vec![1, 0, 1, 0, 0]);
    }
}
