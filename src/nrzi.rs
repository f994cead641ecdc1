/*! NRZI — Non return to zero, inverted.

<https://en.wikipedia.org/wiki/Non-return-to-zero>

"NRZI" is ambiguous as to which transition means zero and which means
one. This uses NRZI-S: a toggle is a zero bit, and holding level is a one
bit. That's the convention AX.25 uses, both 1200bps Bell 202 and 9600bps
G3RUH.
*/
use tnc_macros::Block;

use crate::stream::{ReadStream, WriteStream};

/// NRZI decoder: turns line transitions back into data bits.
#[derive(Block)]
#[tnc(crate, new, sync)]
pub struct NrziDecode {
    #[tnc(default)]
    last: u8,
    #[tnc(in)]
    src: ReadStream<u8>,
    #[tnc(out)]
    dst: WriteStream<u8>,
}

impl NrziDecode {
    fn process_sync(&mut self, a: u8) -> u8 {
        let bit = 1 ^ a ^ self.last;
        self.last = a;
        bit
    }
}

/// NRZI encoder: turns data bits into line transitions.
#[derive(Block)]
#[tnc(crate, new, sync)]
pub struct NrziEncode {
    #[tnc(default)]
    last: u8,
    #[tnc(in)]
    src: ReadStream<u8>,
    #[tnc(out)]
    dst: WriteStream<u8>,
}

impl NrziEncode {
    fn process_sync(&mut self, bit: u8) -> u8 {
        let line = 1 ^ bit ^ self.last;
        self.last = line;
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_matches_encode() {
        let bits = vec![1u8, 0, 0, 1, 1, 0, 1, 0, 0, 0, 1];
        let (mut enc, enc_out) = NrziEncode::new(ReadStream::from_slice(&bits));
        enc.work().unwrap();
        let (line, _) = enc_out.read_buf().unwrap();
        let line = line.to_vec();

        let (mut dec, dec_out) = NrziDecode::new(ReadStream::from_slice(&line));
        dec.work().unwrap();
        let (decoded, _) = dec_out.read_buf().unwrap();
        assert_eq!(decoded.to_vec(), bits);
    }

    #[test]
    fn decode_constant_line_is_all_ones() {
        let line = vec![1u8, 1, 1, 1, 1];
        let (mut dec, dec_out) = NrziDecode::new(ReadStream::from_slice(&line));
        dec.work().unwrap();
        let (decoded, _) = dec_out.read_buf().unwrap();
        assert_eq!(decoded.to_vec(), vec![1, 1, 1, 1, 1]);
    }
}
