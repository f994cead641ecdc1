/*! Correlate Access Code blocks.

Slides a window of bits across the input, comparing against a known
access code (e.g. the HDLC flag sequence), and emits a 1 when the
window matches within an allowed Hamming distance.
*/
use tnc_macros::Block;

use crate::stream::{ReadStream, Tag, TagValue, WriteStream};

/// CorrelateAccessCode outputs 1 if CAC matches.
#[derive(Block)]
#[tnc(crate, new, sync)]
pub struct CorrelateAccessCode {
    #[tnc(in)]
    src: ReadStream<u8>,
    #[tnc(out)]
    dst: WriteStream<u8>,
    code: Vec<u8>,
    allowed_diffs: usize,
    #[tnc(default)]
    slide: Vec<u8>,
}

impl CorrelateAccessCode {
    fn process_sync(&mut self, a: u8) -> u8 {
        self.slide.push(a);

        if self.slide.len() > self.code.len() {
            self.slide.remove(0);
        }
        let diffs = self
            .slide
            .iter()
            .zip(&self.code)
            .filter(|(a, b)| a != b)
            .count();
        u8::from(diffs <= self.allowed_diffs)
    }
}

/// Like [`CorrelateAccessCode`], but tags the match position instead
/// of encoding it in the output sample value.
#[derive(Block)]
#[tnc(crate, sync_tag)]
pub struct CorrelateAccessCodeTag {
    #[tnc(in)]
    src: ReadStream<u8>,
    #[tnc(out)]
    dst: WriteStream<u8>,
    code: Vec<u8>,
    tag: String,
    allowed_diffs: usize,
    slide: Vec<u8>,
}

impl CorrelateAccessCodeTag {
    /// Create new correlate access block.
    #[must_use]
    pub fn new(
        src: ReadStream<u8>,
        code: Vec<u8>,
        tag: String,
        allowed_diffs: usize,
    ) -> (Self, ReadStream<u8>) {
        let (dst, rx) = WriteStream::new();
        (
            Self {
                src,
                dst,
                slide: vec![0; code.len()],
                code,
                tag,
                allowed_diffs,
            },
            rx,
        )
    }

    fn process_sync_tags<'a>(
        &mut self,
        a: u8,
        tags: &'a [Tag],
    ) -> (u8, std::borrow::Cow<'a, [Tag]>) {
        self.slide.push(a);

        if self.slide.len() > self.code.len() {
            self.slide.remove(0);
        }
        let diffs = self
            .slide
            .iter()
            .zip(&self.code)
            .filter(|(a, b)| a != b)
            .count();
        if diffs <= self.allowed_diffs {
            let mut tags = tags.to_vec();
            tags.push(Tag::new(
                0,
                self.tag.clone(),
                TagValue::U64(diffs.try_into().expect("usize fits in u64")),
            ));
            (a, std::borrow::Cow::Owned(tags))
        } else {
            (a, std::borrow::Cow::Borrowed(tags))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_code() {
        let code = vec![0u8, 1, 1, 0, 1, 1, 1, 1, 0];
        let data = code.clone();
        let (mut b, out) = CorrelateAccessCode::new(ReadStream::from_slice(&data), code, 0);
        b.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        assert_eq!(*res.to_vec().last().unwrap(), 1);
    }

    #[test]
    fn rejects_mismatched_code() {
        let code = vec![0u8, 1, 1, 0, 1, 1, 1, 1, 0];
        let data = vec![1u8; 9];
        let (mut b, out) = CorrelateAccessCode::new(ReadStream::from_slice(&data), code, 0);
        b.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        assert_eq!(*res.to_vec().last().unwrap(), 0);
    }
}
