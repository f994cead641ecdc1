//! Read a stream of samples from a raw (headerless) file.
use std::io::{BufReader, Read};

use crate::Sample;
use crate::block::{Block, BlockEOF, BlockName, BlockRet};
use crate::stream::WriteStream;
use crate::Result;

/// Read a stream of samples from a raw (headerless) file.
///
/// Each sample is read back with [`Sample::parse`], so the file must contain
/// exactly `Sample::size()` bytes per element with no framing. WAV/RIFF
/// container parsing is a host-binary concern, not this block's.
pub struct FileSource<T> {
    filename: String,
    f: BufReader<std::fs::File>,
    repeat: bool,
    buf: Vec<u8>,
    dst: WriteStream<T>,
}

impl<T: Default + Copy> FileSource<T> {
    /// Open `filename` as a sample source. If `repeat` is set, re-opens the
    /// file from the start on EOF instead of ending the stream.
    pub fn new(filename: &str, repeat: bool) -> Result<(Self, crate::stream::ReadStream<T>)> {
        let f = BufReader::new(std::fs::File::open(filename)?);
        let (dst, rx) = WriteStream::new();
        Ok((
            Self {
                filename: filename.to_string(),
                f,
                repeat,
                buf: Vec::new(),
                dst,
            },
            rx,
        ))
    }
}

impl<T> BlockName for FileSource<T> {
    fn block_name(&self) -> &str {
        "FileSource"
    }
}

impl<T> BlockEOF for FileSource<T> {}

impl<T> Block for FileSource<T>
where
    T: Sample<Type = T> + Copy + Default,
{
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let mut o = self.dst.write_buf()?;
        let sample_size = T::size();
        let have = self.buf.len() / sample_size;
        let want = o.len();
        if want == 0 {
            return Ok(BlockRet::OutputFull);
        }

        if have < want {
            let get_bytes = (want - have) * sample_size;
            let mut buffer = vec![0u8; get_bytes];
            let n = self.f.read(&mut buffer[..])?;
            if n == 0 {
                if self.repeat {
                    self.f = BufReader::new(std::fs::File::open(&self.filename)?);
                    return Ok(BlockRet::Again);
                }
                return Ok(BlockRet::EOF);
            }
            self.buf.extend_from_slice(&buffer[..n]);
        }

        let have = self.buf.len() / sample_size;
        if have == 0 {
            return Ok(BlockRet::Noop);
        }
        let n = std::cmp::min(have, want);
        let parsed: Vec<T> = self.buf[..n * sample_size]
            .chunks_exact(sample_size)
            .map(T::parse)
            .collect::<Result<_>>()?;
        self.buf.drain(0..n * sample_size);
        o.fill_from_slice(&parsed);
        o.produce(n, &[]);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Float;

    #[test]
    fn reads_f32_samples() {
        let tmpd = std::env::temp_dir();
        let tmpfn = tmpd.join(format!("tnc_file_source_test_{}.bin", std::process::id()));
        std::fs::write(
            &tmpfn,
            vec![0, 0, 128, 63, 0, 0, 64, 64, 195, 245, 72, 64, 195, 245, 72, 192],
        )
        .unwrap();

        let (mut src, out) = FileSource::<Float>::new(tmpfn.to_str().unwrap(), false).unwrap();
        src.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        #[allow(clippy::approx_constant)]
        let expected = vec![1.0_f32, 3.0, 3.14, -3.14];
        assert_eq!(res.to_vec(), expected);

        std::fs::remove_file(&tmpfn).ok();
    }
}
