//! Write a stream of samples to a raw (headerless) file.
use std::io::{BufWriter, Write};

use crate::Sample;
use crate::block::{Block, BlockEOF, BlockName, BlockRet};
use crate::stream::ReadStream;
use crate::Result;

/// File write mode.
pub enum Mode {
    /// Create a new file. Fail if it already exists.
    Create,
    /// Overwrite an existing file, or create a new one.
    Overwrite,
    /// Append to an existing file, or create a new one.
    Append,
}

/// Write a stream of samples to a raw (headerless) file.
///
/// Each sample is serialized with [`Sample::serialize`] and written back to
/// back, with no container framing.
pub struct FileSink<T> {
    f: BufWriter<std::fs::File>,
    src: ReadStream<T>,
}

impl<T: Copy + Default> FileSink<T> {
    /// Create a new sink writing to `filename` in the given `mode`.
    pub fn new(src: ReadStream<T>, filename: &std::path::Path, mode: Mode) -> Result<Self> {
        let f = BufWriter::new(match mode {
            Mode::Create => std::fs::File::options()
                .write(true)
                .create_new(true)
                .open(filename)?,
            Mode::Overwrite => std::fs::File::create(filename)?,
            Mode::Append => std::fs::File::options()
                .append(true)
                .create(true)
                .open(filename)?,
        });
        Ok(Self { f, src })
    }

    /// Flush the write buffer to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.f.flush()?;
        Ok(())
    }
}

impl<T> BlockName for FileSink<T> {
    fn block_name(&self) -> &str {
        "FileSink"
    }
}

impl<T> BlockEOF for FileSink<T> {
    fn eof(&mut self) -> bool {
        self.src.eof()
    }
}

impl<T> Block for FileSink<T>
where
    T: Copy + Default + Sample<Type = T>,
{
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let (input, _tags) = self.src.read_buf()?;
        let n = input.len();
        if n == 0 {
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        let mut v = Vec::with_capacity(n * T::size());
        for s in input.iter() {
            v.extend(s.serialize());
        }
        self.f.write_all(&v)?;
        input.consume(n);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Float;

    #[test]
    fn writes_f32_samples() {
        let tmpd = std::env::temp_dir();
        let tmpfn = tmpd.join(format!("tnc_file_sink_test_{}.bin", std::process::id()));
        #[allow(clippy::approx_constant)]
        let src = ReadStream::from_slice(&[1.0_f32, 3.0, 3.14, -3.14]);
        {
            let mut sink = FileSink::<Float>::new(src, &tmpfn, Mode::Overwrite).unwrap();
            sink.work().unwrap();
            sink.flush().unwrap();
        }
        let out = std::fs::read(&tmpfn).unwrap();
        assert_eq!(
            out,
            vec![0, 0, 128, 63, 0, 0, 64, 64, 195, 245, 72, 64, 195, 245, 72, 192]
        );
        std::fs::remove_file(&tmpfn).ok();
    }
}
