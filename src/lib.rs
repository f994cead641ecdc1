/*! `tnc` is a software Terminal Node Controller for amateur packet radio.

It turns audio waveforms into AX.25 frames and back, and gives higher level
services (APRS decoding, connected-mode sessions, gateways) a stable base to
build on.

It's built the way [rustradio][rustradio]-style SDR frameworks are: blocks
that do one thing, connected by typed streams, run by a graph scheduler. The
three subsystems that carry every packet end to end are:

* The modem layer (AFSK / PSK / G3RUH-scrambled baseband demodulators and
  modulators).
* The frame layer (HDLC bit engine, AX.25 addressing/control/FCS, and two
  FEC envelopes: FX.25 and IL2P).
* The APRS parser, which dissects a received frame's information field into
  typed records.

# Architecture overview

A flowgraph is built from blocks connected by unidirectional streams. Each
block has zero or more input streams and zero or more output streams. Signal
flows from sources (no inputs) to sinks (no outputs).

```text
  [ Audio source ]
        |
 [ Demodulator bank ]
        |
  [ HDLC bit engine ]
        |
 [ FEC envelope decode ]
        |
   [ AX.25 validate ]
        |
   [ APRS parser ]
        |
    [ Consumer ]
```

[rustradio]: https://github.com/ThomasHabets/rustradio
*/
#![warn(missing_docs)]

// Generic flowgraph plumbing, in the style of a small GNU Radio.
pub mod block;
pub mod circular_buffer;
pub mod graph;
pub mod mtgraph;
pub mod stream;

// Shared DSP building blocks used by the demodulator/modulator bank.
pub mod binary_slicer;
pub mod fir;
pub mod single_pole_iir_filter;
pub mod vco;
pub mod window;
pub mod zero_crossing;

// C1: Reed-Solomon codec.
pub mod rs;

// C2: HDLC bit engine (bit-stuffing, NRZI, G3RUH scrambler).
pub mod hdlc;

// C5: Frame layer.
pub mod ax25;
pub mod fx25;
pub mod il2p;

// C3/C4: Demodulator bank and tone/baseband generator.
pub mod modem;

// C6: Multi-modem dispatcher.
pub mod dispatcher;

// C7: APRS parser.
pub mod aprs;

// C8: Shared configuration and channel descriptor.
pub mod config;

// Blocks wiring the above into the flowgraph, plus small reusable blocks.
pub mod blocks;
pub mod correlate_access_code;
pub mod descrambler;
pub mod file_sink;
pub mod file_source;
pub mod kiss;
pub mod nrzi;

/// Float type used throughout the DSP path. Filter state and audio samples
/// are `f32`; see [`aprs::Coordinate`] for why position math stays in `f64`.
pub type Float = f32;

/// Complex (I/Q) sample, used by the PSK demodulator/modulator.
pub type Complex = num_complex::Complex<Float>;

/// Errors produced anywhere in the crate.
///
/// Transient receive errors (bad FCS, RS failure, HDLC abort) are *not*
/// reported through this type on the main path -- per the error design,
/// those are counted in statistics and only surfaced via debug hooks. This
/// type is for configuration errors, resource errors, and internal
/// plumbing failures that a caller needs to see.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapped I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value was out of range or contradictory.
    #[error("configuration error: {0}")]
    Config(String),

    /// Catch-all for errors with just a message, e.g. internal plumbing
    /// invariants that shouldn't normally be reachable from outside.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from a message.
    #[must_use]
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(s: impl Into<String>) -> Self {
        Error::Config(s.into())
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(e: std::array::TryFromSliceError) -> Self {
        Error::Msg(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::Msg(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::Msg(format!("poisoned lock: {e}"))
    }
}

/// Crate-wide `Result` alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A trait all stream sample types must implement, for blocks that need to
/// serialize to/from raw bytes (e.g. file sources/sinks).
pub trait Sample {
    /// The type of the sample.
    type Type;

    /// The serialized size of one sample.
    fn size() -> usize;

    /// Parse one sample.
    fn parse(data: &[u8]) -> Result<Self::Type>;

    /// Serialize one sample.
    fn serialize(&self) -> Vec<u8>;
}

impl Sample for Complex {
    type Type = Complex;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::msg("Complex sample has wrong size"));
        }
        let i = Float::from_le_bytes(data[0..Self::size() / 2].try_into()?);
        let q = Float::from_le_bytes(data[Self::size() / 2..].try_into()?);
        Ok(Complex::new(i, q))
    }
    fn serialize(&self) -> Vec<u8> {
        let mut ret = Vec::new();
        ret.extend(Float::to_le_bytes(self.re));
        ret.extend(Float::to_le_bytes(self.im));
        ret
    }
}

impl Sample for Float {
    type Type = Float;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::msg("Float sample has wrong size"));
        }
        Ok(Float::from_le_bytes(data[0..Self::size()].try_into()?))
    }
    fn serialize(&self) -> Vec<u8> {
        Float::to_le_bytes(*self).to_vec()
    }
}

impl Sample for u8 {
    type Type = u8;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::msg("u8 sample has wrong size"));
        }
        Ok(data[0])
    }
    fn serialize(&self) -> Vec<u8> {
        vec![*self]
    }
}

/// Trivial trait for types that have `.len()`, used generically by blocks
/// that peek at message size without caring about the element type.
#[allow(clippy::len_without_is_empty)]
pub trait Len {
    /// Get the length.
    fn len(&self) -> usize;
}
impl<T> Len for Vec<T> {
    fn len(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    //! Test helper functions shared across modules.
    use super::*;

    /// Assert that two slices of complex samples are almost equal.
    pub fn assert_almost_equal_complex(left: &[Complex], right: &[Complex]) {
        assert_eq!(left.len(), right.len(), "\nleft: {left:?}\nright: {right:?}");
        for i in 0..left.len() {
            let dist = (left[i] - right[i]).norm_sqr().sqrt();
            assert!(
                dist <= 0.001,
                "\nElement {i}:\nleft: {:?}\nright: {:?}",
                left[i],
                right[i]
            );
        }
    }

    /// Assert that two slices of floats are almost equal.
    pub fn assert_almost_equal_float(left: &[Float], right: &[Float]) {
        assert_eq!(left.len(), right.len(), "\nleft: {left:?}\nright: {right:?}");
        for i in 0..left.len() {
            let dist = (left[i] - right[i]).abs();
            assert!(
                dist <= 0.001,
                "\nElement {i}:\nleft: {:?}\nright: {:?}",
                left[i],
                right[i]
            );
        }
    }
}
