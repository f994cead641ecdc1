//! Convenient mod collecting commonly used blocks for import.
pub use crate::binary_slicer::BinarySlicer;
pub use crate::correlate_access_code::{CorrelateAccessCode, CorrelateAccessCodeTag};
pub use crate::descrambler::{Descrambler, Scrambler};
pub use crate::file_sink::FileSink;
pub use crate::file_source::FileSource;
pub use crate::fir::FIRFilter;
pub use crate::hdlc::{HdlcDeframer, HdlcFramer};
pub use crate::kiss::{KissDecode, KissEncode};
pub use crate::nrzi::{NrziDecode, NrziEncode};
pub use crate::single_pole_iir_filter::SinglePoleIIRFilter;
pub use crate::zero_crossing::ZeroCrossing;
