/*! Block implementation.

Blocks are the main building blocks of the flowgraph. They each do one
thing, and you connect them together with streams to process the data.

Most blocks are implemented by deriving [`tnc_macros::Block`] on a struct
whose fields are tagged with `#[tnc(in)]` / `#[tnc(out)]` / `#[tnc(default)]`
and whose struct itself carries attributes like `new`, `sync`, or
`sync_nocopy_tag`. See that macro's docs for the attribute reference. A few
blocks with unusual scheduling (the demodulator bank, the dispatcher) spell
out `impl Block` by hand instead.
*/
use crate::stream::StreamWait;
use crate::Result;

/// What a block's `work()` did, and what the scheduler should do next.
#[derive(Debug)]
pub enum BlockRet<'a> {
    /// Made some sort of progress. Call `work()` again soon.
    Ok,

    /// Nothing is going to happen until something external changes (e.g.
    /// real time passing for a source tied to a clock). Scheduler should
    /// back off briefly before calling again.
    Pending,

    /// Did nothing, and nothing will change by calling again immediately.
    /// Different from `Pending` in that a source block got here because it
    /// ran out of input, not because it's throttling itself.
    Noop,

    /// This block will never produce anything more.
    EOF,

    /// Work was skipped because every output stream is full. Try again once
    /// a downstream block has consumed some.
    OutputFull,

    /// Not enough input, or not enough room to write output. Scheduler
    /// should wait on the given stream (with `StreamWait::wait`) for at
    /// least `usize` samples/slots before calling `work()` again.
    WaitForStream(&'a dyn StreamWait, usize),

    /// Made progress and there's very likely more to do right away, so the
    /// scheduler can skip its normal backoff and call again immediately.
    Again,

    /// Internal scheduler bookkeeping state. A `Block::work()` implementation
    /// must never return this.
    InternalAwaiting,
}

/// Blocks must be able to report their own name, for logging and stats.
pub trait BlockName {
    /// Return the name of the block, for logging/stats.
    fn block_name(&self) -> &str;
}

/// Blocks that need to do something special on EOF (flush buffered state,
/// emit a final partial frame) can override this. Most blocks use the
/// default, which does nothing.
pub trait BlockEOF {
    /// Called by the scheduler when upstream has gone EOF and this block's
    /// own inputs are drained. Return true once this block is also done.
    fn eof(&mut self) -> bool {
        true
    }
}

/// A unit of work in the flowgraph.
pub trait Block: BlockName + BlockEOF {
    /// Do a unit of work: consume some input, produce some output.
    ///
    /// Implementations should process as much as is readily available and
    /// then return, rather than trying to drain every input stream
    /// completely -- that's what keeps the scheduler responsive when many
    /// blocks share a thread.
    fn work(&mut self) -> Result<BlockRet<'_>>;
}
