/*! Demodulator bank (C3) and tone/baseband generator (C4).

Each of these blocks does the work of several of the teacher's small blocks
chained together (tone correlator plus clock recovery plus slicer, or VCO
plus NRZI encode), but folded into one hand-written `Block` impl rather than
wired as separate streams -- exactly the exception `block.rs`'s own module
doc calls out: "a few blocks with unusual scheduling (the demodulator bank,
the dispatcher) spell out `impl Block` by hand instead". Folding the chain
into one block avoids a fan-out of tiny intermediate streams for state that
never needs to be observed independently.

A channel's demodulator bank is `num_subchan * num_slicers` parallel
decoder instances over the same audio; [`subchannel_bandwidth`] and
[`slicer_threshold`] spread a channel's filter bandwidth and decision
threshold across that grid so the instances are actually diverse.
*/
use crate::Complex;
use crate::Float;
use crate::block::{Block, BlockEOF, BlockName, BlockRet};
use crate::fir::{FIR, low_pass};
use crate::stream::{ReadStream, WriteStream};

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

// ---------------------------------------------------------------------
// Demodulator bank diversity helpers
// ---------------------------------------------------------------------

/// Spread a channel's nominal filter bandwidth across `num_subchan` distinct
/// profiles, `subchannel` in `0..num_subchan`. Profile 0 is the nominal
/// bandwidth; others are offset by +/-15% per step, alternating narrower
/// and wider.
#[must_use]
pub fn subchannel_bandwidth(base_bandwidth: Float, subchannel: u32, num_subchan: u32) -> Float {
    if num_subchan <= 1 || subchannel == 0 {
        return base_bandwidth;
    }
    let step = (subchannel + 1) / 2;
    let sign = if subchannel % 2 == 1 { -1.0 } else { 1.0 };
    base_bandwidth * (1.0 + sign * 0.15 * step as Float)
}

/// Spread a slicer's decision threshold across `num_slicers` distinct
/// values, `slicer` in `0..num_slicers`, centered on zero.
#[must_use]
pub fn slicer_threshold(slicer: u32, num_slicers: u32) -> Float {
    if num_slicers <= 1 {
        return 0.0;
    }
    let mid = (num_slicers - 1) as Float / 2.0;
    (slicer as Float - mid) * 0.1
}

// ---------------------------------------------------------------------
// AFSK (Bell 202 and EAS/SAME) demodulator
// ---------------------------------------------------------------------

/// Tracks the energy of one tone by mixing it to baseband with a complex
/// local oscillator and low-pass filtering the result -- the same
/// quadrature-downconversion trick `quadrature_demod.rs` uses, just tuned to
/// one specific frequency instead of tracking an arbitrary FM carrier.
struct ToneEnergy {
    phase_inc: f64,
    phase: f64,
    alpha: Float,
    iq: Complex,
}

impl ToneEnergy {
    fn new(freq: Float, samp_rate: Float, bandwidth: Float) -> Self {
        let alpha = 1.0 - (-TWO_PI * bandwidth as f64 / samp_rate as f64).exp();
        Self {
            phase_inc: TWO_PI * freq as f64 / samp_rate as f64,
            phase: 0.0,
            alpha: alpha as Float,
            iq: Complex::default(),
        }
    }

    fn step(&mut self, sample: Float) -> Float {
        let osc = Complex::new(self.phase.cos() as Float, -(self.phase.sin() as Float));
        self.phase += self.phase_inc;
        if self.phase > TWO_PI {
            self.phase -= TWO_PI;
        }
        let mixed = osc * sample;
        self.iq += (mixed - self.iq) * self.alpha;
        self.iq.norm()
    }
}

/// AFSK demodulator: dual-tone energy correlator, zero-crossing clock
/// recovery, binary slicer, NRZI decode to data bits.
///
/// Covers Bell 202 (1200 bps, 1200/2200 Hz) and EAS/SAME (520.83 bps,
/// 2083.3/1562.5 Hz) by varying `baud`/`mark_freq`/`space_freq`/`samp_rate`;
/// both share the exact same demodulation chain per SPEC_FULL.md's AIS/EAS
/// note.
pub struct AfskDemod {
    src: ReadStream<Float>,
    dst: WriteStream<u8>,
    mark: ToneEnergy,
    space: ToneEnergy,
    threshold: Float,
    sps: Float,
    clock: Float,
    last_sign: bool,
    last_cross: f32,
    counter: u64,
    nrzi_last: u8,
}

impl AfskDemod {
    /// Create a new AFSK demodulator.
    ///
    /// `bandwidth` is the per-tone correlator bandwidth in Hz; `threshold`
    /// offsets the slicer decision point (see [`slicer_threshold`]).
    #[must_use]
    pub fn new(
        src: ReadStream<Float>,
        samp_rate: Float,
        baud: Float,
        mark_freq: Float,
        space_freq: Float,
        bandwidth: Float,
        threshold: Float,
    ) -> (Self, ReadStream<u8>) {
        let (dst, rx) = WriteStream::new();
        let sps = samp_rate / baud;
        assert!(sps > 1.0, "samp_rate must exceed baud");
        (
            Self {
                src,
                dst,
                mark: ToneEnergy::new(mark_freq, samp_rate, bandwidth),
                space: ToneEnergy::new(space_freq, samp_rate, bandwidth),
                threshold,
                sps,
                clock: sps,
                last_sign: false,
                last_cross: 0.0,
                counter: 0,
                nrzi_last: 1,
            },
            rx,
        )
    }
}

impl BlockName for AfskDemod {
    fn block_name(&self) -> &str {
        "AfskDemod"
    }
}

impl BlockEOF for AfskDemod {
    fn eof(&mut self) -> bool {
        self.src.eof()
    }
}

impl Block for AfskDemod {
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
            let diff = self.mark.step(sample) - self.space.step(sample);
            let sign = diff > self.threshold;

            if self.counter == (self.last_cross + (self.clock / 2.0)) as u64 {
                let line = u8::from(sign);
                let bit = 1 ^ line ^ self.nrzi_last;
                self.nrzi_last = line;
                o.slice()[opos] = bit;
                opos += 1;
                self.last_cross += self.clock;
                if opos == o.len() {
                    break;
                }
            }

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

// ---------------------------------------------------------------------
// Baseband / G3RUH demodulator
// ---------------------------------------------------------------------

/// Baseband demodulator: zero-crossing clock recovery straight off an FM
/// discriminator's output, binary slicer, NRZI decode.
///
/// Emits the still-scrambled (if the channel is G3RUH) data bit stream;
/// wire the output through [`crate::descrambler::Descrambler::g3ruh`] to
/// recover plain data bits, matching the flowgraph style of composing
/// small blocks rather than folding the LFSR into this one.
pub struct BasebandDemod {
    src: ReadStream<Float>,
    dst: WriteStream<u8>,
    threshold: Float,
    sps: Float,
    clock: Float,
    last_sign: bool,
    last_cross: f32,
    counter: u64,
    nrzi_last: u8,
}

impl BasebandDemod {
    /// Create a new baseband demodulator. `samp_rate`/`baud` set the
    /// clock-recovery rate; `upsample` (see SPEC_FULL.md Sec 4.3) should
    /// already have been applied upstream if `samp_rate / baud` would
    /// otherwise be too low for reliable recovery.
    #[must_use]
    pub fn new(src: ReadStream<Float>, samp_rate: Float, baud: Float, threshold: Float) -> (Self, ReadStream<u8>) {
        let (dst, rx) = WriteStream::new();
        let sps = samp_rate / baud;
        assert!(sps > 1.0, "samp_rate must exceed baud");
        (
            Self {
                src,
                dst,
                threshold,
                sps,
                clock: sps,
                last_sign: false,
                last_cross: 0.0,
                counter: 0,
                nrzi_last: 1,
            },
            rx,
        )
    }
}

impl BlockName for BasebandDemod {
    fn block_name(&self) -> &str {
        "BasebandDemod"
    }
}

impl BlockEOF for BasebandDemod {
    fn eof(&mut self) -> bool {
        self.src.eof()
    }
}

impl Block for BasebandDemod {
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
            let sign = sample > self.threshold;

            if self.counter == (self.last_cross + (self.clock / 2.0)) as u64 {
                let line = u8::from(sign);
                let bit = 1 ^ line ^ self.nrzi_last;
                self.nrzi_last = line;
                o.slice()[opos] = bit;
                opos += 1;
                self.last_cross += self.clock;
                if opos == o.len() {
                    break;
                }
            }

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

// ---------------------------------------------------------------------
// PSK demodulator (QPSK/8PSK)
// ---------------------------------------------------------------------

/// Which of the two incompatible V.26 dibit-to-phase-change mappings to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V26Alternative {
    /// Alternative A.
    A,
    /// Alternative B (45 degrees rotated relative to A).
    B,
}

/// Map a differential phase change (radians) to a dibit, per V.26.
///
/// The exact ITU-specified phase table is reproduced here to the nearest
/// quadrant boundary; interoperability-critical use should double check
/// against the published standard, the same caveat already flagged for
/// `il2p::payload_parity`.
#[must_use]
pub fn v26_phase_to_dibit(phase: Float, alt: V26Alternative) -> (u8, u8) {
    let two_pi = std::f32::consts::TAU;
    let mut p = phase % two_pi;
    if p < 0.0 {
        p += two_pi;
    }
    let offset = match alt {
        V26Alternative::A => 0.0,
        V26Alternative::B => std::f32::consts::FRAC_PI_4,
    };
    let shifted = (p - offset + two_pi) % two_pi;
    let idx = ((shifted / std::f32::consts::FRAC_PI_2).round() as u32) % 4;
    match idx {
        0 => (0, 0),
        1 => (0, 1),
        2 => (1, 1),
        _ => (1, 0),
    }
}

/// Inverse of [`v26_phase_to_dibit`]: the phase change a modulator should
/// apply for a given dibit.
#[must_use]
pub fn v26_dibit_to_phase(dibit: (u8, u8), alt: V26Alternative) -> Float {
    let idx = match dibit {
        (0, 0) => 0,
        (0, 1) => 1,
        (1, 1) => 2,
        _ => 3,
    };
    let offset = match alt {
        V26Alternative::A => 0.0,
        V26Alternative::B => std::f32::consts::FRAC_PI_4,
    };
    offset + idx as Float * std::f32::consts::FRAC_PI_2
}

/// Differential PSK demodulator: one complex sample per symbol in (already
/// symbol-timing-recovered upstream), `bits_per_symbol` data bits out per
/// symbol.
///
/// V.26 QPSK is differentially encoded, so the natural demodulator is the
/// phase *difference* between consecutive symbols -- the same
/// `s * last.conj()` computation `quadrature_demod.rs` uses for FM, just
/// evaluated once per symbol instead of once per sample.
pub struct PskDemod {
    src: ReadStream<Complex>,
    dst: WriteStream<u8>,
    alt: V26Alternative,
    last: Complex,
}

impl PskDemod {
    /// Create a new QPSK differential demodulator for the given V.26
    /// alternative.
    #[must_use]
    pub fn new(src: ReadStream<Complex>, alt: V26Alternative) -> (Self, ReadStream<u8>) {
        let (dst, rx) = WriteStream::new();
        (
            Self {
                src,
                dst,
                alt,
                last: Complex::new(1.0, 0.0),
            },
            rx,
        )
    }
}

impl BlockName for PskDemod {
    fn block_name(&self) -> &str {
        "PskDemod"
    }
}

impl BlockEOF for PskDemod {
    fn eof(&mut self) -> bool {
        self.src.eof()
    }
}

impl Block for PskDemod {
    fn work(&mut self) -> crate::Result<BlockRet<'_>> {
        let (input, _tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        let mut o = self.dst.write_buf()?;
        if o.len() < 2 {
            return Ok(BlockRet::WaitForStream(&self.dst, 2));
        }
        let max_symbols = o.len() / 2;
        let n = input.len().min(max_symbols);
        if n == 0 {
            return Ok(BlockRet::OutputFull);
        }
        let mut opos = 0;
        for symbol in input.iter().take(n) {
            let diff = symbol * self.last.conj();
            self.last = symbol;
            let (b0, b1) = v26_phase_to_dibit(diff.arg(), self.alt);
            o.slice()[opos] = b0;
            o.slice()[opos + 1] = b1;
            opos += 2;
        }
        input.consume(n);
        o.produce(opos, &[]);
        Ok(BlockRet::Again)
    }
}

// ---------------------------------------------------------------------
// Decimation
// ---------------------------------------------------------------------

/// Drop all but every `factor`-th sample. Pair with `fir::FIRFilter` and
/// `fir::low_pass` upstream to band-limit first, the same two-stage
/// (filter, then decimate) structure `rational_resampler.rs` uses.
pub struct Decimator {
    src: ReadStream<Float>,
    dst: WriteStream<Float>,
    factor: usize,
    phase: usize,
}

impl Decimator {
    /// Create a decimator that keeps every `factor`-th sample.
    #[must_use]
    pub fn new(src: ReadStream<Float>, factor: usize) -> (Self, ReadStream<Float>) {
        assert!(factor >= 1);
        let (dst, rx) = WriteStream::new();
        (
            Self {
                src,
                dst,
                factor,
                phase: 0,
            },
            rx,
        )
    }
}

impl BlockName for Decimator {
    fn block_name(&self) -> &str {
        "Decimator"
    }
}

impl BlockEOF for Decimator {
    fn eof(&mut self) -> bool {
        self.src.eof()
    }
}

impl Block for Decimator {
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
            if self.phase == 0 {
                o.slice()[opos] = sample;
                opos += 1;
            }
            self.phase = (self.phase + 1) % self.factor;
            if opos == o.len() {
                break;
            }
        }
        input.consume(n);
        o.produce(opos, &[]);
        Ok(BlockRet::Again)
    }
}

/// Build band-limiting low-pass taps suitable for decimating `samp_rate`
/// down by `factor` ahead of a [`Decimator`], per SPEC_FULL.md 4.3's
/// decimation note.
#[must_use]
pub fn decimation_taps(samp_rate: Float, factor: usize) -> Vec<Complex> {
    let cutoff = samp_rate / (2.0 * factor as Float);
    low_pass(samp_rate, cutoff * 0.8, cutoff * 0.4)
}

// ---------------------------------------------------------------------
// AFSK / baseband / PSK modulators (C4)
// ---------------------------------------------------------------------

/// AFSK modulator: data bits in, phase-continuous two-tone audio out.
///
/// Applies the identical NRZI encode recurrence `nrzi.rs::NrziEncode` uses
/// (`line = 1 ^ bit ^ last`) to turn data bits into tone-hold/tone-change
/// decisions, then a phase accumulator selects mark or space frequency per
/// symbol without a phase discontinuity at the switch -- the same
/// `vco.rs`-style integration used for its G3RUH-style FM carrier.
pub struct AfskMod {
    src: ReadStream<u8>,
    dst: WriteStream<Float>,
    sps: usize,
    mark_inc: f64,
    space_inc: f64,
    phase: f64,
    nrzi_last: u8,
    sub: usize,
    cur_inc: f64,
    amplitude: Float,
}

impl AfskMod {
    /// Create a new AFSK modulator. `amplitude_pct` is 0..=200, per
    /// SPEC_FULL.md 4.4 (100% fills half the digital range).
    #[must_use]
    pub fn new(
        src: ReadStream<u8>,
        samp_rate: Float,
        baud: Float,
        mark_freq: Float,
        space_freq: Float,
        amplitude_pct: Float,
    ) -> (Self, ReadStream<Float>) {
        let (dst, rx) = WriteStream::new();
        let sps = (samp_rate / baud).round() as usize;
        assert!(sps >= 1);
        let mark_inc = TWO_PI * mark_freq as f64 / samp_rate as f64;
        let space_inc = TWO_PI * space_freq as f64 / samp_rate as f64;
        (
            Self {
                src,
                dst,
                sps,
                mark_inc,
                space_inc,
                phase: 0.0,
                nrzi_last: 1,
                sub: 0,
                cur_inc: mark_inc,
                amplitude: amplitude_pct / 200.0,
            },
            rx,
        )
    }
}

impl BlockName for AfskMod {
    fn block_name(&self) -> &str {
        "AfskMod"
    }
}

impl BlockEOF for AfskMod {
    fn eof(&mut self) -> bool {
        self.src.eof() && self.sub == 0
    }
}

impl Block for AfskMod {
    fn work(&mut self) -> crate::Result<BlockRet<'_>> {
        let mut o = self.dst.write_buf()?;
        if o.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.dst, 1));
        }
        let (input, _tags) = self.src.read_buf()?;
        let mut consumed = 0;
        let mut opos = 0;
        let in_vec = input.to_vec();
        while opos < o.len() {
            if self.sub == 0 {
                let Some(&bit) = in_vec.get(consumed) else {
                    break;
                };
                consumed += 1;
                let line = 1 ^ bit ^ self.nrzi_last;
                self.nrzi_last = line;
                self.cur_inc = if line == 1 { self.mark_inc } else { self.space_inc };
            }
            self.phase += self.cur_inc;
            if self.phase > TWO_PI {
                self.phase -= TWO_PI;
            }
            o.slice()[opos] = self.amplitude * self.phase.sin() as Float;
            opos += 1;
            self.sub += 1;
            if self.sub == self.sps {
                self.sub = 0;
            }
        }
        input.consume(consumed);
        o.produce(opos, &[]);
        if opos == 0 {
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        Ok(BlockRet::Again)
    }
}

/// Baseband (NRZ) modulator for G3RUH-style channels.
///
/// Consumes already-scrambled, already-NRZI-encoded line bits (wire a
/// [`crate::descrambler::Scrambler::g3ruh`] then
/// [`crate::nrzi::NrziEncode`] upstream) and produces a rectangular +/-
/// amplitude waveform at `sps` samples per bit. Pair with
/// `fir::FIRFilter`/`fir::low_pass` downstream for raised-cosine-style
/// pulse shaping, the same filter-after-generate structure the teacher
/// uses for its own signal sources.
pub struct BasebandMod {
    src: ReadStream<u8>,
    dst: WriteStream<Float>,
    sps: usize,
    sub: usize,
    cur: Float,
    amplitude: Float,
}

impl BasebandMod {
    /// Create a new baseband modulator.
    #[must_use]
    pub fn new(src: ReadStream<u8>, samp_rate: Float, baud: Float, amplitude_pct: Float) -> (Self, ReadStream<Float>) {
        let (dst, rx) = WriteStream::new();
        let sps = (samp_rate / baud).round() as usize;
        assert!(sps >= 1);
        (
            Self {
                src,
                dst,
                sps,
                sub: 0,
                cur: 0.0,
                amplitude: amplitude_pct / 200.0,
            },
            rx,
        )
    }
}

impl BlockName for BasebandMod {
    fn block_name(&self) -> &str {
        "BasebandMod"
    }
}

impl BlockEOF for BasebandMod {
    fn eof(&mut self) -> bool {
        self.src.eof() && self.sub == 0
    }
}

impl Block for BasebandMod {
    fn work(&mut self) -> crate::Result<BlockRet<'_>> {
        let mut o = self.dst.write_buf()?;
        if o.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.dst, 1));
        }
        let (input, _tags) = self.src.read_buf()?;
        let in_vec = input.to_vec();
        let mut consumed = 0;
        let mut opos = 0;
        while opos < o.len() {
            if self.sub == 0 {
                let Some(&bit) = in_vec.get(consumed) else {
                    break;
                };
                consumed += 1;
                self.cur = if bit == 1 { self.amplitude } else { -self.amplitude };
            }
            o.slice()[opos] = self.cur;
            opos += 1;
            self.sub += 1;
            if self.sub == self.sps {
                self.sub = 0;
            }
        }
        input.consume(consumed);
        o.produce(opos, &[]);
        if opos == 0 {
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        Ok(BlockRet::Again)
    }
}

/// QPSK (V.26) modulator: dibits in, complex baseband symbols out, one
/// sample per symbol (pulse-shape with an upsampling `FIRFilter` downstream
/// for a band-limited channel, as with [`BasebandMod`]).
pub struct PskMod {
    src: ReadStream<u8>,
    dst: WriteStream<Complex>,
    alt: V26Alternative,
    phase: Float,
}

impl PskMod {
    /// Create a new QPSK modulator for the given V.26 alternative.
    #[must_use]
    pub fn new(src: ReadStream<u8>, alt: V26Alternative) -> (Self, ReadStream<Complex>) {
        let (dst, rx) = WriteStream::new();
        (
            Self {
                src,
                dst,
                alt,
                phase: 0.0,
            },
            rx,
        )
    }
}

impl BlockName for PskMod {
    fn block_name(&self) -> &str {
        "PskMod"
    }
}

impl BlockEOF for PskMod {
    fn eof(&mut self) -> bool {
        self.src.eof()
    }
}

impl Block for PskMod {
    fn work(&mut self) -> crate::Result<BlockRet<'_>> {
        let (input, _tags) = self.src.read_buf()?;
        if input.len() < 2 {
            return Ok(BlockRet::WaitForStream(&self.src, 2));
        }
        let mut o = self.dst.write_buf()?;
        if o.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.dst, 1));
        }
        let max_symbols = input.len() / 2;
        let n = max_symbols.min(o.len());
        if n == 0 {
            return Ok(BlockRet::OutputFull);
        }
        let bits = input.to_vec();
        for i in 0..n {
            let dibit = (bits[2 * i], bits[2 * i + 1]);
            self.phase += v26_dibit_to_phase(dibit, self.alt);
            o.slice()[i] = Complex::new(self.phase.cos(), self.phase.sin());
        }
        input.consume(n * 2);
        o.produce(n, &[]);
        Ok(BlockRet::Again)
    }
}

// ---------------------------------------------------------------------
// FIR helper re-export for pulse shaping callers
// ---------------------------------------------------------------------

/// Convenience wrapper building a real-valued low-pass FIR suitable for
/// shaping [`BasebandMod`]'s rectangular output, since [`low_pass`] returns
/// complex taps (it's shared with the PSK/decimation paths).
#[must_use]
pub fn shaping_taps(samp_rate: Float, baud: Float) -> Vec<Float> {
    low_pass(samp_rate, baud * 0.6, baud * 0.5)
        .into_iter()
        .map(|c| c.re)
        .collect()
}

/// Convenience: run a real-valued FIR kernel over `input` in one shot, for
/// callers (like tests) that don't need the streaming `fir::FIRFilter`
/// block.
#[must_use]
pub fn apply_fir(input: &[Float], taps: &[Float]) -> Vec<Float> {
    if input.len() < taps.len() {
        return Vec::new();
    }
    FIR::new(taps).filter_n(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn afsk_tone(samp_rate: Float, freq: Float, n: usize) -> Vec<Float> {
        (0..n)
            .map(|i| (TWO_PI * freq as f64 * i as f64 / samp_rate as f64).sin() as Float)
            .collect()
    }

    #[test]
    fn afsk_mod_then_demod_round_trips_bits() {
        let samp_rate = 48_000.0;
        let baud = 1200.0;
        let bits = vec![1u8, 0, 1, 1, 0, 0, 1, 0, 1, 1, 0, 1];
        let (mut modu, mod_out) = AfskMod::new(
            ReadStream::from_slice(&bits),
            samp_rate,
            baud,
            1200.0,
            2200.0,
            100.0,
        );
        // Drain in a few calls since AfskMod only consumes input as needed
        // per output buffer size; one call is enough given the default
        // stream capacity vastly exceeds this test's sample count.
        modu.work().unwrap();
        let (audio, _) = mod_out.read_buf().unwrap();
        let audio = audio.to_vec();
        assert!(!audio.is_empty());

        let (mut demod, demod_out) =
            AfskDemod::new(ReadStream::from_slice(&audio), samp_rate, baud, 1200.0, 2200.0, 300.0, 0.0);
        demod.work().unwrap();
        let (decoded, _) = demod_out.read_buf().unwrap();
        let decoded = decoded.to_vec();
        // Clock recovery needs a symbol or two to settle; compare the tail.
        assert!(decoded.len() + 2 >= bits.len());
        let skip = decoded.len().saturating_sub(bits.len() - 2);
        assert_eq!(&decoded[skip..], &bits[bits.len() - decoded.len() + skip..]);
    }

    #[test]
    fn tone_energy_favors_matching_tone() {
        let samp_rate = 48_000.0;
        let samples = afsk_tone(samp_rate, 1200.0, 400);
        let mut mark = ToneEnergy::new(1200.0, samp_rate, 300.0);
        let mut space = ToneEnergy::new(2200.0, samp_rate, 300.0);
        let mut mark_energy = 0.0;
        let mut space_energy = 0.0;
        for &s in &samples {
            mark_energy = mark.step(s);
            space_energy = space.step(s);
        }
        assert!(mark_energy > space_energy);
    }

    #[test]
    fn v26_dibit_round_trips_through_phase() {
        for alt in [V26Alternative::A, V26Alternative::B] {
            for dibit in [(0u8, 0u8), (0, 1), (1, 1), (1, 0)] {
                let phase = v26_dibit_to_phase(dibit, alt);
                assert_eq!(v26_phase_to_dibit(phase, alt), dibit);
            }
        }
    }

    #[test]
    fn decimator_keeps_every_nth_sample() {
        let input: Vec<Float> = (0..12).map(|i| i as Float).collect();
        let (mut dec, out) = Decimator::new(ReadStream::from_slice(&input), 3);
        dec.work().unwrap();
        let (res, _) = out.read_buf().unwrap();
        assert_eq!(res.to_vec(), vec![0.0, 3.0, 6.0, 9.0]);
    }

    #[test]
    fn subchannel_bandwidth_profile_zero_is_nominal() {
        assert_eq!(subchannel_bandwidth(300.0, 0, 3), 300.0);
        assert_ne!(subchannel_bandwidth(300.0, 1, 3), 300.0);
    }

    #[test]
    fn slicer_threshold_is_centered() {
        assert_eq!(slicer_threshold(1, 3), 0.0);
        assert!(slicer_threshold(0, 3) < 0.0);
        assert!(slicer_threshold(2, 3) > 0.0);
    }
}
