/*! Multi-modem dispatcher (C6).

A channel typically runs several (subchannel, slicer) decoders in parallel
over the same audio. All of them race to decode the same over-the-air
frame, so whichever one finishes first reports a candidate, and the others
report the identical payload a little later. [`Dispatcher`] is the owned,
single-task state that turns that stream of candidates into one report per
frame, in receive order, while keeping a record of which decoders agreed --
useful for diagnostics, not for anything on the decode-correctness path.

Modelled as a plain struct holding one small ring per channel rather than
reaching for a crate -- no locking, since per the concurrency model this is
owned exclusively by one dispatcher task.
*/
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Which FEC envelope produced a candidate frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FecType {
    /// Plain AX.25, validated by FCS.
    Ax25,
    /// FX.25 envelope, validated by RS decode.
    Fx25,
    /// IL2P envelope, validated by RS decode.
    Il2p,
}

/// A single (subchannel, slicer) decoder's identity.
pub type DecoderId = (u32, u32);

/// A successfully decoded frame from one (subchannel, slicer) decoder,
/// before duplicate suppression. "Successfully decoded" means FCS passed
/// (plain AX.25) or the RS decoder reported a non-negative correction count
/// (FX.25/IL2P) -- the dispatcher does not re-validate this.
#[derive(Debug, Clone)]
pub struct CandidateFrame {
    /// Channel this came from.
    pub channel: usize,
    /// Which decoder produced it.
    pub decoder: DecoderId,
    /// Which FEC envelope it came through.
    pub fec_type: FecType,
    /// Bytes corrected by the FEC decoder (0 for plain AX.25, or for FX.25/
    /// IL2P with no errors).
    pub corrections: i32,
    /// The decoded AX.25 frame bytes.
    pub payload: Vec<u8>,
}

/// A frame reported to consumers after duplicate suppression.
#[derive(Debug, Clone)]
pub struct DispatchedFrame {
    /// Channel this came from.
    pub channel: usize,
    /// The decoded AX.25 frame bytes.
    pub payload: Vec<u8>,
    /// FEC envelope and correction count of the first-arriving variant.
    pub fec_type: FecType,
    /// Corrections reported by the first-arriving variant.
    pub corrections: i32,
    /// Which decoder produced the reported variant.
    pub decoder: DecoderId,
}

struct SeenEntry {
    payload: Vec<u8>,
    seen_at: Instant,
    /// Decoders whose candidate matched this entry, including the one that
    /// triggered the original report.
    also_decoded_by: Vec<DecoderId>,
}

struct ChannelWindow {
    window: Duration,
    seen: VecDeque<SeenEntry>,
}

impl ChannelWindow {
    fn new(window: Duration) -> Self {
        Self {
            window,
            seen: VecDeque::new(),
        }
    }

    fn expire(&mut self, now: Instant) {
        while let Some(front) = self.seen.front() {
            if now.duration_since(front.seen_at) > self.window {
                self.seen.pop_front();
            } else {
                break;
            }
        }
    }

    /// Returns `true` if this payload is a fresh arrival (should be
    /// reported), `false` if it's a duplicate of something still in the
    /// window (recorded, not reported).
    fn observe(&mut self, now: Instant, decoder: DecoderId, payload: &[u8]) -> bool {
        self.expire(now);
        if let Some(entry) = self.seen.iter_mut().find(|e| e.payload == payload) {
            entry.also_decoded_by.push(decoder);
            return false;
        }
        self.seen.push_back(SeenEntry {
            payload: payload.to_vec(),
            seen_at: now,
            also_decoded_by: vec![decoder],
        });
        true
    }

    /// Decoders that agreed on the most recently reported occurrence of
    /// `payload`, for diagnostics.
    fn agreeing_decoders(&self, payload: &[u8]) -> Vec<DecoderId> {
        self.seen
            .iter()
            .find(|e| e.payload == payload)
            .map(|e| e.also_decoded_by.clone())
            .unwrap_or_default()
    }
}

/// Default duplicate-suppression window: on the order of one frame time at
/// 1200 baud for a ~100-byte frame.
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(700);

/// Owned duplicate-suppression and ordering state for all channels.
///
/// `submit` must be called in receive-time order for a given channel (the
/// ordering guarantee is that Dispatcher preserves whatever order its
/// caller calls `submit` in -- it never reorders).
pub struct Dispatcher {
    window: Duration,
    channels: std::collections::HashMap<usize, ChannelWindow>,
}

impl Dispatcher {
    /// Create a dispatcher with the default suppression window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_SUPPRESSION_WINDOW)
    }

    /// Create a dispatcher with an explicit suppression window.
    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            channels: std::collections::HashMap::new(),
        }
    }

    /// Submit a candidate frame, in receive order for its channel.
    ///
    /// Returns `Some(DispatchedFrame)` the first time a payload is seen on
    /// a channel within the suppression window, `None` for every subsequent
    /// duplicate (which is still recorded, see [`Dispatcher::agreeing_decoders`]).
    pub fn submit(&mut self, now: Instant, candidate: CandidateFrame) -> Option<DispatchedFrame> {
        let ch = self
            .channels
            .entry(candidate.channel)
            .or_insert_with(|| ChannelWindow::new(self.window));
        let fresh = ch.observe(now, candidate.decoder, &candidate.payload);
        if !fresh {
            return None;
        }
        Some(DispatchedFrame {
            channel: candidate.channel,
            payload: candidate.payload,
            fec_type: candidate.fec_type,
            corrections: candidate.corrections,
            decoder: candidate.decoder,
        })
    }

    /// Decoders that have agreed on `payload` on `channel` so far, for
    /// diagnostics. Includes the decoder whose report was dispatched.
    #[must_use]
    pub fn agreeing_decoders(&self, channel: usize, payload: &[u8]) -> Vec<DecoderId> {
        self.channels
            .get(&channel)
            .map(|c| c.agreeing_decoders(payload))
            .unwrap_or_default()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(channel: usize, decoder: DecoderId, payload: &[u8]) -> CandidateFrame {
        CandidateFrame {
            channel,
            decoder,
            fec_type: FecType::Ax25,
            corrections: 0,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn first_arrival_is_reported() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        let out = d.submit(now, candidate(0, (0, 0), b"hello"));
        assert!(out.is_some());
        assert_eq!(out.unwrap().payload, b"hello");
    }

    #[test]
    fn duplicate_within_window_is_suppressed() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert!(d.submit(now, candidate(0, (0, 0), b"hello")).is_some());
        assert!(d.submit(now, candidate(0, (0, 1), b"hello")).is_none());
        assert!(d.submit(now, candidate(0, (1, 0), b"hello")).is_none());
        let agreeing = d.agreeing_decoders(0, b"hello");
        assert_eq!(agreeing, vec![(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn duplicate_after_window_expiry_is_reported_again() {
        let mut d = Dispatcher::with_window(Duration::from_millis(10));
        let t0 = Instant::now();
        assert!(d.submit(t0, candidate(0, (0, 0), b"hello")).is_some());
        let t1 = t0 + Duration::from_millis(50);
        assert!(d.submit(t1, candidate(0, (0, 0), b"hello")).is_some());
    }

    #[test]
    fn different_channels_do_not_suppress_each_other() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert!(d.submit(now, candidate(0, (0, 0), b"hello")).is_some());
        assert!(d.submit(now, candidate(1, (0, 0), b"hello")).is_some());
    }

    #[test]
    fn distinct_payloads_on_same_channel_both_report() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert!(d.submit(now, candidate(0, (0, 0), b"hello")).is_some());
        assert!(d.submit(now, candidate(0, (0, 0), b"world")).is_some());
    }
}
