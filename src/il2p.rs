/*! IL2P envelope: scrambled, Reed-Solomon-protected alternative to FX.25.

An IL2P frame replaces HDLC bit-stuffed framing entirely: after the
3-byte sync word, a fixed-size 13-byte header (addresses, control, PID,
payload length, flags) is scrambled with a fixed LFSR, Reed-Solomon
protected, and transmitted; the payload follows, separately
Reed-Solomon protected at a parity strength chosen from the payload
length and the channel's max-FEC setting.

Two header types:
- **Type 1**: header carries destination/source (no digipeaters),
  control and PID; payload is the AX.25 information field only. Only
  representable when the info field is `<= TYPE1_MAX_PAYLOAD` bytes and
  the frame uses modulo-8 sequencing (the compact 7-bit control field
  has no room for a second control octet).
- **Type 0**: header carries only length and FEC strength; payload is
  the entire AX.25 frame (addresses, control, PID, info, FCS) exactly
  as [`crate::ax25::Packet::to_bytes`] produces it.

The condensed `pid`/`control` fields in a type-1 header only cover the
handful of well-known AX.25 PID values the IL2P standard enumerates
(see [`Pid`]); anything else collapses to the generic "layer 3"
marker, same as real IL2P. Type-0 carries the exact frame and has no
such limitation.
*/
use crate::ax25::{self, Address, FrameType, UType};
use crate::rs::RsCodec;

/// Fixed 3-byte IL2P sync word (`0xF1 0x5E 0x48`), sent immediately
/// after the HDLC-style clock-recovery preamble and before the
/// scrambled header.
pub const SYNC_WORD: [u8; 3] = [0xf1, 0x5e, 0x48];

const HEADER_DATA_LEN: usize = 13;
const HEADER_PARITY_LEN: usize = 2;
const HEADER_WIRE_LEN: usize = HEADER_DATA_LEN + HEADER_PARITY_LEN;

/// Largest info field a type-1 header can carry.
pub const TYPE1_MAX_PAYLOAD: usize = 239;

/// Errors specific to the IL2P envelope (header scrambling/FEC and
/// frame-shape problems). RS decode failures on the payload surface as
/// [`crate::Error`], same as [`crate::fx25`].
#[derive(Debug, thiserror::Error)]
pub enum Il2pError {
    #[error("wrong header length: {0} bytes")]
    BadHeaderLen(usize),
    #[error("payload length {0} exceeds type-1 maximum {TYPE1_MAX_PAYLOAD}")]
    PayloadTooLong(usize),
    #[error("type-1 header requires modulo-8 sequencing")]
    Modulo128Unsupported,
    #[error("payload length mismatch: header says {expected}, got {got}")]
    PayloadLenMismatch { expected: usize, got: usize },
    #[error(transparent)]
    Ax25(#[from] ax25::FrameError),
    #[error(transparent)]
    Codec(#[from] crate::Error),
}

/// AX.25 PID values IL2P can represent compactly in a type-1 header,
/// per the IL2P standard's reduced PID table. Values not in this list
/// collapse to [`Pid::Layer3`] on encode (a lossy but faithful
/// limitation of the real protocol, not a simplification of ours).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pid {
    Layer3 = 2,
    Iso8208 = 3,
    CompressedTcpIp = 4,
    UncompressedTcpIp = 5,
    SegmentationFragment = 6,
    Future7 = 7,
    Future8 = 8,
    Future9 = 9,
    Future10 = 10,
    ArpaIp = 11,
    ArpaAddressResolution = 12,
    FlexNet = 13,
    TheNet = 14,
    NoLayer3 = 15,
}

fn ax25_pid_to_il2p(pid: u8) -> Pid {
    match pid {
        0xf0 => Pid::NoLayer3,
        0xcc => Pid::ArpaIp,
        0xcd => Pid::ArpaAddressResolution,
        0xce => Pid::FlexNet,
        0xcf => Pid::TheNet,
        0x01 => Pid::Iso8208,
        0x06 => Pid::CompressedTcpIp,
        0x07 => Pid::UncompressedTcpIp,
        0x08 => Pid::SegmentationFragment,
        _ => Pid::Layer3,
    }
}

fn il2p_pid_to_ax25(pid: Pid) -> u8 {
    match pid {
        Pid::NoLayer3 => 0xf0,
        Pid::ArpaIp => 0xcc,
        Pid::ArpaAddressResolution => 0xcd,
        Pid::FlexNet => 0xce,
        Pid::TheNet => 0xcf,
        Pid::Iso8208 => 0x01,
        Pid::CompressedTcpIp => 0x06,
        Pid::UncompressedTcpIp => 0x07,
        Pid::SegmentationFragment => 0x08,
        Pid::Layer3 | Pid::Future7 | Pid::Future8 | Pid::Future9 | Pid::Future10 => 0xf0,
    }
}

/// LFSR used to scramble/descramble the IL2P header, avoiding bit
/// patterns in address data that could masquerade as sync words.
/// Mask and seed per the IL2P standard (ported from the bit-equivalent
/// `Lfsr` used by this crate's teacher's IL2P deframer).
struct Lfsr {
    mask: u64,
    shift_reg: u64,
}

impl Lfsr {
    fn new(mask: u64, seed: u64) -> Self {
        Self { mask, shift_reg: seed }
    }

    /// Descrambling step: feeds the on-wire (scrambled) bit back into
    /// the register, so the register's state depends only on bits
    /// already seen on the wire -- this is what makes the scrambler
    /// self-synchronizing.
    fn next(&mut self, i: u8) -> u8 {
        let i = i & 1;
        let ret = 1 & (i ^ self.shift_reg as u8);
        self.shift_reg = (self.shift_reg >> 1) ^ (self.mask * u64::from(i));
        ret
    }

    /// Scrambling step: the inverse of `next`. Must feed the *output*
    /// (on-wire) bit back into the register rather than the input
    /// plaintext bit, so the register evolves identically to the
    /// descrambler's on the other end.
    fn scramble(&mut self, p: u8) -> u8 {
        let p = p & 1;
        let c = 1 & (p ^ self.shift_reg as u8);
        self.shift_reg = (self.shift_reg >> 1) ^ (self.mask * u64::from(c));
        c
    }
}

fn scramble_bits(bits: &[u8]) -> Vec<u8> {
    let mut l = Lfsr::new(0x108, 0x1f0);
    bits.iter().map(|&b| l.scramble(b)).collect()
}

fn descramble_bits(bits: &[u8]) -> Vec<u8> {
    let mut l = Lfsr::new(0x108, 0x1f0);
    bits.iter().map(|&b| l.next(b)).collect()
}

fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for i in 0..8 {
            bits.push((byte >> (7 - i)) & 1);
        }
    }
    bits
}

fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    assert!(bits.len().is_multiple_of(8));
    bits.chunks(8)
        .map(|chunk| chunk.iter().enumerate().fold(0u8, |byte, (i, &bit)| byte | (bit << (7 - i))))
        .collect()
}

fn header_codec() -> RsCodec {
    RsCodec::new(0x11d, 0, 1, HEADER_PARITY_LEN).expect("IL2P header RS parameters are valid")
}

/// Parity strength for the payload RS code, chosen from the (uncoded)
/// payload length and the channel's max-FEC setting.
///
/// This reproduces the general shape of the IL2P payload parity table
/// (roughly doubling coverage for longer payloads, doubling again
/// under max-FEC) from general knowledge of the scheme rather than a
/// verified copy of the standard's table -- double check against an
/// authoritative source before relying on exact interoperability.
fn payload_parity(payload_len: usize, max_fec: bool) -> usize {
    let base = match payload_len {
        0..=15 => 2,
        16..=31 => 4,
        32..=63 => 6,
        64..=127 => 8,
        _ => 16,
    };
    if max_fec {
        (base * 2).min(16)
    } else {
        base
    }
}

fn payload_codec(nroots: usize) -> RsCodec {
    RsCodec::new(0x11d, 0, 1, nroots).expect("IL2P payload RS parameters are valid")
}

fn pack_callsign(addr: &Address) -> [u8; 6] {
    let mut out = [0u8; 6];
    for (dst, &src) in out.iter_mut().zip(addr.callsign.iter()) {
        *dst = src.wrapping_sub(0x20) & 0x3f;
    }
    out
}

fn unpack_callsign(bytes: &[u8]) -> [u8; 6] {
    let mut out = [b' '; 6];
    for (dst, &src) in out.iter_mut().zip(bytes.iter()) {
        let v = src & 0x3f;
        *dst = if v == 0 { b' ' } else { v + 0x20 };
    }
    out
}

/// Which header form a frame is carried in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Type0,
    Type1,
}

/// A decoded IL2P header.
#[derive(Debug, Clone)]
pub struct Header {
    pub kind: HeaderKind,
    /// `None` for type 0, which carries no address/control information.
    pub dst: Option<Address>,
    pub src: Option<Address>,
    pub ui: bool,
    pub max_fec: bool,
    pub pid: Option<Pid>,
    /// 7-bit condensed control field (type 1 only).
    pub control: u8,
    /// Uncoded length of the payload that follows.
    pub payload_len: u16,
}

impl Header {
    fn encode_fields(&self) -> [u8; HEADER_DATA_LEN] {
        let mut out = [0u8; HEADER_DATA_LEN];
        match self.kind {
            HeaderKind::Type1 => {
                let dst = pack_callsign(self.dst.as_ref().expect("type-1 header has dst"));
                let src = pack_callsign(self.src.as_ref().expect("type-1 header has src"));
                let pid = self.pid.map_or(0, |p| p as u8);
                let len = self.payload_len;
                out[0] = dst[0] | (u8::from(self.ui) << 6) | (u8::from(self.max_fec) << 7);
                out[1] = dst[1] | (((pid >> 3) & 1) << 6) | (1 << 7); // bit7 = hdrtype1
                out[2] = dst[2] | (((pid >> 2) & 1) << 6) | (((len >> 9) as u8 & 1) << 7);
                out[3] = dst[3] | (((pid >> 1) & 1) << 6) | (((len >> 8) as u8 & 1) << 7);
                out[4] = dst[4] | ((pid & 1) << 6) | (((len >> 7) as u8 & 1) << 7);
                out[5] = dst[5] | (((self.control >> 6) & 1) << 6) | (((len >> 6) as u8 & 1) << 7);
                out[6] = src[0] | (((self.control >> 5) & 1) << 6) | (((len >> 5) as u8 & 1) << 7);
                out[7] = src[1] | (((self.control >> 4) & 1) << 6) | (((len >> 4) as u8 & 1) << 7);
                out[8] = src[2] | (((self.control >> 3) & 1) << 6) | (((len >> 3) as u8 & 1) << 7);
                out[9] = src[3] | (((self.control >> 2) & 1) << 6) | (((len >> 2) as u8 & 1) << 7);
                out[10] = src[4] | (((self.control >> 1) & 1) << 6) | (((len >> 1) as u8 & 1) << 7);
                out[11] = src[5] | ((self.control & 1) << 6) | ((len as u8 & 1) << 7);
                out[12] = (self.dst.as_ref().unwrap().ssid << 4) | (self.src.as_ref().unwrap().ssid & 0xf);
            }
            HeaderKind::Type0 => {
                // bit7 of byte 1 is the hdrtype1 flag (0 here), same
                // position as in a type-1 header, so a receiver can
                // tell the two apart before it knows which it has.
                out[0] = u8::from(self.max_fec) << 7;
                out[1] = ((self.payload_len >> 8) as u8) & 0x7f;
                out[2] = self.payload_len as u8;
            }
        }
        out
    }

    fn decode_fields(kind: HeaderKind, data: &[u8; HEADER_DATA_LEN]) -> Result<Self, Il2pError> {
        match kind {
            HeaderKind::Type1 => {
                let dst_bytes: Vec<u8> = (0..6).map(|i| data[i] & 0x3f).collect();
                let src_bytes: Vec<u8> = (6..12).map(|i| data[i] & 0x3f).collect();
                let pid_val = (((data[1] >> 6) & 1) << 3)
                    | (((data[2] >> 6) & 1) << 2)
                    | (((data[3] >> 6) & 1) << 1)
                    | ((data[4] >> 6) & 1);
                let control = ((data[5] >> 6) & 1) << 6
                    | ((data[6] >> 6) & 1) << 5
                    | ((data[7] >> 6) & 1) << 4
                    | ((data[8] >> 6) & 1) << 3
                    | ((data[9] >> 6) & 1) << 2
                    | ((data[10] >> 6) & 1) << 1
                    | (data[11] >> 6) & 1;
                let payload_len = ((data[2] as u16 >> 7) << 9)
                    | ((data[3] as u16 >> 7) << 8)
                    | ((data[4] as u16 >> 7) << 7)
                    | ((data[5] as u16 >> 7) << 6)
                    | ((data[6] as u16 >> 7) << 5)
                    | ((data[7] as u16 >> 7) << 4)
                    | ((data[8] as u16 >> 7) << 3)
                    | ((data[9] as u16 >> 7) << 2)
                    | ((data[10] as u16 >> 7) << 1)
                    | (data[11] as u16 >> 7);
                let ssid_byte = data[12];
                let dst = Address {
                    callsign: unpack_callsign(&dst_bytes),
                    ssid: (ssid_byte >> 4) & 0xf,
                    cr: false,
                    reserved: true,
                    h: false,
                };
                let src = Address {
                    callsign: unpack_callsign(&src_bytes),
                    ssid: ssid_byte & 0xf,
                    cr: false,
                    reserved: true,
                    h: false,
                };
                let pid = if pid_val == 0 {
                    None // AX25_SUPERVISOR: S-frames carry no PID
                } else if pid_val == 1 {
                    None // AX25_UNNUMBERED: non-UI U-frames carry no PID
                } else {
                    Some(match pid_val {
                        2 => Pid::Layer3,
                        3 => Pid::Iso8208,
                        4 => Pid::CompressedTcpIp,
                        5 => Pid::UncompressedTcpIp,
                        6 => Pid::SegmentationFragment,
                        7 => Pid::Future7,
                        8 => Pid::Future8,
                        9 => Pid::Future9,
                        10 => Pid::Future10,
                        11 => Pid::ArpaIp,
                        12 => Pid::ArpaAddressResolution,
                        13 => Pid::FlexNet,
                        _ => Pid::NoLayer3,
                    })
                };
                Ok(Self {
                    kind,
                    dst: Some(dst),
                    src: Some(src),
                    ui: (data[0] & 0x40) != 0,
                    max_fec: (data[0] & 0x80) != 0,
                    pid,
                    control,
                    payload_len,
                })
            }
            HeaderKind::Type0 => Ok(Self {
                kind,
                dst: None,
                src: None,
                ui: false,
                max_fec: (data[0] & 0x80) != 0,
                pid: None,
                control: 0,
                payload_len: (u16::from(data[1] & 0x7f) << 8) | u16::from(data[2]),
            }),
        }
    }
}

/// Encode a header (already scrambled and RS-protected) into its
/// `HEADER_WIRE_LEN`-byte on-air form.
#[must_use]
pub fn encode_header(header: &Header) -> [u8; HEADER_WIRE_LEN] {
    let data = header.encode_fields();
    let coded = header_codec().encode(&data);
    let bits = bytes_to_bits(&coded);
    let scrambled = bits_to_bytes(&scramble_bits(&bits));
    scrambled.try_into().expect("header codec always emits HEADER_WIRE_LEN bytes")
}

/// Descramble, RS-correct and parse an on-air header. The header type
/// (0 or 1) is read from the `hdrtype1` bit inside the header itself
/// (byte 1, bit 7, after RS correction), not supplied by the caller --
/// a receiver sees the sync word before it knows which kind follows.
pub fn decode_header(wire: &[u8]) -> Result<Header, Il2pError> {
    if wire.len() != HEADER_WIRE_LEN {
        return Err(Il2pError::BadHeaderLen(wire.len()));
    }
    let bits = bytes_to_bits(wire);
    let descrambled = bits_to_bytes(&descramble_bits(&bits));
    let mut coded = descrambled;
    header_codec().decode(&mut coded)?;
    let data: [u8; HEADER_DATA_LEN] = coded[..HEADER_DATA_LEN].try_into().unwrap();
    let kind = if (data[1] & 0x80) != 0 { HeaderKind::Type1 } else { HeaderKind::Type0 };
    Header::decode_fields(kind, &data)
}

fn encode_payload(payload: &[u8], max_fec: bool, invert: bool) -> Vec<u8> {
    let nroots = payload_parity(payload.len(), max_fec);
    let coded = payload_codec(nroots).encode(payload);
    if invert {
        coded.iter().map(|b| !b).collect()
    } else {
        coded
    }
}

fn decode_payload(block: &[u8], payload_len: usize, max_fec: bool, invert: bool) -> crate::Result<(Vec<u8>, usize)> {
    let nroots = payload_parity(payload_len, max_fec);
    let mut buf: Vec<u8> = if invert { block.iter().map(|b| !b).collect() } else { block.to_vec() };
    let corrections = payload_codec(nroots).decode(&mut buf)?;
    Ok((buf[..payload_len].to_vec(), corrections))
}

/// A complete on-air IL2P frame (header plus RS-protected payload),
/// excluding [`SYNC_WORD`] and the clock-recovery preamble before it.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub header: [u8; HEADER_WIRE_LEN],
    pub kind: HeaderKind,
    pub payload: Vec<u8>,
}

/// Encode an AX.25 packet as an IL2P frame, choosing type 1 when the
/// info field fits and the frame is modulo-8, type 0 otherwise.
pub fn encode_packet(packet: &ax25::Packet, max_fec: bool, invert: bool) -> Result<EncodedFrame, Il2pError> {
    let modulo8 = matches!(
        packet.frame_type,
        FrameType::I { modulo: ax25::Modulo::Eight, .. } | FrameType::S { modulo: ax25::Modulo::Eight, .. } | FrameType::U { .. }
    );
    let no_digis = packet.addresses.len() == 2;
    if modulo8 && no_digis && packet.info.len() <= TYPE1_MAX_PAYLOAD {
        let control = ax25::frame_type_to_control(&packet.frame_type)[0] >> 1;
        let ui = matches!(packet.frame_type, FrameType::U { kind: UType::Ui, .. });
        let header = Header {
            kind: HeaderKind::Type1,
            dst: Some(packet.destination().clone()),
            src: Some(packet.source().clone()),
            ui,
            max_fec,
            pid: packet.pid.map(ax25_pid_to_il2p),
            control,
            payload_len: packet.info.len() as u16,
        };
        Ok(EncodedFrame {
            header: encode_header(&header),
            kind: HeaderKind::Type1,
            payload: encode_payload(&packet.info, max_fec, invert),
        })
    } else {
        let raw = packet.to_bytes();
        if raw.len() > u16::MAX as usize {
            return Err(Il2pError::PayloadTooLong(raw.len()));
        }
        let header = Header {
            kind: HeaderKind::Type0,
            dst: None,
            src: None,
            ui: false,
            max_fec,
            pid: None,
            control: 0,
            payload_len: raw.len() as u16,
        };
        Ok(EncodedFrame {
            header: encode_header(&header),
            kind: HeaderKind::Type0,
            payload: encode_payload(&raw, max_fec, invert),
        })
    }
}

/// Decode an [`EncodedFrame`] back into an AX.25 packet.
///
/// For type 1, the condensed `control`/`pid` fields are reassembled
/// into the one-octet modulo-8 AX.25 control byte: the bit IL2P drops
/// (always determinable from whether `ui` is set and which `pid`
/// value decoded) is reconstructed here, not invented -- S-frames and
/// non-UI U-frames always have `pid = None` in the condensed header,
/// exactly distinguishing them from I-frames.
pub fn decode_packet(enc: &EncodedFrame) -> Result<(ax25::Packet, usize), Il2pError> {
    let header = decode_header(&enc.header)?;
    if enc.payload.len() != payload_parity(header.payload_len as usize, header.max_fec) + header.payload_len as usize {
        return Err(Il2pError::PayloadLenMismatch {
            expected: header.payload_len as usize,
            got: enc.payload.len(),
        });
    }
    match header.kind {
        HeaderKind::Type1 => {
            let (info, corrections) = decode_payload(&enc.payload, header.payload_len as usize, header.max_fec, false)?;
            let full_control = if header.ui {
                (header.control << 1) | 1
            } else if header.pid.is_none() {
                // S-frame: bits1:0 = 01.
                (header.control << 1) | 1
            } else {
                // I-frame: bit0 = 0.
                header.control << 1
            };
            let frame_type = ax25::control_from_byte(full_control)?;
            let pid = match (&frame_type, header.ui) {
                (FrameType::I { .. }, _) | (FrameType::U { .. }, true) => header.pid.map(il2p_pid_to_ax25),
                _ => None,
            };
            let cmdres = ax25::CmdRes::Response;
            let packet = ax25::Packet {
                addresses: vec![header.dst.unwrap(), header.src.unwrap()],
                frame_type,
                cmdres,
                pid,
                info,
            };
            Ok((packet, corrections))
        }
        HeaderKind::Type0 => {
            let (raw, corrections) = decode_payload(&enc.payload, header.payload_len as usize, header.max_fec, false)?;
            let packet = ax25::Packet::from_bytes(&raw)?;
            Ok((packet, corrections))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ax25::Packet;

    #[test]
    fn header_type1_round_trips() {
        let dst = Address::new("APRS", 0).unwrap();
        let src = Address::new("W2UB", 9).unwrap();
        let header = Header {
            kind: HeaderKind::Type1,
            dst: Some(dst.clone()),
            src: Some(src.clone()),
            ui: true,
            max_fec: false,
            pid: Some(Pid::NoLayer3),
            control: 0b000_0001, // Ui control byte 0x03 >> 1
            payload_len: 100,
        };
        let wire = encode_header(&header);
        let back = decode_header(&wire).unwrap();
        assert_eq!(back.dst.unwrap().callsign_str(), "APRS");
        assert_eq!(back.src.unwrap().callsign_str(), "W2UB");
        assert_eq!(back.src.is_some(), true);
        assert!(back.ui);
        assert!(!back.max_fec);
        assert_eq!(back.pid, Some(Pid::NoLayer3));
        assert_eq!(back.payload_len, 100);
    }

    #[test]
    fn header_survives_bit_flips() {
        let dst = Address::new("WIDE1", 1).unwrap();
        let src = Address::new("N0CALL", 0).unwrap();
        let header = Header {
            kind: HeaderKind::Type1,
            dst: Some(dst),
            src: Some(src),
            ui: true,
            max_fec: true,
            pid: Some(Pid::NoLayer3),
            control: 0,
            payload_len: 30,
        };
        let mut wire = encode_header(&header);
        wire[0] ^= 0x01; // single bit error, within the 2-parity-byte budget
        let back = decode_header(&wire).unwrap();
        assert_eq!(back.payload_len, 30);
        assert!(back.max_fec);
    }

    #[test]
    fn type1_frame_round_trips() {
        let src = Address::new("W2UB", 0).unwrap();
        let dst = Address::new("APRS", 0).unwrap();
        let packet = Packet::ui(src, dst, vec![], b"hello world".to_vec());
        let enc = encode_packet(&packet, false, false).unwrap();
        assert_eq!(enc.kind, HeaderKind::Type1);
        let (back, corrections) = decode_packet(&enc).unwrap();
        assert_eq!(corrections, 0);
        assert_eq!(back.info, b"hello world");
        assert_eq!(back.source().callsign_str(), "W2UB");
        assert_eq!(back.destination().callsign_str(), "APRS");
        assert!(matches!(back.frame_type, FrameType::U { kind: UType::Ui, .. }));
    }

    #[test]
    fn type1_frame_recovers_payload_errors() {
        let src = Address::new("W2UB", 0).unwrap();
        let dst = Address::new("APRS", 0).unwrap();
        let packet = Packet::ui(src, dst, vec![], vec![0xaa; 10]);
        let mut enc = encode_packet(&packet, false, false).unwrap();
        enc.payload[0] ^= 0xff;
        let (back, corrections) = decode_packet(&enc).unwrap();
        assert_eq!(corrections, 1);
        assert_eq!(back.info, vec![0xaa; 10]);
    }

    #[test]
    fn oversized_info_falls_back_to_type0() {
        let src = Address::new("W2UB", 0).unwrap();
        let dst = Address::new("APRS", 0).unwrap();
        let packet = Packet::ui(src, dst, vec![], vec![0x41; 250]);
        let enc = encode_packet(&packet, false, false).unwrap();
        assert_eq!(enc.kind, HeaderKind::Type0);
        let (back, _) = decode_packet(&enc).unwrap();
        assert_eq!(back.info, vec![0x41; 250]);
    }

    #[test]
    fn digipeaters_force_type0() {
        let src = Address::new("W2UB", 0).unwrap();
        let dst = Address::new("APRS", 0).unwrap();
        let digi = Address::new("WIDE1", 1).unwrap();
        let packet = Packet::ui(src, dst, vec![digi], b"x".to_vec());
        let enc = encode_packet(&packet, false, false).unwrap();
        assert_eq!(enc.kind, HeaderKind::Type0);
        let (back, _) = decode_packet(&enc).unwrap();
        assert_eq!(back.digipeaters().len(), 1);
    }
}
