/*! AX.25 link-layer frames: addresses, control field, serialize/deserialize.

Frame layout on the wire (after HDLC bit recovery has stripped flags and
bit-stuffing) is: addresses, control octet(s), an optional PID, the
information payload, then a 2-byte FCS. The FCS itself lives in
[`crate::hdlc`]; this module only calls it.

Receive-side FCS/length/address failures are not [`crate::Error`] --
per the crate's error design those are transient, statistics-counted
events, not plumbing failures. See [`FrameError`].
*/
use crate::hdlc;

/// Maximum length of an AX.25 information field (v2.2, without FEC
/// extensions).
pub const AX25_MAX_INFO_LEN: usize = 256;

/// Errors from parsing a received frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Frame didn't have enough bytes to contain at least two
    /// addresses and a control octet.
    #[error("frame too short: {0} bytes")]
    TooShort(usize),

    /// An address field didn't parse (last-address bit never seen, or
    /// fewer than 2 / more than 10 addresses).
    #[error("bad address: {0}")]
    BadAddress(String),

    /// Computed FCS didn't match the trailing two bytes.
    #[error("bad FCS")]
    BadFcs,
}

/// One AX.25 address: 6-character callsign, SSID, and the three
/// sideband bits packed into the same on-air byte as the SSID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Upper-case alphanumeric callsign, space-padded to 6 characters.
    pub callsign: [u8; 6],
    /// Secondary station ID, `0..=15`.
    pub ssid: u8,
    /// Command/response bit. Source and destination addresses carry
    /// the two halves of the C/R bit pair; digipeater addresses don't
    /// use it meaningfully.
    pub cr: bool,
    /// Reserved bit (sent as 1 per AX.25 2.0, ignored on receive).
    pub reserved: bool,
    /// "Has-been-repeated" bit, meaningful only for digipeater
    /// addresses.
    pub h: bool,
}

impl Address {
    /// Build an address from a callsign string (1-6 alphanumerics) and
    /// SSID. Uppercases and space-pads the callsign.
    pub fn new(callsign: &str, ssid: u8) -> Result<Self, FrameError> {
        if callsign.is_empty() || callsign.len() > 6 || !callsign.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FrameError::BadAddress(format!("invalid callsign {callsign:?}")));
        }
        if ssid > 15 {
            return Err(FrameError::BadAddress(format!("ssid {ssid} out of range")));
        }
        let mut cs = [b' '; 6];
        for (dst, src) in cs.iter_mut().zip(callsign.as_bytes()) {
            *dst = src.to_ascii_uppercase();
        }
        Ok(Self {
            callsign: cs,
            ssid,
            cr: false,
            reserved: true,
            h: false,
        })
    }

    /// Callsign with trailing spaces removed.
    #[must_use]
    pub fn callsign_str(&self) -> String {
        String::from_utf8_lossy(&self.callsign).trim_end().to_string()
    }

    /// Text form, e.g. `"WB2OSZ-15"` or `"W2UB*"` if `used` is set.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut s = self.callsign_str();
        if self.ssid != 0 {
            s.push('-');
            s.push_str(&self.ssid.to_string());
        }
        if self.h {
            s.push('*');
        }
        s
    }

    /// Bit layout of the encoded SSID byte, high to low:
    /// `C/H R R S S S S E`, where `C/H` is the command/response bit
    /// for source and destination or has-been-repeated for
    /// digipeaters, `R` are the two reserved bits (sent as 1), `S` is
    /// the SSID, and `E` marks the last address of the list.
    fn encode(&self, is_last: bool) -> [u8; 7] {
        let mut out = [0u8; 7];
        for (dst, &src) in out.iter_mut().zip(self.callsign.iter()) {
            *dst = src << 1;
        }
        out[6] = (u8::from(self.h || self.cr) << 7)
            | 0b0110_0000
            | (self.ssid << 1)
            | u8::from(is_last);
        out
    }

    /// Decode one 7-byte address field. The `C/H` bit is returned
    /// uninterpreted in `h`; the caller (which knows the address's
    /// position in the list) decides whether it means command/response
    /// or has-been-repeated.
    fn decode(bytes: &[u8; 7]) -> Result<(Self, bool), FrameError> {
        let mut callsign = [0u8; 6];
        for (dst, &src) in callsign.iter_mut().zip(bytes.iter()) {
            *dst = src >> 1;
        }
        let ssid_byte = bytes[6];
        let last = (ssid_byte & 1) == 1;
        Ok((
            Self {
                callsign,
                ssid: (ssid_byte >> 1) & 0x0f,
                cr: false,
                reserved: true,
                h: (ssid_byte & 0x80) != 0,
            },
            last,
        ))
    }
}

/// Supervisory frame subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SType {
    /// Receiver ready.
    Rr,
    /// Receiver not ready.
    Rnr,
    /// Reject.
    Rej,
    /// Selective reject (modulo 128 only).
    Srej,
}

/// Unnumbered frame subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UType {
    Sabm,
    Sabme,
    Disc,
    Dm,
    Ua,
    Frmr,
    Ui,
    Xid,
    Test,
}

/// Sequence-number modulus for I/S frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulo {
    /// Classic 3-bit sequence numbers.
    Eight,
    /// Extended 7-bit sequence numbers (two control octets).
    OneTwentyEight,
}

/// The frame's control field, fully decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameType {
    /// Information frame.
    I {
        ns: u8,
        nr: u8,
        pf: bool,
        modulo: Modulo,
    },
    /// Supervisory frame.
    S {
        kind: SType,
        nr: u8,
        pf: bool,
        modulo: Modulo,
    },
    /// Unnumbered frame.
    U { kind: UType, pf: bool },
}

/// Command/response role, derived from the two addresses' C/R bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdRes {
    Command,
    Response,
    /// Both addresses carry the same bit value (legacy AX.25 1.x frame).
    Legacy,
}

/// A full, decoded AX.25 packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Addresses: `[0]` destination, `[1]` source, `[2..]` up to 8
    /// digipeaters.
    pub addresses: Vec<Address>,
    pub frame_type: FrameType,
    pub cmdres: CmdRes,
    /// Present for I and UI frames.
    pub pid: Option<u8>,
    pub info: Vec<u8>,
}

const PID_NO_LAYER3: u8 = 0xf0;

/// Encode `frame_type` as its AX.25 control octet(s): one byte for
/// modulo-8 sequencing, two for modulo-128. Shared by [`Packet::to_bytes`]
/// and other callers (e.g. `crate::il2p`) that need the same bit layout
/// without a full packet.
pub(crate) fn frame_type_to_control(frame_type: &FrameType) -> Vec<u8> {
    match frame_type {
        FrameType::I { ns, nr, pf, modulo } => match modulo {
            Modulo::Eight => vec![(nr << 5) | (u8::from(*pf) << 4) | (ns << 1)],
            Modulo::OneTwentyEight => vec![ns << 1, (nr << 1) | u8::from(*pf)],
        },
        FrameType::S { kind, nr, pf, modulo } => {
            let ss = match kind {
                SType::Rr => 0b00,
                SType::Rnr => 0b01,
                SType::Rej => 0b10,
                SType::Srej => 0b11,
            };
            match modulo {
                Modulo::Eight => vec![(nr << 5) | (u8::from(*pf) << 4) | (ss << 2) | 0b01],
                Modulo::OneTwentyEight => vec![(ss << 2) | 0b01, (nr << 1) | u8::from(*pf)],
            }
        }
        FrameType::U { kind, pf } => {
            let m = match kind {
                UType::Sabm => 0b001_0_1111,
                UType::Sabme => 0b011_0_1111,
                UType::Disc => 0b010_0_0011,
                UType::Dm => 0b000_0_1111,
                UType::Ua => 0b011_0_0011,
                UType::Frmr => 0b100_0_0111,
                UType::Ui => 0b000_0_0011,
                UType::Xid => 0b101_0_1111,
                UType::Test => 0b111_0_0011,
            };
            vec![m | (u8::from(*pf) << 4)]
        }
    }
}

/// Decode a single modulo-8 control octet into a [`FrameType`]. Shared
/// by [`Packet::from_bytes`] and `crate::il2p`, which only ever deals in
/// the one-octet modulo-8 form (IL2P type-1 headers have no room for a
/// second control octet).
pub(crate) fn control_from_byte(c0: u8) -> Result<FrameType, FrameError> {
    if c0 & 0x01 == 0 {
        let ns = (c0 >> 1) & 0x07;
        let nr = (c0 >> 5) & 0x07;
        let pf = (c0 & 0b0001_0000) != 0;
        Ok(FrameType::I { ns, nr, pf, modulo: Modulo::Eight })
    } else if c0 & 0b11 == 0b01 {
        let kind = match (c0 >> 2) & 0x03 {
            0b00 => SType::Rr,
            0b01 => SType::Rnr,
            0b10 => SType::Rej,
            _ => SType::Srej,
        };
        let nr = (c0 >> 5) & 0x07;
        let pf = (c0 & 0b0001_0000) != 0;
        Ok(FrameType::S { kind, nr, pf, modulo: Modulo::Eight })
    } else {
        let pf = (c0 & 0b0001_0000) != 0;
        let m = c0 & 0b1110_1111;
        let kind = match m {
            0b001_0_1111 => UType::Sabm,
            0b011_0_1111 => UType::Sabme,
            0b010_0_0011 => UType::Disc,
            0b000_0_1111 => UType::Dm,
            0b011_0_0011 => UType::Ua,
            0b100_0_0111 => UType::Frmr,
            0b000_0_0011 => UType::Ui,
            0b101_0_1111 => UType::Xid,
            0b111_0_0011 => UType::Test,
            other => return Err(FrameError::BadAddress(format!("unknown U-frame control 0x{other:02x}"))),
        };
        Ok(FrameType::U { kind, pf })
    }
}

impl Packet {
    /// Serialize to on-air bytes, FCS included.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(7 * self.addresses.len() + self.info.len() + 4);
        let n = self.addresses.len();
        for (i, addr) in self.addresses.iter().enumerate() {
            let mut a = addr.clone();
            // Destination carries the command bit, source the response
            // bit (inverted) in AX.25's dest/src C/R convention.
            a.cr = match (i, self.cmdres) {
                (0, CmdRes::Command) => true,
                (0, CmdRes::Response) => false,
                (1, CmdRes::Command) => false,
                (1, CmdRes::Response) => true,
                _ => addr.cr,
            };
            out.extend_from_slice(&a.encode(i + 1 == n));
        }
        out.extend_from_slice(&frame_type_to_control(&self.frame_type));
        if let Some(pid) = self.pid {
            out.push(pid);
        }
        out.extend_from_slice(&self.info);
        hdlc::append_fcs(&out)
    }

    /// Parse and FCS-validate a received frame (flags already
    /// stripped by the HDLC layer).
    pub fn from_bytes(raw: &[u8]) -> Result<Self, FrameError> {
        let data = hdlc::strip_fcs(raw).ok_or(FrameError::BadFcs)?;
        if data.len() < 15 {
            // 2 addresses (14 bytes) + 1 control byte, minimum.
            return Err(FrameError::TooShort(data.len()));
        }
        let mut addresses = Vec::new();
        let mut pos = 0;
        loop {
            if pos + 7 > data.len() {
                return Err(FrameError::BadAddress("truncated address field".into()));
            }
            let chunk: [u8; 7] = data[pos..pos + 7].try_into()?;
            let (addr, last) = Address::decode(&chunk)?;
            addresses.push(addr);
            pos += 7;
            if last {
                break;
            }
            if addresses.len() >= 10 {
                return Err(FrameError::BadAddress("too many addresses".into()));
            }
        }
        if addresses.len() < 2 {
            return Err(FrameError::BadAddress("fewer than 2 addresses".into()));
        }
        // For the destination and source addresses the high bit
        // Address::decode() stashed in `h` is really the C/R bit;
        // clear it there and derive the packet-level cmdres instead.
        let dest_cr = addresses[0].h;
        let src_cr = addresses[1].h;
        addresses[0].h = false;
        addresses[1].h = false;
        let cmdres = match (dest_cr, src_cr) {
            (true, false) => CmdRes::Command,
            (false, true) => CmdRes::Response,
            _ => CmdRes::Legacy,
        };

        if pos >= data.len() {
            return Err(FrameError::TooShort(data.len()));
        }
        // Modulo-8 vs 128 is a per-channel configuration choice, not
        // recoverable from the control octet alone; this parser assumes
        // modulo 8 (one control octet).
        let c0 = data[pos];
        let frame_type = control_from_byte(c0)?;
        pos += 1;

        let needs_pid = matches!(frame_type, FrameType::I { .. })
            || matches!(frame_type, FrameType::U { kind: UType::Ui, .. })
            || matches!(frame_type, FrameType::U { kind: UType::Xid, .. })
            || matches!(frame_type, FrameType::U { kind: UType::Test, .. });
        let pid = if needs_pid {
            if pos >= data.len() {
                return Err(FrameError::TooShort(data.len()));
            }
            let p = data[pos];
            pos += 1;
            Some(p)
        } else {
            None
        };

        let info = data[pos..].to_vec();
        if info.len() > AX25_MAX_INFO_LEN {
            return Err(FrameError::BadAddress(format!(
                "info field too long: {} > {AX25_MAX_INFO_LEN}",
                info.len()
            )));
        }
        Ok(Self {
            addresses,
            frame_type,
            cmdres,
            pid,
            info,
        })
    }

    /// Build a UI frame (the common case for APRS).
    #[must_use]
    pub fn ui(src: Address, dst: Address, digis: Vec<Address>, info: Vec<u8>) -> Self {
        let mut addresses = vec![dst, src];
        addresses.extend(digis);
        Self {
            addresses,
            frame_type: FrameType::U {
                kind: UType::Ui,
                pf: false,
            },
            cmdres: CmdRes::Response,
            pid: Some(PID_NO_LAYER3),
            info,
        }
    }

    /// Source address (first non-destination entry).
    #[must_use]
    pub fn source(&self) -> &Address {
        &self.addresses[1]
    }

    /// Destination address.
    #[must_use]
    pub fn destination(&self) -> &Address {
        &self.addresses[0]
    }

    /// Digipeater addresses, in order.
    #[must_use]
    pub fn digipeaters(&self) -> &[Address] {
        &self.addresses[2..]
    }

    /// Render in the conventional monitor text format:
    /// `SRC>DST[,DIGI1,DIGI2*]:info`.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut s = format!("{}>{}", self.source().to_text(), self.destination().to_text());
        for digi in self.digipeaters() {
            s.push(',');
            s.push_str(&digi.to_text());
        }
        s.push(':');
        s.push_str(&String::from_utf8_lossy(&self.info));
        s
    }

    /// Parse the conventional monitor text format. Produces a UI frame
    /// (the text format carries no control/PID information).
    pub fn parse_text(s: &str) -> Result<Self, FrameError> {
        let (addrs, info) = s
            .split_once(':')
            .ok_or_else(|| FrameError::BadAddress("missing ':' separator".into()))?;
        let (srcdst, digis) = match addrs.split_once(',') {
            Some((sd, d)) => (sd, d),
            None => (addrs, ""),
        };
        let (src, dst) = srcdst
            .split_once('>')
            .ok_or_else(|| FrameError::BadAddress("missing '>' separator".into()))?;
        let src = parse_text_address(src)?.0;
        let (dst, _) = parse_text_address(dst)?;
        let mut digi_addrs = Vec::new();
        if !digis.is_empty() {
            for d in digis.split(',') {
                let (addr, used) = parse_text_address(d)?;
                let mut addr = addr;
                addr.h = used;
                digi_addrs.push(addr);
            }
        }
        Ok(Self::ui(src, dst, digi_addrs, info.as_bytes().to_vec()))
    }
}

fn parse_text_address(s: &str) -> Result<(Address, bool), FrameError> {
    let (s, used) = match s.strip_suffix('*') {
        Some(rest) => (rest, true),
        None => (s, false),
    };
    let (call, ssid) = match s.split_once('-') {
        Some((c, n)) => (
            c,
            n.parse::<u8>()
                .map_err(|_| FrameError::BadAddress(format!("bad ssid in {s:?}")))?,
        ),
        None => (s, 0),
    };
    Ok((Address::new(call, ssid)?, used))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_encode_decode() {
        let a = Address::new("WB2OSZ", 15).unwrap();
        let bytes = a.encode(true);
        let (b, last) = Address::decode(&bytes).unwrap();
        assert!(last);
        assert_eq!(a.callsign, b.callsign);
        assert_eq!(a.ssid, b.ssid);
    }

    #[test]
    fn ui_frame_round_trips() {
        let src = Address::new("W2UB", 0).unwrap();
        let dst = Address::new("APRS", 0).unwrap();
        let pkt = Packet::ui(src, dst, vec![], b"hello world".to_vec());
        let bytes = pkt.to_bytes();
        let back = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(back.info, b"hello world");
        assert_eq!(back.source().callsign_str(), "W2UB");
        assert_eq!(back.destination().callsign_str(), "APRS");
        assert!(matches!(back.frame_type, FrameType::U { kind: UType::Ui, .. }));
    }

    #[test]
    fn bad_fcs_is_detected() {
        let src = Address::new("W2UB", 0).unwrap();
        let dst = Address::new("APRS", 0).unwrap();
        let pkt = Packet::ui(src, dst, vec![], b"x".to_vec());
        let mut bytes = pkt.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert_eq!(Packet::from_bytes(&bytes), Err(FrameError::BadFcs));
    }

    #[test]
    fn too_short_is_detected() {
        assert!(matches!(
            Packet::from_bytes(&[0, 1, 2]),
            Err(FrameError::BadFcs) | Err(FrameError::TooShort(_))
        ));
    }

    #[test]
    fn text_format_parses_digipeaters() {
        let pkt = Packet::parse_text("W2UB>APRS,WIDE1-1*,WIDE2-2:hello").unwrap();
        assert_eq!(pkt.source().to_text(), "W2UB");
        assert_eq!(pkt.destination().to_text(), "APRS");
        assert_eq!(pkt.digipeaters()[0].to_text(), "WIDE1-1*");
        assert_eq!(pkt.digipeaters()[1].to_text(), "WIDE2-2");
        assert_eq!(pkt.info, b"hello");
    }

    #[test]
    fn u_frame_sabme_round_trips() {
        let src = Address::new("W2UB", 0).unwrap();
        let dst = Address::new("WB2OSZ", 15).unwrap();
        let pkt = Packet {
            addresses: vec![dst, src],
            frame_type: FrameType::U {
                kind: UType::Sabme,
                pf: true,
            },
            cmdres: CmdRes::Command,
            pid: None,
            info: vec![],
        };
        let bytes = pkt.to_bytes();
        let back = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(back.addresses, pkt.addresses);
        assert!(matches!(back.frame_type, FrameType::U { kind: UType::Sabme, pf: true }));
        assert_eq!(back.cmdres, CmdRes::Command);
        assert!(back.info.is_empty());
    }
}
