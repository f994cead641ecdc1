/*! APRS information-field parser (C7).

Dissects the information part of a received AX.25 frame into a flat,
purely-value [`Record`]. Dispatch is on the first byte, per the classic APRS
protocol spec; see [`parse`].

Unrecognised or malformed content never aborts parsing -- it's either left
in the comment field (lenient fallback) or recorded as a warning on the
produced record, matching the crate-wide error design: this module never
returns `Err` for bad *input*, only for caller misuse (there is none here).
*/
/// Latitude or longitude in signed degrees (positive north/east). Kept in
/// `f64` rather than the crate's usual [`crate::Float`]: position math needs
/// more than `f32`'s ~7 decimal digits to round-trip `DD.DDDDDD`-precision
/// compressed and human-readable encodings without rounding error showing
/// up in equality comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate(pub f64);

/// What kind of APRS record this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Position report (with or without timestamp, human-readable or
    /// compressed, including MIC-E).
    Position,
    /// Positionless weather report.
    Weather,
    /// Object report.
    Object,
    /// Item report.
    Item,
    /// Message, ack, reject, bulletin, NWS bulletin, or telemetry metadata.
    Message,
    /// General or directed query.
    Query,
    /// Station capabilities.
    Capabilities,
    /// Status report.
    Status,
    /// Telemetry data report.
    Telemetry,
    /// User-defined data (includes AIS, raw touch-tone, Morse).
    UserDefined,
    /// NWS (National Weather Service) formatted bulletin.
    Nws,
    /// First byte not recognised; `data_type_desc` starts with `ERROR`.
    Unknown,
}

/// Subtype of a [`PacketType::Message`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSubtype {
    /// A plain message to an addressee.
    Message,
    /// Acknowledgement of a message.
    Ack,
    /// Rejection of a message.
    Rej,
    /// Bulletin (addressee is `BLNn`).
    Bulletin,
    /// NWS-formatted bulletin.
    Nws,
    /// Telemetry parameter names.
    TelemParm,
    /// Telemetry units.
    TelemUnit,
    /// Telemetry equation coefficients.
    TelemEqns,
    /// Telemetry bit-sense/labels.
    TelemBits,
    /// A directed (station-targeted) query.
    DirectedQuery,
    /// Recognised as a message but the body didn't parse.
    Invalid,
}

/// Power-height-gain-directivity antenna description from a `PHGphgd`
/// comment extension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phg {
    /// Transmit power in watts.
    pub power_watts: u32,
    /// Antenna height above average terrain, in feet.
    pub height_ft: u32,
    /// Antenna gain in dBi.
    pub gain_dbi: u32,
    /// Antenna directivity, e.g. `"NE"` or `"omni"`.
    pub directivity: &'static str,
}

/// Radio frequency/tone/offset extension parsed out of the comment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadioSpec {
    /// Frequency in MHz, if present.
    pub freq_mhz: Option<f64>,
    /// CTCSS tone in Hz, if present.
    pub ctcss_hz: Option<u32>,
    /// DCS code, if present.
    pub dcs: Option<u32>,
    /// Repeater offset in kHz (signed).
    pub offset_khz: Option<i32>,
    /// Range in km, if an `R` extension was present (miles converted).
    pub range_km: Option<f64>,
}

/// Positionless (or position-attached) weather report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weather {
    /// Wind direction in degrees.
    pub wind_dir_deg: Option<u16>,
    /// Sustained wind speed in mph.
    pub wind_speed_mph: Option<u16>,
    /// Gust speed in mph.
    pub wind_gust_mph: Option<u16>,
    /// Temperature in degrees F.
    pub temperature_f: Option<i16>,
    /// Rainfall in the last hour, hundredths of an inch.
    pub rain_last_hour: Option<u16>,
    /// Humidity percent.
    pub humidity_pct: Option<u8>,
    /// Barometric pressure in tenths of a millibar.
    pub pressure_tenths_mb: Option<u32>,
}

/// Raw (undecoded) base-91 compressed telemetry, if present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    /// Telemetry sequence number, if parsed.
    pub sequence: Option<u32>,
    /// Raw base-91 payload between the `|` delimiters.
    pub raw: String,
}

/// A flat, fully-decoded APRS record. Produced by [`parse`], never mutated
/// afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Source callsign (with SSID, if any).
    pub source: String,
    /// Destination callsign (with SSID, if any).
    pub destination: String,
    /// What kind of record this is.
    pub packet_type: PacketType,
    /// Subtype, for [`PacketType::Message`].
    pub message_subtype: Option<MessageSubtype>,
    /// Symbol table identifier (`/`, `\`, or an overlay character).
    pub symbol_table: char,
    /// Symbol code.
    pub symbol_code: char,
    /// Latitude in degrees, `None` if absent.
    pub lat: Option<Coordinate>,
    /// Longitude in degrees, `None` if absent.
    pub lon: Option<Coordinate>,
    /// Altitude in feet.
    pub altitude_ft: Option<i32>,
    /// Speed in knots.
    pub speed_knots: Option<f64>,
    /// Course in degrees.
    pub course_deg: Option<u16>,
    /// PHG antenna description, if present in the comment.
    pub phg: Option<Phg>,
    /// Weather block, if this is a weather report.
    pub weather: Option<Weather>,
    /// Telemetry block, if telemetry was embedded in the comment.
    pub telemetry: Option<Telemetry>,
    /// Radio (frequency/tone/offset) spec, if present in the comment.
    pub radio: Option<RadioSpec>,
    /// Manufacturer/device identifier, inferred from the destination
    /// callsign for MIC-E records.
    pub manufacturer: Option<String>,
    /// Addressee, for message-type records.
    pub addressee: Option<String>,
    /// Message number (`{nnn`), for message-type records.
    pub message_number: Option<String>,
    /// Maidenhead grid locator, if present.
    pub maidenhead: Option<String>,
    /// Free-form comment text left over after all extensions are stripped.
    pub comment: String,
    /// Human-readable description of the data type, `"ERROR..."`-prefixed
    /// on an unrecognised first byte.
    pub data_type_desc: String,
    /// Non-fatal warnings accumulated while parsing (see Sec 7 class 2).
    pub warnings: Vec<String>,
    /// Whether this record was extracted from a third-party header
    /// (`}...`); if so every other field reflects the *inner* frame.
    pub has_thirdparty_header: bool,
}

impl Record {
    fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            packet_type: PacketType::Unknown,
            message_subtype: None,
            symbol_table: '/',
            symbol_code: ' ',
            lat: None,
            lon: None,
            altitude_ft: None,
            speed_knots: None,
            course_deg: None,
            phg: None,
            weather: None,
            telemetry: None,
            radio: None,
            manufacturer: None,
            addressee: None,
            message_number: None,
            maidenhead: None,
            comment: String::new(),
            data_type_desc: String::new(),
            warnings: Vec::new(),
            has_thirdparty_header: false,
        }
    }

    fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        log::warn!("aprs: {msg}");
        self.warnings.push(msg);
    }
}

/// Parse an APRS information field.
///
/// `source`/`destination` are text-format callsigns (e.g. `"N1EDF-9"`),
/// `info` is the raw information-part bytes (no leading PID).
#[must_use]
pub fn parse(source: &str, destination: &str, info: &[u8]) -> Record {
    let mut rec = Record::new(source, destination);
    let Some(&first) = info.first() else {
        rec.data_type_desc = "ERROR: empty info field".to_string();
        return rec;
    };
    let rest = &info[1..];

    match first {
        b'!' | b'=' => {
            rec.packet_type = PacketType::Position;
            rec.data_type_desc = "position".to_string();
            decode_position(&mut rec, rest);
        }
        b'/' | b'@' => {
            rec.packet_type = PacketType::Position;
            rec.data_type_desc = "position with timestamp".to_string();
            decode_position(&mut rec, skip_timestamp(rest));
        }
        b';' => {
            rec.packet_type = PacketType::Object;
            rec.data_type_desc = "object".to_string();
            decode_object_or_item(&mut rec, rest, true);
        }
        b')' => {
            rec.packet_type = PacketType::Item;
            rec.data_type_desc = "item".to_string();
            decode_object_or_item(&mut rec, rest, false);
        }
        b':' => {
            decode_message(&mut rec, rest);
        }
        b'>' => {
            rec.packet_type = PacketType::Status;
            rec.data_type_desc = "status".to_string();
            rec.comment = String::from_utf8_lossy(strip_cr(rest)).into_owned();
        }
        b'<' => {
            rec.packet_type = PacketType::Capabilities;
            rec.data_type_desc = "station capabilities".to_string();
            rec.comment = String::from_utf8_lossy(strip_cr(rest)).into_owned();
        }
        b'?' => {
            rec.packet_type = PacketType::Query;
            rec.data_type_desc = "query".to_string();
            rec.comment = String::from_utf8_lossy(strip_cr(rest)).into_owned();
        }
        b'T' => {
            rec.packet_type = PacketType::Telemetry;
            rec.data_type_desc = "telemetry report".to_string();
            rec.telemetry = Some(Telemetry {
                sequence: None,
                raw: String::from_utf8_lossy(strip_cr(rest)).into_owned(),
            });
        }
        b'_' => {
            rec.packet_type = PacketType::Weather;
            rec.data_type_desc = "positionless weather".to_string();
            let (weather, comment) = parse_weather(skip_timestamp(rest));
            rec.weather = Some(weather);
            rec.comment = comment;
        }
        b'{' => {
            rec.packet_type = PacketType::UserDefined;
            rec.data_type_desc = "user-defined".to_string();
            rec.comment = String::from_utf8_lossy(strip_cr(rest)).into_owned();
        }
        b'`' | b'\'' => {
            rec.packet_type = PacketType::Position;
            rec.data_type_desc = "Mic-E position".to_string();
            decode_mic_e(&mut rec, destination, rest);
        }
        b'}' => {
            return decode_thirdparty(destination, rest);
        }
        b'$' => {
            rec.packet_type = PacketType::UserDefined;
            rec.data_type_desc = "raw NMEA/weather station data".to_string();
            rec.comment = String::from_utf8_lossy(strip_cr(rest)).into_owned();
        }
        other => {
            rec.data_type_desc = format!("ERROR: unrecognised data type byte {:#04x}", other);
            rec.warn(format!("unrecognised APRS data type byte {:#04x}", other));
        }
    }
    rec
}

fn strip_cr(s: &[u8]) -> &[u8] {
    let end = s.iter().position(|&b| b == b'\r').unwrap_or(s.len());
    &s[..end]
}

fn skip_timestamp(s: &[u8]) -> &[u8] {
    // DDHHMMz/h (7 digits + zulu/local marker) or HHMMSS (6 digits, no marker).
    if s.len() >= 8 && s[0..6].iter().all(u8::is_ascii_digit) && (s[6] == b'z' || s[6] == b'/' || s[6] == b'h') {
        &s[7..]
    } else if s.len() >= 6 && s[0..6].iter().all(u8::is_ascii_digit) && s.get(6) == Some(&b'!') {
        &s[7..]
    } else {
        s
    }
}

// ---------------------------------------------------------------------
// Position decoding
// ---------------------------------------------------------------------

fn decode_position(rec: &mut Record, rest: &[u8]) {
    if rest.is_empty() {
        rec.warn("position record has no body");
        return;
    }
    if rest[0].is_ascii_digit() {
        decode_human_readable_position(rec, rest);
    } else if rest[0] != b' ' {
        decode_compressed_position(rec, rest);
    } else {
        rec.warn("position body neither human-readable nor compressed");
    }
}

fn parse_lat_human(s: &[u8]) -> Option<(f64, usize)> {
    // DDMM.HHN/S, 8 bytes.
    if s.len() < 8 {
        return None;
    }
    let digits = std::str::from_utf8(&s[0..7]).ok()?;
    let dd: f64 = digits[0..2].parse().ok()?;
    let mmhh: f64 = digits[2..7].parse().ok()?;
    let hemi = s[7];
    let sign = match hemi.to_ascii_uppercase() {
        b'N' => 1.0,
        b'S' => -1.0,
        _ => return None,
    };
    Some((sign * (dd + mmhh / 60.0), 8))
}

fn parse_lon_human(s: &[u8]) -> Option<(f64, usize)> {
    // DDDMM.HHE/W, 9 bytes.
    if s.len() < 9 {
        return None;
    }
    let digits = std::str::from_utf8(&s[0..8]).ok()?;
    let ddd: f64 = digits[0..3].parse().ok()?;
    let mmhh: f64 = digits[3..8].parse().ok()?;
    let hemi = s[8];
    let sign = match hemi.to_ascii_uppercase() {
        b'E' => 1.0,
        b'W' => -1.0,
        _ => return None,
    };
    Some((sign * (ddd + mmhh / 60.0), 9))
}

fn decode_human_readable_position(rec: &mut Record, rest: &[u8]) {
    let Some((lat, lat_len)) = parse_lat_human(rest) else {
        rec.warn("malformed human-readable latitude");
        return;
    };
    if rest.get(7).is_some_and(u8::is_ascii_lowercase) {
        rec.warn("lowercase hemisphere letter accepted");
    }
    let after_lat = &rest[lat_len..];
    if after_lat.is_empty() {
        rec.warn("position missing symbol table");
        return;
    }
    rec.symbol_table = after_lat[0] as char;
    let after_table = &after_lat[1..];
    let Some((lon, lon_len)) = parse_lon_human(after_table) else {
        rec.warn("malformed human-readable longitude");
        return;
    };
    let after_lon = &after_table[lon_len..];
    if after_lon.is_empty() {
        rec.warn("position missing symbol code");
        return;
    }
    rec.symbol_code = after_lon[0] as char;
    rec.lat = Some(Coordinate(lat));
    rec.lon = Some(Coordinate(lon));
    let remainder = &after_lon[1..];
    let comment = parse_comment_extensions(rec, remainder);
    rec.comment = comment;
}

const BASE91_CHARS: &str = "!\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

fn base91_decode(s: &[u8]) -> Option<i64> {
    let mut v: i64 = 0;
    for &b in s {
        let pos = BASE91_CHARS.as_bytes().iter().position(|&c| c == b)?;
        v = v * 91 + pos as i64;
    }
    Some(v)
}

fn decode_compressed_position(rec: &mut Record, rest: &[u8]) {
    if rest.len() < 13 {
        rec.warn("compressed position too short");
        return;
    }
    rec.symbol_table = rest[0] as char;
    let Some(lat91) = base91_decode(&rest[1..5]) else {
        rec.warn("malformed compressed latitude");
        return;
    };
    let Some(lon91) = base91_decode(&rest[5..9]) else {
        rec.warn("malformed compressed longitude");
        return;
    };
    let lat = 90.0 - (lat91 as f64) / 380_926.0;
    let lon = -180.0 + (lon91 as f64) / 190_463.0;
    rec.lat = Some(Coordinate(lat));
    rec.lon = Some(Coordinate(lon));
    rec.symbol_code = rest[9] as char;
    // rest[10..12] is course/speed or altitude or range, rest[12] is compression type.
    let comment = parse_comment_extensions(rec, &rest[13..]);
    rec.comment = comment;
}

// ---------------------------------------------------------------------
// Comment post-processing
// ---------------------------------------------------------------------

fn decode_phg(digits: &[u8; 4]) -> Phg {
    let p = (digits[0] - b'0') as u32;
    let h = (digits[1] - b'0') as u32;
    let g = (digits[2] - b'0') as u32;
    let d = digits[3] - b'0';
    let directivity = match d {
        0 | 9 => "omni",
        1 => "NE",
        2 => "E",
        3 => "SE",
        4 => "S",
        5 => "SW",
        6 => "W",
        7 => "NW",
        8 => "N",
        _ => "omni",
    };
    Phg {
        power_watts: p * p,
        height_ft: 10 * 2u32.pow(h),
        gain_dbi: g,
        directivity,
    }
}

fn parse_comment_extensions(rec: &mut Record, s: &[u8]) -> String {
    let s = strip_cr(s);
    if s.iter().any(|&b| b == 0) {
        rec.warn("nul byte in info part (known defective radio firmware)");
    }
    let mut s = s.to_vec();
    s.retain(|&b| b != 0);

    // PHG extension.
    if s.len() >= 7 && &s[0..3] == b"PHG" && s[3..7].iter().all(u8::is_ascii_digit) {
        let digits = [s[3], s[4], s[5], s[6]];
        rec.phg = Some(decode_phg(&digits));
        s.drain(0..7);
    } else if s.len() >= 7
        && s[0..3].iter().all(u8::is_ascii_digit)
        && s[3] == b'/'
        && s[4..7].iter().all(u8::is_ascii_digit)
    {
        // Course/speed data extension "ccc/sss".
        let text = String::from_utf8_lossy(&s[0..7]);
        if let Some((c, sp)) = text.split_once('/') {
            rec.course_deg = c.parse().ok();
            rec.speed_knots = sp.parse::<f64>().ok();
        }
        s.drain(0..7);
    }

    // DAO precision augmentation `!DAO!`.
    if let Some(pos) = find_subslice(&s, b"!") {
        if s.len() >= pos + 5 && s[pos + 4] == b'!' {
            s.drain(pos..pos + 5);
        }
    }

    // Altitude `/A=DDDDDD`.
    if let Some(pos) = find_subslice(&s, b"/A=") {
        let digits_start = pos + 3;
        let mut end = digits_start;
        while end < s.len() && (s[end].is_ascii_digit() || (end == digits_start && s[end] == b'-')) {
            end += 1;
        }
        if end > digits_start {
            if let Ok(v) = std::str::from_utf8(&s[digits_start..end]).unwrap_or_default().parse::<i32>() {
                rec.altitude_ft = Some(v);
            }
            s.drain(pos..end);
        }
    }

    // Range `Rnnm`/`Rnnk`.
    if let Some(pos) = find_byte(&s, b'R') {
        if pos + 3 < s.len() && s[pos + 1..pos + 3].iter().all(u8::is_ascii_digit) {
            let unit = s[pos + 3];
            if unit == b'm' || unit == b'k' {
                let n: f64 = std::str::from_utf8(&s[pos + 1..pos + 3]).unwrap_or("0").parse().unwrap_or(0.0);
                let km = if unit == b'm' { n * 1.609_344 } else { n };
                rec.radio.get_or_insert_with(RadioSpec::default).range_km = Some(km);
                s.drain(pos..pos + 4);
            }
        }
    }

    // Frequency spec `DDD.DDD[D]MHz`.
    if let Some(pos) = find_mhz(&s) {
        let (start, end, freq) = pos;
        rec.radio.get_or_insert_with(RadioSpec::default).freq_mhz = Some(freq);
        s.drain(start..end);
    }

    // Tone `Tnnn`, DCS `Dnnn`, offset `+nnn`/`-nnn`.
    parse_tone_and_offset(rec, &mut s);

    // Base-91 telemetry `|...|`.
    if let Some(start) = find_byte(&s, b'|') {
        if let Some(end_rel) = find_byte(&s[start + 1..], b'|') {
            let end = start + 1 + end_rel;
            let raw = String::from_utf8_lossy(&s[start + 1..end]).into_owned();
            rec.telemetry = Some(Telemetry { sequence: None, raw });
            s.drain(start..=end);
        }
    }

    String::from_utf8_lossy(&s).trim().to_string()
}

fn find_byte(s: &[u8], b: u8) -> Option<usize> {
    s.iter().position(|&x| x == b)
}

fn find_subslice(s: &[u8], pat: &[u8]) -> Option<usize> {
    if pat.is_empty() || s.len() < pat.len() {
        return None;
    }
    (0..=s.len() - pat.len()).find(|&i| &s[i..i + pat.len()] == pat)
}

fn find_mhz(s: &[u8]) -> Option<(usize, usize, f64)> {
    let pat = b"MHz";
    let pos = find_subslice(s, pat)?;
    let mut start = pos;
    while start > 0 && (s[start - 1].is_ascii_digit() || s[start - 1] == b'.') {
        start -= 1;
    }
    if start == pos {
        return None;
    }
    let text = std::str::from_utf8(&s[start..pos]).ok()?;
    let freq: f64 = text.parse().ok()?;
    Some((start, pos + pat.len(), freq))
}

fn parse_tone_and_offset(rec: &mut Record, s: &mut Vec<u8>) {
    let mut i = 0;
    while i < s.len() {
        let c = s[i];
        if (c == b'T' || c == b'D') && i + 3 < s.len() && s[i + 1..i + 4].iter().all(u8::is_ascii_digit) {
            let n: u32 = std::str::from_utf8(&s[i + 1..i + 4]).unwrap_or("0").parse().unwrap_or(0);
            let radio = rec.radio.get_or_insert_with(RadioSpec::default);
            if c == b'T' {
                radio.ctcss_hz = Some(n);
            } else {
                radio.dcs = Some(n);
            }
            s.drain(i..i + 4);
            continue;
        }
        if (c == b'+' || c == b'-') && i + 3 < s.len() && s[i + 1..i + 4].iter().all(u8::is_ascii_digit) {
            let n: i32 = std::str::from_utf8(&s[i + 1..i + 4]).unwrap_or("0").parse().unwrap_or(0);
            let signed = if c == b'-' { -n } else { n };
            rec.radio.get_or_insert_with(RadioSpec::default).offset_khz = Some(signed * 10);
            s.drain(i..i + 4);
            continue;
        }
        i += 1;
    }
}

// ---------------------------------------------------------------------
// Object / item
// ---------------------------------------------------------------------

fn decode_object_or_item(rec: &mut Record, rest: &[u8], is_object: bool) {
    let name_len = if is_object { 9 } else { rest.iter().position(|&b| b == b'!' || b == b'_').unwrap_or(3).clamp(3, 9) };
    if rest.len() < name_len + 1 {
        rec.warn("object/item record too short");
        return;
    }
    let name = String::from_utf8_lossy(&rest[0..name_len]).trim().to_string();
    rec.addressee = Some(name);
    let live = rest[name_len];
    let expected_live = if is_object { b'*' } else { b'!' };
    if live != expected_live && live != b'_' {
        rec.warn("object/item missing live/kill flag");
    }
    let after_flag = &rest[name_len + 1..];
    let body = if is_object { skip_timestamp(after_flag) } else { after_flag };
    decode_position(rec, body);
}

// ---------------------------------------------------------------------
// Message / bulletin / NWS / telemetry metadata
// ---------------------------------------------------------------------

fn decode_message(rec: &mut Record, rest: &[u8]) {
    rec.packet_type = PacketType::Message;
    rec.data_type_desc = "message".to_string();
    if rest.len() < 9 {
        rec.message_subtype = Some(MessageSubtype::Invalid);
        rec.warn("message record too short for addressee field");
        return;
    }
    let addressee = String::from_utf8_lossy(&rest[0..9]).trim().to_string();
    if rest.get(9) != Some(&b':') {
        rec.message_subtype = Some(MessageSubtype::Invalid);
        rec.warn("message missing ':' after addressee");
        return;
    }
    let body = strip_cr(&rest[10..]);
    let body_text = String::from_utf8_lossy(body).into_owned();

    rec.message_subtype = Some(if addressee.starts_with("BLN") {
        MessageSubtype::Bulletin
    } else if addressee.starts_with("NWS") {
        MessageSubtype::Nws
    } else if body_text.starts_with("ack") {
        MessageSubtype::Ack
    } else if body_text.starts_with("rej") {
        MessageSubtype::Rej
    } else if body_text.starts_with("PARM.") {
        MessageSubtype::TelemParm
    } else if body_text.starts_with("UNIT.") {
        MessageSubtype::TelemUnit
    } else if body_text.starts_with("EQNS.") {
        MessageSubtype::TelemEqns
    } else if body_text.starts_with("BITS.") {
        MessageSubtype::TelemBits
    } else if body_text.starts_with('?') {
        MessageSubtype::DirectedQuery
    } else {
        MessageSubtype::Message
    });
    rec.addressee = Some(addressee);

    if let Some(brace) = body_text.find('{') {
        rec.message_number = Some(body_text[brace + 1..].to_string());
        rec.comment = body_text[..brace].to_string();
    } else {
        rec.comment = body_text;
    }
}

// ---------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------

/// Known single-letter-prefixed fixed-width weather fields, scanned in
/// whatever order they appear (real transmitters don't always agree).
fn parse_weather(s: &[u8]) -> (Weather, String) {
    let mut w = Weather::default();
    let text = String::from_utf8_lossy(strip_cr(s)).into_owned();
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut consumed = vec![false; bytes.len()];

    while i < bytes.len() {
        let c = bytes[i];
        let width = match c {
            b'c' | b's' | b'g' | b't' | b'r' | b'p' | b'P' => 3,
            b'h' => 2,
            b'b' => 5,
            _ => 0,
        };
        if width == 0 || i + 1 + width > bytes.len() || !bytes[i + 1..i + 1 + width].iter().all(u8::is_ascii_digit) {
            i += 1;
            continue;
        }
        let field = std::str::from_utf8(&bytes[i + 1..i + 1 + width]).unwrap();
        match c {
            b'c' => w.wind_dir_deg = field.parse().ok(),
            b's' => w.wind_speed_mph = field.parse().ok(),
            b'g' => w.wind_gust_mph = field.parse().ok(),
            b't' => w.temperature_f = field.parse().ok(),
            b'r' => w.rain_last_hour = field.parse().ok(),
            b'h' => w.humidity_pct = field.parse().ok(),
            b'b' => w.pressure_tenths_mb = field.parse().ok(),
            _ => {}
        }
        for j in i..=i + width {
            consumed[j] = true;
        }
        i += 1 + width;
    }

    let remaining: String = bytes
        .iter()
        .zip(consumed.iter())
        .filter(|(_, &c)| !c)
        .map(|(&b, _)| b as char)
        .collect();
    (w, remaining)
}

// ---------------------------------------------------------------------
// MIC-E
// ---------------------------------------------------------------------

fn mic_e_char(c: u8) -> (u8, u8, bool) {
    match c {
        b'0'..=b'9' => (c - b'0', 0, false),
        b'A'..=b'J' => (c - b'A', 1, false),
        b'P'..=b'Y' => (c - b'P', 1, true),
        b'K' | b'L' | b'Z' => (0, 2, true),
        _ => (0, 2, false),
    }
}

/// Infer the encoding device from the last byte of the destination
/// callsign. The full vendor table has many one-off special cases; this
/// keeps the common Kenwood-vs-legacy-TinyTrak split only.
fn mic_e_manufacturer(last_dest_char: u8) -> &'static str {
    match last_dest_char {
        b'0'..=b'9' => "Original MIC-E",
        b'A'..=b'K' | b'P'..=b'Z' => "Kenwood",
        _ => "Unknown",
    }
}

fn decode_mic_e(rec: &mut Record, destination: &str, info: &[u8]) {
    let dest = destination.split('-').next().unwrap_or(destination).as_bytes();
    if dest.len() < 6 || info.len() < 8 {
        rec.warn("Mic-E record too short to decode");
        return;
    }
    let mut digits = [0u8; 6];
    let mut msg_bits = [0u8; 3];
    let mut north = false;
    let mut long_offset = false;
    let mut west = false;
    for (i, &c) in dest[0..6].iter().enumerate() {
        let (d, bit, special) = mic_e_char(c);
        digits[i] = d;
        match i {
            0..=2 => msg_bits[i] = bit,
            3 => north = special,
            4 => long_offset = special,
            5 => west = special,
            _ => {}
        }
    }
    let lat = {
        let deg = digits[0] as f64 * 10.0 + digits[1] as f64;
        let min = digits[2] as f64 * 10.0 + digits[3] as f64;
        let hundredths = digits[4] as f64 * 10.0 + digits[5] as f64;
        let v = deg + (min + hundredths / 100.0) / 60.0;
        if north { v } else { -v }
    };

    let d28 = info[0] as i32 - 28;
    let m28 = info[1] as i32 - 28;
    let h28 = info[2] as i32 - 28;
    let mut lon_deg = d28;
    if long_offset {
        lon_deg += 100;
    }
    if (180..=189).contains(&lon_deg) {
        lon_deg -= 80;
    } else if (190..=199).contains(&lon_deg) {
        lon_deg -= 190;
    }
    let mut lon_min = m28;
    if lon_min >= 60 {
        lon_min -= 60;
    }
    let lon = {
        let v = lon_deg as f64 + (lon_min as f64 + h28 as f64 / 100.0) / 60.0;
        if west { -v } else { v }
    };

    let sp28 = info[3] as i32 - 28;
    let dc28 = info[4] as i32 - 28;
    let se28 = info[5] as i32 - 28;
    let speed_raw = sp28 * 10 + dc28 / 10;
    let course_raw = (dc28 % 10) * 100 + se28;

    rec.lat = Some(Coordinate(lat));
    rec.lon = Some(Coordinate(lon));
    rec.speed_knots = Some(speed_raw.max(0) as f64);
    rec.course_deg = Some(course_raw.rem_euclid(360) as u16);
    rec.symbol_code = info.get(6).copied().unwrap_or(b'/') as char;
    rec.symbol_table = info.get(7).copied().unwrap_or(b'/') as char;
    rec.manufacturer = Some(mic_e_manufacturer(dest[5]).to_string());

    rec.message_subtype = Some(MessageSubtype::Message);
    let status_text = match msg_bits {
        [0, 0, 0] => "Off Duty",
        [0, 0, 1] => "En Route",
        [0, 1, 0] => "In Service",
        [0, 1, 1] => "Returning",
        [1, 0, 0] => "Committed",
        [1, 0, 1] => "Special",
        [1, 1, 0] => "Priority",
        _ => "Emergency",
    };
    rec.comment = status_text.to_string();

    let mut rest = &info[8..];
    if rest.len() >= 4 && rest[3] == b'}' {
        if let Some(alt91) = base91_decode(&rest[0..3]) {
            // Mic-E altitude is base-91 meters above sea level minus 10000.
            rec.altitude_ft = Some((alt91 - 10_000) as i32);
        }
        rest = &rest[4..];
    }
    let extra = String::from_utf8_lossy(strip_cr(rest)).trim().to_string();
    if !extra.is_empty() {
        rec.comment.push(' ');
        rec.comment.push_str(&extra);
    }
}

// ---------------------------------------------------------------------
// Third-party header
// ---------------------------------------------------------------------

fn decode_thirdparty(outer_destination: &str, rest: &[u8]) -> Record {
    let text = String::from_utf8_lossy(rest);
    let Some(colon) = text.find(':') else {
        let mut rec = Record::new("", outer_destination);
        rec.data_type_desc = "ERROR: malformed third-party header".to_string();
        return rec;
    };
    let header = &text[..colon];
    let payload = text[colon + 1..].as_bytes();
    let Some(gt) = header.find('>') else {
        let mut rec = Record::new("", outer_destination);
        rec.data_type_desc = "ERROR: malformed third-party header".to_string();
        return rec;
    };
    let inner_src = header[..gt].to_string();
    let inner_dest = header[gt + 1..].split(',').next().unwrap_or("").to_string();
    let mut inner = parse(&inner_src, &inner_dest, payload);
    inner.has_thirdparty_header = true;
    inner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_decode_with_phg_and_comment() {
        let rec = parse("N0CALL", "APRS", b"!4237.14NS07120.83W#PHG7130Chelmsford, MA");
        assert_eq!(rec.packet_type, PacketType::Position);
        let lat = rec.lat.unwrap().0;
        let lon = rec.lon.unwrap().0;
        assert!((lat - 42.619_000).abs() < 1e-5, "lat={lat}");
        assert!((lon - -71.347_167).abs() < 1e-5, "lon={lon}");
        assert_eq!(rec.symbol_table, 'S');
        assert_eq!(rec.symbol_code, '#');
        let phg = rec.phg.unwrap();
        assert_eq!(phg.power_watts, 49);
        assert_eq!(rec.comment, "Chelmsford, MA");
    }

    #[test]
    fn mic_e_decode_produces_plausible_position() {
        let rec = parse("N1EDF-9", "T2QT8Y", b"`bSbl!Mv/`\"4%}_ \r");
        assert_eq!(rec.packet_type, PacketType::Position);
        let lat = rec.lat.unwrap().0;
        let lon = rec.lon.unwrap().0;
        assert!((40.0..46.0).contains(&lat), "lat={lat}");
        assert!((-75.0..-69.0).contains(&lon), "lon={lon}");
        assert_eq!(rec.symbol_table, '/');
        assert_eq!(rec.manufacturer.as_deref(), Some("Kenwood"));
    }

    #[test]
    fn thirdparty_recursion_reflects_inner_source() {
        let rec = parse(
            "WIDE1-1",
            "APOSB",
            b"}WR2X-2>APOSB,TCPIP,WR2X-2*:@122015z4221.42ND07111.93W&Test",
        );
        assert!(rec.has_thirdparty_header);
        assert_eq!(rec.source, "WR2X-2");
        assert_eq!(rec.packet_type, PacketType::Position);
    }

    #[test]
    fn unknown_first_byte_is_flagged_as_error() {
        let rec = parse("N0CALL", "APRS", b"~garbage");
        assert_eq!(rec.packet_type, PacketType::Unknown);
        assert!(rec.data_type_desc.starts_with("ERROR"));
    }

    #[test]
    fn message_record_extracts_addressee_and_number() {
        let rec = parse("N0CALL", "APRS", b":N1EDF-9  :Hello there{001");
        assert_eq!(rec.packet_type, PacketType::Message);
        assert_eq!(rec.addressee.as_deref(), Some("N1EDF-9"));
        assert_eq!(rec.message_number.as_deref(), Some("001"));
        assert_eq!(rec.comment, "Hello there");
    }

    #[test]
    fn weather_record_parses_wind_and_temperature() {
        let rec = parse("N0CALL", "APRS", b"_10090556c220s004g005t077r000p000h50b10150");
        assert_eq!(rec.packet_type, PacketType::Weather);
        let w = rec.weather.unwrap();
        assert_eq!(w.wind_dir_deg, Some(220));
        assert_eq!(w.wind_speed_mph, Some(4));
        assert_eq!(w.temperature_f, Some(77));
    }
}
