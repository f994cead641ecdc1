/*! Shared configuration: per-device and per-channel descriptors.

A single immutable-after-startup [`Config`] holds everything the modem,
frame, and transmit-timing layers need. It is `serde`-derived so a host can
load it from JSON, and [`Config::validate`] enforces every invariant once at
construction rather than re-checking it on every packet.
*/
use serde::{Deserialize, Serialize};

/// Upper bound on the number of radio channels one process may configure.
pub const MAX_RADIO_CHANNELS: usize = 64;

/// Modem type selected for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModemType {
    /// Bell 202 AFSK, 1200 bps.
    Afsk,
    /// Unscrambled baseband.
    Baseband,
    /// G3RUH-scrambled baseband, 9600 bps and above.
    Scramble,
    /// QPSK, 2400 bps.
    Qpsk,
    /// 8PSK, 4800 bps.
    #[serde(rename = "8PSK")]
    Psk8,
    /// 16-QAM.
    #[serde(rename = "16_QAM")]
    Qam16,
    /// 64-QAM.
    #[serde(rename = "64_QAM")]
    Qam64,
    /// AIS (marine AIS, 9600bps-like baseband with fixed parameters).
    Ais,
    /// EAS/SAME (520.83bps AFSK with fixed tones).
    Eas,
    /// Channel disabled.
    Off,
}

/// Which of the two incompatible V.26 dibit-to-phase mappings a QPSK channel
/// uses. Required explicitly: there is no safe default between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum V26Alternative {
    /// V.26 alternative A.
    A,
    /// V.26 alternative B.
    B,
}

/// Forward error correction envelope used on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FecMode {
    /// Plain AX.25, no FEC.
    Ax25,
    /// FX.25 RS-coded envelope.
    Fx25,
    /// IL2P envelope.
    Il2p,
}

/// What a channel is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Medium {
    /// Channel not in use.
    None,
    /// Ordinary radio channel.
    Radio,
    /// Internet gateway channel.
    Igate,
    /// Network TNC channel (KISS-over-TCP and similar).
    Nettnc,
}

/// How PTT is keyed for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PttMethod {
    /// No PTT; receive-only channel.
    None,
    /// Rig-control (CAT) command.
    Cat,
    /// A GPIO line.
    Gpio,
    /// VOX (keyed by the presence of audio).
    Vox,
}

/// PTT keying configuration for one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PttConfig {
    /// Keying method.
    pub method: PttMethod,
    /// Device path (rig-control port, GPIO chip), if applicable.
    pub device: Option<String>,
    /// GPIO line/pin number, if applicable.
    pub line: Option<u32>,
    /// True if the keying signal is active-low.
    pub inverted: bool,
}

impl Default for PttConfig {
    fn default() -> Self {
        Self {
            method: PttMethod::None,
            device: None,
            line: None,
            inverted: false,
        }
    }
}

/// One audio device: an input/output pair the modem layer reads from and
/// writes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Number of audio channels, 1 (mono) or 2 (stereo).
    pub num_channels: u8,
    /// Sample rate, Hz.
    pub sample_rate: u32,
    /// Bits per sample, 8 or 16.
    pub bit_depth: u8,
    /// Soundcard name, UDP port, or `-` for stdin.
    pub input_name: String,
    /// Soundcard name, UDP port, or `-` for stdout.
    pub output_name: String,
}

/// A logical radio channel: modem parameters, FEC mode, transmit timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Index in `[0, MAX_RADIO_CHANNELS)`.
    pub index: usize,
    /// What the channel is used for.
    pub medium: Medium,
    /// Modem type.
    pub modem_type: ModemType,
    /// Baud rate, `[100, 40000]`.
    pub baud: u32,
    /// Sample rate this channel's decoders run at, Hz, `[8000, 192000]`.
    pub samples_per_sec: u32,
    /// AFSK/EAS mark tone frequency, Hz.
    pub mark_freq: u32,
    /// AFSK/EAS space tone frequency, Hz.
    pub space_freq: u32,
    /// Number of distinct filter profiles run in parallel.
    pub num_subchan: u32,
    /// Number of distinct slicer thresholds run in parallel, per subchannel.
    pub num_slicers: u32,
    /// Decimation factor, `1..=8`.
    pub decimation: u32,
    /// Upsample factor applied before slicing low-sample-rate baseband.
    pub upsample: u32,
    /// FEC envelope.
    pub fec_mode: FecMode,
    /// Preferred FX.25 parity strength (16, 32, or 64), or `None` for auto.
    pub fx25_parity: Option<u8>,
    /// IL2P maximum-FEC flag.
    pub il2p_max_fec: bool,
    /// IL2P payload sent with inverted polarity.
    pub il2p_inverted_polarity: bool,
    /// Required when `modem_type == Qpsk`.
    pub v26_alternative: Option<V26Alternative>,
    /// Transmit delay, units of 10ms.
    pub txdelay: u32,
    /// Transmit tail, units of 10ms.
    pub txtail: u32,
    /// CSMA persistence, `0..=255`.
    pub persist: u8,
    /// CSMA slot time, units of 10ms.
    pub slottime: u32,
    /// Delay before first CSMA check after PTT request, units of 10ms.
    pub dwait: u32,
    /// PTT keying configuration.
    pub ptt: PttConfig,
    /// True if the channel can transmit and receive at once.
    pub duplex: bool,
    /// Injected bit error rate, for testing, `0.0..=1.0`.
    pub test_bit_error_rate: f64,
}

impl Channel {
    /// Total number of parallel decoders this channel runs.
    #[must_use]
    pub fn num_decoders(&self) -> u32 {
        self.num_subchan * self.num_slicers
    }
}

/// Top-level, `serde`-loadable configuration for one process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Audio devices in use.
    pub audio_devices: Vec<AudioDevice>,
    /// Radio channels in use.
    pub channels: Vec<Channel>,
}

/// Errors from loading or validating a [`Config`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Channel index out of range.
    #[error("channel {index}: index out of range (max {max})")]
    ChannelIndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Maximum allowed index (exclusive upper bound minus one).
        max: usize,
    },

    /// Baud rate out of range.
    #[error("channel {index}: baud {baud} out of range [100, 40000]")]
    BaudOutOfRange {
        /// Channel index.
        index: usize,
        /// Offending baud rate.
        baud: u32,
    },

    /// Sample rate out of range.
    #[error("channel {index}: sample rate {rate} out of range [8000, 192000]")]
    SampleRateOutOfRange {
        /// Channel index.
        index: usize,
        /// Offending sample rate.
        rate: u32,
    },

    /// AFSK tone frequency out of range.
    #[error("channel {index}: tone frequency {freq}Hz out of range [300, 3000]")]
    ToneOutOfRange {
        /// Channel index.
        index: usize,
        /// Offending frequency.
        freq: u32,
    },

    /// `num_subchan * num_slicers` came out to zero.
    #[error("channel {index}: num_subchan * num_slicers must be >= 1")]
    NoDecoders {
        /// Channel index.
        index: usize,
    },

    /// QPSK channel with no V.26 alternative chosen.
    #[error("channel {index}: QPSK channel requires an explicit V.26 alternative")]
    MissingV26Alternative {
        /// Channel index.
        index: usize,
    },

    /// Decimation factor out of range.
    #[error("channel {index}: decimation factor {factor} out of range [1, 8]")]
    DecimationOutOfRange {
        /// Channel index.
        index: usize,
        /// Offending factor.
        factor: u32,
    },

    /// Malformed JSON.
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Config {
    /// Parse and validate a configuration from JSON text.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every invariant from the data model, returning the first
    /// violation found. Never panics on bad input.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for ch in &self.channels {
            ch.validate()?;
        }
        Ok(())
    }
}

impl Channel {
    /// Check this channel's own invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index >= MAX_RADIO_CHANNELS {
            return Err(ConfigError::ChannelIndexOutOfRange {
                index: self.index,
                max: MAX_RADIO_CHANNELS - 1,
            });
        }
        if !(100..=40_000).contains(&self.baud) {
            return Err(ConfigError::BaudOutOfRange {
                index: self.index,
                baud: self.baud,
            });
        }
        if !(8_000..=192_000).contains(&self.samples_per_sec) {
            return Err(ConfigError::SampleRateOutOfRange {
                index: self.index,
                rate: self.samples_per_sec,
            });
        }
        if matches!(self.modem_type, ModemType::Afsk) {
            for freq in [self.mark_freq, self.space_freq] {
                if !(300..=3_000).contains(&freq) {
                    return Err(ConfigError::ToneOutOfRange {
                        index: self.index,
                        freq,
                    });
                }
            }
        }
        if self.num_decoders() == 0 {
            return Err(ConfigError::NoDecoders { index: self.index });
        }
        if matches!(self.modem_type, ModemType::Qpsk) && self.v26_alternative.is_none() {
            return Err(ConfigError::MissingV26Alternative { index: self.index });
        }
        if !(1..=8).contains(&self.decimation) {
            return Err(ConfigError::DecimationOutOfRange {
                index: self.index,
                factor: self.decimation,
            });
        }
        Ok(())
    }
}

/// Pure CSMA key/defer decision, given a freshly drawn random byte and the
/// current DCD (carrier detect) state. Separated from the live slot-timer
/// loop (out of scope for this crate) so it can be unit-tested without a
/// live `rand::Rng`.
#[must_use]
pub fn csma_should_key(r: u8, persist: u8, dcd_asserted: bool) -> bool {
    !dcd_asserted && r <= persist
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> Channel {
        Channel {
            index: 0,
            medium: Medium::Radio,
            modem_type: ModemType::Afsk,
            baud: 1200,
            samples_per_sec: 48_000,
            mark_freq: 1200,
            space_freq: 2200,
            num_subchan: 1,
            num_slicers: 1,
            decimation: 1,
            upsample: 1,
            fec_mode: FecMode::Ax25,
            fx25_parity: None,
            il2p_max_fec: false,
            il2p_inverted_polarity: false,
            v26_alternative: None,
            txdelay: 30,
            txtail: 5,
            persist: 63,
            slottime: 10,
            dwait: 0,
            ptt: PttConfig::default(),
            duplex: false,
            test_bit_error_rate: 0.0,
        }
    }

    #[test]
    fn valid_channel_passes() {
        let cfg = Config {
            audio_devices: vec![],
            channels: vec![channel()],
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn baud_99_is_rejected_cleanly() {
        let mut ch = channel();
        ch.baud = 99;
        let err = ch.validate().unwrap_err();
        assert!(matches!(err, ConfigError::BaudOutOfRange { baud: 99, .. }));
    }

    #[test]
    fn baud_boundaries_are_accepted() {
        let mut ch = channel();
        ch.baud = 100;
        assert!(ch.validate().is_ok());
        ch.baud = 40_000;
        assert!(ch.validate().is_ok());
    }

    #[test]
    fn qpsk_without_v26_alternative_is_rejected_cleanly() {
        let mut ch = channel();
        ch.modem_type = ModemType::Qpsk;
        ch.v26_alternative = None;
        let err = ch.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingV26Alternative { .. }));
    }

    #[test]
    fn qpsk_with_v26_alternative_passes() {
        let mut ch = channel();
        ch.modem_type = ModemType::Qpsk;
        ch.v26_alternative = Some(V26Alternative::A);
        assert!(ch.validate().is_ok());
    }

    #[test]
    fn malformed_json_is_an_error_not_a_panic() {
        let err = Config::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = Config {
            audio_devices: vec![AudioDevice {
                num_channels: 1,
                sample_rate: 48_000,
                bit_depth: 16,
                input_name: "default".to_string(),
                output_name: "default".to_string(),
            }],
            channels: vec![channel()],
        };
        let json = cfg.to_json().unwrap();
        let back = Config::from_json(&json).unwrap();
        assert_eq!(back.channels.len(), 1);
        assert_eq!(back.channels[0].baud, 1200);
    }

    #[test]
    fn csma_decision_is_pure_and_deterministic() {
        assert!(csma_should_key(10, 63, false));
        assert!(!csma_should_key(200, 63, false));
        assert!(!csma_should_key(10, 63, true));
    }
}
