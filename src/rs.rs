/*! Reed-Solomon codec over GF(2^8).

A generic systematic RS(255, 255-nroots) codec. Used by the FX.25 and
IL2P FEC envelopes, each of which instantiates this with a different
number of parity symbols (16, 32 or 64).

The implementation follows the textbook table-driven approach: build
`alpha_to`/`index_of` log tables for the field, form the generator
polynomial as a product of `(x - alpha^(first_root + i*primitive))`,
encode via polynomial division, and decode via syndromes,
Berlekamp-Massey, Chien search and Forney's algorithm.
*/
use crate::{Error, Result};

const FIELD_SIZE: usize = 256;
const NN: usize = 255;

/// A Reed-Solomon encoder/decoder for one `(generator, nroots)` configuration.
///
/// Immutable after construction; safe to share across threads (e.g. via
/// `Arc`) since encode/decode take `&self`.
#[derive(Debug, Clone)]
pub struct RsCodec {
    alpha_to: [u8; FIELD_SIZE],
    index_of: [u8; FIELD_SIZE],
    generator: Vec<u8>,
    first_root: usize,
    primitive: usize,
    nroots: usize,
}

impl RsCodec {
    /// Build a codec for the given field generator polynomial, first
    /// consecutive root, primitive element step, and parity symbol count.
    ///
    /// `gf_poly` is the GF(2^8) generator polynomial in the usual
    /// coefficient-bitmask form (e.g. `0x187` for the CCITT/AX.25
    /// polynomial `x^8+x^7+x^2+x+1` with the implicit `x^8` term
    /// dropped). Fails if `gf_poly` does not generate the full field,
    /// or if `nroots` is out of range.
    pub fn new(gf_poly: u16, first_root: u8, primitive: u8, nroots: usize) -> Result<Self> {
        if nroots == 0 || nroots >= NN {
            return Err(Error::config(format!(
                "nroots must be in 1..{NN}, got {nroots}"
            )));
        }
        let (alpha_to, index_of) = build_tables(gf_poly)?;
        let mut generator = vec![1u8];
        let mut root = (first_root as usize) * 1;
        for _ in 0..nroots {
            generator.push(1);
            // Multiply generator by (x - alpha^root), in GF(2) that's (x + alpha^root).
            for j in (1..generator.len()).rev() {
                if generator[j - 1] != 0 {
                    let term = gf_mul(&alpha_to, &index_of, generator[j - 1], alpha_to[root % NN]);
                    generator[j] ^= term;
                }
            }
            generator[0] = gf_mul(&alpha_to, &index_of, generator[0], alpha_to[root % NN]);
            root += primitive as usize;
        }
        Ok(Self {
            alpha_to,
            index_of,
            generator,
            first_root: first_root as usize,
            primitive: primitive as usize,
            nroots,
        })
    }

    /// Number of parity symbols this codec appends.
    #[must_use]
    pub fn nroots(&self) -> usize {
        self.nroots
    }

    /// Maximum data length (`k`) for a full, unshortened block.
    #[must_use]
    pub fn k(&self) -> usize {
        NN - self.nroots
    }

    fn mul(&self, a: u8, b: u8) -> u8 {
        gf_mul(&self.alpha_to, &self.index_of, a, b)
    }

    /// Systematically encode `data` (length `<= k()`), returning `data`
    /// followed by `nroots()` parity bytes.
    ///
    /// Shorter-than-`k` blocks are shortened codes: the missing leading
    /// bytes are treated as zero and not transmitted.
    #[must_use]
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        assert!(data.len() <= self.k(), "data longer than k");
        let mut parity = vec![0u8; self.nroots];
        for &d in data {
            let feedback = self.index_of[(d ^ parity[0]) as usize];
            if feedback != 255 {
                for j in 1..self.nroots {
                    parity[j - 1] = parity[j]
                        ^ self.alpha_to
                            [((feedback as usize + self.index_of[self.generator[self.nroots - j] as usize] as usize)
                                % NN)]
                }
                parity[self.nroots - 1] =
                    self.alpha_to[(feedback as usize + self.index_of[self.generator[0] as usize] as usize) % NN];
            } else {
                parity.copy_within(1.., 0);
                parity[self.nroots - 1] = 0;
            }
        }
        let mut out = Vec::with_capacity(data.len() + self.nroots);
        out.extend_from_slice(data);
        out.extend_from_slice(&parity);
        out
    }

    /// Decode a block in place. `block` holds the data bytes (shortened
    /// codes: only the transmitted, non-zero-padded part) immediately
    /// followed by `nroots()` parity bytes — i.e. the output of
    /// [`Self::encode`].
    ///
    /// On success, corrects errors in place and returns the number of
    /// symbols corrected (0 if the block was already clean). Returns
    /// [`Error::Msg`] if more errors are present than `nroots()/2` can
    /// correct; the caller must then discard the block, not re-use it.
    ///
    /// This follows the classic index-form Berlekamp-Massey/Chien/Forney
    /// layout (as in Phil Karn's widely deployed `fec` library), working
    /// throughout in GF(2^8) logarithms with `NN` (255) as the "log of
    /// zero" sentinel, rather than mixing polynomial- and index-form
    /// arithmetic.
    pub fn decode(&self, block: &mut [u8]) -> Result<usize> {
        const NO_ROOT: u8 = NN as u8; // log(0) sentinel, in index form.
        let pad = NN - block.len();
        let modnn = |x: i32| -> usize { x.rem_euclid(NN as i32) as usize };

        // Syndromes: S_i = block(alpha^(first_root + i*primitive)), evaluated
        // by Horner's rule. Converted to index form once nonzero-checked.
        let mut s = vec![0u8; self.nroots];
        for (i, si) in s.iter_mut().enumerate() {
            let mut acc = block[0];
            for &b in &block[1..] {
                acc = if acc == 0 {
                    b
                } else {
                    b ^ self.alpha_to[modnn(
                        self.index_of[acc as usize] as i32
                            + (self.first_root + i * self.primitive) as i32,
                    )]
                };
            }
            *si = acc;
        }
        if s.iter().all(|&x| x == 0) {
            return Ok(0);
        }
        let s: Vec<u8> = s.iter().map(|&x| self.index_of[x as usize]).collect();

        // Berlekamp-Massey, entirely in index form.
        let mut lambda = vec![0u8; self.nroots + 1];
        lambda[0] = 1;
        let mut b = vec![NO_ROOT; self.nroots + 1];
        b[0] = 0;
        let mut el = 0usize;
        for r in 1..=self.nroots {
            let mut discr_r = 0u8;
            for i in 0..r {
                if lambda[i] != 0 && s[r - i - 1] != NO_ROOT {
                    discr_r ^=
                        self.alpha_to[modnn(self.index_of[lambda[i] as usize] as i32 + s[r - i - 1] as i32)];
                }
            }
            let discr_r = self.index_of[discr_r as usize];
            if discr_r == NO_ROOT {
                b.copy_within(0..self.nroots, 1);
                b[0] = NO_ROOT;
                continue;
            }
            let mut t = vec![0u8; self.nroots + 1];
            t[0] = lambda[0];
            for i in 0..self.nroots {
                t[i + 1] = if b[i] != NO_ROOT {
                    lambda[i + 1] ^ self.alpha_to[modnn(discr_r as i32 + b[i] as i32)]
                } else {
                    lambda[i + 1]
                };
            }
            if 2 * el <= r - 1 {
                el = r - el;
                for i in 0..=self.nroots {
                    b[i] = if lambda[i] == 0 {
                        NO_ROOT
                    } else {
                        modnn(self.index_of[lambda[i] as usize] as i32 - discr_r as i32 + NN as i32) as u8
                    };
                }
            } else {
                b.copy_within(0..self.nroots, 1);
                b[0] = NO_ROOT;
            }
            lambda = t;
        }

        let deg_lambda = (0..=self.nroots).rev().find(|&i| lambda[i] != 0).unwrap_or(0);
        let error_count = deg_lambda;
        if error_count == 0 || error_count > self.nroots / 2 {
            return Err(Error::msg(format!(
                "reed-solomon: too many errors (>{} parity symbols can correct)",
                self.nroots / 2
            )));
        }
        let lambda_idx: Vec<u8> = lambda.iter().map(|&l| self.index_of[l as usize]).collect();

        // Chien search: test alpha^i for i in 1..=NN as roots of lambda.
        // `loc` is the corresponding data-array position, i.e. the exponent
        // of the inverse of alpha^(i*primitive).
        let iprim = modnn(mod_inverse(self.primitive as i32, NN as i32));
        let mut reg = lambda_idx.clone();
        let mut root = Vec::with_capacity(error_count);
        let mut loc = Vec::with_capacity(error_count);
        let mut k = modnn(iprim as i32 - 1);
        for i in 1..=NN {
            k = modnn(k as i32 + iprim as i32);
            let mut q = 1u8;
            for j in (1..=deg_lambda).rev() {
                if reg[j] != NO_ROOT {
                    reg[j] = modnn(reg[j] as i32 + j as i32) as u8;
                    q ^= self.alpha_to[reg[j] as usize];
                }
            }
            if q != 0 {
                continue;
            }
            root.push(i);
            loc.push(k);
            if root.len() == error_count {
                break;
            }
        }
        if root.len() != error_count {
            return Err(Error::msg(
                "reed-solomon: error locator has wrong number of roots, uncorrectable",
            ));
        }

        // omega(x) = s(x)*lambda(x) mod x^nroots, in index form.
        let deg_omega = error_count - 1;
        let mut omega = vec![NO_ROOT; deg_omega + 1];
        for (i, oi) in omega.iter_mut().enumerate() {
            let mut tmp = 0u8;
            for j in 0..=i {
                if s[i - j] != NO_ROOT && lambda_idx[j] != NO_ROOT {
                    tmp ^= self.alpha_to[modnn(s[i - j] as i32 + lambda_idx[j] as i32)];
                }
            }
            *oi = self.index_of[tmp as usize];
        }

        // Forney: error value at position loc[j] is
        // omega(X^-1) * X^(1-first_root) / lambda'(X^-1), evaluated in poly form.
        for (j, &pos) in loc.iter().enumerate() {
            let mut num1 = 0u8;
            for i in (0..=deg_omega).rev() {
                if omega[i] != NO_ROOT {
                    num1 ^= self.alpha_to[modnn(omega[i] as i32 + i as i32 * root[j] as i32)];
                }
            }
            let num2 = self.alpha_to[modnn(root[j] as i32 * (self.first_root as i32 - 1))];
            let mut den = 0u8;
            let mut i = deg_lambda.min(self.nroots - 1);
            i -= i % 2;
            loop {
                if lambda_idx[i + 1] != NO_ROOT {
                    den ^= self.alpha_to[modnn(lambda_idx[i + 1] as i32 + i as i32 * root[j] as i32)];
                }
                if i == 0 {
                    break;
                }
                i -= 2;
            }
            if den == 0 {
                return Err(Error::msg(
                    "reed-solomon: zero-valued error evaluator denominator",
                ));
            }
            if num1 != 0 {
                let magnitude = self.alpha_to[modnn(
                    self.index_of[num1 as usize] as i32 + self.index_of[num2 as usize] as i32
                        + NN as i32
                        - self.index_of[den as usize] as i32,
                )];
                if pos >= pad {
                    block[pos - pad] ^= magnitude;
                }
            }
        }
        Ok(error_count)
    }
}

/// Multiplicative inverse of `a` modulo `m`, via the extended Euclidean
/// algorithm. `a` and `m` are coprime for every `primitive` this codec is
/// constructed with (a generator step must be coprime to the field order).
fn mod_inverse(a: i32, m: i32) -> i32 {
    let (mut old_r, mut r) = (a, m);
    let (mut old_s, mut s) = (1i32, 0i32);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    old_s
}

fn gf_mul(alpha_to: &[u8; FIELD_SIZE], index_of: &[u8; FIELD_SIZE], a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    alpha_to[(index_of[a as usize] as usize + index_of[b as usize] as usize) % NN]
}

/// Build `(alpha_to, index_of)` log tables for the field defined by
/// `gf_poly`. Errors if the polynomial is not primitive, i.e. doesn't
/// generate all 255 nonzero field elements.
fn build_tables(gf_poly: u16) -> Result<([u8; FIELD_SIZE], [u8; FIELD_SIZE])> {
    let mut alpha_to = [0u8; FIELD_SIZE];
    let mut index_of = [0u8; FIELD_SIZE];
    let mut sr = 1usize;
    for i in 0..NN {
        alpha_to[i] = sr as u8;
        index_of[sr] = i as u8;
        sr <<= 1;
        if sr & 0x100 != 0 {
            sr ^= gf_poly as usize;
        }
        if sr > 0xff {
            return Err(Error::config(format!(
                "gf_poly {gf_poly:#x} produced an overflowing shift register, not primitive"
            )));
        }
    }
    if sr != 1 {
        return Err(Error::config(format!(
            "gf_poly {gf_poly:#x} is not a primitive polynomial for GF(2^8)"
        )));
    }
    alpha_to[NN] = 0;
    index_of[0] = 255;
    Ok((alpha_to, index_of))
}

/// The RS(255,239) configuration used by both FX.25 and IL2P: 16
/// parity symbols, CCITT-style field `x^8+x^4+x^3+x^2+1`, consecutive
/// roots starting at 1, primitive step 1.
pub fn rs16() -> RsCodec {
    RsCodec::new(0x11d, 1, 1, 16).expect("rs16 parameters are known-good")
}

/// RS(255,223): 32 parity symbols.
pub fn rs32() -> RsCodec {
    RsCodec::new(0x11d, 1, 1, 32).expect("rs32 parameters are known-good")
}

/// RS(255,191): 64 parity symbols.
pub fn rs64() -> RsCodec {
    RsCodec::new(0x11d, 1, 1, 64).expect("rs64 parameters are known-good")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_no_errors() {
        let rs = rs16();
        let data: Vec<u8> = (0..rs.k()).map(|i| (i * 7) as u8).collect();
        let mut block = rs.encode(&data);
        let corrections = rs.decode(&mut block).unwrap();
        assert_eq!(corrections, 0);
        assert_eq!(&block[..data.len()], &data[..]);
    }

    #[test]
    fn corrects_up_to_half_parity_errors() {
        let rs = rs16();
        let data: Vec<u8> = (0..rs.k()).map(|i| (i * 13 + 3) as u8).collect();
        let mut block = rs.encode(&data);
        for i in [0usize, 10, 50, 100, 150, 200, rs.k() - 1, rs.k() + 2] {
            block[i] ^= 0xff;
        }
        let corrections = rs.decode(&mut block).unwrap();
        assert_eq!(corrections, 8);
        assert_eq!(&block[..data.len()], &data[..]);
    }

    #[test]
    fn too_many_errors_is_detected() {
        let rs = rs16();
        let data: Vec<u8> = (0..rs.k()).map(|i| i as u8).collect();
        let mut block = rs.encode(&data);
        for i in 0..9 {
            block[i * 20] ^= 0xff;
        }
        assert!(rs.decode(&mut block).is_err());
    }

    #[test]
    fn shortened_code_round_trips() {
        let rs = rs16();
        let data = vec![1u8, 2, 3, 4, 5];
        let mut block = rs.encode(&data);
        block[0] ^= 0xff;
        let corrections = rs.decode(&mut block).unwrap();
        assert_eq!(corrections, 1);
        assert_eq!(&block[..data.len()], &data[..]);
    }

    #[test]
    fn rejects_bad_nroots() {
        assert!(RsCodec::new(0x11d, 1, 1, 0).is_err());
        assert!(RsCodec::new(0x11d, 1, 1, 255).is_err());
    }
}
