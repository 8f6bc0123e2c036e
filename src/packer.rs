//! MSB-first bit-level packer and the polynomial coefficient codecs built on it.
//!
//! A [`Packer`] is either in write mode (the caller supplies growable storage and pushes
//! fixed-width fields) or read mode (the caller supplies a byte slice and pulls fields back
//! out in the same order). On top of the raw bit packer, `poly_encode`/`poly_decode` drive
//! it across a whole polynomial of signed or unsigned coefficients, with an optional
//! entropy-coding back-end selected per [`Compressor`].

extern crate alloc;

use alloc::vec::Vec;

/// Selects the entropy-coding back-end layered under the raw bit packer.
///
/// `Huffman` is the only non-`None` back-end implemented here: a small static prefix code
/// tuned for the near-zero-centred coefficient distributions produced by the lattice
/// samplers (BAC and the strongSwan variable-length code are named in the architecture but
/// are external-library concerns, not reimplemented by this crate).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) enum Compressor {
    /// Fixed bit-width, no compression.
    #[default]
    None,
    /// Static prefix code biased toward coefficients near zero.
    Huffman,
}

/// A bit-level packer, MSB-first, operating either in write or read mode.
pub(crate) struct Packer {
    buf: Vec<u8>,
    // bit-write cursor, counted from the MSB of the next free byte
    write_bit: u8,
    read_pos: usize,
    read_bit: u8,
    mode: Mode,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Write,
    Read,
}

impl Packer {
    /// A new packer in write mode, with `capacity_hint` bytes pre-reserved.
    #[must_use]
    pub fn new_writer(capacity_hint: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity_hint), write_bit: 0, read_pos: 0, read_bit: 0, mode: Mode::Write }
    }

    /// A new packer in read mode over an existing byte buffer.
    #[must_use]
    pub fn new_reader(bytes: &[u8]) -> Self {
        Self { buf: bytes.to_vec(), write_bit: 0, read_pos: 0, read_bit: 0, mode: Mode::Read }
    }

    /// Writes the low `bits` bits of `value`, MSB first. `bits` must be in `1..=32`.
    ///
    /// # Panics
    /// Panics if called on a reader, or if `bits` is out of range.
    pub fn write(&mut self, value: u32, bits: u32) {
        assert!(self.mode == Mode::Write, "write() on a reader Packer");
        assert!((1..=32).contains(&bits), "write(): bits out of range");
        for i in (0..bits).rev() {
            let bit = ((value >> i) & 1) as u8;
            if self.write_bit == 0 {
                self.buf.push(0);
            }
            let last = self.buf.len() - 1;
            self.buf[last] |= bit << (7 - self.write_bit);
            self.write_bit = (self.write_bit + 1) % 8;
        }
    }

    /// Reads `bits` bits, MSB first, returning them right-justified in a `u32`.
    ///
    /// # Errors
    /// Returns an error if fewer than `bits` bits remain in the source buffer.
    ///
    /// # Panics
    /// Panics if called on a writer, or if `bits` is out of range.
    pub fn read(&mut self, bits: u32) -> Result<u32, &'static str> {
        assert!(self.mode == Mode::Read, "read() on a writer Packer");
        assert!((1..=32).contains(&bits), "read(): bits out of range");
        let mut value = 0u32;
        for _ in 0..bits {
            if self.read_pos >= self.buf.len() {
                return Err("Packer: read past end of buffer");
            }
            let bit = (self.buf[self.read_pos] >> (7 - self.read_bit)) & 1;
            value = (value << 1) | u32::from(bit);
            self.read_bit += 1;
            if self.read_bit == 8 {
                self.read_bit = 0;
                self.read_pos += 1;
            }
        }
        Ok(value)
    }

    /// Pads the current byte with zero bits so the next write starts byte-aligned.
    pub fn flush(&mut self) {
        if self.write_bit != 0 {
            self.write_bit = 0;
        }
    }

    /// Advances the read cursor to the start of the next byte, mirroring [`Packer::flush`] on
    /// the write side. Call this after reading a field that was written through a helper (like
    /// [`poly_encode`]) that flushes to a byte boundary, before reading whatever follows it.
    pub fn align_read(&mut self) {
        if self.read_bit != 0 {
            self.read_bit = 0;
            self.read_pos += 1;
        }
    }

    /// Returns the packed bytes written so far (write mode only meaningful use).
    #[must_use]
    pub fn get_buffer(&self) -> &[u8] { &self.buf }
}


/// Encodes `coeffs` (each assumed to fit in `bits` bits once centred/biased as described by
/// `signed`) into `packer`, optionally through the Huffman-static compressor.
pub(crate) fn poly_encode(packer: &mut Packer, coeffs: &[i64], bits: u32, signed: bool, coder: Compressor) {
    match coder {
        Compressor::None => {
            for &c in coeffs {
                let raw = if signed { to_twos_complement(c, bits) } else { truncate(c, bits) };
                packer.write(raw, bits);
            }
        }
        Compressor::Huffman => {
            for &c in coeffs {
                huffman_encode_one(packer, c);
            }
        }
    }
    packer.flush();
}

/// Inverse of [`poly_encode`]; `out.len()` coefficients are pulled from `packer`.
///
/// # Errors
/// Propagates underflow errors from the underlying [`Packer::read`].
pub(crate) fn poly_decode(
    packer: &mut Packer, out: &mut [i64], bits: u32, signed: bool, coder: Compressor,
) -> Result<(), &'static str> {
    match coder {
        Compressor::None => {
            for slot in out.iter_mut() {
                let raw = packer.read(bits)?;
                *slot = if signed { from_twos_complement(raw, bits) } else { i64::from(raw) };
            }
        }
        Compressor::Huffman => {
            for slot in out.iter_mut() {
                *slot = huffman_decode_one(packer)?;
            }
        }
    }
    Ok(())
}

fn truncate(v: i64, bits: u32) -> u32 {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
    (v as u32) & mask
}

fn to_twos_complement(v: i64, bits: u32) -> u32 {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
    (v as u32) & mask
}

fn from_twos_complement(raw: u32, bits: u32) -> i64 {
    let sign_bit = 1u32 << (bits - 1);
    if bits < 32 && (raw & sign_bit) != 0 {
        i64::from(raw) - (1i64 << bits)
    } else {
        i64::from(raw)
    }
}

// A tiny static prefix code biased toward values near zero:
//   0            -> "0"
//   +1           -> "100"
//   -1           -> "101"
//   other value v -> "11" followed by a 16-bit two's-complement escape
fn huffman_encode_one(packer: &mut Packer, v: i64) {
    match v {
        0 => packer.write(0, 1),
        1 => packer.write(0b100, 3),
        -1 => packer.write(0b101, 3),
        _ => {
            packer.write(0b11, 2);
            #[allow(clippy::cast_sign_loss)]
            packer.write((v as i32 as u32) & 0xFFFF, 16);
        }
    }
}

fn huffman_decode_one(packer: &mut Packer) -> Result<i64, &'static str> {
    if packer.read(1)? == 0 {
        return Ok(0);
    }
    if packer.read(1)? == 0 {
        return Ok(if packer.read(1)? == 0 { 1 } else { -1 });
    }
    let raw = packer.read(16)?;
    Ok(from_twos_complement(raw, 16))
}
