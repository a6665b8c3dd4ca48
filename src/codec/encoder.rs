//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of utf7-codec.
//
// utf7-codec is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// utf7-codec is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// utf7-codec. If not, see <http://www.gnu.org/licenses/>.

//! The UTF-16 to UTF-7 half of the codec.

use super::profile::{Class, Profile, UNSHIFT};

/// The outcome of an encoder call which did not need to stop early for
/// malformed input (the encoder never does).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoderResult {
    /// All input was consumed; call again with more input, or with `last` set.
    Underflow,
    /// The output buffer is full; call again with more room.
    Overflow,
}

/// Bytes which have been computed but not yet written to the caller.
///
/// At most one input unit's worth of output is ever queued, which is never
/// more than four bytes.
#[derive(Clone, Copy, Debug, Default)]
struct Pending {
    buf: [u8; 8],
    start: u8,
    end: u8,
}

impl Pending {
    fn push(&mut self, byte: u8) {
        self.buf[usize::from(self.end)] = byte;
        self.end += 1;
    }

    fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Move as much as possible into `dst[*written..]`.
    ///
    /// Returns whether the queue is now empty.
    fn drain(&mut self, dst: &mut [u8], written: &mut usize) -> bool {
        let queued = &self.buf[usize::from(self.start)..usize::from(self.end)];
        let n = queued.len().min(dst.len() - *written);
        dst[*written..*written + n].copy_from_slice(&queued[..n]);
        *written += n;
        self.start += n as u8;

        if self.is_empty() {
            self.start = 0;
            self.end = 0;
            true
        } else {
            false
        }
    }
}

/// A UTF-7 encoding session.
///
/// The encoder takes arbitrary 16-bit code units (surrogates are not paired
/// or checked) and produces canonical UTF-7: the shift character is only
/// written literally as the escape `+-` / `&-`, direct characters are never
/// encoded, and every shift run is closed with an explicit `-`.
#[derive(Clone, Debug)]
pub struct Encoder<'a> {
    profile: &'a Profile,
    shifted: bool,
    // Bits not yet written as a sextet, right-aligned
    bits: u32,
    nbits: u32,
    pending: Pending,
}

impl<'a> Encoder<'a> {
    pub fn new(profile: &'a Profile) -> Self {
        Encoder {
            profile,
            shifted: false,
            bits: 0,
            nbits: 0,
            pending: Pending::default(),
        }
    }

    pub fn profile(&self) -> &'a Profile {
        self.profile
    }

    /// Return to the initial state, discarding any unwritten output.
    pub fn reset(&mut self) {
        *self = Encoder::new(self.profile);
    }

    /// Encode as much of `src` into `dst` as possible.
    ///
    /// `last` indicates that `src` is the end of the text; once all of it has
    /// been consumed, any open shift run is closed.
    ///
    /// Returns the status and the number of units read and bytes written.
    /// On `Overflow`, output already computed for consumed input is held in
    /// the session and written first by the next call.
    pub fn encode(
        &mut self,
        src: &[u16],
        dst: &mut [u8],
        last: bool,
    ) -> (CoderResult, usize, usize) {
        let mut read = 0;
        let mut written = 0;

        loop {
            if !self.pending.drain(dst, &mut written) {
                return (CoderResult::Overflow, read, written);
            }

            let unit = match src.get(read) {
                Some(&unit) => unit,
                None => break,
            };

            if dst.len() == written {
                return (CoderResult::Overflow, read, written);
            }

            read += 1;
            self.push_unit(unit);
        }

        if last && self.shifted {
            self.close_run();
            if !self.pending.drain(dst, &mut written) {
                return (CoderResult::Overflow, read, written);
            }
        }

        (CoderResult::Underflow, read, written)
    }

    /// Write anything still held by the session, closing an open run.
    ///
    /// This is only needed after a final `encode` call returned `Overflow`
    /// with all input consumed.
    pub fn flush(&mut self, dst: &mut [u8]) -> (CoderResult, usize) {
        let (result, _, written) = self.encode(&[], dst, true);
        (result, written)
    }

    fn push_unit(&mut self, unit: u16) {
        match self.profile.classify(unit) {
            Class::Direct => {
                if self.shifted {
                    self.close_run();
                }
                // Direct units are always ASCII
                self.pending.push(unit as u8);
            }

            Class::Shiftable
                if !self.shifted && u16::from(self.profile.shift()) == unit =>
            {
                self.pending.push(self.profile.shift());
                self.pending.push(UNSHIFT);
            }

            Class::Shiftable => {
                if !self.shifted {
                    self.pending.push(self.profile.shift());
                    self.shifted = true;
                    self.bits = 0;
                    self.nbits = 0;
                }

                self.bits = (self.bits << 16) | u32::from(unit);
                self.nbits += 16;
                let alphabet = self.profile.alphabet();
                while self.nbits >= 6 {
                    self.nbits -= 6;
                    self.pending
                        .push(alphabet.char_of((self.bits >> self.nbits) as u8));
                }
                self.bits &= (1 << self.nbits) - 1;
            }
        }
    }

    fn close_run(&mut self) {
        if self.nbits > 0 {
            let sextet = (self.bits << (6 - self.nbits)) as u8;
            self.pending.push(self.profile.alphabet().char_of(sextet));
        }
        self.pending.push(UNSHIFT);

        self.shifted = false;
        self.bits = 0;
        self.nbits = 0;
    }
}
