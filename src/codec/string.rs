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

//! Whole-string conveniences on top of the streaming codec.
//!
//! These assume the input is a complete unit, such as an IMAP mailbox name or
//! a single header value.

use std::borrow::Cow;
use std::str;

use log::debug;

use super::decoder::DecoderResult;
use super::encoder::CoderResult;
use super::profile::{Class, Profile};
use crate::support::error::{Error, Result};

const CHUNK: usize = 256;

impl Profile {
    /// Encode the given string into UTF-7.
    ///
    /// The result borrows `s` when nothing in it needs encoding.
    pub fn encode<'a>(&self, s: &'a str) -> Cow<'a, str> {
        if s.bytes().all(|b| Class::Direct == self.classify(b.into())) {
            return Cow::Borrowed(s);
        }

        let units = s.encode_utf16().collect::<Vec<_>>();
        let encoded = self.encode_utf16(&units);
        // The encoder only ever produces ASCII
        Cow::Owned(encoded.into_iter().map(char::from).collect())
    }

    /// Encode arbitrary code units, including unpaired surrogates.
    pub fn encode_utf16(&self, units: &[u16]) -> Vec<u8> {
        let mut encoder = self.new_encoder();
        let mut out = Vec::with_capacity(units.len() + units.len() / 2);
        let mut buf = [0u8; CHUNK];
        let mut src = units;

        loop {
            let (result, read, written) = encoder.encode(src, &mut buf, true);
            src = &src[read..];
            out.extend_from_slice(&buf[..written]);
            if CoderResult::Underflow == result {
                break;
            }
        }

        out
    }

    /// Decode the given UTF-7 into a string.
    ///
    /// Any non-canonical input fails with `Error::Malformed`. Decoded text
    /// which is not valid UTF-16 fails with `Error::UnpairedSurrogate`.
    ///
    /// The result borrows `s` when it contains no shift runs.
    pub fn decode<'a>(&self, s: &'a [u8]) -> Result<Cow<'a, str>> {
        if s.iter().all(|&b| self.shift() != b && self.accepts_direct(b)) {
            // Every accepted direct byte is ASCII
            if let Ok(s) = str::from_utf8(s) {
                return Ok(Cow::Borrowed(s));
            }
        }

        let units = self.decode_utf16(s)?;
        String::from_utf16(&units)
            .map(Cow::Owned)
            .map_err(|_| Error::UnpairedSurrogate)
    }

    /// Decode the given UTF-7 into raw code units.
    pub fn decode_utf16(&self, s: &[u8]) -> Result<Vec<u16>> {
        let mut out = Vec::with_capacity(s.len());
        self.decode_into(s, &mut out, |position, length| {
            debug!(
                "{}: {} malformed byte(s) before offset {}",
                self.name(),
                length,
                position
            );
            Err(Error::Malformed { position, length })
        })?;
        Ok(out)
    }

    /// Decode the given UTF-7, replacing each malformed sequence with
    /// U+FFFD.
    pub fn decode_lossy<'a>(&self, s: &'a [u8]) -> Cow<'a, str> {
        if let Ok(text) = self.decode(s) {
            return text;
        }

        let mut out = Vec::with_capacity(s.len());
        // The closure never fails, so neither does decode_into
        let _ = self.decode_into(s, &mut out, |_, _| Ok(Some(0xFFFD)));
        Cow::Owned(String::from_utf16_lossy(&out))
    }

    /// Drive a decoder over all of `s`, appending to `out`.
    ///
    /// `on_malformed` receives the input offset after the bad sequence and
    /// its length, and decides whether to substitute a unit or fail.
    fn decode_into(
        &self,
        s: &[u8],
        out: &mut Vec<u16>,
        mut on_malformed: impl FnMut(u64, usize) -> Result<Option<u16>>,
    ) -> Result<()> {
        let mut decoder = self.new_decoder();
        let mut buf = [0u16; CHUNK];
        let mut pos = 0;

        loop {
            let (result, read, written) =
                decoder.decode(&s[pos..], &mut buf, true);
            pos += read;
            out.extend_from_slice(&buf[..written]);

            match result {
                DecoderResult::Underflow => return Ok(()),
                DecoderResult::Overflow => (),
                DecoderResult::Malformed(length) => {
                    if let Some(replacement) =
                        on_malformed(pos as u64, length)?
                    {
                        out.push(replacement);
                    }
                }
            }
        }
    }
}
