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

//! The UTF-7 to UTF-16 half of the codec.
//!
//! Unlike the very permissive decoding typically applied to UTF-7, this
//! decoder only accepts the canonical form. In particular, a shift run must
//! use the shortest possible base64 representation of its code units with
//! zero padding bits, and two shift runs may not be directly adjacent. The
//! only slack is that some characters the encoder would shift may also appear
//! literally, such as Set O in RFC 2152 and line breaks in modified UTF-7.

use log::trace;

use super::profile::{Profile, UNSHIFT};

/// The outcome of a decoder call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderResult {
    /// All input was consumed; call again with more input, or with `last` set.
    Underflow,
    /// The output buffer is full; call again with more room.
    Overflow,
    /// The given number of bytes are not valid canonical UTF-7.
    ///
    /// The offending bytes have been consumed and the session is ready to
    /// continue with the rest of the input.
    Malformed(usize),
}

/// A UTF-7 decoding session.
#[derive(Clone, Debug)]
pub struct Decoder<'a> {
    profile: &'a Profile,
    shifted: bool,
    // Bits not yet emitted as a unit, right-aligned
    bits: u32,
    nbits: u32,
    // Sextets read and units emitted in the current run
    sextets: u64,
    units: u64,
    // Set when a non-empty run has just ended, so a shift character next
    // would split what should have been one run.
    just_closed: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(profile: &'a Profile) -> Self {
        Decoder {
            profile,
            shifted: false,
            bits: 0,
            nbits: 0,
            sextets: 0,
            units: 0,
            just_closed: false,
        }
    }

    pub fn profile(&self) -> &'a Profile {
        self.profile
    }

    /// Return to the initial state, discarding any partially decoded run.
    pub fn reset(&mut self) {
        *self = Decoder::new(self.profile);
    }

    /// Decode as much of `src` into `dst` as possible.
    ///
    /// `last` indicates that `src` is the end of the input; once all of it
    /// has been consumed, an open shift run is closed and validated.
    ///
    /// Returns the status and the number of bytes read and units written.
    /// Units decoded before a malformed sequence remain in `dst[..written]`.
    pub fn decode(
        &mut self,
        src: &[u8],
        dst: &mut [u16],
        last: bool,
    ) -> (DecoderResult, usize, usize) {
        let mut read = 0;
        let mut written = 0;

        while let Some(&byte) = src.get(read) {
            if self.shifted {
                if let Some(sextet) = self.profile.alphabet().value_of(byte) {
                    if self.nbits + 6 >= 16 && dst.len() == written {
                        return (DecoderResult::Overflow, read, written);
                    }

                    read += 1;
                    self.sextets += 1;
                    self.bits = (self.bits << 6) | u32::from(sextet);
                    self.nbits += 6;
                    if self.nbits >= 16 {
                        self.nbits -= 16;
                        dst[written] = (self.bits >> self.nbits) as u16;
                        written += 1;
                        self.units += 1;
                        self.bits &= (1 << self.nbits) - 1;
                    }
                } else if UNSHIFT == byte {
                    if 0 == self.sextets {
                        // The escape for a literal shift character
                        if dst.len() == written {
                            return (DecoderResult::Overflow, read, written);
                        }

                        read += 1;
                        dst[written] = self.profile.shift().into();
                        written += 1;
                        self.end_run();
                    } else {
                        read += 1;
                        if let Err(len) = self.close_run() {
                            return (DecoderResult::Malformed(len), read, written);
                        }
                    }
                } else {
                    // Implicit close. The byte itself is left for the direct
                    // branch.
                    if let Err(len) = self.close_run_implicitly() {
                        return (DecoderResult::Malformed(len), read, written);
                    }
                }
            } else if self.profile.shift() == byte {
                read += 1;
                self.start_run();
                if self.just_closed {
                    self.just_closed = false;
                    trace!("Shift run directly follows another run");
                    return (DecoderResult::Malformed(1), read, written);
                }
            } else if self.profile.accepts_direct(byte) {
                if dst.len() == written {
                    return (DecoderResult::Overflow, read, written);
                }

                read += 1;
                dst[written] = byte.into();
                written += 1;
                self.just_closed = false;
            } else {
                read += 1;
                self.just_closed = false;
                trace!("Byte {:#04x} may not appear directly", byte);
                return (DecoderResult::Malformed(1), read, written);
            }
        }

        if last && self.shifted {
            if let Err(len) = self.close_run_implicitly() {
                return (DecoderResult::Malformed(len), read, written);
            }
        }

        (DecoderResult::Underflow, read, written)
    }

    /// Finish decoding, validating any shift run still open.
    pub fn flush(&mut self, dst: &mut [u16]) -> (DecoderResult, usize) {
        let (result, _, written) = self.decode(&[], dst, true);
        (result, written)
    }

    fn start_run(&mut self) {
        self.shifted = true;
        self.bits = 0;
        self.nbits = 0;
        self.sextets = 0;
        self.units = 0;
    }

    fn end_run(&mut self) {
        self.shifted = false;
        self.bits = 0;
        self.nbits = 0;
        self.sextets = 0;
        self.units = 0;
    }

    /// Close the current run at something other than `-`.
    fn close_run_implicitly(&mut self) -> Result<(), usize> {
        if 0 == self.sextets {
            trace!("Empty shift run");
            self.end_run();
            self.just_closed = false;
            return Err(1);
        }

        if self.profile.requires_explicit_unshift() {
            trace!("Shift run not terminated by '-'");
            let len = self.sextets as usize;
            self.end_run();
            self.just_closed = false;
            return Err(len);
        }

        self.close_run()
    }

    /// Close a non-empty run, checking that it was minimal.
    fn close_run(&mut self) -> Result<(), usize> {
        let min_sextets = (self.units * 16 + 5) / 6;
        let canonical = self.sextets == min_sextets && 0 == self.bits;
        let len = self.sextets as usize;
        self.end_run();

        if canonical {
            self.just_closed = true;
            Ok(())
        } else {
            trace!(
                "Non-canonical shift run: {} sextets, expected {}",
                len,
                min_sextets
            );
            self.just_closed = false;
            Err(len)
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::super::profile::{MODIFIED_UTF7, UTF7, UTF7_OPTIONAL};
    use super::*;

    /// Decode `s` in one go, returning the decoded text and the final status.
    fn decode_all(profile: &Profile, s: &str) -> (String, DecoderResult) {
        let mut dst = vec![0u16; s.len() + 1];
        let mut decoder = profile.new_decoder();
        let (result, _, written) = decoder.decode(s.as_bytes(), &mut dst, true);
        (String::from_utf16(&dst[..written]).unwrap(), result)
    }

    fn decode_ok(profile: &Profile, s: &str) -> String {
        let (text, result) = decode_all(profile, s);
        assert_eq!(DecoderResult::Underflow, result, "decoding {:?}", s);
        text
    }

    fn assert_malformed(profile: &Profile, s: &str, text_before: &str) {
        let (text, result) = decode_all(profile, s);
        assert_eq!(text_before, text, "decoding {:?}", s);
        assert_matches!(DecoderResult::Malformed(_), result);
    }

    fn encode(profile: &Profile, src: &[u16]) -> Vec<u8> {
        let mut dst = vec![0u8; profile.max_utf7_buffer_length(src.len()).unwrap()];
        let (_, _, written) = profile.new_encoder().encode(src, &mut dst, true);
        dst.truncate(written);
        dst
    }

    /// Decode feeding `in_size` bytes per call into an output buffer of
    /// `out_size` units, as a network reader would.
    fn decode_chunked(
        profile: &Profile,
        src: &[u8],
        in_size: usize,
        out_size: usize,
    ) -> Vec<u16> {
        let mut decoder = profile.new_decoder();
        let mut out = Vec::new();
        let mut dst = vec![0u16; out_size];

        for chunk in src.chunks(in_size) {
            let mut pos = 0;
            loop {
                let (result, read, written) =
                    decoder.decode(&chunk[pos..], &mut dst, false);
                pos += read;
                out.extend_from_slice(&dst[..written]);
                match result {
                    DecoderResult::Underflow => break,
                    DecoderResult::Overflow => assert!(read > 0 || written > 0),
                    DecoderResult::Malformed(n) => {
                        panic!("Malformed({}) at {}", n, pos)
                    }
                }
            }
        }

        let (result, written) = decoder.flush(&mut dst);
        assert_eq!(DecoderResult::Underflow, result);
        out.extend_from_slice(&dst[..written]);
        out
    }

    #[test]
    fn empty() {
        for profile in &[&*UTF7, &*UTF7_OPTIONAL, &*MODIFIED_UTF7] {
            assert_eq!("", decode_ok(profile, ""));
        }
    }

    #[test]
    fn direct_text() {
        let direct = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz\
                      0123456789'(),-./:? \r\n\t";
        assert_eq!(direct, decode_ok(&UTF7, direct));
        let optional = "!\"#$%*;<=>@[]^_`{|}";
        assert_eq!(optional, decode_ok(&UTF7, optional));
        assert_eq!(optional, decode_ok(&UTF7_OPTIONAL, optional));
        assert_eq!(optional, decode_ok(&MODIFIED_UTF7, optional));
        assert_eq!("+\\~", decode_ok(&MODIFIED_UTF7, "+\\~"));
    }

    #[test]
    fn rfc2152_examples() {
        assert_eq!("Hi Mom \u{263A}!", decode_ok(&UTF7, "Hi Mom +Jjo-!"));
        assert_eq!("Hi Mom -\u{263A}-!", decode_ok(&UTF7, "Hi Mom -+Jjo--!"));
        assert_eq!("日本語", decode_ok(&UTF7, "+ZeVnLIqe-"));
        assert_eq!("Item 3 is £1.", decode_ok(&UTF7, "Item 3 is +AKM-1."));
        assert_eq!("~!@", decode_ok(&UTF7, "+AH4AIQBA-"));
        assert_eq!("A\u{2262}\u{0391}.", decode_ok(&UTF7, "A+ImIDkQ-."));
    }

    #[test]
    fn rfc3501_examples() {
        assert_eq!("A\u{2262}\u{0391}.", decode_ok(&MODIFIED_UTF7, "A&ImIDkQ-."));
        assert_eq!(
            "~peter/mail/台北/日本語",
            decode_ok(&MODIFIED_UTF7, "~peter/mail/&U,BTFw-/&ZeVnLIqe-")
        );
        assert_eq!(
            "\u{20AC}\u{E1}\u{E9}\u{FA}\u{ED}\u{F3}\u{FD}\u{E4}\u{EB}\u{EF}\u{F6}\u{FC}\u{FF}",
            decode_ok(&MODIFIED_UTF7, "&IKwA4QDpAPoA7QDzAP0A5ADrAO8A9gD8AP8-")
        );
        assert_eq!("\u{20AC}\u{E1}\u{E9}", decode_ok(&MODIFIED_UTF7, "&IKwA4QDp-"));
    }

    #[test]
    fn shift_escape() {
        assert_eq!("&", decode_ok(&MODIFIED_UTF7, "&-"));
        assert_eq!("&-", decode_ok(&MODIFIED_UTF7, "&--"));
        assert_eq!("&&", decode_ok(&MODIFIED_UTF7, "&-&-"));
        assert_eq!("+", decode_ok(&UTF7, "+-"));
        assert_eq!("+-", decode_ok(&UTF7, "+--"));
        assert_eq!("++", decode_ok(&UTF7, "+-+-"));
        // An escape is not a run, so a real run may follow it
        assert_eq!("+\u{E9}", decode_ok(&UTF7, "+-+AOk-"));
    }

    #[test]
    fn implicit_unshift() {
        assert_eq!("\u{20AC}\u{E1}\u{E9}", decode_ok(&UTF7, "+IKwA4QDp"));
        assert_eq!("#\u{E1}\u{E1}\u{E1}", decode_ok(&UTF7, "#+AOEA4QDh"));
        assert_eq!("\u{20AC}\u{E1}", decode_ok(&UTF7, "+IKwA4Q"));
        assert_eq!("\u{FF}\u{FF}\u{FF}#", decode_ok(&UTF7, "+AP8A/wD/#"));
        assert_eq!("\u{FF}\u{FF}#", decode_ok(&UTF7, "+AP8A/w#"));
        assert_eq!(
            "#\u{E1}\u{E1}#\u{E1}\u{E1}\u{E1}#",
            decode_ok(&UTF7, "#+AOEA4Q#+AOEA4QDh#")
        );
        assert_eq!(
            "\u{2262}\u{0391}123\u{2262}\u{0391}",
            decode_ok(&UTF7, "+ImIDkQ-123+ImIDkQ")
        );
        assert_eq!("A\u{2262}\u{0391}.", decode_ok(&UTF7, "A+ImIDkQ."));
    }

    #[test]
    fn imap_requires_explicit_unshift() {
        assert_malformed(&MODIFIED_UTF7, "&AOk.", "\u{E9}");
        assert_malformed(&MODIFIED_UTF7, "&IKwA4QDp", "\u{20AC}\u{E1}\u{E9}");
        assert_malformed(&MODIFIED_UTF7, "&IKwA4QDpA", "\u{20AC}\u{E1}\u{E9}");
        assert_malformed(&MODIFIED_UTF7, "&IKwA4QDpAP", "\u{20AC}\u{E1}\u{E9}");
    }

    #[test]
    fn non_minimal_runs() {
        assert_malformed(&MODIFIED_UTF7, "&a-", "");
        assert_malformed(&MODIFIED_UTF7, "&IKwA4QDpA-", "\u{20AC}\u{E1}\u{E9}");
        assert_malformed(&UTF7, "+IKwA-", "\u{20AC}");
        // Extra all-zero sextets
        assert_malformed(&UTF7, "+AOkA-", "\u{E9}");
        assert_malformed(&UTF7, "+AOkAA-", "\u{E9}");
        assert_malformed(
            &MODIFIED_UTF7,
            "&IKwA4QDpAPoA7QDzAP0A5ADrAO8A9gD8AP-",
            "\u{20AC}\u{E1}\u{E9}\u{FA}\u{ED}\u{F3}\u{FD}\u{E4}\u{EB}\u{EF}\u{F6}\u{FC}",
        );
    }

    #[test]
    fn nonzero_padding() {
        assert_malformed(&MODIFIED_UTF7, "ab&IKwD-", "ab\u{20AC}");
        assert_malformed(&UTF7, "+IKx#", "\u{20AC}");
        assert_malformed(&UTF7, "+IKx-", "\u{20AC}");
        assert_malformed(&UTF7, "+IKwA4#", "\u{20AC}");
        assert_malformed(&UTF7, "+IKwA#", "\u{20AC}");
        // 'l' carries bits past the end of the unit
        assert_malformed(&UTF7, "+AOl-", "\u{E9}");
    }

    #[test]
    fn adjacent_runs() {
        assert_malformed(&MODIFIED_UTF7, "&ImIDkQ-&ImIDkQ-", "\u{2262}\u{0391}");
        assert_malformed(&UTF7, "+ImIDkQ-+ImIDkQ-", "\u{2262}\u{0391}");
        assert_eq!(
            "\u{2262}\u{0391}a\u{2262}\u{0391}",
            decode_ok(&MODIFIED_UTF7, "&ImIDkQ-a&ImIDkQ-")
        );
    }

    #[test]
    fn empty_runs() {
        assert_malformed(&MODIFIED_UTF7, "&[-", "");
        assert_malformed(&MODIFIED_UTF7, "&&ImIDkQ-", "");
        assert_malformed(&UTF7, "+!", "");
        assert_malformed(&UTF7, "a+", "a");
        assert_malformed(&MODIFIED_UTF7, "&", "");
    }

    #[test]
    fn imap_accepts_line_breaks() {
        let text = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz\
                    0123456789'(),-./:?\r\n";
        assert_eq!(text, decode_ok(&MODIFIED_UTF7, text));
        assert_eq!(
            "a\tb\u{263A}\r\n",
            decode_ok(&MODIFIED_UTF7, "a\tb&Jjo-\r\n")
        );
    }

    #[test]
    fn undirect_bytes() {
        assert_malformed(&UTF7, "ab~", "ab");
        assert_malformed(&UTF7, "a\\", "a");
        assert_malformed(&UTF7, "\0", "");
        assert_malformed(&MODIFIED_UTF7, "caf\u{E9}", "caf");
    }

    #[test]
    fn malformed_spans() {
        let mut dst = [0u16; 16];

        let mut decoder = MODIFIED_UTF7.new_decoder();
        assert_eq!(
            (DecoderResult::Malformed(1), 3, 0),
            decoder.decode(b"&a-", &mut dst, true)
        );

        let mut decoder = MODIFIED_UTF7.new_decoder();
        assert_eq!(
            (DecoderResult::Malformed(1), 1, 0),
            decoder.decode(b"&", &mut dst, true)
        );

        // The whole run is blamed, including what was already emitted
        let mut decoder = UTF7.new_decoder();
        assert_eq!(
            (DecoderResult::Malformed(9), 11, 3),
            decoder.decode(b"+IKwA4QDpA-x", &mut dst, true)
        );
        // and the session carries on afterwards
        assert_eq!(
            (DecoderResult::Underflow, 1, 1),
            decoder.decode(b"x", &mut dst, true)
        );

        // An implicit close leaves its terminator for the next call
        let mut decoder = UTF7.new_decoder();
        assert_eq!(
            (DecoderResult::Malformed(2), 3, 0),
            decoder.decode(b"+IK.", &mut dst, false)
        );
        assert_eq!(
            (DecoderResult::Underflow, 1, 1),
            decoder.decode(b".", &mut dst, true)
        );
        assert_eq!(u16::from(b'.'), dst[0]);
    }

    #[test]
    fn malformed_is_reproducible() {
        let mut dst = [0u16; 16];
        let mut decoder = UTF7.new_decoder();
        let first = decoder.decode(b"a+IKwA-b", &mut dst, true);
        decoder.reset();
        let second = decoder.decode(b"a+IKwA-b", &mut dst, true);
        assert_eq!(first, second);
        assert_eq!((DecoderResult::Malformed(4), 7, 2), first);
    }

    #[test]
    fn end_of_input_in_separate_call() {
        let mut dst = [0u16; 4];
        let mut decoder = MODIFIED_UTF7.new_decoder();
        assert_eq!(
            (DecoderResult::Underflow, 1, 0),
            decoder.decode(b"&", &mut dst, false)
        );
        assert_eq!((DecoderResult::Malformed(1), 0), decoder.flush(&mut dst));

        decoder.reset();
        assert_eq!(
            (DecoderResult::Underflow, 3, 0),
            decoder.decode(b"&AO", &mut dst, false)
        );
        // The length counts the sextets of the unterminated run
        assert_eq!((DecoderResult::Malformed(2), 0), decoder.flush(&mut dst));

        let mut decoder = UTF7.new_decoder();
        assert_eq!(
            (DecoderResult::Underflow, 7, 2),
            decoder.decode(b"+IKwA4Q", &mut dst, false)
        );
        assert_eq!((DecoderResult::Underflow, 0), decoder.flush(&mut dst));
    }

    #[test]
    fn limited_output() {
        let mut decoder = MODIFIED_UTF7.new_decoder();
        let mut dst = [0u16; 4];
        assert_eq!(
            (DecoderResult::Underflow, 10, 4),
            decoder.decode(b"A&ImIDkQ-.", &mut dst, true)
        );
        assert_eq!(
            "A\u{2262}\u{0391}.",
            String::from_utf16(&dst).unwrap()
        );

        let mut decoder = UTF7.new_decoder();
        let mut dst = [0u16; 2];
        assert_eq!(
            (DecoderResult::Overflow, 8, 2),
            decoder.decode(b"+IKwA4QDp-", &mut dst, true)
        );
        assert_eq!(
            (DecoderResult::Underflow, 2, 1),
            decoder.decode(b"p-", &mut dst, true)
        );
        assert_eq!(0xE9, dst[0]);

        // The escaped shift character also needs room
        let mut decoder = UTF7.new_decoder();
        assert_eq!(
            (DecoderResult::Overflow, 1, 0),
            decoder.decode(b"+-", &mut [], true)
        );
    }

    #[test]
    fn surrogates_are_opaque() {
        let mut dst = [0u16; 4];
        let mut decoder = UTF7.new_decoder();
        assert_eq!(
            (DecoderResult::Underflow, 5, 1),
            decoder.decode(b"+2AA-", &mut dst, true)
        );
        assert_eq!(0xD800, dst[0]);
    }

    #[test]
    fn chunked_matches_whole() {
        let text = "\u{E1}+\u{E9}\u{ED}+\u{F3}\u{FA}\u{E4}+\u{EB}\u{EF}\u{F6}++\
                    \u{FC}++\u{E0}\u{E8}++\u{EC}\u{F2}\u{F9}+++\u{E2}+++\u{EA}\
                    \u{EE}+++\u{F4}\u{FB}\u{E3}+++\u{F5}\u{E7}\u{F1}\u{20AC}\
                    `~!@#$%^&*()_+-=[]\\{}|;':\",./<>?\u{0}\r\n\t\u{8}\u{C}";
        let units: Vec<u16> = text.encode_utf16().collect();
        for profile in &[&*UTF7, &*UTF7_OPTIONAL, &*MODIFIED_UTF7] {
            let encoded = encode(profile, &units);
            for in_size in 1..8 {
                for out_size in 1..8 {
                    assert_eq!(
                        units,
                        decode_chunked(profile, &encoded, in_size, out_size),
                        "in {}, out {}",
                        in_size,
                        out_size
                    );
                }
            }
        }
    }

    proptest! {
        #[test]
        fn round_trip(src in prop::collection::vec(any::<u16>(), 0..64)) {
            for profile in &[&*UTF7, &*UTF7_OPTIONAL, &*MODIFIED_UTF7] {
                let encoded = encode(profile, &src);
                let mut dst = vec![0u16; encoded.len()];
                let (result, read, written) =
                    profile.new_decoder().decode(&encoded, &mut dst, true);
                prop_assert_eq!(DecoderResult::Underflow, result);
                prop_assert_eq!(encoded.len(), read);
                prop_assert_eq!(&src[..], &dst[..written]);
            }
        }

        #[test]
        fn chunking_is_idempotent(
            s in ".{0,32}",
            in_size in 1usize..6,
            out_size in 1usize..6,
        ) {
            let units: Vec<u16> = s.encode_utf16().collect();
            for profile in &[&*UTF7, &*UTF7_OPTIONAL, &*MODIFIED_UTF7] {
                let encoded = encode(profile, &units);
                prop_assert_eq!(
                    &units,
                    &decode_chunked(profile, &encoded, in_size, out_size)
                );
            }
        }

        #[test]
        fn padded_runs_rejected(
            src in prop::collection::vec(0x80u16..=0xFFFF, 1..16),
        ) {
            let encoded = encode(&UTF7, &src);
            // Insert a zero sextet before the closing '-'
            let mut padded = encoded[..encoded.len() - 1].to_vec();
            padded.push(b'A');
            padded.push(b'-');

            let mut dst = vec![0u16; padded.len()];
            let (result, _, _) =
                UTF7.new_decoder().decode(&padded, &mut dst, true);
            prop_assert!(matches!(result, DecoderResult::Malformed(_)));
        }

        #[test]
        fn decoding_never_panics(src in prop::collection::vec(any::<u8>(), 0..64)) {
            for profile in &[&*UTF7, &*UTF7_OPTIONAL, &*MODIFIED_UTF7] {
                let mut decoder = profile.new_decoder();
                let mut dst = vec![0u16; 4];
                let mut pos = 0;
                loop {
                    let (result, read, _) =
                        decoder.decode(&src[pos..], &mut dst, true);
                    pos += read;
                    if DecoderResult::Underflow == result {
                        break;
                    }
                }
                prop_assert_eq!(src.len(), pos);
            }
        }
    }
}
