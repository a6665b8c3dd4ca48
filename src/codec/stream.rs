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

//! `std::io` adapters which put UTF-7 on one side of a byte stream and text in
//! any `encoding_rs` charset on the other.

use std::io::{self, Cursor, Read, Write};

use encoding_rs::Encoding;
use log::{debug, warn};

use super::decoder::{Decoder, DecoderResult};
use super::encoder::{CoderResult, Encoder};
use super::profile::Profile;
use crate::support::config::MalformedPolicy;
use crate::support::error::Error;

pub const DEFAULT_BUFFER_SIZE: usize = 8192;
// Enough for encoding_rs to always make progress
const MIN_BUFFER_SIZE: usize = 16;

/// Accepts text in some charset and writes it to the inner writer as UTF-7.
///
/// `finish()` must be called to close the final shift run; dropping the writer
/// without it may leave the output truncated.
pub struct EncodeWriter<'a, W> {
    inner: W,
    charset: &'static Encoding,
    text_decoder: encoding_rs::Decoder,
    encoder: Encoder<'a>,
    units: Vec<u16>,
    out: Vec<u8>,
}

impl<'a, W: Write> EncodeWriter<'a, W> {
    pub fn new(
        profile: &'a Profile,
        charset: &'static Encoding,
        inner: W,
    ) -> Self {
        EncodeWriter {
            inner,
            charset,
            text_decoder: charset.new_decoder_without_bom_handling(),
            encoder: profile.new_encoder(),
            units: vec![0; DEFAULT_BUFFER_SIZE],
            out: vec![0; DEFAULT_BUFFER_SIZE],
        }
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        let size = size.max(MIN_BUFFER_SIZE);
        self.units.resize(size, 0);
        self.out.resize(size, 0);
        self
    }

    /// Close any open shift run, flush, and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.transcode(&[], true)?;
        self.inner.flush()?;
        debug!(
            "Finished encoding {} as {}",
            self.charset.name(),
            self.encoder.profile().name()
        );
        Ok(self.inner)
    }

    fn transcode(&mut self, mut src: &[u8], last: bool) -> io::Result<()> {
        loop {
            let (result, read, written) = self
                .text_decoder
                .decode_to_utf16_without_replacement(src, &mut self.units, last);
            src = &src[read..];

            let input_empty = match result {
                encoding_rs::DecoderResult::InputEmpty => true,
                encoding_rs::DecoderResult::OutputFull => false,
                encoding_rs::DecoderResult::Malformed(..) => {
                    return Err(Error::MalformedText(self.charset.name()).into());
                }
            };

            self.encode_units(written, last && input_empty)?;
            if input_empty {
                return Ok(());
            }
        }
    }

    fn encode_units(&mut self, len: usize, last: bool) -> io::Result<()> {
        let mut src = &self.units[..len];
        loop {
            let (result, read, written) =
                self.encoder.encode(src, &mut self.out, last);
            src = &src[read..];
            self.inner.write_all(&self.out[..written])?;
            if CoderResult::Underflow == result {
                return Ok(());
            }
        }
    }
}

impl<W: Write> Write for EncodeWriter<'_, W> {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.transcode(src, false)?;
        Ok(src.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reads UTF-7 from the inner reader and yields text in the output encoding of
/// some charset.
pub struct DecodeReader<'a, R> {
    inner: R,
    decoder: Decoder<'a>,
    text_encoder: encoding_rs::Encoder,
    policy: MalformedPolicy,
    raw: Vec<u8>,
    // Decoded but not yet converted, possibly ending with a high surrogate
    units: Vec<u16>,
    buffer: Cursor<Vec<u8>>,
    position: u64,
    eof: bool,
    done: bool,
}

impl<'a, R: Read> DecodeReader<'a, R> {
    pub fn new(
        profile: &'a Profile,
        charset: &'static Encoding,
        policy: MalformedPolicy,
        inner: R,
    ) -> Self {
        DecodeReader {
            inner,
            decoder: profile.new_decoder(),
            text_encoder: charset.new_encoder(),
            policy,
            raw: vec![0; DEFAULT_BUFFER_SIZE],
            units: Vec::new(),
            buffer: Cursor::new(Vec::new()),
            position: 0,
            eof: false,
            done: false,
        }
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.raw.resize(size.max(MIN_BUFFER_SIZE), 0);
        self
    }

    /// Return the inner reader, discarding anything buffered.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Pull the next chunk from the inner reader through both codecs into
    /// `buffer`.
    fn fill(&mut self) -> io::Result<()> {
        let n = if self.eof {
            0
        } else {
            loop {
                match self.inner.read(&mut self.raw) {
                    Ok(n) => break n,
                    Err(e) if io::ErrorKind::Interrupted == e.kind() => (),
                    Err(e) => return Err(e),
                }
            }
        };
        if 0 == n {
            self.eof = true;
        }

        self.decode_raw(n)?;

        let ready = match self.units.last().copied() {
            Some(0xD800..=0xDBFF) if !self.eof => self.units.len() - 1,
            _ => self.units.len(),
        };
        self.encode_text(ready)?;
        self.units.drain(..ready);

        if self.eof {
            debug!(
                "Finished decoding {} bytes of {}",
                self.position,
                self.decoder.profile().name()
            );
            self.done = true;
        }
        Ok(())
    }

    fn decode_raw(&mut self, n: usize) -> io::Result<()> {
        let mut pos = 0;
        loop {
            let start = self.units.len();
            self.units.resize(start + (n - pos).max(1), 0);
            let (result, read, written) = self.decoder.decode(
                &self.raw[pos..n],
                &mut self.units[start..],
                self.eof,
            );
            self.units.truncate(start + written);
            pos += read;
            self.position += read as u64;

            match result {
                DecoderResult::Underflow => return Ok(()),
                DecoderResult::Overflow => (),
                DecoderResult::Malformed(length) => match self.policy {
                    MalformedPolicy::Fail => {
                        return Err(Error::Malformed {
                            position: self.position,
                            length,
                        }
                        .into());
                    }
                    MalformedPolicy::Replace => {
                        warn!(
                            "Replacing {} malformed byte(s) before offset {}",
                            length, self.position
                        );
                        self.units.push(0xFFFD);
                    }
                },
            }
        }
    }

    fn encode_text(&mut self, ready: usize) -> io::Result<()> {
        self.buffer.set_position(0);
        let out = self.buffer.get_mut();
        out.clear();

        let mut src = &self.units[..ready];
        loop {
            let room = self
                .text_encoder
                .max_buffer_length_from_utf16_without_replacement(src.len())
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Other, "Buffer size overflow")
                })?;
            let start = out.len();
            out.resize(start + room, 0);
            let (result, read, written) = self
                .text_encoder
                .encode_from_utf16_without_replacement(
                    src,
                    &mut out[start..],
                    self.eof,
                );
            out.truncate(start + written);
            src = &src[read..];

            match result {
                encoding_rs::EncoderResult::InputEmpty => return Ok(()),
                encoding_rs::EncoderResult::OutputFull => (),
                encoding_rs::EncoderResult::Unmappable(ch) => {
                    return Err(Error::Unmappable(ch).into());
                }
            }
        }
    }
}

impl<R: Read> Read for DecodeReader<'_, R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.buffer.read(dst)?;
            if n > 0 || dst.is_empty() || self.done {
                return Ok(n);
            }

            self.fill()?;
        }
    }
}
