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

use lazy_static::lazy_static;

use super::alphabet::{self, Alphabet};
use super::decoder::Decoder;
use super::encoder::Encoder;

/// The character which ends a shift run explicitly in every variant.
pub const UNSHIFT: u8 = b'-';

/// RFC 2152 Set D: always directly encoded.
const SET_D: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789'(),-./:?";
/// RFC 2152 Set O: optionally directly encoded.
const SET_O: &[u8] = b"!\"#$%*;<=>@[]^_`{|}";
/// RFC 2152 rule 3: white space which is directly encoded.
const WHITE_SPACE: &[u8] = b" \t\r\n";

const fn mask_of(chars: &[u8]) -> u128 {
    let mut mask = 0u128;
    let mut i = 0;
    while i < chars.len() {
        mask |= 1u128 << chars[i];
        i += 1;
    }
    mask
}

const fn printable_except(shift: u8) -> u128 {
    let mut mask = 0u128;
    let mut ch = 0x20u8;
    while ch < 0x7F {
        if ch != shift {
            mask |= 1u128 << ch;
        }
        ch += 1;
    }
    mask
}

const RFC2152_DIRECT: u128 = mask_of(SET_D) | mask_of(WHITE_SPACE);
const RFC2152_OPTIONAL: u128 = mask_of(SET_O);
const IMAP_DIRECT: u128 = printable_except(b'&');
const IMAP_ACCEPTED: u128 = IMAP_DIRECT | mask_of(WHITE_SPACE);

/// How the encoder must treat a particular code unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    /// Written to the wire as its own byte.
    Direct,
    /// Must be carried inside a shift run.
    Shiftable,
}

/// A configuration of UTF-7.
///
/// All behavioural differences between the variants are captured here; the
/// encoder and decoder are written once in terms of these values.
#[derive(Debug)]
pub struct Profile {
    name: &'static str,
    aliases: &'static [&'static str],
    shift: u8,
    alphabet: Alphabet,
    optional_direct: bool,
    explicit_unshift: bool,
    // Bit N set means byte N is written literally by the encoder
    direct: u128,
    // Bit N set means byte N is accepted literally by the decoder
    accepted: u128,
}

lazy_static! {
    /// Standard UTF-7, as set by RFC 2152, with only Set D written directly.
    pub static ref UTF7: Profile = Profile {
        name: "UTF-7",
        aliases: &["UNICODE-1-1-UTF-7", "CSUNICODE11UTF7", "X-RFC2152", "X-RFC-2152"],
        shift: b'+',
        alphabet: Alphabet::build(alphabet::STANDARD)
            .expect("standard alphabet is invalid"),
        optional_direct: false,
        explicit_unshift: false,
        direct: RFC2152_DIRECT,
        accepted: RFC2152_DIRECT | RFC2152_OPTIONAL,
    };

    /// RFC 2152 UTF-7 which also writes the optional Set O directly.
    pub static ref UTF7_OPTIONAL: Profile = Profile {
        name: "X-UTF-7-OPTIONAL",
        aliases: &["X-RFC2152-OPTIONAL", "X-RFC-2152-OPTIONAL"],
        shift: b'+',
        alphabet: Alphabet::build(alphabet::STANDARD)
            .expect("standard alphabet is invalid"),
        optional_direct: true,
        explicit_unshift: false,
        direct: RFC2152_DIRECT | RFC2152_OPTIONAL,
        accepted: RFC2152_DIRECT | RFC2152_OPTIONAL,
    };

    /// IMAP's "modified UTF-7", as set by RFC 3501.
    pub static ref MODIFIED_UTF7: Profile = Profile {
        name: "X-MODIFIED-UTF-7",
        aliases: &[
            "X-IMAP-MODIFIED-UTF-7",
            "X-IMAP4-MODIFIED-UTF7",
            "X-IMAP4-MODIFIED-UTF-7",
            "X-RFC3501",
            "X-RFC-3501",
        ],
        shift: b'&',
        alphabet: Alphabet::build(alphabet::IMAP)
            .expect("IMAP alphabet is invalid"),
        optional_direct: false,
        explicit_unshift: true,
        direct: IMAP_DIRECT,
        accepted: IMAP_ACCEPTED,
    };
}

impl Profile {
    /// The canonical (upper-case) name of this variant.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    /// The character which starts a shift run.
    pub fn shift(&self) -> u8 {
        self.shift
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Whether RFC 2152 Set O is written directly.
    pub fn optional_direct(&self) -> bool {
        self.optional_direct
    }

    /// Whether every shift run must end with `-`.
    ///
    /// When false, any byte outside the alphabet (or the end of input) also
    /// ends a run.
    pub fn requires_explicit_unshift(&self) -> bool {
        self.explicit_unshift
    }

    /// Classify `unit` for encoding.
    ///
    /// The shift character is always `Shiftable`.
    #[inline]
    pub fn classify(&self, unit: u16) -> Class {
        if unit < 128 && 0 != (self.direct >> unit) & 1 {
            Class::Direct
        } else {
            Class::Shiftable
        }
    }

    /// Whether the decoder accepts `byte` outside a shift run.
    ///
    /// This is the direct set plus whatever other encoders are allowed to
    /// write literally: Set O for the RFC 2152 variants, and TAB, CR and LF
    /// for modified UTF-7.
    #[inline]
    pub fn accepts_direct(&self, byte: u8) -> bool {
        byte < 128 && 0 != (self.accepted >> byte) & 1
    }

    /// The largest number of bytes encoding `units` code units can produce,
    /// including closing the final run.
    pub fn max_utf7_buffer_length(&self, units: usize) -> Option<usize> {
        // Worst case is alternating direct and shifted units, which costs
        // five bytes per shifted unit once the run is closed.
        units.checked_mul(5)?.checked_add(2)
    }

    /// The largest number of code units decoding `bytes` bytes can produce.
    pub fn max_utf16_buffer_length(&self, bytes: usize) -> usize {
        bytes
    }

    /// Start a new encoding session.
    pub fn new_encoder(&self) -> Encoder<'_> {
        Encoder::new(self)
    }

    /// Start a new decoding session.
    pub fn new_decoder(&self) -> Decoder<'_> {
        Decoder::new(self)
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Profile {}
