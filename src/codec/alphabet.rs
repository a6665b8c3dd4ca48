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

use std::fmt;

use crate::support::error::{Error, Result};

/// The base64 alphabet of RFC 2152.
pub const STANDARD: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
/// The modified base64 alphabet of RFC 3501, which replaces `/` with `,`.
pub const IMAP: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+,";

const NONE: u8 = 0xFF;

/// A bijection between the sextets 0..63 and 64 distinct ASCII characters.
#[derive(Clone)]
pub struct Alphabet {
    chars: [u8; 64],
    values: [u8; 128],
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // The table is always ASCII
        write!(f, "Alphabet({:?})", String::from_utf8_lossy(&self.chars))
    }
}

impl Alphabet {
    /// Build an alphabet from its 64 characters, in sextet order.
    pub fn build(spec: &str) -> Result<Self> {
        let len = spec.chars().count();
        if 64 != len {
            return Err(Error::AlphabetLength(len));
        }

        let mut chars = [0u8; 64];
        let mut values = [NONE; 128];
        for (sextet, ch) in spec.chars().enumerate() {
            if !ch.is_ascii() {
                return Err(Error::AlphabetNotAscii(ch));
            }

            let byte = ch as u8;
            if NONE != values[usize::from(byte)] {
                return Err(Error::AlphabetDuplicate(ch));
            }

            values[usize::from(byte)] = sextet as u8;
            chars[sextet] = byte;
        }

        Ok(Alphabet { chars, values })
    }

    /// Return the sextet `byte` represents, if it is part of the alphabet.
    #[inline]
    pub fn value_of(&self, byte: u8) -> Option<u8> {
        match self.values.get(usize::from(byte)).copied() {
            None | Some(NONE) => None,
            Some(v) => Some(v),
        }
    }

    /// Return the character representing the low 6 bits of `sextet`.
    #[inline]
    pub fn char_of(&self, sextet: u8) -> u8 {
        self.chars[usize::from(sextet & 0x3F)]
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.value_of(byte).is_some()
    }
}
