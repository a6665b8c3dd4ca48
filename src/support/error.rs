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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Base64 alphabet must have 64 characters, not {0}")]
    AlphabetLength(usize),
    #[error("Base64 alphabet repeats {0:?}")]
    AlphabetDuplicate(char),
    #[error("Base64 alphabet contains non-ASCII {0:?}")]
    AlphabetNotAscii(char),
    #[error("Unknown UTF-7 variant: {0}")]
    UnknownVariant(String),
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),
    #[error("Malformed UTF-7: {length} bad byte(s) ending near offset {position}")]
    Malformed { position: u64, length: usize },
    #[error("Input text is not valid {0}")]
    MalformedText(&'static str),
    #[error("{0:?} cannot be represented in the output charset")]
    Unmappable(char),
    #[error("Decoded text contains an unpaired surrogate")]
    UnpairedSurrogate,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            e => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}
