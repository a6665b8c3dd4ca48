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

//! The UTF-7 codec proper.
//!
//! `encoder` and `decoder` are the incremental engines, parameterised by one
//! of the `Profile`s in `profile`. Everything else is built on top of them.

pub mod alphabet;
pub mod decoder;
pub mod encoder;
pub mod profile;
pub mod registry;
pub mod stream;
pub mod string;

pub use self::decoder::{Decoder, DecoderResult};
pub use self::encoder::{CoderResult, Encoder};
pub use self::profile::{Class, Profile, MODIFIED_UTF7, UTF7, UTF7_OPTIONAL};
pub use self::registry::{resolve, variants};
pub use self::stream::{DecodeReader, EncodeWriter};
