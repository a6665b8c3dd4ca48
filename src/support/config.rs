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

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::codec::profile::Profile;
use crate::codec::registry;
use crate::support::error::{Error, Result};

/// What to do when the UTF-7 input of a decode is not canonical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedPolicy {
    /// Stop with an error.
    Fail,
    /// Substitute U+FFFD for each bad sequence and keep going.
    Replace,
}

impl Default for MalformedPolicy {
    fn default() -> Self {
        MalformedPolicy::Fail
    }
}

/// Defaults for the `utf7` command.
///
/// Every field may be omitted from the file, and anything given on the command
/// line takes precedence.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// The UTF-7 variant, by any name the registry knows.
    pub variant: String,

    /// The charset of the text side, as a WHATWG encoding label.
    ///
    /// Encoding reads text in this charset. Decoding writes text in its
    /// output encoding, which is UTF-8 for the UTF-16 labels.
    pub charset: String,

    /// How decoding treats malformed UTF-7.
    pub malformed: MalformedPolicy,

    /// The size of the chunks fed through the codec, in bytes.
    pub buffer_size: usize,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        TranscodeConfig {
            variant: "UTF-7".to_owned(),
            charset: "UTF-8".to_owned(),
            malformed: MalformedPolicy::Fail,
            buffer_size: 8192,
        }
    }
}

impl TranscodeConfig {
    /// Read the configuration from the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn profile(&self) -> Result<&'static Profile> {
        registry::resolve(&self.variant)
            .ok_or_else(|| Error::UnknownVariant(self.variant.clone()))
    }

    pub fn charset(&self) -> Result<&'static encoding_rs::Encoding> {
        encoding_rs::Encoding::for_label(self.charset.trim().as_bytes())
            .ok_or_else(|| Error::UnknownCharset(self.charset.clone()))
    }
}
