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

//! Constants from `sysexits.h`
//!
//! Only the codes the `utf7` command can actually exit with are defined.

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Sysexit(pub i32);

pub const EX_USAGE: Sysexit = Sysexit(64);
pub const EX_DATAERR: Sysexit = Sysexit(65);
pub const EX_NOINPUT: Sysexit = Sysexit(66);
pub const EX_IOERR: Sysexit = Sysexit(74);
pub const EX_CONFIG: Sysexit = Sysexit(78);

impl Sysexit {
    pub fn exit(self) -> ! {
        std::process::exit(self.0)
    }

    /// Pick the exit code for an I/O error from the transcoding pipeline.
    ///
    /// The codec adapters report bad input as `InvalidData`; anything else is
    /// a genuine I/O failure.
    pub fn for_io_error(e: &std::io::Error) -> Self {
        if std::io::ErrorKind::InvalidData == e.kind() {
            EX_DATAERR
        } else {
            EX_IOERR
        }
    }
}
