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

//! Lookup of UTF-7 variants by charset name.

use super::profile::{Profile, MODIFIED_UTF7, UTF7, UTF7_OPTIONAL};

/// All supported variants, in a stable order.
pub fn variants() -> [&'static Profile; 3] {
    [&*UTF7, &*UTF7_OPTIONAL, &*MODIFIED_UTF7]
}

/// Find the variant called `name`, either by its canonical name or an alias.
///
/// Names are compared case-insensitively over ASCII only, so the result does
/// not depend on the locale.
pub fn resolve(name: &str) -> Option<&'static Profile> {
    let name = name.trim();
    let variants = variants();

    variants
        .iter()
        .copied()
        .find(|p| p.name().eq_ignore_ascii_case(name))
        .or_else(|| {
            variants.iter().copied().find(|p| {
                p.aliases().iter().any(|a| a.eq_ignore_ascii_case(name))
            })
        })
}
