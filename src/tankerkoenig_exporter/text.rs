// tankerkoenig_exporter - Prometheus metrics exporter for the Tankerkoenig API
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! Cleanup of station metadata before it is used as label values.
//!
//! The API returns street and city names in whatever capitalization the station
//! operator reported, frequently all upper case.

/// Title case each word of `s` and trim surrounding whitespace.
///
/// A word starts after any character that isn't alphanumeric or an apostrophe, so
/// `"BAD SODEN-SALMÜNSTER"` becomes `"Bad Soden-Salmünster"` and `"MC DONALD'S"` becomes
/// `"Mc Donald's"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;

    for c in s.trim().chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }

        word_start = !(c.is_alphanumeric() || c == '\'' || c == '’');
    }

    out
}

/// Combine a street and house number into a display address.
pub fn address(street: &str, house_number: &str) -> String {
    let street = title_case(street);
    let number = house_number.trim();

    if number.is_empty() {
        street
    } else if street.is_empty() {
        number.to_owned()
    } else {
        format!("{} {}", street, number)
    }
}
