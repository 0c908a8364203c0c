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

//! Base-32 geohash encoding and decoding.
//!
//! Station locations are configured as a geohash and station coordinates are
//! exported as a geohash label, so only the two basic operations are needed here.

use std::error;
use std::fmt;

/// Number of characters used when encoding station coordinates.
pub const PRECISION: usize = 12;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeohashError {
    Empty,
    InvalidCharacter(char),
}

impl fmt::Display for GeohashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty geohash"),
            Self::InvalidCharacter(c) => write!(f, "invalid geohash character {:?}", c),
        }
    }
}

impl error::Error for GeohashError {}

/// Encode a latitude and longitude as a geohash of `precision` characters.
pub fn encode(lat: f64, lng: f64, precision: usize) -> String {
    let mut lat_range = (-90.0, 90.0);
    let mut lng_range = (-180.0, 180.0);
    let mut out = String::with_capacity(precision);
    let mut even = true;
    let mut bit = 0;
    let mut idx = 0;

    while out.len() < precision {
        let (range, value) = if even {
            (&mut lng_range, lng)
        } else {
            (&mut lat_range, lat)
        };

        let mid = (range.0 + range.1) / 2.0;
        idx <<= 1;
        if value >= mid {
            idx |= 1;
            range.0 = mid;
        } else {
            range.1 = mid;
        }

        even = !even;
        bit += 1;
        if bit == 5 {
            out.push(BASE32[idx] as char);
            bit = 0;
            idx = 0;
        }
    }

    out
}

/// Decode a geohash into the latitude and longitude at the center of its cell.
pub fn decode(hash: &str) -> Result<(f64, f64), GeohashError> {
    if hash.is_empty() {
        return Err(GeohashError::Empty);
    }

    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lng_range = (-180.0_f64, 180.0_f64);
    let mut even = true;

    for c in hash.chars() {
        let idx = BASE32
            .iter()
            .position(|&b| b as char == c.to_ascii_lowercase())
            .ok_or(GeohashError::InvalidCharacter(c))?;

        for shift in (0..5).rev() {
            let range = if even { &mut lng_range } else { &mut lat_range };
            let mid = (range.0 + range.1) / 2.0;
            if (idx >> shift) & 1 == 1 {
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            even = !even;
        }
    }

    Ok(((lat_range.0 + lat_range.1) / 2.0, (lng_range.0 + lng_range.1) / 2.0))
}
