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

//! Prometheus metrics exporter for the Tankerkoenig fuel price API
//!
//! ## Features
//!
//! `tankerkoenig_exporter` fetches current fuel prices for a set of German fuel stations
//! using the [Tankerkoenig API] and emits them as Prometheus metrics. Prices are fetched
//! each time Prometheus scrapes the exporter, in batches of ten stations per API request.
//! The following metrics are emitted.
//!
//! * `tk_up` - Was the last scrape of the Tankerkoenig API successful.
//! * `tk_exporter_scrape_duration_seconds` - Duration of the last scrape of the API.
//! * `tk_exporter_scrapes_total` - Total number of scrapes of the API.
//! * `tk_exporter_scrape_failures_total` - Total number of failed scrapes of the API.
//! * `tk_exporter_build_info{version=$VERSION}` - Version of the exporter.
//! * `tk_station_price_euro{id=$ID, product=$PRODUCT}` - Price of `diesel`, `e5` or `e10` in euro.
//! * `tk_station_open{id=$ID}` - 1 if the station is open, 0 otherwise.
//! * `tk_station_details{id=$ID, name=$NAME, address=$ADDRESS, city=$CITY, geohash=$GEOHASH, brand=$BRAND}` -
//!   Station metadata, always 1.
//!
//! Stations that report "no prices" only emit `tk_station_details`. Products a station
//! doesn't sell are not emitted.
//!
//! [Tankerkoenig API]: https://creativecommons.tankerkoenig.de/
//!
//! ## Build
//!
//! `tankerkoenig_exporter` is a Rust program and must be built from source using a
//! [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! An API key is required and can be requested from the Tankerkoenig website. It can be
//! passed with `--api-key` or the `TANKERKOENIG_API_KEY` environment variable.
//!
//! Stations are picked either by ID or by location, but not both. To monitor specific
//! stations pass their IDs, either by repeating `--station` or separated by commas.
//!
//! ```text
//! ./tankerkoenig_exporter --station 51d4b55e-a095-1aa0-e100-80009459e03a
//! ```
//!
//! To monitor all stations near a location pass a geohash and a radius in kilometers.
//!
//! ```text
//! ./tankerkoenig_exporter --location u0yjjd6jk0zj7 --radius 3
//! ```
//!
//! ### Prometheus
//!
//! Prometheus metrics are exposed on port `9386` at `/metrics`. Every scrape results in
//! requests to the Tankerkoenig API so avoid short scrape intervals.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: tankerkoenig_exporter
//!   scrape_interval: 5m
//!   static_configs:
//!   - targets: ['example:9386']
//! ```
//!

pub mod client;
pub mod config;
pub mod exporter;
pub mod geohash;
pub mod http;
pub mod metrics;
#[cfg(test)]
mod mock;
pub mod registry;
pub mod scrape;
pub mod text;
