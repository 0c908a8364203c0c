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

use std::error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingApiKey,
    MissingStations,
    ConflictingStations,
    InvalidRadius,
    InvalidTelemetryPath(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "missing API key, set --api-key or TANKERKOENIG_API_KEY"),
            Self::MissingStations => write!(f, "must specify one of --station or --location"),
            Self::ConflictingStations => write!(f, "--station can't be used with --location"),
            Self::InvalidRadius => write!(f, "--radius must be greater than zero"),
            Self::InvalidTelemetryPath(p) => write!(f, "invalid telemetry path {:?}", p),
        }
    }
}

impl error::Error for ConfigError {}

/// How the set of monitored stations is picked at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationSelection {
    /// Explicit list of station IDs
    Ids(Vec<String>),
    /// All stations within `radius_km` of a geohash
    Location { geohash: String, radius_km: u32 },
}

/// Validated startup configuration for the exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub selection: StationSelection,
    pub telemetry_path: String,
}

impl Config {
    /// Validate raw command line values.
    ///
    /// Exactly one of `stations` or `location` must be given. Blank station IDs are
    /// ignored so that values like `--station a,,b` work.
    pub fn new(
        api_key: &str,
        stations: &[String],
        location: Option<&str>,
        radius_km: u32,
        telemetry_path: &str,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        if !telemetry_path.starts_with('/') || telemetry_path == "/" {
            return Err(ConfigError::InvalidTelemetryPath(telemetry_path.to_owned()));
        }

        let ids: Vec<String> = stations
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        let location = location.map(str::trim).filter(|l| !l.is_empty());

        let selection = match (ids.is_empty(), location) {
            (false, Some(_)) => return Err(ConfigError::ConflictingStations),
            (false, None) => StationSelection::Ids(ids),
            (true, Some(_)) if radius_km == 0 => return Err(ConfigError::InvalidRadius),
            (true, Some(l)) => StationSelection::Location {
                geohash: l.to_owned(),
                radius_km,
            },
            (true, None) => return Err(ConfigError::MissingStations),
        };

        Ok(Config {
            api_key: api_key.to_owned(),
            selection,
            telemetry_path: telemetry_path.to_owned(),
        })
    }
}
