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

use crate::client::{ClientError, Station, StationApi};
use crate::config::StationSelection;
use crate::geohash::{self, GeohashError};
use std::collections::BTreeMap;
use std::error;
use std::fmt;

#[derive(Debug)]
pub enum RegistryError {
    StationNotFound(String),
    InvalidLocation(String, GeohashError),
    RemoteLookup(ClientError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StationNotFound(id) => write!(f, "station {:?} was not found", id),
            Self::InvalidLocation(loc, e) => write!(f, "invalid location {:?}: {}", loc, e),
            Self::RemoteLookup(e) => write!(f, "could not retrieve stations: {}", e),
        }
    }
}

impl error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::InvalidLocation(_, e) => Some(e),
            Self::RemoteLookup(e) => Some(e),
            _ => None,
        }
    }
}

/// Stations monitored by the exporter, keyed by ID.
///
/// Built once at startup and never modified afterwards.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StationRegistry {
    stations: BTreeMap<String, Station>,
}

impl StationRegistry {
    /// Build a registry from a configured selection of stations.
    pub async fn load<C: StationApi>(client: &C, selection: &StationSelection) -> Result<Self, RegistryError> {
        match selection {
            StationSelection::Ids(ids) => Self::for_stations(client, ids).await,
            StationSelection::Location { geohash, radius_km } => Self::for_location(client, geohash, *radius_km).await,
        }
    }

    /// Look up the details of each station, failing on the first one that can't be found.
    pub async fn for_stations<C: StationApi>(client: &C, ids: &[String]) -> Result<Self, RegistryError> {
        let mut stations = BTreeMap::new();

        for id in ids {
            let station = client.detail(id).await.map_err(|e| match e {
                ClientError::InvalidStation(_) => RegistryError::StationNotFound(id.clone()),
                e => RegistryError::RemoteLookup(e),
            })?;

            tracing::debug!(message = "verified station", id = %id, name = %station.name);
            stations.insert(id.clone(), station);
        }

        Ok(Self { stations })
    }

    /// Use every station within `radius_km` of the center of the given geohash.
    pub async fn for_location<C: StationApi>(client: &C, location: &str, radius_km: u32) -> Result<Self, RegistryError> {
        let (lat, lng) =
            geohash::decode(location).map_err(|e| RegistryError::InvalidLocation(location.to_owned(), e))?;

        let stations: BTreeMap<String, Station> = client
            .list(lat, lng, radius_km)
            .await
            .map_err(RegistryError::RemoteLookup)?
            .into_iter()
            .filter(|s| {
                if s.id.is_empty() {
                    tracing::warn!(message = "skipping station without ID", name = %s.name);
                }
                !s.id.is_empty()
            })
            .map(|s| (s.id.clone(), s))
            .collect();

        if stations.is_empty() {
            tracing::warn!(message = "no stations found near location", location = %location, radius_km = radius_km);
        }

        Ok(Self { stations })
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    /// Station IDs in ascending order.
    pub fn ids(&self) -> Vec<String> {
        self.stations.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl FromIterator<Station> for StationRegistry {
    fn from_iter<T: IntoIterator<Item = Station>>(iter: T) -> Self {
        Self {
            stations: iter.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }
}
