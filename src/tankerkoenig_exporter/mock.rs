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

//! In-memory `StationApi` for tests.

use crate::client::{ClientError, FuelPrice, Price, Station, StationApi, Status};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A station with upper case metadata, the way the API usually returns it.
pub fn station(id: &str) -> Station {
    Station {
        id: id.to_owned(),
        name: format!("Station {}", id),
        brand: "ARAL".to_owned(),
        street: "HAUPTSTRASSE".to_owned(),
        house_number: "1".to_owned(),
        place: "BERLIN".to_owned(),
        lat: 52.52,
        lng: 13.405,
    }
}

pub fn open_price(diesel: f64) -> Price {
    Price {
        status: Status::Open,
        diesel: FuelPrice::Price(diesel),
        e5: FuelPrice::Unavailable,
        e10: FuelPrice::Unavailable,
    }
}

pub fn no_prices() -> Price {
    Price {
        status: Status::NoPrices,
        diesel: FuelPrice::Unavailable,
        e5: FuelPrice::Unavailable,
        e10: FuelPrice::Unavailable,
    }
}

#[derive(Debug, Default)]
pub struct MockApi {
    stations: BTreeMap<String, Station>,
    prices: HashMap<String, Price>,
    failing_ids: HashSet<String>,
    fail_all: bool,
    detail_calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
    last_list: Mutex<Option<(f64, f64, u32)>>,
}

impl MockApi {
    /// Known stations, each priced as open with diesel at 1.5
    pub fn with_stations(ids: &[&str]) -> Self {
        let stations = ids.iter().map(|id| (id.to_string(), station(id))).collect();
        let prices = ids.iter().map(|id| (id.to_string(), open_price(1.5))).collect();

        Self {
            stations,
            prices,
            ..Default::default()
        }
    }

    pub fn with_price(mut self, id: &str, price: Price) -> Self {
        self.prices.insert(id.to_owned(), price);
        self
    }

    pub fn without_price(mut self, id: &str) -> Self {
        self.prices.remove(id);
        self
    }

    /// Any price batch containing `id` fails
    pub fn failing_batch_with(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_owned());
        self
    }

    pub fn failing_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn last_list(&self) -> Option<(f64, f64, u32)> {
        *self.last_list.lock().unwrap()
    }

    fn unavailable(&self) -> ClientError {
        ClientError::Api("mock API unavailable".to_owned())
    }
}

impl StationApi for MockApi {
    async fn detail(&self, id: &str) -> Result<Station, ClientError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(self.unavailable());
        }

        self.stations
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::InvalidStation(id.to_owned()))
    }

    async fn list(&self, lat: f64, lng: f64, radius_km: u32) -> Result<Vec<Station>, ClientError> {
        *self.last_list.lock().unwrap() = Some((lat, lng, radius_km));
        if self.fail_all {
            return Err(self.unavailable());
        }

        Ok(self.stations.values().cloned().collect())
    }

    async fn prices(&self, ids: &[String]) -> Result<HashMap<String, Price>, ClientError> {
        self.batches.lock().unwrap().push(ids.to_vec());
        tokio::task::yield_now().await;

        if self.fail_all || ids.iter().any(|id| self.failing_ids.contains(id)) {
            return Err(self.unavailable());
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.prices.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }
}
