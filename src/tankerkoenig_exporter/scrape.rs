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

use crate::client::{ClientError, Price, Product, StationApi, Status};
use crate::geohash;
use crate::registry::StationRegistry;
use crate::text;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

/// Maximum number of stations the API accepts in a single price request.
pub const BATCH_SIZE: usize = 10;

/// Merged prices of a single scrape, keyed by station ID.
pub type ScrapeResult = BTreeMap<String, Price>;

/// A single value to be exported, along with the labels that identify it.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Station metadata, always exported with a value of 1.
    Details {
        id: String,
        name: String,
        address: String,
        city: String,
        geohash: String,
        brand: String,
    },
    /// Whether the station is currently open.
    Open { id: String, open: bool },
    /// Price of a product in euro.
    Price { id: String, product: Product, value: f64 },
}

/// Split station IDs into consecutive batches of at most `BATCH_SIZE` IDs.
pub fn batches(ids: &[String]) -> Vec<Vec<String>> {
    ids.chunks(BATCH_SIZE).map(<[String]>::to_vec).collect()
}

/// Fetch prices for all `ids`, one concurrent task per batch.
///
/// Any failing batch fails the whole fetch: remaining batches are aborted and nothing
/// merged so far is returned. Prices for IDs that weren't part of a batch are ignored.
pub async fn fetch_prices<C: StationApi>(client: &Arc<C>, ids: &[String]) -> Result<ScrapeResult, ClientError> {
    let merged = Arc::new(Mutex::new(ScrapeResult::new()));
    let mut tasks = JoinSet::new();

    for batch in batches(ids) {
        let client = Arc::clone(client);
        let merged = Arc::clone(&merged);

        tasks.spawn(async move {
            let prices = client.prices(&batch).await?;
            let mut merged = merged.lock().unwrap_or_else(PoisonError::into_inner);
            for (id, price) in prices {
                if batch.contains(&id) {
                    merged.insert(id, price);
                }
            }

            Ok::<_, ClientError>(())
        });
    }

    while let Some(res) = tasks.join_next().await {
        let err = match res {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e,
            Err(e) => ClientError::Task(e),
        };

        tasks.abort_all();
        return Err(err);
    }

    let mut merged = merged.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(std::mem::take(&mut *merged))
}

/// Convert merged prices into observations, ordered by station ID.
///
/// Every station with a price gets a `Details` observation. Stations reporting
/// "no prices" get nothing else, all others get an `Open` observation and a `Price`
/// observation for each product that has a numeric price.
pub fn observations(stations: &StationRegistry, prices: &ScrapeResult) -> Vec<Observation> {
    let mut out = Vec::with_capacity(prices.len() * (2 + Product::ALL.len()));

    for (id, price) in prices {
        let station = match stations.get(id) {
            Some(s) => s,
            None => continue,
        };

        out.push(Observation::Details {
            id: id.clone(),
            name: station.name.clone(),
            address: text::address(&station.street, &station.house_number),
            city: text::title_case(&station.place),
            geohash: geohash::encode(station.lat, station.lng, geohash::PRECISION),
            brand: station.brand.clone(),
        });

        match &price.status {
            Status::NoPrices => {
                tracing::warn!(message = "station has no prices, skipping", id = %id, name = %station.name);
                continue;
            }
            Status::Other(s) => {
                tracing::debug!(message = "unknown station status, reporting as closed", id = %id, status = %s);
            }
            Status::Open | Status::Closed => {}
        }

        out.push(Observation::Open {
            id: id.clone(),
            open: price.status == Status::Open,
        });

        for product in Product::ALL {
            if let Some(value) = price.get(product) {
                out.push(Observation::Price {
                    id: id.clone(),
                    product,
                    value,
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{batches, fetch_prices, observations, Observation, ScrapeResult, BATCH_SIZE};
    use crate::client::{ClientError, FuelPrice, Price, Product, Status};
    use crate::mock::{no_prices, open_price, station, MockApi};
    use crate::registry::StationRegistry;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("station-{:03}", i)).collect()
    }

    #[test]
    fn test_batches_sizes() {
        for n in [0, 1, 9, 10, 11, 20, 23, 100] {
            let input = ids(n);
            let plan = batches(&input);

            assert_eq!((n + BATCH_SIZE - 1) / BATCH_SIZE, plan.len(), "batches for {}", n);
            assert!(plan.iter().all(|b| !b.is_empty() && b.len() <= BATCH_SIZE));
            assert_eq!(input, plan.concat());
        }
    }

    #[test]
    fn test_batches_23_stations() {
        let sizes: Vec<usize> = batches(&ids(23)).iter().map(Vec::len).collect();
        assert_eq!(vec![10, 10, 3], sizes);
    }

    #[tokio::test]
    async fn test_fetch_prices_all_batches() {
        let input = ids(23);
        let names: Vec<&str> = input.iter().map(String::as_str).collect();
        let api = Arc::new(MockApi::with_stations(&names));

        let prices = fetch_prices(&api, &input).await.unwrap();
        assert_eq!(23, prices.len());

        let dispatched = api.batches();
        assert_eq!(3, dispatched.len());
        let seen: HashSet<String> = dispatched.into_iter().flatten().collect();
        assert_eq!(input.into_iter().collect::<HashSet<_>>(), seen);
    }

    #[tokio::test]
    async fn test_fetch_prices_one_failing_batch() {
        let input = ids(25);
        let names: Vec<&str> = input.iter().map(String::as_str).collect();
        let api = Arc::new(MockApi::with_stations(&names).failing_batch_with("station-021"));

        let res = fetch_prices(&api, &input).await;
        assert!(matches!(res, Err(ClientError::Api(_))));
    }

    #[tokio::test]
    async fn test_fetch_prices_empty() {
        let api = Arc::new(MockApi::with_stations(&[]));
        let prices = fetch_prices(&api, &[]).await.unwrap();
        assert!(prices.is_empty());
        assert!(api.batches().is_empty());
    }

    #[test]
    fn test_observations_open_and_no_prices() {
        let registry: StationRegistry = vec![station("A"), station("B")].into_iter().collect();
        let mut prices = ScrapeResult::new();
        prices.insert("A".to_owned(), open_price(1.599));
        prices.insert("B".to_owned(), no_prices());

        let obs = observations(&registry, &prices);
        assert_eq!(
            vec![
                Observation::Details {
                    id: "A".to_owned(),
                    name: "Station A".to_owned(),
                    address: "Hauptstrasse 1".to_owned(),
                    city: "Berlin".to_owned(),
                    geohash: "u33dc0cppjs7".to_owned(),
                    brand: "ARAL".to_owned(),
                },
                Observation::Open {
                    id: "A".to_owned(),
                    open: true
                },
                Observation::Price {
                    id: "A".to_owned(),
                    product: Product::Diesel,
                    value: 1.599
                },
                Observation::Details {
                    id: "B".to_owned(),
                    name: "Station B".to_owned(),
                    address: "Hauptstrasse 1".to_owned(),
                    city: "Berlin".to_owned(),
                    geohash: "u33dc0cppjs7".to_owned(),
                    brand: "ARAL".to_owned(),
                },
            ],
            obs
        );
    }

    #[test]
    fn test_observations_closed_and_unknown_status() {
        let registry: StationRegistry = vec![station("A"), station("B")].into_iter().collect();
        let mut prices = ScrapeResult::new();
        prices.insert(
            "A".to_owned(),
            Price {
                status: Status::Closed,
                diesel: FuelPrice::Unavailable,
                e5: FuelPrice::Price(1.789),
                e10: FuelPrice::Price(1.729),
            },
        );
        prices.insert(
            "B".to_owned(),
            Price {
                status: Status::Other("maintenance".to_owned()),
                ..open_price(1.4)
            },
        );

        let obs = observations(&registry, &prices);
        let open: Vec<(&str, bool)> = obs
            .iter()
            .filter_map(|o| match o {
                Observation::Open { id, open } => Some((id.as_str(), *open)),
                _ => None,
            })
            .collect();
        let products: Vec<(&str, Product)> = obs
            .iter()
            .filter_map(|o| match o {
                Observation::Price { id, product, .. } => Some((id.as_str(), *product)),
                _ => None,
            })
            .collect();

        assert_eq!(vec![("A", false), ("B", false)], open);
        assert_eq!(
            vec![("A", Product::E5), ("A", Product::E10), ("B", Product::Diesel)],
            products
        );
    }

    #[test]
    fn test_observations_unknown_station_ignored() {
        let registry: StationRegistry = vec![station("A")].into_iter().collect();
        let mut prices = ScrapeResult::new();
        prices.insert("Z".to_owned(), open_price(1.0));

        assert!(observations(&registry, &prices).is_empty());
    }
}
