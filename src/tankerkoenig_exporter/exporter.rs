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

use crate::client::{ClientError, StationApi};
use crate::metrics::ExporterMetrics;
use crate::registry::StationRegistry;
use crate::scrape::{self, Observation};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Fetches prices for a fixed set of stations whenever metrics are collected.
///
/// Collection is serialized: a caller that arrives while a scrape is running waits
/// for it to finish before running its own. The lock is held until the metrics have
/// been encoded so that each caller sees the results of exactly one scrape.
#[derive(Debug)]
pub struct Exporter<C> {
    client: Arc<C>,
    stations: StationRegistry,
    registry: Registry,
    metrics: ExporterMetrics,
    cycle: Mutex<()>,
}

impl<C: StationApi> Exporter<C> {
    pub fn new(client: Arc<C>, stations: StationRegistry) -> Self {
        let mut registry = Registry::default();
        let metrics = ExporterMetrics::new(&mut registry);

        Self {
            client,
            stations,
            registry,
            metrics,
            cycle: Mutex::new(()),
        }
    }

    pub fn stations(&self) -> &StationRegistry {
        &self.stations
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    /// Run a scrape and return its observations.
    ///
    /// Metrics are updated the same way as `collect()`. A failed scrape is returned
    /// to the caller in addition to being recorded.
    pub async fn scrape(&self) -> Result<Vec<Observation>, ClientError> {
        let _cycle = self.cycle.lock().await;
        self.run_cycle().await
    }

    /// Run a scrape and encode all metrics in the OpenMetrics text format.
    ///
    /// A failed scrape is logged and only visible through the `tk_up` and
    /// `tk_exporter_scrape_failures_total` metrics.
    pub async fn collect(&self) -> Result<String, fmt::Error> {
        let _cycle = self.cycle.lock().await;
        if let Err(e) = self.run_cycle().await {
            tracing::warn!(message = "cannot scrape tankerkoenig API", error = %e);
        }

        let mut buf = String::new();
        encode(&mut buf, &self.registry)?;
        Ok(buf)
    }

    // Must only be called while holding the cycle lock
    async fn run_cycle(&self) -> Result<Vec<Observation>, ClientError> {
        let start = Instant::now();
        self.metrics.start_scrape();

        let ids = self.stations.ids();
        let prices = match scrape::fetch_prices(&self.client, &ids).await {
            Ok(p) => p,
            Err(e) => {
                self.metrics.scrape_failed(start.elapsed());
                return Err(e);
            }
        };

        let observations = scrape::observations(&self.stations, &prices);
        for obs in observations.iter() {
            self.metrics.observe(obs);
        }

        self.metrics.scrape_succeeded(start.elapsed());
        tracing::debug!(
            message = "scraped tankerkoenig API",
            stations = prices.len(),
            observations = observations.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
        );

        Ok(observations)
    }
}
