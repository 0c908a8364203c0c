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

use crate::scrape::Observation;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

const NAMESPACE: &str = "tk";

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct BuildLabels {
    version: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct PriceLabels {
    id: String,
    product: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OpenLabels {
    id: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct DetailsLabels {
    id: String,
    name: String,
    address: String,
    city: String,
    geohash: String,
    brand: String,
}

/// Holder for exporter health metrics and per-station metrics.
///
/// All metrics are created and registered upon call to `ExporterMetrics::new()` and
/// share the prefix "tk_". Health metrics (`tk_up` and `tk_exporter_*`) live for the
/// life of the process. Station metrics (`tk_station_*`) are replaced on every scrape.
#[derive(Debug)]
pub struct ExporterMetrics {
    up: Gauge,
    scrape_duration: Gauge<f64, AtomicU64>,
    scrapes: Counter,
    scrape_failures: Counter,
    price: Family<PriceLabels, Gauge<f64, AtomicU64>>,
    open: Family<OpenLabels, Gauge>,
    details: Family<DetailsLabels, Gauge>,
}

impl ExporterMetrics {
    /// Create a new `ExporterMetrics` and register each metric with a "tk" prefixed
    /// sub-registry of the provided `Registry`.
    pub fn new(reg: &mut Registry) -> Self {
        let up = Gauge::default();
        let scrape_duration = Gauge::<f64, AtomicU64>::default();
        let scrapes = Counter::default();
        let scrape_failures = Counter::default();
        let build_info = Family::<BuildLabels, Gauge>::default();
        let price = Family::<PriceLabels, Gauge<f64, AtomicU64>>::default();
        let open = Family::<OpenLabels, Gauge>::default();
        let details = Family::<DetailsLabels, Gauge>::default();

        build_info
            .get_or_create(&BuildLabels {
                version: env!("CARGO_PKG_VERSION").to_owned(),
            })
            .set(1);

        let tk = reg.sub_registry_with_prefix(NAMESPACE);
        tk.register("up", "Was the last scrape of the Tankerkoenig API successful", up.clone());

        let exporter = tk.sub_registry_with_prefix("exporter");
        exporter.register(
            "scrape_duration_seconds",
            "Duration of the scrape of metrics from the Tankerkoenig API",
            scrape_duration.clone(),
        );
        exporter.register("scrapes", "Total Tankerkoenig API scrapes", scrapes.clone());
        exporter.register("scrape_failures", "Total amount of scrape failures", scrape_failures.clone());
        exporter.register("build_info", "Version of the exporter, always 1", build_info);

        let station = tk.sub_registry_with_prefix("station");
        station.register("price_euro", "Fuel prices in euro", price.clone());
        station.register("open", "Status of the station, 1 for open and 0 for closed", open.clone());
        station.register("details", "Associated details of a station, always 1", details.clone());

        Self {
            up,
            scrape_duration,
            scrapes,
            scrape_failures,
            price,
            open,
            details,
        }
    }

    /// Record the start of a scrape and remove all station metrics from the previous one.
    pub fn start_scrape(&self) {
        self.scrapes.inc();
        self.price.clear();
        self.open.clear();
        self.details.clear();
    }

    pub fn scrape_succeeded(&self, elapsed: Duration) {
        self.up.set(1);
        self.scrape_duration.set(elapsed.as_secs_f64());
    }

    pub fn scrape_failed(&self, elapsed: Duration) {
        self.up.set(0);
        self.scrape_failures.inc();
        self.scrape_duration.set(elapsed.as_secs_f64());
    }

    /// Set the station metric for a single observation.
    pub fn observe(&self, obs: &Observation) {
        match obs {
            Observation::Details {
                id,
                name,
                address,
                city,
                geohash,
                brand,
            } => {
                self.details
                    .get_or_create(&DetailsLabels {
                        id: id.clone(),
                        name: name.clone(),
                        address: address.clone(),
                        city: city.clone(),
                        geohash: geohash.clone(),
                        brand: brand.clone(),
                    })
                    .set(1);
            }
            Observation::Open { id, open } => {
                self.open.get_or_create(&OpenLabels { id: id.clone() }).set(i64::from(*open));
            }
            Observation::Price { id, product, value } => {
                self.price
                    .get_or_create(&PriceLabels {
                        id: id.clone(),
                        product: product.as_str().to_owned(),
                    })
                    .set(*value);
            }
        }
    }

    pub fn up(&self) -> i64 {
        self.up.get()
    }

    pub fn scrapes(&self) -> u64 {
        self.scrapes.get()
    }

    pub fn scrape_failures(&self) -> u64 {
        self.scrape_failures.get()
    }
}

#[cfg(test)]
mod tests {
    use super::ExporterMetrics;
    use crate::client::Product;
    use crate::scrape::Observation;
    use prometheus_client::encoding::text::encode;
    use prometheus_client::registry::Registry;
    use std::time::Duration;

    fn render(reg: &Registry) -> String {
        let mut buf = String::new();
        encode(&mut buf, reg).unwrap();
        buf
    }

    #[test]
    fn test_metric_names() {
        let mut reg = Registry::default();
        let metrics = ExporterMetrics::new(&mut reg);
        metrics.start_scrape();
        metrics.scrape_succeeded(Duration::from_millis(250));
        metrics.observe(&Observation::Open {
            id: "a".to_owned(),
            open: true,
        });
        metrics.observe(&Observation::Price {
            id: "a".to_owned(),
            product: Product::E10,
            value: 1.5,
        });

        let text = render(&reg);
        assert!(text.contains("tk_up 1\n"), "{}", text);
        assert!(text.contains("tk_exporter_scrapes_total 1\n"), "{}", text);
        assert!(text.contains("tk_exporter_scrape_failures_total 0\n"), "{}", text);
        assert!(text.contains("tk_exporter_scrape_duration_seconds 0.25\n"), "{}", text);
        assert!(text.contains("tk_exporter_build_info{version=\""), "{}", text);
        assert!(text.contains("tk_station_open{id=\"a\"} 1\n"), "{}", text);
        assert!(text.contains("tk_station_price_euro{id=\"a\",product=\"e10\"} 1.5\n"), "{}", text);
    }

    #[test]
    fn test_start_scrape_clears_stations() {
        let mut reg = Registry::default();
        let metrics = ExporterMetrics::new(&mut reg);
        metrics.start_scrape();
        metrics.observe(&Observation::Open {
            id: "a".to_owned(),
            open: false,
        });
        metrics.start_scrape();
        metrics.scrape_failed(Duration::from_secs(1));

        let text = render(&reg);
        assert!(!text.contains("tk_station_open{"), "{}", text);
        assert_eq!(0, metrics.up());
        assert_eq!(2, metrics.scrapes());
        assert_eq!(1, metrics.scrape_failures());
    }
}
