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

use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tankerkoenig_exporter::client::{TankerkoenigClient, DEFAULT_API_URL};
use tankerkoenig_exporter::config::Config;
use tankerkoenig_exporter::exporter::Exporter;
use tankerkoenig_exporter::http::RequestState;
use tankerkoenig_exporter::registry::StationRegistry;
use tokio::signal::unix::{self, SignalKind};
use tracing::{Instrument, Level};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9386);
const DEFAULT_TIMEOUT_MILLIS: u64 = 15000;
const DEFAULT_RADIUS_KM: u32 = 10;
const DEFAULT_TELEMETRY_PATH: &str = "/metrics";

#[derive(Debug, Parser)]
#[clap(name = "tankerkoenig_exporter", version = clap::crate_version!())]
struct TankerkoenigExporterApplication {
    /// API key for the Tankerkoenig API
    #[clap(long, env = "TANKERKOENIG_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// ID of a station to fetch prices for. May be repeated or comma separated. Can't be
    /// used with --location
    #[clap(long = "station", value_delimiter = ',')]
    stations: Vec<String>,

    /// Geohash of a location to fetch prices for all stations near it. Can't be used
    /// with --station
    #[clap(long)]
    location: Option<String>,

    /// Radius around --location to find stations in, in kilometers
    #[clap(long, default_value_t = DEFAULT_RADIUS_KM)]
    radius: u32,

    /// Base URL for the Tankerkoenig API
    #[clap(long, default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// Timeout for each request to the Tankerkoenig API, in milliseconds
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Address to bind to. By default, tankerkoenig_exporter will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,

    /// Path to expose metrics at
    #[clap(long, default_value_t = DEFAULT_TELEMETRY_PATH.into())]
    telemetry_path: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = TankerkoenigExporterApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let config = Config::new(
        &opts.api_key,
        &opts.stations,
        opts.location.as_deref(),
        opts.radius,
        &opts.telemetry_path,
    )
    .unwrap_or_else(|e| {
        tracing::error!(message = "invalid configuration", error = %e);
        process::exit(1)
    });

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = TankerkoenigClient::new(http_client, &opts.api_url, &config.api_key).unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize API client", error = %e);
        process::exit(1)
    });

    // Resolve all stations before starting the HTTP server. This verifies that the stations
    // the user provided are valid and that the API is available before running indefinitely.
    let stations = StationRegistry::load(&client, &config.selection)
        .instrument(tracing::span!(Level::DEBUG, "tk_stations"))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(message = "failed to load stations", error = %e);
            process::exit(1)
        });

    tracing::info!(message = "loaded stations", api_url = %opts.api_url, num_stations = stations.len());

    let exporter = Arc::new(Exporter::new(Arc::new(client), stations));
    let state = Arc::new(RequestState {
        exporter,
        telemetry_path: config.telemetry_path.clone(),
    });
    let app = tankerkoenig_exporter::http::router(state);

    let server = axum::Server::try_bind(&opts.bind)
        .unwrap_or_else(|e| {
            tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
            process::exit(1)
        })
        .serve(app.into_make_service());

    tracing::info!(message = "server started", address = %server.local_addr(), telemetry_path = %config.telemetry_path);

    server
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
