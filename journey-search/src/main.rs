use std::error::Error;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::info;
use tracing_subscriber::EnvFilter;

use journey_search::config::SearchConfig;
use journey_search::domain::{
    DateRange, LatLong, ServiceCalendar, StationId, TramTime, TransportMode,
};
use journey_search::graph::memory::TimetableGraphBuilder;
use journey_search::network::{TimetableBuilder, TransitData};
use journey_search::planner::{JourneyRequest, Location, RouteCalculator};
use journey_search::routes::{MatrixCache, MatrixCacheConfig, RouteToRouteCosts};

/// Where to keep the route interchange matrix between runs.
const CACHE_ENV: &str = "JOURNEY_MATRIX_CACHE";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    // journey-search [FROM] [TO] [HH:MM]
    let mut args = std::env::args().skip(1);
    let from = StationId::parse(&args.next().unwrap_or_else(|| "ALT".to_string()))?;
    let to = StationId::parse(&args.next().unwrap_or_else(|| "VIC".to_string()))?;
    let time = TramTime::parse_hhmm(&args.next().unwrap_or_else(|| "08:00".to_string()))?;
    let date = Local::now().date_naive();

    let data = Arc::new(demo_network(date)?);
    info!(
        stations = data.stations().count(),
        routes = data.routes().count(),
        "loaded network"
    );
    let graph = Arc::new(TimetableGraphBuilder::new(&data).build());

    let config = SearchConfig::default();
    let cache = std::env::var(CACHE_ENV)
        .ok()
        .map(|path| MatrixCache::new(MatrixCacheConfig::new(path)));
    let costs = Arc::new(RouteToRouteCosts::new(
        Arc::clone(&data),
        config.max_route_depth,
        cache.as_ref(),
    ));

    let calculator = RouteCalculator::new(graph, data, costs, config);

    let request = JourneyRequest::new(Location::Station(from), Location::Station(to.clone()), date, time)
        .with_max_changes(2);
    let response = calculator.calculate_parallel(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    // A walk from a street address to the same destination.
    let home = LatLong::new(53.4620, -2.2870)?;
    let request = JourneyRequest::new(Location::Position(home), Location::Station(to), date, time)
        .with_max_changes(2);
    let response = calculator.calculate(&request)?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

/// Two tram lines that cross at Cornbrook, running every ten minutes.
fn demo_network(date: NaiveDate) -> Result<TransitData, Box<dyn Error>> {
    let mut builder = TimetableBuilder::new();
    builder
        .station_at("ALT", "Altrincham", LatLong::new(53.3874, -2.3474)?)
        .station_at("TIM", "Timperley", LatLong::new(53.4046, -2.3384)?)
        .station_at("SAL", "Stretford", LatLong::new(53.4458, -2.3087)?)
        .station_at("COR", "Cornbrook", LatLong::new(53.4695, -2.2642)?)
        .station_at("DGT", "Deansgate-Castlefield", LatLong::new(53.4747, -2.2505)?)
        .station_at("VIC", "Victoria", LatLong::new(53.4878, -2.2427)?)
        .station_at("MRK", "Media City", LatLong::new(53.4725, -2.2977)?)
        .station_at("PMP", "Pomona", LatLong::new(53.4651, -2.2775)?)
        .route("GRN", "Altrincham - Victoria", TransportMode::Tram)
        .route("BLU", "Media City - Cornbrook", TransportMode::Tram)
        .service("GRN-D", "GRN", ServiceCalendar::daily(DateRange::single(date)))
        .service("BLU-D", "BLU", ServiceCalendar::daily(DateRange::single(date)));

    for i in 0..12u32 {
        let at = |offset: u32| -> Result<String, Box<dyn Error>> {
            let minutes = 7 * 60 + 30 + i * 10 + offset;
            Ok(TramTime::from_minutes(minutes)?.to_string())
        };
        let green = [
            ("ALT", at(0)?),
            ("TIM", at(3)?),
            ("SAL", at(10)?),
            ("COR", at(16)?),
            ("DGT", at(19)?),
            ("VIC", at(25)?),
        ];
        let blue = [("MRK", at(5)?), ("PMP", at(9)?), ("COR", at(12)?)];
        let green: Vec<(&str, &str)> = green.iter().map(|(s, t)| (*s, t.as_str())).collect();
        let blue: Vec<(&str, &str)> = blue.iter().map(|(s, t)| (*s, t.as_str())).collect();
        builder
            .trip(&format!("GRN-{i:02}"), "GRN-D", &green)
            .trip(&format!("BLU-{i:02}"), "BLU-D", &blue);
    }

    Ok(builder.build()?)
}
