//! Order analytics: sidebar filters, delivery factors and prediction
//!
//! Run with: cargo run --example order_analytics

use ledger_insight::aggregate::{AggregationSpec, Reduction};
use ledger_insight::filter::Predicate;
use ledger_insight::orchestrator::QueryOrchestrator;
use ledger_insight::schema::{catalog, RawRecord};
use ledger_insight::storage::{MemoryRecordStore, RecordStore};
use ledger_insight::telemetry;

const VEHICLES: [&str; 4] = ["motorcycle", "scooter", "van", "bicycle"];
const AREAS: [&str; 3] = ["Urban", "Metropolitian", "Semi-Urban"];
const TRAFFIC: [&str; 4] = ["Low", "Medium", "High", "Jam"];
const WEATHER: [&str; 3] = ["Sunny", "Cloudy", "Stormy"];

fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("info");
    println!("=== Advanced Order Analytics ===\n");

    let store = MemoryRecordStore::new(catalog::orders());
    let orchestrator = QueryOrchestrator::default();

    for i in 0..40_i64 {
        let idx = usize::try_from(i)?;
        let traffic = idx % 4;
        let rating = 3.0 + 0.05 * f64::from(u8::try_from(i % 40)?);
        orchestrator.ingest(
            &store,
            RawRecord::new()
                .set("Order_ID", format!("ORD-{i:04}"))
                .set("Agent_Age", 20 + i % 30)
                .set("Agent_Rating", rating)
                .set("Order_Date", format!("2024-03-{:02}", 1 + i % 28))
                .set("Order_Time", format!("{:02}:15:00", 8 + i % 12))
                .set("Weather", WEATHER[idx % 3])
                .set("Traffic", TRAFFIC[traffic])
                .set("Vehicle", VEHICLES[idx % 4])
                .set("Area", AREAS[idx % 3])
                .set("Delivery_Time", 60 - 8 * (i % 5) + 5 * i64::try_from(traffic)?),
        )?;
    }
    let data = store.load();

    // Sidebar: date range plus multi-selects
    let filtered = orchestrator
        .filter(
            &data,
            &[
                Predicate::range("Order_Date", "2024-03-05", "2024-03-20"),
                Predicate::in_set("Vehicle", ["motorcycle", "scooter", "van"]),
                Predicate::in_set("Area", AREAS),
            ],
        )?
        .found()
        .unwrap_or(data);
    println!("Filtered orders: {}", filtered.len());

    // Delivery Time Analysis
    if let Some(by_vehicle) = orchestrator
        .breakdown(&filtered, &AggregationSpec::mean_by("Vehicle", "Delivery_Time"))?
        .found()
    {
        println!("\nMean delivery time by vehicle:");
        for (key, minutes) in by_vehicle.iter() {
            println!("  {key:<16} {minutes:.1} min");
        }
    }

    // Order Trends Over Time
    if let Some(per_day) = orchestrator
        .breakdown(
            &filtered,
            &AggregationSpec::new(["Order_Date"], "Order_ID", Reduction::Count),
        )?
        .found()
    {
        println!("\nOrders per day: {} day(s) with orders", per_day.len());
    }

    // Peak Order Hours
    if let Some(hours) = orchestrator.orders_by_hour(&filtered, "Order_Time")?.found() {
        println!("\nOrders per hour:");
        for (hour, orders) in hours.iter() {
            println!("  {hour:<8} {orders}");
        }
    }
    let with_hour = filtered.with_hour_of("Order_Time")?;
    if let Some(matrix) = orchestrator
        .correlations(&with_hour, &["Order_Hour", "Agent_Rating", "Delivery_Time"])?
        .found()
    {
        if let Some(r) = matrix.get("Order_Hour", "Delivery_Time") {
            println!("Correlation of order hour with delivery time: {r:.3}");
        }
    }

    // Factors Affecting Delivery Time
    println!("\nFactors affecting delivery time:");
    for (factor, outcome) in
        orchestrator.factor_impacts(&filtered, &["Weather", "Traffic", "Area", "Vehicle"], "Delivery_Time")?
    {
        match outcome.found() {
            Some(table) => println!("  {factor}: {}", serde_json::to_string(&table)?),
            None => println!("  {factor}: no data"),
        }
    }

    // Predictive Analytics
    match orchestrator.predict_target(&filtered, &["Agent_Rating"], "Delivery_Time", &[4.5]) {
        Ok(outcome) => match outcome.found() {
            Some(p) => println!(
                "\nPredicted delivery time at rating 4.5: {:.1} min (trained on {} rows)",
                p.value,
                p.model.training_rows()
            ),
            None => println!("\nNot enough matching orders to predict"),
        },
        Err(e) => println!("\nPrediction failed: {e}"),
    }

    Ok(())
}
