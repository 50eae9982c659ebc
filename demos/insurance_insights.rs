//! Insurance analytics: search, defaulters, summary and claim prediction
//!
//! Run with: cargo run --example insurance_insights

use ledger_insight::orchestrator::{PredictRequest, QueryOrchestrator, QueryOutcome};
use ledger_insight::schema::{catalog, RawRecord};
use ledger_insight::storage::{MemoryRecordStore, RecordStore};
use ledger_insight::telemetry;

fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("info,ledger_insight=debug");
    println!("=== Insurance Data Analytics ===\n");

    let store = MemoryRecordStore::new(catalog::insurance());
    let orchestrator = QueryOrchestrator::default();

    let policies = [
        ("Arjun Mehta", 34, "West", 2.1, 820.0, 1900.0, 0),
        ("Sara Khan", 52, "North", 6.4, 1640.0, 5200.0, 1),
        ("Vikram Rao", 47, "South", 4.9, 1310.0, 4100.0, 0),
        ("Leela Joseph", 29, "East", 1.2, 640.0, 1100.0, 0),
        ("Farhan Ali", 63, "North", 7.8, 1980.0, 6400.0, 1),
        ("Nisha Rao", 41, "West", 3.6, 1090.0, 3000.0, 0),
        ("Kabir Sen", 58, "South", 5.5, 1500.0, 4700.0, 1),
    ];
    for (name, age, region, risk, premium, claim, defaulter) in policies {
        orchestrator.ingest(
            &store,
            RawRecord::new()
                .set("Name", name)
                .set("Age", age)
                .set("Region", region)
                .set("Health_Risk_Score", risk)
                .set("Premium_Amount", premium)
                .set("Claim_Amount", claim)
                .set("Is_Defaulter", defaulter),
        )?;
    }
    let data = store.load();

    // Search Individual Analytics
    match orchestrator.lookup_by_identifier(&data, "rao")? {
        QueryOutcome::Found(hits) => {
            println!("Search 'rao': {} match(es)", hits.len());
            for record in hits.records() {
                println!("  - {}", serde_json::to_string(&record)?);
            }
        }
        other => println!("Search 'rao': {other:?}"),
    }

    // Defaulters
    if let Some(defaulters) = orchestrator.list_by_flag(&data, "Is_Defaulter", 1)?.found() {
        println!("\nDefaulters: {}", defaulters.len());
    }

    // Summary statistics
    if let Some(summary) = orchestrator.summarize(&data)?.found() {
        println!("\nSummary statistics:");
        for s in summary {
            println!(
                "  {:<18} count={} mean={:.2} min={:?} median={:?} max={:?}",
                s.field,
                s.count,
                s.mean.unwrap_or_default(),
                s.min,
                s.median,
                s.max
            );
        }
    }

    // Health Risk vs. Claim Amount
    if let Some(matrix) = orchestrator
        .correlations(&data, &["Health_Risk_Score", "Claim_Amount", "Premium_Amount"])?
        .found()
    {
        println!(
            "\nCorrelation(Health_Risk_Score, Claim_Amount) = {:.3}",
            matrix.get("Health_Risk_Score", "Claim_Amount").unwrap_or(f64::NAN)
        );
    }

    // Predictive Insights
    let request = PredictRequest::new(["Health_Risk_Score"], "Claim_Amount", vec![5.0]).with_fit();
    match orchestrator.predict(&data, &request) {
        Ok(QueryOutcome::Found(prediction)) => {
            println!("\nPredicted claim at risk score 5.0: {:.2}", prediction.value);
            if let Some(eval) = prediction.evaluation {
                println!("  held-out MSE: {:.2}, R²: {:?}", eval.mean_squared_error, eval.r_squared);
            }
        }
        Ok(other) => println!("\nPrediction unavailable: {other:?}"),
        Err(e) => println!("\nPrediction failed: {e}"),
    }

    Ok(())
}
