//! Banking dashboard: add customers, then the insight and analysis tabs
//!
//! This demo shows:
//! - Form input (plain strings) validated against the banking schema
//! - Durable CSV store under a scratch data directory
//! - Account type breakdown, rating distribution, region × frequency table
//!
//! Run with: cargo run --example banking_dashboard

use anyhow::Context;
use ledger_insight::aggregate::{AggregationSpec, Reduction};
use ledger_insight::config::PipelineConfig;
use ledger_insight::orchestrator::{QueryOrchestrator, QueryOutcome};
use ledger_insight::schema::{catalog, RawRecord};
use ledger_insight::storage::{CsvRecordStore, RecordStore};
use ledger_insight::telemetry;

fn print_table<T: std::fmt::Debug>(title: &str, outcome: &QueryOutcome<T>) {
    match outcome {
        QueryOutcome::Found(value) => println!("{title}:\n  {value:?}"),
        QueryOutcome::NoDataMatched => println!("{title}: no data available"),
        QueryOutcome::FeatureUnavailable { missing } => {
            println!("{title}: unavailable (missing {})", missing.join(", "));
        }
    }
}

fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("info");
    println!("=== Banking Services Dashboard ===\n");

    let dir = tempfile::tempdir()?;
    let config = PipelineConfig::default().with_data_dir(dir.path());
    let store = CsvRecordStore::open(config.store_path("banking"), catalog::banking());
    let orchestrator = QueryOrchestrator::from_config(&config)?;

    // Add New Customer Data
    let form_rows = [
        ["AC-1001", "Meera Iyer", "29", "Female", "Single", "Savings", "18000", "3.5", "5", "Monthly", "North", "4"],
        ["AC-1002", "Rahul Verma", "45", "Male", "Married", "Current", "52000", "2.0", "10", "Weekly", "South", "5"],
        ["AC-1003", "Anita Das", "61", "Female", "Widowed", "Fixed Deposit", "250000", "6.8", "3", "Yearly", "North", "3"],
        ["AC-1001", "Meera Iyer", "29", "Female", "Single", "Savings", "17500", "3.5", "5", "Monthly", "North", "4"],
    ];
    for [id, name, age, gender, marital, account, balance, rate, term, frequency, region, rating] in form_rows {
        let raw = RawRecord::new()
            .set("Account_ID", id)
            .set("Customer_Name", name)
            .set("Age", age)
            .set("Gender", gender)
            .set("Marital_Status", marital)
            .set("Account_Type", account)
            .set("Balance", balance)
            .set("Interest_Rate", rate)
            .set("Account_Term", term)
            .set("Opening_Date", "2024-04-01")
            .set("Transaction_Status", "Success")
            .set("Transaction_Amount", "500")
            .set("Transaction_Type", "Deposit")
            .set("Frequency", frequency)
            .set("Region", region)
            .set("Customer_Satisfaction_Rating", rating);
        orchestrator
            .ingest(&store, raw)
            .with_context(|| format!("adding {id}"))?;
    }
    println!("  ✓ Stored customer rows in {}\n", store.path().display());

    // A bad form submission is rejected with the offending field
    let rejected = store.append_raw(RawRecord::new().set("Account_ID", "AC-9").set("Age", "17"));
    if let Err(e) = rejected {
        println!("  ✗ Rejected form: {e}\n");
    }

    let data = store.load();
    println!("Dataset overview: {} rows", data.len());
    println!("{}\n", serde_json::to_string_pretty(&data.to_json()?)?);

    print_table("Account Type Breakdown", &orchestrator.distribution(&data, "Account_Type")?);
    print_table(
        "Customer Satisfaction Rating Distribution",
        &orchestrator.distribution(&data, "Customer_Satisfaction_Rating")?,
    );
    print_table(
        "Transaction Frequency by Region",
        &orchestrator.breakdown(
            &data,
            &AggregationSpec::new(["Region", "Frequency"], "Account_ID", Reduction::Count),
        )?,
    );
    print_table(
        "Transaction Amounts by Type",
        &orchestrator.breakdown(&data, &AggregationSpec::sum_by("Transaction_Type", "Transaction_Amount"))?,
    );

    Ok(())
}
