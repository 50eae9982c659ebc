//! Built-in record kinds used by the dashboards
//!
//! | Kind        | Identifier   | Policy              |
//! |-------------|--------------|---------------------|
//! | `banking`   | `Account_ID` | duplicates allowed (transaction ledger) |
//! | `insurance` | `Name`       | duplicates allowed (people share names) |
//! | `orders`    | `Order_ID`   | unique              |

use super::{FieldKind, IdentifierPolicy, Schema};
use std::sync::Arc;

/// Names of the built-in record kinds
pub const KINDS: [&str; 3] = ["banking", "insurance", "orders"];

/// Look up a built-in record kind by name
#[must_use]
pub fn by_name(kind: &str) -> Option<Arc<Schema>> {
    match kind {
        "banking" => Some(banking()),
        "insurance" => Some(insurance()),
        "orders" => Some(orders()),
        _ => None,
    }
}

// Definitions are static; `test_catalog_definitions_consistent` checks them.
fn build(builder: super::SchemaBuilder) -> Arc<Schema> {
    Arc::new(builder.finish())
}

/// Banking customer accounts and their latest transaction
#[must_use]
pub fn banking() -> Arc<Schema> {
    build(
        Schema::builder("banking")
            .identifier("Account_ID", IdentifierPolicy::AllowDuplicates)
            .required("Customer_Name", FieldKind::Text)
            .required("Age", FieldKind::integer(Some(18), Some(100)))
            .required("Gender", FieldKind::categorical(["Male", "Female", "Other"]))
            .required(
                "Marital_Status",
                FieldKind::categorical(["Single", "Married", "Divorced", "Widowed"]),
            )
            .required(
                "Account_Type",
                FieldKind::categorical(["Savings", "Current", "Fixed Deposit", "Recurring Deposit"]),
            )
            .required("Balance", FieldKind::real(Some(0.0), None))
            .required("Interest_Rate", FieldKind::real(Some(0.0), None))
            .required("Account_Term", FieldKind::integer(Some(1), Some(50)))
            .required("Opening_Date", FieldKind::Date)
            .optional("Closing_Date", FieldKind::Date)
            .required(
                "Transaction_Status",
                FieldKind::categorical(["Success", "Failed", "Pending"]),
            )
            .required("Transaction_Amount", FieldKind::real(Some(0.0), None))
            .required(
                "Transaction_Type",
                FieldKind::categorical(["Deposit", "Withdrawal", "Transfer"]),
            )
            .required(
                "Frequency",
                FieldKind::categorical(["Daily", "Weekly", "Monthly", "Yearly"]),
            )
            .optional("Region", FieldKind::Text)
            .optional("Occupation", FieldKind::Text)
            .optional_with_default("Dependents", FieldKind::integer(Some(0), None), 0)
            .required("Customer_Satisfaction_Rating", FieldKind::integer(Some(1), Some(5))),
    )
}

/// Insurance customers, premiums and claims
#[must_use]
pub fn insurance() -> Arc<Schema> {
    build(
        Schema::builder("insurance")
            .identifier("Name", IdentifierPolicy::AllowDuplicates)
            .required("Age", FieldKind::integer(Some(18), Some(100)))
            .optional("Region", FieldKind::Text)
            .required("Health_Risk_Score", FieldKind::real(Some(0.0), None))
            .required("Premium_Amount", FieldKind::real(Some(0.0), None))
            .required("Claim_Amount", FieldKind::real(Some(0.0), None))
            .optional_with_default("Is_Defaulter", FieldKind::integer(Some(0), Some(1)), 0),
    )
}

/// Delivery orders with agent and route conditions
#[must_use]
pub fn orders() -> Arc<Schema> {
    build(
        Schema::builder("orders")
            .identifier("Order_ID", IdentifierPolicy::Unique)
            .required("Agent_Age", FieldKind::integer(Some(15), Some(70)))
            .optional("Agent_Rating", FieldKind::real(Some(1.0), Some(6.0)))
            .required("Order_Date", FieldKind::Date)
            .optional("Order_Time", FieldKind::Time)
            .optional(
                "Weather",
                FieldKind::categorical(["Sunny", "Stormy", "Sandstorms", "Cloudy", "Fog", "Windy"]),
            )
            .optional("Traffic", FieldKind::categorical(["Low", "Medium", "High", "Jam"]))
            .required(
                "Vehicle",
                FieldKind::categorical(["motorcycle", "scooter", "van", "bicycle"]),
            )
            .required(
                "Area",
                FieldKind::categorical(["Urban", "Metropolitian", "Semi-Urban", "Other"]),
            )
            .required("Delivery_Time", FieldKind::integer(Some(0), None))
            .optional("Category", FieldKind::Text),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawRecord, Value};

    #[test]
    fn test_catalog_kinds_resolve() {
        for kind in KINDS {
            let schema = by_name(kind).unwrap();
            assert_eq!(schema.name(), kind);
            assert!(schema.identifier().is_some());
        }
        assert!(by_name("rfid").is_none());
    }

    #[test]
    fn test_catalog_definitions_consistent() {
        for kind in KINDS {
            let schema = by_name(kind).unwrap();
            let json = serde_json::to_string(schema.as_ref()).unwrap();
            assert_eq!(&Schema::from_json(&json).unwrap(), schema.as_ref());
        }
    }

    #[test]
    fn test_banking_defaults() {
        let schema = banking();
        let record = schema
            .validate(
                RawRecord::new()
                    .set("Account_ID", "AC-100")
                    .set("Customer_Name", "Meera")
                    .set("Age", 30)
                    .set("Gender", "Female")
                    .set("Marital_Status", "Single")
                    .set("Account_Type", "Savings")
                    .set("Balance", 1500.0)
                    .set("Interest_Rate", 3.5)
                    .set("Account_Term", 5)
                    .set("Opening_Date", "2024-04-01")
                    .set("Transaction_Status", "Success")
                    .set("Transaction_Amount", 250.0)
                    .set("Transaction_Type", "Deposit")
                    .set("Frequency", "Monthly")
                    .set("Customer_Satisfaction_Rating", 4),
            )
            .unwrap();

        assert_eq!(record.get("Closing_Date"), Some(&Value::Null));
        assert_eq!(record.get("Dependents"), Some(&Value::Int(0)));
        assert_eq!(record.get("Region"), Some(&Value::Null));
    }

    #[test]
    fn test_order_time_is_checked() {
        let raw = RawRecord::new()
            .set("Order_ID", "ORD-7")
            .set("Agent_Age", 30)
            .set("Order_Date", "2024-05-01")
            .set("Vehicle", "van")
            .set("Area", "Urban")
            .set("Delivery_Time", 45);
        let record = orders().validate(raw.clone().set("Order_Time", "19:05:00")).unwrap();
        assert_eq!(record.get("Order_Time").unwrap().to_string(), "19:05:00");

        let err = orders().validate(raw.set("Order_Time", "evening")).unwrap_err();
        assert!(matches!(err, crate::Error::Validation { ref field, .. } if field == "Order_Time"));
    }

    #[test]
    fn test_orders_identifier_is_unique() {
        assert_eq!(orders().identifier_policy(), IdentifierPolicy::Unique);
        assert_eq!(banking().identifier_policy(), IdentifierPolicy::AllowDuplicates);
    }
}
