use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Error, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    Active,
    Frozen,
}

/// The virtual ACH account issued at onboarding. Its account number is the
/// key incoming debits are matched on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSource {
    pub routing_number: String,
    pub account_number: String,
    pub bank_name: String,
    pub status: SourceStatus,
}

impl PaymentSource {
    pub fn new(routing_number: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            routing_number: routing_number.into(),
            account_number: account_number.into(),
            bank_name: "Evolve Bank & Trust".to_string(),
            status: SourceStatus::Active,
        }
    }
}

/// Display-only biller identity; never used to validate a debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurancePolicy {
    pub carrier_name: String,
    pub member_id: String,
    pub group_id: Option<String>,
    pub premium_amount: Money,
    pub payment_due_date: Option<NaiveDate>,
    pub last_verified: DateTime<Utc>,
}

impl InsurancePolicy {
    pub fn new(
        carrier_name: impl Into<String>,
        premium_amount: Money,
        last_verified: DateTime<Utc>,
    ) -> Self {
        Self {
            carrier_name: carrier_name.into(),
            member_id: generated_member_id(),
            group_id: None,
            premium_amount,
            payment_due_date: None,
            last_verified,
        }
    }

    pub fn from_scan(
        scan: &BillScan,
        min_confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        if !(scan.confidence >= min_confidence) {
            return Err(Error::LowConfidenceScan {
                confidence: scan.confidence,
                threshold: min_confidence,
            });
        }

        let premium_amount = scan
            .amount_due
            .and_then(Money::from_decimal)
            .unwrap_or_default();
        let carrier_name = match scan.provider_name.trim() {
            "" => "Detected Provider".to_string(),
            name => name.to_string(),
        };

        Ok(Self {
            carrier_name,
            member_id: scan
                .account_number
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(generated_member_id),
            group_id: None,
            premium_amount,
            payment_due_date: scan
                .due_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            last_verified: now,
        })
    }
}

fn generated_member_id() -> String {
    format!("MEM-{:06}", Uuid::now_v7().as_u128() % 1_000_000)
}

/// Structured bill record returned by the image extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillScan {
    pub provider_name: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount_due: Option<Decimal>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    pub confidence: f64,
}

impl BillScan {
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let scan: BillScan = serde_json::from_str(raw)
            .map_err(|e| Error::Ingestion(format!("Invalid bill scan payload: {}", e)))?;
        if !(0.0..=1.0).contains(&scan.confidence) {
            return Err(Error::Ingestion(format!(
                "Bill scan confidence out of range: {}",
                scan.confidence
            )));
        }
        Ok(scan)
    }
}
