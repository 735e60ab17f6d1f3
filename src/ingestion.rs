use std::io::Read;
use std::pin::Pin;

use chrono::Utc;
use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::domain::traits::CommandStream;
use crate::domain::{
    BridgeCommand, DebitRequest, EmployerApplication, Error, IndividualApplication,
    InsurancePolicy, Money, PaymentSource,
};

pub struct CsvCommandReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvCommandReader<R> {
    pub fn new(reader: R) -> Result<Self, Error> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Ok(Self { reader: Some(rdr) })
    }
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "type")]
    kind: String,
    routing: Option<String>,
    account: String,
    amount: Option<Money>,
    reference: Option<String>,
}

impl CsvRow {
    fn payment_source(&self) -> Result<PaymentSource, Error> {
        let routing = self.routing.as_deref().filter(|r| !r.is_empty()).ok_or_else(|| {
            Error::Ingestion(format!("Missing routing number for account {}", self.account))
        })?;
        Ok(PaymentSource::new(routing, self.account.as_str()))
    }
}

impl TryFrom<CsvRow> for BridgeCommand {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        if row.account.is_empty() {
            return Err(Error::Ingestion("Missing account number".to_string()));
        }

        let command = match (row.kind.trim().to_ascii_lowercase().as_str(), row.amount) {
            ("onboard_individual", premium) => {
                let payment_source = row.payment_source()?;
                let policy = row.reference.as_deref().map(|carrier| {
                    InsurancePolicy::new(carrier, premium.unwrap_or_default(), Utc::now())
                });
                BridgeCommand::OnboardIndividual(IndividualApplication {
                    name: "Account Holder".to_string(),
                    email: format!("{}@members.vitalperks.example", row.account),
                    payment_source,
                    policy,
                })
            }
            ("onboard_employer", _) => {
                let payment_source = row.payment_source()?;
                BridgeCommand::OnboardEmployer(EmployerApplication {
                    company_name: row.reference.unwrap_or_else(|| "Unknown Corp".to_string()),
                    ein: None,
                    employee_count: 1,
                    payment_source,
                })
            }
            ("debit", Some(amount)) => BridgeCommand::Debit(DebitRequest {
                routing_number: row.routing.unwrap_or_default(),
                account_number: row.account,
                amount,
                idempotency_key: row.reference,
            }),
            ("repay", Some(amount)) => BridgeCommand::Repay {
                account_number: row.account,
                amount,
            },
            ("settle", None) => BridgeCommand::SettlePending {
                account_number: row.account,
            },
            (other, _) => {
                return Err(Error::Ingestion(format!(
                    "Invalid command type: {}",
                    other
                )));
            }
        };

        Ok(command)
    }
}

impl<R: Read + Send + 'static> CommandStream for CsvCommandReader<R> {
    type CmdStream = Pin<Box<dyn Stream<Item = Result<BridgeCommand, Error>> + Send>>;

    fn stream(&mut self) -> Self::CmdStream {
        // Take ownership of the reader so the iterator we build owns all data and is 'static.
        let reader = match self.reader.take() {
            Some(r) => r,
            None => {
                // Already consumed; return an empty stream.
                return Box::pin(stream::iter(Vec::<Result<BridgeCommand, Error>>::new()));
            }
        };

        let iter = reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => BridgeCommand::try_from(row),
                Err(e) => Err(Error::Ingestion(format!(
                    "CSV deserialization error: {}",
                    e
                ))),
            });

        Box::pin(stream::iter(iter))
    }
}
