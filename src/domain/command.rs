use crate::domain::{InsurancePolicy, Money, PaymentSource};

/// A simulated bank-network pull against a virtual account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebitRequest {
    pub routing_number: String,
    pub account_number: String,
    pub amount: Money,
    /// Caller-supplied trace id. Without one, duplicates are detected by
    /// amount and recency.
    pub idempotency_key: Option<String>,
}

impl DebitRequest {
    pub fn new(
        routing_number: impl Into<String>,
        account_number: impl Into<String>,
        amount: Money,
    ) -> Self {
        Self {
            routing_number: routing_number.into(),
            account_number: account_number.into(),
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndividualApplication {
    pub name: String,
    pub email: String,
    pub payment_source: PaymentSource,
    pub policy: Option<InsurancePolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployerApplication {
    pub company_name: String,
    pub ein: Option<String>,
    pub employee_count: u32,
    pub payment_source: PaymentSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    OnboardIndividual(IndividualApplication),
    OnboardEmployer(EmployerApplication),
    Debit(DebitRequest),
    Repay { account_number: String, amount: Money },
    SettlePending { account_number: String },
}

impl core::fmt::Display for BridgeCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BridgeCommand::OnboardIndividual(app) => write!(
                f,
                "onboard_individual,account={}",
                app.payment_source.account_number
            ),
            BridgeCommand::OnboardEmployer(app) => write!(
                f,
                "onboard_employer,account={},company={}",
                app.payment_source.account_number, app.company_name
            ),
            BridgeCommand::Debit(req) => {
                write!(f, "debit,account={},amount={}", req.account_number, req.amount)
            }
            BridgeCommand::Repay {
                account_number,
                amount,
            } => write!(f, "repay,account={},amount={}", account_number, amount),
            BridgeCommand::SettlePending { account_number } => {
                write!(f, "settle,account={}", account_number)
            }
        }
    }
}
