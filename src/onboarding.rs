use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{
    Account, AccountStore, BillScan, EmployerApplication, EmployerProfile, Error,
    IndividualApplication, InsurancePolicy, Money, Role,
};

/// Creates account records at the end of an onboarding flow and makes them
/// visible to incoming debits.
#[derive(Debug)]
pub struct Onboarding<S: AccountStore> {
    store: Arc<S>,
    individual_credit_limit: Money,
    employer_credit_limit: Money,
    welcome_bonus_points: u64,
    min_scan_confidence: f64,
}

impl<S: AccountStore> Onboarding<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            individual_credit_limit: config.individual_credit_limit,
            employer_credit_limit: config.employer_credit_limit,
            welcome_bonus_points: config.welcome_bonus_points,
            min_scan_confidence: config.min_scan_confidence,
        }
    }

    pub fn individual(&self, application: IndividualApplication) -> Result<Account, Error> {
        let mut account = Account::new(
            Role::Individual,
            application.name,
            application.email,
            self.individual_credit_limit,
        )
        .with_payment_source(application.payment_source)
        .with_bonus_points(self.welcome_bonus_points);
        if let Some(policy) = application.policy {
            account = account.with_policy(policy);
        }

        self.store.register(account.clone())?;
        info!(
            id = %account.id,
            account = account.lookup_key().unwrap_or_default(),
            limit = %account.credit_limit,
            "individual onboarded"
        );
        Ok(account)
    }

    /// Onboards an individual whose policy comes from a scanned bill. A scan
    /// below the confidence threshold registers nothing.
    pub fn individual_from_scan(
        &self,
        mut application: IndividualApplication,
        scan: &BillScan,
        now: DateTime<Utc>,
    ) -> Result<Account, Error> {
        let policy = match InsurancePolicy::from_scan(scan, self.min_scan_confidence, now) {
            Ok(policy) => policy,
            Err(e) => {
                warn!(provider = %scan.provider_name, error = %e, "bill scan rejected");
                return Err(e);
            }
        };
        application.policy = Some(policy);
        self.individual(application)
    }

    pub fn employer(&self, application: EmployerApplication) -> Result<Account, Error> {
        let domain: String = application
            .company_name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let email = format!(
            "admin@{}.com",
            if domain.is_empty() { "company" } else { domain.as_str() }
        );

        let account = Account::new(
            Role::Employer(EmployerProfile {
                company_name: application.company_name,
                ein: application.ein,
                employee_count: application.employee_count.max(1),
                total_volume: 0,
                engagement_score: 0,
            }),
            "Corporate Admin",
            email,
            self.employer_credit_limit,
        )
        .with_payment_source(application.payment_source);

        self.store.register(account.clone())?;
        info!(
            id = %account.id,
            account = account.lookup_key().unwrap_or_default(),
            limit = %account.credit_limit,
            "employer onboarded"
        );
        Ok(account)
    }
}
