pub mod account;
pub mod command;
pub mod error;
pub mod money;
pub mod policy;
pub mod response;
pub mod traits;
pub mod transaction;

pub use account::{Account, AccountId, EmployerProfile, KycStatus, ProcessedKey, Role};
pub use command::{BridgeCommand, DebitRequest, EmployerApplication, IndividualApplication};
pub use error::Error;
pub use money::Money;
pub use policy::{BillScan, InsurancePolicy, PaymentSource, SourceStatus};
pub use response::{DebitOutcome, DebitResponse, ResponseStatus};
pub use traits::{AccountStore, Clock, CommandStream, DeadLetterQueue};
pub use transaction::{EntryId, EntryKind, EntryMetadata, EntryStatus, LedgerEntry};
