use std::io::Write;

use futures::StreamExt;
use tracing::{debug, info};

use crate::domain::{
    AccountStore, BridgeCommand, Clock, DebitOutcome, Error,
    traits::{CommandStream, DeadLetterQueue},
};
use crate::onboarding::Onboarding;
use crate::processor::DebitProcessor;
use crate::report;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub onboarded: usize,
    pub approved: usize,
    pub duplicates: usize,
    pub declined: usize,
    pub repayments: usize,
    pub settled: usize,
    pub dead_lettered: usize,
}

/// Replays a command feed against the bridge.
#[derive(Debug)]
pub struct Engine<I, S, C, D>
where
    I: CommandStream,
    S: AccountStore,
    C: Clock,
    D: DeadLetterQueue,
{
    ingestion: I,
    processor: DebitProcessor<S, C>,
    onboarding: Onboarding<S>,
    dlq: D,
    summary: RunSummary,
}

impl<I, S, C, D> Engine<I, S, C, D>
where
    I: CommandStream,
    S: AccountStore,
    C: Clock,
    D: DeadLetterQueue,
{
    pub fn new(
        ingestion: I,
        processor: DebitProcessor<S, C>,
        onboarding: Onboarding<S>,
        dlq: D,
    ) -> Self {
        Self {
            ingestion,
            processor,
            onboarding,
            dlq,
            summary: RunSummary::default(),
        }
    }

    pub async fn process(&mut self) -> Result<RunSummary, Error> {
        let mut commands = self.ingestion.stream();

        while let Some(command) = commands.next().await {
            let result = match command {
                Ok(command) => {
                    debug!(%command, "applying command");
                    self.apply_command(command)
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                self.summary.dead_lettered += 1;
                self.dlq.report(&e);
            }
        }

        info!(summary = ?self.summary, "command feed drained");
        Ok(self.summary)
    }

    fn apply_command(&mut self, command: BridgeCommand) -> Result<(), Error> {
        match command {
            BridgeCommand::OnboardIndividual(application) => {
                self.onboarding.individual(application)?;
                self.summary.onboarded += 1;
            }
            BridgeCommand::OnboardEmployer(application) => {
                self.onboarding.employer(application)?;
                self.summary.onboarded += 1;
            }
            BridgeCommand::Debit(request) => match self.processor.authorize(&request)? {
                DebitOutcome::Approved(_) => self.summary.approved += 1,
                DebitOutcome::Duplicate { .. } => self.summary.duplicates += 1,
                DebitOutcome::Declined(_) => self.summary.declined += 1,
            },
            BridgeCommand::Repay {
                account_number,
                amount,
            } => {
                self.processor.repay(&account_number, amount)?;
                self.summary.repayments += 1;
            }
            BridgeCommand::SettlePending { account_number } => {
                self.summary.settled += self.processor.settle_pending(&account_number)?;
            }
        }
        Ok(())
    }

    pub fn flush<W: Write>(&self, out: W) -> Result<(), Error> {
        report::write_summary(self.processor.store(), out)
    }
}
