//! Per-partition worker lifecycle.
//!
//! The distributed-batch framework instantiates one worker per input
//! partition and invokes `setup`, then `process` once per record, then
//! `teardown`. The worker owns one administrative transaction for its
//! whole lifetime: it is opened at setup, shared by every record, and
//! committed exactly once at teardown. Any failure rolls the
//! transaction back and kills the worker; partition-level retry belongs
//! to the framework.

use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};

use crate::config::RepairConfig;
use crate::engine::{AdminTx, GraphEngine};
use crate::error::{RepairError, Result};
use crate::mutation::repair_record;
use crate::record::GraphRecord;
use crate::schema::{resolve_descriptor, validate_index_status, ValidatedIndex};

/// The named counters a worker reports to the enclosing framework.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Counter {
    /// Transactions committed at teardown.
    SuccessfulTransactions,
    /// Transactions rolled back or failed to commit.
    FailedTransactions,
    /// Graph connections closed cleanly at teardown.
    SuccessfulShutdowns,
    /// Graph connections that failed to close.
    FailedShutdowns,
}

/// Explicit counter accumulator, reset at worker start and snapshotted
/// into the [`RepairReport`] at worker end.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepairCounters {
    /// Committed transactions.
    pub successful_transactions: u64,
    /// Rolled-back or failed transactions.
    pub failed_transactions: u64,
    /// Clean graph shutdowns.
    pub successful_shutdowns: u64,
    /// Failed graph shutdowns.
    pub failed_shutdowns: u64,
}

impl RepairCounters {
    /// Increments one counter by one.
    pub fn increment(&mut self, counter: Counter) {
        match counter {
            Counter::SuccessfulTransactions => self.successful_transactions += 1,
            Counter::FailedTransactions => self.failed_transactions += 1,
            Counter::SuccessfulShutdowns => self.successful_shutdowns += 1,
            Counter::FailedShutdowns => self.failed_shutdowns += 1,
        }
    }

    /// Current value of one counter.
    pub fn get(&self, counter: Counter) -> u64 {
        match counter {
            Counter::SuccessfulTransactions => self.successful_transactions,
            Counter::FailedTransactions => self.failed_transactions,
            Counter::SuccessfulShutdowns => self.successful_shutdowns,
            Counter::FailedShutdowns => self.failed_shutdowns,
        }
    }
}

/// Lifecycle state of one worker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkerState {
    /// Constructed; no transaction open yet.
    Uninitialized,
    /// Setup in progress: transaction open, index under validation.
    Validating,
    /// Validated and ready for the first record.
    Ready,
    /// At least one record processed.
    Processing,
    /// Teardown committed the transaction.
    Committed,
    /// A failure rolled the transaction back; the worker is dead.
    RolledBack,
}

/// Report produced after a worker drains its partition.
#[derive(Clone, Debug, Serialize)]
pub struct RepairReport {
    /// Name of the repaired index.
    pub index: String,
    /// Records processed in this partition.
    pub records: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// Final counter values.
    pub counters: RepairCounters,
}

/// One index-repair worker, bound to one partition of the input stream.
pub struct RepairWorker<E: GraphEngine> {
    engine: E,
    config: RepairConfig,
    tx: Option<E::Tx>,
    index: Option<ValidatedIndex>,
    state: WorkerState,
    counters: RepairCounters,
    records: u64,
}

impl<E: GraphEngine> RepairWorker<E> {
    /// Creates a worker over an open graph connection.
    ///
    /// Configuration defects (a missing index name) surface here,
    /// before any transaction is opened.
    pub fn new(engine: E, config: RepairConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine,
            config,
            tx: None,
            index: None,
            state: WorkerState::Uninitialized,
            counters: RepairCounters::default(),
            records: 0,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Current counter values.
    pub fn counters(&self) -> &RepairCounters {
        &self.counters
    }

    /// Opens the administrative transaction and validates the index
    /// status. On any failure the transaction is rolled back, the
    /// failure counter is incremented, and no records will be
    /// processed.
    pub fn setup(&mut self) -> Result<()> {
        if self.state != WorkerState::Uninitialized {
            return Err(RepairError::WorkerState("setup may only run once"));
        }
        self.state = WorkerState::Validating;
        info!(
            index = %self.config.index_name,
            relation_type = self.config.relation_type.as_deref(),
            "repair.setup.begin"
        );

        let tx = match self.engine.open_admin_tx() {
            Ok(tx) => tx,
            Err(err) => {
                self.fail(None, &err);
                return Err(err);
            }
        };

        let validated = resolve_descriptor(
            &tx,
            &self.config.index_name,
            self.config.relation_type.as_deref(),
        )
        .and_then(|descriptor| validate_index_status(&tx, &descriptor));
        match validated {
            Ok(index) => {
                info!(index = %index.name(), "repair.setup.ready");
                self.tx = Some(tx);
                self.index = Some(index);
                self.state = WorkerState::Ready;
                Ok(())
            }
            Err(err) => {
                self.fail(Some(tx), &err);
                Err(err)
            }
        }
    }

    /// Processes one input record: computes its mutations and applies
    /// them through the worker's transaction.
    ///
    /// A failure rolls the transaction back immediately and the worker
    /// stops accepting records; nothing from this partition survives a
    /// record-level error.
    pub fn process(&mut self, record: &GraphRecord) -> Result<()> {
        if !matches!(self.state, WorkerState::Ready | WorkerState::Processing) {
            return Err(RepairError::WorkerState("worker is not processing"));
        }
        self.state = WorkerState::Processing;
        let (Some(tx), Some(index)) = (self.tx.as_mut(), self.index.as_ref()) else {
            return Err(RepairError::WorkerState("worker has no open transaction"));
        };
        match repair_record(tx, index, record) {
            Ok(()) => {
                self.records += 1;
                Ok(())
            }
            Err(err) => {
                let tx = self.tx.take();
                self.fail(tx, &err);
                Err(err)
            }
        }
    }

    /// Commits the administrative transaction, then closes the graph
    /// connection, reporting each outcome through its own counter pair.
    /// Neither failure is retried here.
    pub fn teardown(&mut self) -> Result<()> {
        if !matches!(self.state, WorkerState::Ready | WorkerState::Processing) {
            return Err(RepairError::WorkerState("worker has nothing to commit"));
        }
        let Some(mut tx) = self.tx.take() else {
            return Err(RepairError::WorkerState("worker has no open transaction"));
        };
        match tx.commit() {
            Ok(()) => {
                self.counters.increment(Counter::SuccessfulTransactions);
                self.state = WorkerState::Committed;
            }
            Err(err) => {
                error!(error = %err, "repair.teardown.commit_failed");
                self.counters.increment(Counter::FailedTransactions);
                self.state = WorkerState::RolledBack;
                return Err(err);
            }
        }

        match self.engine.close() {
            Ok(()) => {
                self.counters.increment(Counter::SuccessfulShutdowns);
                info!(records = self.records, "repair.teardown.complete");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "repair.teardown.shutdown_failed");
                self.counters.increment(Counter::FailedShutdowns);
                Err(err)
            }
        }
    }

    /// Drives a whole partition through the lifecycle and reports the
    /// outcome.
    pub fn run(mut self, records: impl IntoIterator<Item = GraphRecord>) -> Result<RepairReport> {
        let start = Instant::now();
        self.setup()?;
        for record in records {
            self.process(&record)?;
        }
        self.teardown()?;
        let report = RepairReport {
            index: self.config.index_name.clone(),
            records: self.records,
            duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            counters: self.counters.clone(),
        };
        info!(
            index = %report.index,
            records = report.records,
            duration_ms = report.duration_ms,
            "repair.run.complete"
        );
        Ok(report)
    }

    fn fail(&mut self, tx: Option<E::Tx>, err: &RepairError) {
        if let Some(mut tx) = tx {
            if let Err(rollback_err) = tx.rollback() {
                error!(error = %rollback_err, "repair.rollback_failed");
            }
        }
        error!(
            index = %self.config.index_name,
            error = %err,
            "repair.worker_failed"
        );
        self.counters.increment(Counter::FailedTransactions);
        self.state = WorkerState::RolledBack;
    }
}
