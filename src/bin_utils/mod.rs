//! Replays a CSV transaction log through [`App`] the way an engine would: every
//! row is checked, accepted rows of a block are delivered in order, then the
//! block is committed.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    app::{App, CommitInfo, TxOutcome},
    config::AppConfig,
    state::{Ledger, in_memory_state::InMemoryState},
};
use csv_parser::CsvTransactionParser;
use csv_printer::{AccountRow, print_records};
pub mod csv_parser;
pub mod csv_printer;

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub config: AppConfig,
    /// Called with the line number of every row that was not applied.
    pub error_printer: Box<dyn FnMut(u64, TxOutcome)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<Option<CommitInfo>> {
        let parser = CsvTransactionParser::new(self.input);
        let mut app = App::new(self.config.in_memory_state(), self.config);

        let mut current_block = None;
        let mut accepted: Vec<(u64, Vec<u8>)> = Vec::new();
        let mut last_commit = None;

        for (line, row) in parser {
            let row = row.with_context(|| format!("Failed to parse line {line}"))?;
            if current_block.is_some_and(|block| block != row.block) {
                last_commit = Some(finish_block(
                    &mut app,
                    &mut accepted,
                    self.error_printer.as_mut(),
                ));
            }
            current_block = Some(row.block);

            let bytes = row
                .to_transaction()
                .and_then(|tx| tx.to_bytes())
                .with_context(|| format!("Failed to encode line {line}"))?;
            match app.check_tx(&bytes).into_result() {
                Ok(()) => accepted.push((line, bytes)),
                Err(err) => (self.error_printer)(line, TxOutcome::Rejected(err)),
            }
        }
        if current_block.is_some() {
            last_commit = Some(finish_block(
                &mut app,
                &mut accepted,
                self.error_printer.as_mut(),
            ));
        }

        print_records(
            self.output,
            app.committed_state().accounts().map(|acc| AccountRow {
                id: &acc.id,
                pub_key: &acc.pub_key,
                profile_fields: acc.profile.len(),
            }),
        )?;
        Ok(last_commit)
    }
}

fn finish_block(
    app: &mut App<InMemoryState>,
    accepted: &mut Vec<(u64, Vec<u8>)>,
    error_printer: &mut dyn FnMut(u64, TxOutcome),
) -> CommitInfo {
    let count = accepted.len();
    for (line, bytes) in accepted.drain(..) {
        if let Err(err) = app.deliver_tx(&bytes).into_result() {
            error_printer(line, TxOutcome::Failed(err));
        }
    }
    let commit = app.commit();
    info!(height = commit.height, delivered = count, "block replayed");
    commit
}
