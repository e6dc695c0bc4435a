use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use serde::Deserialize;

use crate::{
    account::{Account, Payload, PrivateData},
    transaction::{ACCOUNT_ADD, PAYLOAD_ADD, Transaction},
};

/// One client submission. Which columns matter depends on `type`.
#[derive(Debug, Deserialize)]
pub struct TransactionRow {
    pub block: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub pub_key: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub public_data: Option<String>,
    /// `receiver=data` pairs separated by `;`.
    #[serde(default)]
    pub private_data: Option<String>,
}

impl TransactionRow {
    /// Serializes the row the way an API layer would before submitting it.
    ///
    /// Nothing is validated here: bad ids, keys and unknown types are left for
    /// the application to reject.
    pub fn to_transaction(&self) -> Result<Transaction, bincode::Error> {
        match self.kind.as_str() {
            ACCOUNT_ADD => Transaction::account_add(&Account::new(
                self.id.clone(),
                self.pub_key.clone().unwrap_or_default(),
            )),
            PAYLOAD_ADD => Transaction::payload_add(&Payload {
                id: self.id.clone(),
                sender_account_id: self.sender.clone().unwrap_or_default(),
                public_data: self.public_data.clone().unwrap_or_default(),
                private_data: self.parse_private_data(),
            }),
            other => Ok(Transaction::new(other, self.id.as_bytes().to_vec())),
        }
    }

    fn parse_private_data(&self) -> Vec<PrivateData> {
        self.private_data
            .as_deref()
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (receiver, data) = pair.split_once('=').unwrap_or((pair, ""));
                PrivateData {
                    receiver_account_id: receiver.trim().to_string(),
                    data: data.trim().as_bytes().to_vec(),
                }
            })
            .collect()
    }
}

/// Parses a transaction log in CSV format, yielding rows with their line number.
pub struct CsvTransactionParser<R> {
    iter: DeserializeRecordsIntoIter<R, TransactionRow>,
}

impl<R> CsvTransactionParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvTransactionParser<R>
where
    R: Read,
{
    type Item = (u64, csv::Result<TransactionRow>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
