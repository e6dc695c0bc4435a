use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    account::{Account, Payload},
    config::AppConfig,
    handler::{Registry, TxContext, TxError, TxHandler},
    state::{AppHash, Ledger},
    transaction::Transaction,
};

/// What the engine gets back from a Check or Deliver call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxResponse {
    pub code: u32,
    pub log: String,
    pub error: Option<TxError>,
}

impl TxResponse {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    pub fn into_result(self) -> Result<(), TxError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl From<Result<(), TxError>> for TxResponse {
    fn from(result: Result<(), TxError>) -> Self {
        match result {
            Ok(()) => Self {
                code: 0,
                log: String::new(),
                error: None,
            },
            Err(err) => Self {
                code: err.code(),
                log: err.to_string(),
                error: Some(err),
            },
        }
    }
}

/// Terminal state of a transaction that was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Refused by Check, never included in a block.
    Rejected(TxError),
    /// Included in a block, refused by Deliver. Not retried.
    Failed(TxError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    pub height: u64,
    pub app_hash: AppHash,
}

impl CommitInfo {
    pub fn app_hash_hex(&self) -> String {
        hex::encode(self.app_hash)
    }
}

fn run_check<S: Ledger>(
    registry: &Registry<S>,
    state: &S,
    ctx: &TxContext,
    bytes: &[u8],
) -> Result<(), TxError> {
    let tx = Transaction::from_bytes(bytes, ctx.max_tx_bytes)?;
    let handler = lookup(registry, &tx)?;
    (handler.check)(&tx, state, ctx)
}

fn lookup<S>(registry: &Registry<S>, tx: &Transaction) -> Result<TxHandler<S>, TxError> {
    registry.get(&tx.kind).ok_or_else(|| TxError::UnknownKind {
        kind: tx.kind.clone(),
    })
}

fn log_check(result: &Result<(), TxError>) {
    match result {
        Ok(()) => debug!("transaction accepted by check"),
        Err(err) => warn!(code = err.code(), %err, "transaction rejected by check"),
    }
}

/// The application the consensus engine drives.
///
/// Deliver writes to the canonical state and must be called by a single writer
/// in block order. Check only ever reads the snapshot taken at the last commit.
pub struct App<S> {
    state: S,
    committed: S,
    registry: Arc<Registry<S>>,
    config: AppConfig,
    height: u64,
}

impl<S: Ledger + Clone> App<S> {
    pub fn new(state: S, config: AppConfig) -> Self {
        Self::with_registry(state, config, Registry::with_builtins())
    }

    pub fn with_registry(state: S, config: AppConfig, registry: Registry<S>) -> Self {
        Self {
            committed: state.clone(),
            state,
            registry: Arc::new(registry),
            config,
            height: 0,
        }
    }

    pub fn register(&mut self, kind: impl Into<String>, handler: TxHandler<S>) {
        Arc::make_mut(&mut self.registry).register(kind, handler);
    }

    fn context(&self) -> TxContext {
        TxContext {
            max_tx_bytes: self.config.max_tx_bytes,
        }
    }

    pub fn check_tx(&self, bytes: &[u8]) -> TxResponse {
        let result = run_check(&self.registry, &self.committed, &self.context(), bytes);
        log_check(&result);
        result.into()
    }

    pub fn deliver_tx(&mut self, bytes: &[u8]) -> TxResponse {
        self.deliver(bytes).into()
    }

    fn deliver(&mut self, bytes: &[u8]) -> Result<(), TxError> {
        let ctx = self.context();
        let tx = Transaction::from_bytes(bytes, ctx.max_tx_bytes).inspect_err(|err| {
            warn!(height = self.height + 1, %err, "undecodable transaction in block");
        })?;
        let handler = lookup(&self.registry, &tx)?;

        let result = if self.config.revalidate_on_deliver {
            (handler.check)(&tx, &self.state, &ctx)
                .and_then(|()| (handler.deliver)(&tx, &mut self.state, &ctx))
        } else {
            (handler.deliver)(&tx, &mut self.state, &ctx)
        };

        match &result {
            Ok(()) => debug!(kind = %tx.kind, "transaction applied"),
            Err(err) if err.kind().is_conflict() => error!(
                kind = %tx.kind,
                code = err.code(),
                %err,
                "transaction passed check but conflicts with ledger at deliver"
            ),
            Err(err) => warn!(
                kind = %tx.kind,
                code = err.code(),
                %err,
                "transaction failed at deliver"
            ),
        }
        result
    }

    /// Seals the current block and exposes its state to Check and queries.
    pub fn commit(&mut self) -> CommitInfo {
        self.height += 1;
        let app_hash = self.state.app_hash();
        self.committed = self.state.clone();
        let info = CommitInfo {
            height: self.height,
            app_hash,
        };
        info!(
            height = info.height,
            app_hash = %info.app_hash_hex(),
            accounts = self.state.account_count(),
            payloads = self.state.payload_count(),
            "block committed"
        );
        info
    }

    /// Read-only view of the last committed state, usable from other threads
    /// while this app keeps delivering.
    pub fn check_view(&self) -> CheckView<S> {
        CheckView {
            state: self.committed.clone(),
            registry: Arc::clone(&self.registry),
            ctx: self.context(),
        }
    }

    pub fn query_account(&self, id: &str) -> Option<Account> {
        self.committed.get_account(id)
    }

    pub fn query_payload(&self, id: &str) -> Option<Payload> {
        self.committed.get_payload(id)
    }

    /// Canonical state including writes not yet committed.
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn committed_state(&self) -> &S {
        &self.committed
    }

    pub fn height(&self) -> u64 {
        self.height
    }
}

pub struct CheckView<S> {
    state: S,
    registry: Arc<Registry<S>>,
    ctx: TxContext,
}

impl<S: Ledger> CheckView<S> {
    pub fn check_tx(&self, bytes: &[u8]) -> TxResponse {
        let result = run_check(&self.registry, &self.state, &self.ctx, bytes);
        log_check(&result);
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use ed25519_dalek::SigningKey;

    use crate::{
        crypto::format_ed25519, handler::ErrorKind, state::in_memory_state::InMemoryState,
        transaction::ACCOUNT_ADD,
    };

    use super::*;

    fn key(seed: u8) -> String {
        format_ed25519(&SigningKey::from_bytes(&[seed; 32]).verifying_key())
    }

    fn account_bytes(id: &str, pub_key: &str) -> Vec<u8> {
        Transaction::account_add(&Account::new(id, pub_key))
            .unwrap()
            .to_bytes()
            .unwrap()
    }

    fn app(config: AppConfig) -> App<InMemoryState> {
        App::new(InMemoryState::new(), config)
    }

    fn kind(response: TxResponse) -> Option<ErrorKind> {
        response.error.map(|err| err.kind())
    }

    #[test]
    fn account_lifecycle() {
        let mut app = app(AppConfig::default());
        let tx = account_bytes("acct-1", &key(1));

        assert!(app.check_tx(&tx).is_ok());
        assert!(app.deliver_tx(&tx).is_ok());
        assert!(app.state().has_account("acct-1"));
        // not committed yet
        assert!(app.query_account("acct-1").is_none());
        assert!(app.check_tx(&tx).is_ok());

        let info = app.commit();
        assert_eq!(info.height, 1);
        assert_eq!(info.app_hash, app.state().app_hash());
        assert_eq!(app.query_account("acct-1").unwrap().pub_key, key(1));
        assert_eq!(kind(app.check_tx(&tx)), Some(ErrorKind::DuplicateAccount));
    }

    #[test]
    fn check_never_mutates() {
        let app = app(AppConfig::default());
        let before = app.committed_state().app_hash();
        for tx in [
            account_bytes("acct-1", &key(1)),
            account_bytes("acct-2", "bad"),
            vec![1, 2, 3],
        ] {
            app.check_tx(&tx);
        }
        assert_eq!(app.committed_state().app_hash(), before);
        assert_eq!(app.state().account_count(), 0);
    }

    #[test]
    fn garbage_bytes_are_decode_errors() {
        let mut app = app(AppConfig::default());
        let response = app.check_tx(&[0xde, 0xad]);
        assert_eq!(response.code, ErrorKind::Decode.code());
        assert!(!response.log.is_empty());
        assert_eq!(kind(app.deliver_tx(&[0xde, 0xad])), Some(ErrorKind::Decode));
        assert_eq!(app.state().account_count(), 0);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let mut app = app(AppConfig::default());
        let tx = Transaction::new("account-remove", vec![]).to_bytes().unwrap();
        assert_eq!(kind(app.check_tx(&tx)), Some(ErrorKind::UnknownKind));
        assert_eq!(kind(app.deliver_tx(&tx)), Some(ErrorKind::UnknownKind));
    }

    #[test]
    fn oversized_transaction_is_rejected() {
        let app = app(AppConfig {
            max_tx_bytes: 32,
            ..AppConfig::default()
        });
        let tx = account_bytes("acct-1", &key(1));
        assert_eq!(kind(app.check_tx(&tx)), Some(ErrorKind::Decode));
    }

    #[test]
    fn deliver_revalidates_when_configured() {
        let bad_key = account_bytes("acct-1", "not-a-key");

        let mut strict = app(AppConfig::default());
        assert_eq!(kind(strict.deliver_tx(&bad_key)), Some(ErrorKind::InvalidKey));
        assert_eq!(strict.state().account_count(), 0);

        let mut trusting = app(AppConfig {
            revalidate_on_deliver: false,
            ..AppConfig::default()
        });
        assert!(trusting.deliver_tx(&bad_key).is_ok());
        assert!(trusting.state().has_account("acct-1"));
    }

    #[test]
    fn duplicate_in_same_block_fails_at_deliver() {
        for revalidate in [true, false] {
            let mut app = app(AppConfig {
                revalidate_on_deliver: revalidate,
                ..AppConfig::default()
            });
            let tx = account_bytes("acct-1", &key(1));
            assert!(app.check_tx(&tx).is_ok());
            assert!(app.check_tx(&tx).is_ok());
            assert!(app.deliver_tx(&tx).is_ok());
            assert_eq!(kind(app.deliver_tx(&tx)), Some(ErrorKind::DuplicateAccount));
            assert_eq!(app.state().account_count(), 1);
        }
    }

    #[test]
    fn storage_failure_is_surfaced() {
        let config = AppConfig {
            max_records: Some(1),
            ..AppConfig::default()
        };
        let mut app = App::new(config.in_memory_state(), config);
        assert!(app.deliver_tx(&account_bytes("acct-1", &key(1))).is_ok());
        let response = app.deliver_tx(&account_bytes("acct-2", &key(2)));
        assert_eq!(kind(response), Some(ErrorKind::Storage));
    }

    #[test]
    fn replicas_agree_on_app_hash() {
        let block = [
            account_bytes("acct-1", &key(1)),
            account_bytes("acct-2", "broken"),
            account_bytes("acct-3", &key(3)),
        ];
        let mut a = app(AppConfig::default());
        let mut b = app(AppConfig::default());
        let outcomes_a: Vec<_> = block.iter().map(|tx| a.deliver_tx(tx)).collect();
        let outcomes_b: Vec<_> = block.iter().map(|tx| b.deliver_tx(tx)).collect();
        assert_eq!(outcomes_a, outcomes_b);
        assert_eq!(a.commit(), b.commit());
    }

    #[test]
    fn check_view_runs_alongside_deliver() {
        let mut app = app(AppConfig::default());
        app.deliver_tx(&account_bytes("acct-1", &key(1)));
        app.commit();

        let view = app.check_view();
        let checker = thread::spawn(move || {
            (0..50)
                .map(|_| view.check_tx(&account_bytes("acct-2", &key(2))).is_ok())
                .all(|ok| ok)
        });
        for seed in 2..20u8 {
            app.deliver_tx(&account_bytes(&format!("acct-{seed}"), &key(seed)));
        }
        app.commit();

        assert!(checker.join().unwrap());
        let response = app.check_tx(&account_bytes("acct-2", &key(2)));
        assert_eq!(kind(response), Some(ErrorKind::DuplicateAccount));
    }

    #[test]
    fn registered_kind_is_dispatched() {
        fn check(_: &Transaction, _: &InMemoryState, _: &TxContext) -> Result<(), TxError> {
            Ok(())
        }
        fn deliver(
            tx: &Transaction,
            state: &mut InMemoryState,
            _: &TxContext,
        ) -> Result<(), TxError> {
            let id = String::from_utf8_lossy(&tx.data).into_owned();
            state.add_account(Account::new(id, "")).map_err(TxError::from)
        }

        let mut app = app(AppConfig::default());
        app.register("noop-add", TxHandler { check, deliver });
        let tx = Transaction::new("noop-add", b"raw".to_vec()).to_bytes().unwrap();
        assert!(app.check_tx(&tx).is_ok());
        assert!(app.deliver_tx(&tx).is_ok());
        assert!(app.state().has_account("raw"));
        let builtin = Transaction::new(ACCOUNT_ADD, vec![]).to_bytes().unwrap();
        assert_eq!(kind(app.check_tx(&builtin)), Some(ErrorKind::Decode));
    }
}
