use crate::{
    account::Account,
    crypto::validate_public_key,
    state::{Ledger, StateError},
    transaction::Transaction,
};

use super::{TxContext, TxError, TxHandler};

pub fn handler<S: Ledger>() -> TxHandler<S> {
    TxHandler {
        check: check::<S>,
        deliver: deliver::<S>,
    }
}

/// Rejects ids already present, then keys that are not well formed.
pub fn check<S: Ledger>(tx: &Transaction, state: &S, ctx: &TxContext) -> Result<(), TxError> {
    let account = Account::decode(&tx.data, ctx.max_tx_bytes)?;
    if state.has_account(&account.id) {
        return Err(StateError::DuplicateAccount { id: account.id }.into());
    }
    validate_public_key(&account.pub_key)?;
    Ok(())
}

/// Inserts the account. Duplicate ids are still refused by the ledger itself.
pub fn deliver<S: Ledger>(
    tx: &Transaction,
    state: &mut S,
    ctx: &TxContext,
) -> Result<(), TxError> {
    let account = Account::decode(&tx.data, ctx.max_tx_bytes)?;
    state.add_account(account)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::SigningKey;

    use crate::{
        codec::DEFAULT_MAX_TX_BYTES, crypto::format_ed25519, handler::ErrorKind,
        state::in_memory_state::InMemoryState,
    };

    use super::*;

    const CTX: TxContext = TxContext {
        max_tx_bytes: DEFAULT_MAX_TX_BYTES,
    };

    fn account_tx(id: &str, pub_key: &str) -> Transaction {
        Transaction::account_add(&Account::new(id, pub_key)).unwrap()
    }

    fn valid_key() -> String {
        format_ed25519(&SigningKey::from_bytes(&[1; 32]).verifying_key())
    }

    #[test]
    fn new_account_is_checked_and_delivered() {
        let mut state = InMemoryState::new();
        let tx = account_tx("acct-1", &valid_key());

        check(&tx, &state, &CTX).unwrap();
        deliver(&tx, &mut state, &CTX).unwrap();
        assert!(state.has_account("acct-1"));

        let err = check(&tx, &state, &CTX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateAccount);
    }

    #[test]
    fn duplicate_is_reported_before_bad_key() {
        let mut state = InMemoryState::new();
        state
            .add_account(Account::new("acct-1", valid_key()))
            .unwrap();
        let err = check(&account_tx("acct-1", "garbage"), &state, &CTX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateAccount);
    }

    #[test]
    fn malformed_key_is_rejected_without_mutation() {
        let state = InMemoryState::new();
        let before = state.app_hash();
        let err = check(&account_tx("acct-1", "ed25519:AAAA"), &state, &CTX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
        assert_eq!(state.app_hash(), before);
    }

    #[test]
    fn undecodable_data_fails_both_hooks() {
        let mut state = InMemoryState::new();
        let tx = Transaction::new(crate::transaction::ACCOUNT_ADD, vec![0xff, 0x01]);
        assert_eq!(check(&tx, &state, &CTX).unwrap_err().kind(), ErrorKind::Decode);
        assert_eq!(
            deliver(&tx, &mut state, &CTX).unwrap_err().kind(),
            ErrorKind::Decode
        );
        assert_eq!(state.account_count(), 0);
    }

    #[test]
    fn deliver_does_not_revalidate_key() {
        let mut state = InMemoryState::new();
        deliver(&account_tx("acct-1", "not-a-key"), &mut state, &CTX).unwrap();
        assert!(state.has_account("acct-1"));
    }

    #[test]
    fn repeated_check_is_stable() {
        let state = InMemoryState::new();
        let tx = account_tx("acct-1", &valid_key());
        let first = check(&tx, &state, &CTX);
        for _ in 0..5 {
            assert_eq!(check(&tx, &state, &CTX), first);
        }
    }
}
