use crate::{
    account::Payload,
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

pub fn check<S: Ledger>(tx: &Transaction, state: &S, ctx: &TxContext) -> Result<(), TxError> {
    let payload = Payload::decode(&tx.data, ctx.max_tx_bytes)?;
    if state.has_payload(&payload.id) {
        return Err(StateError::DuplicatePayload { id: payload.id }.into());
    }
    if let Some(id) = payload
        .referenced_accounts()
        .find(|id| !state.has_account(id))
    {
        return Err(TxError::UnknownAccount { id: id.clone() });
    }
    Ok(())
}

pub fn deliver<S: Ledger>(
    tx: &Transaction,
    state: &mut S,
    ctx: &TxContext,
) -> Result<(), TxError> {
    let payload = Payload::decode(&tx.data, ctx.max_tx_bytes)?;
    state.add_payload(payload)?;
    Ok(())
}
