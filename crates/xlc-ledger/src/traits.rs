use async_trait::async_trait;
use xlc_types::{Address, LedgerId, H256};

use crate::call::ControlCall;
use crate::error::LedgerResult;
use crate::receipt::{Block, Log, TransactionReceipt};

/// Connection to one ledger.
///
/// `submit` returns the mined receipt, or [`LedgerError::Reverted`] with the
/// decoded reason when the contract rejects the call. Unreachable nodes
/// surface as [`LedgerError::Transport`].
///
/// [`LedgerError::Reverted`]: crate::LedgerError::Reverted
/// [`LedgerError::Transport`]: crate::LedgerError::Transport
#[async_trait]
pub trait Ledger: Send + Sync {
    fn id(&self) -> LedgerId;

    async fn submit(&self, contract: Address, call: &ControlCall) -> LedgerResult<TransactionReceipt>;

    async fn get_block(&self, hash: &H256) -> LedgerResult<Block>;

    async fn get_logs(&self, receipt: &TransactionReceipt) -> LedgerResult<Vec<Log>> {
        Ok(receipt.receipt.logs.clone())
    }
}
