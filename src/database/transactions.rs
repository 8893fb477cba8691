// Transaction helper for multi-row writes

use rusqlite::{Connection, Result, Transaction, TransactionBehavior};

/// Run `operation` inside a transaction. Commits when it returns Ok; any
/// error drops the transaction, which rolls it back.
pub fn execute_in_transaction<F, T>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    operation: F,
) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(behavior)?;

    match operation(&tx) {
        Ok(result) => {
            tx.commit()?;
            Ok(result)
        }
        Err(e) => {
            log::warn!("Rolling back transaction: {}", e);
            Err(e)
        }
    }
}
