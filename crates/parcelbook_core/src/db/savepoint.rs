//! Named savepoint scoping for repository writes.
//!
//! A savepoint behaves like a transaction when no transaction is open and
//! like a nested transaction otherwise, so repository writes stay atomic
//! both standalone and inside a service-level unit of work.

use rusqlite::Connection;

/// Runs `work` inside `SAVEPOINT name`, releasing it on success and rolling
/// back to it on any error.
pub fn within_savepoint<T, E, F>(conn: &Connection, name: &str, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    conn.execute_batch(&format!("SAVEPOINT {name};"))?;
    match work() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {name};"))?;
            Ok(value)
        }
        Err(err) => {
            // The original error wins over rollback failures.
            let _ = conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name};"));
            Err(err)
        }
    }
}
