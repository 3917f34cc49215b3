//! 事务句柄：`Open → Committed | RolledBack`，结束后不可再用。

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::executor::{Db, ExecOutcome, Executor, Row, Statement, run_execute, run_query};
use log::{info, warn};
use rusqlite::Connection;
use std::cell::Cell;
use std::sync::MutexGuard;
use std::thread;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// 独占一个连接的事务。
///
/// 同一时刻只属于一个调用方（`!Sync`）；drop 时若仍处于 `Open` 则回滚，并释放连接。
#[derive(Debug)]
pub struct Tx<'db> {
    conn: MutexGuard<'db, Connection>,
    db: &'db Db,
    state: Cell<TxState>,
    started_at: Instant,
}

impl<'db> Tx<'db> {
    pub(crate) fn begin(db: &'db Db) -> Result<Self> {
        let conn = db.lock()?;
        conn.execute_batch("BEGIN")?;
        db.set_tx_thread(Some(thread::current().id()));
        info!("event=tx_begin module=tx status=ok");
        Ok(Self {
            conn,
            db,
            state: Cell::new(TxState::Open),
            started_at: Instant::now(),
        })
    }

    pub fn state(&self) -> TxState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state.get() == TxState::Open
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state.get() {
            TxState::Open => Ok(()),
            TxState::Committed => Err(Error::InvalidTransaction("transaction already committed")),
            TxState::RolledBack => Err(Error::InvalidTransaction("transaction already rolled back")),
        }
    }

    pub fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        self.conn.execute_batch("COMMIT")?;
        self.state.set(TxState::Committed);
        info!(
            "event=tx_commit module=tx status=ok duration_ms={}",
            self.started_at.elapsed().as_millis()
        );
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        self.state.set(TxState::RolledBack);
        self.conn.execute_batch("ROLLBACK")?;
        info!(
            "event=tx_rollback module=tx status=ok duration_ms={}",
            self.started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

impl Executor for Tx<'_> {
    fn settings(&self) -> &Settings {
        self.db.settings()
    }

    fn execute(&self, stmt: &Statement) -> Result<ExecOutcome> {
        self.ensure_open()?;
        run_execute(&self.conn, self.flavor(), stmt)
    }

    fn query(&self, stmt: &Statement) -> Result<Vec<Row>> {
        self.ensure_open()?;
        run_query(&self.conn, self.flavor(), stmt)
    }

    // 不支持嵌套事务：在当前事务中直接运行
    fn atomic(&self, work: &mut dyn FnMut(&dyn Executor) -> Result<()>) -> Result<()> {
        self.ensure_open()?;
        work(self)
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if self.state.get() == TxState::Open {
            warn!("event=tx_rollback module=tx status=start reason=dropped_open");
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                warn!("event=tx_rollback module=tx status=error error={err}");
            }
            self.state.set(TxState::RolledBack);
        }
        // 连接锁随 `conn` 字段释放
        self.db.set_tx_thread(None);
    }
}
