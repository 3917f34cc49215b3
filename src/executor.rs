//! 语句执行：`Executor` trait、`Db` 连接持有者，以及结果行。

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::flavor::Flavor;
use crate::modifiers::{Arg, Builder};
use crate::transaction::Tx;
use crate::value::{SqlValue, ValueMap};
use log::{debug, error, info};
use rusqlite::Connection;
use rusqlite::params_from_iter;
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Instant;

/// 一条参数化语句：SQL 中的占位符已按 flavor 输出。
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// 编译 builder。
    pub fn from_builder(builder: &dyn Builder, flavor: Flavor) -> Result<Self> {
        let (sql, args) = builder.build_with_flavor(flavor, &[]);
        Self::from_compiled(sql, args)
    }

    /// 编译后的参数只能是值：Raw/List/Builder 已经展开进 SQL。
    pub(crate) fn from_compiled(sql: String, args: Vec<Arg>) -> Result<Self> {
        let args = args
            .into_iter()
            .map(|a| match a {
                Arg::Value(v) => Ok(v),
                other => Err(Error::Parameter(format!(
                    "unexpected non-value argument {other:?}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sql, args })
    }

    /// 日志用：把参数插值进 SQL，失败时退回原始 SQL。
    pub fn render(&self, flavor: Flavor) -> String {
        flavor
            .interpolate(&self.sql, &self.args)
            .unwrap_or_else(|_| self.sql.clone())
    }
}

/// 写语句的执行结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// INSERT 后最后生成的行 id。
    pub last_insert_id: Option<i64>,
}

/// 一行查询结果，列顺序与 SELECT 一致。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn into_map(self) -> ValueMap {
        self.columns.into_iter().zip(self.values).collect()
    }
}

/// 能执行语句的对象：`Db` 或 `Tx`。
pub trait Executor {
    fn settings(&self) -> &Settings;

    fn flavor(&self) -> Flavor {
        self.settings().flavor
    }

    fn execute(&self, stmt: &Statement) -> Result<ExecOutcome>;

    fn query(&self, stmt: &Statement) -> Result<Vec<Row>>;

    /// 在一个原子单元内运行 `work`。
    ///
    /// `Db` 开启新事务（除非设置了 `skip_default_transaction`）；`Tx` 直接在当前事务中运行。
    fn atomic(&self, work: &mut dyn FnMut(&dyn Executor) -> Result<()>) -> Result<()>;
}

/// 持有一个 SQLite 连接；每条语句在执行期间独占连接。
///
/// 事务（`Tx`）在其生命周期内持有连接锁，事务内的语句必须通过 `Tx` 发出。
/// 持有 `Tx` 的线程再经由 `Db` 发语句会得到 `InvalidTransaction`，其他线程则等待事务结束。
#[derive(Debug)]
pub struct Db {
    conn: Mutex<Connection>,
    /// 持有未结束 `Tx` 的线程。
    tx_thread: Mutex<Option<ThreadId>>,
    settings: Settings,
}

impl Db {
    pub fn open(settings: &Settings) -> Result<Self> {
        let started_at = Instant::now();
        if settings.flavor != Flavor::SQLite {
            error!(
                "event=db_open module=db status=error flavor={} error_code=unsupported_flavor",
                settings.flavor
            );
            return Err(Error::Parameter(format!(
                "executor drives SQLite only, got {}",
                settings.flavor
            )));
        }

        let mode = if settings.dsn == ":memory:" { "memory" } else { "file" };
        info!("event=db_open module=db status=start mode={mode}");
        let conn = if mode == "memory" {
            Connection::open_in_memory()
        } else {
            Connection::open(&settings.dsn)
        };
        let conn = match conn {
            Ok(c) => c,
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={mode} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        info!(
            "event=db_open module=db status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(Self {
            conn: Mutex::new(conn),
            tx_thread: Mutex::new(None),
            settings: settings.clone(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(&Settings::in_memory())
    }

    /// 当前线程已经持有 `Tx` 时直接报错，否则等待连接。
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        let current = thread::current().id();
        if *self.tx_thread.lock().unwrap_or_else(|e| e.into_inner()) == Some(current) {
            error!("event=db_lock module=db status=error error_code=tx_open_on_thread");
            return Err(Error::InvalidTransaction(
                "a transaction is open on this thread; issue statements through its Tx",
            ));
        }
        Ok(self.conn.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub(crate) fn set_tx_thread(&self, owner: Option<ThreadId>) {
        *self.tx_thread.lock().unwrap_or_else(|e| e.into_inner()) = owner;
    }

    /// 手动事务：调用方负责 `commit` 或 `rollback`，未结束的事务在 drop 时回滚。
    pub fn begin(&self) -> Result<Tx<'_>> {
        Tx::begin(self)
    }

    /// 托管事务：`f` 返回 `Ok` 时提交，返回 `Err` 时回滚并原样返回该错误。
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tx<'_>) -> Result<T>,
    {
        let tx = self.begin()?;
        match f(&tx) {
            Ok(v) => {
                if tx.is_open() {
                    tx.commit()?;
                }
                Ok(v)
            }
            Err(err) => {
                if tx.is_open()
                    && let Err(rb) = tx.rollback()
                {
                    error!("event=tx_rollback module=tx status=error error={rb}");
                }
                Err(err)
            }
        }
    }
}

impl Executor for Db {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn execute(&self, stmt: &Statement) -> Result<ExecOutcome> {
        run_execute(&*self.lock()?, self.flavor(), stmt)
    }

    fn query(&self, stmt: &Statement) -> Result<Vec<Row>> {
        run_query(&*self.lock()?, self.flavor(), stmt)
    }

    fn atomic(&self, work: &mut dyn FnMut(&dyn Executor) -> Result<()>) -> Result<()> {
        if self.settings.skip_default_transaction {
            return work(self);
        }
        self.transaction(|tx| work(tx))
    }
}

pub(crate) fn run_execute(conn: &Connection, flavor: Flavor, stmt: &Statement) -> Result<ExecOutcome> {
    let started_at = Instant::now();
    let res = conn.execute(&stmt.sql, params_from_iter(stmt.args.iter()));
    match res {
        Ok(n) => {
            let is_insert = stmt
                .sql
                .trim_start()
                .get(..6)
                .is_some_and(|p| p.eq_ignore_ascii_case("INSERT"));
            debug!(
                "event=sql module=executor status=ok rows={n} duration_ms={} sql={}",
                started_at.elapsed().as_millis(),
                stmt.render(flavor)
            );
            Ok(ExecOutcome {
                rows_affected: n as u64,
                last_insert_id: is_insert.then(|| conn.last_insert_rowid()),
            })
        }
        Err(err) => {
            debug!(
                "event=sql module=executor status=error duration_ms={} sql={} error={}",
                started_at.elapsed().as_millis(),
                stmt.render(flavor),
                err
            );
            Err(err.into())
        }
    }
}

pub(crate) fn run_query(conn: &Connection, flavor: Flavor, stmt: &Statement) -> Result<Vec<Row>> {
    let started_at = Instant::now();
    let res = collect_rows(conn, stmt);
    match &res {
        Ok(rows) => debug!(
            "event=sql module=executor status=ok rows={} duration_ms={} sql={}",
            rows.len(),
            started_at.elapsed().as_millis(),
            stmt.render(flavor)
        ),
        Err(err) => debug!(
            "event=sql module=executor status=error duration_ms={} sql={} error={}",
            started_at.elapsed().as_millis(),
            stmt.render(flavor),
            err
        ),
    }
    res
}

fn collect_rows(conn: &Connection, stmt: &Statement) -> Result<Vec<Row>> {
    let mut prepared = conn.prepare(&stmt.sql)?;
    let columns: Vec<String> = prepared
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = prepared.query(params_from_iter(stmt.args.iter()))?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(SqlValue::from_value_ref(r.get_ref(i)?));
        }
        out.push(Row {
            columns: columns.clone(),
            values,
        });
    }
    Ok(out)
}
