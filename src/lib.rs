//! halo-orm：struct 与表之间的映射层，建立在可组合的 SQL builder 之上。
//!
//! - `record!` 声明 struct 对应的表结构；
//! - `Migrator` 建表、补列；
//! - `Session`（`Db`/`Tx` 上的链式 API）负责增删改查、软删除与事务。

pub mod args;
#[cfg(test)]
mod args_tests;
pub mod chain;
#[cfg(test)]
mod chain_tests;
pub mod cond;
#[cfg(test)]
mod cond_tests;
pub mod config;
#[cfg(test)]
mod config_tests;
pub mod create_table;
pub mod delete;
pub mod error;
pub mod executor;
pub mod flavor;
pub mod insert;
pub mod interpolate;
pub mod macros;
pub use crate::macros::*;
#[cfg(test)]
mod macros_tests;
pub mod migrator;
pub mod modifiers;
pub mod naming;
pub mod query;
pub mod record;
pub mod schema;
pub mod select;
pub mod string_builder;
pub mod transaction;
#[cfg(test)]
mod transaction_tests;
pub mod update;
pub mod value;

pub use crate::args::{Args, CompileError};
pub use crate::chain::{Chain, RawQuery, Session};
pub use crate::cond::Cond;
pub use crate::config::Settings;
pub use crate::create_table::{AddColumnBuilder, CreateTableBuilder, DropTableBuilder};
pub use crate::delete::DeleteBuilder;
pub use crate::error::{Error, Result};
pub use crate::executor::{Db, ExecOutcome, Executor, Row, Statement};
pub use crate::flavor::{Flavor, InterpolateError};
pub use crate::insert::InsertBuilder;
pub use crate::migrator::{MigrateMode, MigrationReport, Migrator};
pub use crate::modifiers::{Arg, Builder, Raw, escape, flatten, list, raw, tuple};
pub use crate::naming::NamingStrategy;
pub use crate::query::Direction;
pub use crate::record::{FieldOpts, Record, SoftDeleteMode, TimeUnit, field};
pub use crate::schema::{Column, Descriptor, describe};
pub use crate::select::SelectBuilder;
pub use crate::transaction::{Tx, TxState};
pub use crate::update::UpdateBuilder;
pub use crate::value::{FromSqlValue, SqlValue, ValueMap};

/// 便捷导入：`use halo_orm::prelude::*;`。
pub mod prelude {
    pub use crate::{
        Db, Direction, Error, Executor, MigrateMode, Record, Session, Settings, SoftDeleteMode,
        SqlValue, TimeUnit, Tx, ValueMap, field, list, raw, record, tuple, value_map,
    };
}
