//! 错误类型：映射层所有操作统一返回 `Result<T, Error>`。

/// 映射层错误分类。
///
/// 只有 `RecordNotFound` 是调用方需要日常分支判断的条件，其余错误都应向上传递。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// record 声明不满足约束（例如声明了两个软删除列）。
    #[error("schema error: {0}")]
    Schema(String),

    /// DDL 执行失败；`statement` 为失败的那一条语句。
    #[error("migration failed at `{statement}`: {source}")]
    Migration {
        statement: String,
        #[source]
        source: Box<Error>,
    },

    /// 查询/写入参数冲突（例如同时指定 select 与 omit）。
    #[error("parameter error: {0}")]
    Parameter(String),

    /// 批量 update/delete 缺少 WHERE 条件且未开启 global update。
    #[error("WHERE conditions required")]
    MissingFilter,

    /// fetch-one 没有匹配的行。
    #[error("record not found")]
    RecordNotFound,

    /// 驱动/连接/约束错误。
    #[error("execution error: {0}")]
    Execution(#[from] rusqlite::Error),

    /// 结果列无法写回 record 字段。
    #[error("decode column `{column}` failed: {message}")]
    Decode { column: String, message: String },

    /// 事务已 commit/rollback 之后继续使用。
    #[error("invalid transaction state: {0}")]
    InvalidTransaction(&'static str),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn is_record_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound)
    }

    pub(crate) fn migration(statement: impl Into<String>, source: Error) -> Self {
        Self::Migration {
            statement: statement.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
