//! SQL Flavor（方言）：控制标识符引号、占位符、插值等行为。

use serde::Deserialize;
use std::fmt;

/// 支持的数据库方言。
///
/// 执行层目前只驱动 SQLite；MySQL/PostgreSQL 仅用于生成 SQL 与 DDL。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[serde(alias = "MySQL")]
    MySQL,
    #[serde(alias = "postgres", alias = "PostgreSQL")]
    PostgreSQL,
    #[default]
    #[serde(alias = "SQLite")]
    SQLite,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "SQLite",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InterpolateError {
    #[error("not enough args when interpolating")]
    MissingArgs,
    #[error("unsupported args when interpolating")]
    UnsupportedArgs,
}

impl Flavor {
    /// 为标识符加引号；标识符内的引号字符加倍。
    pub fn quote(self, name: &str) -> String {
        match self {
            Self::MySQL => format!("`{}`", name.replace('`', "``")),
            Self::PostgreSQL | Self::SQLite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// 普通标识符（可带 `schema.` 前缀）加引号；表达式、已加引号的名字原样返回。
    pub fn quote_ident(self, name: &str) -> String {
        if !name.split('.').all(is_plain_ident) {
            return name.to_string();
        }
        name.split('.')
            .map(|part| self.quote(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// 第 `idx`（从 1 开始）个参数的占位符。
    pub(crate) fn placeholder(self, idx: usize) -> String {
        match self {
            Self::MySQL | Self::SQLite => "?".to_string(),
            Self::PostgreSQL => format!("${idx}"),
        }
    }

    /// 当前方言是否支持 `ALTER TABLE ... ADD COLUMN` 时附带 `NOT NULL` 而无默认值。
    pub(crate) fn add_column_requires_default(self) -> bool {
        matches!(self, Self::SQLite)
    }
}

fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
