//! 连接与映射设置。
//!
//! `Settings` 由调用方显式构造（或用 `Settings::load` 从配置文件 + 环境变量解析），
//! 再交给 `Db::open`；库内部没有进程级的配置单例。

use crate::error::Result;
use crate::flavor::Flavor;
use crate::naming::NamingStrategy;
use config::{Config, Environment, File};
use serde::Deserialize;

/// 映射层设置。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite 文件路径，`:memory:` 表示内存库。
    pub dsn: String,
    pub flavor: Flavor,
    pub naming: NamingStrategy,
    /// `create_batch` 每条 INSERT 最多包含的行数。
    pub create_batch_size: usize,
    /// 关闭多语句写入的默认事务。
    pub skip_default_transaction: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dsn: ":memory:".to_string(),
            flavor: Flavor::SQLite,
            naming: NamingStrategy::default(),
            create_batch_size: 100,
            skip_default_transaction: false,
        }
    }
}

impl Settings {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// 从 `path`（可缺失，格式按扩展名识别）与 `HALO_ORM__*` 环境变量加载。
    ///
    /// 环境变量优先，例如 `HALO_ORM__DSN`、`HALO_ORM__NAMING__TABLE_PREFIX`。
    pub fn load(path: &str) -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("HALO_ORM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}
