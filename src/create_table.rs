//! DDL builders：CREATE TABLE / ALTER TABLE ADD COLUMN / DROP TABLE。
//!
//! DDL 不产生参数占位符，默认值等字面量由调用方预先渲染。

use crate::args::Args;
use crate::flavor::Flavor;
use crate::macros::{IntoStrings, collect_into_strings};
use crate::modifiers::{Arg, Builder, escape};
use crate::string_builder::StringBuilder;

#[derive(Debug, Clone, Default)]
pub struct CreateTableBuilder {
    if_not_exists: bool,
    table: Option<String>,
    defs: Vec<Vec<String>>,
    options: Vec<Vec<String>>,

    args: Args,
}

impl CreateTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flavor(&mut self, flavor: Flavor) -> Flavor {
        std::mem::replace(&mut self.args.flavor, flavor)
    }

    pub fn flavor(&self) -> Flavor {
        self.args.flavor
    }

    pub fn build(&self) -> (String, Vec<Arg>) {
        Builder::build(self)
    }

    pub fn create_table(&mut self, table: &str) -> &mut Self {
        self.table = Some(escape(table));
        self
    }

    pub fn if_not_exists(&mut self) -> &mut Self {
        self.if_not_exists = true;
        self
    }

    /// 定义一列或一个约束；多个片段用空格连接。
    pub fn define<T>(&mut self, def: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.defs.push(collect_into_strings(def));
        self
    }

    pub fn option<T>(&mut self, opt: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.options.push(collect_into_strings(opt));
        self
    }

    pub fn num_define(&self) -> usize {
        self.defs.len()
    }
}

impl Builder for CreateTableBuilder {
    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>) {
        let mut buf = StringBuilder::new();

        buf.write_leading("CREATE TABLE");
        if self.if_not_exists {
            buf.write_leading("IF NOT EXISTS");
        }
        if let Some(t) = &self.table {
            buf.write_leading(t);
        }

        if !self.defs.is_empty() {
            let defs: Vec<String> = self.defs.iter().map(|d| d.join(" ")).collect();
            buf.write_leading("(");
            buf.write_str(&defs.join(", "));
            buf.write_str(")");
        }

        if !self.options.is_empty() {
            let opts: Vec<String> = self.options.iter().map(|o| o.join(" ")).collect();
            buf.write_leading(&opts.join(", "));
        }

        self.args
            .compile_with_flavor(&buf.into_string(), flavor, initial_arg)
    }

    fn flavor(&self) -> Flavor {
        self.flavor()
    }
}

/// `ALTER TABLE t ADD COLUMN ...`，每个 builder 只添加一列。
#[derive(Debug, Clone, Default)]
pub struct AddColumnBuilder {
    table: String,
    def: Vec<String>,
    args: Args,
}

impl AddColumnBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: escape(table),
            ..Self::default()
        }
    }

    pub fn set_flavor(&mut self, flavor: Flavor) -> Flavor {
        std::mem::replace(&mut self.args.flavor, flavor)
    }

    pub fn define<T>(&mut self, def: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.def = collect_into_strings(def);
        self
    }
}

impl Builder for AddColumnBuilder {
    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>) {
        let mut buf = StringBuilder::new();
        buf.write_leading("ALTER TABLE");
        buf.write_leading(&self.table);
        buf.write_leading("ADD COLUMN");
        buf.write_leading(&self.def.join(" "));
        self.args
            .compile_with_flavor(&buf.into_string(), flavor, initial_arg)
    }

    fn flavor(&self) -> Flavor {
        self.args.flavor
    }
}

/// `DROP TABLE IF EXISTS t`。
#[derive(Debug, Clone, Default)]
pub struct DropTableBuilder {
    table: String,
    args: Args,
}

impl DropTableBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: escape(table),
            args: Args::default(),
        }
    }

    pub fn set_flavor(&mut self, flavor: Flavor) -> Flavor {
        std::mem::replace(&mut self.args.flavor, flavor)
    }
}

impl Builder for DropTableBuilder {
    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>) {
        let sql = format!("DROP TABLE IF EXISTS {}", self.table);
        self.args.compile_with_flavor(&sql, flavor, initial_arg)
    }

    fn flavor(&self) -> Flavor {
        self.args.flavor
    }
}
