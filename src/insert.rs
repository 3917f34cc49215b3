//! InsertBuilder：构建 INSERT 语句。

use crate::args::Args;
use crate::flavor::Flavor;
use crate::macros::{IntoStrings, collect_into_strings};
use crate::modifiers::{Arg, Builder, escape};
use crate::string_builder::StringBuilder;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: Option<String>,
    cols: Vec<String>,
    values: Vec<Vec<String>>,

    args: Rc<RefCell<Args>>,
}

impl Default for InsertBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InsertBuilder {
    pub fn new() -> Self {
        Self {
            table: None,
            cols: Vec::new(),
            values: Vec::new(),
            args: Rc::new(RefCell::new(Args::default())),
        }
    }

    pub fn set_flavor(&mut self, flavor: Flavor) -> Flavor {
        let mut a = self.args.borrow_mut();
        let old = a.flavor;
        a.flavor = flavor;
        old
    }

    pub fn flavor(&self) -> Flavor {
        self.args.borrow().flavor
    }

    pub fn build(&self) -> (String, Vec<Arg>) {
        Builder::build(self)
    }

    fn var(&self, v: impl Into<Arg>) -> String {
        self.args.borrow_mut().add(v)
    }

    pub fn insert_into(&mut self, table: &str) -> &mut Self {
        self.table = Some(escape(table));
        self
    }

    pub fn cols<T>(&mut self, cols: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.cols = collect_into_strings(cols)
            .iter()
            .map(|c| escape(c))
            .collect();
        self
    }

    /// 追加一行 VALUES。
    pub fn values(&mut self, values: impl IntoIterator<Item = impl Into<Arg>>) -> &mut Self {
        let placeholders: Vec<String> = values.into_iter().map(|v| self.var(v.into())).collect();
        self.values.push(placeholders);
        self
    }

    pub fn num_rows(&self) -> usize {
        self.values.len()
    }
}

impl Builder for InsertBuilder {
    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>) {
        let mut buf = StringBuilder::new();

        if let Some(t) = &self.table {
            buf.write_leading("INSERT INTO");
            buf.write_str(" ");
            buf.write_str(t);
        }

        // 没有任何列：只能插入一行全默认值
        if self.cols.is_empty() {
            match flavor {
                Flavor::MySQL => buf.write_leading("VALUES ()"),
                Flavor::PostgreSQL | Flavor::SQLite => buf.write_leading("DEFAULT VALUES"),
            }
            return self
                .args
                .borrow()
                .compile_with_flavor(&buf.into_string(), flavor, initial_arg);
        }

        buf.write_str(" (");
        buf.write_str(&self.cols.join(", "));
        buf.write_str(")");

        if !self.values.is_empty() {
            buf.write_leading("VALUES");
            buf.write_str(" ");
            let rows: Vec<String> = self
                .values
                .iter()
                .map(|r| format!("({})", r.join(", ")))
                .collect();
            buf.write_str(&rows.join(", "));
        }

        self.args
            .borrow()
            .compile_with_flavor(&buf.into_string(), flavor, initial_arg)
    }

    fn flavor(&self) -> Flavor {
        self.flavor()
    }
}
