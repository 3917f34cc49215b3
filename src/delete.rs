//! DeleteBuilder：构建 DELETE 语句。

use crate::args::Args;
use crate::cond::{ArgsRef, Cond};
use crate::flavor::Flavor;
use crate::macros::{IntoStrings, collect_into_strings};
use crate::modifiers::{Arg, Builder, escape};
use crate::string_builder::StringBuilder;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

#[derive(Debug)]
pub struct DeleteBuilder {
    args: ArgsRef,
    cond: Cond,

    table: Option<String>,
    where_exprs: Vec<String>,
}

impl Deref for DeleteBuilder {
    type Target = Cond;
    fn deref(&self) -> &Self::Target {
        &self.cond
    }
}

impl Default for DeleteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DeleteBuilder {
    fn clone(&self) -> Self {
        let args = Rc::new(RefCell::new(self.args.borrow().clone()));
        let cond = Cond::with_args(args.clone());
        Self {
            args,
            cond,
            table: self.table.clone(),
            where_exprs: self.where_exprs.clone(),
        }
    }
}

impl DeleteBuilder {
    pub fn new() -> Self {
        let args = Rc::new(RefCell::new(Args::default()));
        let cond = Cond::with_args(args.clone());
        Self {
            args,
            cond,
            table: None,
            where_exprs: Vec::new(),
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

    pub fn delete_from(&mut self, table: &str) -> &mut Self {
        self.table = Some(escape(table));
        self
    }

    pub fn where_<T>(&mut self, and_expr: T) -> &mut Self
    where
        T: IntoStrings,
    {
        self.where_exprs.extend(
            collect_into_strings(and_expr)
                .into_iter()
                .filter(|s| !s.is_empty()),
        );
        self
    }

    pub fn num_where(&self) -> usize {
        self.where_exprs.len()
    }
}

impl Builder for DeleteBuilder {
    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>) {
        let mut buf = StringBuilder::new();

        if let Some(t) = &self.table {
            buf.write_leading("DELETE FROM");
            buf.write_str(" ");
            buf.write_str(t);
        }

        if !self.where_exprs.is_empty() {
            buf.write_leading("WHERE");
            buf.write_str(" ");
            buf.write_strings(&self.where_exprs, " AND ");
        }

        self.args
            .borrow()
            .compile_with_flavor(&buf.into_string(), flavor, initial_arg)
    }

    fn flavor(&self) -> Flavor {
        self.flavor()
    }
}
