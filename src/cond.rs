//! Cond：用于构造 WHERE 条件表达式。
//!
//! 每个方法把值放入共享的 `Args` 并返回带 `$n` 占位符的表达式字符串，
//! 由所属 builder 在 build 时统一编译。

use crate::args::{Args, CompileError};
use crate::macros::{IntoStrings, collect_into_strings};
use crate::modifiers::Arg;
use crate::string_builder::StringBuilder;
use std::cell::RefCell;
use std::rc::Rc;

pub type ArgsRef = Rc<RefCell<Args>>;

/// Cond 提供构造条件表达式的辅助方法。
#[derive(Debug, Clone)]
pub struct Cond {
    pub(crate) args: ArgsRef,
}

impl Default for Cond {
    fn default() -> Self {
        Self::new()
    }
}

impl Cond {
    pub fn new() -> Self {
        Self {
            args: Rc::new(RefCell::new(Args::default())),
        }
    }

    pub(crate) fn with_args(args: ArgsRef) -> Self {
        Self { args }
    }

    /// Var：把值放进 Args，返回 `$n` 占位符。
    pub fn var(&self, value: impl Into<Arg>) -> String {
        self.args.borrow_mut().add(value)
    }

    /// 绑定 `?` 风格的表达式片段，参数按出现顺序进入 Args。
    pub fn bind(
        &self,
        expr: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<String, CompileError> {
        self.args.borrow_mut().bind_positional(expr, args)
    }

    fn binary(&self, field: &str, op: &str, value: impl Into<Arg>) -> String {
        if field.is_empty() {
            return String::new();
        }
        format!("{field} {op} {}", self.var(value))
    }

    pub fn equal(&self, field: &str, value: impl Into<Arg>) -> String {
        self.binary(field, "=", value)
    }
    pub fn eq(&self, field: &str, value: impl Into<Arg>) -> String {
        self.equal(field, value)
    }

    pub fn not_equal(&self, field: &str, value: impl Into<Arg>) -> String {
        self.binary(field, "<>", value)
    }
    pub fn ne(&self, field: &str, value: impl Into<Arg>) -> String {
        self.not_equal(field, value)
    }

    pub fn greater_than(&self, field: &str, value: impl Into<Arg>) -> String {
        self.binary(field, ">", value)
    }
    pub fn gt(&self, field: &str, value: impl Into<Arg>) -> String {
        self.greater_than(field, value)
    }

    pub fn greater_equal_than(&self, field: &str, value: impl Into<Arg>) -> String {
        self.binary(field, ">=", value)
    }
    pub fn gte(&self, field: &str, value: impl Into<Arg>) -> String {
        self.greater_equal_than(field, value)
    }

    pub fn less_than(&self, field: &str, value: impl Into<Arg>) -> String {
        self.binary(field, "<", value)
    }
    pub fn lt(&self, field: &str, value: impl Into<Arg>) -> String {
        self.less_than(field, value)
    }

    pub fn less_equal_than(&self, field: &str, value: impl Into<Arg>) -> String {
        self.binary(field, "<=", value)
    }
    pub fn lte(&self, field: &str, value: impl Into<Arg>) -> String {
        self.less_equal_than(field, value)
    }

    pub fn like(&self, field: &str, value: impl Into<Arg>) -> String {
        self.binary(field, "LIKE", value)
    }

    pub fn not_like(&self, field: &str, value: impl Into<Arg>) -> String {
        self.binary(field, "NOT LIKE", value)
    }

    pub fn is_null(&self, field: &str) -> String {
        if field.is_empty() {
            return String::new();
        }
        format!("{field} IS NULL")
    }

    pub fn is_not_null(&self, field: &str) -> String {
        if field.is_empty() {
            return String::new();
        }
        format!("{field} IS NOT NULL")
    }

    pub fn between(&self, field: &str, lower: impl Into<Arg>, upper: impl Into<Arg>) -> String {
        if field.is_empty() {
            return String::new();
        }
        format!(
            "{field} BETWEEN {} AND {}",
            self.var(lower),
            self.var(upper)
        )
    }

    pub fn not_between(
        &self,
        field: &str,
        lower: impl Into<Arg>,
        upper: impl Into<Arg>,
    ) -> String {
        if field.is_empty() {
            return String::new();
        }
        format!(
            "{field} NOT BETWEEN {} AND {}",
            self.var(lower),
            self.var(upper)
        )
    }

    /// `field IN (...)`；空集合永远为假。
    pub fn in_(&self, field: &str, values: impl IntoIterator<Item = impl Into<Arg>>) -> String {
        if field.is_empty() {
            return String::new();
        }
        let vals: Vec<String> = values.into_iter().map(|v| self.var(v)).collect();
        if vals.is_empty() {
            return "0 = 1".to_string();
        }
        format!("{field} IN ({})", vals.join(", "))
    }

    /// `field NOT IN (...)`；空集合永远为真。
    pub fn not_in(&self, field: &str, values: impl IntoIterator<Item = impl Into<Arg>>) -> String {
        if field.is_empty() {
            return String::new();
        }
        let vals: Vec<String> = values.into_iter().map(|v| self.var(v)).collect();
        if vals.is_empty() {
            return "0 = 0".to_string();
        }
        format!("{field} NOT IN ({})", vals.join(", "))
    }

    pub fn or<T>(&self, exprs: T) -> String
    where
        T: IntoStrings,
    {
        self.group(exprs, " OR ")
    }

    pub fn and<T>(&self, exprs: T) -> String
    where
        T: IntoStrings,
    {
        self.group(exprs, " AND ")
    }

    fn group<T: IntoStrings>(&self, exprs: T, sep: &str) -> String {
        let exprs = collect_into_strings(exprs);
        if exprs.iter().all(|s| s.is_empty()) {
            return String::new();
        }
        let mut buf = StringBuilder::new();
        buf.write_str("(");
        buf.write_strings(&exprs, sep);
        buf.write_str(")");
        buf.into_string()
    }

    pub fn not(&self, expr: impl Into<String>) -> String {
        let expr = expr.into();
        if expr.is_empty() {
            return String::new();
        }
        format!("NOT {expr}")
    }
}
