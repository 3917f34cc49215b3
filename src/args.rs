//! Args：存储参数并把含 `$` 语法的 format 编译成最终 SQL。

use crate::flavor::Flavor;
use crate::modifiers::{Arg, Raw};
use crate::string_builder::StringBuilder;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("expression has {placeholders} `?` placeholders but {args} args were given")]
    ArgCount { placeholders: usize, args: usize },
}

/// Args 存储 SQL 相关参数。
///
/// 写入 format 的占位符是内部形式 `$0/$1/...`，`$$` 表示字面量 `$`；
/// 编译时按 flavor 输出最终占位符。
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// 默认 flavor，用于 `compile`。
    pub flavor: Flavor,

    pub(crate) arg_values: Vec<Arg>,
}

impl Args {
    pub fn with_flavor(flavor: Flavor) -> Self {
        Self {
            flavor,
            arg_values: Vec::new(),
        }
    }

    /// Add：追加一个参数并返回内部占位符（`$0/$1/...`）。
    pub fn add(&mut self, arg: impl Into<Arg>) -> String {
        let idx = self.arg_values.len();
        self.arg_values.push(arg.into());
        format!("${idx}")
    }

    /// 把 `?` 风格的表达式绑定到当前 Args。
    ///
    /// 引号内的 `?` 保持原样；表达式中的 `$` 会被转义。
    pub fn bind_positional(
        &mut self,
        expr: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<String, CompileError> {
        let args: Vec<Arg> = args.into_iter().collect();
        let mut out = StringBuilder::new();
        let mut quote: Option<char> = None;
        let mut used = 0usize;

        for c in expr.chars() {
            match c {
                '\'' | '"' | '`' => {
                    if quote == Some(c) {
                        quote = None;
                    } else if quote.is_none() {
                        quote = Some(c);
                    }
                    out.write_char(c);
                }
                '$' => out.write_str("$$"),
                '?' if quote.is_none() => {
                    if let Some(a) = args.get(used) {
                        let ph = self.add(a.clone());
                        out.write_str(&ph);
                    }
                    used += 1;
                }
                _ => out.write_char(c),
            }
        }

        if used != args.len() {
            return Err(CompileError::ArgCount {
                placeholders: used,
                args: args.len(),
            });
        }
        Ok(out.into_string())
    }

    /// Compile：按默认 flavor 编译 format。
    pub fn compile(&self, format: &str, initial_value: &[Arg]) -> (String, Vec<Arg>) {
        self.compile_with_flavor(format, self.flavor, initial_value)
    }

    /// CompileWithFlavor：编译 format，并用 `flavor` 输出最终占位符。
    pub fn compile_with_flavor(
        &self,
        format: &str,
        flavor: Flavor,
        initial_value: &[Arg],
    ) -> (String, Vec<Arg>) {
        let mut ctx = CompileContext {
            buf: StringBuilder::new(),
            flavor,
            values: initial_value.to_vec(),
        };

        let mut rest = format;
        while let Some(pos) = rest.find('$') {
            if pos > 0 {
                ctx.buf.write_str(&rest[..pos]);
            }
            rest = &rest[pos + 1..];

            match rest.as_bytes().first() {
                None => {
                    ctx.buf.write_char('$');
                    break;
                }
                Some(b'$') => {
                    ctx.buf.write_char('$');
                    rest = &rest[1..];
                }
                Some(b) if b.is_ascii_digit() => {
                    rest = self.compile_digits(&mut ctx, rest);
                }
                Some(_) => ctx.buf.write_char('$'),
            }
        }

        if !rest.is_empty() {
            ctx.buf.write_str(rest);
        }

        (ctx.buf.into_string(), ctx.values)
    }

    fn compile_digits<'a>(&self, ctx: &mut CompileContext, format: &'a str) -> &'a str {
        let end = format
            .as_bytes()
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let (digits, rest) = format.split_at(end);

        match digits.parse::<usize>().ok().and_then(|i| self.arg_values.get(i)) {
            Some(arg) => ctx.write_value(arg),
            None => {
                ctx.buf.write_str("/* INVALID ARG $");
                ctx.buf.write_str(digits);
                ctx.buf.write_str(" */");
            }
        }
        rest
    }
}

#[derive(Debug)]
struct CompileContext {
    buf: StringBuilder,
    flavor: Flavor,
    values: Vec<Arg>,
}

impl CompileContext {
    fn write_value(&mut self, arg: &Arg) {
        match arg {
            Arg::Builder(b) => {
                let (sql, args) = b.build_with_flavor(self.flavor, &self.values);
                self.buf.write_str(&sql);
                self.values = args;
            }
            Arg::Raw(Raw { expr }) => self.buf.write_str(expr),
            Arg::List { args, is_tuple } => {
                if *is_tuple {
                    self.buf.write_char('(');
                }
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        self.buf.write_str(", ");
                    }
                    self.write_value(a);
                }
                if *is_tuple {
                    self.buf.write_char(')');
                }
            }
            Arg::Value(_) => {
                let ph = self.flavor.placeholder(self.values.len() + 1);
                self.buf.write_str(&ph);
                self.values.push(arg.clone());
            }
        }
    }
}
