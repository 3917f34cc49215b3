//! SQL 插值：将 `sql` 中的占位符替换为参数字面量。
//!
//! 插值结果只用于日志与 DDL 的 `DEFAULT` 子句，执行语句始终走参数绑定。

use crate::flavor::{Flavor, InterpolateError};
use crate::value::SqlValue;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

impl Flavor {
    pub fn interpolate(self, sql: &str, args: &[SqlValue]) -> Result<String, InterpolateError> {
        match self {
            Flavor::MySQL | Flavor::SQLite => question_interpolate(self, sql, args),
            Flavor::PostgreSQL => dollar_interpolate(sql, args),
        }
    }

    /// 把单个值渲染为当前方言下的 SQL 字面量。
    pub fn literal(self, v: &SqlValue) -> Result<String, InterpolateError> {
        let mut out = String::new();
        encode_sql_value(&mut out, v, self)?;
        Ok(out)
    }
}

fn question_interpolate(
    flavor: Flavor,
    query: &str,
    args: &[SqlValue],
) -> Result<String, InterpolateError> {
    let mut out = String::with_capacity(query.len() + args.len() * 20);
    let mut quote: Option<char> = None;
    let mut escaping = false;
    let mut arg_idx = 0usize;

    for c in query.chars() {
        if escaping {
            out.push(c);
            escaping = false;
            continue;
        }

        match c {
            '\\' if quote.is_some() && flavor == Flavor::MySQL => {
                out.push(c);
                escaping = true;
            }
            '\'' | '"' | '`' => {
                if quote == Some(c) {
                    quote = None;
                } else if quote.is_none() {
                    quote = Some(c);
                }
                out.push(c);
            }
            '?' if quote.is_none() => {
                let v = args.get(arg_idx).ok_or(InterpolateError::MissingArgs)?;
                encode_sql_value(&mut out, v, flavor)?;
                arg_idx += 1;
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn dollar_interpolate(query: &str, args: &[SqlValue]) -> Result<String, InterpolateError> {
    let mut out = String::with_capacity(query.len() + args.len() * 20);
    let mut quote: Option<char> = None;

    let bytes = query.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\'' | b'"' => {
                let ch = c as char;
                if quote == Some(ch) {
                    quote = None;
                } else if quote.is_none() {
                    quote = Some(ch);
                }
                out.push(ch);
                i += 1;
            }
            b'$' if quote.is_none() => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                if digits == 0 {
                    out.push('$');
                    i += 1;
                    continue;
                }
                let n: usize = query[i + 1..i + 1 + digits]
                    .parse()
                    .map_err(|_| InterpolateError::UnsupportedArgs)?;
                let v = n
                    .checked_sub(1)
                    .and_then(|idx| args.get(idx))
                    .ok_or(InterpolateError::MissingArgs)?;
                encode_sql_value(&mut out, v, Flavor::PostgreSQL)?;
                i += 1 + digits;
            }
            _ => {
                // 按字符推进，保持多字节 UTF-8 完整
                let ch_len = query[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&query[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    Ok(out)
}

pub(crate) fn encode_sql_value(
    out: &mut String,
    v: &SqlValue,
    flavor: Flavor,
) -> Result<(), InterpolateError> {
    match v {
        SqlValue::Null => out.push_str("NULL"),
        SqlValue::Bool(b) => match flavor {
            Flavor::SQLite => out.push_str(if *b { "1" } else { "0" }),
            _ => out.push_str(if *b { "TRUE" } else { "FALSE" }),
        },
        SqlValue::I64(n) => out.push_str(&n.to_string()),
        SqlValue::U64(n) => out.push_str(&n.to_string()),
        SqlValue::F64(n) => out.push_str(&n.to_string()),
        SqlValue::String(s) => quote_string(out, s.as_ref(), flavor),
        SqlValue::Bytes(b) => encode_bytes(out, b, flavor),
        SqlValue::DateTime(dt) => encode_datetime(out, dt, flavor)?,
    }
    Ok(())
}

fn encode_bytes(out: &mut String, data: &[u8], flavor: Flavor) {
    if data.is_empty() {
        out.push_str("NULL");
        return;
    }

    match flavor {
        Flavor::MySQL | Flavor::SQLite => {
            out.push_str("X'");
            push_hex(out, data);
            out.push('\'');
        }
        Flavor::PostgreSQL => {
            out.push_str("E'\\\\x");
            push_hex(out, data);
            out.push_str("'::bytea");
        }
    }
}

fn push_hex(out: &mut String, data: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for &b in data {
        out.push(HEX[((b >> 4) & 0xF) as usize] as char);
        out.push(HEX[(b & 0xF) as usize] as char);
    }
}

fn quote_string(out: &mut String, s: &str, flavor: Flavor) {
    if flavor == Flavor::SQLite {
        // SQLite 不识别反斜杠转义，只能用 '' 表示 '
        out.push('\'');
        out.push_str(&s.replace('\'', "''"));
        out.push('\'');
        return;
    }

    if flavor == Flavor::PostgreSQL {
        out.push('E');
    }

    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\u{0000}' => out.push_str("\\0"),
            '\u{0008}' => out.push_str("\\b"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{001a}' => out.push_str("\\Z"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
}

fn encode_datetime(
    out: &mut String,
    dt: &OffsetDateTime,
    flavor: Flavor,
) -> Result<(), InterpolateError> {
    let formatted = match flavor {
        // 与驱动层保持一致：SQLite 中时间以 RFC 3339 文本保存
        Flavor::SQLite => dt.format(&Rfc3339),
        Flavor::MySQL => dt.format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
        )),
        Flavor::PostgreSQL => dt.format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6] [offset_hour sign:mandatory]:[offset_minute]"
        )),
    }
    .map_err(|_| InterpolateError::UnsupportedArgs)?;

    out.push('\'');
    out.push_str(&formatted);
    out.push('\'');
    Ok(())
}
