//! 命名策略：把 record 形状名与字段名映射为表名与列名。

use serde::Deserialize;
use std::collections::BTreeMap;

/// 表名/列名命名策略。
///
/// 表名默认规则为 `table_prefix + pluralize(snake_case(shape))`，
/// `singular_table` 为真时不做复数化；`table_overrides` 以形状名为 key 直接指定表名。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct NamingStrategy {
    pub table_prefix: String,
    pub singular_table: bool,
    pub table_overrides: BTreeMap<String, String>,
}

impl NamingStrategy {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn singular(mut self, singular: bool) -> Self {
        self.singular_table = singular;
        self
    }

    pub fn override_table(mut self, shape: impl Into<String>, table: impl Into<String>) -> Self {
        self.table_overrides.insert(shape.into(), table.into());
        self
    }

    pub fn table_name(&self, shape: &str) -> String {
        if let Some(t) = self.table_overrides.get(shape) {
            return t.clone();
        }
        let base = snake_case(shape);
        let base = if self.singular_table {
            base
        } else {
            pluralize(&base)
        };
        format!("{}{}", self.table_prefix, base)
    }

    pub fn column_name(&self, field: &str) -> String {
        snake_case(field)
    }
}

/// 把 `CamelCase` 转为 `snake_case`；已经是 snake_case 的输入保持不变。
///
/// 单词边界：`aB`、`1B`、`ABc`（首字母缩写后接新单词）。
pub fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                let p = chars[i - 1];
                let next_is_lower = chars
                    .get(i + 1)
                    .is_some_and(|n| n.is_ascii_lowercase());
                let boundary = p.is_ascii_lowercase()
                    || p.is_ascii_digit()
                    || (p.is_ascii_uppercase() && next_is_lower);
                if boundary && !out.ends_with('_') {
                    out.push('_');
                }
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
];

/// 英文名词复数化（仅处理最后一个单词）。
pub fn pluralize(s: &str) -> String {
    let (head, last) = match s.rfind('_') {
        Some(i) => s.split_at(i + 1),
        None => ("", s),
    };
    if last.is_empty() {
        return s.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(single, _)| *single == last) {
        return format!("{head}{plural}");
    }

    let plural = if ["s", "x", "z", "ch", "sh"].iter().any(|suf| last.ends_with(suf)) {
        format!("{last}es")
    } else if let Some(stem) = last.strip_suffix('y')
        && stem
            .chars()
            .last()
            .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
    {
        format!("{stem}ies")
    } else {
        format!("{last}s")
    };
    format!("{head}{plural}")
}
