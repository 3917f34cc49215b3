//! 宏集合：为 builder 提供可变参数调用封装。
//! 通过 `select_cols!` / `where_exprs!` 等宏，可以使用不定长字符串参数而无需手动创建 `Vec`。

#[doc(hidden)]
#[macro_export]
macro_rules! __collect_strings {
    () => {
        Vec::<String>::new()
    };
    ($($value:expr),+ $(,)?) => {{
        let mut values = Vec::<String>::new();
        $(
            $crate::macros::extend_into_strings($value, &mut values);
        )*
        values
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __builder_with_strings {
    ($builder:expr, $method:ident $(, $arg:expr)* $(,)?) => {
        $builder.$method($crate::__collect_strings!($($arg),*))
    };
}

pub trait IntoStrings {
    fn extend_into_strings(self, dst: &mut Vec<String>);
}

impl IntoStrings for String {
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.push(self);
    }
}

impl IntoStrings for &str {
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.push(self.to_string());
    }
}

impl<const N: usize, T> IntoStrings for [T; N]
where
    T: Into<String>,
{
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.extend(self.into_iter().map(Into::into));
    }
}

impl<T> IntoStrings for &[T]
where
    T: Into<String> + Clone,
{
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.extend(self.iter().cloned().map(Into::into));
    }
}

impl<T> IntoStrings for Vec<T>
where
    T: Into<String>,
{
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.extend(self.into_iter().map(Into::into));
    }
}

#[doc(hidden)]
pub fn extend_into_strings<T>(value: T, dst: &mut Vec<String>)
where
    T: IntoStrings,
{
    value.extend_into_strings(dst);
}

pub fn collect_into_strings<T>(value: T) -> Vec<String>
where
    T: IntoStrings,
{
    let mut dst = Vec::new();
    value.extend_into_strings(&mut dst);
    dst
}

/// 为 `SelectBuilder::select` 提供可变参数调用。
#[macro_export]
macro_rules! select_cols {
    ($builder:expr $(, $col:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, select $(, $col)*)
    };
}

/// 为 `SelectBuilder::from` 提供可变参数调用。
#[macro_export]
macro_rules! from_tables {
    ($builder:expr $(, $table:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, from $(, $table)*)
    };
}

/// 为所有 `where_` 调用提供可变参数调用（Select/Update/Delete）。
#[macro_export]
macro_rules! where_exprs {
    ($builder:expr $(, $expr:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, where_ $(, $expr)*)
    };
}

/// 为 `order_by` 提供可变参数调用。
#[macro_export]
macro_rules! order_by_cols {
    ($builder:expr $(, $col:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, order_by $(, $col)*)
    };
}

/// 为 `InsertBuilder::cols` 提供可变参数调用。
#[macro_export]
macro_rules! insert_cols {
    ($builder:expr $(, $col:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, cols $(, $col)*)
    };
}

/// 为 `UpdateBuilder::set` 提供可变参数调用。
#[macro_export]
macro_rules! update_set {
    ($builder:expr $(, $assignment:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, set $(, $assignment)*)
    };
}

/// 为 `CreateTableBuilder::define` 提供可变参数调用。
#[macro_export]
macro_rules! create_table_define {
    ($builder:expr $(, $def:expr)* $(,)?) => {
        $crate::__builder_with_strings!($builder, define $(, $def)*)
    };
}
