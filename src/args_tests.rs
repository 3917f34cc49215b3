#[cfg(test)]
mod tests {
    use crate::args::{Args, CompileError};
    use crate::flavor::Flavor;
    use crate::modifiers::{Arg, list, raw, tuple};
    use pretty_assertions::assert_eq;

    #[test]
    fn compile_placeholders_per_flavor() {
        let mut args = Args::default();
        let a = args.add(1_i64);
        let b = args.add("x");
        let fmt = format!("a = {a} AND b = {b} AND c = $$5");

        let (sql, values) = args.compile_with_flavor(&fmt, Flavor::MySQL, &[]);
        assert_eq!(sql, "a = ? AND b = ? AND c = $5");
        assert_eq!(values, vec![Arg::from(1_i64), Arg::from("x")]);

        let (sql, _) = args.compile_with_flavor(&fmt, Flavor::PostgreSQL, &[]);
        assert_eq!(sql, "a = $1 AND b = $2 AND c = $5");
    }

    #[test]
    fn compile_expands_lists_raw_and_invalid_refs() {
        let mut args = Args::default();
        let l = args.add(tuple([1_i64, 2, 3]));
        let v = args.add(list(["a", "b"]));
        let r = args.add(raw("NOW()"));
        let fmt = format!("id IN {l} AND tag IN ({v}) AND t < {r} AND x = $9");

        let (sql, values) = args.compile_with_flavor(&fmt, Flavor::PostgreSQL, &[]);
        assert_eq!(
            sql,
            "id IN ($1, $2, $3) AND tag IN ($4, $5) AND t < NOW() AND x = /* INVALID ARG $9 */"
        );
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn initial_values_shift_postgres_indexes() {
        let mut args = Args::default();
        let a = args.add(7_i64);
        let (sql, values) =
            args.compile_with_flavor(&format!("x = {a}"), Flavor::PostgreSQL, &[Arg::from(1_i64)]);
        assert_eq!(sql, "x = $2");
        assert_eq!(values, vec![Arg::from(1_i64), Arg::from(7_i64)]);
    }

    #[test]
    fn bind_positional_replaces_unquoted_marks() {
        let mut args = Args::default();
        let expr = args
            .bind_positional(
                "name = ? AND note <> '?' AND price > $? AND age IN ?",
                vec![Arg::from("jinzhu"), Arg::from(3_i64), tuple([18_i64, 20])],
            )
            .unwrap();
        assert_eq!(expr, "name = $0 AND note <> '?' AND price > $$$1 AND age IN $2");

        let (sql, values) = args.compile(&expr, &[]);
        assert_eq!(
            sql,
            "name = ? AND note <> '?' AND price > $? AND age IN (?, ?)"
        );
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn bind_positional_rejects_arg_count_mismatch() {
        let mut args = Args::default();
        assert_eq!(
            args.bind_positional("a = ? AND b = ?", vec![Arg::from(1_i64)]),
            Err(CompileError::ArgCount {
                placeholders: 2,
                args: 1
            })
        );
    }
}
