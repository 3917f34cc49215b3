#[cfg(test)]
mod tests {
    use crate::args::Args;
    use crate::cond::Cond;
    use crate::flavor::Flavor;
    use crate::modifiers::Arg;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct TestPair {
        expected: &'static str,
        actual: String,
    }

    fn new_test_pair(expected: &'static str, f: impl FnOnce(&Cond) -> String) -> TestPair {
        let args = Rc::new(RefCell::new(Args::default()));
        let cond = Cond::with_args(args.clone());
        let fmt = f(&cond);
        let (sql, _) = args
            .borrow()
            .compile_with_flavor(&fmt, Flavor::PostgreSQL, &[]);
        TestPair {
            expected,
            actual: sql,
        }
    }

    #[test]
    fn cond_operators() {
        let cases = vec![
            new_test_pair("name = $1", |c| c.equal("name", "jinzhu")),
            new_test_pair("name = $1", |c| c.eq("name", "jinzhu")),
            new_test_pair("name <> $1", |c| c.not_equal("name", "jinzhu")),
            new_test_pair("name <> $1", |c| c.ne("name", "jinzhu")),
            new_test_pair("age > $1", |c| c.greater_than("age", 18)),
            new_test_pair("age > $1", |c| c.gt("age", 18)),
            new_test_pair("age >= $1", |c| c.greater_equal_than("age", 18)),
            new_test_pair("age >= $1", |c| c.gte("age", 18)),
            new_test_pair("age < $1", |c| c.less_than("age", 18)),
            new_test_pair("age < $1", |c| c.lt("age", 18)),
            new_test_pair("age <= $1", |c| c.less_equal_than("age", 18)),
            new_test_pair("age <= $1", |c| c.lte("age", 18)),
            new_test_pair("id IN ($1, $2, $3)", |c| c.in_("id", [1, 2, 3])),
            new_test_pair("0 = 1", |c| c.in_("id", Vec::<i64>::new())),
            new_test_pair("id NOT IN ($1, $2)", |c| c.not_in("id", [1, 2])),
            new_test_pair("0 = 0", |c| c.not_in("id", Vec::<i64>::new())),
            new_test_pair("name LIKE $1", |c| c.like("name", "%jin%")),
            new_test_pair("name NOT LIKE $1", |c| c.not_like("name", "%jin%")),
            new_test_pair("email IS NULL", |c| c.is_null("email")),
            new_test_pair("email IS NOT NULL", |c| c.is_not_null("email")),
            new_test_pair("age BETWEEN $1 AND $2", |c| c.between("age", 18, 30)),
            new_test_pair("age NOT BETWEEN $1 AND $2", |c| {
                c.not_between("age", 18, 30)
            }),
            new_test_pair("NOT 1 = 1", |c| c.not("1 = 1")),
            new_test_pair("$1", |c| c.var(123)),
            new_test_pair("", |c| c.equal("", 1)),
        ];

        for p in cases {
            assert_eq!(p.actual, p.expected);
        }
    }

    #[test]
    fn or_and_group_non_empty_exprs() {
        let args = Rc::new(RefCell::new(Args::default()));
        let c = Cond::with_args(args.clone());
        let expr = c.or([
            c.equal("name", "jinzhu"),
            String::new(),
            c.and([c.gt("age", 18), c.lt("age", 30)]),
        ]);
        let (sql, values) = args.borrow().compile(&expr, &[]);
        assert_eq!(sql, "(name = ? OR (age > ? AND age < ?))");
        assert_eq!(
            values,
            vec![Arg::from("jinzhu"), Arg::from(18), Arg::from(30)]
        );
        assert_eq!(c.or(Vec::<String>::new()), "");
    }

    #[test]
    fn bind_positional_fragment() {
        let args = Rc::new(RefCell::new(Args::default()));
        let c = Cond::with_args(args.clone());
        let first = c.equal("role", "admin");
        let bound = c
            .bind("age > ? AND name <> '?' AND tag = ?", [Arg::from(18), Arg::from("x")])
            .unwrap();
        let expr = c.and([first, bound]);
        let (sql, values) = args
            .borrow()
            .compile_with_flavor(&expr, Flavor::PostgreSQL, &[]);
        assert_eq!(sql, "(role = $1 AND age > $2 AND name <> '?' AND tag = $3)");
        assert_eq!(
            values,
            vec![Arg::from("admin"), Arg::from(18), Arg::from("x")]
        );

        let err = c.bind("a = ? AND b = ?", [Arg::from(1)]).unwrap_err();
        assert!(matches!(
            err,
            crate::args::CompileError::ArgCount {
                placeholders: 2,
                args: 1
            }
        ));
    }
}
