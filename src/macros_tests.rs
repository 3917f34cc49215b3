#[cfg(test)]
mod tests {
    use crate::modifiers::Arg;
    use crate::{CreateTableBuilder, DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn select_macro_variadic_builds_sql() {
        let mut sb = SelectBuilder::new();
        crate::select_cols!(sb, "id", "name");
        crate::from_tables!(sb, "t_users");
        crate::order_by_cols!(sb, "age DESC", "name");

        let (sql, args) = sb.build();
        assert_eq!(sql, "SELECT id, name FROM t_users ORDER BY age DESC, name");
        assert!(args.is_empty());
    }

    #[test]
    fn write_macros_accept_mixed_string_kinds() {
        let mut ib = InsertBuilder::new();
        ib.insert_into("t_users");
        crate::insert_cols!(ib, "name", String::from("age"));
        ib.values([Arg::from("jinzhu"), Arg::from(18_i64)]);
        assert_eq!(ib.build().0, "INSERT INTO t_users (name, age) VALUES (?, ?)");

        let mut ub = UpdateBuilder::new();
        ub.update("t_users");
        let a = ub.assign("name", "hello");
        let w = ub.equal("id", 1_i64);
        crate::update_set!(ub, a);
        crate::where_exprs!(ub, w);
        assert_eq!(ub.build().0, "UPDATE t_users SET name = ? WHERE id = ?");

        let mut db = DeleteBuilder::new();
        db.delete_from("t_users");
        let w = db.is_null("email");
        crate::where_exprs!(db, w);
        assert_eq!(db.build().0, "DELETE FROM t_users WHERE email IS NULL");
    }

    #[test]
    fn create_table_define_joins_one_column() {
        let mut ctb = CreateTableBuilder::new();
        ctb.create_table("t_tags");
        crate::create_table_define!(ctb, "slug", "TEXT", String::from("NOT NULL"));
        crate::create_table_define!(ctb, ["label", "TEXT"]);
        assert_eq!(ctb.num_define(), 2);
        assert_eq!(
            ctb.build().0,
            "CREATE TABLE t_tags (slug TEXT NOT NULL, label TEXT)"
        );
    }
}
