#[cfg(test)]
mod tests {
    use crate::chain::Session;
    use crate::error::{Error, Result};
    use crate::executor::Db;
    use crate::modifiers::tuple;
    use crate::query::Direction;
    use crate::value::SqlValue;
    use crate::value_map;
    use pretty_assertions::assert_eq;
    use time::OffsetDateTime;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct User {
        id: u64,
        name: String,
        age: u8,
        email: Option<String>,
        member_number: String,
        created_at: i64,
        updated_at: i64,
        deleted_at: i64,
    }

    impl User {
        fn default_age(&mut self) -> Result<()> {
            if self.age == 0 {
                self.age = 18;
            }
            Ok(())
        }
    }

    crate::record! {
        impl User in "t_users" {
            id: u64 = field(),
            name: String = field().not_null(),
            age: u8 = field(),
            email: Option<String> = field().default_value("default@gmail.com"),
            member_number: String = field(),
            created_at: i64 = field().auto_create_time(TimeUnit::Milliseconds),
            updated_at: i64 = field().auto_update_time(TimeUnit::Seconds),
            deleted_at: i64 = field().soft_delete(SoftDeleteMode::UnixSeconds),
        }
        before_create = User::default_age;
    }

    fn user(name: &str, age: u8) -> User {
        User {
            name: name.to_string(),
            age,
            ..User::default()
        }
    }

    fn setup() -> Db {
        let db = Db::open_in_memory().unwrap();
        db.migrator().auto_migrate::<User>().unwrap();
        db
    }

    fn seed(db: &Db) -> Vec<User> {
        let mut users = vec![
            user("jinzhu", 10),
            user("alice", 20),
            user("bob", 30),
            user("carol", 40),
        ];
        db.create_batch(&mut users).unwrap();
        users
    }

    fn names(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn fetch_one_on_empty_table_is_not_found() {
        let db = setup();
        assert!(db.first::<User>().unwrap_err().is_record_not_found());
        assert!(db.chain().last::<User>().unwrap_err().is_record_not_found());
        assert!(db.chain().take::<User>().unwrap_err().is_record_not_found());
        assert!(
            db.chain()
                .first_by_pk::<User>(1)
                .unwrap_err()
                .is_record_not_found()
        );
        assert!(matches!(
            db.table("t_users").first_row(),
            Err(Error::RecordNotFound)
        ));
    }

    #[test]
    fn fetch_many_on_empty_table_is_empty() {
        let db = setup();
        assert_eq!(db.find::<User>().unwrap(), Vec::<User>::new());
        assert!(db.table("t_users").find_rows().unwrap().is_empty());
        assert_eq!(db.model::<User>().count().unwrap(), 0);
        assert!(db.model::<User>().pluck::<String>("name").unwrap().is_empty());
    }

    #[test]
    fn create_backfills_pk_and_fills_defaults() {
        let db = setup();
        let mut u = user("jinzhu", 0);
        let out = db.create(&mut u).unwrap();
        assert_eq!(out.rows_affected, 1);
        assert_eq!(out.last_insert_id, Some(1));
        assert_eq!(u.id, 1);
        // hook 把零值 age 改成 18
        assert_eq!(u.age, 18);
        assert_eq!(u.email.as_deref(), Some("default@gmail.com"));
        assert!(u.created_at > 0);
        assert!(u.updated_at > 0);
        assert_eq!(u.deleted_at, 0);

        let stored: User = db.first().unwrap();
        assert_eq!(stored, u);
    }

    #[test]
    fn skip_hooks_leaves_record_untouched() {
        let db = setup();
        let mut u = user("raw", 0);
        db.chain().skip_hooks().create(&mut u).unwrap();
        let stored: User = db.chain().first_by_pk(u.id).unwrap();
        assert_eq!(stored.age, 0);
    }

    #[test]
    fn hook_error_aborts_create() {
        #[derive(Debug, Clone, Default)]
        struct Guarded {
            id: i64,
            name: String,
        }

        impl Guarded {
            fn reject_empty(&mut self) -> Result<()> {
                if self.name.is_empty() {
                    return Err(Error::Parameter("name required".to_string()));
                }
                Ok(())
            }
        }

        crate::record! {
            impl Guarded {
                id: i64 = field(),
                name: String = field(),
            }
            before_create = Guarded::reject_empty;
        }

        let db = Db::open_in_memory().unwrap();
        db.migrator().auto_migrate::<Guarded>().unwrap();
        let err = db.create(&mut Guarded::default()).unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
        assert_eq!(db.model::<Guarded>().count().unwrap(), 0);
    }

    #[test]
    fn batch_create_backfills_in_input_order() {
        let db = setup();
        let mut users: Vec<User> = (1..=5).map(|i| user(&format!("u{i}"), 20)).collect();
        let out = db.chain().create_in_batches(&mut users, 2).unwrap();
        assert_eq!(out.rows_affected, 5);
        assert_eq!(
            users.iter().map(|u| u.id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );

        let stored: Vec<User> = db.chain().order_by("id", Direction::Asc).find().unwrap();
        assert_eq!(stored, users);
    }

    #[test]
    fn explicit_pks_are_kept() {
        let db = setup();
        let mut users = vec![
            User {
                id: 10,
                ..user("ten", 1)
            },
            user("next", 2),
        ];
        db.create_batch(&mut users).unwrap();
        assert_eq!(users[0].id, 10);
        assert_eq!(users[1].id, 11);
        assert_eq!(
            db.chain().find_by_pks::<User, _>([10, 11]).unwrap().len(),
            2
        );
    }

    #[test]
    fn empty_batch_is_a_parameter_error() {
        let db = setup();
        let err = db.create_batch::<User>(&mut []).unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }

    #[test]
    fn first_last_and_take() {
        let db = setup();
        seed(&db);
        assert_eq!(db.first::<User>().unwrap().name, "jinzhu");
        assert_eq!(db.chain().last::<User>().unwrap().name, "carol");
        assert!(db.chain().take::<User>().is_ok());
        // 显式排序优先于主键排序
        let oldest: User = db.chain().order("age desc").first().unwrap();
        assert_eq!(oldest.name, "carol");
        let row = db.model::<User>().last_row().unwrap();
        assert_eq!(row.get("name"), Some(&SqlValue::from("carol")));
        assert!(db.model::<User>().take_row().is_ok());
    }

    #[test]
    fn filters_order_and_pagination() {
        let db = setup();
        seed(&db);

        let page: Vec<User> = db
            .chain()
            .where_raw("age > ?", [15])
            .order("age desc")
            .limit(2)
            .offset(1)
            .find()
            .unwrap();
        assert_eq!(names(&page), vec!["bob", "alice"]);

        // 多次 order 依次追加
        let a: Vec<User> = db.chain().order("age desc, name").find().unwrap();
        let b: Vec<User> = db.chain().order("age desc").order("name").find().unwrap();
        assert_eq!(a, b);

        let picked: Vec<User> = db
            .chain()
            .where_raw("name IN ?", [tuple(vec!["bob", "carol"])])
            .where_raw("age >= ? AND age <= ?", [30, 40])
            .order_by("name", Direction::Desc)
            .find()
            .unwrap();
        assert_eq!(names(&picked), vec!["carol", "bob"]);

        let none: Vec<User> = db.chain().where_eq("name", "nobody").find().unwrap();
        assert!(none.is_empty());

        let unlimited: Vec<User> = db.chain().limit(1).limit(-1).find().unwrap();
        assert_eq!(unlimited.len(), 4);
    }

    #[test]
    fn raw_fragment_with_wrong_arg_count_fails_at_terminal() {
        let db = setup();
        let err = db
            .chain()
            .where_raw("age > ? AND age < ?", [1])
            .find::<User>()
            .unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }

    #[test]
    fn struct_filter_skips_zero_fields_map_filter_does_not() {
        let db = setup();
        seed(&db);
        let mut zero = user("zero", 0);
        db.chain().skip_hooks().create(&mut zero).unwrap();

        // age 为零值：只按 name 过滤
        let by_struct: Vec<User> = db.chain().where_nonzero(&user("zero", 0)).find().unwrap();
        assert_eq!(names(&by_struct), vec!["zero"]);
        let all: Vec<User> = db.chain().where_nonzero(&User::default()).find().unwrap();
        assert_eq!(all.len(), 5);

        let by_map: Vec<User> = db
            .model::<User>()
            .where_map(value_map! { "age" => 0 })
            .find()
            .unwrap();
        assert_eq!(names(&by_map), vec!["zero"]);

        let by_fields: Vec<User> = db
            .chain()
            .where_fields(&user("alice", 0), &["name", "age"])
            .find()
            .unwrap();
        assert!(by_fields.is_empty());
    }

    #[test]
    fn map_update_writes_zero_struct_update_skips_it() {
        let db = setup();
        let mut u = user("jinzhu", 20);
        db.create(&mut u).unwrap();

        db.model::<User>()
            .where_pk(u.id)
            .updates_nonzero(&user("x", 0))
            .unwrap();
        let after_struct: User = db.chain().first_by_pk(u.id).unwrap();
        assert_eq!(after_struct.name, "x");
        assert_eq!(after_struct.age, 20);

        db.model::<User>()
            .where_pk(u.id)
            .updates_map(value_map! { "name" => "y", "age" => 0 })
            .unwrap();
        let after_map: User = db.chain().first_by_pk(u.id).unwrap();
        assert_eq!(after_map.name, "y");
        assert_eq!(after_map.age, 0);
    }

    #[test]
    fn select_and_omit_shape_updates() {
        let db = setup();
        let mut u = user("jinzhu", 20);
        db.create(&mut u).unwrap();

        // select 覆盖零值跳过
        db.model::<User>()
            .where_pk(u.id)
            .select(["age"])
            .updates_nonzero(&user("ignored", 0))
            .unwrap();
        let got: User = db.chain().first_by_pk(u.id).unwrap();
        assert_eq!((got.name.as_str(), got.age), ("jinzhu", 0));

        let changed = User {
            name: "renamed".to_string(),
            age: 33,
            ..got.clone()
        };
        db.chain()
            .omit(["name"])
            .updates_nonzero(&changed)
            .unwrap();
        let got: User = db.chain().first_by_pk(u.id).unwrap();
        assert_eq!((got.name.as_str(), got.age), ("jinzhu", 33));

        db.model::<User>()
            .where_pk(u.id)
            .update("member_number", "M-1")
            .unwrap();
        let got: User = db.chain().first_by_pk(u.id).unwrap();
        assert_eq!(got.member_number, "M-1");
    }

    #[test]
    fn update_with_nothing_to_set_is_a_parameter_error() {
        let db = setup();
        let mut u = user("jinzhu", 20);
        db.create(&mut u).unwrap();
        let err = db
            .model::<User>()
            .where_pk(u.id)
            .updates_nonzero(&User::default())
            .unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }

    #[test]
    fn global_writes_need_explicit_opt_in() {
        let db = setup();
        seed(&db);

        let err = db.model::<User>().update("age", 1).unwrap_err();
        assert!(matches!(err, Error::MissingFilter));
        let err = db.chain().delete::<User>().unwrap_err();
        assert!(matches!(err, Error::MissingFilter));
        let err = db
            .model::<User>()
            .updates_map(value_map! { "name" => "x" })
            .unwrap_err();
        assert!(matches!(err, Error::MissingFilter));

        let out = db
            .model::<User>()
            .allow_global_update()
            .update("age", 1)
            .unwrap();
        assert_eq!(out.rows_affected, 4);
        let ages = db.model::<User>().pluck::<u8>("age").unwrap();
        assert_eq!(ages, vec![1, 1, 1, 1]);

        // 软删除全部：改写为 UPDATE，行仍在
        let out = db.chain().allow_global_update().delete::<User>().unwrap();
        assert_eq!(out.rows_affected, 4);
        assert_eq!(db.model::<User>().count().unwrap(), 0);
        assert_eq!(db.model::<User>().unscoped().count().unwrap(), 4);

        let out = db
            .chain()
            .unscoped()
            .allow_global_update()
            .delete::<User>()
            .unwrap();
        assert_eq!(out.rows_affected, 4);
        assert_eq!(db.model::<User>().unscoped().count().unwrap(), 0);
    }

    #[test]
    fn blank_raw_fragment_is_not_a_filter() {
        let db = setup();
        seed(&db);

        let err = db
            .model::<User>()
            .where_raw("", Vec::<SqlValue>::new())
            .update("age", 99)
            .unwrap_err();
        assert!(matches!(err, Error::MissingFilter));
        let err = db
            .chain()
            .where_raw("   ", Vec::<SqlValue>::new())
            .delete::<User>()
            .unwrap_err();
        assert!(matches!(err, Error::MissingFilter));
        let err = db
            .chain()
            .unscoped()
            .where_raw(" ", Vec::<SqlValue>::new())
            .delete::<User>()
            .unwrap_err();
        assert!(matches!(err, Error::MissingFilter));

        assert_eq!(db.model::<User>().count().unwrap(), 4);
        let ages = db.model::<User>().pluck::<u8>("age").unwrap();
        assert_eq!(ages, vec![10, 20, 30, 40]);

        // 与真实条件并用时被忽略
        let found: Vec<User> = db
            .chain()
            .where_raw("", Vec::<SqlValue>::new())
            .where_raw("age > ?", [25])
            .find()
            .unwrap();
        assert_eq!(names(&found), vec!["bob", "carol"]);
    }

    #[test]
    fn soft_delete_hides_rows_until_unscoped() {
        let db = setup();
        let users = seed(&db);

        let out = db.chain().delete_record(&users[0]).unwrap();
        assert_eq!(out.rows_affected, 1);

        let scoped: Vec<User> = db.find().unwrap();
        assert_eq!(names(&scoped), vec!["alice", "bob", "carol"]);
        assert!(
            db.chain()
                .first_by_pk::<User>(users[0].id)
                .unwrap_err()
                .is_record_not_found()
        );

        let all: Vec<User> = db.chain().unscoped().find().unwrap();
        assert_eq!(all.len(), 4);
        let gone: User = db.chain().unscoped().first_by_pk(users[0].id).unwrap();
        assert!(gone.deleted_at > 0);

        // 已软删除的行不会被 scoped 更新命中
        let out = db
            .model::<User>()
            .where_pk(users[0].id)
            .update("name", "ghost")
            .unwrap();
        assert_eq!(out.rows_affected, 0);

        assert_eq!(db.model::<User>().count().unwrap(), 3);
        assert_eq!(db.model::<User>().unscoped().count().unwrap(), 4);

        db.chain()
            .unscoped()
            .delete_by_pk::<User>(users[0].id)
            .unwrap();
        assert_eq!(db.model::<User>().unscoped().count().unwrap(), 3);
    }

    #[test]
    fn select_with_omit_on_query_is_a_parameter_error() {
        let db = setup();
        seed(&db);
        let err = db
            .chain()
            .select(["name"])
            .omit(["age"])
            .find::<User>()
            .unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));

        let slim: Vec<User> = db.chain().select(["name, age"]).find().unwrap();
        assert_eq!(slim[0].name, "jinzhu");
        assert_eq!(slim[0].id, 0);
        assert!(slim[0].email.is_none());

        let without_email: User = db.chain().omit(["email"]).first().unwrap();
        assert!(without_email.email.is_none());
        assert_eq!(without_email.id, 1);
    }

    #[test]
    fn save_creates_then_updates_all_columns() {
        let db = setup();
        let mut u = user("jinzhu", 20);
        db.save(&mut u).unwrap();
        assert_eq!(u.id, 1);

        u.name = "jinzhu 2".to_string();
        u.age = 0;
        u.email = None;
        let out = db.save(&mut u).unwrap();
        assert_eq!(out.rows_affected, 1);
        let got: User = db.chain().first_by_pk(1).unwrap();
        assert_eq!(got.name, "jinzhu 2");
        assert_eq!(got.age, 0);
        assert_eq!(got.email, None);

        // 主键不存在时插入
        let mut fresh = User {
            id: 42,
            ..user("new", 5)
        };
        db.save(&mut fresh).unwrap();
        assert_eq!(db.chain().first_by_pk::<User>(42).unwrap().name, "new");
    }

    #[test]
    fn create_from_maps() {
        let db = setup();
        db.model::<User>()
            .create_map(value_map! { "name" => "m", "Age" => 0 })
            .unwrap();
        db.model::<User>()
            .create_maps_in_batches(
                vec![
                    value_map! { "name" => "a", "age" => 7 },
                    value_map! { "name" => "b", "email" => "b@example.com" },
                ],
                1,
            )
            .unwrap();

        let all: Vec<User> = db.chain().order("id").find().unwrap();
        assert_eq!(names(&all), vec!["m", "a", "b"]);
        assert_eq!(all[0].age, 0);
        assert_eq!(all[0].email.as_deref(), Some("default@gmail.com"));
        assert_eq!(all[1].age, 7);
        assert_eq!(all[1].email.as_deref(), Some("default@gmail.com"));
        assert_eq!(all[2].age, 0);
        assert_eq!(all[2].email.as_deref(), Some("b@example.com"));

        let err = db
            .model::<User>()
            .create_map(value_map! { "nope" => 1 })
            .unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
        let err = db.chain().create_map(value_map! { "name" => "x" }).unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }

    #[test]
    fn pluck_and_count() {
        let db = setup();
        seed(&db);
        let names = db
            .model::<User>()
            .where_raw("age >= ?", [20])
            .order("id")
            .pluck::<String>("name")
            .unwrap();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
        assert_eq!(
            db.model::<User>().where_eq("age", 30).count().unwrap(),
            1
        );
        assert_eq!(
            db.model::<User>()
                .select(["age"])
                .distinct()
                .count()
                .unwrap(),
            4
        );
    }

    #[test]
    fn raw_queries_and_exec() {
        let db = setup();
        seed(&db);

        let scanned: Vec<User> = db
            .raw(
                "SELECT id, name, age FROM t_users WHERE age >= ? ORDER BY id",
                [30],
            )
            .scan()
            .unwrap();
        assert_eq!(names(&scanned), vec!["bob", "carol"]);
        assert_eq!(scanned[0].id, 3);

        let ages: Vec<i64> = db
            .raw("SELECT age FROM t_users WHERE name IN ? ORDER BY age", [tuple(vec!["bob", "jinzhu"])])
            .pluck()
            .unwrap();
        assert_eq!(ages, vec![10, 30]);

        let out = db
            .exec("UPDATE t_users SET age = age + ? WHERE age < ?", [1, 25])
            .unwrap();
        assert_eq!(out.rows_affected, 2);

        let rows = db
            .raw("SELECT count(*) AS n FROM t_users", Vec::<SqlValue>::new())
            .rows()
            .unwrap();
        assert_eq!(rows[0].get("n"), Some(&SqlValue::I64(4)));

        let err = db.exec("DELETE FROM t_users WHERE id = ?", [1, 2]).unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }

    #[test]
    fn no_table_is_a_parameter_error() {
        let db = setup();
        assert!(matches!(db.chain().find_rows(), Err(Error::Parameter(_))));
        assert!(matches!(db.chain().count(), Err(Error::Parameter(_))));
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Slot {
        id: i64,
        order: i64,
        group: String,
    }

    crate::record! {
        impl Slot {
            id: i64 = field(),
            order: i64 = field(),
            group: String = field(),
        }
    }

    fn slot(order: i64, group: &str) -> Slot {
        Slot {
            order,
            group: group.to_string(),
            ..Slot::default()
        }
    }

    #[test]
    fn reserved_word_columns_round_trip() {
        let db = Db::open_in_memory().unwrap();
        assert!(db.migrator().auto_migrate::<Slot>().unwrap().created);
        assert!(db.migrator().has_column::<Slot>("group").unwrap());
        assert!(db.migrator().auto_migrate::<Slot>().unwrap().is_noop());

        let mut slots = vec![slot(2, "b"), slot(1, "a"), slot(3, "a")];
        db.create_batch(&mut slots).unwrap();
        assert_eq!(slots.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        let found: Vec<Slot> = db
            .chain()
            .where_eq("group", "a")
            .order_by("order", Direction::Desc)
            .find()
            .unwrap();
        assert_eq!(found.iter().map(|s| s.order).collect::<Vec<_>>(), vec![3, 1]);

        let out = db
            .model::<Slot>()
            .where_eq("order", 2)
            .update("group", "c")
            .unwrap();
        assert_eq!(out.rows_affected, 1);
        let groups: Vec<String> = db
            .model::<Slot>()
            .order_by("order", Direction::Asc)
            .pluck("group")
            .unwrap();
        assert_eq!(groups, vec!["a", "c", "a"]);

        let mut first: Slot = db.first().unwrap();
        first.group = "z".to_string();
        db.save(&mut first).unwrap();
        assert_eq!(db.chain().first_by_pk::<Slot>(first.id).unwrap().group, "z");

        db.chain().delete_record(&first).unwrap();
        assert_eq!(db.model::<Slot>().count().unwrap(), 2);
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Event {
        id: i64,
        title: String,
        created_at: Option<OffsetDateTime>,
        updated_at: Option<OffsetDateTime>,
    }

    crate::record! {
        impl Event {
            id: i64 = field(),
            title: String = field(),
            created_at: Option<OffsetDateTime> = field().auto_create_time(TimeUnit::DateTime),
            updated_at: Option<OffsetDateTime> = field().auto_update_time(TimeUnit::DateTime),
        }
    }

    #[test]
    fn optional_datetime_stamps_round_trip() {
        let db = Db::open_in_memory().unwrap();
        db.migrator().auto_migrate::<Event>().unwrap();

        let mut e = Event {
            title: "launch".to_string(),
            ..Event::default()
        };
        db.create(&mut e).unwrap();
        let created = e.created_at.unwrap();
        assert!(e.updated_at.is_some());
        let stored: Event = db.first().unwrap();
        assert_eq!(stored, e);

        db.model::<Event>()
            .where_pk(e.id)
            .update("title", "relaunch")
            .unwrap();
        let stored: Event = db.first().unwrap();
        assert_eq!(stored.title, "relaunch");
        assert_eq!(stored.created_at, Some(created));
        assert!(stored.updated_at.unwrap() >= created);
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Ticket {
        id: i64,
    }

    crate::record! {
        impl Ticket {
            id: i64 = field(),
        }
    }

    #[test]
    fn key_only_records_insert_default_rows() {
        let db = Db::open_in_memory().unwrap();
        db.migrator().auto_migrate::<Ticket>().unwrap();

        let mut one = Ticket::default();
        db.create(&mut one).unwrap();
        assert_eq!(one.id, 1);

        let mut many = vec![Ticket::default(), Ticket::default(), Ticket::default()];
        let out = db.create_batch(&mut many).unwrap();
        assert_eq!(out.rows_affected, 3);
        assert_eq!(many, vec![Ticket { id: 2 }, Ticket { id: 3 }, Ticket { id: 4 }]);

        let mut explicit = vec![Ticket { id: 10 }, Ticket { id: 11 }];
        db.create_batch(&mut explicit).unwrap();
        let ids: Vec<i64> = db.model::<Ticket>().pluck("id").unwrap();
        assert_eq!(ids, vec![1, 2, 3, 4, 10, 11]);
    }
}
