//! 演示：建表、增删改查、软删除与事务。
//!
//! 配置来自 `halo-orm.toml`（可缺失）与 `HALO_ORM__*` 环境变量；
//! 日志级别由 `RUST_LOG` 控制，默认 `info`，设为 `debug` 可看到每条 SQL。

use flexi_logger::Logger;
use halo_orm::prelude::*;
use log::{error, info};
use std::process::ExitCode;

#[derive(Debug, Clone, Default)]
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
    fn default_age(&mut self) -> halo_orm::Result<()> {
        if self.age == 0 {
            self.age = 18;
        }
        Ok(())
    }
}

record! {
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

fn run(db: &Db) -> halo_orm::Result<()> {
    let report = db.migrator().auto_migrate::<User>()?;
    info!(
        "event=demo_migrate module=demo status=ok created={} added_columns={}",
        report.created,
        report.added_columns.len()
    );

    let mut jinzhu = User {
        name: "jinzhu".to_string(),
        ..User::default()
    };
    db.create(&mut jinzhu)?;
    info!("event=demo_create module=demo status=ok id={} age={}", jinzhu.id, jinzhu.age);

    let mut batch: Vec<User> = (1..=5)
        .map(|i| User {
            name: format!("user_{i}"),
            age: 20 + i,
            ..User::default()
        })
        .collect();
    db.chain().create_in_batches(&mut batch, 2)?;
    info!(
        "event=demo_create_batch module=demo status=ok ids={:?}",
        batch.iter().map(|u| u.id).collect::<Vec<_>>()
    );

    match db.chain().where_eq("name", "nobody").first::<User>() {
        Ok(u) => info!("event=demo_first module=demo status=ok id={}", u.id),
        Err(err) if err.is_record_not_found() => {
            info!("event=demo_first module=demo status=not_found name=nobody")
        }
        Err(err) => return Err(err),
    }

    let adults: Vec<User> = db
        .chain()
        .where_raw("age > ?", [21])
        .order_by("age", Direction::Desc)
        .limit(3)
        .find()?;
    info!(
        "event=demo_find module=demo status=ok rows={} names={:?}",
        adults.len(),
        adults.iter().map(|u| u.name.as_str()).collect::<Vec<_>>()
    );

    // map 更新写入零值；struct 更新跳过零值
    db.model::<User>()
        .where_pk(jinzhu.id)
        .updates_map(value_map! { "name" => "jinzhu_map", "age" => 0 })?;
    db.model::<User>().where_pk(batch[0].id).updates_nonzero(&User {
        name: "renamed".to_string(),
        ..User::default()
    })?;

    db.chain().delete_record(&batch[1])?;
    let visible = db.model::<User>().count()?;
    let total = db.model::<User>().unscoped().count()?;
    info!("event=demo_soft_delete module=demo status=ok visible={visible} total={total}");

    let res = db.transaction(|tx| {
        tx.create(&mut User {
            id: 100,
            name: "tx_a".to_string(),
            ..User::default()
        })?;
        tx.create(&mut User {
            id: 100,
            name: "tx_b".to_string(),
            ..User::default()
        })?;
        Ok(())
    });
    if let Err(err) = res {
        info!("event=demo_transaction module=demo status=rolled_back error={err}");
    }

    let names = db
        .raw("SELECT name FROM t_users WHERE deleted_at = 0 ORDER BY id", Vec::<SqlValue>::new())
        .pluck::<String>()?;
    info!("event=demo_raw module=demo status=ok names={names:?}");
    Ok(())
}

fn main() -> ExitCode {
    let _logger = match Logger::try_with_env_or_str("info").and_then(|l| l.start()) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("failed to start logger: {err}");
            return ExitCode::FAILURE;
        }
    };

    let settings = match Settings::load("halo-orm") {
        Ok(s) => s,
        Err(err) => {
            error!("event=demo_config module=demo status=error error={err}");
            return ExitCode::FAILURE;
        }
    };

    let result = Db::open(&settings).and_then(|db| run(&db));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=demo module=demo status=error error={err}");
            ExitCode::FAILURE
        }
    }
}
