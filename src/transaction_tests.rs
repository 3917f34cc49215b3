#[cfg(test)]
mod tests {
    use crate::chain::Session;
    use crate::error::Error;
    use crate::executor::{Db, Executor};
    use crate::transaction::TxState;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Ledger {
        id: i64,
        memo: String,
        amount: i64,
    }

    crate::record! {
        impl Ledger {
            id: i64 = field(),
            memo: String = field(),
            amount: i64 = field(),
        }
    }

    fn setup() -> Db {
        let db = Db::open_in_memory().unwrap();
        db.migrator().auto_migrate::<Ledger>().unwrap();
        db
    }

    fn entry(id: i64, memo: &str) -> Ledger {
        Ledger {
            id,
            memo: memo.to_string(),
            amount: 10,
        }
    }

    #[test]
    fn managed_transaction_commits_on_ok() {
        let db = setup();
        let n = db
            .transaction(|tx| {
                tx.create(&mut entry(1, "a"))?;
                tx.create(&mut entry(2, "b"))?;
                tx.chain().model::<Ledger>().count()
            })
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(db.chain().model::<Ledger>().count().unwrap(), 2);
    }

    #[test]
    fn managed_transaction_rolls_back_on_error() {
        let db = setup();
        let err = db
            .transaction(|tx| {
                tx.create(&mut entry(1, "a"))?;
                // 主键冲突
                tx.create(&mut entry(1, "dup"))?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
        assert_eq!(db.chain().model::<Ledger>().count().unwrap(), 0);
    }

    #[test]
    fn closure_error_is_returned_unchanged() {
        let db = setup();
        let err = db
            .transaction(|tx| -> crate::error::Result<()> {
                tx.create(&mut entry(1, "a"))?;
                Err(Error::Parameter("abort".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, Error::Parameter(ref m) if m == "abort"));
        assert!(db.find::<Ledger>().unwrap().is_empty());
    }

    #[test]
    fn manual_commit_then_reuse_is_invalid() {
        let db = setup();
        let tx = db.begin().unwrap();
        tx.create(&mut entry(7, "manual")).unwrap();
        tx.commit().unwrap();
        assert_eq!(tx.state(), TxState::Committed);

        let err = tx.create(&mut entry(8, "late")).unwrap_err();
        assert!(matches!(err, Error::InvalidTransaction(_)));
        assert!(matches!(tx.commit(), Err(Error::InvalidTransaction(_))));
        assert!(matches!(tx.rollback(), Err(Error::InvalidTransaction(_))));
        drop(tx);

        let rows: Vec<Ledger> = db.find().unwrap();
        assert_eq!(rows, vec![entry(7, "manual")]);
    }

    #[test]
    fn manual_rollback_discards_writes() {
        let db = setup();
        let tx = db.begin().unwrap();
        tx.create(&mut entry(1, "a")).unwrap();
        tx.rollback().unwrap();
        assert_eq!(tx.state(), TxState::RolledBack);
        assert!(matches!(
            tx.first::<Ledger>(),
            Err(Error::InvalidTransaction(_))
        ));
        drop(tx);
        assert_eq!(db.chain().model::<Ledger>().count().unwrap(), 0);
    }

    #[test]
    fn dropping_open_transaction_rolls_back() {
        let db = setup();
        {
            let tx = db.begin().unwrap();
            tx.create(&mut entry(1, "a")).unwrap();
            assert!(tx.is_open());
        }
        assert_eq!(db.chain().model::<Ledger>().count().unwrap(), 0);
    }

    #[test]
    fn atomic_inside_transaction_joins_it() {
        let db = setup();
        let res = db.transaction(|tx| {
            let mut batch = vec![entry(0, "x"), entry(0, "y"), entry(0, "z")];
            tx.chain().create_in_batches(&mut batch, 1)?;
            assert_eq!(batch.iter().map(|l| l.id).collect::<Vec<_>>(), vec![1, 2, 3]);
            tx.atomic(&mut |e: &dyn Executor| {
                e.execute(&crate::executor::Statement::new(
                    "DELETE FROM ledgers WHERE id = ?",
                    vec![1.into()],
                ))?;
                Ok(())
            })?;
            Err::<(), _>(Error::Parameter("undo".to_string()))
        });
        assert!(res.is_err());
        assert_eq!(db.chain().model::<Ledger>().count().unwrap(), 0);
    }

    #[test]
    fn outer_handle_inside_transaction_fails_fast() {
        let db = setup();
        let err = db
            .transaction(|tx| {
                tx.create(&mut entry(1, "a"))?;
                db.find::<Ledger>()
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransaction(_)));
        // 事务已回滚，连接可以继续使用
        assert!(db.find::<Ledger>().unwrap().is_empty());

        let tx = db.begin().unwrap();
        assert!(matches!(db.begin(), Err(Error::InvalidTransaction(_))));
        assert!(matches!(
            db.create(&mut entry(2, "outer")),
            Err(Error::InvalidTransaction(_))
        ));
        tx.commit().unwrap();
        // 已提交但未 drop 的 Tx 仍持有连接
        assert!(matches!(db.find::<Ledger>(), Err(Error::InvalidTransaction(_))));
        drop(tx);

        db.create(&mut entry(3, "after")).unwrap();
        assert_eq!(db.chain().model::<Ledger>().count().unwrap(), 1);
    }

    #[test]
    fn other_threads_wait_for_the_transaction() {
        let db = setup();
        let tx = db.begin().unwrap();
        tx.create(&mut entry(1, "a")).unwrap();
        std::thread::scope(|s| {
            let reader = s.spawn(|| db.chain().model::<Ledger>().count());
            tx.commit().unwrap();
            drop(tx);
            assert_eq!(reader.join().unwrap().unwrap(), 1);
        });
    }
}
