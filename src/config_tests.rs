#[cfg(test)]
mod tests {
    use crate::config::Settings;
    use crate::flavor::Flavor;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let s = Settings::load("/nonexistent/halo-orm-settings").unwrap();
        assert_eq!(s.dsn, ":memory:");
        assert_eq!(s.create_batch_size, 100);
        assert_eq!(s.flavor, Flavor::SQLite);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("halo-orm-settings-{}.toml", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "dsn = \"demo.db\"\nflavor = \"sqlite\"\ncreate_batch_size = 2\n\n[naming]\ntable_prefix = \"t_\"\n"
        )
        .unwrap();
        drop(f);

        let s = Settings::load(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(s.dsn, "demo.db");
        assert_eq!(s.create_batch_size, 2);
        assert_eq!(s.naming.table_prefix, "t_");
        assert!(!s.naming.singular_table);
    }
}
