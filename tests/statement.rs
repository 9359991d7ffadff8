mod common;

use common::{AllType, Config, Model1, Model2, Model4, User};
use rowkeep::statement::{Direction, parse_order_spec};
use rowkeep::{
    Clause, Index, Model, PrimaryKey, RowkeepError, SharedQuery, SqlStatement, SqliteStatement,
    Where,
};

#[test]
fn constraint_text() {
    let sql = SqliteStatement;
    assert_eq!(
        sql.column_constraint(&(Clause::primary_key() | Clause::autoincrement())),
        "PRIMARY KEY AUTOINCREMENT"
    );
    assert_eq!(sql.column_constraint(&PrimaryKey::declared_clause()), "PRIMARY KEY AUTOINCREMENT");
    assert_eq!(sql.column_constraint(&Clause::primary_key()), "PRIMARY KEY");
    assert_eq!(sql.column_constraint(&(Clause::not_null() | Clause::unique())), "UNIQUE NOT NULL");
    assert_eq!(sql.column_constraint(&Clause::default_value("...")), "DEFAULT '...'");
    assert_eq!(sql.column_constraint(&Clause::default_value("it's")), "DEFAULT 'it''s'");
    assert_eq!(
        sql.column_constraint(&Clause::default_expression("CURRENT_TIMESTAMP")),
        "DEFAULT CURRENT_TIMESTAMP"
    );
    assert_eq!(sql.column_constraint(&Clause::new()), "");
}

#[test]
fn create_table() {
    let sql = SqliteStatement.create_table_if_not_exists(Model1::meta_info());
    let answer = "CREATE TABLE IF NOT EXISTS model1  (\n\
                  id INTEGER PRIMARY KEY AUTOINCREMENT,\n\
                  key TEXT NOT NULL,\n\
                  value TEXT \n\
                  );";
    assert_eq!(sql, answer);

    let sql2 = SqliteStatement.create_table_if_not_exists(Model2::meta_info());
    assert_eq!(sql2, answer.replace("model1", "model2"));
}

#[test]
fn create_table_with_foreign_key() {
    let sql = SqliteStatement.create_table_if_not_exists(Config::meta_info());
    let answer = "CREATE TABLE IF NOT EXISTS config  (\n\
                  id INTEGER PRIMARY KEY AUTOINCREMENT,\n\
                  key TEXT ,\n\
                  value TEXT ,\n\
                  uid INTEGER NOT NULL,\n\
                  FOREIGN KEY(uid) REFERENCES user(id)\n\
                  );";
    assert_eq!(sql, answer);
}

#[test]
fn create_table_with_defaults_and_types() {
    let sql = SqliteStatement.create_table_if_not_exists(Model4::meta_info());
    assert!(sql.contains("help TEXT DEFAULT '...',\n"));
    assert!(sql.contains("hits INTEGER DEFAULT 0\n"));

    let sql = SqliteStatement.create_table_if_not_exists(User::meta_info());
    assert!(sql.contains("user_id TEXT UNIQUE NOT NULL,\n"));
    assert!(sql.contains("creation_time DATETIME DEFAULT CURRENT_TIMESTAMP,\n"));

    let sql = SqliteStatement.create_table_if_not_exists(AllType::meta_info());
    assert!(sql.contains("d TEXT ,\n"));
    assert!(sql.contains("data BLOB ,\n"));
    assert!(sql.contains("b INTEGER ,\n"));
    assert!(sql.contains("sl TEXT ,\n"));
    assert!(sql.contains("day DATE ,\n"));
    assert!(sql.contains("ratio REAL \n"));
}

#[test]
fn create_index() {
    let index = Index::new::<Model1>("index1").column("key");
    assert_eq!(
        SqliteStatement.create_index_if_not_exists(&index),
        "CREATE INDEX IF NOT EXISTS index1 on model1 (key);"
    );
    let index = Index::new::<Model1>("index2").column("key").column("value");
    assert_eq!(
        SqliteStatement.create_index_if_not_exists(&index),
        "CREATE INDEX IF NOT EXISTS index2 on model1 (key,value);"
    );
}

#[test]
fn insert_and_replace() {
    let info = Model2::meta_info();
    assert_eq!(
        SqliteStatement.insert_into(info, &["id", "key", "value"]),
        "INSERT INTO model2 (id,key,value) values (:id,:key,:value);"
    );
    assert_eq!(
        SqliteStatement.replace_into(info, &["id", "key", "value"]),
        "REPLACE INTO model2 (id,key,value) values (:id,:key,:value);"
    );
    assert_eq!(SqliteStatement.insert_into(info, &[]), "INSERT INTO model2 DEFAULT VALUES;");
}

#[test]
fn select_and_delete() {
    let query = SharedQuery::for_meta_info(Model1::meta_info());
    assert_eq!(SqliteStatement.select(&query).unwrap(), "SELECT * FROM model1;");

    let query = query.filter(Where::with_op("key", "=", "config1")).limit(1);
    assert_eq!(
        SqliteStatement.select(&query).unwrap(),
        "SELECT * FROM model1 WHERE key = :arg0 LIMIT 1;"
    );

    let projected = query.select(&["key"]).order_by("key desc").order_by("id");
    assert_eq!(
        SqliteStatement.select(&projected).unwrap(),
        "SELECT key FROM model1 WHERE key = :arg0 ORDER BY key DESC,id ASC LIMIT 1;"
    );

    assert_eq!(
        SqliteStatement.delete_from(&query.limit(-1)).unwrap(),
        "DELETE FROM model1 WHERE key = :arg0;"
    );
    assert_eq!(
        SqliteStatement.delete_from(&query).unwrap(),
        "DELETE FROM model1 WHERE key = :arg0 LIMIT 1;"
    );
}

#[test]
fn builder_states_are_independent() {
    let base = SharedQuery::for_meta_info(Model1::meta_info());
    let filtered = base.filter(Where::new("key =", "a"));
    let refiltered = filtered.filter(Where::new("value =", "b"));

    assert!(base.filter_ref().is_none());
    assert_eq!(
        SqliteStatement.select(&filtered).unwrap(),
        "SELECT * FROM model1 WHERE key = :arg0;"
    );
    // a second filter replaces the first
    assert_eq!(
        SqliteStatement.select(&refiltered).unwrap(),
        "SELECT * FROM model1 WHERE value = :arg0;"
    );
    assert_eq!(base.limit_value(), -1);
}

#[test]
fn malformed_queries_are_rejected() {
    let query = SharedQuery::for_meta_info(Model1::meta_info());
    assert!(matches!(
        SqliteStatement.select(&query.select(&["nope"])),
        Err(RowkeepError::QueryBuild(_))
    ));
    assert!(matches!(
        SqliteStatement.select(&query.order_by("key sideways")),
        Err(RowkeepError::QueryBuild(_))
    ));
    assert!(matches!(
        SqliteStatement.select(&query.order_by("height desc")),
        Err(RowkeepError::QueryBuild(_))
    ));
}

#[test]
fn order_specs() {
    assert_eq!(parse_order_spec("height"), Some(("height".to_string(), Direction::Asc)));
    assert_eq!(parse_order_spec(" height DESC "), Some(("height".to_string(), Direction::Desc)));
    assert_eq!(parse_order_spec("weight asc"), Some(("weight".to_string(), Direction::Asc)));
    assert_eq!(parse_order_spec("weight; drop table x"), None);
    assert_eq!(parse_order_spec(""), None);
}

#[test]
fn identical_shapes_render_identical_ddl() {
    let one = SqliteStatement.create_table_if_not_exists(Model1::meta_info());
    let two = SqliteStatement.create_table_if_not_exists(Model2::meta_info());
    assert_ne!(one, two);
    assert_eq!(one.replace("model1", "TABLE"), two.replace("model2", "TABLE"));
    assert_eq!(SqliteStatement.drop_table("model1"), "DROP TABLE IF EXISTS model1;");
}
