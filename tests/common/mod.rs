#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use rowkeep::{model, Clause, Connection, Field, ForeignKey, PrimaryKey};

model! {
    pub struct Model1 in "model1" {
        pub id: PrimaryKey,
        pub key: Field<String> = Clause::not_null(),
        pub value: Field<String>,
    }
}

model! {
    pub struct Model2 in "model2" {
        pub id: PrimaryKey,
        pub key: Field<String> = Clause::not_null(),
        pub value: Field<String>,
    }
    seed = model2_seed;
}

pub fn model2_seed() -> Vec<Model2> {
    (0..5)
        .map(|i| {
            let mut record = Model2::default();
            record.key.set(format!("initial{}", i));
            record.value.set(format!("value{}", i));
            record
        })
        .collect()
}

model! {
    pub struct Model4 in "model4" {
        pub id: PrimaryKey,
        pub key: Field<String> = Clause::not_null(),
        pub value: Field<String>,
        pub help: Field<String> = Clause::default_value("..."),
        pub hits: Field<i64> = Clause::default_value(0),
    }
}

model! {
    pub struct User in "user" {
        pub id: PrimaryKey,
        pub user_id: Field<String> = Clause::not_null() | Clause::unique(),
        pub name: Field<String>,
        pub passwd: Field<String> = Clause::not_null(),
        pub creation_time: Field<DateTime<Utc>> = Clause::default_expression("CURRENT_TIMESTAMP"),
        pub last_login_time: Field<DateTime<Utc>>,
    }
    clean = check_user;
}

/// Passwords need at least eight characters.
fn check_user(user: &mut User) -> bool {
    user.passwd.as_str().is_some_and(|p| p.len() >= 8)
}

model! {
    pub struct Config in "config" {
        pub id: PrimaryKey,
        pub key: Field<String>,
        pub value: Field<String>,
        pub uid: ForeignKey<User>,
    }
}

model! {
    pub struct ExamResult in "exam_result" {
        pub id: PrimaryKey,
        pub uid: ForeignKey<User>,
        pub subject: Field<String>,
        pub mark: Field<i64>,
    }
}

model! {
    pub struct HealthCheck in "health_check" {
        pub id: PrimaryKey,
        pub name: Field<String>,
        pub height: Field<i64>,
        pub weight: Field<f64>,
        pub record_date: Field<DateTime<Utc>>,
    }
}

model! {
    pub struct AllType in "all_type" {
        pub id: PrimaryKey,
        pub d: Field<BigDecimal>,
        pub data: Field<Vec<u8>>,
        pub b: Field<bool>,
        pub sl: Field<Vec<String>>,
        pub doc: Field<serde_json::Value>,
        pub day: Field<NaiveDate>,
        pub ratio: Field<f64>,
    }
}

/// A private in-memory database holding the tables of every test model.
pub fn open() -> Connection {
    let connection = Connection::open_in_memory().expect("in-memory database");
    register(&connection);
    connection.create_tables().expect("tables created");
    connection
}

pub fn register(connection: &Connection) {
    connection.add_model::<Model1>().unwrap();
    connection.add_model::<Model2>().unwrap();
    connection.add_model::<Model4>().unwrap();
    connection.add_model::<User>().unwrap();
    connection.add_model::<Config>().unwrap();
    connection.add_model::<ExamResult>().unwrap();
    connection.add_model::<HealthCheck>().unwrap();
    connection.add_model::<AllType>().unwrap();
}

pub fn saved_user(connection: &Connection, user_id: &str, name: &str) -> User {
    use rowkeep::Model;
    let mut user = User::default();
    user.user_id.set(user_id);
    user.name.set(name);
    user.passwd.set("12345678");
    user.save_with(connection, false, false).expect("user saved");
    user
}
