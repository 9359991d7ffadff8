use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rowkeep::{
    Clause, Connection, Expression, Field, List, Model, PrimaryKey, Query, SharedQuery, SqlStatement,
    SqliteStatement, Where, model,
};

// ------------- Models -------------
model! {
    pub struct Reading in "reading" {
        pub id: PrimaryKey,
        pub sensor: Field<String> = Clause::not_null(),
        pub level: Field<i64>,
        pub ratio: Field<f64>,
        pub note: Field<String> = Clause::default_value("-"),
    }
}

fn filter(terms: usize) -> Where {
    let mut filter = Where::new("level >", 0);
    for i in 1..terms {
        filter = filter & (Where::new("sensor =", format!("s{}", i)) | Where::column("ratio").lt(i as f64));
    }
    filter
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let small = filter(1);
    let large = filter(100);
    c.bench_function("expression 1", |b| b.iter(|| Expression::new(black_box(&small))));
    c.bench_function("expression 100", |b| b.iter(|| Expression::new(black_box(&large))));

    let info = Reading::meta_info();
    c.bench_function("create table", |b| {
        b.iter(|| SqliteStatement.create_table_if_not_exists(black_box(info)))
    });
    let query = SharedQuery::for_meta_info(info)
        .filter(filter(10))
        .order_by("level desc")
        .limit(10);
    c.bench_function("select", |b| b.iter(|| SqliteStatement.select(black_box(&query))));

    let connection = Connection::open_in_memory().unwrap();
    connection.create_table_if_not_exists::<Reading>().unwrap();
    let mut readings: List<Reading> = (0..1000)
        .map(|i| {
            let mut reading = Reading::default();
            reading.sensor.set(format!("s{}", i % 10));
            reading.level.set(i);
            reading
        })
        .collect();
    readings.save_with(&connection, true, false);
    let all = Query::<Reading>::new()
        .with_connection(connection.clone())
        .filter(Where::new("sensor =", "s1"));
    c.bench_function("load 100", |b| b.iter(|| all.all().unwrap().len()));
    c.bench_function("count", |b| b.iter(|| all.count().unwrap()));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
