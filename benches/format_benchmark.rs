use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sql_conduit::prelude::*;
use sql_conduit::convert;

const SELECT: &str = "SELECT * FROM users WHERE status = %s AND group_id = %i AND email = %email \
     ORDER BY rand() LIMIT %i,%i";
const CREATE: &str = "CREATE TABLE users (id INT NOT NULL PRIMARY KEY AUTO_INCREMENT, \
     status ENUM('active','inactive') NOT NULL DEFAULT 'active', email VARCHAR(255), \
     created_at datetime, note longtext) ENGINE=InnoDB DEFAULT CHARSET=utf8";

fn select_args() -> Args {
    Args::positional([
        RowValues::from("active"),
        RowValues::Int(2),
        RowValues::from("jsmith@example.com"),
        RowValues::Int(20),
        RowValues::Int(10),
    ])
}

fn benchmark_format(c: &mut Criterion) {
    let args = select_args();
    let mut group = c.benchmark_group("format_statement");
    for db_type in [DatabaseType::MySql, DatabaseType::Postgres, DatabaseType::Sqlite] {
        group.bench_function(BenchmarkId::new("select", db_type), |b| {
            b.iter(|| format_statement(db_type, black_box(SELECT), black_box(&args)).unwrap());
        });
    }
    group.finish();
}

fn benchmark_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("dialect_convert");
    for db_type in [DatabaseType::Postgres, DatabaseType::Sqlite] {
        group.bench_function(BenchmarkId::new("create_table", db_type), |b| {
            b.iter(|| convert(db_type, black_box(CREATE)));
        });
        group.bench_function(BenchmarkId::new("select", db_type), |b| {
            b.iter(|| convert(db_type, black_box(SELECT)));
        });
    }
    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let args = select_args();
    c.bench_function("convert_then_format_postgres", |b| {
        b.iter(|| {
            let converted = convert(DatabaseType::Postgres, black_box(SELECT));
            format_statement(DatabaseType::Postgres, &converted.statement, black_box(&args)).unwrap()
        });
    });
}

criterion_group!(benches, benchmark_format, benchmark_convert, benchmark_pipeline);
criterion_main!(benches);
