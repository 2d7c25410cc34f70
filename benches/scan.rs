use celldb::security::Authorizations;
use celldb::{CelldbConfig, CelldbInstance, Mutation, ScanRange, TimeMode};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const TABLE_NAME: &str = "bench";
const SEEDED_ROWS: usize = 10_000;
const VERSIONS_PER_ROW: usize = 4;

fn setup_db() -> CelldbInstance {
    let config = CelldbConfig {
        default_time_mode: TimeMode::Logical,
        ..CelldbConfig::default()
    };
    let db = CelldbInstance::open(config).expect("open");
    let client = db.client("bench");
    client.table_ops().create(TABLE_NAME).expect("table");

    let mut writer = client.create_batch_writer(TABLE_NAME).expect("writer");
    for row in 0..SEEDED_ROWS {
        for version in 0..VERSIONS_PER_ROW {
            let mut m = Mutation::new(format!("row{row:06}"));
            let visibility = if row % 2 == 0 { "" } else { "alpha|beta" };
            m.put_at("cf", "payload", visibility, version as i64, format!("v{version}"));
            writer.add_mutation(m).expect("add");
        }
    }
    writer.close().expect("close");
    db
}

fn bench_full_scan(c: &mut Criterion) {
    let db = setup_db();
    let client = db.client("bench");
    c.bench_function("full_scan_version_limited", |b| {
        b.iter(|| {
            let scanner = client
                .create_scanner_with_auths(TABLE_NAME, Authorizations::from(["alpha"]))
                .expect("scanner");
            let count = scanner.iter().filter(|item| item.is_ok()).count();
            black_box(count)
        })
    });
}

fn bench_single_row_probe(c: &mut Criterion) {
    let db = setup_db();
    let client = db.client("bench");
    c.bench_function("single_row_probe", |b| {
        b.iter(|| {
            let mut scanner = client
                .create_scanner_with_auths(TABLE_NAME, Authorizations::from(["alpha"]))
                .expect("scanner");
            scanner.set_range(ScanRange::row("row005000"));
            let cells: Vec<_> = scanner.iter().collect::<Result<_, _>>().expect("scan");
            black_box(cells.len())
        })
    });
}

fn bench_visibility_evaluation(c: &mut Criterion) {
    let db = setup_db();
    let client = db.client("bench");
    c.bench_function("scan_with_denied_labels", |b| {
        b.iter(|| {
            let scanner = client
                .create_scanner_with_auths(TABLE_NAME, Authorizations::empty())
                .expect("scanner");
            let count = scanner.iter().filter(|item| item.is_ok()).count();
            black_box(count)
        })
    });
}

criterion_group!(
    benches,
    bench_full_scan,
    bench_single_row_probe,
    bench_visibility_evaluation
);
criterion_main!(benches);
