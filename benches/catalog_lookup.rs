use criterion::{Criterion, black_box, criterion_group, criterion_main};
use nyaladb::catalog::CatalogCache;
use nyaladb::catalog::table::{Column, ColumnType, HdfsFileFormat, RowFormat, TableId};
use nyaladb::messages::{
    CatalogObject, CatalogUpdateRequest, DbDesc, TableDesc, TableStorageDesc,
};
use nyaladb::version::{CatalogVersion, ServiceId};

const DATABASES: usize = 32;
const TABLES_PER_DB: usize = 64;

fn seeded_cache() -> CatalogCache {
    let cache = CatalogCache::new();
    let mut updated = vec![CatalogObject::CatalogMarker {
        version: CatalogVersion::new(1_000_000),
    }];
    let mut version = 1u64;
    for d in 0..DATABASES {
        let db_name = format!("db_{d:02}");
        updated.push(CatalogObject::Database {
            version: CatalogVersion::new(version),
            db: DbDesc {
                name: db_name.clone(),
                owner: None,
                comment: None,
                location: None,
            },
        });
        version += 1;
        for t in 0..TABLES_PER_DB {
            updated.push(CatalogObject::Table {
                version: CatalogVersion::new(version),
                table: TableDesc {
                    id: TableId((d * TABLES_PER_DB + t) as u32),
                    db_name: db_name.clone(),
                    name: format!("table_{t:03}"),
                    owner: None,
                    columns: vec![
                        Column::new("day", ColumnType::String),
                        Column::new("id", ColumnType::BigInt),
                        Column::new("amount", ColumnType::Double),
                    ],
                    num_clustering_cols: 1,
                    storage: TableStorageDesc::Hdfs {
                        format: HdfsFileFormat::Parquet,
                        row_format: RowFormat::default(),
                        location: None,
                        partitions: Vec::new(),
                    },
                    load_error: None,
                },
            });
            version += 1;
        }
    }
    cache
        .apply_update(&CatalogUpdateRequest {
            updated_objects: updated,
            removed_objects: Vec::new(),
            catalog_service_id: ServiceId::new(1, 1),
        })
        .expect("seed");
    cache
}

fn bench_lookups(c: &mut Criterion) {
    let cache = seeded_cache();

    c.bench_function("table_lookup", |b| {
        b.iter(|| {
            let state = cache.read();
            let record = state
                .table(black_box("DB_07"), black_box("TABLE_033"))
                .expect("present");
            black_box(record.column("AMOUNT").is_some())
        })
    });

    c.bench_function("db_listing_with_pattern", |b| {
        b.iter(|| {
            let state = cache.read();
            black_box(state.db_names(Some("db_1*")).len())
        })
    });

    c.bench_function("table_listing_with_pattern", |b| {
        b.iter(|| {
            let state = cache.read();
            black_box(
                state
                    .table_names(black_box("db_00"), Some("table_0*"))
                    .expect("present")
                    .len(),
            )
        })
    });
}

fn bench_update_batches(c: &mut Criterion) {
    c.bench_function("apply_heartbeat_batch", |b| {
        let cache = seeded_cache();
        let mut tick = 2_000_000u64;
        b.iter(|| {
            tick += 1;
            cache
                .apply_update(&CatalogUpdateRequest {
                    updated_objects: vec![CatalogObject::CatalogMarker {
                        version: CatalogVersion::new(tick),
                    }],
                    removed_objects: Vec::new(),
                    catalog_service_id: ServiceId::new(1, 1),
                })
                .expect("heartbeat")
        })
    });
}

criterion_group!(benches, bench_lookups, bench_update_batches);
criterion_main!(benches);
