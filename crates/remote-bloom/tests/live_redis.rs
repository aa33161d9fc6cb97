//! Tests against a real Redis server on 127.0.0.1:6379
//!
//! Run with `cargo test -p remote-bloom --test live_redis -- --ignored`.
//! Every test uses its own database index and deletes its filter.

use remote_bloom::{ErrorKind, FilterContext, FilterOptionsBuilder};

fn options(name: &str, db: i64) -> remote_bloom::FilterOptions {
    FilterOptionsBuilder::new(name)
        .capacity(1000)
        .error_rate(0.01)
        .db(db)
        .build()
        .unwrap()
}

#[test]
#[ignore = "needs a Redis server on 127.0.0.1:6379"]
fn test_live_add_check_delete() {
    let mut filter = FilterContext::connect(&options("remote-bloom-live", 9)).unwrap();
    filter.delete().unwrap();

    assert!(filter.add("hello").unwrap());
    assert!(!filter.add("hello").unwrap());
    assert!(filter.contains("hello").unwrap());

    for item in ["a", "b", "c"] {
        filter.add_deferred(item).unwrap();
    }
    assert_eq!(filter.add_complete(3).unwrap(), 3);

    filter.delete().unwrap();
    assert!(!filter.contains("hello").unwrap());
    filter.close();
}

#[test]
#[ignore = "needs a Redis server on 127.0.0.1:6379"]
fn test_live_databases_are_isolated() {
    let mut first = FilterContext::connect(&options("remote-bloom-iso", 10)).unwrap();
    let mut second = FilterContext::connect(&options("remote-bloom-iso", 11)).unwrap();
    first.delete().unwrap();
    second.delete().unwrap();

    first.add("only-here").unwrap();
    assert!(!second.contains("only-here").unwrap());
    first.delete().unwrap();
}

#[test]
#[ignore = "needs a Redis server on 127.0.0.1:6379"]
fn test_live_out_of_range_database() {
    let err = FilterContext::connect(&options("remote-bloom-db", 100_000))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[test]
fn test_unreachable_store_fails_fast() {
    let options = FilterOptionsBuilder::new("unreachable")
        .port(1)
        .connect_timeout(std::time::Duration::from_millis(200))
        .build()
        .unwrap();
    let err = FilterContext::connect(&options).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Connection);
}
