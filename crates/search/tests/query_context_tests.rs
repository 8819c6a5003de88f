//! QueryContext integration tests.
//!
//! These compose queries directly, without the dispatcher, and run them
//! against the SQLite backend.

#![cfg(feature = "sqlite")]

mod common;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing_test::traced_test;

use stockroom_search::ResultAssembler;
use stockroom_search::search::{
    ConditionGroup, FieldWhitelist, Operator, Predicate, QueryContext, SortDirection,
};
use stockroom_search::types::{InventoryStatus, ShipmentStatus};

use common::*;

fn field(name: &str) -> stockroom_search::search::QualifiedField {
    FieldWhitelist::standard()
        .validate(name)
        .expect("field should be whitelisted")
}

// ============================================================================
// Identities
// ============================================================================

#[test]
fn test_empty_context_returns_every_record() {
    let (backend, _) = seeded_backend();
    let page = QueryContext::new().results(&backend).unwrap();
    assert_eq!(page.total_count, 5);
    assert_eq!(names(&page), vec!["E", "D", "C", "B", "A"]);
}

#[test]
fn test_empty_relation_block_adds_no_join() {
    let (backend, _) = seeded_backend();
    let ctx = QueryContext::new().with_batch_conditions(|_| {});

    assert!(ctx.joins().is_empty());
    assert!(!ctx.joins().is_distinct());
    assert_eq!(ctx.count(&backend).unwrap(), 5);
}

#[test]
fn test_where_any_without_alternatives_is_identity() {
    let (backend, _) = seeded_backend();
    let ctx = QueryContext::new().where_any(Vec::<ConditionGroup>::new());
    assert_eq!(ctx, QueryContext::new());
    assert_eq!(ctx.count(&backend).unwrap(), 5);
}

#[test]
fn test_empty_or_group_restricts_nothing() {
    let (backend, _) = seeded_backend();

    let any = QueryContext::new().where_any([ConditionGroup::Or(vec![])]);
    assert!(any.conditions().is_empty());
    assert_eq!(any.results(&backend).unwrap().total_count, 5);

    let all = QueryContext::new().where_all([ConditionGroup::Or(vec![])]);
    assert!(all.conditions().is_empty());
    assert_eq!(all.results(&backend).unwrap().total_count, 5);

    let nested = QueryContext::new().where_all([ConditionGroup::And(vec![
        ConditionGroup::Or(vec![]),
        Predicate::gte(field("price"), 40.0).into(),
    ])]);
    assert_eq!(names(&nested.results(&backend).unwrap()), vec!["E"]);
}

#[test]
fn test_or_where_on_unrestricted_context_is_identity() {
    let (backend, _) = seeded_backend();
    let ctx = QueryContext::new().or_where(Predicate::eq(field("name"), "A"));
    assert_eq!(ctx.count(&backend).unwrap(), 5);
}

#[test]
fn test_or_where_unions_with_accumulated_query() {
    let (backend, _) = seeded_backend();
    let page = QueryContext::new()
        .and_where(Predicate::gte(field("price"), 40.0))
        .or_where(Predicate::eq(field("quantity"), 0_i64))
        .results(&backend)
        .unwrap();

    assert_eq!(names(&page), vec!["E", "A"]);
}

// ============================================================================
// Whitelist
// ============================================================================

#[traced_test]
#[test]
fn test_unknown_fields_never_reach_the_store() {
    let (backend, _) = seeded_backend();
    let ctx = QueryContext::new()
        .complex_where(|g| {
            g.condition("name; DROP TABLE inventories", Operator::Eq, &json!("x"));
        })
        .order_by("1; --", SortDirection::Descending)
        .search_keywords("bolt", &["secret_column"]);

    assert!(ctx.conditions().is_empty());
    assert!(!backend.debug_query(&ctx).contains("DROP"));
    assert_eq!(ctx.count(&backend).unwrap(), 5);
    assert!(logs_contain("ignoring condition on unknown field"));
    assert!(logs_contain("ignoring unknown keyword search field"));
}

#[traced_test]
#[test]
fn test_related_field_sort_is_ignored() {
    let (backend, _) = seeded_backend();
    let page = QueryContext::new()
        .order_by("batches.expires_on", SortDirection::Ascending)
        .results(&backend)
        .unwrap();

    assert_eq!(names(&page), vec!["E", "D", "C", "B", "A"]);
    assert!(logs_contain("ignoring sort on related field"));
}

#[test]
fn test_status_predicate_accepts_name() {
    let (backend, _) = seeded_backend();
    let page = QueryContext::new()
        .and_where(Predicate::eq(field("status"), "archived"))
        .results(&backend)
        .unwrap();

    assert_eq!(sorted_names(&page), vec!["A", "D"]);
    assert_eq!(page.total_count, 2);
}

#[traced_test]
#[test]
fn test_mistyped_predicate_restricts_nothing() {
    let (backend, _) = seeded_backend();
    let ctx = QueryContext::new()
        .and_where(Predicate::eq(field("status"), "misplaced"))
        .and_where(Predicate::contains(field("price"), "5"))
        .and_where(Predicate::lte(field("quantity"), 3_i64));

    assert_eq!(ctx.conditions().len(), 1);
    assert_eq!(sorted_names(&ctx.results(&backend).unwrap()), vec!["A", "B"]);
    assert!(logs_contain("ignoring predicate with a value of the wrong type"));
}

#[test]
fn test_qualified_and_bare_names_resolve_alike() {
    let (backend, _) = seeded_backend();
    let bare = QueryContext::new().complex_where(|g| {
        g.condition("lot_code", Operator::Eq, &json!("LOT-C1"));
    });
    let qualified = QueryContext::new().complex_where(|g| {
        g.condition("batches.lot_code", Operator::Eq, &json!("LOT-C1"));
    });

    assert_eq!(bare.conditions(), qualified.conditions());
    assert_eq!(names(&bare.results(&backend).unwrap()), vec!["C"]);
}

// ============================================================================
// Literal Text Matching
// ============================================================================

#[test]
fn test_underscore_is_matched_literally() {
    let backend = create_backend();
    let conn = backend.connection().unwrap();
    InventoryFixture::new("Bolt_1", 1.0, 1).insert(&conn);
    InventoryFixture::new("BoltX1", 1.0, 1).insert(&conn);
    drop(conn);

    let page = QueryContext::new()
        .search_keywords("t_1", &["name"])
        .results(&backend)
        .unwrap();
    assert_eq!(names(&page), vec!["Bolt_1"]);
}

#[test]
fn test_percent_is_matched_literally() {
    let backend = create_backend();
    let conn = backend.connection().unwrap();
    InventoryFixture::new("Discount 100%", 1.0, 1).insert(&conn);
    InventoryFixture::new("Batch 1000", 1.0, 1).insert(&conn);
    drop(conn);

    let page = QueryContext::new()
        .search_keywords("100%", &["name"])
        .results(&backend)
        .unwrap();
    assert_eq!(names(&page), vec!["Discount 100%"]);
}

#[test]
fn test_backslash_is_matched_literally() {
    let backend = create_backend();
    let conn = backend.connection().unwrap();
    InventoryFixture::new(r"C:\parts", 1.0, 1).insert(&conn);
    InventoryFixture::new("C:parts", 1.0, 1).insert(&conn);
    drop(conn);

    let page = QueryContext::new()
        .and_where(Predicate::starts_with(field("name"), r"C:\"))
        .results(&backend)
        .unwrap();
    assert_eq!(names(&page), vec![r"C:\parts"]);
}

#[test]
fn test_quotes_in_keyword_are_bound_not_interpolated() {
    let (backend, _) = seeded_backend();
    let page = QueryContext::new()
        .search_keywords("' OR '1'='1", &["name", "sku"])
        .results(&backend)
        .unwrap();
    assert_eq!(page.total_count, 0);
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn test_repeated_relation_blocks_join_once() {
    let (backend, _) = seeded_backend();
    let ctx = QueryContext::new()
        .with_batch_conditions(|b| {
            b.expires_after(days_from_today(1));
        })
        .with_batch_conditions(|b| {
            b.lot_code("LOT");
        })
        .distinct();

    assert_eq!(ctx.joins().entities().len(), 1);
    assert_eq!(ctx.joins().suppression_applications(), 1);

    let sql = backend.debug_query(&ctx);
    assert_eq!(sql.matches("LEFT JOIN batches").count(), 1);
    assert_eq!(sql.matches("DISTINCT").count(), 1);

    let page = ctx.results(&backend).unwrap();
    assert_eq!(names(&page), vec!["E", "C"]);
    assert_eq!(page.total_count, 2);
}

#[test]
fn test_conditions_across_several_relations() {
    let (backend, _) = seeded_backend();
    let page = QueryContext::new()
        .with_shipment_conditions(|s| {
            s.status(ShipmentStatus::Shipped).destination("osl");
        })
        .with_receipt_conditions(|r| {
            r.source("Acme");
        })
        .with_audit_conditions(|a| {
            a.action("update").actor("ali");
        })
        .results(&backend)
        .unwrap();

    assert_eq!(names(&page), vec!["E"]);
}

#[test]
fn test_recent_change_log_filter() {
    let (backend, _) = seeded_backend();
    let since = Utc::now() - Duration::days(7);
    let page = QueryContext::new()
        .with_change_log_conditions(|c| {
            c.changed_after(since);
        })
        .results(&backend)
        .unwrap();

    // E has two recent entries but appears once; B's entry is too old.
    assert_eq!(names(&page), vec!["E"]);
    assert_eq!(page.total_count, 1);
}

#[test]
fn test_or_across_base_and_related_fields() {
    let (backend, _) = seeded_backend();
    let page = QueryContext::new()
        .complex_where(|g| {
            g.or_group(|any| {
                any.condition("quantity", Operator::Eq, &json!(0))
                    .condition("shipments.destination", Operator::Contains, &json!("Berg"));
            });
        })
        .results(&backend)
        .unwrap();

    // LEFT JOIN keeps A even though it has no shipments.
    assert_eq!(names(&page), vec!["B", "A"]);
}

// ============================================================================
// Nested Conditions
// ============================================================================

#[test]
fn test_explicit_nesting() {
    let (backend, _) = seeded_backend();
    let active = json!(InventoryStatus::Active.code());
    let page = QueryContext::new()
        .complex_where(|g| {
            g.condition("status", Operator::Eq, &active).or_group(|any| {
                any.condition("price", Operator::Lt, &json!(20))
                    .condition("price", Operator::Gt, &json!(40));
            });
        })
        .results(&backend)
        .unwrap();

    assert_eq!(names(&page), vec!["E", "B"]);
}

#[test]
fn test_or_group_with_rejected_alternative_restricts_nothing() {
    let (backend, _) = seeded_backend();
    let ctx = QueryContext::new().complex_where(|g| {
        g.or_group(|any| {
            any.condition("quantity", Operator::Eq, &json!(0))
                .condition("no_such_field", Operator::Eq, &json!(1));
        });
    });

    assert_eq!(ctx.count(&backend).unwrap(), 5);
}

#[test]
fn test_between_operator_from_untrusted_input() {
    let (backend, _) = seeded_backend();
    let page = QueryContext::new()
        .complex_where(|g| {
            g.condition("quantity", Operator::Between, &json!([3, 10]));
        })
        .results(&backend)
        .unwrap();

    assert_eq!(sorted_names(&page), vec!["B", "C", "D"]);
}

// ============================================================================
// Pagination
// ============================================================================

#[test]
fn test_pages_partition_the_result() {
    let (backend, _) = seeded_backend();
    let base = QueryContext::new().order_by("price", SortDirection::Ascending);

    let first = base.clone().paginate(1, 2).results(&backend).unwrap();
    let second = base.clone().paginate(2, 2).results(&backend).unwrap();
    let third = base.clone().paginate(3, 2).results(&backend).unwrap();
    let beyond = base.paginate(4, 2).results(&backend).unwrap();

    assert_eq!(names(&first), vec!["A", "B"]);
    assert_eq!(names(&second), vec!["C", "D"]);
    assert_eq!(names(&third), vec!["E"]);
    assert!(beyond.records.is_empty());

    for page in [&first, &second, &third, &beyond] {
        assert_eq!(page.total_count, 5);
        assert!(page.records.len() <= page.per_page as usize);
        assert_eq!(page.total_pages(), 3);
    }
    assert!(first.has_next());
    assert!(!third.has_next());
}

#[test]
fn test_page_size_is_clamped() {
    let (backend, _) = seeded_backend();
    let page = QueryContext::new()
        .with_max_per_page(3)
        .paginate(0, 50)
        .results(&backend)
        .unwrap();

    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 3);
    assert_eq!(page.records.len(), 3);
    assert_eq!(page.total_count, 5);
}

#[test]
fn test_total_count_ignores_join_fan_out() {
    let (backend, _) = seeded_backend();
    let ctx = QueryContext::new()
        .with_batch_conditions(|b| {
            b.quantity_greater_than(0);
        })
        .paginate(1, 1);

    let page = ctx.results(&backend).unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.total_count, 2);
    assert_eq!(ctx.count(&backend).unwrap(), 2);
}
