//! `#[derive(Record)]` expansion checks. No database needed.

use pgguard::qb::{self, DEFAULT_IGNORED, Filter, Page};
use pgguard::{Record, descriptor_of, table_name};

#[derive(Debug, Default, Clone, Record)]
struct OrderItem {
    #[orm(column = "id")]
    id: i64,
    #[orm(column = "sku_code")]
    sku: String,
    #[orm(column = "quantity")]
    quantity: i32,
    #[orm(column = "note")]
    note: Option<String>,
    #[orm(column = "created_at")]
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[test]
fn name_and_fields_follow_declaration() {
    assert_eq!(OrderItem::NAME, "OrderItem");
    let columns: Vec<_> = OrderItem::FIELDS.iter().map(|f| f.column).collect();
    assert_eq!(
        columns,
        vec!["id", "sku_code", "quantity", "note", "created_at"]
    );
    assert_eq!(OrderItem::FIELDS[1].field, "sku");
}

#[test]
fn descriptor_is_cached_per_type() {
    let a = descriptor_of::<OrderItem>().unwrap();
    let b = descriptor_of::<OrderItem>().unwrap();
    assert!(std::ptr::eq(a, b));
    assert_eq!(a.field_index("sku_code"), Some(1));
    assert_eq!(a.field_index("sku"), None);
    assert_eq!(table_name::<OrderItem>().unwrap(), "order_items");
}

#[test]
fn field_params_cover_every_field() {
    let item = OrderItem {
        sku: "A-1".into(),
        quantity: 2,
        ..Default::default()
    };
    for idx in 0..OrderItem::FIELDS.len() {
        assert!(item.field_param(idx).is_some(), "field {idx}");
    }
    assert!(item.field_param(OrderItem::FIELDS.len()).is_none());
    assert_eq!(format!("{:?}", item.field_param(1).unwrap()), "\"A-1\"");
}

#[test]
fn derived_record_drives_the_builders() {
    let item = OrderItem {
        sku: "A-1".into(),
        quantity: 2,
        note: None,
        ..Default::default()
    };
    let q = qb::insert_sql(&item, DEFAULT_IGNORED).unwrap();
    assert_eq!(
        q.sql,
        r#"INSERT INTO order_items ("sku_code", "quantity", "note") VALUES ($1, $2, $3)"#
    );
    assert_eq!(q.params.len(), 3);

    let q = qb::select_sql::<OrderItem>(
        &Filter::new().eq("sku_code", "A-1"),
        &Page::new().limit(1),
    )
    .unwrap();
    assert_eq!(
        q.sql,
        "SELECT * FROM order_items WHERE sku_code = $1 LIMIT $2"
    );
}
