//! Built-in resource catalog: bets, events, transactions, bookmakers and sports metadata.

use crate::catalog::entity::{ColumnInfo, EntityOperation, PkType, ResolvedEntity, ValidationRule};
use serde_json::json;
use std::collections::HashMap;

const SCHEMA: &str = "public";

const CRUD: &[EntityOperation] = &[
    EntityOperation::Read,
    EntityOperation::Create,
    EntityOperation::Update,
    EntityOperation::Delete,
];
const READ_ONLY: &[EntityOperation] = &[EntityOperation::Read];

fn id_column() -> ColumnInfo {
    ColumnInfo {
        name: "id".into(),
        pk_type: Some(PkType::BigInt),
        nullable: false,
        has_default: true,
        pg_type: Some("bigint".into()),
    }
}

fn entity(resource: &str, table: &str, operations: &[EntityOperation], columns: Vec<ColumnInfo>) -> ResolvedEntity {
    let mut all = vec![id_column()];
    all.extend(columns);
    for name in ["created_at", "updated_at"] {
        all.push(ColumnInfo {
            name: name.into(),
            pk_type: None,
            nullable: true,
            has_default: true,
            pg_type: Some("timestamptz".into()),
        });
    }
    ResolvedEntity {
        resource: resource.to_string(),
        schema_name: SCHEMA.to_string(),
        table_name: table.to_string(),
        pk_column: "id".to_string(),
        pk_type: PkType::BigInt,
        columns: all,
        operations: operations.to_vec(),
        search_column: None,
        order_column: None,
        validation: HashMap::new(),
    }
}

fn rules(entries: Vec<(&str, ValidationRule)>) -> HashMap<String, ValidationRule> {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn required() -> ValidationRule {
    ValidationRule {
        required: Some(true),
        ..Default::default()
    }
}

fn date() -> ValidationRule {
    ValidationRule {
        format: Some("date".into()),
        ..required()
    }
}

fn bets() -> ResolvedEntity {
    let mut e = entity(
        "bets",
        "bets",
        CRUD,
        vec![
            ColumnInfo::typed("bet_date", "timestamptz").required(),
            ColumnInfo::typed("global_odds", "numeric").required(),
            ColumnInfo::text("bet_code"),
            ColumnInfo::text("result"),
            ColumnInfo::typed("sport_id", "bigint"),
            ColumnInfo::typed("stake", "numeric").required(),
        ],
    );
    e.order_column = Some("bet_date".into());
    e.validation = rules(vec![
        ("bet_date", date()),
        (
            "global_odds",
            ValidationRule {
                minimum: Some(1.0),
                ..required()
            },
        ),
        (
            "stake",
            ValidationRule {
                minimum: Some(0.0),
                ..required()
            },
        ),
        (
            "result",
            ValidationRule {
                allowed: Some(vec![json!("won"), json!("lost"), json!("void"), json!("pending")]),
                ..Default::default()
            },
        ),
        (
            "bet_code",
            ValidationRule {
                max_length: Some(255),
                ..Default::default()
            },
        ),
    ]);
    e
}

fn events() -> ResolvedEntity {
    let mut e = entity(
        "events",
        "events",
        CRUD,
        vec![
            ColumnInfo::typed("team1_id", "bigint"),
            ColumnInfo::typed("team2_id", "bigint"),
            ColumnInfo::typed("league_id", "bigint"),
            ColumnInfo::text("type"),
            ColumnInfo::text("market"),
            ColumnInfo::typed("odd", "numeric"),
            ColumnInfo::typed("event_date", "timestamptz"),
        ],
    );
    e.order_column = Some("event_date".into());
    e.validation = rules(vec![(
        "odd",
        ValidationRule {
            minimum: Some(1.0),
            ..Default::default()
        },
    )]);
    e
}

fn transactions() -> ResolvedEntity {
    let mut e = entity(
        "transactions",
        "transactions",
        CRUD,
        vec![
            ColumnInfo::text("type").required(),
            ColumnInfo::typed("amount", "numeric").required(),
            ColumnInfo::typed("transaction_date", "date").required(),
            ColumnInfo::text("description"),
            ColumnInfo::text("method"),
        ],
    );
    e.order_column = Some("transaction_date".into());
    e.validation = rules(vec![
        (
            "type",
            ValidationRule {
                allowed: Some(vec![json!("deposit"), json!("withdraw")]),
                ..required()
            },
        ),
        (
            "amount",
            ValidationRule {
                minimum: Some(0.01),
                ..required()
            },
        ),
        ("transaction_date", date()),
        (
            "description",
            ValidationRule {
                max_length: Some(255),
                ..Default::default()
            },
        ),
        (
            "method",
            ValidationRule {
                max_length: Some(100),
                ..Default::default()
            },
        ),
    ]);
    e
}

fn bookmakers() -> ResolvedEntity {
    let mut e = entity(
        "bookmakers",
        "bookmakers",
        CRUD,
        vec![
            ColumnInfo::text("bookmaker_name").required(),
            ColumnInfo::text("bookmaker_img"),
        ],
    );
    e.order_column = Some("bookmaker_name".into());
    e.search_column = Some("bookmaker_name".into());
    e.validation = rules(vec![(
        "bookmaker_name",
        ValidationRule {
            max_length: Some(255),
            ..required()
        },
    )]);
    e
}

fn named(resource: &str, extra: Vec<ColumnInfo>) -> ResolvedEntity {
    let mut columns = vec![ColumnInfo::text("name").required()];
    columns.extend(extra);
    let mut e = entity(resource, resource, READ_ONLY, columns);
    e.order_column = Some("name".into());
    e.search_column = Some("name".into());
    e
}

fn countries() -> ResolvedEntity {
    named("countries", vec![ColumnInfo::text("code"), ColumnInfo::text("slug")])
}

fn sports() -> ResolvedEntity {
    named(
        "sports",
        vec![
            ColumnInfo::text("slug"),
            ColumnInfo::text("img"),
            ColumnInfo::typed("sofascore_id", "bigint"),
        ],
    )
}

fn leagues() -> ResolvedEntity {
    named(
        "leagues",
        vec![
            ColumnInfo::text("slug"),
            ColumnInfo::text("img"),
            ColumnInfo::typed("sport_id", "bigint"),
            ColumnInfo::typed("country_id", "bigint"),
            ColumnInfo::typed("sofascore_id", "bigint"),
        ],
    )
}

fn teams() -> ResolvedEntity {
    named(
        "teams",
        vec![
            ColumnInfo::text("nickname"),
            ColumnInfo::text("slug"),
            ColumnInfo::text("img"),
            ColumnInfo::typed("sofascore_id", "bigint"),
            ColumnInfo::typed("league_id", "bigint"),
        ],
    )
}

/// Every entity the API exposes.
pub fn builtin_entities() -> Vec<ResolvedEntity> {
    vec![
        bets(),
        events(),
        transactions(),
        bookmakers(),
        countries(),
        sports(),
        leagues(),
        teams(),
    ]
}
