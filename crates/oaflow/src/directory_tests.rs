// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn default_queries_join_vendor_tables() -> anyhow::Result<()> {
    let q = DirectoryQueries::new(&DirectoryConfig::default())?;
    assert_eq!(
        q.by_work_code,
        r#"SELECT u."ID", u."DEPARTMENTID" FROM "ECOLOGY"."HRMRESOURCE" u WHERE u."LOGINID" = $1"#
    );
    assert!(q.by_work_codes.ends_with(r#"WHERE u."LOGINID" = ANY($1)"#));
    assert!(q
        .all_users
        .contains(r#"LEFT JOIN "ECOLOGY"."HRMDEPARTMENT" d ON u."DEPARTMENTID" = d."ID""#));
    assert!(q.all_users.contains(r#"d."DEPARTMENTNAME", u."LASTNAME""#));
    assert!(q.all_users.ends_with(r#"WHERE u."LOGINID" IS NOT NULL"#));
    Ok(())
}

#[test]
fn overridden_columns_flow_into_queries() -> anyhow::Result<()> {
    let config = DirectoryConfig {
        user_table: "hr.staff".into(),
        user_staff_code_column: "work_code".into(),
        ..DirectoryConfig::default()
    };
    let q = DirectoryQueries::new(&config)?;
    assert!(q.by_work_code.contains(r#"FROM "hr"."staff" u WHERE u."work_code" = $1"#));
    Ok(())
}

#[yare::parameterized(
    injection = { "HRMRESOURCE; DROP TABLE x" },
    quote = { "ID'" },
    empty = { "" },
    empty_segment = { "ECOLOGY..HRMRESOURCE" },
    space = { "LAST NAME" },
)]
fn unsafe_identifiers_are_rejected(name: &str) {
    let config = DirectoryConfig { user_name_column: name.to_owned(), ..DirectoryConfig::default() };
    assert!(matches!(DirectoryQueries::new(&config), Err(OaError::Usage(_))));
}

#[yare::parameterized(
    plain = { "LOGINID", r#""LOGINID""# },
    qualified = { "ECOLOGY.HRMRESOURCE", r#""ECOLOGY"."HRMRESOURCE""# },
    dollar = { "V$USERS", r#""V$USERS""# },
    lower = { "oa_user_info", r#""oa_user_info""# },
)]
fn safe_identifiers_are_quoted(name: &str, quoted: &str) {
    assert_eq!(ident(name).ok().as_deref(), Some(quoted));
}

#[yare::parameterized(
    with_code = { Some("A0009527"), true },
    blank = { Some("  "), false },
    missing = { None, false },
)]
fn active_requires_staff_code(code: Option<&str>, expected: bool) {
    let record = OaUserRecord {
        id: 18781,
        staff_code: code.map(str::to_owned),
        department_id: Some(21),
        department_name: None,
        display_name: None,
    };
    assert_eq!(record.is_active(), expected);
}
