//! Integration tests for loan status derivation from CSV exports.

use std::fs;

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use bookshelf::input::Parser;
use bookshelf::loader::{CATALOG_FILE, LOAN_LOG_FILE};
use bookshelf::status::{derive_loan_state_at, loan_history_at, RowStyle, RETURNED_LABEL};
use bookshelf::{BookshelfError, LoanState};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 30)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Write both CSV files into a fresh directory.
fn write_data(loans: &str, catalog: &str) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join(LOAN_LOG_FILE), loans).expect("Failed to write loan log");
    fs::write(dir.path().join(CATALOG_FILE), catalog).expect("Failed to write catalog");
    dir
}

fn parse(dir: &TempDir, file: &str) -> bookshelf::Sheet {
    Parser::new()
        .parse_file(dir.path().join(file))
        .expect("Failed to parse")
        .0
}

// =============================================================================
// Derivation Tests
// =============================================================================

#[test]
fn test_derive_from_csv_exports() {
    let dir = write_data(
        "\u{feff}등록일,코드,제목,대여자,상태\n\
         2024-06-25,B001,데미안,김철수,대출\n\
         2024-06-01,B002,어린 왕자,이영희,대출\n\
         \n\
         2024-06-02,B003,노인과 바다,박민수,대출\n\
         2024-06-10,B003,노인과 바다,박민수,반납\n",
        " 코드 , 제목 ,지은이,기타\n\
         B001,데미안,헤르만 헤세,\n\
         B002,어린 왕자,생텍쥐페리,\"1판, 2쇄\"\n\
         B003,노인과 바다,헤밍웨이\n\
         B004,페스트,카뮈,\n",
    );

    let log = parse(&dir, LOAN_LOG_FILE);
    let catalog = parse(&dir, CATALOG_FILE);
    let derived = derive_loan_state_at(&log, catalog, now()).unwrap();

    // Status and borrower columns are synthesized once.
    assert_eq!(derived.header, vec!["코드", "제목", "지은이", "기타", "대출여부", "대출자"]);
    assert_eq!(derived.schema.synthesized, vec![4, 5]);

    let cells = |code: &str| derived.find(code).unwrap().cells.clone();
    assert_eq!(cells("B001")[4], "on loan (9 days left)");
    assert_eq!(cells("B001")[5], "김철수");
    assert_eq!(cells("B002")[4], "overdue (15 days)");
    assert_eq!(cells("B002")[3], "1판, 2쇄");
    assert_eq!(cells("B003")[4], RETURNED_LABEL);
    assert_eq!(cells("B003")[5], "");
    assert_eq!(cells("B004")[4], "");

    assert_eq!(derived.on_loan().count(), 2);
}

#[test]
fn test_last_row_wins_even_with_out_of_order_dates() {
    let dir = write_data(
        "대출일,코드,대출자,상태\n\
         2024-06-20,B001,김,반납\n\
         2024-06-01,B001,이,대출\n",
        "코드,제목\nB001,데미안\n",
    );

    let derived = derive_loan_state_at(
        &parse(&dir, LOAN_LOG_FILE),
        parse(&dir, CATALOG_FILE),
        now(),
    )
    .unwrap();

    // Row order, not date order, decides: the later row is a loan.
    let entry = &derived.entries[0];
    assert_eq!(entry.status.as_ref().unwrap().state, LoanState::Overdue { days_overdue: 15 });
    assert_eq!(entry.cell(derived.schema.borrower), "이");
    assert_eq!(entry.style(Some(derived.schema.status)), RowStyle::Overdue);
    assert_eq!(derived.records["B001"].last_return.as_deref(), Some("2024-06-20"));
}

#[test]
fn test_existing_status_columns_are_reused() {
    let dir = write_data(
        "등록일,코드,대여자,상태\n2024-06-28,B001,김,대출\n",
        "코드,제목,대출여부,대출자\nB001,데미안,old,old\n",
    );

    let derived = derive_loan_state_at(
        &parse(&dir, LOAN_LOG_FILE),
        parse(&dir, CATALOG_FILE),
        now(),
    )
    .unwrap();

    assert!(derived.schema.synthesized.is_empty());
    assert_eq!(derived.entries[0].cells, vec!["B001", "데미안", "on loan (12 days left)", "김"]);
}

#[test]
fn test_missing_log_column_is_reported() {
    let dir = write_data("코드,대여자,상태\nB001,김,대출\n", "코드\nB001\n");

    let err = derive_loan_state_at(
        &parse(&dir, LOAN_LOG_FILE),
        parse(&dir, CATALOG_FILE),
        now(),
    )
    .unwrap_err();

    match err {
        BookshelfError::MissingColumn { role, table } => {
            assert_eq!(role, "date");
            assert_eq!(table, "loan log");
        }
        other => panic!("unexpected error: {}", other),
    }
}

// =============================================================================
// History Tests
// =============================================================================

#[test]
fn test_history_lists_every_row_for_code() {
    let dir = write_data(
        "등록일,코드,대여자,상태\n\
         2024-05-01,B001,김,대출\n\
         2024-05-10,B001,김,반납\n\
         2024-06-25,B002,이,대출\n\
         2024-06-26,B001,박,대출\n",
        "코드\nB001\n",
    );

    let history = loan_history_at(&parse(&dir, LOAN_LOG_FILE), " B001 ", now()).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].status.state, LoanState::Overdue { days_overdue: 46 });
    assert_eq!(history[1].status.state, LoanState::Returned);
    assert_eq!(history[2].borrower, "박");
    assert_eq!(history[2].status.display, "on loan (10 days left)");
}
