use super::*;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::engine::decisions::{DecisionCache, DecisionKey};
use crate::engine::duplicates::DuplicateDetector;
use crate::engine::reconciliation::ActReconciler;
use crate::engine::report::Rejection;
use crate::engine::transfer::mirror;
use crate::models::{articles, ActFlag, ActsIndex, DuplicateOrigin, Entry, RowError, RowErrorKind, WalletBook};
use crate::operator::{Button, Operator, Prompt, Response, ScriptedOperator, SilentOperator};
use crate::storage::layout::{colors, inbox, ledger};
use crate::storage::{CellStyle, Grid, Properties, Region, Sheet, StorageError, Workbook};
use crate::types::{Cell, ColumnNumber, RowNumber};

const DICTIONARY: [[&str; 5]; 7] = [
    ["Расход", "Зарплата", "Зарплата", "Иванов", ""],
    ["Расход", "Переводы", "Перевод на кошелек", "Наличные", ""],
    ["Доход", "Переводы", "Пополнение кошелька", "Карта", ""],
    ["Расход", "Мастера", "% Мастер", "#адрес", "акт"],
    ["Расход", "Мастера", "Возврат удержания", "#адрес", "акт"],
    ["Доход", "Выручка", "Выручка по акту", "#адрес", ""],
    ["Расход", "Материалы", "Материалы", "Леруа", ""]
];

const ACTS: [[&str; 18]; 2] = [
    ["1", "ул. Ленина 1", "акт 5", "", "100000", "", "", "", "", "5000", "20000", "", "", "", "", "", "", ""],
    ["2", "ул. Мира 7", "акт 12", "", "50000", "", "", "", "", "3000", "10000", "", "", "", "", "TRUE", "", ""]
];

/// Operator who never answers in time.
struct StalledOperator;

impl Operator for StalledOperator {
    async fn ask(&self, _prompt: Prompt) -> Option<Response> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        None
    }
}

/// Workbook whose styling calls always fail while values still save.
struct UnstyledWorkbook(Workbook);

impl Grid for UnstyledWorkbook {
    fn last_row(&self, sheet: Sheet) -> RowNumber {
        self.0.last_row(sheet)
    }

    fn read_region(&self, sheet: Sheet, region: Region) -> Result<Vec<Vec<Cell>>, StorageError> {
        self.0.read_region(sheet, region)
    }

    fn read_formulas(&self, sheet: Sheet, region: Region) -> Result<Vec<Vec<String>>, StorageError> {
        self.0.read_formulas(sheet, region)
    }

    fn write_region(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber, values: &[Vec<Cell>]) -> Result<(), StorageError> {
        self.0.write_region(sheet, row, column, values)
    }

    fn clear_region(&self, sheet: Sheet, region: Region) -> Result<(), StorageError> {
        self.0.clear_region(sheet, region)
    }

    fn read_styles(&self, sheet: Sheet, region: Region) -> Result<Vec<Vec<CellStyle>>, StorageError> {
        self.0.read_styles(sheet, region)
    }

    fn write_styles(&self, sheet: Sheet, _row: RowNumber, _column: ColumnNumber, _styles: &[Vec<CellStyle>]) -> Result<(), StorageError> {
        Err(StorageError::Protected(sheet))
    }

    fn set_strike_through(&self, sheet: Sheet, _region: Region) -> Result<(), StorageError> {
        Err(StorageError::Protected(sheet))
    }

    fn remove_filter(&self, sheet: Sheet) -> Result<(), StorageError> {
        self.0.remove_filter(sheet)
    }
}

impl Properties for UnstyledWorkbook {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.set(key, value)
    }
}

fn date(day: u32, month: u32, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

fn today() -> NaiveDate {
    date(20, 12, 2025)
}

fn options(auto: bool) -> RunOptions {
    RunOptions {
        auto,
        today: Some(today()),
        prompt_timeout: Duration::from_millis(50),
        ..RunOptions::default()
    }
}

fn row(fields: &[&str]) -> Vec<Cell> {
    fields.iter().map(|field| Cell::parse(field)).collect()
}

fn create_workbook() -> Result<Arc<Workbook>> {
    let workbook = Workbook::new();

    workbook.write_region(Sheet::Dictionary, 1, 1, &[row(&["Тип", "Категория", "Статья", "Расшифровка", "Акт"])])?;
    workbook.write_region(Sheet::Dictionary, 2, 1, &DICTIONARY.iter().map(|fields| row(fields)).collect::<Vec<_>>())?;
    workbook.write_region(
        Sheet::Ledger,
        1,
        1,
        &[row(&["Дата", "Кошелек", "Сумма", "Статья", "Расшифровка", "Акт", "Категория", "Тип", "Подсказка", "Прораб"])]
    )?;
    workbook.write_region(Sheet::Acts, 1, 1, &[row(&["№", "Адрес", "Акт"])])?;
    workbook.write_region(Sheet::Acts, 2, 1, &ACTS.iter().map(|fields| row(fields)).collect::<Vec<_>>())?;

    Ok(Arc::new(workbook))
}

fn put_inbox(workbook: &Workbook, offset: usize, fields: [&str; 11]) -> Result<()> {
    workbook.write_region(Sheet::Inbox, inbox::FIRST_ROW + offset, inbox::FIRST_COLUMN, &[row(&fields)])?;
    Ok(())
}

fn salary<'a>(day: &'a str, amount: &'a str, decoding: &'a str) -> [&'a str; 11] {
    [day, "Наличные", amount, "Зарплата", decoding, "", "", "Зарплата", "Расход", "", ""]
}

fn payout<'a>(article: &'a str, address: &'a str, act: &'a str) -> [&'a str; 11] {
    ["17.12.2025", "Наличные", "20000", article, address, act, "", "Мастера", "Расход", "", ""]
}

fn ledger_row(workbook: &Workbook, row: usize) -> Vec<Cell> {
    (1..=ledger::WIDTH).map(|column| workbook.cell(Sheet::Ledger, row, column)).collect()
}

fn kinds(report: &RunReport) -> Vec<RowErrorKind> {
    report.rejections.iter().map(|rejection| rejection.error.kind()).collect()
}

async fn run_auto(workbook: &Arc<Workbook>) -> Result<RunReport> {
    TransferEngine::new(workbook.clone(), SilentOperator).with_options(options(true)).run().await
}

fn sample_entry(article: &str, wallet: &str, decoding: &str) -> Entry {
    Entry {
        date: date(17, 12, 2025),
        wallet: wallet.to_string(),
        amount: Decimal::from(3000),
        article: article.to_string(),
        decoding: decoding.to_string(),
        act_reference: String::new(),
        category: "Переводы".to_string(),
        entry_type: "Расход".to_string(),
        hint: String::new(),
        foreman: String::new()
    }
}

#[tokio::test]
async fn test_engine_transfers_valid_row_and_clears_editable_columns() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Иванов"))?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 1);
    assert!(report.rejections.is_empty());
    assert_eq!(ledger_row(&workbook, 2), vec![
        Cell::Date(date(17, 12, 2025)),
        Cell::text("Наличные"),
        Cell::Number(Decimal::from(5000)),
        Cell::text("Зарплата"),
        Cell::text("Иванов"),
        Cell::Empty,
        Cell::text("Зарплата"),
        Cell::text("Расход"),
        Cell::Empty,
        Cell::Empty
    ]);

    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW, 2), Cell::Empty);
    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW, 7), Cell::Empty);
    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW, 9), Cell::text("Зарплата"));

    assert_eq!(workbook.style(Sheet::Ledger, 2, ledger::AMOUNT_COLUMN).background.as_deref(), Some(colors::EXPENSE_AMOUNT));
    assert_eq!(workbook.style(Sheet::Ledger, 2, ledger::WALLET_COLUMN).background.as_deref(), Some("#0dac50"));
    assert_eq!(workbook.get(ledger::LAST_ROW_PROPERTY).as_deref(), Some("2"));

    Ok(())
}

#[tokio::test]
async fn test_engine_rejects_ledger_duplicate_in_auto_mode() -> Result<()> {
    let workbook = create_workbook()?;
    workbook.write_region(Sheet::Ledger, 2, 1, &[row(&["17.12.2025", "Наличные", "5000", "Зарплата", "Иванов"])])?;
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Иванов"))?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 0);
    assert_eq!(report.rejections, vec![Rejection {
        row: inbox::FIRST_ROW,
        error: RowError::DuplicateRejected {
            key: "17.12.2025|Зарплата|Иванов|5000".to_string(),
            origin: DuplicateOrigin::Ledger
        }
    }]);
    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW, 2), Cell::text("17.12.2025"));
    assert_eq!(workbook.last_row(Sheet::Ledger), 2);

    Ok(())
}

#[tokio::test]
async fn test_engine_writes_first_of_two_identical_rows() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Иванов"))?;
    put_inbox(&workbook, 1, salary("17.12.2025", "5000", "Иванов"))?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 1);
    assert_eq!(report.rejections.len(), 1);
    assert_eq!(report.rejections[0].row, inbox::FIRST_ROW + 1);
    assert!(matches!(
        report.rejections[0].error,
        RowError::DuplicateRejected { origin: DuplicateOrigin::SameRun, .. }
    ));
    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW, 2), Cell::Empty);
    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW + 1, 2), Cell::text("17.12.2025"));

    Ok(())
}

#[tokio::test]
async fn test_engine_enters_duplicates_when_operator_agrees() -> Result<()> {
    let workbook = create_workbook()?;
    workbook.write_region(Sheet::Ledger, 2, 1, &[row(&["17.12.2025", "Наличные", "5000", "Зарплата", "Иванов"])])?;
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Иванов"))?;
    put_inbox(&workbook, 1, salary("17.12.2025", "5000", "Иванов"))?;

    let operator = ScriptedOperator::new(vec![Some(Response::button(Button::Yes))]);
    let report = TransferEngine::new(workbook.clone(), &operator).with_options(options(false)).run().await?;

    let asked = operator.asked();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].title, "Possible duplicates");
    assert_eq!(report.written, 2);
    assert!(report.rejections.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_engine_rejects_duplicates_when_operator_is_silent() -> Result<()> {
    let workbook = create_workbook()?;
    workbook.write_region(Sheet::Ledger, 2, 1, &[row(&["17.12.2025", "Наличные", "5000", "Зарплата", "Иванов"])])?;
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Иванов"))?;

    let report = TransferEngine::new(workbook.clone(), StalledOperator).with_options(options(false)).run().await?;

    assert_eq!(report.written, 0);
    assert_eq!(kinds(&report), vec![RowErrorKind::DuplicateRejected]);

    Ok(())
}

#[tokio::test]
async fn test_engine_books_mirror_entry_for_transfer() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, ["17.12.2025", "Карта", "3000", "Перевод на кошелек", "наличные", "", "", "Переводы", "Расход", "", ""])?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 2);
    assert_eq!(ledger_row(&workbook, 3), vec![
        Cell::Date(date(17, 12, 2025)),
        Cell::text("Наличные"),
        Cell::Number(Decimal::from(3000)),
        Cell::text(articles::TOP_UP),
        Cell::text("Карта"),
        Cell::Empty,
        Cell::text(articles::TRANSFER_CATEGORY),
        Cell::text("Доход"),
        Cell::Empty,
        Cell::Empty
    ]);
    assert_eq!(workbook.style(Sheet::Ledger, 3, ledger::AMOUNT_COLUMN).background.as_deref(), Some(colors::INCOME_AMOUNT));

    Ok(())
}

#[tokio::test]
async fn test_engine_rejects_transfer_to_unknown_wallet() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, ["17.12.2025", "Карта", "3000", "Перевод на кошелек", "Сейф", "", "", "Переводы", "Расход", "", ""])?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 0);
    assert_eq!(kinds(&report), vec![RowErrorKind::TransferMirrorRejected]);
    assert_eq!(workbook.last_row(Sheet::Ledger), 1);

    Ok(())
}

#[tokio::test]
async fn test_engine_sets_wage_flag_and_marks_hands_settled() -> Result<()> {
    let workbook = create_workbook()?;
    workbook.write_region(Sheet::Acts, 2, 11, &[vec![Cell::Number(Decimal::from(20000))]])?;
    put_inbox(&workbook, 0, payout("% Мастер", "ул. Ленина 1", "акт 5"))?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 1);
    assert_eq!(workbook.cell(Sheet::Acts, 2, ActFlag::WagePaid.column()), Cell::Bool(true));
    assert_eq!(workbook.cell(Sheet::Acts, 3, ActFlag::WagePaid.column()), Cell::Bool(true));

    let hands = workbook.style(Sheet::Acts, 2, ActFlag::WagePaid.settled_column());
    assert_eq!(hands.background.as_deref(), Some(colors::SETTLED_BACKGROUND));
    assert_eq!(hands.font_color.as_deref(), Some(colors::SETTLED_FONT));
    assert!(hands.strike_through);
    assert!(!workbook.style(Sheet::Acts, 3, ActFlag::WagePaid.settled_column()).strike_through);

    Ok(())
}

#[tokio::test]
async fn test_engine_sets_deposit_flag_once_per_run() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, payout("Возврат удержания", "ул. Ленина 1", "акт 5"))?;
    let mut second = payout("Возврат удержания", "ул. Ленина 1", "акт 5");
    second[2] = "1000";
    put_inbox(&workbook, 1, second)?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 1);
    assert_eq!(kinds(&report), vec![RowErrorKind::AlreadyPaidOut]);
    assert_eq!(workbook.cell(Sheet::Acts, 2, ActFlag::DepositReturned.column()), Cell::Bool(true));
    assert!(workbook.style(Sheet::Acts, 2, ActFlag::DepositReturned.settled_column()).strike_through);

    Ok(())
}

#[tokio::test]
async fn test_engine_rejects_repeated_payout_in_auto_mode() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, payout("% Мастер", "ул. Мира 7", "акт 12"))?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.rejections, vec![Rejection {
        row: inbox::FIRST_ROW,
        error: RowError::AlreadyPaidOut { key: "ул. Мира 7|акт 12".to_string(), flag: ActFlag::WagePaid }
    }]);

    Ok(())
}

#[tokio::test]
async fn test_engine_pays_out_again_when_operator_agrees() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, payout("% Мастер", "ул. Мира 7", "акт 12"))?;

    let operator = ScriptedOperator::new(vec![Some(Response::button(Button::Yes))]);
    let report = TransferEngine::new(workbook.clone(), &operator).with_options(options(false)).run().await?;

    assert_eq!(report.written, 1);
    assert_eq!(operator.asked()[0].title, "Repeated payouts");
    assert_eq!(workbook.cell(Sheet::Acts, 3, ActFlag::WagePaid.column()), Cell::Bool(true));

    Ok(())
}

#[tokio::test]
async fn test_engine_validates_act_references() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, payout("% Мастер", "ул. Ленина 1", ""))?;
    put_inbox(&workbook, 1, payout("% Мастер", "ул. Ленина 1", "5"))?;
    put_inbox(&workbook, 2, payout("% Мастер", "ул. Ленина 1", "Акт 99"))?;

    let flag_columns = Region::new(2, ActFlag::WagePaid.column(), 2, 2);
    let flags_before = workbook.read_region(Sheet::Acts, flag_columns)?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 0);
    assert_eq!(report.rejections.iter().map(|rejection| rejection.error.clone()).collect::<Vec<_>>(), vec![
        RowError::ActRequiredButMissing { article: "% Мастер".to_string() },
        RowError::MissingActNumber { act_reference: "5".to_string() },
        RowError::ActNotFoundInRegister { key: "ул. Ленина 1|Акт 99".to_string() }
    ]);
    assert_eq!(workbook.read_region(Sheet::Acts, flag_columns)?, flags_before);
    assert_eq!(workbook.style(Sheet::Acts, 2, ActFlag::WagePaid.settled_column()).background, None);

    let register = workbook.read_region(Sheet::Acts, Region::new(2, 1, 2, 18))?;
    let reconciler = ActReconciler::new(ActsIndex::build(register));
    let mut unknown_act = sample_entry("% Мастер", "Наличные", "ул. Ленина 1");
    unknown_act.act_reference = "Акт 99".to_string();

    assert!(reconciler.claim(&unknown_act).is_err());
    assert!(reconciler.into_updates().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_engine_keeps_wildcard_row_without_decoding_in_inbox() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, ["17.12.2025", "Карта", "100000", "Выручка по акту", "", "акт 5", "", "Выручка", "Доход", "", ""])?;

    let block = Region::new(inbox::FIRST_ROW, inbox::FIRST_COLUMN, 1, inbox::WIDTH);
    let before = workbook.read_region(Sheet::Inbox, block)?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 0);
    assert_eq!(report.rejections[0].error, RowError::WildcardArticleMissingDecoding { article: "Выручка по акту".to_string() });
    assert_eq!(kinds(&report), vec![RowErrorKind::WildcardArticleMissingDecoding]);
    assert_eq!(workbook.last_row(Sheet::Ledger), 1);
    assert_eq!(workbook.read_region(Sheet::Inbox, block)?, before);
    assert_eq!(workbook.style(Sheet::Acts, 2, 5).background, None);

    Ok(())
}

#[tokio::test]
async fn test_engine_rejects_payouts_without_acts_register() -> Result<()> {
    let workbook = create_workbook()?;
    workbook.clear_region(Sheet::Acts, Region::new(1, 1, 3, 18))?;
    put_inbox(&workbook, 0, payout("% Мастер", "ул. Ленина 1", "акт 5"))?;
    put_inbox(&workbook, 1, salary("17.12.2025", "5000", "Иванов"))?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 1);
    assert_eq!(kinds(&report), vec![RowErrorKind::ActsRegisterUnavailable]);

    Ok(())
}

#[tokio::test]
async fn test_engine_colors_revenue_cell_with_wallet_color() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, ["17.12.2025", "Карта", "100000", "Выручка по акту", "ул. Ленина 1", "акт 5", "", "Выручка", "Доход", "", ""])?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 1);
    assert_eq!(workbook.style(Sheet::Acts, 2, 5).background.as_deref(), Some("#17ddee"));
    assert_eq!(workbook.style(Sheet::Acts, 3, 5).background, None);
    assert_eq!(workbook.cell(Sheet::Acts, 2, ActFlag::WagePaid.column()), Cell::Empty);

    Ok(())
}

#[tokio::test]
async fn test_engine_collects_row_errors_by_kind() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, ["17.12.2025", "", "5000", "Зарплата", "Иванов", "", "", "Зарплата", "Расход", "", ""])?;
    put_inbox(&workbook, 1, salary("17.12.2025", "0", "Иванов"))?;
    put_inbox(&workbook, 2, salary("32.13.2025", "5000", "Иванов"))?;
    put_inbox(&workbook, 3, ["17.12.2025", "Наличные", "5000", "", "Иванов", "", "", "Зарплата", "Расход", "", ""])?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 0);
    assert_eq!(kinds(&report), vec![
        RowErrorKind::MissingWallet,
        RowErrorKind::MissingOrZeroAmount,
        RowErrorKind::UnparseableDate,
        RowErrorKind::MissingClassification
    ]);
    assert_eq!(report.counts().values().sum::<usize>(), 4);

    for offset in 0..4 {
        assert!(!workbook.cell(Sheet::Inbox, inbox::FIRST_ROW + offset, 4).is_blank());
    }

    Ok(())
}

#[tokio::test]
async fn test_engine_uses_alternate_article_and_today_for_blank_date() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, ["", "Наличные", "1500", "", "Леруа", "", "Материалы", "Материалы", "Расход", "", ""])?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 1);
    assert_eq!(workbook.cell(Sheet::Ledger, 2, 1), Cell::Date(today()));
    assert_eq!(workbook.cell(Sheet::Ledger, 2, 4), Cell::text("Материалы"));

    Ok(())
}

#[tokio::test]
async fn test_engine_moves_dates_into_current_month_when_operator_declines() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, salary("30.11.2025", "5000", "Иванов"))?;

    let operator = ScriptedOperator::new(vec![Some(Response::button(Button::No))]);
    let report = TransferEngine::new(workbook.clone(), &operator).with_options(options(false)).run().await?;

    assert_eq!(operator.asked()[0].title, "Date check");
    assert_eq!(report.written, 1);
    assert_eq!(workbook.cell(Sheet::Ledger, 2, 1), Cell::Date(date(30, 12, 2025)));

    Ok(())
}

#[tokio::test]
async fn test_engine_moves_dates_when_prompt_times_out() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, salary("05.01.2026", "5000", "Иванов"))?;

    let report = TransferEngine::new(workbook.clone(), StalledOperator).with_options(options(false)).run().await?;

    assert_eq!(report.written, 1);
    assert_eq!(workbook.cell(Sheet::Ledger, 2, 1), Cell::Date(date(5, 12, 2025)));

    Ok(())
}

#[tokio::test]
async fn test_engine_keeps_dates_when_operator_agrees() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, salary("30.11.2025", "5000", "Иванов"))?;

    let operator = ScriptedOperator::new(vec![Some(Response::button(Button::Yes))]);
    TransferEngine::new(workbook.clone(), &operator).with_options(options(false)).run().await?;

    assert_eq!(workbook.cell(Sheet::Ledger, 2, 1), Cell::Date(date(30, 11, 2025)));

    Ok(())
}

#[tokio::test]
async fn test_engine_keeps_dates_in_auto_mode() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, salary("30.11.2025", "5000", "Иванов"))?;

    run_auto(&workbook).await?;

    assert_eq!(workbook.cell(Sheet::Ledger, 2, 1), Cell::Date(date(30, 11, 2025)));

    Ok(())
}

#[tokio::test]
async fn test_engine_does_not_overwrite_formula_dates() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, ["", "", "5000", "Зарплата", "Иванов", "", "", "Зарплата", "Расход", "", ""])?;
    workbook.set_formula(Sheet::Inbox, inbox::FIRST_ROW, inbox::FIRST_COLUMN, "=TODAY()-40", Cell::Date(date(10, 11, 2025)));
    put_inbox(&workbook, 1, ["15.11.2025", "", "5000", "Зарплата", "Иванов", "", "", "Зарплата", "Расход", "", ""])?;

    TransferEngine::new(workbook.clone(), SilentOperator).with_options(options(false)).run().await?;

    let formulas = workbook.read_formulas(Sheet::Inbox, Region::new(inbox::FIRST_ROW, inbox::FIRST_COLUMN, 1, 1))?;
    assert_eq!(formulas, vec![vec!["=TODAY()-40".to_string()]]);
    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW, 2), Cell::Date(date(10, 11, 2025)));
    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW + 1, 2), Cell::Date(date(15, 12, 2025)));

    Ok(())
}

#[tokio::test]
async fn test_engine_normalizes_inbox_text() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, ["17.12.2025", "Наличные\u{00A0}", "5000", " Зарплата ", "Иванов\u{00A0}", "", "", "Зарплата", "Расход", "", ""])?;
    put_inbox(&workbook, 1, ["17.12.2025", "", "700", "Материалы", "\u{00A0}Леруа ", "", "", "Материалы", "Расход", "", ""])?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 1);
    assert_eq!(kinds(&report), vec![RowErrorKind::MissingWallet]);
    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW + 1, 6), Cell::text("Леруа"));
    assert_eq!(workbook.cell(Sheet::Ledger, 2, 2), Cell::text("Наличные"));
    assert_eq!(workbook.cell(Sheet::Ledger, 2, 5), Cell::text("Иванов"));
    assert!(report.new_decodings.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_engine_remembers_ledger_position_when_styling_fails() -> Result<()> {
    let source = create_workbook()?;
    put_inbox(&source, 0, salary("17.12.2025", "5000", "Иванов"))?;
    put_inbox(&source, 1, salary("18.12.2025", "6000", "Иванов"))?;

    let workbook = Arc::try_unwrap(source).map_err(|_| anyhow!("workbook still shared"))?;
    let workbook = Arc::new(UnstyledWorkbook(workbook));

    let report = TransferEngine::new(workbook.clone(), SilentOperator).with_options(options(true)).run().await?;

    assert_eq!(report.written, 2);
    assert_eq!(workbook.get(ledger::LAST_ROW_PROPERTY).as_deref(), Some("3"));
    assert!(report.persistence_failures.iter().any(|failure| failure.starts_with("ledger styling")));
    assert!(!report.persistence_failures.iter().any(|failure| failure.starts_with("ledger position")));
    assert!(workbook.0.cell(Sheet::Inbox, inbox::FIRST_ROW, 4).is_blank());

    Ok(())
}

#[tokio::test]
async fn test_engine_leaves_inbox_intact_when_ledger_is_protected() -> Result<()> {
    let workbook = create_workbook()?;
    workbook.protect(Sheet::Ledger);
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Петров"))?;

    let mut options = options(true);
    options.approve_new_decodings = true;
    let report = TransferEngine::new(workbook.clone(), SilentOperator).with_options(options).run().await?;

    assert_eq!(report.written, 0);
    assert_eq!(report.persistence_failures.len(), 1);
    assert_eq!(workbook.cell(Sheet::Inbox, inbox::FIRST_ROW, 2), Cell::text("17.12.2025"));
    assert_eq!(workbook.last_row(Sheet::Dictionary), 8);

    Ok(())
}

#[tokio::test]
async fn test_engine_adds_new_decodings_when_approved_in_auto_mode() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Петров"))?;
    put_inbox(&workbook, 1, salary("17.12.2025", "7000", "Петров"))?;

    let mut options = options(true);
    options.approve_new_decodings = true;
    let report = TransferEngine::new(workbook.clone(), SilentOperator).with_options(options).run().await?;

    assert_eq!(report.new_decodings, vec!["Зарплата / Петров".to_string()]);
    assert_eq!(workbook.read_region(Sheet::Dictionary, Region::new(9, 1, 1, 5))?, vec![row(&["Расход", "Зарплата", "Зарплата", "Петров", ""])]);
    assert_eq!(workbook.last_row(Sheet::Dictionary), 9);

    Ok(())
}

#[tokio::test]
async fn test_engine_skips_new_decodings_in_auto_mode_by_default() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Петров"))?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 1);
    assert!(report.new_decodings.is_empty());
    assert_eq!(workbook.last_row(Sheet::Dictionary), 8);

    Ok(())
}

#[tokio::test]
async fn test_engine_lets_operator_edit_decodings_one_by_one() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Петров"))?;
    put_inbox(&workbook, 1, ["17.12.2025", "Наличные", "900", "Материалы", "Петрович", "", "", "Материалы", "Расход", "", ""])?;

    let operator = ScriptedOperator::new(vec![
        Some(Response::button(Button::Yes)),
        Some(Response::button(Button::No)),
        Some(Response::text("Петров П.")),
        Some(Response::button(Button::Cancel))
    ]);
    let report = TransferEngine::new(workbook.clone(), &operator).with_options(options(false)).run().await?;

    let asked = operator.asked();
    assert_eq!(asked.len(), 4);
    assert_eq!(asked[2].default_value, "Петров");
    assert_eq!(asked[3].default_value, "Петрович");
    assert_eq!(report.new_decodings, vec!["Зарплата / Петров П.".to_string()]);
    assert_eq!(workbook.cell(Sheet::Dictionary, 9, 4), Cell::text("Петров П."));
    assert_eq!(workbook.cell(Sheet::Ledger, 2, 5), Cell::text("Петров"));

    Ok(())
}

#[tokio::test]
async fn test_engine_reports_unknown_articles_and_big_amounts() -> Result<()> {
    let workbook = create_workbook()?;
    put_inbox(&workbook, 0, ["17.12.2025", "Наличные", "300", "Канцелярия", "Леруа", "", "", "Офис", "Расход", "", ""])?;
    put_inbox(&workbook, 1, salary("17.12.2025", "2500000", "Иванов"))?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 2);
    assert!(report.unknown_articles.contains("Канцелярия"));
    assert_eq!(report.big_amounts, vec!["2500000 Зарплата Иванов".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_engine_fills_gap_near_last_write_position() -> Result<()> {
    let workbook = create_workbook()?;
    workbook.set_filter(Sheet::Ledger);

    for (row_number, decoding) in [(2, "A"), (3, "B"), (4, "C"), (5, "D"), (8, "E")] {
        workbook.write_region(Sheet::Ledger, row_number, 1, &[row(&["01.12.2025", "Наличные", "10", "Материалы", decoding])])?;
    }

    workbook.set(ledger::LAST_ROW_PROPERTY, "8")?;
    put_inbox(&workbook, 0, salary("17.12.2025", "5000", "Иванов"))?;

    run_auto(&workbook).await?;

    assert_eq!(workbook.cell(Sheet::Ledger, 6, 5), Cell::text("Иванов"));
    assert_eq!(workbook.get(ledger::LAST_ROW_PROPERTY).as_deref(), Some("6"));
    assert!(!workbook.has_filter(Sheet::Ledger));

    Ok(())
}

#[tokio::test]
async fn test_engine_appends_when_gap_is_too_small() -> Result<()> {
    let workbook = create_workbook()?;

    for (row_number, decoding) in [(2, "A"), (3, "B"), (6, "C")] {
        workbook.write_region(Sheet::Ledger, row_number, 1, &[row(&["01.12.2025", "Наличные", "10", "Материалы", decoding])])?;
    }

    for (offset, amount) in ["100", "200", "300"].into_iter().enumerate() {
        put_inbox(&workbook, offset, salary("17.12.2025", amount, "Иванов"))?;
    }

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 3);
    assert_eq!(workbook.cell(Sheet::Ledger, 4, 1), Cell::Empty);
    assert_eq!(workbook.cell(Sheet::Ledger, 7, 3), Cell::Number(Decimal::from(100)));
    assert_eq!(workbook.cell(Sheet::Ledger, 9, 3), Cell::Number(Decimal::from(300)));

    Ok(())
}

#[tokio::test]
async fn test_engine_with_empty_inbox_changes_nothing() -> Result<()> {
    let workbook = create_workbook()?;

    let report = run_auto(&workbook).await?;

    assert_eq!(report.written, 0);
    assert!(report.rejections.is_empty());
    assert_eq!(workbook.last_row(Sheet::Ledger), 1);
    assert_eq!(workbook.get(ledger::LAST_ROW_PROPERTY), None);

    Ok(())
}

#[test]
fn test_duplicate_detector_only_sees_the_ledger_window() {
    let rows = vec![
        row(&["01.12.2025", "Наличные", "10", "Материалы", "Леруа"]),
        row(&["02.12.2025", "Наличные", "20", "Материалы", "Леруа"]),
        row(&["03.12.2025", "Наличные", "30", "Материалы", ""]),
        row(&["04.12.2025", "Наличные", "0", "Материалы", "Леруа"])
    ];

    let detector = DuplicateDetector::from_ledger(&rows, 3);

    assert_eq!(detector.existing_len(), 1);
    assert_eq!(detector.check("02.12.2025|Материалы|Леруа|20", false), Some(DuplicateOrigin::Ledger));
    assert_eq!(detector.check("01.12.2025|Материалы|Леруа|10", false), None);
}

#[test]
fn test_duplicate_detector_exempts_act_payouts_from_ledger_only() {
    let rows = vec![row(&["17.12.2025", "Наличные", "20000", "% Мастер", "ул. Ленина 1"])];
    let mut detector = DuplicateDetector::from_ledger(&rows, 50);
    let key = "17.12.2025|% Мастер|ул. Ленина 1|20000";

    assert_eq!(detector.check(key, true), None);

    detector.accept(key.to_string());

    assert_eq!(detector.check(key, true), Some(DuplicateOrigin::SameRun));
}

#[test]
fn test_mirror_ignores_non_transfer_entries() -> Result<()> {
    let entry = sample_entry("Материалы", "Наличные", "Леруа");

    assert_eq!(mirror(&entry, &WalletBook::default())?, None);

    Ok(())
}

#[test]
fn test_mirror_of_top_up_is_transfer_out_from_source_wallet() -> Result<()> {
    let mut entry = sample_entry(articles::TOP_UP, "Наличные", " р/с строймат ");
    entry.entry_type = "Доход".to_string();

    let mirrored = mirror(&entry, &WalletBook::default())?.ok_or_else(|| anyhow!("no mirror entry"))?;

    assert_eq!(mirrored.wallet, "Р/С Строймат");
    assert_eq!(mirrored.article, articles::TRANSFER_OUT);
    assert_eq!(mirrored.decoding, "Наличные");
    assert_eq!(mirrored.entry_type, "Расход");
    assert_eq!(mirrored.amount, entry.amount);

    Ok(())
}

#[test]
fn test_reconciler_requires_address_and_act_keyword() -> Result<()> {
    let grid = ACTS.iter().map(|fields| row(fields)).collect();
    let reconciler = ActReconciler::new(ActsIndex::build(grid));

    let mut entry = sample_entry(articles::WAGE_PAYOUT, "Наличные", "");
    entry.act_reference = "акт 5".to_string();
    assert_eq!(
        reconciler.claim(&entry),
        Err(RowError::MissingAddressForActEntry { article: articles::WAGE_PAYOUT.to_string() })
    );

    entry.decoding = "ул. Ленина 1".to_string();
    let claim = reconciler.claim(&entry)?.ok_or_else(|| anyhow!("no claim"))?;
    assert_eq!(claim.key, "ул. Ленина 1|акт 5");
    assert_eq!(claim.lookup.row, 2);
    assert!(!claim.already_set());

    let unavailable = ActReconciler::new(ActsIndex::unavailable());
    assert!(matches!(unavailable.claim(&entry), Err(RowError::ActsRegisterUnavailable { .. })));
    assert_eq!(unavailable.claim(&sample_entry("Материалы", "Наличные", "Леруа")), Ok(None));

    Ok(())
}

#[test]
fn test_reconciler_reports_register_without_keyed_rows_as_not_ready() {
    let reconciler = ActReconciler::new(ActsIndex::build(vec![row(&["1", "", "", "", "50000"])]));

    let mut entry = sample_entry(articles::WAGE_PAYOUT, "Наличные", "ул. Ленина 1");
    entry.act_reference = "акт 5".to_string();

    assert_eq!(reconciler.claim(&entry), Err(RowError::RegisterNotReady));
    assert!(reconciler.into_updates().is_empty());
}

#[test]
fn test_reconciler_commit_makes_next_claim_already_set() -> Result<()> {
    let grid = ACTS.iter().map(|fields| row(fields)).collect();
    let mut reconciler = ActReconciler::new(ActsIndex::build(grid));

    let mut entry = sample_entry(articles::DEPOSIT_RETURN, "Наличные", "ул. Ленина 1");
    entry.act_reference = "АКТ 5".to_string();
    assert!(matches!(reconciler.claim(&entry), Err(RowError::ActNotFoundInRegister { .. })));

    entry.act_reference = "акт 5".to_string();
    let claim = reconciler.claim(&entry)?.ok_or_else(|| anyhow!("no claim"))?;
    reconciler.commit(&claim);

    let again = reconciler.claim(&entry)?.ok_or_else(|| anyhow!("no claim"))?;
    assert!(again.already_set());

    let updates = reconciler.into_updates();
    assert_eq!(updates.deposit_rows.into_iter().collect::<Vec<_>>(), vec![2]);
    assert!(updates.wage_rows.is_empty());

    Ok(())
}

#[test]
fn test_decision_cache_declines_unasked_questions() {
    let mut decisions = DecisionCache::default();
    decisions.record(DecisionKey::Duplicate("a".to_string()), true);

    assert!(decisions.accepts(&DecisionKey::Duplicate("a".to_string())));
    assert!(!decisions.accepts(&DecisionKey::Duplicate("b".to_string())));
    assert!(!decisions.accepts(&DecisionKey::RepeatActPayout { act: "a".to_string(), flag: ActFlag::WagePaid }));
}

#[test]
fn test_report_truncates_rejection_list() {
    let mut report = RunReport::default();

    for row_number in 10..15 {
        report.reject(row_number, RowError::MissingWallet);
    }

    report.reject(15, RowError::MissingOrZeroAmount);

    let rendered = report.render(3);

    assert!(rendered.starts_with("Transferred: 0. Not transferred: 6. Decodings added: 0."));
    assert!(rendered.contains("no wallet: 5"));
    assert!(rendered.contains("row 12: No wallet"));
    assert!(!rendered.contains("row 13"));
    assert!(rendered.contains("... and 3 more"));
}
