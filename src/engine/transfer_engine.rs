use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::engine::decisions::{DecisionCache, DecisionKey};
use crate::engine::duplicates::DuplicateDetector;
use crate::engine::reconciliation::{ActReconciler, ActUpdates};
use crate::engine::transfer::mirror;
use crate::engine::{RunOptions, RunReport};
use crate::models::{articles, validate, ActFlag, ActsIndex, DictionaryIndex, DictionaryRecord, Entry, EntryType, RowError};
use crate::operator::{Button, Operator, Prompt, Response};
use crate::storage::layout::{acts, colors, dictionary, inbox, ledger};
use crate::storage::{contiguous_runs, Grid, Properties, Region, Sheet, StorageError};
use crate::types::{clamp_to_current_month, compare_month, format_amount, parse_amount, parse_date, Cell, ColumnNumber, RowNumber};

/// Moves confirmed inbox rows into the ledger.
///
/// A run reads each sheet region once, decides every row in memory and then
/// writes the ledger batch, the inbox clean-up, new dictionary pairs and act
/// register changes, in that order. A failed ledger write stops the run
/// before anything else is touched, so the inbox stays intact for a retry.
pub struct TransferEngine<S, O> {
    workbook: Arc<S>,
    operator: O,
    options: RunOptions
}

impl<S: Grid + Properties, O: Operator> TransferEngine<S, O> {
    pub fn new(workbook: Arc<S>, operator: O) -> Self {
        Self {
            workbook,
            operator,
            options: RunOptions::default()
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn run(&self) -> anyhow::Result<RunReport> {
        let timer = Instant::now();
        let today = self.options.today.unwrap_or_else(|| Local::now().date_naive());
        let mut report = RunReport::default();

        let normalized = self.normalize_inbox()?;
        debug!("[{:.2?}] Normalized {normalized} inbox cells", timer.elapsed());

        let block = Region::new(inbox::FIRST_ROW, inbox::FIRST_COLUMN, inbox::HEIGHT, inbox::WIDTH);
        let mut rows = self.workbook.read_region(Sheet::Inbox, block)?;
        self.check_months(&mut rows, today).await?;
        debug!("[{:.2?}] Month check done", timer.elapsed());

        let index = self.load_dictionary()?;
        let duplicates = self.load_ledger_tail()?;
        let register = if rows.iter().any(|row| references_act(row)) {
            self.load_acts()
        } else {
            ActsIndex::unavailable()
        };
        let reconciler = ActReconciler::new(register);
        debug!(
            "[{:.2?}] Loaded {} recent ledger keys, acts register loaded: {}",
            timer.elapsed(),
            duplicates.existing_len(),
            reconciler.is_loaded()
        );

        let decisions = if self.options.auto {
            DecisionCache::default()
        } else {
            self.ask_decisions(&rows, today, &duplicates, &reconciler).await
        };

        let mut pass = Pass {
            options: &self.options,
            today,
            index: &index,
            decisions: &decisions,
            duplicates,
            reconciler,
            suggestions: BTreeMap::new()
        };
        let mut batch = Vec::new();
        let mut processed = Vec::new();

        for (offset, row) in rows.iter().enumerate() {
            if row.iter().all(Cell::is_blank) {
                continue;
            }

            let row_number = inbox::FIRST_ROW + offset;

            match pass.process(row, &mut report) {
                Ok(entries) => {
                    batch.extend(entries);
                    processed.push(row_number);
                }
                Err(error) => {
                    debug!("Inbox row {row_number} rejected: {error}");
                    report.reject(row_number, error);
                }
            }
        }

        let Pass { reconciler, suggestions, .. } = pass;
        debug!("[{:.2?}] {} ledger entries ready, {} rows rejected", timer.elapsed(), batch.len(), report.rejections.len());

        self.persist(&batch, &processed, &index, &suggestions, reconciler.into_updates(), &mut report).await;

        report.elapsed = timer.elapsed();
        log_report(&report);

        Ok(report)
    }

    /// Replaces non-breaking spaces and trims the free-text columns.
    /// Formula cells are left alone.
    fn normalize_inbox(&self) -> Result<usize, StorageError> {
        let region = Region::new(inbox::FIRST_ROW, inbox::FIRST_COLUMN, inbox::HEIGHT, inbox::TEXT_WIDTH);
        let mut values = self.workbook.read_region(Sheet::Inbox, region)?;
        let formulas = self.workbook.read_formulas(Sheet::Inbox, region)?;
        let mut changed = Vec::new();

        for (row_offset, (cells, row_formulas)) in values.iter_mut().zip(&formulas).enumerate() {
            for (column_offset, (cell, formula)) in cells.iter_mut().zip(row_formulas).enumerate() {
                if !formula.is_empty() {
                    continue;
                }

                let Cell::Text(text) = cell else {
                    continue;
                };

                let cleaned = text.replace('\u{00A0}', " ").trim().to_string();

                if cleaned != *text {
                    *cell = Cell::parse(&cleaned);
                    changed.push((row_offset, column_offset));
                }
            }
        }

        if changed.is_empty() {
            return Ok(0);
        }

        if formulas.iter().flatten().all(String::is_empty) {
            self.workbook.write_region(Sheet::Inbox, region.row, region.column, &values)?;
        } else {
            for &(row_offset, column_offset) in &changed {
                let value = values[row_offset][column_offset].clone();
                self.workbook.write_region(Sheet::Inbox, region.row + row_offset, region.column + column_offset, &[vec![value]])?;
            }
        }

        Ok(changed.len())
    }

    /// Finds rows dated outside the current month and, when the operator
    /// does not keep them, moves them into it. Unattended runs keep dates.
    async fn check_months(&self, rows: &mut [Vec<Cell>], today: NaiveDate) -> Result<(), StorageError> {
        let mut past = 0;
        let mut future = 0;
        let mut outside = Vec::new();

        for (offset, row) in rows.iter().enumerate() {
            if !row.get(inbox::AMOUNT).is_some_and(|cell| parse_amount(cell).is_ok()) {
                continue;
            }

            let Some(date) = row.get(inbox::DATE).and_then(parse_date) else {
                continue;
            };

            match compare_month(date, today) {
                Ordering::Less => past += 1,
                Ordering::Greater => future += 1,
                Ordering::Equal => continue
            }

            outside.push((offset, date));
        }

        if outside.is_empty() {
            return Ok(());
        }

        info!("{past} rows dated before and {future} after the current month");

        if self.options.auto {
            return Ok(());
        }

        let message = format!(
            "Rows dated before the current month: {past}\nRows dated after the current month: {future}\n\n\
             Keep the original dates?\nNo moves them into {}.",
            today.format("%m.%Y")
        );

        if self.confirm("Date check", message).await {
            return Ok(());
        }

        let formulas = self.workbook.read_formulas(
            Sheet::Inbox,
            Region::new(inbox::FIRST_ROW, inbox::FIRST_COLUMN, inbox::HEIGHT, 1)
        )?;
        let mut rewritten = Vec::new();

        for (offset, date) in outside {
            let Some(cell) = rows.get_mut(offset).and_then(|row| row.get_mut(inbox::DATE)) else {
                continue;
            };

            *cell = Cell::Date(clamp_to_current_month(date, today));

            let is_formula = formulas.get(offset).and_then(|row| row.first()).is_some_and(|formula| !formula.is_empty());

            if !is_formula {
                rewritten.push(offset);
            }
        }

        for (first, length) in contiguous_runs(&rewritten) {
            let values: Vec<Vec<Cell>> = rows[first..first + length].iter()
                .map(|row| vec![row[inbox::DATE].clone()])
                .collect();

            self.workbook.write_region(Sheet::Inbox, inbox::FIRST_ROW + first, inbox::FIRST_COLUMN, &values)?;
        }

        info!("Moved {} dates into the current month", rewritten.len());

        Ok(())
    }

    fn load_dictionary(&self) -> Result<DictionaryIndex, StorageError> {
        let last_row = self.workbook.last_row(Sheet::Dictionary);

        if last_row < dictionary::FIRST_DATA_ROW {
            warn!("Dictionary is empty");
            return Ok(DictionaryIndex::default());
        }

        let region = Region::new(dictionary::FIRST_DATA_ROW, 1, last_row + 1 - dictionary::FIRST_DATA_ROW, dictionary::WIDTH);
        let rows = self.workbook.read_region(Sheet::Dictionary, region)?;

        Ok(DictionaryIndex::from_rows(&rows))
    }

    fn load_ledger_tail(&self) -> Result<DuplicateDetector, StorageError> {
        let last_row = self.workbook.last_row(Sheet::Ledger);
        let window = self.options.ledger_window;

        if last_row < ledger::FIRST_DATA_ROW || window == 0 {
            return Ok(DuplicateDetector::default());
        }

        let first = (last_row + 1).saturating_sub(window).max(ledger::FIRST_DATA_ROW);
        let rows = self.workbook.read_region(Sheet::Ledger, Region::new(first, 1, last_row + 1 - first, ledger::WIDTH))?;

        Ok(DuplicateDetector::from_ledger(&rows, window))
    }

    /// A register that cannot be read is treated as absent; payouts against
    /// it are then rejected row by row.
    fn load_acts(&self) -> ActsIndex {
        let last_row = self.workbook.last_row(Sheet::Acts);

        if last_row < acts::FIRST_DATA_ROW {
            warn!("Acts register has no rows");
            return ActsIndex::unavailable();
        }

        let region = Region::new(acts::FIRST_DATA_ROW, 1, last_row + 1 - acts::FIRST_DATA_ROW, acts::WIDTH);

        match self.workbook.read_region(Sheet::Acts, region) {
            Ok(rows) => ActsIndex::build(rows),
            Err(error) => {
                error!("Acts register could not be read: {error}");
                ActsIndex::unavailable()
            }
        }
    }

    /// Collects every duplicate and every repeated act payout the main pass
    /// will meet and asks about each category once.
    async fn ask_decisions(
        &self,
        rows: &[Vec<Cell>],
        today: NaiveDate,
        duplicates: &DuplicateDetector,
        reconciler: &ActReconciler
    ) -> DecisionCache {
        let mut seen = HashSet::new();
        let mut doubled: Vec<String> = Vec::new();
        let mut claimed = HashSet::new();
        let mut repeated_payouts: Vec<(String, ActFlag)> = Vec::new();

        for row in rows {
            let Ok(validated) = validate(row) else {
                continue;
            };

            let entry = validated.into_entry(today);
            let key = entry.key();
            let exempt = ActFlag::for_article(&entry.article).is_some();
            let repeated = !seen.insert(key.clone());

            if (repeated || duplicates.check(&key, exempt).is_some()) && !doubled.contains(&key) {
                doubled.push(key);
            }

            if let Ok(Some(claim)) = reconciler.claim(&entry) {
                let payout = (claim.key.clone(), claim.flag);
                let repeated = !claimed.insert(payout.clone());

                if (claim.already_set() || repeated) && !repeated_payouts.contains(&payout) {
                    repeated_payouts.push(payout);
                }
            }
        }

        let mut decisions = DecisionCache::default();

        if !doubled.is_empty() {
            let listing = numbered(doubled.iter().map(|key| key.replace('|', " | ")), self.options.report_limit);
            let message = format!("Already in the ledger or repeated in the inbox:\n{listing}\n\nEnter them anyway?");
            let accepted = self.confirm("Possible duplicates", message).await;

            for key in doubled {
                decisions.record(DecisionKey::Duplicate(key), accepted);
            }
        }

        if !repeated_payouts.is_empty() {
            let listing = numbered(
                repeated_payouts.iter().map(|(act, flag)| format!("{} ({flag})", act.replace('|', ", "))),
                self.options.report_limit
            );
            let message = format!("These acts are already paid out:\n{listing}\n\nPay out again?");
            let accepted = self.confirm("Repeated payouts", message).await;

            for (act, flag) in repeated_payouts {
                decisions.record(DecisionKey::RepeatActPayout { act, flag }, accepted);
            }
        }

        debug!("Collected {} operator decisions", decisions.len());

        decisions
    }

    async fn persist(
        &self,
        batch: &[Entry],
        processed: &[RowNumber],
        index: &DictionaryIndex,
        suggestions: &BTreeMap<String, BTreeSet<String>>,
        updates: ActUpdates,
        report: &mut RunReport
    ) {
        if !batch.is_empty() {
            match self.write_ledger(batch) {
                Ok(start) => {
                    report.written = batch.len();
                    info!("Wrote {} ledger rows from row {start}", batch.len());
                    self.decorate_ledger(start, batch, report);
                }
                Err(error) => {
                    error!("Ledger write failed: {error}");
                    report.persistence_failures.push(format!("ledger: {error}"));
                    self.notify("Ledger write failed", format!("{error}\nThe inbox was left as it is.")).await;
                    return;
                }
            }
        }

        if let Err(error) = self.clear_inbox_rows(processed) {
            error!("Inbox clean-up failed: {error}");
            report.persistence_failures.push(format!("inbox: {error}"));
        }

        match self.add_decodings(index, suggestions).await {
            Ok(added) => report.new_decodings = added,
            Err(error) => {
                error!("Dictionary update failed: {error}");
                report.persistence_failures.push(format!("dictionary: {error}"));
            }
        }

        if let Err(error) = self.write_act_updates(&updates) {
            error!("Acts register update failed: {error}");
            report.persistence_failures.push(format!("acts: {error}"));
        }
    }

    fn write_ledger(&self, entries: &[Entry]) -> Result<RowNumber, StorageError> {
        self.workbook.remove_filter(Sheet::Ledger)?;

        let start = self.insertion_row(entries.len())?;
        let rows: Vec<Vec<Cell>> = entries.iter().map(Entry::to_row).collect();
        self.workbook.write_region(Sheet::Ledger, start, 1, &rows)?;

        Ok(start)
    }

    /// First gap of `height` fully empty rows near the remembered write
    /// position, or the row after the last one in use.
    fn insertion_row(&self, height: usize) -> Result<RowNumber, StorageError> {
        let last_row = self.workbook.last_row(Sheet::Ledger).max(ledger::FIRST_DATA_ROW - 1);
        let hint = self.workbook.get(ledger::LAST_ROW_PROPERTY)
            .and_then(|value| value.trim().parse::<RowNumber>().ok())
            .unwrap_or(last_row);

        let mut first = hint.saturating_sub(ledger::INSERTION_LOOKBACK).max(ledger::FIRST_DATA_ROW);

        if first > last_row {
            first = ledger::FIRST_DATA_ROW;
        }

        if first > last_row {
            return Ok(last_row + 1);
        }

        let grid = self.workbook.read_region(Sheet::Ledger, Region::new(first, 1, last_row + 1 - first, ledger::WIDTH))?;
        let is_empty = |row: &Vec<Cell>| row.iter().all(|cell| *cell == Cell::Empty);

        let gap = (0..grid.len()).find(|&offset| grid[offset..(offset + height).min(grid.len())].iter().all(is_empty));

        Ok(gap.map_or(last_row + 1, |offset| first + offset))
    }

    /// Remembers where the batch ended, then colors the amount cell by entry
    /// type and the wallet cell by wallet. The rows are already saved, so
    /// failures here are reported and otherwise ignored.
    fn decorate_ledger(&self, start: RowNumber, entries: &[Entry], report: &mut RunReport) {
        let amount_colors = entries.iter()
            .map(|entry| match entry.kind() {
                Some(EntryType::Income) => Some(colors::INCOME_AMOUNT.to_string()),
                Some(EntryType::Expense) => Some(colors::EXPENSE_AMOUNT.to_string()),
                None => None
            })
            .collect();
        let wallet_colors = entries.iter()
            .map(|entry| self.options.wallets.color(&entry.wallet).map(str::to_string))
            .collect();
        let last_row = start + entries.len() - 1;

        if let Err(error) = self.workbook.set(ledger::LAST_ROW_PROPERTY, &last_row.to_string()) {
            warn!("Could not remember ledger row {last_row}: {error}");
            report.persistence_failures.push(format!("ledger position: {error}"));
        }

        let result = self.paint_column(Sheet::Ledger, start, ledger::AMOUNT_COLUMN, amount_colors)
            .and_then(|_| self.paint_column(Sheet::Ledger, start, ledger::WALLET_COLUMN, wallet_colors));

        if let Err(error) = result {
            warn!("Ledger rows {start}..={last_row} were written but not styled: {error}");
            report.persistence_failures.push(format!("ledger styling: {error}"));
        }
    }

    fn clear_inbox_rows(&self, processed: &[RowNumber]) -> Result<(), StorageError> {
        for (first, length) in contiguous_runs(processed) {
            self.workbook.clear_region(Sheet::Inbox, Region::new(first, inbox::FIRST_COLUMN, length, inbox::EDITABLE_WIDTH))?;
        }

        Ok(())
    }

    /// Appends the approved new `(article, decoding)` pairs to the
    /// dictionary. Returns them as `article / decoding` labels.
    async fn add_decodings(
        &self,
        index: &DictionaryIndex,
        suggestions: &BTreeMap<String, BTreeSet<String>>
    ) -> Result<Vec<String>, StorageError> {
        let candidates: Vec<DictionaryRecord> = suggestions.iter()
            .flat_map(|(article, decodings)| decodings.iter().filter_map(move |decoding| index.record_for(article, decoding)))
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let approved = if self.options.auto {
            if !self.options.approve_new_decodings {
                info!("{} new decodings left out of the dictionary", candidates.len());
                return Ok(Vec::new());
            }

            candidates
        } else {
            self.review_decodings(index, candidates).await
        };

        if approved.is_empty() {
            return Ok(Vec::new());
        }

        let start = self.workbook.last_row(Sheet::Dictionary).max(dictionary::FIRST_DATA_ROW - 1) + 1;
        let rows: Vec<Vec<Cell>> = approved.iter().map(DictionaryRecord::to_row).collect();
        self.workbook.write_region(Sheet::Dictionary, start, 1, &rows)?;
        info!("Added {} decodings to the dictionary from row {start}", approved.len());

        Ok(approved.iter().map(|record| format!("{} / {}", record.article, record.decoding)).collect())
    }

    async fn review_decodings(&self, index: &DictionaryIndex, candidates: Vec<DictionaryRecord>) -> Vec<DictionaryRecord> {
        let listing = numbered(
            candidates.iter().map(|record| format!("{} / {}", record.article, record.decoding)),
            self.options.report_limit
        );

        if !self.confirm("New decodings", format!("Not yet in the dictionary:\n{listing}\n\nAdd them?")).await {
            return Vec::new();
        }

        if self.confirm("New decodings", "Add all of them at once? No goes through them one by one.").await {
            return candidates;
        }

        let mut approved: Vec<DictionaryRecord> = Vec::new();

        for mut record in candidates {
            let message = format!(
                "Type: {}\nCategory: {}\nArticle: {}\n\nDecoding to add:",
                record.entry_type, record.category, record.article
            );

            let Some(Response { button: Button::Ok, text }) = self.ask(Prompt::text("Add to dictionary", message, &record.decoding)).await else {
                continue;
            };

            let decoding = text.trim();

            if decoding.is_empty() || index.contains_pair(&record.article, decoding) {
                continue;
            }

            record.decoding = decoding.to_string();

            if !approved.contains(&record) {
                approved.push(record);
            }
        }

        approved
    }

    fn write_act_updates(&self, updates: &ActUpdates) -> Result<(), StorageError> {
        if updates.is_empty() {
            return Ok(());
        }

        let last_row = self.workbook.last_row(Sheet::Acts);

        for flag in [ActFlag::WagePaid, ActFlag::DepositReturned] {
            let rows = updates.rows(flag);

            if rows.is_empty() || last_row < acts::FIRST_DATA_ROW {
                continue;
            }

            let region = Region::new(acts::FIRST_DATA_ROW, flag.column(), last_row + 1 - acts::FIRST_DATA_ROW, 1);
            let mut column = self.workbook.read_region(Sheet::Acts, region)?;

            for row in rows {
                if let Some(cell) = column.get_mut(row - acts::FIRST_DATA_ROW).and_then(|cells| cells.first_mut()) {
                    *cell = Cell::Bool(true);
                }
            }

            self.workbook.write_region(Sheet::Acts, acts::FIRST_DATA_ROW, flag.column(), &column)?;
            self.mark_settled(flag.settled_column(), rows)?;
            info!("Marked {flag} on {} acts", rows.len());
        }

        self.paint_rows(Sheet::Acts, acts::REVENUE, &updates.revenue_colors)
    }

    /// Settled amounts turn green, lose their note and get struck through.
    fn mark_settled(&self, column: ColumnNumber, rows: &BTreeSet<RowNumber>) -> Result<(), StorageError> {
        let rows: Vec<RowNumber> = rows.iter().copied().collect();

        let (Some(&first), Some(&last)) = (rows.first(), rows.last()) else {
            return Ok(());
        };

        let mut styles = self.workbook.read_styles(Sheet::Acts, Region::new(first, column, last + 1 - first, 1))?;

        for row in &rows {
            if let Some(style) = styles.get_mut(row - first).and_then(|cells| cells.first_mut()) {
                style.background = Some(colors::SETTLED_BACKGROUND.to_string());
                style.font_color = Some(colors::SETTLED_FONT.to_string());
                style.note.clear();
            }
        }

        self.workbook.write_styles(Sheet::Acts, first, column, &styles)?;

        for (start, length) in contiguous_runs(&rows) {
            self.workbook.set_strike_through(Sheet::Acts, Region::new(start, column, length, 1))?;
        }

        Ok(())
    }

    /// Sets the background of consecutive cells from `start` down, one color per row.
    fn paint_column(&self, sheet: Sheet, start: RowNumber, column: ColumnNumber, backgrounds: Vec<Option<String>>) -> Result<(), StorageError> {
        let mut styles = self.workbook.read_styles(sheet, Region::new(start, column, backgrounds.len(), 1))?;

        for (cells, background) in styles.iter_mut().zip(backgrounds) {
            if let Some(style) = cells.first_mut() {
                style.background = background;
            }
        }

        self.workbook.write_styles(sheet, start, column, &styles)
    }

    /// Sets the background of scattered rows, leaving the rows between them as they are.
    fn paint_rows(&self, sheet: Sheet, column: ColumnNumber, backgrounds: &BTreeMap<RowNumber, String>) -> Result<(), StorageError> {
        let (Some(&first), Some(&last)) = (backgrounds.keys().next(), backgrounds.keys().next_back()) else {
            return Ok(());
        };

        let mut styles = self.workbook.read_styles(sheet, Region::new(first, column, last + 1 - first, 1))?;

        for (row, background) in backgrounds {
            if let Some(style) = styles.get_mut(row - first).and_then(|cells| cells.first_mut()) {
                style.background = Some(background.clone());
            }
        }

        self.workbook.write_styles(sheet, first, column, &styles)
    }

    async fn ask(&self, prompt: Prompt) -> Option<Response> {
        let title = prompt.title.clone();

        match timeout(self.options.prompt_timeout, self.operator.ask(prompt)).await {
            Ok(response) => response,
            Err(_) => {
                warn!("No answer to \"{title}\" within {:?}", self.options.prompt_timeout);
                None
            }
        }
    }

    async fn confirm(&self, title: &str, message: impl Into<String>) -> bool {
        self.ask(Prompt::confirm(title, message)).await.is_some_and(|response| response.is_yes())
    }

    async fn notify(&self, title: &str, message: impl Into<String>) {
        if !self.options.auto {
            self.ask(Prompt::notice(title, message)).await;
        }
    }
}

/// State of the main pass over the inbox rows.
struct Pass<'a> {
    options: &'a RunOptions,
    today: NaiveDate,
    index: &'a DictionaryIndex,
    decisions: &'a DecisionCache,
    duplicates: DuplicateDetector,
    reconciler: ActReconciler,
    /// New decodings of known articles, per article.
    suggestions: BTreeMap<String, BTreeSet<String>>
}

impl Pass<'_> {
    /// Runs every check on one row and returns the entries to write: the row
    /// itself and, for transfers, its mirror. Run state changes only once
    /// every check has passed.
    fn process(&mut self, row: &[Cell], report: &mut RunReport) -> Result<Vec<Entry>, RowError> {
        let validated = validate(row)?;

        if validated.wants_today() {
            debug!("Blank date on {} {}, booking it on {}", validated.article, validated.decoding, self.today);
        }

        let entry = validated.into_entry(self.today);

        if entry.amount.abs() > self.options.big_amount_limit {
            warn!("Big amount {} on {}", format_amount(entry.amount), entry.label());
            report.big_amounts.push(format!("{} {}", format_amount(entry.amount), entry.label()));
        }

        if self.index.requires_act(&entry.article) && entry.act_reference.is_empty() {
            return Err(RowError::ActRequiredButMissing { article: entry.article.clone() });
        }

        let key = entry.key();
        let exempt = ActFlag::for_article(&entry.article).is_some();

        if let Some(origin) = self.duplicates.check(&key, exempt) {
            if !self.decisions.accepts(&DecisionKey::Duplicate(key.clone())) {
                return Err(RowError::DuplicateRejected { key, origin });
            }

            info!("Duplicate [{key}] entered on operator request");
        }

        if self.index.is_wildcard(&entry.article) && entry.decoding.is_empty() {
            return Err(RowError::WildcardArticleMissingDecoding { article: entry.article.clone() });
        }

        let claim = self.reconciler.claim(&entry)?;

        if let Some(claim) = claim.as_ref().filter(|claim| claim.already_set()) {
            if !self.decisions.accepts(&DecisionKey::RepeatActPayout { act: claim.key.clone(), flag: claim.flag }) {
                return Err(RowError::AlreadyPaidOut { key: claim.key.clone(), flag: claim.flag });
            }

            info!("Repeated payout on act [{}] entered on operator request", claim.key);
        }

        let mirrored = mirror(&entry, &self.options.wallets)?;

        if let Some(claim) = &claim {
            self.reconciler.commit(claim);
        }

        self.reconciler.tag_revenue(&entry, &self.options.wallets);
        self.note_decoding(&entry, report);
        self.duplicates.accept(key);

        Ok([Some(entry), mirrored].into_iter().flatten().collect())
    }

    fn note_decoding(&mut self, entry: &Entry, report: &mut RunReport) {
        let article = &entry.article;

        if self.index.is_wildcard(article) || self.index.contains_pair(article, &entry.decoding) {
            return;
        }

        if self.index.meta(article).is_none() {
            match self.index.resolve_article(&entry.decoding) {
                Some(known) => warn!("Article \"{article}\" is not in the dictionary; \"{}\" belongs to \"{known}\"", entry.decoding),
                None => warn!("Article \"{article}\" is not in the dictionary")
            }

            report.unknown_articles.insert(article.clone());
            return;
        }

        let decoding = entry.decoding.trim();

        if !decoding.is_empty() {
            self.suggestions.entry(article.clone()).or_default().insert(decoding.to_string());
        }
    }
}

/// Whether the row is a payout or revenue line that needs the acts register.
fn references_act(row: &[Cell]) -> bool {
    let text = |offset: usize| row.get(offset).map(Cell::as_text).unwrap_or_default();
    let primary = text(inbox::ARTICLE);
    let article = if primary.is_empty() { text(inbox::ALTERNATE_ARTICLE) } else { primary };
    let has_amount = row.get(inbox::AMOUNT).is_some_and(|cell| parse_amount(cell).is_ok());

    has_amount && [articles::WAGE_PAYOUT, articles::DEPOSIT_RETURN, articles::REVENUE_BY_ACT].contains(&article.as_str())
}

fn numbered(items: impl IntoIterator<Item = String>, limit: usize) -> String {
    let items: Vec<String> = items.into_iter().collect();
    let mut lines: Vec<String> = items.iter()
        .take(limit)
        .enumerate()
        .map(|(position, item)| format!("{}. {item}", position + 1))
        .collect();

    if items.len() > limit {
        lines.push(format!("... and {} more", items.len() - limit));
    }

    lines.join("\n")
}

fn log_report(report: &RunReport) {
    info!("{}", report.summary());

    for rejection in &report.rejections {
        info!("Rejected {rejection}");
    }

    for (kind, count) in report.counts() {
        info!("{kind}: {count}");
    }

    for article in &report.unknown_articles {
        warn!("Unknown article in this run: \"{article}\"");
    }
}
