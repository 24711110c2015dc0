//! CSV records for accounts and transactions.
//!
//! Parsing is two-step: the `csv` reader turns each data row into a record of
//! raw strings, then a pure conversion maps the record to the entity input or
//! a [`RowError`] naming the bad column. Exports write the same columns, so an
//! exported file can be imported again.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tally_shared::types::ContactId;

use super::types::{ImportRow, RowError};
use crate::accounts::{Account, AccountType, CreateAccountInput, NormalBalance};
use crate::error::{LedgerError, LedgerResult};
use crate::transactions::{TaxBreakdown, Transaction, TransactionInput, TransactionKind};

/// Account CSV columns, in export order.
pub const ACCOUNT_COLUMNS: [&str; 8] = [
    "code",
    "name",
    "type",
    "normal_balance",
    "parent_code",
    "description",
    "opening_balance",
    "is_system",
];

/// Transaction CSV columns, in export order. Import reads the first twelve.
pub const TRANSACTION_COLUMNS: [&str; 16] = [
    "kind",
    "reference",
    "date",
    "due_date",
    "contact_id",
    "description",
    "category_account",
    "counter_account",
    "total_amount",
    "tax_label",
    "tax_amount",
    "tax_account",
    "id",
    "status",
    "paid_amount",
    "outstanding",
];

const REQUIRED_ACCOUNT_COLUMNS: [&str; 3] = ["code", "name", "type"];
const REQUIRED_TRANSACTION_COLUMNS: [&str; 4] =
    ["reference", "date", "category_account", "counter_account"];

/// One account row as read from or written to CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: String,
    /// DEBIT or CREDIT; derived from the type when empty.
    #[serde(default)]
    pub normal_balance: Option<String>,
    /// Parent account code.
    #[serde(default)]
    pub parent_code: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Opening balance.
    #[serde(default)]
    pub opening_balance: Option<String>,
    /// true/false, yes/no or 1/0.
    #[serde(default)]
    pub is_system: Option<String>,
}

/// One transaction row as read from CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransactionRecord {
    /// EXPENSE (default), BILL or INVOICE.
    #[serde(default)]
    pub kind: Option<String>,
    /// Document reference.
    pub reference: String,
    /// Document date, `YYYY-MM-DD`.
    pub date: String,
    /// Due date, `YYYY-MM-DD`.
    #[serde(default)]
    pub due_date: Option<String>,
    /// Counter-party id.
    #[serde(default)]
    pub contact_id: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Ledger-side account code.
    pub category_account: String,
    /// Cash/payable/receivable account code.
    pub counter_account: String,
    /// Total amount, tax included.
    #[serde(default)]
    pub total_amount: Option<String>,
    /// Tax label.
    #[serde(default)]
    pub tax_label: Option<String>,
    /// Tax amount.
    #[serde(default)]
    pub tax_amount: Option<String>,
    /// Tax account code.
    #[serde(default)]
    pub tax_account: Option<String>,
}

#[derive(Serialize)]
struct TransactionExport<'a> {
    kind: &'static str,
    reference: &'a str,
    date: String,
    due_date: Option<String>,
    contact_id: Option<String>,
    description: Option<&'a str>,
    category_account: &'a str,
    counter_account: &'a str,
    total_amount: String,
    tax_label: Option<&'a str>,
    tax_amount: Option<String>,
    tax_account: Option<&'a str>,
    id: String,
    status: &'static str,
    paid_amount: String,
    outstanding: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn decimal(row: usize, field: &str, value: &str) -> ImportRow<Decimal> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| RowError::new(row, Some(field), format!("invalid amount {value:?}: {e}")))
}

fn date(row: usize, field: &str, value: &str) -> ImportRow<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        RowError::new(row, Some(field), format!("invalid date {value:?} (expected YYYY-MM-DD): {e}"))
    })
}

fn flag(row: usize, field: &str, value: &str) -> ImportRow<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(RowError::new(row, Some(field), format!("invalid flag {value:?}"))),
    }
}

impl AccountRecord {
    /// Maps the record to a create input.
    ///
    /// # Errors
    ///
    /// Returns a [`RowError`] naming the first unreadable column. Business
    /// rules (duplicate codes, unknown parents) are checked on commit.
    pub fn into_input(self, row: usize) -> ImportRow<CreateAccountInput> {
        let account_type = AccountType::parse(&self.account_type).ok_or_else(|| {
            RowError::new(
                row,
                Some("type"),
                format!("unknown account type {:?}", self.account_type),
            )
        })?;
        let normal_balance = present(self.normal_balance)
            .map(|v| {
                NormalBalance::parse(&v).ok_or_else(|| {
                    RowError::new(row, Some("normal_balance"), format!("unknown normal balance {v:?}"))
                })
            })
            .transpose()?;
        let opening_balance = present(self.opening_balance)
            .map(|v| decimal(row, "opening_balance", &v))
            .transpose()?;
        let is_system = present(self.is_system)
            .map(|v| flag(row, "is_system", &v))
            .transpose()?
            .unwrap_or(false);

        Ok(CreateAccountInput {
            code: self.code,
            name: self.name,
            description: present(self.description),
            account_type: Some(account_type),
            normal_balance,
            parent_code: present(self.parent_code),
            opening_balance,
            is_system,
        })
    }

    /// Builds the export record of an account.
    #[must_use]
    pub fn from_account(account: &Account, parent_code: Option<&str>) -> Self {
        Self {
            code: account.code.clone(),
            name: account.name.clone(),
            account_type: account.account_type.as_str().to_string(),
            normal_balance: Some(account.normal_balance.as_str().to_string()),
            parent_code: parent_code.map(str::to_string),
            description: account.description.clone(),
            opening_balance: Some(account.opening_balance.to_string()),
            is_system: Some(account.is_system.to_string()),
        }
    }
}

impl TransactionRecord {
    /// Maps the record to a transaction input.
    ///
    /// # Errors
    ///
    /// Returns a [`RowError`] naming the first unreadable column.
    pub fn into_input(self, row: usize) -> ImportRow<TransactionInput> {
        let kind = match present(self.kind) {
            Some(v) => TransactionKind::parse(&v).ok_or_else(|| {
                RowError::new(row, Some("kind"), format!("unknown transaction kind {v:?}"))
            })?,
            None => TransactionKind::default(),
        };
        let date_value = date(row, "date", &self.date)?;
        let due_date = present(self.due_date)
            .map(|v| date(row, "due_date", &v))
            .transpose()?;
        let contact_id = present(self.contact_id)
            .map(|v| {
                v.trim().parse::<ContactId>().map_err(|e| {
                    RowError::new(row, Some("contact_id"), format!("invalid contact id {v:?}: {e}"))
                })
            })
            .transpose()?;
        let total_amount = present(self.total_amount)
            .map(|v| decimal(row, "total_amount", &v))
            .transpose()?;
        let tax = match present(self.tax_amount) {
            Some(amount) => Some(TaxBreakdown {
                label: present(self.tax_label).unwrap_or_else(|| "Tax".to_string()),
                amount: decimal(row, "tax_amount", &amount)?,
                account: present(self.tax_account),
            }),
            None => None,
        };

        Ok(TransactionInput {
            kind,
            reference: self.reference,
            date: date_value,
            due_date,
            contact_id,
            description: present(self.description),
            category_account: self.category_account,
            counter_account: self.counter_account,
            total_amount,
            tax,
            line_items: Vec::new(),
        })
    }
}

fn export<'a>(transaction: &'a Transaction) -> TransactionExport<'a> {
    let tax = transaction.tax.as_ref();
    TransactionExport {
        kind: transaction.kind.as_str(),
        reference: &transaction.reference,
        date: transaction.date.to_string(),
        due_date: transaction.due_date.map(|d| d.to_string()),
        contact_id: transaction.contact_id.map(|c| c.to_string()),
        description: transaction.description.as_deref(),
        category_account: &transaction.category_account,
        counter_account: &transaction.counter_account,
        total_amount: transaction.total_amount.to_string(),
        tax_label: tax.map(|t| t.label.as_str()),
        tax_amount: tax.map(|t| t.amount.to_string()),
        tax_account: tax.and_then(|t| t.account.as_deref()),
        id: transaction.id.to_string(),
        status: transaction.status.as_str(),
        paid_amount: transaction.paid_amount().to_string(),
        outstanding: transaction.outstanding().to_string(),
    }
}

fn column_of(err: &csv::Error, headers: &StringRecord) -> Option<String> {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err
            .field()
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| headers.get(index))
            .map(str::to_string),
        _ => None,
    }
}

fn read_rows<R, T>(
    text: &str,
    required: &[&str],
    convert: impl Fn(R, usize) -> ImportRow<T>,
) -> LedgerResult<Vec<ImportRow<T>>>
where
    R: DeserializeOwned,
{
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: StringRecord = reader
        .headers()
        .map_err(|e| LedgerError::validation("file", format!("unreadable header row: {e}")))?
        .iter()
        .map(str::to_lowercase)
        .collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(LedgerError::validation(
            "file",
            format!("missing required columns: {}", missing.join(", ")),
        ));
    }
    reader.set_headers(headers.clone());

    Ok(reader
        .deserialize::<R>()
        .enumerate()
        .map(|(index, result)| {
            let row = index + 1;
            match result {
                Ok(record) => convert(record, row),
                Err(err) => Err(RowError::new(
                    row,
                    column_of(&err, &headers).as_deref(),
                    format!("malformed row: {err}"),
                )),
            }
        })
        .collect())
}

fn write_rows<S: Serialize>(
    columns: &[&str],
    rows: impl IntoIterator<Item = S>,
) -> LedgerResult<String> {
    let failed = |e: csv::Error| LedgerError::Internal(format!("failed to write CSV: {e}"));
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(columns).map_err(failed)?;
    for row in rows {
        writer.serialize(row).map_err(failed)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::Internal(format!("failed to finish CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| LedgerError::Internal(format!("CSV is not UTF-8: {e}")))
}

/// Parses account CSV (header row required) into rows.
///
/// # Errors
///
/// Returns `Validation` on field `file` if the header row is unreadable or
/// lacks `code`, `name` or `type`. Problems within a data row never fail the
/// batch; they become that row's [`RowError`].
pub fn parse_account_csv(text: &str) -> LedgerResult<Vec<ImportRow<CreateAccountInput>>> {
    read_rows(text, &REQUIRED_ACCOUNT_COLUMNS, AccountRecord::into_input)
}

/// Parses transaction CSV (header row required) into rows.
///
/// # Errors
///
/// Returns `Validation` on field `file` if the header row is unreadable or
/// lacks a required column.
pub fn parse_transaction_csv(text: &str) -> LedgerResult<Vec<ImportRow<TransactionInput>>> {
    read_rows(text, &REQUIRED_TRANSACTION_COLUMNS, TransactionRecord::into_input)
}

/// Writes account records as CSV.
///
/// # Errors
///
/// Returns `Internal` if the writer fails.
pub fn accounts_to_csv(records: &[AccountRecord]) -> LedgerResult<String> {
    write_rows(&ACCOUNT_COLUMNS, records)
}

/// Writes transactions as CSV.
///
/// # Errors
///
/// Returns `Internal` if the writer fails.
pub fn transactions_to_csv(transactions: &[Transaction]) -> LedgerResult<String> {
    write_rows(&TRANSACTION_COLUMNS, transactions.iter().map(export))
}

/// Writes transactions as a JSON array.
///
/// # Errors
///
/// Returns `Internal` if serialization fails.
pub fn transactions_to_json(transactions: &[Transaction]) -> LedgerResult<String> {
    serde_json::to_string_pretty(transactions)
        .map_err(|e| LedgerError::Internal(format!("failed to write JSON: {e}")))
}

/// Header row plus one sample account.
///
/// # Errors
///
/// Returns `Internal` if the writer fails.
pub fn account_csv_template() -> LedgerResult<String> {
    let sample = AccountRecord {
        code: "6100".to_string(),
        name: "Office Supplies".to_string(),
        account_type: "EXPENSE".to_string(),
        normal_balance: Some("DEBIT".to_string()),
        parent_code: Some("6000".to_string()),
        description: Some("Paper, toner and stationery".to_string()),
        opening_balance: Some("0.00".to_string()),
        is_system: Some("false".to_string()),
    };
    write_rows(&ACCOUNT_COLUMNS, [sample])
}

/// Header row (import columns only) plus one sample transaction.
///
/// # Errors
///
/// Returns `Internal` if the writer fails.
pub fn transaction_csv_template() -> LedgerResult<String> {
    let sample = [
        "EXPENSE",
        "EXP-0001",
        "2025-01-31",
        "2025-02-28",
        "",
        "January office supplies",
        "6100",
        "1000",
        "111.00",
        "VAT 11%",
        "11.00",
        "2200",
    ];
    write_rows(&TRANSACTION_COLUMNS[..12], [sample])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_accounts_maps_columns() {
        let text = "code,name,type,parent_code,opening_balance\n\
                    1000,Cash,ASSET,,250.00\n\
                    1100,Petty Cash,asset,1000,\n";
        let rows = parse_account_csv(text).unwrap();

        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.code, "1000");
        assert_eq!(first.account_type, Some(AccountType::Asset));
        assert_eq!(first.opening_balance, Some(dec!(250.00)));
        assert_eq!(first.parent_code, None);
        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.parent_code.as_deref(), Some("1000"));
        assert_eq!(second.opening_balance, None);
    }

    #[test]
    fn test_malformed_cell_is_row_error() {
        let text = "code,name,type,opening_balance\n\
                    1000,Cash,ASSET,12x\n\
                    2000,Payables,WIDGET,\n\
                    3000,Equity,EQUITY,\n";
        let rows = parse_account_csv(text).unwrap();

        let first = rows[0].as_ref().unwrap_err();
        assert_eq!(first.row, 1);
        assert_eq!(first.field.as_deref(), Some("opening_balance"));
        let second = rows[1].as_ref().unwrap_err();
        assert_eq!(second.row, 2);
        assert_eq!(second.field.as_deref(), Some("type"));
        assert!(rows[2].is_ok());
    }

    #[test]
    fn test_missing_required_column_fails_batch() {
        let err = parse_account_csv("code,name\n1000,Cash\n").unwrap_err();
        assert_eq!(err.field(), Some("file"));
        assert!(err.to_string().contains("type"));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let rows = parse_account_csv("Code,Name,TYPE\n1000,Cash,ASSET\n").unwrap();
        assert!(rows[0].is_ok());
    }

    #[test]
    fn test_parse_transactions() {
        let text = "kind,reference,date,category_account,counter_account,total_amount,tax_amount,tax_account\n\
                    BILL,B-1,2025-03-01,6000,2100,111.00,11.00,2200\n\
                    ,E-1,01/03/2025,6000,1000,5,,\n";
        let rows = parse_transaction_csv(text).unwrap();

        let bill = rows[0].as_ref().unwrap();
        assert_eq!(bill.kind, TransactionKind::Bill);
        assert_eq!(bill.total_amount, Some(dec!(111.00)));
        let tax = bill.tax.as_ref().unwrap();
        assert_eq!(tax.amount, dec!(11.00));
        assert_eq!(tax.label, "Tax");
        assert_eq!(tax.account.as_deref(), Some("2200"));

        let bad_date = rows[1].as_ref().unwrap_err();
        assert_eq!(bad_date.field.as_deref(), Some("date"));
    }

    #[test]
    fn test_templates_parse_back() {
        let accounts = parse_account_csv(&account_csv_template().unwrap()).unwrap();
        assert_eq!(accounts.len(), 1);
        assert!(accounts[0].is_ok());

        let transactions = parse_transaction_csv(&transaction_csv_template().unwrap()).unwrap();
        assert_eq!(transactions.len(), 1);
        assert!(transactions[0].is_ok());
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let csv = accounts_to_csv(&[]).unwrap();
        assert_eq!(csv.trim_end(), ACCOUNT_COLUMNS.join(","));
    }
}
