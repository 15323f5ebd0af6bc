use crate::enricher::select_transfer;
use crate::events::{AlertRecord, RawTransaction};
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

/// One pending alert as the preview shows it: the alert itself plus the feed
/// details the chat message leaves out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    #[serde(flatten)]
    pub alert: AlertRecord,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    pub fee: Option<u64>,
    pub amount: Option<f64>,
}

impl PreviewRow {
    pub fn new(tx: &RawTransaction, alert: AlertRecord, watched_address: &str) -> Self {
        PreviewRow {
            alert,
            kind: tx.kind.clone(),
            source: tx.source.clone(),
            description: tx.description.clone(),
            fee: tx.fee,
            amount: select_transfer(&tx.token_transfers, watched_address)
                .and_then(|t| t.token_amount),
        }
    }
}

pub fn format_alerts(rows: &[PreviewRow], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_alerts_table(rows),
        OutputFormat::Json => format_alerts_json(rows),
        OutputFormat::Csv => format_alerts_csv(rows),
    }
}

fn format_alerts_table(rows: &[PreviewRow]) -> String {
    if rows.is_empty() {
        return "No new activity.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            "Time (UTC)",
            "Type",
            "Source",
            "Token",
            "Ticker",
            "Amount",
            "Fee",
            "Mint",
            "Signature",
        ]);

    for row in rows {
        let alert = &row.alert;
        table.add_row(vec![
            Cell::new(&alert.time),
            Cell::new(or_dash(row.kind.as_deref())),
            Cell::new(or_dash(row.source.as_deref())),
            Cell::new(&alert.token_name),
            Cell::new(&alert.ticker),
            Cell::new(format_optional(row.amount)),
            Cell::new(format_optional(row.fee)),
            Cell::new(format_short(&alert.mint)),
            Cell::new(format_short(&alert.signature)),
        ]);
    }

    table.to_string()
}

fn format_alerts_json(rows: &[PreviewRow]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
}

fn format_alerts_csv(rows: &[PreviewRow]) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "time",
        "type",
        "source",
        "token_name",
        "ticker",
        "amount",
        "fee",
        "mint",
        "signature",
        "description",
    ]);
    for row in rows {
        let alert = &row.alert;
        let amount = row.amount.map(|v| v.to_string()).unwrap_or_default();
        let fee = row.fee.map(|v| v.to_string()).unwrap_or_default();
        let _ = wtr.write_record([
            alert.time.as_str(),
            row.kind.as_deref().unwrap_or_default(),
            row.source.as_deref().unwrap_or_default(),
            alert.token_name.as_str(),
            alert.ticker.as_str(),
            amount.as_str(),
            fee.as_str(),
            alert.mint.as_str(),
            alert.signature.as_str(),
            row.description.as_deref().unwrap_or_default(),
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn format_optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn format_cursor(cursor: Option<&str>, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => json!({ "last_signature": cursor }).to_string(),
        OutputFormat::Csv => format!("last_signature\n{}\n", cursor.unwrap_or_default()),
        OutputFormat::Table => match cursor {
            Some(sig) => format!("Last processed signature: {sig}"),
            None => "No cursor stored.".to_string(),
        },
    }
}

/// Shortens base58 identifiers for table display, keeping both ends.
fn format_short(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 16 {
        return value.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}...{tail}")
}
