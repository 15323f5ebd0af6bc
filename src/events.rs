use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "unknown";

/// One entry of the enhanced-transactions feed. Only the fields the watcher
/// reads are modelled; everything else in the payload is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub signature: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fee: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub token_transfers: Vec<TokenTransfer>,
}

impl RawTransaction {
    /// Sort key for processing order; a missing timestamp is treated as the oldest.
    pub fn sort_timestamp(&self) -> i64 {
        self.timestamp.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    #[serde(default)]
    pub from_user_account: Option<String>,
    #[serde(default)]
    pub to_user_account: Option<String>,
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default)]
    pub token_amount: Option<f64>,
    #[serde(default)]
    pub token: Option<InlineToken>,
    #[serde(default)]
    pub token_name: Option<String>,
    #[serde(default)]
    pub token_symbol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InlineToken {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl TokenTransfer {
    pub fn touches(&self, address: &str) -> bool {
        self.from_user_account.as_deref() == Some(address)
            || self.to_user_account.as_deref() == Some(address)
    }

    pub fn mint(&self) -> Option<&str> {
        non_empty(self.mint.as_deref())
    }

    pub fn inline_name(&self) -> Option<&str> {
        non_empty(self.token.as_ref().and_then(|t| t.name.as_deref()))
            .or_else(|| non_empty(self.token_name.as_deref()))
    }

    pub fn inline_symbol(&self) -> Option<&str> {
        non_empty(self.token.as_ref().and_then(|t| t.symbol.as_deref()))
            .or_else(|| non_empty(self.token_symbol.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub name: String,
    pub symbol: String,
}

impl TokenIdentity {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }
}

/// Alert derived from a single transaction, built fresh per transaction and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRecord {
    pub signature: String,
    pub time: String,
    pub token_name: String,
    pub ticker: String,
    pub mint: String,
}
