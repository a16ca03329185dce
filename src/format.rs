//! Display formatting.
//!
//! Pure functions that turn raw fetched values into the text shown after
//! each channel's label prefix. Anything missing, failed or non-numeric
//! becomes [`UNAVAILABLE`]; fields never affect each other.

use serde_json::Value;

use crate::types::{DisplayKey, Fetched, MarketSnapshot, RawStats};

/// Shown in place of any value that could not be produced.
pub const UNAVAILABLE: &str = "N/A";

/// Raw hashrate is H/s; labels show GH/s.
const HASHRATE_DIVISOR: f64 = 1e9;

/// Raw supply is scaled to billions of SOTER.
const SUPPLY_DIVISOR: f64 = 1_000_000_000.0;

const SUPPLY_SUFFIX: &str = "B SOTER";

// ---------------------------------------------------------------------------
// Number helpers
// ---------------------------------------------------------------------------

/// Format with a fixed number of decimals and `,` thousands separators.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let digits = int_part.as_bytes();
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, d) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*d as char);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Numeric JSON value as `f64`. Strings and booleans are not numbers.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn fetched_number(value: &Fetched<Value>) -> Option<f64> {
    value.as_ref().ok().and_then(as_number)
}

// ---------------------------------------------------------------------------
// Per-field formatters
// ---------------------------------------------------------------------------

/// Integer count with thousands separators.
pub fn format_count(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => group_thousands(v.trunc(), 0),
        _ => UNAVAILABLE.to_string(),
    }
}

/// Difficulty as the node reported it.
///
/// Falsy results (zero, empty string, empty array or object, null, false)
/// display as unavailable.
pub fn format_difficulty(value: &Fetched<Value>) -> String {
    match value {
        Ok(Value::String(s)) if !s.is_empty() => s.clone(),
        Ok(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        Ok(Value::Array(a)) if !a.is_empty() => Value::Array(a.clone()).to_string(),
        Ok(Value::Object(o)) if !o.is_empty() => Value::Object(o.clone()).to_string(),
        Ok(Value::Bool(true)) => true.to_string(),
        Ok(_) | Err(_) => UNAVAILABLE.to_string(),
    }
}

pub fn format_hashrate(value: &Fetched<Value>) -> String {
    match fetched_number(value) {
        Some(h) => group_thousands(h / HASHRATE_DIVISOR, 3),
        None => UNAVAILABLE.to_string(),
    }
}

pub fn format_supply(raw: &Fetched<f64>) -> String {
    match raw {
        Ok(s) if s.is_finite() => {
            format!("{}{SUPPLY_SUFFIX}", group_thousands(s / SUPPLY_DIVISOR, 2))
        }
        _ => UNAVAILABLE.to_string(),
    }
}

/// Spot price with an optional 24h change indicator.
pub fn format_price(price: Option<f64>, change_24h: Option<f64>) -> String {
    let core = match price {
        Some(p) => format!("${p:.6}"),
        None => UNAVAILABLE.to_string(),
    };
    match change_24h {
        Some(c) if c >= 0.0 => format!("{core} (▲ +{c:.2}% 24h)"),
        Some(c) => format!("{core} (▼ {c:.2}% 24h)"),
        None => core,
    }
}

/// Whole-dollar amount with thousands separators.
pub fn format_usd_whole(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => group_thousands(v, 0),
        _ => UNAVAILABLE.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Whole-cycle rendering
// ---------------------------------------------------------------------------

/// Render every display key, in reconciliation order.
pub fn render(stats: &RawStats, members: Option<u64>) -> Vec<(DisplayKey, String)> {
    let market = stats.market.as_ref().ok();
    let field = |pick: fn(&MarketSnapshot) -> Option<f64>| market.and_then(pick);

    DisplayKey::ALL
        .iter()
        .map(|&key| {
            let value = match key {
                DisplayKey::Members => format_count(members.map(|m| m as f64)),
                DisplayKey::Difficulty => format_difficulty(&stats.difficulty),
                DisplayKey::Hashrate => format_hashrate(&stats.hashrate),
                DisplayKey::BlockHeight => format_count(fetched_number(&stats.block_height)),
                DisplayKey::Supply => format_supply(&stats.supply),
                DisplayKey::Price => {
                    format_price(field(|m| m.price), field(|m| m.change_24h))
                }
                DisplayKey::Volume24h => format_usd_whole(field(|m| m.volume_24h)),
                DisplayKey::MarketCap => format_usd_whole(field(|m| m.market_cap)),
            };
            (key, value)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
