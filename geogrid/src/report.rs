//! Exporting scan results as CSV, JSON, and rank maps.

use crate::scan::Check;
use anyhow::Error;
use chrono::SecondsFormat;
use std::borrow::Cow;

mod map;

pub use map::{heat_weight, map, marker_style, MarkerStyle};

/// Columns of the CSV export, in order.
pub const CSV_HEADER: [&str; 8] = [
    "keyword",
    "lat",
    "lng",
    "dist_km",
    "org_rank",
    "lp_rank",
    "gmp_rank",
    "timestamp",
];

/// Render checks as CSV, one row per check.
///
/// Ranks for which the business did not appear are left empty.
pub fn csv(checks: &[Check]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.map(Cow::Borrowed));
    for check in checks {
        push_row(
            &mut out,
            [
                Cow::Borrowed(check.keyword.as_str()),
                check.lat.to_string().into(),
                check.lng.to_string().into(),
                check.dist_km.to_string().into(),
                rank_field(check.org_rank),
                rank_field(check.lp_rank),
                rank_field(check.gmp_rank),
                check
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true)
                    .into(),
            ],
        );
    }
    out
}

/// Render checks as a JSON array.
pub fn json(checks: &[Check]) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(checks)?)
}

fn rank_field(rank: Option<u32>) -> Cow<'static, str> {
    rank.map(|r| r.to_string().into()).unwrap_or_default()
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = Cow<'a, str>>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape(&field));
    }
    out.push('\n');
}

/// Quote a field if it contains a delimiter, a quote, or a line break.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\r' | '\n')) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}
