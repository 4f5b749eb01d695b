//! Visibility statistics for scans.

use crate::scan::{Check, Mode, Scan, ScanId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use strum::IntoEnumIterator;

/// Headline numbers for a set of checks.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Summary {
    pub total_checks: usize,
    /// Percentage of checks where the business appeared in organic results.
    pub org_pct: f64,
    /// Percentage of checks where the business appeared in the local pack.
    pub lp_pct: f64,
    /// Percentage of checks where the business appeared in Google Maps.
    pub gmp_pct: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_org_rank: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_lp_rank: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_gmp_rank: Option<f64>,
}

impl Summary {
    /// Summarize a set of checks.
    pub fn of<'a>(checks: impl IntoIterator<Item = &'a Check>) -> Self {
        let checks = checks.into_iter().collect::<Vec<_>>();
        Self {
            total_checks: checks.len(),
            org_pct: visibility(&checks, Mode::Organic),
            lp_pct: visibility(&checks, Mode::LocalPack),
            gmp_pct: visibility(&checks, Mode::Maps),
            avg_org_rank: average_rank(&checks, Mode::Organic),
            avg_lp_rank: average_rank(&checks, Mode::LocalPack),
            avg_gmp_rank: average_rank(&checks, Mode::Maps),
        }
    }

    /// Summarize each keyword separately.
    pub fn by_keyword(checks: &[Check]) -> BTreeMap<String, Self> {
        let mut groups: BTreeMap<&str, Vec<&Check>> = BTreeMap::new();
        for check in checks {
            groups.entry(&check.keyword).or_default().push(check);
        }
        groups
            .into_iter()
            .map(|(keyword, checks)| (keyword.to_string(), Self::of(checks)))
            .collect()
    }

    /// The percentage of checks with a rank in `mode`.
    pub fn pct(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Organic => self.org_pct,
            Mode::LocalPack => self.lp_pct,
            Mode::Maps => self.gmp_pct,
        }
    }

    /// The average rank in `mode`, over checks where the business appeared.
    pub fn avg_rank(&self, mode: Mode) -> Option<f64> {
        match mode {
            Mode::Organic => self.avg_org_rank,
            Mode::LocalPack => self.avg_lp_rank,
            Mode::Maps => self.avg_gmp_rank,
        }
    }
}

fn visibility(checks: &[&Check], mode: Mode) -> f64 {
    if checks.is_empty() {
        return 0.0;
    }
    let ranked = checks.iter().filter(|c| c.rank(mode).is_some()).count();
    ranked as f64 / checks.len() as f64 * 100.0
}

fn average_rank(checks: &[&Check], mode: Mode) -> Option<f64> {
    let ranks = checks
        .iter()
        .filter_map(|c| c.rank(mode))
        .collect::<Vec<_>>();
    if ranks.is_empty() {
        None
    } else {
        Some(ranks.iter().map(|&r| f64::from(r)).sum::<f64>() / ranks.len() as f64)
    }
}

/// How visibility changed between two scans.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Comparison {
    pub before: ScanId,
    pub after: ScanId,
    /// Number of checks present in both scans, matched by keyword and location.
    pub matched: usize,
    pub modes: Vec<ModeComparison>,
}

/// Changes in a single kind of search result.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ModeComparison {
    pub mode: Mode,
    pub pct_before: f64,
    pub pct_after: f64,
    pub pct_delta: f64,
    pub avg_rank_before: Option<f64>,
    pub avg_rank_after: Option<f64>,
    /// Matched checks where the business moved up.
    pub improved: usize,
    /// Matched checks where the business moved down.
    pub declined: usize,
    /// Matched checks with the same rank, or absent both times.
    pub unchanged: usize,
    /// Matched checks where the business newly appeared.
    pub gained: usize,
    /// Matched checks where the business no longer appears.
    pub lost: usize,
}

/// Coordinates are matched to within about a meter.
const MATCH_PRECISION: f64 = 1e5;

type CheckKey<'a> = (&'a str, i64, i64);

fn key(check: &Check) -> CheckKey<'_> {
    (
        check.keyword.as_str(),
        (check.lat * MATCH_PRECISION).round() as i64,
        (check.lng * MATCH_PRECISION).round() as i64,
    )
}

impl Comparison {
    /// Compare an earlier scan to a later one.
    ///
    /// Visibility and average rank are computed over each whole scan. Per-position changes only
    /// consider checks of the same keyword at the same location in both scans.
    pub fn between(before: &Scan, after: &Scan) -> Self {
        let earlier = before
            .checks
            .iter()
            .map(|c| (key(c), c))
            .collect::<HashMap<_, _>>();
        let pairs = after
            .checks
            .iter()
            .filter_map(|c| earlier.get(&key(c)).map(|prev| (*prev, c)))
            .collect::<Vec<_>>();
        if pairs.is_empty() {
            tracing::warn!(
                before = %before.id,
                after = %after.id,
                "scans have no checks in common"
            );
        }

        let summary_before = Summary::of(&before.checks);
        let summary_after = Summary::of(&after.checks);
        let modes = Mode::iter()
            .map(|mode| {
                let mut cmp = ModeComparison {
                    mode,
                    pct_before: summary_before.pct(mode),
                    pct_after: summary_after.pct(mode),
                    pct_delta: summary_after.pct(mode) - summary_before.pct(mode),
                    avg_rank_before: summary_before.avg_rank(mode),
                    avg_rank_after: summary_after.avg_rank(mode),
                    improved: 0,
                    declined: 0,
                    unchanged: 0,
                    gained: 0,
                    lost: 0,
                };
                for (prev, next) in &pairs {
                    match (prev.rank(mode), next.rank(mode)) {
                        (Some(a), Some(b)) if b < a => cmp.improved += 1,
                        (Some(a), Some(b)) if b > a => cmp.declined += 1,
                        (None, Some(_)) => cmp.gained += 1,
                        (Some(_), None) => cmp.lost += 1,
                        _ => cmp.unchanged += 1,
                    }
                }
                cmp
            })
            .collect();

        Self {
            before: before.id,
            after: after.id,
            matched: pairs.len(),
            modes,
        }
    }

    pub fn mode(&self, mode: Mode) -> Option<&ModeComparison> {
        self.modes.iter().find(|cmp| cmp.mode == mode)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::{geo::LatLng, scan::ScanRequest};
    use chrono::Utc;

    pub(crate) fn check(
        keyword: &str,
        lat: f64,
        lng: f64,
        ranks: (Option<u32>, Option<u32>, Option<u32>),
    ) -> Check {
        Check {
            keyword: keyword.into(),
            lat,
            lng,
            dist_km: 0.0,
            org_rank: ranks.0,
            lp_rank: ranks.1,
            gmp_rank: ranks.2,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn scan(checks: Vec<Check>) -> Scan {
        Scan {
            id: crate::scan::new_scan_id(),
            request: ScanRequest::new("Bean There Cafe", ["coffee"]),
            center: LatLng::new(37.422, -122.0841),
            target_place_id: Some("place-bean-there".into()),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            checks,
        }
    }

    #[test]
    fn test_summary() {
        let checks = [
            check("coffee", 0.0, 0.0, (Some(1), Some(2), None)),
            check("coffee", 0.0, 0.1, (Some(3), None, None)),
            check("tea", 0.0, 0.0, (None, Some(4), None)),
            check("tea", 0.0, 0.1, (None, None, None)),
        ];
        let summary = Summary::of(&checks);
        assert_eq!(summary.total_checks, 4);
        assert_eq!(summary.org_pct, 50.0);
        assert_eq!(summary.lp_pct, 50.0);
        assert_eq!(summary.gmp_pct, 0.0);
        assert_eq!(summary.avg_org_rank, Some(2.0));
        assert_eq!(summary.avg_lp_rank, Some(3.0));
        assert_eq!(summary.avg_gmp_rank, None);

        let by_keyword = Summary::by_keyword(&checks);
        assert_eq!(by_keyword.keys().collect::<Vec<_>>(), ["coffee", "tea"]);
        assert_eq!(by_keyword["coffee"].org_pct, 100.0);
        assert_eq!(by_keyword["tea"].avg_lp_rank, Some(4.0));
    }

    #[test]
    fn test_empty_summary() {
        let summary = Summary::of(std::iter::empty());
        assert_eq!(summary, Summary::default());

        // Averages are omitted, not null, when nothing ranked.
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("avg_org_rank").is_none());
    }

    #[test]
    fn test_comparison() {
        let before = scan(vec![
            check("coffee", 1.0, 1.0, (Some(5), None, Some(2))),
            check("coffee", 1.0, 2.0, (Some(1), Some(1), None)),
            check("coffee", 9.0, 9.0, (Some(1), Some(1), Some(1))),
        ]);
        let after = scan(vec![
            check("coffee", 1.000_000_1, 1.0, (Some(2), Some(3), Some(2))),
            check("coffee", 1.0, 2.0, (Some(4), None, Some(6))),
            check("tea", 1.0, 1.0, (Some(1), Some(1), Some(1))),
        ]);

        let cmp = Comparison::between(&before, &after);
        assert_eq!(cmp.before, before.id);
        assert_eq!(cmp.matched, 2);

        let organic = cmp.mode(Mode::Organic).unwrap();
        assert_eq!((organic.improved, organic.declined), (1, 1));
        assert_eq!(organic.pct_delta, 0.0);
        assert_eq!(organic.avg_rank_before, Some(7.0 / 3.0));
        assert_eq!(organic.avg_rank_after, Some(7.0 / 3.0));

        let local = cmp.mode(Mode::LocalPack).unwrap();
        assert_eq!((local.gained, local.lost), (1, 1));

        let maps = cmp.mode(Mode::Maps).unwrap();
        assert_eq!((maps.unchanged, maps.gained), (1, 1));
        assert_eq!(maps.pct_before, 2.0 / 3.0 * 100.0);
        assert_eq!(maps.pct_after, 100.0);
    }
}
