//! Percentile to tier labelling.

use serde::Serialize;

use crate::models::{RankResult, StatName};

use super::DEFAULT_EPSILON;

/// One rung of the division ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Division {
    pub label: &'static str,
    pub text: &'static str,
    pub icon: u32,
    /// Lowest percentile (inclusive) that reaches this division
    pub min_percentile: f64,
}

const fn division(label: &'static str, text: &'static str, icon: u32, min: f64) -> Division {
    Division {
        label,
        text,
        icon,
        min_percentile: min,
    }
}

/// Shown for stats a summoner has no rank in yet.
pub const UNRANKED: Division = division("unranked", "Unranked/Provisional", 29, 0.0);

/// Division ladder, highest threshold first.
pub const DIVISIONS: [Division; 26] = [
    division("challenger", "Challenger", 3812, 1.0),
    division("master", "Master", 3811, 0.95),
    division("diamond-1", "Diamond I", 3810, 0.92),
    division("diamond-2", "Diamond II", 3810, 0.89),
    division("diamond-3", "Diamond III", 3810, 0.86),
    division("diamond-4", "Diamond IV", 3810, 0.83),
    division("platinum-1", "Platinum I", 3809, 0.79),
    division("platinum-2", "Platinum II", 3809, 0.75),
    division("platinum-3", "Platinum III", 3809, 0.71),
    division("platinum-4", "Platinum IV", 3809, 0.67),
    division("gold-1", "Gold I", 3808, 0.62),
    division("gold-2", "Gold II", 3808, 0.57),
    division("gold-3", "Gold III", 3808, 0.52),
    division("gold-4", "Gold IV", 3808, 0.47),
    division("silver-1", "Silver I", 3807, 0.41),
    division("silver-2", "Silver II", 3807, 0.35),
    division("silver-3", "Silver III", 3807, 0.29),
    division("silver-4", "Silver IV", 3807, 0.23),
    division("bronze-1", "Bronze I", 3806, 0.18),
    division("bronze-2", "Bronze II", 3806, 0.13),
    division("bronze-3", "Bronze III", 3806, 0.09),
    division("bronze-4", "Bronze IV", 3806, 0.05),
    division("iron-1", "Iron I", 3805, 0.03),
    division("iron-2", "Iron II", 3805, 0.02),
    division("iron-3", "Iron III", 3805, 0.01),
    division("iron-4", "Iron IV", 3805, 0.0),
];

/// Map a percentile to its division.
///
/// Inverse stats (lower is better) are flipped before the lookup. Anything
/// below every threshold, including NaN, lands in the lowest division.
pub fn format(percentile: f64, is_inverse: bool) -> &'static Division {
    let p = if is_inverse { 1.0 - percentile } else { percentile };
    DIVISIONS
        .iter()
        .find(|d| d.min_percentile <= p)
        .unwrap_or(&DIVISIONS[DIVISIONS.len() - 1])
}

/// Short heading for a percentile: "Highest", "Lowest" or an ordinal.
pub fn heading(percentile: f64) -> String {
    if percentile >= 1.0 - DEFAULT_EPSILON {
        "Highest".to_string()
    } else if percentile > DEFAULT_EPSILON {
        // The ends are named, so an ordinal never reads 0th or 100th.
        let n = ((percentile * 100.0).round() as u32).clamp(1, 99);
        format!("{}{} percentile", n, ordinal_suffix(n))
    } else {
        "Lowest".to_string()
    }
}

fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Display-ready view of one stat's rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankDisplay {
    pub stat: StatName,
    /// 0 to 100
    pub percentile: f64,
    /// "{places from the top}/{total}"
    pub tooltip: String,
    pub heading: String,
    pub division: Division,
}

impl RankDisplay {
    pub fn new(stat: StatName, result: Option<&RankResult>) -> Self {
        match result {
            Some(r) => Self {
                stat,
                percentile: r.percentile * 100.0,
                tooltip: format!("{}/{}", r.total - r.rank, r.total),
                heading: heading(r.percentile),
                division: *format(r.percentile, stat.is_inverse()),
            },
            None => Self {
                stat,
                percentile: 0.0,
                tooltip: String::new(),
                heading: String::new(),
                division: UNRANKED,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_descending_and_complete() {
        assert_eq!(DIVISIONS[0].label, "challenger");
        assert_eq!(DIVISIONS[0].min_percentile, 1.0);
        assert_eq!(DIVISIONS[DIVISIONS.len() - 1].label, "iron-4");
        assert_eq!(DIVISIONS[DIVISIONS.len() - 1].min_percentile, 0.0);
        for pair in DIVISIONS.windows(2) {
            assert!(pair[0].min_percentile > pair[1].min_percentile);
        }
    }

    #[test]
    fn test_format_extremes() {
        assert_eq!(format(1.0, false).label, "challenger");
        assert_eq!(format(0.0, true).label, "challenger");
        assert_eq!(format(0.0, false).label, "iron-4");
        assert_eq!(format(1.0, true).label, "iron-4");
    }

    #[test]
    fn test_format_thresholds_inclusive() {
        assert_eq!(format(0.95, false).label, "master");
        assert_eq!(format(0.9499, false).label, "diamond-1");
        assert_eq!(format(0.5, false).label, "gold-4");
        assert_eq!(format(0.52, false).label, "gold-3");
    }

    #[test]
    fn test_format_inverse() {
        // 0.25 for a lower-is-better stat reads as 0.75
        assert_eq!(format(0.25, true).label, "platinum-2");
    }

    #[test]
    fn test_format_out_of_range_falls_to_lowest() {
        assert_eq!(format(-0.5, false).label, "iron-4");
        assert_eq!(format(f64::NAN, false).label, "iron-4");
    }

    #[test]
    fn test_heading() {
        assert_eq!(heading(1.0), "Highest");
        assert_eq!(heading(1.0 - 1e-12), "Highest");
        assert_eq!(heading(0.0), "Lowest");
        assert_eq!(heading(0.5), "50th percentile");
        assert_eq!(heading(0.01), "1st percentile");
        assert_eq!(heading(0.22), "22nd percentile");
        assert_eq!(heading(0.13), "13th percentile");
    }

    #[test]
    fn test_heading_near_ends_stays_ordinal() {
        assert_eq!(heading(0.996), "99th percentile");
        assert_eq!(heading(0.004), "1st percentile");
    }

    #[test]
    fn test_rank_display() {
        let result = RankResult {
            rank: 3,
            total: 5,
            percentile: 0.75,
        };
        let display = RankDisplay::new(StatName::Kda, Some(&result));

        assert_eq!(display.percentile, 75.0);
        assert_eq!(display.tooltip, "2/5");
        assert_eq!(display.heading, "75th percentile");
        assert_eq!(display.division.label, "platinum-2");
    }

    #[test]
    fn test_rank_display_inverse_stat() {
        let result = RankResult {
            rank: 0,
            total: 4,
            percentile: 0.0,
        };
        let display = RankDisplay::new(StatName::AverageDeaths, Some(&result));
        assert_eq!(display.division.label, "challenger");
        assert_eq!(display.heading, "Lowest");
    }

    #[test]
    fn test_rank_display_unranked() {
        let display = RankDisplay::new(StatName::Wins, None);
        assert_eq!(display.division, UNRANKED);
        assert_eq!(display.division.icon, 29);
        assert!(display.tooltip.is_empty());
    }
}
