//! Season-window resolution
//!
//! Maps a recurring annual season and an intervention period onto the nearest
//! complete pre-intervention and post-intervention occurrences of that season.
//! The same four-branch logic covers seasons that wrap the calendar-year
//! boundary (e.g. a Nov-Feb dry season) and those that do not.

use chrono::{Datelike, NaiveDate};

use crate::types::{
    CalendarWindow, InterventionPeriod, MonthYear, Season, SeasonConfig, SkipReason,
};

/// Nearest complete occurrence of `season` before the intervention started.
///
/// If the intervention began before the season's end month would have
/// occurred that year, that year's occurrence had not yet finished, so the
/// prior occurrence is used.
pub fn pre_window(season: Season, intervention_start: MonthYear) -> CalendarWindow {
    let end_year = if intervention_start.month < season.end_month() {
        intervention_start.year - 1
    } else {
        intervention_start.year
    };
    let start_year = if season.wraps() { end_year - 1 } else { end_year };

    CalendarWindow {
        start: MonthYear::new(season.start_month(), start_year),
        end: MonthYear::new(season.end_month(), end_year),
    }
}

/// Nearest complete occurrence of `season` after the intervention ended.
///
/// If the season's start month already passed before the intervention ended,
/// that occurrence overlaps the intervention and the following year's is
/// used instead.
pub fn post_window(season: Season, intervention_end: MonthYear) -> CalendarWindow {
    let start_year = if intervention_end.month > season.start_month() {
        intervention_end.year + 1
    } else {
        intervention_end.year
    };
    let end_year = if season.wraps() { start_year + 1 } else { start_year };

    CalendarWindow {
        start: MonthYear::new(season.start_month(), start_year),
        end: MonthYear::new(season.end_month(), end_year),
    }
}

/// Resolved pre/post windows for every configured season, index-aligned
/// with the wet and dry season lists they were derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonWindows {
    pub pre_wet: Vec<CalendarWindow>,
    pub post_wet: Vec<CalendarWindow>,
    pub pre_dry: Vec<CalendarWindow>,
    pub post_dry: Vec<CalendarWindow>,
}

impl SeasonWindows {
    /// Paired (pre, post) wet-season windows, in input order
    pub fn wet_pairs(&self) -> impl Iterator<Item = (&CalendarWindow, &CalendarWindow)> {
        self.pre_wet.iter().zip(self.post_wet.iter())
    }

    /// Paired (pre, post) dry-season windows, in input order
    pub fn dry_pairs(&self) -> impl Iterator<Item = (&CalendarWindow, &CalendarWindow)> {
        self.pre_dry.iter().zip(self.post_dry.iter())
    }
}

/// Resolve pre/post windows for every wet and dry season of a region.
///
/// Exactly one pre and one post window is produced per input season.
pub fn resolve_pre_post(
    intervention: InterventionPeriod,
    seasons: &SeasonConfig,
) -> SeasonWindows {
    let pre = |s: &Season| pre_window(*s, intervention.start);
    let post = |s: &Season| post_window(*s, intervention.end);

    SeasonWindows {
        pre_wet: seasons.wet.iter().map(pre).collect(),
        post_wet: seasons.wet.iter().map(post).collect(),
        pre_dry: seasons.dry.iter().map(pre).collect(),
        post_dry: seasons.dry.iter().map(post).collect(),
    }
}

/// Whether a resolved window can be aggregated against the observed series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Usable(CalendarWindow),
    Unusable {
        window: CalendarWindow,
        reason: SkipReason,
    },
}

/// Check a post window against the last available observation.
///
/// A post window whose end month begins after the last observed timestamp
/// has not been (fully) observed yet and must be skipped by the caller.
pub fn classify_post(window: CalendarWindow, last_observation: NaiveDate) -> WindowStatus {
    let last = MonthYear::new(last_observation.month(), last_observation.year());
    if window.end > last {
        WindowStatus::Unusable {
            window,
            reason: SkipReason::NoPostData,
        }
    } else {
        WindowStatus::Usable(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season(m1: u32, m2: u32) -> Season {
        Season::new(m1, m2).unwrap()
    }

    fn window(sm: u32, sy: i32, em: u32, ey: i32) -> CalendarWindow {
        CalendarWindow {
            start: MonthYear::new(sm, sy),
            end: MonthYear::new(em, ey),
        }
    }

    #[test]
    fn pre_window_intervention_before_season_end() {
        // Jun-Sep season, intervention starts Mar 2020: the 2020 season
        // had not finished yet, so the 2019 occurrence is the pre window.
        let w = pre_window(season(6, 9), MonthYear::new(3, 2020));
        assert_eq!(w, window(6, 2019, 9, 2019));
    }

    #[test]
    fn pre_window_intervention_after_season_end() {
        let w = pre_window(season(6, 9), MonthYear::new(10, 2020));
        assert_eq!(w, window(6, 2020, 9, 2020));
    }

    #[test]
    fn post_window_intervention_before_season_start() {
        let w = post_window(season(6, 9), MonthYear::new(3, 2020));
        assert_eq!(w, window(6, 2020, 9, 2020));
    }

    #[test]
    fn post_window_intervention_after_season_start() {
        // Intervention ran into the 2020 season, so the first clean post
        // occurrence is 2021.
        let w = post_window(season(6, 9), MonthYear::new(8, 2020));
        assert_eq!(w, window(6, 2021, 9, 2021));
    }

    #[test]
    fn pre_window_wrapping_dry_season() {
        // Nov-Feb dry season, intervention starts Jan 2021: the season
        // ending Feb 2021 was still running, so use Nov 2019 - Feb 2020.
        let w = pre_window(season(11, 2), MonthYear::new(1, 2021));
        assert_eq!(w, window(11, 2019, 2, 2020));
    }

    #[test]
    fn post_window_wrapping_dry_season() {
        let w = post_window(season(11, 2), MonthYear::new(12, 2020));
        assert_eq!(w, window(11, 2021, 2, 2022));
    }

    #[test]
    fn wrapping_windows_span_adjacent_years() {
        for m1 in 1..=12u32 {
            for m2 in 1..=12u32 {
                let s = season(m1, m2);
                let pre = pre_window(s, MonthYear::new(6, 2020));
                let post = post_window(s, MonthYear::new(6, 2020));
                for w in [pre, post] {
                    if s.wraps() {
                        assert_eq!(w.end.year, w.start.year + 1);
                    } else {
                        assert_eq!(w.end.year, w.start.year);
                        assert!(w.start.month <= w.end.month);
                    }
                    assert!(w.start <= w.end || s.wraps());
                }
            }
        }
    }

    #[test]
    fn resolver_is_deterministic() {
        let s = season(4, 10);
        let anchor = MonthYear::new(7, 2018);
        assert_eq!(pre_window(s, anchor), pre_window(s, anchor));
        assert_eq!(post_window(s, anchor), post_window(s, anchor));
    }

    #[test]
    fn same_season_intervention_keeps_adjacent_years() {
        // Intervention start and end inside one Jun-Sep occurrence: pre is
        // the year before, post the year after, and neither is rejected.
        let s = season(6, 9);
        let pre = pre_window(s, MonthYear::new(7, 2020));
        let post = post_window(s, MonthYear::new(8, 2020));
        assert_eq!(pre, window(6, 2019, 9, 2019));
        assert_eq!(post, window(6, 2021, 9, 2021));
    }

    #[test]
    fn aggregate_resolution_is_index_aligned() {
        let seasons = SeasonConfig::new(
            vec![season(3, 5), season(8, 10)],
            vec![season(11, 2)],
        )
        .unwrap();
        let intervention = InterventionPeriod {
            start: MonthYear::new(1, 2019),
            end: MonthYear::new(6, 2020),
        };

        let windows = resolve_pre_post(intervention, &seasons);
        assert_eq!(windows.pre_wet.len(), 2);
        assert_eq!(windows.post_wet.len(), 2);
        assert_eq!(windows.pre_dry.len(), 1);
        assert_eq!(windows.post_dry.len(), 1);

        assert_eq!(windows.pre_wet[0], pre_window(seasons.wet[0], intervention.start));
        assert_eq!(windows.post_wet[1], post_window(seasons.wet[1], intervention.end));
    }

    #[test]
    fn classify_post_flags_unobserved_window() {
        let w = window(6, 2024, 9, 2024);
        let last = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert_eq!(
            classify_post(w, last),
            WindowStatus::Unusable {
                window: w,
                reason: SkipReason::NoPostData
            }
        );
    }

    #[test]
    fn classify_post_accepts_window_ending_in_last_month() {
        let w = window(6, 2023, 9, 2023);
        // Mid-month observation still covers the September composite.
        let last = NaiveDate::from_ymd_opt(2023, 9, 15).unwrap();
        assert_eq!(classify_post(w, last), WindowStatus::Usable(w));
    }
}
