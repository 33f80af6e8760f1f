//! Cash-flow reports
//!
//! Aggregates closures into periods for charting. Only data is produced here;
//! rendering belongs to the caller.

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::DateRange;
use crate::closure::Closure;

/// Window of dates a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TimeRange {
    /// From the earliest to the latest closure
    All,
    CurrentYear,
    CurrentQuarter,
    CurrentMonth,
    /// Monday to Sunday of the current week
    CurrentWeek,
    LastMonth,
    LastYear,
    Custom(DateRange),
}

impl TimeRange {
    /// Resolves the range to concrete dates
    ///
    /// Returns None for `All` when there are no closures.
    pub fn resolve(&self, closures: &[Closure], today: NaiveDate) -> Option<DateRange> {
        let (start, end) = match self {
            TimeRange::All => {
                let start = closures.iter().map(|c| c.date).min()?;
                let end = closures.iter().map(|c| c.date).max()?;
                (start, end)
            }
            TimeRange::CurrentYear => year_bounds(today)?,
            TimeRange::CurrentQuarter => {
                let first_month = (today.month0() / 3) * 3 + 1;
                let start = NaiveDate::from_ymd_opt(today.year(), first_month, 1)?;
                let end = start.checked_add_months(Months::new(3))?.pred_opt()?;
                (start, end)
            }
            TimeRange::CurrentMonth => month_bounds(today)?,
            TimeRange::CurrentWeek => {
                let start = Grouping::Week.period_start(today);
                (start, start.checked_add_days(Days::new(6))?)
            }
            TimeRange::LastMonth => month_bounds(today.checked_sub_months(Months::new(1))?)?,
            TimeRange::LastYear => year_bounds(today.checked_sub_months(Months::new(12))?)?,
            TimeRange::Custom(range) => return Some(*range),
        };
        DateRange::new(start, end).ok()
    }
}

fn month_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = date.with_day(1)?;
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((start, end))
}

fn year_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(date.year(), 1, 1)?,
        NaiveDate::from_ymd_opt(date.year(), 12, 31)?,
    ))
}

/// Period size of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    Day,
    /// Weeks start on Monday
    Week,
    Month,
    Year,
}

impl Grouping {
    /// First day of the period containing `date`
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Grouping::Day => date,
            Grouping::Week => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Grouping::Month => date.with_day(1).unwrap_or(date),
            Grouping::Year => date.with_ordinal(1).unwrap_or(date),
        }
    }

    /// First day of the period after the one starting at `start`
    pub fn next_period(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Grouping::Day => start.checked_add_days(Days::new(1)),
            Grouping::Week => start.checked_add_days(Days::new(7)),
            Grouping::Month => start.checked_add_months(Months::new(1)),
            Grouping::Year => start.checked_add_months(Months::new(12)),
        }
    }

    /// Display label of the period starting at `start`
    pub fn label(&self, start: NaiveDate) -> String {
        match self {
            Grouping::Day => start.format("%Y-%m-%d").to_string(),
            Grouping::Week => {
                let week = start.iso_week();
                format!("Week {} - {}", week.week(), week.year())
            }
            Grouping::Month => start.format("%Y-%m").to_string(),
            Grouping::Year => start.format("%Y").to_string(),
        }
    }

    /// Start dates of every period overlapping the range
    pub fn periods(&self, range: &DateRange) -> Vec<NaiveDate> {
        let mut periods = Vec::new();
        let mut current = Some(self.period_start(range.start));
        while let Some(start) = current.filter(|s| *s <= range.end) {
            periods.push(start);
            current = self.next_period(start);
        }
        periods
    }
}

/// Income and expense of one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowEntry {
    pub period_start: NaiveDate,
    pub label: String,
    pub income: Decimal,
    /// Positive magnitude of all expenses
    pub expense: Decimal,
    /// `income - expense`
    pub balance: Decimal,
}

/// One bar of a balance waterfall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallStep {
    pub period_start: NaiveDate,
    pub label: String,
    /// The absolute balance for the first step, the variation afterwards
    pub value: Decimal,
    pub start: Decimal,
    pub end: Decimal,
    pub running_total: Decimal,
}

fn closures_in<'a>(
    closures: &'a [Closure],
    range: &'a DateRange,
    grouping: Grouping,
    period: NaiveDate,
) -> impl Iterator<Item = &'a Closure> + 'a {
    let next = grouping.next_period(period);
    closures.iter().filter(move |c| {
        range.contains(c.date) && c.date >= period && next.map_or(true, |n| c.date < n)
    })
}

/// Income, expense and net flow per period
///
/// Every period of the range is present, with zeros when it holds no
/// closures. Transfer legs are excluded since they only move money between
/// the business's own accounts.
pub fn cash_flow(closures: &[Closure], range: TimeRange, grouping: Grouping, today: NaiveDate) -> Vec<CashFlowEntry> {
    let Some(range) = range.resolve(closures, today) else {
        return Vec::new();
    };

    grouping
        .periods(&range)
        .into_iter()
        .map(|period| {
            let (income, expense) = closures_in(closures, &range, grouping, period)
                .flat_map(|c| c.transactions.iter())
                .filter(|t| !t.is_transfer())
                .fold((Decimal::ZERO, Decimal::ZERO), |(income, expense), t| {
                    if t.amount > Decimal::ZERO {
                        (income + t.amount, expense)
                    } else {
                        (income, expense + t.amount.abs())
                    }
                });

            CashFlowEntry {
                period_start: period,
                label: grouping.label(period),
                income,
                expense,
                balance: income - expense,
            }
        })
        .collect()
}

/// Balance evolution per period
///
/// Each period takes the final balance of its last closure; periods with a
/// zero balance are dropped. The first step carries the absolute balance and
/// later steps the change from the previous one.
pub fn waterfall(closures: &[Closure], range: TimeRange, grouping: Grouping, today: NaiveDate) -> Vec<WaterfallStep> {
    let Some(range) = range.resolve(closures, today) else {
        return Vec::new();
    };

    let balances: Vec<(NaiveDate, Decimal)> = grouping
        .periods(&range)
        .into_iter()
        .filter_map(|period| {
            closures_in(closures, &range, grouping, period)
                .max_by_key(|c| c.date)
                .map(|c| (period, c.final_balance))
        })
        .filter(|(_, balance)| !balance.is_zero())
        .collect();

    let mut steps = Vec::with_capacity(balances.len());
    let mut previous: Option<Decimal> = None;
    for (period, balance) in balances {
        let (value, start) = match previous {
            None => (balance, Decimal::ZERO),
            Some(prev) => (balance - prev, prev),
        };
        steps.push(WaterfallStep {
            period_start: period,
            label: grouping.label(period),
            value,
            start,
            end: balance,
            running_total: balance,
        });
        previous = Some(balance);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_starts_monday() {
        // 2024-03-07 is a Thursday
        assert_eq!(Grouping::Week.period_start(date(2024, 3, 7)), date(2024, 3, 4));
        assert_eq!(Grouping::Week.period_start(date(2024, 3, 4)), date(2024, 3, 4));
        assert_eq!(Grouping::Week.period_start(date(2024, 3, 10)), date(2024, 3, 4));
    }

    #[test]
    fn test_periods_cover_range() {
        let range = DateRange::new(date(2024, 1, 15), date(2024, 3, 2)).unwrap();
        assert_eq!(
            Grouping::Month.periods(&range),
            vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1)]
        );
    }

    #[test]
    fn test_current_ranges() {
        let today = date(2024, 5, 15);
        let month = TimeRange::CurrentMonth.resolve(&[], today).unwrap();
        assert_eq!((month.start, month.end), (date(2024, 5, 1), date(2024, 5, 31)));

        let quarter = TimeRange::CurrentQuarter.resolve(&[], today).unwrap();
        assert_eq!((quarter.start, quarter.end), (date(2024, 4, 1), date(2024, 6, 30)));

        let last_month = TimeRange::LastMonth.resolve(&[], today).unwrap();
        assert_eq!((last_month.start, last_month.end), (date(2024, 4, 1), date(2024, 4, 30)));

        let week = TimeRange::CurrentWeek.resolve(&[], today).unwrap();
        assert_eq!((week.start, week.end), (date(2024, 5, 13), date(2024, 5, 19)));
    }

    #[test]
    fn test_all_without_closures() {
        assert!(TimeRange::All.resolve(&[], date(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Grouping::Day.label(date(2024, 3, 5)), "2024-03-05");
        assert_eq!(Grouping::Week.label(date(2024, 3, 4)), "Week 10 - 2024");
        assert_eq!(Grouping::Month.label(date(2024, 3, 1)), "2024-03");
        assert_eq!(Grouping::Year.label(date(2024, 1, 1)), "2024");
    }
}
