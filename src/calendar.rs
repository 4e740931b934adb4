use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Business-day calendar: a set of working weekdays plus blocked calendar dates
/// (holidays, site shutdowns).
///
/// Every date computation in the crate goes through one of these, so weekend and
/// holiday handling is consistent between the forward pass, overrides and
/// delay recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    blocked_dates: HashSet<NaiveDate>,
    non_working_days: HashSet<Weekday>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    blocked_dates: Vec<NaiveDate>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::custom(WorkCalendar::STANDARD_WEEK, std::iter::empty())
    }
}

impl WorkCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub const STANDARD_WEEK: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    /// Mon-Fri calendar with the given blocked dates.
    pub fn with_blocked_dates<J>(blocked: J) -> Self
    where
        J: IntoIterator<Item = NaiveDate>,
    {
        Self::custom(Self::STANDARD_WEEK, blocked)
    }

    pub fn custom<I, J>(working_days: I, blocked: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let config = WorkCalendarConfig::new(working_days, blocked);
        Self::from_config(&config)
    }

    pub fn from_config(config: &WorkCalendarConfig) -> Self {
        let working_set: HashSet<Weekday> = config.working_days.iter().copied().collect();
        let working_set = if working_set.is_empty() {
            tracing::warn!("calendar config has no working days, using Mon-Fri");
            Self::STANDARD_WEEK.into_iter().collect()
        } else {
            working_set
        };

        let non_working_days = Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !working_set.contains(day))
            .collect();

        Self {
            blocked_dates: config.blocked_dates.iter().copied().collect(),
            non_working_days,
        }
    }

    /// Build a Mon-Fri calendar from ISO (`YYYY-MM-DD`) strings. Entries that do
    /// not parse are skipped with a warning.
    pub fn from_iso_strings<I, S>(blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dates = blocked.into_iter().filter_map(|raw| {
            let raw = raw.as_ref().trim();
            match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(err) => {
                    tracing::warn!(value = raw, error = %err, "ignoring malformed blocked date");
                    None
                }
            }
        });
        Self::with_blocked_dates(dates)
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    pub fn add_blocked_date(&mut self, date: NaiveDate) {
        self.blocked_dates.insert(date);
    }

    pub fn add_blocked_dates(&mut self, dates: &[NaiveDate]) {
        self.blocked_dates.extend(dates);
    }

    /// Set custom working days (e.g., Mon-Sat for 6-day weeks). An empty list is ignored.
    pub fn set_working_days(&mut self, days: Vec<Weekday>) {
        if days.is_empty() {
            tracing::warn!("refusing to clear every working day");
            return;
        }
        self.non_working_days.clear();
        for day in Self::ALL_WEEKDAYS {
            if !days.contains(&day) {
                self.non_working_days.insert(day);
            }
        }
    }

    pub fn blocked_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.blocked_dates.iter().copied().collect();
        dates.sort();
        dates
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.blocked_dates.contains(&date) && !self.non_working_days.contains(&date.weekday())
    }

    /// Returns `date` itself when it is a working day, otherwise the first working
    /// day after it.
    ///
    /// Terminates because a calendar always keeps at least one working weekday and
    /// the blocked set is finite. Stepping stops at `NaiveDate::MAX`.
    pub fn next_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        while !self.is_working_day(current) {
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Date of the `n`-th working day counted from `start`, where the normalized
    /// start is day one.
    ///
    /// `n == 0` returns the normalized start: a zero-duration task still occupies
    /// one valid day. Negative counts are treated as zero. Counts that run past
    /// the last representable date saturate at `NaiveDate::MAX`.
    pub fn add_working_days(&self, start: NaiveDate, n: i64) -> NaiveDate {
        let mut current = self.next_working_day(start);
        let mut counted = 1;
        while counted < n {
            let Some(next) = current.succ_opt() else {
                tracing::warn!(%start, n, "working day count ran past the calendar range");
                break;
            };
            current = next;
            if self.is_working_day(current) {
                counted += 1;
            }
        }
        current
    }

    /// All working days in the inclusive range.
    pub fn working_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = start;

        while current <= end {
            if self.is_working_day(current) {
                days.push(current);
            }
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        days
    }

    /// Number of working days in the inclusive range. Whole weeks are counted
    /// arithmetically, so distant ranges stay cheap.
    pub fn count_working_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return 0;
        }
        let total = (end - start).num_days() + 1;
        let weeks = total / 7;
        let per_week = (Self::ALL_WEEKDAYS.len() - self.non_working_days.len()) as i64;
        let mut count = weeks * per_week;

        // leftover days repeat the weekdays of the range's first days
        let mut current = start;
        for _ in 0..total % 7 {
            if !self.non_working_days.contains(&current.weekday()) {
                count += 1;
            }
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }

        let blocked = self
            .blocked_dates
            .iter()
            .filter(|date| {
                (start..=end).contains(*date) && !self.non_working_days.contains(&date.weekday())
            })
            .count() as i64;
        count - blocked
    }
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, blocked_dates: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup_by(|a, b| a.num_days_from_monday() == b.num_days_from_monday());

        let mut blocked_dates: Vec<NaiveDate> = blocked_dates.into_iter().collect();
        blocked_dates.sort();
        blocked_dates.dedup();

        Self {
            working_days: working,
            blocked_dates,
        }
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn blocked_dates(&self) -> &[NaiveDate] {
        &self.blocked_dates
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let working = WorkCalendar::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !calendar.non_working_days.contains(day))
            .collect::<Vec<_>>();

        Self {
            working_days: working,
            blocked_dates: calendar.blocked_dates(),
        }
    }
}
