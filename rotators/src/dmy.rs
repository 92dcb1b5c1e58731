use crate::rotator::{RotationSummary, Rotator};
use async_trait::async_trait;
use backup_rotator_backends::Backend;
use backup_rotator_core::{EngineConfig, Error, Result};
use chrono::{Datelike, Days, Local, Months, NaiveDate};
use std::collections::HashSet;
use tracing::{debug, info};

/// Format of the modifiers this rotator creates and keeps.
pub const MODIFIER_FORMAT: &str = "%Y-%m-%d";

/// Optional configuration key overriding the date of record, in
/// [`MODIFIER_FORMAT`].
pub const DATE_KEY: &str = "date";

/// How many daily, monthly and yearly copies to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub days: u32,
    pub months: u32,
    pub years: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            days: 7,
            months: 6,
            years: 10,
        }
    }
}

impl RetentionPolicy {
    /// Reads optional `days`, `months` and `years`, falling back to the
    /// defaults for any that are missing.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            days: config.optional_count("days")?.unwrap_or(defaults.days),
            months: config.optional_count("months")?.unwrap_or(defaults.months),
            years: config.optional_count("years")?.unwrap_or(defaults.years),
        })
    }
}

pub fn make_modifier(date: NaiveDate) -> String {
    date.format(MODIFIER_FORMAT).to_string()
}

/// Keeps the last `days` daily copies, the copies from the first of the last
/// `months` months and from January 1st of the last `years` years. Each
/// window includes the current day, month or year.
pub struct DmyRotator {
    policy: RetentionPolicy,
    date_of_record: NaiveDate,
}

impl DmyRotator {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            date_of_record: Local::now().date_naive(),
        }
    }

    /// Reads the retention policy and an optional `date` overriding today.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let rotator = Self::new(RetentionPolicy::from_config(config)?);
        match config.optional_str(DATE_KEY)? {
            Some(date) => {
                let date = NaiveDate::parse_from_str(date, MODIFIER_FORMAT).map_err(|e| {
                    Error::Config(format!("Key \"{}\" must be a YYYY-MM-DD date: {}", DATE_KEY, e))
                })?;
                Ok(rotator.with_date_of_record(date))
            }
            None => Ok(rotator),
        }
    }

    /// Treat `date` as today instead of the wall-clock date.
    pub fn with_date_of_record(mut self, date: NaiveDate) -> Self {
        self.date_of_record = date;
        self
    }

    /// Every date the policy keeps, newest first within each granularity.
    /// May contain duplicates. A window stops at the start of the calendar.
    fn dates_to_keep(&self) -> Vec<NaiveDate> {
        let today = self.date_of_record;
        let mut dates = Vec::new();

        for i in 0..self.policy.days {
            match today.checked_sub_days(Days::new(u64::from(i))) {
                Some(date) => dates.push(date),
                None => break,
            }
        }

        if let Some(first_of_month) = today.with_day(1) {
            for i in 0..self.policy.months {
                match first_of_month.checked_sub_months(Months::new(i)) {
                    Some(date) => dates.push(date),
                    None => break,
                }
            }
        }

        for i in 0..self.policy.years {
            let first_of_year = i32::try_from(i)
                .ok()
                .and_then(|i| today.year().checked_sub(i))
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
            match first_of_year {
                Some(date) => dates.push(date),
                None => break,
            }
        }

        dates
    }
}

#[async_trait]
impl Rotator for DmyRotator {
    fn keep_set(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.dates_to_keep()
            .into_iter()
            .map(make_modifier)
            .filter(|modifier| seen.insert(modifier.clone()))
            .collect()
    }

    async fn rotate(&self, backend: &dyn Backend) -> Result<RotationSummary> {
        let today = make_modifier(self.date_of_record);
        let copy = backend.copy_with_modifier(&today, false).await?;

        let mut keep: HashSet<String> = self.keep_set().into_iter().collect();
        keep.insert(today.clone());
        debug!(keep = keep.len(), policy = ?self.policy, "Computed keep set");

        let mut deleted = Vec::new();
        for modifier in backend.existing_copy_modifiers().await? {
            if keep.contains(&modifier) {
                continue;
            }
            backend.delete_with_modifier(&modifier).await?;
            deleted.push(modifier);
        }

        info!(
            today = %today,
            deleted = deleted.len(),
            destination = %backend.storage_key(),
            "Rotation finished"
        );
        Ok(RotationSummary { today, copy, deleted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockBackend;
    use backup_rotator_backends::CopyOutcome;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, MODIFIER_FORMAT).unwrap()
    }

    fn rotator(days: u32, months: u32, years: u32, today: &str) -> DmyRotator {
        DmyRotator::new(RetentionPolicy { days, months, years }).with_date_of_record(date(today))
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetentionPolicy::from_config(&EngineConfig::new()).unwrap();
        assert_eq!(policy, RetentionPolicy { days: 7, months: 6, years: 10 });
    }

    #[test]
    fn test_policy_rejects_non_numeric_values() {
        let config = EngineConfig::new().with("days", "a week");
        assert!(RetentionPolicy::from_config(&config).unwrap_err().is_config());
    }

    #[test]
    fn test_keep_set_covers_each_granularity() {
        let keep = rotator(3, 2, 2, "2019-03-15").keep_set();
        assert_eq!(
            keep,
            vec![
                "2019-03-15",
                "2019-03-14",
                "2019-03-13",
                "2019-03-01",
                "2019-02-01",
                "2019-01-01",
                "2018-01-01",
            ]
        );
    }

    #[test]
    fn test_keep_set_deduplicates_anchors() {
        let keep = rotator(1, 1, 1, "2020-01-01").keep_set();
        assert_eq!(keep, vec!["2020-01-01"]);
    }

    #[test]
    fn test_keep_set_months_cross_year_boundary() {
        let keep = rotator(0, 3, 0, "2019-01-31").keep_set();
        assert_eq!(keep, vec!["2019-01-01", "2018-12-01", "2018-11-01"]);
    }

    #[test]
    fn test_keep_set_stops_at_start_of_calendar() {
        let keep = rotator(7, 6, 300_000, "2019-01-11").keep_set();

        assert_eq!(&keep[..3], ["2019-01-11", "2019-01-10", "2019-01-09"]);
        assert!(keep.contains(&"2018-08-01".to_string()));
        assert!(keep.contains(&"1066-01-01".to_string()));
        let oldest_year = (NaiveDate::MIN.year()..)
            .find(|year| NaiveDate::from_ymd_opt(*year, 1, 1).is_some())
            .unwrap();
        assert_eq!(keep.last(), Some(&make_modifier(NaiveDate::from_ymd_opt(oldest_year, 1, 1).unwrap())));
        let years = usize::try_from(2019 - oldest_year + 1).unwrap();
        // 2019-01-01 is both a month and a year anchor
        assert_eq!(keep.len(), 7 + 6 + years - 1);
    }

    #[tokio::test]
    async fn test_rotate_with_huge_year_window_keeps_old_copies() {
        let backend = MockBackend::with_modifiers(&["2019-01-11", "1900-01-01", "1900-06-01"]);

        let summary = rotator(7, 6, 300_000, "2019-01-11").rotate(&backend).await.unwrap();

        assert_eq!(summary.deleted, vec!["1900-06-01"]);
    }

    #[test]
    fn test_from_config_reads_date_of_record() {
        let config = EngineConfig::new()
            .with("days", 1)
            .with("months", 0)
            .with("years", 0)
            .with(DATE_KEY, "2024-02-29");
        let rotator = DmyRotator::from_config(&config).unwrap();
        assert_eq!(rotator.keep_set(), vec!["2024-02-29"]);
    }

    #[test]
    fn test_from_config_rejects_malformed_date() {
        let config = EngineConfig::new().with(DATE_KEY, "29/02/2024");
        assert!(DmyRotator::from_config(&config).err().unwrap().is_config());
    }

    #[test]
    fn test_keep_set_empty_policy() {
        assert!(rotator(0, 0, 0, "2019-01-11").keep_set().is_empty());
    }

    #[tokio::test]
    async fn test_rotate_creates_today() {
        let backend = MockBackend::with_modifiers(&[]);
        let summary = rotator(1, 0, 0, "2024-02-29").rotate(&backend).await.unwrap();

        assert_eq!(backend.copies(), vec![("2024-02-29".to_string(), false)]);
        assert_eq!(summary.today, "2024-02-29");
        assert_eq!(summary.copy, CopyOutcome::Created);
    }

    #[tokio::test]
    async fn test_rotate_one_day_removes_yesterday() {
        let backend = MockBackend::with_modifiers(&["2024-02-29", "2024-02-28"]);
        rotator(1, 0, 0, "2024-02-29").rotate(&backend).await.unwrap();
        assert_eq!(backend.deletions(), vec!["2024-02-28"]);
    }

    #[tokio::test]
    async fn test_rotate_two_months_removes_two_months_ago() {
        let backend = MockBackend::with_modifiers(&["2024-05-17", "2024-05-01", "2024-04-01"]);
        rotator(1, 1, 0, "2024-05-17").rotate(&backend).await.unwrap();
        assert_eq!(backend.deletions(), vec!["2024-04-01"]);
    }

    #[tokio::test]
    async fn test_rotate_complex_config_works_correctly() {
        let backend = MockBackend::with_modifiers(&[
            "2019-01-11",
            "2019-01-10",
            "2019-01-09",
            "2019-01-07",
            "2019-01-06",
            "2019-01-05",
            "2019-01-04",
            "2019-01-01",
            "2018-12-31",
            "2018-12-30",
            "2018-12-01",
            "2018-11-01",
            "2018-01-01",
            "2017-01-01",
            "2016-01-01",
        ]);

        let summary = rotator(5, 2, 2, "2019-01-11").rotate(&backend).await.unwrap();

        let expected = vec![
            "2019-01-06",
            "2019-01-05",
            "2019-01-04",
            "2018-12-31",
            "2018-12-30",
            "2018-11-01",
            "2017-01-01",
            "2016-01-01",
        ];
        assert_eq!(backend.deletions(), expected);
        assert_eq!(summary.deleted, expected);
        assert_eq!(summary.copy, CopyOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_rotate_empty_policy_keeps_only_today() {
        let backend = MockBackend::with_modifiers(&["2019-01-10", "2018-01-01", "2019-01-09"]);
        rotator(0, 0, 0, "2019-01-11").rotate(&backend).await.unwrap();

        assert_eq!(backend.deletions(), vec!["2019-01-10", "2018-01-01", "2019-01-09"]);
        assert_eq!(backend.modifiers(), vec!["2019-01-11"]);
    }

    #[tokio::test]
    async fn test_rotate_twice_is_idempotent() {
        let backend = MockBackend::with_modifiers(&[
            "2019-01-11",
            "2019-01-05",
            "2018-12-01",
            "2018-06-01",
            "not-a-date",
        ]);
        let rotator = rotator(3, 2, 1, "2019-01-11");

        let first = rotator.rotate(&backend).await.unwrap();
        let second = rotator.rotate(&backend).await.unwrap();

        assert_eq!(first.deleted, vec!["2019-01-05", "2018-06-01", "not-a-date"]);
        assert!(second.deleted.is_empty());
        assert_eq!(second.copy, CopyOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_rotate_does_not_backfill_missing_copies() {
        let backend = MockBackend::with_modifiers(&[]);
        rotator(7, 6, 10, "2019-01-11").rotate(&backend).await.unwrap();
        assert_eq!(backend.copies().len(), 1);
        assert_eq!(backend.modifiers(), vec!["2019-01-11"]);
    }
}
