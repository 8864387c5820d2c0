/**
 * Admin Analytics
 * Inquiry and gallery aggregates as of a point in time
 */
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::db::models::{ContactStatus, GroupCount, MonthCount};
use crate::db::StudioStore;
use crate::error::AppResult;

/// Length of the recent and previous comparison windows.
const COMPARISON_DAYS: i64 = 30;
/// Calendar months in the inquiries-over-time series, current month included.
const TREND_MONTHS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Shifts by whole months; negative goes back.
    pub fn offset(self, months: i32) -> Self {
        let index = self.year * 12 + self.month as i32 - 1 + months;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn first_instant(self) -> Option<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)?
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    #[serde(rename = "_id")]
    pub id: YearMonth,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub total_contacts: i64,
    pub recent_contacts: i64,
    pub previous_contacts: i64,
    /// Percent change of recent over previous, one decimal; 0 without a baseline.
    pub contacts_change: f64,
    pub booked_events: i64,
    pub completed_events: i64,
    pub total_gallery_images: i64,
    pub contacts_by_status: Vec<GroupCount>,
    pub contacts_by_event_type: Vec<GroupCount>,
    pub images_by_category: Vec<GroupCount>,
    pub contacts_over_time: Vec<MonthBucket>,
}

pub fn percent_change(recent: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    let change = (recent - previous) as f64 / previous as f64 * 100.0;
    (change * 10.0).round() / 10.0
}

/// Every month from `first` for `months` months, zero where no count exists.
pub fn fill_months(first: YearMonth, months: u32, counts: &[MonthCount]) -> Vec<MonthBucket> {
    (0..months as i32)
        .map(|i| {
            let id = first.offset(i);
            let count = counts
                .iter()
                .find(|c| c.year == id.year && c.month == id.month)
                .map_or(0, |c| c.count);
            MonthBucket { id, count }
        })
        .collect()
}

fn group_counts<K: ToString>(counts: Vec<(K, i64)>) -> Vec<GroupCount> {
    counts
        .into_iter()
        .map(|(key, count)| GroupCount {
            id: key.to_string(),
            count,
        })
        .collect()
}

pub async fn report(store: &dyn StudioStore, now: DateTime<Utc>) -> AppResult<AnalyticsReport> {
    let recent_from = now - Duration::days(COMPARISON_DAYS);
    let previous_from = recent_from - Duration::days(COMPARISON_DAYS);

    let first_month = YearMonth::of(now).offset(-(TREND_MONTHS as i32 - 1));
    let trend_from = first_month.first_instant().unwrap_or(previous_from);

    let total_contacts = store.count_contacts(None).await?;
    let recent_contacts = store.count_contacts_created(recent_from, None).await?;
    let previous_contacts = store
        .count_contacts_created(previous_from, Some(recent_from))
        .await?;
    let monthly = store.count_contacts_by_month(trend_from).await?;

    Ok(AnalyticsReport {
        total_contacts,
        recent_contacts,
        previous_contacts,
        contacts_change: percent_change(recent_contacts, previous_contacts),
        booked_events: store.count_contacts(Some(ContactStatus::Booked)).await?,
        completed_events: store.count_contacts(Some(ContactStatus::Completed)).await?,
        total_gallery_images: store.count_images().await?,
        contacts_by_status: group_counts(store.count_contacts_by_status().await?),
        contacts_by_event_type: group_counts(store.count_contacts_by_event_type().await?),
        images_by_category: group_counts(store.count_images_by_category().await?),
        contacts_over_time: fill_months(first_month, TREND_MONTHS, &monthly),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::MemoryStore;
    use crate::services::contacts::{self, ContactSubmission, ContactUpdate};

    #[test]
    fn test_percent_change_without_baseline_is_zero() {
        assert_eq!(percent_change(0, 0), 0.0);
        assert_eq!(percent_change(42, 0), 0.0);
    }

    #[test]
    fn test_percent_change_rounds_to_one_decimal() {
        assert_eq!(percent_change(4, 3), 33.3);
        assert_eq!(percent_change(1, 4), -75.0);
        assert_eq!(percent_change(10, 10), 0.0);
    }

    #[test]
    fn test_year_month_offset_crosses_years() {
        let jan = YearMonth { year: 2025, month: 1 };
        assert_eq!(jan.offset(-6), YearMonth { year: 2024, month: 7 });
        assert_eq!(jan.offset(11), YearMonth { year: 2025, month: 12 });
        assert_eq!(jan.offset(12), YearMonth { year: 2026, month: 1 });
    }

    #[test]
    fn test_fill_months_zero_fills_gaps() {
        let first = YearMonth { year: 2024, month: 11 };
        let counts = [
            MonthCount {
                year: 2024,
                month: 12,
                count: 3,
            },
            MonthCount {
                year: 2025,
                month: 2,
                count: 1,
            },
        ];
        let buckets = fill_months(first, 7, &counts);
        let series: Vec<i64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(series, [0, 3, 0, 1, 0, 0, 0]);
        assert_eq!(buckets[6].id, YearMonth { year: 2025, month: 5 });
    }

    #[test]
    fn test_month_bucket_wire_shape() {
        let bucket = MonthBucket {
            id: YearMonth { year: 2025, month: 3 },
            count: 2,
        };
        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["_id"]["year"], 2025);
        assert_eq!(json["_id"]["month"], 3);
        assert_eq!(json["count"], 2);
    }

    async fn seed(store: &MemoryStore, created_at: DateTime<Utc>, status: Option<&str>) {
        let contact = contacts::submit(
            store,
            ContactSubmission {
                name: Some("Guest".into()),
                email: Some("guest@example.com".into()),
                message: Some("Hello".into()),
                event_type: Some("portrait".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(store.set_contact_created_at(contact.id, created_at).await);
        if let Some(status) = status {
            contacts::update_status(
                store,
                contact.id,
                ContactUpdate {
                    status: Some(status.into()),
                    notes: None,
                },
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_report_windows_and_counts() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();

        seed(&store, now - Duration::days(1), None).await;
        seed(&store, now - Duration::days(10), Some("booked")).await;
        seed(&store, now - Duration::days(40), Some("completed")).await;
        seed(&store, now - Duration::days(400), None).await;

        let report = report(&store, now).await.unwrap();
        assert_eq!(report.total_contacts, 4);
        assert_eq!(report.recent_contacts, 2);
        assert_eq!(report.previous_contacts, 1);
        assert_eq!(report.contacts_change, 100.0);
        assert_eq!(report.booked_events, 1);
        assert_eq!(report.completed_events, 1);
        assert_eq!(report.total_gallery_images, 0);

        let by_status: i64 = report.contacts_by_status.iter().map(|g| g.count).sum();
        assert_eq!(by_status, 4);
        assert!(report
            .contacts_by_status
            .iter()
            .any(|g| g.id == ContactStatus::New.as_str() && g.count == 2));
        assert_eq!(report.contacts_by_event_type.len(), 1);
        assert_eq!(report.contacts_by_event_type[0].count, 4);

        assert_eq!(report.contacts_over_time.len(), 7);
        assert_eq!(
            report.contacts_over_time[0].id,
            YearMonth { year: 2024, month: 9 }
        );
        let trend: i64 = report.contacts_over_time.iter().map(|b| b.count).sum();
        assert_eq!(trend, 3);
    }

    #[tokio::test]
    async fn test_report_on_empty_store() {
        let store = MemoryStore::new();
        let report = report(&store, Utc::now()).await.unwrap();
        assert_eq!(report.contacts_change, 0.0);
        assert!(report.contacts_over_time.iter().all(|b| b.count == 0));
    }
}
