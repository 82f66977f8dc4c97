use crate::{
    modules::report::SyncReport,
    types::platform::{Platform, CONTEST_PLATFORMS},
};
use chrono::{DateTime, TimeZone, Utc};
use cp_tracker_libs::clist::{client::ClistApi, model::ClistContest};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use std::collections::HashSet;

/// 取り込み用に整形したコンテストレコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContest {
    pub clist_id: i64,
    pub title: String,
    pub platform: String,
    pub platform_icon: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub url: String,
}

impl NewContest {
    /// clist.byの生レコードから内部形式を組み立てるメソッド
    ///
    /// 対象外プラットフォームのコンテストはNoneを返して取り込みをスキップする
    /// durationが無い場合はend - startから導出する
    pub fn from_clist(raw: &ClistContest) -> Option<NewContest> {
        let platform = Platform::normalize(&raw.resource);
        if !CONTEST_PLATFORMS.contains(&platform) {
            return None;
        }

        let start_time = Utc.from_utc_datetime(&raw.start);
        let end_time = Utc.from_utc_datetime(&raw.end);
        let duration_seconds = raw
            .duration
            .unwrap_or_else(|| (end_time - start_time).num_seconds());

        Some(NewContest {
            clist_id: raw.id,
            title: raw.event.clone(),
            platform: platform.to_string(),
            platform_icon: raw
                .icon
                .clone()
                .or_else(|| platform.icon_url().map(String::from)),
            start_time,
            end_time,
            duration_seconds,
            url: raw.href.clone(),
        })
    }
}

pub struct ContestSyncer<'a> {
    pool: &'a Pool<Postgres>,
}

impl<'a> ContestSyncer<'a> {
    pub fn new(pool: &'a Pool<Postgres>) -> Self {
        ContestSyncer { pool }
    }

    async fn existing_clist_ids(&self) -> sqlx::Result<HashSet<i64>> {
        let ids = sqlx::query(
            r#"
            SELECT "clist_id" FROM "contests" WHERE "clist_id" IS NOT NULL;
            "#,
        )
        .map(|row: PgRow| row.get(0))
        .fetch_all(self.pool)
        .await?;

        Ok(HashSet::from_iter(ids))
    }

    /// 整形済みコンテスト列を1トランザクションでまとめてupsertするメソッド
    ///
    /// clist_idをキーにして、既存行は可変フィールドをすべて上書きする
    /// last_fetched_atはこの書き込み時刻で更新される
    async fn save(&self, contests: &[NewContest]) -> sqlx::Result<()> {
        let mut tx = self.pool.begin().await?;

        for contest in contests {
            let result = sqlx::query(
                r#"
                INSERT INTO "contests" (
                    "clist_id", "title", "platform", "platform_icon", "start_time",
                    "end_time", "duration_seconds", "url", "api_source", "last_fetched_at"
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'clist.by', CURRENT_TIMESTAMP)
                ON CONFLICT ("clist_id") WHERE "clist_id" IS NOT NULL
                DO UPDATE SET
                    "title" = EXCLUDED."title",
                    "platform" = EXCLUDED."platform",
                    "platform_icon" = EXCLUDED."platform_icon",
                    "start_time" = EXCLUDED."start_time",
                    "end_time" = EXCLUDED."end_time",
                    "duration_seconds" = EXCLUDED."duration_seconds",
                    "url" = EXCLUDED."url",
                    "api_source" = EXCLUDED."api_source",
                    "last_fetched_at" = EXCLUDED."last_fetched_at",
                    "updated_at" = CURRENT_TIMESTAMP;
                "#,
            )
            .bind(contest.clist_id)
            .bind(&contest.title)
            .bind(&contest.platform)
            .bind(&contest.platform_icon)
            .bind(contest.start_time)
            .bind(contest.end_time)
            .bind(contest.duration_seconds)
            .bind(&contest.url)
            .execute(&mut tx)
            .await;

            if let Err(e) = result {
                tracing::error!("an error occurred at saving contest {}", contest.clist_id);
                tx.rollback().await?;
                return Err(e);
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// 開催予定コンテストの取得から保存までの一連の処理を行うメソッド
    pub async fn sync_upcoming(&self, api: &(impl ClistApi + ?Sized), limit: u32) -> SyncReport {
        let name = String::from("contests");

        tracing::info!("Start to sync upcoming contests from clist.by");
        let raw = match api.fetch_upcoming_contests(limit).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("failed to fetch upcoming contests: {}", e);
                return SyncReport::failure(&name, e.to_string());
            }
        };

        let existing = match self.existing_clist_ids().await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::error!("failed to load existing contest ids: {}", e);
                return SyncReport::failure(&name, e.to_string());
            }
        };

        let mut report = SyncReport::new(&name);
        report.total = raw.len() as u32;

        let mut contests: Vec<NewContest> = Vec::with_capacity(raw.len());
        for raw_contest in raw.iter() {
            match NewContest::from_clist(raw_contest) {
                Some(contest) => contests.push(contest),
                None => {
                    tracing::warn!(
                        "skipping contest {} ({}): platform {} is not tracked",
                        raw_contest.id,
                        raw_contest.event,
                        raw_contest.resource
                    );
                    report.skipped += 1;
                }
            }
        }

        if let Err(e) = self.save(&contests).await {
            return SyncReport::failure(&name, e.to_string());
        }

        for contest in contests.iter() {
            if existing.contains(&contest.clist_id) {
                report.updated += 1;
            } else {
                report.inserted += 1;
            }
        }
        report.success = true;

        tracing::info!(
            "contest sync complete: {} new, {} updated, {} skipped, {} total",
            report.inserted,
            report.updated,
            report.skipped,
            report.total
        );

        report
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn clist_contest(resource: &str, duration: Option<i64>) -> ClistContest {
        ClistContest {
            id: 7,
            event: String::from("Weekly Contest"),
            href: String::from("https://example.com/contest/7"),
            resource: String::from(resource),
            icon: None,
            start: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            duration,
        }
    }

    #[test]
    fn missing_duration_is_derived_from_start_and_end() {
        let contest = NewContest::from_clist(&clist_contest("codeforces.com", None)).unwrap();
        assert_eq!(contest.duration_seconds, 9000);
        assert_eq!(
            contest.duration_seconds,
            (contest.end_time - contest.start_time).num_seconds()
        );
    }

    #[test]
    fn explicit_duration_is_kept() {
        let contest = NewContest::from_clist(&clist_contest("codeforces.com", Some(7200))).unwrap();
        assert_eq!(contest.duration_seconds, 7200);
    }

    #[test]
    fn platform_is_normalized_from_resource_domain() {
        let contest = NewContest::from_clist(&clist_contest("leetcode.com", Some(5400))).unwrap();
        assert_eq!(contest.platform, "LeetCode");
    }

    #[test]
    fn untracked_platform_is_skipped() {
        assert!(NewContest::from_clist(&clist_contest("topcoder.com", None)).is_none());
        assert!(NewContest::from_clist(&clist_contest("unknown.example", None)).is_none());
    }

    #[test]
    fn fallback_icon_is_applied_when_api_gives_none() {
        let contest = NewContest::from_clist(&clist_contest("codeforces.com", None)).unwrap();
        assert_eq!(
            contest.platform_icon.as_deref(),
            Some("https://codeforces.org/favicon.ico")
        );
    }
}
