use crate::{modules::report::SyncReport, types::platform::Platform};
use cp_tracker_libs::{
    clist::client::{fetch_all_problems, ClistApi, FetchPolicy},
    clist::model::ClistProblem,
    codeforces::client::CodeforcesApi,
    codeforces::model::CodeforcesProblem,
};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use std::collections::HashSet;
use tokio::time;

/// 取り込み用に整形した問題レコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProblem {
    pub problem_id: String,
    pub platform: String,
    pub title: String,
    pub url: String,
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
}

impl NewProblem {
    /// clist.byの生レコードから内部形式を組み立てるメソッド
    ///
    /// key, name, urlのいずれかが欠けたレコードはNoneを返して取り込み対象外にする
    pub fn from_clist(platform: Platform, raw: &ClistProblem) -> Option<NewProblem> {
        let problem_id = raw.key.as_deref()?.trim();
        let title = raw.name.as_deref()?.trim();
        let url = raw.url.as_deref()?.trim();
        if problem_id.is_empty() || title.is_empty() || url.is_empty() {
            return None;
        }

        Some(NewProblem {
            problem_id: problem_id.to_string(),
            platform: platform.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            difficulty: raw.rating.map(|rating| rating.to_string()),
            tags: raw.tags.clone(),
        })
    }

    /// Codeforces公式APIの生レコードから内部形式を組み立てるメソッド
    ///
    /// problem_idはコンテストIDと問題インデックスの連結("1840A"のような形)
    pub fn from_codeforces(raw: &CodeforcesProblem) -> Option<NewProblem> {
        let contest_id = raw.contest_id?;
        let index = raw.index.as_deref()?.trim();
        let name = raw.name.as_deref()?.trim();
        if index.is_empty() || name.is_empty() {
            return None;
        }

        // gym以外の通常コンテストはproblemset配下のURLになる
        let url = if contest_id < 10000 {
            format!(
                "https://codeforces.com/problemset/problem/{}/{}",
                contest_id, index
            )
        } else {
            format!("https://codeforces.com/problem/{}/{}", contest_id, index)
        };

        Some(NewProblem {
            problem_id: format!("{}{}", contest_id, index),
            platform: Platform::Codeforces.to_string(),
            title: name.to_string(),
            url,
            difficulty: raw.rating.map(|rating| rating.to_string()),
            tags: raw.tags.clone(),
        })
    }
}

pub struct ProblemSyncer<'a> {
    pool: &'a Pool<Postgres>,
    policy: FetchPolicy,
}

impl<'a> ProblemSyncer<'a> {
    pub fn new(pool: &'a Pool<Postgres>, policy: FetchPolicy) -> Self {
        ProblemSyncer { pool, policy }
    }

    /// 同期前に存在している問題キーの集合を取得するメソッド
    ///
    /// upsert後にinserted/updatedを分類するために使う
    async fn existing_keys(&self, platform: &str) -> sqlx::Result<HashSet<String>> {
        let keys = sqlx::query(
            r#"
            SELECT "problem_id" FROM "problems" WHERE "platform" = $1;
            "#,
        )
        .bind(platform)
        .map(|row: PgRow| row.get(0))
        .fetch_all(self.pool)
        .await?;

        Ok(HashSet::from_iter(keys))
    }

    /// 1問題をupsertするメソッド
    ///
    /// キーが既にあれば可変フィールド(title, url, difficulty, tags)を上書きする
    async fn upsert(&self, record: &NewProblem) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO "problems" ("problem_id", "platform", "title", "url", "difficulty", "tags")
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ("platform", "problem_id")
            DO UPDATE SET
                "title" = EXCLUDED."title",
                "url" = EXCLUDED."url",
                "difficulty" = EXCLUDED."difficulty",
                "tags" = EXCLUDED."tags",
                "updated_at" = CURRENT_TIMESTAMP;
            "#,
        )
        .bind(&record.problem_id)
        .bind(&record.platform)
        .bind(&record.title)
        .bind(&record.url)
        .bind(&record.difficulty)
        .bind(&record.tags)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// 整形済みレコード列を1件ずつupsertして件数を集計するメソッド
    ///
    /// 1件の書き込み失敗は記録して次のレコードへ進む。同期全体は止めない
    async fn save(
        &self,
        records: impl Iterator<Item = Option<NewProblem>>,
        existing: &HashSet<String>,
        report: &mut SyncReport,
    ) {
        for record in records {
            report.total += 1;
            let record = match record {
                Some(record) => record,
                None => {
                    report.skipped += 1;
                    continue;
                }
            };

            match self.upsert(&record).await {
                Ok(_) => {
                    if existing.contains(&record.problem_id) {
                        report.updated += 1;
                    } else {
                        report.inserted += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "an error occurred at saving {}-{}: {}",
                        record.platform,
                        record.problem_id,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
    }

    /// clist.by経由で1プラットフォーム分の問題を同期するメソッド
    pub async fn sync_platform(
        &self,
        api: &(impl ClistApi + ?Sized),
        platform: Platform,
    ) -> SyncReport {
        let name = platform.to_string();
        let resource_id = match platform.resource_id() {
            Some(resource_id) => resource_id,
            None => {
                return SyncReport::failure(&name, format!("no clist resource id for {}", name))
            }
        };

        tracing::info!("Start to sync problems for {} (resource {})", name, resource_id);
        let raw = match fetch_all_problems(api, resource_id, &self.policy).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("failed to fetch problems for {}: {}", name, e);
                return SyncReport::failure(&name, e.to_string());
            }
        };

        let existing = match self.existing_keys(&name).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::error!("failed to load existing problem keys for {}: {}", name, e);
                return SyncReport::failure(&name, e.to_string());
            }
        };

        let mut report = SyncReport::new(&name);
        self.save(
            raw.iter().map(|raw| NewProblem::from_clist(platform, raw)),
            &existing,
            &mut report,
        )
        .await;
        report.success = true;

        tracing::info!(
            "{} sync complete: {} new, {} updated, {} skipped, {} failed, {} total",
            name,
            report.inserted,
            report.updated,
            report.skipped,
            report.failed,
            report.total
        );

        report
    }

    /// Codeforces公式APIから問題カタログ全体を同期するメソッド
    pub async fn sync_codeforces(&self, api: &(impl CodeforcesApi + ?Sized)) -> SyncReport {
        let name = Platform::Codeforces.to_string();

        tracing::info!("Start to sync problems from the Codeforces API");
        let raw = match api.fetch_problemset().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("failed to fetch the Codeforces problemset: {}", e);
                return SyncReport::failure(&name, e.to_string());
            }
        };

        let existing = match self.existing_keys(&name).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::error!("failed to load existing problem keys for {}: {}", name, e);
                return SyncReport::failure(&name, e.to_string());
            }
        };

        let mut report = SyncReport::new(&name);
        self.save(
            raw.iter().map(NewProblem::from_codeforces),
            &existing,
            &mut report,
        )
        .await;
        report.success = true;

        tracing::info!(
            "{} sync complete: {} new, {} updated, {} skipped, {} failed, {} total",
            name,
            report.inserted,
            report.updated,
            report.skipped,
            report.failed,
            report.total
        );

        report
    }

    /// 全プラットフォームを順番に同期するメソッド
    ///
    /// Codeforcesのみ公式APIを使い、残りはclist.by経由で取得する
    /// レートリミットを守るため並列化せず、プラットフォーム間でも待機を入れる
    pub async fn sync_all(
        &self,
        clist: &(impl ClistApi + ?Sized),
        codeforces: &(impl CodeforcesApi + ?Sized),
    ) -> Vec<SyncReport> {
        let mut reports = vec![self.sync_codeforces(codeforces).await];

        for platform in Platform::syncable() {
            if platform == Platform::Codeforces {
                continue;
            }
            time::sleep(self.policy.interval).await;
            reports.push(self.sync_platform(clist, platform).await);
        }

        reports
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn clist_problem(key: Option<&str>, name: Option<&str>, url: Option<&str>) -> ClistProblem {
        ClistProblem {
            id: 1,
            key: key.map(String::from),
            name: name.map(String::from),
            url: url.map(String::from),
            rating: Some(1400),
            tags: vec![String::from("dp")],
        }
    }

    #[test]
    fn clist_record_is_built_from_complete_input() {
        let raw = clist_problem(Some("abc300_a"), Some("N-choice question"), Some("https://atcoder.jp/contests/abc300/tasks/abc300_a"));
        let record = NewProblem::from_clist(Platform::AtCoder, &raw).unwrap();

        assert_eq!(record.problem_id, "abc300_a");
        assert_eq!(record.platform, "AtCoder");
        assert_eq!(record.difficulty.as_deref(), Some("1400"));
        assert_eq!(record.tags, vec![String::from("dp")]);
    }

    #[test]
    fn clist_record_missing_required_field_is_skipped() {
        assert!(NewProblem::from_clist(
            Platform::AtCoder,
            &clist_problem(None, Some("name"), Some("url"))
        )
        .is_none());
        assert!(NewProblem::from_clist(
            Platform::AtCoder,
            &clist_problem(Some("key"), None, Some("url"))
        )
        .is_none());
        assert!(NewProblem::from_clist(
            Platform::AtCoder,
            &clist_problem(Some("key"), Some("name"), Some("  "))
        )
        .is_none());
    }

    #[test]
    fn codeforces_record_concatenates_contest_and_index() {
        let raw = CodeforcesProblem {
            contest_id: Some(1840),
            index: Some(String::from("A")),
            name: Some(String::from("Cipher")),
            rating: Some(800),
            tags: vec![String::from("implementation")],
        };
        let record = NewProblem::from_codeforces(&raw).unwrap();

        assert_eq!(record.problem_id, "1840A");
        assert_eq!(record.platform, "Codeforces");
        assert_eq!(
            record.url,
            "https://codeforces.com/problemset/problem/1840/A"
        );
        assert_eq!(record.difficulty.as_deref(), Some("800"));
    }

    #[test]
    fn codeforces_gym_url_uses_plain_problem_path() {
        let raw = CodeforcesProblem {
            contest_id: Some(102500),
            index: Some(String::from("B")),
            name: Some(String::from("Gym task")),
            rating: None,
            tags: Vec::new(),
        };
        let record = NewProblem::from_codeforces(&raw).unwrap();

        assert_eq!(record.url, "https://codeforces.com/problem/102500/B");
        assert!(record.difficulty.is_none());
    }

    #[test]
    fn codeforces_record_missing_contest_id_is_skipped() {
        let raw = CodeforcesProblem {
            contest_id: None,
            index: Some(String::from("A")),
            name: Some(String::from("Orphan")),
            rating: None,
            tags: Vec::new(),
        };
        assert!(NewProblem::from_codeforces(&raw).is_none());
    }
}
