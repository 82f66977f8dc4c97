use serde::Serialize;

/// 同期1回分の結果集計
///
/// insertedとupdatedは同期前に存在したキー集合との突き合わせで分類する
/// skippedは必須フィールド欠落などで取り込み対象外になった件数
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub platform: String,
    pub success: bool,
    pub inserted: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub total: u32,
    pub message: Option<String>,
}

impl SyncReport {
    pub fn new(platform: impl ToString) -> Self {
        Self {
            platform: platform.to_string(),
            success: false,
            inserted: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            total: 0,
            message: None,
        }
    }

    pub fn failure(platform: impl ToString, message: impl ToString) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::new(platform)
        }
    }
}
