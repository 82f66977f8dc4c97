use chrono::{DateTime, Days, Utc};

/// 2つの時刻がUTCで同じ暦日に属するかを判定する関数
pub fn is_same_utc_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

/// 解答時点でのストリークの次の値を計算する関数
///
/// 最後に解いた日が今日なら現在値を維持、昨日なら+1、それ以前なら1に戻る
/// ストリークのリセットは解答時にのみ行う。チャレンジ取得時には変更しない
pub fn next_streak(
    last_solved_at: Option<DateTime<Utc>>,
    current_streak: i32,
    now: DateTime<Utc>,
) -> i32 {
    let last = match last_solved_at {
        Some(last) => last,
        None => return 1,
    };

    let last_day = last.date_naive();
    let today = now.date_naive();
    let yesterday = today.checked_sub_days(Days::new(1));

    if last_day == today {
        current_streak
    } else if Some(last_day) == yesterday {
        current_streak + 1
    } else {
        1
    }
}

/// ILIKEパターンに埋め込む文字列のメタ文字をエスケープする関数
pub fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn consecutive_days_increment_streak() {
        // day N に解いて streak=1、day N+1 に解くと 2 になる
        let streak = next_streak(Some(at(2024, 6, 1, 20)), 1, at(2024, 6, 2, 5));
        assert_eq!(streak, 2);
    }

    #[test]
    fn skipped_day_resets_streak() {
        // day N+1 の後 day N+2 を飛ばして day N+3 に解くと 1 に戻る
        let streak = next_streak(Some(at(2024, 6, 2, 5)), 2, at(2024, 6, 4, 10));
        assert_eq!(streak, 1);
    }

    #[test]
    fn same_day_solve_keeps_streak() {
        let streak = next_streak(Some(at(2024, 6, 2, 5)), 2, at(2024, 6, 2, 23));
        assert_eq!(streak, 2);
    }

    #[test]
    fn first_solve_starts_at_one() {
        assert_eq!(next_streak(None, 0, at(2024, 6, 1, 12)), 1);
    }

    #[test]
    fn day_boundary_is_utc() {
        // 23:59 UTC と翌 00:01 UTC は別の日
        let a = Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 6, 2, 0, 1, 0).unwrap();
        assert!(!is_same_utc_day(a, b));
        assert_eq!(next_streak(Some(a), 3, b), 4);
    }

    #[test]
    fn escape_like_handles_meta_characters() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }
}
