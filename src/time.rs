use chrono::Utc;

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Timestamp for a mutation of a record created at `created_at` and last
/// touched at `previous`. Never moves backwards, even if the wall clock does.
pub fn advance_ms(created_at: i64, previous: i64) -> i64 {
    now_ms().max(previous).max(created_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_reasonable() {
        let a = now_ms();
        assert!(a > 1_500_000_000_000); // after 2017
        assert!(a < 4_100_000_000_000); // before year ~2100
    }

    #[test]
    fn advance_never_goes_backwards() {
        let future = now_ms() + 60_000;
        assert_eq!(advance_ms(0, future), future);
        assert_eq!(advance_ms(future + 1, 0), future + 1);
        assert!(advance_ms(0, 0) >= now_ms() - 1_000);
    }
}
