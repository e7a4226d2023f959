/// Default number of candidates returned by a ranking.
pub const DEFAULT_TOP_N: usize = 5;

/// Stable descending sort by `score`, truncated to `top_n`.
///
/// Equal scores keep their input order so results are deterministic.
/// A NaN score sorts below every real score.
pub fn select_top<T, F>(mut candidates: Vec<T>, top_n: usize, score: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    let key = |candidate: &T| {
        let value = score(candidate);
        if value.is_nan() {
            f64::NEG_INFINITY
        } else {
            value
        }
    };
    candidates.sort_by(|a, b| key(b).total_cmp(&key(a)));
    candidates.truncate(top_n);
    candidates
}
