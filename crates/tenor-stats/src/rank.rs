//! Fractional ranking.

/// Ascending ranks starting at 1, with ties sharing the average of the ranks
/// they span.
///
/// `[10, 20, 20, 30]` ranks as `[1, 2.5, 2.5, 4]`. Inputs are expected to be
/// finite; `NaN` values sort last under `total_cmp` and rank among themselves.
pub fn fractional_rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let shared = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = shared;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_values() {
        assert_eq!(fractional_rank(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_ties_share_average_rank() {
        assert_eq!(
            fractional_rank(&[10.0, 20.0, 20.0, 30.0]),
            vec![1.0, 2.5, 2.5, 4.0]
        );
        assert_eq!(fractional_rank(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
        assert_eq!(
            fractional_rank(&[2.0, 1.0, 2.0, 1.0, 3.0]),
            vec![3.5, 1.5, 3.5, 1.5, 5.0]
        );
    }

    #[test]
    fn test_rank_sum_is_preserved() {
        let values = [0.4, 0.1, 0.4, 0.4, -1.0, 0.0, 0.1];
        let sum: f64 = fractional_rank(&values).iter().sum();
        let n = values.len() as f64;
        assert_eq!(sum, n * (n + 1.0) / 2.0);
    }

    #[test]
    fn test_negative_zero_ties_with_zero() {
        let ranks = fractional_rank(&[0.0, -0.0, 1.0]);
        assert_eq!(ranks[0], ranks[1]);
    }

    #[test]
    fn test_empty() {
        assert!(fractional_rank(&[]).is_empty());
    }
}
