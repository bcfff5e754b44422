use crate::domain::model::{SortRequest, SortResult};
use crate::utils::error::{BenchError, Result};
use chrono::Utc;

/// CPU burn: sort a fully reversed sequence with an O(n²) exchange sort.
#[derive(Debug, Clone)]
pub struct SortBenchmark {
    max_n: i64,
}

impl SortBenchmark {
    pub fn new(max_n: i64) -> Self {
        Self { max_n }
    }

    pub fn request(&self, n: i64) -> Result<SortRequest> {
        if n > self.max_n {
            return Err(BenchError::invalid_input(
                "n",
                n,
                format!("must not exceed {}", self.max_n),
            ));
        }
        Ok(SortRequest { n })
    }

    pub fn run(&self, request: SortRequest) -> SortResult {
        let start = Utc::now();
        let mut values = descending(request.n);
        bubble_sort(&mut values);
        let end = Utc::now();

        tracing::debug!(n = request.n, "bubble sort finished");
        SortResult { start, end }
    }
}

/// `[n, n-1, ..., 1]`, empty for `n <= 0`.
pub fn descending(n: i64) -> Vec<i64> {
    (1..=n.max(0)).rev().collect()
}

pub fn bubble_sort<T: PartialOrd>(values: &mut [T]) {
    for i in (1..=values.len()).rev() {
        for j in 1..i {
            if values[j] < values[j - 1] {
                values.swap(j, j - 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_sequence() {
        assert_eq!(descending(4), vec![4, 3, 2, 1]);
        assert!(descending(0).is_empty());
        assert!(descending(-7).is_empty());
    }

    #[test]
    fn test_bubble_sort_produces_sorted_permutation() {
        for n in [0, 1, 2, 3, 10, 257] {
            let mut values = descending(n);
            bubble_sort(&mut values);

            let expected: Vec<i64> = (1..=n).collect();
            assert_eq!(values, expected, "n = {}", n);
        }
    }

    #[test]
    fn test_bubble_sort_mixed_input() {
        let mut values = vec![5, 1, 4, 1, 9, 2, 6];
        bubble_sort(&mut values);
        assert_eq!(values, vec![1, 1, 2, 4, 5, 6, 9]);
    }

    #[test]
    fn test_run_timestamps_are_ordered() {
        let bench = SortBenchmark::new(10_000);
        for n in [-3, 0, 1, 500] {
            let result = bench.run(bench.request(n).unwrap());
            assert!(result.start <= result.end);
        }
    }

    #[test]
    fn test_request_above_limit_is_rejected() {
        let bench = SortBenchmark::new(100);
        assert!(bench.request(100).is_ok());
        assert!(matches!(
            bench.request(101),
            Err(BenchError::InvalidInputError { .. })
        ));
    }
}
