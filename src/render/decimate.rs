/// Reduce a polyline to at most `max_points` points, keeping its envelope.
///
/// Points are split into equal buckets and each bucket contributes its
/// minimum and maximum, in their original order. Scan traces run to millions
/// of samples; this keeps clock-feedthrough spikes visible where plain
/// striding would skip them.
///
/// Input at or under the limit is returned unchanged. A limit below 2 is
/// treated as 2.
pub fn decimate(points: &[(f64, f64)], max_points: usize) -> Vec<(f64, f64)> {
    let max_points = max_points.max(2);
    if points.len() <= max_points {
        return points.to_vec();
    }

    let buckets = max_points / 2;
    let mut out = Vec::with_capacity(buckets * 2);
    for b in 0..buckets {
        let start = b * points.len() / buckets;
        let end = (b + 1) * points.len() / buckets;
        let bucket = &points[start..end];
        if bucket.is_empty() {
            continue;
        }

        let mut lo = 0;
        let mut hi = 0;
        for (i, p) in bucket.iter().enumerate() {
            // NaN compares false both ways and never displaces a finite extreme
            if p.1 < bucket[lo].1 || bucket[lo].1.is_nan() {
                lo = i;
            }
            if p.1 > bucket[hi].1 || bucket[hi].1.is_nan() {
                hi = i;
            }
        }
        match lo.cmp(&hi) {
            std::cmp::Ordering::Less => {
                out.push(bucket[lo]);
                out.push(bucket[hi]);
            }
            std::cmp::Ordering::Greater => {
                out.push(bucket[hi]);
                out.push(bucket[lo]);
            }
            std::cmp::Ordering::Equal => out.push(bucket[lo]),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_unchanged() {
        let points = vec![(0.0, 1.0), (1.0, 2.0)];
        assert_eq!(decimate(&points, 10), points);
    }

    #[test]
    fn test_keeps_spike() {
        let mut points: Vec<(f64, f64)> = (0..10_000).map(|i| (i as f64, 0.0)).collect();
        points[4321].1 = 500.0;
        points[8000].1 = -20.0;

        let out = decimate(&points, 100);
        assert!(out.len() <= 100);
        assert!(out.contains(&(4321.0, 500.0)));
        assert!(out.contains(&(8000.0, -20.0)));
        assert!(out.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_minimum_limit() {
        let points: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, i as f64)).collect();
        let out = decimate(&points, 0);
        assert_eq!(out, vec![(0.0, 0.0), (4.0, 4.0)]);
    }
}
