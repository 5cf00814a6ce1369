use rand::Rng;

/// Picks one element with probability proportional to `weight_of(element)`.
/// Returns None when the slice is empty or every weight is zero.
pub fn weighted_pick<'a, T>(
    rng: &mut impl Rng,
    items: &'a [T],
    weight_of: impl Fn(&T) -> u32,
) -> Option<&'a T> {
    let total: u64 = items.iter().map(|i| weight_of(i) as u64).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.gen_range(0..total);
    for item in items {
        let weight = weight_of(item) as u64;
        if roll < weight {
            return Some(item);
        }
        roll -= weight;
    }
    // Unreachable when total > 0; kept for safety.
    items.last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_returns_none() {
        let items: Vec<(&str, u32)> = Vec::new();
        let picked = weighted_pick(&mut rand::thread_rng(), &items, |(_, w)| *w);
        assert!(picked.is_none());
    }

    #[test]
    fn test_all_zero_weights_returns_none() {
        let items = vec![("a", 0u32), ("b", 0)];
        let picked = weighted_pick(&mut rand::thread_rng(), &items, |(_, w)| *w);
        assert!(picked.is_none());
    }

    #[test]
    fn test_single_nonzero_weight_always_wins() {
        let items = vec![("never", 0u32), ("always", 7), ("nope", 0)];
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let picked = weighted_pick(&mut rng, &items, |(_, w)| *w);
            assert_eq!(picked.map(|(name, _)| *name), Some("always"));
        }
    }

    #[test]
    fn test_heavy_weight_dominates() {
        let items = vec![("heavy", 990u32), ("light", 10)];
        let mut rng = rand::thread_rng();
        let mut heavy = 0;
        for _ in 0..1000 {
            if let Some(("heavy", _)) = weighted_pick(&mut rng, &items, |(_, w)| *w) {
                heavy += 1;
            }
        }
        // 99% expectation; this bound fails with negligible probability.
        assert!(heavy > 900, "heavy picked only {} / 1000 times", heavy);
    }
}
