use rand::seq::SliceRandom;
use rand::Rng;

/// Uniform random permutation of `0..len` (Fisher–Yates).
pub fn shuffled_order<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn empty_and_single_orders() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(shuffled_order(0, &mut rng).is_empty());
        assert_eq!(shuffled_order(1, &mut rng), vec![0]);
    }

    #[test]
    fn same_seed_gives_same_order() {
        let a = shuffled_order(10, &mut StdRng::seed_from_u64(42));
        let b = shuffled_order(10, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn every_position_is_reachable() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut first_seen = [false; 4];
        for _ in 0..200 {
            first_seen[shuffled_order(4, &mut rng)[0]] = true;
        }
        assert!(first_seen.iter().all(|seen| *seen));
    }

    proptest! {
        #[test]
        fn order_is_a_permutation(len in 0usize..64, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut order = shuffled_order(len, &mut rng);
            order.sort_unstable();
            prop_assert_eq!(order, (0..len).collect::<Vec<_>>());
        }
    }
}
