#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        thread,
    };

    use proptest::prelude::*;
    use rand::{distributions::Alphanumeric, rngs::StdRng, Rng, SeedableRng};
    use tulle::{FilterError, IntersectionFilter, PairFilter};

    const SIZE_X: usize = 500;
    const SIZE_Y: usize = 300;
    const USAGE: u8 = 25;

    fn filter() -> IntersectionFilter {
        IntersectionFilter::new(SIZE_X, SIZE_Y, USAGE).expect("couldn't construct filter.")
    }

    fn random_value(rng: &mut StdRng) -> String {
        rng.sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect()
    }

    #[test]
    fn test_count_at_construction() {
        assert_eq!(0, filter().count());
    }

    #[test]
    fn test_constructor_parameter_validation() {
        for result in [
            IntersectionFilter::new(0, 1, 50),
            IntersectionFilter::new(1, 0, 50),
            IntersectionFilter::new(SIZE_X, SIZE_Y, 101),
            IntersectionFilter::new(SIZE_X, SIZE_Y, u8::MAX),
        ] {
            match result {
                Err(err @ FilterError::InvalidParameter { .. }) => {
                    assert!(err.is_configuration());
                    assert!(err.to_string().starts_with("invalid parameters"));
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_pairs_are_rejected() {
        let mut filter = filter();

        assert!(!filter.add(None, "valY").unwrap());
        assert!(!filter.add("valX", None).unwrap());
        assert!(!filter.add("", "valY").unwrap());
        assert!(!filter.add("valX", "").unwrap());
        assert_eq!(0, filter.count());

        assert!(!filter.exists(None, "valY"));
        assert!(!filter.delete("valX", ""));
    }

    #[test]
    fn test_add() {
        let mut filter = filter();
        let expected_count = filter.count() + 1;

        assert!(filter.add("valX_add1", "valY_add1").unwrap());
        assert!(filter.exists("valX_add1", "valY_add1"));
        assert_eq!(expected_count, filter.count());
    }

    #[test]
    fn test_delete() {
        let mut filter = filter();
        let expected_count = filter.count();

        assert!(filter.add("valX_del1", "valY_del1").unwrap());
        assert!(filter.delete("valX_del1", "valY_del1"));
        assert!(!filter.exists("valX_del1", "valY_del1"));
        assert_eq!(expected_count, filter.count());

        // Already gone
        assert!(!filter.delete("valX_del1", "valY_del1"));
        assert_eq!(expected_count, filter.count());
    }

    #[test]
    fn test_delete_missing_pair() {
        let mut filter = filter();
        filter.add("valX_del2", "valY_del2").unwrap();

        assert!(!filter.delete("Non-exist", "Non-exist"));
        assert_eq!(1, filter.count());
        assert!(filter.exists("valX_del2", "valY_del2"));
    }

    #[test]
    fn test_exists_negative() {
        assert!(!filter().exists("Non-exist", "Non-exist"));
    }

    #[test]
    fn test_count() {
        let mut filter = filter();
        assert!(filter.reset());

        let pairs = [
            ("X-cnt1", "Y-cnt1"),
            ("X-cnt1", "Y-cnt2"),
            ("X-cnt2", "Y-cnt1"),
            ("X-cnt2", "Y-cnt2"),
        ];
        for (x, y) in pairs {
            assert!(filter.add(x, y).unwrap());
        }

        assert_eq!(4, filter.count());
        for (x, y) in pairs {
            assert!(filter.exists(x, y));
        }
    }

    #[test]
    fn test_reset() {
        let mut filter = filter();
        let pairs = [("X-rst1", "Y-rst1"), ("X-rst2", "Y-rst2")];
        for (x, y) in pairs {
            filter.add(x, y).unwrap();
        }

        assert!(filter.reset());
        assert_eq!(0, filter.count());
        for (x, y) in pairs {
            assert!(!filter.exists(x, y));
        }

        // The cleared filter behaves like a fresh one
        assert!(filter.add("X-rst1", "Y-rst1").unwrap());
        assert!(filter.delete("X-rst1", "Y-rst1"));
        assert!(!filter.exists("X-rst1", "Y-rst1"));
    }

    #[test]
    fn test_count_large() {
        let mut filter = filter();
        let size_x = SIZE_X * USAGE as usize / 100;

        for x in 0..size_x {
            let x_str = format!("foo_{x}");
            for y in 0..SIZE_Y {
                let y_str = format!("barr_{y}");
                assert!(filter.add(x_str.as_str(), y_str.as_str()).unwrap());
            }
        }

        assert!(filter.count() >= size_x * SIZE_Y);
        assert_eq!(1.0, filter.load_factor());
        assert!(filter.exists("foo_0", "barr_0"));
        assert!(filter.exists("foo_124", "barr_299"));

        let false_positive = filter.exists("abcdef", "123xyz")
            || filter.exists("abcdef", "98$")
            || filter.exists("fred_flintstone", "xxx")
            || filter.exists("00F45Ac3ee", "12bBaa6A95");
        assert!(!false_positive, "This is a false positive");
    }

    #[test]
    fn test_no_false_negatives_until_deleted() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut filter = filter();
        let pairs: Vec<(String, String)> = (0..2_000)
            .map(|_| (random_value(&mut rng), random_value(&mut rng)))
            .collect();

        for (x, y) in &pairs {
            filter.add(x.as_str(), y.as_str()).unwrap();
        }
        assert_eq!(pairs.len(), filter.count());
        assert!(pairs.iter().all(|(x, y)| filter.exists(x.as_str(), y.as_str())));

        for (x, y) in pairs.iter().rev() {
            assert!(filter.delete(x.as_str(), y.as_str()));
        }
        assert_eq!(0, filter.count());
        assert!(pairs.iter().all(|(x, y)| !filter.exists(x.as_str(), y.as_str())));
    }

    #[test]
    fn test_separator_collision() {
        let mut filter = filter();
        filter.add("a+b", "c").unwrap();

        assert!(filter.exists("a", "b+c"));
        assert!(filter.delete("a", "b+c"));
        assert!(!filter.exists("a+b", "c"));
    }

    #[test]
    fn test_shared_behind_mutex() {
        let filter = Arc::new(Mutex::new(filter()));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let filter = Arc::clone(&filter);
                thread::spawn(move || {
                    for i in 0..100 {
                        let y = format!("Y-{i}");
                        let mut filter = filter.lock().unwrap();
                        filter.add(format!("X-{t}").as_str(), y.as_str()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let filter = filter.lock().unwrap();
        assert_eq!(400, filter.count());
        assert!(filter.exists("X-3", "Y-99"));
    }

    proptest! {
        #[test]
        fn prop_add_then_delete(x in "[a-zA-Z0-9_]{1,24}", y in "[a-zA-Z0-9_]{1,24}") {
            let mut filter = filter();

            prop_assert!(filter.add(x.as_str(), y.as_str()).unwrap());
            prop_assert!(filter.exists(x.as_str(), y.as_str()));
            prop_assert_eq!(1, filter.count());

            prop_assert!(filter.delete(x.as_str(), y.as_str()));
            prop_assert!(!filter.exists(x.as_str(), y.as_str()));
            prop_assert_eq!(0, filter.count());
        }
    }
}
