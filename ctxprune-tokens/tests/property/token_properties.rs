use ctxprune_core::traits::LengthTokenizer;
use ctxprune_tokens::TokenCounter;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn count_is_bounded_by_input_size(s in ".{0,200}") {
        let counter = TokenCounter::default();
        let count = counter.count(&s);
        // A BPE never emits more tokens than bytes.
        prop_assert!(count <= s.len().max(1) * 4);
    }

    #[test]
    fn cached_equals_uncached(s in ".{0,200}") {
        let counter = TokenCounter::default();
        let uncached = counter.count(&s);
        let cached = counter.count_cached(&s);
        prop_assert_eq!(uncached, cached);
    }

    #[test]
    fn subadditivity(a in ".{0,100}", b in ".{0,100}") {
        let counter = TokenCounter::default();
        let combined = format!("{}{}", a, b);
        let count_a = counter.count(&a);
        let count_b = counter.count(&b);
        let count_combined = counter.count(&combined);
        prop_assert!(
            count_combined <= count_a + count_b + 1,
            "subadditivity: {} <= {} + {} + 1",
            count_combined, count_a, count_b
        );
    }

    #[test]
    fn trait_impl_matches_inherent_count(s in ".{0,150}") {
        let counter = TokenCounter::default();
        let via_trait = LengthTokenizer::token_len(&counter, &s);
        prop_assert_eq!(via_trait, counter.count(&s));
    }
}
