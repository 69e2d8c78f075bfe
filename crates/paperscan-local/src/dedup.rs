use paperscan_core::{MatchMethod, Mention, MethodCounts, RawMention};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::textprep;

/// Identity of a mention within a work: its context with case, punctuation and whitespace
/// normalized away.
pub fn identity_key(context: &str) -> String {
    textprep::scrub(context)
}

/// Whether `a` should replace `b` as the representative of a group.
///
/// Stronger method wins; within a method the earliest span wins, so the result does not depend
/// on input order.
fn preferred(a: &RawMention, b: &RawMention) -> bool {
    let by_priority = a.method.priority().cmp(&b.method.priority());
    let by_position = b
        .start
        .cmp(&a.start)
        .then_with(|| b.end.cmp(&a.end))
        .then_with(|| b.term.cmp(&a.term))
        .then_with(|| b.context.cmp(&a.context));
    by_priority.then(by_position) == Ordering::Greater
}

/// Collapse mentions sharing `(work_id, identity_key(context))` to one, keeping the strongest
/// method. Output is ordered by work, then span.
pub fn dedup_mentions(raw: Vec<RawMention>) -> Vec<Mention> {
    let mut groups: BTreeMap<(String, String), RawMention> = BTreeMap::new();
    for m in raw {
        let key = (m.work_id.clone(), identity_key(&m.context));
        match groups.get_mut(&key) {
            Some(cur) => {
                if preferred(&m, cur) {
                    *cur = m;
                }
            }
            None => {
                groups.insert(key, m);
            }
        }
    }
    let mut out: Vec<Mention> = groups.into_values().map(Mention::from).collect();
    out.sort_by(|a, b| {
        a.work_id
            .cmp(&b.work_id)
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.end.cmp(&b.end))
            .then_with(|| a.context.cmp(&b.context))
    });
    out
}

/// `dedup_mentions` plus per-method counts before and after.
pub fn dedup_with_counts(raw: Vec<RawMention>) -> (Vec<Mention>, MethodCounts, MethodCounts) {
    let before: MethodCounts = raw.iter().map(|m| &m.method).collect();
    let kept = dedup_mentions(raw);
    let after: MethodCounts = kept.iter().map(|m| &m.method).collect();
    (kept, before, after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(method: MatchMethod, start: usize, context: &str) -> RawMention {
        RawMention {
            work_id: "W1".to_string(),
            term: "census data".to_string(),
            method,
            start,
            end: start + 11,
            score: match method {
                MatchMethod::Exact => 1.0,
                MatchMethod::FuzzyStrong => 0.9,
                MatchMethod::FuzzyWeak => 0.8,
            },
            context: context.to_string(),
        }
    }

    #[test]
    fn exact_wins_over_fuzzy_for_same_context() {
        let input = vec![
            raw(MatchMethod::FuzzyWeak, 10, "We used census data here."),
            raw(MatchMethod::FuzzyStrong, 10, "we used  CENSUS data here"),
            raw(MatchMethod::Exact, 10, "We used census data, here!"),
        ];
        let out = dedup_mentions(input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].method, MatchMethod::Exact);
        assert_eq!(out[0].context, "We used census data, here!");
    }

    #[test]
    fn strong_wins_over_weak_and_distinct_contexts_survive() {
        let input = vec![
            raw(MatchMethod::FuzzyWeak, 5, "first sentence about census"),
            raw(MatchMethod::FuzzyStrong, 5, "first sentence about census"),
            raw(MatchMethod::FuzzyWeak, 90, "second sentence about census"),
        ];
        let out = dedup_mentions(input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].method, MatchMethod::FuzzyStrong);
        assert_eq!(out[1].method, MatchMethod::FuzzyWeak);
        assert!(out[0].start < out[1].start);
    }

    #[test]
    fn same_context_in_different_works_is_not_merged() {
        let mut other = raw(MatchMethod::FuzzyWeak, 0, "shared context text");
        other.work_id = "W2".to_string();
        let out = dedup_mentions(vec![raw(MatchMethod::Exact, 0, "shared context text"), other]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn counts_report_before_and_after() {
        let (kept, before, after) = dedup_with_counts(vec![
            raw(MatchMethod::Exact, 0, "a b c"),
            raw(MatchMethod::FuzzyStrong, 0, "a b c"),
            raw(MatchMethod::FuzzyWeak, 40, "d e f"),
        ]);
        assert_eq!(kept.len(), 2);
        assert_eq!(before.total(), 3);
        assert_eq!(after.exact, 1);
        assert_eq!(after.fuzzy_strong, 0);
        assert_eq!(after.fuzzy_weak, 1);
    }

    fn arb_method() -> impl Strategy<Value = MatchMethod> {
        prop_oneof![
            Just(MatchMethod::Exact),
            Just(MatchMethod::FuzzyStrong),
            Just(MatchMethod::FuzzyWeak),
        ]
    }

    fn arb_raw() -> impl Strategy<Value = RawMention> {
        (
            arb_method(),
            0usize..50,
            prop::sample::select(vec!["alpha beta", "Alpha, beta", "gamma", "GAMMA!", "delta x"]),
            prop::sample::select(vec!["W1", "W2"]),
        )
            .prop_map(|(method, start, ctx, work)| {
                let mut m = raw(method, start, ctx);
                m.work_id = work.to_string();
                m
            })
    }

    proptest! {
        #[test]
        fn exact_is_never_dropped(input in prop::collection::vec(arb_raw(), 0..40)) {
            let out = dedup_mentions(input.clone());
            for m in &input {
                if m.method == MatchMethod::Exact {
                    let key = identity_key(&m.context);
                    let kept = out
                        .iter()
                        .find(|k| k.work_id == m.work_id && identity_key(&k.context) == key)
                        .expect("group must survive");
                    prop_assert_eq!(kept.method, MatchMethod::Exact);
                }
            }
        }

        #[test]
        fn keys_are_unique_per_work(input in prop::collection::vec(arb_raw(), 0..40)) {
            let out = dedup_mentions(input);
            let mut seen = std::collections::BTreeSet::new();
            for m in &out {
                prop_assert!(seen.insert((m.work_id.clone(), identity_key(&m.context))));
            }
        }

        #[test]
        fn dedup_is_idempotent(input in prop::collection::vec(arb_raw(), 0..40)) {
            let once = dedup_mentions(input);
            let twice = dedup_mentions(once.iter().cloned().map(RawMention::from).collect());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn dedup_is_order_independent(input in prop::collection::vec(arb_raw(), 0..40)) {
            let mut reversed = input.clone();
            reversed.reverse();
            prop_assert_eq!(dedup_mentions(input), dedup_mentions(reversed));
        }
    }
}
