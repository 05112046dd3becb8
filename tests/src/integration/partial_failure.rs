//! # Partial Failure
//!
//! A failing option is retried with everything counted since, while the
//! options around it keep flowing. Nothing is lost or counted twice.

#[cfg(test)]
mod tests {
    use super::super::Harness;
    use pc_01_vote_counter::test_utils::ScriptedStore;
    use pc_01_vote_counter::{FlushConfig, FlushControl, OptionOutcome};
    use proptest::prelude::*;
    use shared_types::VoteOption;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failed_option_merges_forward() {
        let store = Arc::new(ScriptedStore::new());
        let mut harness = Harness::new(store.clone(), FlushConfig::default());
        harness.start_consumer();
        let driver = harness.counter.driver();
        let cats = VoteOption::from("cats");

        harness.publish(&[("cats", 3)]).await;
        harness.wait_counted(3).await;
        store.fail_option("cats");
        let report = driver.flush_now().await;
        assert!(report.is_total_failure());
        assert_eq!(harness.counter.tally().pending(&cats), 3);

        harness.publish(&[("cats", 2)]).await;
        harness.wait_counted(5).await;
        store.heal_option("cats");
        let report = driver.flush_now().await;

        assert_eq!(
            report.outcome(&cats),
            Some(&OptionOutcome::Persisted {
                count: 5,
                matched_records: 1
            })
        );
        assert_eq!(harness.counter.tally().pending(&cats), 0);
        assert_eq!(store.persisted("cats"), 5);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let store = Arc::new(ScriptedStore::new());
        let mut harness = Harness::new(store.clone(), FlushConfig::default());
        harness.start_consumer();

        harness.publish(&[("cats", 3), ("dogs", 4)]).await;
        harness.wait_counted(7).await;
        store.fail_option("cats");

        let report = harness.counter.driver().flush_now().await;

        assert_eq!(report.votes_persisted(), 4);
        assert_eq!(report.votes_deferred(), 3);
        let tally = harness.counter.tally();
        assert_eq!(tally.pending(&VoteOption::from("dogs")), 0);
        assert_eq!(tally.pending(&VoteOption::from("cats")), 3);
        assert_eq!(harness.counter.metrics().snapshot().options_failed, 1);
    }

    #[tokio::test]
    async fn test_empty_cycle_makes_no_store_call() {
        let store = Arc::new(ScriptedStore::new());
        let harness = Harness::new(store.clone(), FlushConfig::default());

        let report = harness.counter.driver().flush_now().await;

        assert!(report.is_skipped());
        assert!(store.calls().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Step {
        Vote(u8, u8),
        Flush { failing: Vec<u8> },
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            3 => (0u8..3, 1u8..5).prop_map(|(o, n)| Step::Vote(o, n)),
            1 => prop::collection::vec(0u8..3, 0..3).prop_map(|failing| Step::Flush { failing }),
        ]
    }

    const OPTIONS: [&str; 3] = ["cats", "dogs", "rabbits"];

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Whatever fails along the way, persisted + pending equals published.
        #[test]
        fn prop_no_loss_end_to_end(steps in prop::collection::vec(step(), 1..30)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let store = Arc::new(ScriptedStore::new());
                let mut harness = Harness::new(store.clone(), FlushConfig::default());
                harness.start_consumer();
                let driver = harness.counter.driver();
                let mut published = [0u64; 3];

                for step in steps {
                    match step {
                        Step::Vote(o, n) => {
                            harness.publish(&[(OPTIONS[o as usize], n as usize)]).await;
                            published[o as usize] += u64::from(n);
                            harness.wait_counted(published.iter().sum()).await;
                        }
                        Step::Flush { failing } => {
                            for option in OPTIONS {
                                store.heal_option(option);
                            }
                            for o in failing {
                                store.fail_option(OPTIONS[o as usize]);
                            }
                            driver.flush_now().await;
                        }
                    }
                }

                for (i, option) in OPTIONS.iter().enumerate() {
                    let pending = harness.counter.tally().pending(&VoteOption::from(*option));
                    assert_eq!(store.persisted(*option) + pending, published[i]);
                }
            });
        }
    }
}
