// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Counter behavior under arbitrary use/feedback sequences.

use proptest::prelude::*;
use witness_config::model::SelectorConfig;
use witness_core::ConversationNode;
use witness_scripts::{ScriptCatalog, ScriptSelector};
use witness_test_utils::TestHarness;

#[derive(Debug, Clone, Copy)]
enum Event {
    Select,
    Positive,
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![Just(Event::Select), Just(Event::Positive)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn counters_match_events_and_rate_stays_bounded(events in proptest::collection::vec(event(), 0..30)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let harness = TestHarness::builder()
                .with_script(ConversationNode::Confirmation, "Can you tell us more?")
                .build()
                .await
                .unwrap();
            let catalog = ScriptCatalog::new(harness.storage.clone());
            let selector = ScriptSelector::new(
                catalog.clone(),
                &SelectorConfig { seed: Some(5), ..SelectorConfig::default() },
            );
            let id = harness.script_id(ConversationNode::Confirmation).await.unwrap();

            let (mut uses, mut positives) = (0u64, 0u64);
            for event in events {
                match event {
                    Event::Select => {
                        selector.select(ConversationNode::Confirmation).await.unwrap();
                        uses += 1;
                    }
                    Event::Positive => {
                        if catalog.record_positive(&id).await.unwrap() {
                            positives += 1;
                        }
                    }
                }
                let script = catalog.get(&id).await.unwrap();
                assert_eq!(script.use_count, uses);
                assert_eq!(script.positive_count, positives);
                assert!(script.positive_count <= script.use_count);
                assert!((0.0..=1.0).contains(&script.success_rate()));
            }
        });
    }
}
