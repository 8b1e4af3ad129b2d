// tests/property_variants.rs

mod common;
use crate::common::{RecordingWebhook, settle};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use gatsby_helper::builds::{BuildTrigger, BuildTriggerOptions};
use gatsby_helper::content::{ContentEntity, EntityId, VariantKind, canonical_of};
use gatsby_helper::deltas::DeltaTracker;
use gatsby_helper::dispatch::EventDispatcher;

fn variant_strategy() -> impl Strategy<Value = VariantKind> {
    prop_oneof![
        Just(VariantKind::Canonical),
        Just(VariantKind::Draft),
        Just(VariantKind::Revision),
    ]
}

// Owner chains of depth 1..=4; element 0 is the root.
fn chain_strategy() -> impl Strategy<Value = ContentEntity> {
    proptest::collection::vec(variant_strategy(), 1..=4).prop_map(|kinds| {
        let mut current: Option<ContentEntity> = None;
        for (i, kind) in kinds.into_iter().enumerate() {
            let mut entity = ContentEntity::new(i as u64 + 1, 1, format!("type_{i}"));
            entity.variant = kind;
            if kind != VariantKind::Canonical {
                entity.canonical_id = Some(EntityId(1000 + i as u64));
            }
            entity.owner = current.take().map(Arc::new);
            current = Some(entity);
        }
        current.expect("chain has at least one element")
    })
}

proptest! {
    #[test]
    fn variants_produce_no_triggers_and_no_records(entities in proptest::collection::vec(chain_strategy(), 1..20)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (fired, expected_fired, recorded, expected_recorded) = rt.block_on(async {
            let backend = RecordingWebhook::new();
            let (builds, task) = BuildTrigger::spawn(
                BuildTriggerOptions {
                    webhook_url: "https://hooks.example/build".to_string(),
                    coalesce_window: Duration::ZERO,
                },
                backend.clone(),
            );
            let dispatcher = EventDispatcher::new(DeltaTracker::in_memory(), builds, None);

            let mut expected_fired = 0;
            let mut expected_recorded = HashSet::new();
            for entity in &entities {
                let root = canonical_of(entity);
                if !root.is_variant() && !entity.is_variant() {
                    expected_fired += 2;
                    expected_recorded.insert(entity.id);
                }
                dispatcher.after_save(entity);
                dispatcher.after_delete(entity);
            }

            let recorded = dispatcher.deltas().len().unwrap();
            drop(dispatcher);
            task.await.unwrap();
            settle().await;
            (backend.count(), expected_fired, recorded, expected_recorded.len())
        });

        prop_assert_eq!(fired, expected_fired);
        prop_assert_eq!(recorded, expected_recorded);
    }
}
