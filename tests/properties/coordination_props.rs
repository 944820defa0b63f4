use proptest::prelude::*;
use std::collections::BTreeSet;
use trellis_core::operation::ActionType;
use trellis_core::session::ProposeOperation;
use trellis_core::signing::{generate_signing_keypair, sign_message, verify_signature};
use trellis_core::{CoordError, CoordinationConfig, Coordinator, Outcome};

fn coordinator() -> Coordinator {
    let coord = Coordinator::new(CoordinationConfig::default()).unwrap();
    coord.enable();
    coord.register_agent("agent-a", "coder").unwrap();
    coord.register_agent("agent-b", "coder").unwrap();
    coord
}

fn mutating_action() -> impl Strategy<Value = ActionType> {
    prop_oneof![
        Just(ActionType::Edit),
        Just(ActionType::Create),
        Just(ActionType::Delete),
    ]
}

fn any_action() -> impl Strategy<Value = ActionType> {
    prop_oneof![Just(ActionType::Read), mutating_action()]
}

fn file_set() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-d]/[a-d]\\.rs", 1..5)
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Committed),
        Just(Outcome::Conflicted),
        Just(Outcome::Aborted),
    ]
}

proptest! {
    #[test]
    fn disjoint_files_never_reported(
        a in file_set(),
        b in file_set(),
        a_action in any_action(),
        b_action in any_action(),
    ) {
        let b: BTreeSet<String> = b.into_iter().map(|f| format!("other/{}", f)).collect();
        let coord = coordinator();
        coord.register_agent_operation(
            ProposeOperation::new("agent-b", "op-b", &b).action(b_action),
        ).unwrap();
        let report = coord.check_agent_conflicts("op-a", &a_action, &a).unwrap();
        prop_assert!(!report.contains("op-b"));
    }

    #[test]
    fn shared_file_with_mutations_reported(
        shared in "[a-z]{1,8}\\.rs",
        a_extra in file_set(),
        b_extra in file_set(),
        a_action in mutating_action(),
        b_action in mutating_action(),
    ) {
        let coord = coordinator();
        let mut a = a_extra;
        a.insert(shared.clone());
        let mut b = b_extra;
        b.insert(shared.clone());

        coord.register_agent_operation(
            ProposeOperation::new("agent-a", "op-a", &a).action(a_action),
        ).unwrap();
        let registered = coord.register_agent_operation(
            ProposeOperation::new("agent-b", "op-b", &b).action(b_action.clone()),
        ).unwrap();
        prop_assert!(registered.conflicts.contains("op-a"));

        // And from the other side: a fresh check with a's files sees b.
        let report = coord.check_agent_conflicts("op-a2", &b_action, &a).unwrap();
        prop_assert!(report.contains("op-a"));
        prop_assert!(report.contains("op-b"));
    }

    #[test]
    fn read_only_never_conflicts(files in file_set()) {
        let coord = coordinator();
        coord.register_agent_operation(
            ProposeOperation::new("agent-a", "op-a", &files).action(ActionType::Read),
        ).unwrap();
        let registered = coord.register_agent_operation(
            ProposeOperation::new("agent-b", "op-b", &files).action(ActionType::Read),
        ).unwrap();
        prop_assert!(!registered.conflicts.has_conflicts);
    }

    #[test]
    fn parents_must_precede(
        parent_choices in prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..3), 1..12),
        forward in any::<prop::sample::Index>(),
    ) {
        let coord = coordinator();
        for (i, choices) in parent_choices.iter().enumerate() {
            let parents: Vec<String> = if i == 0 {
                vec![]
            } else {
                choices.iter().map(|c| format!("op-{}", c.index(i))).collect()
            };
            coord.register_agent_operation(
                ProposeOperation::new("agent-a", format!("op-{}", i), ["f.rs"]).parents(parents),
            ).unwrap();
        }
        let n = parent_choices.len();
        for i in 0..n {
            let id = format!("op-{}", i);
            let ancestors = coord.ancestors_of(&id).unwrap();
            prop_assert!(!ancestors.contains(&id));
            for ancestor in &ancestors {
                let seq = coord.get_operation(ancestor).unwrap().sequence;
                prop_assert!(seq < coord.get_operation(&id).unwrap().sequence);
            }
        }

        // A parent that does not exist yet, or the operation itself, is refused.
        let next = format!("op-{}", n);
        let later = format!("op-{}", n + 1 + forward.index(5));
        for bad in [next.clone(), later] {
            let result = coord.register_agent_operation(
                ProposeOperation::new("agent-a", next.clone(), ["f.rs"]).parents([bad]),
            );
            prop_assert!(matches!(result, Err(CoordError::CyclicDependency { .. })), "expected CyclicDependency");
        }

        let stats = coord.get_coordination_stats().unwrap();
        prop_assert_eq!(stats.dag_vertices, stats.total_operations);
        prop_assert_eq!(stats.total_operations, n);
    }

    #[test]
    fn reputation_stays_in_unit_interval(outcomes in prop::collection::vec(outcome(), 0..40)) {
        let coord = coordinator();
        prop_assert_eq!(coord.get_agent_stats("agent-a").unwrap().reputation, 0.5);
        for (i, outcome) in outcomes.iter().enumerate() {
            let id = format!("op-{}", i);
            coord.register_agent_operation(ProposeOperation::new("agent-a", &id, ["f.rs"])).unwrap();
            let stats = coord.record_outcome("agent-a", &id, *outcome).unwrap();
            prop_assert!((0.0..=1.0).contains(&stats.reputation));
        }
        prop_assert_eq!(
            coord.get_agent_stats("agent-a").unwrap().operations_count,
            outcomes.len() as u64
        );
    }

    #[test]
    fn signatures_round_trip_and_detect_tampering(
        message in prop::collection::vec(any::<u8>(), 1..256),
        flip in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let keypair = generate_signing_keypair();
        let signature = sign_message(&message, &keypair.secret_key).unwrap();
        prop_assert!(verify_signature(&message, &signature, &keypair.public_key));

        let mut mutated = message.clone();
        let at = flip.index(mutated.len());
        mutated[at] ^= 1 << bit;
        prop_assert!(!verify_signature(&mutated, &signature, &keypair.public_key));
    }
}
