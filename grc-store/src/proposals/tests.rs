// SPDX-License-Identifier: MIT OR Apache-2.0

use grc_core::{DiffRecord, NewProposal, ObjectKey, PersonId, ProposalId, ProposalState};
use serde_json::json;

use crate::assert_all_stores;
use crate::proposals::ProposalStore;

fn new_proposal(object: &ObjectKey) -> NewProposal {
    let mut content = DiffRecord::default();
    content.fields.insert("title".into(), json!("New title"));

    NewProposal {
        object: object.clone(),
        author: PersonId::new(1),
        agenda: "rename".into(),
        content,
        created_at: 1_000,
    }
}

#[tokio::test]
async fn insert_and_get_proposals() {
    assert_all_stores!(|store| async {
        let control = ObjectKey::new("Control", 1);

        let proposal_1 = store.insert_proposal(new_proposal(&control)).await.unwrap();
        let proposal_2 = store.insert_proposal(new_proposal(&control)).await.unwrap();
        store
            .insert_proposal(new_proposal(&ObjectKey::new("Control", 2)))
            .await
            .unwrap();

        assert_ne!(proposal_1.id, proposal_2.id);
        assert_eq!(proposal_1.state, ProposalState::Proposed);
        assert_eq!(proposal_1.agenda, "rename");

        assert_eq!(
            store.proposal(proposal_1.id).await.unwrap(),
            Some(proposal_1.clone())
        );
        assert!(store.proposal(ProposalId::new(99)).await.unwrap().is_none());

        assert_eq!(
            store.proposals_for(&control).await.unwrap(),
            vec![proposal_1, proposal_2]
        );
    });
}

#[tokio::test]
async fn compare_and_set_state() {
    assert_all_stores!(|store| async {
        let control = ObjectKey::new("Control", 1);
        let proposal = store.insert_proposal(new_proposal(&control)).await.unwrap();

        let mut applied = proposal.clone();
        applied
            .apply(PersonId::new(2), Some("approved".into()))
            .unwrap();
        assert!(
            store
                .update_proposal(&applied, ProposalState::Proposed)
                .await
                .unwrap()
        );

        // The stored state is not "proposed" anymore.
        let mut declined = proposal.clone();
        declined.decline(PersonId::new(3), None).unwrap();
        assert!(
            !store
                .update_proposal(&declined, ProposalState::Proposed)
                .await
                .unwrap()
        );

        let stored = store.proposal(proposal.id).await.unwrap().unwrap();
        assert_eq!(stored.state, ProposalState::Applied);
        assert_eq!(stored.applied_by, Some(PersonId::new(2)));
        assert_eq!(stored.apply_reason.as_deref(), Some("approved"));
        assert_eq!(stored.declined_by, None);
        assert_eq!(stored.content, proposal.content);
    });
}
