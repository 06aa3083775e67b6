//! Property tests: arbitrary sequences of claims and status moves keep the
//! request state machine monotonic.

use craftd::domain::{CraftRequest, RequestId, RequestStatus, TransitionError, UserId};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Action {
    Accept(usize),
    Advance(usize, RequestStatus),
}

const ACTORS: [&str; 3] = ["requester", "alice", "bob"];

fn arb_status() -> impl Strategy<Value = RequestStatus> {
    prop_oneof![
        Just(RequestStatus::Pending),
        Just(RequestStatus::Accepted),
        Just(RequestStatus::InProgress),
        Just(RequestStatus::ReadyForPickup),
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0..ACTORS.len()).prop_map(Action::Accept),
        (0..ACTORS.len(), arb_status()).prop_map(|(actor, status)| Action::Advance(actor, status)),
    ]
}

proptest! {
    /// Status never moves backward, and the accepter never changes once set.
    #[test]
    fn status_is_monotonic(actions in prop::collection::vec(arb_action(), 0..40)) {
        let mut request = CraftRequest::new(
            RequestId::from("prop0001"),
            UserId::from(ACTORS[0]),
            "Oak Table",
            None,
        );
        let mut first_accepter: Option<UserId> = None;

        for action in actions {
            let before = request.clone();
            let result = match &action {
                Action::Accept(actor) => request.accept(UserId::from(ACTORS[*actor])),
                Action::Advance(actor, status) => request.advance(&UserId::from(ACTORS[*actor]), *status, None),
            };

            match result {
                Ok(()) => {
                    prop_assert!(request.status > before.status, "{:?} did not move forward", action);
                    if first_accepter.is_none() {
                        first_accepter = request.accepter.clone();
                    }
                }
                Err(_) => {
                    // Failed actions change nothing
                    prop_assert_eq!(&request, &before);
                }
            }

            prop_assert_eq!(&request.accepter, &first_accepter);
            if request.status == RequestStatus::Pending {
                prop_assert!(request.accepter.is_none());
            }
        }
    }

    /// Nothing leaves the terminal status.
    #[test]
    fn terminal_status_rejects_every_move(actor in 0..ACTORS.len(), target in arb_status()) {
        let accepter = UserId::from("alice");
        let mut request = CraftRequest::new(RequestId::from("prop0002"), UserId::from("requester"), "Chair", None);
        request.accept(accepter.clone()).unwrap();
        request.advance(&accepter, RequestStatus::ReadyForPickup, None).unwrap();

        let actor = UserId::from(ACTORS[actor]);
        let err = request.advance(&actor, target, None).unwrap_err();
        if actor == accepter {
            let is_invalid = matches!(err, TransitionError::InvalidTransition { .. });
            prop_assert!(is_invalid);
        } else {
            prop_assert_eq!(err, TransitionError::Unauthorized(actor));
        }
        prop_assert_eq!(request.status, RequestStatus::ReadyForPickup);
    }
}
