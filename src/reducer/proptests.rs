//! Property-based tests for the reducer
//!
//! Drives `transition` and `ChatState::apply` over arbitrary record
//! sequences, the same path the store takes for every frame.

use super::event::StreamEvent;
use super::state::{ChatState, StreamingMessage};
use super::transition::{transition, TurnContext, UNATTRIBUTED};
use crate::api::{ConversationStatus, Role};
use proptest::prelude::*;

const CTX: TurnContext<'static> = TurnContext {
    conversation_id: "conv-prop",
};

fn arb_role() -> impl Strategy<Value = Role> {
    proptest::sample::select(Role::SPECIALISTS.to_vec())
}

fn arb_phase() -> impl Strategy<Value = ConversationStatus> {
    prop_oneof![
        Just(ConversationStatus::Ideation),
        Just(ConversationStatus::Refinement),
        Just(ConversationStatus::Synthesis),
        Just(ConversationStatus::Review),
        Just(ConversationStatus::Generating),
        Just(ConversationStatus::Complete),
    ]
}

fn arb_event() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![
        (proptest::option::of(arb_role()), "[A-Z]?[a-z]{0,6}")
            .prop_map(|(role, name)| StreamEvent::SpecialistStart { role, name }),
        "[a-z ]{0,12}".prop_map(|content| StreamEvent::SpecialistChunk { content }),
        (arb_role(), proptest::option::of("[A-Z][a-z]{0,6}"), "[a-z ]{0,20}").prop_map(
            |(role, name, content)| StreamEvent::SpecialistEnd {
                role: Some(role),
                name,
                content,
            }
        ),
        "[a-z ]{0,20}".prop_map(|content| StreamEvent::SpecialistEnd {
            role: None,
            name: None,
            content,
        }),
        arb_phase().prop_map(|phase| StreamEvent::PhaseChange { phase }),
        "[a-z ]{0,12}".prop_map(|content| StreamEvent::UserMessage { content }),
    ]
}

fn step(state: &mut ChatState, event: StreamEvent) {
    let result = transition(state.streaming_message.as_ref(), &CTX, event);
    state.apply(result);
}

proptest! {
    #[test]
    fn prop_each_end_finalizes_exactly_one_message(
        events in proptest::collection::vec(arb_event(), 0..40)
    ) {
        let mut state = ChatState::default();
        for event in events {
            let end_role = match &event {
                StreamEvent::SpecialistEnd { role, .. } => Some(*role),
                _ => None,
            };
            let open_role = state.streaming_message.as_ref().map(|p| p.role);
            let before = state.messages.len();
            step(&mut state, event);
            if let Some(role) = end_role {
                prop_assert_eq!(state.messages.len(), before + 1);
                prop_assert!(state.streaming_message.is_none());
                let last = state.messages.last().unwrap();
                let expected = role.or(open_role).unwrap_or(UNATTRIBUTED);
                prop_assert_eq!(last.role, expected);
                prop_assert_eq!(last.conversation_id.as_str(), "conv-prop");
            } else {
                prop_assert_eq!(state.messages.len(), before);
            }
        }
    }

    #[test]
    fn prop_preview_is_concatenation_of_chunks_since_start(
        role in arb_role(),
        chunks in proptest::collection::vec("[a-zA-Z ]{0,10}", 0..20),
    ) {
        let mut state = ChatState::default();
        step(&mut state, StreamEvent::SpecialistStart { role: Some(role), name: "N".to_string() });

        let mut expected = String::new();
        for chunk in chunks {
            let before = state.streaming_message.clone().unwrap().content;
            expected.push_str(&chunk);
            step(&mut state, StreamEvent::SpecialistChunk { content: chunk });
            let preview = state.streaming_message.clone().unwrap();
            // Content only grows
            prop_assert!(preview.content.starts_with(&before));
            prop_assert_eq!(&preview.content, &expected);
            prop_assert_eq!(preview.role, role);
        }
    }

    #[test]
    fn prop_chunk_without_preview_is_noop(
        content in "[a-z ]{0,12}",
        messages in proptest::collection::vec(arb_event(), 0..10),
    ) {
        let mut state = ChatState::default();
        for event in messages {
            step(&mut state, event);
        }
        state.streaming_message = None;

        let before = state.clone();
        step(&mut state, StreamEvent::SpecialistChunk { content });
        prop_assert_eq!(state, before);
    }

    #[test]
    fn prop_phase_never_touches_turns(
        events in proptest::collection::vec(arb_event(), 0..20),
        phase in arb_phase(),
    ) {
        let mut state = ChatState::default();
        for event in events {
            step(&mut state, event);
        }

        let before = state.clone();
        step(&mut state, StreamEvent::PhaseChange { phase });
        prop_assert_eq!(&state.messages, &before.messages);
        prop_assert_eq!(&state.streaming_message, &before.streaming_message);
        prop_assert_eq!(state.phase, Some(phase));
    }

    #[test]
    fn prop_start_replaces_preview(
        first in proptest::option::of(arb_role()),
        second in proptest::option::of(arb_role()),
        partial in "[a-z]{1,10}",
    ) {
        let mut state = ChatState::default();
        step(&mut state, StreamEvent::SpecialistStart { role: first, name: "A".to_string() });
        step(&mut state, StreamEvent::SpecialistChunk { content: partial });
        step(&mut state, StreamEvent::SpecialistStart { role: second, name: "B".to_string() });

        let expected = StreamingMessage::new(second.unwrap_or(UNATTRIBUTED), "B");
        prop_assert_eq!(state.streaming_message, Some(expected));
        prop_assert!(state.messages.is_empty());
    }

    #[test]
    fn prop_stop_streaming_is_idempotent(events in proptest::collection::vec(arb_event(), 0..20)) {
        let mut state = ChatState { is_streaming: true, ..ChatState::default() };
        for event in events {
            step(&mut state, event);
        }

        state.stop_streaming();
        let once = state.clone();
        prop_assert!(state.stop_streaming().is_empty());
        prop_assert_eq!(state, once);
    }
}
