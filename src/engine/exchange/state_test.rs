use super::StreamState;

#[test]
fn terminal_and_streaming_states() {
    assert!(!StreamState::Idle.is_terminal());
    assert!(StreamState::StreamingSchema.is_streaming());
    assert!(StreamState::StreamingBatches.is_streaming());
    for state in [
        StreamState::Draining,
        StreamState::Closed,
        StreamState::Errored,
    ] {
        assert!(state.is_terminal());
        assert!(!state.is_streaming());
    }
}

#[test]
fn display_uses_kebab_names() {
    assert_eq!(StreamState::StreamingBatches.to_string(), "streaming-batches");
    assert_eq!(StreamState::Errored.to_string(), "errored");
}
