//! Mirrors `original_source/tests/session.c`: session creation/destruction, id uniqueness,
//! metadata_set boundary behavior, and terminate_reset on a session with no data fed to it.

use opentracedecode::error::Error;
use opentracedecode::session::{MetadataKey, Session};
use opentracedecode::value::Value;

#[test]
fn session_new_and_destroy() {
    let s = Session::new();
    assert!(s.destroy().is_ok());
}

#[test]
fn multiple_sessions_have_distinct_ids_and_destroy_independently() {
    let s1 = Session::new();
    let s2 = Session::new();
    let s3 = Session::new();

    assert_ne!(s1.id(), s2.id());
    assert_ne!(s1.id(), s3.id());
    assert_ne!(s2.id(), s3.id());

    assert!(s1.destroy().is_ok());
    assert!(s2.destroy().is_ok());
    assert!(s3.destroy().is_ok());
}

#[test]
fn destroy_is_idempotent_the_rust_analogue_of_null_session_destroy() {
    let s = Session::new();
    assert!(s.destroy().is_ok());
    assert!(s.destroy().is_ok());
}

#[test]
fn metadata_set_accepts_a_thousand_samplerates_and_the_max_value() {
    let s = Session::new();
    for i in 0..1000u64 {
        assert!(s.metadata_set(MetadataKey::SampleRate, Value::U64(i)).is_ok());
    }
    assert!(s.metadata_set(MetadataKey::SampleRate, Value::U64(u64::MAX)).is_ok());
    assert_eq!(s.metadata_get(MetadataKey::SampleRate), Some(Value::U64(u64::MAX)));
}

#[test]
fn metadata_set_rejects_wrong_kind_and_unknown_keys() {
    let s = Session::new();

    let err = s.metadata_set(MetadataKey::SampleRate, Value::String(String::new())).unwrap_err();
    assert!(matches!(err, Error::Arg { .. }));
    let err = s.metadata_set(MetadataKey::SampleRate, Value::String("Foo".into())).unwrap_err();
    assert!(matches!(err, Error::Arg { .. }));

    for bogus in [-1, 9, 123] {
        let err = s.metadata_set(MetadataKey::Other(bogus), Value::U64(0)).unwrap_err();
        assert!(matches!(err, Error::Arg { .. }));
    }
}

#[test]
fn terminate_reset_is_fine_before_start_after_start_and_after_metadata_set() {
    let s = Session::new();
    assert!(s.terminate_reset().is_ok());
    assert!(s.start().is_ok());
    assert!(s.terminate_reset().is_ok());
    assert!(s.metadata_set(MetadataKey::SampleRate, Value::U64(1_000_000)).is_ok());
    assert!(s.terminate_reset().is_ok());
    assert!(s.destroy().is_ok());
}

#[test]
fn send_before_start_is_an_error() {
    use std::sync::Arc;

    let s = Session::new();
    let data: Arc<[u8]> = Arc::from(vec![0u8]);
    let buf = opentracedecode::buffer::SampleBuffer::new(0, 1, data, 1).unwrap();
    let err = s.send(buf).unwrap_err();
    assert!(matches!(err, Error::Arg { .. }));
}

#[test]
fn start_twice_is_an_error() {
    let s = Session::new();
    assert!(s.start().is_ok());
    let err = s.start().unwrap_err();
    assert!(matches!(err, Error::Arg { .. }));
}
