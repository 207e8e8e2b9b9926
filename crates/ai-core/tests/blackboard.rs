use ai_core::{BbKey, Blackboard};

#[test]
fn blackboard_set_get_remove_roundtrip() {
    let k_u32 = BbKey::<u32>::new(1);
    let k_str = BbKey::<String>::new(2);

    let mut bb = Blackboard::new();
    assert!(!bb.contains(k_u32));

    bb.set(k_u32, 123);
    bb.set(k_str, "hello".to_string());
    assert_eq!(bb.len(), 2);

    assert_eq!(bb.get(k_u32).copied(), Some(123));
    assert_eq!(bb.get(k_str).map(|s| s.as_str()), Some("hello"));

    assert_eq!(bb.remove(k_u32), Some(123));
    assert_eq!(bb.get(k_u32), None);
}

#[test]
fn blackboard_type_mismatch_reads_as_missing() {
    let mut bb = Blackboard::new();
    bb.set(BbKey::<u32>::new(1), 1u32);

    assert_eq!(bb.get(BbKey::<i32>::new(1)), None);
    assert_eq!(bb.get_mut(BbKey::<i32>::new(1)), None);
    assert_eq!(bb.remove(BbKey::<i32>::new(1)), None);

    // The original value survives a mismatched remove.
    assert_eq!(bb.get(BbKey::<u32>::new(1)).copied(), Some(1));
}

#[test]
fn get_mut_updates_in_place() {
    let key = BbKey::<Vec<u8>>::new(9);
    let mut bb = Blackboard::new();
    bb.set(key, vec![1]);
    if let Some(v) = bb.get_mut(key) {
        v.push(2);
    }
    assert_eq!(bb.get(key).map(Vec::as_slice), Some(&[1u8, 2][..]));
}
