use system::{
    decode_command, encode_event, ClientCommand, Frame, Member, Membership, ServerEvent,
    StrokeLog, StrokeOp, WireFormat,
};

#[test]
fn it_should_undo_and_redo_latest_stroke_of_anyone() {
    let mut log = StrokeLog::new();
    assert!(!log.undo());

    let strokes: Vec<StrokeOp> = (0..5)
        .map(|i| StrokeOp::line(i as f32, i as f32, "#000000", 2.0))
        .collect();
    for stroke in &strokes {
        log.append(stroke.clone());
    }
    let before = log.snapshot();

    assert!(log.undo());
    assert_eq!(log.strokes(), &strokes[..4]);
    assert!(log.redo());
    assert_eq!(log.snapshot(), before);
    assert!(!log.redo());

    assert!(log.undo());
    log.append(StrokeOp::text(9.0, 9.0, "new", "#ff0000", 2.0));
    assert_eq!(log.redo_len(), 0);
    assert!(!log.redo());
}

#[test]
fn it_should_pass_creator_role_in_join_order() {
    let mut membership = Membership::new(Member::new(1, "Alice"));
    membership.admit(Member::new(2, "Bob"));
    membership.admit(Member::new(3, "Carol"));

    let first = membership.remove(1).expect("alice is a member");
    assert_eq!(first.new_creator, Some(2));
    let second = membership.remove(2).expect("bob is a member");
    assert_eq!(second.new_creator, Some(3));
    let last = membership.remove(3).expect("carol is a member");
    assert_eq!(last.new_creator, None);
    assert!(membership.is_empty());
}

#[test]
fn it_should_speak_json_to_browsers() {
    let frame = Frame::Text(
        r#"{"request-join":{"roomId":"R1","username":"Bob"}}"#.to_string(),
    );
    assert_eq!(
        decode_command(&frame).expect("must decode"),
        ClientCommand::RequestJoin {
            room_id: "R1".into(),
            username: "Bob".into(),
        }
    );

    let reply = encode_event(
        &ServerEvent::JoinRejected("Room not found".into()),
        WireFormat::Json,
    )
    .expect("must encode");
    assert_eq!(
        reply,
        Frame::Text(r#"{"join-rejected":"Room not found"}"#.to_string())
    );
    assert_eq!(
        encode_event(&ServerEvent::YouAreNowCreator, WireFormat::Json).expect("must encode"),
        Frame::Text(r#""you-are-now-creator""#.to_string())
    );
}
