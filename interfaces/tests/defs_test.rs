use interfaces::*;

fn video(id: &str, title: &str) -> VideoResult {
    VideoResult {
        title: title.to_string(),
        video_id: id.to_string(),
        thumbnail_url: format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg"),
        channel_title: "Guides".to_string(),
    }
}

#[test]
fn ranked_set_keeps_first_occurrence_and_cap() {
    let mut set = RankedResultSet::with_cap(3);

    assert!(set.offer(video("A", "first A")));
    assert!(set.offer(video("B", "B")));
    assert!(!set.offer(video("A", "second A")));
    assert!(set.offer(video("C", "C")));
    assert!(set.is_full());
    assert!(!set.offer(video("D", "D")));

    assert_eq!(set.video_ids(), vec!["A", "B", "C"]);
    assert_eq!(set.first().unwrap().title, "first A");
}

#[test]
fn ranked_set_serializes_as_plain_list() {
    let mut set = RankedResultSet::with_cap(2);
    set.offer(video("A", "Crossroads"));

    let json = serde_json::to_value(&set).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "title": "Crossroads",
            "videoId": "A",
            "thumbnail": "https://i.ytimg.com/vi/A/hqdefault.jpg",
            "channelTitle": "Guides"
        }])
    );
    assert!(RankedResultSet::empty().is_full());
}

#[test]
fn phases_only_move_forward() {
    let mut attempt = RequestAttempt::new();
    assert_eq!(attempt.phase, Phase::Idle);

    assert!(attempt.enter(Phase::Uploading));
    assert!(attempt.enter(Phase::Analyzing));
    assert!(attempt.enter(Phase::Analyzing));
    assert!(!attempt.enter(Phase::Uploading));
    assert!(attempt.enter(Phase::Searching));
    assert!(attempt.enter(Phase::Done));
    assert!(!attempt.enter(Phase::Failed));
    assert_eq!(attempt.phase, Phase::Done);
    assert!(attempt.phase.is_terminal());
}

#[test]
fn media_types_follow_the_allow_list() {
    assert_eq!("image/png".parse::<MediaType>().unwrap(), MediaType::Png);
    assert_eq!("IMAGE/JPEG".parse::<MediaType>().unwrap(), MediaType::Jpeg);
    assert!("image/bmp".parse::<MediaType>().is_err());
    assert_eq!(MediaType::from_extension("JPG"), Some(MediaType::Jpeg));
    assert_eq!(MediaType::from_extension("tiff"), None);
}

#[test]
fn mission_kind_is_lowercase_on_the_wire() {
    let info: MissionInfo =
        serde_json::from_str(r#"{"name": "False Knight", "type": "boss", "objective": "Win"}"#).unwrap();
    assert_eq!(info.kind, MissionKind::Boss);
    assert!(serde_json::from_str::<MissionInfo>(r#"{"name": "x", "type": "Boss"}"#).is_err());
}
