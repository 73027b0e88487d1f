use super::Broker;
use super::message::Message;
use super::topic::Topic;
use std::sync::Arc;
use std::thread;

fn payloads(broker: &Broker, topic: &str) -> Vec<String> {
    broker
        .snapshot(topic)
        .into_iter()
        .map(|m| m.payload)
        .collect()
}

#[test]
fn test_message_is_stamped_and_verbatim() {
    let before = chrono::Utc::now().timestamp_millis();
    let message = Message::new("t", "a$b ");
    assert_eq!(message.topic, "t");
    assert_eq!(message.payload, "a$b ");
    assert!(message.timestamp >= before);
    assert_eq!(message.clone(), message);
}

#[test]
fn test_topic_new() {
    let topic = Topic::new("test_topic");
    assert_eq!(topic.name, "test_topic");
    assert!(topic.is_empty());
}

#[test]
fn test_topic_append_keeps_order_and_duplicates() {
    let mut topic = Topic::new("test_topic");
    topic.append("a");
    topic.append("a");
    topic.append("b");
    let payloads: Vec<_> = topic.messages.iter().map(|m| m.payload.as_str()).collect();
    assert_eq!(payloads, vec!["a", "a", "b"]);
    assert!(topic.messages.iter().all(|m| m.topic == "test_topic"));
}

#[test]
fn test_broker_new() {
    let broker = Broker::default();
    assert!(broker.topic_names().is_empty());
}

#[test]
fn test_snapshot_of_unpublished_topic_is_empty() {
    let broker = Broker::new();
    assert!(broker.snapshot("missing").is_empty());
    // Looking at a topic must not create it.
    assert!(broker.topic_names().is_empty());
}

#[test]
fn test_publish_creates_topic_lazily() {
    let broker = Broker::new();
    broker.publish("news", "hello world ");
    assert_eq!(broker.topic_names(), vec!["news".to_string()]);
    assert_eq!(payloads(&broker, "news"), vec!["hello world "]);
}

#[test]
fn test_publish_order_is_preserved() {
    let broker = Broker::new();
    broker.publish("t", "a");
    broker.publish("t", "b");
    broker.publish("t", "c");
    assert_eq!(payloads(&broker, "t"), vec!["a", "b", "c"]);
}

#[test]
fn test_topics_are_independent() {
    let broker = Broker::new();
    broker.publish("one", "1");
    broker.publish("two", "2");
    broker.publish("one", "11");
    assert_eq!(payloads(&broker, "one"), vec!["1", "11"]);
    assert_eq!(payloads(&broker, "two"), vec!["2"]);
}

#[test]
fn test_snapshot_is_a_copy() {
    let broker = Broker::new();
    broker.publish("t", "a");
    let before = broker.snapshot("t");
    broker.publish("t", "b");
    assert_eq!(before.len(), 1);
    assert_eq!(broker.snapshot("t").len(), 2);
}

#[test]
fn test_concurrent_publishes_keep_per_thread_order() {
    let broker = Arc::new(Broker::new());
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let broker = broker.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    broker.publish("shared", &format!("{w}:{i}"));
                    broker.publish(&format!("own-{w}"), &i.to_string());
                }
            })
        })
        .collect();
    for handle in writers {
        handle.join().unwrap();
    }

    let shared = payloads(&broker, "shared");
    assert_eq!(shared.len(), 1000);
    for w in 0..4 {
        let mine: Vec<usize> = shared
            .iter()
            .filter_map(|p| p.strip_prefix(&format!("{w}:")))
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(mine, (0..250).collect::<Vec<_>>());
        assert_eq!(payloads(&broker, &format!("own-{w}")).len(), 250);
    }
}
