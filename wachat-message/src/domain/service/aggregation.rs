//! 会话聚合规则
//!
//! 内存仓储直接使用这些函数；MongoDB 仓储用等价的聚合管道实现同一规则。

use std::collections::HashMap;

use crate::domain::model::{ConversationStats, ConversationSummary, LastMessagePreview, Message};

/// 将消息（按插入顺序）按 wa_id 分组生成会话摘要
///
/// - lastMessage：时间戳最大的一条，时间相同取后插入的
/// - profile_name：联系人发出的最近一条非空昵称，否则取最早一条消息的昵称
/// - unreadCount：业务方发出且未读的消息数
///
/// 结果按最后消息时间倒序，时间相同按 wa_id 升序。
pub fn summarize_conversations<'a, I>(messages: I) -> Vec<ConversationSummary>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Message>> = HashMap::new();

    for message in messages {
        let key = message.wa_id.as_str();
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(message);
    }

    let mut summaries: Vec<ConversationSummary> = order
        .into_iter()
        .filter_map(|wa_id| groups.remove(wa_id).map(|group| summarize_group(wa_id, group)))
        .collect();

    summaries.sort_by(|a, b| {
        b.last_message
            .timestamp
            .cmp(&a.last_message.timestamp)
            .then_with(|| a.wa_id.cmp(&b.wa_id))
    });
    summaries
}

fn summarize_group(wa_id: &str, mut group: Vec<&Message>) -> ConversationSummary {
    // 稳定排序：时间相同保持插入顺序
    group.sort_by_key(|message| message.timestamp);

    let message_count = group.len() as u64;
    let unread_count = group.iter().filter(|m| m.is_unread_business()).count() as u64;

    let earliest_profile = group
        .first()
        .map(|m| m.profile_name.clone())
        .unwrap_or_default();
    let profile_name = group
        .iter()
        .rev()
        .find(|m| m.is_from_contact() && !m.profile_name.is_empty())
        .map(|m| m.profile_name.clone())
        .unwrap_or(earliest_profile);

    let last_message = group
        .last()
        .map(|m| LastMessagePreview::from(*m))
        .unwrap_or_else(|| LastMessagePreview {
            text: Default::default(),
            timestamp: 0,
            status: Default::default(),
            message_type: Default::default(),
        });

    ConversationSummary {
        wa_id: wa_id.to_string(),
        profile_name,
        message_count,
        unread_count,
        last_message,
    }
}

/// 计算单个会话的统计（调用方保证消息都属于该会话）
pub fn conversation_stats<'a, I>(messages: I) -> ConversationStats
where
    I: IntoIterator<Item = &'a Message>,
{
    messages
        .into_iter()
        .fold(ConversationStats::default(), |mut stats, message| {
            stats.total_messages += 1;
            if message.is_from_contact() {
                stats.sent_by_user += 1;
            } else {
                stats.sent_by_business += 1;
            }
            if message.is_unread_business() {
                stats.unread_messages += 1;
            }
            stats.first_message = Some(
                stats
                    .first_message
                    .map_or(message.timestamp, |ts| ts.min(message.timestamp)),
            );
            stats.last_message = Some(
                stats
                    .last_message
                    .map_or(message.timestamp, |ts| ts.max(message.timestamp)),
            );
            stats
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::MessageStatus;

    fn inbound(id: &str, wa_id: &str, ts: i64, profile: &str) -> Message {
        Message::text(id, wa_id, wa_id, "business_number", ts, format!("in {id}"))
            .with_status(MessageStatus::Delivered)
            .with_profile_name(profile)
    }

    fn outbound(id: &str, wa_id: &str, ts: i64, status: MessageStatus) -> Message {
        Message::text(id, wa_id, "business_number", wa_id, ts, format!("out {id}"))
            .with_status(status)
            .with_profile_name("You")
    }

    #[test]
    fn groups_and_orders_by_latest_message() {
        let messages = vec![
            inbound("a1", "111", 100, "Alice"),
            outbound("a2", "111", 200, MessageStatus::Delivered),
            inbound("b1", "222", 300, "Bob"),
            outbound("a3", "111", 150, MessageStatus::Read),
        ];

        let summaries = summarize_conversations(&messages);
        assert_eq!(summaries.len(), 2);

        assert_eq!(summaries[0].wa_id, "222");
        assert_eq!(summaries[0].message_count, 1);
        assert_eq!(summaries[0].unread_count, 0);

        let alice = &summaries[1];
        assert_eq!(alice.wa_id, "111");
        assert_eq!(alice.profile_name, "Alice");
        assert_eq!(alice.message_count, 3);
        // a2 未读；a3 已读；a1 为联系人发出
        assert_eq!(alice.unread_count, 1);
        // 最后一条按时间而不是插入顺序
        assert_eq!(alice.last_message.timestamp, 200);
        assert_eq!(alice.last_message.text.body, "out a2");
    }

    #[test]
    fn timestamp_ties_prefer_later_insert() {
        let messages = vec![
            inbound("x1", "333", 500, "Carol"),
            outbound("x2", "333", 500, MessageStatus::Sent),
        ];
        let summaries = summarize_conversations(&messages);
        assert_eq!(summaries[0].last_message.text.body, "out x2");
    }

    #[test]
    fn profile_name_prefers_latest_contact_name() {
        let messages = vec![
            outbound("o1", "444", 10, MessageStatus::Sent).with_profile_name("444"),
            inbound("i1", "444", 20, "Dan"),
            inbound("i2", "444", 30, "Daniel"),
            inbound("i3", "444", 40, ""),
        ];
        let summaries = summarize_conversations(&messages);
        assert_eq!(summaries[0].profile_name, "Daniel");

        // 只有出站消息时退回最早一条的昵称
        let messages = vec![
            outbound("o2", "555", 20, MessageStatus::Sent).with_profile_name("Later"),
            outbound("o1", "555", 10, MessageStatus::Sent).with_profile_name("Erin"),
        ];
        let summaries = summarize_conversations(&messages);
        assert_eq!(summaries[0].profile_name, "Erin");
    }

    #[test]
    fn equal_latest_timestamps_sort_by_wa_id() {
        let messages = vec![inbound("z", "999", 10, "Z"), inbound("y", "100", 10, "Y")];
        let summaries = summarize_conversations(&messages);
        let ids: Vec<&str> = summaries.iter().map(|s| s.wa_id.as_str()).collect();
        assert_eq!(ids, vec!["100", "999"]);
    }

    #[test]
    fn stats_count_both_directions() {
        let messages = vec![
            inbound("a1", "111", 100, "Alice"),
            outbound("a2", "111", 200, MessageStatus::Delivered),
            outbound("a3", "111", 50, MessageStatus::Read),
        ];
        let stats = conversation_stats(&messages);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.sent_by_user, 1);
        assert_eq!(stats.sent_by_business, 2);
        assert_eq!(stats.unread_messages, 1);
        assert_eq!(stats.first_message, Some(50));
        assert_eq!(stats.last_message, Some(200));
    }

    #[test]
    fn empty_stats_are_zeroed() {
        let stats = conversation_stats(std::iter::empty());
        assert_eq!(stats, ConversationStats::default());
        assert_eq!(stats.first_message, None);
    }
}
