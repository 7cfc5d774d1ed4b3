use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, CreateIndexOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions,
    ReturnDocument,
};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::MessageServiceSettings;
use crate::domain::model::{
    ConversationStats, ConversationSummary, DocumentMeta, ImageMeta, Message, MessageKind,
    MessageStatus, TextBody,
};
use crate::domain::repository::MessageRepository;

const DUPLICATE_KEY: i32 = 11000;

/// 集合中的存储结构
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    object_id: Option<ObjectId>,
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta_msg_id: Option<String>,
    wa_id: String,
    from: String,
    to: String,
    timestamp: i64,
    #[serde(rename = "type", default)]
    message_type: MessageKind,
    #[serde(default)]
    text: TextBody,
    #[serde(default)]
    status: MessageStatus,
    #[serde(default)]
    profile_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<ImageMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document: Option<DocumentMeta>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl From<&Message> for MessageDocument {
    fn from(message: &Message) -> Self {
        Self {
            object_id: None,
            id: message.id.clone(),
            meta_msg_id: message.meta_msg_id.clone(),
            wa_id: message.wa_id.clone(),
            from: message.from.clone(),
            to: message.to.clone(),
            timestamp: message.timestamp,
            message_type: message.message_type.clone(),
            text: message.text.clone(),
            status: message.status,
            profile_name: message.profile_name.clone(),
            image: message.image.clone(),
            document: message.document.clone(),
            created_at: bson::DateTime::from_chrono(message.created_at),
            updated_at: bson::DateTime::from_chrono(message.updated_at),
        }
    }
}

impl From<MessageDocument> for Message {
    fn from(document: MessageDocument) -> Self {
        Self {
            id: document.id,
            meta_msg_id: document.meta_msg_id,
            wa_id: document.wa_id,
            from: document.from,
            to: document.to,
            timestamp: document.timestamp,
            message_type: document.message_type,
            text: document.text,
            status: document.status,
            profile_name: document.profile_name,
            image: document.image,
            document: document.document,
            created_at: document.created_at.to_chrono(),
            updated_at: document.updated_at.to_chrono(),
        }
    }
}

pub struct MongoMessageStore {
    database: Database,
    collection: Collection<MessageDocument>,
}

impl MongoMessageStore {
    pub async fn new(settings: &MessageServiceSettings) -> Result<Self> {
        let uri = settings.require_mongo_uri()?;

        let mut options = ClientOptions::parse(uri)
            .await
            .context("invalid MongoDB connection string")?;
        options.app_name = Some("wachat-message".to_string());
        let client = Client::with_options(options)?;

        // 连接串中指定的数据库优先
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(&settings.mongo_database));
        let collection = database.collection::<MessageDocument>(&settings.collection);

        database
            .run_command(doc! {"ping": 1}, None)
            .await
            .context("failed to connect to MongoDB")?;
        ensure_indexes(&collection).await?;

        info!(
            database = %database.name(),
            collection = %settings.collection,
            "connected to MongoDB"
        );

        Ok(Self {
            database,
            collection,
        })
    }
}

async fn ensure_indexes(collection: &Collection<MessageDocument>) -> Result<()> {
    let indexes = [
        (doc! {"id": 1}, "uid_message_id", true, false),
        (doc! {"meta_msg_id": 1}, "idx_meta_msg_id", false, true),
        (doc! {"wa_id": 1, "timestamp": -1}, "idx_wa_id_timestamp", false, false),
        (doc! {"status": 1}, "idx_status", false, false),
        (doc! {"created_at": -1}, "idx_created_at", false, false),
    ];

    for (keys, name, unique, sparse) in indexes {
        let index = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(Some(name.to_string()))
                    .unique(unique.then_some(true))
                    .sparse(sparse.then_some(true))
                    .build(),
            )
            .build();
        collection
            .create_index(index, None::<CreateIndexOptions>)
            .await
            .with_context(|| format!("failed to create index {name}"))?;
    }
    Ok(())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn candidate_filter(candidate_ids: &[String]) -> Document {
    let candidate_ids = candidate_ids.to_vec();
    doc! {
        "$or": [
            {"id": {"$in": candidate_ids.clone()}},
            {"meta_msg_id": {"$in": candidate_ids}},
        ]
    }
}

/// 会话摘要聚合管道
fn summary_pipeline() -> Vec<Document> {
    vec![
        doc! {"$sort": {"timestamp": 1, "_id": 1}},
        doc! {
            "$group": {
                "_id": "$wa_id",
                "lastMessage": {"$last": "$$ROOT"},
                "messageCount": {"$sum": 1},
                "firstProfile": {"$first": "$profile_name"},
                "contactProfiles": {
                    "$push": {
                        "$cond": [
                            {"$and": [{"$eq": ["$from", "$wa_id"]}, {"$ne": ["$profile_name", ""]}]},
                            "$profile_name",
                            Bson::Null,
                        ]
                    }
                },
                "unreadCount": {
                    "$sum": {
                        "$cond": [
                            {"$and": [{"$ne": ["$from", "$wa_id"]}, {"$ne": ["$status", "read"]}]},
                            1,
                            0,
                        ]
                    }
                },
            }
        },
        doc! {
            "$project": {
                "_id": 1,
                "messageCount": 1,
                "unreadCount": 1,
                "profile_name": {
                    "$ifNull": [
                        {"$arrayElemAt": [
                            {"$filter": {
                                "input": "$contactProfiles",
                                "as": "name",
                                "cond": {"$ne": ["$$name", Bson::Null]},
                            }},
                            -1,
                        ]},
                        {"$ifNull": ["$firstProfile", ""]},
                    ]
                },
                "lastMessage": {
                    "text": {"$ifNull": ["$lastMessage.text", {"body": ""}]},
                    "timestamp": "$lastMessage.timestamp",
                    "status": {"$ifNull": ["$lastMessage.status", "sent"]},
                    "type": {"$ifNull": ["$lastMessage.type", "text"]},
                },
            }
        },
        doc! {"$sort": {"lastMessage.timestamp": -1, "_id": 1}},
    ]
}

fn stats_pipeline(wa_id: &str) -> Vec<Document> {
    vec![
        doc! {"$match": {"wa_id": wa_id}},
        doc! {
            "$group": {
                "_id": Bson::Null,
                "totalMessages": {"$sum": 1},
                "sentByBusiness": {"$sum": {"$cond": [{"$ne": ["$from", "$wa_id"]}, 1, 0]}},
                "sentByUser": {"$sum": {"$cond": [{"$eq": ["$from", "$wa_id"]}, 1, 0]}},
                "unreadMessages": {
                    "$sum": {
                        "$cond": [
                            {"$and": [{"$ne": ["$from", "$wa_id"]}, {"$ne": ["$status", "read"]}]},
                            1,
                            0,
                        ]
                    }
                },
                "firstMessage": {"$min": "$timestamp"},
                "lastMessage": {"$max": "$timestamp"},
            }
        },
    ]
}

#[async_trait]
impl MessageRepository for MongoMessageStore {
    async fn insert_if_absent(&self, message: &Message) -> Result<bool> {
        match self
            .collection
            .insert_one(MessageDocument::from(message), None)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(err) => Err(err).with_context(|| format!("failed to insert message {}", message.id)),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Message>> {
        let document = self.collection.find_one(doc! {"id": id}, None).await?;
        Ok(document.map(Message::from))
    }

    async fn update_status(
        &self,
        candidate_ids: &[String],
        status: MessageStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Message>> {
        if candidate_ids.is_empty() {
            return Ok(None);
        }
        let update = doc! {
            "$set": {
                "status": status.as_str(),
                "updated_at": bson::DateTime::from_chrono(updated_at),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .sort(doc! {"_id": 1})
            .build();

        let document = self
            .collection
            .find_one_and_update(candidate_filter(candidate_ids), update, options)
            .await?;
        Ok(document.map(Message::from))
    }

    async fn list_conversation_messages(
        &self,
        wa_id: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Message>> {
        let options = FindOptions::builder()
            .sort(doc! {"timestamp": -1, "_id": -1})
            .skip(skip.min(i64::MAX as u64))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();
        let cursor = self.collection.find(doc! {"wa_id": wa_id}, options).await?;
        let documents: Vec<MessageDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(Message::from).collect())
    }

    async fn count_conversation_messages(&self, wa_id: &str) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! {"wa_id": wa_id}, None)
            .await?)
    }

    async fn conversation_summaries(&self) -> Result<Vec<ConversationSummary>> {
        let cursor = self.collection.aggregate(summary_pipeline(), None).await?;
        let rows: Vec<Document> = cursor.try_collect().await?;
        rows.into_iter()
            .map(|row| {
                bson::from_document::<ConversationSummary>(row)
                    .context("malformed conversation summary")
            })
            .collect()
    }

    async fn conversation_stats(&self, wa_id: &str) -> Result<ConversationStats> {
        let mut cursor = self
            .collection
            .aggregate(stats_pipeline(wa_id), None)
            .await?;
        match cursor.try_next().await? {
            Some(row) => bson::from_document::<ConversationStats>(row)
                .context("malformed conversation stats"),
            None => Ok(ConversationStats::default()),
        }
    }

    async fn count_all(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}, None).await?)
    }

    async fn distinct_conversations(&self) -> Result<Vec<String>> {
        let values = self.collection.distinct("wa_id", None, None).await?;
        let mut ids: Vec<String> = values
            .into_iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = self.collection.delete_many(doc! {}, None).await?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! {"ping": 1}, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_conversion_keeps_fields() {
        let mut message = Message::text("wamid.1", "123", "123", "biz", 42, "hello")
            .with_status(MessageStatus::Delivered)
            .with_profile_name("Ravi");
        message.meta_msg_id = Some("meta".to_string());

        let document = MessageDocument::from(&message);
        let raw = bson::to_document(&document).unwrap();
        assert!(raw.get("_id").is_none());
        assert_eq!(raw.get_str("type").unwrap(), "text");
        assert_eq!(raw.get_str("status").unwrap(), "delivered");
        assert_eq!(raw.get_i64("timestamp").unwrap(), 42);

        let restored = Message::from(bson::from_document::<MessageDocument>(raw).unwrap());
        assert_eq!(restored.id, message.id);
        assert_eq!(restored.meta_msg_id, message.meta_msg_id);
        assert_eq!(restored.text.body, "hello");
        // BSON 时间精度为毫秒
        assert_eq!(
            restored.created_at.timestamp_millis(),
            message.created_at.timestamp_millis()
        );
    }

    #[test]
    fn summary_rows_deserialize() {
        let row = doc! {
            "_id": "123",
            "messageCount": 3_i32,
            "unreadCount": 1_i32,
            "profile_name": "Ravi",
            "lastMessage": {"text": {"body": "hi"}, "timestamp": 99_i64, "status": "read", "type": "image"},
        };
        let summary = bson::from_document::<ConversationSummary>(row).unwrap();
        assert_eq!(summary.wa_id, "123");
        assert_eq!(summary.message_count, 3);
        assert_eq!(summary.last_message.message_type, MessageKind::Image);
    }

    #[test]
    fn stats_rows_deserialize() {
        let row = doc! {
            "_id": Bson::Null,
            "totalMessages": 2_i32,
            "sentByBusiness": 1_i32,
            "sentByUser": 1_i32,
            "unreadMessages": 0_i32,
            "firstMessage": 10_i64,
            "lastMessage": 20_i64,
        };
        let stats = bson::from_document::<ConversationStats>(row).unwrap();
        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.first_message, Some(10));
    }

    #[test]
    fn candidate_filter_checks_both_ids() {
        let filter = candidate_filter(&["a".to_string()]);
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
    }
}
