//! 查询结构体定义（Query DTO）

#[derive(Debug, Clone, Copy, Default)]
pub struct ListConversationsQuery;

#[derive(Debug, Clone)]
pub struct ListMessagesQuery {
    pub wa_id: String,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ConversationStatsQuery {
    pub wa_id: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StoreSummaryQuery;
