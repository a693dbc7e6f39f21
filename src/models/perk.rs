/// A social account and the wallets it has verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: u64,
    pub display_name: String,
    pub wallet_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCount {
    pub address: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    pub display_name: String,
    pub total_count: u64,
    pub message: String,
}
