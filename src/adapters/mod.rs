// Adapters layer: 對 Zoho API 的具體實作 (OAuth token、HTTP 派送、Creator、Inventory)

pub mod auth;
pub mod creator;
pub mod http;
pub mod inventory;
