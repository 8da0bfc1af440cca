// Domain layer: 表格資料模型與對外介面 (ports)，不依賴 HTTP 細節。

pub mod model;
pub mod ports;
