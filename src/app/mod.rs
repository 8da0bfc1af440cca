// Application layer: 排程器呼叫的 operator 與 client 組裝

pub mod factory;
pub mod operators;

pub use operators::{
    CreatorExtractOperator, CreatorTask, ExtractMode, InventoryExtractOperator, Operator, TaskContext,
};
