//! 基础设施层（Infrastructure Layer）
//!
//! 持有稀缺资源（page），只对上层暴露能力，不包含业务流程

pub mod page_actor;

pub use page_actor::PageActor;
