//! 业务能力层（Services Layer）
//!
//! 可插拔的平台策略，每个策略只描述"怎么在这个平台上做一个单元的事"，
//! 批次、预算、失败统计都归流程层和编排层管

pub mod shorts_watcher;
pub mod video_uploader;

pub use shorts_watcher::ShortsWatcher;
pub use video_uploader::VideoUploader;
