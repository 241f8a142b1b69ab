//! VM桥接层：连接Slint UI与视图状态
//!
//! 注意：此模块的具体实现在main.rs中，因为依赖于Slint生成的类型
//! 这里只提供公共常量

// === 常量定义（消除魔法值） ===
pub const STATUS_READY: &str = "就绪";
pub const STATUS_CLASSIFYING: &str = "正在识别文档...";
pub const STATUS_FORMATTED: &str = "已生成格式化视图";
pub const STATUS_SHOW_RAW: &str = "显示原文";
pub const STATUS_SHOW_PARSED: &str = "显示解析视图";
pub const STATUS_COPIED: &str = "已复制到剪贴板";
pub const STATUS_UNFORMATTED_PREFIX: &str = "未格式化: ";
pub const STATUS_LINK_COPIED_PREFIX: &str = "链接已复制: ";
pub const STATUS_ERROR_PREFIX: &str = "错误: ";
