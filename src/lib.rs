//! JSON报文格式化查看器库
//!
//! 提供裸JSON文档识别、渲染树构建、主题解析与可折叠视图状态
//! 遵循MVVM架构模式，支持大文档高性能处理

pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use model::classifier::{classify_document, Classification};
pub use model::render_tree::{build, flatten, visible_rows, RenderNode, RenderRow, ValueKind};
pub use model::theme::{resolve, ResolvedTheme, ThemePreference};
pub use model::view_state::{AppError, DisplayMode, LoadOutcome, ViewState};
