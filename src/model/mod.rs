//! 数据与状态层：分类、渲染树、主题与视图状态

pub mod classifier;
pub mod performance;
pub mod render_tree;
pub mod theme;
pub mod view_state;
