//! 视图状态：原文/解析切换与折叠协议的状态机
//!
//! 折叠状态不落在渲染树上，而是与扁平节点平行的布尔数组；
//! 界面的委托式指针事件经目标过滤后统一派发到这里

use std::path::{Path, PathBuf};

use jsonpath_rust::JsonPath;
use serde_json::Value;
use thiserror::Error;

use crate::model::classifier::{classify_document, Classification};
use crate::model::render_tree::{build, flatten, visible_rows, FlatNode, RenderNode, RenderRow};
use crate::utils::fs::read_document_text;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("JSONPath错误: {0}")]
    JsonPath(String),
    #[error("状态错误: {0}")]
    State(String),
}

/// 互斥的两种展示模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Raw,
    Parsed,
}

/// 一次加载的结论
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// 已安装格式化视图
    Formatted {
        node_count: usize,
        raw_length: usize,
        conflicting_blocks: usize,
    },
    /// 保持原样，不激活格式化
    Unformatted {
        note: &'static str,
        raw_length: Option<usize>,
    },
}

#[derive(Debug, Default)]
pub struct ViewState {
    pub source_path: Option<PathBuf>,
    /// 合格文档存候选块原文；不合格文档存整份文件文本
    pub raw_text: String,
    pub raw_length: usize,
    pub parsed: Option<Value>,
    pub root: Option<RenderNode>,
    pub flat: Vec<FlatNode>,
    /// 与 flat 平行的折叠标志；初始全部展开
    collapsed: Vec<bool>,
    /// 每个扁平节点的JSONPath（寻址与子树提取用）
    paths: Vec<String>,
    pub mode: DisplayMode,
    pub conflicting_blocks: usize,
}

impl Default for DisplayMode {
    fn default() -> Self {
        DisplayMode::Raw
    }
}

impl ViewState {
    /// 读取文档并做一次性分类；合格时安装格式化视图，否则保持原文
    pub fn load_document(&mut self, p: &Path) -> Result<LoadOutcome, AppError> {
        let text = read_document_text(p)?;
        let outcome = match classify_document(&text) {
            Classification::Eligible {
                raw_text,
                raw_length,
                parsed,
                conflicting_blocks,
            } => {
                self.install_document(raw_text, raw_length, parsed, conflicting_blocks);
                LoadOutcome::Formatted {
                    node_count: self.flat.len(),
                    raw_length,
                    conflicting_blocks,
                }
            }
            Classification::Ineligible { note, raw_length } => {
                self.clear_formatted_view();
                self.raw_text = text;
                self.raw_length = raw_length.unwrap_or(0);
                LoadOutcome::Unformatted { note, raw_length }
            }
        };
        self.source_path = Some(p.to_path_buf());
        Ok(outcome)
    }

    /// 安装已分类合格的报文：构建渲染树、展平、重置折叠状态
    pub fn install_document(
        &mut self,
        raw_text: String,
        raw_length: usize,
        parsed: Value,
        conflicting_blocks: usize,
    ) {
        let root = build(&parsed, None);
        self.flat = flatten(&root);
        self.collapsed = vec![false; self.flat.len()];
        self.paths = jsonpath_for_flat(&self.flat);
        self.root = Some(root);
        self.parsed = Some(parsed);
        self.raw_text = raw_text;
        self.raw_length = raw_length;
        self.conflicting_blocks = conflicting_blocks;
        self.mode = DisplayMode::Parsed;
    }

    fn clear_formatted_view(&mut self) {
        self.parsed = None;
        self.root = None;
        self.flat.clear();
        self.collapsed.clear();
        self.paths.clear();
        self.conflicting_blocks = 0;
        self.mode = DisplayMode::Raw;
    }

    pub fn is_formatted(&self) -> bool {
        self.root.is_some()
    }

    /// 切换展示模式；选中已选项是无操作，返回是否发生变化
    pub fn set_mode(&mut self, mode: DisplayMode) -> bool {
        if self.mode == mode || (mode == DisplayMode::Parsed && !self.is_formatted()) {
            return false;
        }
        self.mode = mode;
        true
    }

    /// 折叠协议。普通点击只切换被点容器；按住 Ctrl/Cmd 时，把被点容器
    /// 的下一状态施加到其父级兄弟组里的全部可折叠节点（同一代，
    /// 不含更深的后代）
    pub fn toggle_collapse(&mut self, id: usize, modifier: bool) {
        let Some(node) = self.flat.get(id) else {
            return;
        };
        // 目标过滤：点到非折叠目标一律忽略
        if !node.collapsible {
            return;
        }
        let next = !self.collapsed[id];
        if modifier {
            let parent = node.parent;
            for i in 0..self.flat.len() {
                if self.flat[i].parent == parent && self.flat[i].collapsible {
                    self.collapsed[i] = next;
                }
            }
        } else {
            self.collapsed[id] = next;
        }
    }

    pub fn is_collapsed(&self, id: usize) -> bool {
        self.collapsed.get(id).copied().unwrap_or(false)
    }

    /// 当前折叠状态下的可见行
    pub fn rows(&self) -> Vec<RenderRow> {
        if self.root.is_none() {
            return Vec::new();
        }
        visible_rows(&self.flat, &self.collapsed)
    }

    pub fn node_path(&self, id: usize) -> Option<&str> {
        self.paths.get(id).map(String::as_str)
    }

    /// 按 JSONPath 提取第一个匹配节点的 pretty 字符串
    pub fn extract_subtree_pretty(&self, json_path: &str) -> Result<String, AppError> {
        let dom = self
            .parsed
            .as_ref()
            .ok_or_else(|| AppError::State("文档尚未解析".into()))?;
        let hits: Vec<&Value> = dom
            .query(json_path)
            .map_err(|e| AppError::JsonPath(e.to_string()))?;
        let first = hits
            .into_iter()
            .next()
            .ok_or_else(|| AppError::JsonPath("未匹配到任何节点".into()))?;
        Ok(serde_json::to_string_pretty(first)?)
    }
}

/// 为每个扁平节点派生 JSONPath；键含特殊字符时退到 bracket-notation
fn jsonpath_for_flat(flat: &[FlatNode]) -> Vec<String> {
    let mut paths = vec![String::new(); flat.len()];
    let mut child_seen = vec![0usize; flat.len()];
    for i in 0..flat.len() {
        let Some(p) = flat[i].parent else {
            paths[i] = "$".to_string();
            continue;
        };
        let index = child_seen[p];
        child_seen[p] += 1;
        paths[i] = match &flat[i].key {
            Some(k) => {
                if !k.is_empty() && k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    format!("{}.{}", paths[p], k)
                } else {
                    format!("{}['{}']", paths[p], k.replace('\'', "\\'"))
                }
            }
            None => format!("{}[{}]", paths[p], index),
        };
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::render_tree::ValueKind;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn install(value: Value) -> ViewState {
        let raw = value.to_string();
        let len = raw.chars().count();
        let mut state = ViewState::default();
        state.install_document(raw, len, value, 0);
        state
    }

    /// 构造临时文档文件用于加载测试
    fn document_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("创建临时文件失败");
        file.write_all(content.as_bytes()).expect("写入临时文件失败");
        file
    }

    #[test]
    fn test_load_eligible_document() {
        let file = document_file(
            r#"<html><head></head><body><pre>{"a":1,"b":[true,null]}</pre></body></html>"#,
        );
        let mut state = ViewState::default();
        let outcome = state.load_document(file.path()).expect("加载应成功");

        match outcome {
            LoadOutcome::Formatted {
                node_count,
                raw_length,
                conflicting_blocks,
            } => {
                assert_eq!(node_count, 5, "根、a、b、true、null 共5个节点");
                assert_eq!(raw_length, state.raw_text.chars().count());
                assert_eq!(conflicting_blocks, 0);
            }
            other => panic!("应安装格式化视图，实际: {:?}", other),
        }
        assert_eq!(state.mode, DisplayMode::Parsed);
        assert!(state.is_formatted());
        assert_eq!(state.raw_text, r#"{"a":1,"b":[true,null]}"#);
    }

    #[test]
    fn test_load_ineligible_document_keeps_raw() {
        let file = document_file(
            r#"<html><head><title>页面</title></head><body><pre>{"a":1}</pre></body></html>"#,
        );
        let mut state = ViewState::default();
        let outcome = state.load_document(file.path()).expect("加载应成功");

        assert!(matches!(outcome, LoadOutcome::Unformatted { .. }));
        assert!(!state.is_formatted());
        assert_eq!(state.mode, DisplayMode::Raw);
        assert!(state.raw_text.contains("<title>"), "不合格时保留整份原文");
        assert!(state.rows().is_empty());
    }

    #[test]
    fn test_initial_state_is_fully_expanded() {
        let state = install(json!({"a": {"b": 1}, "c": [2]}));
        for id in 0..state.flat.len() {
            assert!(!state.is_collapsed(id), "初始状态所有容器都应展开");
        }
    }

    #[test]
    fn test_plain_toggle_affects_only_target() {
        let mut state = install(json!({"a": {"x": 1}, "b": {"y": 2}}));
        // 下标：0根、1 a、2 x、3 b、4 y
        state.toggle_collapse(1, false);
        assert!(state.is_collapsed(1));
        assert!(!state.is_collapsed(0));
        assert!(!state.is_collapsed(3), "普通点击不波及兄弟容器");
    }

    #[test]
    fn test_collapse_then_expand_is_inverse() {
        let mut state = install(json!({"a": {"x": 1}}));
        let label_before = state.flat[1].size_label.clone();

        state.toggle_collapse(1, false);
        assert!(state.is_collapsed(1));
        state.toggle_collapse(1, false);
        assert!(!state.is_collapsed(1), "折叠再展开应回到原状");

        // 尺寸标注在切换中保持不变
        assert_eq!(state.flat[1].size_label, label_before);
    }

    #[test]
    fn test_modifier_toggle_affects_sibling_group() {
        let state_value = json!({
            "a": {"x": 1},
            "b": {"y": {"deep": 2}},
            "c": 3,
            "d": [4]
        });
        // 下标：0根、1 a、2 x、3 b、4 y、5 deep、6 c、7 d、8 4
        let mut state = install(state_value);

        state.toggle_collapse(1, true);

        // a 的父级是根，兄弟组是根的直接子级：a、b、d 被折叠
        assert!(state.is_collapsed(1));
        assert!(state.is_collapsed(3));
        assert!(state.is_collapsed(7));
        // 更深的后代与不可折叠的兄弟不受影响
        assert!(!state.is_collapsed(4), "修饰键作用于同一代，不递归后代");
        assert!(!state.is_collapsed(0), "根不在兄弟组内");
        assert!(!state.is_collapsed(6), "标量没有折叠状态");
    }

    #[test]
    fn test_modifier_expand_affects_sibling_group() {
        let mut state = install(json!({"a": {"x": 1}, "b": {"y": 2}}));
        state.toggle_collapse(1, true);
        assert!(state.is_collapsed(1) && state.is_collapsed(3));

        // 在折叠的 a 上修饰点击：整个兄弟组展开
        state.toggle_collapse(1, true);
        assert!(!state.is_collapsed(1));
        assert!(!state.is_collapsed(3));
    }

    #[test]
    fn test_toggle_ignores_non_collapsible_targets() {
        let mut state = install(json!({"a": 1, "e": {}}));
        state.toggle_collapse(1, false);
        state.toggle_collapse(2, false);
        state.toggle_collapse(99, false);
        for id in 0..state.flat.len() {
            assert!(!state.is_collapsed(id), "标量与空容器不应进入折叠状态");
        }
    }

    #[test]
    fn test_collapsed_rows_hide_inner_block() {
        let mut state = install(json!({"b": [true, null]}));
        let expanded_rows = state.rows().len();

        state.toggle_collapse(1, false);
        let rows = state.rows();
        assert!(rows.len() < expanded_rows, "折叠后内部块不再可见");
        assert!(
            rows.iter().all(|r| !matches!(r.kind, ValueKind::Bool)),
            "被折叠的子节点不应出现"
        );
        assert!(rows[1].collapsed && rows[1].ellipsis);
    }

    #[test]
    fn test_mode_toggle_is_idempotent() {
        let mut state = install(json!({"a": 1}));
        assert_eq!(state.mode, DisplayMode::Parsed);

        assert!(!state.set_mode(DisplayMode::Parsed), "选中已选项是无操作");
        assert!(state.set_mode(DisplayMode::Raw));
        assert!(!state.set_mode(DisplayMode::Raw));
        assert!(state.set_mode(DisplayMode::Parsed));
    }

    #[test]
    fn test_parsed_mode_requires_formatted_document() {
        let mut state = ViewState::default();
        assert!(!state.set_mode(DisplayMode::Parsed), "未格式化时不能切到解析视图");
        assert_eq!(state.mode, DisplayMode::Raw);
    }

    #[test]
    fn test_jsonpath_derivation() {
        let state = install(json!({
            "normal_key": 1,
            "key with spaces": 2,
            "items": [{"id": 3}, [4]]
        }));
        let paths: Vec<&str> = (0..state.flat.len())
            .map(|i| state.node_path(i).expect("每个节点都应有路径"))
            .collect();

        assert_eq!(paths[0], "$");
        assert!(paths.contains(&"$.normal_key"));
        assert!(paths.contains(&"$['key with spaces']"));
        assert!(paths.contains(&"$.items"));
        assert!(paths.contains(&"$.items[0]"));
        assert!(paths.contains(&"$.items[0].id"));
        assert!(paths.contains(&"$.items[1]"));
        assert!(paths.contains(&"$.items[1][0]"));
    }

    #[test]
    fn test_extract_subtree_pretty() {
        let state = install(json!({"user": {"name": "张三", "age": 30}}));
        let pretty = state
            .extract_subtree_pretty("$.user")
            .expect("提取用户对象应成功");
        assert!(pretty.contains("张三"));

        assert!(
            state.extract_subtree_pretty("$.nonexistent").is_err(),
            "无效路径应返回错误"
        );
    }

    #[test]
    fn test_extract_before_load_is_state_error() {
        let state = ViewState::default();
        let err = state.extract_subtree_pretty("$").expect_err("未加载时应报状态错误");
        assert!(matches!(err, AppError::State(_)));
    }
}
