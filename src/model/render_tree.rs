//! 渲染树：把解析后的JSON值映射为可折叠、可着色的渲染节点
//!
//! build 一次性构建整棵树；flatten 产出先序排列的扁平节点（含子树范围
//! 与分隔符记账）；visible_rows 按折叠状态推导界面可见行

use serde_json::Value;

/// JSON 值的六种类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Bool,
    Null,
    Object,
    Array,
}

/// 一次性判定值类型：先字符串/数字，再布尔/空哨兵，最后数组对对象
pub fn kind_of(v: &Value) -> ValueKind {
    match v {
        Value::String(_) => ValueKind::String,
        Value::Number(_) => ValueKind::Number,
        Value::Bool(_) => ValueKind::Bool,
        Value::Null => ValueKind::Null,
        Value::Array(_) => ValueKind::Array,
        Value::Object(_) => ValueKind::Object,
    }
}

/// 渲染节点：一个JSON值实例在其父级语境下的视觉形态
///
/// 树在构建后不再变化；折叠状态由视图层单独持有
#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub kind: ValueKind,
    /// 区分 "键: 值" 条目与裸数组元素
    pub is_object_property: bool,
    /// 原始键名（未转义），仅对象属性持有；文档根没有键
    pub key: Option<String>,
    /// 标量为0；容器为条目数
    pub child_count: usize,
    pub children: Vec<RenderNode>,
    /// 容器的 "<n> item(s)" 标注；标量为空
    pub size_label: String,
    /// 标量显示文本；字符串已按JSON规则转义，不含外层引号
    pub text: String,
    /// URL样式字符串的链接目标（原始未转义值）
    pub link: Option<String>,
}

impl RenderNode {
    /// 是否挂出展开/折叠标记；必须与省略号、尺寸标注的记账严格一致
    pub fn is_collapsible(&self) -> bool {
        matches!(self.kind, ValueKind::Object | ValueKind::Array) && self.child_count > 0
    }
}

/// 按JSON字符串规则转义（引号、反斜杠、控制字符），不含外层引号
pub fn escape_json_str(s: &str) -> String {
    let quoted = Value::String(s.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// 以 http(s):// 或 / 开头的字符串渲染为链接
fn link_target(s: &str) -> Option<String> {
    if s.starts_with("https://") || s.starts_with("http://") || s.starts_with('/') {
        Some(s.to_string())
    } else {
        None
    }
}

fn size_label(n: usize) -> String {
    format!("{} {}", n, if n == 1 { "item" } else { "items" })
}

/// 构建渲染树。`property_key` 为 Some 表示该值绑定在对象键下，
/// None 表示裸数组元素或文档根
///
/// 输入默认已通过分类器校验；类型判定与值形态不一致属编程错误，直接崩溃
pub fn build(value: &Value, property_key: Option<&str>) -> RenderNode {
    let kind = kind_of(value);
    let (child_count, has_children) = match value {
        Value::Object(map) => (map.len(), !map.is_empty()),
        Value::Array(arr) => (arr.len(), !arr.is_empty()),
        _ => (0, false),
    };

    let mut node = RenderNode {
        kind,
        is_object_property: property_key.is_some(),
        key: property_key.map(str::to_string),
        child_count,
        children: Vec::with_capacity(child_count),
        size_label: String::new(),
        text: String::new(),
        link: None,
    };

    match kind {
        ValueKind::String => {
            let Value::String(s) = value else {
                unreachable!("类型判定为字符串但值不是字符串");
            };
            node.text = escape_json_str(s);
            node.link = link_target(s);
        }
        ValueKind::Number => {
            let Value::Number(n) = value else {
                unreachable!("类型判定为数字但值不是数字");
            };
            node.text = n.to_string();
        }
        ValueKind::Bool => {
            let Value::Bool(b) = value else {
                unreachable!("类型判定为布尔但值不是布尔");
            };
            node.text = if *b { "true" } else { "false" }.to_string();
        }
        ValueKind::Null => {
            node.text = "null".to_string();
        }
        ValueKind::Object => {
            let Value::Object(map) = value else {
                unreachable!("类型判定为对象但值不是对象");
            };
            if has_children {
                for (k, child) in map {
                    node.children.push(build(child, Some(k)));
                }
            }
            node.size_label = size_label(child_count);
        }
        ValueKind::Array => {
            let Value::Array(arr) = value else {
                unreachable!("类型判定为数组但值不是数组");
            };
            if has_children {
                for child in arr {
                    node.children.push(build(child, None));
                }
            }
            node.size_label = size_label(child_count);
        }
    }
    node
}

/// 扁平化节点：先序排列，持有父下标、深度与子树范围
#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode {
    pub parent: Option<usize>,
    pub depth: u32,
    /// 先序排列中本子树之后的第一个下标
    pub subtree_end: usize,
    pub kind: ValueKind,
    pub is_object_property: bool,
    pub key: Option<String>,
    pub child_count: usize,
    pub collapsible: bool,
    pub size_label: String,
    pub text: String,
    pub link: Option<String>,
    /// 末位兄弟不带分隔逗号
    pub last_sibling: bool,
}

/// 将渲染树展平为先序数组，供折叠状态与可见行推导使用
pub fn flatten(root: &RenderNode) -> Vec<FlatNode> {
    fn walk(
        out: &mut Vec<FlatNode>,
        node: &RenderNode,
        parent: Option<usize>,
        depth: u32,
        last_sibling: bool,
    ) {
        // 容器的子节点数必须与记账一致，否则折叠标记会指向不存在的内容
        assert_eq!(
            node.children.len(),
            node.child_count,
            "容器子节点数与记账不一致"
        );

        let id = out.len();
        out.push(FlatNode {
            parent,
            depth,
            subtree_end: 0,
            kind: node.kind,
            is_object_property: node.is_object_property,
            key: node.key.clone(),
            child_count: node.child_count,
            collapsible: node.is_collapsible(),
            size_label: node.size_label.clone(),
            text: node.text.clone(),
            link: node.link.clone(),
            last_sibling,
        });

        let n = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            walk(out, child, Some(id), depth + 1, i + 1 == n);
        }
        out[id].subtree_end = out.len();
    }

    let mut out = Vec::new();
    walk(&mut out, root, None, 0, true);
    out
}

/// 界面可见的一行：节点行，或展开容器的收尾行
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRow {
    /// 对应 FlatNode 下标；收尾行沿用其容器的下标
    pub id: usize,
    pub depth: u32,
    pub kind: ValueKind,
    pub is_close: bool,
    pub collapsible: bool,
    pub collapsed: bool,
    /// 含引号与冒号的键文本；无键为空
    pub key_text: String,
    /// 标量显示文本；字符串含外层引号
    pub value_text: String,
    pub open_token: String,
    pub close_token: String,
    pub ellipsis: bool,
    pub comma: bool,
    /// 容器行始终携带尺寸标注（折叠与否皆然）；收尾行为空
    pub size_label: String,
    pub link: String,
}

impl RenderRow {
    fn for_node(node: &FlatNode, id: usize) -> RenderRow {
        RenderRow {
            id,
            depth: node.depth,
            kind: node.kind,
            is_close: false,
            collapsible: node.collapsible,
            collapsed: false,
            key_text: node
                .key
                .as_deref()
                .map(|k| format!("\"{}\": ", escape_json_str(k)))
                .unwrap_or_default(),
            value_text: String::new(),
            open_token: String::new(),
            close_token: String::new(),
            ellipsis: false,
            comma: false,
            size_label: node.size_label.clone(),
            link: String::new(),
        }
    }
}

/// 按折叠状态推导可见行。折叠容器单行呈现：开闭括号保持可见，
/// 中间是省略号，行尾跟尺寸标注；展开容器另起收尾行
pub fn visible_rows(flat: &[FlatNode], collapsed: &[bool]) -> Vec<RenderRow> {
    assert_eq!(flat.len(), collapsed.len(), "折叠状态与节点数不一致");
    let mut out = Vec::new();
    if !flat.is_empty() {
        emit(flat, collapsed, 0, &mut out);
    }
    out
}

fn emit(flat: &[FlatNode], collapsed: &[bool], id: usize, out: &mut Vec<RenderRow>) {
    let node = &flat[id];
    let comma = !node.last_sibling;

    match node.kind {
        ValueKind::Object | ValueKind::Array => {
            let (open, close) = match node.kind {
                ValueKind::Object => ("{", "}"),
                _ => ("[", "]"),
            };
            let mut row = RenderRow::for_node(node, id);
            row.open_token = open.to_string();

            if !node.collapsible {
                // 空容器：单行 {} / []，无省略号也无折叠标记
                row.close_token = close.to_string();
                row.comma = comma;
                out.push(row);
            } else if collapsed[id] {
                row.collapsed = true;
                row.ellipsis = true;
                row.close_token = close.to_string();
                row.comma = comma;
                out.push(row);
            } else {
                out.push(row);
                let mut child = id + 1;
                while child < node.subtree_end {
                    emit(flat, collapsed, child, out);
                    child = flat[child].subtree_end;
                }
                let mut close_row = RenderRow::for_node(node, id);
                close_row.is_close = true;
                close_row.key_text = String::new();
                close_row.size_label = String::new();
                close_row.close_token = close.to_string();
                close_row.comma = comma;
                out.push(close_row);
            }
        }
        _ => {
            let mut row = RenderRow::for_node(node, id);
            row.value_text = match node.kind {
                ValueKind::String => format!("\"{}\"", node.text),
                _ => node.text.clone(),
            };
            row.comma = comma;
            row.link = node.link.clone().unwrap_or_default();
            out.push(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// 从渲染树的可见文本反推原值（字符串经反转义），用于往返校验
    fn reconstruct(node: &RenderNode) -> Value {
        match node.kind {
            ValueKind::String => {
                serde_json::from_str(&format!("\"{}\"", node.text)).expect("转义文本应可反解析")
            }
            ValueKind::Number => serde_json::from_str(&node.text).expect("数字文本应可反解析"),
            ValueKind::Bool => Value::Bool(node.text == "true"),
            ValueKind::Null => Value::Null,
            ValueKind::Object => {
                let mut map = serde_json::Map::new();
                for child in &node.children {
                    let key = child.key.clone().expect("对象子节点应有键");
                    map.insert(key, reconstruct(child));
                }
                Value::Object(map)
            }
            ValueKind::Array => Value::Array(node.children.iter().map(reconstruct).collect()),
        }
    }

    #[test]
    fn test_example_document_shape() {
        let value = json!({"a": 1, "b": [true, null]});
        let root = build(&value, None);

        assert_eq!(root.kind, ValueKind::Object);
        assert!(!root.is_object_property, "文档根不是对象属性");
        assert_eq!(root.child_count, 2);
        assert_eq!(root.size_label, "2 items");

        let b = &root.children[1];
        assert_eq!(b.key.as_deref(), Some("b"));
        assert_eq!(b.kind, ValueKind::Array);
        assert_eq!(b.size_label, "2 items");
        assert_eq!(b.children[0].kind, ValueKind::Bool);
        assert_eq!(b.children[0].text, "true");
        assert_eq!(b.children[1].kind, ValueKind::Null);
        assert_eq!(b.children[1].text, "null");
        assert!(
            !b.children[0].is_object_property,
            "数组元素不是对象属性"
        );
    }

    #[test]
    fn test_singular_size_label() {
        let root = build(&json!({"only": 1}), None);
        assert_eq!(root.size_label, "1 item");
    }

    #[test]
    fn test_empty_containers_are_not_collapsible() {
        let obj = build(&json!({}), None);
        assert_eq!(obj.child_count, 0);
        assert!(!obj.is_collapsible(), "空对象不应有折叠标记");
        assert_eq!(obj.size_label, "0 items");

        let arr = build(&json!([]), None);
        assert!(!arr.is_collapsible(), "空数组不应有折叠标记");
        assert_eq!(arr.size_label, "0 items");
    }

    #[test]
    fn test_string_escaping() {
        let root = build(&json!("引号\"反斜杠\\换行\n制表\t"), None);
        assert_eq!(root.text, "引号\\\"反斜杠\\\\换行\\n制表\\t");
    }

    #[test]
    fn test_control_characters_are_escaped() {
        let root = build(&json!("\u{0001}"), None);
        assert_eq!(root.text, "\\u0001");
    }

    #[test]
    fn test_key_is_escaped_in_rows() {
        let value = json!({"键\"带引号": 1});
        let flat = flatten(&build(&value, None));
        let rows = visible_rows(&flat, &vec![false; flat.len()]);
        assert_eq!(rows[1].key_text, "\"键\\\"带引号\": ");
    }

    #[test]
    fn test_link_detection() {
        for s in ["https://example.com/a", "http://example.com", "/path/to/x"] {
            let node = build(&json!(s), None);
            assert_eq!(node.link.as_deref(), Some(s), "{} 应渲染为链接", s);
        }
        for s in ["example.com", "ftp://example.com", "相对路径", ""] {
            let node = build(&json!(s), None);
            assert!(node.link.is_none(), "{} 不应渲染为链接", s);
        }
    }

    #[test]
    fn test_number_canonical_text() {
        assert_eq!(build(&json!(42), None).text, "42");
        assert_eq!(build(&json!(-1.5), None).text, "-1.5");
        assert_eq!(build(&json!(0), None).text, "0");
    }

    #[test]
    fn test_round_trip_reconstruction() {
        let value = json!({
            "标题": "带\"引号\"与\\反斜杠",
            "url": "https://example.com/查询?q=1",
            "count": 42,
            "ratio": -0.25,
            "flags": [true, false, null],
            "nested": {"empty_obj": {}, "empty_arr": [], "deep": [{"x": 1}]}
        });
        let root = build(&value, None);
        assert_eq!(reconstruct(&root), value, "渲染后反推应还原原值");
    }

    #[test]
    fn test_flatten_preorder_and_subtree_extent() {
        let value = json!({"a": {"b": 1}, "c": [2, 3]});
        let flat = flatten(&build(&value, None));

        // 先序：根、a、b、c、2、3
        assert_eq!(flat.len(), 6);
        assert_eq!(flat[0].parent, None);
        assert_eq!(flat[0].subtree_end, 6);
        assert_eq!(flat[1].key.as_deref(), Some("a"));
        assert_eq!(flat[1].parent, Some(0));
        assert_eq!(flat[1].subtree_end, 3);
        assert_eq!(flat[2].depth, 2);
        assert_eq!(flat[3].key.as_deref(), Some("c"));
        assert_eq!(flat[3].subtree_end, 6);

        // 分隔符记账：a 非末位，c 为末位
        assert!(!flat[1].last_sibling);
        assert!(flat[3].last_sibling);
        assert!(!flat[4].last_sibling);
        assert!(flat[5].last_sibling);
    }

    #[test]
    fn test_visible_rows_fully_expanded() {
        let value = json!({"a": 1, "b": [true, null]});
        let flat = flatten(&build(&value, None));
        let rows = visible_rows(&flat, &vec![false; flat.len()]);

        // 根开行、a、b开行、true、null、b收尾、根收尾
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].open_token, "{");
        assert!(rows[0].close_token.is_empty());
        assert_eq!(rows[0].size_label, "2 items", "展开的容器行也携带尺寸标注");
        assert_eq!(rows[1].key_text, "\"a\": ");
        assert_eq!(rows[1].value_text, "1");
        assert!(rows[1].comma, "非末位条目带分隔逗号");
        assert_eq!(rows[2].open_token, "[");
        assert_eq!(rows[3].value_text, "true");
        assert!(rows[3].comma);
        assert_eq!(rows[4].value_text, "null");
        assert!(!rows[4].comma, "末位条目不带逗号");
        assert!(rows[5].is_close);
        assert_eq!(rows[5].close_token, "]");
        assert!(!rows[5].comma, "b 是末位属性，收尾行不带逗号");
        assert!(rows[6].is_close);
        assert_eq!(rows[6].close_token, "}");
    }

    #[test]
    fn test_visible_rows_collapsed_container() {
        let value = json!({"a": 1, "b": [true, null]});
        let flat = flatten(&build(&value, None));
        let mut collapsed = vec![false; flat.len()];
        // 折叠属性 b（下标2）
        collapsed[2] = true;
        let rows = visible_rows(&flat, &collapsed);

        // 根开行、a、b折叠行、根收尾
        assert_eq!(rows.len(), 4);
        let b = &rows[2];
        assert!(b.collapsed);
        assert!(b.ellipsis, "折叠行显示省略号");
        assert_eq!(b.open_token, "[", "开括号保持可见");
        assert_eq!(b.close_token, "]", "闭括号保持可见");
        assert_eq!(b.size_label, "2 items");
    }

    #[test]
    fn test_empty_container_renders_single_row() {
        let value = json!({"e": {}});
        let flat = flatten(&build(&value, None));
        let rows = visible_rows(&flat, &vec![false; flat.len()]);

        assert_eq!(rows.len(), 3);
        let e = &rows[1];
        assert_eq!(e.open_token, "{");
        assert_eq!(e.close_token, "}");
        assert!(!e.ellipsis, "空容器没有省略号");
        assert!(!e.collapsible);
        assert_eq!(e.size_label, "0 items");
    }

    #[test]
    fn test_string_row_includes_quotes_and_link() {
        let value = json!(["/path/to/x", "普通文本"]);
        let flat = flatten(&build(&value, None));
        let rows = visible_rows(&flat, &vec![false; flat.len()]);

        assert_eq!(rows[1].value_text, "\"/path/to/x\"");
        assert_eq!(rows[1].link, "/path/to/x", "链接目标是原始字符串本身");
        assert_eq!(rows[2].value_text, "\"普通文本\"");
        assert!(rows[2].link.is_empty());
    }
}
