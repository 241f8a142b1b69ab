//! 性能基准测试模块
//!
//! 用于测试大文档分类、渲染树构建和可见行推导的性能
//! 构建始终是急切且同步的；渲染成本靠行虚拟化兜底

use std::time::Instant;

use serde_json::{json, Value};

use crate::model::classifier::classify_document;
use crate::model::render_tree::{build, flatten, visible_rows};

/// 性能测试结果
#[derive(Debug)]
pub struct PerformanceResult {
    pub operation: String,
    pub duration_ms: u128,
    pub success: bool,
    pub details: String,
}

impl PerformanceResult {
    pub fn new(operation: &str, duration_ms: u128, success: bool, details: &str) -> Self {
        Self {
            operation: operation.to_string(),
            duration_ms,
            success,
            details: details.to_string(),
        }
    }
}

/// 生成大型测试JSON数据
pub fn generate_large_json(depth: usize, width: usize) -> Value {
    fn create_nested_object(current_depth: usize, max_depth: usize, width: usize) -> Value {
        if current_depth >= max_depth {
            return json!("叶子节点值");
        }

        let mut obj = serde_json::Map::new();
        for i in 0..width {
            let key = format!("field_{}", i);
            let value = match i % 5 {
                0 => json!(format!("字符串值_{}", i)),
                1 => json!(i as i64),
                2 => json!(i % 2 == 0),
                3 => json!([1, 2, 3, i]),
                4 => create_nested_object(current_depth + 1, max_depth, width / 2),
                _ => json!(null),
            };
            obj.insert(key, value);
        }
        Value::Object(obj)
    }

    let mut root = serde_json::Map::new();
    root.insert(
        "metadata".to_string(),
        json!({
            "depth": depth,
            "width": width,
            "description": "性能测试用大型JSON文档",
            "endpoint": "https://example.com/api/v1/数据"
        }),
    );
    root.insert("data".to_string(), create_nested_object(0, depth, width));

    let large_array: Vec<Value> = (0..width * 10)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("项目_{}", i),
                "value": i * 2,
                "active": i % 3 == 0
            })
        })
        .collect();
    root.insert("items".to_string(), json!(large_array));

    Value::Object(root)
}

/// 把报文包进浏览器为裸JSON响应生成的包装页
pub fn wrap_payload_in_document(payload: &str) -> String {
    let escaped = payload
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<html><head></head><body><pre>{}</pre></body></html>",
        escaped
    )
}

/// 测试整页分类性能
pub fn benchmark_classification(html: &str) -> PerformanceResult {
    let start = Instant::now();
    let classification = classify_document(html);
    let duration = start.elapsed();

    PerformanceResult::new(
        "文档分类",
        duration.as_millis(),
        classification.is_eligible(),
        &format!("输入 {} 字节", html.len()),
    )
}

/// 测试渲染树构建与展平性能
pub fn benchmark_render_tree(json_data: &Value) -> PerformanceResult {
    let start = Instant::now();
    let root = build(json_data, None);
    let flat = flatten(&root);
    let duration = start.elapsed();

    let success = !flat.is_empty();
    let details = format!("构建了 {} 个节点", flat.len());
    PerformanceResult::new("渲染树构建", duration.as_millis(), success, &details)
}

/// 测试全展开状态下的可见行推导性能
pub fn benchmark_visible_rows(json_data: &Value) -> PerformanceResult {
    let root = build(json_data, None);
    let flat = flatten(&root);
    let collapsed = vec![false; flat.len()];

    let start = Instant::now();
    let rows = visible_rows(&flat, &collapsed);
    let duration = start.elapsed();

    PerformanceResult::new(
        "可见行推导",
        duration.as_millis(),
        !rows.is_empty(),
        &format!("推导了 {} 行", rows.len()),
    )
}

/// 运行综合性能测试
pub fn run_performance_suite() -> Vec<PerformanceResult> {
    let mut results = Vec::new();

    // 测试不同规模的数据
    let test_cases = [
        (3, 10), // 小型：深度3，宽度10
        (4, 20), // 中型：深度4，宽度20
        (5, 30), // 大型：深度5，宽度30
    ];

    for (depth, width) in test_cases {
        let json_data = generate_large_json(depth, width);
        let json_str = match serde_json::to_string(&json_data) {
            Ok(s) => s,
            Err(e) => {
                results.push(PerformanceResult::new(
                    &format!("数据序列化({}x{})", depth, width),
                    0,
                    false,
                    &format!("序列化失败: {}", e),
                ));
                continue;
            }
        };

        let html = wrap_payload_in_document(&json_str);
        results.push(benchmark_classification(&html));
        results.push(benchmark_render_tree(&json_data));
        results.push(benchmark_visible_rows(&json_data));
    }

    results
}
