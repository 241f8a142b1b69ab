//! 分类器：判断加载的文档是否为裸JSON报文页
//!
//! 对整页做一次性检查：有标题、有正文元素、候选块缺失或隐藏、
//! 超长、起始字符不对、解析失败，任何一条命中即不格式化

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

/// 超过该字符数的文档直接拒绝，不再尝试解析
pub const MAX_RAW_LENGTH: usize = 3_000_000;

/// 竞争格式化器的容器类名，安装格式化视图后需要抑制
pub const CONFLICTING_FORMATTER_CLASS: &str = "json-formatter-container";

// 机器可读的不合格原因（对外稳定，不要改写）
pub const NOTE_TITLE_CONTENTFUL: &str = "document title is contentful";
pub const NOTE_MULTIPLE_BLOCKS: &str = "multiple candidate blocks";
pub const NOTE_TEXTUAL_ELEMENTS: &str = "body contains textual elements";
pub const NOTE_NO_CANDIDATE: &str = "no candidate block";
pub const NOTE_NOT_RENDERED: &str = "candidate block is not rendered";
pub const NOTE_NO_CONTENT: &str = "no content in candidate block";
pub const NOTE_TOO_LONG: &str = "too long";
pub const NOTE_NOT_JSON_START: &str = "does not start with { or [";
pub const NOTE_PARSE_FAILED: &str = "does not parse as JSON";
pub const NOTE_SCALAR: &str = "technically valid JSON but not an object or array";

/// 分类结果：每次文档加载只产生一次
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// 可格式化：携带候选块原文、字符数、解析值与冲突容器计数
    Eligible {
        raw_text: String,
        raw_length: usize,
        parsed: Value,
        conflicting_blocks: usize,
    },
    /// 不可格式化：携带稳定原因；已知时附带原文字符数
    Ineligible {
        note: &'static str,
        raw_length: Option<usize>,
    },
}

impl Classification {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Classification::Eligible { .. })
    }
}

/// 对已加载的文档文本做整页分类，规则按序判定，首个命中即返回
pub fn classify_document(html: &str) -> Classification {
    let document = Html::parse_document(html);

    // 规则1：标题非空说明是正式页面，不是裸协议输出
    if !document_title(&document).is_empty() {
        return Classification::Ineligible {
            note: NOTE_TITLE_CONTENTFUL,
            raw_length: None,
        };
    }

    // 规则2/3：扫描 body 直接子元素，候选块必须唯一且不与正文元素共存
    let Some(body) = select_first(&document, "body") else {
        return Classification::Ineligible {
            note: NOTE_NO_CANDIDATE,
            raw_length: None,
        };
    };
    let mut candidate: Option<ElementRef> = None;
    for child in body.children() {
        let Some(el) = ElementRef::wrap(child) else {
            continue;
        };
        match el.value().name() {
            "pre" => {
                if candidate.is_some() {
                    return Classification::Ineligible {
                        note: NOTE_MULTIPLE_BLOCKS,
                        raw_length: None,
                    };
                }
                candidate = Some(el);
            }
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                return Classification::Ineligible {
                    note: NOTE_TEXTUAL_ELEMENTS,
                    raw_length: None,
                };
            }
            _ => {}
        }
    }
    let Some(block) = candidate else {
        return Classification::Ineligible {
            note: NOTE_NO_CANDIDATE,
            raw_length: None,
        };
    };

    // 规则4：被内联样式或 hidden 属性隐藏的块不渲染
    if !is_rendered(&block) {
        return Classification::Ineligible {
            note: NOTE_NOT_RENDERED,
            raw_length: None,
        };
    }

    // 规则5/6：空内容与超长内容都只报告长度，不进入解析
    let raw_text: String = block.text().collect();
    if raw_text.is_empty() {
        return Classification::Ineligible {
            note: NOTE_NO_CONTENT,
            raw_length: Some(0),
        };
    }
    let raw_length = raw_text.chars().count();
    if raw_length > MAX_RAW_LENGTH {
        return Classification::Ineligible {
            note: NOTE_TOO_LONG,
            raw_length: Some(raw_length),
        };
    }

    // 规则7：先做廉价的起始字符过滤，再尝试完整解析
    // 空白只认空格、制表、回车、换行
    let first = raw_text
        .chars()
        .find(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'));
    if !matches!(first, Some('{') | Some('[')) {
        return Classification::Ineligible {
            note: NOTE_NOT_JSON_START,
            raw_length: Some(raw_length),
        };
    }

    // 规则8：解析失败与标量结果都视为不合格，不向上抛错
    match serde_json::from_str::<Value>(&raw_text) {
        Ok(parsed @ (Value::Object(_) | Value::Array(_))) => {
            let conflicting_blocks = count_conflicting_blocks(&document);
            Classification::Eligible {
                raw_text,
                raw_length,
                parsed,
                conflicting_blocks,
            }
        }
        Ok(_) => Classification::Ineligible {
            note: NOTE_SCALAR,
            raw_length: Some(raw_length),
        },
        Err(_) => Classification::Ineligible {
            note: NOTE_PARSE_FAILED,
            raw_length: Some(raw_length),
        },
    }
}

fn document_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    Selector::parse(selector)
        .ok()
        .and_then(|sel| document.select(&sel).next())
}

/// 统计页面中竞争格式化器遗留的容器数量
fn count_conflicting_blocks(document: &Html) -> usize {
    Selector::parse(&format!(".{}", CONFLICTING_FORMATTER_CLASS))
        .ok()
        .map(|sel| document.select(&sel).count())
        .unwrap_or(0)
}

/// 无布局引擎，可见性只看 hidden 属性和内联样式
fn is_rendered(el: &ElementRef) -> bool {
    if el.value().attr("hidden").is_some() {
        return false;
    }
    if let Some(style) = el.value().attr("style") {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if style.contains("display:none") || style.contains("visibility:hidden") {
            return false;
        }
    }
    true
}
