//! 主题解析：从持久化偏好解析浅色/深色配色
//!
//! 深色不是独立配色，而是叠加在浅色基底上的覆盖；跟随系统时两套
//! 配色同时下发，由界面按OS配色信号现场选择

/// 持久化的主题偏好
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemePreference {
    ForceLight,
    ForceDark,
    /// 缺省值；偏好缺失或无法识别时也落到这里
    System,
}

impl ThemePreference {
    /// 从存储值解析；无法识别的值一律按跟随系统处理
    pub fn from_storage_value(value: Option<&str>) -> Self {
        match value {
            Some("force_light") => ThemePreference::ForceLight,
            Some("force_dark") => ThemePreference::ForceDark,
            _ => ThemePreference::System,
        }
    }

    pub fn storage_value(&self) -> &'static str {
        match self {
            ThemePreference::ForceLight => "force_light",
            ThemePreference::ForceDark => "force_dark",
            ThemePreference::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const fn rgb(r: u8, g: u8, b: u8) -> Rgb {
    Rgb { r, g, b }
}

/// 一套完整配色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub background: Rgb,
    pub panel: Rgb,
    pub text: Rgb,
    pub key: Rgb,
    pub string_value: Rgb,
    /// 数字、布尔、null 共用
    pub literal_value: Rgb,
    pub link: Rgb,
    pub size_comment: Rgb,
    pub ellipsis: Rgb,
    pub guide_line: Rgb,
    pub affordance: Rgb,
}

/// 浅色基底
pub fn light_palette() -> ThemeColors {
    ThemeColors {
        background: rgb(0xff, 0xff, 0xff),
        panel: rgb(0xff, 0xff, 0xff),
        text: rgb(0x44, 0x44, 0x44),
        key: rgb(0x00, 0x00, 0x00),
        string_value: rgb(0x0b, 0x75, 0x00),
        literal_value: rgb(0x1a, 0x01, 0xcc),
        link: rgb(0x00, 0x55, 0x00),
        size_comment: rgb(0xaa, 0xaa, 0xaa),
        ellipsis: rgb(0x88, 0x88, 0x88),
        guide_line: rgb(0xbb, 0xbb, 0xbb),
        affordance: rgb(0x00, 0x00, 0x00),
    }
}

/// 深色覆盖：假定浅色规则已是基底，只改写需要反转的项
pub fn apply_dark_overrides(base: ThemeColors) -> ThemeColors {
    ThemeColors {
        background: rgb(0x1a, 0x1a, 0x1a),
        panel: rgb(0x1a, 0x1a, 0x1a),
        text: rgb(0xb6, 0xb6, 0xb6),
        key: rgb(0xff, 0xff, 0xff),
        string_value: rgb(0x12, 0xb2, 0x00),
        literal_value: rgb(0x66, 0xcc, 0xff),
        link: rgb(0x3a, 0xf4, 0x25),
        size_comment: rgb(0x70, 0x70, 0x70),
        guide_line: rgb(0x4d, 0x4d, 0x4d),
        affordance: rgb(0xff, 0xff, 0xff),
        ..base
    }
}

/// 解析结果：固定一套，或两套齐备、由OS信号现场切换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTheme {
    Fixed(ThemeColors),
    System {
        light: ThemeColors,
        dark: ThemeColors,
    },
}

/// 把偏好解析为具体配色；格式化视图揭示前必须完成并注入
pub fn resolve(preference: ThemePreference) -> ResolvedTheme {
    match preference {
        ThemePreference::ForceLight => ResolvedTheme::Fixed(light_palette()),
        ThemePreference::ForceDark => ResolvedTheme::Fixed(apply_dark_overrides(light_palette())),
        ThemePreference::System => ResolvedTheme::System {
            light: light_palette(),
            dark: apply_dark_overrides(light_palette()),
        },
    }
}
