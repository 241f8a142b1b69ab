//! IO helper: document loading and theme preference persistence

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::theme::ThemePreference;
use crate::model::view_state::AppError;

/// 读取待分类的文档文本
pub fn read_document_text(p: &Path) -> Result<String, AppError> {
    Ok(fs::read_to_string(p)?)
}

/// 持久化的设置文件内容；只有一个键
#[derive(Debug, Serialize, Deserialize)]
struct Settings {
    theme_override: String,
}

/// 设置文件位置：用户配置目录下的固定路径
pub fn settings_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("json_geshihua").join("settings.json"))
}

/// 读取主题偏好；文件缺失、损坏或取值无法识别时一律回落到跟随系统
pub fn read_theme_preference() -> ThemePreference {
    match settings_file_path() {
        Some(p) => read_theme_preference_from(&p),
        None => ThemePreference::System,
    }
}

pub fn read_theme_preference_from(p: &Path) -> ThemePreference {
    let Ok(text) = fs::read_to_string(p) else {
        return ThemePreference::System;
    };
    match serde_json::from_str::<Settings>(&text) {
        Ok(settings) => ThemePreference::from_storage_value(Some(&settings.theme_override)),
        Err(e) => {
            tracing::warn!("设置文件无法解析，回落到跟随系统: {}", e);
            ThemePreference::System
        }
    }
}

/// 写回主题偏好（设置界面的出口；核心本身只读）
pub fn write_theme_preference(pref: ThemePreference) -> Result<(), AppError> {
    let p = settings_file_path()
        .ok_or_else(|| AppError::State("无法定位用户配置目录".into()))?;
    write_theme_preference_to(&p, pref)
}

pub fn write_theme_preference_to(p: &Path, pref: ThemePreference) -> Result<(), AppError> {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent)?;
    }
    let settings = Settings {
        theme_override: pref.storage_value().to_string(),
    };
    fs::write(p, serde_json::to_string_pretty(&settings)?)?;
    Ok(())
}
