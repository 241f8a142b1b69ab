//! 程序入口：初始化日志、加载 Slint UI，并接线视图控制器

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
    time::Instant,
};

use slint::{ComponentHandle, ModelRc, VecModel};
use tracing_subscriber::fmt::SubscriberBuilder;

slint::include_modules!();

mod model;
mod utils;
mod vm;

use model::render_tree::RenderRow;
use model::theme::{self, ResolvedTheme, Rgb, ThemeColors, ThemePreference};
use model::view_state::{DisplayMode, LoadOutcome, ViewState};
use vm::bridge::*;

// RenderRowData转换实现
impl From<&RenderRow> for RenderRowData {
    /// 将可见行转换为Slint可用的数据结构
    fn from(row: &RenderRow) -> Self {
        Self {
            id: row.id as i32,
            depth: row.depth as i32,
            kind: format!("{:?}", row.kind).into(), // String/Number/Object等
            is_close: row.is_close,
            collapsible: row.collapsible,
            collapsed: row.collapsed,
            key_text: row.key_text.clone().into(),
            value_text: row.value_text.clone().into(),
            open_token: row.open_token.clone().into(),
            close_token: row.close_token.clone().into(),
            ellipsis: row.ellipsis,
            comma: row.comma,
            size_label: row.size_label.clone().into(),
            link: row.link.clone().into(),
        }
    }
}

fn to_color(c: Rgb) -> slint::Color {
    slint::Color::from_rgb_u8(c.r, c.g, c.b)
}

fn to_colors_data(c: &ThemeColors) -> ThemeColorsData {
    ThemeColorsData {
        background: to_color(c.background),
        panel: to_color(c.panel),
        text: to_color(c.text),
        key: to_color(c.key),
        string_value: to_color(c.string_value),
        literal_value: to_color(c.literal_value),
        link: to_color(c.link),
        size_comment: to_color(c.size_comment),
        ellipsis: to_color(c.ellipsis),
        guide_line: to_color(c.guide_line),
        affordance: to_color(c.affordance),
    }
}

/// VM桥接器：管理UI与视图状态的交互
struct ViewModelBridge {
    state: Rc<RefCell<ViewState>>,
}

impl ViewModelBridge {
    /// 创建新的VM桥接器并绑定所有回调
    fn new(app_window: &AppWindow, state: Rc<RefCell<ViewState>>) -> Self {
        let bridge = Self { state };
        bridge.setup_callbacks(app_window);
        bridge
    }

    /// 设置所有UI回调函数
    fn setup_callbacks(&self, app_window: &AppWindow) {
        let state = self.state.clone();

        // === 打开文档回调 ===
        {
            let state = state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_open_document(move || {
                if let Some(app_window) = app_window_weak.upgrade() {
                    let Some(path) = Self::show_file_dialog() else {
                        app_window.set_status_message("未选择文件".into());
                        return;
                    };
                    Self::handle_load_document(&app_window, &state, &path);
                }
            });
        }

        // === 折叠/展开回调（委托式指针事件，目标过滤后到达这里） ===
        {
            let state = state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_toggle_node(move |id, with_modifier| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    Self::handle_toggle_node(&app_window, &state, id, with_modifier);
                }
            });
        }

        // === 原文/解析切换回调（互斥、幂等） ===
        {
            let state = state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_select_raw(move || {
                if let Some(app_window) = app_window_weak.upgrade() {
                    Self::handle_set_mode(&app_window, &state, DisplayMode::Raw);
                }
            });
        }
        {
            let state = state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_select_parsed(move || {
                if let Some(app_window) = app_window_weak.upgrade() {
                    Self::handle_set_mode(&app_window, &state, DisplayMode::Parsed);
                }
            });
        }

        // === 行选择回调 ===
        {
            let state = state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_row_selected(move |id| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    let st = state.borrow();
                    if let Some(path) = st.node_path(id as usize) {
                        app_window.set_selected_path(path.into());
                    }
                }
            });
        }

        // === 复制按钮回调 ===
        {
            let state = state.clone();
            let app_window_weak = app_window.as_weak();
            app_window.on_copy_pressed(move || {
                if let Some(app_window) = app_window_weak.upgrade() {
                    Self::handle_copy_pressed(&app_window, &state);
                }
            });
        }

        // === 链接回调 ===
        {
            let app_window_weak = app_window.as_weak();
            app_window.on_link_activated(move |url| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    Self::handle_link_activated(&app_window, &url.to_string());
                }
            });
        }

        // === 主题切换回调 ===
        {
            let app_window_weak = app_window.as_weak();
            app_window.on_set_theme(move |mode| {
                if let Some(app_window) = app_window_weak.upgrade() {
                    Self::handle_set_theme(&app_window, &mode.to_string());
                }
            });
        }
    }

    /// 初始化UI状态：主题先于任何内容注入
    fn initialize_ui(&self, app_window: &AppWindow) {
        let pref = utils::fs::read_theme_preference();
        Self::apply_theme(app_window, pref, &theme::resolve(pref));

        app_window.set_status_message(STATUS_READY.into());
        app_window.set_current_path("".into());
        app_window.set_selected_path("".into());
        app_window.set_performance_info("".into());
        app_window.set_raw_text("".into());
        app_window.set_document_formatted(false);
        app_window.set_show_raw(true);

        // 设置空的行模型
        let empty_model = ModelRc::new(VecModel::<RenderRowData>::default());
        app_window.set_row_model(empty_model);
    }

    /// 显示文件选择对话框
    fn show_file_dialog() -> Option<PathBuf> {
        use rfd::FileDialog;

        let file_path = FileDialog::new()
            .add_filter("文档文件", &["html", "htm", "json", "txt"])
            .add_filter("所有文件", &["*"])
            .set_title("选择要识别的文档")
            .pick_file();

        match file_path {
            Some(path) => {
                tracing::info!("用户选择了文件: {}", path.display());
                Some(path)
            }
            None => {
                tracing::info!("用户取消了文件选择");
                None
            }
        }
    }

    /// 处理文档加载：分类一次，合格则安装格式化视图
    fn handle_load_document(
        app_window: &AppWindow,
        state: &Rc<RefCell<ViewState>>,
        path: &Path,
    ) {
        app_window.set_status_message(STATUS_CLASSIFYING.into());
        let start_time = Instant::now();

        let load_result = state.borrow_mut().load_document(path);
        match load_result {
            Ok(LoadOutcome::Formatted {
                node_count,
                raw_length,
                conflicting_blocks,
            }) => {
                // 主题先行：样式未注入前不揭示解析视图
                let pref = utils::fs::read_theme_preference();
                Self::apply_theme(app_window, pref, &theme::resolve(pref));

                let (raw_text, row_data) = {
                    let st = state.borrow();
                    let rows: Vec<RenderRowData> =
                        st.rows().iter().map(RenderRowData::from).collect();
                    (st.raw_text.clone(), rows)
                };
                app_window.set_raw_text(raw_text.into());
                app_window.set_current_path(path.to_string_lossy().to_string().into());
                app_window.set_selected_path("".into());
                app_window.set_document_formatted(true);
                app_window.set_show_raw(false);

                if conflicting_blocks > 0 {
                    tracing::info!("已抑制 {} 个冲突的第三方格式化容器", conflicting_blocks);
                }

                let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
                let perf_info = format!(
                    "分类+构建: {:.2}ms | 节点: {} | 原文: {} 字符",
                    duration_ms, node_count, raw_length
                );
                app_window.set_performance_info(perf_info.into());

                // 树构建完成后先让事件循环排一帧，再挂接（可能很大的）行模型
                let app_window_weak = app_window.as_weak();
                slint::spawn_local(async move {
                    if let Some(app_window) = app_window_weak.upgrade() {
                        app_window.set_row_model(ModelRc::new(VecModel::from(row_data)));
                        app_window.set_status_message(STATUS_FORMATTED.into());
                    }
                })
                .unwrap();

                tracing::info!(
                    "格式化完成: {} 个节点，原文 {} 字符，耗时 {:.2}ms",
                    node_count,
                    raw_length,
                    duration_ms
                );
            }
            Ok(LoadOutcome::Unformatted { note, raw_length }) => {
                // 不合格：保持原样呈现，不激活格式化
                let raw_text = state.borrow().raw_text.clone();
                app_window.set_raw_text(raw_text.into());
                app_window.set_current_path(path.to_string_lossy().to_string().into());
                app_window.set_selected_path("".into());
                app_window.set_document_formatted(false);
                app_window.set_show_raw(true);
                app_window.set_row_model(ModelRc::new(VecModel::<RenderRowData>::default()));
                app_window
                    .set_status_message(format!("{}{}", STATUS_UNFORMATTED_PREFIX, note).into());

                tracing::info!("文档不符合格式化条件: {}（已知长度 {:?}）", note, raw_length);
            }
            Err(e) => {
                let error_msg = format!("{}{}", STATUS_ERROR_PREFIX, e);
                app_window.set_status_message(error_msg.into());
                tracing::error!("文档加载失败: {}", e);
            }
        }
    }

    /// 处理折叠/展开切换
    fn handle_toggle_node(
        app_window: &AppWindow,
        state: &Rc<RefCell<ViewState>>,
        id: i32,
        with_modifier: bool,
    ) {
        state.borrow_mut().toggle_collapse(id as usize, with_modifier);
        Self::refresh_rows(app_window, state);

        let st = state.borrow();
        let action = if st.is_collapsed(id as usize) {
            "折叠"
        } else {
            "展开"
        };
        let path = st.node_path(id as usize).unwrap_or("");
        app_window.set_status_message(format!("{}: {}", action, path).into());
    }

    /// 处理展示模式切换；选中已选项是无操作
    fn handle_set_mode(
        app_window: &AppWindow,
        state: &Rc<RefCell<ViewState>>,
        mode: DisplayMode,
    ) {
        if !state.borrow_mut().set_mode(mode) {
            return;
        }
        let show_raw = mode == DisplayMode::Raw;
        app_window.set_show_raw(show_raw);
        app_window.set_status_message(
            if show_raw {
                STATUS_SHOW_RAW
            } else {
                STATUS_SHOW_PARSED
            }
            .into(),
        );
    }

    /// 处理复制按钮操作（优先复制选中节点的完整子树；否则复制原文）
    fn handle_copy_pressed(app_window: &AppWindow, state: &Rc<RefCell<ViewState>>) {
        let selected_path = app_window.get_selected_path().to_string();
        let st = state.borrow();

        let content_to_copy = if !selected_path.is_empty() && selected_path.starts_with('$') {
            match st.extract_subtree_pretty(&selected_path) {
                Ok(pretty) => Some(pretty),
                Err(e) => {
                    tracing::warn!("基于路径提取失败，将回退复制原文: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let final_text = content_to_copy.unwrap_or_else(|| st.raw_text.clone());
        drop(st);

        if final_text.trim().is_empty() {
            app_window.set_status_message("错误: 没有可复制的内容".into());
            return;
        }

        match utils::clipboard::copy_to_clipboard(&final_text) {
            Ok(()) => {
                app_window.set_status_message(STATUS_COPIED.into());
                tracing::info!("内容已复制到剪贴板，长度: {} 字符", final_text.len());
            }
            Err(e) => {
                let error_msg = format!("{}{}", STATUS_ERROR_PREFIX, e);
                app_window.set_status_message(error_msg.into());
                tracing::error!("复制失败: {}", e);
            }
        }
    }

    /// 链接点击：目标进剪贴板
    fn handle_link_activated(app_window: &AppWindow, url: &str) {
        match utils::clipboard::copy_to_clipboard(url) {
            Ok(()) => {
                app_window
                    .set_status_message(format!("{}{}", STATUS_LINK_COPIED_PREFIX, url).into());
                tracing::info!("链接已复制: {}", url);
            }
            Err(e) => {
                let error_msg = format!("{}{}", STATUS_ERROR_PREFIX, e);
                app_window.set_status_message(error_msg.into());
                tracing::error!("链接复制失败: {}", e);
            }
        }
    }

    /// 主题切换：写回偏好并立即重新解析配色
    fn handle_set_theme(app_window: &AppWindow, mode: &str) {
        let pref = ThemePreference::from_storage_value(Some(mode));
        if let Err(e) = utils::fs::write_theme_preference(pref) {
            let error_msg = format!("{}{}", STATUS_ERROR_PREFIX, e);
            app_window.set_status_message(error_msg.into());
            tracing::error!("主题偏好写入失败: {}", e);
            return;
        }
        Self::apply_theme(app_window, pref, &theme::resolve(pref));
        tracing::info!("主题偏好已切换: {}", pref.storage_value());
    }

    /// 把解析后的配色注入界面；跟随系统时两套同时下发
    fn apply_theme(app_window: &AppWindow, pref: ThemePreference, resolved: &ResolvedTheme) {
        match resolved {
            ResolvedTheme::Fixed(colors) => {
                let data = to_colors_data(colors);
                app_window.set_theme_follow_system(false);
                app_window.set_theme_light(data.clone());
                app_window.set_theme_dark(data);
            }
            ResolvedTheme::System { light, dark } => {
                app_window.set_theme_follow_system(true);
                app_window.set_theme_light(to_colors_data(light));
                app_window.set_theme_dark(to_colors_data(dark));
            }
        }
        app_window.set_theme_mode(pref.storage_value().into());
    }

    /// 按当前折叠状态重建行模型
    fn refresh_rows(app_window: &AppWindow, state: &Rc<RefCell<ViewState>>) {
        let row_data: Vec<RenderRowData> = {
            let st = state.borrow();
            st.rows().iter().map(RenderRowData::from).collect()
        };
        app_window.set_row_model(ModelRc::new(VecModel::from(row_data)));
    }
}

fn main() -> anyhow::Result<()> {
    // 初始化日志输出
    let _ = SubscriberBuilder::default()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let app = AppWindow::new()?;
    let state = Rc::new(RefCell::new(ViewState::default()));

    // 创建VM桥接器并绑定UI回调
    let bridge = ViewModelBridge::new(&app, state.clone());
    bridge.initialize_ui(&app);

    // 启动参数直接给出文档路径时立即加载
    if let Some(arg) = std::env::args().nth(1) {
        ViewModelBridge::handle_load_document(&app, &state, Path::new(&arg));
    }

    tracing::info!("应用启动成功，UI已初始化");
    app.run()?;
    Ok(())
}
