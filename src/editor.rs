/// 编辑器层模块
///
/// 该模块提供有状态的编辑接口：一个草稿、一个基线、两棵名称树。
/// 遵循"修改-保存分离"原则，所有修改操作仅在内存中进行，需要显式调用保存或安装。
///
/// # 架构设计
///
/// - **delta**: 字段级差异与差异报告
/// - **reconciler**: 草稿 / 基线调和，脏状态计算
/// - **session**: 命令层，名称校验、命令合法性、保存 / 安装 / 卸载 / 删除 / 导出
///
/// # 使用示例
///
/// ```rust,ignore
/// use propdesc_editor::{EditorConfig, PropertySession};
/// use propdesc_editor::io::{FileRecordStore, StdinPrompt};
///
/// let store = FileRecordStore::open("data")?;
/// let mut session = PropertySession::open(EditorConfig::default().with_data_folder("data"), store)?;
///
/// session.new_draft("Vendor.App.Field", &StdinPrompt);
/// session.set_field("DisplayName", "Field")?;
/// session.save_draft()?;
/// ```
pub mod delta;
pub mod reconciler;
pub mod session;

// === 导出公共接口 ===
pub use delta::{DiffReport, Difference};
pub use reconciler::{BaselineKind, EditorReconciler};
pub use session::{BulkReport, DraftStatus, Namespace, PropertySession, RecordChange, ViewEvent};
