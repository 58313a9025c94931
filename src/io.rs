/// IO 抽象层模块
///
/// 该模块定义了核心使用的外部协作者接口，遵循依赖倒置原则。
/// 会话层只依赖这些 trait，测试时可以替换为内存实现。
///
/// # 架构设计
///
/// - **traits**: 定义 RecordStore / ConfirmPrompt / SchemaExporter 接口
/// - **file_store**: 数据目录中的 JSON 记录文件 + 安装目录
/// - **memory_store**: 内存实现
/// - **propdesc**: propdesc XML 导出
/// - **prompt**: 确认提示
///
/// # 使用示例
///
/// ```rust,ignore
/// use propdesc_editor::io::{FileRecordStore, RecordStore};
///
/// let store = FileRecordStore::open("data")?;
/// let records = store.saved_records()?;
/// ```
pub mod traits;
pub mod file_store;
pub mod memory_store;
pub mod propdesc;
pub mod prompt;

// === 导出 trait 定义 ===
pub use traits::{ConfirmPrompt, InstallOutcome, RecordStore, SchemaExporter};

// === 导出默认实现 ===
pub use file_store::{CatalogEntry, FileRecordStore};
pub use memory_store::MemoryRecordStore;
pub use propdesc::PropDescExporter;
pub use prompt::{AssumeNo, AssumeYes, StdinPrompt};
