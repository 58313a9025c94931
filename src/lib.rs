pub mod catalog;
pub mod config;
pub mod datatypes;
pub mod editor;
pub mod io;
pub mod name;
pub mod record;
pub mod tree;
pub mod utils;

// 重新导出主要结构
pub use config::EditorConfig;
pub use editor::{
    BaselineKind, BulkReport, DiffReport, Difference, DraftStatus, EditorReconciler, Namespace,
    PropertySession, RecordChange, ViewEvent,
};
pub use io::{ConfirmPrompt, InstallOutcome, RecordStore, SchemaExporter};
pub use record::{PropertyRecord, SchemaKey};
pub use tree::{HierarchyIndex, IndexSnapshot, NameNode, NodeId};
pub use utils::{fix_file_name, is_valid_property_name, SchemaError};

// 常量定义
pub const PROPDESC_EXTENSION: &str = "propdesc";
