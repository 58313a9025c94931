/// 外部协作者 - trait 定义
///
/// 该模块定义了记录存储、确认提示和 schema 导出的抽象接口。
/// 核心只通过这些接口接触文件和安装目录，便于注入内存实现做测试。

use std::fmt;
use std::path::{Path, PathBuf};

use crate::record::PropertyRecord;
use crate::utils::SchemaError;

/// 安装结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Success,
    /// 已安装，但部分属性在安装后的表示中丢失
    PartialSuccess(String),
    Failure(String),
}

impl InstallOutcome {
    /// 是否已安装（包括部分成功）
    pub fn is_installed(&self) -> bool {
        !matches!(self, InstallOutcome::Failure(_))
    }
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallOutcome::Success => write!(f, "Installed"),
            InstallOutcome::PartialSuccess(reason) => write!(f, "Installed with warnings: {}", reason),
            InstallOutcome::Failure(reason) => write!(f, "Install failed: {}", reason),
        }
    }
}

/// 记录存储 trait
///
/// # 职责
/// - 已保存记录的按键读写
/// - 向宿主目录注册 / 注销记录，并返回权威的已安装表示
/// - 不负责名称校验和树维护，这些由会话层完成
pub trait RecordStore {
    /// 从文件读取一条已保存记录
    ///
    /// # 返回
    /// 文件不存在时返回 `Ok(None)`
    fn load(&self, path: &Path) -> Result<Option<PropertyRecord>, SchemaError>;

    /// 持久化一条记录（同名覆盖）
    fn save(&mut self, record: &PropertyRecord) -> Result<(), SchemaError>;

    /// 删除已保存记录
    fn delete(&mut self, canonical_name: &str) -> Result<(), SchemaError>;

    /// 安装记录
    ///
    /// # 参数
    /// * `path` - 记录的已保存文件
    /// * `record` - 要安装的记录
    ///
    /// # 返回
    /// 安装结果，以及成功时宿主上报的已安装表示
    fn install(
        &mut self,
        path: &Path,
        record: &PropertyRecord,
    ) -> Result<(InstallOutcome, Option<PropertyRecord>), SchemaError>;

    /// 卸载记录，返回宿主是否确实移除了它
    fn uninstall(&mut self, canonical_name: &str) -> Result<bool, SchemaError>;

    /// 记录的已保存文件路径
    fn record_path(&self, canonical_name: &str) -> PathBuf;

    /// 全部已保存记录
    fn saved_records(&self) -> Result<Vec<PropertyRecord>, SchemaError>;

    /// 由本工具安装的全部记录（不含系统目录）
    fn installed_records(&self) -> Result<Vec<PropertyRecord>, SchemaError>;
}

/// 是/否确认 trait
pub trait ConfirmPrompt {
    /// 询问操作员，返回是否同意
    fn confirm(&self, question: &str) -> bool;
}

/// schema 导出 trait
///
/// # 职责
/// - 把一组记录序列化为外部 schema 文件
pub trait SchemaExporter {
    /// 写出 schema 文件
    ///
    /// # 参数
    /// * `path` - 目标文件路径
    /// * `records` - 要导出的记录
    fn export(&self, path: &Path, records: &[PropertyRecord]) -> Result<(), SchemaError>;
}
