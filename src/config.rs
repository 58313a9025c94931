use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::SchemaError;

/// 编辑器配置
///
/// 从 JSON 文件加载，缺失的字段使用默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 已保存记录和导出文件所在目录；未配置时所有写操作都不可用
    pub data_folder: Option<PathBuf>,
    /// 写入导出文件头的发布者
    pub publisher: String,
    /// 写入导出文件头的产品名
    pub product: String,
    /// 草稿来自已安装记录时，改为与选中的已保存记录比较
    pub compare_saved: bool,
    /// 草稿不是来自已安装记录时，改为与选中的已安装记录比较
    pub compare_installed: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            data_folder: None,
            publisher: "Publisher".to_string(),
            product: "Product".to_string(),
            compare_saved: true,
            compare_installed: false,
        }
    }
}

impl EditorConfig {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径，文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        if !path.exists() {
            tracing::debug!("配置文件不存在，使用默认配置: {}", path.display());
            return Ok(EditorConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: EditorConfig = serde_json::from_str(&content)?;
        tracing::debug!("已加载配置: {}", path.display());
        Ok(config)
    }

    /// 写出配置文件
    pub fn save(&self, path: &Path) -> Result<(), SchemaError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// 是否配置了数据目录
    pub fn has_data_folder(&self) -> bool {
        self.data_folder.is_some()
    }

    pub fn with_data_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.data_folder = Some(folder.into());
        self
    }
}
