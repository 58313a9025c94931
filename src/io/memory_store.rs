/// 内存记录存储
///
/// 不接触文件系统，适合测试和演示。安装规则与文件存储一致。

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::traits::{InstallOutcome, RecordStore};
use crate::catalog;
use crate::record::PropertyRecord;
use crate::utils::SchemaError;

#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    saved: BTreeMap<String, PropertyRecord>,
    installed: BTreeMap<String, PropertyRecord>,
    /// 安装时一律失败的名称
    refused: HashSet<String>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置已保存记录
    pub fn with_saved(mut self, records: impl IntoIterator<Item = PropertyRecord>) -> Self {
        for record in records {
            self.saved.insert(record.canonical_name.clone(), record);
        }
        self
    }

    /// 预置已安装记录（按原样登记，不经过安装转换）
    pub fn with_installed(mut self, records: impl IntoIterator<Item = PropertyRecord>) -> Self {
        for record in records {
            self.installed.insert(record.canonical_name.clone(), record);
        }
        self
    }

    /// 让指定名称的安装失败
    pub fn refuse_install(&mut self, canonical_name: &str) {
        self.refused.insert(canonical_name.to_string());
    }

    pub fn saved(&self, canonical_name: &str) -> Option<&PropertyRecord> {
        self.saved.get(canonical_name)
    }

    pub fn is_installed(&self, canonical_name: &str) -> bool {
        self.installed.contains_key(canonical_name)
    }

    fn name_from_path(path: &Path) -> Option<String> {
        path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self, path: &Path) -> Result<Option<PropertyRecord>, SchemaError> {
        Ok(Self::name_from_path(path).and_then(|name| self.saved.get(&name).cloned()))
    }

    fn save(&mut self, record: &PropertyRecord) -> Result<(), SchemaError> {
        self.saved.insert(record.canonical_name.clone(), record.clone());
        Ok(())
    }

    fn delete(&mut self, canonical_name: &str) -> Result<(), SchemaError> {
        self.saved
            .remove(canonical_name)
            .map(|_| ())
            .ok_or_else(|| SchemaError::NotFound(canonical_name.to_string()))
    }

    fn install(
        &mut self,
        path: &Path,
        record: &PropertyRecord,
    ) -> Result<(InstallOutcome, Option<PropertyRecord>), SchemaError> {
        let name = &record.canonical_name;

        if self.refused.contains(name) {
            return Ok((InstallOutcome::Failure(format!("{} was refused", name)), None));
        }
        if catalog::is_system_name(name) || self.installed.contains_key(name) {
            return Ok((InstallOutcome::Failure(format!("{} is already installed", name)), None));
        }
        if self.load(path)?.is_none() {
            return Ok((
                InstallOutcome::Failure(format!("{} does not exist", path.display())),
                None,
            ));
        }

        let installed = record.installed_form();
        self.installed.insert(name.clone(), installed.clone());

        let outcome = if record.managed_fields_are_default() {
            InstallOutcome::Success
        } else {
            InstallOutcome::PartialSuccess("managed fields dropped".to_string())
        };
        Ok((outcome, Some(installed)))
    }

    fn uninstall(&mut self, canonical_name: &str) -> Result<bool, SchemaError> {
        Ok(self.installed.remove(canonical_name).is_some())
    }

    fn record_path(&self, canonical_name: &str) -> PathBuf {
        PathBuf::from(format!("{}.json", canonical_name))
    }

    fn saved_records(&self) -> Result<Vec<PropertyRecord>, SchemaError> {
        Ok(self.saved.values().cloned().collect())
    }

    fn installed_records(&self) -> Result<Vec<PropertyRecord>, SchemaError> {
        Ok(self.installed.values().cloned().collect())
    }
}
