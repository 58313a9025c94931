/// 基于文件系统的记录存储
///
/// 已保存记录以 `<名称>.json` 存放在数据目录中，
/// 已安装记录登记在同目录的 `catalog.json`，充当宿主属性目录。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::traits::{InstallOutcome, RecordStore};
use crate::catalog;
use crate::record::PropertyRecord;
use crate::utils::{fix_file_name, SchemaError};

/// 安装目录文件名
pub const CATALOG_FILE_NAME: &str = "catalog.json";

/// 已保存记录的扩展名
pub const RECORD_EXTENSION: &str = "json";

/// 目录中的一条安装登记
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// 宿主上报的已安装表示
    pub record: PropertyRecord,
    /// 安装来源文件
    pub source: PathBuf,
    pub installed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    entries: Vec<CatalogEntry>,
}

/// 默认的记录存储
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
    catalog: CatalogFile,
}

impl FileRecordStore {
    /// 打开数据目录（不存在时创建）
    ///
    /// # 参数
    /// * `root` - 数据目录
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SchemaError> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(SchemaError::Store(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        std::fs::create_dir_all(&root)?;

        let catalog_path = root.join(CATALOG_FILE_NAME);
        let catalog = if catalog_path.exists() {
            let content = std::fs::read_to_string(&catalog_path)?;
            serde_json::from_str(&content)?
        } else {
            CatalogFile::default()
        };

        tracing::debug!(
            "已打开数据目录: {} ({} 条安装登记)",
            root.display(),
            catalog.entries.len()
        );

        Ok(FileRecordStore { root, catalog })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 安装登记（按安装顺序）
    pub fn catalog_entries(&self) -> &[CatalogEntry] {
        &self.catalog.entries
    }

    /// 写出新的安装目录，写盘成功后才替换内存中的目录
    fn commit_catalog(&mut self, catalog: CatalogFile) -> Result<(), SchemaError> {
        let content = serde_json::to_string_pretty(&catalog)?;
        std::fs::write(self.root.join(CATALOG_FILE_NAME), content)?;
        self.catalog = catalog;
        Ok(())
    }

    fn is_record_file(path: &Path) -> bool {
        path.is_file()
            && path.extension().is_some_and(|ext| ext == RECORD_EXTENSION)
            && path.file_name().is_some_and(|name| name != CATALOG_FILE_NAME)
    }
}

impl RecordStore for FileRecordStore {
    fn load(&self, path: &Path) -> Result<Option<PropertyRecord>, SchemaError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&mut self, record: &PropertyRecord) -> Result<(), SchemaError> {
        let path = self.record_path(&record.canonical_name);
        std::fs::write(&path, serde_json::to_string_pretty(record)?)?;
        tracing::debug!("已写入记录文件: {}", path.display());
        Ok(())
    }

    fn delete(&mut self, canonical_name: &str) -> Result<(), SchemaError> {
        let path = self.record_path(canonical_name);
        if !path.exists() {
            return Err(SchemaError::NotFound(canonical_name.to_string()));
        }
        std::fs::remove_file(&path)?;
        Ok(())
    }

    fn install(
        &mut self,
        path: &Path,
        record: &PropertyRecord,
    ) -> Result<(InstallOutcome, Option<PropertyRecord>), SchemaError> {
        let name = &record.canonical_name;

        if catalog::is_system_name(name) {
            return Ok((
                InstallOutcome::Failure(format!("{} is a system property", name)),
                None,
            ));
        }
        if self.catalog.entries.iter().any(|e| &e.record.canonical_name == name) {
            return Ok((
                InstallOutcome::Failure(format!("{} is already installed", name)),
                None,
            ));
        }
        if !path.exists() {
            return Ok((
                InstallOutcome::Failure(format!("{} does not exist", path.display())),
                None,
            ));
        }

        let installed = record.installed_form();
        let mut catalog = self.catalog.clone();
        catalog.entries.push(CatalogEntry {
            record: installed.clone(),
            source: path.to_path_buf(),
            installed_at: Utc::now(),
        });
        self.commit_catalog(catalog)?;

        let outcome = if record.managed_fields_are_default() {
            InstallOutcome::Success
        } else {
            InstallOutcome::PartialSuccess(
                "search and format settings are not reported by the installed property".to_string(),
            )
        };

        Ok((outcome, Some(installed)))
    }

    fn uninstall(&mut self, canonical_name: &str) -> Result<bool, SchemaError> {
        let mut catalog = self.catalog.clone();
        catalog
            .entries
            .retain(|entry| entry.record.canonical_name != canonical_name);

        if catalog.entries.len() == self.catalog.entries.len() {
            return Ok(false);
        }

        self.commit_catalog(catalog)?;
        Ok(true)
    }

    fn record_path(&self, canonical_name: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", fix_file_name(canonical_name), RECORD_EXTENSION))
    }

    fn saved_records(&self) -> Result<Vec<PropertyRecord>, SchemaError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if Self::is_record_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match self.load(&path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!("跳过无法解析的记录文件 {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    fn installed_records(&self) -> Result<Vec<PropertyRecord>, SchemaError> {
        Ok(self
            .catalog
            .entries
            .iter()
            .map(|entry| entry.record.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, FileRecordStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRecordStore::open(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_save_load_delete() {
        let (_temp_dir, mut store) = create_test_store();
        let mut record = PropertyRecord::new("Vendor.App.Field");
        record.display_name = Some("Field".to_string());

        store.save(&record).unwrap();
        let path = store.record_path("Vendor.App.Field");
        assert_eq!(store.load(&path).unwrap(), Some(record.clone()));
        assert_eq!(store.saved_records().unwrap(), vec![record]);

        store.delete("Vendor.App.Field").unwrap();
        assert_eq!(store.load(&path).unwrap(), None);
        assert!(matches!(
            store.delete("Vendor.App.Field"),
            Err(SchemaError::NotFound(_))
        ));
    }

    #[test]
    fn test_open_rejects_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("data");
        std::fs::write(&file, "").unwrap();

        assert!(matches!(FileRecordStore::open(&file), Err(SchemaError::Store(_))));
    }

    #[test]
    fn test_catalog_is_not_a_saved_record() {
        let (_temp_dir, mut store) = create_test_store();
        let record = PropertyRecord::new("Vendor.A");
        store.save(&record).unwrap();
        let path = store.record_path("Vendor.A");
        store.install(&path, &record).unwrap();

        let saved = store.saved_records().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].canonical_name, "Vendor.A");
    }

    #[test]
    fn test_install_outcomes() {
        let (temp_dir, mut store) = create_test_store();

        let plain = PropertyRecord::new("Vendor.Plain");
        store.save(&plain).unwrap();
        let (outcome, installed) = store.install(&store.record_path("Vendor.Plain"), &plain).unwrap();
        assert_eq!(outcome, InstallOutcome::Success);
        assert_eq!(installed.unwrap().canonical_name, "Vendor.Plain");

        let mut rich = PropertyRecord::new("Vendor.Rich");
        rich.mnemonics = Some("rich".to_string());
        store.save(&rich).unwrap();
        let (outcome, installed) = store.install(&store.record_path("Vendor.Rich"), &rich).unwrap();
        assert!(matches!(outcome, InstallOutcome::PartialSuccess(_)));
        assert_eq!(installed.unwrap().mnemonics, None);

        // 重复安装
        let (outcome, installed) = store.install(&store.record_path("Vendor.Plain"), &plain).unwrap();
        assert!(matches!(outcome, InstallOutcome::Failure(_)));
        assert!(installed.is_none());

        // 系统名称
        let system = PropertyRecord::new("System.Custom");
        let (outcome, _) = store.install(&temp_dir.path().join("x.json"), &system).unwrap();
        assert!(matches!(outcome, InstallOutcome::Failure(_)));

        // 没有保存文件
        let unsaved = PropertyRecord::new("Vendor.Unsaved");
        let (outcome, _) = store.install(&store.record_path("Vendor.Unsaved"), &unsaved).unwrap();
        assert!(matches!(outcome, InstallOutcome::Failure(_)));

        assert_eq!(store.installed_records().unwrap().len(), 2);
    }

    #[test]
    fn test_catalog_survives_reopen() {
        let (temp_dir, mut store) = create_test_store();
        let record = PropertyRecord::new("Vendor.A");
        store.save(&record).unwrap();
        store.install(&store.record_path("Vendor.A"), &record).unwrap();

        let reopened = FileRecordStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.catalog_entries().len(), 1);
        assert_eq!(reopened.catalog_entries()[0].source, store.record_path("Vendor.A"));
    }

    #[test]
    fn test_uninstall() {
        let (_temp_dir, mut store) = create_test_store();
        let record = PropertyRecord::new("Vendor.A");
        store.save(&record).unwrap();
        store.install(&store.record_path("Vendor.A"), &record).unwrap();

        assert!(store.uninstall("Vendor.A").unwrap());
        assert!(!store.uninstall("Vendor.A").unwrap());
        assert!(store.installed_records().unwrap().is_empty());
    }

    #[test]
    fn test_failed_catalog_write_keeps_catalog() {
        let (temp_dir, mut store) = create_test_store();
        let record = PropertyRecord::new("Vendor.A");
        store.save(&record).unwrap();
        let path = store.record_path("Vendor.A");

        // 目录占住 catalog.json，写盘必然失败
        let catalog_path = temp_dir.path().join(CATALOG_FILE_NAME);
        std::fs::create_dir(&catalog_path).unwrap();

        assert!(store.install(&path, &record).is_err());
        assert!(store.installed_records().unwrap().is_empty());

        std::fs::remove_dir(&catalog_path).unwrap();
        let (outcome, installed) = store.install(&path, &record).unwrap();
        assert_eq!(outcome, InstallOutcome::Success);
        assert!(installed.is_some());
    }

    #[test]
    fn test_failed_uninstall_write_keeps_entry() {
        let (temp_dir, mut store) = create_test_store();
        let record = PropertyRecord::new("Vendor.A");
        store.save(&record).unwrap();
        store.install(&store.record_path("Vendor.A"), &record).unwrap();

        let catalog_path = temp_dir.path().join(CATALOG_FILE_NAME);
        std::fs::remove_file(&catalog_path).unwrap();
        std::fs::create_dir(&catalog_path).unwrap();

        assert!(store.uninstall("Vendor.A").is_err());
        assert_eq!(store.catalog_entries().len(), 1);

        std::fs::remove_dir(&catalog_path).unwrap();
        assert!(store.uninstall("Vendor.A").unwrap());
        assert!(store.catalog_entries().is_empty());
    }
}
