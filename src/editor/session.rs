/// 编辑会话模块
///
/// 持有两棵名称树（已安装 / 已保存）、草稿调和器和记录存储，
/// 提供名称校验、命令合法性判断以及保存、删除、安装、卸载、导出命令。
/// 每个命令要么存储调用成功且树同步更新，要么失败且什么都不改。

use std::fmt;
use std::path::PathBuf;

use crate::catalog;
use crate::config::EditorConfig;
use crate::io::{ConfirmPrompt, InstallOutcome, RecordStore, SchemaExporter};
use crate::name;
use crate::record::{fields, PropertyRecord, SchemaKey, FIRST_USER_PROPERTY_ID};
use crate::tree::{HierarchyIndex, NameNode, NodeId};
use crate::utils::{fix_file_name, is_valid_property_name, SchemaError};

use super::delta::DiffReport;
use super::reconciler::{BaselineKind, EditorReconciler};

pub const INVALID_NAME: &str = "Invalid property name";
pub const SAVED_CLASH: &str = "Name clashes with saved property name";
pub const INSTALLED_CLASH: &str = "Name clashes with installed property name";
pub const SAVE_OR_DISCARD_FIRST: &str = "Save or discard changes first";
const NO_DATA_FOLDER: &str = "No data folder configured";

/// 命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Installed,
    Saved,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Installed => write!(f, "installed"),
            Namespace::Saved => write!(f, "saved"),
        }
    }
}

/// 记录集合的变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordChange {
    Added,
    Updated,
    Removed,
}

/// 草稿状态快照，供视图直接渲染
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftStatus {
    pub name: String,
    pub dirty: bool,
    pub diff_text: String,
    pub installed_text: String,
    pub can_save: bool,
    pub can_install: bool,
    pub can_delete: bool,
    pub can_uninstall: bool,
    pub can_discard: bool,
}

/// 核心发给视图的通知（单向，视图可以随时处理）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    RecordSetChanged {
        namespace: Namespace,
        change: RecordChange,
        name: String,
    },
    DraftStatusChanged(DraftStatus),
    SelectNode {
        namespace: Namespace,
        node: NodeId,
    },
}

/// 批量操作的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// 失败和跳过的原因
    pub messages: Vec<String>,
}

impl BulkReport {
    fn skip(&mut self, name: &str, reason: &str) {
        self.skipped += 1;
        self.messages.push(format!("{}: skipped, {}", name, reason));
    }

    fn fail(&mut self, name: &str, reason: impl fmt::Display) {
        self.failed += 1;
        self.messages.push(format!("{}: {}", name, reason));
    }
}

impl fmt::Display for BulkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// 编辑会话
///
/// # 使用示例
///
/// ```rust,ignore
/// let mut session = PropertySession::open(config, MemoryRecordStore::new())?;
/// session.new_draft("Vendor.App.Field", &AssumeYes);
/// session.set_field("DisplayName", "Field")?;
/// let outcome = session.install_draft()?;
/// ```
pub struct PropertySession<S: RecordStore> {
    config: EditorConfig,
    store: S,
    installed: HierarchyIndex,
    saved: HierarchyIndex,
    reconciler: EditorReconciler,
    events: Vec<ViewEvent>,
}

impl<S: RecordStore> PropertySession<S> {
    /// 打开会话
    ///
    /// 已安装命名空间由内置系统目录和存储中的安装登记组成，
    /// 已保存命名空间来自存储中的记录文件。
    pub fn open(config: EditorConfig, store: S) -> Result<Self, SchemaError> {
        let mut installed_records = catalog::load_system_properties()?;
        installed_records.extend(store.installed_records()?);
        let saved_records = store.saved_records()?;

        let installed = HierarchyIndex::populate(well_formed(installed_records), true);
        let saved = HierarchyIndex::populate(well_formed(saved_records), false);
        let reconciler = EditorReconciler::new(config.compare_saved, config.compare_installed);

        tracing::info!(
            "会话已打开: {} 条已安装记录, {} 条已保存记录",
            installed.len(),
            saved.len()
        );

        Ok(Self {
            config,
            store,
            installed,
            saved,
            reconciler,
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn installed(&self) -> &HierarchyIndex {
        &self.installed
    }

    pub fn saved(&self) -> &HierarchyIndex {
        &self.saved
    }

    pub fn index(&self, namespace: Namespace) -> &HierarchyIndex {
        match namespace {
            Namespace::Installed => &self.installed,
            Namespace::Saved => &self.saved,
        }
    }

    pub fn reconciler(&self) -> &EditorReconciler {
        &self.reconciler
    }

    pub fn draft(&self) -> &PropertyRecord {
        self.reconciler.draft()
    }

    pub fn report(&self) -> &DiffReport {
        self.reconciler.report()
    }

    pub fn is_dirty(&self) -> bool {
        self.reconciler.is_dirty()
    }

    /// 取出积累的视图通知
    pub fn drain_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }

    fn notify_status(&mut self) {
        let status = self.status();
        self.events.push(ViewEvent::DraftStatusChanged(status));
    }

    fn notify_record(&mut self, namespace: Namespace, change: RecordChange, name: &str) {
        self.events.push(ViewEvent::RecordSetChanged {
            namespace,
            change,
            name: name.to_string(),
        });
    }

    // ---- 选择与加载 ----

    /// 按名称查找节点
    pub fn node_for(&self, namespace: Namespace, canonical_name: &str) -> Option<NodeId> {
        self.index(namespace).find(canonical_name)
    }

    /// 选中树节点
    ///
    /// 选中已保存叶子会把它加载为草稿；选中已安装叶子只改变比较目标。
    ///
    /// # 返回
    /// 节点不是叶子，或操作员拒绝放弃修改时返回 `false`
    pub fn select_node(&mut self, namespace: Namespace, node: NodeId, prompt: &dyn ConfirmPrompt) -> bool {
        let Some(record) = self.index(namespace).node(node).and_then(NameNode::payload).cloned() else {
            return false;
        };

        match namespace {
            Namespace::Saved => {
                if !self.reconciler.load_draft(&record, BaselineKind::FromSaved, false, prompt) {
                    return false;
                }
                self.reconciler.select_saved(Some(record));
            }
            Namespace::Installed => self.reconciler.select_installed(Some(record)),
        }

        self.notify_status();
        true
    }

    /// 按名称选中叶子
    pub fn select_name(
        &mut self,
        namespace: Namespace,
        canonical_name: &str,
        prompt: &dyn ConfirmPrompt,
    ) -> Result<bool, SchemaError> {
        let node = self
            .index(namespace)
            .find(canonical_name)
            .ok_or_else(|| SchemaError::NotFound(canonical_name.to_string()))?;
        Ok(self.select_node(namespace, node, prompt))
    }

    /// 把选中的已安装记录复制到草稿
    pub fn copy_installed_to_editor(&mut self, prompt: &dyn ConfirmPrompt) -> bool {
        let Some(record) = self.reconciler.selected_installed().cloned() else {
            return false;
        };

        let loaded = self
            .reconciler
            .load_draft(&record, BaselineKind::FromInstalled, false, prompt);
        if loaded {
            self.notify_status();
        }
        loaded
    }

    /// 开始一个新草稿
    pub fn new_draft(&mut self, canonical_name: &str, prompt: &dyn ConfirmPrompt) -> bool {
        let created = self.reconciler.reset_draft(canonical_name, false, prompt);
        if created {
            self.notify_status();
        }
        created
    }

    /// 修改草稿
    pub fn update_draft<R>(&mut self, edit: impl FnOnce(&mut PropertyRecord) -> R) -> R {
        let result = self.reconciler.update_draft(edit);
        self.notify_status();
        result
    }

    /// 以文本形式修改草稿的一个字段
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), SchemaError> {
        self.update_draft(|draft| fields::assign(draft, field, value))
    }

    pub fn set_compare_saved(&mut self, enabled: bool) {
        self.reconciler.set_compare_saved(enabled);
        self.notify_status();
    }

    pub fn set_compare_installed(&mut self, enabled: bool) {
        self.reconciler.set_compare_installed(enabled);
        self.notify_status();
    }

    /// 放弃草稿修改
    pub fn discard(&mut self) {
        self.reconciler.discard();
        self.notify_status();
    }

    // ---- 校验与合法性 ----

    /// 名称校验
    ///
    /// # 返回
    /// 合法时返回 `None`，否则返回给操作员看的错误
    pub fn validate_name(&self, canonical_name: &str) -> Option<&'static str> {
        if !is_valid_property_name(canonical_name) {
            return Some(INVALID_NAME);
        }
        if self.saved.name_would_clash(canonical_name, true) {
            return Some(SAVED_CLASH);
        }
        // 操作员自己安装过的命名空间不算冲突
        if self.installed.name_would_clash(canonical_name, false)
            && !self.saved.name_would_clash(canonical_name, false)
        {
            return Some(INSTALLED_CLASH);
        }
        None
    }

    pub fn can_save(&self) -> bool {
        self.config.has_data_folder() && self.validate_name(&self.draft().canonical_name).is_none()
    }

    pub fn can_install_record(&self, record: &PropertyRecord) -> bool {
        self.config.has_data_folder()
            && self.validate_name(&record.canonical_name).is_none()
            && !self.installed.contains(&record.canonical_name)
    }

    pub fn can_delete_record(&self, record: &PropertyRecord) -> bool {
        self.can_install_record(record) && self.saved.contains(&record.canonical_name)
    }

    /// 只有本工具管理的非系统记录可以卸载
    pub fn can_uninstall_name(&self, canonical_name: &str) -> bool {
        self.config.has_data_folder()
            && self.saved.contains(canonical_name)
            && self
                .installed
                .record(canonical_name)
                .is_some_and(|record| !record.is_system_property)
    }

    pub fn can_install(&self) -> bool {
        self.can_install_record(self.draft())
    }

    pub fn can_delete(&self) -> bool {
        self.can_delete_record(self.draft())
    }

    pub fn can_uninstall(&self) -> bool {
        self.can_uninstall_name(&self.draft().canonical_name)
    }

    pub fn can_export(&self, node: Option<NodeId>) -> bool {
        self.config.has_data_folder() && node.is_some()
    }

    pub fn can_discard(&self) -> bool {
        self.is_dirty()
    }

    /// 草稿的“已安装”状态文本：校验错误，或 `True` / `False`
    pub fn installed_text(&self) -> String {
        let name = &self.draft().canonical_name;
        match self.validate_name(name) {
            Some(error) => error.to_string(),
            None if self.installed.contains(name) => "True".to_string(),
            None => "False".to_string(),
        }
    }

    pub fn install_caption(&self) -> String {
        format!("Install {}", self.draft().bounded_name())
    }

    pub fn uninstall_caption(&self) -> String {
        format!("Uninstall {}", self.draft().bounded_name())
    }

    /// 当前草稿状态
    pub fn status(&self) -> DraftStatus {
        DraftStatus {
            name: self.draft().canonical_name.clone(),
            dirty: self.is_dirty(),
            diff_text: self.report().to_string(),
            installed_text: self.installed_text(),
            can_save: self.can_save(),
            can_install: self.can_install(),
            can_delete: self.can_delete(),
            can_uninstall: self.can_uninstall(),
            can_discard: self.can_discard(),
        }
    }

    // ---- 命令 ----

    /// 保存草稿
    ///
    /// 已保存过的名称原地更新；新名称克隆为新记录，必要时分配属性键。
    /// 保存后基线换成保存的记录，草稿变为干净状态。
    pub fn save_draft(&mut self) -> Result<PropertyRecord, SchemaError> {
        if !self.config.has_data_folder() {
            return Err(SchemaError::NotPermitted(NO_DATA_FOLDER.to_string()));
        }

        let name = self.draft().canonical_name.clone();
        if let Some(error) = self.validate_name(&name) {
            tracing::warn!("拒绝保存 {}: {}", name, error);
            return Err(SchemaError::InvalidName(error.to_string()));
        }

        let existed = self.saved.contains(&name);
        let mut record = PropertyRecord::default();
        record.copy_from(self.draft(), false);
        if !record.schema_key.is_assigned() {
            record.schema_key = match self.saved.record(&name) {
                Some(existing) if existing.schema_key.is_assigned() => existing.schema_key,
                _ => self.next_schema_key(&name),
            };
        }

        self.store.save(&record)?;

        if existed {
            self.saved.update_record(record.clone());
            self.notify_record(Namespace::Saved, RecordChange::Updated, &name);
        } else {
            let node = self.saved.add(record.clone());
            self.notify_record(Namespace::Saved, RecordChange::Added, &name);
            self.events.push(ViewEvent::SelectNode {
                namespace: Namespace::Saved,
                node,
            });
        }

        self.reconciler.mark_saved(&record);
        tracing::info!("已保存: {} ({})", name, record.schema_key);
        self.notify_status();
        Ok(record)
    }

    /// 新记录的属性键
    ///
    /// 同一父节点下已有带键的兄弟时沿用其 FormatID，PropertyID 取该族最大值加一；
    /// 否则生成新的 FormatID。该族 PropertyID 已用尽时也生成新的 FormatID。
    fn next_schema_key(&self, canonical_name: &str) -> SchemaKey {
        let siblings: Vec<SchemaKey> = name::parent_path(canonical_name)
            .and_then(|parent| self.saved.parent_node(parent))
            .map(|parent| {
                self.saved
                    .children(parent)
                    .iter()
                    .filter_map(|&id| self.saved.node(id))
                    .filter_map(NameNode::payload)
                    .filter(|record| record.canonical_name != canonical_name)
                    .map(|record| record.schema_key)
                    .filter(|key| key.is_assigned())
                    .collect()
            })
            .unwrap_or_default();

        match siblings.first() {
            Some(first) => {
                let highest = siblings
                    .iter()
                    .filter(|key| key.format_id == first.format_id)
                    .map(|key| key.property_id)
                    .max()
                    .unwrap_or(first.property_id);
                match highest.checked_add(1) {
                    Some(next) => SchemaKey::new(first.format_id, next.max(FIRST_USER_PROPERTY_ID)),
                    None => {
                        tracing::warn!("FormatID {} 的 PropertyID 已用尽，生成新的 FormatID", first.format_id_braced());
                        SchemaKey::mint()
                    }
                }
            }
            None => SchemaKey::mint(),
        }
    }

    /// 删除草稿对应的已保存记录
    ///
    /// 草稿必须就是当前打开的已保存记录。
    pub fn delete_draft(&mut self) -> Result<(), SchemaError> {
        let name = self.draft().canonical_name.clone();
        let is_open_saved = self.reconciler.kind() == BaselineKind::FromSaved
            && self
                .reconciler
                .baseline()
                .is_some_and(|baseline| baseline.canonical_name == name);

        if !is_open_saved {
            tracing::warn!("拒绝删除 {}: 草稿不是打开的已保存记录", name);
            return Err(SchemaError::NotPermitted(SAVE_OR_DISCARD_FIRST.to_string()));
        }

        self.delete_record(&name)
    }

    /// 删除一条已保存记录
    pub fn delete_record(&mut self, canonical_name: &str) -> Result<(), SchemaError> {
        let record = self
            .saved
            .record(canonical_name)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(canonical_name.to_string()))?;
        if !self.can_delete_record(&record) {
            return Err(SchemaError::NotPermitted(format!("{} cannot be deleted", canonical_name)));
        }

        self.store.delete(canonical_name)?;
        self.saved.remove(canonical_name);
        self.notify_record(Namespace::Saved, RecordChange::Removed, canonical_name);

        if self
            .reconciler
            .selected_saved()
            .is_some_and(|r| r.canonical_name == canonical_name)
        {
            self.reconciler.select_saved(None);
        }
        if self.reconciler.kind() == BaselineKind::FromSaved
            && self
                .reconciler
                .baseline()
                .is_some_and(|r| r.canonical_name == canonical_name)
        {
            self.reconciler.detach_baseline();
        }

        tracing::info!("已删除: {}", canonical_name);
        self.notify_status();
        Ok(())
    }

    /// 保存并安装草稿
    pub fn install_draft(&mut self) -> Result<InstallOutcome, SchemaError> {
        if !self.can_install() {
            return Err(SchemaError::NotPermitted(format!(
                "{} cannot be installed",
                self.draft().canonical_name
            )));
        }

        let record = self.save_draft()?;
        self.install_record(&record)
    }

    /// 安装一条记录
    ///
    /// 成功或部分成功时，把存储返回的已安装表示加入已安装树；失败时不做任何修改。
    pub fn install_record(&mut self, record: &PropertyRecord) -> Result<InstallOutcome, SchemaError> {
        let name = record.canonical_name.clone();
        if !self.can_install_record(record) {
            return Err(SchemaError::NotPermitted(format!("{} cannot be installed", name)));
        }

        let path = self.store.record_path(&name);
        let (outcome, installed) = self.store.install(&path, record)?;

        match (&outcome, installed) {
            (InstallOutcome::Failure(reason), _) => {
                tracing::warn!("安装失败 {}: {}", name, reason);
            }
            (_, Some(installed)) => {
                if let InstallOutcome::PartialSuccess(reason) = &outcome {
                    tracing::warn!("部分安装 {}: {}", name, reason);
                } else {
                    tracing::info!("已安装: {}", name);
                }
                let node = self.installed.add(installed.clone());
                self.reconciler.select_installed(Some(installed));
                self.notify_record(Namespace::Installed, RecordChange::Added, &name);
                self.events.push(ViewEvent::SelectNode {
                    namespace: Namespace::Installed,
                    node,
                });
            }
            (_, None) => {
                tracing::warn!("已安装但存储未返回已安装表示: {}", name);
            }
        }

        self.notify_status();
        Ok(outcome)
    }

    /// 卸载草稿对应的记录
    pub fn uninstall_draft(&mut self) -> Result<bool, SchemaError> {
        let name = self.draft().canonical_name.clone();
        self.uninstall_record(&name)
    }

    /// 卸载一条记录
    pub fn uninstall_record(&mut self, canonical_name: &str) -> Result<bool, SchemaError> {
        if !self.can_uninstall_name(canonical_name) {
            return Err(SchemaError::NotPermitted(format!("{} cannot be uninstalled", canonical_name)));
        }

        let removed = self.store.uninstall(canonical_name)?;
        if removed {
            self.installed.remove(canonical_name);
            self.notify_record(Namespace::Installed, RecordChange::Removed, canonical_name);
            if self
                .reconciler
                .selected_installed()
                .is_some_and(|r| r.canonical_name == canonical_name)
            {
                self.reconciler.select_installed(None);
            }
            tracing::info!("已卸载: {}", canonical_name);
        } else {
            tracing::warn!("宿主没有移除 {}", canonical_name);
        }

        self.notify_status();
        Ok(removed)
    }

    // ---- 批量命令 ----

    fn bulk_targets(&self, namespace: Namespace, node: NodeId) -> Vec<PropertyRecord> {
        self.index(namespace)
            .leaves_under(node)
            .into_iter()
            .cloned()
            .collect()
    }

    /// 该记录是否就是有未保存修改的草稿
    fn is_open_dirty(&self, canonical_name: &str) -> bool {
        self.is_dirty() && self.draft().canonical_name == canonical_name
    }

    /// 安装已保存树节点下的全部记录
    pub fn install_node(&mut self, node: NodeId) -> BulkReport {
        let mut report = BulkReport::default();

        for record in self.bulk_targets(Namespace::Saved, node) {
            let name = record.canonical_name.as_str();
            if self.is_open_dirty(name) {
                report.skip(name, "has unsaved changes");
                continue;
            }
            if !self.can_install_record(&record) {
                report.skip(name, "cannot be installed");
                continue;
            }
            match self.install_record(&record) {
                Ok(outcome) if outcome.is_installed() => report.succeeded += 1,
                Ok(outcome) => report.fail(name, outcome),
                Err(e) => report.fail(name, e),
            }
        }

        tracing::info!("批量安装: {}", report);
        report
    }

    /// 删除已保存树节点下的全部记录
    pub fn delete_node(&mut self, node: NodeId) -> BulkReport {
        let mut report = BulkReport::default();

        for record in self.bulk_targets(Namespace::Saved, node) {
            let name = record.canonical_name.as_str();
            if self.is_open_dirty(name) {
                report.skip(name, "has unsaved changes");
                continue;
            }
            if !self.can_delete_record(&record) {
                report.skip(name, "cannot be deleted");
                continue;
            }
            match self.delete_record(name) {
                Ok(()) => report.succeeded += 1,
                Err(e) => report.fail(name, e),
            }
        }

        tracing::info!("批量删除: {}", report);
        report
    }

    /// 卸载节点下的全部记录
    pub fn uninstall_node(&mut self, namespace: Namespace, node: NodeId) -> BulkReport {
        let mut report = BulkReport::default();

        for record in self.bulk_targets(namespace, node) {
            let name = record.canonical_name.as_str();
            if self.is_open_dirty(name) {
                report.skip(name, "has unsaved changes");
                continue;
            }
            if !self.can_uninstall_name(name) {
                report.skip(name, "cannot be uninstalled");
                continue;
            }
            match self.uninstall_record(name) {
                Ok(true) => report.succeeded += 1,
                Ok(false) => report.fail(name, "not removed by the host"),
                Err(e) => report.fail(name, e),
            }
        }

        tracing::info!("批量卸载: {}", report);
        report
    }

    // ---- 导出 ----

    /// 导出节点下的全部记录
    ///
    /// 文件写在数据目录中：叶子以规范名称命名，内部节点以完整路径命名。
    ///
    /// # 返回
    /// 写出的文件路径
    pub fn export_node(
        &self,
        namespace: Namespace,
        node: NodeId,
        exporter: &dyn SchemaExporter,
    ) -> Result<PathBuf, SchemaError> {
        let folder = self
            .config
            .data_folder
            .clone()
            .ok_or_else(|| SchemaError::NotPermitted(NO_DATA_FOLDER.to_string()))?;

        let index = self.index(namespace);
        let target = index
            .node(node)
            .ok_or_else(|| SchemaError::NotFound(format!("{:?}", node)))?;
        let file_stem = match target.payload() {
            Some(record) if target.is_leaf() => record.canonical_name.clone(),
            _ => index.path(node).unwrap_or_else(|| target.segment().to_string()),
        };

        let records = self.bulk_targets(namespace, node);
        if records.is_empty() {
            return Err(SchemaError::NotPermitted(format!("{} has no properties to export", file_stem)));
        }

        let path = folder.join(format!("{}.{}", fix_file_name(&file_stem), crate::PROPDESC_EXTENSION));
        exporter.export(&path, &records)?;

        tracing::info!("已导出 {} 条记录到 {}", records.len(), path.display());
        Ok(path)
    }
}

/// 过滤掉没有父段的名称，保证名称树的前置条件
fn well_formed(records: Vec<PropertyRecord>) -> impl Iterator<Item = PropertyRecord> {
    records.into_iter().filter(|record| {
        let ok = record.canonical_name.contains('.');
        if !ok {
            tracing::warn!("忽略没有父段的属性名: {}", record.canonical_name);
        }
        ok
    })
}
