/// 草稿 / 基线调和模块
///
/// 维护唯一的草稿记录、它的比较基线以及脏状态。
/// 每次修改草稿或切换比较目标后重新计算差异；批量更新期间暂停重算。

use crate::io::ConfirmPrompt;
use crate::record::fields;
use crate::record::PropertyRecord;

use super::delta::DiffReport;

/// 放弃未保存修改前的确认问题
pub const DISCARD_QUESTION: &str = "Discard changes to the current property?";

/// 基线来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselineKind {
    /// 新建的草稿，没有来源
    #[default]
    Standalone,
    FromSaved,
    FromInstalled,
}

/// 草稿调和器
///
/// # 核心特性
/// - 草稿对象在整个生命周期内只有一个，加载只覆盖字段值
/// - 有效基线可以被“与已保存比较”“与已安装比较”两个开关替换
/// - 没有基线时报告“无基线”，草稿不会是脏的
#[derive(Debug, Clone)]
pub struct EditorReconciler {
    draft: PropertyRecord,
    baseline: Option<PropertyRecord>,
    kind: BaselineKind,
    report: DiffReport,
    bulk_updating: bool,
    compare_saved: bool,
    compare_installed: bool,
    /// 当前选中的已保存记录
    selected_saved: Option<PropertyRecord>,
    /// 当前选中的已安装记录
    selected_installed: Option<PropertyRecord>,
}

impl Default for EditorReconciler {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl EditorReconciler {
    /// 创建调和器，初始为空白的独立草稿
    ///
    /// # 参数
    /// * `compare_saved` - 草稿来自已安装记录时，是否与选中的已保存记录比较
    /// * `compare_installed` - 草稿不来自已安装记录时，是否与选中的已安装记录比较
    pub fn new(compare_saved: bool, compare_installed: bool) -> Self {
        Self {
            draft: PropertyRecord::default(),
            baseline: None,
            kind: BaselineKind::Standalone,
            report: DiffReport::NoBaseline,
            bulk_updating: false,
            compare_saved,
            compare_installed,
            selected_saved: None,
            selected_installed: None,
        }
    }

    pub fn draft(&self) -> &PropertyRecord {
        &self.draft
    }

    pub fn baseline(&self) -> Option<&PropertyRecord> {
        self.baseline.as_ref()
    }

    pub fn kind(&self) -> BaselineKind {
        self.kind
    }

    pub fn report(&self) -> &DiffReport {
        &self.report
    }

    pub fn is_dirty(&self) -> bool {
        self.report.is_dirty()
    }

    pub fn is_bulk_updating(&self) -> bool {
        self.bulk_updating
    }

    pub fn compare_saved(&self) -> bool {
        self.compare_saved
    }

    pub fn compare_installed(&self) -> bool {
        self.compare_installed
    }

    pub fn selected_saved(&self) -> Option<&PropertyRecord> {
        self.selected_saved.as_ref()
    }

    pub fn selected_installed(&self) -> Option<&PropertyRecord> {
        self.selected_installed.as_ref()
    }

    /// 从来源记录加载草稿
    ///
    /// # 参数
    /// * `source` - 新的基线
    /// * `kind` - 基线来源
    /// * `force` - 为真时不询问直接覆盖
    /// * `prompt` - 草稿是脏的，或离开已安装来源时用于确认
    ///
    /// # 返回
    /// 操作员拒绝时返回 `false`，状态不变
    pub fn load_draft(
        &mut self,
        source: &PropertyRecord,
        kind: BaselineKind,
        force: bool,
        prompt: &dyn ConfirmPrompt,
    ) -> bool {
        if !force && self.needs_confirmation(kind) && !prompt.confirm(DISCARD_QUESTION) {
            tracing::debug!("操作员拒绝覆盖草稿: {}", self.draft.canonical_name);
            return false;
        }

        self.apply_load(source, kind);
        true
    }

    /// 重置为指定名称的空白草稿（没有基线）
    pub fn reset_draft(&mut self, canonical_name: &str, force: bool, prompt: &dyn ConfirmPrompt) -> bool {
        if !force && self.needs_confirmation(BaselineKind::Standalone) && !prompt.confirm(DISCARD_QUESTION) {
            return false;
        }

        self.bulk_updating = true;
        self.draft.set_default_values();
        self.draft.canonical_name = canonical_name.to_string();
        self.baseline = None;
        self.kind = BaselineKind::Standalone;
        self.bulk_updating = false;
        self.refresh();
        true
    }

    fn needs_confirmation(&self, next: BaselineKind) -> bool {
        let leaving_installed = self.kind == BaselineKind::FromInstalled && next != BaselineKind::FromInstalled;
        self.is_dirty() || leaving_installed
    }

    fn apply_load(&mut self, source: &PropertyRecord, kind: BaselineKind) {
        self.bulk_updating = true;
        self.draft.copy_from(source, kind == BaselineKind::FromInstalled);
        self.baseline = Some(source.clone());
        self.kind = kind;
        self.bulk_updating = false;

        tracing::debug!("草稿已加载: {} ({:?})", source.canonical_name, kind);
        self.refresh();
    }

    /// 修改草稿，完成后重算差异
    pub fn update_draft<R>(&mut self, edit: impl FnOnce(&mut PropertyRecord) -> R) -> R {
        let result = edit(&mut self.draft);
        self.refresh();
        result
    }

    /// 批量更新：期间的多次修改只在结束时重算一次
    pub fn bulk_update<R>(&mut self, edit: impl FnOnce(&mut Self) -> R) -> R {
        let was_bulk = self.bulk_updating;
        self.bulk_updating = true;
        let result = edit(self);
        self.bulk_updating = was_bulk;
        self.refresh();
        result
    }

    /// 草稿已保存为 `record`：基线换成该记录，草稿同步
    pub fn mark_saved(&mut self, record: &PropertyRecord) {
        self.selected_saved = Some(record.clone());
        self.apply_load(record, BaselineKind::FromSaved);
    }

    /// 基线被删除后，草稿保留但不再有基线
    pub fn detach_baseline(&mut self) {
        self.baseline = None;
        self.kind = BaselineKind::Standalone;
        self.refresh();
    }

    /// 放弃修改：重新加载基线，没有基线时恢复默认值
    pub fn discard(&mut self) {
        match self.baseline.clone() {
            Some(baseline) => self.apply_load(&baseline, self.kind),
            None => {
                let name = self.draft.canonical_name.clone();
                self.draft.set_default_values();
                self.draft.canonical_name = name;
                self.refresh();
            }
        }
    }

    pub fn set_compare_saved(&mut self, enabled: bool) {
        self.compare_saved = enabled;
        self.refresh();
    }

    pub fn set_compare_installed(&mut self, enabled: bool) {
        self.compare_installed = enabled;
        self.refresh();
    }

    pub fn select_saved(&mut self, record: Option<PropertyRecord>) {
        self.selected_saved = record;
        self.refresh();
    }

    pub fn select_installed(&mut self, record: Option<PropertyRecord>) {
        self.selected_installed = record;
        self.refresh();
    }

    /// 有效基线，以及是否按已安装方式比较
    pub fn effective_baseline(&self) -> Option<(&PropertyRecord, bool)> {
        let from_installed = self.kind == BaselineKind::FromInstalled;

        if self.compare_saved && from_installed {
            return self.selected_saved.as_ref().map(|record| (record, false));
        }
        if self.compare_installed && !from_installed {
            return self.selected_installed.as_ref().map(|record| (record, true));
        }
        self.baseline.as_ref().map(|record| (record, from_installed))
    }

    /// 重新计算差异（批量更新期间跳过）
    pub fn refresh(&mut self) {
        if self.bulk_updating {
            return;
        }

        self.report = match self.effective_baseline() {
            Some((baseline, installed_mode)) => {
                DiffReport::Compared(fields::diff(&self.draft, baseline, installed_mode))
            }
            None => DiffReport::NoBaseline,
        };
    }
}
