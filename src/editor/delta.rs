/// 草稿差异模块
///
/// 该模块描述草稿与基线之间的字段级差异，以及差异比较的整体结果。
/// 差异按字段表顺序排列，可以直接渲染为给操作员看的文本。

use std::fmt;

use crate::record::fields::FieldId;

/// 单个字段的差异
///
/// 记录字段在基线中的值和在草稿中的当前值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    /// 字段标识
    pub field: FieldId,
    /// 基线中的值
    pub previous: String,
    /// 草稿中的当前值
    pub current: String,
}

impl Difference {
    pub fn new(field: FieldId, previous: String, current: String) -> Self {
        Self {
            field,
            previous,
            current,
        }
    }

    /// 字段展示名
    pub fn field_name(&self) -> &'static str {
        self.field.name()
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} changed from {} to {}",
            self.field_name(),
            truncate(&self.previous),
            truncate(&self.current)
        )
    }
}

/// 超过 30 个字符的值截断显示
fn truncate(value: &str) -> String {
    if value.chars().count() > 30 {
        format!("{}...", value.chars().take(30).collect::<String>())
    } else {
        value.to_string()
    }
}

/// 差异比较结果
///
/// # 状态
/// - `NoBaseline`: 没有可比较的基线，草稿不可能是脏的
/// - `Compared`: 已与基线比较，列表为空表示没有差异
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffReport {
    NoBaseline,
    Compared(Vec<Difference>),
}

impl DiffReport {
    /// 是否存在差异
    pub fn is_dirty(&self) -> bool {
        match self {
            DiffReport::NoBaseline => false,
            DiffReport::Compared(differences) => !differences.is_empty(),
        }
    }

    /// 差异列表（无基线时为空）
    pub fn differences(&self) -> &[Difference] {
        match self {
            DiffReport::NoBaseline => &[],
            DiffReport::Compared(differences) => differences,
        }
    }

    /// 差异数量
    pub fn len(&self) -> usize {
        self.differences().len()
    }

    pub fn is_empty(&self) -> bool {
        self.differences().is_empty()
    }

    /// 查找指定字段的差异
    pub fn get(&self, field: FieldId) -> Option<&Difference> {
        self.differences().iter().find(|d| d.field == field)
    }
}

impl Default for DiffReport {
    fn default() -> Self {
        DiffReport::NoBaseline
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffReport::NoBaseline => write!(f, "No baseline selected"),
            DiffReport::Compared(differences) if differences.is_empty() => write!(f, "No differences"),
            DiffReport::Compared(differences) => {
                writeln!(f, "Differences are:")?;
                for difference in differences {
                    writeln!(f, "{}", difference)?;
                }
                Ok(())
            }
        }
    }
}
