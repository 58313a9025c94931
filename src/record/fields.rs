//! 记录字段表
//!
//! 每个参与复制和比较的字段在这里登记一次，包括它的展示名、
//! 分类以及读取、比较、复制、赋值的访问函数。
//! 复制（`PropertyRecord::copy_from`）、差异比较（`diff`）和
//! 文本赋值（`assign`）都遍历同一张表。

use crate::datatypes::{
    AggregationType, Alignment, BooleanFormat, ColumnIndexType, ConditionOperation, ConditionType,
    DateTimeFormat, DisplayType, EditControl, GroupingRange, NumberFormat, PropertyType,
    RelativeDescriptionType, SortDescription, SortDirection, StringFormat,
};
use crate::editor::delta::Difference;
use crate::record::{PropertyRecord, SchemaKey};
use crate::utils::SchemaError;

/// 字段分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldClass {
    /// 规范名称：总是复制，已安装模式比较时排除
    Name,
    /// 安装托管字段：从已安装记录加载时重置为默认值，已安装模式比较时排除
    Managed,
    /// 普通描述字段
    Plain,
}

/// 单个字段的描述
pub struct FieldSpec {
    pub id: FieldId,
    pub class: FieldClass,
    /// 字段值的文本表示
    pub render: fn(&PropertyRecord) -> String,
    /// 两条记录在该字段上是否相等
    pub same: fn(&PropertyRecord, &PropertyRecord) -> bool,
    /// 把该字段从第二个参数复制到第一个参数
    pub copy: fn(&mut PropertyRecord, &PropertyRecord),
    /// 从文本解析并赋值
    pub assign: fn(&mut PropertyRecord, &str) -> Result<(), SchemaError>,
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("id", &self.id)
            .field("class", &self.class)
            .finish()
    }
}

/// 字段值与文本之间的转换
pub trait FieldValue: Sized {
    fn render(&self) -> String;
    fn parse_text(field: &str, text: &str) -> Result<Self, SchemaError>;
}

impl FieldValue for String {
    fn render(&self) -> String {
        self.clone()
    }

    fn parse_text(_field: &str, text: &str) -> Result<Self, SchemaError> {
        Ok(text.to_string())
    }
}

impl FieldValue for Option<String> {
    fn render(&self) -> String {
        match self {
            Some(value) => value.clone(),
            None => "(none)".to_string(),
        }
    }

    fn parse_text(_field: &str, text: &str) -> Result<Self, SchemaError> {
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.to_string()))
        }
    }
}

/// 通过 `Display` / `FromStr` 实现 `FieldValue`
macro_rules! field_value_via_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn render(&self) -> String {
                    self.to_string()
                }

                fn parse_text(field: &str, text: &str) -> Result<Self, SchemaError> {
                    text.trim()
                        .parse()
                        .map_err(|_| SchemaError::invalid_value(field, text))
                }
            }
        )+
    };
}

field_value_via_str!(
    bool,
    u32,
    SchemaKey,
    PropertyType,
    EditControl,
    ColumnIndexType,
    SortDescription,
    GroupingRange,
    AggregationType,
    ConditionType,
    ConditionOperation,
    DisplayType,
    StringFormat,
    BooleanFormat,
    NumberFormat,
    DateTimeFormat,
    Alignment,
    RelativeDescriptionType,
    SortDirection,
);

macro_rules! field_table {
    ($($id:ident => $field:ident : $class:ident),+ $(,)?) => {
        /// 字段标识
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum FieldId {
            $($id),+
        }

        impl FieldId {
            /// 字段展示名
            pub fn name(self) -> &'static str {
                match self {
                    $(FieldId::$id => stringify!($id)),+
                }
            }
        }

        /// 字段表，顺序即差异列表的顺序
        pub static FIELDS: &[FieldSpec] = &[
            $(FieldSpec {
                id: FieldId::$id,
                class: FieldClass::$class,
                render: |record| FieldValue::render(&record.$field),
                same: |a, b| a.$field == b.$field,
                copy: |to, from| to.$field = from.$field.clone(),
                assign: |record, text| {
                    record.$field = FieldValue::parse_text(stringify!($id), text)?;
                    Ok(())
                },
            }),+
        ];
    };
}

field_table! {
    // 基本信息
    CanonicalName => canonical_name: Name,
    SchemaKey => schema_key: Managed,

    // 搜索
    InInvertedIndex => in_inverted_index: Managed,
    IsColumn => is_column: Managed,
    IsColumnSparse => is_column_sparse: Managed,
    ColumnIndexType => column_index_type: Managed,
    MaxSize => max_size: Managed,
    Mnemonics => mnemonics: Managed,

    // 标签
    DisplayName => display_name: Plain,
    SortDescription => sort_description: Plain,
    EditInvitation => edit_invitation: Plain,
    HideLabel => hide_label: Plain,

    // 类型
    Type => property_type: Plain,
    GroupingRange => grouping_range: Plain,
    IsInnate => is_innate: Plain,
    CanBePurged => can_be_purged: Plain,
    MultipleValues => multiple_values: Plain,
    IsGroup => is_group: Plain,
    AggregationType => aggregation_type: Plain,
    IsTreeProperty => is_tree_property: Plain,
    IsViewable => is_viewable: Plain,
    SearchRawValue => search_raw_value: Managed,
    ConditionType => condition_type: Plain,
    ConditionOperation => condition_operation: Managed,

    // 显示
    DisplayType => display_type: Plain,
    StringFormat => string_format: Managed,
    BooleanFormat => boolean_format: Managed,
    NumberFormat => number_format: Managed,
    DateTimeFormat => date_time_format: Managed,
    DefaultColumnWidth => default_column_width: Plain,
    Alignment => alignment: Plain,
    RelativeDescriptionType => relative_description_type: Plain,
    DefaultSortDirection => default_sort_direction: Plain,
    EditControl => edit_control: Managed,
}

/// 按展示名查找字段（不区分大小写）
pub fn find(name: &str) -> Option<&'static FieldSpec> {
    FIELDS
        .iter()
        .find(|spec| spec.id.name().eq_ignore_ascii_case(name.trim()))
}

/// 逐字段比较 `current` 与 `previous`
///
/// `installed_mode` 为真时跳过名称和所有安装托管字段。
pub fn diff(current: &PropertyRecord, previous: &PropertyRecord, installed_mode: bool) -> Vec<Difference> {
    FIELDS
        .iter()
        .filter(|spec| !installed_mode || spec.class == FieldClass::Plain)
        .filter(|spec| !(spec.same)(current, previous))
        .map(|spec| Difference::new(spec.id, (spec.render)(previous), (spec.render)(current)))
        .collect()
}

/// 以文本形式给指定字段赋值
pub fn assign(record: &mut PropertyRecord, field: &str, text: &str) -> Result<(), SchemaError> {
    let spec = find(field).ok_or_else(|| SchemaError::UnknownField(field.to_string()))?;
    (spec.assign)(record, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_records_have_no_differences() {
        let record = PropertyRecord::new("A.B");
        assert!(diff(&record, &record.clone(), false).is_empty());
        assert!(diff(&record, &record.clone(), true).is_empty());
    }

    #[test]
    fn test_single_field_difference() {
        let baseline = PropertyRecord::new("A.B");
        let mut draft = baseline.clone();
        draft.display_name = Some("New".to_string());

        let differences = diff(&draft, &baseline, false);
        assert_eq!(differences.len(), 1);
        assert_eq!(differences[0].field, FieldId::DisplayName);
        assert_eq!(differences[0].previous, "(none)");
        assert_eq!(differences[0].current, "New");
    }

    #[test]
    fn test_installed_mode_skips_name_and_managed_fields() {
        let baseline = PropertyRecord::new("A.B");
        let mut draft = baseline.clone();
        draft.canonical_name = "A.C".to_string();
        draft.schema_key = SchemaKey::mint();
        draft.mnemonics = Some("x".to_string());
        draft.edit_control = EditControl::Rating;
        draft.hide_label = true;

        let all = diff(&draft, &baseline, false);
        assert_eq!(all.len(), 5);

        let installed = diff(&draft, &baseline, true);
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].field, FieldId::HideLabel);
    }

    #[test]
    fn test_diff_order_follows_table() {
        let baseline = PropertyRecord::new("A.B");
        let mut draft = baseline.clone();
        draft.edit_control = EditControl::Text;
        draft.display_name = Some("B".to_string());

        let fields: Vec<FieldId> = diff(&draft, &baseline, false).iter().map(|d| d.field).collect();
        assert_eq!(fields, vec![FieldId::DisplayName, FieldId::EditControl]);
    }

    #[test]
    fn test_assign_by_name() {
        let mut record = PropertyRecord::new("A.B");

        assign(&mut record, "DisplayName", "Label").unwrap();
        assign(&mut record, "maxsize", "1024").unwrap();
        assign(&mut record, "Type", "String").unwrap();
        assign(&mut record, "IsColumn", "true").unwrap();
        assign(&mut record, "Mnemonics", "").unwrap();

        assert_eq!(record.display_name.as_deref(), Some("Label"));
        assert_eq!(record.max_size, 1024);
        assert_eq!(record.property_type, PropertyType::String);
        assert!(record.is_column);
        assert_eq!(record.mnemonics, None);
    }

    #[test]
    fn test_assign_errors() {
        let mut record = PropertyRecord::new("A.B");
        assert!(matches!(
            assign(&mut record, "NoSuchField", "x"),
            Err(SchemaError::UnknownField(_))
        ));
        assert!(matches!(
            assign(&mut record, "MaxSize", "lots"),
            Err(SchemaError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_every_field_name_is_unique() {
        let mut names: Vec<&str> = FIELDS.iter().map(|spec| spec.id.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FIELDS.len());
    }
}
