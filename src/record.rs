use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::datatypes::{
    AggregationType, Alignment, BooleanFormat, ColumnIndexType, ConditionOperation, ConditionType,
    DateTimeFormat, DisplayType, EditControl, GroupingRange, InstalledConditionOperation,
    NumberFormat, PropertyType, RelativeDescriptionType, SortDescription, SortDirection,
    StringFormat, ViewFlags,
};
use crate::utils::SchemaError;

pub mod fields;

/// 系统保留的 PropertyID（0 和 1），自定义属性从 2 开始编号
pub const FIRST_USER_PROPERTY_ID: u32 = 2;

/// 属性键：FormatID + PropertyID
///
/// FormatID 为 nil 表示尚未分配属性键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SchemaKey {
    pub format_id: Uuid,
    pub property_id: u32,
}

impl SchemaKey {
    pub fn new(format_id: Uuid, property_id: u32) -> Self {
        Self { format_id, property_id }
    }

    /// 生成新的 FormatID，PropertyID 从第一个非保留值开始
    pub fn mint() -> Self {
        Self::new(Uuid::new_v4(), FIRST_USER_PROPERTY_ID)
    }

    /// 是否已分配
    pub fn is_assigned(&self) -> bool {
        !self.format_id.is_nil()
    }

    /// propdesc 中使用的 FormatID 写法：`{XXXXXXXX-...}` 大写
    pub fn format_id_braced(&self) -> String {
        format!("{{{}}}", self.format_id.hyphenated()).to_uppercase()
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.format_id_braced(), self.property_id)
    }
}

impl FromStr for SchemaKey {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (format_id, property_id) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| SchemaError::invalid_value("SchemaKey", s))?;

        let format_id = format_id.trim_start_matches('{').trim_end_matches('}');
        let format_id =
            Uuid::parse_str(format_id).map_err(|_| SchemaError::invalid_value("SchemaKey", s))?;
        let property_id = property_id
            .parse()
            .map_err(|_| SchemaError::invalid_value("SchemaKey", s))?;

        Ok(Self::new(format_id, property_id))
    }
}

/// 属性描述记录
///
/// 一个点分名称对应一条记录。字段按 propdesc 的分区组织：
/// 基本信息、搜索、标签、类型、显示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyRecord {
    // 基本信息
    /// 区分大小写的规范名称，例如 `Vendor.App.Field`
    pub canonical_name: String,
    pub schema_key: SchemaKey,

    // 搜索
    pub in_inverted_index: bool,
    pub is_column: bool,
    pub is_column_sparse: bool,
    pub column_index_type: ColumnIndexType,
    /// 搜索数据库中允许的最大字节数
    pub max_size: u32,
    /// 以 `|` 分隔的助记符
    pub mnemonics: Option<String>,

    // 标签
    pub display_name: Option<String>,
    pub sort_description: SortDescription,
    pub edit_invitation: Option<String>,
    pub hide_label: bool,

    // 类型
    pub property_type: PropertyType,
    pub grouping_range: GroupingRange,
    pub is_innate: bool,
    pub can_be_purged: bool,
    pub multiple_values: bool,
    pub is_group: bool,
    pub aggregation_type: AggregationType,
    pub is_tree_property: bool,
    pub is_viewable: bool,
    pub search_raw_value: bool,
    pub condition_type: ConditionType,
    pub condition_operation: ConditionOperation,
    /// 仅已安装记录有意义
    pub condition_operation_installed: InstalledConditionOperation,

    // 显示
    pub display_type: DisplayType,
    pub string_format: StringFormat,
    pub boolean_format: BooleanFormat,
    pub number_format: NumberFormat,
    pub date_time_format: DateTimeFormat,
    pub default_column_width: u32,
    pub alignment: Alignment,
    pub relative_description_type: RelativeDescriptionType,
    pub default_sort_direction: SortDirection,
    pub edit_control: EditControl,

    // 其他
    pub is_system_property: bool,
    pub view_flags: ViewFlags,
}

impl Default for PropertyRecord {
    fn default() -> Self {
        PropertyRecord {
            canonical_name: String::new(),
            schema_key: SchemaKey::default(),

            in_inverted_index: false,
            is_column: false,
            is_column_sparse: true,
            column_index_type: ColumnIndexType::OnDemand,
            max_size: 512,
            mnemonics: None,

            display_name: None,
            sort_description: SortDescription::General,
            edit_invitation: None,
            hide_label: false,

            property_type: PropertyType::Any,
            grouping_range: GroupingRange::Discrete,
            is_innate: false,
            can_be_purged: false,
            multiple_values: false,
            is_group: false,
            aggregation_type: AggregationType::Default,
            is_tree_property: false,
            is_viewable: false,
            search_raw_value: false,
            condition_type: ConditionType::None,
            condition_operation: ConditionOperation::Equal,
            condition_operation_installed: InstalledConditionOperation::Implicit,

            display_type: DisplayType::String,
            string_format: StringFormat::General,
            boolean_format: BooleanFormat::YesNo,
            number_format: NumberFormat::General,
            date_time_format: DateTimeFormat::General,
            default_column_width: 20,
            alignment: Alignment::Left,
            relative_description_type: RelativeDescriptionType::General,
            default_sort_direction: SortDirection::Ascending,
            edit_control: EditControl::Default,

            is_system_property: false,
            view_flags: ViewFlags::empty(),
        }
    }
}

impl PropertyRecord {
    /// 以默认值创建指定名称的记录
    pub fn new(canonical_name: impl Into<String>) -> Self {
        PropertyRecord {
            canonical_name: canonical_name.into(),
            ..Default::default()
        }
    }

    /// 恢复全部字段为默认值
    pub fn set_default_values(&mut self) {
        *self = PropertyRecord::default();
    }

    /// 按字段表从 `source` 复制
    ///
    /// `from_installed` 为真时，安装托管字段不复制而是保持默认值；
    /// 仅属于已安装记录的字段（系统标志、视图标志、已安装条件运算）从不复制。
    pub fn copy_from(&mut self, source: &PropertyRecord, from_installed: bool) {
        self.set_default_values();

        for spec in fields::FIELDS {
            if from_installed && spec.class == fields::FieldClass::Managed {
                continue;
            }
            (spec.copy)(self, source);
        }
    }

    /// 用于按钮标题的缩略名称
    ///
    /// 20 个字符以内原样返回，否则保留首尾各 10 个字符。
    pub fn bounded_name(&self) -> String {
        let chars: Vec<char> = self.canonical_name.chars().collect();
        if chars.len() < 20 {
            return self.canonical_name.clone();
        }

        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 10..].iter().collect();
        format!("{}...{}", head, tail)
    }

    /// 安装托管字段是否都处于默认值
    ///
    /// 不是默认值时，安装后的表示会丢失这些信息。
    pub fn managed_fields_are_default(&self) -> bool {
        let defaults = PropertyRecord::default();
        fields::FIELDS
            .iter()
            .filter(|spec| spec.class == fields::FieldClass::Managed)
            .filter(|spec| spec.id != fields::FieldId::SchemaKey)
            .all(|spec| (spec.same)(self, &defaults))
    }

    /// 安装后宿主上报的表示
    ///
    /// 保留名称、属性键和普通字段；托管字段回到默认值，
    /// 条件运算和视图标志换成已安装的形式。
    pub fn installed_form(&self) -> PropertyRecord {
        let mut installed = PropertyRecord::default();
        installed.copy_from(self, true);
        installed.schema_key = self.schema_key;
        installed.condition_operation_installed = self.condition_operation.to_installed();

        let mut flags = ViewFlags::empty();
        match self.alignment {
            Alignment::Center => flags |= ViewFlags::CENTER_ALIGN,
            Alignment::Right => flags |= ViewFlags::RIGHT_ALIGN,
            Alignment::Left => {}
        }
        if self.hide_label {
            flags |= ViewFlags::HIDE_LABEL;
        }
        if self.default_sort_direction == SortDirection::Descending {
            flags |= ViewFlags::SORT_DESCENDING;
        }
        installed.view_flags = flags;
        installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PropertyRecord {
        let mut record = PropertyRecord::new("Vendor.App.Field");
        record.schema_key = SchemaKey::new(Uuid::new_v4(), 5);
        record.display_name = Some("Field".to_string());
        record.mnemonics = Some("fld|field".to_string());
        record.is_column = true;
        record.string_format = StringFormat::FileName;
        record.edit_control = EditControl::MultiLineText;
        record.condition_operation = ConditionOperation::Contains;
        record.property_type = PropertyType::String;
        record
    }

    #[test]
    fn test_copy_from_saved_copies_everything() {
        let source = sample_record();
        let mut draft = PropertyRecord::default();
        draft.copy_from(&source, false);

        assert_eq!(draft, source);
    }

    #[test]
    fn test_copy_from_installed_resets_managed_fields() {
        let source = sample_record();
        let mut draft = PropertyRecord::default();
        draft.copy_from(&source, true);

        // 非托管字段原样复制
        assert_eq!(draft.canonical_name, "Vendor.App.Field");
        assert_eq!(draft.display_name.as_deref(), Some("Field"));
        assert_eq!(draft.property_type, PropertyType::String);

        // 托管字段恢复默认
        assert!(!draft.schema_key.is_assigned());
        assert_eq!(draft.mnemonics, None);
        assert!(!draft.is_column);
        assert_eq!(draft.string_format, StringFormat::General);
        assert_eq!(draft.edit_control, EditControl::Default);
        assert_eq!(draft.condition_operation, ConditionOperation::Equal);
    }

    #[test]
    fn test_copy_never_carries_installed_only_fields() {
        let mut source = sample_record();
        source.is_system_property = true;
        source.view_flags = ViewFlags::HIDDEN;

        let mut draft = PropertyRecord::default();
        draft.copy_from(&source, false);

        assert!(!draft.is_system_property);
        assert_eq!(draft.view_flags, ViewFlags::empty());
    }

    #[test]
    fn test_bounded_name() {
        assert_eq!(PropertyRecord::new("System.Title").bounded_name(), "System.Title");

        let long = PropertyRecord::new("Vendor.Product.SomeVeryLongField");
        assert_eq!(long.bounded_name(), "Vendor.Pro...yLongField");
    }

    #[test]
    fn test_schema_key_text() {
        let key = SchemaKey::new(
            Uuid::parse_str("581cf603-2925-4acf-bb5a-3d3eb39eacd3").unwrap(),
            3,
        );
        assert_eq!(key.to_string(), "{581CF603-2925-4ACF-BB5A-3D3EB39EACD3}/3");
        assert_eq!(key.to_string().parse::<SchemaKey>().unwrap(), key);
        assert!(!SchemaKey::default().is_assigned());
        assert_eq!(SchemaKey::mint().property_id, FIRST_USER_PROPERTY_ID);
    }

    #[test]
    fn test_managed_fields_are_default() {
        let mut record = PropertyRecord::new("A.B");
        record.schema_key = SchemaKey::mint();
        assert!(record.managed_fields_are_default());

        record.mnemonics = Some("ab".to_string());
        assert!(!record.managed_fields_are_default());
    }

    #[test]
    fn test_installed_form() {
        let mut record = sample_record();
        record.hide_label = true;
        record.alignment = Alignment::Right;

        let installed = record.installed_form();
        assert_eq!(installed.canonical_name, record.canonical_name);
        assert_eq!(installed.schema_key, record.schema_key);
        assert_eq!(installed.mnemonics, None);
        assert_eq!(installed.edit_control, EditControl::Default);
        assert_eq!(
            installed.condition_operation_installed,
            InstalledConditionOperation::ValueContains
        );
        assert_eq!(installed.view_flags, ViewFlags::RIGHT_ALIGN | ViewFlags::HIDE_LABEL);

        // 已安装模式下与原记录没有差异
        assert!(fields::diff(&record, &installed, true).is_empty());
    }

    #[test]
    fn test_json_with_missing_fields_uses_defaults() {
        let record: PropertyRecord =
            serde_json::from_str(r#"{"canonical_name":"A.B","display_name":"B"}"#).unwrap();
        assert_eq!(record.max_size, 512);
        assert!(record.is_column_sparse);
        assert_eq!(record.display_name.as_deref(), Some("B"));
    }
}
