/// propdesc 导出实现
///
/// 把记录写成属性描述 XML。只写出与默认值不同的属性，
/// 少数宿主要求必填的属性（类型、显示类型等）总是写出。

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::path::Path;

use super::traits::SchemaExporter;
use crate::datatypes::{
    AggregationType, Alignment, BooleanFormat, ConditionOperation, ConditionType, DateTimeFormat,
    DisplayType, EditControl, GroupingRange, NumberFormat, SortDirection, StringFormat,
};
use crate::record::PropertyRecord;
use crate::utils::SchemaError;

const SCHEMA_NAMESPACE: &str = "http://schemas.microsoft.com/windows/2006/propertydescription";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

type XmlWriter = Writer<Vec<u8>>;

/// 默认的 propdesc 导出器
#[derive(Debug, Clone)]
pub struct PropDescExporter {
    pub publisher: String,
    pub product: String,
}

impl PropDescExporter {
    pub fn new(publisher: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
            product: product.into(),
        }
    }

    /// 生成完整的 propdesc 文档
    pub fn render(&self, records: &[PropertyRecord]) -> Result<String, SchemaError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", None, None)))?;

        let mut root = BytesStart::new("schema");
        root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        root.push_attribute(("xmlns", SCHEMA_NAMESPACE));
        root.push_attribute(("schemaVersion", "1.0"));
        write_event(&mut writer, Event::Start(root))?;

        let mut list = BytesStart::new("propertyDescriptionList");
        list.push_attribute(("publisher", self.publisher.as_str()));
        list.push_attribute(("product", self.product.as_str()));
        write_event(&mut writer, Event::Start(list))?;

        for record in records {
            write_description(&mut writer, record)?;
        }

        write_event(&mut writer, Event::End(BytesEnd::new("propertyDescriptionList")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("schema")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| SchemaError::Store(format!("propdesc is not valid UTF-8: {}", e)))
    }
}

impl Default for PropDescExporter {
    fn default() -> Self {
        Self::new("Publisher", "Product")
    }
}

impl SchemaExporter for PropDescExporter {
    fn export(&self, path: &Path, records: &[PropertyRecord]) -> Result<(), SchemaError> {
        let content = self.render(records)?;

        // 确保父目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

fn write_event(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), SchemaError> {
    writer
        .write_event(event)
        .map_err(|e| SchemaError::Store(format!("propdesc write failed: {}", e)))
}

fn write_description(writer: &mut XmlWriter, record: &PropertyRecord) -> Result<(), SchemaError> {
    let mut desc = BytesStart::new("propertyDescription");
    desc.push_attribute(("name", record.canonical_name.as_str()));
    desc.push_attribute(("formatID", record.schema_key.format_id_braced().as_str()));
    desc.push_attribute(("propID", record.schema_key.property_id.to_string().as_str()));

    let mut search = BytesStart::new("searchInfo");
    search.push_attribute(("inInvertedIndex", bool_text(record.in_inverted_index)));
    if record.is_column {
        search.push_attribute(("isColumn", bool_text(true)));
        search.push_attribute(("isColumnSparse", bool_text(record.is_column_sparse)));
        search.push_attribute(("columnIndexType", record.column_index_type.as_str()));
    }
    if record.max_size != 512 {
        search.push_attribute(("maxSize", record.max_size.to_string().as_str()));
    }
    if let Some(mnemonics) = non_empty(&record.mnemonics) {
        search.push_attribute(("mnemonics", mnemonics));
    }

    let mut label = BytesStart::new("labelInfo");
    if let Some(display_name) = non_empty(&record.display_name) {
        label.push_attribute(("label", display_name));
    }
    label.push_attribute(("sortDescription", record.sort_description.as_str()));
    if let Some(invitation) = non_empty(&record.edit_invitation) {
        label.push_attribute(("invitationText", invitation));
    }
    if record.hide_label {
        label.push_attribute(("hideLabel", bool_text(true)));
    }

    let mut type_info = BytesStart::new("typeInfo");
    type_info.push_attribute(("type", record.property_type.as_str()));
    if record.grouping_range != GroupingRange::Discrete {
        type_info.push_attribute(("groupingRange", record.grouping_range.as_str()));
    }
    if record.is_innate {
        type_info.push_attribute(("isInnate", bool_text(true)));
        if record.can_be_purged {
            type_info.push_attribute(("canBePurged", bool_text(true)));
        }
    }
    type_info.push_attribute(("multipleValues", bool_text(record.multiple_values)));
    if record.is_group {
        type_info.push_attribute(("isGroup", bool_text(true)));
    }
    if record.aggregation_type != AggregationType::Default {
        type_info.push_attribute(("aggregationType", record.aggregation_type.as_str()));
    }
    if record.is_tree_property {
        type_info.push_attribute(("isTreeProperty", bool_text(true)));
    }
    if record.is_viewable {
        type_info.push_attribute(("isViewable", bool_text(true)));
    }
    if record.search_raw_value {
        type_info.push_attribute(("searchRawValue", bool_text(true)));
    }
    if record.condition_type != ConditionType::None {
        type_info.push_attribute(("conditionType", record.condition_type.as_str()));
    }
    if record.condition_operation != ConditionOperation::Equal {
        type_info.push_attribute(("defaultOperation", record.condition_operation.as_str()));
    }

    let mut display = BytesStart::new("displayInfo");
    display.push_attribute(("displayType", record.display_type.as_str()));
    if record.default_column_width != 20 {
        display.push_attribute(("defaultColumnWidth", record.default_column_width.to_string().as_str()));
    }
    if record.alignment != Alignment::Left {
        display.push_attribute(("alignment", record.alignment.as_str()));
    }
    if record.default_sort_direction != SortDirection::Ascending {
        display.push_attribute(("defaultSortDirection", record.default_sort_direction.as_str()));
    }

    // displayInfo 的子元素：对应显示类型的格式，以及编辑控件
    let mut display_children = Vec::new();
    let format = match record.display_type {
        DisplayType::String if record.string_format != StringFormat::General => {
            Some(("stringFormat", record.string_format.as_str()))
        }
        DisplayType::Boolean if record.boolean_format != BooleanFormat::YesNo => {
            Some(("booleanFormat", record.boolean_format.as_str()))
        }
        DisplayType::Number if record.number_format != NumberFormat::General => {
            Some(("numberFormat", record.number_format.as_str()))
        }
        DisplayType::DateTime if record.date_time_format != DateTimeFormat::General => {
            Some(("dateTimeFormat", record.date_time_format.as_str()))
        }
        _ => None,
    };
    if let Some((tag, value)) = format {
        let mut child = BytesStart::new(tag);
        child.push_attribute(("formatAs", value));
        display_children.push(child);
    }
    if record.edit_control != EditControl::Default {
        let mut child = BytesStart::new("editControl");
        child.push_attribute(("control", record.edit_control.as_str()));
        display_children.push(child);
    }

    write_event(writer, Event::Start(desc))?;
    write_event(writer, Event::Empty(search))?;
    write_event(writer, Event::Empty(label))?;
    write_event(writer, Event::Empty(type_info))?;
    if display_children.is_empty() {
        write_event(writer, Event::Empty(display))?;
    } else {
        write_event(writer, Event::Start(display))?;
        for child in display_children {
            write_event(writer, Event::Empty(child))?;
        }
        write_event(writer, Event::End(BytesEnd::new("displayInfo")))?;
    }
    write_event(writer, Event::End(BytesEnd::new("propertyDescription")))
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
