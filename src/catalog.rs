use crate::record::PropertyRecord;
use crate::utils::SchemaError;

/// 系统属性名前缀
pub const SYSTEM_PREFIX: &str = "System.";

/// 加载内置的系统属性目录
///
/// 从内置的 system_properties.json 读取宿主自带的属性，
/// 与本工具安装的记录一起组成已安装命名空间。
///
/// # 返回
/// - `Ok(Vec)`: 全部系统属性，`is_system_property` 已置位
/// - `Err`: JSON 解析失败
pub fn load_system_properties() -> Result<Vec<PropertyRecord>, SchemaError> {
    let json_data = include_str!("../data/system_properties.json");
    let mut records: Vec<PropertyRecord> = serde_json::from_str(json_data)?;

    for record in &mut records {
        record.is_system_property = true;
    }

    Ok(records)
}

/// 名称是否属于宿主保留的系统命名空间
pub fn is_system_name(canonical_name: &str) -> bool {
    canonical_name.starts_with(SYSTEM_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::is_valid_property_name;

    #[test]
    fn test_load_system_properties() {
        let records = load_system_properties().unwrap();

        assert!(records.iter().any(|r| r.canonical_name == "System.Title"));
        assert!(records.iter().any(|r| r.canonical_name == "System.PropGroup.Description"));
        assert!(records.iter().all(|r| r.is_system_property));
        assert!(records.iter().all(|r| r.schema_key.is_assigned()));
    }

    #[test]
    fn test_catalog_names_are_well_formed() {
        for record in load_system_properties().unwrap() {
            assert!(
                is_valid_property_name(&record.canonical_name),
                "bad catalog name {}",
                record.canonical_name
            );
            assert!(is_system_name(&record.canonical_name));
        }
    }

    #[test]
    fn test_is_system_name() {
        assert!(is_system_name("System.Title"));
        assert!(!is_system_name("SystemX.Title"));
        assert!(!is_system_name("Vendor.System"));
    }
}
