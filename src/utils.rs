use thiserror::Error;

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{0}")]
    InvalidName(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Property not found: {0}")]
    NotFound(String),

    #[error("Operation not permitted: {0}")]
    NotPermitted(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SchemaError {
    /// 构造字段值解析错误
    pub fn invalid_value(field: &str, value: &str) -> Self {
        SchemaError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// 属性名结构校验
///
/// 规则：至少两段，以 `.` 分隔；每段以大写字母开头，只包含字母和数字。
pub fn is_valid_property_name(name: &str) -> bool {
    let mut segments = 0;

    for segment in name.split('.') {
        if !is_valid_segment(segment) {
            return false;
        }
        segments += 1;
    }

    segments >= 2
}

/// 检查单个名称段
fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// 替换文件名中的非法字符
pub fn fix_file_name(file_name: &str) -> String {
    let mut fixed = String::with_capacity(file_name.len());
    let mut in_run = false;

    for c in file_name.chars() {
        if matches!(c, '\\' | '/' | '?' | ':' | '*' | '"' | '>' | '<' | '|') {
            // 连续的非法字符合并为一个下划线
            if !in_run {
                fixed.push('_');
            }
            in_run = true;
        } else {
            fixed.push(c);
            in_run = false;
        }
    }

    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_name_validation() {
        // 有效名称
        assert!(is_valid_property_name("System.Title"));
        assert!(is_valid_property_name("Vendor.Product.Field2"));
        assert!(is_valid_property_name("A.B"));

        // 无效名称
        assert!(!is_valid_property_name("system.title"));
        assert!(!is_valid_property_name("System"));
        assert!(!is_valid_property_name("System."));
        assert!(!is_valid_property_name(".Title"));
        assert!(!is_valid_property_name("System..Title"));
        assert!(!is_valid_property_name("System.Ti_tle"));
        assert!(!is_valid_property_name("System.2Title"));
        assert!(!is_valid_property_name(""));
    }

    #[test]
    fn test_fix_file_name() {
        assert_eq!(fix_file_name("Vendor.App.Field"), "Vendor.App.Field");
        assert_eq!(fix_file_name("a/b\\c"), "a_b_c");
        assert_eq!(fix_file_name("a<>|b"), "a_b");
        assert_eq!(fix_file_name("what?"), "what_");
    }
}
