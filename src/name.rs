//! 点分属性名的拆分与拼接
//!
//! 所有函数都是纯函数，不持有状态。

/// 名称最后一段（最后一个 `.` 之后的部分），没有 `.` 时返回整个名称
pub fn last_segment(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) => &name[index + 1..],
        None => name,
    }
}

/// 父路径（最后一个 `.` 之前的部分），没有 `.` 时返回 `None`，表示名称本身是根
pub fn parent_path(name: &str) -> Option<&str> {
    name.rfind('.').map(|index| &name[..index])
}

/// 拆出第一段和剩余部分
///
/// 没有 `.` 时剩余部分为空字符串。
pub fn first_segment(name: &str) -> (&str, &str) {
    match name.find('.') {
        Some(index) => (&name[..index], &name[index + 1..]),
        None => (name, ""),
    }
}

/// 拼接父路径和名称段
pub fn join(parent: Option<&str>, segment: &str) -> String {
    match parent {
        Some(parent) => format!("{}.{}", parent, segment),
        None => segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("Vendor.App.Field"), "Field");
        assert_eq!(last_segment("System.Title"), "Title");
        assert_eq!(last_segment("System"), "System");
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("Vendor.App.Field"), Some("Vendor.App"));
        assert_eq!(parent_path("System.Title"), Some("System"));
        assert_eq!(parent_path("System"), None);
    }

    #[test]
    fn test_first_segment() {
        assert_eq!(first_segment("Vendor.App.Field"), ("Vendor", "App.Field"));
        assert_eq!(first_segment("Field"), ("Field", ""));
    }

    #[test]
    fn test_join_inverts_split() {
        let name = "Vendor.App.Field";
        assert_eq!(join(parent_path(name), last_segment(name)), name);
        assert_eq!(join(None, "Vendor"), "Vendor");
    }
}
