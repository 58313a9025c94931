use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::SchemaError;

/// 生成带字符串转换的字段枚举
///
/// 展示名与 propdesc 文件中的取值一致，解析时不区分大小写。
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// 全部取值（按声明顺序）
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = SchemaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| SchemaError::invalid_value(stringify!($name), s))
            }
        }
    };
}

string_enum! {
    /// 属性值类型
    PropertyType {
        Any, Null, String, Boolean, Byte, Buffer, Int16, UInt16, Int32, UInt32,
        Int64, UInt64, Double, DateTime, Guid, Blob, Stream, Clipboard, Object,
    } default Any
}

string_enum! {
    /// 编辑控件
    EditControl {
        Default, Calendar, CheckboxDropList, DropList, MultiLineText,
        MultiValueText, Rating, Text, IconList,
    } default Default
}

string_enum! {
    /// 搜索列的二级索引策略
    ColumnIndexType { NotIndexed, OnDisk, OnDiskAll, OnDiskVector, OnDemand } default OnDemand
}

string_enum! {
    /// 排序描述措辞
    SortDescription { General, AToZ, LowestHighest, SmallestBiggest, OldestNewest } default General
}

string_enum! {
    /// 分组方式
    GroupingRange { Discrete, Alphanumeric, Size, Dynamic, Date, Percent, Enumerated } default Discrete
}

string_enum! {
    /// 多选时的值聚合方式
    AggregationType { Default, First, Sum, Average, DateRange, Union, Maximum, Minimum } default Default
}

string_enum! {
    /// 查询条件类型
    ConditionType { None, String, Size, DateTime, Boolean, Number } default None
}

string_enum! {
    /// 可配置的默认条件运算（propdesc 中的 defaultOperation）
    ConditionOperation { Equal, NotEqual, LessThan, GreaterThan, Contains } default Equal
}

string_enum! {
    /// 已安装属性上报的条件运算
    ///
    /// 取值集合与可配置版本不同，只能有损映射。
    InstalledConditionOperation {
        Implicit, Equal, NotEqual, LessThan, GreaterThan, LessThanOrEqual,
        GreaterThanOrEqual, ValueStartsWith, ValueEndsWith, ValueContains,
        ValueNotContains, DosWildCards, WordEqual, WordStartsWith, ApplicationSpecific,
    } default Implicit
}

string_enum! {
    /// 显示类型
    DisplayType { String, Number, Boolean, DateTime, Enumerated } default String
}

string_enum! {
    StringFormat { General, FileName } default General
}

string_enum! {
    BooleanFormat { YesNo, OnOff } default YesNo
}

string_enum! {
    NumberFormat { General, Percentage, ByteSize, KBSize, SectorSize, Duration } default General
}

string_enum! {
    DateTimeFormat { General, Month, YearMonth, Year, MonthDay, Day, DateOnly, TimeOnly } default General
}

string_enum! {
    /// 列对齐
    Alignment { Left, Center, Right } default Left
}

string_enum! {
    RelativeDescriptionType {
        General, Date, Size, Count, Revision, Length, Duration, Speed, Rate, Rating, Priority,
    } default General
}

string_enum! {
    SortDirection { Ascending, Descending } default Ascending
}

impl ConditionOperation {
    /// 从已安装的条件运算映射到可配置的条件运算
    pub fn from_installed(operation: InstalledConditionOperation) -> Self {
        use InstalledConditionOperation as I;

        match operation {
            I::NotEqual | I::ValueNotContains => ConditionOperation::NotEqual,
            I::LessThan | I::LessThanOrEqual => ConditionOperation::LessThan,
            I::GreaterThan | I::GreaterThanOrEqual => ConditionOperation::GreaterThan,
            I::ValueContains | I::ValueEndsWith | I::ValueStartsWith | I::WordStartsWith => {
                ConditionOperation::Contains
            }
            _ => ConditionOperation::Equal,
        }
    }

    /// 安装后宿主上报的条件运算
    pub fn to_installed(self) -> InstalledConditionOperation {
        match self {
            ConditionOperation::Equal => InstalledConditionOperation::Equal,
            ConditionOperation::NotEqual => InstalledConditionOperation::NotEqual,
            ConditionOperation::LessThan => InstalledConditionOperation::LessThan,
            ConditionOperation::GreaterThan => InstalledConditionOperation::GreaterThan,
            ConditionOperation::Contains => InstalledConditionOperation::ValueContains,
        }
    }
}

// 视图标志位定义
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ViewFlags: u32 {
        const CENTER_ALIGN = 0x00000001;
        const RIGHT_ALIGN = 0x00000002;
        const BEGIN_NEW_GROUP = 0x00000004;
        const FILL_AREA = 0x00000008;
        const SORT_DESCENDING = 0x00000010;
        const SHOW_ONLY_IF_PRESENT = 0x00000020;
        const SHOW_BY_DEFAULT = 0x00000040;
        const SHOW_IN_PRIMARY_LIST = 0x00000080;
        const SHOW_IN_SECONDARY_LIST = 0x00000100;
        const HIDE_LABEL = 0x00000200;
        const HIDDEN = 0x00000800;
        const CAN_WRAP = 0x00001000;
    }
}

impl Default for ViewFlags {
    fn default() -> Self {
        ViewFlags::empty()
    }
}

impl fmt::Display for ViewFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        bitflags::parser::to_writer(self, f)
    }
}

impl FromStr for ViewFlags {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(ViewFlags::empty());
        }
        bitflags::parser::from_str(s).map_err(|_| SchemaError::invalid_value("ViewFlags", s))
    }
}
