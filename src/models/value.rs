//! # 收集到的物理量
//!
//! 程序输出中的标量按打印的十进制文本保存，直到组装最终结果时
//! 才转换为浮点数；数组统一为二维 `ndarray`。
//!
//! ## 依赖关系
//! - 被 `harness/harvester.rs`, `harness/assemble.rs` 使用
//! - 使用 `ndarray`

use ndarray::Array2;
use serde::{Serialize, Serializer};
use std::fmt;

/// 保留打印精度的十进制数
#[derive(Debug, Clone, PartialEq)]
pub struct PrintedDecimal {
    text: String,
    value: f64,
}

impl PrintedDecimal {
    /// 解析程序打印的数字，兼容 Fortran 的 `D` 指数
    pub fn parse(s: &str) -> Option<Self> {
        let text = s.trim().replace(['D', 'd'], "E");
        let value = text.parse::<f64>().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(PrintedDecimal { text, value })
    }

    /// 打印文本
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn to_f64(&self) -> f64 {
        self.value
    }

    /// 两数之和；结果文本按两者中较多的小数位输出
    pub fn add(&self, other: &PrintedDecimal) -> PrintedDecimal {
        self.combine(other, self.value + other.value)
    }

    /// 两数之差
    pub fn sub(&self, other: &PrintedDecimal) -> PrintedDecimal {
        self.combine(other, self.value - other.value)
    }

    fn combine(&self, other: &PrintedDecimal, value: f64) -> PrintedDecimal {
        let places = self.decimal_places().max(other.decimal_places());
        PrintedDecimal {
            text: format!("{:.*}", places, value),
            value,
        }
    }

    fn decimal_places(&self) -> usize {
        if self.text.contains(['E', 'e']) {
            return 12;
        }
        self.text
            .split_once('.')
            .map(|(_, frac)| frac.len())
            .unwrap_or(0)
    }
}

impl fmt::Display for PrintedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl Serialize for PrintedDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// 一个收集到的量：十进制标量或数组
#[derive(Debug, Clone, PartialEq)]
pub enum QcValue {
    Decimal(PrintedDecimal),
    Array(Array2<f64>),
}

impl QcValue {
    pub fn as_decimal(&self) -> Option<&PrintedDecimal> {
        match self {
            QcValue::Decimal(d) => Some(d),
            QcValue::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array2<f64>> {
        match self {
            QcValue::Array(a) => Some(a),
            QcValue::Decimal(_) => None,
        }
    }
}

impl From<PrintedDecimal> for QcValue {
    fn from(d: PrintedDecimal) -> Self {
        QcValue::Decimal(d)
    }
}

impl From<Array2<f64>> for QcValue {
    fn from(a: Array2<f64>) -> Self {
        QcValue::Array(a)
    }
}

/// 十进制写为字符串，数组按行优先展平
impl Serialize for QcValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QcValue::Decimal(d) => d.serialize(serializer),
            QcValue::Array(a) => serializer.collect_seq(a.iter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_parse_keeps_text() {
        let d = PrintedDecimal::parse("  -76.041381533183 ").unwrap();
        assert_eq!(d.as_str(), "-76.041381533183");
        assert!((d.to_f64() + 76.041381533183).abs() < 1e-12);
    }

    #[test]
    fn test_parse_fortran_exponent() {
        let d = PrintedDecimal::parse("-0.1234D-02").unwrap();
        assert!((d.to_f64() + 0.001234).abs() < 1e-15);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(PrintedDecimal::parse("****").is_none());
        assert!(PrintedDecimal::parse("NaN").is_none());
    }

    #[test]
    fn test_add_precision() {
        let a = PrintedDecimal::parse("-76.041381533").unwrap();
        let b = PrintedDecimal::parse("-0.2218977246").unwrap();
        assert_eq!(a.add(&b).as_str(), "-76.2632792576");

        let total = PrintedDecimal::parse("-76.263279258189").unwrap();
        assert_eq!(total.sub(&a).as_str(), "-0.221897725189");
    }

    #[test]
    fn test_serialize() {
        let d = QcValue::from(PrintedDecimal::parse("-1.50").unwrap());
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"-1.50\"");

        let a = QcValue::from(array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(serde_json::to_string(&a).unwrap(), "[1.0,2.0,3.0,4.0]");
    }
}
