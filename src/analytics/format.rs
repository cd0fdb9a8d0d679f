//! 摘要消息的数值与日期格式化

use chrono::{Datelike, NaiveDate};

/// 1 ALGO = 1,000,000 microAlgos
pub const MICRO_ALGOS_PER_ALGO: f64 = 1_000_000.0;

/// 格式化数值
///
/// `from_micro` 为真时先换算为 ALGO 并向下取整。输出带千分位，
/// 去掉小数部分末尾的0；结果为 `0` 时输出 `~0.1`。
pub fn pretty_value(value: f64, from_micro: bool) -> String {
    let value = if from_micro {
        (value / MICRO_ALGOS_PER_ALGO).floor()
    } else {
        value
    };

    let rendered = format!("{value}");
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", rendered.as_str()),
    };
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let fraction = fraction.trim_end_matches('0');

    let mut pretty = format!("{sign}{}", group_thousands(integer));
    if !fraction.is_empty() {
        pretty.push('.');
        pretty.push_str(fraction);
    }

    if pretty == "0" || pretty == "-0" {
        return "~0.1".to_string();
    }
    pretty
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// 缩写地址：保留首尾各 `width` 个字符
pub fn ellipse_address(address: &str, width: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= width * 2 {
        return address.to_string();
    }

    let head: String = chars[..width].iter().collect();
    let tail: String = chars[chars.len() - width..].iter().collect();
    format!("{head}...{tail}")
}

/// 日期格式化为 `Oct 1st` 形式
pub fn pretty_date(date: NaiveDate) -> String {
    format!(
        "{} {}{}",
        date.format("%b"),
        date.day(),
        ordinal_suffix(date.day())
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_value_from_micro() {
        assert_eq!(pretty_value(1_234_567_890.0, true), "1,234");
        assert_eq!(pretty_value(3_000_000_000_000.0, true), "3,000,000");
        assert_eq!(pretty_value(999_999.0, true), "~0.1");
    }

    #[test]
    fn test_pretty_value_plain() {
        assert_eq!(pretty_value(1_234_567.0, false), "1,234,567");
        assert_eq!(pretty_value(100.0, false), "100");
        assert_eq!(pretty_value(1234.50, false), "1,234.5");
        assert_eq!(pretty_value(0.0, false), "~0.1");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1"), "1");
        assert_eq!(group_thousands("123"), "123");
        assert_eq!(group_thousands("1234"), "1,234");
        assert_eq!(group_thousands("123456"), "123,456");
    }

    #[test]
    fn test_ellipse_address() {
        let address = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";
        assert_eq!(ellipse_address(address, 3), "AAA...FKQ");
        assert_eq!(ellipse_address("ABCDEF", 3), "ABCDEF");
    }

    #[test]
    fn test_pretty_date() {
        let date = |d| NaiveDate::from_ymd_opt(2023, 10, d).unwrap();
        assert_eq!(pretty_date(date(1)), "Oct 1st");
        assert_eq!(pretty_date(date(2)), "Oct 2nd");
        assert_eq!(pretty_date(date(3)), "Oct 3rd");
        assert_eq!(pretty_date(date(11)), "Oct 11th");
        assert_eq!(pretty_date(date(12)), "Oct 12th");
        assert_eq!(pretty_date(date(13)), "Oct 13th");
        assert_eq!(pretty_date(date(21)), "Oct 21st");
        assert_eq!(pretty_date(date(22)), "Oct 22nd");
        assert_eq!(pretty_date(date(30)), "Oct 30th");
    }
}
