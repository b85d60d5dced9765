//! 追跡結果の型定義

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::UnknownProvider;

/// 配送業者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// 7-ELEVEN 交貨便
    SevenEleven,
    /// 全家 FamilyMart
    FamilyMart,
    /// OK 超商
    OKMart,
    /// 黑貓宅急便
    Tcat,
    /// 宅配通
    Ecan,
    /// 新竹物流
    Hct,
    /// 大榮貨運
    Ktj,
}

impl Provider {
    pub const ALL: [Provider; 7] = [
        Provider::SevenEleven,
        Provider::FamilyMart,
        Provider::OKMart,
        Provider::Tcat,
        Provider::Ecan,
        Provider::Hct,
        Provider::Ktj,
    ];

    /// 表示用のプラットフォーム名
    pub fn tag(&self) -> &'static str {
        match self {
            Provider::SevenEleven => "7-11",
            Provider::FamilyMart => "FamilyMart",
            Provider::OKMart => "OKMart",
            Provider::Tcat => "Tcat",
            Provider::Ecan => "Ecan",
            Provider::Hct => "HCT",
            Provider::Ktj => "KTJ",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| {
                p.tag().to_ascii_lowercase() == needle
                    || format!("{:?}", p).to_ascii_lowercase() == needle
            })
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// 追跡結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingResult {
    pub order_id: String,
    pub platform: Provider,
    pub status: String,
    /// 業者の返す時刻文字列（形式は業者ごとに異なる）
    pub time: Option<String>,
    pub is_delivered: bool,
    /// 業者固有の解析済みデータ
    pub raw_data: serde_json::Value,
}

/// `time` として現れる既知の書式
const TIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

impl TrackingResult {
    /// `time` を業者共通の日時に変換する。`time` 自体は変更しない。
    pub fn normalized_time(&self) -> Option<NaiveDateTime> {
        let raw = self.time.as_deref()?.trim();
        TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn result_with_time(time: Option<&str>) -> TrackingResult {
        TrackingResult {
            order_id: "A1".to_string(),
            platform: Provider::Tcat,
            status: "配達完成".to_string(),
            time: time.map(str::to_string),
            is_delivered: true,
            raw_data: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("7-11".parse::<Provider>().unwrap(), Provider::SevenEleven);
        assert_eq!("seveneleven".parse::<Provider>().unwrap(), Provider::SevenEleven);
        assert_eq!("OKMart".parse::<Provider>().unwrap(), Provider::OKMart);
        assert_eq!("hct".parse::<Provider>().unwrap(), Provider::Hct);
        assert_eq!(
            "shopee".parse::<Provider>().unwrap_err(),
            UnknownProvider("shopee".to_string())
        );
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(Provider::SevenEleven.to_string(), "7-11");
        assert_eq!(Provider::Ktj.to_string(), "KTJ");
    }

    #[test]
    fn test_normalized_time_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        for raw in [
            "2024/01/01 10:00:00",
            "2024/01/01 10:00",
            "2024-01-01 10:00",
            "2024-01-01T10:00:00",
            "2024-01-01T10:00:00.000",
        ] {
            assert_eq!(result_with_time(Some(raw)).normalized_time(), Some(expected), "{raw}");
        }
    }

    #[test]
    fn test_normalized_time_keeps_seconds() {
        let t = result_with_time(Some("2025/12/16 09:14:33"))
            .normalized_time()
            .unwrap();
        assert_eq!(t.second(), 33);
    }

    #[test]
    fn test_normalized_time_unknown() {
        assert_eq!(result_with_time(None).normalized_time(), None);
        assert_eq!(result_with_time(Some("12/16 09:14")).normalized_time(), None);
    }
}
