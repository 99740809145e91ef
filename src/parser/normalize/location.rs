pub const PREFECTURES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県",
    "茨城県", "栃木県", "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県",
    "新潟県", "富山県", "石川県", "福井県", "山梨県", "長野県", "岐阜県",
    "静岡県", "愛知県", "三重県", "滋賀県", "京都府", "大阪府", "兵庫県",
    "奈良県", "和歌山県", "鳥取県", "島根県", "岡山県", "広島県", "山口県",
    "徳島県", "香川県", "愛媛県", "高知県", "福岡県", "佐賀県", "長崎県",
    "熊本県", "大分県", "宮崎県", "鹿児島県", "沖縄県",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub prefecture: Option<String>,
    pub locality: Option<String>,
}

/// Split a work location into prefecture and the rest.
///
/// The first token is tested against the prefecture list in list order.
/// Without a prefecture, the whole trimmed text is kept as the locality.
pub fn split_location(text: &str) -> Location {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some((first, rest)) = tokens.split_first() else {
        return Location::default();
    };

    match PREFECTURES.iter().find(|p| first.starts_with(**p)) {
        Some(pref) => {
            let mut parts = Vec::with_capacity(tokens.len());
            let head = first[pref.len()..].trim();
            if !head.is_empty() {
                parts.push(head);
            }
            parts.extend(rest.iter().copied());
            let locality = parts.join(" ");
            Location {
                prefecture: Some(pref.to_string()),
                locality: (!locality.is_empty()).then_some(locality),
            }
        }
        None => Location {
            prefecture: None,
            locality: Some(tokens.join(" ")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(s: &str) -> (Option<String>, Option<String>) {
        let l = split_location(s);
        (l.prefecture, l.locality)
    }

    #[test]
    fn prefecture_and_ward() {
        assert_eq!(split("東京都 渋谷区"), (Some("東京都".into()), Some("渋谷区".into())));
    }

    #[test]
    fn prefecture_glued_to_city() {
        assert_eq!(
            split("大阪府大阪市北区 梅田"),
            (Some("大阪府".into()), Some("大阪市北区 梅田".into()))
        );
    }

    #[test]
    fn prefecture_only() {
        assert_eq!(split("北海道"), (Some("北海道".into()), None));
    }

    #[test]
    fn unknown_place_is_kept_as_locality() {
        assert_eq!(split("不明"), (None, Some("不明".into())));
        assert_eq!(split("  海外   シンガポール "), (None, Some("海外 シンガポール".into())));
    }

    #[test]
    fn blank_is_empty() {
        assert_eq!(split("   "), (None, None));
    }

    #[test]
    fn list_order_decides() {
        // 京都府 must not be mistaken for 東京都 and vice versa.
        assert_eq!(split("京都府京都市").0.as_deref(), Some("京都府"));
        assert_eq!(split("東京都港区").0.as_deref(), Some("東京都"));
    }
}
